//! Date/time values as tick counts.
//!
//! A tick is 100 ns counted from 0001-01-01T00:00:00. Ticks keep a single
//! canonical numeric form for scores and query literals, and match the
//! `"<ticks>|UTC"` / `"<ticks>|LOC"` wire format of primary records.
//!
//! Conversions from chrono never fail. Only ticks inside
//! `0..=MAX_TICKS` (years 1 to 9999) can be written to the wire or turned back
//! into chrono values.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::codec::CodecError;

const TICKS_PER_SECOND: i128 = 10_000_000;
const NANOS_PER_TICK: i128 = 100;
const UNIX_EPOCH_TICKS: i128 = 621_355_968_000_000_000;

/// Last tick of 9999-12-31.
pub const MAX_TICKS: i128 = 3_155_378_975_999_999_999;

const UTC_SUFFIX: &str = "|UTC";
const LOCAL_SUFFIX: &str = "|LOC";

/// Time zone kind recorded next to the ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeKind {
    Utc,
    /// Wall-clock time without an attached zone.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub ticks: i128,
    pub kind: TimeKind,
}

impl Timestamp {
    pub fn new(ticks: i128, kind: TimeKind) -> Self {
        Self { ticks, kind }
    }

    pub fn from_utc(dt: &DateTime<Utc>) -> Self {
        Self::new(
            to_ticks(dt.timestamp(), dt.timestamp_subsec_nanos()),
            TimeKind::Utc,
        )
    }

    pub fn from_local(dt: &NaiveDateTime) -> Self {
        let utc = dt.and_utc();
        Self::new(
            to_ticks(utc.timestamp(), utc.timestamp_subsec_nanos()),
            TimeKind::Local,
        )
    }

    pub fn is_representable(&self) -> bool {
        (0..=MAX_TICKS).contains(&self.ticks)
    }

    pub fn to_utc(&self) -> Result<DateTime<Utc>, CodecError> {
        let invalid = || CodecError::InvalidTimestamp(self.ticks.to_string());
        if !self.is_representable() {
            return Err(invalid());
        }
        let since_epoch = self.ticks - UNIX_EPOCH_TICKS;
        let secs = i64::try_from(since_epoch.div_euclid(TICKS_PER_SECOND)).map_err(|_| invalid())?;
        let nanos = u32::try_from(since_epoch.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK)
            .map_err(|_| invalid())?;
        DateTime::from_timestamp(secs, nanos).ok_or_else(invalid)
    }

    pub fn to_naive(&self) -> Result<NaiveDateTime, CodecError> {
        self.to_utc().map(|dt| dt.naive_utc())
    }

    /// Wire form, e.g. `637500000000000000|UTC`.
    pub fn encode(&self) -> Result<String, CodecError> {
        if !self.is_representable() {
            return Err(CodecError::InvalidTimestamp(self.ticks.to_string()));
        }
        let suffix = match self.kind {
            TimeKind::Utc => UTC_SUFFIX,
            TimeKind::Local => LOCAL_SUFFIX,
        };
        Ok(format!("{}{}", self.ticks, suffix))
    }

    /// Parses the wire form. A value without a recognised suffix is read as
    /// local time.
    pub fn decode(raw: &str) -> Result<Self, CodecError> {
        let (digits, kind) = if let Some(digits) = raw.strip_suffix(UTC_SUFFIX) {
            (digits, TimeKind::Utc)
        } else if let Some(digits) = raw.strip_suffix(LOCAL_SUFFIX) {
            (digits, TimeKind::Local)
        } else {
            (raw, TimeKind::Local)
        };

        digits
            .trim()
            .parse::<i64>()
            .map(|ticks| Self::new(i128::from(ticks), kind))
            .map_err(|_| CodecError::InvalidTimestamp(raw.to_string()))
    }
}

fn to_ticks(secs: i64, subsec_nanos: u32) -> i128 {
    UNIX_EPOCH_TICKS + i128::from(secs) * TICKS_PER_SECOND + i128::from(subsec_nanos) / NANOS_PER_TICK
}
