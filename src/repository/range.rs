use crate::store::ScoreRange;

/// Score window and page for reads from sorted branches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchRange {
    pub from: f64,
    pub to: f64,
    pub skip: u64,
    pub take: Option<u64>,
}

impl BranchRange {
    /// Every member.
    pub fn all() -> Self {
        Self::between(f64::NEG_INFINITY, f64::INFINITY)
    }

    /// Members scoring at least `from`.
    pub fn from(from: f64) -> Self {
        Self::between(from, f64::INFINITY)
    }

    /// Members scoring within `[from, to]`.
    pub fn between(from: f64, to: f64) -> Self {
        Self {
            from,
            to,
            skip: 0,
            take: None,
        }
    }

    /// Skips `skip` members and keeps at most `take` of the rest.
    pub fn page(mut self, skip: u64, take: u64) -> Self {
        self.skip = skip;
        self.take = Some(take);
        self
    }

    pub(crate) fn scores(&self) -> ScoreRange {
        ScoreRange::inclusive(self.from, self.to)
    }
}

impl Default for BranchRange {
    fn default() -> Self {
        Self::all()
    }
}
