use std::collections::BTreeSet;

use tracing::debug;

use super::program::{OperandToken, PostfixProgram, SetOperator, Token};
use super::{CompareOp, QueryError};
use crate::key;
use crate::store::{BranchStore, Exclude, Order, ScoreRange};

/// Runs postfix programs against a store and returns the primary record keys
/// of the matching entities.
pub struct QueryEvaluator<'a, S: ?Sized> {
    store: &'a S,
}

/// Stack entry. Lookups stay pending until an operator or the end of the
/// program needs their keys.
enum Operand {
    Pending(Lookup),
    Resolved(BTreeSet<String>),
}

struct Lookup {
    entity: String,
    key: String,
    ranges: Vec<ScoreRange>,
}

impl Lookup {
    fn from_token(token: &OperandToken) -> Result<Self, QueryError> {
        let Some(op) = token.op else {
            return Ok(Lookup {
                entity: token.entity.clone(),
                key: key::value_query_key(&token.entity, &token.property, &token.value),
                ranges: vec![ScoreRange::all()],
            });
        };

        let value: f64 = token.value.parse().map_err(|_| {
            QueryError::Malformed(format!(
                "{} is not a number in {}",
                token.value, token.property
            ))
        })?;
        let ranges = match op {
            CompareOp::Eq => vec![ScoreRange::inclusive(value, value)],
            CompareOp::Ne => vec![
                ScoreRange::new(f64::NEG_INFINITY, value, Exclude::Stop),
                ScoreRange::new(value, f64::INFINITY, Exclude::Start),
            ],
            CompareOp::Lt => vec![ScoreRange::new(f64::NEG_INFINITY, value, Exclude::Stop)],
            CompareOp::Le => vec![ScoreRange::inclusive(f64::NEG_INFINITY, value)],
            CompareOp::Gt => vec![ScoreRange::new(value, f64::INFINITY, Exclude::Start)],
            CompareOp::Ge => vec![ScoreRange::inclusive(value, f64::INFINITY)],
        };
        Ok(Lookup {
            entity: token.entity.clone(),
            key: key::range_query_key(&token.entity, &token.property),
            ranges,
        })
    }
}

impl<'a, S: BranchStore + ?Sized> QueryEvaluator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Parses and runs a textual program.
    pub async fn evaluate(&self, program: &str) -> Result<BTreeSet<String>, QueryError> {
        let program: PostfixProgram = program.parse()?;
        self.run(&program).await
    }

    #[tracing::instrument(skip_all, fields(tokens = program.tokens().len()))]
    pub async fn run(&self, program: &PostfixProgram) -> Result<BTreeSet<String>, QueryError> {
        let mut stack: Vec<Operand> = Vec::new();
        for token in program.tokens() {
            match token {
                Token::Operand(operand) => stack.push(Operand::Pending(Lookup::from_token(operand)?)),
                Token::Operator(op) => {
                    let (Some(right), Some(left)) = (stack.pop(), stack.pop()) else {
                        return Err(QueryError::Malformed(format!(
                            "{} needs two operands",
                            token
                        )));
                    };
                    let right = self.resolve(right).await?;
                    let mut left = self.resolve(left).await?;
                    match op {
                        SetOperator::Union => left.extend(right),
                        SetOperator::Intersection => left.retain(|k| right.contains(k)),
                    }
                    stack.push(Operand::Resolved(left));
                }
            }
        }

        let result = match (stack.pop(), stack.is_empty()) {
            (Some(result), true) => result,
            (None, _) => return Err(QueryError::Malformed("empty program".to_string())),
            (Some(_), false) => {
                return Err(QueryError::Malformed(format!(
                    "{} operands left without an operator",
                    stack.len() + 1
                )))
            }
        };
        let keys = self.resolve(result).await?;
        debug!(matched = keys.len(), "query evaluated");
        Ok(keys)
    }

    async fn resolve(&self, operand: Operand) -> Result<BTreeSet<String>, QueryError> {
        let lookup = match operand {
            Operand::Resolved(keys) => return Ok(keys),
            Operand::Pending(lookup) => lookup,
        };
        let mut keys = BTreeSet::new();
        for range in &lookup.ranges {
            let ids = self
                .store
                .sorted_set_range_by_score(&lookup.key, *range, Order::Ascending, 0, None)
                .await?;
            keys.extend(ids.iter().map(|id| key::data_key(&lookup.entity, id)));
        }
        Ok(keys)
    }
}
