//! Queries over per-property indexes.
//!
//! A [`Predicate`] is translated into a postfix program of index lookups and
//! set operators, which the evaluator runs against the store:
//!
//! ```ignore
//! let predicate = field("is_active").eq(true).and(field("price").gt(100.0));
//! // {{Stock:is_active-Boolean:true}}  {{Stock:price-Double:100:>}} {{Intersection}}
//! let stocks = repository.query(&predicate).await?.collect().await?;
//! ```

mod evaluator;
mod program;
mod result;
mod translator;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::entity::{FieldValue, IntoFieldValue, ValueType};
use crate::store::StoreError;

pub use evaluator::QueryEvaluator;
pub use program::{OperandToken, PostfixProgram, SetOperator, Token};
pub use result::{EntityCursor, QueryResult};
pub use translator::QueryTranslator;

/// Comparison operators, written the way they appear in postfix tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for CompareOp {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(CompareOp::Eq),
            "<>" => Ok(CompareOp::Ne),
            "<" => Ok(CompareOp::Lt),
            "<=" => Ok(CompareOp::Le),
            ">" => Ok(CompareOp::Gt),
            ">=" => Ok(CompareOp::Ge),
            other => Err(QueryError::Malformed(format!("unknown operator {}", other))),
        }
    }
}

/// Boolean predicate over entity properties.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        property: String,
        op: CompareOp,
        literal: FieldValue,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn compare(property: impl Into<String>, op: CompareOp, literal: impl IntoFieldValue) -> Self {
        Predicate::Compare {
            property: property.into(),
            op,
            literal: literal.to_field_value(),
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }
}

/// Starts a comparison on `property`.
pub fn field(property: impl Into<String>) -> FieldRef {
    FieldRef {
        property: property.into(),
    }
}

/// Left-hand side of a comparison.
#[derive(Debug, Clone)]
pub struct FieldRef {
    property: String,
}

impl FieldRef {
    pub fn eq(self, literal: impl IntoFieldValue) -> Predicate {
        Predicate::compare(self.property, CompareOp::Eq, literal)
    }

    pub fn ne(self, literal: impl IntoFieldValue) -> Predicate {
        Predicate::compare(self.property, CompareOp::Ne, literal)
    }

    pub fn lt(self, literal: impl IntoFieldValue) -> Predicate {
        Predicate::compare(self.property, CompareOp::Lt, literal)
    }

    pub fn le(self, literal: impl IntoFieldValue) -> Predicate {
        Predicate::compare(self.property, CompareOp::Le, literal)
    }

    pub fn gt(self, literal: impl IntoFieldValue) -> Predicate {
        Predicate::compare(self.property, CompareOp::Gt, literal)
    }

    pub fn ge(self, literal: impl IntoFieldValue) -> Predicate {
        Predicate::compare(self.property, CompareOp::Ge, literal)
    }
}

/// Predicates the translator cannot express as index lookups.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslateError {
    #[error("{property} is not a property of {entity}")]
    UnknownProperty {
        entity: &'static str,
        property: String,
    },
    #[error("{property} ({value_type}) has no query index")]
    UnindexedProperty {
        property: String,
        value_type: ValueType,
    },
    #[error("operator {op} is not supported on {property} ({value_type}), only =")]
    UnsupportedOperator {
        property: String,
        op: CompareOp,
        value_type: ValueType,
    },
    #[error("cannot compare {property} ({expected}) with a {found} constant")]
    UnsupportedConstant {
        property: String,
        expected: ValueType,
        found: &'static str,
    },
}

/// Errors raised while evaluating a postfix program or reading its results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("malformed query program: {0}")]
    Malformed(String),
    #[error("{entity} has no query branches")]
    NotQueryable { entity: &'static str },
    #[error("query result has already been enumerated")]
    AlreadyEnumerated,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_symbols_round_trip() {
        for op in [
            CompareOp::Eq,
            CompareOp::Ne,
            CompareOp::Lt,
            CompareOp::Le,
            CompareOp::Gt,
            CompareOp::Ge,
        ] {
            assert_eq!(op.symbol().parse::<CompareOp>().unwrap(), op);
        }
        assert!("==".parse::<CompareOp>().is_err());
    }

    #[test]
    fn builder_nests_left_to_right() {
        let predicate = field("a").eq(1).and(field("b").lt(2.5)).or(field("c").eq("x"));
        match predicate {
            Predicate::Or(left, right) => {
                assert!(matches!(*left, Predicate::And(_, _)));
                assert_eq!(
                    *right,
                    Predicate::Compare {
                        property: "c".into(),
                        op: CompareOp::Eq,
                        literal: FieldValue::Str("x".into()),
                    }
                );
            }
            other => panic!("unexpected predicate {:?}", other),
        }
    }
}
