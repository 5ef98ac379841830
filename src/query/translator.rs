use std::marker::PhantomData;

use super::program::{OperandToken, PostfixProgram, SetOperator, Token};
use super::{CompareOp, Predicate, TranslateError};
use crate::entity::{Entity, FieldValue, ValueType};

/// Translates predicates over `T` into postfix programs.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryTranslator<T> {
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> QueryTranslator<T> {
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }

    /// Emits operands in source order and each operator after both of its
    /// operands.
    pub fn translate(&self, predicate: &Predicate) -> Result<PostfixProgram, TranslateError> {
        let mut program = PostfixProgram::default();
        self.visit(predicate, &mut program)?;
        Ok(program)
    }

    fn visit(&self, predicate: &Predicate, out: &mut PostfixProgram) -> Result<(), TranslateError> {
        match predicate {
            Predicate::And(left, right) => {
                self.visit(left, out)?;
                self.visit(right, out)?;
                out.push(Token::Operator(SetOperator::Intersection));
            }
            Predicate::Or(left, right) => {
                self.visit(left, out)?;
                self.visit(right, out)?;
                out.push(Token::Operator(SetOperator::Union));
            }
            Predicate::Compare {
                property,
                op,
                literal,
            } => out.push(Token::Operand(self.operand(property, *op, literal)?)),
        }
        Ok(())
    }

    fn operand(
        &self,
        property: &str,
        op: CompareOp,
        literal: &FieldValue,
    ) -> Result<OperandToken, TranslateError> {
        let field = T::field(property).ok_or_else(|| TranslateError::UnknownProperty {
            entity: T::NAME,
            property: property.to_string(),
        })?;
        let value_type = field.value_type;
        if field.ignore || field.name == T::ID_FIELD || !value_type.is_scalar() {
            return Err(TranslateError::UnindexedProperty {
                property: property.to_string(),
                value_type,
            });
        }

        let unsupported = || TranslateError::UnsupportedConstant {
            property: property.to_string(),
            expected: value_type,
            found: literal.kind_name(),
        };

        let (value, op) = if value_type.is_range_indexed() {
            (range_literal(value_type, literal).ok_or_else(unsupported)?, Some(op))
        } else {
            if op != CompareOp::Eq {
                return Err(TranslateError::UnsupportedOperator {
                    property: property.to_string(),
                    op,
                    value_type,
                });
            }
            (value_literal(value_type, literal).ok_or_else(unsupported)?, None)
        };

        Ok(OperandToken {
            entity: T::NAME.to_string(),
            property: field.name.to_string(),
            value_type,
            value,
            op,
        })
    }
}

/// Numeric text of a literal compared against a range-indexed property, in
/// the same units the index scores with.
fn range_literal(value_type: ValueType, literal: &FieldValue) -> Option<String> {
    match (value_type, literal) {
        (ValueType::DateTime, FieldValue::DateTime(ts)) => Some(ts.ticks.to_string()),
        (ValueType::DateTime, _) => None,
        (ValueType::Enum, FieldValue::Enum(e)) => Some(e.discriminant.to_string()),
        (ValueType::Char, FieldValue::Char(c)) => Some(u32::from(*c).to_string()),
        (_, FieldValue::Int(n)) => Some(n.to_string()),
        (_, FieldValue::UInt(n)) => Some(n.to_string()),
        (ValueType::Enum, _) => None,
        (_, FieldValue::Float(f)) if f.is_finite() => Some(f.to_string()),
        _ => None,
    }
}

fn value_literal(value_type: ValueType, literal: &FieldValue) -> Option<String> {
    match (value_type, literal) {
        (ValueType::Boolean, FieldValue::Bool(b)) => Some(b.to_string()),
        (ValueType::String, FieldValue::Str(s)) => Some(s.clone()),
        (ValueType::String, FieldValue::Null) => Some(String::new()),
        _ => None,
    }
}
