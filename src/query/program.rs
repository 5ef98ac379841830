use std::fmt;
use std::str::FromStr;

use super::{CompareOp, QueryError};
use crate::entity::ValueType;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Intersection,
}

impl SetOperator {
    fn name(&self) -> &'static str {
        match self {
            SetOperator::Union => "Union",
            SetOperator::Intersection => "Intersection",
        }
    }
}

/// One index lookup.
///
/// Range-indexed properties render as `{{Entity:prop-Type:value:op}}` with a
/// numeric value; set-indexed ones as `{{Entity:prop-Type:value}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandToken {
    pub entity: String,
    pub property: String,
    pub value_type: ValueType,
    pub value: String,
    /// Present for range-indexed properties only.
    pub op: Option<CompareOp>,
}

impl OperandToken {
    fn parse_inner(inner: &str) -> Result<Self, QueryError> {
        let malformed = || QueryError::Malformed(format!("bad operand {}{}{}", OPEN, inner, CLOSE));

        let mut parts = inner.splitn(3, ':');
        let entity = parts.next().filter(|e| !e.is_empty()).ok_or_else(malformed)?;
        let typed = parts.next().ok_or_else(malformed)?;
        let rest = parts.next().ok_or_else(malformed)?;

        let (property, code) = typed.rsplit_once('-').ok_or_else(malformed)?;
        let value_type = ValueType::from_code(code).ok_or_else(malformed)?;

        let (value, op) = if value_type.is_range_indexed() {
            let (value, op) = rest.rsplit_once(':').ok_or_else(malformed)?;
            (value, Some(op.parse::<CompareOp>()?))
        } else {
            (rest, None)
        };

        Ok(OperandToken {
            entity: entity.to_string(),
            property: property.to_string(),
            value_type,
            value: value.to_string(),
            op,
        })
    }
}

impl fmt::Display for OperandToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " {}{}:{}-{}:{}",
            OPEN,
            self.entity,
            self.property,
            self.value_type.code(),
            self.value
        )?;
        if let Some(op) = self.op {
            write!(f, ":{}", op)?;
        }
        write!(f, "{} ", CLOSE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Operand(OperandToken),
    Operator(SetOperator),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Operand(operand) => operand.fmt(f),
            Token::Operator(op) => write!(f, "{}{}{}", OPEN, op.name(), CLOSE),
        }
    }
}

/// A translated predicate in postfix order. Its `Display` form is the
/// textual program handed to the evaluator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostfixProgram {
    tokens: Vec<Token>,
}

impl PostfixProgram {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub(crate) fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }
}

impl fmt::Display for PostfixProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            token.fmt(f)?;
        }
        Ok(())
    }
}

impl FromStr for PostfixProgram {
    type Err = QueryError;

    /// Parses the textual form. Whitespace between tokens is ignored; any
    /// other text outside `{{ }}` is an error.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut tokens = Vec::new();
        let mut rest = text;
        loop {
            let Some(start) = rest.find(OPEN) else {
                if !rest.trim().is_empty() {
                    return Err(QueryError::Malformed(format!("stray text '{}'", rest.trim())));
                }
                break;
            };
            if !rest[..start].trim().is_empty() {
                return Err(QueryError::Malformed(format!(
                    "stray text '{}'",
                    rest[..start].trim()
                )));
            }
            let body = &rest[start + OPEN.len()..];
            let end = body
                .find(CLOSE)
                .ok_or_else(|| QueryError::Malformed(format!("unterminated token in '{}'", text)))?;
            let inner = &body[..end];
            let token = match inner {
                "Union" => Token::Operator(SetOperator::Union),
                "Intersection" => Token::Operator(SetOperator::Intersection),
                operand => Token::Operand(OperandToken::parse_inner(operand)?),
            };
            tokens.push(token);
            rest = &body[end + CLOSE.len()..];
        }
        Ok(PostfixProgram { tokens })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price_gt() -> Token {
        Token::Operand(OperandToken {
            entity: "Stock".into(),
            property: "price".into(),
            value_type: ValueType::Double,
            value: "100".into(),
            op: Some(CompareOp::Gt),
        })
    }

    fn active() -> Token {
        Token::Operand(OperandToken {
            entity: "Stock".into(),
            property: "is_active".into(),
            value_type: ValueType::Boolean,
            value: "true".into(),
            op: None,
        })
    }

    #[test]
    fn renders_tokens() {
        let program = PostfixProgram::new(vec![
            active(),
            price_gt(),
            Token::Operator(SetOperator::Intersection),
        ]);
        assert_eq!(
            program.to_string(),
            " {{Stock:is_active-Boolean:true}}  {{Stock:price-Double:100:>}} {{Intersection}}"
        );
    }

    #[test]
    fn parses_rendered_text() {
        let program = PostfixProgram::new(vec![
            price_gt(),
            active(),
            Token::Operator(SetOperator::Union),
        ]);
        let parsed: PostfixProgram = program.to_string().parse().unwrap();
        assert_eq!(parsed, program);
    }

    #[test]
    fn string_values_may_contain_delimiters() {
        let parsed: PostfixProgram = "{{Stock:name-String:a:b}}".parse().unwrap();
        match &parsed.tokens()[0] {
            Token::Operand(operand) => {
                assert_eq!(operand.value, "a:b");
                assert_eq!(operand.op, None);
            }
            other => panic!("unexpected token {:?}", other),
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!("{{Stock:price-Double:1}}".parse::<PostfixProgram>().is_err());
        assert!("{{Stock:price-Decimal:1:>}}".parse::<PostfixProgram>().is_err());
        assert!("{{Union".parse::<PostfixProgram>().is_err());
        assert!("hello {{Union}}".parse::<PostfixProgram>().is_err());
        assert!("{{Stock:price-Double:1:!}}".parse::<PostfixProgram>().is_err());
    }
}
