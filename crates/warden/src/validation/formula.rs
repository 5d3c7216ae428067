//! Built-in validation formula language.
//!
//! A deliberately small predicate grammar over the bound field value:
//!
//! ```text
//! formula   := ["not"] predicate
//! predicate := "value"
//!            | "value" <op> <literal>        op: == != > >= < <=
//!            | "value" "contains" <string>
//! literal   := "quoted string" | number | true | false
//! ```
//!
//! Bare `value` tests truthiness. Anything unparseable fails closed.

use aegis_common::FieldValue;

use super::ValidationRule;

/// Evaluator for the built-in formula grammar
pub struct FormulaEvaluator;

impl ValidationRule for FormulaEvaluator {
    fn evaluate(&self, expression: &str, value: &FieldValue) -> bool {
        match parse(expression) {
            Some(formula) => eval(&formula, value).unwrap_or(false),
            None => {
                tracing::debug!(expression = %expression, "Unparseable validation formula, failing closed");
                false
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    Num(f64),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
}

#[derive(Debug, Clone, PartialEq)]
struct Formula {
    negated: bool,
    test: Test,
}

#[derive(Debug, Clone, PartialEq)]
enum Test {
    /// Bare `value`: truthiness
    Truthy,
    Compare(Comparator, Literal),
}

fn parse(input: &str) -> Option<Formula> {
    let tokens = tokenize(input)?;
    let mut rest = tokens.as_slice();

    let mut negated = false;
    while matches!(rest.first(), Some(Token::Word(w)) if w == "not") {
        negated = !negated;
        rest = &rest[1..];
    }

    match rest.first()? {
        Token::Word(w) if w == "value" => {}
        _ => return None,
    }
    rest = &rest[1..];

    let test = match rest {
        [] => Test::Truthy,
        [op, literal] => Test::Compare(parse_comparator(op)?, parse_literal(literal)?),
        _ => return None,
    };

    Some(Formula { negated, test })
}

/// Split on whitespace, keeping double-quoted strings as single tokens
fn tokenize(input: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut literal = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(ch) => literal.push(ch),
                    // Unterminated string
                    None => return None,
                }
            }
            tokens.push(Token::Quoted(literal));
        } else {
            let mut word = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || ch == '"' {
                    break;
                }
                word.push(ch);
                chars.next();
            }
            tokens.push(Token::Word(word));
        }
    }

    if tokens.is_empty() { None } else { Some(tokens) }
}

fn parse_comparator(token: &Token) -> Option<Comparator> {
    let Token::Word(word) = token else {
        return None;
    };
    match word.as_str() {
        "==" => Some(Comparator::Eq),
        "!=" => Some(Comparator::Ne),
        ">" => Some(Comparator::Gt),
        ">=" => Some(Comparator::Ge),
        "<" => Some(Comparator::Lt),
        "<=" => Some(Comparator::Le),
        "contains" => Some(Comparator::Contains),
        _ => None,
    }
}

fn parse_literal(token: &Token) -> Option<Literal> {
    match token {
        Token::Quoted(s) => Some(Literal::Str(s.clone())),
        Token::Word(w) => match w.as_str() {
            "true" => Some(Literal::Bool(true)),
            "false" => Some(Literal::Bool(false)),
            _ => w.parse::<f64>().ok().map(Literal::Num),
        },
    }
}

/// None means the comparison is not defined for this value/literal pair;
/// the caller fails closed.
fn eval(formula: &Formula, value: &FieldValue) -> Option<bool> {
    let result = match &formula.test {
        Test::Truthy => truthy(value),
        Test::Compare(comparator, literal) => compare(*comparator, literal, value)?,
    };
    Some(formula.negated != result)
}

fn truthy(value: &FieldValue) -> bool {
    match value {
        FieldValue::Null => false,
        FieldValue::Bool(b) => *b,
        FieldValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        FieldValue::String(s) => !s.is_empty(),
        FieldValue::Array(items) => !items.is_empty(),
        FieldValue::Object(fields) => !fields.is_empty(),
    }
}

fn compare(comparator: Comparator, literal: &Literal, value: &FieldValue) -> Option<bool> {
    match comparator {
        Comparator::Eq => literal_eq(literal, value),
        Comparator::Ne => literal_eq(literal, value).map(|eq| !eq),
        Comparator::Contains => {
            let Literal::Str(needle) = literal else {
                return None;
            };
            match value {
                FieldValue::String(s) => Some(s.contains(needle)),
                FieldValue::Array(items) => Some(
                    items
                        .iter()
                        .any(|item| item.as_str() == Some(needle.as_str())),
                ),
                _ => None,
            }
        }
        Comparator::Gt | Comparator::Ge | Comparator::Lt | Comparator::Le => {
            let Literal::Num(rhs) = literal else {
                return None;
            };
            let lhs = value.as_f64()?;
            Some(match comparator {
                Comparator::Gt => lhs > *rhs,
                Comparator::Ge => lhs >= *rhs,
                Comparator::Lt => lhs < *rhs,
                Comparator::Le => lhs <= *rhs,
                _ => unreachable!(),
            })
        }
    }
}

fn literal_eq(literal: &Literal, value: &FieldValue) -> Option<bool> {
    match literal {
        Literal::Str(s) => value.as_str().map(|v| v == s),
        Literal::Num(n) => value.as_f64().map(|v| v == *n),
        Literal::Bool(b) => value.as_bool().map(|v| v == *b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval_str(expression: &str, value: FieldValue) -> bool {
        FormulaEvaluator.evaluate(expression, &value)
    }

    #[test]
    fn test_truthiness() {
        assert!(eval_str("value", json!("filled")));
        assert!(eval_str("value", json!(42)));
        assert!(eval_str("value", json!(["a"])));
        assert!(!eval_str("value", json!("")));
        assert!(!eval_str("value", json!(0)));
        assert!(!eval_str("value", json!(null)));
        assert!(!eval_str("value", json!(false)));
    }

    #[test]
    fn test_string_equality() {
        assert!(eval_str("value == \"login\"", json!("login")));
        assert!(!eval_str("value == \"login\"", json!("signup")));
        assert!(eval_str("value != \"login\"", json!("signup")));
    }

    #[test]
    fn test_numeric_comparisons() {
        assert!(eval_str("value > 10", json!(11)));
        assert!(!eval_str("value > 10", json!(10)));
        assert!(eval_str("value >= 10", json!(10)));
        assert!(eval_str("value < 10", json!(9.5)));
        assert!(eval_str("value <= 10", json!(10)));
        assert!(eval_str("value == 10", json!(10)));
    }

    #[test]
    fn test_contains() {
        assert!(eval_str("value contains \"@\"", json!("user@example.com")));
        assert!(!eval_str("value contains \"@\"", json!("no-at-sign")));
        assert!(eval_str("value contains \"b\"", json!(["a", "b"])));
        assert!(!eval_str("value contains \"c\"", json!(["a", "b"])));
    }

    #[test]
    fn test_negation() {
        assert!(eval_str("not value", json!("")));
        assert!(!eval_str("not value", json!("filled")));
        assert!(eval_str("not value == \"x\"", json!("y")));
        // Double negation cancels
        assert!(eval_str("not not value", json!("filled")));
    }

    #[test]
    fn test_fails_closed_on_garbage() {
        assert!(!eval_str("", json!("anything")));
        assert!(!eval_str("   ", json!("anything")));
        assert!(!eval_str("banana", json!("anything")));
        assert!(!eval_str("value ==", json!("anything")));
        assert!(!eval_str("value == \"unterminated", json!("anything")));
        assert!(!eval_str("value ~= \"x\"", json!("x")));
        assert!(!eval_str("value == \"a\" extra", json!("a")));
    }

    #[test]
    fn test_fails_closed_on_type_mismatch() {
        // Ordering against a non-number fails closed, even negated
        assert!(!eval_str("value > 10", json!("eleven")));
        assert!(!eval_str("not value > 10", json!("eleven")));
        // contains against a number fails closed
        assert!(!eval_str("value contains \"1\"", json!(123)));
        // String equality against a number fails closed, both polarities
        assert!(!eval_str("value == \"10\"", json!(10)));
        assert!(!eval_str("value != \"10\"", json!(10)));
    }
}
