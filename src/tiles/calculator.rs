//! Calculator tile backed by a small arithmetic evaluator.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := '-' unary | '+' unary | atom
//! atom   := number | '(' expr ')'
//! ```

use serde_json::json;
use thiserror::Error;

use crate::error::TileResult;
use crate::model::{TileConfig, TileInstance};
use crate::registry::{TileDefinition, TileSettings};
use crate::render::{ContentHost, TileContext};
use crate::settings::{SettingsContext, SettingsHost};

pub const TYPE_ID: &str = "calculator";
const EXPRESSION: &str = "expression";
const MAX_INPUT_CHARS: usize = 4096;
const MAX_DEPTH: usize = 256;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalcError {
    #[error("unexpected character `{ch}` at {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected `{0}`")]
    UnexpectedToken(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("expression is empty")]
    Empty,
    #[error("expression longer than {MAX_INPUT_CHARS} characters")]
    TooLong,
    #[error("expression nested deeper than {MAX_DEPTH} levels")]
    TooDeep,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Open,
    Close,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => n.to_string(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::Open => "(".into(),
            Token::Close => ")".into(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    if input.chars().count() > MAX_INPUT_CHARS {
        return Err(CalcError::TooLong);
    }
    let chars: Vec<char> = input.chars().collect();
    let mut pos = 0;
    while pos < chars.len() {
        let ch = chars[pos];
        let token = match ch {
            c if c.is_whitespace() => {
                pos += 1;
                continue;
            }
            '0'..='9' | '.' => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                    pos += 1;
                }
                let literal: String = chars[start..pos].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| CalcError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' | '×' => Token::Star,
            '/' | '÷' => Token::Slash,
            '(' => Token::Open,
            ')' => Token::Close,
            other => return Err(CalcError::UnexpectedChar { ch: other, pos }),
        };
        tokens.push(token);
        pos += 1;
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn descend(&mut self) -> Result<(), CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        Ok(())
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Token::Minus => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.unary()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.pos += 1;
                    value *= self.unary()?;
                }
                Token::Slash => {
                    self.pos += 1;
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64, CalcError> {
        self.descend()?;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<f64, CalcError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::Open) => {
                self.descend()?;
                let value = self.expr()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::Close) => Ok(value),
                    Some(other) => Err(CalcError::UnexpectedToken(other.describe())),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(other) => Err(CalcError::UnexpectedToken(other.describe())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

/// Evaluate `+ - * /`, unary signs, parentheses, and decimals.
pub fn evaluate(input: &str) -> Result<f64, CalcError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(CalcError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(extra) = parser.peek() {
        return Err(CalcError::UnexpectedToken(extra.describe()));
    }
    Ok(value)
}

/// Integers print without a fractional part.
pub fn format_result(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let text = format!("{value:.10}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn render(host: &mut ContentHost, tile: &TileInstance, _ctx: &mut TileContext<'_>) -> TileResult<()> {
    let expression = tile.config_str(EXPRESSION).unwrap_or("").trim();
    if expression.is_empty() {
        host.push_line("e.g. (5*3)+2");
        return Ok(());
    }
    host.push_line(expression.to_string());
    match evaluate(expression) {
        Ok(value) => host.push_line(format!("= {}", format_result(value))),
        Err(_) => host.push_line("Error"),
    }
    Ok(())
}

struct CalculatorSettings;

impl TileSettings for CalculatorSettings {
    fn build_settings(
        &self,
        host: &mut SettingsHost,
        tile: &TileInstance,
        _ctx: &SettingsContext<'_>,
    ) -> TileResult<()> {
        host.add_text(EXPRESSION, "Expression", tile.config_str(EXPRESSION).unwrap_or(""));
        Ok(())
    }

    fn save_config(
        &self,
        host: &SettingsHost,
        tile: &mut TileInstance,
        _ctx: &SettingsContext<'_>,
    ) -> TileResult<()> {
        let expression = host.text(EXPRESSION).unwrap_or("").trim();
        tile.config.insert(EXPRESSION.into(), json!(expression));
        Ok(())
    }
}

pub fn definition() -> TileDefinition {
    TileDefinition::from_fn(TYPE_ID, render)
        .with_label("Calculator")
        .with_initial_config(|| {
            let mut config = TileConfig::new();
            config.insert(EXPRESSION.into(), json!(""));
            config
        })
        .with_settings(CalculatorSettings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(evaluate("(5*3)+2").unwrap(), 17.0);
        assert_eq!(evaluate("5*3+2").unwrap(), 17.0);
        assert_eq!(evaluate("2+3*4").unwrap(), 14.0);
        assert_eq!(evaluate("(2+3)*4").unwrap(), 20.0);
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(evaluate("8 / 4 / 2").unwrap(), 1.0);
    }

    #[test]
    fn unary_signs_and_decimals() {
        assert_eq!(evaluate("-3 + 5").unwrap(), 2.0);
        assert_eq!(evaluate("--2").unwrap(), 2.0);
        assert_eq!(evaluate("-(1.5 * 2)").unwrap(), -3.0);
        assert_eq!(evaluate(".5 + .25").unwrap(), 0.75);
    }

    #[test]
    fn rejects_anything_but_arithmetic() {
        assert_eq!(evaluate(""), Err(CalcError::Empty));
        assert_eq!(evaluate("1 / 0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("(1 + 2"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("1 2"), Err(CalcError::UnexpectedToken("2".into())));
        assert!(matches!(
            evaluate("alert(1)"),
            Err(CalcError::UnexpectedChar { ch: 'a', pos: 0 })
        ));
        assert!(matches!(evaluate("1..2"), Err(CalcError::InvalidNumber(_))));
    }

    #[test]
    fn runaway_nesting_is_an_error() {
        assert_eq!(evaluate(&"(".repeat(100_000)), Err(CalcError::TooLong));
        assert_eq!(evaluate(&"(".repeat(4000)), Err(CalcError::TooDeep));
        let signs = format!("{}1", "-".repeat(1000));
        assert_eq!(evaluate(&signs), Err(CalcError::TooDeep));
        let nested = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&nested).unwrap(), 1.0);
    }

    #[test]
    fn results_format_compactly() {
        assert_eq!(format_result(17.0), "17");
        assert_eq!(format_result(0.1 + 0.2), "0.3");
        assert_eq!(format_result(-2.5), "-2.5");
    }
}
