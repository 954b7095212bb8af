//! Parser for the emitted rule text. The renderer and this parser agree on
//! one grammar, so any rule file the pipeline writes can be read back into
//! the same expression tree.

use crate::rules::expr::{BoolExpr, Operand, Path, Rule};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RuleParseError {
    #[error("unexpected character '{ch}' at byte {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("unterminated quoted segment starting at byte {pos}")]
    UnterminatedQuote { pos: usize },
    #[error("unexpected {found}, expected {expected}")]
    UnexpectedToken { found: String, expected: String },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: String },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Quoted(String),
    LParen,
    RParen,
    Comma,
    Dot,
    Semi,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "identifier '{s}'"),
            Token::Quoted(s) => write!(f, "quoted segment '{s}'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
            Token::Dot => f.write_str("'.'"),
            Token::Semi => f.write_str("';'"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, RuleParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            ';' => {
                chars.next();
                tokens.push(Token::Semi);
            }
            '\'' => {
                chars.next();
                let mut segment = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\'')) => break,
                        Some((_, c)) => segment.push(c),
                        None => return Err(RuleParseError::UnterminatedQuote { pos }),
                    }
                }
                tokens.push(Token::Quoted(segment));
            }
            c if c.is_ascii_alphabetic() => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            c => return Err(RuleParseError::UnexpectedChar { ch: c, pos }),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self, expected: &str) -> Result<Token, RuleParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| RuleParseError::UnexpectedEnd {
                expected: expected.to_string(),
            })?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, want: Token) -> Result<(), RuleParseError> {
        let found = self.next(&want.to_string())?;
        if found == want {
            Ok(())
        } else {
            Err(RuleParseError::UnexpectedToken {
                found: found.to_string(),
                expected: want.to_string(),
            })
        }
    }

    fn parse_ruleset(&mut self) -> Result<Vec<Rule>, RuleParseError> {
        let mut rules = Vec::new();
        loop {
            // Trailing and repeated separators are tolerated.
            while self.peek() == Some(&Token::Semi) {
                self.pos += 1;
            }
            if self.peek().is_none() {
                break;
            }
            rules.push(self.parse_rule()?);
        }
        Ok(rules)
    }

    fn parse_rule(&mut self) -> Result<Rule, RuleParseError> {
        let left = self.parse_bool_expr()?;
        if let Some(Token::Ident(ident)) = self.peek() {
            if ident == "Excludes" {
                self.pos += 1;
                let right = self.parse_bool_expr()?;
                return Ok(Rule::excludes(left, right));
            }
        }
        Ok(Rule::plain(left))
    }

    fn parse_bool_expr(&mut self) -> Result<BoolExpr, RuleParseError> {
        let token = self.next("'AllTrue' or 'AnyTrue'")?;
        let all = match &token {
            Token::Ident(s) if s == "AllTrue" => true,
            Token::Ident(s) if s == "AnyTrue" => false,
            other => {
                return Err(RuleParseError::UnexpectedToken {
                    found: other.to_string(),
                    expected: "'AllTrue' or 'AnyTrue'".to_string(),
                })
            }
        };
        self.expect(Token::LParen)?;
        let mut operands = vec![self.parse_operand()?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            operands.push(self.parse_operand()?);
        }
        self.expect(Token::RParen)?;
        Ok(if all {
            BoolExpr::AllTrue(operands)
        } else {
            BoolExpr::AnyTrue(operands)
        })
    }

    fn parse_operand(&mut self) -> Result<Operand, RuleParseError> {
        match self.peek() {
            Some(Token::Ident(_)) => Ok(Operand::Expr(self.parse_bool_expr()?)),
            Some(Token::Quoted(_)) => Ok(Operand::Path(self.parse_path()?)),
            Some(other) => Err(RuleParseError::UnexpectedToken {
                found: other.to_string(),
                expected: "a boolean expression or a quoted path".to_string(),
            }),
            None => Err(RuleParseError::UnexpectedEnd {
                expected: "a boolean expression or a quoted path".to_string(),
            }),
        }
    }

    fn parse_path(&mut self) -> Result<Path, RuleParseError> {
        let mut segments = Vec::new();
        loop {
            match self.next("a quoted segment")? {
                Token::Quoted(s) => segments.push(s),
                other => {
                    return Err(RuleParseError::UnexpectedToken {
                        found: other.to_string(),
                        expected: "a quoted segment".to_string(),
                    })
                }
            }
            if self.peek() == Some(&Token::Dot) {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(Path { segments })
    }
}

/// Parse rule text (one or more `;`-separated rules) back into the tree.
pub fn parse_ruleset(input: &str) -> Result<Vec<Rule>, RuleParseError> {
    let tokens = tokenize(input)?;
    Parser { tokens, pos: 0 }.parse_ruleset()
}
