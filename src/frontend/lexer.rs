//! Hand-rolled tokeniser for the demo front end.

use std::path::Path;

use crate::error::{CompileError, CompileResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Int(i32),
    Ident(String),
    Kw(&'static str),
    Sym(&'static str),
    Eof,
}

#[derive(Clone, Debug)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
    pub column: u32,
}

const KEYWORDS: &[&str] = &["int", "while", "if", "else", "read", "print"];

pub fn lex(path: &Path, source: &str) -> CompileResult<Vec<Spanned>> {
    let mut out = Vec::new();
    let mut line = 1u32;
    let mut column = 1u32;
    let bytes: Vec<char> = source.chars().collect();
    let mut i = 0usize;

    macro_rules! err {
        ($msg:expr) => {
            return Err(CompileError::Syntax {
                path: path.to_path_buf(),
                line,
                column,
                message: $msg.to_string(),
            })
        };
    }

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            '\n' => {
                line += 1;
                column = 1;
                i += 1;
            }
            c if c.is_whitespace() => {
                column += 1;
                i += 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                let start_col = column;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                    column += 1;
                }
                let text: String = bytes[start..i].iter().collect();
                let value: i32 = text
                    .parse()
                    .map_err(|_| CompileError::Syntax {
                        path: path.to_path_buf(),
                        line,
                        column: start_col,
                        message: format!("integer literal out of range: {text}"),
                    })?;
                out.push(Spanned {
                    token: Token::Int(value),
                    line,
                    column: start_col,
                });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                let start_col = column;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == '_') {
                    i += 1;
                    column += 1;
                }
                let text: String = bytes[start..i].iter().collect();
                let token = match KEYWORDS.iter().find(|&&k| k == text) {
                    Some(&k) => Token::Kw(k),
                    None => Token::Ident(text),
                };
                out.push(Spanned {
                    token,
                    line,
                    column: start_col,
                });
            }
            _ => {
                let start_col = column;
                let two: Option<&'static str> = if i + 1 < bytes.len() {
                    match (c, bytes[i + 1]) {
                        ('=', '=') => Some("=="),
                        ('!', '=') => Some("!="),
                        ('<', '=') => Some("<="),
                        ('>', '=') => Some(">="),
                        _ => None,
                    }
                } else {
                    None
                };
                if let Some(sym) = two {
                    out.push(Spanned {
                        token: Token::Sym(sym),
                        line,
                        column: start_col,
                    });
                    i += 2;
                    column += 2;
                    continue;
                }
                let one: &'static str = match c {
                    '=' => "=",
                    '+' => "+",
                    '-' => "-",
                    '(' => "(",
                    ')' => ")",
                    '{' => "{",
                    '}' => "}",
                    '[' => "[",
                    ']' => "]",
                    ';' => ";",
                    '<' => "<",
                    '>' => ">",
                    _ => err!(format!("unexpected character '{c}'")),
                };
                out.push(Spanned {
                    token: Token::Sym(one),
                    line,
                    column: start_col,
                });
                i += 1;
                column += 1;
            }
        }
    }

    out.push(Spanned {
        token: Token::Eof,
        line,
        column,
    });
    Ok(out)
}
