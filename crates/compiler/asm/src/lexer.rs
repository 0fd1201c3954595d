//! Tokens of the assembly language.
//!
//! Newlines are significant (one instruction per line), every other run of
//! whitespace is skipped. Comments run from `;` to the end of the line and
//! are kept as tokens so the module header can be read back.

use logos::Logos;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
pub enum LexingError {
    #[default]
    #[error("unrecognized token")]
    UnexpectedCharacter,
    #[error("integer literal out of range")]
    NumberOutOfRange,
    #[error("invalid escape sequence in string literal")]
    InvalidEscape,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+")]
#[logos(error = LexingError)]
pub enum Token<'a> {
    #[regex(r";[^\n]*", |lex| lex.slice()[1..].trim())]
    Comment(&'a str),

    #[token("\n")]
    Newline,

    #[token("=")]
    Equals,

    /// `%name` or `%42`, without the sigil
    #[regex(r"%[A-Za-z0-9_.]+", |lex| &lex.slice()[1..])]
    IdRef(&'a str),

    /// Opcode names, enumerants and `A|B` masks
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*(\|[A-Za-z_][A-Za-z0-9_]*)*")]
    Word(&'a str),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().map_err(|_| LexingError::NumberOutOfRange))]
    Integer(i64),

    #[regex(r"0x[0-9a-fA-F]+", |lex| u64::from_str_radix(&lex.slice()[2..], 16).map_err(|_| LexingError::NumberOutOfRange))]
    HexInteger(u64),

    #[regex(r"-?[0-9]+\.[0-9]+([eE][-+]?[0-9]+)?", |lex| lex.slice().parse::<f64>().map_err(|_| LexingError::NumberOutOfRange))]
    Float(f64),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    String(String),
}

fn unescape(quoted: &str) -> Result<String, LexingError> {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped @ ('"' | '\\')) => out.push(escaped),
                _ => return Err(LexingError::InvalidEscape),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Comment(_) => write!(f, "comment"),
            Self::Newline => write!(f, "end of line"),
            Self::Equals => write!(f, "'='"),
            Self::IdRef(name) => write!(f, "%{name}"),
            Self::Word(word) => write!(f, "{word}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::HexInteger(value) => write!(f, "{value:#x}"),
            Self::Float(value) => write!(f, "{value:?}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Result<Token<'_>, LexingError>> {
        Token::lexer(input).collect()
    }

    #[test]
    fn test_instruction_line() {
        assert_eq!(
            lex("%v = OpVariable %ptr Function ; local\n"),
            vec![
                Ok(Token::IdRef("v")),
                Ok(Token::Equals),
                Ok(Token::Word("OpVariable")),
                Ok(Token::IdRef("ptr")),
                Ok(Token::Word("Function")),
                Ok(Token::Comment("local")),
                Ok(Token::Newline),
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            lex(r#"-5 0x1F 1.5 "a\"b" Volatile|Aligned"#),
            vec![
                Ok(Token::Integer(-5)),
                Ok(Token::HexInteger(31)),
                Ok(Token::Float(1.5)),
                Ok(Token::String("a\"b".to_string())),
                Ok(Token::Word("Volatile|Aligned")),
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(lex("#"), vec![Err(LexingError::UnexpectedCharacter)]);
        assert_eq!(
            lex("99999999999999999999"),
            vec![Err(LexingError::NumberOutOfRange)]
        );
    }
}
