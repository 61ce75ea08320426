//! Tokenizer
//!
//! Two stages. `check_characters` walks the raw source and rejects anything
//! outside the formula alphabet before a single token is built. The `Lexer`
//! then turns the surviving text into tokens; `{field name}` references become
//! `FieldRef` tokens.

use std::iter::Peekable;
use std::str::CharIndices;
use tally_core::FormulaError;

// ============================================================================
// TOKENS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Gt,
    Le,
    Ge,
    StrictEq,
    StrictNe,
    And,
    Or,
    Not,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Star => "*",
            Operator::Slash => "/",
            Operator::Percent => "%",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::StrictEq => "===",
            Operator::StrictNe => "!==",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Not => "!",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    String(String),
    Boolean(bool),
    Identifier(String),
    /// Name between `{` and `}`, trimmed
    FieldRef(String),
    Operator(Operator),
    LParen,
    RParen,
    Comma,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token
    pub text: String,
    /// Byte offset of the token start
    pub position: usize,
}

impl Token {
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of formula".to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}

// ============================================================================
// CHARACTER PRE-PASS
// ============================================================================

fn is_operator_char(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | '%' | '<' | '>' | '=' | '!' | '&' | '|')
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Characters allowed inside `{…}`
pub fn is_field_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | ' ')
}

/// Byte offset of the `}` closing a well-formed reference opened at `open`
pub(crate) fn field_ref_end(source: &str, open: usize) -> Option<usize> {
    for (i, c) in source[open + 1..].char_indices() {
        match c {
            '}' => return Some(open + 1 + i),
            c if is_field_name_char(c) => {}
            _ => return None,
        }
    }
    None
}

/// Byte offset just past the closing quote of a string opened at `open`
pub(crate) fn string_end(source: &str, open: usize) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in source[open + 1..].char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(open + 1 + i + 1),
            _ => {}
        }
    }
    None
}

/// Every character outside the formula alphabet, in source order.
///
/// String literal contents and well-formed `{field name}` references are
/// data and are skipped. `.` is only accepted as a decimal point: followed
/// by a digit and not part of an identifier.
pub fn check_characters(source: &str) -> Vec<FormulaError> {
    let mut errors = Vec::new();
    let mut skip_until = 0;
    let mut in_identifier = false;
    let mut chars = source.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if i < skip_until {
            continue;
        }
        let next = chars.peek().map(|(_, n)| *n);
        match c {
            '"' => {
                // Unterminated strings are left to the tokenizer
                skip_until = string_end(source, i).unwrap_or(source.len());
                in_identifier = false;
            }
            '{' => {
                if let Some(close) = field_ref_end(source, i) {
                    skip_until = close + 1;
                }
                in_identifier = false;
            }
            '.' => {
                let decimal_point = !in_identifier && next.is_some_and(|n| n.is_ascii_digit());
                if !decimal_point {
                    errors.push(FormulaError::disallowed_character(c, i));
                }
            }
            c if is_word_char(c) => {
                if !in_identifier && !c.is_ascii_digit() {
                    in_identifier = true;
                }
                continue;
            }
            c if c.is_whitespace() || is_operator_char(c) => in_identifier = false,
            '(' | ')' | ',' | '}' => in_identifier = false,
            _ => {
                errors.push(FormulaError::disallowed_character(c, i));
                in_identifier = false;
            }
        }
    }
    errors
}

// ============================================================================
// LEXER
// ============================================================================

pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            pos: 0,
        }
    }

    /// Tokenize the entire source; the last token is always `Eof`
    pub fn tokenize(&mut self) -> Result<Vec<Token>, FormulaError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, FormulaError> {
        self.skip_whitespace();
        let start = self.pos;

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some(c) => match c {
                '0'..='9' => self.scan_number()?,
                '.' if self.peek_next_char().is_some_and(|n| n.is_ascii_digit()) => self.scan_number()?,
                '"' => self.scan_string()?,
                '{' => self.scan_field_ref()?,
                '}' => return Err(FormulaError::syntax("Mismatched braces", start)),
                c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),
                '(' => {
                    self.advance();
                    TokenKind::LParen
                }
                ')' => {
                    self.advance();
                    TokenKind::RParen
                }
                ',' => {
                    self.advance();
                    TokenKind::Comma
                }
                c if is_operator_char(c) => TokenKind::Operator(self.scan_operator()?),
                other => return Err(FormulaError::disallowed_character(other, start)),
            },
        };

        Ok(Token {
            kind,
            text: self.source[start..self.pos].to_string(),
            position: start,
        })
    }

    fn scan_number(&mut self) -> Result<TokenKind, FormulaError> {
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(c) = self.peek_char() {
            match c {
                '0'..='9' => {}
                '.' if !seen_dot && self.peek_next_char().is_some_and(|n| n.is_ascii_digit()) => {
                    seen_dot = true;
                }
                _ => break,
            }
            self.advance();
        }
        let text = &self.source[start..self.pos];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| FormulaError::syntax(format!("Invalid number '{}'", text), start))
    }

    fn scan_string(&mut self) -> Result<TokenKind, FormulaError> {
        let start = self.pos;
        self.advance(); // opening quote
        let mut value = String::new();

        loop {
            match self.advance() {
                None => return Err(FormulaError::syntax("Unterminated string", start)),
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c @ ('"' | '\\')) => value.push(c),
                    Some(c) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => return Err(FormulaError::syntax("Unterminated string", start)),
                },
                Some(c) => value.push(c),
            }
        }
        Ok(TokenKind::String(value))
    }

    fn scan_field_ref(&mut self) -> Result<TokenKind, FormulaError> {
        let start = self.pos;
        let closed = self.source[start + 1..]
            .chars()
            .find(|c| matches!(c, '{' | '}'))
            == Some('}');
        if !closed {
            return Err(FormulaError::syntax("Mismatched braces", start));
        }
        self.advance(); // {
        let mut name = String::new();

        loop {
            match self.advance() {
                None | Some('{') => return Err(FormulaError::syntax("Mismatched braces", start)),
                Some('}') => break,
                Some(c) if is_field_name_char(c) => name.push(c),
                Some(c) => {
                    return Err(FormulaError::syntax(
                        format!("Invalid character '{}' in field reference", c),
                        self.pos - c.len_utf8(),
                    ))
                }
            }
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(FormulaError::syntax("Empty field reference", start));
        }
        Ok(TokenKind::FieldRef(name.to_string()))
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if is_word_char(c) {
                self.advance();
            } else {
                break;
            }
        }
        match &self.source[start..self.pos] {
            "true" => TokenKind::Boolean(true),
            "false" => TokenKind::Boolean(false),
            name => TokenKind::Identifier(name.to_string()),
        }
    }

    fn scan_operator(&mut self) -> Result<Operator, FormulaError> {
        let start = self.pos;
        let rest = &self.source[start..];

        let (op, len) = if rest.starts_with("===") {
            (Operator::StrictEq, 3)
        } else if rest.starts_with("!==") {
            (Operator::StrictNe, 3)
        } else if rest.starts_with("==") || rest.starts_with("!=") {
            let want = if rest.starts_with('=') { "===" } else { "!==" };
            return Err(FormulaError::syntax(
                format!("Loose equality is not supported, use '{}'", want),
                start,
            ));
        } else if rest.starts_with("<=") {
            (Operator::Le, 2)
        } else if rest.starts_with(">=") {
            (Operator::Ge, 2)
        } else if rest.starts_with("&&") {
            (Operator::And, 2)
        } else if rest.starts_with("||") {
            (Operator::Or, 2)
        } else {
            let op = match rest.chars().next() {
                Some('+') => Operator::Plus,
                Some('-') => Operator::Minus,
                Some('*') => Operator::Star,
                Some('/') => Operator::Slash,
                Some('%') => Operator::Percent,
                Some('<') => Operator::Lt,
                Some('>') => Operator::Gt,
                Some('!') => Operator::Not,
                Some(c) => return Err(FormulaError::syntax(format!("Unexpected '{}'", c), start)),
                None => return Err(FormulaError::syntax_at_end("Unexpected end of formula")),
            };
            (op, 1)
        };

        for _ in 0..len {
            self.advance();
        }
        Ok(op)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.source[self.pos..].chars();
        iter.next();
        iter.next()
    }

    fn advance(&mut self) -> Option<char> {
        let (i, c) = self.chars.next()?;
        self.pos = i + c.len_utf8();
        Some(c)
    }
}

/// Character pre-pass followed by tokenization; the first problem wins
pub fn tokenize(source: &str) -> Result<Vec<Token>, FormulaError> {
    if let Some(first) = check_characters(source).into_iter().next() {
        return Err(first);
    }
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            kinds("{price} * 1.5 >= .5"),
            vec![
                TokenKind::FieldRef("price".to_string()),
                TokenKind::Operator(Operator::Star),
                TokenKind::Number(1.5),
                TokenKind::Operator(Operator::Ge),
                TokenKind::Number(0.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            kinds(r#""say \"hi\"" === "a\\b""#),
            vec![
                TokenKind::String("say \"hi\"".to_string()),
                TokenKind::Operator(Operator::StrictEq),
                TokenKind::String("a\\b".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_contents_are_data() {
        assert!(check_characters(r#""a; b. [c] `d`""#).is_empty());
        assert_eq!(kinds("\"x.y\"")[0], TokenKind::String("x.y".to_string()));
    }

    #[test]
    fn test_field_names_with_spaces() {
        assert_eq!(kinds("{ Unit Price }")[0], TokenKind::FieldRef("Unit Price".to_string()));
        assert_eq!(kinds("{first-name}")[0], TokenKind::FieldRef("first-name".to_string()));
    }

    #[test]
    fn test_booleans_and_identifiers() {
        assert_eq!(
            kinds("true && flag_2"),
            vec![
                TokenKind::Boolean(true),
                TokenKind::Operator(Operator::And),
                TokenKind::Identifier("flag_2".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("a  +  {b}").unwrap();
        let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 3, 6, 9]);
    }

    #[test]
    fn test_disallowed_characters() {
        let errors = check_characters("{price}; {quantity}");
        assert_eq!(errors, vec![FormulaError::disallowed_character(';', 7)]);
        assert!(check_characters("a ? b : c").len() == 2);
        assert!(!check_characters("`ls`").is_empty());
        assert!(!check_characters("obj[\"prop\"]").is_empty());
        assert!(!check_characters("x = 1; y").is_empty());
    }

    #[test]
    fn test_dot_only_as_decimal_point() {
        assert!(check_characters("1.25 + .5").is_empty());
        assert_eq!(check_characters("obj.prop"), vec![FormulaError::disallowed_character('.', 3)]);
        assert_eq!(check_characters("a.5").len(), 1);
        assert_eq!(check_characters("5.").len(), 1);
    }

    #[test]
    fn test_mismatched_braces() {
        let err = tokenize("{price * {quantity}").unwrap_err();
        assert_eq!(err, FormulaError::syntax("Mismatched braces", 0));
        assert_eq!(tokenize("price}").unwrap_err(), FormulaError::syntax("Mismatched braces", 5));
        assert_eq!(tokenize("{}").unwrap_err(), FormulaError::syntax("Empty field reference", 0));
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(tokenize("\"abc").unwrap_err(), FormulaError::syntax("Unterminated string", 0));
    }

    #[test]
    fn test_loose_operators_rejected() {
        assert!(matches!(tokenize("a == b"), Err(FormulaError::Syntax { .. })));
        assert!(matches!(tokenize("a != b"), Err(FormulaError::Syntax { .. })));
        assert!(matches!(tokenize("a = b"), Err(FormulaError::Syntax { .. })));
        assert!(matches!(tokenize("a & b"), Err(FormulaError::Syntax { .. })));
        assert!(matches!(tokenize("a | b"), Err(FormulaError::Syntax { .. })));
    }
}
