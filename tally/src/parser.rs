//! Recursive descent parser
//!
//! Precedence, loosest first: `||`, `&&`, `=== !==`, `< > <= >=`, `+ -`,
//! `* / %`, unary `- !`. All binary operators are left associative.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::config::EngineConfig;
use crate::functions::Function;
use crate::lexer::{tokenize, Operator, Token, TokenKind};
use tally_core::FormulaError;

// One table per precedence level, loosest first
static OR: [(Operator, BinaryOp); 1] = [(Operator::Or, BinaryOp::Or)];
static AND: [(Operator, BinaryOp); 1] = [(Operator::And, BinaryOp::And)];
static EQUALITY: [(Operator, BinaryOp); 2] = [
    (Operator::StrictEq, BinaryOp::StrictEq),
    (Operator::StrictNe, BinaryOp::StrictNe),
];
static RELATIONAL: [(Operator, BinaryOp); 4] = [
    (Operator::Lt, BinaryOp::Lt),
    (Operator::Gt, BinaryOp::Gt),
    (Operator::Le, BinaryOp::Le),
    (Operator::Ge, BinaryOp::Ge),
];
static ADDITIVE: [(Operator, BinaryOp); 2] = [(Operator::Plus, BinaryOp::Add), (Operator::Minus, BinaryOp::Sub)];
static MULTIPLICATIVE: [(Operator, BinaryOp); 3] = [
    (Operator::Star, BinaryOp::Mul),
    (Operator::Slash, BinaryOp::Div),
    (Operator::Percent, BinaryOp::Mod),
];

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

/// Length check, character pre-pass, tokenize, parse
pub fn parse(source: &str, config: &EngineConfig) -> Result<Expr, FormulaError> {
    if source.len() > config.max_length {
        return Err(FormulaError::limit(format!(
            "formula is {} bytes, the maximum is {}",
            source.len(),
            config.max_length
        )));
    }
    let tokens = tokenize(source)?;
    Parser::new(&tokens, config)?.parse()
}

impl<'a> Parser<'a> {
    /// `tokens` must end with `Eof`, as produced by the lexer
    pub fn new(tokens: &'a [Token], config: &EngineConfig) -> Result<Self, FormulaError> {
        let count = tokens.len().saturating_sub(1);
        if count > config.max_tokens {
            return Err(FormulaError::limit(format!(
                "formula has {} tokens, the maximum is {}",
                count, config.max_tokens
            )));
        }
        Ok(Self {
            tokens,
            pos: 0,
            depth: 0,
            max_depth: config.max_depth,
        })
    }

    pub fn parse(mut self) -> Result<Expr, FormulaError> {
        if self.at_eof() {
            return Err(FormulaError::syntax_at_end("Empty formula"));
        }
        let expr = self.parse_expr()?;
        let next = self.peek();
        match next.kind {
            TokenKind::Eof => Ok(expr),
            TokenKind::LParen => Err(call_construct()),
            TokenKind::RParen => Err(FormulaError::syntax("Mismatched parentheses", next.position)),
            _ => Err(unexpected(next)),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, FormulaError> {
        self.enter()?;
        let expr = self.parse_or();
        self.depth -= 1;
        expr
    }

    fn parse_or(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_and()?;
        while let Some(op) = self.eat_binary(&OR) {
            let right = self.parse_and()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_equality()?;
        while let Some(op) = self.eat_binary(&AND) {
            let right = self.parse_equality()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_relational()?;
        while let Some(op) = self.eat_binary(&EQUALITY) {
            let right = self.parse_relational()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_additive()?;
        while let Some(op) = self.eat_binary(&RELATIONAL) {
            let right = self.parse_additive()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_multiplicative()?;
        while let Some(op) = self.eat_binary(&ADDITIVE) {
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.eat_binary(&MULTIPLICATIVE) {
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, FormulaError> {
        let op = match self.eat_operator(&[Operator::Minus, Operator::Not]) {
            Some(Operator::Minus) => UnaryOp::Neg,
            Some(_) => UnaryOp::Not,
            None => return self.parse_primary(),
        };
        self.enter()?;
        let operand = self.parse_unary();
        self.depth -= 1;
        Ok(Expr::unary(op, operand?))
    }

    fn parse_primary(&mut self) -> Result<Expr, FormulaError> {
        let token = self.advance();
        let expr = match &token.kind {
            TokenKind::Number(n) => Expr::Number(*n),
            TokenKind::String(s) => Expr::Text(s.clone()),
            TokenKind::Boolean(b) => Expr::Bool(*b),
            TokenKind::FieldRef(name) => Expr::FieldRef(name.clone()),
            TokenKind::Identifier(name) if self.peek().kind == TokenKind::LParen => {
                return self.parse_call(name);
            }
            TokenKind::Identifier(name) => Expr::Identifier(name.clone()),
            TokenKind::LParen => {
                let open = token.position;
                let inner = self.parse_expr()?;
                if self.peek().kind != TokenKind::RParen {
                    return Err(FormulaError::syntax("Mismatched parentheses", open));
                }
                self.advance();
                inner
            }
            TokenKind::RParen => return Err(FormulaError::syntax("Mismatched parentheses", token.position)),
            TokenKind::Eof => return Err(FormulaError::syntax_at_end("Unexpected end of formula")),
            _ => return Err(unexpected(token)),
        };

        // Invoking anything but a whitelisted name: `(a)(b)`, `1(2)`
        if self.peek().kind == TokenKind::LParen {
            return Err(call_construct());
        }
        Ok(expr)
    }

    fn parse_call(&mut self, name: &str) -> Result<Expr, FormulaError> {
        let function = Function::from_name(name)
            .ok_or_else(|| FormulaError::security(format!("Function calls are not allowed: {}", name)))?;
        let open = self.advance().position;

        self.enter()?;
        let mut args = Vec::new();
        if self.peek().kind != TokenKind::RParen {
            loop {
                args.push(self.parse_or()?);
                match self.peek().kind {
                    TokenKind::Comma => {
                        self.advance();
                    }
                    TokenKind::RParen => break,
                    TokenKind::Eof => return Err(FormulaError::syntax("Mismatched parentheses", open)),
                    _ => return Err(unexpected(self.peek())),
                }
            }
        }
        self.advance(); // )
        self.depth -= 1;

        function.check_arity(args.len())?;
        if self.peek().kind == TokenKind::LParen {
            return Err(call_construct());
        }
        Ok(Expr::Call { function, args })
    }

    // ========== Token helpers ==========

    fn enter(&mut self) -> Result<(), FormulaError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(FormulaError::limit(format!(
                "nesting deeper than {} levels",
                self.max_depth
            )));
        }
        Ok(())
    }

    fn peek(&self) -> &'a Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn at_eof(&self) -> bool {
        self.tokens.is_empty() || self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> &'a Token {
        let token = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat_binary(&mut self, table: &[(Operator, BinaryOp)]) -> Option<BinaryOp> {
        let TokenKind::Operator(op) = self.peek().kind else {
            return None;
        };
        let (_, binary) = table.iter().find(|(candidate, _)| *candidate == op)?;
        self.advance();
        Some(*binary)
    }

    fn eat_operator(&mut self, ops: &[Operator]) -> Option<Operator> {
        match self.peek().kind {
            TokenKind::Operator(op) if ops.contains(&op) => {
                self.advance();
                Some(op)
            }
            _ => None,
        }
    }
}

fn call_construct() -> FormulaError {
    FormulaError::security("Call expressions are not allowed")
}

fn unexpected(token: &Token) -> FormulaError {
    match token.kind {
        TokenKind::Eof => FormulaError::syntax_at_end("Unexpected end of formula"),
        _ => FormulaError::syntax(format!("Unexpected token {}", token.describe()), token.position),
    }
}
