//! Restricted arithmetic formulas used to score number questions.
//!
//! Grammar (whitespace insensitive):
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := NUMBER | 'answer' | FUNCTION '(' expr (',' expr)* ')' | '(' expr ')'
//! ```
//!
//! `FUNCTION` is one of `abs`, `min`, `max`, `round`. The only free variable is
//! `answer`.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Maximum nesting of parentheses, unary operators and calls.
pub const MAX_DEPTH: usize = 64;

/// Reasons a formula cannot be parsed or evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// A character outside the formula alphabet.
    #[error("unexpected character `{found}` at offset {offset}")]
    UnexpectedChar {
        /// Offending character.
        found: char,
        /// Byte offset inside the formula.
        offset: usize,
    },
    /// A numeric literal that does not parse.
    #[error("invalid number literal `{0}`")]
    InvalidNumber(String),
    /// An identifier other than `answer` used as a value.
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),
    /// A call to a function outside the allow-list.
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    /// The formula stopped in the middle of an expression.
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    /// A token that does not fit the grammar at its position.
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    /// Nesting exceeded [`MAX_DEPTH`].
    #[error("formula nests deeper than {} levels", MAX_DEPTH)]
    TooDeep,
    /// Wrong number of arguments for a function.
    #[error("`{function}` expects {expected} argument(s), got {got}")]
    Arity {
        /// Function name.
        function: &'static str,
        /// Human readable arity.
        expected: &'static str,
        /// Number of arguments supplied.
        got: usize,
    },
    /// An argument outside the domain of a function.
    #[error("invalid argument for `{0}`")]
    InvalidArgument(&'static str),
    /// Division with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,
    /// Evaluation produced an infinite or NaN value.
    #[error("formula produced a non-finite value")]
    NonFinite,
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

/// Functions callable from a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// Absolute value of one argument.
    Abs,
    /// Smallest of one or more arguments.
    Min,
    /// Largest of one or more arguments.
    Max,
    /// Round half to even, with an optional number of digits.
    Round,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "abs" => Some(Self::Abs),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "round" => Some(Self::Round),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Min => "min",
            Self::Max => "max",
            Self::Round => "round",
        }
    }
}

/// Typed syntax tree of a formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// The submitted answer.
    Answer,
    /// Unary minus.
    Neg(Box<Expr>),
    /// Binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// Call of an allow-listed function.
    Call {
        /// Called function.
        function: Function,
        /// Arguments in call order.
        args: Vec<Expr>,
    },
}

/// A parsed formula, ready to be evaluated against numeric answers.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: Expr,
}

impl Formula {
    /// Parse `source` into a formula.
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.expression()?;
        if let Some(token) = parser.peek() {
            return Err(FormulaError::UnexpectedToken(token.to_string()));
        }
        Ok(Self { expr })
    }

    /// Syntax tree of the formula.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate the formula with `answer` bound to the submitted value.
    pub fn eval(&self, answer: f64) -> Result<f64, FormulaError> {
        let value = eval_expr(&self.expr, answer)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormulaError::NonFinite)
        }
    }
}

impl FromStr for Formula {
    type Err = FormulaError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::parse(source)
    }
}

fn eval_expr(expr: &Expr, answer: f64) -> Result<f64, FormulaError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Answer => Ok(answer),
        Expr::Neg(inner) => Ok(-eval_expr(inner, answer)?),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval_expr(lhs, answer)?;
            let rhs = eval_expr(rhs, answer)?;
            match op {
                BinaryOp::Add => Ok(lhs + rhs),
                BinaryOp::Sub => Ok(lhs - rhs),
                BinaryOp::Mul => Ok(lhs * rhs),
                BinaryOp::Div if rhs == 0.0 => Err(FormulaError::DivisionByZero),
                BinaryOp::Div => Ok(lhs / rhs),
            }
        }
        Expr::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| eval_expr(arg, answer))
                .collect::<Result<Vec<_>, _>>()?;
            call(*function, &values)
        }
    }
}

fn call(function: Function, args: &[f64]) -> Result<f64, FormulaError> {
    let arity = |expected: &'static str| FormulaError::Arity {
        function: function.name(),
        expected,
        got: args.len(),
    };

    match function {
        Function::Abs => match args {
            [value] => Ok(value.abs()),
            _ => Err(arity("1")),
        },
        Function::Min => args
            .iter()
            .copied()
            .reduce(f64::min)
            .ok_or_else(|| arity("at least 1")),
        Function::Max => args
            .iter()
            .copied()
            .reduce(f64::max)
            .ok_or_else(|| arity("at least 1")),
        Function::Round => match args {
            [value] => Ok(value.round_ties_even()),
            [value, digits] => round_to(*value, *digits),
            _ => Err(arity("1 or 2")),
        },
    }
}

fn round_to(value: f64, digits: f64) -> Result<f64, FormulaError> {
    if digits.fract() != 0.0 || !(-308.0..=308.0).contains(&digits) {
        return Err(FormulaError::InvalidArgument("round"));
    }

    let digits = digits as i32;
    let factor = 10f64.powi(digits.abs());
    let rounded = if digits >= 0 {
        let scaled = value * factor;
        if !scaled.is_finite() {
            return Ok(value);
        }
        scaled.round_ties_even() / factor
    } else {
        (value / factor).round_ties_even() * factor
    };
    Ok(rounded)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(value) => write!(f, "`{value}`"),
            Token::Ident(name) => write!(f, "`{name}`"),
            Token::Plus => f.write_str("`+`"),
            Token::Minus => f.write_str("`-`"),
            Token::Star => f.write_str("`*`"),
            Token::Slash => f.write_str("`/`"),
            Token::LParen => f.write_str("`(`"),
            Token::RParen => f.write_str("`)`"),
            Token::Comma => f.write_str("`,`"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' | '-' | '*' | '/' | '(' | ')' | ',' => {
                chars.next();
                tokens.push(match ch {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    _ => Token::Comma,
                });
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = offset;
                let mut previous = ' ';
                while let Some(&(idx, c)) = chars.peek() {
                    let exponent_sign = (c == '+' || c == '-') && matches!(previous, 'e' | 'E');
                    if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
                        end = idx + c.len_utf8();
                        previous = c;
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &source[offset..end];
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| FormulaError::InvalidNumber(literal.to_owned()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = offset;
                while let Some(&(idx, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        end = idx + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(source[offset..end].to_owned()));
            }
            found => return Err(FormulaError::UnexpectedChar { found, offset }),
        }
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

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), FormulaError> {
        match self.bump() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(FormulaError::UnexpectedToken(token.to_string())),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn nested<T>(
        &mut self,
        inner: impl FnOnce(&mut Self) -> Result<T, FormulaError>,
    ) -> Result<T, FormulaError> {
        if self.depth >= MAX_DEPTH {
            return Err(FormulaError::TooDeep);
        }
        self.depth += 1;
        let result = inner(self);
        self.depth -= 1;
        result
    }

    fn expression(&mut self) -> Result<Expr, FormulaError> {
        self.nested(|parser| {
            let mut lhs = parser.term()?;
            loop {
                let op = match parser.peek() {
                    Some(Token::Plus) => BinaryOp::Add,
                    Some(Token::Minus) => BinaryOp::Sub,
                    _ => return Ok(lhs),
                };
                parser.bump();
                let rhs = parser.term()?;
                lhs = Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                };
            }
        })
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.bump();
                let inner = self.nested(Self::unary)?;
                Ok(Expr::Neg(Box::new(inner)))
            }
            Some(Token::Plus) => {
                self.bump();
                self.nested(Self::unary)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        match self.bump() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    let function = Function::lookup(&name)
                        .ok_or_else(|| FormulaError::UnknownFunction(name.clone()))?;
                    self.bump();
                    let args = self.nested(Self::arguments)?;
                    Ok(Expr::Call { function, args })
                } else if name == "answer" {
                    Ok(Expr::Answer)
                } else {
                    Err(FormulaError::UnknownIdentifier(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(token) => Err(FormulaError::UnexpectedToken(token.to_string())),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, FormulaError> {
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            self.bump();
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            match self.bump() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                Some(token) => return Err(FormulaError::UnexpectedToken(token.to_string())),
                None => return Err(FormulaError::UnexpectedEnd),
            }
        }
    }
}
