//! Parser for the right-hand side of `dy/dx = f(x, y)`.
//!
//! Only a fixed vocabulary is accepted: the variables `x` and `y`, the constants
//! `pi` and `e`, the functions listed in [`Function::ALL`], numeric literals,
//! `+ - * / **` and parentheses. Names are resolved while parsing, so an [`Expr`]
//! can never refer to anything outside that vocabulary.

use crate::traits::Scalar;
use std::fmt;
use thiserror::Error;

/// Limit on tree depth: parentheses, unary signs, calls and every binary operator count.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("Expression is empty")]
    Empty,
    #[error("Unexpected character '{found}' at position {position}")]
    UnexpectedCharacter { found: char, position: usize },
    #[error("Invalid number '{text}' at position {position}")]
    InvalidNumber { text: String, position: usize },
    #[error("Unexpected {found} at position {position}")]
    UnexpectedToken { found: String, position: usize },
    #[error("Unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: String },
    #[error("Unknown identifier '{name}' at position {position}")]
    UnknownIdentifier { name: String, position: usize },
    #[error("'{name}' at position {position} is not a function")]
    NotCallable { name: String, position: usize },
    #[error("Function '{name}' at position {position} must be called, e.g. {name}(x)")]
    MissingCall { name: String, position: usize },
    #[error("Function '{name}' takes exactly one argument, got {count}")]
    Arity { name: String, count: usize },
    #[error("Expression is nested too deeply")]
    TooDeep,
    #[error("Evaluation failed: {0}")]
    Evaluation(String),
}

type ParseResult<T> = Result<T, ExpressionError>;

/// Independent variables of the equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    X,
    Y,
}

impl Variable {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "x" => Some(Self::X),
            "y" => Some(Self::Y),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    Pi,
    E,
}

impl Constant {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pi" => Some(Self::Pi),
            "e" => Some(Self::E),
            _ => None,
        }
    }

    pub fn value(self) -> f64 {
        match self {
            Self::Pi => std::f64::consts::PI,
            Self::E => std::f64::consts::E,
        }
    }
}

/// Functions callable from an expression. Each takes exactly one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Exp,
    Log,
    Sqrt,
    Abs,
    Arcsin,
    Arccos,
    Arctan,
    Sinh,
    Cosh,
    Tanh,
}

impl Function {
    pub const ALL: [Function; 13] = [
        Function::Sin,
        Function::Cos,
        Function::Tan,
        Function::Exp,
        Function::Log,
        Function::Sqrt,
        Function::Abs,
        Function::Arcsin,
        Function::Arccos,
        Function::Arctan,
        Function::Sinh,
        Function::Cosh,
        Function::Tanh,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|func| func.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Sqrt => "sqrt",
            Self::Abs => "abs",
            Self::Arcsin => "arcsin",
            Self::Arccos => "arccos",
            Self::Arctan => "arctan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
        }
    }

    /// Applies the function with IEEE semantics: out-of-domain inputs give NaN,
    /// poles give an infinity.
    pub fn apply<T: Scalar>(self, value: T) -> T {
        match self {
            Self::Sin => value.sin(),
            Self::Cos => value.cos(),
            Self::Tan => value.tan(),
            Self::Exp => value.exp(),
            // Natural logarithm.
            Self::Log => value.ln(),
            Self::Sqrt => value.sqrt(),
            Self::Abs => value.abs(),
            Self::Arcsin => value.asin(),
            Self::Arccos => value.acos(),
            Self::Arctan => value.atan(),
            Self::Sinh => value.sinh(),
            Self::Cosh => value.cosh(),
            Self::Tanh => value.tanh(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
}

impl UnaryOp {
    pub fn apply<T: Scalar>(self, value: T) -> T {
        match self {
            Self::Neg => -value,
            Self::Plus => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn apply<T: Scalar>(self, a: T, b: T) -> T {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
            Self::Pow => a.powf(b),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "**",
        }
    }
}

/// Abstract syntax tree of a parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(Variable),
    Constant(Constant),
    Unary(UnaryOp, Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Call(Function, Box<Expr>),
}

impl Expr {
    /// Evaluates the expression at a single point.
    pub fn eval_point<T: Scalar>(&self, x: T, y: T) -> T {
        match self {
            Expr::Number(n) => T::from_f64(*n).unwrap_or_else(T::nan),
            Expr::Variable(Variable::X) => x,
            Expr::Variable(Variable::Y) => y,
            Expr::Constant(c) => T::from_f64(c.value()).unwrap_or_else(T::nan),
            Expr::Unary(op, operand) => op.apply(operand.eval_point(x, y)),
            Expr::Binary(left, op, right) => {
                op.apply(left.eval_point(x, y), right.eval_point(x, y))
            }
            Expr::Call(func, arg) => func.apply(arg.eval_point(x, y)),
        }
    }

    /// True when the expression references neither `x` nor `y`.
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Number(_) | Expr::Constant(_) => true,
            Expr::Variable(_) => false,
            Expr::Unary(_, operand) => operand.is_constant(),
            Expr::Binary(left, _, right) => left.is_constant() && right.is_constant(),
            Expr::Call(_, arg) => arg.is_constant(),
        }
    }
}

impl fmt::Display for Expr {
    /// Fully parenthesised form, mostly useful in logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Variable(Variable::X) => write!(f, "x"),
            Expr::Variable(Variable::Y) => write!(f, "y"),
            Expr::Constant(Constant::Pi) => write!(f, "pi"),
            Expr::Constant(Constant::E) => write!(f, "e"),
            Expr::Unary(UnaryOp::Neg, operand) => write!(f, "(-{operand})"),
            Expr::Unary(UnaryOp::Plus, operand) => write!(f, "(+{operand})"),
            Expr::Binary(left, op, right) => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Call(func, arg) => write!(f, "{}({arg})", func.name()),
        }
    }
}

// --- Tokenizer ---

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    LParen,
    RParen,
    Comma,
    /// A character outside the grammar; reported when the parser reaches it.
    Invalid(char),
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number {n}"),
            TokenKind::Identifier(name) => format!("identifier '{name}'"),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::DoubleStar => "'**'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Invalid(c) => format!("'{c}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    position: usize,
}

fn tokenize(input: &str) -> ParseResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || (c == '.' && starts_with_digit(&input[position + 1..])) {
            let mut end = position;
            let mut seen_dot = false;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_ascii_digit() || (d == '.' && !seen_dot) {
                    seen_dot |= d == '.';
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            // Exponent, only when digits actually follow the marker.
            let rest = &input[end..];
            let exponent_len = exponent_length(rest);
            if exponent_len > 0 {
                end += exponent_len;
                while chars.peek().is_some_and(|&(i, _)| i < end) {
                    chars.next();
                }
            }
            let text = &input[position..end];
            let value = text
                .parse::<f64>()
                .map_err(|_| ExpressionError::InvalidNumber {
                    text: text.to_string(),
                    position,
                })?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                position,
            });
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Identifier(ident),
                position,
            });
        } else {
            chars.next();
            let kind = match c {
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                '*' => {
                    if chars.peek().is_some_and(|&(_, d)| d == '*') {
                        chars.next();
                        TokenKind::DoubleStar
                    } else {
                        TokenKind::Star
                    }
                }
                '/' => TokenKind::Slash,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                ',' => TokenKind::Comma,
                other => TokenKind::Invalid(other),
            };
            tokens.push(Token { kind, position });
        }
    }
    Ok(tokens)
}

fn starts_with_digit(rest: &str) -> bool {
    rest.chars().next().is_some_and(|d| d.is_ascii_digit())
}

/// Length in bytes of an exponent suffix such as `e-3` at the start of `rest`, or 0.
fn exponent_length(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    if !matches!(bytes.first(), Some(b'e') | Some(b'E')) {
        return 0;
    }
    let mut idx = 1;
    if matches!(bytes.get(idx), Some(b'+') | Some(b'-')) {
        idx += 1;
    }
    let digits = bytes[idx..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        0
    } else {
        idx + digits
    }
}

// --- Parser ---

/// Parses a string expression into an AST.
pub fn parse(input: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExpressionError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_expression()?;
    if let Some(token) = parser.consume() {
        return Err(unexpected(token));
    }
    Ok(expr)
}

fn unexpected(token: Token) -> ExpressionError {
    match token.kind {
        TokenKind::Invalid(found) => ExpressionError::UnexpectedCharacter {
            found,
            position: token.position,
        },
        other => ExpressionError::UnexpectedToken {
            found: other.describe(),
            position: token.position,
        },
    }
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

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep);
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn expect_rparen(&mut self) -> ParseResult<()> {
        match self.consume() {
            Some(Token {
                kind: TokenKind::RParen,
                ..
            }) => Ok(()),
            Some(token) => Err(unexpected(token)),
            None => Err(ExpressionError::UnexpectedEnd {
                expected: "')'".to_string(),
            }),
        }
    }

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.enter()?;
        let result = self.parse_sum();
        self.leave();
        result
    }

    fn parse_sum(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_term()?;
        // A chain builds a left-leaning tree, one level per operator.
        let mut chained = 0;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.consume();
            self.enter()?;
            chained += 1;
            let right = self.parse_term()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        // A chain builds a left-leaning tree, one level per operator.
        let mut chained = 0;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.consume();
            self.enter()?;
            chained += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek_kind() {
            Some(TokenKind::Minus) => UnaryOp::Neg,
            Some(TokenKind::Plus) => UnaryOp::Plus,
            _ => return self.parse_power(),
        };
        self.consume();
        self.enter()?;
        let operand = self.parse_unary();
        self.leave();
        Ok(Expr::Unary(op, Box::new(operand?)))
    }

    /// `a ** b` is right-associative and binds tighter than a sign on its left,
    /// so `-x**2` is `-(x**2)` while `2**-1` is allowed.
    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_primary()?;
        if let Some(TokenKind::DoubleStar) = self.peek_kind() {
            self.consume();
            self.enter()?;
            let exponent = self.parse_unary();
            self.leave();
            return Ok(Expr::Binary(Box::new(base), BinaryOp::Pow, Box::new(exponent?)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let Some(token) = self.consume() else {
            return Err(ExpressionError::UnexpectedEnd {
                expected: "a number, name or '('".to_string(),
            });
        };
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Identifier(name) => self.parse_identifier(name, token.position),
            TokenKind::LParen => {
                let expr = self.parse_expression()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            _ => Err(unexpected(token)),
        }
    }

    fn parse_identifier(&mut self, name: String, position: usize) -> ParseResult<Expr> {
        let is_call = matches!(self.peek_kind(), Some(TokenKind::LParen));

        if let Some(func) = Function::from_name(&name) {
            if !is_call {
                return Err(ExpressionError::MissingCall { name, position });
            }
            self.consume(); // eat '('
            let arg = self.parse_call_argument(func)?;
            return Ok(Expr::Call(func, Box::new(arg)));
        }

        let atom = if let Some(var) = Variable::from_name(&name) {
            Expr::Variable(var)
        } else if let Some(constant) = Constant::from_name(&name) {
            Expr::Constant(constant)
        } else {
            return Err(ExpressionError::UnknownIdentifier { name, position });
        };
        if is_call {
            return Err(ExpressionError::NotCallable { name, position });
        }
        Ok(atom)
    }

    fn parse_call_argument(&mut self, func: Function) -> ParseResult<Expr> {
        if let Some(TokenKind::RParen) = self.peek_kind() {
            return Err(ExpressionError::Arity {
                name: func.name().to_string(),
                count: 0,
            });
        }
        let arg = self.parse_expression()?;
        if let Some(TokenKind::Comma) = self.peek_kind() {
            let mut count = 1;
            while let Some(TokenKind::Comma) = self.peek_kind() {
                self.consume();
                self.parse_expression()?;
                count += 1;
            }
            return Err(ExpressionError::Arity {
                name: func.name().to_string(),
                count,
            });
        }
        self.expect_rparen()?;
        Ok(arg)
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, BinaryOp, Constant, Expr, ExpressionError, Function, Variable, MAX_DEPTH};
    use approx::assert_relative_eq;

    fn eval(input: &str, x: f64, y: f64) -> f64 {
        parse(input)
            .expect("expression should parse")
            .eval_point(x, y)
    }

    #[test]
    fn parse_respects_precedence() {
        assert_relative_eq!(eval("1 + 2 * 3", 0.0, 0.0), 7.0);
        assert_relative_eq!(eval("(1 + 2) * 3", 0.0, 0.0), 9.0);
        assert_relative_eq!(eval("8 / 4 / 2", 0.0, 0.0), 1.0);
        assert_relative_eq!(eval("10 - 4 - 3", 0.0, 0.0), 3.0);
    }

    #[test]
    fn power_is_right_associative_and_binds_tighter_than_negation() {
        assert_relative_eq!(eval("2 ** 3 ** 2", 0.0, 0.0), 512.0);
        assert_relative_eq!(eval("-x**2", 3.0, 0.0), -9.0);
        assert_relative_eq!(eval("2**-1", 0.0, 0.0), 0.5);
        assert_relative_eq!(eval("(-2)**2", 0.0, 0.0), 4.0);
    }

    #[test]
    fn parse_accepts_number_formats() {
        assert_relative_eq!(eval(".5 + 1.", 0.0, 0.0), 1.5);
        assert_relative_eq!(eval("2.5e2", 0.0, 0.0), 250.0);
        assert_relative_eq!(eval("1E-3", 0.0, 0.0), 0.001);
    }

    #[test]
    fn parse_resolves_whitelisted_names() {
        let expr = parse("sin(x) * pi + y").expect("expression should parse");
        assert_eq!(
            expr,
            Expr::Binary(
                Box::new(Expr::Binary(
                    Box::new(Expr::Call(Function::Sin, Box::new(Expr::Variable(Variable::X)))),
                    BinaryOp::Mul,
                    Box::new(Expr::Constant(Constant::Pi)),
                )),
                BinaryOp::Add,
                Box::new(Expr::Variable(Variable::Y)),
            )
        );
    }

    #[test]
    fn every_whitelisted_function_evaluates() {
        let cases = [
            ("sin(x)", 0.5_f64.sin()),
            ("cos(x)", 0.5_f64.cos()),
            ("tan(x)", 0.5_f64.tan()),
            ("exp(x)", 0.5_f64.exp()),
            ("log(x)", 0.5_f64.ln()),
            ("sqrt(x)", 0.5_f64.sqrt()),
            ("abs(-x)", 0.5),
            ("arcsin(x)", 0.5_f64.asin()),
            ("arccos(x)", 0.5_f64.acos()),
            ("arctan(x)", 0.5_f64.atan()),
            ("sinh(x)", 0.5_f64.sinh()),
            ("cosh(x)", 0.5_f64.cosh()),
            ("tanh(x)", 0.5_f64.tanh()),
            ("e", std::f64::consts::E),
        ];
        for (input, expected) in cases {
            assert_relative_eq!(eval(input, 0.5, 0.0), expected, epsilon = 1e-12);
        }
        assert_eq!(Function::ALL.len(), 13);
    }

    #[test]
    fn domain_errors_are_values_not_failures() {
        assert!(eval("log(x)", -1.0, 0.0).is_nan());
        assert!(eval("sqrt(x)", -4.0, 0.0).is_nan());
        assert!(eval("arcsin(x)", 2.0, 0.0).is_nan());
        assert_eq!(eval("1/x", 0.0, 0.0), f64::INFINITY);
        assert_eq!(eval("log(x)", 0.0, 0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn parse_rejects_names_outside_the_whitelist() {
        let err = parse("__import__('os')").expect_err("import should be rejected");
        assert!(
            matches!(err, ExpressionError::UnknownIdentifier { ref name, position: 0 } if name == "__import__"),
            "unexpected error: {err}"
        );

        let err = parse("os.system('x')").expect_err("attribute access should be rejected");
        assert!(
            matches!(err, ExpressionError::UnknownIdentifier { ref name, .. } if name == "os"),
            "unexpected error: {err}"
        );

        let err = parse("x + z").expect_err("unknown variable should be rejected");
        assert_eq!(err.to_string(), "Unknown identifier 'z' at position 4");

        assert!(parse("np.sin(x)").is_err());
        assert!(parse("print(x)").is_err());
    }

    #[test]
    fn parse_rejects_operators_outside_the_grammar() {
        let err = parse("x ^ 2").expect_err("caret should be rejected");
        assert!(matches!(err, ExpressionError::UnexpectedCharacter { found: '^', position: 2 }));
        assert!(parse("x % 2").is_err());
        assert!(parse("x // 2").is_err());
        assert!(parse("x[0]").is_err());
        assert!(parse("'x'").is_err());
        assert!(parse("x if y else 1").is_err());
    }

    #[test]
    fn parse_reports_malformed_syntax() {
        assert_eq!(parse("").expect_err("empty"), ExpressionError::Empty);
        assert_eq!(parse("   ").expect_err("blank"), ExpressionError::Empty);
        assert!(matches!(
            parse("x +").expect_err("dangling operator"),
            ExpressionError::UnexpectedEnd { .. }
        ));
        assert!(matches!(
            parse("(x + y").expect_err("unclosed paren"),
            ExpressionError::UnexpectedEnd { .. }
        ));
        assert!(matches!(
            parse("x y").expect_err("juxtaposition"),
            ExpressionError::UnexpectedToken { position: 2, .. }
        ));
        assert!(matches!(
            parse("2x").expect_err("implicit multiplication"),
            ExpressionError::UnexpectedToken { .. }
        ));
        assert!(matches!(
            parse("1.2.3").expect_err("double dot"),
            ExpressionError::UnexpectedToken { .. }
        ));
        assert!(matches!(
            parse("x * * y").expect_err("double star with space"),
            ExpressionError::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn parse_checks_call_shape() {
        assert!(matches!(
            parse("sin").expect_err("bare function"),
            ExpressionError::MissingCall { .. }
        ));
        assert!(matches!(
            parse("x(2)").expect_err("calling a variable"),
            ExpressionError::NotCallable { .. }
        ));
        assert!(matches!(
            parse("pi(2)").expect_err("calling a constant"),
            ExpressionError::NotCallable { .. }
        ));
        assert_eq!(
            parse("sin()").expect_err("no argument"),
            ExpressionError::Arity {
                name: "sin".to_string(),
                count: 0
            }
        );
        assert_eq!(
            parse("log(x, 2)").expect_err("two arguments"),
            ExpressionError::Arity {
                name: "log".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn parse_limits_nesting_depth() {
        let deep = format!("{}x{}", "(".repeat(MAX_DEPTH + 5), ")".repeat(MAX_DEPTH + 5));
        assert_eq!(parse(&deep).expect_err("too deep"), ExpressionError::TooDeep);

        let signs = format!("{}x", "-".repeat(MAX_DEPTH * 2));
        assert_eq!(parse(&signs).expect_err("too deep"), ExpressionError::TooDeep);

        let shallow = format!("{}x{}", "(".repeat(10), ")".repeat(10));
        assert!(parse(&shallow).is_ok());
    }

    #[test]
    fn long_operator_chains_count_towards_depth() {
        let sum = format!("x{}", "+x".repeat(10_000));
        assert_eq!(parse(&sum).expect_err("long sum"), ExpressionError::TooDeep);

        let product = format!("x{}", "*1".repeat(200_000));
        assert_eq!(parse(&product).expect_err("long product"), ExpressionError::TooDeep);

        let mixed = format!("x{}", "-y/2".repeat(MAX_DEPTH));
        assert_eq!(parse(&mixed).expect_err("long mixed chain"), ExpressionError::TooDeep);

        let moderate = format!("x{}", "+x*y".repeat(40));
        let expr = parse(&moderate).expect("moderate chain stays under the limit");
        assert_relative_eq!(expr.eval_point(1.0, 2.0), 81.0);
    }

    #[test]
    fn is_constant_tracks_variable_use() {
        assert!(parse("2 * pi + sin(e)").expect("parse").is_constant());
        assert!(!parse("2 * pi + sin(y)").expect("parse").is_constant());
    }

    #[test]
    fn eval_point_is_generic_over_float_width() {
        let expr = parse("x - y").expect("expression should parse");
        assert_relative_eq!(expr.eval_point(3.0_f64, 1.0), 2.0);
        assert_relative_eq!(expr.eval_point(1.5_f32, 0.5), 1.0);
    }

    #[test]
    fn display_is_fully_parenthesised() {
        let expr = parse("-x**2 + cos(y)").expect("expression should parse");
        assert_eq!(expr.to_string(), "((-(x ** 2)) + cos(y))");
    }
}
