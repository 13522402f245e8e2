//! Arithmetic expression evaluator
//!
//! A small recursive-descent parser. Grammar, lowest precedence first:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := postfix (('^' | '**') unary)?
//! postfix := primary '!'*
//! primary := number | constant | name '(' args ')' | '(' expr ')'
//! ```
//!
//! Power is right-associative and binds tighter than unary minus, so
//! `-2^2` is `-4`. Integer operands stay exact through `+ - * %`, integer
//! powers and factorials; anything else is computed in `f64`.

use std::fmt;
use std::sync::LazyLock;

use num_bigint::{BigInt, Sign};
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};
use thiserror::Error;

/// Largest exponent accepted by `^`, `**` and `pow`
pub const MAX_EXPONENT: f64 = 1000.0;
/// Largest argument accepted by `!` and `factorial`
pub const MAX_FACTORIAL: f64 = 100.0;
/// Largest absolute result that is displayed
pub const MAX_RESULT: f64 = 1e100;
/// Maximum nesting of parentheses, calls and unary signs
pub const MAX_DEPTH: usize = 256;

/// Size cap for exact intermediates
const MAX_INT_BITS: u64 = 4096;

static MAX_RESULT_INT: LazyLock<BigInt> = LazyLock::new(|| BigInt::from(10u32).pow(100));

/// Recognised constants
pub const CONSTANTS: &[&str] = &["pi", "e"];

/// Supported function names
pub const FUNCTIONS: &[&str] = &[
    "abs", "round", "pow", "sqrt", "sin", "cos", "tan", "factorial", "log", "log10", "exp",
    "floor", "ceil", "compound", "simple",
];

/// Evaluation failure. `Display` renders the text shown after `Error: `.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("Invalid input - Expression cannot be empty")]
    Empty,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Exponent too large (max: 1000)")]
    ExponentTooLarge,
    #[error("Factorial is not defined for negative numbers")]
    NegativeFactorial,
    #[error("Factorial too large (max: 100)")]
    FactorialTooLarge,
    #[error("Result too large to display")]
    ResultTooLarge,
    #[error("Invalid calculation - {0}")]
    Invalid(String),
}

fn invalid(detail: impl Into<String>) -> ExprError {
    ExprError::Invalid(detail.into())
}

/// An evaluated value: exact integer or float
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Int(BigInt),
    Float(f64),
}

impl Number {
    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Int(n) => n.to_f64().unwrap_or(match n.sign() {
                Sign::Minus => f64::NEG_INFINITY,
                _ => f64::INFINITY,
            }),
            Number::Float(x) => *x,
        }
    }

    fn is_zero(&self) -> bool {
        match self {
            Number::Int(n) => n.is_zero(),
            Number::Float(x) => *x == 0.0,
        }
    }
}

impl std::ops::Neg for Number {
    type Output = Number;

    fn neg(self) -> Number {
        match self {
            Number::Int(n) => Number::Int(-n),
            Number::Float(x) => Number::Float(-x),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{}", n),
            Number::Float(x) => write!(f, "{}", format_number(*x)),
        }
    }
}

fn exact(n: BigInt) -> Result<Number, ExprError> {
    if n.bits() > MAX_INT_BITS {
        Err(ExprError::ResultTooLarge)
    } else {
        Ok(Number::Int(n))
    }
}

/// Integral float to exact integer
fn float_to_int(x: f64) -> Result<BigInt, ExprError> {
    BigInt::from_f64(x).ok_or_else(|| invalid("cannot convert float to integer"))
}

fn add(a: Number, b: Number) -> Result<Number, ExprError> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => exact(x + y),
        (a, b) => Ok(Number::Float(a.to_f64() + b.to_f64())),
    }
}

fn sub(a: Number, b: Number) -> Result<Number, ExprError> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => exact(x - y),
        (a, b) => Ok(Number::Float(a.to_f64() - b.to_f64())),
    }
}

fn mul(a: Number, b: Number) -> Result<Number, ExprError> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => exact(x * y),
        (a, b) => Ok(Number::Float(a.to_f64() * b.to_f64())),
    }
}

fn div(a: Number, b: Number) -> Result<Number, ExprError> {
    if b.is_zero() {
        return Err(ExprError::DivisionByZero);
    }
    Ok(Number::Float(a.to_f64() / b.to_f64()))
}

/// Floored modulo, sign follows the divisor
fn rem(a: Number, b: Number) -> Result<Number, ExprError> {
    if b.is_zero() {
        return Err(ExprError::DivisionByZero);
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => {
            let r = &x % &y;
            if !r.is_zero() && r.sign() != y.sign() {
                exact(r + y)
            } else {
                exact(r)
            }
        }
        (a, b) => {
            let (x, y) = (a.to_f64(), b.to_f64());
            Ok(Number::Float(x - y * (x / y).floor()))
        }
    }
}

fn float_power(base: f64, exponent: f64) -> Result<f64, ExprError> {
    if exponent > MAX_EXPONENT {
        return Err(ExprError::ExponentTooLarge);
    }
    if base == 0.0 && exponent < 0.0 {
        return Err(ExprError::DivisionByZero);
    }
    Ok(base.powf(exponent))
}

fn power(base: Number, exponent: Number) -> Result<Number, ExprError> {
    match (base, exponent) {
        (Number::Int(b), Number::Int(e)) if !e.is_negative() => {
            let e = match e.to_u32() {
                Some(e) if f64::from(e) <= MAX_EXPONENT => e,
                _ => return Err(ExprError::ExponentTooLarge),
            };
            if b.bits().saturating_sub(1).saturating_mul(u64::from(e)) > MAX_INT_BITS {
                return Err(ExprError::ResultTooLarge);
            }
            exact(b.pow(e))
        }
        (b, e) => Ok(Number::Float(float_power(b.to_f64(), e.to_f64())?)),
    }
}

fn factorial(n: Number) -> Result<Number, ExprError> {
    let n = match n {
        Number::Int(n) => n,
        Number::Float(x) => {
            if x.fract() != 0.0 {
                return Err(invalid("factorial() only accepts integral values"));
            }
            float_to_int(x)?
        }
    };

    if n.is_negative() {
        return Err(ExprError::NegativeFactorial);
    }
    let n = match n.to_u64() {
        Some(n) if n as f64 <= MAX_FACTORIAL => n,
        _ => return Err(ExprError::FactorialTooLarge),
    };

    Ok(Number::Int((1..=n).fold(BigInt::from(1u32), |acc, k| acc * k)))
}

fn domain(value: f64) -> Result<f64, ExprError> {
    if value.is_nan() {
        Err(invalid("math domain error"))
    } else {
        Ok(value)
    }
}

/// Round to `digits` decimal places, half to even
fn round_digits(x: f64, digits: f64) -> f64 {
    let scale = 10f64.powi(digits as i32);
    if !scale.is_finite() || scale == 0.0 {
        return x;
    }
    let scaled = x * scale;
    if !scaled.is_finite() {
        return x;
    }
    scaled.round_ties_even() / scale
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(BigInt),
    Float(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pow,
    Bang,
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Scientific notation, only when digits follow the `e`
                let mut scientific = false;
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                        scientific = true;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let bad_number = || invalid(format!("invalid number '{}'", text));
                let token = if scientific || text.contains('.') {
                    Token::Float(text.parse::<f64>().map_err(|_| bad_number())?)
                } else {
                    Token::Int(text.parse::<BigInt>().map_err(|_| bad_number())?)
                };
                tokens.push(token);
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(name.to_lowercase()));
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Pow);
                i += 2;
            }
            _ => {
                let token = match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' | '×' => Token::Star,
                    '/' | '÷' => Token::Slash,
                    '%' => Token::Percent,
                    '^' => Token::Pow,
                    '!' => Token::Bang,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    ',' => Token::Comma,
                    other => return Err(invalid(format!("unexpected character '{}'", other))),
                };
                tokens.push(token);
                i += 1;
            }
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

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(invalid("expression nested too deeply"));
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Number, ExprError> {
        let mut value = self.term()?;
        loop {
            if self.eat(&Token::Plus) {
                value = add(value, self.term()?)?;
            } else if self.eat(&Token::Minus) {
                value = sub(value, self.term()?)?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<Number, ExprError> {
        let mut value = self.unary()?;
        loop {
            if self.eat(&Token::Star) {
                value = mul(value, self.unary()?)?;
            } else if self.eat(&Token::Slash) {
                value = div(value, self.unary()?)?;
            } else if self.eat(&Token::Percent) {
                value = rem(value, self.unary()?)?;
            } else {
                return Ok(value);
            }
        }
    }

    fn unary(&mut self) -> Result<Number, ExprError> {
        self.descend()?;
        let value = if self.eat(&Token::Minus) {
            self.unary().map(|value| -value)
        } else if self.eat(&Token::Plus) {
            self.unary()
        } else {
            self.power()
        };
        self.depth -= 1;
        value
    }

    fn power(&mut self) -> Result<Number, ExprError> {
        let base = self.postfix()?;
        if self.eat(&Token::Pow) {
            let exponent = self.unary()?;
            return power(base, exponent);
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Number, ExprError> {
        let mut value = self.primary()?;
        while self.eat(&Token::Bang) {
            value = factorial(value)?;
        }
        Ok(value)
    }

    fn primary(&mut self) -> Result<Number, ExprError> {
        match self.next() {
            Some(Token::Int(n)) => Ok(Number::Int(n)),
            Some(Token::Float(x)) => Ok(Number::Float(x)),
            Some(Token::LParen) => {
                self.descend()?;
                let value = self.expr()?;
                if !self.eat(&Token::RParen) {
                    return Err(invalid("missing closing parenthesis"));
                }
                self.depth -= 1;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if self.eat(&Token::LParen) {
                    self.descend()?;
                    let args = self.args()?;
                    self.depth -= 1;
                    call(&name, args)
                } else {
                    constant(&name)
                }
            }
            Some(other) => Err(invalid(format!("unexpected token {:?}", other))),
            None => Err(invalid("unexpected end of expression")),
        }
    }

    fn args(&mut self) -> Result<Vec<Number>, ExprError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            if self.eat(&Token::RParen) {
                return Ok(args);
            }
            return Err(invalid("expected ',' or ')' in argument list"));
        }
    }
}

fn constant(name: &str) -> Result<Number, ExprError> {
    match name {
        "pi" => Ok(Number::Float(std::f64::consts::PI)),
        "e" => Ok(Number::Float(std::f64::consts::E)),
        _ => Err(invalid(format!("name '{}' is not defined", name))),
    }
}

fn call(name: &str, mut args: Vec<Number>) -> Result<Number, ExprError> {
    let expected: &[usize] = match name {
        "round" | "log" => &[1, 2],
        "pow" => &[2],
        "compound" | "simple" => &[3],
        _ if FUNCTIONS.contains(&name) => &[1],
        _ => return Err(invalid(format!("name '{}' is not defined", name))),
    };
    if !expected.contains(&args.len()) {
        return Err(invalid(format!(
            "{}() takes {} argument(s), got {}",
            name,
            expected.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" or "),
            args.len()
        )));
    }

    let x = args[0].to_f64();
    let y = args.get(1).map(Number::to_f64).unwrap_or(0.0);
    let z = args.get(2).map(Number::to_f64).unwrap_or(0.0);
    let first_is_int = matches!(args[0], Number::Int(_));

    let value = match name {
        "abs" => {
            return Ok(match args.swap_remove(0) {
                Number::Int(n) => Number::Int(n.abs()),
                Number::Float(x) => Number::Float(x.abs()),
            })
        }
        "round" if first_is_int && (args.len() == 1 || y >= 0.0) => return Ok(args.swap_remove(0)),
        "round" if args.len() == 1 => return float_to_int(x.round_ties_even()).map(Number::Int),
        "round" => round_digits(x, y),
        "pow" => {
            let exponent = args.swap_remove(1);
            return power(args.swap_remove(0), exponent);
        }
        "factorial" => return factorial(args.swap_remove(0)),
        "floor" | "ceil" if first_is_int => return Ok(args.swap_remove(0)),
        "floor" => return float_to_int(x.floor()).map(Number::Int),
        "ceil" => return float_to_int(x.ceil()).map(Number::Int),
        "sqrt" => domain(x.sqrt())?,
        "sin" => x.sin(),
        "cos" => x.cos(),
        "tan" => x.tan(),
        "exp" => x.exp(),
        "log" | "log10" if x <= 0.0 => return Err(invalid("math domain error")),
        "log" if args.len() == 2 => {
            if y <= 0.0 || y == 1.0 {
                return Err(invalid("math domain error"));
            }
            x.ln() / y.ln()
        }
        "log" => x.ln(),
        "log10" => x.log10(),
        // principal, rate in percent, time
        "compound" => x * float_power(1.0 + y / 100.0, z)?,
        "simple" => x * (1.0 + y * z / 100.0),
        _ => return Err(invalid(format!("name '{}' is not defined", name))),
    };

    Ok(Number::Float(value))
}

/// Evaluate an arithmetic expression
pub fn evaluate(input: &str) -> Result<Number, ExprError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ExprError::Empty);
    }

    let mut parser = Parser {
        tokens: tokenize(input)?,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;

    if let Some(token) = parser.peek() {
        return Err(invalid(format!("unexpected token {:?}", token)));
    }

    match value {
        Number::Int(ref n) if n.abs() > *MAX_RESULT_INT => Err(ExprError::ResultTooLarge),
        Number::Float(x) => {
            let x = domain(x)?;
            if x.is_infinite() || x.abs() > MAX_RESULT {
                return Err(ExprError::ResultTooLarge);
            }
            Ok(Number::Float(x))
        }
        value => Ok(value),
    }
}

/// Format a float: integral values without a fractional part, others in
/// the shortest round-trip form
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(s: &str) -> String {
        evaluate(s).unwrap().to_string()
    }

    fn eval_f64(s: &str) -> f64 {
        evaluate(s).unwrap().to_f64()
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(eval("2+2"), "4");
        assert_eq!(eval("2 + 3 * 4"), "14");
        assert_eq!(eval("(2 + 3) * 4"), "20");
        assert_eq!(eval("2^3^2"), "512");
        assert_eq!(eval("2**10"), "1024");
        assert_eq!(eval("-2^2"), "-4");
        assert_eq!(eval("23 * 36 - (4^7)"), "-15556");
        assert_eq!(eval("7 % 3"), "1");
        assert_eq!(eval("-7 % 3"), "2");
        assert_eq!(eval("7 % -3"), "-2");
        assert_eq!(eval("10 / 4"), "2.5");
        assert_eq!(eval("6 / 3"), "2");
    }

    #[test]
    fn test_factorial() {
        assert_eq!(eval("5!"), "120");
        assert_eq!(eval("factorial(6)"), "720");
        assert_eq!(eval("3!!"), "720");
        assert_eq!(eval("5.0!"), "120");
        assert_eq!(evaluate("(-3)!"), Err(ExprError::NegativeFactorial));
        assert_eq!(evaluate("101!"), Err(ExprError::FactorialTooLarge));
        assert_eq!(evaluate("100!"), Err(ExprError::ResultTooLarge));
        assert!(matches!(evaluate("2.5!"), Err(ExprError::Invalid(_))));
    }

    #[test]
    fn test_exact_integers() {
        assert_eq!(eval("23!"), "25852016738884976640000");
        assert_eq!(eval("25!"), "15511210043330985984000000");
        assert_eq!(eval("3^40"), "12157665459056928801");
        assert_eq!(eval("2^60 + 1"), "1152921504606846977");
        assert_eq!(eval("pow(7, 30)"), "22539340290692258087863249");
        assert_eq!(eval("10^100 - 10^100 + 1"), "1");
        // A float operand leaves exact arithmetic
        assert_eq!(evaluate("2^60 * 1.0").unwrap(), Number::Float(2f64.powi(60)));
        assert_eq!(evaluate("7 / 7").unwrap(), Number::Float(1.0));
    }

    #[test]
    fn test_functions_and_constants() {
        assert_eq!(eval("sqrt(16)"), "4");
        assert_eq!(eval("abs(-3)"), "3");
        assert_eq!(eval("pow(2, 8)"), "256");
        assert_eq!(eval("round(2.5)"), "2");
        assert_eq!(eval("round(3.14159, 2)"), "3.14");
        assert_eq!(eval("round(7, 2)"), "7");
        assert_eq!(eval("floor(2.7) + ceil(2.1)"), "5");
        assert_eq!(eval("log10(1000)"), "3");
        assert_eq!(eval("log(8, 2)"), "3");
        assert_eq!(eval("log(e)"), "1");
        assert_eq!(eval("cos(0)"), "1");
        assert!((eval_f64("pi") - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn test_round_with_huge_digits() {
        assert_eq!(eval("round(2.5, 400)"), "2.5");
        assert_eq!(eval("round(1234.5, -400)"), "1234.5");
    }

    #[test]
    fn test_interest() {
        assert_eq!(eval("compound(1000, 100, 2)"), "4000");
        assert_eq!(eval("simple(1000, 10, 5)"), "1500");
        assert!((eval_f64("compound(1000, 5, 3)") - 1157.625).abs() < 1e-9);
    }

    #[test]
    fn test_limits() {
        assert_eq!(evaluate("1/0"), Err(ExprError::DivisionByZero));
        assert_eq!(evaluate("5 % 0"), Err(ExprError::DivisionByZero));
        assert_eq!(evaluate("0^-1"), Err(ExprError::DivisionByZero));
        assert_eq!(evaluate("2^1001"), Err(ExprError::ExponentTooLarge));
        assert_eq!(evaluate("10^101"), Err(ExprError::ResultTooLarge));
        assert_eq!(evaluate("(10^1000)^1000"), Err(ExprError::ResultTooLarge));
        assert_eq!(evaluate("   "), Err(ExprError::Empty));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let nested = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(
            evaluate(&nested),
            Err(ExprError::Invalid("expression nested too deeply".to_string()))
        );

        let signs = format!("{}1", "-".repeat(20_000));
        assert_eq!(
            evaluate(&signs),
            Err(ExprError::Invalid("expression nested too deeply".to_string()))
        );

        let calls = format!("{}1{}", "abs(".repeat(5_000), ")".repeat(5_000));
        assert!(matches!(evaluate(&calls), Err(ExprError::Invalid(_))));
    }

    #[test]
    fn test_moderate_nesting_is_accepted() {
        let nested = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(eval(&nested), "1");
        assert_eq!(eval(&format!("{}1", "-".repeat(100))), "1");
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(evaluate("foo(2)"), Err(ExprError::Invalid(_))));
        assert!(matches!(evaluate("2 +"), Err(ExprError::Invalid(_))));
        assert!(matches!(evaluate("(1 + 2"), Err(ExprError::Invalid(_))));
        assert!(matches!(evaluate("sqrt(-1)"), Err(ExprError::Invalid(_))));
        assert!(matches!(evaluate("2 $ 3"), Err(ExprError::Invalid(_))));
        assert!(matches!(evaluate("sqrt(1, 2)"), Err(ExprError::Invalid(_))));
        assert_eq!(
            evaluate("x + 1").unwrap_err().to_string(),
            "Invalid calculation - name 'x' is not defined"
        );
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1e20), "100000000000000000000");
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(eval("2e3"), "2000");
        assert_eq!(eval("1.5e-1 * 2"), "0.3");
        // `e` alone is the constant
        assert!((eval_f64("2*e") - 2.0 * std::f64::consts::E).abs() < 1e-12);
    }
}
