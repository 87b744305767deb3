//! Expression AST, parser and interpreter.
//!
//! # Grammar
//!
//! ```text
//! or      := and ("or" and)*
//! and     := not ("and" not)*
//! not     := "not" not | compare
//! compare := sum (cmp_op sum)*          chained: a < b < c means a < b and b < c
//! sum     := product (("+" | "-") product)*
//! product := unary (("*" | "/") unary)*
//! unary   := "-" unary | "+" unary | atom
//! atom    := number | string | True | False | None
//!          | ident | ident "(" or ("," or)* ")" | "(" or ")"
//! cmp_op  := "==" | "!=" | "<" | "<=" | ">" | ">=" | "is" | "is not"
//! ```
//!
//! Identifiers are state variables; `min`, `max` and `abs` are the only
//! functions.  `and` and `or` short-circuit and yield one of their operands.

use std::cmp::Ordering;

use crate::lexer::{tokenize, Token};
use crate::{RuleError, RuleResult, State, Value};

// ── AST ───────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Func {
    Min,
    Max,
    Abs,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Lit(Value),
    Var(String),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
    Call(Func, Vec<Expr>),
}

impl Expr {
    /// Parse a complete expression.  `line` is used for error messages.
    pub fn parse(src: &str, line: usize) -> RuleResult<Expr> {
        let tokens = tokenize(src, line)?;
        if tokens.is_empty() {
            return Err(RuleError::syntax(line, "empty expression"));
        }
        let mut parser = Parser { tokens, pos: 0, line };
        let expr = parser.or()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(RuleError::syntax(line, format!("unexpected {tok:?} in {src:?}"))),
        }
    }

    /// Variables referenced anywhere in the expression.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Lit(_) => {}
            Expr::Var(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name.as_str());
                }
            }
            Expr::Neg(e) | Expr::Not(e) => e.collect_variables(out),
            Expr::And(a, b) | Expr::Or(a, b) | Expr::Arith(_, a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
            Expr::Compare(first, rest) => {
                first.collect_variables(out);
                for (_, e) in rest {
                    e.collect_variables(out);
                }
            }
            Expr::Call(_, args) => {
                for e in args {
                    e.collect_variables(out);
                }
            }
        }
    }

    pub fn eval(&self, state: &State) -> RuleResult<Value> {
        match self {
            Expr::Lit(v) => Ok(v.clone()),
            Expr::Var(name) => state
                .get(name)
                .cloned()
                .ok_or_else(|| RuleError::UnknownVariable(name.clone())),
            Expr::Neg(e) => {
                let v = e.eval(state)?;
                v.as_num()
                    .map(|n| Value::Num(-n))
                    .ok_or_else(|| RuleError::Type(format!("cannot negate {}", v.type_name())))
            }
            Expr::Not(e) => Ok(Value::Bool(!e.eval(state)?.is_truthy())),
            Expr::And(a, b) => {
                let left = a.eval(state)?;
                if left.is_truthy() { b.eval(state) } else { Ok(left) }
            }
            Expr::Or(a, b) => {
                let left = a.eval(state)?;
                if left.is_truthy() { Ok(left) } else { b.eval(state) }
            }
            Expr::Arith(op, a, b) => arith(*op, &a.eval(state)?, &b.eval(state)?),
            Expr::Compare(first, rest) => {
                let mut left = first.eval(state)?;
                for (op, e) in rest {
                    let right = e.eval(state)?;
                    if !compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::Call(func, args) => {
                let nums = args
                    .iter()
                    .map(|e| {
                        let v = e.eval(state)?;
                        v.as_num().ok_or_else(|| {
                            RuleError::Type(format!("{func:?} expects numbers, got {}", v.type_name()))
                        })
                    })
                    .collect::<RuleResult<Vec<f64>>>()?;
                let result = match func {
                    Func::Min => nums.iter().copied().fold(f64::INFINITY, f64::min),
                    Func::Max => nums.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    Func::Abs => nums.first().map_or(0.0, |n| n.abs()),
                };
                Ok(Value::Num(result))
            }
        }
    }
}

fn arith(op: ArithOp, a: &Value, b: &Value) -> RuleResult<Value> {
    let (Some(x), Some(y)) = (a.as_num(), b.as_num()) else {
        return Err(RuleError::Type(format!(
            "unsupported operands {} and {} for {op:?}",
            a.type_name(),
            b.type_name()
        )));
    };
    let n = match op {
        ArithOp::Add => x + y,
        ArithOp::Sub => x - y,
        ArithOp::Mul => x * y,
        ArithOp::Div if y == 0.0 => return Err(RuleError::Type("division by zero".into())),
        ArithOp::Div => x / y,
    };
    Ok(Value::Num(n))
}

fn compare(op: CmpOp, a: &Value, b: &Value) -> RuleResult<bool> {
    let ordering = || {
        a.compare(b).ok_or_else(|| {
            RuleError::Type(format!("cannot compare {} with {}", a.type_name(), b.type_name()))
        })
    };
    Ok(match op {
        CmpOp::Eq => a.loose_eq(b),
        CmpOp::Ne => !a.loose_eq(b),
        CmpOp::Lt => ordering()? == Ordering::Less,
        CmpOp::Le => ordering()? != Ordering::Greater,
        CmpOp::Gt => ordering()? == Ordering::Greater,
        CmpOp::Ge => ordering()? != Ordering::Less,
    })
}

// ── Parser ────────────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos:    usize,
    line:   usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn next(&mut self) -> RuleResult<Token> {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| RuleError::syntax(self.line, "unexpected end of expression"))?;
        self.pos += 1;
        Ok(tok)
    }

    fn expect(&mut self, tok: &Token) -> RuleResult<()> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(RuleError::syntax(self.line, format!("expected {tok:?}, found {:?}", self.peek())))
        }
    }

    fn or(&mut self) -> RuleResult<Expr> {
        let mut left = self.and()?;
        while self.eat(&Token::Or) {
            left = Expr::Or(Box::new(left), Box::new(self.and()?));
        }
        Ok(left)
    }

    fn and(&mut self) -> RuleResult<Expr> {
        let mut left = self.not()?;
        while self.eat(&Token::And) {
            left = Expr::And(Box::new(left), Box::new(self.not()?));
        }
        Ok(left)
    }

    fn not(&mut self) -> RuleResult<Expr> {
        if self.eat(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.compare()
    }

    fn cmp_op(&mut self) -> Option<CmpOp> {
        let op = match self.peek()? {
            Token::Eq => CmpOp::Eq,
            Token::Ne => CmpOp::Ne,
            Token::Lt => CmpOp::Lt,
            Token::Le => CmpOp::Le,
            Token::Gt => CmpOp::Gt,
            Token::Ge => CmpOp::Ge,
            Token::Is => {
                self.pos += 1;
                return Some(if self.eat(&Token::Not) { CmpOp::Ne } else { CmpOp::Eq });
            }
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn compare(&mut self) -> RuleResult<Expr> {
        let first = self.sum()?;
        let mut rest = Vec::new();
        while let Some(op) = self.cmp_op() {
            rest.push((op, self.sum()?));
        }
        Ok(if rest.is_empty() { first } else { Expr::Compare(Box::new(first), rest) })
    }

    fn sum(&mut self) -> RuleResult<Expr> {
        let mut left = self.product()?;
        loop {
            let op = if self.eat(&Token::Plus) {
                ArithOp::Add
            } else if self.eat(&Token::Minus) {
                ArithOp::Sub
            } else {
                return Ok(left);
            };
            left = Expr::Arith(op, Box::new(left), Box::new(self.product()?));
        }
    }

    fn product(&mut self) -> RuleResult<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = if self.eat(&Token::Star) {
                ArithOp::Mul
            } else if self.eat(&Token::Slash) {
                ArithOp::Div
            } else {
                return Ok(left);
            };
            left = Expr::Arith(op, Box::new(left), Box::new(self.unary()?));
        }
    }

    fn unary(&mut self) -> RuleResult<Expr> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }
        self.atom()
    }

    fn atom(&mut self) -> RuleResult<Expr> {
        match self.next()? {
            Token::Num(n) => Ok(Expr::Lit(Value::Num(n))),
            Token::Str(s) => Ok(Expr::Lit(Value::Str(s))),
            Token::True => Ok(Expr::Lit(Value::Bool(true))),
            Token::False => Ok(Expr::Lit(Value::Bool(false))),
            Token::None => Ok(Expr::Lit(Value::None)),
            Token::LParen => {
                let inner = self.or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) if self.peek() == Some(&Token::LParen) => self.call(&name),
            Token::Ident(name) => Ok(Expr::Var(name)),
            tok => Err(RuleError::syntax(self.line, format!("unexpected {tok:?}"))),
        }
    }

    fn call(&mut self, name: &str) -> RuleResult<Expr> {
        let func = match name {
            "min" => Func::Min,
            "max" => Func::Max,
            "abs" => Func::Abs,
            other => return Err(RuleError::syntax(self.line, format!("unknown function {other:?}"))),
        };
        self.expect(&Token::LParen)?;
        let mut args = vec![self.or()?];
        while self.eat(&Token::Comma) {
            args.push(self.or()?);
        }
        self.expect(&Token::RParen)?;
        if func == Func::Abs && args.len() != 1 {
            return Err(RuleError::syntax(self.line, "abs takes exactly one argument"));
        }
        Ok(Expr::Call(func, args))
    }
}
