//! Expression evaluator (§4.2).
//!
//! Shunting-yard over a bounded value stack and operator stack, exactly
//! as the distilled spec calls for. New code grounded numerically on
//! `original_source/avr/src/gcode_expr.c`'s operator table and
//! precedence ordering, including the confirmed `OP_LT` fix (the
//! original's `left > right` for "less than" is a bug — see
//! `SPEC_FULL.md` §16). Variable references and function calls are
//! intentionally stubs per `spec.md`'s Non-goals: they tokenize far
//! enough to produce a precise diagnostic, then bail out rather than
//! resolving anything.

use thiserror::Error;

/// Maximum depth of either stack before the evaluator gives up (§4.2
/// "operator stack of bounded depth").
const MAX_STACK_DEPTH: usize = 32;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExprError {
    #[error("expression value/operator stack overflow")]
    StackOverflow,
    #[error("expression value/operator stack underflow")]
    StackUnderflow,
    #[error("variable references are not supported")]
    VariableNotSupported,
    #[error("function calls are not supported")]
    FunctionNotSupported,
    #[error("unexpected character '{0}' in expression")]
    UnexpectedChar(char),
    #[error("unterminated expression (unbalanced brackets)")]
    Unterminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    And,
    Or,
    Xor,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Neg,
}

impl Op {
    fn precedence(self) -> u8 {
        match self {
            Op::And | Op::Or | Op::Xor => 1,
            Op::Eq | Op::Ne | Op::Gt | Op::Ge | Op::Lt | Op::Le => 2,
            Op::Add | Op::Sub => 3,
            Op::Mul | Op::Div | Op::Mod => 4,
            Op::Pow => 5,
            Op::Neg => 6,
        }
    }

    /// `**` is right-associative; everything else is left-associative.
    fn right_associative(self) -> bool {
        matches!(self, Op::Pow | Op::Neg)
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        fn b2f(b: bool) -> f64 {
            if b {
                1.0
            } else {
                0.0
            }
        }
        fn f2b(v: f64) -> bool {
            v != 0.0
        }
        match self {
            Op::And => b2f(f2b(a) && f2b(b)),
            Op::Or => b2f(f2b(a) || f2b(b)),
            Op::Xor => b2f(f2b(a) ^ f2b(b)),
            Op::Eq => b2f(a == b),
            Op::Ne => b2f(a != b),
            Op::Gt => b2f(a > b),
            Op::Ge => b2f(a >= b),
            // Mathematically correct "less than"; the original firmware's
            // OP_LT used `left > right` here (see SPEC_FULL.md §16).
            Op::Lt => b2f(a < b),
            Op::Le => b2f(a <= b),
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mul => a * b,
            // Division by zero is intentionally not trapped (§4.2): it
            // produces IEEE-754 infinity that a downstream validator
            // (soft-limit test, feedrate check) is expected to reject.
            Op::Div => a / b,
            Op::Mod => a % b,
            Op::Pow => a.powf(b),
            Op::Neg => unreachable!("unary negation applied through apply_unary"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Op(Op),
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = expr.chars().filter(|c| !c.is_whitespace()).collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '[' => {
                out.push(Token::LParen);
                i += 1;
            }
            ']' => {
                out.push(Token::RParen);
                i += 1;
            }
            '#' => return Err(ExprError::VariableNotSupported),
            '+' => {
                out.push(Token::Op(Op::Add));
                i += 1;
            }
            '-' => {
                let unary = matches!(out.last(), None | Some(Token::LParen) | Some(Token::Op(_)));
                out.push(Token::Op(if unary { Op::Neg } else { Op::Sub }));
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    out.push(Token::Op(Op::Pow));
                    i += 2;
                } else {
                    out.push(Token::Op(Op::Mul));
                    i += 1;
                }
            }
            '/' => {
                out.push(Token::Op(Op::Div));
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n: f64 = text.parse().map_err(|_| ExprError::UnexpectedChar(c))?;
                out.push(Token::Num(n));
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let op = match word.as_str() {
                    "AND" => Op::And,
                    "OR" => Op::Or,
                    "XOR" => Op::Xor,
                    "EQ" => Op::Eq,
                    "NE" => Op::Ne,
                    "GT" => Op::Gt,
                    "GE" => Op::Ge,
                    "LT" => Op::Lt,
                    "LE" => Op::Le,
                    "MOD" => Op::Mod,
                    _ => {
                        if chars.get(i) == Some(&'[') {
                            return Err(ExprError::FunctionNotSupported);
                        }
                        return Err(ExprError::UnexpectedChar(word.chars().next().unwrap_or(c)));
                    }
                };
                out.push(Token::Op(op));
            }
            other => return Err(ExprError::UnexpectedChar(other)),
        }
    }
    Ok(out)
}

fn apply_top(values: &mut Vec<f64>, op: Op) -> Result<(), ExprError> {
    if op == Op::Neg {
        let a = values.pop().ok_or(ExprError::StackUnderflow)?;
        values.push(-a);
    } else {
        let b = values.pop().ok_or(ExprError::StackUnderflow)?;
        let a = values.pop().ok_or(ExprError::StackUnderflow)?;
        values.push(op.apply(a, b));
    }
    Ok(())
}

/// Evaluate one bracketed expression, e.g. `"[1 + 2 * 3]"`.
pub fn evaluate(expr: &str) -> Result<f64, ExprError> {
    let tokens = tokenize(expr)?;
    let mut values: Vec<f64> = Vec::new();
    let mut ops: Vec<Token> = Vec::new();

    for tok in tokens {
        match tok {
            Token::Num(n) => {
                if values.len() >= MAX_STACK_DEPTH {
                    return Err(ExprError::StackOverflow);
                }
                values.push(n);
            }
            Token::LParen => {
                if ops.len() >= MAX_STACK_DEPTH {
                    return Err(ExprError::StackOverflow);
                }
                ops.push(Token::LParen);
            }
            Token::RParen => loop {
                match ops.pop() {
                    Some(Token::LParen) => break,
                    Some(Token::Op(op)) => apply_top(&mut values, op)?,
                    _ => return Err(ExprError::Unterminated),
                }
            },
            Token::Op(op) => {
                while let Some(&Token::Op(top)) = ops.last() {
                    let yields = if op.right_associative() {
                        top.precedence() > op.precedence()
                    } else {
                        top.precedence() >= op.precedence()
                    };
                    if !yields {
                        break;
                    }
                    ops.pop();
                    apply_top(&mut values, top)?;
                }
                if ops.len() >= MAX_STACK_DEPTH {
                    return Err(ExprError::StackOverflow);
                }
                ops.push(Token::Op(op));
            }
        }
    }

    while let Some(tok) = ops.pop() {
        match tok {
            Token::Op(op) => apply_top(&mut values, op)?,
            Token::LParen => return Err(ExprError::Unterminated),
            Token::RParen | Token::Num(_) => unreachable!("only operators land on the op stack"),
        }
    }

    if values.len() != 1 {
        return Err(ExprError::StackUnderflow);
    }
    Ok(values[0])
}
