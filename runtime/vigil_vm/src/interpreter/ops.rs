//! Operators and the iteration protocol.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::code::BinOp;
use crate::value::{Exception, ExceptionKind, IterState, Value};

fn symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::FloorDiv => "//",
        BinOp::Lt => "<",
        BinOp::Eq => "==",
    }
}

fn overflow() -> Exception {
    Exception::new(ExceptionKind::ValueError, "integer overflow")
}

/// `a // b`, rounding toward negative infinity.
fn floor_div(a: i64, b: i64) -> Result<i64, Exception> {
    if b == 0 {
        return Err(Exception::new(
            ExceptionKind::ZeroDivisionError,
            "integer division or modulo by zero",
        ));
    }
    let q = a.checked_div(b).ok_or_else(overflow)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

pub(super) fn binary(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, Exception> {
    match (op, lhs, rhs) {
        (BinOp::Eq, a, b) => Ok(Value::Bool(a == b)),
        (BinOp::Add, Value::Int(a), Value::Int(b)) => {
            a.checked_add(*b).map(Value::Int).ok_or_else(overflow)
        }
        (BinOp::Sub, Value::Int(a), Value::Int(b)) => {
            a.checked_sub(*b).map(Value::Int).ok_or_else(overflow)
        }
        (BinOp::Mul, Value::Int(a), Value::Int(b)) => {
            a.checked_mul(*b).map(Value::Int).ok_or_else(overflow)
        }
        (BinOp::FloorDiv, Value::Int(a), Value::Int(b)) => floor_div(*a, *b).map(Value::Int),
        (BinOp::Lt, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a < b)),
        (BinOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::str(&format!("{a}{b}"))),
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.lock().clone();
            items.extend(b.lock().iter().cloned());
            Ok(Value::list(items))
        }
        _ => Err(Exception::type_error(&format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            symbol(op),
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

/// `iter(value)`.
pub(super) fn iterate(value: Value) -> Result<Value, Exception> {
    if matches!(value, Value::Iterator(_) | Value::Generator(_)) {
        return Ok(value);
    }
    let items = match &value {
        Value::List(items) => items.lock().clone(),
        Value::Tuple(items) => items.to_vec(),
        Value::Str(s) => s.chars().map(|c| Value::str(c.encode_utf8(&mut [0; 4]))).collect(),
        other => {
            return Err(Exception::type_error(&format!(
                "'{}' object is not iterable",
                other.type_name()
            )))
        }
    };
    Ok(Value::Iterator(Arc::new(Mutex::new(IterState::Seq {
        items,
        pos: 0,
    }))))
}
