//! Built-in functions.
//!
//! Calls to these are what `C_RETURN` and `C_RAISE` report.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::value::{Exception, IterState, Native, Value};

pub const LEN: Native = Native {
    name: "len",
    func: len,
};

pub const SIZEOF: Native = Native {
    name: "sizeof",
    func: sizeof,
};

pub const APPEND: Native = Native {
    name: "append",
    func: append,
};

pub const RANGE: Native = Native {
    name: "range",
    func: range,
};

/// Every built-in, by name.
pub const ALL: [Native; 4] = [LEN, SIZEOF, APPEND, RANGE];

pub fn lookup(name: &str) -> Option<Native> {
    ALL.into_iter().find(|native| native.name == name)
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<(), Exception> {
    if args.len() == expected {
        return Ok(());
    }
    Err(Exception::type_error(&format!(
        "{name}() takes exactly {expected} argument(s) ({} given)",
        args.len()
    )))
}

fn to_int(len: usize) -> Value {
    Value::Int(i64::try_from(len).unwrap_or(i64::MAX))
}

fn len(args: &[Value]) -> Result<Value, Exception> {
    arity("len", args, 1)?;
    match &args[0] {
        Value::Str(s) => Ok(to_int(s.chars().count())),
        Value::Tuple(items) => Ok(to_int(items.len())),
        Value::List(items) => Ok(to_int(items.lock().len())),
        other => Err(Exception::type_error(&format!(
            "object of type '{}' has no len()",
            other.type_name()
        ))),
    }
}

/// Nominal object sizes, in bytes.
fn sizeof(args: &[Value]) -> Result<Value, Exception> {
    arity("sizeof", args, 1)?;
    let size = match &args[0] {
        Value::None => 16,
        Value::Bool(_) | Value::Int(_) => 28,
        Value::Str(s) => 49 + s.len(),
        Value::Tuple(items) => 40 + 8 * items.len(),
        Value::List(items) => 56 + 8 * items.lock().len(),
        _ => 64,
    };
    Ok(to_int(size))
}

fn append(args: &[Value]) -> Result<Value, Exception> {
    arity("append", args, 2)?;
    match &args[0] {
        Value::List(items) => {
            items.lock().push(args[1].clone());
            Ok(Value::None)
        }
        other => Err(Exception::type_error(&format!(
            "append() expects a list, not '{}'",
            other.type_name()
        ))),
    }
}

/// `range(stop)` or `range(start, stop)`.
fn range(args: &[Value]) -> Result<Value, Exception> {
    let (start, stop) = match args {
        [Value::Int(stop)] => (0, *stop),
        [Value::Int(start), Value::Int(stop)] => (*start, *stop),
        [_] | [_, _] => {
            return Err(Exception::type_error(
                "range() arguments must be integers",
            ))
        }
        _ => {
            return Err(Exception::type_error(&format!(
                "range expected 1 or 2 arguments, got {}",
                args.len()
            )))
        }
    };
    Ok(Value::Iterator(Arc::new(Mutex::new(IterState::Range {
        next: start,
        stop,
    }))))
}
