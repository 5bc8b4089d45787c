//! Runtime values for the reference interpreter.
//!
//! Values are cheap to clone: scalars inline, everything else behind `Arc`.
//! Lists, iterators and generator frames are shared and mutable through
//! `parking_lot::Mutex`.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::code::Code;
use crate::interpreter::Frame;

/// Signature of a native (built-in) function.
pub type NativeFn = fn(&[Value]) -> Result<Value, Exception>;

/// A built-in function.
#[derive(Copy, Clone)]
pub struct Native {
    pub name: &'static str,
    pub func: NativeFn,
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<built-in function {}>", self.name)
    }
}

/// Runtime value.
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(Arc<str>),
    Tuple(Arc<[Value]>),
    List(Arc<Mutex<Vec<Value>>>),
    /// An interpreted function.
    Function(Arc<Code>),
    Native(Native),
    Exception(Exception),
    Iterator(Arc<Mutex<IterState>>),
    Generator(Arc<Generator>),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    pub fn tuple(items: impl Into<Vec<Value>>) -> Self {
        Value::Tuple(Arc::from(items.into()))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(Mutex::new(items)))
    }

    pub fn exception(kind: ExceptionKind, message: &str) -> Self {
        Value::Exception(Exception::new(kind, message))
    }

    /// Python-style type name, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::Native(_) => "builtin_function_or_method",
            Value::Exception(e) => e.kind.name(),
            Value::Iterator(_) => "iterator",
            Value::Generator(_) => "generator",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Str(s) => !s.is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::List(items) => !items.lock().is_empty(),
            _ => true,
        }
    }

    /// Whether the value runs interpreted code when called.
    pub fn is_interpreted(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Name of a callable, if it has one.
    pub fn callable_name(&self) -> Option<&str> {
        match self {
            Value::Function(code) => Some(code.name()),
            Value::Native(native) => Some(native.name),
            _ => None,
        }
    }
}

type ListCell = Mutex<Vec<Value>>;

thread_local! {
    /// Lists this thread is formatting or comparing.
    static OPEN_LISTS: RefCell<Vec<*const ListCell>> = const { RefCell::new(Vec::new()) };
}

/// Marks a list as open on this thread until dropped.
struct OpenList(*const ListCell);

impl OpenList {
    /// `None` if the list is already open further up this thread's stack.
    fn enter(list: &Arc<ListCell>) -> Option<Self> {
        let ptr = Arc::as_ptr(list);
        OPEN_LISTS.with(|open| {
            let mut open = open.borrow_mut();
            if open.contains(&ptr) {
                return None;
            }
            open.push(ptr);
            Some(OpenList(ptr))
        })
    }
}

impl Drop for OpenList {
    fn drop(&mut self) {
        OPEN_LISTS.with(|open| {
            let mut open = open.borrow_mut();
            if let Some(pos) = open.iter().rposition(|ptr| *ptr == self.0) {
                open.remove(pos);
            }
        });
    }
}

/// Element-wise list equality. A list reached again while it is being
/// compared only equals itself.
fn list_eq(a: &Arc<ListCell>, b: &Arc<ListCell>) -> bool {
    if Arc::ptr_eq(a, b) {
        return true;
    }
    let (Some(_a), Some(_b)) = (OpenList::enter(a), OpenList::enter(b)) else {
        return false;
    };
    let lhs = a.lock().clone();
    let rhs = b.lock().clone();
    lhs == rhs
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::List(a), Value::List(b)) => list_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => a.name == b.name,
            (Value::Exception(a), Value::Exception(b)) => a == b,
            (Value::Iterator(a), Value::Iterator(b)) => Arc::ptr_eq(a, b),
            (Value::Generator(a), Value::Generator(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "'{s}'"),
            Value::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item:?}")?;
                }
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Value::List(items) => match OpenList::enter(items) {
                Some(_open) => f.debug_list().entries(items.lock().iter()).finish(),
                None => f.write_str("[...]"),
            },
            Value::Function(code) => write!(f, "<function {}>", code.name()),
            Value::Native(native) => native.fmt(f),
            Value::Exception(e) => write!(f, "{}({:?})", e.kind, &*e.message),
            Value::Iterator(_) => f.write_str("<iterator>"),
            Value::Generator(generator) => write!(f, "<generator object {}>", generator.name),
        }
    }
}

/// Built-in exception classes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    Exception,
    ArithmeticError,
    ZeroDivisionError,
    LookupError,
    KeyError,
    IndexError,
    TypeError,
    ValueError,
    StopIteration,
    RecursionError,
    RuntimeError,
}

impl ExceptionKind {
    pub fn name(self) -> &'static str {
        match self {
            ExceptionKind::Exception => "Exception",
            ExceptionKind::ArithmeticError => "ArithmeticError",
            ExceptionKind::ZeroDivisionError => "ZeroDivisionError",
            ExceptionKind::LookupError => "LookupError",
            ExceptionKind::KeyError => "KeyError",
            ExceptionKind::IndexError => "IndexError",
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::ValueError => "ValueError",
            ExceptionKind::StopIteration => "StopIteration",
            ExceptionKind::RecursionError => "RecursionError",
            ExceptionKind::RuntimeError => "RuntimeError",
        }
    }

    /// The class this one derives from, if not the root.
    pub fn base(self) -> Option<ExceptionKind> {
        match self {
            ExceptionKind::Exception => None,
            ExceptionKind::ZeroDivisionError => Some(ExceptionKind::ArithmeticError),
            ExceptionKind::KeyError | ExceptionKind::IndexError => Some(ExceptionKind::LookupError),
            ExceptionKind::RecursionError => Some(ExceptionKind::RuntimeError),
            _ => Some(ExceptionKind::Exception),
        }
    }

    /// Whether an exception of this kind is caught by an `except class:`.
    pub fn is_a(self, class: ExceptionKind) -> bool {
        let mut kind = Some(self);
        while let Some(k) = kind {
            if k == class {
                return true;
            }
            kind = k.base();
        }
        false
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An exception instance. Also the fault type tools raise into programs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exception {
    pub kind: ExceptionKind,
    pub message: Arc<str>,
}

impl Exception {
    pub fn new(kind: ExceptionKind, message: &str) -> Self {
        Exception {
            kind,
            message: Arc::from(message),
        }
    }

    pub fn type_error(message: &str) -> Self {
        Self::new(ExceptionKind::TypeError, message)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for Exception {}

/// Iterator over a sequence snapshot or an integer range.
pub enum IterState {
    Seq { items: Vec<Value>, pos: usize },
    Range { next: i64, stop: i64 },
}

impl IterState {
    pub(crate) fn next_value(&mut self) -> Option<Value> {
        match self {
            IterState::Seq { items, pos } => {
                let item = items.get(*pos).cloned()?;
                *pos += 1;
                Some(item)
            }
            IterState::Range { next, stop } => {
                if *next >= *stop {
                    return None;
                }
                let value = *next;
                *next += 1;
                Some(Value::Int(value))
            }
        }
    }
}

/// A generator object. `frame` is `None` once it has finished; it is
/// locked while the generator runs.
pub struct Generator {
    pub(crate) name: String,
    pub(crate) frame: Mutex<Option<Frame>>,
}

impl Generator {
    pub(crate) fn new(frame: Frame) -> Self {
        Generator {
            name: frame.code.name().to_string(),
            frame: Mutex::new(Some(frame)),
        }
    }
}
