use crate::types::{Frame, NdArray, Opaque, Series};
use derive_more::From;
use std::fmt;

pub use num_bigint::BigInt;

/// The logical datum handed to [`pack`](crate::pack) and produced by
/// [`unpack`](crate::unpack).
///
/// `Map` keeps its pairs in insertion order and may carry non-text keys;
/// key uniqueness is the caller's invariant. `Opaque` equality is identity
/// (same handle), not structure; after a round trip, compare by
/// downcasting.
#[derive(From, Clone, PartialEq, Debug)]
pub enum Value {
    #[from(ignore)]
    Null,
    Bool(bool),
    Int(i64),
    BigInt(BigInt),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    #[from(ignore)]
    Tuple(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Array(NdArray),
    Series(Series),
    Frame(Frame),
    Opaque(Opaque),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        ValueKind::from(self)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i128> for Value {
    fn from(i: i128) -> Self {
        Value::BigInt(BigInt::from(i))
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    BigInt,
    Float,
    Str,
    Bytes,
    List,
    Tuple,
    Map,
    Array,
    Series,
    Frame,
    Opaque,
}

impl From<&Value> for ValueKind {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::BigInt(_) => ValueKind::BigInt,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::List(_) => ValueKind::List,
            Value::Tuple(_) => ValueKind::Tuple,
            Value::Map(_) => ValueKind::Map,
            Value::Array(_) => ValueKind::Array,
            Value::Series(_) => ValueKind::Series,
            Value::Frame(_) => ValueKind::Frame,
            Value::Opaque(_) => ValueKind::Opaque,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::BigInt => "bigint",
            ValueKind::Float => "float",
            ValueKind::Str => "str",
            ValueKind::Bytes => "bytes",
            ValueKind::List => "list",
            ValueKind::Tuple => "tuple",
            ValueKind::Map => "map",
            ValueKind::Array => "array",
            ValueKind::Series => "series",
            ValueKind::Frame => "frame",
            ValueKind::Opaque => "opaque",
        };
        f.write_str(name)
    }
}
