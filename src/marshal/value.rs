//! Value kinds for the generic marshaler.
//!
//! Every encodable application value is classified into exactly one
//! [`Value`] kind through the [`ToValue`] trait. The set of kinds is closed:
//!
//! | Kind                  | Encoded as                                   |
//! |-----------------------|----------------------------------------------|
//! | `Bytes`, `Str`        | bulk string                                  |
//! | `Bool`                | bulk string `0` / `1`                        |
//! | `F32`, `F64`          | bulk string, shortest round-trip decimal     |
//! | `Nil`                 | nil bulk string                              |
//! | `Int`, `UInt`         | integer                                      |
//! | `Error`               | error line with the error's message          |
//! | `Marshaler`           | whatever the value's own `Marshal` writes    |
//! | `Text`, `Binary`      | bulk string of the serialized bytes          |
//! | `Ref`                 | the referenced value, or nil bulk string     |
//! | `Seq`                 | array of elements, or nil array              |
//! | `Map`                 | array of alternating keys and values         |
//! | `Unsupported`         | an error naming the type                     |
//!
//! Caller types join by implementing [`ToValue`], usually by returning
//! [`Value::Marshaler`], [`Value::Text`] or [`Value::Binary`] for
//! themselves.

use crate::protocol::error::{BoxError, RespError};
use crate::protocol::scalar::{ArrayHeader, BulkString, Integer, Marshal, SimpleError, SimpleString};
use crate::protocol::types::RespValue;
use bytes::{Bytes, BytesMut};
use std::any::Any;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// A borrowed, classified view of an application value.
pub enum Value<'a> {
    Bytes(&'a [u8]),
    Str(&'a str),
    Bool(bool),
    F32(f32),
    F64(f64),
    Nil,
    Int(i64),
    UInt(u64),
    Error(&'a (dyn std::error::Error + 'a)),
    Marshaler(&'a dyn Marshal),
    Text(&'a dyn MarshalText),
    Binary(&'a dyn MarshalBinary),
    /// A nullable reference; `None` is the nil bulk string.
    Ref(Option<&'a dyn ToValue>),
    /// A sequence; `None` is the nil array.
    Seq(Option<Elements<'a>>),
    /// An associative map; `None` is the nil array.
    Map(Option<Entries<'a>>),
    Unsupported(&'static str),
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::F32(x) => f.debug_tuple("F32").field(x).finish(),
            Value::F64(x) => f.debug_tuple("F64").field(x).finish(),
            Value::Nil => f.write_str("Nil"),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::UInt(n) => f.debug_tuple("UInt").field(n).finish(),
            Value::Error(e) => f.debug_tuple("Error").field(&e.to_string()).finish(),
            Value::Marshaler(_) => f.write_str("Marshaler(..)"),
            Value::Text(_) => f.write_str("Text(..)"),
            Value::Binary(_) => f.write_str("Binary(..)"),
            Value::Ref(r) => write!(f, "Ref({})", if r.is_some() { ".." } else { "None" }),
            Value::Seq(s) => f.debug_tuple("Seq").field(&s.as_ref().map(|e| e.len)).finish(),
            Value::Map(m) => f.debug_tuple("Map").field(&m.as_ref().map(|e| e.len)).finish(),
            Value::Unsupported(name) => f.debug_tuple("Unsupported").field(name).finish(),
        }
    }
}

/// The elements of a sequence, with their count known up front.
pub struct Elements<'a> {
    len: usize,
    items: Box<dyn Iterator<Item = &'a dyn ToValue> + 'a>,
}

impl<'a> Elements<'a> {
    /// `items` must yield exactly `len` elements.
    pub fn new<I>(len: usize, items: I) -> Self
    where
        I: Iterator<Item = &'a dyn ToValue> + 'a,
    {
        Self {
            len,
            items: Box::new(items),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<'a> Iterator for Elements<'a> {
    type Item = &'a dyn ToValue;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next()
    }
}

/// The entries of a map, with their count known up front.
pub struct Entries<'a> {
    len: usize,
    items: Box<dyn Iterator<Item = (&'a dyn ToValue, &'a dyn ToValue)> + 'a>,
}

impl<'a> Entries<'a> {
    /// `items` must yield exactly `len` key/value pairs.
    pub fn new<I>(len: usize, items: I) -> Self
    where
        I: Iterator<Item = (&'a dyn ToValue, &'a dyn ToValue)> + 'a,
    {
        Self {
            len,
            items: Box::new(items),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = (&'a dyn ToValue, &'a dyn ToValue);

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next()
    }
}

/// Serialization to text, wrapped in a bulk string by the marshaler.
pub trait MarshalText {
    fn marshal_text(&self) -> Result<Vec<u8>, BoxError>;
}

/// Serialization to binary, wrapped in a bulk string by the marshaler.
pub trait MarshalBinary {
    fn marshal_binary(&self) -> Result<Vec<u8>, BoxError>;
}

/// Classifies a value into one of the [`Value`] kinds.
pub trait ToValue {
    fn to_value(&self) -> Value<'_>;

    /// Lets `[u8]` sequences encode as bulk strings instead of arrays of
    /// integers. Only `u8` overrides this.
    #[doc(hidden)]
    fn slice_as_bytes(items: &[Self]) -> Option<&[u8]>
    where
        Self: Sized,
    {
        let _ = items;
        None
    }
}

// ----------------------------------------------------------------------
// Text and bytes
// ----------------------------------------------------------------------

impl ToValue for str {
    fn to_value(&self) -> Value<'_> {
        Value::Str(self)
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value<'_> {
        Value::Str(self)
    }
}

impl ToValue for Cow<'_, str> {
    fn to_value(&self) -> Value<'_> {
        Value::Str(self)
    }
}

impl ToValue for Bytes {
    fn to_value(&self) -> Value<'_> {
        Value::Bytes(self)
    }
}

impl ToValue for BytesMut {
    fn to_value(&self) -> Value<'_> {
        Value::Bytes(self)
    }
}

// ----------------------------------------------------------------------
// Scalars
// ----------------------------------------------------------------------

impl ToValue for bool {
    fn to_value(&self) -> Value<'_> {
        Value::Bool(*self)
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value<'_> {
        Value::F32(*self)
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value<'_> {
        Value::F64(*self)
    }
}

impl ToValue for () {
    fn to_value(&self) -> Value<'_> {
        Value::Nil
    }
}

impl ToValue for u8 {
    fn to_value(&self) -> Value<'_> {
        Value::Int(i64::from(*self))
    }

    fn slice_as_bytes(items: &[u8]) -> Option<&[u8]> {
        Some(items)
    }
}

macro_rules! signed_to_value {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value<'_> {
                    Value::Int(*self as i64)
                }
            }
        )*
    };
}

macro_rules! unsigned_to_value {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value<'_> {
                    Value::UInt(*self as u64)
                }
            }
        )*
    };
}

signed_to_value!(i8, i16, i32, i64, isize);
unsigned_to_value!(u16, u32, u64, usize);

// ----------------------------------------------------------------------
// Errors
// ----------------------------------------------------------------------

impl ToValue for dyn std::error::Error {
    fn to_value(&self) -> Value<'_> {
        Value::Error(self)
    }
}

impl ToValue for dyn std::error::Error + Send + Sync {
    fn to_value(&self) -> Value<'_> {
        Value::Error(self)
    }
}

impl ToValue for std::io::Error {
    fn to_value(&self) -> Value<'_> {
        Value::Error(self)
    }
}

impl ToValue for RespError {
    fn to_value(&self) -> Value<'_> {
        Value::Error(self)
    }
}

// ----------------------------------------------------------------------
// Values that marshal themselves
// ----------------------------------------------------------------------

macro_rules! self_marshaling {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value<'_> {
                    Value::Marshaler(self)
                }
            }
        )*
    };
}

self_marshaling!(SimpleString, SimpleError, Integer, BulkString, ArrayHeader, RespValue);

// ----------------------------------------------------------------------
// References
// ----------------------------------------------------------------------

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value<'_> {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for &mut T {
    fn to_value(&self) -> Value<'_> {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for Box<T> {
    fn to_value(&self) -> Value<'_> {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for Rc<T> {
    fn to_value(&self) -> Value<'_> {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for Arc<T> {
    fn to_value(&self) -> Value<'_> {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value<'_> {
        Value::Ref(self.as_ref().map(|v| v as &dyn ToValue))
    }
}

// ----------------------------------------------------------------------
// Sequences
// ----------------------------------------------------------------------

fn elements<'a, T: ToValue>(items: &'a [T]) -> Value<'a> {
    match T::slice_as_bytes(items) {
        Some(bytes) => Value::Bytes(bytes),
        None => Value::Seq(Some(Elements::new(
            items.len(),
            items.iter().map(|v| v as &dyn ToValue),
        ))),
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value<'_> {
        elements(self)
    }
}

impl<T: ToValue, const N: usize> ToValue for [T; N] {
    fn to_value(&self) -> Value<'_> {
        elements(self)
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value<'_> {
        elements(self)
    }
}

impl<T: ToValue> ToValue for VecDeque<T> {
    fn to_value(&self) -> Value<'_> {
        Value::Seq(Some(Elements::new(
            self.len(),
            self.iter().map(|v| v as &dyn ToValue),
        )))
    }
}

// ----------------------------------------------------------------------
// Maps
// ----------------------------------------------------------------------

impl<K: ToValue, V: ToValue, S> ToValue for HashMap<K, V, S> {
    fn to_value(&self) -> Value<'_> {
        Value::Map(Some(Entries::new(
            self.len(),
            self.iter().map(|(k, v)| (k as &dyn ToValue, v as &dyn ToValue)),
        )))
    }
}

impl<K: ToValue, V: ToValue> ToValue for BTreeMap<K, V> {
    fn to_value(&self) -> Value<'_> {
        Value::Map(Some(Entries::new(
            self.len(),
            self.iter().map(|(k, v)| (k as &dyn ToValue, v as &dyn ToValue)),
        )))
    }
}

/// An optional container whose absence encodes as the nil array (`*-1\r\n`)
/// rather than the nil bulk string that `Option` produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nullable<C>(pub Option<C>);

impl<C: ToValue> ToValue for Nullable<C> {
    fn to_value(&self) -> Value<'_> {
        match &self.0 {
            Some(container) => container.to_value(),
            None => Value::Seq(None),
        }
    }
}

// ----------------------------------------------------------------------
// Dynamically typed values
// ----------------------------------------------------------------------

/// A value whose concrete type is only known at run time.
///
/// `dyn Dynamic` is classified by checking, in dispatch order, the concrete
/// types the marshaler knows about. Anything else is reported as
/// [`Value::Unsupported`] with its type name.
pub trait Dynamic: Any {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> Dynamic for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

macro_rules! classify_as {
    ($any:expr; $($t:ty),* $(,)?) => {
        $(
            if let Some(v) = $any.downcast_ref::<$t>() {
                return v.to_value();
            }
        )*
    };
}

impl ToValue for dyn Dynamic {
    fn to_value(&self) -> Value<'_> {
        let any = self.as_any();
        classify_as!(any;
            Vec<u8>, Bytes, BytesMut, &'static [u8],
            String, &'static str,
            bool, f32, f64, (),
            i8, i16, i32, i64, isize, u8, u16, u32, u64, usize,
            std::io::Error, Box<dyn std::error::Error + Send + Sync>,
            SimpleString, SimpleError, Integer, BulkString, ArrayHeader, RespValue,
            Box<dyn Dynamic>,
            Vec<Box<dyn Dynamic>>,
            Vec<String>,
            HashMap<String, Box<dyn Dynamic>>,
            Option<Box<dyn Dynamic>>,
        );
        Value::Unsupported(self.type_name())
    }
}
