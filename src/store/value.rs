//! Stored Values
//!
//! In-process stores keep arbitrary objects; remote stores only keep byte or
//! string payloads. [`Value`] covers both and narrows back to a concrete type.

use bytes::Bytes;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A value held by a store
#[derive(Clone)]
pub enum Value {
    /// Raw byte payload
    Bytes(Bytes),
    /// UTF-8 string payload
    Text(String),
    /// Arbitrary in-process object
    Object(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wrap a typed value, mapping strings and byte buffers to payload variants
    pub fn from_typed<T: Any + Send + Sync>(value: T) -> Self {
        let boxed: Box<dyn Any + Send + Sync> = Box::new(value);
        let boxed = match boxed.downcast::<Value>() {
            Ok(value) => return *value,
            Err(other) => other,
        };
        let boxed = match boxed.downcast::<String>() {
            Ok(text) => return Value::Text(*text),
            Err(other) => other,
        };
        let boxed = match boxed.downcast::<Bytes>() {
            Ok(bytes) => return Value::Bytes(*bytes),
            Err(other) => other,
        };
        match boxed.downcast::<Vec<u8>>() {
            Ok(bytes) => Value::Bytes(Bytes::from(*bytes)),
            Err(other) => Value::Object(Arc::from(other)),
        }
    }

    /// Narrow to `T`, or `None` when the stored shape does not match.
    ///
    /// Byte and string payloads convert into each other when the bytes are
    /// valid UTF-8.
    pub fn narrow<T: Any + Clone>(&self) -> Option<T> {
        if let Some(same) = (self as &dyn Any).downcast_ref::<T>() {
            return Some(same.clone());
        }
        match self {
            Value::Object(object) => object.downcast_ref::<T>().cloned(),
            Value::Text(text) => {
                if let Some(v) = (text as &dyn Any).downcast_ref::<T>() {
                    return Some(v.clone());
                }
                let bytes = Bytes::copy_from_slice(text.as_bytes());
                narrow_bytes(&bytes)
            }
            Value::Bytes(bytes) => {
                if let Some(v) = narrow_bytes(bytes) {
                    return Some(v);
                }
                let text = std::str::from_utf8(bytes).ok()?.to_owned();
                (&text as &dyn Any).downcast_ref::<T>().cloned()
            }
        }
    }

    /// Payload bytes for string and byte values
    pub fn as_payload(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes.as_ref()),
            Value::Text(text) => Some(text.as_bytes()),
            Value::Object(_) => None,
        }
    }

    /// Short name of the variant, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Object(_) => "object",
        }
    }
}

fn narrow_bytes<T: Any + Clone>(bytes: &Bytes) -> Option<T> {
    if let Some(v) = (bytes as &dyn Any).downcast_ref::<T>() {
        return Some(v.clone());
    }
    let vec = bytes.to_vec();
    (&vec as &dyn Any).downcast_ref::<T>().cloned()
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            Value::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Value::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_owned())
    }
}

impl From<Bytes> for Value {
    fn from(bytes: Bytes) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(bytes))
    }
}
