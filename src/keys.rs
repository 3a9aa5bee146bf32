//! Per-request key/value store.
//!
//! Middleware uses [`Keys`] to hand data to later handlers (an authenticated user,
//! a tenant id, request timings). Values are a closed set of kinds rather than
//! arbitrary `Any` objects, so reading a key back is a plain `match`.
//!
//! The store sits behind a read/write lock and the handle is cheap to clone: a
//! middleware that fans work out to other threads for the same request can pass a
//! clone along and keep reading and writing safely.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::error::RouterError;

/// A value stored in [`Keys`].
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Time(SystemTime),
    Duration(Duration),
    StrSlice(Vec<String>),
    StrMap(HashMap<String, String>),
    StrSliceMap(HashMap<String, Vec<String>>),
    Map(HashMap<String, KeyValue>),
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for KeyValue {
                fn from(v: $ty) -> Self {
                    KeyValue::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    String => Str,
    bool => Bool,
    i64 => Int,
    u64 => Uint,
    f64 => Float,
    SystemTime => Time,
    Duration => Duration,
    Vec<String> => StrSlice,
    HashMap<String, String> => StrMap,
    HashMap<String, Vec<String>> => StrSliceMap,
    HashMap<String, KeyValue> => Map,
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        KeyValue::Str(v.to_string())
    }
}

impl From<i32> for KeyValue {
    fn from(v: i32) -> Self {
        KeyValue::Int(i64::from(v))
    }
}

/// Shared handle to a request's key/value store.
#[derive(Debug, Clone, Default)]
pub struct Keys {
    inner: Arc<RwLock<HashMap<String, KeyValue>>>,
}

impl Keys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous value for `key`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<KeyValue>) {
        self.inner.write().insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<KeyValue> {
        self.inner.read().get(key).cloned()
    }

    /// Like [`Keys::get`] but reports a missing key as an error.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::MissingKey`] when `key` was never set.
    pub fn must_get(&self, key: &str) -> Result<KeyValue, RouterError> {
        self.get(key)
            .ok_or_else(|| RouterError::MissingKey(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    fn with<T>(&self, key: &str, f: impl FnOnce(&KeyValue) -> Option<T>) -> Option<T> {
        self.inner.read().get(key).and_then(f)
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.with(key, |v| match v {
            KeyValue::Str(s) => Some(s.clone()),
            _ => None,
        })
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.with(key, |v| match v {
            KeyValue::Bool(b) => Some(*b),
            _ => None,
        })
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.with(key, |v| match v {
            KeyValue::Int(i) => Some(*i),
            _ => None,
        })
    }

    pub fn uint(&self, key: &str) -> Option<u64> {
        self.with(key, |v| match v {
            KeyValue::Uint(u) => Some(*u),
            _ => None,
        })
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.with(key, |v| match v {
            KeyValue::Float(f) => Some(*f),
            _ => None,
        })
    }

    pub fn time(&self, key: &str) -> Option<SystemTime> {
        self.with(key, |v| match v {
            KeyValue::Time(t) => Some(*t),
            _ => None,
        })
    }

    pub fn duration(&self, key: &str) -> Option<Duration> {
        self.with(key, |v| match v {
            KeyValue::Duration(d) => Some(*d),
            _ => None,
        })
    }

    pub fn string_slice(&self, key: &str) -> Option<Vec<String>> {
        self.with(key, |v| match v {
            KeyValue::StrSlice(s) => Some(s.clone()),
            _ => None,
        })
    }

    pub fn string_map(&self, key: &str) -> Option<HashMap<String, KeyValue>> {
        self.with(key, |v| match v {
            KeyValue::Map(m) => Some(m.clone()),
            _ => None,
        })
    }

    pub fn string_map_string(&self, key: &str) -> Option<HashMap<String, String>> {
        self.with(key, |v| match v {
            KeyValue::StrMap(m) => Some(m.clone()),
            _ => None,
        })
    }

    pub fn string_map_string_slice(&self, key: &str) -> Option<HashMap<String, Vec<String>>> {
        self.with(key, |v| match v {
            KeyValue::StrSliceMap(m) => Some(m.clone()),
            _ => None,
        })
    }
}
