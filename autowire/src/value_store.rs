//! The [ValueStore] holds configuration scalars consulted when assembling components with value
//! parameters (`bool`, integers, floats and `String`s).
//!
//! Keys are flat and case-insensitive - they are upper-cased when written and when read. Sectioned
//! input (`section -> key -> value`) is flattened to `SECTION_KEY`, which matches the keys derived
//! from assembly paths, e.g. a `greeting` parameter of a component injected into a `service`
//! parameter is looked up as `SERVICE_GREETING`. Since only flat keys are stored, different
//! sections can collide, e.g. `a.b_c` and `a_b.c` both become `A_B_C`; duplicate errors carry the
//! flat key.
//!
//! Values are stored as provided and converted on read:
//!
//! * to `String` - any value, using its textual representation
//! * to integers - integers, integral floats, booleans (`0`/`1`) and parseable strings
//! * to floats - any number, booleans and parseable strings
//! * to `bool` - booleans, `0`/`1` integers and the strings `1`, `yes`, `true`, `on`, `0`, `no`,
//! `false`, `off` (case-insensitive)

use crate::error::ValueStoreError;
use fxhash::FxHashMap;
use std::fmt::{Display, Formatter};
use tracing::debug;

/// Kind of scalar a value parameter expects.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    String,
}

/// A single configuration value.
#[derive(Clone, PartialEq, Debug)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ScalarValue {
    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            ScalarValue::Bool(_) => ValueKind::Bool,
            ScalarValue::Int(_) => ValueKind::Int,
            ScalarValue::Float(_) => ValueKind::Float,
            ScalarValue::String(_) => ValueKind::String,
        }
    }

    /// Converts this value to the given kind, if possible. See the module documentation for the
    /// conversion rules.
    pub fn convert(&self, kind: ValueKind) -> Option<ScalarValue> {
        match (kind, self) {
            (ValueKind::String, value) => Some(ScalarValue::String(value.to_string())),
            (ValueKind::Int, ScalarValue::Int(value)) => Some(ScalarValue::Int(*value)),
            (ValueKind::Int, ScalarValue::Bool(value)) => Some(ScalarValue::Int(*value as i64)),
            (ValueKind::Int, ScalarValue::Float(value)) => {
                if value.is_finite()
                    && value.fract() == 0.0
                    && *value >= i64::MIN as f64
                    && *value < i64::MAX as f64
                {
                    Some(ScalarValue::Int(*value as i64))
                } else {
                    None
                }
            }
            (ValueKind::Int, ScalarValue::String(value)) => {
                value.trim().parse().ok().map(ScalarValue::Int)
            }
            (ValueKind::Float, ScalarValue::Float(value)) => Some(ScalarValue::Float(*value)),
            (ValueKind::Float, ScalarValue::Int(value)) => Some(ScalarValue::Float(*value as f64)),
            (ValueKind::Float, ScalarValue::Bool(value)) => {
                Some(ScalarValue::Float(if *value { 1.0 } else { 0.0 }))
            }
            (ValueKind::Float, ScalarValue::String(value)) => {
                value.trim().parse().ok().map(ScalarValue::Float)
            }
            (ValueKind::Bool, ScalarValue::Bool(value)) => Some(ScalarValue::Bool(*value)),
            (ValueKind::Bool, ScalarValue::Int(0)) => Some(ScalarValue::Bool(false)),
            (ValueKind::Bool, ScalarValue::Int(1)) => Some(ScalarValue::Bool(true)),
            (ValueKind::Bool, ScalarValue::String(value)) => {
                match value.trim().to_lowercase().as_str() {
                    "1" | "yes" | "true" | "on" => Some(ScalarValue::Bool(true)),
                    "0" | "no" | "false" | "off" => Some(ScalarValue::Bool(false)),
                    _ => None,
                }
            }
            (ValueKind::Bool, _) => None,
        }
    }
}

impl Display for ScalarValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Bool(value) => value.fmt(f),
            ScalarValue::Int(value) => value.fmt(f),
            ScalarValue::Float(value) => value.fmt(f),
            ScalarValue::String(value) => value.fmt(f),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Int(value.into())
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float(value)
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::String(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::String(value.to_string())
    }
}

/// Types which can be created from a [ScalarValue].
pub trait FromScalar: Sized {
    /// Kind of value to convert to before extraction.
    const KIND: ValueKind;

    /// Converts the value, returning `None` if it's not representable as `Self`.
    fn from_scalar(value: &ScalarValue) -> Option<Self>;
}

impl FromScalar for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn from_scalar(value: &ScalarValue) -> Option<Self> {
        match value.convert(Self::KIND) {
            Some(ScalarValue::Bool(value)) => Some(value),
            _ => None,
        }
    }
}

impl FromScalar for String {
    const KIND: ValueKind = ValueKind::String;

    fn from_scalar(value: &ScalarValue) -> Option<Self> {
        match value.convert(Self::KIND) {
            Some(ScalarValue::String(value)) => Some(value),
            _ => None,
        }
    }
}

macro_rules! from_scalar_int {
    ($($ty:ty),*) => {
        $(
            impl FromScalar for $ty {
                const KIND: ValueKind = ValueKind::Int;

                fn from_scalar(value: &ScalarValue) -> Option<Self> {
                    match value.convert(Self::KIND) {
                        Some(ScalarValue::Int(value)) => <$ty>::try_from(value).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_scalar_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromScalar for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn from_scalar(value: &ScalarValue) -> Option<Self> {
        match value.convert(Self::KIND) {
            Some(ScalarValue::Float(value)) => Some(value),
            _ => None,
        }
    }
}

impl FromScalar for f32 {
    const KIND: ValueKind = ValueKind::Float;

    fn from_scalar(value: &ScalarValue) -> Option<Self> {
        f64::from_scalar(value).and_then(|value| {
            let narrowed = value as f32;
            (narrowed.is_finite() || !value.is_finite()).then_some(narrowed)
        })
    }
}

/// Creates a flat store key from a section and a key within it.
pub fn flatten_key(section: &str, key: &str) -> String {
    if section.is_empty() {
        key.to_uppercase()
    } else {
        format!("{section}_{key}").to_uppercase()
    }
}

/// Flat, case-insensitive map of configuration values.
#[derive(Clone, Default, Debug)]
pub struct ValueStore {
    values: FxHashMap<String, ScalarValue>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value for the given key.
    pub fn get(&self, key: &str) -> Option<&ScalarValue> {
        self.values.get(&key.to_uppercase())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(&key.to_uppercase())
    }

    /// Replaces the whole store with the given sectioned values.
    pub fn set<S, I, K, V>(
        &mut self,
        values: impl IntoIterator<Item = (S, I)>,
    ) -> Result<(), ValueStoreError>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ScalarValue>,
    {
        let mut store = Self::new();
        store.add(values)?;

        *self = store;
        Ok(())
    }

    /// Adds sectioned values to the store. Fails without modifying the store, if any resulting key
    /// is already present.
    pub fn add<S, I, K, V>(
        &mut self,
        values: impl IntoIterator<Item = (S, I)>,
    ) -> Result<(), ValueStoreError>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ScalarValue>,
    {
        let mut new_values = FxHashMap::default();
        for (section, names_with_values) in values {
            let section = section.as_ref();
            for (key, value) in names_with_values {
                let key = key.as_ref();
                let flat_key = flatten_key(section, key);
                if self.values.contains_key(&flat_key) || new_values.contains_key(&flat_key) {
                    return Err(ValueStoreError::DuplicateValue {
                        section: section.to_string(),
                        key: key.to_string(),
                        flat_key,
                    });
                }

                new_values.insert(flat_key, value.into());
            }
        }

        debug!(count = new_values.len(), "Adding values to value store.");

        self.values.extend(new_values);
        Ok(())
    }

    /// Adds a single value. See [ValueStore::add].
    pub fn add_value(
        &mut self,
        section: &str,
        key: &str,
        value: impl Into<ScalarValue>,
    ) -> Result<(), ValueStoreError> {
        self.add([(section, [(key, value)])])
    }

    /// Merges flat key/value pairs, overwriting existing keys.
    pub fn merge<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: Into<ScalarValue>,
    {
        self.values.extend(
            values
                .into_iter()
                .map(|(key, value)| (key.as_ref().to_uppercase(), value.into())),
        );
    }

    /// Reads a value from given section and converts it to `T`.
    pub fn value<T: FromScalar>(&self, section: &str, key: &str) -> Result<T, ValueStoreError> {
        let flat_key = flatten_key(section, key);
        let value = self
            .values
            .get(&flat_key)
            .ok_or_else(|| ValueStoreError::MissingValue {
                key: flat_key.clone(),
            })?;

        T::from_scalar(value).ok_or_else(|| ValueStoreError::TypeConversion {
            key: flat_key,
            expected: T::KIND,
            found: value.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }
}
