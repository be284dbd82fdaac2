//! Dynamic values carried as command arguments and results.
//!
//! [`Value`] is a closed, tree-shaped sum type. Every command receives one as
//! its argument and returns one as its result, so the same type flows through
//! the internal command language and the external RPC bridge. Cloning is a
//! deep copy and ownership guarantees a value never contains a cycle.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Ordered list payload.
pub type ValueList = Vec<Value>;

/// Key-ordered map payload.
pub type ValueMap = BTreeMap<String, Value>;

/// A dynamically typed command value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Value {
    /// No value. Returned by commands that only have side effects.
    #[default]
    Empty,
    /// Signed 64-bit integer.
    Int(i64),
    /// UTF-8 text.
    String(String),
    /// Uninterpreted bytes, such as a binary hash.
    Raw(Vec<u8>),
    /// Ordered sequence of values.
    List(ValueList),
    /// String-keyed map with deterministic iteration order.
    Map(ValueMap),
}

/// Errors raised when a value is used as the wrong kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// An accessor was called on a value holding a different kind.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Kind the accessor required.
        expected: &'static str,
        /// Kind the value actually holds.
        found: &'static str,
    },
    /// A map lookup named a key that is not present.
    #[error("missing key '{key}'")]
    MissingKey {
        /// Key that was looked up.
        key: String,
    },
}

impl Value {
    /// Creates an empty list value.
    #[must_use]
    pub const fn list() -> Self {
        Self::List(Vec::new())
    }

    /// Creates an empty map value.
    #[must_use]
    pub const fn map() -> Self {
        Self::Map(BTreeMap::new())
    }

    /// Creates a raw byte value.
    #[must_use]
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Raw(bytes.into())
    }

    /// Converts a collection size into an integer value, saturating on overflow.
    #[must_use]
    pub fn from_count(count: usize) -> Self {
        Self::Int(i64::try_from(count).unwrap_or(i64::MAX))
    }

    /// Returns the name of the stored kind, used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Int(_) => "int",
            Self::String(_) => "string",
            Self::Raw(_) => "raw",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Returns true for [`Value::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns true when the value holds an integer.
    #[must_use]
    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    /// Returns true when the value holds a string.
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// Returns true when the value holds a list.
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Returns true when the value holds a map.
    #[must_use]
    pub const fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    fn mismatch(&self, expected: &'static str) -> ValueError {
        ValueError::TypeMismatch {
            expected,
            found: self.type_name(),
        }
    }

    /// Returns the stored integer.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TypeMismatch`] for any other kind.
    pub fn as_int(&self) -> Result<i64, ValueError> {
        match self {
            Self::Int(value) => Ok(*value),
            other => Err(other.mismatch("int")),
        }
    }

    /// Returns the stored string.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TypeMismatch`] for any other kind.
    pub fn as_str(&self) -> Result<&str, ValueError> {
        match self {
            Self::String(value) => Ok(value),
            other => Err(other.mismatch("string")),
        }
    }

    /// Returns the stored bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TypeMismatch`] for any other kind.
    pub fn as_raw(&self) -> Result<&[u8], ValueError> {
        match self {
            Self::Raw(value) => Ok(value),
            other => Err(other.mismatch("raw")),
        }
    }

    /// Returns the stored list.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TypeMismatch`] for any other kind.
    pub fn as_list(&self) -> Result<&ValueList, ValueError> {
        match self {
            Self::List(value) => Ok(value),
            other => Err(other.mismatch("list")),
        }
    }

    /// Returns the stored list for in-place mutation.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TypeMismatch`] for any other kind.
    pub fn as_list_mut(&mut self) -> Result<&mut ValueList, ValueError> {
        match self {
            Self::List(value) => Ok(value),
            other => Err(other.mismatch("list")),
        }
    }

    /// Returns the stored map.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TypeMismatch`] for any other kind.
    pub fn as_map(&self) -> Result<&ValueMap, ValueError> {
        match self {
            Self::Map(value) => Ok(value),
            other => Err(other.mismatch("map")),
        }
    }

    /// Returns the stored map for in-place mutation.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TypeMismatch`] for any other kind.
    pub fn as_map_mut(&mut self) -> Result<&mut ValueMap, ValueError> {
        match self {
            Self::Map(value) => Ok(value),
            other => Err(other.mismatch("map")),
        }
    }

    /// Looks up `key` in a map value.
    ///
    /// # Errors
    ///
    /// Fails when the value is not a map or the key is absent.
    pub fn get_key(&self, key: &str) -> Result<&Self, ValueError> {
        self.as_map()?
            .get(key)
            .ok_or_else(|| ValueError::MissingKey {
                key: key.to_owned(),
            })
    }

    /// Looks up `key` in a map value for mutation.
    ///
    /// # Errors
    ///
    /// Fails when the value is not a map or the key is absent.
    pub fn get_key_mut(&mut self, key: &str) -> Result<&mut Self, ValueError> {
        self.as_map_mut()?
            .get_mut(key)
            .ok_or_else(|| ValueError::MissingKey {
                key: key.to_owned(),
            })
    }

    /// Returns true when the value is a map containing `key`.
    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        matches!(self, Self::Map(map) if map.contains_key(key))
    }

    /// Stores `value` under `key`, overwriting any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TypeMismatch`] when the value is not a map.
    pub fn insert_key(
        &mut self,
        key: impl Into<String>,
        value: Self,
    ) -> Result<&mut Self, ValueError> {
        let map = self.as_map_mut()?;
        let key = key.into();
        map.insert(key.clone(), value);
        map.get_mut(&key).ok_or(ValueError::MissingKey { key })
    }

    /// Stores `value` under `key` only when the key is absent, returning the
    /// slot that ends up holding the key.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TypeMismatch`] when the value is not a map.
    pub fn insert_preserve(
        &mut self,
        key: impl Into<String>,
        value: Self,
    ) -> Result<&mut Self, ValueError> {
        Ok(self.as_map_mut()?.entry(key.into()).or_insert(value))
    }

    /// Removes `key` from a map value, returning the previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TypeMismatch`] when the value is not a map.
    pub fn erase_key(&mut self, key: &str) -> Result<Option<Self>, ValueError> {
        Ok(self.as_map_mut()?.remove(key))
    }

    /// Appends `value` to a list value.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TypeMismatch`] when the value is not a list.
    pub fn push_back(&mut self, value: Self) -> Result<(), ValueError> {
        self.as_list_mut()?.push(value);
        Ok(())
    }

    /// Returns true when a list value holds an element structurally equal to
    /// `needle`.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TypeMismatch`] when the value is not a list.
    pub fn list_has(&self, needle: &Self) -> Result<bool, ValueError> {
        Ok(self.as_list()?.contains(needle))
    }

    /// Appends `value` unless an equal element is already present. Returns
    /// whether the list grew.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TypeMismatch`] when the value is not a list.
    pub fn push_back_unique(&mut self, value: Self) -> Result<bool, ValueError> {
        let list = self.as_list_mut()?;
        if list.contains(&value) {
            return Ok(false);
        }
        list.push(value);
        Ok(true)
    }

    /// Removes every element equal to `needle`, keeping the order of the
    /// remainder. Returns the number of removed elements.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TypeMismatch`] when the value is not a list.
    pub fn list_remove(&mut self, needle: &Self) -> Result<usize, ValueError> {
        let list = self.as_list_mut()?;
        let before = list.len();
        list.retain(|element| element != needle);
        Ok(before - list.len())
    }

    /// Unwraps the argument of a list-field command: a non-empty list yields
    /// its first element, anything else yields itself.
    #[must_use]
    pub fn argument(&self) -> &Self {
        match self {
            Self::List(list) => list.first().unwrap_or(self),
            other => other,
        }
    }

    /// Orders two values of the same scalar kind.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TypeMismatch`] when the kinds differ or are not
    /// comparable.
    pub fn compare(&self, other: &Self) -> Result<Ordering, ValueError> {
        match (self, other) {
            (Self::Empty, Self::Empty) => Ok(Ordering::Equal),
            (Self::Int(left), Self::Int(right)) => Ok(left.cmp(right)),
            (Self::String(left), Self::String(right)) => Ok(left.cmp(right)),
            (Self::Raw(left), Self::Raw(right)) => Ok(left.cmp(right)),
            (Self::Int(_) | Self::String(_) | Self::Raw(_) | Self::Empty, _) => {
                Err(other.mismatch(self.type_name()))
            }
            (Self::List(_) | Self::Map(_), _) => Err(self.mismatch("int, string or raw")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Int(value) => write!(formatter, "{value}"),
            Self::String(value) => formatter.write_str(value),
            Self::Raw(bytes) => formatter.write_str(&String::from_utf8_lossy(bytes)),
            Self::List(list) => {
                formatter.write_str("{")?;
                for (position, element) in list.iter().enumerate() {
                    if position > 0 {
                        formatter.write_str(", ")?;
                    }
                    write!(formatter, "{element}")?;
                }
                formatter.write_str("}")
            }
            Self::Map(map) => {
                formatter.write_str("{")?;
                for (position, (key, element)) in map.iter().enumerate() {
                    if position > 0 {
                        formatter.write_str(", ")?;
                    }
                    write!(formatter, "{key}: {element}")?;
                }
                formatter.write_str("}")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<ValueList> for Value {
    fn from(value: ValueList) -> Self {
        Self::List(value)
    }
}

impl From<ValueMap> for Value {
    fn from(value: ValueMap) -> Self {
        Self::Map(value)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_unit(),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::String(value) => serializer.serialize_str(value),
            Self::Raw(bytes) => serializer.serialize_bytes(bytes),
            Self::List(list) => {
                let mut seq = serializer.serialize_seq(Some(list.len()))?;
                for element in list {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Self::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, element) in map {
                    out.serialize_entry(key, element)?;
                }
                out.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("null, an integer, a string, bytes, a list or a map")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Empty)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Empty)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Value, E> {
        Ok(Value::from(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Value, E> {
        Ok(Value::Int(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Value, E> {
        i64::try_from(value)
            .map(Value::Int)
            .map_err(|_| E::custom(format!("integer {value} does not fit in 64 signed bits")))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Value, E> {
        Err(E::custom(format!(
            "floating point value {value} is not supported"
        )))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Value, E> {
        Ok(Value::from(value))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Value, E> {
        Ok(Value::String(value))
    }

    fn visit_bytes<E: de::Error>(self, value: &[u8]) -> Result<Value, E> {
        Ok(Value::raw(value))
    }

    fn visit_byte_buf<E: de::Error>(self, value: Vec<u8>) -> Result<Value, E> {
        Ok(Value::Raw(value))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut list = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(element) = seq.next_element()? {
            list.push(element);
        }
        Ok(Value::List(list))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = BTreeMap::new();
        while let Some((key, element)) = access.next_entry::<String, Value>()? {
            map.insert(key, element);
        }
        Ok(Value::Map(map))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn strings(items: &[&str]) -> Value {
        Value::List(items.iter().map(|item| Value::from(*item)).collect())
    }

    #[rstest]
    #[case(Value::Int(3), "list")]
    #[case(Value::from("x"), "list")]
    #[case(Value::map(), "list")]
    fn list_accessor_rejects_other_kinds(#[case] value: Value, #[case] expected: &str) {
        let error = value.as_list().expect_err("accessor should fail");
        assert!(matches!(
            error,
            ValueError::TypeMismatch { expected: e, .. } if e == expected
        ));
    }

    #[test]
    fn int_accessor_reports_found_kind() {
        let error = Value::from("text").as_int().expect_err("not an int");
        assert_eq!(
            error,
            ValueError::TypeMismatch {
                expected: "int",
                found: "string"
            }
        );
    }

    #[test]
    fn insert_key_overwrites_existing_entry() {
        let mut value = Value::map();
        value.insert_key("a", Value::Int(1)).expect("insert");
        value.insert_key("a", Value::Int(2)).expect("overwrite");
        assert_eq!(value.as_map().expect("map").len(), 1);
        assert_eq!(value.get_key("a").expect("key"), &Value::Int(2));
    }

    #[test]
    fn insert_preserve_keeps_existing_entry() {
        let mut value = Value::map();
        value.insert_key("views", strings(&["main"])).expect("insert");
        let slot = value
            .insert_preserve("views", Value::list())
            .expect("preserve");
        assert_eq!(slot, &strings(&["main"]));
    }

    #[test]
    fn get_key_reports_missing_key() {
        let value = Value::map();
        assert_eq!(
            value.get_key("absent"),
            Err(ValueError::MissingKey {
                key: "absent".to_owned()
            })
        );
    }

    #[test]
    fn push_back_unique_ignores_structural_duplicates() {
        let mut list = Value::List(vec![strings(&["a", "b"]), Value::Int(1)]);
        let grew = list
            .push_back_unique(strings(&["a", "b"]))
            .expect("list");
        assert!(!grew);
        assert_eq!(list.as_list().expect("list").len(), 2);

        assert!(list.push_back_unique(Value::Int(2)).expect("list"));
        assert_eq!(list.as_list().expect("list").len(), 3);
    }

    #[test]
    fn list_has_uses_deep_equality() {
        let mut nested = Value::map();
        nested.insert_key("k", Value::Int(1)).expect("insert");
        let list = Value::List(vec![nested.clone()]);
        assert!(list.list_has(&nested).expect("list"));
        assert!(!list.list_has(&Value::map()).expect("list"));
    }

    #[test]
    fn list_remove_drops_all_matches_and_keeps_order() {
        let mut list = strings(&["a", "x", "b", "x", "c"]);
        let removed = list.list_remove(&Value::from("x")).expect("list");
        assert_eq!(removed, 2);
        assert_eq!(list, strings(&["a", "b", "c"]));
    }

    #[rstest]
    #[case(strings(&["first", "second"]), Value::from("first"))]
    #[case(Value::list(), Value::list())]
    #[case(Value::from("bare"), Value::from("bare"))]
    fn argument_unwraps_first_list_element(#[case] input: Value, #[case] expected: Value) {
        assert_eq!(input.argument(), &expected);
    }

    #[test]
    fn compare_orders_same_kind_scalars() {
        assert_eq!(
            Value::Int(1).compare(&Value::Int(2)),
            Ok(Ordering::Less)
        );
        assert_eq!(
            Value::from("b").compare(&Value::from("a")),
            Ok(Ordering::Greater)
        );
        assert!(Value::Int(1).compare(&Value::from("1")).is_err());
        assert!(Value::list().compare(&Value::list()).is_err());
    }

    #[test]
    fn serializes_to_json_shapes() {
        let mut map = Value::map();
        map.insert_key("b", Value::Int(2)).expect("insert");
        map.insert_key("a", Value::List(vec![Value::Empty, Value::from("s")]))
            .expect("insert");
        let json = serde_json::to_string(&map).expect("serialize");
        assert_eq!(json, r#"{"a":[null,"s"],"b":2}"#);
    }

    #[test]
    fn deserializes_json_booleans_as_integers() {
        let value: Value = serde_json::from_str(r#"[true, false, 7, "x", {"k": null}]"#)
            .expect("deserialize");
        let mut inner = Value::map();
        inner.insert_key("k", Value::Empty).expect("insert");
        assert_eq!(
            value,
            Value::List(vec![
                Value::Int(1),
                Value::Int(0),
                Value::Int(7),
                Value::from("x"),
                inner,
            ])
        );
    }

    #[test]
    fn rejects_json_floats() {
        let result: Result<Value, _> = serde_json::from_str("1.5");
        assert!(result.is_err());
    }

    #[test]
    fn display_renders_nested_lists() {
        let value = Value::List(vec![Value::Int(1), strings(&["a", "b"])]);
        assert_eq!(value.to_string(), "{1, {a, b}}");
    }
}
