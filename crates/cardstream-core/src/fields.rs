//! Field maps exchanged with the gateway and their form encoding.
//!
//! Requests and responses are flat `key=value` maps. One level of nesting is
//! used on the wire (`threeDSRequest[...]`, `threeDSResponse[...]`,
//! `browserInfo[...]`), which is represented by [`FieldValue::Map`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// A single field value: plain text or a nested map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Map(Fields),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            FieldValue::Text(_) => None,
            FieldValue::Map(map) => Some(map),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        FieldValue::Text(value.clone())
    }
}

impl From<Fields> for FieldValue {
    fn from(value: Fields) -> Self {
        FieldValue::Map(value)
    }
}

/// Insertion-ordered map of gateway fields.
///
/// Inserting an existing key replaces its value in place, so merging maps
/// behaves like merging associative arrays: later values win, first
/// positions are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(IndexMap<String, FieldValue>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Inserts the value only when present. Absent values are not sent.
    pub fn insert_opt<V: Into<FieldValue>>(&mut self, key: impl Into<String>, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    /// Chained form of [`Fields::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_str)
    }

    /// Like [`Fields::get_str`] but treats empty strings as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get_str(key).filter(|value| !value.is_empty())
    }

    pub fn get_map(&self, key: &str) -> Option<&Fields> {
        self.get(key).and_then(FieldValue::as_map)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.0.shift_remove(key)
    }

    /// Merges `other` into `self`; values from `other` override.
    pub fn extend(&mut self, other: Fields) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Sorts the top-level keys by byte order. Nested maps keep their order.
    pub fn sort_keys(&mut self) {
        self.0.sort_keys();
    }

    /// Encodes the map as a form-encoded query string in insertion order.
    pub fn to_query(&self) -> String {
        let mut pairs = Vec::with_capacity(self.len());
        for (key, value) in &self.0 {
            push_pairs(&mut pairs, encode_component(key), value);
        }
        pairs.join("&")
    }

    /// Decodes a form-encoded body.
    ///
    /// Keys of the form `outer[inner]` are collected into a nested map under
    /// `outer`. Malformed percent sequences are kept literally.
    pub fn parse(body: &str) -> Self {
        let mut fields = Fields::new();
        for (key, value) in form_urlencoded::parse(body.trim().as_bytes()) {
            match split_nested(&key) {
                Some((outer, inner)) => {
                    let entry = fields
                        .0
                        .entry(outer.to_owned())
                        .or_insert_with(|| FieldValue::Map(Fields::new()));
                    if let FieldValue::Text(_) = entry {
                        *entry = FieldValue::Map(Fields::new());
                    }
                    if let FieldValue::Map(map) = entry {
                        map.insert(inner, value.into_owned());
                    }
                }
                None => {
                    fields.insert(key.into_owned(), value.into_owned());
                }
            }
        }
        fields
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = indexmap::map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Percent-encodes a single query component.
///
/// ASCII alphanumerics and `-_.` are kept, space becomes `+`, every other
/// byte is written as `%XX` with upper-case hex.
pub fn encode_component(input: &str) -> String {
    form_urlencoded::byte_serialize(input.as_bytes())
        .collect::<String>()
        .replace('*', "%2A")
}

fn push_pairs(pairs: &mut Vec<String>, name: String, value: &FieldValue) {
    match value {
        FieldValue::Text(text) => pairs.push(format!("{name}={}", encode_component(text))),
        FieldValue::Map(map) => {
            for (key, inner) in &map.0 {
                push_pairs(pairs, format!("{name}%5B{}%5D", encode_component(key)), inner);
            }
        }
    }
}

fn split_nested(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    if open == 0 {
        return None;
    }
    let inner = key[open + 1..].strip_suffix(']')?;
    Some((&key[..open], inner))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_like_a_form_post() {
        let fields = Fields::new()
            .with("orderRef", "Test purchase #1")
            .with("note", "a*b~c-d_e.f")
            .with("customerName", "Jane O'Doe & Co");

        assert_eq!(
            fields.to_query(),
            "orderRef=Test+purchase+%231&note=a%2Ab%7Ec-d_e.f&customerName=Jane+O%27Doe+%26+Co"
        );
    }

    #[test]
    fn nested_maps_use_bracketed_keys() {
        let fields = Fields::new().with("threeDSRef", "R").with(
            "threeDSResponse",
            Fields::new().with("cres", "Y").with("threeDSMethodData", "abc"),
        );

        assert_eq!(
            fields.to_query(),
            "threeDSRef=R&threeDSResponse%5Bcres%5D=Y&threeDSResponse%5BthreeDSMethodData%5D=abc"
        );
    }

    #[test]
    fn parses_nested_and_plain_keys() {
        let fields = Fields::parse(
            "responseCode=65802&threeDSRequest%5Bcreq%5D=abc%3D&threeDSRequest[threeDSMethodData]=x+y&flag",
        );

        assert_eq!(fields.get_str("responseCode"), Some("65802"));
        let nested = fields.get_map("threeDSRequest").unwrap();
        assert_eq!(nested.get_str("creq"), Some("abc="));
        assert_eq!(nested.get_str("threeDSMethodData"), Some("x y"));
        assert_eq!(fields.get_str("flag"), Some(""));
    }

    #[test]
    fn empty_body_parses_to_empty_map() {
        assert!(Fields::parse("").is_empty());
        assert!(Fields::parse("  \n").is_empty());
    }

    #[test]
    fn insert_keeps_first_position() {
        let mut fields = Fields::new().with("a", "1").with("b", "2");
        fields.extend(Fields::new().with("a", "3").with("c", "4"));

        assert_eq!(fields.to_query(), "a=3&b=2&c=4");
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let mut fields = Fields::new().with("a", "1").with("b", "2").with("c", "3");
        fields.remove("b");

        assert_eq!(fields.to_query(), "a=1&c=3");
    }

    #[test]
    fn serializes_to_json_objects() {
        let fields = Fields::new()
            .with("xref", "X1")
            .with("threeDSRequest", Fields::new().with("creq", "C"));

        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(json, r#"{"xref":"X1","threeDSRequest":{"creq":"C"}}"#);
    }
}
