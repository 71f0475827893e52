//! # JSON Pointer — Document Addressing
//!
//! `JsonPointer` is an immutable path into a JSON document (RFC 6901).
//! It is the addressing syntax used inside `$ref` fragments and for every
//! externally visible location in a schema.
//!
//! ## Escaping
//!
//! Each reference token has a *raw* form (the actual object key or array
//! index) and a *cooked* form used in the text representation: `~` is
//! written `~0` and `/` is written `~1`. Parsing is strict: a `~` followed
//! by anything other than `0` or `1`, including a trailing `~`, is rejected.
//!
//! ## Lookup Semantics
//!
//! [`JsonPointer::get`] never fails. A token that names an absent member, an
//! out-of-range or malformed array index, or a step through a scalar yields
//! `None`. Array indices must be `0` or a decimal without leading zeros, so
//! `/00` never addresses an array element.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::PointerError;

/// An immutable sequence of raw reference tokens.
///
/// # Invariants
///
/// - The empty sequence is the document root and serializes to `""`.
/// - Every other pointer serializes to one `/`-prefixed cooked token per
///   raw token, so `parse(to_string(p)) == p` for every pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPointer {
    tokens: Vec<String>,
}

impl JsonPointer {
    /// The root pointer.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a pointer from raw (unescaped) tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the text form of a pointer.
    ///
    /// # Errors
    ///
    /// Returns `PointerError::NoLeadingSlash` for non-empty text that does
    /// not start with `/`, and `PointerError::BadEscape` for a `~` not
    /// followed by `0` or `1`.
    pub fn parse(input: &str) -> Result<Self, PointerError> {
        if input.is_empty() {
            return Ok(Self::root());
        }
        if !input.starts_with('/') {
            return Err(PointerError::NoLeadingSlash {
                input: input.to_string(),
            });
        }

        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut chars = input.char_indices().skip(1);
        while let Some((offset, c)) = chars.next() {
            match c {
                '/' => tokens.push(std::mem::take(&mut current)),
                '~' => match chars.next() {
                    Some((_, '0')) => current.push('~'),
                    Some((_, '1')) => current.push('/'),
                    _ => {
                        return Err(PointerError::BadEscape {
                            input: input.to_string(),
                            offset,
                        })
                    }
                },
                other => current.push(other),
            }
        }
        tokens.push(current);
        Ok(Self { tokens })
    }

    /// Returns true if this is the root pointer.
    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of reference tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if this pointer has no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The raw tokens, root first.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The last raw token, or `None` at the root.
    pub fn last(&self) -> Option<&str> {
        self.tokens.last().map(String::as_str)
    }

    /// The pointer one level up, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, head) = self.tokens.split_last()?;
        Some(Self {
            tokens: head.to_vec(),
        })
    }

    /// A new pointer with one raw token appended.
    pub fn append(&self, token: impl Into<String>) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(token.into());
        Self { tokens }
    }

    /// A new pointer with an array index appended as its decimal string.
    pub fn append_index(&self, index: usize) -> Self {
        self.append(index.to_string())
    }

    /// A new pointer with all of `other`'s tokens appended.
    pub fn join(&self, other: &JsonPointer) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.extend(other.tokens.iter().cloned());
        Self { tokens }
    }

    /// Walk `document` along this pointer.
    ///
    /// Returns `None` as soon as a step cannot be taken; this is the
    /// "missing" sentinel, never an error.
    pub fn get<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.tokens
            .iter()
            .try_fold(document, |node, token| match node {
                Value::Object(members) => members.get(token),
                Value::Array(items) => array_index(token).and_then(|i| items.get(i)),
                _ => None,
            })
    }

    /// Returns true if `other` starts with every token of `self`.
    ///
    /// Equal pointers are parents of each other; the root is the parent of
    /// every pointer.
    pub fn is_parent_of(&self, other: &JsonPointer) -> bool {
        other.tokens.starts_with(&self.tokens)
    }

    /// The part of `other` below `self`, or `None` if `self` is not a parent
    /// of `other`. Equal pointers relativize to the root.
    pub fn relativize(&self, other: &JsonPointer) -> Option<JsonPointer> {
        if !self.is_parent_of(other) {
            return None;
        }
        Some(Self {
            tokens: other.tokens[self.tokens.len()..].to_vec(),
        })
    }
}

/// Cook a raw token for the text form: `~` → `~0`, then `/` → `~1`.
pub fn escape_token(raw: &str) -> String {
    if !raw.contains(['~', '/']) {
        return raw.to_string();
    }
    raw.replace('~', "~0").replace('/', "~1")
}

/// Interpret a token as an array index.
///
/// Only `0` and decimals without a leading zero qualify; anything else,
/// including `00`, `-1` and `+1`, is not an index.
fn array_index(token: &str) -> Option<usize> {
    let bytes = token.as_bytes();
    match bytes {
        [] => None,
        [b'0'] => Some(0),
        [b'0', ..] => None,
        _ if bytes.iter().all(u8::is_ascii_digit) => token.parse().ok(),
        _ => None,
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", escape_token(token))?;
        }
        Ok(())
    }
}

impl FromStr for JsonPointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JsonPointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_text_is_root() {
        let p = JsonPointer::parse("").unwrap();
        assert!(p.is_root());
        assert_eq!(p.to_string(), "");
    }

    #[test]
    fn single_slash_is_one_empty_token() {
        let p = JsonPointer::parse("/").unwrap();
        assert_eq!(p.tokens(), &["".to_string()]);
        assert_eq!(p.to_string(), "/");
    }

    #[test]
    fn escapes_are_decoded() {
        let p = JsonPointer::parse("/a~1b~0c/d").unwrap();
        assert_eq!(p.tokens(), &["a/b~c".to_string(), "d".to_string()]);
    }

    #[test]
    fn raw_token_with_slash_and_tilde_round_trips() {
        let p = JsonPointer::from_tokens(["a/b~c"]);
        assert_eq!(p.to_string(), "/a~1b~0c");
        assert_eq!(JsonPointer::parse("/a~1b~0c").unwrap(), p);
    }

    #[test]
    fn escape_order_is_tilde_first() {
        // "~1" raw must become "~01", not "~1" read back as "/".
        let p = JsonPointer::from_tokens(["~1"]);
        assert_eq!(p.to_string(), "/~01");
        assert_eq!(JsonPointer::parse("/~01").unwrap().tokens(), &["~1".to_string()]);
    }

    #[test]
    fn missing_leading_slash_rejected() {
        assert_eq!(
            JsonPointer::parse("a/b"),
            Err(PointerError::NoLeadingSlash {
                input: "a/b".to_string()
            })
        );
    }

    #[test]
    fn bad_escape_rejected_with_offset() {
        assert_eq!(
            JsonPointer::parse("/a~2"),
            Err(PointerError::BadEscape {
                input: "/a~2".to_string(),
                offset: 2
            })
        );
    }

    #[test]
    fn trailing_tilde_rejected() {
        assert!(matches!(
            JsonPointer::parse("/a/~"),
            Err(PointerError::BadEscape { offset: 3, .. })
        ));
    }

    #[test]
    fn get_walks_objects_and_arrays() {
        let doc = json!({"a": [{"b": 1}, {"b": 2}]});
        let p = JsonPointer::parse("/a/1/b").unwrap();
        assert_eq!(p.get(&doc), Some(&json!(2)));
        assert_eq!(JsonPointer::root().get(&doc), Some(&doc));
    }

    #[test]
    fn get_index_zero_resolves() {
        let doc = json!(["x", "y"]);
        assert_eq!(JsonPointer::parse("/0").unwrap().get(&doc), Some(&json!("x")));
    }

    #[test]
    fn get_leading_zero_index_is_missing() {
        let doc = json!(["x", "y", "z"]);
        assert_eq!(JsonPointer::parse("/00").unwrap().get(&doc), None);
        assert_eq!(JsonPointer::parse("/01").unwrap().get(&doc), None);
    }

    #[test]
    fn get_malformed_indices_are_missing() {
        let doc = json!(["x", "y"]);
        for bad in ["/-1", "/+1", "/a", "/1.0", "/", "/2"] {
            assert_eq!(JsonPointer::parse(bad).unwrap().get(&doc), None, "{bad}");
        }
    }

    #[test]
    fn get_through_scalar_is_missing() {
        let doc = json!({"a": "text"});
        assert_eq!(JsonPointer::parse("/a/b").unwrap().get(&doc), None);
        assert_eq!(JsonPointer::parse("/nope").unwrap().get(&doc), None);
    }

    #[test]
    fn numeric_key_on_object_is_member_lookup() {
        let doc = json!({"00": true});
        assert_eq!(JsonPointer::parse("/00").unwrap().get(&doc), Some(&json!(true)));
    }

    #[test]
    fn append_matches_step_by_step_resolution() {
        let doc = json!({"properties": {"p": {"items": [1, 2, 3]}}});
        let base = JsonPointer::parse("/properties/p").unwrap();
        let p = base.append("items").append_index(2);
        assert_eq!(p.to_string(), "/properties/p/items/2");
        let step = base.get(&doc).unwrap();
        assert_eq!(
            p.get(&doc),
            JsonPointer::from_tokens(["items", "2"]).get(step)
        );
    }

    #[test]
    fn join_concatenates() {
        let a = JsonPointer::parse("/a").unwrap();
        let b = JsonPointer::parse("/b/c").unwrap();
        assert_eq!(a.join(&b).to_string(), "/a/b/c");
        assert_eq!(JsonPointer::root().join(&b), b);
    }

    #[test]
    fn parent_and_last() {
        let p = JsonPointer::parse("/a/b").unwrap();
        assert_eq!(p.last(), Some("b"));
        assert_eq!(p.parent().unwrap().to_string(), "/a");
        assert!(JsonPointer::root().parent().is_none());
    }

    #[test]
    fn parent_of_and_relativize() {
        let a = JsonPointer::parse("/definitions").unwrap();
        let b = JsonPointer::parse("/definitions/d/type").unwrap();
        assert!(a.is_parent_of(&b));
        assert!(!b.is_parent_of(&a));
        assert_eq!(a.relativize(&b).unwrap().to_string(), "/d/type");
        assert!(b.relativize(&a).is_none());
        assert!(JsonPointer::root().is_parent_of(&b));
    }

    #[test]
    fn equal_pointers_are_mutual_parents() {
        let a = JsonPointer::parse("/x/y").unwrap();
        let b = a.clone();
        assert!(a.is_parent_of(&b) && b.is_parent_of(&a));
        assert!(a.relativize(&b).unwrap().is_root());
    }

    #[test]
    fn token_prefix_is_not_a_parent() {
        let a = JsonPointer::parse("/ab").unwrap();
        let b = JsonPointer::parse("/abc").unwrap();
        assert!(!a.is_parent_of(&b));
    }

    #[test]
    fn serde_uses_text_form() {
        let p = JsonPointer::parse("/a~1b/0").unwrap();
        let s = serde_json::to_string(&p).unwrap();
        assert_eq!(s, r#""/a~1b/0""#);
        let back: JsonPointer = serde_json::from_str(&s).unwrap();
        assert_eq!(back, p);
        assert!(serde_json::from_str::<JsonPointer>(r#""nope""#).is_err());
    }
}
