//! # JSON References
//!
//! A `JsonRef` pairs a *locator* (the URI without its fragment) with a
//! classified *fragment*. It is the value a `$ref` or `id` string becomes,
//! and the key under which documents are fetched and cached.
//!
//! ## Variants
//!
//! The shape of the URI selects one of three resolution behaviours:
//!
//! - **Empty** — no scheme, authority, path or query (`""`, `"#"`,
//!   `"#/a"`). Resolving anything against it yields the other reference
//!   unchanged.
//! - **Hierarchical** — standard RFC 3986 resolution.
//! - **Archive** — an opaque absolute URI whose scheme-specific part
//!   contains `!` (`jar:file:/lib.jar!/schemas/a.json`). Resolution splits
//!   at the last `!`, resolves against the path remainder only, and
//!   re-attaches the prefix.
//!
//! ## Absoluteness
//!
//! A reference is absolute when its locator is absolute **and** its
//! fragment is the empty pointer. Only absolute references may be used as
//! loader and cache keys.
//!
//! ## Equality
//!
//! Two references are equal when their locators and fragments are equal.
//! A missing fragment and an empty fragment are the same, so
//! `http://x/a` equals `http://x/a#`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RefError;
use crate::pointer::{escape_token, JsonPointer};
use crate::uri::UriRef;

/// The decoded and classified fragment of a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefFragment {
    /// An absent or empty fragment, or one that parses as a JSON Pointer.
    Pointer(JsonPointer),
    /// A plain-name fragment such as `#foo`, addressable only through an
    /// `id` declaring it.
    Name(String),
    /// A fragment starting with `/` that is not a valid JSON Pointer.
    Illegal(String),
}

impl RefFragment {
    fn classify(decoded: &str) -> Self {
        if decoded.is_empty() {
            return Self::Pointer(JsonPointer::root());
        }
        if decoded.starts_with('/') {
            return match JsonPointer::parse(decoded) {
                Ok(pointer) => Self::Pointer(pointer),
                Err(_) => Self::Illegal(decoded.to_string()),
            };
        }
        Self::Name(decoded.to_string())
    }

    /// The pointer, if this fragment is one.
    pub fn as_pointer(&self) -> Option<&JsonPointer> {
        match self {
            Self::Pointer(pointer) => Some(pointer),
            Self::Name(_) | Self::Illegal(_) => None,
        }
    }

    /// Returns true for the empty pointer fragment.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Pointer(pointer) if pointer.is_root())
    }
}

/// Which resolution algorithm a reference uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// Fragment-only or blank reference.
    Empty,
    /// Ordinary hierarchical or relative URI.
    Hierarchical,
    /// Opaque archive locator with a `!` separator.
    Archive,
}

#[derive(Debug, Clone)]
enum Resolution {
    Empty,
    Hierarchical,
    Archive { prefix: String, path: UriRef },
}

/// A parsed JSON Reference.
#[derive(Debug, Clone)]
pub struct JsonRef {
    uri: UriRef,
    locator: String,
    fragment: RefFragment,
    resolution: Resolution,
}

impl JsonRef {
    /// The empty reference: resolving against it is the identity.
    pub fn empty() -> Self {
        Self::assemble(UriRef::default(), RefFragment::Pointer(JsonPointer::root()))
    }

    /// Parse a reference from its text form.
    ///
    /// # Errors
    ///
    /// Returns `RefError` if the text is not a valid URI reference or its
    /// fragment does not percent-decode to UTF-8.
    pub fn parse(input: &str) -> Result<Self, RefError> {
        Self::from_uri(UriRef::parse(input)?)
    }

    /// Build a reference from an already parsed URI.
    ///
    /// # Errors
    ///
    /// Returns `RefError::InvalidUri` if the fragment does not
    /// percent-decode to UTF-8.
    pub fn from_uri(uri: UriRef) -> Result<Self, RefError> {
        let fragment = match uri.fragment() {
            Some(raw) => {
                let decoded = urlencoding::decode(raw).map_err(|e| RefError::InvalidUri {
                    input: uri.to_string(),
                    reason: format!("fragment is not UTF-8 after percent-decoding: {e}"),
                })?;
                RefFragment::classify(&decoded)
            }
            None => RefFragment::Pointer(JsonPointer::root()),
        };
        Ok(Self::assemble(uri, fragment))
    }

    fn assemble(uri: UriRef, fragment: RefFragment) -> Self {
        let locator_uri = uri.without_fragment();
        let locator = locator_uri.to_string();
        let resolution = classify(&locator_uri);
        Self {
            uri,
            locator,
            fragment,
            resolution,
        }
    }

    /// Which resolution algorithm this reference uses.
    pub fn kind(&self) -> RefKind {
        match self.resolution {
            Resolution::Empty => RefKind::Empty,
            Resolution::Hierarchical => RefKind::Hierarchical,
            Resolution::Archive { .. } => RefKind::Archive,
        }
    }

    /// The full URI, fragment included.
    pub fn uri(&self) -> &UriRef {
        &self.uri
    }

    /// The URI without its fragment, as text.
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// The classified fragment.
    pub fn fragment(&self) -> &RefFragment {
        &self.fragment
    }

    /// The fragment as a pointer, if it is one.
    pub fn pointer(&self) -> Option<&JsonPointer> {
        self.fragment.as_pointer()
    }

    /// Returns true if the locator is absolute and the fragment is empty.
    pub fn is_absolute(&self) -> bool {
        self.uri.is_absolute() && self.fragment.is_empty()
    }

    /// Returns true if `other` has the same locator as `self`.
    pub fn contains(&self, other: &JsonRef) -> bool {
        self.locator == other.locator
    }

    /// This reference with its fragment removed.
    pub fn to_locator(&self) -> JsonRef {
        Self::assemble(self.uri.without_fragment(), RefFragment::Pointer(JsonPointer::root()))
    }

    /// This reference's locator with `pointer` as fragment.
    pub fn with_pointer(&self, pointer: &JsonPointer) -> JsonRef {
        let encoded: String = pointer
            .tokens()
            .iter()
            .map(|token| format!("/{}", urlencoding::encode(&escape_token(token))))
            .collect();
        Self::assemble(
            self.uri.with_fragment(Some(encoded)),
            RefFragment::Pointer(pointer.clone()),
        )
    }

    /// This reference's locator with a fragment given in URI text form.
    ///
    /// The fragment is percent-decoded and classified exactly as when parsing.
    ///
    /// # Errors
    ///
    /// Returns `RefError::InvalidUri` if the fragment holds characters not
    /// allowed in a URI or does not decode to UTF-8.
    pub fn with_fragment(&self, fragment: &str) -> Result<JsonRef, RefError> {
        Self::parse(&format!("{}#{fragment}", self.locator))
    }

    /// The full text form, fragment included.
    pub fn to_uri_string(&self) -> String {
        self.uri.to_string()
    }

    /// Resolve `other` against this reference as base.
    pub fn resolve(&self, other: &JsonRef) -> JsonRef {
        match &self.resolution {
            Resolution::Empty => other.clone(),
            Resolution::Hierarchical => {
                Self::assemble(self.uri.resolve(&other.uri), other.fragment.clone())
            }
            Resolution::Archive { prefix, path } => {
                if other.uri.is_absolute() {
                    return other.clone();
                }
                let resolved = path.resolve(&other.uri);
                if resolved.is_absolute() {
                    return other.clone();
                }
                match UriRef::parse(&format!("{prefix}{resolved}")) {
                    Ok(uri) => Self::assemble(uri, other.fragment.clone()),
                    Err(_) => other.clone(),
                }
            }
        }
    }

    /// Resolve a reference given in text form against this one.
    ///
    /// # Errors
    ///
    /// Returns `RefError` if `other` does not parse.
    pub fn resolve_str(&self, other: &str) -> Result<JsonRef, RefError> {
        Ok(self.resolve(&JsonRef::parse(other)?))
    }
}

fn classify(locator: &UriRef) -> Resolution {
    if !locator.is_absolute() {
        let blank = locator.authority().is_none()
            && locator.path().is_empty()
            && locator.query().is_none();
        return if blank {
            Resolution::Empty
        } else {
            Resolution::Hierarchical
        };
    }
    if !locator.is_opaque() {
        return Resolution::Hierarchical;
    }

    let ssp = locator.scheme_specific_part();
    let Some(split) = ssp.rfind('!') else {
        return Resolution::Hierarchical;
    };
    let scheme = locator.scheme().unwrap_or_default();
    match UriRef::parse(&ssp[split + 1..]) {
        Ok(path) => Resolution::Archive {
            prefix: format!("{scheme}:{}", &ssp[..=split]),
            path,
        },
        Err(_) => Resolution::Hierarchical,
    }
}

impl PartialEq for JsonRef {
    fn eq(&self, other: &Self) -> bool {
        self.locator == other.locator && self.fragment == other.fragment
    }
}

impl Eq for JsonRef {}

impl Hash for JsonRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.locator.hash(state);
        self.fragment.hash(state);
    }
}

impl Default for JsonRef {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for JsonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)
    }
}

impl FromStr for JsonRef {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for JsonRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JsonRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(s: &str) -> JsonRef {
        JsonRef::parse(s).unwrap()
    }

    #[test]
    fn classification() {
        assert_eq!(r("").kind(), RefKind::Empty);
        assert_eq!(r("#").kind(), RefKind::Empty);
        assert_eq!(r("#/a").kind(), RefKind::Empty);
        assert_eq!(r("foo.json").kind(), RefKind::Hierarchical);
        assert_eq!(r("http://x/y").kind(), RefKind::Hierarchical);
        assert_eq!(r("urn:x").kind(), RefKind::Hierarchical);
        assert_eq!(r("jar:file:/lib.jar!/a/b").kind(), RefKind::Archive);
    }

    #[test]
    fn empty_resolution_is_identity() {
        for s in ["http://x/a#/b", "foo.json", "#bar", "jar:file:/l.jar!/a", ""] {
            assert_eq!(JsonRef::empty().resolve(&r(s)), r(s), "{s}");
        }
    }

    #[test]
    fn fragment_classification() {
        assert_eq!(r("http://x/a").fragment(), &RefFragment::Pointer(JsonPointer::root()));
        assert_eq!(r("http://x/a#").fragment(), &RefFragment::Pointer(JsonPointer::root()));
        assert_eq!(
            r("#/definitions/d").pointer().map(ToString::to_string),
            Some("/definitions/d".to_string())
        );
        assert_eq!(r("#foo").fragment(), &RefFragment::Name("foo".to_string()));
        assert_eq!(r("#/a~2").fragment(), &RefFragment::Illegal("/a~2".to_string()));
    }

    #[test]
    fn fragment_is_percent_decoded() {
        let reference = r("#/a%20b/c%25d");
        assert_eq!(
            reference.pointer().unwrap().tokens(),
            &["a b".to_string(), "c%d".to_string()]
        );
    }

    #[test]
    fn absoluteness_gate() {
        assert!(r("http://x/a").is_absolute());
        assert!(r("http://x/a#").is_absolute());
        assert!(!r("http://x/a#/b").is_absolute());
        assert!(!r("http://x/a#foo").is_absolute());
        assert!(!r("foo.json").is_absolute());
        assert!(!JsonRef::empty().is_absolute());
    }

    #[test]
    fn empty_fragment_equals_no_fragment() {
        assert_eq!(r("http://x/a"), r("http://x/a#"));
        assert_ne!(r("http://x/a"), r("http://x/a#/b"));
    }

    #[test]
    fn contains_compares_locators() {
        let base = r("http://x/root#");
        assert!(base.contains(&r("http://x/root#/definitions/d")));
        assert!(!base.contains(&r("http://x/other#/definitions/d")));
    }

    #[test]
    fn hierarchical_resolution() {
        let base = r("http://x/root#");
        assert_eq!(
            base.resolve(&r("#/definitions/d")).to_string(),
            "http://x/root#/definitions/d"
        );
        assert_eq!(base.resolve(&r("other.json")).to_string(), "http://x/other.json");
    }

    #[test]
    fn relative_base_resolution() {
        let base = r("schemas/a.json");
        assert_eq!(base.resolve(&r("b.json#/x")).to_string(), "schemas/b.json#/x");
    }

    #[test]
    fn archive_resolution_splits_at_last_bang() {
        let base = r("jar:file:/lib.jar!/schemas/a/b.json");
        assert_eq!(
            base.resolve(&r("c.json")).to_string(),
            "jar:file:/lib.jar!/schemas/a/c.json"
        );
        assert_eq!(
            base.resolve(&r("../common.json#/x")).to_string(),
            "jar:file:/lib.jar!/schemas/common.json#/x"
        );
        let resolved = base.resolve(&r("#/definitions"));
        assert_eq!(resolved.kind(), RefKind::Archive);
        assert!(resolved.contains(&base));
    }

    #[test]
    fn archive_dot_dot_climbs_from_the_containing_directory() {
        let file = r("scheme:prefix!/a/b");
        assert_eq!(file.resolve(&r("../c")).to_string(), "scheme:prefix!/c");
        assert_eq!(file.resolve(&r("c")).to_string(), "scheme:prefix!/a/c");
        let dir = r("scheme:prefix!/a/b/");
        assert_eq!(dir.resolve(&r("../c")).to_string(), "scheme:prefix!/a/c");
    }

    #[test]
    fn with_fragment_replaces_fragment() {
        let base = r("http://x/a#/old");
        let named = base.with_fragment("name").unwrap();
        assert_eq!(named.fragment(), &RefFragment::Name("name".to_string()));
        assert_eq!(named.to_uri_string(), "http://x/a#name");
        assert!(base.with_fragment("a b").is_err());
    }

    #[test]
    fn archive_resolution_returns_absolute_other_verbatim() {
        let base = r("jar:file:/lib.jar!/a/b.json");
        let other = r("http://elsewhere/x.json#/y");
        assert_eq!(base.resolve(&other).to_string(), other.to_string());
    }

    #[test]
    fn to_locator_strips_fragment() {
        let reference = r("http://x/a#/b");
        let locator = reference.to_locator();
        assert_eq!(locator.to_string(), "http://x/a");
        assert!(locator.is_absolute());
    }

    #[test]
    fn with_pointer_encodes_tokens() {
        let base = r("http://x/a");
        let pointer = JsonPointer::from_tokens(["a b", "c/d"]);
        let reference = base.with_pointer(&pointer);
        assert_eq!(reference.to_string(), "http://x/a#/a%20b/c~1d");
        assert_eq!(JsonRef::parse(&reference.to_string()).unwrap(), reference);
    }

    #[test]
    fn serde_round_trip() {
        let reference = r("http://x/a#/b");
        let s = serde_json::to_string(&reference).unwrap();
        assert_eq!(s, r#""http://x/a#/b""#);
        assert_eq!(serde_json::from_str::<JsonRef>(&s).unwrap(), reference);
    }
}
