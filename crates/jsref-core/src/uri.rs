//! # URI References — RFC 3986 Parsing and Resolution
//!
//! `UriRef` holds the five generic components of a URI reference (RFC 3986
//! §3) and implements reference resolution (§5.2), including resolution
//! against a base that is itself relative. JSON References need this
//! because a schema's resolution scope can be relative (a root `id` of
//! `"foo.json"` in a document loaded from memory), and because the path part
//! of an archive locator (`jar:file:/x.jar!/a/b`) is resolved on its own.
//!
//! ## Normalization
//!
//! Schemes are lowercased. Dot segments are removed from absolute paths of
//! references that carry a scheme or an authority. No other normalization
//! (case of percent-escapes, default ports) is applied.

use std::fmt;

use crate::error::RefError;

/// Characters rejected anywhere in a URI reference.
const EXCLUDED: &[char] = &['"', '<', '>', '\\', '^', '`', '{', '|', '}'];

/// A parsed URI reference.
///
/// Components keep their percent-encoded form; only the fragment is decoded,
/// and only by [`JsonRef`](crate::JsonRef) when it classifies the fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UriRef {
    scheme: Option<String>,
    authority: Option<String>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl UriRef {
    /// Parse a URI reference.
    ///
    /// # Errors
    ///
    /// Returns `RefError::InvalidUri` for whitespace, control or excluded
    /// characters, malformed percent-escapes, or a second `#`; and
    /// `RefError::IllegalScheme` when the text before the first `:` looks
    /// like a scheme but is not one.
    pub fn parse(input: &str) -> Result<Self, RefError> {
        check_characters(input)?;

        let (scheme, rest) = split_scheme(input)?;
        let (rest, fragment) = match rest.split_once('#') {
            Some((head, fragment)) => (head, Some(fragment.to_string())),
            None => (rest, None),
        };
        let (hier, query) = match rest.split_once('?') {
            Some((head, query)) => (head, Some(query.to_string())),
            None => (rest, None),
        };
        let (authority, path) = match hier.strip_prefix("//") {
            Some(after) => {
                let end = after.find('/').unwrap_or(after.len());
                (Some(after[..end].to_string()), &after[end..])
            }
            None => (None, hier),
        };

        let path = if (scheme.is_some() || authority.is_some()) && path.starts_with('/') {
            remove_dot_segments(path)
        } else {
            path.to_string()
        };

        Ok(Self {
            scheme,
            authority,
            path,
            query,
            fragment,
        })
    }

    /// The lowercased scheme, if any.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// The authority (userinfo, host, port), if any.
    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    /// The path, possibly empty.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query, if any.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// The raw (still percent-encoded) fragment, if any.
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Returns true if the reference has a scheme.
    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some()
    }

    /// Returns true for an absolute URI whose scheme-specific part does not
    /// begin with `/` (for example `urn:x` or `jar:file:/a.jar!/b`).
    pub fn is_opaque(&self) -> bool {
        self.scheme.is_some() && self.authority.is_none() && !self.path.starts_with('/')
    }

    /// Everything between `scheme:` and the fragment.
    pub fn scheme_specific_part(&self) -> String {
        let mut out = String::new();
        if let Some(authority) = &self.authority {
            out.push_str("//");
            out.push_str(authority);
        }
        out.push_str(&self.path);
        if let Some(query) = &self.query {
            out.push('?');
            out.push_str(query);
        }
        out
    }

    /// A copy of this reference without its fragment.
    pub fn without_fragment(&self) -> Self {
        Self {
            fragment: None,
            ..self.clone()
        }
    }

    /// A copy of this reference with the given raw fragment.
    pub fn with_fragment(&self, fragment: Option<String>) -> Self {
        Self {
            fragment,
            ..self.clone()
        }
    }

    /// Resolve `reference` against `self` as base (RFC 3986 §5.2.2).
    ///
    /// The base need not be absolute; resolving against a relative base
    /// yields a relative result.
    pub fn resolve(&self, reference: &UriRef) -> UriRef {
        if reference.scheme.is_some() {
            return UriRef {
                path: remove_dot_segments(&reference.path),
                ..reference.clone()
            };
        }

        let (authority, path, query) = if reference.authority.is_some() {
            (
                reference.authority.clone(),
                remove_dot_segments(&reference.path),
                reference.query.clone(),
            )
        } else if reference.path.is_empty() {
            (
                self.authority.clone(),
                self.path.clone(),
                reference.query.clone().or_else(|| self.query.clone()),
            )
        } else if reference.path.starts_with('/') {
            (
                self.authority.clone(),
                remove_dot_segments(&reference.path),
                reference.query.clone(),
            )
        } else {
            (
                self.authority.clone(),
                remove_dot_segments(&self.merge(&reference.path)),
                reference.query.clone(),
            )
        };

        UriRef {
            scheme: self.scheme.clone(),
            authority,
            path,
            query,
            fragment: reference.fragment.clone(),
        }
    }

    /// Merge a relative-path reference with this base's path (§5.2.3).
    fn merge(&self, relative: &str) -> String {
        if self.authority.is_some() && self.path.is_empty() {
            return format!("/{relative}");
        }
        match self.path.rfind('/') {
            Some(i) => format!("{}{relative}", &self.path[..=i]),
            None => relative.to_string(),
        }
    }
}

impl fmt::Display for UriRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}:")?;
        }
        f.write_str(&self.scheme_specific_part())?;
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

/// Check a scheme against `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
///
/// # Errors
///
/// Returns `RefError::IllegalScheme` if the scheme is empty or malformed.
pub fn validate_scheme(scheme: &str) -> Result<(), RefError> {
    let mut chars = scheme.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(RefError::IllegalScheme {
            scheme: scheme.to_string(),
        })
    }
}

fn check_characters(input: &str) -> Result<(), RefError> {
    let invalid = |reason: String| RefError::InvalidUri {
        input: input.to_string(),
        reason,
    };

    let mut hashes = 0;
    let mut chars = input.char_indices();
    while let Some((offset, c)) = chars.next() {
        if c.is_whitespace() || c.is_control() || EXCLUDED.contains(&c) {
            return Err(invalid(format!("illegal character {c:?} at offset {offset}")));
        }
        match c {
            '#' => {
                hashes += 1;
                if hashes > 1 {
                    return Err(invalid(format!("second '#' at offset {offset}")));
                }
            }
            '%' => {
                let hex_pair = chars
                    .next()
                    .zip(chars.next())
                    .is_some_and(|((_, a), (_, b))| a.is_ascii_hexdigit() && b.is_ascii_hexdigit());
                if !hex_pair {
                    return Err(invalid(format!("malformed percent-escape at offset {offset}")));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn split_scheme(input: &str) -> Result<(Option<String>, &str), RefError> {
    match input.find([':', '/', '?', '#']) {
        Some(i) if input.as_bytes()[i] == b':' => {
            let scheme = &input[..i];
            if scheme.is_empty() {
                return Err(RefError::InvalidUri {
                    input: input.to_string(),
                    reason: "empty scheme".to_string(),
                });
            }
            validate_scheme(scheme)?;
            Ok((Some(scheme.to_ascii_lowercase()), &input[i + 1..]))
        }
        _ => Ok((None, input)),
    }
}

/// Remove `.` and `..` segments from a path (§5.2.4).
pub(crate) fn remove_dot_segments(path: &str) -> String {
    let absolute = path.starts_with('/');
    let segments: Vec<&str> = path.split('/').collect();
    let last = segments.len() - 1;
    let mut out: Vec<&str> = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate().skip(usize::from(absolute)) {
        match *segment {
            "." => {
                if i == last {
                    out.push("");
                }
            }
            ".." => {
                out.pop();
                if i == last {
                    out.push("");
                }
            }
            other => out.push(other),
        }
    }

    let joined = out.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}
