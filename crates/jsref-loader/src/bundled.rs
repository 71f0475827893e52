//! # Bundled Meta-Schemas
//!
//! The draft-03 and draft-04 meta-schemas are compiled into the binary and
//! served through the `resource:` scheme. The default configuration
//! redirects each meta-schema's `id` to its resource path, so resolving
//! `http://json-schema.org/draft-04/schema#` never touches the network.

/// A meta-schema compiled into the binary.
#[derive(Debug, Clone, Copy)]
pub struct BundledSchema {
    /// The `id` the schema declares.
    pub id: &'static str,
    /// Path under the `resource:` scheme.
    pub resource_path: &'static str,
    /// The JSON text.
    pub text: &'static str,
}

impl BundledSchema {
    /// The `resource:` URI this schema is served at.
    pub fn resource_uri(&self) -> String {
        format!("resource:{}", self.resource_path)
    }
}

/// Every bundled meta-schema.
pub const BUNDLED_SCHEMAS: &[BundledSchema] = &[
    BundledSchema {
        id: "http://json-schema.org/draft-03/schema#",
        resource_path: "/draftv3/schema",
        text: include_str!("bundled/draftv3-schema.json"),
    },
    BundledSchema {
        id: "http://json-schema.org/draft-04/schema#",
        resource_path: "/draftv4/schema",
        text: include_str!("bundled/draftv4-schema.json"),
    },
];
