//! metadata
//!
//! Typed, named, ordered metadata tree attached to a schema.
//!
//! # Structure
//!
//! Metadata forms a strict ownership tree: every node exclusively owns
//! its children, there are no shared nodes and no back-edges. The tree
//! is built once (by the parser or through [`MetadataNode::add`]) and
//! then handed immutably to downstream consumers.
//!
//! A distinguished root node carries no value and exists only to own
//! the document's top-level entries.
//!
//! # Values
//!
//! Node values are a closed tagged union ([`MetadataValue`]); the
//! decode and encode routines match exhaustively, so extending the
//! value vocabulary is a compile-time-checked change.
//!
//! # Example
//!
//! ```
//! use pcschema::metadata::{MetadataNode, MetadataValue};
//! use uuid::Uuid;
//!
//! let mut root = MetadataNode::root();
//! let compression = root.add("compression", "lazperf");
//! compression.add("uuid", Uuid::nil());
//!
//! assert_eq!(root.children().len(), 1);
//! assert_eq!(
//!     root.children()[0].value(),
//!     Some(&MetadataValue::Text("lazperf".into()))
//! );
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors from metadata value decoding.
#[derive(Debug, Error, PartialEq)]
pub enum MetadataError {
    /// A `type` attribute outside the supported vocabulary.
    #[error("unsupported metadata type '{token}' on node '{node}'")]
    UnsupportedType { node: String, token: String },

    /// Literal text that does not parse as the declared type.
    #[error("metadata node '{node}' has malformed {expected} value: '{text}'")]
    ValueDecode {
        node: String,
        expected: &'static str,
        text: String,
    },

    /// A metadata element missing a required attribute.
    #[error("metadata element is missing required attribute '{0}'")]
    MissingAttribute(&'static str),

    /// A node below the root carrying no value.
    #[error("metadata node '{0}' below the root has no value")]
    MissingValue(String),
}

/// The decoded value of one metadata node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    Unsigned(u64),
    Signed(i64),
    Double(f64),
    Boolean(bool),
    Text(String),
    Uuid(Uuid),
}

impl MetadataValue {
    /// The `type` attribute token written for this value.
    ///
    /// [`decode`](Self::decode) accepts every value this returns, so
    /// the pair round-trips.
    pub fn type_token(&self) -> &'static str {
        match self {
            MetadataValue::Unsigned(_) => "nonNegativeInteger",
            MetadataValue::Signed(_) => "integer",
            MetadataValue::Double(_) => "double",
            MetadataValue::Boolean(_) => "boolean",
            MetadataValue::Text(_) => "string",
            MetadataValue::Uuid(_) => "uuid",
        }
    }

    /// Decode literal element text according to a `type` token.
    ///
    /// Numeric, boolean, and UUID literals are trimmed before
    /// decoding; `string` values are taken verbatim so text content
    /// survives byte-for-byte.
    pub fn decode(node: &str, token: &str, text: &str) -> Result<Self, MetadataError> {
        let malformed = |expected: &'static str| MetadataError::ValueDecode {
            node: node.to_string(),
            expected,
            text: text.to_string(),
        };
        match token {
            "nonNegativeInteger" => text
                .trim()
                .parse::<u64>()
                .map(MetadataValue::Unsigned)
                .map_err(|_| malformed("nonNegativeInteger")),
            "integer" => text
                .trim()
                .parse::<i64>()
                .map(MetadataValue::Signed)
                .map_err(|_| malformed("integer")),
            "double" => {
                let value = text
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| malformed("double"))?;
                if value.is_finite() {
                    Ok(MetadataValue::Double(value))
                } else {
                    Err(malformed("double"))
                }
            }
            "boolean" => match text.trim() {
                "true" | "1" => Ok(MetadataValue::Boolean(true)),
                "false" | "0" => Ok(MetadataValue::Boolean(false)),
                _ => Err(malformed("boolean")),
            },
            "uuid" => Uuid::try_parse(text.trim())
                .map(MetadataValue::Uuid)
                .map_err(|_| malformed("uuid")),
            "string" => Ok(MetadataValue::Text(text.to_string())),
            other => Err(MetadataError::UnsupportedType {
                node: node.to_string(),
                token: other.to_string(),
            }),
        }
    }

    /// Encode the value back into the literal form its decoder expects.
    pub fn encode(&self) -> String {
        match self {
            MetadataValue::Unsigned(v) => v.to_string(),
            MetadataValue::Signed(v) => v.to_string(),
            MetadataValue::Double(v) => v.to_string(),
            MetadataValue::Boolean(v) => v.to_string(),
            MetadataValue::Text(v) => v.clone(),
            MetadataValue::Uuid(v) => v.hyphenated().to_string(),
        }
    }
}

impl From<u64> for MetadataValue {
    fn from(v: u64) -> Self {
        MetadataValue::Unsigned(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Signed(v)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Double(v)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Boolean(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::Text(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::Text(v)
    }
}

impl From<Uuid> for MetadataValue {
    fn from(v: Uuid) -> Self {
        MetadataValue::Uuid(v)
    }
}

/// One entry in the metadata tree.
///
/// Names need not be unique among siblings; child order is
/// significant and preserved through serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataNode {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<MetadataValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<MetadataNode>,
}

impl MetadataNode {
    /// The distinguished root: unnamed, valueless, owning the
    /// document's top-level nodes.
    pub fn root() -> Self {
        MetadataNode {
            name: String::new(),
            value: None,
            children: Vec::new(),
        }
    }

    /// A named node carrying a value and no children.
    pub fn new(name: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        MetadataNode {
            name: name.into(),
            value: Some(value.into()),
            children: Vec::new(),
        }
    }

    /// Append a child node and return a borrow of it, so nested
    /// structure reads naturally:
    ///
    /// ```
    /// use pcschema::metadata::MetadataNode;
    ///
    /// let mut root = MetadataNode::root();
    /// root.add("filters", "reprojection").add("srs", "EPSG:2993");
    /// assert_eq!(root.children()[0].children()[0].name(), "srs");
    /// ```
    pub fn add(
        &mut self,
        name: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> &mut MetadataNode {
        self.children.push(MetadataNode::new(name, value));
        self.children.last_mut().unwrap()
    }

    /// Append an already-built subtree.
    pub fn add_node(&mut self, node: MetadataNode) {
        self.children.push(node);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&MetadataValue> {
        self.value.as_ref()
    }

    pub fn children(&self) -> &[MetadataNode] {
        &self.children
    }

    /// Depth of the tree rooted at this node, computed with an
    /// explicit work list. A lone node has depth 1.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut work = vec![(self, 1usize)];
        while let Some((node, level)) = work.pop() {
            deepest = deepest.max(level);
            for child in &node.children {
                work.push((child, level + 1));
            }
        }
        deepest
    }
}
