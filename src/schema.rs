//! schema
//!
//! The schema document façade: parsing, construction, serialization.
//!
//! # Pipeline
//!
//! `parse` runs reader → grammar validation → dimension extraction →
//! metadata extraction, in that order. Validation happens before any
//! structural work, and every stage is all-or-nothing: a failure
//! returns a terminal error and no partial structures.
//!
//! Both directions are pure functions of their inputs. Nothing is
//! cached between calls, so concurrent use from multiple threads
//! needs no coordination.
//!
//! # Example
//!
//! ```no_run
//! use pcschema::schema::Schema;
//!
//! # fn load(_: &str) -> String { String::new() }
//! let xml = load("schema.xml");
//! let xsd = load("schema.xsd");
//!
//! let schema = Schema::parse(&xml, &xsd)?;
//! for dim in schema.dimensions() {
//!     println!("{} ({})", dim.name(), dim.primitive_type().token());
//! }
//! # Ok::<(), pcschema::schema::SchemaError>(())
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dimension::{Dimension, DimensionError};
use crate::dom::{read_document, XmlError};
use crate::grammar::{Grammar, ValidationError};
use crate::metadata::{MetadataError, MetadataNode};
use crate::{parser, writer};

/// Top-level error for parse and serialize calls.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error(transparent)]
    Xml(#[from] XmlError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Dimension(#[from] DimensionError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// An `orientation` element outside the known vocabulary.
    #[error("unknown orientation '{0}'")]
    UnknownOrientation(String),
}

/// Knobs for parsing untrusted documents.
///
/// The only resource-bound concern in the codec is element nesting
/// depth, which is attacker-controllable through nested metadata;
/// the reader fails closed once `max_depth` is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum element nesting depth; the root element is depth 1.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions { max_depth: 64 }
    }
}

/// Point interleaving order of the data the schema describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    /// All dimensions of one point, then the next point.
    #[default]
    PointMajor,
    /// All points of one dimension, then the next dimension.
    DimensionMajor,
}

impl Orientation {
    pub(crate) fn token(&self) -> &'static str {
        match self {
            Orientation::PointMajor => "point",
            Orientation::DimensionMajor => "dimension",
        }
    }

    fn from_token(token: &str) -> Result<Self, SchemaError> {
        match token.trim() {
            "point" => Ok(Orientation::PointMajor),
            "dimension" => Ok(Orientation::DimensionMajor),
            other => Err(SchemaError::UnknownOrientation(other.to_string())),
        }
    }
}

/// One parsed or constructed schema document: an ordered dimension
/// list plus a metadata tree.
///
/// Dimension order is the byte-layout order of the attributes and is
/// preserved exactly; downstream consumers (such as a dimension-ID
/// registry) rely on it, not on names alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    dimensions: Vec<Dimension>,
    metadata: MetadataNode,
    #[serde(default)]
    orientation: Orientation,
}

impl Schema {
    /// Parse document text against grammar text with default options.
    pub fn parse(xml: &str, xsd: &str) -> Result<Self, SchemaError> {
        Self::parse_with(xml, xsd, ParseOptions::default())
    }

    /// Parse document text against grammar text.
    pub fn parse_with(xml: &str, xsd: &str, options: ParseOptions) -> Result<Self, SchemaError> {
        let grammar = Grammar::parse(xsd)?;
        let doc = read_document(xml, options.max_depth)?;
        grammar.validate(&doc)?;

        let dimensions = parser::parse_dimensions(&doc)?;
        let metadata = parser::parse_metadata(&doc)?;
        let orientation = match doc.child_text("orientation") {
            Some(token) => Orientation::from_token(token)?,
            None => Orientation::default(),
        };

        Ok(Schema {
            dimensions,
            metadata,
            orientation,
        })
    }

    /// Check document text against grammar text without extracting
    /// anything.
    pub fn validate(xml: &str, xsd: &str) -> Result<(), SchemaError> {
        let grammar = Grammar::parse(xsd)?;
        let doc = read_document(xml, ParseOptions::default().max_depth)?;
        grammar.validate(&doc)?;
        Ok(())
    }

    /// Build a schema from parts, enforcing the same invariants the
    /// parser does: unique dimension names, and a value on every
    /// metadata node below the root. The root's own name and value
    /// are not part of the document; it exists to own the top-level
    /// children.
    pub fn new(dimensions: Vec<Dimension>, metadata: MetadataNode) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for dimension in &dimensions {
            if !seen.insert(dimension.name()) {
                return Err(DimensionError::DuplicateName(dimension.name().to_string()).into());
            }
        }

        let mut work: Vec<&MetadataNode> = metadata.children().iter().collect();
        while let Some(node) = work.pop() {
            if node.value().is_none() {
                return Err(MetadataError::MissingValue(node.name().to_string()).into());
            }
            work.extend(node.children());
        }

        Ok(Schema {
            dimensions,
            metadata,
            orientation: Orientation::default(),
        })
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Ordered dimension descriptors.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Descriptor lookup by name.
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name() == name)
    }

    /// The metadata root; its children are the document's top-level
    /// metadata nodes.
    pub fn metadata(&self) -> &MetadataNode {
        &self.metadata
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Serialize back into document text.
    ///
    /// The emitted document validates against the grammar used for
    /// parsing and re-parses into an equal schema.
    pub fn to_xml(&self) -> Result<String, SchemaError> {
        Ok(writer::write_schema(
            &self.dimensions,
            &self.metadata,
            self.orientation,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::PrimitiveType;

    #[test]
    fn new_rejects_duplicate_dimension_names() {
        let dims = vec![
            Dimension::new("X", PrimitiveType::Signed32),
            Dimension::new("X", PrimitiveType::Float64),
        ];
        assert_eq!(
            Schema::new(dims, MetadataNode::root()).unwrap_err(),
            DimensionError::DuplicateName("X".into()).into()
        );
    }

    #[test]
    fn new_rejects_valueless_metadata_below_root() {
        let mut metadata = MetadataNode::root();
        let mut container = MetadataNode::root();
        container.add("leaf", 1u64);
        metadata.add_node(container);

        let dims = vec![Dimension::new("X", PrimitiveType::Signed32)];
        assert!(Schema::new(dims, metadata).is_err());
    }

    #[test]
    fn orientation_tokens_round_trip() {
        for orientation in [Orientation::PointMajor, Orientation::DimensionMajor] {
            assert_eq!(
                Orientation::from_token(orientation.token()).unwrap(),
                orientation
            );
        }
        assert!(matches!(
            Orientation::from_token("diagonal"),
            Err(SchemaError::UnknownOrientation(_))
        ));
    }
}
