//! Integration tests for the schema codec.
//!
//! These tests exercise the full public flow: grammar validation,
//! structural parsing, construction, serialization, and the
//! round-trip guarantees, against realistic fixture documents.

use pcschema::dimension::{Dimension, DimensionError, PrimitiveType, Transform};
use pcschema::metadata::{MetadataNode, MetadataValue};
use pcschema::schema::{Orientation, ParseOptions, Schema, SchemaError};
use pcschema::grammar::ValidationError;
use pcschema::XmlError;
use uuid::Uuid;

// =============================================================================
// Fixtures
// =============================================================================

const XSD: &str = include_str!("data/schema.xsd");
const SIX_DIM: &str = include_str!("data/6-dim-schema.xml");
const SIXTEEN_DIM: &str = include_str!("data/16-dim-schema.xml");
const UTF8: &str = include_str!("data/utf8-schema.xml");

/// A minimal document with the given dimension elements spliced in.
fn document_with(dimensions: &str) -> String {
    format!(
        "<pc:PointCloudSchema xmlns:pc=\"http://pointcloud.org/schemas/PC/1.1\">{dimensions}</pc:PointCloudSchema>"
    )
}

const INT_DIM: &str = "<pc:dimension><pc:name>A</pc:name>\
                       <pc:interpretation>int32_t</pc:interpretation></pc:dimension>";

// =============================================================================
// Reading
// =============================================================================

#[test]
fn reads_six_dimension_schema() {
    let schema = Schema::parse(SIX_DIM, XSD).unwrap();
    assert_eq!(schema.dimensions().len(), 6);

    let x = schema.dimension("X").unwrap();
    assert_eq!(x.transform().scale(), 0.01);
    assert_eq!(x.transform().offset(), 0.0);
    assert_eq!(x.primitive_type(), PrimitiveType::Signed32);

    for name in ["Y", "Z"] {
        let dim = schema.dimension(name).unwrap();
        assert_eq!(dim.transform().scale(), 0.01);
        assert_eq!(dim.primitive_type(), PrimitiveType::Signed32);
    }

    let intensity = schema.dimension("Intensity").unwrap();
    assert_eq!(intensity.transform().scale(), 1.0);
    assert_eq!(intensity.primitive_type(), PrimitiveType::Unsigned16);

    for name in ["ReturnNumber", "NumberOfReturns"] {
        let dim = schema.dimension(name).unwrap();
        assert_eq!(dim.transform().scale(), 1.0);
        assert_eq!(dim.transform().offset(), 0.0);
        assert_eq!(dim.primitive_type(), PrimitiveType::Unsigned8);
    }
}

#[test]
fn dimension_order_follows_the_document() {
    let schema = Schema::parse(SIX_DIM, XSD).unwrap();
    let names: Vec<&str> = schema.dimensions().iter().map(|d| d.name()).collect();
    assert_eq!(
        names,
        ["X", "Y", "Z", "Intensity", "ReturnNumber", "NumberOfReturns"]
    );
}

#[test]
fn missing_scale_and_offset_parse_to_identity() {
    let schema = Schema::parse(&document_with(INT_DIM), XSD).unwrap();
    assert_eq!(schema.dimensions()[0].transform(), Transform::IDENTITY);
}

#[test]
fn orientation_is_read_and_defaulted() {
    let schema = Schema::parse(SIXTEEN_DIM, XSD).unwrap();
    assert_eq!(schema.orientation(), Orientation::PointMajor);

    let schema = Schema::parse(&document_with(INT_DIM), XSD).unwrap();
    assert_eq!(schema.orientation(), Orientation::PointMajor);
}

// =============================================================================
// Copying: serialize, then re-parse
// =============================================================================

#[test]
fn copies_sixteen_dimension_schema_through_serialization() {
    let original = Schema::parse(SIXTEEN_DIM, XSD).unwrap();
    assert_eq!(original.dimensions().len(), 16);

    let mut metadata = MetadataNode::root();
    metadata.add("m1", 1u64).add("uuid", Uuid::nil());
    metadata.add("m2", 1i64);
    metadata.add("m1prime", "Some other metadata");

    let copy = Schema::new(original.dimensions().to_vec(), metadata.clone()).unwrap();
    let xml = copy.to_xml().unwrap();

    let reparsed = Schema::parse(&xml, XSD).unwrap();
    assert_eq!(reparsed.dimensions().len(), original.dimensions().len());
    for (a, b) in original.dimensions().iter().zip(reparsed.dimensions()) {
        assert_eq!(a.name(), b.name());
        assert_eq!(a.primitive_type(), b.primitive_type());
    }
    assert_eq!(reparsed.metadata(), &metadata);
}

#[test]
fn serialized_output_passes_the_grammar() {
    let schema = Schema::parse(SIX_DIM, XSD).unwrap();
    let xml = schema.to_xml().unwrap();
    Schema::validate(&xml, XSD).unwrap();
}

#[test]
fn full_round_trip_is_equality() {
    for fixture in [SIX_DIM, SIXTEEN_DIM, UTF8] {
        let first = Schema::parse(fixture, XSD).unwrap();
        let second = Schema::parse(&first.to_xml().unwrap(), XSD).unwrap();
        assert_eq!(first, second);
    }
}

// =============================================================================
// Unicode fidelity
// =============================================================================

#[test]
fn preserves_utf8_text_exactly() {
    let description = "Ég get etið gler án þess að meiða mig.";
    let meta_name = "אני יכול לאכול זכוכית וזה לא מזיק לי.";
    let meta_value = "أنا قادر على أكل الزجاج و هذا لا يؤلمني";

    let schema = Schema::parse(UTF8, XSD).unwrap();
    assert_eq!(schema.dimensions().len(), 1);
    assert_eq!(schema.dimensions()[0].description(), description);

    let children = schema.metadata().children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name(), meta_name);
    assert_eq!(
        children[0].value(),
        Some(&MetadataValue::Text(meta_value.to_string()))
    );
}

#[test]
fn utf8_text_survives_a_round_trip_byte_for_byte() {
    let schema = Schema::parse(UTF8, XSD).unwrap();
    let reparsed = Schema::parse(&schema.to_xml().unwrap(), XSD).unwrap();

    assert_eq!(
        schema.dimensions()[0].description().as_bytes(),
        reparsed.dimensions()[0].description().as_bytes()
    );
    assert_eq!(
        schema.metadata().children()[0].name().as_bytes(),
        reparsed.metadata().children()[0].name().as_bytes()
    );
}

#[test]
fn escaped_characters_round_trip() {
    let mut metadata = MetadataNode::root();
    metadata.add("filter", "bounds < 100 & \"quoted\" > 'ticks'");
    let dims = vec![Dimension::new("X", PrimitiveType::Signed32)];
    let schema = Schema::new(dims, metadata).unwrap();

    let reparsed = Schema::parse(&schema.to_xml().unwrap(), XSD).unwrap();
    assert_eq!(schema, reparsed);
}

// =============================================================================
// Rejection
// =============================================================================

#[test]
fn duplicate_dimension_names_fail() {
    let xml = document_with(&format!("{INT_DIM}{INT_DIM}"));
    assert_eq!(
        Schema::parse(&xml, XSD).unwrap_err(),
        SchemaError::Dimension(DimensionError::DuplicateName("A".into()))
    );
}

#[test]
fn zero_scale_fails() {
    let xml = document_with(
        "<pc:dimension><pc:name>X</pc:name>\
         <pc:interpretation>int32_t</pc:interpretation>\
         <pc:scale>0</pc:scale></pc:dimension>",
    );
    assert!(matches!(
        Schema::parse(&xml, XSD).unwrap_err(),
        SchemaError::Dimension(DimensionError::InvalidTransform { .. })
    ));
}

#[test]
fn undeclared_elements_fail_validation() {
    let xml = document_with(&format!("{INT_DIM}<pc:colour>red</pc:colour>"));
    assert_eq!(
        Schema::parse(&xml, XSD).unwrap_err(),
        SchemaError::Validation(ValidationError::UndeclaredElement {
            parent: "PointCloudSchema".into(),
            element: "colour".into(),
        })
    );
}

#[test]
fn dimension_without_a_name_fails_validation() {
    let xml = document_with(
        "<pc:dimension><pc:interpretation>int32_t</pc:interpretation></pc:dimension>",
    );
    assert_eq!(
        Schema::parse(&xml, XSD).unwrap_err(),
        SchemaError::Validation(ValidationError::MissingElement {
            parent: "dimension".into(),
            element: "name".into(),
        })
    );
}

#[test]
fn metadata_without_required_attributes_fails_validation() {
    let xml = document_with(&format!(
        "{INT_DIM}<pc:metadata name=\"m\">1</pc:metadata>"
    ));
    assert_eq!(
        Schema::parse(&xml, XSD).unwrap_err(),
        SchemaError::Validation(ValidationError::MissingAttribute {
            element: "metadata".into(),
            attribute: "type".into(),
        })
    );
}

#[test]
fn wrong_namespace_fails_validation() {
    let xml = "<pc:PointCloudSchema xmlns:pc=\"http://example.com/other\">\
               </pc:PointCloudSchema>";
    assert!(matches!(
        Schema::parse(xml, XSD).unwrap_err(),
        SchemaError::Validation(ValidationError::NamespaceMismatch { .. })
    ));
}

#[test]
fn unknown_metadata_type_fails() {
    let xml = document_with(&format!(
        "{INT_DIM}<pc:metadata name=\"m\" type=\"matrix\">1 0 0 1</pc:metadata>"
    ));
    assert!(matches!(
        Schema::parse(&xml, XSD).unwrap_err(),
        SchemaError::Metadata(_)
    ));
}

#[test]
fn malformed_documents_fail_before_validation() {
    assert!(matches!(
        Schema::parse("<pc:PointCloudSchema>", XSD).unwrap_err(),
        SchemaError::Xml(XmlError::Malformed { .. })
    ));
}

#[test]
fn metadata_nesting_past_the_limit_fails_closed() {
    let depth = 80;
    let nested = format!(
        "{}{}",
        "<pc:metadata name=\"m\" type=\"string\">".repeat(depth),
        "</pc:metadata>".repeat(depth)
    );
    let xml = document_with(&format!("{INT_DIM}{nested}"));

    let err = Schema::parse(&xml, XSD).unwrap_err();
    assert_eq!(err, SchemaError::Xml(XmlError::DepthExceeded { limit: 64 }));

    // A raised limit admits the same document.
    let options = ParseOptions { max_depth: 128 };
    Schema::parse_with(&xml, XSD, options).unwrap();
}

// =============================================================================
// Serialization policy
// =============================================================================

#[test]
fn serializer_always_writes_scale_and_offset() {
    let dims = vec![Dimension::new("X", PrimitiveType::Signed32)];
    let schema = Schema::new(dims, MetadataNode::root()).unwrap();
    let xml = schema.to_xml().unwrap();

    assert!(xml.contains("<pc:scale>1</pc:scale>"));
    assert!(xml.contains("<pc:offset>0</pc:offset>"));

    // Round-trip equality holds whether or not the source spelled
    // the defaults out.
    let reparsed = Schema::parse(&xml, XSD).unwrap();
    assert_eq!(schema, reparsed);
}

#[test]
fn every_primitive_type_round_trips() {
    let types = [
        PrimitiveType::Signed8,
        PrimitiveType::Signed16,
        PrimitiveType::Signed32,
        PrimitiveType::Signed64,
        PrimitiveType::Unsigned8,
        PrimitiveType::Unsigned16,
        PrimitiveType::Unsigned32,
        PrimitiveType::Unsigned64,
        PrimitiveType::Float32,
        PrimitiveType::Float64,
    ];
    let dims: Vec<Dimension> = types
        .iter()
        .enumerate()
        .map(|(i, &ty)| Dimension::new(format!("dim{i}"), ty))
        .collect();

    let schema = Schema::new(dims, MetadataNode::root()).unwrap();
    let reparsed = Schema::parse(&schema.to_xml().unwrap(), XSD).unwrap();
    for (dim, &ty) in reparsed.dimensions().iter().zip(&types) {
        assert_eq!(dim.primitive_type(), ty);
    }
}

#[test]
fn every_metadata_value_kind_round_trips() {
    let mut metadata = MetadataNode::root();
    metadata.add("count", 7u64);
    metadata.add("delta", -7i64);
    metadata.add("ratio", 0.125);
    metadata.add("flag", true);
    metadata.add("label", "plain");
    metadata.add("id", Uuid::nil());

    let dims = vec![Dimension::new("X", PrimitiveType::Signed32)];
    let schema = Schema::new(dims, metadata).unwrap();
    let reparsed = Schema::parse(&schema.to_xml().unwrap(), XSD).unwrap();
    assert_eq!(schema.metadata(), reparsed.metadata());
}
