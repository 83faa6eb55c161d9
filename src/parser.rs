//! parser
//!
//! Structural extraction: validated document tree in, dimension list
//! and metadata tree out. Runs only after the grammar has accepted
//! the document; everything here is strict, and any failure aborts
//! the whole parse with no partial structures.

use std::collections::HashSet;

use crate::dimension::{Dimension, DimensionError, PrimitiveType, Transform};
use crate::dom::Element;
use crate::metadata::{MetadataError, MetadataNode, MetadataValue};

/// Walk `dimension` elements in document order into an eager,
/// ordered descriptor list.
///
/// The list order is the attribute byte-layout order, so it is
/// preserved exactly. Name uniqueness is enforced here, not left to
/// callers.
pub(crate) fn parse_dimensions(root: &Element) -> Result<Vec<Dimension>, DimensionError> {
    let mut dimensions = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (index, element) in root.children_named("dimension").enumerate() {
        let name = element
            .child_text("name")
            .ok_or(DimensionError::MissingName(index + 1))?;
        if !seen.insert(name.to_string()) {
            return Err(DimensionError::DuplicateName(name.to_string()));
        }

        let scale = numeric_child(element, "scale", 1.0);
        let offset = numeric_child(element, "offset", 0.0);
        let transform = Transform::for_dimension(name, scale, offset)?;

        let ty = resolve_type(element, name)?;

        let mut dimension = Dimension::new(name, ty).with_transform(transform);
        if let Some(description) = element.child_text("description") {
            dimension = dimension.with_description(description);
        }
        dimensions.push(dimension);
    }

    Ok(dimensions)
}

/// The dimension's type comes from its interpretation token when one
/// is present, otherwise from its declared value interval.
fn resolve_type(element: &Element, name: &str) -> Result<PrimitiveType, DimensionError> {
    if let Some(token) = element.child_text("interpretation") {
        return PrimitiveType::from_token(name, token);
    }
    match (
        element.child_text("minimum"),
        element.child_text("maximum"),
    ) {
        (Some(min), Some(max)) => {
            let min = min.trim().parse::<f64>().unwrap_or(f64::NAN);
            let max = max.trim().parse::<f64>().unwrap_or(f64::NAN);
            PrimitiveType::from_interval(name, min, max)
        }
        _ => Err(DimensionError::MissingType(name.to_string())),
    }
}

// A present-but-unparseable value surfaces as a non-finite transform
// rather than a silent default; the grammar normally rejects it first.
fn numeric_child(element: &Element, child: &str, default: f64) -> f64 {
    match element.child_text(child) {
        Some(text) => text.trim().parse::<f64>().unwrap_or(f64::NAN),
        None => default,
    }
}

/// Build the metadata tree from `metadata` elements in document
/// order.
///
/// The walk uses an explicit frame stack: the document reader already
/// bounds nesting depth, and nothing here recurses regardless.
pub(crate) fn parse_metadata(root: &Element) -> Result<MetadataNode, MetadataError> {
    let mut out = MetadataNode::root();
    for element in root.children_named("metadata") {
        out.add_node(convert_tree(element)?);
    }
    Ok(out)
}

struct Frame<'a> {
    node: MetadataNode,
    children: Vec<&'a Element>,
    next: usize,
}

fn convert_tree(top: &Element) -> Result<MetadataNode, MetadataError> {
    let mut stack = vec![open_frame(top)?];
    loop {
        let frame = stack.last_mut().expect("stack never drains mid-loop");
        if frame.next < frame.children.len() {
            let element = frame.children[frame.next];
            frame.next += 1;
            let child = open_frame(element)?;
            stack.push(child);
        } else {
            let done = stack.pop().expect("stack never drains mid-loop");
            match stack.last_mut() {
                Some(parent) => parent.node.add_node(done.node),
                None => return Ok(done.node),
            }
        }
    }
}

fn open_frame(element: &Element) -> Result<Frame<'_>, MetadataError> {
    let name = element
        .attribute("name")
        .ok_or(MetadataError::MissingAttribute("name"))?;
    let token = element
        .attribute("type")
        .ok_or(MetadataError::MissingAttribute("type"))?;
    let value = MetadataValue::decode(name, token, &element.text)?;
    Ok(Frame {
        node: MetadataNode::new(name, value),
        children: element.children_named("metadata").collect(),
        next: 0,
    })
}
