//! writer
//!
//! Serialization of a schema back into document text.
//!
//! Output is compact (no indentation): text content carries only what
//! the model holds, so names and string values re-parse
//! byte-for-byte. Scale and offset are always written, including the
//! identity transform, which keeps round-trip equality independent of
//! whether the source document spelled the defaults out.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::dimension::Dimension;
use crate::dom::XmlError;
use crate::metadata::MetadataNode;
use crate::schema::Orientation;

/// Namespace of emitted schema documents.
pub(crate) const PC_NAMESPACE: &str = "http://pointcloud.org/schemas/PC/1.1";

/// Schema format version written to `pc:version`.
const FORMAT_VERSION: &str = "1.3";

pub(crate) fn write_schema(
    dimensions: &[Dimension],
    metadata: &MetadataNode,
    orientation: Orientation,
) -> Result<String, XmlError> {
    let mut writer = Writer::new(Vec::new());

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut root = BytesStart::new("pc:PointCloudSchema");
    root.push_attribute(("xmlns:pc", PC_NAMESPACE));
    emit(&mut writer, Event::Start(root))?;

    for (index, dimension) in dimensions.iter().enumerate() {
        write_dimension(&mut writer, index, dimension)?;
    }
    write_metadata(&mut writer, metadata)?;
    text_element(&mut writer, "pc:orientation", orientation.token())?;
    text_element(&mut writer, "pc:version", FORMAT_VERSION)?;

    emit(&mut writer, Event::End(BytesEnd::new("pc:PointCloudSchema")))?;

    let bytes = writer.into_inner();
    String::from_utf8(bytes).map_err(|e| XmlError::Write(e.to_string()))
}

fn write_dimension<W: std::io::Write>(
    writer: &mut Writer<W>,
    index: usize,
    dimension: &Dimension,
) -> Result<(), XmlError> {
    emit(writer, Event::Start(BytesStart::new("pc:dimension")))?;

    text_element(writer, "pc:position", &(index + 1).to_string())?;
    text_element(
        writer,
        "pc:size",
        &dimension.primitive_type().size().to_string(),
    )?;
    if !dimension.description().is_empty() {
        text_element(writer, "pc:description", dimension.description())?;
    }
    text_element(writer, "pc:name", dimension.name())?;
    text_element(
        writer,
        "pc:interpretation",
        dimension.primitive_type().token(),
    )?;
    let transform = dimension.transform();
    text_element(writer, "pc:scale", &transform.scale().to_string())?;
    text_element(writer, "pc:offset", &transform.offset().to_string())?;

    emit(writer, Event::End(BytesEnd::new("pc:dimension")))
}

/// Pre-order depth-first emission of the metadata tree, explicit
/// stack. The root itself is the document's anonymous owner and is
/// not written.
fn write_metadata<W: std::io::Write>(
    writer: &mut Writer<W>,
    root: &MetadataNode,
) -> Result<(), XmlError> {
    enum Step<'a> {
        Open(&'a MetadataNode),
        Close,
    }

    let mut stack: Vec<Step> = root.children().iter().rev().map(Step::Open).collect();
    while let Some(step) = stack.pop() {
        match step {
            Step::Open(node) => {
                let value = node.value().ok_or_else(|| {
                    XmlError::Write(format!(
                        "metadata node '{}' below the root has no value",
                        node.name()
                    ))
                })?;

                let mut element = BytesStart::new("pc:metadata");
                element.push_attribute(("name", node.name()));
                element.push_attribute(("type", value.type_token()));
                emit(writer, Event::Start(element))?;

                let text = value.encode();
                if !text.is_empty() {
                    emit(writer, Event::Text(BytesText::new(&text)))?;
                }

                stack.push(Step::Close);
                for child in node.children().iter().rev() {
                    stack.push(Step::Open(child));
                }
            }
            Step::Close => {
                emit(writer, Event::End(BytesEnd::new("pc:metadata")))?;
            }
        }
    }
    Ok(())
}

fn text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), XmlError> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    if !text.is_empty() {
        emit(writer, Event::Text(BytesText::new(text)))?;
    }
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn emit<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), XmlError> {
    writer
        .write_event(event)
        .map_err(|e| XmlError::Write(e.to_string()))
}
