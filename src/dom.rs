//! dom
//!
//! Depth-bounded in-memory document tree.
//!
//! The codec walks documents several times (validation, dimension
//! extraction, metadata extraction), so the streaming reader is run
//! once here to build a small owned tree. The builder is iterative
//! with an explicit element stack: nesting depth is attacker
//! controlled, and past the configured limit the reader fails closed
//! with [`XmlError::DepthExceeded`] instead of risking stack growth.
//!
//! Element names are stored without their namespace prefix; attribute
//! keys are kept verbatim. Entity and character references are
//! resolved here, before any value decoding.

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Errors from reading or writing document text.
#[derive(Debug, Error, PartialEq)]
pub enum XmlError {
    /// The document is not well-formed XML.
    #[error("malformed document at byte {position}: {message}")]
    Malformed { position: usize, message: String },

    /// More than one root element.
    #[error("document has more than one root element")]
    MultipleRoots,

    /// No root element at all.
    #[error("document has no root element")]
    NoRoot,

    /// Element nesting beyond the configured bound.
    #[error("element nesting exceeds the configured depth limit of {limit}")]
    DepthExceeded { limit: usize },

    /// The serializer could not emit an event.
    #[error("failed to write document: {0}")]
    Write(String),
}

/// One element of the parsed document.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Element {
    /// Local name, namespace prefix stripped.
    pub name: String,
    /// Attributes in document order, keys verbatim.
    pub attributes: Vec<(String, String)>,
    /// Concatenated direct text content, references resolved.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<Element>,
}

impl Element {
    fn new(name: String, attributes: Vec<(String, String)>) -> Self {
        Element {
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Attribute lookup by verbatim key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First child with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Children with the given local name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text content of the first child with the given local name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }
}

fn local_name(qname: &[u8]) -> String {
    let start = qname
        .iter()
        .rposition(|&b| b == b':')
        .map(|i| i + 1)
        .unwrap_or(0);
    String::from_utf8_lossy(&qname[start..]).into_owned()
}

/// Parse document text into an [`Element`] tree.
///
/// `max_depth` bounds element nesting; the root element is depth 1.
pub(crate) fn read_document(xml: &str, max_depth: usize) -> Result<Element, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    let malformed = |reader: &Reader<&[u8]>, message: String| XmlError::Malformed {
        position: reader.buffer_position(),
        message,
    };

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if root.is_some() && stack.is_empty() {
                    return Err(XmlError::MultipleRoots);
                }
                if stack.len() >= max_depth {
                    return Err(XmlError::DepthExceeded { limit: max_depth });
                }
                let element = start_element(&reader, &e)?;
                stack.push(element);
            }
            Ok(Event::Empty(e)) => {
                if root.is_some() && stack.is_empty() {
                    return Err(XmlError::MultipleRoots);
                }
                if stack.len() >= max_depth {
                    return Err(XmlError::DepthExceeded { limit: max_depth });
                }
                let element = start_element(&reader, &e)?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                // Balance is checked by the reader itself.
                let element = stack.pop().ok_or_else(|| {
                    malformed(&reader, "unexpected closing tag".to_string())
                })?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(t)) => {
                if let Some(current) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| malformed(&reader, e.to_string()))?;
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(current) = stack.last_mut() {
                    let bytes = t.into_inner();
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|e| malformed(&reader, e.to_string()))?;
                    current.text.push_str(text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(Event::Decl(_)) | Ok(Event::Comment(_)) | Ok(Event::PI(_)) | Ok(Event::DocType(_)) => {}
            Err(e) => return Err(malformed(&reader, e.to_string())),
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(XmlError::Malformed {
            position: reader.buffer_position(),
            message: format!("unclosed element '{}'", stack.last().unwrap().name),
        });
    }
    root.ok_or(XmlError::NoRoot)
}

fn start_element(
    reader: &Reader<&[u8]>,
    e: &quick_xml::events::BytesStart<'_>,
) -> Result<Element, XmlError> {
    let name = local_name(e.name().as_ref());
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| XmlError::Malformed {
            position: reader.buffer_position(),
            message: err.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| XmlError::Malformed {
                position: reader.buffer_position(),
                message: err.to_string(),
            })?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element::new(name, attributes))
}

fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}
