//! grammar
//!
//! Compilation of the externally supplied XSD grammar and validation
//! of documents against it.
//!
//! # Trust boundary
//!
//! Validation is the first thing that happens to a document: no
//! structural extraction runs until the document has passed the
//! grammar. Failures carry the offending element or attribute and the
//! violated constraint so callers can report actionable diagnostics.
//!
//! # Supported subset
//!
//! The grammar text is treated as an opaque contract; this module
//! understands the portion of XSD the schema grammars actually use:
//! global element declarations, named and inline complex types,
//! `sequence`/`all`/`choice` particles with `minOccurs`/`maxOccurs`,
//! attribute declarations with `use="required"`, and the lexical
//! spaces of the common simple types. Child order inside a sequence is
//! validated as presence plus cardinality; undeclared attributes and
//! `xmlns`/`xsi` attributes are ignored.

use std::collections::HashMap;

use thiserror::Error;

use crate::dom::{read_document, Element, XmlError};

/// Nesting bound for the grammar text itself. Grammars are trusted
/// less than code but more than documents; real ones are shallow.
const GRAMMAR_MAX_DEPTH: usize = 32;

/// Errors from grammar compilation or document validation.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// The grammar text itself is unusable.
    #[error("unusable grammar: {0}")]
    Grammar(String),

    /// The document root is not a declared global element.
    #[error("root element '{found}' is not declared by the grammar")]
    UnknownRoot { found: String },

    /// The document namespace does not match the grammar's target.
    #[error("document namespace does not match the grammar target namespace '{expected}'")]
    NamespaceMismatch { expected: String },

    /// An element not declared in its parent's content model.
    #[error("element '{element}' is not allowed inside '{parent}'")]
    UndeclaredElement { parent: String, element: String },

    /// A required element is absent.
    #[error("element '{parent}' is missing required child '{element}'")]
    MissingElement { parent: String, element: String },

    /// An element appears more often than its declaration allows.
    #[error("element '{element}' appears {found} times in '{parent}', at most {allowed} allowed")]
    TooManyElements {
        parent: String,
        element: String,
        found: usize,
        allowed: u32,
    },

    /// A required attribute is absent.
    #[error("element '{element}' is missing required attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },

    /// Text or attribute content outside its declared lexical space.
    #[error("'{text}' is not a valid {expected} in '{location}'")]
    InvalidValue {
        location: String,
        expected: &'static str,
        text: String,
    },
}

impl From<XmlError> for ValidationError {
    fn from(e: XmlError) -> Self {
        ValidationError::Grammar(e.to_string())
    }
}

/// Lexical spaces the validator checks.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SimpleType {
    String,
    Boolean,
    Integer,
    NonNegativeInteger,
    Decimal,
    Double,
}

impl SimpleType {
    fn from_xsd(token: &str) -> SimpleType {
        // Prefix stripped by the reader for element names; attribute
        // values keep theirs.
        let local = token.rsplit(':').next().unwrap_or(token);
        match local {
            "boolean" => SimpleType::Boolean,
            "integer" | "int" | "long" | "short" | "byte" => SimpleType::Integer,
            "nonNegativeInteger" | "unsignedInt" | "unsignedLong" | "unsignedShort"
            | "unsignedByte" | "positiveInteger" => SimpleType::NonNegativeInteger,
            "decimal" => SimpleType::Decimal,
            "double" | "float" => SimpleType::Double,
            _ => SimpleType::String,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SimpleType::String => "string",
            SimpleType::Boolean => "boolean",
            SimpleType::Integer => "integer",
            SimpleType::NonNegativeInteger => "nonNegativeInteger",
            SimpleType::Decimal => "decimal",
            SimpleType::Double => "double",
        }
    }

    fn accepts(&self, text: &str) -> bool {
        let text = text.trim();
        match self {
            SimpleType::String => true,
            SimpleType::Boolean => matches!(text, "true" | "false" | "1" | "0"),
            SimpleType::Integer => lexical_integer(text, true),
            SimpleType::NonNegativeInteger => lexical_integer(text, false),
            SimpleType::Decimal => lexical_decimal(text),
            SimpleType::Double => {
                matches!(text, "INF" | "-INF" | "NaN") || text.parse::<f64>().is_ok()
            }
        }
    }
}

fn lexical_integer(text: &str, signed: bool) -> bool {
    let digits = match text.strip_prefix(['+', '-']) {
        Some(_) if text.starts_with('-') && !signed => return false,
        Some(rest) => rest,
        None => text,
    };
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn lexical_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (int, frac) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };
    (!int.is_empty() || !frac.is_empty())
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone, PartialEq)]
enum Occurs {
    Bounded(u32),
    Unbounded,
}

#[derive(Debug, Clone, PartialEq)]
enum ElemType {
    /// Reference to a named complex type, resolved at validation time.
    Ref(String),
    /// Inline complex type, stored in the grammar's model table.
    Inline(usize),
    /// Simple-typed element: text content only.
    Simple(SimpleType),
}

#[derive(Debug, Clone, PartialEq)]
struct ChildDecl {
    name: String,
    min: u32,
    max: Occurs,
    ty: ElemType,
}

#[derive(Debug, Clone, PartialEq)]
struct AttrDecl {
    name: String,
    required: bool,
    ty: SimpleType,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ContentModel {
    children: Vec<ChildDecl>,
    attributes: Vec<AttrDecl>,
}

/// A compiled grammar, reusable across any number of validations.
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    target_namespace: Option<String>,
    /// Global element declarations: document root candidates.
    roots: Vec<(String, ElemType)>,
    /// All content models, inline and named.
    models: Vec<ContentModel>,
    /// Named complex types, by local name, indexing into `models`.
    named: HashMap<String, usize>,
}

impl Grammar {
    /// Compile grammar text.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Grammar` when the text is not
    /// well-formed XML or declares no global elements.
    pub fn parse(xsd: &str) -> Result<Self, ValidationError> {
        let doc = read_document(xsd, GRAMMAR_MAX_DEPTH)?;
        if doc.name != "schema" {
            return Err(ValidationError::Grammar(format!(
                "expected a schema root element, found '{}'",
                doc.name
            )));
        }

        let mut grammar = Grammar {
            target_namespace: doc.attribute("targetNamespace").map(str::to_string),
            roots: Vec::new(),
            models: Vec::new(),
            named: HashMap::new(),
        };

        // Named types first so global elements may reference them in
        // any order; references stay symbolic until validation.
        for ty in doc.children_named("complexType") {
            let name = ty.attribute("name").ok_or_else(|| {
                ValidationError::Grammar("top-level complexType without a name".to_string())
            })?;
            let model = grammar.compile_complex(ty);
            grammar.models.push(model);
            grammar
                .named
                .insert(name.to_string(), grammar.models.len() - 1);
        }

        for element in doc.children_named("element") {
            let name = element.attribute("name").ok_or_else(|| {
                ValidationError::Grammar("global element without a name".to_string())
            })?;
            let ty = grammar.element_type(element);
            grammar.roots.push((name.to_string(), ty));
        }

        if grammar.roots.is_empty() {
            return Err(ValidationError::Grammar(
                "grammar declares no global elements".to_string(),
            ));
        }
        Ok(grammar)
    }

    fn element_type(&mut self, element: &Element) -> ElemType {
        if let Some(token) = element.attribute("type") {
            let local = token.rsplit(':').next().unwrap_or(token);
            if self.named.contains_key(local) || !is_xsd_builtin(token) {
                return ElemType::Ref(local.to_string());
            }
            return ElemType::Simple(SimpleType::from_xsd(token));
        }
        if let Some(inline) = element.child("complexType") {
            let model = self.compile_complex(inline);
            self.models.push(model);
            return ElemType::Inline(self.models.len() - 1);
        }
        // No type information: text content, unchecked.
        ElemType::Simple(SimpleType::String)
    }

    fn compile_complex(&mut self, ty: &Element) -> ContentModel {
        let mut model = ContentModel::default();

        for particle in ["sequence", "all", "choice"] {
            if let Some(group) = ty.child(particle) {
                for child in group.children_named("element") {
                    let Some(name) = child.attribute("name") else {
                        continue;
                    };
                    let min = child
                        .attribute("minOccurs")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(1);
                    let max = match child.attribute("maxOccurs") {
                        Some("unbounded") => Occurs::Unbounded,
                        Some(v) => Occurs::Bounded(v.parse().unwrap_or(1)),
                        None => Occurs::Bounded(1),
                    };
                    let ty = self.element_type(child);
                    model.children.push(ChildDecl {
                        name: name.to_string(),
                        min,
                        max,
                        ty,
                    });
                }
            }
        }

        for attr in ty.children_named("attribute") {
            let Some(name) = attr.attribute("name") else {
                continue;
            };
            model.attributes.push(AttrDecl {
                name: name.to_string(),
                required: attr.attribute("use") == Some("required"),
                ty: attr
                    .attribute("type")
                    .map(SimpleType::from_xsd)
                    .unwrap_or(SimpleType::String),
            });
        }

        model
    }

    fn resolve(&self, ty: &ElemType) -> Result<Option<usize>, ValidationError> {
        match ty {
            ElemType::Inline(idx) => Ok(Some(*idx)),
            ElemType::Ref(name) => self.named.get(name).copied().map(Some).ok_or_else(|| {
                ValidationError::Grammar(format!("unresolved type reference '{name}'"))
            }),
            ElemType::Simple(_) => Ok(None),
        }
    }

    /// Validate a document tree against this grammar.
    ///
    /// Side-effect-free; safe to invoke repeatedly on the same input.
    pub(crate) fn validate(&self, doc: &Element) -> Result<(), ValidationError> {
        let root_ty = self
            .roots
            .iter()
            .find(|(name, _)| *name == doc.name)
            .map(|(_, ty)| ty)
            .ok_or_else(|| ValidationError::UnknownRoot {
                found: doc.name.clone(),
            })?;

        if let Some(tns) = &self.target_namespace {
            let declared = doc
                .attributes
                .iter()
                .any(|(k, v)| (k == "xmlns" || k.starts_with("xmlns:")) && v == tns);
            if !declared {
                return Err(ValidationError::NamespaceMismatch {
                    expected: tns.clone(),
                });
            }
        }

        // Explicit work stack: document depth is already bounded by
        // the reader, validation never recurses.
        let mut work: Vec<(&Element, usize)> = Vec::new();
        self.check_element(doc, root_ty, &mut work)?;
        while let Some((element, model_idx)) = work.pop() {
            self.check_model(element, model_idx, &mut work)?;
        }
        Ok(())
    }

    fn check_element<'a>(
        &self,
        element: &'a Element,
        ty: &ElemType,
        work: &mut Vec<(&'a Element, usize)>,
    ) -> Result<(), ValidationError> {
        match self.resolve(ty)? {
            Some(model_idx) => work.push((element, model_idx)),
            None => {
                let ElemType::Simple(simple) = ty else {
                    unreachable!("resolve returned None for a complex type");
                };
                if let Some(child) = element.children.first() {
                    return Err(ValidationError::UndeclaredElement {
                        parent: element.name.clone(),
                        element: child.name.clone(),
                    });
                }
                if !simple.accepts(&element.text) {
                    return Err(ValidationError::InvalidValue {
                        location: element.name.clone(),
                        expected: simple.name(),
                        text: element.text.trim().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_model<'a>(
        &self,
        element: &'a Element,
        model_idx: usize,
        work: &mut Vec<(&'a Element, usize)>,
    ) -> Result<(), ValidationError> {
        let model = &self.models[model_idx];
        let mut counts = vec![0usize; model.children.len()];

        for child in &element.children {
            let Some(pos) = model.children.iter().position(|d| d.name == child.name) else {
                return Err(ValidationError::UndeclaredElement {
                    parent: element.name.clone(),
                    element: child.name.clone(),
                });
            };
            counts[pos] += 1;
            self.check_element(child, &model.children[pos].ty, work)?;
        }

        for (decl, &count) in model.children.iter().zip(&counts) {
            if count < decl.min as usize {
                return Err(ValidationError::MissingElement {
                    parent: element.name.clone(),
                    element: decl.name.clone(),
                });
            }
            if let Occurs::Bounded(max) = decl.max {
                if count > max as usize {
                    return Err(ValidationError::TooManyElements {
                        parent: element.name.clone(),
                        element: decl.name.clone(),
                        found: count,
                        allowed: max,
                    });
                }
            }
        }

        for decl in &model.attributes {
            match element.attribute(&decl.name) {
                None if decl.required => {
                    return Err(ValidationError::MissingAttribute {
                        element: element.name.clone(),
                        attribute: decl.name.clone(),
                    });
                }
                Some(value) if !decl.ty.accepts(value) => {
                    return Err(ValidationError::InvalidValue {
                        location: format!("{}@{}", element.name, decl.name),
                        expected: decl.ty.name(),
                        text: value.to_string(),
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// Whether a type token names an XSD builtin rather than a user type.
fn is_xsd_builtin(token: &str) -> bool {
    token.starts_with("xs:") || token.starts_with("xsd:")
}
