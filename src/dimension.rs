//! dimension
//!
//! Point-attribute dimension descriptors.
//!
//! # Types
//!
//! - [`PrimitiveType`] - Closed set of canonical storage types
//! - [`Transform`] - Validated linear scale/offset pair
//! - [`Dimension`] - One named point attribute
//!
//! # Validation
//!
//! These types enforce validity at construction time. A `Transform`
//! with a zero or non-finite scale cannot be represented, so every
//! descriptor handed to downstream consumers carries a usable
//! transform.
//!
//! # Examples
//!
//! ```
//! use pcschema::dimension::{Dimension, PrimitiveType, Transform};
//!
//! let dim = Dimension::new("X", PrimitiveType::Signed32)
//!     .with_transform(Transform::new(0.01, 0.0).unwrap());
//! assert_eq!(dim.name(), "X");
//! assert_eq!(dim.transform().scale(), 0.01);
//!
//! // Invalid transforms fail at creation time
//! assert!(Transform::new(0.0, 0.0).is_err());
//! assert!(Transform::new(f64::NAN, 0.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from dimension construction and type resolution.
#[derive(Debug, Error, PartialEq)]
pub enum DimensionError {
    /// Two dimensions in the same document share a name.
    #[error("duplicate dimension name: {0}")]
    DuplicateName(String),

    /// An interpretation token outside the supported vocabulary.
    #[error("unsupported interpretation '{token}' for dimension '{dimension}'")]
    UnsupportedType { dimension: String, token: String },

    /// A value interval no primitive type can represent.
    #[error("unsupported value interval [{min}, {max}] for dimension '{dimension}'")]
    UnsupportedInterval {
        dimension: String,
        min: f64,
        max: f64,
    },

    /// A dimension declares neither an interpretation nor an interval.
    #[error("dimension '{0}' declares no interpretation or value range")]
    MissingType(String),

    /// A dimension element without a name.
    #[error("dimension at position {0} has no name")]
    MissingName(usize),

    /// A scale/offset pair that cannot be applied.
    #[error("invalid transform for '{dimension}': {reason} (scale {scale}, offset {offset})")]
    InvalidTransform {
        dimension: String,
        reason: String,
        scale: f64,
        offset: f64,
    },
}

/// Canonical storage type of a point attribute.
///
/// This is a closed vocabulary; every decode and encode site matches
/// exhaustively, so adding a type is a compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    Signed8,
    Signed16,
    Signed32,
    Signed64,
    Unsigned8,
    Unsigned16,
    Unsigned32,
    Unsigned64,
    Float32,
    Float64,
}

impl PrimitiveType {
    /// Map a schema interpretation token to a primitive type.
    ///
    /// Accepts both the C-style (`int32_t`) and plain (`int32`)
    /// spellings; `float`/`float32` and `double`/`float64` are
    /// synonyms. Anything else is an error naming the token.
    ///
    /// # Example
    ///
    /// ```
    /// use pcschema::dimension::PrimitiveType;
    ///
    /// assert_eq!(
    ///     PrimitiveType::from_token("X", "int32_t").unwrap(),
    ///     PrimitiveType::Signed32
    /// );
    /// assert!(PrimitiveType::from_token("X", "quaternion").is_err());
    /// ```
    pub fn from_token(dimension: &str, token: &str) -> Result<Self, DimensionError> {
        match token.trim() {
            "int8_t" | "int8" => Ok(PrimitiveType::Signed8),
            "int16_t" | "int16" => Ok(PrimitiveType::Signed16),
            "int32_t" | "int32" => Ok(PrimitiveType::Signed32),
            "int64_t" | "int64" => Ok(PrimitiveType::Signed64),
            "uint8_t" | "uint8" => Ok(PrimitiveType::Unsigned8),
            "uint16_t" | "uint16" => Ok(PrimitiveType::Unsigned16),
            "uint32_t" | "uint32" => Ok(PrimitiveType::Unsigned32),
            "uint64_t" | "uint64" => Ok(PrimitiveType::Unsigned64),
            "float" | "float32" => Ok(PrimitiveType::Float32),
            "double" | "float64" => Ok(PrimitiveType::Float64),
            other => Err(DimensionError::UnsupportedType {
                dimension: dimension.to_string(),
                token: other.to_string(),
            }),
        }
    }

    /// The canonical token emitted on serialization.
    ///
    /// `from_token` accepts every value this returns, so the pair
    /// round-trips.
    pub fn token(&self) -> &'static str {
        match self {
            PrimitiveType::Signed8 => "int8_t",
            PrimitiveType::Signed16 => "int16_t",
            PrimitiveType::Signed32 => "int32_t",
            PrimitiveType::Signed64 => "int64_t",
            PrimitiveType::Unsigned8 => "uint8_t",
            PrimitiveType::Unsigned16 => "uint16_t",
            PrimitiveType::Unsigned32 => "uint32_t",
            PrimitiveType::Unsigned64 => "uint64_t",
            PrimitiveType::Float32 => "float",
            PrimitiveType::Float64 => "double",
        }
    }

    /// Storage size in bytes.
    pub fn size(&self) -> usize {
        match self {
            PrimitiveType::Signed8 | PrimitiveType::Unsigned8 => 1,
            PrimitiveType::Signed16 | PrimitiveType::Unsigned16 => 2,
            PrimitiveType::Signed32 | PrimitiveType::Unsigned32 | PrimitiveType::Float32 => 4,
            PrimitiveType::Signed64 | PrimitiveType::Unsigned64 | PrimitiveType::Float64 => 8,
        }
    }

    /// Infer the smallest primitive type whose representable range
    /// contains `[min, max]`.
    ///
    /// Integral bounds map to the smallest integer type, unsigned
    /// preferred when `min >= 0`. Finite non-integral bounds, and
    /// integral bounds wider than 64 bits, map to [`Float64`]. A
    /// non-finite or inverted interval is an error.
    ///
    /// [`Float64`]: PrimitiveType::Float64
    pub fn from_interval(dimension: &str, min: f64, max: f64) -> Result<Self, DimensionError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(DimensionError::UnsupportedInterval {
                dimension: dimension.to_string(),
                min,
                max,
            });
        }
        if min.fract() != 0.0 || max.fract() != 0.0 {
            return Ok(PrimitiveType::Float64);
        }
        if min >= 0.0 {
            if max <= u8::MAX as f64 {
                Ok(PrimitiveType::Unsigned8)
            } else if max <= u16::MAX as f64 {
                Ok(PrimitiveType::Unsigned16)
            } else if max <= u32::MAX as f64 {
                Ok(PrimitiveType::Unsigned32)
            } else if max <= u64::MAX as f64 {
                Ok(PrimitiveType::Unsigned64)
            } else {
                Ok(PrimitiveType::Float64)
            }
        } else if min >= i8::MIN as f64 && max <= i8::MAX as f64 {
            Ok(PrimitiveType::Signed8)
        } else if min >= i16::MIN as f64 && max <= i16::MAX as f64 {
            Ok(PrimitiveType::Signed16)
        } else if min >= i32::MIN as f64 && max <= i32::MAX as f64 {
            Ok(PrimitiveType::Signed32)
        } else if min >= i64::MIN as f64 && max <= i64::MAX as f64 {
            Ok(PrimitiveType::Signed64)
        } else {
            Ok(PrimitiveType::Float64)
        }
    }
}

/// Serde mirror for [`Transform`]; deserialization funnels through
/// `Transform::new` so invalid pairs cannot sneak in from data.
#[derive(Debug, Serialize, Deserialize)]
struct RawTransform {
    scale: f64,
    offset: f64,
}

/// A validated linear transform converting stored values to their
/// real-world unit: `real = stored * scale + offset`.
///
/// Invariants: `scale` is finite and non-zero, `offset` is finite.
///
/// # Example
///
/// ```
/// use pcschema::dimension::Transform;
///
/// let t = Transform::new(0.01, 100.0).unwrap();
/// assert_eq!(t.scale(), 0.01);
/// assert_eq!(t.offset(), 100.0);
/// assert_eq!(Transform::default(), Transform::IDENTITY);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTransform", into = "RawTransform")]
pub struct Transform {
    scale: f64,
    offset: f64,
}

impl Transform {
    /// The identity transform `(1.0, 0.0)`, used when a document
    /// omits scale and offset.
    pub const IDENTITY: Transform = Transform {
        scale: 1.0,
        offset: 0.0,
    };

    /// Create a validated transform.
    ///
    /// # Errors
    ///
    /// Returns `DimensionError::InvalidTransform` when `scale` is zero
    /// or either value is non-finite. The dimension name in the error
    /// is filled in by the caller that knows it; here it is empty.
    pub fn new(scale: f64, offset: f64) -> Result<Self, DimensionError> {
        Self::for_dimension("", scale, offset)
    }

    /// Create a validated transform, attributing failures to `dimension`.
    pub fn for_dimension(
        dimension: &str,
        scale: f64,
        offset: f64,
    ) -> Result<Self, DimensionError> {
        let reason = if scale == 0.0 {
            Some("scale must be non-zero")
        } else if !scale.is_finite() {
            Some("scale must be finite")
        } else if !offset.is_finite() {
            Some("offset must be finite")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(DimensionError::InvalidTransform {
                dimension: dimension.to_string(),
                reason: reason.to_string(),
                scale,
                offset,
            }),
            None => Ok(Transform { scale, offset }),
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Whether this is the identity transform.
    pub fn is_identity(&self) -> bool {
        *self == Transform::IDENTITY
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::IDENTITY
    }
}

impl TryFrom<RawTransform> for Transform {
    type Error = DimensionError;

    fn try_from(raw: RawTransform) -> Result<Self, Self::Error> {
        Transform::new(raw.scale, raw.offset)
    }
}

impl From<Transform> for RawTransform {
    fn from(t: Transform) -> Self {
        RawTransform {
            scale: t.scale,
            offset: t.offset,
        }
    }
}

/// One named point attribute.
///
/// The position of a descriptor within a schema's dimension list is
/// significant: it is the byte-layout order of the attributes it
/// describes, and downstream consumers rely on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    ty: PrimitiveType,
    #[serde(default)]
    transform: Transform,
}

impl Dimension {
    /// Create a descriptor with an empty description and the identity
    /// transform.
    pub fn new(name: impl Into<String>, ty: PrimitiveType) -> Self {
        Dimension {
            name: name.into(),
            description: String::new(),
            ty,
            transform: Transform::IDENTITY,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn primitive_type(&self) -> PrimitiveType {
        self.ty
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }
}
