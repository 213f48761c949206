//! Visual annotations attached to memory addresses.
//!
//! Annotations are emitted by allocator code through the sandbox bindings
//! or declared directly in a workload. Each one either adds a mark at an
//! address or removes the mark of the same type at that address.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::Color;

/// What an annotation does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationKind {
    /// Highlight `[address, address+size)` with a translucent color.
    Range,
    /// Attach a text label to an address.
    Text,
    /// Draw an arrow from `address` to `target`.
    Pointer,
    /// Tint `[address, address+size)` with a solid color.
    Color,
    /// Remove the range highlight anchored at `address`.
    RemoveRange,
    /// Remove the text label at `address`.
    RemoveText,
    /// Remove the pointer anchored at `address`.
    RemovePointer,
    /// Remove the tint anchored at `address`.
    RemoveColor,
}

impl AnnotationKind {
    /// Every kind, in declaration order.
    pub const ALL: [AnnotationKind; 8] = [
        Self::Range,
        Self::Text,
        Self::Pointer,
        Self::Color,
        Self::RemoveRange,
        Self::RemoveText,
        Self::RemovePointer,
        Self::RemoveColor,
    ];

    /// The wire name used in workloads and traces.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Range => "range",
            Self::Text => "text",
            Self::Pointer => "pointer",
            Self::Color => "color",
            Self::RemoveRange => "removeRange",
            Self::RemoveText => "removeText",
            Self::RemovePointer => "removePointer",
            Self::RemoveColor => "removeColor",
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnotationKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|k| k.as_str() == s).ok_or(())
    }
}

/// A single annotation mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Which mark this adds or removes.
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    /// Anchor address.
    pub address: u32,
    /// Extent in bytes (ranges and tints).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// Pointer destination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
    /// Label text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Mark color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    /// Opacity of a range highlight, `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
}

impl Annotation {
    fn bare(kind: AnnotationKind, address: u32) -> Self {
        Self {
            kind,
            address,
            size: None,
            target: None,
            text: None,
            color: None,
            alpha: None,
        }
    }

    /// Highlight a range.
    pub fn range(address: u32, size: u32, color: Option<Color>, alpha: Option<f64>) -> Self {
        Self {
            size: Some(size),
            color,
            alpha,
            ..Self::bare(AnnotationKind::Range, address)
        }
    }

    /// Label an address.
    pub fn text(address: u32, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::bare(AnnotationKind::Text, address)
        }
    }

    /// Point from one address to another.
    pub fn pointer(address: u32, target: u32) -> Self {
        Self {
            target: Some(target),
            ..Self::bare(AnnotationKind::Pointer, address)
        }
    }

    /// Tint a range.
    pub fn color(address: u32, size: u32, color: Color) -> Self {
        Self {
            size: Some(size),
            color: Some(color),
            ..Self::bare(AnnotationKind::Color, address)
        }
    }

    /// Remove the mark of `kind` at `address`.
    ///
    /// `kind` should be one of the `remove*` kinds.
    pub fn remove(kind: AnnotationKind, address: u32) -> Self {
        Self::bare(kind, address)
    }

    /// Bytes covered by this annotation: the anchor byte for marks
    /// without a size.
    pub fn extent(&self) -> u32 {
        self.size.unwrap_or(1).max(1)
    }

    /// Check type-specific requirements and bounds against `capacity`.
    pub fn validate(&self, capacity: u32) -> Result<(), ValidationError> {
        let kind = self.kind.as_str();
        match self.kind {
            AnnotationKind::Range => {
                let size = self.size.ok_or(ValidationError::IncompleteAnnotation {
                    kind,
                    field: "size",
                })?;
                if size == 0 {
                    return Err(ValidationError::InvalidSize { size: 0 });
                }
            }
            AnnotationKind::Text if self.text.is_none() => {
                return Err(ValidationError::IncompleteAnnotation {
                    kind,
                    field: "text",
                });
            }
            AnnotationKind::Pointer => {
                let target = self.target.ok_or(ValidationError::IncompleteAnnotation {
                    kind,
                    field: "target",
                })?;
                check_range(target as i64, 1, capacity)?;
            }
            AnnotationKind::Color if self.color.is_none() => {
                return Err(ValidationError::IncompleteAnnotation {
                    kind,
                    field: "color",
                });
            }
            _ => {}
        }
        if let Some(alpha) = self.alpha {
            if !alpha.is_finite() || !(0.0..=1.0).contains(&alpha) {
                return Err(ValidationError::InvalidAlpha { value: alpha });
            }
        }
        check_range(self.address as i64, self.extent(), capacity)
    }
}

/// Reject `[address, address+size)` unless it lies inside `[0, capacity)`.
pub fn check_range(address: i64, size: u32, capacity: u32) -> Result<(), ValidationError> {
    if address < 0 || address + size as i64 > capacity as i64 {
        return Err(ValidationError::AddressOutOfRange {
            address,
            size,
            capacity,
        });
    }
    Ok(())
}
