//! Errors detected while loading or compiling a workload.

use std::error::Error;
use std::fmt;

/// A workload description could not be compiled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileError {
    /// The element name is not part of the workload vocabulary.
    UnknownElement {
        /// The element as written.
        element: String,
    },
    /// An element carries an attribute it does not understand.
    UnknownAttribute {
        /// The element.
        element: &'static str,
        /// The attribute as written.
        attribute: String,
    },
    /// A required attribute is absent.
    MissingAttribute {
        /// The element.
        element: &'static str,
        /// The attribute.
        attribute: &'static str,
    },
    /// An attribute value could not be parsed or is out of range.
    InvalidAttribute {
        /// The element.
        element: &'static str,
        /// The attribute.
        attribute: &'static str,
        /// The raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Attributes that exclude each other were combined, or neither was given.
    ConflictingAttributes {
        /// The element.
        element: &'static str,
        /// Description of the conflict.
        reason: String,
    },
    /// An operation element has child elements.
    UnexpectedChildren {
        /// The element.
        element: &'static str,
    },
    /// The description is not well-formed JSON of the expected shape.
    Parse {
        /// Parser message.
        reason: String,
    },
    /// The compiler configuration is invalid.
    InvalidConfig {
        /// Which setting is wrong.
        reason: String,
    },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownElement { element } => write!(f, "unknown element <{element}>"),
            Self::UnknownAttribute { element, attribute } => {
                write!(f, "<{element}> does not accept attribute '{attribute}'")
            }
            Self::MissingAttribute { element, attribute } => {
                write!(f, "<{element}> requires attribute '{attribute}'")
            }
            Self::InvalidAttribute {
                element,
                attribute,
                value,
                reason,
            } => write!(f, "<{element} {attribute}=\"{value}\">: {reason}"),
            Self::ConflictingAttributes { element, reason } => {
                write!(f, "<{element}>: {reason}")
            }
            Self::UnexpectedChildren { element } => {
                write!(f, "<{element}> cannot contain child elements")
            }
            Self::Parse { reason } => write!(f, "malformed workload: {reason}"),
            Self::InvalidConfig { reason } => write!(f, "invalid compiler config: {reason}"),
        }
    }
}

impl Error for CompileError {}

impl From<serde_json::Error> for CompileError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse {
            reason: e.to_string(),
        }
    }
}
