//! Error types for Tessel.

use crate::{ClassName, ObjectKey, PropertyName};
use thiserror::Error;

/// All possible errors from schema derivation and managed access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Schema definition errors
    #[error(
        "property {class}.{property} is declared as {declared}, which is not a supported managed property type; \
         add it to the ignored properties or change its type"
    )]
    UnsupportedType {
        class: ClassName,
        property: PropertyName,
        declared: String,
    },

    #[error("property {class}.{property}: {reason}")]
    InvalidOptionality {
        class: ClassName,
        property: PropertyName,
        reason: String,
    },

    #[error("invalid primary key {class}.{property}: {reason}")]
    InvalidPrimaryKey {
        class: ClassName,
        property: PropertyName,
        reason: String,
    },

    #[error("invalid index on {class}.{property}: {reason}")]
    InvalidIndex {
        class: ClassName,
        property: PropertyName,
        reason: String,
    },

    #[error(
        "lazy managed property '{property}' is not allowed on {class}; \
         either add the property to the ignored properties or make it non-lazy"
    )]
    LazyPropertyUnsupported {
        class: ClassName,
        property: PropertyName,
    },

    #[error("property '{property}' is declared more than once on {class}")]
    DuplicateProperty {
        class: ClassName,
        property: PropertyName,
    },

    #[error("invalid property name {class}.{property}: {reason}")]
    InvalidPropertyName {
        class: ClassName,
        property: PropertyName,
        reason: String,
    },

    #[error("class {0} has no managed properties")]
    EmptySchema(ClassName),

    #[error("invalid linking objects property {class}.{property}: {reason}")]
    InvalidLinkingObjects {
        class: ClassName,
        property: PropertyName,
        reason: String,
    },

    // Access errors
    #[error("invalid property name '{property}' for class {class}")]
    UnknownProperty {
        class: ClassName,
        property: PropertyName,
    },

    #[error("type mismatch for {class}.{property}: expected {expected}, got {got}")]
    TypeMismatch {
        class: ClassName,
        property: PropertyName,
        expected: String,
        got: String,
    },

    #[error("value conversion failed: expected {expected}, got {got}")]
    ValueConversion { expected: String, got: String },

    #[error("object of class {0} is not managed")]
    NotManaged(ClassName),

    #[error("object of class {0} is already managed")]
    AlreadyManaged(ClassName),

    #[error("object {0} has been deleted or invalidated")]
    ObjectInvalidated(ObjectKey),

    #[error("object not found: {0}")]
    ObjectNotFound(ObjectKey),

    #[error("object of class {class} with primary key {value} already exists")]
    DuplicatePrimaryKey { class: ClassName, value: String },

    #[error("primary key {class}.{property} cannot be changed after the object is added")]
    ImmutablePrimaryKey {
        class: ClassName,
        property: PropertyName,
    },

    #[error("property {class}.{property} is read-only")]
    ReadOnlyProperty {
        class: ClassName,
        property: PropertyName,
    },

    #[error("link {class}.{property} must point to a live {target} object")]
    InvalidLink {
        class: ClassName,
        property: PropertyName,
        target: ClassName,
    },

    #[error("embedded object of class {0} can only be added through its owner")]
    EmbeddedWithoutOwner(ClassName),

    #[error("class {0} is not embedded and cannot be owned by another object")]
    NotEmbedded(ClassName),

    #[error("class {0} does not have a primary key")]
    NoPrimaryKey(ClassName),

    #[error("index {index} out of bounds for collection of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("class {0} is not registered")]
    SchemaNotRegistered(ClassName),

    #[error("class {0} is already registered with a different schema")]
    SchemaMismatch(ClassName),
}

impl Error {
    /// Whether this error describes a mistake in a model definition rather
    /// than a runtime data condition.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedType { .. }
                | Error::InvalidOptionality { .. }
                | Error::InvalidPrimaryKey { .. }
                | Error::InvalidIndex { .. }
                | Error::LazyPropertyUnsupported { .. }
                | Error::DuplicateProperty { .. }
                | Error::InvalidPropertyName { .. }
                | Error::EmptySchema(_)
                | Error::InvalidLinkingObjects { .. }
        )
    }
}

/// Result type for Tessel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Abort with a descriptive diagnostic for a model definition error.
///
/// Schema errors are programming mistakes; nothing about them is transient.
#[track_caller]
pub fn fatal(err: &Error) -> ! {
    tracing::error!(error = %err, "schema derivation failed");
    panic!("{err}");
}
