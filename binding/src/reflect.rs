//! Field reflection.
//!
//! A model type describes its declared fields as a list of [`FieldInfo`]
//! (generated by `#[derive(Object)]` or written by hand). The reflector
//! filters that list down to the candidate managed fields.

use crate::{error::Result, ClassName, Error, LinkOrigin, PropertyName, Reflect, TypeShape};
use std::any::type_name;
use std::collections::HashSet;

/// Label suffix marking the storage shadow of a lazily initialized field.
///
/// `.` cannot appear in a Rust identifier, so a shadow label never collides
/// with a real field name.
pub const LAZY_SHADOW_SUFFIX: &str = ".lazy";

/// How a declared field is backed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Managed wrapper with a reflected type shape
    Managed(TypeShape),
    /// Ordinary field with no managed wrapper
    Plain,
    /// Read-only field without backing storage
    Computed,
}

/// A declared field as seen by reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub label: String,
    pub kind: FieldKind,
    /// Declared Rust type, for diagnostics
    pub declared_type: String,
}

impl FieldInfo {
    /// A field held in a managed wrapper such as `Persisted<T>` or `List<T>`.
    pub fn managed<F: Reflect>(name: &str) -> Self {
        Self::with_shape(name, F::shape(), type_name::<F>())
    }

    /// A managed field described by an explicit shape.
    pub fn with_shape(name: &str, shape: TypeShape, declared_type: impl Into<String>) -> Self {
        Self {
            label: name.to_string(),
            kind: FieldKind::Managed(shape),
            declared_type: declared_type.into(),
        }
    }

    /// A backlink field following `origin` of the field's origin class.
    pub fn linking_objects<F: LinkOrigin>(name: &str, origin: &str) -> Self {
        Self::with_shape(
            name,
            TypeShape::linking_objects(F::origin_class(), origin),
            type_name::<F>(),
        )
    }

    pub fn plain<F: ?Sized>(name: &str) -> Self {
        Self {
            label: name.to_string(),
            kind: FieldKind::Plain,
            declared_type: type_name::<F>().to_string(),
        }
    }

    pub fn computed(name: &str) -> Self {
        Self {
            label: name.to_string(),
            kind: FieldKind::Computed,
            declared_type: String::new(),
        }
    }

    /// The storage shadow of a lazily initialized field `name`.
    pub fn lazy<F: ?Sized>(name: &str) -> Self {
        Self {
            label: format!("{name}{LAZY_SHADOW_SUFFIX}"),
            kind: FieldKind::Plain,
            declared_type: type_name::<F>().to_string(),
        }
    }
}

/// A field that survived reflection and is ready for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateField {
    pub name: PropertyName,
    pub shape: TypeShape,
    pub declared_type: String,
}

/// If `label` is a lazy storage shadow, return the logical field name.
pub fn lazy_base_name(label: &str) -> Option<&str> {
    label.strip_suffix(LAZY_SHADOW_SUFFIX)
}

/// Produce the ordered candidate fields of `class`.
///
/// Ignored fields are dropped whatever their type. Lazy shadows are dropped
/// when their logical name is ignored and rejected otherwise. Computed and
/// plain fields are excluded without error.
pub fn candidate_fields(
    class: &str,
    fields: Vec<FieldInfo>,
    ignored: &[&str],
) -> Result<Vec<CandidateField>> {
    let ignored: HashSet<&str> = ignored.iter().copied().collect();
    let mut candidates = Vec::with_capacity(fields.len());

    for field in fields {
        if ignored.contains(field.label.as_str()) {
            tracing::trace!(class, field = %field.label, "ignored field");
            continue;
        }

        if let Some(base) = lazy_base_name(&field.label) {
            if ignored.contains(base) {
                continue;
            }
            return Err(Error::LazyPropertyUnsupported {
                class: ClassName::from(class),
                property: base.to_string(),
            });
        }

        match field.kind {
            FieldKind::Managed(shape) => candidates.push(CandidateField {
                name: field.label,
                shape,
                declared_type: field.declared_type,
            }),
            FieldKind::Computed => {
                tracing::trace!(class, field = %field.label, "skipping computed field");
            }
            FieldKind::Plain => {
                tracing::trace!(class, field = %field.label, "skipping unmanaged field");
            }
        }
    }

    Ok(candidates)
}
