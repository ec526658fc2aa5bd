//! Schema validation.
//!
//! Rules enforced per property:
//! - links (top-level or embedded) must be optional as scalars and must not
//!   be optional as collection elements
//! - primary keys only on non-collection int or string properties, never on
//!   embedded types
//! - indexes only on non-collection int, bool, string or date properties
//!
//! - linking objects name an origin class and property, and are a plain list
//!
//! Rules enforced per schema: at least one property, unique persisted names
//! and, when strict naming is enabled, identifier-like property names.
//!
//! The origin of a linking objects property can only be checked once both
//! classes are known; [`validate_linking_objects`] does that at registration.

use crate::{error::Result, CollectionKind, Error, ObjectSchema, Property, PropertyType};
use std::collections::HashSet;

/// Validate a fully assembled object schema.
pub fn validate_schema(schema: &ObjectSchema, strict_names: bool) -> Result<()> {
    let class = schema.class_name.as_str();
    if schema.properties.is_empty() {
        return Err(Error::EmptySchema(class.to_string()));
    }
    let mut seen = HashSet::new();
    let mut primary_keys = 0;

    for property in &schema.properties {
        if !seen.insert(property.column_name.as_str()) {
            return Err(Error::DuplicateProperty {
                class: class.to_string(),
                property: property.column_name.clone(),
            });
        }
        if strict_names {
            validate_name(class, &property.name)?;
        }
        validate_property(class, property)?;

        if property.primary_key {
            primary_keys += 1;
            if schema.embedded {
                return Err(Error::InvalidPrimaryKey {
                    class: class.to_string(),
                    property: property.name.clone(),
                    reason: "embedded objects cannot have a primary key".into(),
                });
            }
            if primary_keys > 1 {
                return Err(Error::InvalidPrimaryKey {
                    class: class.to_string(),
                    property: property.name.clone(),
                    reason: "only one property can be the primary key".into(),
                });
            }
        }
    }

    Ok(())
}

/// Validate a single property descriptor of `class`.
pub fn validate_property(class: &str, property: &Property) -> Result<()> {
    validate_optionality(class, property)?;

    if property.property_type == PropertyType::LinkingObjects {
        let reason = if property.object_class_name.is_none() {
            Some("origin class is missing")
        } else if property.link_origin_property_name.is_none() {
            Some("origin property is missing")
        } else if property.collection != CollectionKind::List || property.optional {
            Some("linking objects must be a non-optional list")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(Error::InvalidLinkingObjects {
                class: class.to_string(),
                property: property.name.clone(),
                reason: reason.to_string(),
            });
        }
    }

    if property.primary_key
        && (property.is_collection() || !property.property_type.supports_primary_key())
    {
        return Err(Error::InvalidPrimaryKey {
            class: class.to_string(),
            property: property.name.clone(),
            reason: format!(
                "only int and string properties can be primary keys, found {}",
                property.type_description()
            ),
        });
    }

    if property.indexed
        && (property.is_collection() || !property.property_type.supports_index())
    {
        return Err(Error::InvalidIndex {
            class: class.to_string(),
            property: property.name.clone(),
            reason: format!(
                "only int, bool, string and date properties can be indexed, found {}",
                property.type_description()
            ),
        });
    }

    Ok(())
}

/// Check that `property` of `owner` follows a link property of `origin`
/// that targets `owner`.
pub fn validate_linking_objects(
    owner: &ObjectSchema,
    property: &Property,
    origin: &ObjectSchema,
) -> Result<()> {
    let origin_name = property.link_origin_property_name.as_deref().unwrap_or_default();
    let reason = match origin.property(origin_name) {
        None => format!(
            "origin property {}.{origin_name} does not exist",
            origin.class_name
        ),
        Some(link)
            if link.property_type == PropertyType::Object
                && link.object_class_name.as_deref() == Some(owner.class_name.as_str()) =>
        {
            return Ok(())
        }
        Some(_) => format!(
            "origin property {}.{origin_name} does not link to {}",
            origin.class_name, owner.class_name
        ),
    };
    Err(Error::InvalidLinkingObjects {
        class: owner.class_name.clone(),
        property: property.name.clone(),
        reason,
    })
}

fn validate_optionality(class: &str, property: &Property) -> Result<()> {
    if !property.property_type.is_link() {
        return Ok(());
    }

    let kind = match property.property_type {
        PropertyType::EmbeddedObject => "embedded object",
        _ => "object",
    };
    let target = property.object_class_name.as_deref().unwrap_or("Object");

    let reason = match (property.collection, property.optional) {
        (CollectionKind::None, false) => {
            format!("{kind} property must be marked as optional")
        }
        (CollectionKind::None, true) => return Ok(()),
        (collection, true) => {
            format!("{collection}<{target}> property must not be marked as optional")
        }
        (_, false) => return Ok(()),
    };

    Err(Error::InvalidOptionality {
        class: class.to_string(),
        property: property.name.clone(),
        reason,
    })
}

fn validate_name(class: &str, name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(Error::InvalidPropertyName {
            class: class.to_string(),
            property: name.to_string(),
            reason: reason.to_string(),
        })
    };

    let mut chars = name.chars();
    match chars.next() {
        None => return invalid("property names cannot be empty"),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
            return invalid("property names must start with a letter or underscore")
        }
        _ => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return invalid("property names may only contain letters, digits and underscores");
    }
    if name.starts_with("__") {
        return invalid("names starting with '__' are reserved");
    }
    Ok(())
}
