//! Accessor binding and key-based access.

use crate::{
    error::Result, registry::try_schema_of, Accessor, Error, ManagedValue, ObjectKey,
    ObjectSchema, ObjectType, Property, Slot, Storage,
};
use std::collections::BTreeMap;
use std::sync::Arc;

fn find<'a>(
    accessors: &[(&'static str, &'a dyn Accessor)],
    schema: &ObjectSchema,
    property: &Property,
) -> Result<&'a dyn Accessor> {
    accessors
        .iter()
        .find(|(name, _)| *name == property.name)
        .map(|(_, accessor)| *accessor)
        .ok_or_else(|| Error::UnknownProperty {
            class: schema.class_name.clone(),
            property: property.name.clone(),
        })
}

fn type_check(schema: &ObjectSchema, property: &Property, value: &ManagedValue) -> Result<()> {
    if property.accepts(value) {
        return Ok(());
    }
    tracing::warn!(
        class = %schema.class_name,
        property = %property.name,
        got = value.type_name(),
        "rejected value"
    );
    Err(Error::TypeMismatch {
        class: schema.class_name.clone(),
        property: property.name.clone(),
        expected: property.type_description(),
        got: value.type_name().to_string(),
    })
}

/// Current value of every schema property, keyed by column name.
pub fn collect_values<T: ObjectType>(
    object: &T,
    schema: &ObjectSchema,
) -> Result<BTreeMap<String, ManagedValue>> {
    let accessors = object.accessors();
    let mut values = BTreeMap::new();
    for property in schema.properties.iter().filter(|p| p.is_stored()) {
        let value = find(&accessors, schema, property)?.read()?;
        type_check(schema, property, &value)?;
        values.insert(property.column_name.clone(), value);
    }
    Ok(values)
}

/// Point every managed field of `object` at stored object `key`.
///
/// Linking objects fields are bound to their origin property instead of a
/// column of their own.
pub fn attach<T: ObjectType>(
    object: &mut T,
    schema: &ObjectSchema,
    storage: &Arc<dyn Storage>,
    key: ObjectKey,
) -> Result<()> {
    let mut accessors = object.accessors_mut();
    for property in &schema.properties {
        let accessor = accessors
            .iter_mut()
            .find(|(name, _)| *name == property.name)
            .map(|(_, accessor)| accessor)
            .ok_or_else(|| Error::UnknownProperty {
                class: schema.class_name.clone(),
                property: property.name.clone(),
            })?;
        let column = match &property.link_origin_property_name {
            Some(origin) if !property.is_stored() => origin,
            _ => &property.column_name,
        };
        accessor.bind(Slot::new(Arc::clone(storage), key, column));
    }
    Ok(())
}

/// Store `object` and switch its fields to managed mode.
///
/// Values are checked against their descriptors before anything is written.
pub fn bind_object<T: ObjectType>(
    object: &mut T,
    schema: &ObjectSchema,
    storage: &Arc<dyn Storage>,
    owner: Option<ObjectKey>,
) -> Result<ObjectKey> {
    if object.is_managed() {
        return Err(Error::AlreadyManaged(schema.class_name.clone()));
    }
    let values = collect_values(object, schema)?;
    let key = storage.create(&schema.class_name, owner, values)?;
    attach(object, schema, storage, key)?;
    tracing::debug!(class = %schema.class_name, key, "bound object");
    Ok(key)
}

/// Read property `key` of `object` by name.
pub fn get_value<T: ObjectType>(object: &T, key: &str) -> Result<ManagedValue> {
    let schema = try_schema_of::<T>()?;
    let property = schema.property(key).ok_or_else(|| Error::UnknownProperty {
        class: schema.class_name.clone(),
        property: key.to_string(),
    })?;
    find(&object.accessors(), &schema, property)?.read()
}

/// Write property `key` of `object` by name.
pub fn set_value<T: ObjectType>(object: &mut T, key: &str, value: ManagedValue) -> Result<()> {
    let schema = try_schema_of::<T>()?;
    let property = schema.property(key).ok_or_else(|| Error::UnknownProperty {
        class: schema.class_name.clone(),
        property: key.to_string(),
    })?;
    if !property.is_stored() {
        return Err(Error::ReadOnlyProperty {
            class: schema.class_name.clone(),
            property: property.name.clone(),
        });
    }
    type_check(&schema, property, &value)?;

    let mut accessors = object.accessors_mut();
    let (_, accessor) = accessors
        .iter_mut()
        .find(|(name, _)| *name == property.name)
        .ok_or_else(|| Error::UnknownProperty {
            class: schema.class_name.clone(),
            property: property.name.clone(),
        })?;
    accessor.write(value)
}
