//! Untyped objects of runtime-defined classes.

use crate::{error::Result, Error, ManagedValue, ObjectKey, ObjectSchema, Property, Storage};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

enum Backing {
    Unmanaged(BTreeMap<String, ManagedValue>),
    Managed {
        storage: Arc<dyn Storage>,
        key: ObjectKey,
    },
}

/// An object accessed by property name against a runtime schema.
///
/// ```rust
/// use tessel::{Database, DynamicObject, FieldInfo, ManagedValue, ObjectSchema};
/// use tessel::{PropertyType, TypeShape};
///
/// let schema = ObjectSchema::builder("Note")
///     .field(FieldInfo::with_shape("title", TypeShape::Scalar(PropertyType::String), "String"))
///     .build()
///     .unwrap();
///
/// let db = Database::in_memory();
/// let schema = db.register_dynamic(schema).unwrap();
///
/// let mut note = DynamicObject::new(schema);
/// note.set("title", ManagedValue::from("groceries")).unwrap();
/// let key = db.add_dynamic(&mut note).unwrap();
///
/// let stored = db.dynamic_object("Note", key).unwrap();
/// assert_eq!(stored.get("title").unwrap(), ManagedValue::from("groceries"));
/// ```
pub struct DynamicObject {
    schema: Arc<ObjectSchema>,
    backing: Backing,
}

impl DynamicObject {
    /// A new unmanaged object with every property at its default value.
    pub fn new(schema: Arc<ObjectSchema>) -> Self {
        let values = schema
            .properties
            .iter()
            .map(|p| (p.name.clone(), p.default_value()))
            .collect();
        Self {
            schema,
            backing: Backing::Unmanaged(values),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.schema.class_name
    }

    pub fn schema(&self) -> &Arc<ObjectSchema> {
        &self.schema
    }

    pub fn object_key(&self) -> Option<ObjectKey> {
        match &self.backing {
            Backing::Managed { key, .. } => Some(*key),
            Backing::Unmanaged(_) => None,
        }
    }

    pub fn is_managed(&self) -> bool {
        self.object_key().is_some()
    }

    fn property(&self, name: &str) -> Result<&Property> {
        self.schema
            .property(name)
            .ok_or_else(|| Error::UnknownProperty {
                class: self.schema.class_name.clone(),
                property: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Result<ManagedValue> {
        let property = self.property(name)?;
        if !property.is_stored() {
            return self.linking_objects(property);
        }
        match &self.backing {
            Backing::Unmanaged(values) => Ok(values
                .get(&property.name)
                .cloned()
                .unwrap_or_else(|| property.default_value())),
            Backing::Managed { storage, key } => storage.read(*key, &property.column_name),
        }
    }

    pub fn set(&mut self, name: &str, value: ManagedValue) -> Result<()> {
        let property = self.property(name)?;
        if !property.is_stored() {
            return Err(Error::ReadOnlyProperty {
                class: self.schema.class_name.clone(),
                property: property.name.clone(),
            });
        }
        if !property.accepts(&value) {
            tracing::warn!(
                class = %self.schema.class_name,
                property = name,
                got = value.type_name(),
                "rejected value"
            );
            return Err(Error::TypeMismatch {
                class: self.schema.class_name.clone(),
                property: property.name.clone(),
                expected: property.type_description(),
                got: value.type_name().to_string(),
            });
        }
        let (property_name, column) = (property.name.clone(), property.column_name.clone());
        match &mut self.backing {
            Backing::Unmanaged(values) => {
                values.insert(property_name, value);
                Ok(())
            }
            Backing::Managed { storage, key } => storage.write(*key, &column, value),
        }
    }

    fn linking_objects(&self, property: &Property) -> Result<ManagedValue> {
        let Backing::Managed { storage, key } = &self.backing else {
            return Ok(ManagedValue::List(Vec::new()));
        };
        if !storage.is_live(*key) {
            return Err(Error::ObjectInvalidated(*key));
        }
        let (Some(class), Some(origin)) = (
            property.object_class_name.as_deref(),
            property.link_origin_property_name.as_deref(),
        ) else {
            return Ok(ManagedValue::List(Vec::new()));
        };
        Ok(ManagedValue::List(
            storage
                .backlinks(class, origin, *key)
                .into_iter()
                .map(ManagedValue::Link)
                .collect(),
        ))
    }

    /// Current values of stored properties keyed by column name.
    pub(crate) fn column_values(&self) -> Result<BTreeMap<String, ManagedValue>> {
        self.schema
            .properties
            .iter()
            .filter(|p| p.is_stored())
            .map(|p| Ok((p.column_name.clone(), self.get(&p.name)?)))
            .collect()
    }

    pub(crate) fn attach(&mut self, storage: Arc<dyn Storage>, key: ObjectKey) {
        self.backing = Backing::Managed { storage, key };
    }
}

impl fmt::Debug for DynamicObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("DynamicObject");
        debug.field("class", &self.schema.class_name);
        match &self.backing {
            Backing::Unmanaged(values) => debug.field("values", values),
            Backing::Managed { key, .. } => debug.field("key", key),
        };
        debug.finish()
    }
}
