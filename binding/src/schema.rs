//! Object schemas and their derivation.
//!
//! An [`ObjectSchema`] is the ordered, immutable list of managed properties
//! for one class. It is derived once from a type's reflected fields:
//! reflect, classify, apply index/primary-key/column declarations, validate.

use crate::{
    classify::{classify, ClassifyError},
    config,
    error::Result,
    reflect::{self, FieldInfo},
    validate::validate_schema,
    ClassName, Error, ObjectType, Property, PropertyName,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Managed schema of a single class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSchema {
    /// Class name
    pub class_name: ClassName,
    /// Whether instances are owned by a parent object
    pub embedded: bool,
    /// Properties in declaration order
    pub properties: Vec<Property>,
    /// Name of the primary key property
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PropertyName>,
}

impl ObjectSchema {
    /// Create a schema from already-built descriptors.
    ///
    /// No validation is performed; use [`SchemaBuilder`] to derive a
    /// validated schema from field declarations.
    pub fn new(class_name: impl Into<ClassName>, properties: Vec<Property>) -> Self {
        let primary_key = properties
            .iter()
            .find(|p| p.primary_key)
            .map(|p| p.name.clone());
        Self {
            class_name: class_name.into(),
            embedded: false,
            properties,
            primary_key,
        }
    }

    /// Start a runtime schema definition for `class_name`.
    pub fn builder(class_name: impl Into<ClassName>) -> SchemaBuilder {
        SchemaBuilder::new(class_name)
    }

    /// Derive the schema of a model type from a default instance.
    pub fn derive_for<T: ObjectType>() -> Result<Self> {
        let instance = T::default();
        let mut builder = SchemaBuilder::new(T::CLASS_NAME)
            .embedded(T::EMBEDDED)
            .fields(instance.reflect());
        for name in T::ignored_properties() {
            builder = builder.ignore(*name);
        }
        for name in T::indexed_properties() {
            builder = builder.index(*name);
        }
        if let Some(name) = T::primary_key() {
            builder = builder.primary_key(name);
        }
        for (name, column) in T::column_names() {
            builder = builder.column(*name, *column);
        }
        builder.build()
    }

    /// Look up a property by declared name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Look up a property by persisted column name.
    pub fn property_for_column(&self, column: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.column_name == column)
    }

    pub fn primary_key_property(&self) -> Option<&Property> {
        self.properties.iter().find(|p| p.primary_key)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Declarations from which an [`ObjectSchema`] is derived.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    class_name: ClassName,
    embedded: bool,
    fields: Vec<FieldInfo>,
    ignored: Vec<String>,
    indexed: Vec<String>,
    primary_key: Option<String>,
    columns: Vec<(String, String)>,
}

impl SchemaBuilder {
    pub fn new(class_name: impl Into<ClassName>) -> Self {
        Self {
            class_name: class_name.into(),
            embedded: false,
            fields: Vec::new(),
            ignored: Vec::new(),
            indexed: Vec::new(),
            primary_key: None,
            columns: Vec::new(),
        }
    }

    pub fn embedded(mut self, embedded: bool) -> Self {
        self.embedded = embedded;
        self
    }

    pub fn field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldInfo>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn ignore(mut self, name: impl Into<String>) -> Self {
        self.ignored.push(name.into());
        self
    }

    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.indexed.push(name.into());
        self
    }

    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = Some(name.into());
        self
    }

    /// Persist property `name` under `column`.
    pub fn column(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.columns.push((name.into(), column.into()));
        self
    }

    /// Derive and validate using the process configuration.
    pub fn build(self) -> Result<ObjectSchema> {
        let strict_names = config::current().strict_property_names;
        self.build_with(strict_names)
    }

    /// Derive and validate with explicit name strictness.
    pub fn build_with(self, strict_names: bool) -> Result<ObjectSchema> {
        let class = self.class_name;
        let ignored: Vec<&str> = self.ignored.iter().map(String::as_str).collect();
        let candidates = reflect::candidate_fields(&class, self.fields, &ignored)?;

        let mut properties = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let classification = classify(&candidate.shape).map_err(|err| match err {
                ClassifyError::Unsupported => Error::UnsupportedType {
                    class: class.clone(),
                    property: candidate.name.clone(),
                    declared: candidate.declared_type.clone(),
                },
                ClassifyError::OptionalCollection(kind) => Error::InvalidOptionality {
                    class: class.clone(),
                    property: candidate.name.clone(),
                    reason: format!("{kind} property must not be marked as optional"),
                },
            })?;
            let property = classification.into_property(candidate.name);
            tracing::trace!(
                class = %class,
                property = %property.name,
                ty = %property.type_description(),
                "classified property"
            );
            properties.push(property);
        }

        for name in &self.indexed {
            let property = find_mut(&mut properties, name).ok_or_else(|| Error::InvalidIndex {
                class: class.clone(),
                property: name.clone(),
                reason: "property does not exist".into(),
            })?;
            property.indexed = true;
        }

        if let Some(name) = &self.primary_key {
            let property =
                find_mut(&mut properties, name).ok_or_else(|| Error::InvalidPrimaryKey {
                    class: class.clone(),
                    property: name.clone(),
                    reason: "property does not exist".into(),
                })?;
            property.primary_key = true;
            property.indexed = true;
        }

        for (name, column) in &self.columns {
            let property =
                find_mut(&mut properties, name).ok_or_else(|| Error::UnknownProperty {
                    class: class.clone(),
                    property: name.clone(),
                })?;
            property.column_name = column.clone();
        }

        let schema = ObjectSchema {
            class_name: class,
            embedded: self.embedded,
            primary_key: self.primary_key,
            properties,
        };
        validate_schema(&schema, strict_names)?;

        tracing::debug!(
            class = %schema.class_name,
            properties = schema.properties.len(),
            "derived object schema"
        );
        Ok(schema)
    }
}

fn find_mut<'a>(properties: &'a mut [Property], name: &str) -> Option<&'a mut Property> {
    properties.iter_mut().find(|p| p.name == name)
}

/// The set of classes known to a database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Object schemas by class name
    pub classes: BTreeMap<ClassName, Arc<ObjectSchema>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class to the schema.
    pub fn add_class(&mut self, schema: Arc<ObjectSchema>) -> &mut Self {
        self.classes.insert(schema.class_name.clone(), schema);
        self
    }

    /// Builder-style method to add a class.
    pub fn with_class(mut self, schema: Arc<ObjectSchema>) -> Self {
        self.add_class(schema);
        self
    }

    pub fn get_class(&self, name: &str) -> Option<&Arc<ObjectSchema>> {
        self.classes.get(name)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::ValueConversion {
            expected: "serializable schema".into(),
            got: e.to_string(),
        })
    }
}
