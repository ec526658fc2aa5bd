//! Property descriptors.
//!
//! A [`Property`] is the managed metadata for one field of a model type:
//! its semantic type tag, optionality, collection kind, and indexing.

use crate::{ClassName, ManagedValue, PropertyName};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type tag of a managed property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyType {
    /// All signed integer widths
    Int,
    Bool,
    Float,
    Double,
    String,
    Data,
    Date,
    Decimal,
    ObjectId,
    Uuid,
    /// Dynamic value of any non-collection type
    Any,
    /// Link to a top-level object
    Object,
    /// Link to an object owned by its parent
    EmbeddedObject,
    /// Computed, read-only collection of the objects linking to this one
    LinkingObjects,
}

impl PropertyType {
    /// Whether this tag links to another object.
    pub fn is_link(self) -> bool {
        matches!(self, PropertyType::Object | PropertyType::EmbeddedObject)
    }

    /// Whether this tag describes a stored value rather than a link or
    /// backlink.
    pub fn is_scalar(self) -> bool {
        !self.is_link() && self != PropertyType::LinkingObjects
    }

    /// Whether a primary key may be declared on this tag.
    pub fn supports_primary_key(self) -> bool {
        matches!(self, PropertyType::Int | PropertyType::String)
    }

    /// Whether an index may be requested on this tag.
    pub fn supports_index(self) -> bool {
        matches!(
            self,
            PropertyType::Int | PropertyType::Bool | PropertyType::String | PropertyType::Date
        )
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyType::Int => "int",
            PropertyType::Bool => "bool",
            PropertyType::Float => "float",
            PropertyType::Double => "double",
            PropertyType::String => "string",
            PropertyType::Data => "data",
            PropertyType::Date => "date",
            PropertyType::Decimal => "decimal",
            PropertyType::ObjectId => "objectId",
            PropertyType::Uuid => "uuid",
            PropertyType::Any => "any",
            PropertyType::Object => "object",
            PropertyType::EmbeddedObject => "embeddedObject",
            PropertyType::LinkingObjects => "linkingObjects",
        };
        f.write_str(name)
    }
}

/// Collection wrapping of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectionKind {
    #[default]
    None,
    List,
    Set,
    /// String-keyed map
    Map,
}

impl CollectionKind {
    pub fn is_collection(self) -> bool {
        self != CollectionKind::None
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionKind::None => write!(f, "none"),
            CollectionKind::List => write!(f, "List"),
            CollectionKind::Set => write!(f, "MutableSet"),
            CollectionKind::Map => write!(f, "Map"),
        }
    }
}

/// Descriptor for a single managed property.
///
/// For collection properties, `optional` describes the elements; the
/// container itself is never optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    /// Property name as declared on the type
    pub name: PropertyName,
    /// Name the storage engine persists the property under
    pub column_name: PropertyName,
    /// Semantic type tag
    pub property_type: PropertyType,
    /// Whether the value (or each element) may be null
    pub optional: bool,
    /// Collection wrapping
    pub collection: CollectionKind,
    /// Whether an index is maintained
    pub indexed: bool,
    /// Whether this is the type's primary key
    pub primary_key: bool,
    /// Target class for link properties, origin class for linking objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_class_name: Option<ClassName>,
    /// Property of the origin class whose links a linking objects property
    /// follows back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_origin_property_name: Option<PropertyName>,
}

impl Property {
    /// Create a non-optional scalar property.
    pub fn new(name: impl Into<PropertyName>, property_type: PropertyType) -> Self {
        let name = name.into();
        Self {
            column_name: name.clone(),
            name,
            property_type,
            optional: false,
            collection: CollectionKind::None,
            indexed: false,
            primary_key: false,
            object_class_name: None,
            link_origin_property_name: None,
        }
    }

    /// Create an optional scalar property.
    pub fn optional(name: impl Into<PropertyName>, property_type: PropertyType) -> Self {
        Self::new(name, property_type).with_optional(true)
    }

    /// Create a link property to `class`.
    pub fn link(name: impl Into<PropertyName>, class: impl Into<ClassName>, embedded: bool) -> Self {
        let property_type = if embedded {
            PropertyType::EmbeddedObject
        } else {
            PropertyType::Object
        };
        let mut property = Self::new(name, property_type);
        property.object_class_name = Some(class.into());
        property
    }

    /// Create a linking objects property listing the `class` objects whose
    /// `origin` property links here.
    pub fn linking_objects(
        name: impl Into<PropertyName>,
        class: impl Into<ClassName>,
        origin: impl Into<PropertyName>,
    ) -> Self {
        let mut property =
            Self::new(name, PropertyType::LinkingObjects).with_collection(CollectionKind::List);
        property.object_class_name = Some(class.into());
        property.link_origin_property_name = Some(origin.into());
        property
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_collection(mut self, collection: CollectionKind) -> Self {
        self.collection = collection;
        self
    }

    pub fn with_column(mut self, column: impl Into<PropertyName>) -> Self {
        self.column_name = column.into();
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self.indexed = true;
        self
    }

    /// Whether this property is a list, set or map.
    pub fn is_collection(&self) -> bool {
        self.collection.is_collection()
    }

    /// Whether the property has a stored column. Linking objects are
    /// computed from other objects' links.
    pub fn is_stored(&self) -> bool {
        self.property_type != PropertyType::LinkingObjects
    }

    /// Human-readable declared type, e.g. `List<int?>`.
    pub fn type_description(&self) -> String {
        if self.property_type == PropertyType::LinkingObjects {
            let class = self.object_class_name.as_deref().unwrap_or("Object");
            let origin = self.link_origin_property_name.as_deref().unwrap_or("?");
            return format!("LinkingObjects<{class}.{origin}>");
        }
        let base = match &self.object_class_name {
            Some(class) if self.property_type.is_link() => class.clone(),
            _ => self.property_type.to_string(),
        };
        let element = if self.optional {
            format!("{base}?")
        } else {
            base
        };
        match self.collection {
            CollectionKind::None => element,
            kind => format!("{kind}<{element}>"),
        }
    }

    /// Check a value against this descriptor's tag, optionality and
    /// collection kind.
    pub fn accepts(&self, value: &ManagedValue) -> bool {
        match (self.collection, value) {
            (CollectionKind::None, value) => self.accepts_element(value),
            (CollectionKind::List, ManagedValue::List(items))
            | (CollectionKind::Set, ManagedValue::Set(items)) => {
                items.iter().all(|item| self.accepts_element(item))
            }
            (CollectionKind::Map, ManagedValue::Map(entries)) => {
                entries.values().all(|item| self.accepts_element(item))
            }
            _ => false,
        }
    }

    /// Value held by a freshly created object that never set this property.
    pub fn default_value(&self) -> ManagedValue {
        match self.collection {
            CollectionKind::List => return ManagedValue::List(Vec::new()),
            CollectionKind::Set => return ManagedValue::Set(Vec::new()),
            CollectionKind::Map => return ManagedValue::Map(Default::default()),
            CollectionKind::None => {}
        }
        if self.optional {
            return ManagedValue::Null;
        }
        match self.property_type {
            PropertyType::Int => ManagedValue::Int(0),
            PropertyType::Bool => ManagedValue::Bool(false),
            PropertyType::Float => ManagedValue::Float(0.0),
            PropertyType::Double => ManagedValue::Double(0.0),
            PropertyType::String => ManagedValue::String(String::new()),
            PropertyType::Data => ManagedValue::Data(Vec::new()),
            PropertyType::Date => ManagedValue::Date(Default::default()),
            PropertyType::Decimal => ManagedValue::Decimal(Default::default()),
            PropertyType::ObjectId => ManagedValue::ObjectId(Default::default()),
            PropertyType::Uuid => ManagedValue::Uuid(Default::default()),
            PropertyType::Any
            | PropertyType::Object
            | PropertyType::EmbeddedObject
            | PropertyType::LinkingObjects => ManagedValue::Null,
        }
    }

    fn accepts_element(&self, value: &ManagedValue) -> bool {
        if self.property_type == PropertyType::Any {
            return !value.is_collection();
        }
        match value {
            ManagedValue::Null => self.optional,
            value => value.property_type() == Some(self.property_type)
                || (value.is_link() && !self.property_type.is_scalar()),
        }
    }
}
