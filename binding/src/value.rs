//! Managed values.
//!
//! [`ManagedValue`] is the closed union of everything a managed property can
//! hold. Dynamic access, the storage seam and change notifications all
//! speak in terms of it.

use crate::{ObjectId, ObjectKey, PropertyType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A value stored in a managed property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ManagedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    String(String),
    Data(Vec<u8>),
    Date(DateTime<Utc>),
    Decimal(Decimal),
    ObjectId(ObjectId),
    Uuid(Uuid),
    /// Key of a linked object
    Link(ObjectKey),
    List(Vec<ManagedValue>),
    /// Unique elements in insertion order
    Set(Vec<ManagedValue>),
    Map(BTreeMap<String, ManagedValue>),
}

impl ManagedValue {
    /// The scalar tag of this value. `None` for null, links and collections.
    pub fn property_type(&self) -> Option<PropertyType> {
        let tag = match self {
            ManagedValue::Bool(_) => PropertyType::Bool,
            ManagedValue::Int(_) => PropertyType::Int,
            ManagedValue::Float(_) => PropertyType::Float,
            ManagedValue::Double(_) => PropertyType::Double,
            ManagedValue::String(_) => PropertyType::String,
            ManagedValue::Data(_) => PropertyType::Data,
            ManagedValue::Date(_) => PropertyType::Date,
            ManagedValue::Decimal(_) => PropertyType::Decimal,
            ManagedValue::ObjectId(_) => PropertyType::ObjectId,
            ManagedValue::Uuid(_) => PropertyType::Uuid,
            ManagedValue::Null
            | ManagedValue::Link(_)
            | ManagedValue::List(_)
            | ManagedValue::Set(_)
            | ManagedValue::Map(_) => return None,
        };
        Some(tag)
    }

    /// Name of the value's variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ManagedValue::Null => "null",
            ManagedValue::Bool(_) => "bool",
            ManagedValue::Int(_) => "int",
            ManagedValue::Float(_) => "float",
            ManagedValue::Double(_) => "double",
            ManagedValue::String(_) => "string",
            ManagedValue::Data(_) => "data",
            ManagedValue::Date(_) => "date",
            ManagedValue::Decimal(_) => "decimal",
            ManagedValue::ObjectId(_) => "objectId",
            ManagedValue::Uuid(_) => "uuid",
            ManagedValue::Link(_) => "link",
            ManagedValue::List(_) => "list",
            ManagedValue::Set(_) => "set",
            ManagedValue::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ManagedValue::Null)
    }

    pub fn is_link(&self) -> bool {
        matches!(self, ManagedValue::Link(_))
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            ManagedValue::List(_) | ManagedValue::Set(_) | ManagedValue::Map(_)
        )
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ManagedValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ManagedValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<ObjectKey> {
        match self {
            ManagedValue::Link(key) => Some(*key),
            _ => None,
        }
    }

    /// Every link key held by this value, including inside collections.
    pub fn links(&self) -> Vec<ObjectKey> {
        match self {
            ManagedValue::Link(key) => vec![*key],
            ManagedValue::List(items) | ManagedValue::Set(items) => {
                items.iter().filter_map(ManagedValue::as_link).collect()
            }
            ManagedValue::Map(entries) => entries.values().filter_map(ManagedValue::as_link).collect(),
            _ => Vec::new(),
        }
    }

    /// This value with every link to `target` dropped: a direct link becomes
    /// null, list and set elements are removed, map entries are removed.
    pub fn without_link(self, target: ObjectKey) -> ManagedValue {
        let keep = |item: &ManagedValue| item.as_link() != Some(target);
        match self {
            ManagedValue::Link(key) if key == target => ManagedValue::Null,
            ManagedValue::List(items) => ManagedValue::List(items.into_iter().filter(keep).collect()),
            ManagedValue::Set(items) => ManagedValue::Set(items.into_iter().filter(keep).collect()),
            ManagedValue::Map(mut entries) => {
                entries.retain(|_, item| keep(item));
                ManagedValue::Map(entries)
            }
            other => other,
        }
    }

    /// Render a scalar for messages such as duplicate primary keys.
    pub fn display(&self) -> String {
        match self {
            ManagedValue::String(s) => format!("'{s}'"),
            ManagedValue::Int(v) => v.to_string(),
            other => format!("{other:?}"),
        }
    }
}

impl From<bool> for ManagedValue {
    fn from(value: bool) -> Self {
        ManagedValue::Bool(value)
    }
}

impl From<i64> for ManagedValue {
    fn from(value: i64) -> Self {
        ManagedValue::Int(value)
    }
}

impl From<i32> for ManagedValue {
    fn from(value: i32) -> Self {
        ManagedValue::Int(value.into())
    }
}

impl From<f64> for ManagedValue {
    fn from(value: f64) -> Self {
        ManagedValue::Double(value)
    }
}

impl From<&str> for ManagedValue {
    fn from(value: &str) -> Self {
        ManagedValue::String(value.to_string())
    }
}

impl From<String> for ManagedValue {
    fn from(value: String) -> Self {
        ManagedValue::String(value)
    }
}

/// Field type for properties tagged `Any`.
///
/// Holds any non-collection value, including null.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnyValue(ManagedValue);

impl AnyValue {
    /// Wrap a value. Collections cannot be stored in an `Any` property.
    pub fn new(value: ManagedValue) -> Option<Self> {
        (!value.is_collection()).then_some(Self(value))
    }

    pub fn null() -> Self {
        Self(ManagedValue::Null)
    }

    pub fn value(&self) -> &ManagedValue {
        &self.0
    }

    pub fn into_value(self) -> ManagedValue {
        self.0
    }
}

impl Default for ManagedValue {
    fn default() -> Self {
        ManagedValue::Null
    }
}
