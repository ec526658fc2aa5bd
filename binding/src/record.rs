//! Stored object records.

use crate::{ClassName, ManagedValue, ObjectKey, Version};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata associated with a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// When the object was first stored
    pub created_at: DateTime<Utc>,
    /// When a property was last written
    pub updated_at: DateTime<Utc>,
}

impl Metadata {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    pub fn touch(&mut self, timestamp: DateTime<Utc>) {
        self.updated_at = timestamp;
    }
}

/// Persisted state of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub key: ObjectKey,
    pub class_name: ClassName,
    /// Parent object for embedded records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<ObjectKey>,
    /// Incremented on each write
    pub version: Version,
    /// Values by column name
    pub values: BTreeMap<String, ManagedValue>,
    pub metadata: Metadata,
    /// Tombstone flag
    pub deleted: bool,
}

impl Record {
    pub fn new(
        key: ObjectKey,
        class_name: impl Into<ClassName>,
        owner: Option<ObjectKey>,
        values: BTreeMap<String, ManagedValue>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            class_name: class_name.into(),
            owner,
            version: 1,
            values,
            metadata: Metadata::new(timestamp),
            deleted: false,
        }
    }

    /// Check if record is live (not deleted).
    pub fn is_active(&self) -> bool {
        !self.deleted
    }

    pub fn get(&self, column: &str) -> Option<&ManagedValue> {
        self.values.get(column)
    }

    /// Replace one column's value, returning the previous value.
    pub fn set_value(
        &mut self,
        column: &str,
        value: ManagedValue,
        timestamp: DateTime<Utc>,
    ) -> Option<ManagedValue> {
        let old = self.values.insert(column.to_string(), value);
        self.version += 1;
        self.metadata.touch(timestamp);
        old
    }

    /// Mark record as deleted (tombstone).
    pub fn mark_deleted(&mut self, timestamp: DateTime<Utc>) {
        self.deleted = true;
        self.version += 1;
        self.metadata.touch(timestamp);
    }
}
