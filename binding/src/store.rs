//! Storage seam.
//!
//! Managed accessors and the [`Database`](crate::Database) facade reach the
//! storage engine only through the [`Storage`] trait. [`MemoryStore`] is the
//! in-process reference engine.
//!
//! Once a class schema is registered with the store, every create and write
//! of that class is checked against it: links must point at live objects of
//! the target class, primary keys are unique and cannot change after insert.

use crate::{
    error::Result, notify::ChangeCallback, ClassName, Error, ManagedValue, NotificationToken,
    ObjectChange, ObjectKey, ObjectSchema, PropertyChange, Record,
};
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Backing storage for managed objects.
pub trait Storage: Send + Sync {
    /// Attach the schema of a class. Later creates and writes of that class
    /// are checked against it.
    ///
    /// Registering an identical schema again is a no-op; a different schema
    /// for an already registered class is a [`Error::SchemaMismatch`].
    fn register_schema(&self, schema: Arc<ObjectSchema>) -> Result<()>;

    /// Store a new object and return its key.
    ///
    /// For a registered class the primary key is claimed atomically with the
    /// insert, so concurrent creates of the same key cannot both succeed.
    fn create(
        &self,
        class: &str,
        owner: Option<ObjectKey>,
        values: BTreeMap<String, ManagedValue>,
    ) -> Result<ObjectKey>;

    fn read(&self, object: ObjectKey, column: &str) -> Result<ManagedValue>;

    fn write(&self, object: ObjectKey, column: &str, value: ManagedValue) -> Result<()>;

    /// Tombstone an object and drop every link to it held by other live
    /// objects. Owned objects are not touched.
    fn delete(&self, object: ObjectKey) -> Result<()>;

    fn is_live(&self, object: ObjectKey) -> bool;

    /// Class of a live object.
    fn class_of(&self, object: ObjectKey) -> Option<ClassName>;

    /// Keys of live objects of `class`, in creation order.
    fn objects(&self, class: &str) -> Vec<ObjectKey>;

    /// Keys of live objects owned by `owner`.
    fn owned_by(&self, owner: ObjectKey) -> Vec<ObjectKey>;

    /// First live object of `class` whose `column` equals `value`.
    fn find(&self, class: &str, column: &str, value: &ManagedValue) -> Option<ObjectKey>;

    /// Live objects of `class` whose `property` links to `target`, in
    /// creation order. Each object is listed once.
    fn backlinks(&self, class: &str, property: &str, target: ObjectKey) -> Vec<ObjectKey>;

    fn observe(&self, object: ObjectKey, callback: ChangeCallback) -> Result<NotificationToken>;
}

/// Hashable form of a primary key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum UniqueValue {
    Null,
    Int(i64),
    String(String),
}

impl UniqueValue {
    fn of(value: &ManagedValue) -> Option<Self> {
        match value {
            ManagedValue::Null => Some(UniqueValue::Null),
            ManagedValue::Int(v) => Some(UniqueValue::Int(*v)),
            ManagedValue::String(v) => Some(UniqueValue::String(v.clone())),
            _ => None,
        }
    }
}

struct Observer {
    id: u64,
    callback: ChangeCallback,
}

#[derive(Default)]
struct Inner {
    records: DashMap<ObjectKey, Record>,
    observers: DashMap<ObjectKey, Vec<Observer>>,
    schemas: DashMap<ClassName, Arc<ObjectSchema>>,
    primary_keys: DashMap<(ClassName, UniqueValue), ObjectKey>,
    next_key: AtomicU64,
    next_token: AtomicU64,
}

impl Inner {
    fn notify(&self, object: ObjectKey, change: &ObjectChange) {
        // Snapshot callbacks so none run while a shard lock is held
        let callbacks: Vec<ChangeCallback> = match self.observers.get(&object) {
            Some(observers) => observers.iter().map(|o| Arc::clone(&o.callback)).collect(),
            None => return,
        };
        for callback in callbacks {
            callback(change);
        }
    }

    fn unobserve(&self, object: ObjectKey, id: u64) {
        if let Some(mut observers) = self.observers.get_mut(&object) {
            observers.retain(|o| o.id != id);
        }
        self.observers.remove_if(&object, |_, observers| observers.is_empty());
    }

    fn schema(&self, class: &str) -> Option<Arc<ObjectSchema>> {
        self.schemas.get(class).map(|schema| Arc::clone(schema.value()))
    }

    fn live_class(&self, object: ObjectKey) -> Option<ClassName> {
        self.records
            .get(&object)
            .filter(|r| r.is_active())
            .map(|r| r.class_name.clone())
    }

    /// Check that every link in `value` targets a live object of the class
    /// `column` links to.
    fn check_links(&self, schema: &ObjectSchema, column: &str, value: &ManagedValue) -> Result<()> {
        let Some(property) = schema.property_for_column(column) else {
            return Ok(());
        };
        if !property.property_type.is_link() {
            return Ok(());
        }
        let Some(target) = property.object_class_name.as_deref() else {
            return Ok(());
        };
        for key in value.links() {
            if self.live_class(key).as_deref() != Some(target) {
                tracing::warn!(
                    class = %schema.class_name,
                    property = %property.name,
                    key,
                    "rejected link"
                );
                return Err(Error::InvalidLink {
                    class: schema.class_name.clone(),
                    property: property.name.clone(),
                    target: target.to_string(),
                });
            }
        }
        Ok(())
    }

    fn primary_key_of(schema: &ObjectSchema, record: &Record) -> Option<UniqueValue> {
        let property = schema.primary_key_property()?;
        record.get(&property.column_name).and_then(UniqueValue::of)
    }

    /// Remove `target` from every live record and report what changed.
    fn unlink(&self, target: ObjectKey) -> Vec<(ObjectKey, Vec<PropertyChange>)> {
        let now = Utc::now();
        let mut changed = Vec::new();
        for mut record in self.records.iter_mut() {
            if !record.is_active() {
                continue;
            }
            let columns: Vec<String> = record
                .values
                .iter()
                .filter(|(_, value)| value.links().contains(&target))
                .map(|(column, _)| column.clone())
                .collect();
            if columns.is_empty() {
                continue;
            }
            let mut changes = Vec::with_capacity(columns.len());
            for column in columns {
                let Some(current) = record.get(&column).cloned() else {
                    continue;
                };
                let value = current.without_link(target);
                let old = record.set_value(&column, value.clone(), now);
                changes.push(PropertyChange {
                    name: column,
                    old_value: old,
                    new_value: Some(value),
                });
            }
            changed.push((record.key, changes));
        }
        changed
    }
}

/// In-memory storage engine.
///
/// Clones share the same underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of a record, including tombstoned ones.
    pub fn record(&self, object: ObjectKey) -> Option<Record> {
        self.inner.records.get(&object).map(|r| r.value().clone())
    }

    /// Count of live records.
    pub fn len(&self) -> usize {
        self.inner.records.iter().filter(|r| r.is_active()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records, including tombstones, ordered by key.
    pub fn export(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self.inner.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by_key(|r| r.key);
        records
    }

    /// Export all records as JSON.
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string(&self.export()).map_err(|e| Error::ValueConversion {
            expected: "serializable records".into(),
            got: e.to_string(),
        })
    }

    /// Rebuild a store from exported records.
    ///
    /// Schemas are not part of an export; register them again before
    /// relying on link and primary-key checks.
    pub fn import(records: Vec<Record>) -> Self {
        let store = Self::new();
        let mut max_key = 0;
        for record in records {
            max_key = max_key.max(record.key);
            store.inner.records.insert(record.key, record);
        }
        store.inner.next_key.store(max_key, Ordering::SeqCst);
        store
    }

    pub fn import_json(json: &str) -> Result<Self> {
        let records: Vec<Record> =
            serde_json::from_str(json).map_err(|e| Error::ValueConversion {
                expected: "exported records".into(),
                got: e.to_string(),
            })?;
        Ok(Self::import(records))
    }

    fn live_keys(&self, filter: impl Fn(&Record) -> bool) -> Vec<ObjectKey> {
        let mut keys: Vec<ObjectKey> = self
            .inner
            .records
            .iter()
            .filter(|r| r.is_active() && filter(r.value()))
            .map(|r| r.key)
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Index the primary keys of live records already stored for `schema`.
    fn index_existing(&self, schema: &ObjectSchema) {
        for key in self.live_keys(|r| r.class_name == schema.class_name) {
            let unique = self
                .inner
                .records
                .get(&key)
                .and_then(|record| Inner::primary_key_of(schema, &record));
            if let Some(unique) = unique {
                self.inner
                    .primary_keys
                    .entry((schema.class_name.clone(), unique))
                    .or_insert(key);
            }
        }
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("records", &self.inner.records.len())
            .field("observed", &self.inner.observers.len())
            .finish()
    }
}

impl Storage for MemoryStore {
    fn register_schema(&self, schema: Arc<ObjectSchema>) -> Result<()> {
        match self.inner.schemas.entry(schema.class_name.clone()) {
            Entry::Occupied(entry) => {
                if **entry.get() != *schema {
                    return Err(Error::SchemaMismatch(schema.class_name.clone()));
                }
                return Ok(());
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&schema));
            }
        }
        if schema.primary_key_property().is_some() {
            self.index_existing(&schema);
        }
        tracing::debug!(class = %schema.class_name, "registered schema with store");
        Ok(())
    }

    fn create(
        &self,
        class: &str,
        owner: Option<ObjectKey>,
        values: BTreeMap<String, ManagedValue>,
    ) -> Result<ObjectKey> {
        let schema = self.inner.schema(class);
        let mut unique = None;
        if let Some(schema) = &schema {
            for (column, value) in &values {
                self.inner.check_links(schema, column, value)?;
            }
            if let Some(property) = schema.primary_key_property() {
                unique = values
                    .get(&property.column_name)
                    .and_then(|value| UniqueValue::of(value).map(|u| (u, value.display())));
            }
        }

        let insert = |values: BTreeMap<String, ManagedValue>| {
            let key = self.inner.next_key.fetch_add(1, Ordering::SeqCst) + 1;
            let record = Record::new(key, class, owner, values, Utc::now());
            self.inner.records.insert(key, record);
            key
        };

        let key = match unique {
            // The index entry stays locked until the record is in place
            Some((unique, display)) => match self.inner.primary_keys.entry((class.to_string(), unique)) {
                Entry::Occupied(_) => {
                    return Err(Error::DuplicatePrimaryKey {
                        class: class.to_string(),
                        value: display,
                    })
                }
                Entry::Vacant(entry) => {
                    let key = insert(values);
                    entry.insert(key);
                    key
                }
            },
            None => insert(values),
        };
        tracing::trace!(class, key, "created record");
        Ok(key)
    }

    fn read(&self, object: ObjectKey, column: &str) -> Result<ManagedValue> {
        let record = self
            .inner
            .records
            .get(&object)
            .ok_or(Error::ObjectNotFound(object))?;
        if record.deleted {
            return Err(Error::ObjectInvalidated(object));
        }
        record
            .get(column)
            .cloned()
            .ok_or_else(|| Error::UnknownProperty {
                class: record.class_name.clone(),
                property: column.to_string(),
            })
    }

    fn write(&self, object: ObjectKey, column: &str, value: ManagedValue) -> Result<()> {
        // Resolve the schema and check link targets before locking the record
        let schema = self
            .inner
            .records
            .get(&object)
            .and_then(|record| self.inner.schema(&record.class_name));
        let primary_key = schema.as_ref().and_then(|schema| {
            schema
                .primary_key_property()
                .filter(|p| p.column_name == column)
                .map(|p| p.name.clone())
        });
        if let Some(schema) = &schema {
            self.inner.check_links(schema, column, &value)?;
        }

        let old = {
            let mut record = self
                .inner
                .records
                .get_mut(&object)
                .ok_or(Error::ObjectNotFound(object))?;
            if record.deleted {
                return Err(Error::ObjectInvalidated(object));
            }
            let Some(current) = record.get(column) else {
                return Err(Error::UnknownProperty {
                    class: record.class_name.clone(),
                    property: column.to_string(),
                });
            };
            if let Some(property) = primary_key {
                if *current != value {
                    return Err(Error::ImmutablePrimaryKey {
                        class: record.class_name.clone(),
                        property,
                    });
                }
            }
            record.set_value(column, value.clone(), Utc::now())
        };

        self.inner.notify(
            object,
            &ObjectChange::Change(vec![PropertyChange {
                name: column.to_string(),
                old_value: old,
                new_value: Some(value),
            }]),
        );
        Ok(())
    }

    fn delete(&self, object: ObjectKey) -> Result<()> {
        let (class, unique) = {
            let mut record = self
                .inner
                .records
                .get_mut(&object)
                .ok_or(Error::ObjectNotFound(object))?;
            if record.deleted {
                return Err(Error::ObjectInvalidated(object));
            }
            record.mark_deleted(Utc::now());
            let unique = self
                .inner
                .schema(&record.class_name)
                .and_then(|schema| Inner::primary_key_of(&schema, &record));
            (record.class_name.clone(), unique)
        };
        if let Some(unique) = unique {
            self.inner
                .primary_keys
                .remove_if(&(class, unique), |_, key| *key == object);
        }

        self.inner.notify(object, &ObjectChange::Deleted);
        self.inner.observers.remove(&object);
        tracing::trace!(key = object, "tombstoned record");

        for (key, changes) in self.inner.unlink(object) {
            tracing::trace!(key, target = object, "dropped links to deleted record");
            self.inner.notify(key, &ObjectChange::Change(changes));
        }
        Ok(())
    }

    fn is_live(&self, object: ObjectKey) -> bool {
        self.inner
            .records
            .get(&object)
            .is_some_and(|r| r.is_active())
    }

    fn class_of(&self, object: ObjectKey) -> Option<ClassName> {
        self.inner.live_class(object)
    }

    fn objects(&self, class: &str) -> Vec<ObjectKey> {
        self.live_keys(|r| r.class_name == class)
    }

    fn owned_by(&self, owner: ObjectKey) -> Vec<ObjectKey> {
        self.live_keys(|r| r.owner == Some(owner))
    }

    fn find(&self, class: &str, column: &str, value: &ManagedValue) -> Option<ObjectKey> {
        let indexed = self.inner.schema(class).is_some_and(|schema| {
            schema
                .primary_key_property()
                .is_some_and(|p| p.column_name == column)
        });
        if let (true, Some(unique)) = (indexed, UniqueValue::of(value)) {
            return self
                .inner
                .primary_keys
                .get(&(class.to_string(), unique))
                .map(|key| *key)
                .filter(|key| self.is_live(*key));
        }
        self.live_keys(|r| r.class_name == class && r.get(column) == Some(value))
            .into_iter()
            .next()
    }

    fn backlinks(&self, class: &str, property: &str, target: ObjectKey) -> Vec<ObjectKey> {
        let column = self
            .inner
            .schema(class)
            .and_then(|schema| schema.property(property).map(|p| p.column_name.clone()))
            .unwrap_or_else(|| property.to_string());
        self.live_keys(|r| {
            r.class_name == class
                && r.get(&column).is_some_and(|value| value.links().contains(&target))
        })
    }

    fn observe(&self, object: ObjectKey, callback: ChangeCallback) -> Result<NotificationToken> {
        if !self.inner.records.contains_key(&object) {
            return Err(Error::ObjectNotFound(object));
        }
        if !self.is_live(object) {
            return Err(Error::ObjectInvalidated(object));
        }

        let id = self.inner.next_token.fetch_add(1, Ordering::SeqCst);
        self.inner
            .observers
            .entry(object)
            .or_default()
            .push(Observer { id, callback });

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        Ok(NotificationToken::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.unobserve(object, id);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CollectionKind, Property, PropertyType};
    use std::sync::Mutex;
    use std::thread;

    fn values(name: &str) -> BTreeMap<String, ManagedValue> {
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), ManagedValue::from(name));
        values
    }

    fn recorder() -> (ChangeCallback, Arc<Mutex<Vec<ObjectChange>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ChangeCallback = Arc::new(move |change: &ObjectChange| {
            sink.lock().unwrap().push(change.clone());
        });
        (callback, seen)
    }

    fn dog_schema() -> Arc<ObjectSchema> {
        Arc::new(ObjectSchema::new(
            "Dog",
            vec![
                Property::new("name", PropertyType::String).primary(),
                Property::link("friend", "Dog", false).with_optional(true),
                Property::link("pack", "Dog", false).with_collection(CollectionKind::List),
            ],
        ))
    }

    fn dog(name: &str, friend: Option<ObjectKey>, pack: &[ObjectKey]) -> BTreeMap<String, ManagedValue> {
        let mut values = values(name);
        values.insert(
            "friend".to_string(),
            friend.map_or(ManagedValue::Null, ManagedValue::Link),
        );
        values.insert(
            "pack".to_string(),
            ManagedValue::List(pack.iter().copied().map(ManagedValue::Link).collect()),
        );
        values
    }

    fn registered() -> MemoryStore {
        let store = MemoryStore::new();
        store.register_schema(dog_schema()).unwrap();
        store
    }

    #[test]
    fn create_and_read() {
        let store = MemoryStore::new();
        let key = store.create("Dog", None, values("Rex")).unwrap();

        assert_eq!(store.read(key, "name").unwrap(), ManagedValue::from("Rex"));
        assert_eq!(store.class_of(key).as_deref(), Some("Dog"));
        assert!(store.is_live(key));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn keys_are_unique_and_ordered() {
        let store = MemoryStore::new();
        let a = store.create("Dog", None, values("a")).unwrap();
        let b = store.create("Dog", None, values("b")).unwrap();
        let _ = store.create("Cat", None, values("c")).unwrap();

        assert!(b > a);
        assert_eq!(store.objects("Dog"), vec![a, b]);
    }

    #[test]
    fn write_unknown_column() {
        let store = MemoryStore::new();
        let key = store.create("Dog", None, values("Rex")).unwrap();
        let result = store.write(key, "tail", ManagedValue::Int(1));
        assert!(matches!(result, Err(Error::UnknownProperty { .. })));
    }

    #[test]
    fn missing_object() {
        let store = MemoryStore::new();
        assert!(matches!(store.read(42, "name"), Err(Error::ObjectNotFound(42))));
        assert!(!store.is_live(42));
    }

    #[test]
    fn delete_tombstones() {
        let store = MemoryStore::new();
        let key = store.create("Dog", None, values("Rex")).unwrap();
        store.delete(key).unwrap();

        assert!(!store.is_live(key));
        assert!(store.class_of(key).is_none());
        assert!(matches!(store.read(key, "name"), Err(Error::ObjectInvalidated(_))));
        assert!(matches!(store.delete(key), Err(Error::ObjectInvalidated(_))));
        assert!(store.record(key).unwrap().deleted);
        assert!(store.objects("Dog").is_empty());
    }

    #[test]
    fn find_by_value() {
        let store = MemoryStore::new();
        let _ = store.create("Dog", None, values("Rex")).unwrap();
        let max = store.create("Dog", None, values("Max")).unwrap();

        assert_eq!(store.find("Dog", "name", &ManagedValue::from("Max")), Some(max));
        assert_eq!(store.find("Cat", "name", &ManagedValue::from("Max")), None);

        store.delete(max).unwrap();
        assert_eq!(store.find("Dog", "name", &ManagedValue::from("Max")), None);
    }

    #[test]
    fn owned_records() {
        let store = MemoryStore::new();
        let owner = store.create("Person", None, values("Ann")).unwrap();
        let child = store.create("Address", Some(owner), values("Main St")).unwrap();
        let _ = store.create("Address", None, values("Elm St")).unwrap();

        assert_eq!(store.owned_by(owner), vec![child]);
    }

    #[test]
    fn observers_see_old_and_new_values() {
        let store = MemoryStore::new();
        let key = store.create("Dog", None, values("Rex")).unwrap();
        let (callback, seen) = recorder();
        let _token = store.observe(key, callback).unwrap();

        store.write(key, "name", ManagedValue::from("Max")).unwrap();
        store.delete(key).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[0],
            ObjectChange::Change(vec![PropertyChange {
                name: "name".into(),
                old_value: Some(ManagedValue::from("Rex")),
                new_value: Some(ManagedValue::from("Max")),
            }])
        );
        assert_eq!(seen[1], ObjectChange::Deleted);
    }

    #[test]
    fn dropped_token_stops_notifications() {
        let store = MemoryStore::new();
        let key = store.create("Dog", None, values("Rex")).unwrap();
        let (callback, seen) = recorder();
        let token = store.observe(key, callback).unwrap();
        drop(token);

        store.write(key, "name", ManagedValue::from("Max")).unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn callback_may_read_store() {
        let store = MemoryStore::new();
        let key = store.create("Dog", None, values("Rex")).unwrap();
        let reader = store.clone();
        let (callback, seen) = recorder();
        let inner = Arc::clone(&callback);
        let callback: ChangeCallback = Arc::new(move |change: &ObjectChange| {
            if matches!(change, ObjectChange::Change(_)) {
                assert_eq!(reader.read(key, "name").unwrap(), ManagedValue::from("Max"));
            }
            inner(change);
        });
        let _token = store.observe(key, callback).unwrap();

        store.write(key, "name", ManagedValue::from("Max")).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn cannot_observe_deleted() {
        let store = MemoryStore::new();
        let key = store.create("Dog", None, values("Rex")).unwrap();
        store.delete(key).unwrap();
        let (callback, _) = recorder();
        assert!(matches!(
            store.observe(key, callback),
            Err(Error::ObjectInvalidated(_))
        ));
    }

    #[test]
    fn registered_primary_keys_are_unique() {
        let store = registered();
        let rex = store.create("Dog", None, dog("Rex", None, &[])).unwrap();
        assert_eq!(
            store.create("Dog", None, dog("Rex", None, &[])).unwrap_err(),
            Error::DuplicatePrimaryKey {
                class: "Dog".into(),
                value: "'Rex'".into(),
            }
        );
        assert_eq!(store.objects("Dog"), vec![rex]);
        assert_eq!(store.find("Dog", "name", &ManagedValue::from("Rex")), Some(rex));

        store.delete(rex).unwrap();
        assert_eq!(store.find("Dog", "name", &ManagedValue::from("Rex")), None);
        let again = store.create("Dog", None, dog("Rex", None, &[])).unwrap();
        assert_eq!(store.find("Dog", "name", &ManagedValue::from("Rex")), Some(again));
    }

    #[test]
    fn primary_key_cannot_change() {
        let store = registered();
        let _ = store.create("Dog", None, dog("Rex", None, &[])).unwrap();
        let max = store.create("Dog", None, dog("Max", None, &[])).unwrap();

        assert_eq!(
            store.write(max, "name", ManagedValue::from("Rex")).unwrap_err(),
            Error::ImmutablePrimaryKey {
                class: "Dog".into(),
                property: "name".into(),
            }
        );
        assert_eq!(
            store.write(max, "name", ManagedValue::from("Fido")).unwrap_err(),
            Error::ImmutablePrimaryKey {
                class: "Dog".into(),
                property: "name".into(),
            }
        );
        store.write(max, "name", ManagedValue::from("Max")).unwrap();
        assert_eq!(store.read(max, "name").unwrap(), ManagedValue::from("Max"));
    }

    #[test]
    fn unregistered_classes_are_unchecked() {
        let store = MemoryStore::new();
        let a = store.create("Dog", None, dog("Rex", Some(999), &[])).unwrap();
        let b = store.create("Dog", None, dog("Rex", None, &[])).unwrap();
        store.write(b, "name", ManagedValue::from("Max")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn links_are_checked_on_create_and_write() {
        let store = registered();
        let invalid = Error::InvalidLink {
            class: "Dog".into(),
            property: "friend".into(),
            target: "Dog".into(),
        };
        assert_eq!(
            store.create("Dog", None, dog("Rex", Some(999), &[])).unwrap_err(),
            invalid
        );

        let rex = store.create("Dog", None, dog("Rex", None, &[])).unwrap();
        let cat = store.create("Cat", None, values("Tom")).unwrap();
        assert_eq!(
            store.write(rex, "friend", ManagedValue::Link(999)).unwrap_err(),
            invalid
        );
        assert_eq!(
            store.write(rex, "friend", ManagedValue::Link(cat)).unwrap_err(),
            invalid
        );
        assert!(matches!(
            store.write(rex, "pack", ManagedValue::List(vec![ManagedValue::Link(cat)])),
            Err(Error::InvalidLink { .. })
        ));
        assert_eq!(store.read(rex, "friend").unwrap(), ManagedValue::Null);

        let max = store.create("Dog", None, dog("Max", None, &[])).unwrap();
        store.write(rex, "friend", ManagedValue::Link(max)).unwrap();
        store.write(rex, "friend", ManagedValue::Link(rex)).unwrap();
    }

    #[test]
    fn concurrent_creates_claim_one_primary_key() {
        let store = registered();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || store.create("Dog", None, dog("Rex", None, &[])))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, Error::DuplicatePrimaryKey { .. })));
        assert_eq!(store.objects("Dog").len(), 1);
    }

    #[test]
    fn delete_drops_links_to_the_deleted_object() {
        let store = registered();
        let max = store.create("Dog", None, dog("Max", None, &[])).unwrap();
        let fido = store.create("Dog", None, dog("Fido", None, &[])).unwrap();
        let rex = store
            .create("Dog", None, dog("Rex", Some(max), &[max, fido, max]))
            .unwrap();
        let (callback, seen) = recorder();
        let _token = store.observe(rex, callback).unwrap();

        store.delete(max).unwrap();

        assert_eq!(store.read(rex, "friend").unwrap(), ManagedValue::Null);
        assert_eq!(
            store.read(rex, "pack").unwrap(),
            ManagedValue::List(vec![ManagedValue::Link(fido)])
        );
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        match &seen[0] {
            ObjectChange::Change(changes) => {
                let names: Vec<_> = changes.iter().map(|c| c.name.as_str()).collect();
                assert_eq!(names, vec!["friend", "pack"]);
                assert_eq!(changes[0].old_value, Some(ManagedValue::Link(max)));
                assert_eq!(changes[0].new_value, Some(ManagedValue::Null));
            }
            other => panic!("unexpected change {other:?}"),
        }
    }

    #[test]
    fn backlinks_follow_the_origin_column() {
        let store = registered();
        let max = store.create("Dog", None, dog("Max", None, &[])).unwrap();
        let rex = store.create("Dog", None, dog("Rex", Some(max), &[])).unwrap();
        let fido = store.create("Dog", None, dog("Fido", None, &[max, max])).unwrap();

        assert_eq!(store.backlinks("Dog", "friend", max), vec![rex]);
        assert_eq!(store.backlinks("Dog", "pack", max), vec![fido]);
        assert!(store.backlinks("Dog", "friend", rex).is_empty());

        store.delete(rex).unwrap();
        assert!(store.backlinks("Dog", "friend", max).is_empty());
    }

    #[test]
    fn conflicting_schema_registration() {
        let store = registered();
        store.register_schema(dog_schema()).unwrap();
        let other = Arc::new(ObjectSchema::new(
            "Dog",
            vec![Property::new("name", PropertyType::String)],
        ));
        assert_eq!(
            store.register_schema(other).unwrap_err(),
            Error::SchemaMismatch("Dog".into())
        );
    }

    #[test]
    fn registration_indexes_imported_records() {
        let store = MemoryStore::new();
        let rex = store.create("Dog", None, dog("Rex", None, &[])).unwrap();
        let restored = MemoryStore::import(store.export());
        restored.register_schema(dog_schema()).unwrap();

        assert_eq!(restored.find("Dog", "name", &ManagedValue::from("Rex")), Some(rex));
        assert!(matches!(
            restored.create("Dog", None, dog("Rex", None, &[])),
            Err(Error::DuplicatePrimaryKey { .. })
        ));
    }

    #[test]
    fn export_import_roundtrip() {
        let store = MemoryStore::new();
        let a = store.create("Dog", None, values("Rex")).unwrap();
        let b = store.create("Dog", None, values("Max")).unwrap();
        store.delete(a).unwrap();

        let json = store.export_json().unwrap();
        let restored = MemoryStore::import_json(&json).unwrap();

        assert_eq!(restored.export(), store.export());
        assert_eq!(restored.objects("Dog"), vec![b]);
        let c = restored.create("Dog", None, values("Fido")).unwrap();
        assert!(c > b);
    }
}
