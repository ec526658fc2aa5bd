//! Database facade.
//!
//! [`Database`] ties derived schemas to a storage engine: it validates and
//! stores objects, binds their fields, and hands out managed instances.

use crate::{
    binder,
    error::Result,
    notify::ChangeCallback,
    registry::SchemaRegistry,
    validate::validate_linking_objects,
    ClassName, DynamicObject, Error, Link, ManagedValue, MemoryStore, NotificationToken,
    ObjectChange, ObjectKey, ObjectSchema, ObjectType, Property, PropertyChange, Schema, Slot,
    Storage,
};
use dashmap::DashMap;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Handle to a set of stored objects.
///
/// Cloning is cheap; clones share storage and registered classes.
#[derive(Clone)]
pub struct Database {
    storage: Arc<dyn Storage>,
    classes: Arc<DashMap<ClassName, Arc<ObjectSchema>>>,
}

impl Database {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            classes: Arc::new(DashMap::new()),
        }
    }

    /// A database backed by a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Derive (or fetch the cached) schema of `T` and register its class.
    pub fn register<T: ObjectType>(&self) -> Result<Arc<ObjectSchema>> {
        let schema = SchemaRegistry::global().try_schema::<T>()?;
        self.register_class(schema)
    }

    /// Register a runtime-defined class.
    ///
    /// Registering an identical schema again is a no-op.
    pub fn register_dynamic(&self, schema: ObjectSchema) -> Result<Arc<ObjectSchema>> {
        let schema = self.register_class(Arc::new(schema))?;
        tracing::debug!(class = %schema.class_name, "registered dynamic class");
        Ok(schema)
    }

    fn register_class(&self, schema: Arc<ObjectSchema>) -> Result<Arc<ObjectSchema>> {
        if let Some(registered) = self.classes.get(&schema.class_name) {
            if **registered.value() != *schema {
                return Err(Error::SchemaMismatch(schema.class_name.clone()));
            }
            return Ok(Arc::clone(registered.value()));
        }

        self.check_linking_objects(&schema)?;
        self.storage.register_schema(Arc::clone(&schema))?;
        let registered = self
            .classes
            .entry(schema.class_name.clone())
            .or_insert_with(|| Arc::clone(&schema))
            .clone();
        if registered != schema {
            return Err(Error::SchemaMismatch(schema.class_name.clone()));
        }
        Ok(registered)
    }

    /// Check linking objects properties between `schema` and the classes
    /// already registered, in both directions.
    fn check_linking_objects(&self, schema: &Arc<ObjectSchema>) -> Result<()> {
        let backlinks = |owner: &ObjectSchema| -> Vec<Property> {
            owner
                .properties
                .iter()
                .filter(|p| !p.is_stored())
                .cloned()
                .collect()
        };

        for property in backlinks(schema) {
            let origin = match property.object_class_name.as_deref() {
                Some(class) if class == schema.class_name => Some(Arc::clone(schema)),
                Some(class) => self.classes.get(class).map(|s| Arc::clone(s.value())),
                None => None,
            };
            if let Some(origin) = origin {
                validate_linking_objects(schema, &property, &origin)?;
            }
        }

        let owners: Vec<Arc<ObjectSchema>> =
            self.classes.iter().map(|entry| Arc::clone(entry.value())).collect();
        for owner in owners {
            for property in backlinks(&owner) {
                if property.object_class_name.as_deref() == Some(schema.class_name.as_str()) {
                    validate_linking_objects(&owner, &property, schema)?;
                }
            }
        }
        Ok(())
    }

    /// Registered schema of `class`.
    pub fn class(&self, class: &str) -> Result<Arc<ObjectSchema>> {
        self.classes
            .get(class)
            .map(|schema| Arc::clone(schema.value()))
            .ok_or_else(|| Error::SchemaNotRegistered(class.to_string()))
    }

    /// Snapshot of every registered class.
    pub fn schema(&self) -> Schema {
        self.classes
            .iter()
            .fold(Schema::new(), |schema, entry| schema.with_class(Arc::clone(entry.value())))
    }

    /// Store a top-level object and bind its fields.
    pub fn add<T: ObjectType>(&self, object: &mut T) -> Result<ObjectKey> {
        let schema = self.register::<T>()?;
        if schema.embedded {
            return Err(Error::EmbeddedWithoutOwner(schema.class_name.clone()));
        }
        self.insert(object, &schema, None)
    }

    /// Store an embedded object owned by `owner`.
    pub fn embed<T: ObjectType>(&self, object: &mut T, owner: ObjectKey) -> Result<Link<T>> {
        let schema = self.register::<T>()?;
        if !schema.embedded {
            return Err(Error::NotEmbedded(schema.class_name.clone()));
        }
        if !self.storage.is_live(owner) {
            return Err(Error::ObjectNotFound(owner));
        }
        self.insert(object, &schema, Some(owner)).map(Link::new)
    }

    /// Link targets and primary-key uniqueness are enforced by the storage
    /// engine, atomically with the insert.
    fn insert<T: ObjectType>(
        &self,
        object: &mut T,
        schema: &ObjectSchema,
        owner: Option<ObjectKey>,
    ) -> Result<ObjectKey> {
        let key = binder::bind_object(object, schema, &self.storage, owner)?;
        tracing::debug!(class = %schema.class_name, key, owner = ?owner, "added object");
        Ok(key)
    }

    fn materialize<T: ObjectType>(&self, schema: &ObjectSchema, key: ObjectKey) -> Result<T> {
        let mut object = T::default();
        binder::attach(&mut object, schema, &self.storage, key)?;
        Ok(object)
    }

    /// Managed instance of stored object `key`.
    pub fn get<T: ObjectType>(&self, key: ObjectKey) -> Result<T> {
        let schema = self.register::<T>()?;
        match self.storage.class_of(key) {
            Some(class) if class == schema.class_name => self.materialize(&schema, key),
            _ => Err(Error::ObjectNotFound(key)),
        }
    }

    /// Resolve a link.
    pub fn resolve<T: ObjectType>(&self, link: Link<T>) -> Result<T> {
        self.get(link.key())
    }

    /// Every live object of `T`, in creation order.
    pub fn objects<T: ObjectType>(&self) -> Result<Vec<T>> {
        let schema = self.register::<T>()?;
        self.storage
            .objects(&schema.class_name)
            .into_iter()
            .map(|key| self.materialize(&schema, key))
            .collect()
    }

    /// Object of `T` whose primary key equals `value`.
    pub fn object_for_primary_key<T: ObjectType>(
        &self,
        value: impl Into<ManagedValue>,
    ) -> Result<Option<T>> {
        let schema = self.register::<T>()?;
        let property = schema
            .primary_key_property()
            .ok_or_else(|| Error::NoPrimaryKey(schema.class_name.clone()))?;
        let value = value.into();
        self.storage
            .find(&schema.class_name, &property.column_name, &value)
            .map(|key| self.materialize(&schema, key))
            .transpose()
    }

    /// Delete a managed object and every embedded object it owns.
    ///
    /// Links to a deleted object held by other live objects are dropped: a
    /// single link becomes `None`, and the object is removed from lists,
    /// sets and maps. Observers of those objects see the change.
    pub fn delete<T: ObjectType>(&self, object: &T) -> Result<()> {
        let key = object
            .object_key()
            .ok_or_else(|| Error::NotManaged(T::CLASS_NAME.to_string()))?;
        self.delete_key(key)
    }

    /// Delete stored object `key` and its embedded objects.
    pub fn delete_key(&self, key: ObjectKey) -> Result<()> {
        let children = self.storage.owned_by(key);
        // The owner goes first so its links to the children are not rewritten
        self.storage.delete(key)?;
        for child in children {
            self.delete_key(child)?;
        }
        tracing::debug!(key, "deleted object");
        Ok(())
    }

    /// Whether `a` and `b` are the same live object of this database.
    ///
    /// Unmanaged objects are only the same object as themselves.
    pub fn is_same_object<A: ObjectType, B: ObjectType>(&self, a: &A, b: &B) -> bool {
        if TypeId::of::<A>() == TypeId::of::<B>()
            && std::ptr::eq(a as *const A as *const (), b as *const B as *const ())
        {
            return true;
        }
        let (Some(left), Some(right)) = (a.object_slot(), b.object_slot()) else {
            return false;
        };
        let ours = |slot: &Slot| {
            Arc::as_ptr(slot.storage()) as *const () == Arc::as_ptr(&self.storage) as *const ()
        };
        A::CLASS_NAME == B::CLASS_NAME
            && left.object() == right.object()
            && ours(left)
            && ours(right)
            && self.storage.is_live(left.object())
    }

    /// Whether a managed object's stored row is gone. Unmanaged objects are
    /// never invalidated.
    pub fn is_invalidated<T: ObjectType>(&self, object: &T) -> bool {
        object
            .object_key()
            .is_some_and(|key| !self.storage.is_live(key))
    }

    /// Observe changes to a managed object.
    ///
    /// Property changes are reported by declared property name.
    pub fn observe<T: ObjectType>(
        &self,
        object: &T,
        callback: impl Fn(&ObjectChange) + Send + Sync + 'static,
    ) -> Result<NotificationToken> {
        let schema = self.register::<T>()?;
        let key = object
            .object_key()
            .ok_or_else(|| Error::NotManaged(schema.class_name.clone()))?;
        self.observe_key(&schema, key, callback)
    }

    fn observe_key(
        &self,
        schema: &ObjectSchema,
        key: ObjectKey,
        callback: impl Fn(&ObjectChange) + Send + Sync + 'static,
    ) -> Result<NotificationToken> {
        let names: HashMap<String, String> = schema
            .properties
            .iter()
            .map(|p| (p.column_name.clone(), p.name.clone()))
            .collect();

        let wrapped: ChangeCallback = Arc::new(move |change: &ObjectChange| match change {
            ObjectChange::Change(changes) => {
                let renamed = changes
                    .iter()
                    .map(|c| PropertyChange {
                        name: names.get(&c.name).cloned().unwrap_or_else(|| c.name.clone()),
                        ..c.clone()
                    })
                    .collect();
                callback(&ObjectChange::Change(renamed));
            }
            ObjectChange::Deleted => callback(change),
        });

        let token = self.storage.observe(key, wrapped)?;
        tracing::trace!(class = %schema.class_name, key, "observing object");
        Ok(token)
    }

    /// Store a dynamic object of a registered class.
    pub fn add_dynamic(&self, object: &mut DynamicObject) -> Result<ObjectKey> {
        let schema = self.class(object.class_name())?;
        if schema.embedded {
            return Err(Error::EmbeddedWithoutOwner(schema.class_name.clone()));
        }
        if object.is_managed() {
            return Err(Error::AlreadyManaged(schema.class_name.clone()));
        }
        let values = object.column_values()?;
        let key = self.storage.create(&schema.class_name, None, values)?;
        object.attach(Arc::clone(&self.storage), key);
        tracing::debug!(class = %schema.class_name, key, "added dynamic object");
        Ok(key)
    }

    /// Managed dynamic view of stored object `key`.
    pub fn dynamic_object(&self, class: &str, key: ObjectKey) -> Result<DynamicObject> {
        let schema = self.class(class)?;
        match self.storage.class_of(key) {
            Some(stored) if stored == schema.class_name => {
                let mut object = DynamicObject::new(schema);
                object.attach(Arc::clone(&self.storage), key);
                Ok(object)
            }
            _ => Err(Error::ObjectNotFound(key)),
        }
    }

    /// Every live object of `class` as dynamic objects.
    pub fn dynamic_objects(&self, class: &str) -> Result<Vec<DynamicObject>> {
        let schema = self.class(class)?;
        Ok(self
            .storage
            .objects(&schema.class_name)
            .into_iter()
            .map(|key| {
                let mut object = DynamicObject::new(Arc::clone(&schema));
                object.attach(Arc::clone(&self.storage), key);
                object
            })
            .collect())
    }

    /// Observe a dynamic object.
    pub fn observe_dynamic(
        &self,
        object: &DynamicObject,
        callback: impl Fn(&ObjectChange) + Send + Sync + 'static,
    ) -> Result<NotificationToken> {
        let key = object
            .object_key()
            .ok_or_else(|| Error::NotManaged(object.class_name().to_string()))?;
        self.observe_key(object.schema(), key, callback)
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("classes", &self.classes.len())
            .finish()
    }
}
