//! Process-wide schema cache.

use crate::{
    error::{fatal, Result},
    ObjectSchema, ObjectType,
};
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

type Cell = Arc<Mutex<Option<Arc<ObjectSchema>>>>;

/// Derived schemas keyed by model type.
///
/// Each type is derived at most once. Derivation runs under a lock private
/// to that type, never under a map shard lock, so a model's `Default` may
/// itself look up the schema of another type. Concurrent first lookups of
/// the same type wait for the first derivation and share its schema.
/// Failed derivations are not cached.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: DashMap<TypeId, Cell>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process.
    pub fn global() -> &'static SchemaRegistry {
        static GLOBAL: OnceLock<SchemaRegistry> = OnceLock::new();
        GLOBAL.get_or_init(SchemaRegistry::new)
    }

    fn cell(&self, type_id: TypeId) -> Cell {
        if let Some(cell) = self.schemas.get(&type_id) {
            return Arc::clone(cell.value());
        }
        Arc::clone(self.schemas.entry(type_id).or_default().value())
    }

    /// Schema of `T`, deriving it on first use.
    pub fn try_schema<T: ObjectType>(&self) -> Result<Arc<ObjectSchema>> {
        let cell = self.cell(TypeId::of::<T>());
        // A panicking derivation leaves the cell empty, so the lock is still usable
        let mut slot = cell.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(schema) = slot.as_ref() {
            return Ok(Arc::clone(schema));
        }
        let schema = Arc::new(ObjectSchema::derive_for::<T>()?);
        tracing::debug!(class = T::CLASS_NAME, "cached object schema");
        *slot = Some(Arc::clone(&schema));
        Ok(schema)
    }

    fn derived(cell: &Cell) -> bool {
        cell.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Schema of `T`. A definition error is fatal.
    #[track_caller]
    pub fn schema<T: ObjectType>(&self) -> Arc<ObjectSchema> {
        self.try_schema::<T>().unwrap_or_else(|err| fatal(&err))
    }

    /// Whether `T` has been derived.
    pub fn contains<T: ObjectType>(&self) -> bool {
        let cell = self
            .schemas
            .get(&TypeId::of::<T>())
            .map(|cell| Arc::clone(cell.value()));
        cell.is_some_and(|cell| Self::derived(&cell))
    }

    /// Number of derived schemas.
    pub fn len(&self) -> usize {
        // Cells are locked only after the shard guards are released
        let cells: Vec<Cell> = self
            .schemas
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        cells.iter().filter(|cell| Self::derived(cell)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Schema of `T` from the global registry.
///
/// # Panics
///
/// Panics with a diagnostic naming the type, property and violated rule if
/// `T` is not a valid model definition.
#[track_caller]
pub fn schema_of<T: ObjectType>() -> Arc<ObjectSchema> {
    SchemaRegistry::global().schema::<T>()
}

/// Schema of `T` from the global registry, returning definition errors.
pub fn try_schema_of<T: ObjectType>() -> Result<Arc<ObjectSchema>> {
    SchemaRegistry::global().try_schema::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Accessor, Error, FieldInfo, Persisted};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    static DERIVATIONS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    struct Counter {
        value: Persisted<i64>,
    }

    impl ObjectType for Counter {
        const CLASS_NAME: &'static str = "Counter";

        fn reflect(&self) -> Vec<FieldInfo> {
            DERIVATIONS.fetch_add(1, Ordering::SeqCst);
            vec![FieldInfo::managed::<Persisted<i64>>("value")]
        }

        fn accessors(&self) -> Vec<(&'static str, &dyn Accessor)> {
            vec![("value", &self.value as &dyn Accessor)]
        }

        fn accessors_mut(&mut self) -> Vec<(&'static str, &mut dyn Accessor)> {
            vec![("value", &mut self.value as &mut dyn Accessor)]
        }
    }

    #[derive(Default)]
    struct Broken {
        weight: Persisted<f64>,
    }

    impl ObjectType for Broken {
        const CLASS_NAME: &'static str = "Broken";

        fn indexed_properties() -> &'static [&'static str] {
            &["weight"]
        }

        fn reflect(&self) -> Vec<FieldInfo> {
            vec![FieldInfo::managed::<Persisted<f64>>("weight")]
        }

        fn accessors(&self) -> Vec<(&'static str, &dyn Accessor)> {
            vec![("weight", &self.weight as &dyn Accessor)]
        }

        fn accessors_mut(&mut self) -> Vec<(&'static str, &mut dyn Accessor)> {
            vec![("weight", &mut self.weight as &mut dyn Accessor)]
        }
    }

    #[test]
    fn derives_once_under_contention() {
        let registry = Arc::new(SchemaRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.schema::<Counter>())
            })
            .collect();
        let schemas: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(DERIVATIONS.load(Ordering::SeqCst), 1);
        assert!(schemas.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert!(registry.contains::<Counter>());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let registry = SchemaRegistry::new();
        assert!(matches!(
            registry.try_schema::<Broken>(),
            Err(Error::InvalidIndex { .. })
        ));
        assert!(!registry.contains::<Broken>());
        assert!(registry.is_empty());
    }

    #[derive(Default)]
    struct Leaf {
        value: Persisted<i64>,
    }

    impl ObjectType for Leaf {
        const CLASS_NAME: &'static str = "Leaf";

        fn reflect(&self) -> Vec<FieldInfo> {
            vec![FieldInfo::managed::<Persisted<i64>>("value")]
        }

        fn accessors(&self) -> Vec<(&'static str, &dyn Accessor)> {
            vec![("value", &self.value as &dyn Accessor)]
        }

        fn accessors_mut(&mut self) -> Vec<(&'static str, &mut dyn Accessor)> {
            vec![("value", &mut self.value as &mut dyn Accessor)]
        }
    }

    /// Looks up another schema while being constructed.
    struct Eager {
        value: Persisted<i64>,
    }

    impl Default for Eager {
        fn default() -> Self {
            SchemaRegistry::global().schema::<Leaf>();
            Self {
                value: Persisted::default(),
            }
        }
    }

    impl ObjectType for Eager {
        const CLASS_NAME: &'static str = "Eager";

        fn reflect(&self) -> Vec<FieldInfo> {
            vec![FieldInfo::managed::<Persisted<i64>>("value")]
        }

        fn accessors(&self) -> Vec<(&'static str, &dyn Accessor)> {
            vec![("value", &self.value as &dyn Accessor)]
        }

        fn accessors_mut(&mut self) -> Vec<(&'static str, &mut dyn Accessor)> {
            vec![("value", &mut self.value as &mut dyn Accessor)]
        }
    }

    #[test]
    fn default_may_look_up_other_schemas() {
        let schema = SchemaRegistry::global().schema::<Eager>();
        assert_eq!(schema.class_name, "Eager");
        assert!(SchemaRegistry::global().contains::<Leaf>());
        assert!(SchemaRegistry::global().contains::<Eager>());
    }

    #[test]
    #[should_panic(expected = "invalid index on Broken.weight")]
    fn schema_is_fatal_on_definition_error() {
        SchemaRegistry::new().schema::<Broken>();
    }
}
