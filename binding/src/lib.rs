//! # Tessel
//!
//! Typed object models over a pluggable object store.
//!
//! A model type declares its stored fields with managed wrappers. Tessel
//! derives a schema from the declaration once per type, validates it, and
//! routes every field read and write either to the value held in the field
//! (before the object is stored) or to the storage engine (after).
//!
//! ## Core Concepts
//!
//! ### Model types
//!
//! Fields wrapped in [`Persisted<T>`], [`List<T>`], [`MutableSet<T>`] or
//! [`Map<T>`] are managed. Other fields are ignored. `#[derive(Object)]`
//! implements [`ObjectType`], which reports the declared fields and exposes
//! their accessors. [`LinkingObjects<T>`] fields are computed backlinks, and
//! `#[derive(Enum)]` lets fieldless enums be stored as ints.
//!
//! ### Schema derivation
//!
//! Derivation runs in four stages:
//! - reflect: drop ignored and computed fields, reject lazy fields
//! - classify: map each field type to a [`PropertyType`], optionality and
//!   [`CollectionKind`]
//! - validate: link optionality, primary-key and index rules
//! - cache: the resulting [`ObjectSchema`] is shared for the process
//!
//! A definition error is a programming mistake. [`try_schema_of`] returns it;
//! [`schema_of`] panics with a message naming the type, property and rule.
//!
//! ### Storage
//!
//! A [`Database`] stores objects in any [`Storage`] implementation.
//! [`MemoryStore`] is the in-process engine. Objects read back from a
//! database are managed: their fields read and write the stored row.
//!
//! ## Quick Start
//!
//! ```rust
//! use tessel::{Database, List, Link, Object, Persisted};
//!
//! #[derive(Default, Object)]
//! struct Person {
//!     #[tessel(primary_key)]
//!     name: Persisted<String>,
//!     dogs: List<Link<Dog>>,
//! }
//!
//! #[derive(Default, Object)]
//! struct Dog {
//!     #[tessel(indexed)]
//!     name: Persisted<String>,
//!     age: Persisted<Option<i32>>,
//! }
//!
//! let db = Database::in_memory();
//!
//! let mut rex = Dog::default();
//! rex.name.set("Rex".into()).unwrap();
//! let rex_key = db.add(&mut rex).unwrap();
//!
//! let mut ann = Person::default();
//! ann.name.set("Ann".into()).unwrap();
//! ann.dogs.push(Link::new(rex_key)).unwrap();
//! db.add(&mut ann).unwrap();
//!
//! // Managed fields write through to storage
//! rex.age.set(Some(3)).unwrap();
//!
//! let found: Person = db.object_for_primary_key("Ann").unwrap().unwrap();
//! let dog = db.resolve(found.dogs.get(0).unwrap().unwrap()).unwrap();
//! assert_eq!(dog.age.get().unwrap(), Some(3));
//! ```
//!
//! ## Configuration
//!
//! Call [`init`] once with a [`Config`] (usually [`Config::from_env`]) to
//! install logging and choose name strictness. Without it, defaults apply.

extern crate self as tessel;

pub mod accessor;
pub mod binder;
pub mod classify;
pub mod collection;
pub mod config;
pub mod database;
pub mod dynamic;
pub mod error;
pub mod linking;
pub mod managed;
pub mod notify;
pub mod object;
pub mod object_id;
pub mod property;
pub mod record;
pub mod reflect;
pub mod registry;
pub mod schema;
pub mod store;
pub mod validate;
pub mod value;

// Re-export main types at crate root
pub use accessor::{Accessor, Persisted, Slot};
pub use binder::{bind_object, get_value, set_value};
pub use classify::{classify, Classification};
pub use collection::{List, Map, MutableSet};
pub use config::{init, Config, ConfigError};
pub use database::Database;
pub use dynamic::DynamicObject;
pub use error::Error;
pub use linking::{LinkOrigin, LinkingObjects};
pub use managed::{Link, Managed, ManagedEnum, Reflect, TypeShape};
pub use notify::{ChangeCallback, NotificationToken, ObjectChange, PropertyChange};
pub use object::ObjectType;
pub use object_id::ObjectId;
pub use property::{CollectionKind, Property, PropertyType};
pub use record::{Metadata, Record};
pub use reflect::{FieldInfo, FieldKind};
pub use registry::{schema_of, try_schema_of, SchemaRegistry};
pub use schema::{ObjectSchema, Schema, SchemaBuilder};
pub use store::{MemoryStore, Storage};
pub use value::{AnyValue, ManagedValue};

#[cfg(feature = "derive")]
pub use tessel_derive::{Enum, Object};

/// Type aliases for clarity
pub type ClassName = String;
pub type PropertyName = String;
pub type ObjectKey = u64;
pub type Version = u64;
