//! Rust types that can be stored in managed properties.
//!
//! Each supported type describes itself with a [`TypeShape`], which the
//! classifier turns into a [`Property`](crate::Property) descriptor, and
//! converts to and from [`ManagedValue`].

use crate::{
    error::Result, AnyValue, ClassName, CollectionKind, Error, ManagedValue, ObjectId, ObjectKey,
    ObjectType, PropertyName, PropertyType,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// Structural description of a field's declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeShape {
    /// A non-link scalar
    Scalar(PropertyType),
    /// A link to another model type
    Link { class_name: ClassName, embedded: bool },
    /// `Option<inner>`
    Optional(Box<TypeShape>),
    /// A list, set or map of `element`
    Collection(CollectionKind, Box<TypeShape>),
    /// Objects of `class_name` whose `property` links to the owner
    LinkingObjects {
        class_name: ClassName,
        property: PropertyName,
    },
    /// A type with no managed representation
    Unsupported,
}

impl TypeShape {
    pub fn optional(inner: TypeShape) -> Self {
        TypeShape::Optional(Box::new(inner))
    }

    pub fn list(element: TypeShape) -> Self {
        TypeShape::Collection(CollectionKind::List, Box::new(element))
    }

    pub fn set(element: TypeShape) -> Self {
        TypeShape::Collection(CollectionKind::Set, Box::new(element))
    }

    pub fn map(value: TypeShape) -> Self {
        TypeShape::Collection(CollectionKind::Map, Box::new(value))
    }

    pub fn link(class_name: impl Into<ClassName>, embedded: bool) -> Self {
        TypeShape::Link {
            class_name: class_name.into(),
            embedded,
        }
    }

    pub fn linking_objects(class_name: impl Into<ClassName>, property: impl Into<PropertyName>) -> Self {
        TypeShape::LinkingObjects {
            class_name: class_name.into(),
            property: property.into(),
        }
    }
}

/// Field wrappers whose declared type can be reflected into a shape.
pub trait Reflect {
    fn shape() -> TypeShape;
}

/// A value type that can back a managed property.
pub trait Managed: Clone + Sized + 'static {
    fn shape() -> TypeShape;

    fn to_value(&self) -> ManagedValue;

    fn from_value(value: ManagedValue) -> Result<Self>;
}

fn mismatch(expected: &str, got: &ManagedValue) -> Error {
    Error::ValueConversion {
        expected: expected.to_string(),
        got: got.type_name().to_string(),
    }
}

macro_rules! managed_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Managed for $ty {
                fn shape() -> TypeShape {
                    TypeShape::Scalar(PropertyType::Int)
                }

                fn to_value(&self) -> ManagedValue {
                    ManagedValue::Int(i64::from(*self))
                }

                fn from_value(value: ManagedValue) -> Result<Self> {
                    match value {
                        ManagedValue::Int(v) => <$ty>::try_from(v).map_err(|_| Error::ValueConversion {
                            expected: stringify!($ty).to_string(),
                            got: format!("int {v}"),
                        }),
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }
            }
        )*
    };
}

managed_int!(i8, i16, i32, i64);

macro_rules! managed_scalar {
    ($ty:ty, $tag:ident, $variant:ident) => {
        impl Managed for $ty {
            fn shape() -> TypeShape {
                TypeShape::Scalar(PropertyType::$tag)
            }

            fn to_value(&self) -> ManagedValue {
                ManagedValue::$variant(self.clone())
            }

            fn from_value(value: ManagedValue) -> Result<Self> {
                match value {
                    ManagedValue::$variant(v) => Ok(v),
                    other => Err(mismatch(stringify!($ty), &other)),
                }
            }
        }
    };
}

managed_scalar!(bool, Bool, Bool);
managed_scalar!(f32, Float, Float);
managed_scalar!(f64, Double, Double);
managed_scalar!(String, String, String);
managed_scalar!(Vec<u8>, Data, Data);
managed_scalar!(DateTime<Utc>, Date, Date);
managed_scalar!(Decimal, Decimal, Decimal);
managed_scalar!(ObjectId, ObjectId, ObjectId);
managed_scalar!(Uuid, Uuid, Uuid);

impl Managed for AnyValue {
    fn shape() -> TypeShape {
        TypeShape::Scalar(PropertyType::Any)
    }

    fn to_value(&self) -> ManagedValue {
        self.value().clone()
    }

    fn from_value(value: ManagedValue) -> Result<Self> {
        let got = value.type_name();
        AnyValue::new(value).ok_or_else(|| Error::ValueConversion {
            expected: "any".to_string(),
            got: got.to_string(),
        })
    }
}

/// A fieldless enum stored as its integer discriminant.
///
/// Implemented by `#[derive(Enum)]`, which also implements [`Managed`] with
/// an int shape, so enum fields classify as int properties.
///
/// ```rust
/// use tessel::{Enum, Managed, ManagedEnum, ManagedValue};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Enum)]
/// enum Size {
///     Small = 1,
///     Large = 7,
/// }
///
/// assert_eq!(Size::Large.to_value(), ManagedValue::Int(7));
/// assert_eq!(Size::from_raw(1), Some(Size::Small));
/// assert!(Size::from_value(ManagedValue::Int(2)).is_err());
/// ```
pub trait ManagedEnum: Sized {
    /// Enum name, for conversion errors
    const NAME: &'static str;

    fn to_raw(&self) -> i64;

    fn from_raw(raw: i64) -> Option<Self>;
}

/// Convert a stored value back into enum `E`.
pub fn enum_from_value<E: ManagedEnum>(value: ManagedValue) -> Result<E> {
    match value {
        ManagedValue::Int(raw) => E::from_raw(raw).ok_or_else(|| Error::ValueConversion {
            expected: E::NAME.to_string(),
            got: format!("int {raw}"),
        }),
        other => Err(mismatch(E::NAME, &other)),
    }
}

impl<T: Managed> Managed for Option<T> {
    fn shape() -> TypeShape {
        TypeShape::optional(T::shape())
    }

    fn to_value(&self) -> ManagedValue {
        match self {
            Some(value) => value.to_value(),
            None => ManagedValue::Null,
        }
    }

    fn from_value(value: ManagedValue) -> Result<Self> {
        match value {
            ManagedValue::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

/// Typed link to a stored object.
pub struct Link<T> {
    key: ObjectKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Link<T> {
    pub fn new(key: ObjectKey) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> ObjectKey {
        self.key
    }
}

impl<T> Clone for Link<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Link<T> {}

impl<T> PartialEq for Link<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Link<T> {}

impl<T> fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Link").field(&self.key).finish()
    }
}

impl<T: ObjectType> Managed for Link<T> {
    fn shape() -> TypeShape {
        TypeShape::link(T::CLASS_NAME, T::EMBEDDED)
    }

    fn to_value(&self) -> ManagedValue {
        ManagedValue::Link(self.key)
    }

    fn from_value(value: ManagedValue) -> Result<Self> {
        match value {
            ManagedValue::Link(key) => Ok(Link::new(key)),
            other => Err(mismatch(T::CLASS_NAME, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widths_share_a_tag() {
        assert_eq!(i8::shape(), TypeShape::Scalar(PropertyType::Int));
        assert_eq!(i16::shape(), TypeShape::Scalar(PropertyType::Int));
        assert_eq!(i32::shape(), TypeShape::Scalar(PropertyType::Int));
        assert_eq!(i64::shape(), TypeShape::Scalar(PropertyType::Int));
    }

    #[test]
    fn narrow_integers_reject_out_of_range() {
        assert_eq!(i8::from_value(ManagedValue::Int(-128)).unwrap(), -128);
        assert!(matches!(
            i8::from_value(ManagedValue::Int(300)),
            Err(Error::ValueConversion { .. })
        ));
    }

    #[test]
    fn option_wraps_one_level() {
        assert_eq!(
            <Option<String>>::shape(),
            TypeShape::optional(TypeShape::Scalar(PropertyType::String))
        );
        assert_eq!(<Option<i32>>::from_value(ManagedValue::Null).unwrap(), None);
        assert_eq!(
            <Option<i32>>::from_value(ManagedValue::Int(5)).unwrap(),
            Some(5)
        );
        assert_eq!(Some(2.5f64).to_value(), ManagedValue::Double(2.5));
    }

    #[test]
    fn conversion_reports_types() {
        let err = bool::from_value(ManagedValue::String("yes".into())).unwrap_err();
        assert_eq!(
            err,
            Error::ValueConversion {
                expected: "bool".into(),
                got: "string".into(),
            }
        );
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Level {
        Low,
        High,
    }

    impl ManagedEnum for Level {
        const NAME: &'static str = "Level";

        fn to_raw(&self) -> i64 {
            match self {
                Level::Low => 0,
                Level::High => 5,
            }
        }

        fn from_raw(raw: i64) -> Option<Self> {
            match raw {
                0 => Some(Level::Low),
                5 => Some(Level::High),
                _ => None,
            }
        }
    }

    #[test]
    fn enums_convert_through_raw_values() {
        assert_eq!(enum_from_value::<Level>(ManagedValue::Int(5)).unwrap(), Level::High);
        assert_eq!(
            enum_from_value::<Level>(ManagedValue::Int(3)).unwrap_err(),
            Error::ValueConversion {
                expected: "Level".into(),
                got: "int 3".into(),
            }
        );
        assert!(enum_from_value::<Level>(ManagedValue::from("High")).is_err());
    }

    #[test]
    fn binary_and_dates() {
        let now = Utc::now();
        assert_eq!(now.to_value(), ManagedValue::Date(now));
        assert_eq!(
            <Vec<u8>>::from_value(ManagedValue::Data(vec![1, 2])).unwrap(),
            vec![1, 2]
        );
    }
}
