//! Type classification.
//!
//! Turns a field's [`TypeShape`] into a semantic tag, optionality flag and
//! collection kind. Optional wrapping unwraps exactly one level; collection
//! wrapping recurses into the element type exactly once.

use crate::{ClassName, CollectionKind, Property, PropertyName, PropertyType, TypeShape};

/// The classified form of a field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub property_type: PropertyType,
    pub optional: bool,
    pub collection: CollectionKind,
    pub object_class_name: Option<ClassName>,
    /// Origin property of a linking objects field
    pub link_origin_property_name: Option<PropertyName>,
}

impl Classification {
    fn scalar(property_type: PropertyType, optional: bool) -> Self {
        Self {
            property_type,
            optional,
            collection: CollectionKind::None,
            object_class_name: None,
            link_origin_property_name: None,
        }
    }

    fn link(class_name: &ClassName, embedded: bool, optional: bool) -> Self {
        let property_type = if embedded {
            PropertyType::EmbeddedObject
        } else {
            PropertyType::Object
        };
        Self {
            property_type,
            optional,
            collection: CollectionKind::None,
            object_class_name: Some(class_name.clone()),
            link_origin_property_name: None,
        }
    }

    fn linking_objects(class_name: &ClassName, property: &PropertyName) -> Self {
        Self {
            property_type: PropertyType::LinkingObjects,
            optional: false,
            collection: CollectionKind::List,
            object_class_name: Some(class_name.clone()),
            link_origin_property_name: Some(property.clone()),
        }
    }

    /// Build the descriptor for a property with this classification.
    pub fn into_property(self, name: impl Into<PropertyName>) -> Property {
        let mut property = Property::new(name, self.property_type)
            .with_optional(self.optional)
            .with_collection(self.collection);
        property.object_class_name = self.object_class_name;
        property.link_origin_property_name = self.link_origin_property_name;
        property
    }
}

/// Why a shape could not be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyError {
    /// No managed representation exists for the shape
    Unsupported,
    /// A collection was wrapped in `Option`
    OptionalCollection(CollectionKind),
}

/// Classify a field shape.
///
/// Linking objects are only valid as the whole field type; inside an
/// `Option` or a collection they are unsupported.
pub fn classify(shape: &TypeShape) -> Result<Classification, ClassifyError> {
    match shape {
        TypeShape::LinkingObjects {
            class_name,
            property,
        } => Ok(Classification::linking_objects(class_name, property)),
        TypeShape::Collection(kind, element) => {
            let mut classification = classify_element(element)?;
            classification.collection = *kind;
            Ok(classification)
        }
        TypeShape::Optional(inner) => match inner.as_ref() {
            TypeShape::Collection(kind, _) => Err(ClassifyError::OptionalCollection(*kind)),
            _ => classify_element(shape),
        },
        _ => classify_element(shape),
    }
}

fn classify_element(shape: &TypeShape) -> Result<Classification, ClassifyError> {
    match shape {
        TypeShape::Scalar(tag) if tag.is_scalar() => Ok(Classification::scalar(*tag, false)),
        TypeShape::Link {
            class_name,
            embedded,
        } => Ok(Classification::link(class_name, *embedded, false)),
        TypeShape::Optional(inner) => match inner.as_ref() {
            // Any already represents null
            TypeShape::Scalar(PropertyType::Any) => {
                Ok(Classification::scalar(PropertyType::Any, false))
            }
            TypeShape::Scalar(tag) if tag.is_scalar() => Ok(Classification::scalar(*tag, true)),
            TypeShape::Link {
                class_name,
                embedded,
            } => Ok(Classification::link(class_name, *embedded, true)),
            _ => Err(ClassifyError::Unsupported),
        },
        _ => Err(ClassifyError::Unsupported),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> TypeShape {
        TypeShape::Scalar(PropertyType::Int)
    }

    #[test]
    fn plain_scalar() {
        let c = classify(&int()).unwrap();
        assert_eq!(c.property_type, PropertyType::Int);
        assert!(!c.optional);
        assert_eq!(c.collection, CollectionKind::None);
    }

    #[test]
    fn optional_scalar() {
        let c = classify(&TypeShape::optional(TypeShape::Scalar(PropertyType::Date))).unwrap();
        assert_eq!(c.property_type, PropertyType::Date);
        assert!(c.optional);
    }

    #[test]
    fn double_optional_is_unsupported() {
        let shape = TypeShape::optional(TypeShape::optional(int()));
        assert_eq!(classify(&shape), Err(ClassifyError::Unsupported));
    }

    #[test]
    fn collection_recurses_into_element() {
        let c = classify(&TypeShape::set(TypeShape::optional(int()))).unwrap();
        assert_eq!(c.collection, CollectionKind::Set);
        assert_eq!(c.property_type, PropertyType::Int);
        assert!(c.optional);
    }

    #[test]
    fn nested_collection_is_unsupported() {
        let shape = TypeShape::list(TypeShape::map(int()));
        assert_eq!(classify(&shape), Err(ClassifyError::Unsupported));
    }

    #[test]
    fn optional_collection_is_rejected() {
        let shape = TypeShape::optional(TypeShape::list(int()));
        assert_eq!(
            classify(&shape),
            Err(ClassifyError::OptionalCollection(CollectionKind::List))
        );
    }

    #[test]
    fn optional_any_is_not_optional() {
        let shape = TypeShape::optional(TypeShape::Scalar(PropertyType::Any));
        let c = classify(&shape).unwrap();
        assert_eq!(c.property_type, PropertyType::Any);
        assert!(!c.optional);
    }

    #[test]
    fn links_carry_class_name() {
        let c = classify(&TypeShape::optional(TypeShape::link("Dog", false))).unwrap();
        assert_eq!(c.property_type, PropertyType::Object);
        assert_eq!(c.object_class_name.as_deref(), Some("Dog"));
        assert!(c.optional);

        let c = classify(&TypeShape::list(TypeShape::link("Address", true))).unwrap();
        assert_eq!(c.property_type, PropertyType::EmbeddedObject);
        assert_eq!(c.collection, CollectionKind::List);
    }

    #[test]
    fn linking_objects_are_a_computed_list() {
        let c = classify(&TypeShape::linking_objects("Person", "dogs")).unwrap();
        assert_eq!(c.property_type, PropertyType::LinkingObjects);
        assert_eq!(c.collection, CollectionKind::List);
        assert!(!c.optional);
        assert_eq!(c.object_class_name.as_deref(), Some("Person"));
        assert_eq!(c.link_origin_property_name.as_deref(), Some("dogs"));

        let property = c.into_property("owners");
        assert_eq!(property, Property::linking_objects("owners", "Person", "dogs"));

        let wrapped = TypeShape::optional(TypeShape::linking_objects("Person", "dogs"));
        assert_eq!(classify(&wrapped), Err(ClassifyError::Unsupported));
        let nested = TypeShape::list(TypeShape::linking_objects("Person", "dogs"));
        assert_eq!(classify(&nested), Err(ClassifyError::Unsupported));
    }

    #[test]
    fn bare_link_tags_are_unsupported() {
        assert_eq!(
            classify(&TypeShape::Scalar(PropertyType::Object)),
            Err(ClassifyError::Unsupported)
        );
        assert_eq!(
            classify(&TypeShape::Scalar(PropertyType::LinkingObjects)),
            Err(ClassifyError::Unsupported)
        );
        assert_eq!(classify(&TypeShape::Unsupported), Err(ClassifyError::Unsupported));
    }

    #[test]
    fn into_property_copies_classification() {
        let property = classify(&TypeShape::map(TypeShape::Scalar(PropertyType::String)))
            .unwrap()
            .into_property("tags");
        assert_eq!(property.name, "tags");
        assert_eq!(property.column_name, "tags");
        assert_eq!(property.collection, CollectionKind::Map);
        assert_eq!(property.property_type, PropertyType::String);
    }
}
