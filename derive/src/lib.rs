use proc_macro::TokenStream;

mod attrs;
mod enumeration;
mod object;

/// Implement `tessel::ObjectType` for a struct with named fields.
///
/// Container attributes: `#[tessel(class = "Name")]`, `#[tessel(embedded)]`.
/// Field attributes: `primary_key`, `indexed`, `ignore`, `computed`,
/// `column = "name"`, and `origin = "property"` on `LinkingObjects` fields.
#[proc_macro_derive(Object, attributes(tessel))]
pub fn derive_object(input: TokenStream) -> TokenStream {
    object::derive_object(input.into()).into()
}

/// Store a fieldless enum as its integer discriminant.
///
/// Implements `tessel::ManagedEnum` and `tessel::Managed`. The enum must
/// also implement `Clone`.
#[proc_macro_derive(Enum)]
pub fn derive_enum(input: TokenStream) -> TokenStream {
    enumeration::derive_enum(input.into()).into()
}
