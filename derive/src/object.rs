use crate::attrs::{ContainerAttrs, FieldAttrs};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, Type};

const MANAGED_WRAPPERS: &[&str] = &["Persisted", "List", "MutableSet", "Map"];
const BACKLINK_WRAPPER: &str = "LinkingObjects";
const LAZY_WRAPPERS: &[&str] = &["OnceCell", "OnceLock", "LazyCell", "LazyLock", "Lazy"];

///
/// FieldBacking
///

#[derive(Clone, Copy, PartialEq, Eq)]
enum FieldBacking {
    Managed,
    Backlink,
    Lazy,
    Plain,
}

fn last_segment(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        Type::Group(group) => last_segment(&group.elem),
        Type::Paren(paren) => last_segment(&paren.elem),
        _ => None,
    }
}

fn backing(ty: &Type) -> FieldBacking {
    match last_segment(ty) {
        Some(name) if MANAGED_WRAPPERS.contains(&name.as_str()) => FieldBacking::Managed,
        Some(name) if name == BACKLINK_WRAPPER => FieldBacking::Backlink,
        Some(name) if LAZY_WRAPPERS.contains(&name.as_str()) => FieldBacking::Lazy,
        _ => FieldBacking::Plain,
    }
}

// derive_object
pub fn derive_object(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    match expand(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            ident,
            "Object can only be derived for structs with named fields",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(Error::new_spanned(
            &data.fields,
            "Object can only be derived for structs with named fields",
        ));
    };

    let container = ContainerAttrs::parse(&input.attrs)?;
    let class_name = container.class.unwrap_or_else(|| ident.to_string());
    let embedded = container.embedded;

    let mut reflect = Vec::new();
    let mut accessors = Vec::new();
    let mut accessors_mut = Vec::new();
    let mut ignored = Vec::new();
    let mut indexed = Vec::new();
    let mut columns = Vec::new();
    let mut primary_key: Option<String> = None;

    for field in &named.named {
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let name = field_ident.to_string();
        let ty = &field.ty;
        let attrs = FieldAttrs::parse(&field.attrs)?;
        let backing = backing(ty);

        if attrs.primary_key {
            if primary_key.is_some() {
                return Err(Error::new_spanned(
                    field_ident,
                    "only one field can be marked `primary_key`",
                ));
            }
            primary_key = Some(name.clone());
        }
        if attrs.indexed {
            indexed.push(name.clone());
        }
        if attrs.ignore {
            ignored.push(name.clone());
        }
        if let Some(column) = &attrs.column {
            columns.push(quote! { (#name, #column) });
        }

        if attrs.origin.is_some() && backing != FieldBacking::Backlink {
            return Err(Error::new_spanned(
                field_ident,
                "`origin` only applies to `LinkingObjects` fields",
            ));
        }

        let info = if attrs.computed {
            quote! { ::tessel::FieldInfo::computed(#name) }
        } else {
            match backing {
                FieldBacking::Managed => quote! { ::tessel::FieldInfo::managed::<#ty>(#name) },
                FieldBacking::Backlink => match &attrs.origin {
                    Some(origin) => {
                        quote! { ::tessel::FieldInfo::linking_objects::<#ty>(#name, #origin) }
                    }
                    None if attrs.ignore => quote! { ::tessel::FieldInfo::plain::<#ty>(#name) },
                    None => {
                        return Err(Error::new_spanned(
                            ty,
                            "`LinkingObjects` fields need `#[tessel(origin = \"property\")]`",
                        ))
                    }
                },
                FieldBacking::Lazy => quote! { ::tessel::FieldInfo::lazy::<#ty>(#name) },
                FieldBacking::Plain => quote! { ::tessel::FieldInfo::plain::<#ty>(#name) },
            }
        };
        reflect.push(info);

        let bound = matches!(backing, FieldBacking::Managed | FieldBacking::Backlink);
        if bound && !attrs.ignore && !attrs.computed {
            accessors.push(quote! {
                (#name, &self.#field_ident as &dyn ::tessel::Accessor)
            });
            accessors_mut.push(quote! {
                (#name, &mut self.#field_ident as &mut dyn ::tessel::Accessor)
            });
        }
    }

    let primary_key = match primary_key {
        Some(name) => quote! { ::core::option::Option::Some(#name) },
        None => quote! { ::core::option::Option::None },
    };

    Ok(quote! {
        impl #impl_generics ::tessel::ObjectType for #ident #ty_generics #where_clause {
            const CLASS_NAME: &'static str = #class_name;
            const EMBEDDED: bool = #embedded;

            fn primary_key() -> ::core::option::Option<&'static str> {
                #primary_key
            }

            fn ignored_properties() -> &'static [&'static str] {
                &[#(#ignored),*]
            }

            fn indexed_properties() -> &'static [&'static str] {
                &[#(#indexed),*]
            }

            fn column_names() -> &'static [(&'static str, &'static str)] {
                &[#(#columns),*]
            }

            fn reflect(&self) -> ::std::vec::Vec<::tessel::FieldInfo> {
                ::std::vec![#(#reflect),*]
            }

            fn accessors(&self) -> ::std::vec::Vec<(&'static str, &dyn ::tessel::Accessor)> {
                ::std::vec![#(#accessors),*]
            }

            fn accessors_mut(
                &mut self,
            ) -> ::std::vec::Vec<(&'static str, &mut dyn ::tessel::Accessor)> {
                ::std::vec![#(#accessors_mut),*]
            }
        }
    })
}
