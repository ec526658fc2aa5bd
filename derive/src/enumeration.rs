use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields};

// derive_enum
pub fn derive_enum(input: TokenStream) -> TokenStream {
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
    let name = ident.to_string();

    let Data::Enum(data) = &input.data else {
        return Err(Error::new_spanned(
            ident,
            "Enum can only be derived for fieldless enums",
        ));
    };
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Enum cannot be derived for generic enums",
        ));
    }
    if data.variants.is_empty() {
        return Err(Error::new_spanned(ident, "Enum needs at least one variant"));
    }

    let mut to_raw = Vec::new();
    let mut from_raw = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(Error::new_spanned(
                variant,
                "Enum can only be derived for fieldless enums",
            ));
        }
        let variant = &variant.ident;
        to_raw.push(quote! { Self::#variant => Self::#variant as i64 });
        from_raw.push(quote! {
            if raw == Self::#variant as i64 {
                return ::core::option::Option::Some(Self::#variant);
            }
        });
    }

    Ok(quote! {
        impl ::tessel::ManagedEnum for #ident {
            const NAME: &'static str = #name;

            fn to_raw(&self) -> i64 {
                match self {
                    #(#to_raw),*
                }
            }

            fn from_raw(raw: i64) -> ::core::option::Option<Self> {
                #(#from_raw)*
                ::core::option::Option::None
            }
        }

        impl ::tessel::Managed for #ident {
            fn shape() -> ::tessel::TypeShape {
                ::tessel::TypeShape::Scalar(::tessel::PropertyType::Int)
            }

            fn to_value(&self) -> ::tessel::ManagedValue {
                ::tessel::ManagedValue::Int(::tessel::ManagedEnum::to_raw(self))
            }

            fn from_value(value: ::tessel::ManagedValue) -> ::tessel::error::Result<Self> {
                ::tessel::managed::enum_from_value::<Self>(value)
            }
        }
    })
}
