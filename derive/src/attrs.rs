use syn::{Attribute, LitStr, Result};

///
/// ContainerAttrs
///

#[derive(Default)]
pub struct ContainerAttrs {
    pub class: Option<String>,
    pub embedded: bool,
}

impl ContainerAttrs {
    pub fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut out = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("tessel")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("class") {
                    let value: LitStr = meta.value()?.parse()?;
                    out.class = Some(value.value());
                    Ok(())
                } else if meta.path.is_ident("embedded") {
                    out.embedded = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `class = \"...\"` or `embedded`"))
                }
            })?;
        }
        Ok(out)
    }
}

///
/// FieldAttrs
///

#[derive(Default)]
pub struct FieldAttrs {
    pub primary_key: bool,
    pub indexed: bool,
    pub ignore: bool,
    pub computed: bool,
    pub column: Option<String>,
    pub origin: Option<String>,
}

impl FieldAttrs {
    pub fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut out = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("tessel")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("primary_key") {
                    out.primary_key = true;
                } else if meta.path.is_ident("indexed") {
                    out.indexed = true;
                } else if meta.path.is_ident("ignore") {
                    out.ignore = true;
                } else if meta.path.is_ident("computed") {
                    out.computed = true;
                } else if meta.path.is_ident("column") {
                    let value: LitStr = meta.value()?.parse()?;
                    out.column = Some(value.value());
                } else if meta.path.is_ident("origin") {
                    let value: LitStr = meta.value()?.parse()?;
                    out.origin = Some(value.value());
                } else {
                    return Err(meta.error(
                        "expected one of `primary_key`, `indexed`, `ignore`, `computed`, `column = \"...\"`, `origin = \"...\"`",
                    ));
                }
                Ok(())
            })?;
        }
        Ok(out)
    }
}
