use syn::meta::ParseNestedMeta;
use syn::punctuated::Punctuated;
use syn::{bracketed, Attribute, Error, ExprPath, LitBool, LitInt, LitStr, Meta, Result, Token};

pub enum DefaultDefinition {
    Default,
    Expr(ExprPath),
}

#[derive(Default)]
pub struct FieldAttributes {
    pub default: Option<DefaultDefinition>,
    pub setting: Option<LitStr>,
    pub ignore: bool,
}

impl TryFrom<&Attribute> for FieldAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self> {
        let mut attributes = Self::default();
        value.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                if meta.input.peek(Token![=]) {
                    let value = meta.value()?;
                    let expr: LitStr = value.parse()?;
                    attributes.default = Some(DefaultDefinition::Expr(expr.parse()?));
                } else {
                    attributes.default = Some(DefaultDefinition::Default);
                }
            } else if meta.path.is_ident("setting") {
                attributes.setting = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("ignore") {
                attributes.ignore = true;
            } else {
                return Err(meta.error("unsupported field attribute"));
            }

            Ok(())
        })?;

        Ok(attributes)
    }
}

pub struct ComponentAttributes {
    pub singleton: bool,
    pub profiles: Vec<LitStr>,
    pub priority: i8,
}

impl Default for ComponentAttributes {
    fn default() -> Self {
        Self {
            singleton: true,
            profiles: vec![],
            priority: 0,
        }
    }
}

fn parse_priority(meta: &ParseNestedMeta) -> Result<i8> {
    let value = meta.value()?;
    let negative = value.peek(Token![-]);
    if negative {
        value.parse::<Token![-]>()?;
    }

    let literal: LitInt = value.parse()?;
    let priority: i16 = literal.base10_parse()?;
    let priority = if negative { -priority } else { priority };

    i8::try_from(priority).map_err(|_| Error::new(literal.span(), "priority must fit in i8"))
}

fn parse_profiles(meta: &ParseNestedMeta) -> Result<Vec<LitStr>> {
    let value = meta.value()?;
    let content;
    bracketed!(content in value);

    Ok(Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?
        .into_iter()
        .collect())
}

impl TryFrom<&Attribute> for ComponentAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self> {
        let mut attributes = Self::default();

        // bare #[component] only enables registration
        if let Meta::Path(_) = value.meta {
            return Ok(attributes);
        }

        value.parse_nested_meta(|meta| {
            if meta.path.is_ident("singleton") {
                attributes.singleton = meta.value()?.parse::<LitBool>()?.value;
            } else if meta.path.is_ident("profiles") {
                attributes.profiles = parse_profiles(&meta)?;
            } else if meta.path.is_ident("priority") {
                attributes.priority = parse_priority(&meta)?;
            } else {
                return Err(meta.error("unsupported component attribute"));
            }

            Ok(())
        })?;

        Ok(attributes)
    }
}
