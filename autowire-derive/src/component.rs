use crate::attributes::{ComponentAttributes, DefaultDefinition, FieldAttributes};
use itertools::Itertools;
use proc_macro2::TokenStream;
use quote::quote;
use std::ops::Deref;
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{
    Attribute, Data, DataStruct, DeriveInput, Error, Field, Fields, FieldsNamed, Item, ItemTrait,
    Result, Type,
};

const COMPONENT: &str = "component";

fn extract_field_attributes(field: &Field) -> Result<FieldAttributes> {
    field
        .attrs
        .iter()
        .find(|attribute| attribute.path().is_ident(COMPONENT))
        .map(FieldAttributes::try_from)
        .transpose()
        .map(Option::unwrap_or_default)
}

fn extract_component_attributes(attributes: &[Attribute]) -> Result<Option<ComponentAttributes>> {
    attributes
        .iter()
        .find(|attribute| attribute.path().is_ident(COMPONENT))
        .map(ComponentAttributes::try_from)
        .transpose()
}

fn generate_default(default: &Option<DefaultDefinition>) -> TokenStream {
    match default {
        Some(DefaultDefinition::Expr(path)) => quote!(#path()),
        _ => quote!(std::default::Default::default()),
    }
}

struct FieldTokens {
    parameter: Option<TokenStream>,
    construction: TokenStream,
}

fn generate_field(field: &Field) -> Result<FieldTokens> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| Error::new(field.span(), "Component fields must be named!"))?;
    let ty = &field.ty;
    let attributes = extract_field_attributes(field)?;

    if attributes.ignore {
        let default = generate_default(&attributes.default);
        return Ok(FieldTokens {
            parameter: None,
            construction: quote!(#ident: #default),
        });
    }

    let name = ident.unraw().to_string();
    let has_default = attributes.default.is_some();
    let setting = attributes
        .setting
        .as_ref()
        .map(|setting| quote!(.with_setting(#setting)));

    let parameter = quote! {
        {
            let parameter = autowire::descriptor::Parameter::new(
                #name,
                <#ty as autowire::component::Injected>::parameter_type(),
            )#setting;

            if #has_default || <#ty as autowire::component::Injected>::is_optional() {
                parameter.with_default()
            } else {
                parameter
            }
        }
    };

    let construction = if has_default {
        let default = generate_default(&attributes.default);
        quote! {
            #ident: arguments.take::<#ty>(#name)?.unwrap_or_else(|| #default)
        }
    } else {
        quote! {
            #ident: arguments.require::<#ty>(#name)?
        }
    };

    Ok(FieldTokens {
        parameter: Some(parameter),
        construction,
    })
}

fn make_named_struct(fields: &FieldsNamed) -> Result<(Vec<TokenStream>, TokenStream)> {
    let fields: Vec<FieldTokens> = fields.named.iter().map(generate_field).try_collect()?;
    let parameters = fields
        .iter()
        .filter_map(|field| field.parameter.clone())
        .collect_vec();
    let constructions = fields.iter().map(|field| &field.construction);

    Ok((
        parameters,
        quote! {
            Self {
                #(#constructions),*
            }
        },
    ))
}

fn generate_registration(ident: &syn::Ident, attributes: &ComponentAttributes) -> TokenStream {
    let singleton = attributes.singleton;
    let profiles = &attributes.profiles;
    let priority = attributes.priority;

    quote! {
        const _: () = {
            fn register() -> autowire::component_registry::internal::StaticComponentDefinition {
                autowire::component_registry::internal::StaticComponentDefinition {
                    blueprint: autowire::component::Blueprint::of::<#ident>(),
                    singleton: #singleton,
                    profiles: &[#(#profiles),*],
                    priority: #priority,
                }
            }

            autowire::component_registry::internal::submit! {
                autowire::component_registry::internal::ComponentDefinitionRegisterer {
                    register
                }
            };
        };
    }
}

pub fn expand_component(input: &DeriveInput) -> Result<TokenStream> {
    if let Data::Struct(DataStruct { fields, .. }) = &input.data {
        if !input.generics.params.is_empty() {
            return Err(Error::new(
                input.generics.span(),
                "Generic components are not supported!",
            ));
        }

        let ident = &input.ident;
        let (parameters, generation) = match fields {
            Fields::Named(fields) => make_named_struct(fields)?,
            Fields::Unnamed(fields) => {
                return Err(Error::new(
                    fields.span(),
                    "Components need named fields to describe their parameters!",
                ))
            }
            Fields::Unit => (vec![], quote! { Self }),
        };

        let registration = extract_component_attributes(&input.attrs)?
            .map(|attributes| generate_registration(ident, &attributes));

        Ok(quote! {
            #[automatically_derived]
            impl autowire::component::Injectable for #ident {
                fn blueprint() -> Option<autowire::component::Blueprint> {
                    Some(autowire::component::Blueprint::of::<Self>())
                }
            }

            #[automatically_derived]
            impl autowire::component::ComponentDowncast<#ident> for #ident {
                fn downcast(
                    source: autowire::instance_provider::AnyInstancePtr,
                ) -> Result<autowire::instance_provider::InstancePtr<Self>, autowire::instance_provider::AnyInstancePtr> {
                    source.downcast()
                }
            }

            #[automatically_derived]
            impl autowire::component::Component for #ident {
                fn descriptor() -> autowire::descriptor::TypeDescriptor {
                    autowire::descriptor::TypeDescriptor::new(vec![#(#parameters),*])
                }

                #[allow(unused_variables)]
                fn construct(arguments: &mut autowire::descriptor::Arguments) -> Result<Self, autowire::error::AssemblyError> {
                    Ok(#generation)
                }
            }

            #registration
        })
    } else {
        Err(Error::new(
            input.span(),
            "Can only derive Component on structs!",
        ))
    }
}

pub fn register_component_alias(item: &Item) -> Result<TokenStream> {
    if let Item::Impl(item_impl) = item {
        let trait_type = item_impl
            .trait_
            .as_ref()
            .map(|(_, path, ..)| path)
            .ok_or_else(|| Error::new(item.span(), "Missing trait identifier!"))?;

        let target_type = if let Type::Path(path) = item_impl.self_ty.deref() {
            &path.path
        } else {
            return Err(Error::new(
                item.span(),
                "Registering traits is only available for Components!",
            ));
        };

        Ok(quote! {
            #[automatically_derived]
            impl autowire::component::ComponentDowncast<#target_type> for dyn #trait_type + Send + Sync {
                fn downcast(
                    source: autowire::instance_provider::AnyInstancePtr,
                ) -> Result<autowire::instance_provider::InstancePtr<Self>, autowire::instance_provider::AnyInstancePtr> {
                    source.downcast::<#target_type>().map(|p| p as autowire::instance_provider::InstancePtr<Self>)
                }
            }

            const _: () = {
                fn register() -> autowire::component_registry::internal::StaticAliasDefinition {
                    autowire::component_registry::internal::StaticAliasDefinition {
                        alias: autowire::component_registry::Alias::of::<dyn #trait_type + Send + Sync, #target_type>(),
                    }
                }

                autowire::component_registry::internal::submit! {
                    autowire::component_registry::internal::AliasRegisterer {
                        register
                    }
                };
            };
        })
    } else {
        Err(Error::new(
            item.span(),
            "Registering traits for components is possible only on trait implementations!",
        ))
    }
}

pub fn expand_injectable(item: &ItemTrait) -> Result<TokenStream> {
    if !item.generics.params.is_empty() {
        return Err(Error::new(
            item.generics.span(),
            "Generic injectable traits are not supported!",
        ));
    }

    let ident = &item.ident;
    Ok(quote! {
        #[automatically_derived]
        impl autowire::component::Injectable for dyn #ident + Send + Sync {}
    })
}
