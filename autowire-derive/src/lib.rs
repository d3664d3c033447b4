use crate::component::{expand_component, expand_injectable, register_component_alias};
use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Error, Item, ItemTrait};

mod attributes;
mod component;

#[proc_macro_derive(Component, attributes(component))]
pub fn generate_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_component(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

#[proc_macro_attribute]
pub fn component_alias(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return Error::new(Span::call_site(), "component_alias takes no arguments!")
            .into_compile_error()
            .into();
    }

    let item = parse_macro_input!(item as Item);
    let registration = register_component_alias(&item).unwrap_or_else(Error::into_compile_error);

    (quote! {
        #item

        #registration
    })
    .into()
}

#[proc_macro_attribute]
pub fn injectable(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return Error::new(Span::call_site(), "injectable takes no arguments!")
            .into_compile_error()
            .into();
    }

    let item = parse_macro_input!(item as ItemTrait);
    let injectable = expand_injectable(&item).unwrap_or_else(Error::into_compile_error);

    (quote! {
        #item

        #injectable
    })
    .into()
}
