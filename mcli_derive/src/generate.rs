use crate::model::{DeriveField, FieldKind};
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;

pub(crate) fn generate_impl(
    struct_name: &syn::Ident,
    fields: Vec<DeriveField>,
) -> TokenStream2 {
    let entries: Vec<TokenStream2> = fields.iter().map(generate_field).collect();

    quote! {
        impl ::mcli::Flags for #struct_name {
            fn cli_fields(&mut self) -> ::std::vec::Vec<::mcli::Field<'_>> {
                ::std::vec![
                    #( #entries ),*
                ]
            }
        }
    }
}

fn generate_field(field: &DeriveField) -> TokenStream2 {
    let field_name = &field.field_name;

    match &field.kind {
        FieldKind::Value { cli, default, env } => {
            let cli = &cli.tokens;
            let mut entry = quote! {
                ::mcli::Field::new(#cli, &mut self.#field_name)
            };

            if let Some(default) = default {
                let default = &default.tokens;
                entry = quote! { #entry.default_value(#default) };
            }

            if let Some(env) = env {
                let env = &env.tokens;
                entry = quote! { #entry.env(#env) };
            }

            entry
        }
        FieldKind::Nested => quote! {
            ::mcli::Field::nested(&mut self.#field_name)
        },
    }
}
