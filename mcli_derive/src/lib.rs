//! Derive macro for `mcli`.
//! This crate is not intended for direct use; pull in the facade crate `mcli` instead.

extern crate proc_macro;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod generate;
mod load;
mod model;

/// Derive the `Flags` trait for a struct with named fields.
///
/// Fields participate by carrying a `#[cli("...")]` attribute whose string
/// uses the annotation grammar (`#[cli("-n, --name, The name to greet")]`).
/// Optional `default = "..."` and `env = "..."` pairs attach a default
/// literal and environment fallback.  `#[cli(inline)]` embeds another
/// `Flags` record in place.
#[proc_macro_derive(Flags, attributes(cli))]
pub fn flags(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    match load::load_fields(&ast) {
        Ok(fields) => generate::generate_impl(&ast.ident, fields).into(),
        Err(error) => error.to_compile_error().into(),
    }
}
