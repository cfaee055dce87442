use crate::model::{DeriveField, DeriveValue, FieldKind};
use quote::ToTokens;

pub(crate) fn load_fields(ast: &syn::DeriveInput) -> Result<Vec<DeriveField>, syn::Error> {
    match &ast.data {
        syn::Data::Struct(syn::DataStruct {
            fields: syn::Fields::Named(fields),
            ..
        }) => {
            let mut loaded = Vec::default();
            for field in &fields.named {
                if let Some(derive_field) = load_field(field)? {
                    loaded.push(derive_field);
                }
            }
            Ok(loaded)
        }
        _ => Err(syn::Error::new(
            ast.ident.span(),
            "Flags can only be derived for a struct with named fields",
        )),
    }
}

/// Fields without a `#[cli(..)]` attribute do not participate.
fn load_field(field: &syn::Field) -> Result<Option<DeriveField>, syn::Error> {
    let Some(attribute) = field.attrs.iter().find(|a| a.path().is_ident("cli")) else {
        return Ok(None);
    };

    let attributes_parser =
        syn::punctuated::Punctuated::<syn::Expr, syn::Token![,]>::parse_terminated;
    let expressions = attribute.parse_args_with(attributes_parser)?;

    let mut cli: Option<DeriveValue> = None;
    let mut default: Option<DeriveValue> = None;
    let mut env: Option<DeriveValue> = None;
    let mut inline = false;

    for expression in expressions {
        match expression {
            syn::Expr::Lit(literal) if cli.is_none() => {
                cli = Some(DeriveValue {
                    tokens: literal.to_token_stream(),
                });
            }
            syn::Expr::Assign(assignment) => {
                let left = assignment.left.to_token_stream().to_string();
                let value = DeriveValue {
                    tokens: assignment.right.to_token_stream(),
                };
                match left.as_str() {
                    "default" => default = Some(value),
                    "env" => env = Some(value),
                    _ => {
                        return Err(syn::Error::new_spanned(
                            &assignment.left,
                            format!("unknown cli attribute: {left}"),
                        ));
                    }
                }
            }
            syn::Expr::Path(path) if path.path.is_ident("inline") => inline = true,
            other => {
                return Err(syn::Error::new_spanned(
                    &other,
                    "unparseable cli attribute",
                ));
            }
        }
    }

    let field_name = field
        .ident
        .clone()
        .expect("named fields always carry an identifier");

    let kind = if inline {
        if cli.is_some() || default.is_some() || env.is_some() {
            return Err(syn::Error::new(
                field_name.span(),
                "cli(inline) cannot be combined with other cli attributes",
            ));
        }
        FieldKind::Nested
    } else {
        let Some(cli) = cli else {
            return Err(syn::Error::new(
                field_name.span(),
                "cli attribute requires the annotation string, ex: #[cli(\"-n, --name\")]",
            ));
        };
        FieldKind::Value { cli, default, env }
    };

    Ok(Some(DeriveField { field_name, kind }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proc_macro2::{Literal, Span};
    use quote::ToTokens;
    use syn::parse_quote;

    fn ident(name: &str) -> syn::Ident {
        syn::Ident::new(name, Span::call_site())
    }

    fn named_field(attributes: Vec<syn::Attribute>) -> syn::Field {
        syn::Field {
            attrs: attributes,
            vis: syn::Visibility::Inherited,
            mutability: syn::FieldMutability::None,
            ident: Some(ident("my_field")),
            colon_token: None,
            ty: parse_quote! { String },
        }
    }

    #[test]
    fn load_annotation() {
        // Setup
        let attribute: syn::Attribute = parse_quote! {
            #[cli("-n, --name, The name to greet")]
        };

        // Execute
        let derive_field = load_field(&named_field(vec![attribute])).unwrap().unwrap();

        // Verify
        assert_eq!(
            derive_field,
            DeriveField {
                field_name: ident("my_field"),
                kind: FieldKind::Value {
                    cli: DeriveValue {
                        tokens: Literal::string("-n, --name, The name to greet")
                            .into_token_stream(),
                    },
                    default: None,
                    env: None,
                },
            }
        );
    }

    #[test]
    fn load_annotation_default_env() {
        // Setup
        let attribute: syn::Attribute = parse_quote! {
            #[cli("--level", default = "info", env = "LOG_LEVEL")]
        };

        // Execute
        let derive_field = load_field(&named_field(vec![attribute])).unwrap().unwrap();

        // Verify
        assert_eq!(
            derive_field,
            DeriveField {
                field_name: ident("my_field"),
                kind: FieldKind::Value {
                    cli: DeriveValue {
                        tokens: Literal::string("--level").into_token_stream(),
                    },
                    default: Some(DeriveValue {
                        tokens: Literal::string("info").into_token_stream(),
                    }),
                    env: Some(DeriveValue {
                        tokens: Literal::string("LOG_LEVEL").into_token_stream(),
                    }),
                },
            }
        );
    }

    #[test]
    fn load_inline() {
        // Setup
        let attribute: syn::Attribute = parse_quote! {
            #[cli(inline)]
        };

        // Execute
        let derive_field = load_field(&named_field(vec![attribute])).unwrap().unwrap();

        // Verify
        assert_eq!(
            derive_field,
            DeriveField {
                field_name: ident("my_field"),
                kind: FieldKind::Nested,
            }
        );
    }

    #[test]
    fn load_unattributed() {
        assert_eq!(load_field(&named_field(vec![])).unwrap(), None);
    }

    #[test]
    fn load_missing_annotation() {
        // Setup
        let attribute: syn::Attribute = parse_quote! {
            #[cli(default = "info")]
        };

        // Execute
        let error = load_field(&named_field(vec![attribute])).unwrap_err();

        // Verify
        assert!(error.to_string().contains("requires the annotation string"));
    }

    #[test]
    fn load_inline_conflict() {
        // Setup
        let attribute: syn::Attribute = parse_quote! {
            #[cli("-v", inline)]
        };

        // Execute
        let error = load_field(&named_field(vec![attribute])).unwrap_err();

        // Verify
        assert!(error
            .to_string()
            .contains("cannot be combined with other cli attributes"));
    }

    #[test]
    fn load_unknown_pair() {
        // Setup
        let attribute: syn::Attribute = parse_quote! {
            #[cli("-v", alias = "verbose")]
        };

        // Execute
        let error = load_field(&named_field(vec![attribute])).unwrap_err();

        // Verify
        assert!(error.to_string().contains("unknown cli attribute: alias"));
    }

    #[test]
    fn load_struct() {
        // Setup
        let ast: syn::DeriveInput = parse_quote! {
            struct Args {
                #[cli("-n, --name")]
                name: String,
                ignored: u32,
                #[cli(inline)]
                common: Common,
            }
        };

        // Execute
        let fields = load_fields(&ast).unwrap();

        // Verify
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field_name, ident("name"));
        assert_eq!(fields[1].kind, FieldKind::Nested);
    }

    #[test]
    fn load_enum_rejected() {
        // Setup
        let ast: syn::DeriveInput = parse_quote! {
            enum NotAStruct { A, B }
        };

        // Execute
        let error = load_fields(&ast).unwrap_err();

        // Verify
        assert!(error
            .to_string()
            .contains("struct with named fields"));
    }
}
