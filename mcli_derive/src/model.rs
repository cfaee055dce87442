use proc_macro2::TokenStream as TokenStream2;

#[derive(Debug)]
pub struct DeriveValue {
    pub tokens: TokenStream2,
}

impl PartialEq for DeriveValue {
    fn eq(&self, other: &Self) -> bool {
        self.tokens.to_string() == other.tokens.to_string()
    }
}

impl Eq for DeriveValue {}

#[derive(Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// A flag or positional argument carrying the annotation string.
    Value {
        cli: DeriveValue,
        default: Option<DeriveValue>,
        env: Option<DeriveValue>,
    },
    /// An embedded record collected recursively.
    Nested,
}

#[derive(Debug, PartialEq, Eq)]
pub struct DeriveField {
    pub field_name: syn::Ident,
    pub kind: FieldKind,
}
