use crate::value::ArgValue;

/// A record type whose fields bind to command line flags and arguments.
///
/// Usually generated with `#[derive(Flags)]`, which turns `#[cli(...)]`
/// field attributes into [`Field`] entries. Can also be implemented by hand:
///
/// ```
/// use mcli_core::{Field, Flags};
///
/// #[derive(Default)]
/// struct Args {
///     name: String,
///     verbose: bool,
/// }
///
/// impl Flags for Args {
///     fn cli_fields(&mut self) -> Vec<Field<'_>> {
///         vec![
///             Field::new("-n, --name, The name to greet", &mut self.name),
///             Field::new("-v, --verbose, Verbose output", &mut self.verbose),
///         ]
///     }
/// }
/// ```
pub trait Flags {
    /// The declared fields, in declaration order.
    ///
    /// Annotation strings use the tag grammar: an optional `#RHD` modifier
    /// segment, an optional `-s` short segment (a bare word instead declares
    /// a positional argument), an optional `--long` segment, and the
    /// description. The tag parser validates the grammar per invocation.
    fn cli_fields(&mut self) -> Vec<Field<'_>>;
}

/// One declared field: the raw annotation strings plus the target slot.
pub struct Field<'a> {
    pub(crate) cli: &'a str,
    pub(crate) default: Option<&'a str>,
    pub(crate) env: Option<&'a str>,
    pub(crate) slot: Slot<'a>,
}

pub(crate) enum Slot<'a> {
    Value(&'a mut dyn ArgValue),
    Nested(&'a mut dyn Flags),
}

impl<'a> Field<'a> {
    /// Declare a flag or positional argument backed by `value`.
    pub fn new(cli: &'a str, value: &'a mut dyn ArgValue) -> Self {
        Self {
            cli,
            default: None,
            env: None,
            slot: Slot::Value(value),
        }
    }

    /// Declare an embedded record whose own fields are collected recursively.
    pub fn nested(record: &'a mut dyn Flags) -> Self {
        Self {
            cli: "",
            default: None,
            env: None,
            slot: Slot::Nested(record),
        }
    }

    /// Attach a default literal, applied through the value codec when no
    /// higher-priority source binds the field.
    pub fn default_value(mut self, literal: &'a str) -> Self {
        self.default = Some(literal);
        self
    }

    /// Attach a comma-separated list of environment variable names, checked
    /// in order for the first non-empty value.
    pub fn env(mut self, names: &'a str) -> Self {
        self.env = Some(names);
        self
    }
}
