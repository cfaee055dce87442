use crate::error::Error;
use crate::flags::{Field, Flags, Slot};
use crate::value::{ArgValue, ValueKind};

/// One flag or positional argument, fully resolved from its annotations.
///
/// Descriptors live for a single invocation of the parsing pipeline; the
/// value handle borrows into the caller's record.
pub(crate) struct Descriptor<'a> {
    pub(crate) name: String,
    pub(crate) short: Option<char>,
    pub(crate) description: String,
    pub(crate) usage_name: Option<String>,
    pub(crate) default: Option<String>,
    pub(crate) env_names: Vec<String>,
    pub(crate) required: bool,
    pub(crate) hidden: bool,
    pub(crate) deprecated: bool,
    pub(crate) positional: bool,
    pub(crate) global: bool,
    pub(crate) value: &'a mut dyn ArgValue,
}

impl<'a> Descriptor<'a> {
    pub(crate) fn is_container(&self) -> bool {
        matches!(self.value.kind(), ValueKind::Sequence | ValueKind::Mapping)
    }

    /// The name as shown to the user: `--name`/`-n` for flags, bare for
    /// positionals.
    pub(crate) fn display_name(&self) -> String {
        if self.positional {
            self.name.clone()
        } else if self.name.chars().count() == 1 {
            format!("-{}", self.name)
        } else {
            format!("--{}", self.name)
        }
    }

    /// The value token shown in help between the name and the description.
    pub(crate) fn usage_token(&self) -> Option<String> {
        match &self.usage_name {
            Some(name) => Some(name.clone()),
            None if self.value.is_bool() => None,
            None => Some(self.value.type_hint().to_string()),
        }
    }

    /// Bind `text` through the value codec.
    pub(crate) fn apply(&mut self, text: &str) -> Result<(), Error> {
        self.value.parse(text).map_err(|e| Error::InvalidValue {
            name: self.display_name(),
            value: text.to_string(),
            message: e.to_string(),
        })
    }
}

/// The parsed form of a `cli` annotation string, before it is attached to a
/// value slot.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct TagSpec {
    pub(crate) name: String,
    pub(crate) short: Option<char>,
    pub(crate) positional: bool,
    pub(crate) description: String,
    pub(crate) usage_name: Option<String>,
    pub(crate) required: bool,
    pub(crate) hidden: bool,
    pub(crate) deprecated: bool,
}

impl TagSpec {
    /// Parse the comma-separated annotation grammar.
    ///
    /// Segments, in order: an optional `#` modifier segment (`R` required,
    /// `H` hidden, `D` deprecated, unknown characters ignored); an optional
    /// `-s` short segment, where a bare word instead names a positional
    /// argument; an optional `--long` segment, whose trailing words after
    /// whitespace join the description; the description, commas preserved.
    ///
    /// Panics on an ill-formed annotation: that is a bug in the calling
    /// program, not user input.
    pub(crate) fn parse(cli: &str) -> Self {
        let mut spec = TagSpec::default();
        let mut rest = cli.trim();

        let (head, remainder) = peel(rest);
        if let Some(modifiers) = head.strip_prefix('#') {
            for c in modifiers.chars() {
                match c {
                    'R' => spec.required = true,
                    'H' => spec.hidden = true,
                    'D' => spec.deprecated = true,
                    _ => {}
                }
            }
            rest = remainder;
        }

        let (head, remainder) = peel(rest);
        if !head.starts_with("--") {
            if let Some(short) = head.strip_prefix('-') {
                spec.short = short.chars().next();
                rest = remainder;
            } else if !head.is_empty() {
                // A bare word names a positional argument; everything after
                // it is description.
                spec.positional = true;
                spec.name = head.to_string();
                rest = remainder;
                let (description, usage_name) = extract_usage_name(rest.trim());
                spec.description = description;
                spec.usage_name = usage_name;
                spec.validate(cli);
                return spec;
            }
        }

        let mut description = String::default();
        let (head, remainder) = peel(rest);
        if let Some(long) = head.strip_prefix("--") {
            match long.split_once(char::is_whitespace) {
                Some((name, inline)) => {
                    spec.name = name.to_string();
                    description = inline.trim().to_string();
                }
                None => spec.name = long.to_string(),
            }
            rest = remainder;
        } else {
            rest = rest.trim_start();
        }

        if description.is_empty() {
            description = rest.trim().to_string();
        } else if !rest.trim().is_empty() {
            description = format!("{description},{rest}");
        }

        if spec.name.is_empty() {
            if let Some(short) = spec.short {
                spec.name = short.to_string();
            }
        }

        let (description, usage_name) = extract_usage_name(description.trim());
        spec.description = description;
        spec.usage_name = usage_name;
        spec.validate(cli);
        spec
    }

    fn validate(&self, cli: &str) {
        if self.name.is_empty() {
            panic!("invalid cli tag {cli:?}: no flag or argument name");
        }
        if self.positional && self.hidden {
            panic!("invalid cli tag {cli:?}: a positional argument cannot be hidden");
        }
        if self.required && self.hidden {
            panic!("invalid cli tag {cli:?}: modifiers 'H' and 'R' are mutually exclusive");
        }
        if self.required && self.deprecated {
            panic!("invalid cli tag {cli:?}: modifiers 'D' and 'R' are mutually exclusive");
        }
    }
}

/// Split off the first comma-separated segment, trimmed.
fn peel(text: &str) -> (&str, &str) {
    match text.split_once(',') {
        Some((head, remainder)) => (head.trim(), remainder),
        None => (text.trim(), ""),
    }
}

/// A back-tick or single-quote pair marks a usage-name override; the quote
/// characters are stripped from the final description.
fn extract_usage_name(description: &str) -> (String, Option<String>) {
    for quote in ['`', '\''] {
        if let Some(start) = description.find(quote) {
            if let Some(length) = description[start + 1..].find(quote) {
                let usage_name = description[start + 1..start + 1 + length].to_string();
                let mut stripped = String::with_capacity(description.len());
                stripped.push_str(&description[..start]);
                stripped.push_str(&usage_name);
                stripped.push_str(&description[start + length + 2..]);
                return (stripped, Some(usage_name));
            }
        }
    }
    (description.to_string(), None)
}

/// Walk a record's declared fields, recursing into embedded records, and
/// collect descriptors into the flag and positional lists.
pub(crate) fn extract<'a>(
    record: &'a mut dyn Flags,
    global: bool,
    flags: &mut Vec<Descriptor<'a>>,
    positionals: &mut Vec<Descriptor<'a>>,
) {
    for field in record.cli_fields() {
        let Field {
            cli,
            default,
            env,
            slot,
        } = field;
        match slot {
            Slot::Nested(nested) => extract(nested, global, flags, positionals),
            Slot::Value(value) => {
                if cli.trim() == "-" {
                    continue;
                }
                let spec = TagSpec::parse(cli);
                let descriptor = build(spec, default, env, value, global, cli);
                if descriptor.positional {
                    positionals.push(descriptor);
                } else {
                    flags.push(descriptor);
                }
            }
        }
    }
}

fn build<'a>(
    spec: TagSpec,
    default: Option<&str>,
    env: Option<&str>,
    value: &'a mut dyn ArgValue,
    global: bool,
    cli: &str,
) -> Descriptor<'a> {
    let container = matches!(value.kind(), ValueKind::Sequence | ValueKind::Mapping);
    if container && default.is_some() {
        panic!("invalid cli tag {cli:?}: a sequence/mapping field cannot declare a default");
    }
    if container && env.is_some() {
        panic!("invalid cli tag {cli:?}: a sequence/mapping field cannot declare an env fallback");
    }

    let env_names = env
        .map(|names| {
            names
                .split(',')
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Descriptor {
        name: spec.name,
        short: spec.short,
        description: spec.description,
        usage_name: spec.usage_name,
        default: default.map(str::to_string),
        env_names,
        required: spec.required,
        hidden: spec.hidden,
        deprecated: spec.deprecated,
        positional: spec.positional,
        global,
        value,
    }
}

/// Sort flags case-insensitively by canonical name; positionals always keep
/// declaration order.
pub(crate) fn sort_flags(flags: &mut [Descriptor<'_>]) {
    flags.sort_by_key(|descriptor| descriptor.name.to_lowercase());
}
