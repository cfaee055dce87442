use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::error::ValueError;

/// The shape of a value slot, which decides how the pipeline feeds it tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A single value; each appearance overwrites.
    Scalar,
    /// An ordered sequence; each appearance appends one element.
    Sequence,
    /// A string-keyed mapping; each appearance binds one `key=value` token.
    Mapping,
    /// A user-implemented codec.
    Custom,
}

/// The value codec: translates between textual tokens and a typed slot.
///
/// Implemented for the supported leaf types (booleans, integers, floats,
/// strings, durations) and the containers `Vec<T>` and `BTreeMap<String, T>`
/// / `HashMap<String, T>`. Implement it directly on your own type to plug a
/// custom codec into the binding engine.
pub trait ArgValue {
    /// Parse `text` into the slot, overwriting or appending per [`ValueKind`].
    fn parse(&mut self, text: &str) -> Result<(), ValueError>;

    /// Render the current value.
    ///
    /// Containers render as an empty string when empty, and in a JSON-like
    /// bracketed notation otherwise. Only used when echoing current values in
    /// help contexts.
    fn format(&self) -> String;

    /// Whether the slot still holds its zero value.
    fn is_zero(&self) -> bool;

    /// The shape of this slot.
    fn kind(&self) -> ValueKind;

    /// A short token naming the value type, shown in help (ex: `int`).
    fn type_hint(&self) -> &'static str {
        "value"
    }

    /// Boolean slots take no separate value token and participate in
    /// short-flag bundling.
    fn is_bool(&self) -> bool {
        false
    }
}

impl ArgValue for bool {
    fn parse(&mut self, text: &str) -> Result<(), ValueError> {
        *self = match text.to_ascii_lowercase().as_str() {
            "true" | "1" | "t" => true,
            "false" | "0" | "f" => false,
            _ => {
                return Err(ValueError::InvalidConversion {
                    token: text.to_string(),
                    type_name: "bool",
                })
            }
        };
        Ok(())
    }

    fn format(&self) -> String {
        self.to_string()
    }

    fn is_zero(&self) -> bool {
        !*self
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Scalar
    }

    fn type_hint(&self) -> &'static str {
        "bool"
    }

    fn is_bool(&self) -> bool {
        true
    }
}

macro_rules! impl_arg_value_number {
    ($hint:literal => $($t:ty),* $(,)?) => {$(
        impl ArgValue for $t {
            fn parse(&mut self, text: &str) -> Result<(), ValueError> {
                *self = text.parse::<$t>().map_err(|_| ValueError::InvalidConversion {
                    token: text.to_string(),
                    type_name: stringify!($t),
                })?;
                Ok(())
            }

            fn format(&self) -> String {
                self.to_string()
            }

            fn is_zero(&self) -> bool {
                *self == 0 as $t
            }

            fn kind(&self) -> ValueKind {
                ValueKind::Scalar
            }

            fn type_hint(&self) -> &'static str {
                $hint
            }
        }
    )*};
}

impl_arg_value_number!("int" => i8, i16, i32, i64, i128, isize);
impl_arg_value_number!("uint" => u8, u16, u32, u64, u128, usize);
impl_arg_value_number!("float" => f32, f64);

impl ArgValue for String {
    fn parse(&mut self, text: &str) -> Result<(), ValueError> {
        *self = text.to_string();
        Ok(())
    }

    fn format(&self) -> String {
        self.clone()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Scalar
    }

    fn type_hint(&self) -> &'static str {
        "string"
    }
}

impl ArgValue for Duration {
    fn parse(&mut self, text: &str) -> Result<(), ValueError> {
        *self = parse_duration(text)?;
        Ok(())
    }

    fn format(&self) -> String {
        format_duration(*self)
    }

    fn is_zero(&self) -> bool {
        Duration::is_zero(self)
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Scalar
    }

    fn type_hint(&self) -> &'static str {
        "duration"
    }
}

impl<T: ArgValue + Default> ArgValue for Vec<T> {
    fn parse(&mut self, text: &str) -> Result<(), ValueError> {
        let mut item = T::default();
        item.parse(text)?;
        self.push(item);
        Ok(())
    }

    fn format(&self) -> String {
        if self.is_empty() {
            String::default()
        } else {
            let items: Vec<String> = self.iter().map(ArgValue::format).collect();
            format!("[{}]", items.join(", "))
        }
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Sequence
    }

    fn type_hint(&self) -> &'static str {
        "list"
    }
}

fn parse_map_entry<T: ArgValue + Default>(text: &str) -> Result<(String, T), ValueError> {
    let (key, value) = match text.split_once('=') {
        Some((key, value)) => (key, value),
        // A missing '=' binds the whole token as the key, with an empty value.
        None => (text, ""),
    };
    let mut item = T::default();
    if !value.is_empty() {
        item.parse(value)?;
    }
    Ok((key.to_string(), item))
}

fn format_map_entries(entries: Vec<(String, String)>) -> String {
    if entries.is_empty() {
        String::default()
    } else {
        let items: Vec<String> = entries
            .into_iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect();
        format!("{{{}}}", items.join(", "))
    }
}

impl<T: ArgValue + Default> ArgValue for BTreeMap<String, T> {
    fn parse(&mut self, text: &str) -> Result<(), ValueError> {
        let (key, item) = parse_map_entry(text)?;
        // Repeated keys overwrite.
        self.insert(key, item);
        Ok(())
    }

    fn format(&self) -> String {
        format_map_entries(
            self.iter()
                .map(|(key, value)| (key.clone(), value.format()))
                .collect(),
        )
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Mapping
    }

    fn type_hint(&self) -> &'static str {
        "map"
    }
}

impl<T: ArgValue + Default> ArgValue for HashMap<String, T> {
    fn parse(&mut self, text: &str) -> Result<(), ValueError> {
        let (key, item) = parse_map_entry(text)?;
        self.insert(key, item);
        Ok(())
    }

    fn format(&self) -> String {
        let mut entries: Vec<(String, String)> = self
            .iter()
            .map(|(key, value)| (key.clone(), value.format()))
            .collect();
        entries.sort();
        format_map_entries(entries)
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Mapping
    }

    fn type_hint(&self) -> &'static str {
        "map"
    }
}

const NANOS_PER_UNIT: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 3600 * 1_000_000_000),
];

/// Parse a duration of the form `<decimal><unit>[...]`, ex: `1.5s`, `100ms`,
/// `1h30m`. The bare token `0` is accepted as the zero duration.
pub fn parse_duration(text: &str) -> Result<Duration, ValueError> {
    let original = text;
    let text = text.strip_prefix('+').unwrap_or(text);

    if text == "0" {
        return Ok(Duration::ZERO);
    }

    if text.is_empty() {
        return Err(ValueError::InvalidConversion {
            token: original.to_string(),
            type_name: "duration",
        });
    }

    let mut total_nanos: u128 = 0;
    let mut rest = text;

    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let number = &rest[..number_end];
        rest = &rest[number_end..];

        let value: f64 = number.parse().map_err(|_| ValueError::InvalidConversion {
            token: original.to_string(),
            type_name: "duration",
        })?;

        let unit = NANOS_PER_UNIT
            .iter()
            .filter(|(suffix, _)| rest.starts_with(suffix))
            // Prefer the longest matching suffix ("ms" over "m").
            .max_by_key(|(suffix, _)| suffix.len())
            .ok_or_else(|| {
                ValueError::Message(format!("missing unit in duration '{original}'"))
            })?;
        rest = &rest[unit.0.len()..];

        total_nanos += (value * unit.1 as f64) as u128;
    }

    let seconds = (total_nanos / 1_000_000_000) as u64;
    let nanos = (total_nanos % 1_000_000_000) as u32;
    Ok(Duration::new(seconds, nanos))
}

/// Render a duration with the largest exact units, ex: `1.5s`, `100ms`,
/// `1h30m0s`. Inverts [`parse_duration`] for every representable value.
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }

    let nanos = duration.as_nanos();

    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}us", trim_decimal(nanos as f64 / 1_000.0));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", trim_decimal(nanos as f64 / 1_000_000.0));
    }

    let total_seconds = nanos as f64 / 1_000_000_000.0;
    let hours = (total_seconds / 3600.0) as u128;
    let minutes = ((total_seconds / 60.0) as u128) % 60;
    let seconds = total_seconds - (hours * 3600 + minutes * 60) as f64;

    let mut out = String::default();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 || hours > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&format!("{}s", trim_decimal(seconds)));
    out
}

fn trim_decimal(value: f64) -> String {
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0');
    text.trim_end_matches('.').to_string()
}
