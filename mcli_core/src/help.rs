//! Renders the multi-section usage document for a resolved invocation.

use crate::registry::{group_by_category, ChildEntry};
use crate::tag::Descriptor;

/// The description column starts no later than this offset; over-wide
/// prefixes wrap to the next line instead of pushing the column out.
const ALIGN_CAP: usize = 30;
const INDENT: &str = "  ";

/// Everything the renderer needs, assembled by the parsing pipeline.
pub(crate) struct HelpRequest<'a, 'v> {
    pub(crate) program: String,
    pub(crate) path: String,
    pub(crate) description: String,
    pub(crate) long_description: Option<String>,
    pub(crate) examples: Option<String>,
    pub(crate) flags: &'a [&'a Descriptor<'v>],
    pub(crate) globals: &'a [&'a Descriptor<'v>],
    pub(crate) positionals: &'a [&'a Descriptor<'v>],
    pub(crate) children: Vec<ChildEntry>,
    pub(crate) footer: Option<String>,
    pub(crate) show_hidden: bool,
}

pub(crate) fn render(request: &HelpRequest<'_, '_>) -> String {
    let width = terminal_width();
    let mut sections: Vec<String> = Vec::default();

    if !request.description.is_empty() {
        sections.push(request.description.clone());
    }
    if let Some(long) = &request.long_description {
        sections.push(long.clone());
    }

    let flags: Vec<&Descriptor<'_>> = visible(request.flags, request.show_hidden);
    let globals: Vec<&Descriptor<'_>> = visible(request.globals, request.show_hidden);

    sections.push(usage_section(request, !flags.is_empty() || !globals.is_empty()));

    if !request.children.is_empty() {
        sections.push(commands_section(&request.children, width));
    }
    if !flags.is_empty() {
        sections.push(flag_section("FLAGS:", &flags, width));
    }
    if !globals.is_empty() {
        sections.push(flag_section("GLOBAL FLAGS:", &globals, width));
    }
    if !request.positionals.is_empty() {
        sections.push(arguments_section(request.positionals, width));
    }
    if let Some(examples) = &request.examples {
        let mut lines = vec!["EXAMPLES:".to_string()];
        lines.extend(examples.lines().map(|line| format!("{INDENT}{line}")));
        sections.push(lines.join("\n"));
    }
    if let Some(footer) = &request.footer {
        sections.push(footer.clone());
    }

    sections.join("\n\n")
}

fn visible<'a, 'v>(
    descriptors: &[&'a Descriptor<'v>],
    show_hidden: bool,
) -> Vec<&'a Descriptor<'v>> {
    descriptors
        .iter()
        .filter(|descriptor| show_hidden || !descriptor.hidden)
        .copied()
        .collect()
}

fn usage_section(request: &HelpRequest<'_, '_>, any_visible_flags: bool) -> String {
    let mut line = request.program.clone();
    if !request.path.is_empty() {
        line.push(' ');
        line.push_str(&request.path);
    }
    if any_visible_flags {
        line.push_str(" [flags]");
    }
    for positional in request.positionals {
        line.push(' ');
        line.push_str(&positional_token(positional));
    }
    if !any_visible_flags && request.positionals.is_empty() && !request.children.is_empty() {
        line.push_str(" <command> ...");
    }
    format!("USAGE:\n{INDENT}{line}")
}

fn positional_token(descriptor: &Descriptor<'_>) -> String {
    use crate::value::ValueKind;

    let name = descriptor
        .usage_name
        .clone()
        .unwrap_or_else(|| descriptor.name.clone());
    let bracketed = if descriptor.required {
        format!("<{name}>")
    } else {
        format!("[{name}]")
    };
    match descriptor.value.kind() {
        ValueKind::Sequence => format!("{bracketed}..."),
        ValueKind::Mapping => format!("{bracketed}{{...}}"),
        _ => bracketed,
    }
}

fn commands_section(children: &[ChildEntry], width: usize) -> String {
    let (groups, any_declared) = group_by_category(children);
    let mut lines = vec!["COMMANDS:".to_string()];

    if any_declared {
        for (i, (label, members)) in groups.iter().enumerate() {
            if i > 0 {
                lines.push(String::default());
            }
            lines.push(format!("{label}:"));
            push_aligned(&mut lines, &command_rows(members), width);
        }
    } else {
        push_aligned(&mut lines, &command_rows(children), width);
    }

    lines.join("\n")
}

fn command_rows(children: &[ChildEntry]) -> Vec<(String, String)> {
    children
        .iter()
        .map(|child| {
            let mut description = child.description.clone();
            if child.deprecated {
                description = format!("(DEPRECATED) {description}");
            }
            if child.hidden {
                description = format!("(HIDDEN) {description}");
            }
            (child.name.clone(), description)
        })
        .collect()
}

fn flag_section(heading: &str, flags: &[&Descriptor<'_>], width: usize) -> String {
    let rows: Vec<(String, String)> = flags
        .iter()
        .map(|descriptor| (flag_prefix(descriptor), flag_description(descriptor)))
        .collect();

    let mut lines = vec![heading.to_string()];
    push_aligned(&mut lines, &rows, width);
    lines.join("\n")
}

fn flag_prefix(descriptor: &Descriptor<'_>) -> String {
    let mut prefix = match descriptor.short {
        Some(short) if descriptor.name.chars().count() > 1 => {
            format!("-{short}, --{}", descriptor.name)
        }
        _ => descriptor.display_name(),
    };
    if let Some(token) = descriptor.usage_token() {
        prefix.push(' ');
        prefix.push_str(&token);
    }
    prefix
}

fn flag_description(descriptor: &Descriptor<'_>) -> String {
    let mut parts: Vec<String> = Vec::default();
    if descriptor.required {
        parts.push("(REQUIRED)".to_string());
    }
    if descriptor.deprecated {
        parts.push("(DEPRECATED)".to_string());
    }
    if descriptor.hidden {
        parts.push("(HIDDEN)".to_string());
    }
    if !descriptor.description.is_empty() {
        parts.push(descriptor.description.clone());
    }
    if let Some(default) = &descriptor.default {
        parts.push(format!("(default: {default})"));
    }
    if !descriptor.env_names.is_empty() {
        parts.push(format!("(env: {})", descriptor.env_names.join(", ")));
    }
    parts.join(" ")
}

fn arguments_section(positionals: &[&Descriptor<'_>], width: usize) -> String {
    let rows: Vec<(String, String)> = positionals
        .iter()
        .map(|descriptor| {
            let mut description = String::default();
            if descriptor.required {
                description.push_str("(REQUIRED)");
            }
            if !descriptor.description.is_empty() {
                if !description.is_empty() {
                    description.push(' ');
                }
                description.push_str(&descriptor.description);
            }
            if let Some(default) = &descriptor.default {
                description.push_str(&format!(" (default: {default})"));
            }
            if !descriptor.env_names.is_empty() {
                description.push_str(&format!(" (env: {})", descriptor.env_names.join(", ")));
            }
            (descriptor.name.clone(), description.trim().to_string())
        })
        .collect();

    let mut lines = vec!["ARGUMENTS:".to_string()];
    push_aligned(&mut lines, &rows, width);
    lines.join("\n")
}

/// Lay out `(prefix, description)` rows with the description column aligned
/// to the widest prefix, capped; over-wide prefixes wrap to the next line.
fn push_aligned(lines: &mut Vec<String>, rows: &[(String, String)], width: usize) {
    let column = rows
        .iter()
        .map(|(prefix, _)| prefix.chars().count())
        .filter(|len| *len <= ALIGN_CAP)
        .max()
        .unwrap_or(0);

    for (prefix, description) in rows {
        if description.is_empty() {
            lines.push(format!("{INDENT}{prefix}"));
            continue;
        }

        let wrapped = wrap(description, width.saturating_sub(INDENT.len() + column + 4).max(20));
        let mut wrapped = wrapped.into_iter();
        let first = wrapped.next().unwrap_or_default();

        if prefix.chars().count() > ALIGN_CAP {
            lines.push(format!("{INDENT}{prefix}"));
            lines.push(format!("{INDENT}{:column$}    {first}", ""));
        } else {
            lines.push(format!("{INDENT}{prefix:column$}    {first}"));
        }
        for continuation in wrapped {
            lines.push(format!("{INDENT}{:column$}    {continuation}", ""));
        }
    }
}

/// Greedy word wrap; a single over-long chunk stays on its own line.
/// Parenthesised annotations such as `(env: MY_NAME)` never split.
fn wrap(text: &str, limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::default();
    let mut current = String::default();

    for chunk in chunks(text) {
        if current.is_empty() {
            current = chunk;
        } else if current.chars().count() + 1 + chunk.chars().count() <= limit {
            current.push(' ');
            current.push_str(&chunk);
        } else {
            lines.push(current);
            current = chunk;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Split on whitespace, keeping a parenthesised run of words as one chunk.
fn chunks(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::default();
    let mut depth: usize = 0;

    for word in text.split_whitespace() {
        match out.last_mut() {
            Some(last) if depth > 0 => {
                last.push(' ');
                last.push_str(word);
            }
            _ => out.push(word.to_string()),
        }
        depth += word.matches('(').count();
        depth = depth.saturating_sub(word.matches(')').count());
    }

    out
}

fn terminal_width() -> usize {
    match terminal_size::terminal_size() {
        Some((terminal_size::Width(width), _)) => width as usize,
        None => 80,
    }
}
