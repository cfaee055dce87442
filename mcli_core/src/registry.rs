use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::complete::ArgCompletionFn;
use crate::error::Error;
use crate::pipeline::Context;

/// A command body: invoked when its command is selected, typically calling
/// [`Context::parse`] before running the program logic.
pub type Body = Box<dyn FnMut(&mut Context<'_>) -> Result<(), Error>>;

/// The placeholder description shown for a group prefix with no registered
/// command of its own.
pub(crate) const SUB_COMMANDS_HINT: &str = "(Use -h to see available sub commands)";

/// How a registered command participates in dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandKind {
    /// A dispatchable command.
    Leaf,
    /// A named prefix grouping sub-commands; not dispatchable.
    Group,
    /// Selected when no other name prefix matches.
    Root,
    /// Shares the body of its target command.
    Alias,
    /// The built-in `help` command.
    HelpEmitter,
    /// A built-in `completion <shell>` command.
    CompletionEmitter,
}

/// Options attached to a command at registration.
#[derive(Default, Clone)]
pub struct CmdOptions {
    pub(crate) long_description: Option<String>,
    pub(crate) examples: Option<String>,
    pub(crate) category: Option<String>,
    pub(crate) completion_fn: Option<ArgCompletionFn>,
    pub(crate) no_completion: bool,
    pub(crate) hidden: bool,
    pub(crate) deprecated: bool,
}

impl CmdOptions {
    /// Create an empty option bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// A long description shown in the command's own help, before USAGE.
    pub fn long_description(mut self, text: impl Into<String>) -> Self {
        self.long_description = Some(text.into());
        self
    }

    /// Verbatim example text, indented under an EXAMPLES heading.
    pub fn examples(mut self, text: impl Into<String>) -> Self {
        self.examples = Some(text.into());
        self
    }

    /// A category label grouping this command in help output.
    pub fn category(mut self, label: impl Into<String>) -> Self {
        self.category = Some(label.into());
        self
    }

    /// A completion function proposing values for this command's arguments.
    pub fn completion(mut self, f: ArgCompletionFn) -> Self {
        self.completion_fn = Some(f);
        self
    }

    /// Exclude this command from completion listing and descent.
    pub fn no_completion(mut self) -> Self {
        self.no_completion = true;
        self
    }

    /// Hide this command from help and completion unless
    /// `--mcli-show-hidden` is given.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Mark this command deprecated in help output.
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }
}

/// A registered dispatchable unit. Immutable after registration.
pub(crate) struct Command {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) kind: CommandKind,
    pub(crate) alias_of: Option<String>,
    pub(crate) idx: usize,
    pub(crate) opts: CmdOptions,
    pub(crate) body: Option<Rc<RefCell<Body>>>,
}

impl Command {
    pub(crate) fn depth(&self) -> usize {
        depth_of(&self.name)
    }

    pub(crate) fn hidden(&self) -> bool {
        self.opts.hidden
    }
}

/// Normalise a command name: trimmed, internal whitespace collapsed to
/// single spaces.
pub(crate) fn normalize(name: &str) -> String {
    name.split_whitespace().collect::<Vec<&str>>().join(" ")
}

pub(crate) fn depth_of(name: &str) -> usize {
    if name.is_empty() {
        0
    } else {
        name.split(' ').count()
    }
}

/// The outcome of resolving an argument vector against the registry.
pub(crate) struct SearchResult {
    /// The longest exact match, if any.
    pub(crate) index: Option<usize>,
    /// Tokens consumed by the exact match.
    pub(crate) consumed: usize,
    /// The longest walked prefix (may extend past the exact match).
    pub(crate) prefix: String,
    /// Whether registered commands extend `prefix`.
    pub(crate) has_sub_commands: bool,
}

/// An entry produced by [`Registry::children`]: either a registered command
/// or a synthetic placeholder for an absent group prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChildEntry {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) category: Option<String>,
    pub(crate) hidden: bool,
    pub(crate) deprecated: bool,
    pub(crate) synthetic: bool,
}

/// The ordered collection of registered commands.
#[derive(Default)]
pub(crate) struct Registry {
    commands: Vec<Command>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub(crate) fn register(
        &mut self,
        name: &str,
        description: impl Into<String>,
        kind: CommandKind,
        opts: CmdOptions,
        body: Option<Body>,
    ) -> usize {
        let name = normalize(name);
        if self.index.contains_key(&name) {
            panic!("command {name:?} is already registered");
        }

        let idx = self.commands.len();
        self.commands.push(Command {
            name: name.clone(),
            description: description.into(),
            kind,
            alias_of: None,
            idx,
            opts,
            body: body.map(|b| Rc::new(RefCell::new(b))),
        });
        self.index.insert(name, idx);
        idx
    }

    pub(crate) fn register_alias(&mut self, alias: &str, target: &str) -> usize {
        let target = normalize(target);
        let target_cmd = self
            .get(&target)
            .unwrap_or_else(|| panic!("alias target {target:?} is not registered"));
        let description = format!("Alias of '{target}'");
        let body = target_cmd.body.clone();
        let opts = target_cmd.opts.clone();

        let alias = normalize(alias);
        if self.index.contains_key(&alias) {
            panic!("command {alias:?} is already registered");
        }

        let idx = self.commands.len();
        self.commands.push(Command {
            name: alias.clone(),
            description,
            kind: CommandKind::Alias,
            alias_of: Some(target),
            idx,
            opts,
            body,
        });
        self.index.insert(alias, idx);
        idx
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Command> {
        self.index.get(name).map(|idx| &self.commands[*idx])
    }

    pub(crate) fn get_index(&self, idx: usize) -> &Command {
        &self.commands[idx]
    }

    pub(crate) fn root(&self) -> Option<&Command> {
        self.commands
            .iter()
            .find(|command| command.kind == CommandKind::Root)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Find the longest name prefix of `argv` matching a registered command,
    /// stopping at the first `-`-prefixed token. Exact matches win over
    /// prefix-parent matches.
    pub(crate) fn search(&self, argv: &[String]) -> SearchResult {
        let mut prefix = String::default();
        let mut matched = None;
        let mut consumed = 0;

        for (i, token) in argv.iter().enumerate() {
            if token.starts_with('-') {
                break;
            }

            let candidate = if prefix.is_empty() {
                token.clone()
            } else {
                format!("{prefix} {token}")
            };
            let extends = self.commands.iter().any(|command| {
                command.name == candidate || command.name.starts_with(&format!("{candidate} "))
            });
            if !extends {
                break;
            }

            prefix = candidate;
            if let Some(idx) = self.index.get(&prefix) {
                matched = Some(*idx);
                consumed = i + 1;
            }
        }

        let has_sub_commands = !prefix.is_empty()
            && self
                .commands
                .iter()
                .any(|command| command.name.starts_with(&format!("{prefix} ")));

        SearchResult {
            index: matched,
            consumed,
            prefix,
            has_sub_commands,
        }
    }

    /// The immediate sub-commands of `name` (the top level for an empty
    /// name). Grand-children whose intermediate prefix is absent from the
    /// registry surface as synthetic placeholder entries, unless the listing
    /// would exceed ten entries.
    pub(crate) fn children(&self, name: &str, show_hidden: bool) -> Vec<ChildEntry> {
        let child_depth = depth_of(name) + 1;
        let prefix = if name.is_empty() {
            String::default()
        } else {
            format!("{name} ")
        };

        let mut entries = Vec::default();
        let mut seen: Vec<String> = Vec::default();

        for command in &self.commands {
            if !command.name.starts_with(&prefix) || command.name == name {
                continue;
            }
            if command.hidden() && !show_hidden {
                continue;
            }

            if command.depth() == child_depth {
                entries.push(ChildEntry {
                    name: command.name.clone(),
                    description: command.description.clone(),
                    category: command.opts.category.clone(),
                    hidden: command.hidden(),
                    deprecated: command.opts.deprecated,
                    synthetic: false,
                });
                seen.push(command.name.clone());
            } else if command.depth() > child_depth {
                let intermediate = command
                    .name
                    .split(' ')
                    .take(child_depth)
                    .collect::<Vec<&str>>()
                    .join(" ");
                if self.index.contains_key(&intermediate) || seen.contains(&intermediate) {
                    continue;
                }
                entries.push(ChildEntry {
                    name: intermediate.clone(),
                    description: SUB_COMMANDS_HINT.to_string(),
                    category: None,
                    hidden: false,
                    deprecated: false,
                    synthetic: true,
                });
                seen.push(intermediate);
            }
        }

        if entries.len() > 10 {
            entries.retain(|entry| !entry.synthetic);
        }

        entries
    }

    /// Suggestions for an unrecognised name: non-hidden commands within
    /// Levenshtein distance 2, then prefix matches ascending by distance,
    /// capped at five.
    pub(crate) fn suggest(&self, name: &str) -> Vec<String> {
        let wanted = name.to_lowercase();
        let mut primary = Vec::default();
        let mut secondary: Vec<(usize, String)> = Vec::default();

        for command in &self.commands {
            if command.hidden() || command.name.is_empty() {
                continue;
            }
            let candidate = command.name.to_lowercase();
            let distance = strsim::levenshtein(&wanted, &candidate);
            if distance <= 2 {
                primary.push(command.name.clone());
            } else if candidate.starts_with(&wanted) {
                secondary.push((distance, command.name.clone()));
            }
        }

        secondary.sort_by_key(|(distance, _)| *distance);
        primary.extend(secondary.into_iter().map(|(_, name)| name));
        primary.truncate(5);
        primary
    }
}

/// Partition `entries` by category label: explicitly-labelled categories in
/// first-appearance order, then an "Other Commands" bucket. The flag reports
/// whether any category was declared at all.
pub(crate) fn group_by_category(entries: &[ChildEntry]) -> (Vec<(String, Vec<ChildEntry>)>, bool) {
    let mut groups: Vec<(String, Vec<ChildEntry>)> = Vec::default();
    let mut other: Vec<ChildEntry> = Vec::default();
    let mut any_declared = false;

    for entry in entries {
        match &entry.category {
            Some(label) => {
                any_declared = true;
                match groups.iter_mut().find(|(name, _)| name == label) {
                    Some((_, members)) => members.push(entry.clone()),
                    None => groups.push((label.clone(), vec![entry.clone()])),
                }
            }
            None => other.push(entry.clone()),
        }
    }

    if !other.is_empty() {
        groups.push(("Other Commands".to_string(), other));
    }

    (groups, any_declared)
}
