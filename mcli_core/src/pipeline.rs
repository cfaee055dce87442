//! The per-invocation parsing pipeline: defaulting, environment fallback,
//! token binding, validation, and help emission.

use std::collections::HashMap;

use crate::app::App;
use crate::complete::{
    emit, flag_candidates, ArgCompletionFn, CompletionContext, CompletionItem, FlagValue, Shell,
};
use crate::error::Error;
use crate::flags::Flags;
use crate::help::{render, HelpRequest};
use crate::registry::CommandKind;
use crate::tag::{extract, sort_flags, Descriptor};
use crate::tokens::{expand_bundles, split_ambiguous};

pub(crate) const SHOW_HIDDEN_FLAG: &str = "--mcli-show-hidden";

/// What a failed parse does with control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorHandling {
    /// Print the error and exit the process (code 2, or 0 after help).
    #[default]
    Exit,
    /// Print the error and return it to the caller.
    Continue,
    /// Panic with the error message.
    Panic,
}

/// Per-parse options, built fluently and passed to [`Context::parse_with`].
#[derive(Default)]
pub struct ParseOptions {
    pub(crate) name: Option<String>,
    pub(crate) args: Option<Vec<String>>,
    pub(crate) error_handling: ErrorHandling,
    pub(crate) disable_global_flags: bool,
    pub(crate) replace_usage: Option<String>,
    pub(crate) footer: Option<String>,
    pub(crate) defaults: HashMap<String, String>,
    pub(crate) completions: HashMap<String, ArgCompletionFn>,
}

impl ParseOptions {
    /// Create an empty option bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the command name displayed in help.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Parse the supplied vector instead of the invocation's argv.
    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = Some(args);
        self
    }

    /// Select what a failed parse does with control flow.
    pub fn error_handling(mut self, mode: ErrorHandling) -> Self {
        self.error_handling = mode;
        self
    }

    /// Omit the application-level global flags from this parse.
    pub fn disable_global_flags(mut self) -> Self {
        self.disable_global_flags = true;
        self
    }

    /// Substitute a caller-provided help text wholesale.
    pub fn replace_usage(mut self, usage: impl Into<String>) -> Self {
        self.replace_usage = Some(usage.into());
        self
    }

    /// Set a per-invocation help footer.
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// A programmatic default, keyed by long or short name. Long wins when
    /// a descriptor matches under both.
    pub fn default_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    /// A completion function for the named flag or positional argument.
    pub fn completion(mut self, name: impl Into<String>, f: ArgCompletionFn) -> Self {
        self.completions.insert(name.into(), f);
        self
    }
}

/// Completion mode carried into a gated body invocation: descriptors are
/// built, candidates are emitted, user logic never runs.
pub(crate) struct CompletionState {
    pub(crate) partial: String,
    pub(crate) shell: Shell,
    pub(crate) fallback: Option<ArgCompletionFn>,
}

/// The per-invocation state handed to a command body.
pub struct Context<'a> {
    pub(crate) app: &'a App,
    pub(crate) command_idx: Option<usize>,
    pub(crate) path: String,
    pub(crate) args: Vec<String>,
    pub(crate) completion: Option<CompletionState>,
    pub(crate) show_hidden: bool,
}

impl<'a> Context<'a> {
    pub(crate) fn new(app: &'a App, command_idx: Option<usize>, path: String, args: Vec<String>) -> Self {
        Self {
            app,
            command_idx,
            path,
            args,
            completion: None,
            show_hidden: false,
        }
    }

    /// The residual argument tokens, after the command path.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The resolved command path, space-separated.
    pub fn command_path(&self) -> &str {
        &self.path
    }

    /// Bind the invocation onto `record` with default options.
    pub fn parse(&mut self, record: &mut dyn Flags) -> Result<(), Error> {
        self.parse_with(record, ParseOptions::new())
    }

    /// Bind the invocation onto `record`.
    ///
    /// Applies, in ascending precedence: struct-tag defaults, programmatic
    /// defaults, environment fallbacks, then command-line tokens. Validates
    /// required fields and dispatches errors per the configured
    /// [`ErrorHandling`] mode. In `Exit` mode this function terminates the
    /// process on failure and after help output.
    pub fn parse_with(&mut self, record: &mut dyn Flags, options: ParseOptions) -> Result<(), Error> {
        let mut flags: Vec<Descriptor<'_>> = Vec::default();
        let mut positionals: Vec<Descriptor<'_>> = Vec::default();
        extract(record, false, &mut flags, &mut positionals);

        let global_handle = if options.disable_global_flags {
            None
        } else {
            self.app.global_flags.clone()
        };
        let mut global_guard = global_handle.as_ref().map(|handle| handle.borrow_mut());
        if let Some(guard) = global_guard.as_mut() {
            extract(&mut **guard, true, &mut flags, &mut positionals);
        }

        if !self.app.options.keep_flag_order {
            sort_flags(&mut flags);
        }

        if let Some(state) = self.completion.take() {
            self.complete(&flags, &positionals, &options, state);
            return Err(Error::CompletionEmitted);
        }

        let outcome = self.bind(&mut flags, &mut positionals, &options);
        match outcome {
            Ok(()) => Ok(()),
            Err(Error::HelpPrinted) => {
                self.print_help(&flags, &positionals, &options);
                self.finish(Err(Error::HelpPrinted), &options)
            }
            Err(error) => {
                self.app.interface.print_error(error.to_string());
                self.print_help(&flags, &positionals, &options);
                self.finish(Err(error), &options)
            }
        }
    }

    /// Steps 3 through 12: argv partitioning, defaulting, environment
    /// fallback, token binding, positional binding, required validation.
    fn bind<'v>(
        &mut self,
        flags: &mut [Descriptor<'v>],
        positionals: &mut [Descriptor<'v>],
        options: &ParseOptions,
    ) -> Result<(), Error> {
        let argv = options.args.clone().unwrap_or_else(|| self.args.clone());
        let (ambiguous, mut suffix) = split_ambiguous(&argv);

        #[cfg(feature = "tracing_debug")]
        {
            tracing::debug!(
                "Binding '{path}' with {f} flags and {p} positionals; ambiguous: {ambiguous:?}.",
                path = self.path,
                f = flags.len(),
                p = positionals.len(),
            );
        }

        if positionals.is_empty() && !ambiguous.is_empty() {
            return Err(Error::UnexpectedArgs(ambiguous.join(" ")));
        }

        // Struct-tag defaults fill zero slots, then programmatic defaults
        // fill the slots still zero; environment values overwrite both and
        // command-line tokens overwrite everything.
        for descriptor in flags.iter_mut().chain(positionals.iter_mut()) {
            if let Some(default) = descriptor.default.clone() {
                if descriptor.value.is_zero() {
                    descriptor.apply(&default)?;
                }
            }
        }
        for descriptor in flags.iter_mut().chain(positionals.iter_mut()) {
            if !descriptor.value.is_zero() {
                continue;
            }
            let programmatic = options
                .defaults
                .get(&descriptor.name)
                .or_else(|| {
                    descriptor
                        .short
                        .and_then(|short| options.defaults.get(&short.to_string()))
                })
                .cloned();
            if let Some(value) = programmatic {
                descriptor.apply(&value)?;
            }
        }
        for descriptor in flags.iter_mut().chain(positionals.iter_mut()) {
            // Containers are excluded: a command-line token appends instead
            // of overwriting, and would stack on the environment value.
            if descriptor.is_container() {
                continue;
            }
            let from_env = descriptor
                .env_names
                .iter()
                .find_map(|name| std::env::var(name).ok().filter(|value| !value.is_empty()));
            if let Some(value) = from_env {
                descriptor.apply(&value)?;
            }
        }

        if let Some(position) = suffix.iter().position(|token| {
            token.as_str() == SHOW_HIDDEN_FLAG
                || token.strip_prefix(SHOW_HIDDEN_FLAG).is_some_and(|rest| rest.starts_with('='))
        }) {
            suffix.remove(position);
            self.show_hidden = true;
        }

        let lookup = build_lookup(flags);

        if self.app.options.allow_posix_bundling {
            suffix = expand_bundles(
                &suffix,
                |name| lookup.contains_key(name),
                |c| {
                    flags
                        .iter()
                        .any(|descriptor| descriptor.short == Some(c) && descriptor.value.is_bool())
                },
            );
        }

        let residual = self.consume_flags(flags, &lookup, &suffix)?;
        self.bind_positionals(positionals, ambiguous, residual)?;

        for descriptor in flags.iter().chain(positionals.iter()) {
            if descriptor.required && descriptor.value.is_zero() {
                let class = if descriptor.positional { "argument" } else { "flag" };
                return Err(Error::RequiredNotSet {
                    class,
                    name: descriptor.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Step 10: walk the suffix as traditional flags; flag parsing stops at
    /// the first non-flag token, a bare `-`, or the `--` terminator, and
    /// the remainder becomes positional residue.
    fn consume_flags(
        &self,
        flags: &mut [Descriptor<'_>],
        lookup: &HashMap<String, usize>,
        suffix: &[String],
    ) -> Result<Vec<String>, Error> {
        let mut residual: Vec<String> = Vec::default();
        let mut i = 0;

        while i < suffix.len() {
            let token = &suffix[i];
            if token.as_str() == "--" {
                residual.extend(suffix[i + 1..].iter().cloned());
                break;
            }
            if !token.starts_with('-') || token.as_str() == "-" {
                residual.extend(suffix[i..].iter().cloned());
                break;
            }

            let stripped = token.trim_start_matches('-');
            let (name, inline) = match stripped.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (stripped, None),
            };

            let Some(idx) = lookup.get(name).copied() else {
                if name == "h" || name == "help" {
                    return Err(Error::HelpPrinted);
                }
                return Err(Error::UnknownFlag(token.clone()));
            };

            let descriptor = &mut flags[idx];
            match inline {
                Some(value) => descriptor.apply(value)?,
                None if descriptor.value.is_bool() => descriptor.apply("true")?,
                None => {
                    let Some(value) = suffix.get(i + 1) else {
                        return Err(Error::MissingValue(descriptor.display_name()));
                    };
                    descriptor.apply(value)?;
                    i += 1;
                }
            }
            i += 1;
        }

        Ok(residual)
    }

    /// Step 11: leading ambiguous tokens then post-flag residue, bound in
    /// declaration order; a trailing container soaks up the rest.
    fn bind_positionals(
        &self,
        positionals: &mut [Descriptor<'_>],
        ambiguous: Vec<String>,
        residual: Vec<String>,
    ) -> Result<(), Error> {
        let mut tokens = ambiguous;
        tokens.extend(residual);
        let mut tokens = tokens.into_iter();

        for descriptor in positionals.iter_mut() {
            if descriptor.is_container() {
                for token in tokens.by_ref() {
                    descriptor.apply(&token)?;
                }
            } else if let Some(token) = tokens.next() {
                descriptor.apply(&token)?;
            }
        }

        let excess: Vec<String> = tokens.collect();
        if !excess.is_empty() {
            return Err(Error::UnexpectedArgs(excess.join(" ")));
        }
        Ok(())
    }

    /// Gated completion: emit flag-name or value candidates instead of
    /// running user logic.
    fn complete<'v>(
        &self,
        flags: &[Descriptor<'v>],
        positionals: &[Descriptor<'v>],
        options: &ParseOptions,
        state: CompletionState,
    ) {
        let show_hidden = self
            .args
            .iter()
            .any(|token| token.as_str() == SHOW_HIDDEN_FLAG);

        let items: Vec<CompletionItem> = if state.partial.starts_with('-') {
            flag_candidates(flags, &state.partial, &self.args, show_hidden)
        } else {
            let func = self
                .pending_flag_completion(flags, options)
                .or_else(|| self.pending_positional_completion(positionals, options))
                .or(state.fallback);
            match func {
                Some(func) => {
                    let values: Vec<FlagValue> = flags
                        .iter()
                        .chain(positionals.iter())
                        .map(|descriptor| FlagValue {
                            name: descriptor.name.clone(),
                            value: descriptor.value.format(),
                            positional: descriptor.positional,
                        })
                        .collect();
                    let context = CompletionContext {
                        partial: &state.partial,
                        args: &self.args,
                        command: &self.path,
                        values: &values,
                    };
                    func(&context)
                }
                None => Vec::default(),
            }
        };

        emit(&items, state.shell, self.app.interface.as_ref());
    }

    /// When the token before the partial is a non-boolean flag, value
    /// completion goes through the function registered under any of that
    /// flag's names.
    fn pending_flag_completion(
        &self,
        flags: &[Descriptor<'_>],
        options: &ParseOptions,
    ) -> Option<ArgCompletionFn> {
        let previous = self.args.last()?;
        let name = previous.strip_prefix('-')?.trim_start_matches('-');
        let descriptor = flags.iter().find(|descriptor| {
            descriptor.name == name || descriptor.short.map(|c| c.to_string()).as_deref() == Some(name)
        })?;
        if descriptor.value.is_bool() {
            return None;
        }
        options
            .completions
            .get(&descriptor.name)
            .or_else(|| {
                descriptor
                    .short
                    .and_then(|short| options.completions.get(&short.to_string()))
            })
            .cloned()
    }

    fn pending_positional_completion(
        &self,
        positionals: &[Descriptor<'_>],
        options: &ParseOptions,
    ) -> Option<ArgCompletionFn> {
        positionals
            .iter()
            .find(|descriptor| descriptor.value.is_zero() || descriptor.is_container())
            .and_then(|descriptor| options.completions.get(&descriptor.name))
            .cloned()
    }

    pub(crate) fn print_help<'v>(
        &self,
        flags: &[Descriptor<'v>],
        positionals: &[Descriptor<'v>],
        options: &ParseOptions,
    ) {
        if let Some(usage) = &options.replace_usage {
            self.app.interface.print(usage.clone());
            return;
        }

        let command = self.command_idx.map(|idx| self.app.registry.get_index(idx));
        let description = match command {
            Some(command) if command.kind == CommandKind::Alias => {
                let target = command
                    .alias_of
                    .as_ref()
                    .and_then(|name| self.app.registry.get(name));
                match target {
                    Some(target) if !target.description.is_empty() => {
                        format!("{}\n{}", command.description, target.description)
                    }
                    _ => command.description.clone(),
                }
            }
            Some(command) => command.description.clone(),
            None => String::default(),
        };

        let locals: Vec<&Descriptor<'_>> = flags.iter().filter(|d| !d.global).collect();
        let globals: Vec<&Descriptor<'_>> = flags.iter().filter(|d| d.global).collect();
        let positionals: Vec<&Descriptor<'_>> = positionals.iter().collect();

        let path = options.name.clone().unwrap_or_else(|| self.path.clone());
        let request = HelpRequest {
            program: self.app.program_name(),
            path,
            description,
            long_description: command.and_then(|c| c.opts.long_description.clone()),
            examples: command.and_then(|c| c.opts.examples.clone()),
            flags: &locals,
            globals: &globals,
            positionals: &positionals,
            children: self.app.registry.children(&self.path, self.show_hidden),
            footer: options.footer.clone().or_else(|| self.app.options.footer.clone()),
            show_hidden: self.show_hidden,
        };
        self.app.interface.print(render(&request));
    }

    fn finish(&self, result: Result<(), Error>, options: &ParseOptions) -> Result<(), Error> {
        let Err(error) = result else {
            return result;
        };
        match options.error_handling {
            ErrorHandling::Exit => std::process::exit(error.exit_code()),
            ErrorHandling::Continue => Err(error),
            ErrorHandling::Panic if error.is_sentinel() => Err(error),
            ErrorHandling::Panic => panic!("{error}"),
        }
    }
}

/// The name lookup: every accepted long and short form maps to its
/// descriptor's index.
fn build_lookup(flags: &[Descriptor<'_>]) -> HashMap<String, usize> {
    let mut lookup = HashMap::default();
    for (idx, descriptor) in flags.iter().enumerate() {
        lookup.insert(descriptor.name.clone(), idx);
        if let Some(short) = descriptor.short {
            lookup.insert(short.to_string(), idx);
        }
    }
    lookup
}
