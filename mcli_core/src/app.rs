//! The application: command registration, dispatch, and the built-in
//! `help` and `completion` commands.

use std::cell::RefCell;
use std::rc::Rc;

use crate::complete::{detect, emit, script, CompletionItem, Shell};
use crate::error::Error;
use crate::flags::Flags;
use crate::interface::{ConsoleInterface, UserInterface};
use crate::pipeline::{CompletionState, Context, ParseOptions, SHOW_HIDDEN_FLAG};
use crate::registry::{Body, CmdOptions, CommandKind, Registry};

/// Application-level options.
#[derive(Default)]
pub struct AppOptions {
    pub(crate) name: Option<String>,
    pub(crate) footer: Option<String>,
    pub(crate) keep_flag_order: bool,
    pub(crate) allow_posix_bundling: bool,
}

impl AppOptions {
    /// Create an empty option bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// The program name shown in help; defaults to the executable name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// A footer appended to every help document.
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// List flags in declaration order instead of sorting by name.
    pub fn keep_flag_order(mut self) -> Self {
        self.keep_flag_order = true;
        self
    }

    /// Accept `-abc` as shorthand for `-a -b -c` when every character is a
    /// registered short boolean flag.
    pub fn allow_posix_bundling(mut self) -> Self {
        self.allow_posix_bundling = true;
        self
    }
}

/// A command-line application: an ordered command registry plus the output
/// sink and global flags shared by every invocation.
///
/// Registration happens up front; [`App::run`] and [`App::run_args`] never
/// mutate the registry. An instance is single-threaded.
pub struct App {
    pub(crate) registry: Registry,
    pub(crate) interface: Rc<dyn UserInterface>,
    pub(crate) global_flags: Option<Rc<RefCell<dyn Flags>>>,
    pub(crate) options: AppOptions,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// An application with default options, writing to the console.
    pub fn new() -> Self {
        Self::with_options(AppOptions::default())
    }

    /// An application with the supplied options.
    pub fn with_options(options: AppOptions) -> Self {
        Self {
            registry: Registry::default(),
            interface: Rc::new(ConsoleInterface),
            global_flags: None,
            options,
        }
    }

    /// Replace the output sink; tests swap in an in-memory capture here.
    pub fn set_interface(&mut self, interface: Rc<dyn UserInterface>) {
        self.interface = interface;
    }

    /// Attach a record whose flags are shared by every command. The
    /// returned handle reads the bound values after a parse.
    pub fn set_global_flags<F: Flags + 'static>(&mut self, flags: F) -> Rc<RefCell<F>> {
        let handle = Rc::new(RefCell::new(flags));
        self.global_flags = Some(handle.clone());
        handle
    }

    /// Register a command. Panics if `name` is already registered.
    pub fn add<F>(&mut self, name: &str, description: &str, body: F)
    where
        F: FnMut(&mut Context<'_>) -> Result<(), Error> + 'static,
    {
        self.add_with(name, description, body, CmdOptions::new());
    }

    /// Register a command with options.
    pub fn add_with<F>(&mut self, name: &str, description: &str, body: F, opts: CmdOptions)
    where
        F: FnMut(&mut Context<'_>) -> Result<(), Error> + 'static,
    {
        let body: Body = Box::new(body);
        self.registry
            .register(name, description, CommandKind::Leaf, opts, Some(body));
    }

    /// Register a command hidden from help and completion.
    pub fn add_hidden<F>(&mut self, name: &str, description: &str, body: F)
    where
        F: FnMut(&mut Context<'_>) -> Result<(), Error> + 'static,
    {
        self.add_with(name, description, body, CmdOptions::new().hidden());
    }

    /// Register a non-dispatchable group prefix; selecting it shows the
    /// help of its sub-commands.
    pub fn add_group(&mut self, name: &str, description: &str) {
        self.registry
            .register(name, description, CommandKind::Group, CmdOptions::new(), None);
    }

    /// Register the fallback command, selected when no name prefix matches.
    pub fn add_root<F>(&mut self, body: F)
    where
        F: FnMut(&mut Context<'_>) -> Result<(), Error> + 'static,
    {
        let body: Body = Box::new(body);
        self.registry
            .register("", "", CommandKind::Root, CmdOptions::new(), Some(body));
    }

    /// Register an alias sharing the body of `target`. Panics if `target`
    /// is not registered.
    pub fn add_alias(&mut self, alias: &str, target: &str) {
        self.registry.register_alias(alias, target);
    }

    /// Register the built-in `help` command.
    pub fn add_help(&mut self) {
        self.registry.register(
            "help",
            "Help about any command",
            CommandKind::HelpEmitter,
            CmdOptions::new(),
            None,
        );
    }

    /// Register the built-in `completion <shell>` commands, which emit a
    /// sourceable completion script. The commands never appear in
    /// completion suggestions themselves.
    pub fn add_completion(&mut self) {
        self.registry.register(
            "completion",
            "Generate shell completion scripts",
            CommandKind::Group,
            CmdOptions::new().no_completion(),
            None,
        );
        for shell in ["bash", "zsh", "fish", "powershell"] {
            self.registry.register(
                &format!("completion {shell}"),
                &format!("Generate the completion script for {shell}"),
                CommandKind::CompletionEmitter,
                CmdOptions::new().no_completion(),
                None,
            );
        }
    }

    pub(crate) fn program_name(&self) -> String {
        self.options.name.clone().unwrap_or_else(|| {
            std::env::args()
                .next()
                .as_deref()
                .and_then(|path| std::path::Path::new(path).file_name())
                .and_then(|name| name.to_str())
                .map(str::to_string)
                .unwrap_or_else(|| "program".to_string())
        })
    }

    /// Bind the process arguments onto `record` without registering a
    /// command, as though an anonymous command had been selected. Supply
    /// [`ParseOptions::args`] to parse an explicit vector instead.
    pub fn parse(&self, record: &mut dyn Flags, options: ParseOptions) -> Result<(), Error> {
        let argv: Vec<String> = std::env::args().skip(1).collect();
        let mut context = Context::new(self, None, String::default(), argv);
        context.parse_with(record, options)
    }

    /// Dispatch the process arguments; exits with the error's code on
    /// failure.
    pub fn run(&self) {
        let argv: Vec<String> = std::env::args().skip(1).collect();
        if let Err(error) = self.run_args(argv) {
            if !error.is_sentinel() {
                std::process::exit(error.exit_code());
            }
        }
    }

    /// Dispatch the supplied argument vector: resolve the command path,
    /// invoke the selected body, and fall back to the root command or the
    /// suggestion list when nothing matches.
    pub fn run_args(&self, argv: Vec<String>) -> Result<(), Error> {
        if let Some((rest, shell)) = detect(&argv) {
            return self.run_completion(rest, shell);
        }

        let result = self.registry.search(&argv);

        #[cfg(feature = "tracing_debug")]
        {
            tracing::debug!(
                "Resolved {argv:?} to '{prefix}' (consumed: {consumed}).",
                prefix = result.prefix,
                consumed = result.consumed,
            );
        }

        match result.index {
            Some(idx) => {
                let command = self.registry.get_index(idx);
                let residual = argv[result.consumed..].to_vec();
                match command.kind {
                    CommandKind::Group => {
                        self.print_group_help(Some(idx), &command.name.clone(), &residual);
                        Ok(())
                    }
                    CommandKind::HelpEmitter => self.run_help(&residual),
                    CommandKind::CompletionEmitter => {
                        let shell = command
                            .name
                            .rsplit(' ')
                            .next()
                            .and_then(Shell::parse)
                            .unwrap_or_default();
                        self.interface.print(script(shell, &self.program_name()));
                        Ok(())
                    }
                    _ => self.invoke(idx, residual),
                }
            }
            None if result.has_sub_commands => {
                let residual = argv[result.consumed..].to_vec();
                self.print_group_help(None, &result.prefix.clone(), &residual);
                Ok(())
            }
            None => {
                if let Some(root) = self.registry.root() {
                    return self.invoke(root.idx, argv);
                }
                if argv.is_empty() || argv[0].starts_with('-') {
                    self.print_group_help(None, "", &argv);
                    return Ok(());
                }

                let name = argv[0].clone();
                let suggestions = self.registry.suggest(&name);
                self.interface
                    .print_error(format!("'{name}' is not a valid command"));
                if !suggestions.is_empty() {
                    self.interface.print_error(String::default());
                    self.interface.print_error("Did you mean this?".to_string());
                    for suggestion in &suggestions {
                        self.interface.print_error(format!("\t{suggestion}"));
                    }
                }
                Err(Error::InvalidCommand { name, suggestions })
            }
        }
    }

    fn invoke(&self, idx: usize, args: Vec<String>) -> Result<(), Error> {
        let command = self.registry.get_index(idx);
        let Some(body) = command.body.clone() else {
            return Ok(());
        };
        let mut context = Context::new(self, Some(idx), command.name.clone(), args);
        let mut body = body.borrow_mut();
        (&mut *body)(&mut context)
    }

    /// `help` with no arguments shows the top-level document; with a
    /// command path it re-enters that command with `-h`.
    fn run_help(&self, residual: &[String]) -> Result<(), Error> {
        if !residual.is_empty() && !residual[0].starts_with('-') {
            let result = self.registry.search(residual);
            if let Some(idx) = result.index {
                let command = self.registry.get_index(idx);
                if command.kind == CommandKind::Group {
                    self.print_group_help(Some(idx), &command.name.clone(), &[]);
                } else {
                    return self.invoke(idx, vec!["-h".to_string()]);
                }
                return Ok(());
            }
        }
        self.print_group_help(None, "", residual);
        Ok(())
    }

    fn print_group_help(&self, idx: Option<usize>, path: &str, residual: &[String]) {
        let mut context = Context::new(self, idx, path.to_string(), Vec::default());
        context.show_hidden = residual
            .iter()
            .any(|token| token.as_str() == SHOW_HIDDEN_FLAG);
        context.print_help(&[], &[], &ParseOptions::new());
    }

    /// Completion dispatch: the last token is the partial word; the tokens
    /// before it locate the command node.
    fn run_completion(&self, argv: Vec<String>, shell: Shell) -> Result<(), Error> {
        let (partial, rest): (String, Vec<String>) = match argv.split_last() {
            Some((last, rest)) => (last.clone(), rest.to_vec()),
            None => (String::default(), Vec::default()),
        };
        let show_hidden = rest
            .iter()
            .any(|token| token.as_str() == SHOW_HIDDEN_FLAG);

        let result = self.registry.search(&rest);

        if partial.starts_with('-') {
            // Flag-name completion through the resolved leaf.
            let Some(idx) = result.index else {
                return Ok(());
            };
            return self.gated_invoke(idx, rest[result.consumed..].to_vec(), partial, shell);
        }

        // Command completion: an exact child match descends, otherwise the
        // node's children are filtered by the partial word.
        let base = result.prefix.clone();
        let descended = if partial.is_empty() {
            None
        } else {
            let candidate = if base.is_empty() {
                partial.clone()
            } else {
                format!("{base} {partial}")
            };
            let is_node = self.registry.get(&candidate).is_some()
                || self
                    .registry
                    .iter()
                    .any(|command| command.name.starts_with(&format!("{candidate} ")));
            is_node.then_some(candidate)
        };
        let (list_base, filter) = match descended {
            Some(candidate) => (candidate, String::default()),
            None => (base, partial.clone()),
        };

        let items: Vec<CompletionItem> = self
            .registry
            .children(&list_base, show_hidden)
            .into_iter()
            .filter(|child| match self.registry.get(&child.name) {
                Some(command) => !command.opts.no_completion,
                None => true,
            })
            .filter_map(|child| {
                let word = child
                    .name
                    .rsplit(' ')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                word.starts_with(&filter)
                    .then(|| CompletionItem::with_description(word, child.description))
            })
            .collect();

        if !items.is_empty() {
            emit(&items, shell, self.interface.as_ref());
            return Ok(());
        }

        // Value completion through the resolved leaf.
        let Some(idx) = result.index else {
            return Ok(());
        };
        self.gated_invoke(idx, rest[result.consumed..].to_vec(), partial, shell)
    }

    /// Invoke a body in gated mode: descriptors are built and candidates
    /// emitted, user logic never runs.
    fn gated_invoke(
        &self,
        idx: usize,
        args: Vec<String>,
        partial: String,
        shell: Shell,
    ) -> Result<(), Error> {
        let command = self.registry.get_index(idx);
        if command.opts.no_completion {
            return Ok(());
        }
        let Some(body) = command.body.clone() else {
            return Ok(());
        };

        let mut context = Context::new(self, Some(idx), command.name.clone(), args);
        context.completion = Some(CompletionState {
            partial,
            shell,
            fallback: command.opts.completion_fn.clone(),
        });
        let mut body = body.borrow_mut();
        match (&mut *body)(&mut context) {
            Err(error) if error.is_sentinel() => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complete::{CompletionContext, FlagValue};
    use crate::error::Error;
    use crate::flags::Field;
    use crate::interface::InMemoryInterface;
    use crate::pipeline::ErrorHandling;
    use crate::test::assert_contains;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn continuing() -> ParseOptions {
        ParseOptions::new().error_handling(ErrorHandling::Continue)
    }

    fn test_app(options: AppOptions) -> (App, InMemoryInterface) {
        let interface = InMemoryInterface::new();
        let mut app = App::with_options(options.name("prog"));
        app.set_interface(Rc::new(interface.clone()));
        (app, interface)
    }

    #[derive(Default)]
    struct GreetArgs {
        name: String,
    }

    impl Flags for GreetArgs {
        fn cli_fields(&mut self) -> Vec<Field<'_>> {
            vec![Field::new("-n, --name, The name to greet", &mut self.name)]
        }
    }

    #[test]
    fn dispatch_binds_record() {
        // Setup
        let (mut app, _) = test_app(AppOptions::new());
        let seen = Rc::new(RefCell::new(None));
        let capture = Rc::clone(&seen);
        app.add("greet", "Greet somebody", move |ctx| {
            let mut args = GreetArgs::default();
            ctx.parse_with(&mut args, continuing())?;
            *capture.borrow_mut() = Some(args.name);
            Ok(())
        });

        // Execute
        let result = app.run_args(strings(&["greet", "-n", "Ada"]));

        // Verify
        assert_matches!(result, Ok(()));
        assert_eq!(seen.borrow().as_deref(), Some("Ada"));
    }

    #[test]
    fn bundled_shorts() {
        #[derive(Default, Clone)]
        struct Switches {
            a: bool,
            b: bool,
            c: bool,
        }

        impl Flags for Switches {
            fn cli_fields(&mut self) -> Vec<Field<'_>> {
                vec![
                    Field::new("-a", &mut self.a),
                    Field::new("-b", &mut self.b),
                    Field::new("-c", &mut self.c),
                ]
            }
        }

        let (mut app, _) = test_app(AppOptions::new().allow_posix_bundling());
        let seen = Rc::new(RefCell::new(Switches::default()));
        let capture = Rc::clone(&seen);
        app.add("switch", "", move |ctx| {
            let mut args = Switches::default();
            ctx.parse_with(&mut args, continuing())?;
            *capture.borrow_mut() = args;
            Ok(())
        });

        assert_matches!(app.run_args(strings(&["switch", "-abc"])), Ok(()));
        let bound = seen.borrow().clone();
        assert!(bound.a && bound.b && bound.c);
    }

    #[test]
    fn missing_required_argument() {
        #[derive(Default)]
        struct Args {
            text: String,
        }

        impl Flags for Args {
            fn cli_fields(&mut self) -> Vec<Field<'_>> {
                vec![Field::new("#R, text", &mut self.text)]
            }
        }

        let (mut app, interface) = test_app(AppOptions::new());
        app.add("send", "", move |ctx| {
            let mut args = Args::default();
            ctx.parse_with(&mut args, continuing())?;
            Ok(())
        });

        let result = app.run_args(strings(&["send"]));

        assert_matches!(result, Err(Error::RequiredNotSet { .. }));
        assert_contains!(
            interface.consume_errors(),
            "argument is required but not given: text"
        );
        assert_contains!(interface.consume(), "USAGE:");
    }

    #[test]
    fn environment_fallback() {
        #[derive(Default)]
        struct Args {
            key: String,
        }

        impl Flags for Args {
            fn cli_fields(&mut self) -> Vec<Field<'_>> {
                vec![Field::new("--key", &mut self.key).env("MCLI_TEST_MY_KEY")]
            }
        }

        std::env::set_var("MCLI_TEST_MY_KEY", "hello");
        let (mut app, _) = test_app(AppOptions::new());
        let seen = Rc::new(RefCell::new(None));
        let capture = Rc::clone(&seen);
        app.add("show", "", move |ctx| {
            let mut args = Args::default();
            ctx.parse_with(&mut args, continuing())?;
            *capture.borrow_mut() = Some(args.key);
            Ok(())
        });

        assert_matches!(app.run_args(strings(&["show"])), Ok(()));
        assert_eq!(seen.borrow().as_deref(), Some("hello"));
    }

    #[test]
    fn invalid_command_suggestions() {
        let (mut app, interface) = test_app(AppOptions::new());
        app.add("api", "", |_| Ok(()));
        app.add("auth", "", |_| Ok(()));
        app.add("auth login", "", |_| Ok(()));

        let result = app.run_args(strings(&["aapi"]));

        match result {
            Err(Error::InvalidCommand { name, suggestions }) => {
                assert_eq!(name, "aapi");
                assert_eq!(suggestions[0], "api");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_contains!(interface.consume_errors(), "'aapi' is not a valid command");
        assert_contains!(interface.consume_errors(), "Did you mean this?");
    }

    #[test]
    fn repeated_flag_appends() {
        #[derive(Default)]
        struct Args {
            tags: Vec<String>,
        }

        impl Flags for Args {
            fn cli_fields(&mut self) -> Vec<Field<'_>> {
                vec![Field::new("-t", &mut self.tags)]
            }
        }

        let (mut app, _) = test_app(AppOptions::new());
        let seen = Rc::new(RefCell::new(Vec::default()));
        let capture = Rc::clone(&seen);
        app.add("tag", "", move |ctx| {
            let mut args = Args::default();
            ctx.parse_with(&mut args, continuing())?;
            *capture.borrow_mut() = args.tags;
            Ok(())
        });

        let argv = strings(&["tag", "-t", "one", "-t", "two", "-t", "three"]);
        assert_matches!(app.run_args(argv), Ok(()));
        assert_eq!(*seen.borrow(), strings(&["one", "two", "three"]));
    }

    #[test]
    fn completion_skips_hidden_commands() {
        let (mut app, interface) = test_app(AppOptions::new());
        app.add("cmd1", "The first", |_| Ok(()));
        app.add_hidden("cmd2", "The second", |_| Ok(()));

        let result = app.run_args(strings(&["c", "--mcli-generate-completion"]));

        assert_matches!(result, Ok(()));
        let output = interface.consume();
        assert_contains!(output, "cmd1");
        assert!(!output.contains("cmd2"));
    }

    #[test]
    fn completion_show_hidden() {
        let (mut app, interface) = test_app(AppOptions::new());
        app.add("cmd1", "", |_| Ok(()));
        app.add_hidden("cmd2", "", |_| Ok(()));

        let argv = strings(&["--mcli-show-hidden", "c", "--mcli-generate-completion"]);
        assert_matches!(app.run_args(argv), Ok(()));
        assert_contains!(interface.consume(), "cmd2");
    }

    #[test]
    fn completion_flag_names() {
        let (mut app, interface) = test_app(AppOptions::new());
        app.add("greet", "", move |ctx| {
            let mut args = GreetArgs::default();
            ctx.parse_with(&mut args, continuing())?;
            Ok(())
        });

        let argv = strings(&["greet", "--n", "--mcli-generate-completion", "zsh"]);
        assert_matches!(app.run_args(argv), Ok(()));
        assert_eq!(interface.consume(), "--name:The name to greet");
    }

    #[test]
    fn completion_value_function() {
        let (mut app, interface) = test_app(AppOptions::new());
        app.add("env", "", move |ctx| {
            let mut args = GreetArgs::default();
            let options = continuing().completion(
                "name",
                Rc::new(|ctx: &CompletionContext<'_>| {
                    ["production", "staging"]
                        .iter()
                        .filter(|value| value.starts_with(ctx.partial))
                        .map(|value| CompletionItem::new(*value))
                        .collect()
                }),
            );
            ctx.parse_with(&mut args, options)?;
            Ok(())
        });

        let argv = strings(&["env", "--name", "pro", "--mcli-generate-completion"]);
        assert_matches!(app.run_args(argv), Ok(()));
        assert_eq!(interface.consume(), "production");
    }

    #[test]
    fn completion_function_sees_declared_values() {
        // Setup
        let (mut app, _) = test_app(AppOptions::new());
        let seen = Rc::new(RefCell::new(Vec::default()));
        let capture = Rc::clone(&seen);
        app.add("env", "", move |ctx| {
            let mut args = GreetArgs::default();
            args.name = "Ada".to_string();
            let capture = Rc::clone(&capture);
            let options = continuing().completion(
                "name",
                Rc::new(move |ctx: &CompletionContext<'_>| {
                    *capture.borrow_mut() = ctx.values.to_vec();
                    Vec::default()
                }),
            );
            ctx.parse_with(&mut args, options)?;
            Ok(())
        });

        // Execute
        let argv = strings(&["env", "--name", "pro", "--mcli-generate-completion"]);
        assert_matches!(app.run_args(argv), Ok(()));

        // Verify
        assert!(seen.borrow().contains(&FlagValue {
            name: "name".to_string(),
            value: "Ada".to_string(),
            positional: false,
        }));
    }

    #[test]
    fn parse_without_registration() {
        // Setup
        let (app, _) = test_app(AppOptions::new());
        let mut args = GreetArgs::default();

        // Execute
        let result = app.parse(&mut args, continuing().args(strings(&["-n", "Ada"])));

        // Verify
        assert_matches!(result, Ok(()));
        assert_eq!(args.name, "Ada");
    }

    #[test]
    fn precedence_command_line_over_env_over_defaults() {
        #[derive(Default)]
        struct Args {
            level: String,
        }

        impl Flags for Args {
            fn cli_fields(&mut self) -> Vec<Field<'_>> {
                vec![Field::new("--level", &mut self.level)
                    .default_value("info")
                    .env("MCLI_TEST_LEVEL")]
            }
        }

        let run = |argv: &[&str], env: Option<&str>| -> String {
            match env {
                Some(value) => std::env::set_var("MCLI_TEST_LEVEL", value),
                None => std::env::remove_var("MCLI_TEST_LEVEL"),
            }
            let (mut app, _) = test_app(AppOptions::new());
            let seen = Rc::new(RefCell::new(String::default()));
            let capture = Rc::clone(&seen);
            app.add("log", "", move |ctx| {
                let mut args = Args::default();
                ctx.parse_with(&mut args, continuing())?;
                *capture.borrow_mut() = args.level;
                Ok(())
            });
            let mut full = strings(&["log"]);
            full.extend(strings(argv));
            app.run_args(full).unwrap();
            let bound = seen.borrow().clone();
            bound
        };

        assert_eq!(run(&[], None), "info");
        assert_eq!(run(&[], Some("warn")), "warn");
        assert_eq!(run(&["--level", "error"], Some("warn")), "error");
    }

    #[test]
    fn tag_default_beats_programmatic_default() {
        #[derive(Default)]
        struct Args {
            level: String,
            mode: String,
        }

        impl Flags for Args {
            fn cli_fields(&mut self) -> Vec<Field<'_>> {
                vec![
                    Field::new("--level", &mut self.level).default_value("info"),
                    Field::new("--mode", &mut self.mode),
                ]
            }
        }

        let (mut app, _) = test_app(AppOptions::new());
        let seen = Rc::new(RefCell::new((String::default(), String::default())));
        let capture = Rc::clone(&seen);
        app.add("log", "", move |ctx| {
            let mut args = Args::default();
            let options = continuing()
                .default_value("level", "debug")
                .default_value("mode", "fast");
            ctx.parse_with(&mut args, options)?;
            *capture.borrow_mut() = (args.level, args.mode);
            Ok(())
        });

        assert_matches!(app.run_args(strings(&["log"])), Ok(()));
        let (level, mode) = seen.borrow().clone();
        assert_eq!(level, "info");
        assert_eq!(mode, "fast");
    }

    #[test]
    fn double_dash_terminates_flags() {
        #[derive(Default)]
        struct Args {
            name: String,
            rest: Vec<String>,
        }

        impl Flags for Args {
            fn cli_fields(&mut self) -> Vec<Field<'_>> {
                vec![
                    Field::new("-n, --name", &mut self.name),
                    Field::new("rest", &mut self.rest),
                ]
            }
        }

        let (mut app, _) = test_app(AppOptions::new());
        let seen = Rc::new(RefCell::new((String::default(), Vec::default())));
        let capture = Rc::clone(&seen);
        app.add("echo", "", move |ctx| {
            let mut args = Args::default();
            ctx.parse_with(&mut args, continuing())?;
            *capture.borrow_mut() = (args.name, args.rest);
            Ok(())
        });

        let argv = strings(&["echo", "-n", "Ada", "--", "-x", "literal"]);
        assert_matches!(app.run_args(argv), Ok(()));
        let (name, rest) = seen.borrow().clone();
        assert_eq!(name, "Ada");
        assert_eq!(rest, strings(&["-x", "literal"]));
    }

    #[test]
    fn unknown_flag_reports() {
        let (mut app, interface) = test_app(AppOptions::new());
        app.add("greet", "", move |ctx| {
            let mut args = GreetArgs::default();
            ctx.parse_with(&mut args, continuing())?;
            Ok(())
        });

        let result = app.run_args(strings(&["greet", "--nope"]));

        assert_matches!(result, Err(Error::UnknownFlag(_)));
        assert_contains!(interface.consume_errors(), "unknown flag: --nope");
    }

    #[test]
    fn help_flag_prints_usage() {
        let (mut app, interface) = test_app(AppOptions::new());
        app.add("greet", "Greet somebody", move |ctx| {
            let mut args = GreetArgs::default();
            ctx.parse_with(&mut args, continuing())?;
            Ok(())
        });

        let result = app.run_args(strings(&["greet", "-h"]));

        assert_matches!(result, Err(Error::HelpPrinted));
        let output = interface.consume();
        assert_contains!(output, "Greet somebody");
        assert_contains!(output, "USAGE:");
        assert_contains!(output, "prog greet [flags]");
        assert_contains!(output, "--name");
    }

    #[test]
    fn group_prefix_lists_children() {
        let (mut app, interface) = test_app(AppOptions::new());
        app.add("auth login", "Log in", |_| Ok(()));
        app.add("auth logout", "Log out", |_| Ok(()));

        assert_matches!(app.run_args(strings(&["auth"])), Ok(()));
        let output = interface.consume();
        assert_contains!(output, "auth login");
        assert_contains!(output, "auth logout");
    }

    #[test]
    fn root_command_catches_unmatched() {
        let (mut app, _) = test_app(AppOptions::new());
        let seen = Rc::new(RefCell::new(Vec::default()));
        let capture = Rc::clone(&seen);
        app.add("known", "", |_| Ok(()));
        app.add_root(move |ctx| {
            *capture.borrow_mut() = ctx.args().to_vec();
            Ok(())
        });

        assert_matches!(app.run_args(strings(&["anything", "else"])), Ok(()));
        assert_eq!(*seen.borrow(), strings(&["anything", "else"]));
    }

    #[test]
    fn alias_invokes_target() {
        let (mut app, _) = test_app(AppOptions::new());
        let count = Rc::new(RefCell::new(0));
        let capture = Rc::clone(&count);
        app.add("auth login", "Log in", move |_| {
            *capture.borrow_mut() += 1;
            Ok(())
        });
        app.add_alias("login", "auth login");

        assert_matches!(app.run_args(strings(&["auth", "login"])), Ok(()));
        assert_matches!(app.run_args(strings(&["login"])), Ok(()));
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn global_flags_bind() {
        #[derive(Default)]
        struct Globals {
            verbose: bool,
        }

        impl Flags for Globals {
            fn cli_fields(&mut self) -> Vec<Field<'_>> {
                vec![Field::new("-v, --verbose, Verbose output", &mut self.verbose)]
            }
        }

        let (mut app, _) = test_app(AppOptions::new());
        let globals = app.set_global_flags(Globals::default());
        let seen = Rc::new(RefCell::new(String::default()));
        let capture = Rc::clone(&seen);
        app.add("greet", "", move |ctx| {
            let mut args = GreetArgs::default();
            ctx.parse_with(&mut args, continuing())?;
            *capture.borrow_mut() = args.name;
            Ok(())
        });

        assert_matches!(app.run_args(strings(&["greet", "-v", "-n", "Ada"])), Ok(()));
        assert!(globals.borrow().verbose);
        assert_eq!(*seen.borrow(), "Ada");
    }

    #[test]
    fn completion_command_emits_script() {
        let (mut app, interface) = test_app(AppOptions::new());
        app.add("greet", "", |_| Ok(()));
        app.add_completion();

        assert_matches!(app.run_args(strings(&["completion", "bash"])), Ok(()));
        let output = interface.consume();
        assert_contains!(output, "prog");
        assert_contains!(output, "--mcli-generate-completion");
    }

    #[test]
    fn completion_commands_not_suggested() {
        let (mut app, interface) = test_app(AppOptions::new());
        app.add("greet", "", |_| Ok(()));
        app.add_completion();

        assert_matches!(
            app.run_args(strings(&["", "--mcli-generate-completion"])),
            Ok(())
        );
        let output = interface.consume();
        assert_contains!(output, "greet");
        assert!(!output.contains("completion"));
    }

    #[test]
    fn help_command_top_level() {
        let (mut app, interface) = test_app(AppOptions::new());
        app.add("greet", "Greet somebody", |_| Ok(()));
        app.add_help();

        assert_matches!(app.run_args(strings(&["help"])), Ok(()));
        let output = interface.consume();
        assert_contains!(output, "COMMANDS:");
        assert_contains!(output, "greet");
    }
}
