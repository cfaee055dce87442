//! `mcli` is a declarative command line library for Rust.
//!
//! Other crates certainly cover command line parsing; `mcli` prioritizes a
//! particular style of Cli program "out of the box":
//! * *Declarative argument binding*:
//! Flags and positional arguments are declared as fields on a plain struct,
//! annotated with a compact tag string (`#[cli("-n, --name, The name to greet")]`).
//! The user never calls a `&str -> T` conversion function directly.
//! * *Sub-command paradigm*:
//! Commands are registered under space-separated paths (`"api deploy"`), and
//! the dispatcher resolves the deepest match, printing grouped help for
//! intermediate levels and "Did you mean this?" suggestions for typos.
//! * *Layered value sources*:
//! A field binds from the command line, falling back to environment
//! variables, then declared defaults, in that order.
//! * *Detailed yet basic UX*:
//! Help output is aligned and grouped; shell completion works for bash, zsh,
//! fish and powershell without per-command ceremony.
//!
//! # Usage
//! ```no_run
//! use mcli::{App, Flags};
//!
//! #[derive(Default, Flags)]
//! struct Args {
//!     #[cli("-n, --name, The name to greet", default = "world")]
//!     name: String,
//!     #[cli("-v, --verbose, Verbose output")]
//!     verbose: bool,
//! }
//!
//! fn main() {
//!     let mut app = App::new();
//!     app.add("greet", "Greet somebody", |ctx| {
//!         let mut args = Args::default();
//!         ctx.parse(&mut args)?;
//!         println!("hello, {}", args.name);
//!         Ok(())
//!     });
//!     app.add_help();
//!     app.add_completion();
//!     app.run();
//! }
//! ```
//!
//! ```console
//! $ greeter greet --name rust
//! hello, rust
//!
//! $ greeter greet -h
//! Greet somebody
//!
//! USAGE:
//!   greeter greet [flags]
//!
//! FLAGS:
//!   -n, --name string    The name to greet (default: world)
//!   -v, --verbose        Verbose output
//! ```
//!
//! # Annotation grammar
//! The tag string carries up to four comma-separated segments, in order:
//! modifiers (`#R` required, `#H` hidden, `#D` deprecated), a short name
//! (`-n`) *or* a bare word declaring a positional argument, a long name
//! (`--name`), and everything after the last name segment as the
//! description. See [`Flags`](trait.Flags.html) for the hand-written
//! equivalent.
//!
//! # Default application
//! Programs with a single entry point may skip constructing an [`App`] and
//! use the free functions below, which share one thread-local application.

pub use mcli_core::*;
pub use mcli_derive::Flags;

use std::cell::RefCell;

thread_local! {
    static DEFAULT_APP: RefCell<App> = RefCell::new(App::new());
}

/// Register a command on the thread-local default application.
///
/// See [`App::add`].
pub fn add<F>(name: &str, description: &str, body: F)
where
    F: FnMut(&mut Context<'_>) -> Result<(), Error> + 'static,
{
    DEFAULT_APP.with(|app| app.borrow_mut().add(name, description, body));
}

/// Register a command group on the thread-local default application.
///
/// See [`App::add_group`].
pub fn add_group(name: &str, description: &str) {
    DEFAULT_APP.with(|app| app.borrow_mut().add_group(name, description));
}

/// Register the `help` command on the thread-local default application.
///
/// See [`App::add_help`].
pub fn add_help() {
    DEFAULT_APP.with(|app| app.borrow_mut().add_help());
}

/// Register the `completion` command group on the thread-local default
/// application.
///
/// See [`App::add_completion`].
pub fn add_completion() {
    DEFAULT_APP.with(|app| app.borrow_mut().add_completion());
}

/// Bind the process arguments onto `record` through the thread-local
/// default application without registering a command.
///
/// See [`App::parse`].
pub fn parse(record: &mut dyn Flags, options: ParseOptions) -> Result<(), Error> {
    DEFAULT_APP.with(|app| app.borrow().parse(record, options))
}

/// Run the thread-local default application against `std::env::args`.
///
/// See [`App::run`].
pub fn run() {
    DEFAULT_APP.with(|app| app.borrow().run());
}
