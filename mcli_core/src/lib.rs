//! Core engine for `mcli`.
//! See [documentation root](https://docs.rs/mcli/latest/mcli/index.html) for full details.
#![deny(missing_docs)]
mod app;
mod complete;
mod error;
mod flags;
mod help;
mod interface;
mod pipeline;
mod registry;
mod tag;
mod tokens;
mod value;

pub use app::{App, AppOptions};
pub use complete::{ArgCompletionFn, CompletionContext, CompletionItem, FlagValue, Shell};
pub use error::{Error, ValueError};
pub use flags::{Field, Flags};
pub use interface::{ConsoleInterface, InMemoryInterface, UserInterface};
pub use pipeline::{Context, ErrorHandling, ParseOptions};
pub use registry::CmdOptions;
pub use value::{ArgValue, ValueKind};

#[cfg(test)]
#[macro_use]
extern crate assert_matches;
