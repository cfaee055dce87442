use thiserror::Error;

/// A failure raised while resolving a command or binding an invocation.
///
/// The two `*Printed`/`*Emitted` variants are sentinels, not failures: they
/// short-circuit a command body after help or completion output has already
/// been written, and map to exit code `0`.
#[derive(Debug, Error)]
pub enum Error {
    /// The command path did not resolve against the registry.
    #[error("'{name}' is not a valid command")]
    InvalidCommand {
        /// The unrecognised name, as typed.
        name: String,
        /// Registered commands close to `name`, best first.
        suggestions: Vec<String>,
    },

    /// A `-`-prefixed token did not match any declared flag.
    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    /// A flag or argument value failed to parse through the value codec.
    #[error("invalid value \"{value}\" for {name}: {message}")]
    InvalidValue {
        /// Display name of the offending descriptor (`--name` or positional name).
        name: String,
        /// The rejected token.
        value: String,
        /// Codec-level detail.
        message: String,
    },

    /// A non-boolean flag appeared without an attached or following value.
    #[error("flag needs an argument: {0}")]
    MissingValue(String),

    /// Positional tokens remained after every declared argument was bound.
    #[error("unexpected arguments: {0}")]
    UnexpectedArgs(String),

    /// A `#R` descriptor still held its zero value after all sources applied.
    #[error("{class} is required but not given: {name}")]
    RequiredNotSet {
        /// "flag" or "argument".
        class: &'static str,
        /// Canonical descriptor name.
        name: String,
    },

    /// `-h`/`--help` was seen; the help document has been written.
    #[error("help requested")]
    HelpPrinted,

    /// The completion sentinel was seen; suggestions have been written.
    #[error("completion emitted")]
    CompletionEmitted,
}

impl Error {
    /// The process exit code this error maps to in `exit` handling mode.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::HelpPrinted | Error::CompletionEmitted => 0,
            _ => 2,
        }
    }

    /// Whether this is a sentinel rather than an actual failure.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Error::HelpPrinted | Error::CompletionEmitted)
    }
}

/// A textual value rejected by the value codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    /// The token does not parse as the target type.
    #[error("cannot convert '{token}' to {type_name}")]
    InvalidConversion {
        /// The rejected token.
        token: String,
        /// Name of the target type.
        type_name: &'static str,
    },

    /// A codec-specific message (ex: a malformed duration unit).
    #[error("{0}")]
    Message(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(Error::HelpPrinted.exit_code(), 0);
        assert_eq!(Error::CompletionEmitted.exit_code(), 0);
        assert_eq!(Error::UnknownFlag("--x".to_string()).exit_code(), 2);
        assert_eq!(
            Error::RequiredNotSet {
                class: "argument",
                name: "text".to_string(),
            }
            .exit_code(),
            2
        );
    }

    #[test]
    fn required_message() {
        let error = Error::RequiredNotSet {
            class: "argument",
            name: "text".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "argument is required but not given: text"
        );
    }

    #[test]
    fn sentinels() {
        assert!(Error::HelpPrinted.is_sentinel());
        assert!(Error::CompletionEmitted.is_sentinel());
        assert!(!Error::UnknownFlag("-x".to_string()).is_sentinel());
    }
}
