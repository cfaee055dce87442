//! Shell completion: sentinel detection, candidate selection, output
//! formatting, and the sourceable per-shell scripts.

use std::rc::Rc;

use crate::interface::UserInterface;
use crate::tag::Descriptor;

/// The magic trailing token that switches an invocation into completion
/// mode.
pub(crate) const COMPLETION_SENTINEL: &str = "--mcli-generate-completion";

/// One completion candidate; the description only surfaces for shells that
/// display one (zsh).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    /// The text inserted by the shell.
    pub value: String,
    /// Optional display text next to the value.
    pub description: String,
}

impl CompletionItem {
    /// A candidate without a description.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: String::default(),
        }
    }

    /// A candidate with a description.
    pub fn with_description(value: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: description.into(),
        }
    }
}

/// A read-only snapshot of one declared flag or argument at completion
/// time: its canonical name and the formatted current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagValue {
    /// Canonical name (long name for flags, bare name for positionals).
    pub name: String,
    /// The formatted current value; empty when unset.
    pub value: String,
    /// Whether this is a positional argument.
    pub positional: bool,
}

/// What a user completion function sees: the partial token under the
/// cursor, the tokens before it, the resolved command path, and the
/// declared flags and arguments with their current values.
pub struct CompletionContext<'a> {
    /// The token being completed (may be empty).
    pub partial: &'a str,
    /// The argument tokens preceding the partial.
    pub args: &'a [String],
    /// The resolved command path, space-separated.
    pub command: &'a str,
    /// The declared flags and arguments of the selected command, including
    /// the application's global flags.
    pub values: &'a [FlagValue],
}

/// A user-registered function proposing values for a flag or positional
/// argument.
pub type ArgCompletionFn = Rc<dyn Fn(&CompletionContext<'_>) -> Vec<CompletionItem>>;

/// The shell dialect a completion request targets; affects only the output
/// format and the generated script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shell {
    /// GNU bash.
    #[default]
    Bash,
    /// Z shell.
    Zsh,
    /// The fish shell.
    Fish,
    /// PowerShell.
    Powershell,
}

impl Shell {
    pub(crate) fn parse(token: &str) -> Option<Shell> {
        match token {
            "bash" => Some(Shell::Bash),
            "zsh" => Some(Shell::Zsh),
            "fish" => Some(Shell::Fish),
            "powershell" => Some(Shell::Powershell),
            _ => None,
        }
    }
}

/// Detect and strip the completion sentinel. The sentinel is the last
/// token, optionally followed by a single shell-name token.
pub(crate) fn detect(argv: &[String]) -> Option<(Vec<String>, Shell)> {
    match argv {
        [rest @ .., sentinel] if sentinel.as_str() == COMPLETION_SENTINEL => {
            Some((rest.to_vec(), Shell::default()))
        }
        [rest @ .., sentinel, shell] if sentinel.as_str() == COMPLETION_SENTINEL => {
            Shell::parse(shell).map(|shell| (rest.to_vec(), shell))
        }
        _ => None,
    }
}

/// Write candidates in the shell's line format: `value:description` for
/// zsh (collapsing to just the value when the description is empty), bare
/// values otherwise.
pub(crate) fn emit(items: &[CompletionItem], shell: Shell, interface: &dyn UserInterface) {
    for item in items {
        let first_line = item.description.lines().next().unwrap_or_default();
        match shell {
            Shell::Zsh if !first_line.is_empty() => {
                interface.print(format!("{}:{first_line}", item.value));
            }
            _ => interface.print(item.value.clone()),
        }
    }
}

/// Flag-name candidates for a partial token. Hyphen count is respected: a
/// `--` partial matches long names only, a single `-` matches both forms.
/// Flags already consumed in `used` are suppressed, except containers,
/// which accept repetition.
pub(crate) fn flag_candidates(
    flags: &[Descriptor<'_>],
    partial: &str,
    used: &[String],
    show_hidden: bool,
) -> Vec<CompletionItem> {
    let mut items = Vec::default();

    for descriptor in flags {
        if descriptor.hidden && !show_hidden {
            continue;
        }
        if !descriptor.is_container() && already_used(descriptor, used) {
            continue;
        }

        let mut names: Vec<String> = Vec::default();
        if descriptor.name.chars().count() > 1 {
            names.push(format!("--{}", descriptor.name));
        }
        if let Some(short) = descriptor.short {
            names.push(format!("-{short}"));
        }

        for name in names {
            if name.starts_with(partial) {
                items.push(CompletionItem::with_description(
                    name,
                    descriptor.description.clone(),
                ));
                break;
            }
        }
    }

    items
}

fn already_used(descriptor: &Descriptor<'_>, used: &[String]) -> bool {
    let long = format!("--{}", descriptor.name);
    let short = descriptor.short.map(|c| format!("-{c}"));

    used.iter().any(|token| {
        let name = token.split('=').next().unwrap_or(token);
        name == long || Some(name.to_string()) == short
    })
}

/// The sourceable completion script for `shell`, with the host program name
/// substituted. The script re-invokes the program with the completion
/// sentinel appended.
pub(crate) fn script(shell: Shell, program: &str) -> String {
    let template = match shell {
        Shell::Bash => BASH_SCRIPT,
        Shell::Zsh => ZSH_SCRIPT,
        Shell::Fish => FISH_SCRIPT,
        Shell::Powershell => POWERSHELL_SCRIPT,
    };
    template.replace("{program}", program)
}

const BASH_SCRIPT: &str = r#"# bash completion for {program}
_complete_{program}() {
    local words
    words=("${COMP_WORDS[@]:1:COMP_CWORD}")
    while IFS= read -r line; do
        COMPREPLY+=("$line")
    done < <({program} "${words[@]}" --mcli-generate-completion bash 2>/dev/null)
}
complete -o default -F _complete_{program} {program}
"#;

const ZSH_SCRIPT: &str = r#"#compdef {program}
_complete_{program}() {
    local -a completions
    local -a words
    words=("${(@)words[2,CURRENT]}")
    completions=("${(@f)$({program} "${words[@]}" --mcli-generate-completion zsh 2>/dev/null)}")
    _describe 'values' completions
}
compdef _complete_{program} {program}
"#;

const FISH_SCRIPT: &str = r#"# fish completion for {program}
function __complete_{program}
    set -l words (commandline -opc)[2..-1] (commandline -ct)
    {program} $words --mcli-generate-completion fish 2>/dev/null
end
complete -c {program} -f -a '(__complete_{program})'
"#;

const POWERSHELL_SCRIPT: &str = r#"# powershell completion for {program}
Register-ArgumentCompleter -Native -CommandName {program} -ScriptBlock {
    param($wordToComplete, $commandAst, $cursorPosition)
    $words = $commandAst.CommandElements | Select-Object -Skip 1 | ForEach-Object { $_.ToString() }
    & {program} @words --mcli-generate-completion powershell 2>$null | ForEach-Object {
        [System.Management.Automation.CompletionResult]::new($_, $_, 'ParameterValue', $_)
    }
}
"#;
