//! Command-line argument parsing.
//!
//! Usage:
//!   smartscript [-nHt] [-c<config>] [-p<name>=<value>]... [-P<name>=<value>]... <template>...
//!
//! Option values may be attached (`-pa=1`) or given as the next argument
//! (`-p a=1`).  Single-letter flags may be combined (`-nH`).

use std::path::PathBuf;

use thiserror::Error;

use crate::config::split_pair;

pub const USAGE: &str =
    "Usage: smartscript [-nHt] [-c <config>] [-p name=value]... [-P name=value]... <template>...";

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Config-file specification.
    pub config: ConfigFile,
    /// Request parameters (`-p name=value`).
    pub parameters: Vec<(String, String)>,
    /// Persistent parameters (`-P name=value`).
    pub persistent: Vec<(String, String)>,
    /// Prefix output with a response header (`-H`).
    pub header: bool,
    /// Print the reconstructed template instead of rendering (`-t`).
    pub print_tree: bool,
    /// Show usage and exit (`-h`).
    pub help: bool,
    /// Templates to process, in output order.
    pub templates: Vec<PathBuf>,
}

/// How to choose the config file.
#[derive(Debug, Default, PartialEq)]
pub enum ConfigFile {
    /// Search the standard locations (default).
    #[default]
    Search,
    /// `-n`: no config file.
    Skip,
    /// `-c<file>`: load this specific file.
    Explicit(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("-{0} requires an argument")]
    MissingArgument(char),
    #[error("unknown option: -{0}")]
    UnknownOption(char),
    #[error("-{flag} expects name=value, got {value:?}")]
    BadPair { flag: char, value: String },
    #[error("no template given")]
    NoTemplates,
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()`.
pub fn parse_args() -> Result<CliArgs, UsageError> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, UsageError> {
    let mut args = CliArgs::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            args.templates.extend(argv[i + 1..].iter().map(PathBuf::from));
            break;
        }

        if !arg.starts_with('-') || arg == "-" {
            args.templates.push(PathBuf::from(arg));
            i += 1;
            continue;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'n' => args.config = ConfigFile::Skip,
                'H' => args.header = true,
                't' => args.print_tree = true,
                'h' => args.help = true,

                flag @ ('c' | 'p' | 'P') => {
                    let value = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err(UsageError::MissingArgument(flag));
                    };
                    match flag {
                        'c' => args.config = ConfigFile::Explicit(PathBuf::from(value)),
                        _ => {
                            let pair = split_pair(&value)
                                .ok_or(UsageError::BadPair { flag, value })?;
                            if flag == 'p' {
                                args.parameters.push(pair);
                            } else {
                                args.persistent.push(pair);
                            }
                        }
                    }
                }

                c => return Err(UsageError::UnknownOption(c)),
            }
            j += 1;
        }
        i += 1;
    }

    if args.templates.is_empty() && !args.help {
        return Err(UsageError::NoTemplates);
    }
    Ok(args)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
