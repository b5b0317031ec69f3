use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::model::{ListId, Priority, TaskId};
use crate::session::Theme;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "bettertasks",
    version,
    about = "BetterTasks: manage your task lists from the terminal",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "rc-file", global = true)]
    pub rc_file: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    /// Base URL of the API, e.g. http://localhost:8001/api
    #[arg(long = "api", global = true)]
    pub api: Option<String>,

    /// Act on this list instead of the remembered one.
    #[arg(long = "list", global = true)]
    pub list: Option<ListId>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create an account and sign in.
    Register {
        name: String,
        email: String,
        #[command(flatten)]
        password: PasswordArg,
    },
    /// Sign in with an existing account.
    Login {
        email: String,
        #[command(flatten)]
        password: PasswordArg,
    },
    /// Forget the signed-in user.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Show your lists.
    Lists,
    /// Manage lists.
    #[command(subcommand)]
    List(ListCommand),
    /// Show tasks in the active list.
    Tasks,
    /// Add a task to the active list.
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[arg(short = 'p', long = "priority", default_value = "Medium")]
        priority: Priority,
        /// ISO date or date-time.
        #[arg(long = "due")]
        due: Option<String>,
    },
    /// Flip a task between open and done.
    Toggle { id: TaskId },
    /// Delete a task.
    Rm { id: TaskId },
    /// Change a task's priority.
    Priority { id: TaskId, priority: Priority },
    /// Mark every task in the active list done.
    FinishAll,
    /// Show or set the colour theme (light or dark).
    Theme { theme: Option<Theme> },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ListCommand {
    /// Create a list and make it active.
    Add {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
        #[arg(short = 'e', long = "emoji")]
        emoji: Option<String>,
    },
    /// Delete a list and its tasks.
    Rm {
        id: ListId,
        /// Skip the confirmation prompt.
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
    /// Rename a list or change its emoji.
    Rename {
        id: ListId,
        #[arg(long = "name")]
        name: Option<String>,
        #[arg(short = 'e', long = "emoji")]
        emoji: Option<String>,
    },
    /// Make a list the active one.
    Use { id: ListId },
}

#[derive(Args, Debug, Clone)]
pub struct PasswordArg {
    /// Read from stdin when omitted.
    #[arg(long = "password", env = "BETTERTASKS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use clap::Parser;

    use super::{Command, GlobalCli, ListCommand, preprocess_args};
    use crate::model::Priority;

    fn args(raw: &[&str]) -> Vec<OsString> {
        raw.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_extracted() {
        let pre = preprocess_args(&args(&[
            "bettertasks",
            "rc.api.url=http://x/api",
            "tasks",
            "rc.color:off",
        ]))
        .expect("preprocess");
        assert_eq!(pre.cleaned_args, args(&["bettertasks", "tasks"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.api.url".to_string(), "http://x/api".to_string()),
                ("rc.color".to_string(), "off".to_string()),
            ]
        );
    }

    #[test]
    fn add_joins_words_and_parses_priority() {
        let cli = GlobalCli::parse_from(["bettertasks", "add", "buy", "milk", "-p", "high"]);
        match cli.command {
            Some(Command::Add { title, priority, .. }) => {
                assert_eq!(title.join(" "), "buy milk");
                assert_eq!(priority, Priority::High);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_list_flag_works_after_subcommand() {
        let cli = GlobalCli::parse_from(["bettertasks", "tasks", "--list", "4"]);
        assert_eq!(cli.list, Some(4));
    }

    #[test]
    fn list_rm_accepts_yes() {
        let cli = GlobalCli::parse_from(["bettertasks", "list", "rm", "3", "-y"]);
        assert!(matches!(
            cli.command,
            Some(Command::List(ListCommand::Rm { id: 3, yes: true }))
        ));
    }

    #[test]
    fn invalid_priority_is_rejected_by_parser() {
        assert!(GlobalCli::try_parse_from(["bettertasks", "priority", "1", "urgent"]).is_err());
    }
}
