///
/// This module implements the CLI interface for bbup: command parsing, the
/// async entrypoint and the routing of each subcommand to [`crate::commands`].
///
/// All bucket, store and upload logic lives in the [`bbup-core`] crate.
/// This module is strictly CLI glue.
///
/// ## How To Use
/// - For command-line users: run the installed `bbup` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed
///   [`Cli`], or [`run_with`] to inject the storage API, answer source,
///   output and progress sink.
///
/// [`bbup-core`]: ../../bbup-core/
use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use bbup_core::contract::Storage;
use bbup_core::progress::{Progress, TerminalProgress};
use bbup_core::remote::RemoteFetcher;
use bbup_core::store::ConfigStore;

use crate::b2::B2Client;
use crate::commands;
use crate::console::{paint, Color, Console, Prompt};
use crate::paths;

/// CLI for bbup: configure Backblaze B2 buckets and upload files to them.
#[derive(Parser)]
#[clap(
    name = "bbup",
    version,
    about = "Configure Backblaze B2 buckets and upload local or remote files to them"
)]
pub struct Cli {
    /// Directory holding config.json (defaults to the platform config directory)
    #[clap(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Increase log output on stderr (-v info, -vv debug, -vvv trace)
    #[clap(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure Backblaze bucket settings.
    Configure {
        /// Make this bucket the default (asked interactively when omitted)
        #[clap(long, num_args = 0..=1, default_missing_value = "true")]
        set_default: Option<bool>,

        /// Serve uploaded files from a custom domain (asked interactively when omitted)
        #[clap(long, num_args = 0..=1, default_missing_value = "true")]
        use_domain: Option<bool>,
    },

    /// Upload a file from a local path.
    #[clap(name = "local_upload", alias = "local-upload")]
    LocalUpload {
        /// Bucket to upload to (defaults to the default bucket)
        #[clap(long)]
        bucket: Option<String>,

        /// MIME type to store with the file
        #[clap(long)]
        content_type: Option<String>,
    },

    /// Upload a file from a remote URL.
    #[clap(name = "remote_upload", alias = "remote-upload")]
    RemoteUpload {
        /// Bucket to upload to (defaults to the default bucket)
        #[clap(long)]
        bucket: Option<String>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Configure { .. } => "configure",
            Commands::LocalUpload { .. } => "local_upload",
            Commands::RemoteUpload { .. } => "remote_upload",
        }
    }
}

pub fn log_level(verbose: u8) -> tracing::Level {
    match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

/// Installs the stderr `fmt` subscriber.
pub fn init_tracing(verbose: u8) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level(verbose))
        .with_target(false)
        .init();
}

/// Message for a failed run, colored when `color` is set.
pub fn failure_message(err: &anyhow::Error, color: bool) -> String {
    let (text, tint) = match err.downcast_ref::<commands::CommandFailed>() {
        Some(failed) => (failed.message.clone(), failed.color),
        None => (format!("{err:#}"), Color::Red),
    };
    if color {
        paint(&text, tint)
    } else {
        text
    }
}

/// Async CLI entrypoint for main(): wires the real B2 client and terminal I/O.
pub async fn run(cli: Cli) -> Result<()> {
    let store = ConfigStore::new(match &cli.config_dir {
        Some(dir) => dir.clone(),
        None => paths::config_dir()?,
    });
    let storage = B2Client::new();
    let mut console = Console::stdio(std::io::stdout().is_terminal());
    let mut progress = TerminalProgress::stderr();
    run_with(cli.command, &store, &storage, &mut console, &mut progress).await
}

/// Runs one command against injected collaborators.
pub async fn run_with<S, P, W, Q>(
    command: Commands,
    store: &ConfigStore,
    storage: &S,
    console: &mut Console<P, W>,
    progress: &mut Q,
) -> Result<()>
where
    S: Storage + ?Sized,
    P: Prompt,
    W: Write,
    Q: Progress + ?Sized,
{
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");
    let name = command.name();
    tracing::info!(command = name, config_dir = %store.root().display(), "Running command");

    let result = match command {
        Commands::Configure {
            set_default,
            use_domain,
        } => commands::configure(store, storage, console, set_default, use_domain).await,
        Commands::LocalUpload {
            bucket,
            content_type,
        } => {
            commands::local_upload(
                store,
                storage,
                console,
                bucket.as_deref(),
                content_type.as_deref(),
            )
            .await
        }
        Commands::RemoteUpload { bucket } => {
            let fetcher = RemoteFetcher::new();
            commands::remote_upload(store, storage, &fetcher, console, progress, bucket.as_deref())
                .await
        }
    };

    match &result {
        Ok(()) => tracing::info!(command = name, "Command complete"),
        Err(e) => tracing::warn!(command = name, error = %e, "Command failed"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_underscore_and_hyphen_names() {
        let cli = Cli::try_parse_from(["bbup", "local_upload", "--bucket", "photos"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::LocalUpload { bucket: Some(ref b), content_type: None } if b == "photos"
        ));

        let cli = Cli::try_parse_from(["bbup", "remote-upload"]).unwrap();
        assert!(matches!(cli.command, Commands::RemoteUpload { bucket: None }));
    }

    #[test]
    fn configure_flags_are_optional_booleans() {
        let cli = Cli::try_parse_from(["bbup", "configure"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Configure { set_default: None, use_domain: None }
        ));

        let cli =
            Cli::try_parse_from(["bbup", "configure", "--set-default", "--use-domain=false"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Configure { set_default: Some(true), use_domain: Some(false) }
        ));
    }

    #[test]
    fn global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["bbup", "configure", "-vv", "--config-dir", "/tmp/x"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/x")));
        assert_eq!(log_level(cli.verbose), tracing::Level::DEBUG);
    }

    #[test]
    fn failure_message_keeps_command_color() {
        let err: anyhow::Error = commands::CommandFailed::yellow("File upload failed.").into();
        assert_eq!(failure_message(&err, false), "File upload failed.");
        assert_eq!(failure_message(&err, true), "\x1b[33mFile upload failed.\x1b[0m");

        let other = anyhow::anyhow!("boom");
        assert_eq!(failure_message(&other, true), "\x1b[31mboom\x1b[0m");
    }
}
