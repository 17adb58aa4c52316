use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(author, version, about)]
#[command(long_about = "A slideshow driver with scripted transitions.\n\n\
    Slides are written in a small line-oriented markup and presented\n\
    with animated transitions. The deck reloads live when its file changes.\n\n\
    Examples:\n  \
    stagehand talk.pin                  Present fullscreen\n  \
    stagehand talk.pin --windowed       Present in a window\n  \
    stagehand talk.pin --http-port 8080 Accept remote control over HTTP")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Deck file to present
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Present in a 1280x720 window rather than fullscreen
    #[arg(long)]
    pub windowed: bool,

    /// Slide to open at, counting from 1
    #[arg(long)]
    pub slide: Option<usize>,

    /// Serve the HTTP remote control on this port
    #[arg(long)]
    pub http_port: Option<u16>,

    /// Require this password (user "stagehand") for the HTTP remote
    #[arg(long)]
    pub password: Option<String>,

    /// Extra directory to search for transition descriptions
    #[arg(long)]
    pub transitions_dir: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Plain output without ANSI colors
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect or change stored settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Print a shell completion script
    Completion {
        /// Shell to generate for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print the version
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the current settings
    Show,

    /// Change one setting
    Set {
        /// Configuration key (e.g. defaults.windowed, remote.http_port)
        key: String,

        /// New value
        value: String,
    },
}

#[derive(Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl Cli {
    /// Default log filter for the verbosity flags.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }

    pub fn run(mut self) -> anyhow::Result<()> {
        match self.command.take() {
            None => self.present(),
            Some(Commands::Config { command }) => crate::commands::config::run(command),
            Some(Commands::Completion { shell }) => {
                crate::commands::completion::run(shell);
                Ok(())
            }
            Some(Commands::Version) => {
                println!("stagehand {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }

    fn present(self) -> anyhow::Result<()> {
        let Some(file) = self.file else {
            use clap::CommandFactory;
            Self::command().print_long_help()?;
            return Ok(());
        };
        if !file.is_file() {
            anyhow::bail!("No deck at {}", file.display());
        }
        crate::app::run(crate::app::RunOptions {
            file,
            windowed: self.windowed,
            slide: self.slide,
            http_port: self.http_port,
            password: self.password,
            transitions_dir: self.transitions_dir,
        })
    }
}
