use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::api::PostType;

#[derive(Parser, Debug)]
#[command(name = "postfeed")]
#[command(about = "Page through community posts from the command line", long_about = None)]
pub struct Cli {
    /// API base URL (overrides POSTFEED_API_BASE_URL and the settings file)
    #[arg(long, value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Access token sent as a bearer token (overrides POSTFEED_TOKEN)
    #[arg(long, value_name = "TOKEN", global = true)]
    pub token: Option<String>,

    /// Custom config directory (default: ~/.config/postfeed)
    #[arg(long, value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Enable verbose logging (prints log path, sets DEBUG level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scroll through the feed and print it (default)
    Browse(BrowseArgs),
    /// List post categories and their ids
    Categories,
    /// Inspect or create the settings file
    Config(ConfigArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct BrowseArgs {
    /// Free-text search
    #[arg(short, long)]
    pub search: Option<String>,

    /// Category id (see `postfeed categories`)
    #[arg(short, long)]
    pub category: Option<String>,

    /// Post type: survey, project, inquiry or fundraiser
    #[arg(short = 't', long = "type")]
    pub post_type: Option<PostType>,

    /// Records per page request
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub page_size: Option<u32>,

    /// Rows visible per scroll step
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub rows: Option<u32>,

    /// Stop after this many posts are loaded
    #[arg(short, long, value_name = "N")]
    pub limit: Option<usize>,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the settings file path
    Path,
    /// Show the effective configuration
    Show,
    /// Write a settings file using the given --base-url
    Init {
        /// Replace an existing settings file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {s}. Use 'text' or 'json'")),
        }
    }
}
