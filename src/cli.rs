use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "delos-dl")]
#[command(about = "Download recorded lectures from Delos into per-course directories")]
#[command(long_about = "
delos-dl fetches the presentation metadata behind Delos player links, works out
the course and lecture title, and downloads the MP4 recordings into one
directory per course. Up to five videos are downloaded at the same time.

Examples:
  delos-dl download --urls https://delos.uoa.gr/opendelos/player?rid=ab12cd34
  delos-dl download --file links.txt -o ~/lectures
  delos-dl download                  # paste URLs, finish with Ctrl+D
  delos-dl config show
")]
#[command(version)]
pub struct Cli {
    /// Override config file path
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download lecture videos
    #[command(visible_alias = "dl")]
    Download {
        /// Delos player or show URLs
        #[arg(short, long, num_args = 1.., value_name = "URL")]
        #[arg(help = "Space-separated list of Delos URLs to download")]
        urls: Vec<String>,

        /// File containing URLs, one per line
        #[arg(short, long, value_name = "FILE")]
        #[arg(help = "Path to a text file containing URLs, one per line")]
        file: Option<String>,

        /// Base output directory
        #[arg(short, long, value_name = "DIR")]
        #[arg(help = "Base output directory (defaults to general.output_dir)")]
        output: Option<String>,

        /// Maximum concurrent downloads
        #[arg(short = 'j', long, value_name = "N")]
        #[arg(help = "Maximum concurrent downloads (defaults to general.max_concurrent_downloads)")]
        max_concurrent: Option<u8>,
    },

    /// Manage configuration
    #[command(visible_alias = "cfg")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format
        #[arg(short, long, value_enum, default_value = "toml")]
        #[arg(help = "Output format")]
        format: ConfigFormat,
    },

    /// Print the config file location
    Path,

    /// Validate configuration
    #[command(visible_alias = "check")]
    Validate,

    /// Create sample configuration
    Sample {
        /// Output file (defaults to config.sample.toml next to the config)
        #[arg(short, long, value_name = "FILE")]
        #[arg(help = "Output file path")]
        output: Option<String>,

        /// Overwrite existing file
        #[arg(short, long)]
        #[arg(help = "Overwrite existing file")]
        force: bool,
    },

    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        #[arg(help = "Skip confirmation prompt")]
        yes: bool,
    },
}

#[derive(clap::ValueEnum, Clone, Debug)]
pub enum ConfigFormat {
    /// TOML format (default)
    Toml,
    /// JSON format
    Json,
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigFormat::Toml => write!(f, "toml"),
            ConfigFormat::Json => write!(f, "json"),
        }
    }
}

impl Cli {
    /// Validate CLI arguments and show helpful error messages
    pub fn validate(&self) -> Result<(), String> {
        if let Commands::Download {
            max_concurrent: Some(n),
            ..
        } = &self.command
        {
            if *n == 0 || *n > 16 {
                return Err("Max concurrent downloads must be between 1 and 16".to_string());
            }
        }
        Ok(())
    }
}
