pub mod config;
pub mod download;

use crate::cli::{Commands, ConfigAction};

pub use config::handle_config;
pub use download::handle_download;

/// Check if config validation should be skipped for certain commands
pub fn should_skip_config_validation(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Config {
            action: ConfigAction::Validate
                | ConfigAction::Reset { .. }
                | ConfigAction::Path
                | ConfigAction::Show { .. }
        }
    )
}
