//! All the CLI arguments for Synapse

use particle_network::Theme;

/// The name of the main config file when one isn't given on the CLI.
pub(crate) const DEFAULT_CONFIG_FILE_NAME: &str = "synapse.toml";

/// A drifting particle network for your terminal.
///
/// Keys: `t` toggles the theme, `space` or `p` pauses and `q`, `Esc` or `Ctrl-C` quits.
#[derive(clap::Parser, Debug, Clone)]
#[command(version, about)]
#[non_exhaustive]
pub(crate) struct CliArgs {
    /// Start with this theme, ignoring whatever was used last time: "dark" or "light".
    #[arg(short, long)]
    pub theme: Option<Theme>,

    /// Seed the random number generator to get the same animation every time.
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Use an alternative config directory.
    #[arg(long)]
    pub config_dir: Option<std::path::PathBuf>,

    /// Use an alternative main config file, relative to the config directory.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE_NAME)]
    pub main_config: std::path::PathBuf,

    /// Where to write logs.
    #[arg(long)]
    pub log_path: Option<std::path::PathBuf>,

    /// The maximum log level.
    #[arg(long, value_enum)]
    pub log_level: Option<crate::config::main::LogLevel>,
}
