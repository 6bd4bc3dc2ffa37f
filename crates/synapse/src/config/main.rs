//! All of the user config for Synapse.

use color_eyre::eyre::ContextCompat as _;
use color_eyre::eyre::Result;
use particle_network::{Presets, Theme};

/// A copy of the default config file. It gets copied to the user's config folder the first time
/// they start Synapse.
static DEFAULT_CONFIG: &str = include_str!("../../default_config.toml");

/// The valid log levels. Based on our `tracing` crate.
#[derive(serde::Serialize, serde::Deserialize, clap::ValueEnum, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum LogLevel {
    /// Error
    Error,
    /// Warnings
    Warn,
    /// Info
    Info,
    /// Debug
    Debug,
    /// Trace
    Trace,
    /// No logging
    Off,
}

/// Managing user config.
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub(crate) struct Config {
    /// The maximum log level
    pub log_level: LogLevel,
    /// The location of the log file.
    pub log_path: std::path::PathBuf,
    /// Target frame rate
    pub frame_rate: u32,
    /// How many of the particle network's units fit into a single terminal pixel.
    pub pixel_density: f32,
    /// The theme to start with when none was saved by a previous run.
    pub theme: Theme,
    /// A random seed shared by both themes.
    pub seed: Option<u64>,
    /// The particle network in dark mode
    pub dark: particle_network::Config,
    /// The particle network in light mode
    pub light: particle_network::Config,
}

impl Default for Config {
    fn default() -> Self {
        let log_directory = match dirs::state_dir() {
            Some(directory) => directory,
            None => std::path::PathBuf::new().join("./"),
        };
        let log_path = log_directory.join("synapse").join("synapse.log");

        Self {
            log_level: LogLevel::Off,
            log_path,
            frame_rate: 60,
            pixel_density: 6.0,
            theme: Theme::default(),
            seed: None,
            dark: particle_network::Config::for_theme(Theme::Dark),
            light: particle_network::Config::for_theme(Theme::Light),
        }
    }
}

impl Config {
    /// The particle network config for each theme.
    pub fn presets(&self) -> Presets {
        let mut presets = Presets::new(self.dark.clone(), self.light.clone());
        if self.seed.is_some() {
            presets.set_seed(self.seed);
        }
        presets
    }

    /// Canonical path to the config directory.
    pub async fn directory(
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> std::path::PathBuf {
        state.config_path.read().await.clone()
    }

    /// Get the stable location of Synapse's config directory on the user's system.
    pub fn default_directory() -> Result<std::path::PathBuf> {
        Ok(dirs::config_dir()
            .context("Couldn't get standard config directory")?
            .join("synapse"))
    }

    /// Figure out where our config is being stored, and create the directory if needed.
    pub async fn setup_directory(
        maybe_custom_path: Option<std::path::PathBuf>,
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> Result<()> {
        let path = match maybe_custom_path {
            None => Self::default_directory()?,
            Some(path_string) => std::path::PathBuf::new().join(path_string),
        };

        std::fs::create_dir_all(path.clone())?;
        *state.config_path.write().await = path;

        Ok(())
    }

    /// Canonical path to the main config file.
    pub async fn main_config_path(
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> std::path::PathBuf {
        let directory = Self::directory(state).await;
        let main_config_file = state.main_config_file.read().await.clone();
        directory.join(main_config_file)
    }

    /// Load the main config
    pub async fn load(state: &std::sync::Arc<crate::shared_state::SharedState>) -> Result<Self> {
        let config_path = Self::main_config_path(state).await;
        let config_file_name = config_path
            .file_name()
            .context("Couldn't get file name from config path")?;
        let is_default_config = config_file_name == crate::cli_args::DEFAULT_CONFIG_FILE_NAME;
        if is_default_config && !config_path.exists() {
            std::fs::write(config_path.clone(), DEFAULT_CONFIG)?;
        }

        tracing::info!("(Re)loading the main Synapse config from: {config_path:?}");
        let result = std::fs::read_to_string(config_path.clone());
        match result {
            Ok(data) => {
                tracing::trace!("Using config file:\n{data}");
                let config = toml::from_str::<Self>(&data)?;
                Ok(config)
            }
            Err(err) => {
                tracing::error!("Loading config: {err:?}");
                color_eyre::eyre::bail!(
                    "Couldn't load config at {config_path:?}: {}",
                    err.to_string()
                );
            }
        }
    }

    /// Load the main config
    pub async fn load_config_into_shared_state(
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> Result<Self> {
        let mut config_state = state.config.write().await;
        let new_config = Self::load(state).await?;
        *config_state = new_config.clone();
        drop(config_state);

        Ok(new_config)
    }

    /// Watch the config file for any changes and then automatically update the shared state with
    /// the contents of the new config file.
    pub fn watch(
        state: std::sync::Arc<crate::shared_state::SharedState>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move {
            let path = Self::directory(&state).await;
            tracing::debug!("Watching config ({path:?}) for changes.");

            let (config_file_change_tx, mut config_file_change_rx) = tokio::sync::mpsc::channel(1);
            let mut protocol_rx = state.protocol_tx.subscribe();

            let mut debouncer = notify_debouncer_full::new_debouncer(
                std::time::Duration::from_millis(100),
                None,
                move |result: notify_debouncer_full::DebounceEventResult| match result {
                    Ok(events) => {
                        for event in events {
                            let send_result = config_file_change_tx.blocking_send(event.clone());
                            if let Err(error) = send_result {
                                tracing::error!(
                                    "Sending config file watcher notification: {error:?}"
                                );
                            }
                        }
                    }
                    Err(error) => tracing::error!("File watcher: {error:?}"),
                },
            )?;
            debouncer.watch(
                &path,
                notify_debouncer_full::notify::RecursiveMode::NonRecursive,
            )?;

            #[expect(
                clippy::integer_division_remainder_used,
                reason = "This is caused by the `tokio::select!`"
            )]
            loop {
                tokio::select! {
                    Some(event) = config_file_change_rx.recv() => {
                        Self::handle_file_change_event(event, &state).await;
                    },
                    Ok(message) = protocol_rx.recv() => {
                        if matches!(message, crate::run::Protocol::End) {
                            break;
                        }
                    }
                }
            }

            tracing::debug!("Leaving config watcher loop");
            Ok(())
        })
    }

    /// Handle an event from the config file watcher. Only data changes to the main config file
    /// are of interest, not least because the persisted theme lives in the same directory.
    async fn handle_file_change_event(
        event: notify_debouncer_full::DebouncedEvent,
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) {
        use notify_debouncer_full::notify::event as notify_event;
        let notify_event::EventKind::Modify(kind) = event.kind else {
            return;
        };
        let notify_event::ModifyKind::Data(_) = kind else {
            return;
        };

        let main_config_file = state.main_config_file.read().await.clone();
        let is_main_config = event
            .paths
            .iter()
            .any(|path| path.file_name() == main_config_file.file_name());
        if !is_main_config {
            return;
        }

        tracing::debug!(
            "Config file change detected ({:?}), updating shared state.",
            event.paths
        );

        match Self::load_config_into_shared_state(state).await {
            Ok(config) => {
                state
                    .protocol_tx
                    .send(crate::run::Protocol::Config(config))
                    .unwrap_or_else(|send_error| {
                        tracing::error!(
                            "Couldn't send config update on protocol channel: {send_error:?}"
                        );
                        0
                    });
            }
            Err(error) => {
                tracing::error!(
                    "Config update error, keeping the previous config: {}",
                    error.root_cause()
                );
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    async fn state_in(
        directory: &std::path::Path,
    ) -> std::sync::Arc<crate::shared_state::SharedState> {
        let (protocol_tx, _) = tokio::sync::broadcast::channel(8);
        let state = crate::shared_state::SharedState::init(protocol_tx);
        Config::setup_directory(Some(directory.to_path_buf()), &state)
            .await
            .unwrap();
        state
    }

    #[test]
    fn default_config_file_matches_the_defaults() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        let defaults = Config::default();

        assert_eq!(config.log_level, LogLevel::Off);
        assert_eq!(config.frame_rate, defaults.frame_rate);
        assert!((config.pixel_density - defaults.pixel_density).abs() < f32::EPSILON);
        assert_eq!(config.theme, Theme::Dark);
        assert_eq!(config.seed, None);
        assert_eq!(config.presets(), Presets::default());
    }

    #[test]
    fn partial_config() {
        let config: Config = toml::from_str(
            r#"
                frame_rate = 30
                theme = "light"

                [light]
                particle_count = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.frame_rate, 30);
        assert_eq!(config.theme, Theme::Light);
        assert_eq!(config.dark, particle_network::Config::for_theme(Theme::Dark));
        assert_eq!(config.light.particle_count, 10);
        assert_eq!(
            config.light.max_connections,
            particle_network::Config::default().max_connections
        );
    }

    #[test]
    fn seed_applies_to_both_themes() {
        let config: Config = toml::from_str("seed = 99").unwrap();
        let presets = config.presets();
        assert_eq!(presets.for_theme(Theme::Dark).seed, Some(99));
        assert_eq!(presets.for_theme(Theme::Light).seed, Some(99));
    }

    #[test]
    fn bad_config() {
        assert!(toml::from_str::<Config>("theme = \"sepia\"").is_err());
        assert!(toml::from_str::<Config>("[dark]\nline_colour = \"1, 2\"").is_err());
    }

    #[tokio::test]
    async fn default_config_is_written_on_first_load() {
        let directory = tempfile::tempdir().unwrap();
        let state = state_in(directory.path()).await;

        let config = Config::load_config_into_shared_state(&state).await.unwrap();
        assert!(directory.path().join("synapse.toml").exists());
        assert_eq!(config.frame_rate, 60);
        assert_eq!(*state.config.read().await, config);
    }

    #[tokio::test]
    async fn custom_config_files_are_never_created() {
        let directory = tempfile::tempdir().unwrap();
        let state = state_in(directory.path()).await;
        *state.main_config_file.write().await = "custom.toml".into();

        assert!(Config::load(&state).await.is_err());
        assert!(!directory.path().join("custom.toml").exists());

        std::fs::write(directory.path().join("custom.toml"), "frame_rate = 12").unwrap();
        let config = Config::load(&state).await.unwrap();
        assert_eq!(config.frame_rate, 12);
    }
}
