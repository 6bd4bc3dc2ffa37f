//! Here we store all the shared data that the app's tasks might use.
//! Access is mediated with locks to support asynchronicity

use std::sync::Arc;

use tokio::sync::RwLock;

/// The size of the user's terminal
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[expect(
    clippy::exhaustive_structs,
    reason = "It's very unlikely that this is going to have any more fields added to it"
)]
pub struct TTYSize {
    /// Width of the TTY
    pub width: u16,
    /// Height of the TTY
    pub height: u16,
}

/// All the shared data the app uses
#[non_exhaustive]
pub(crate) struct SharedState {
    /// The channel on which all protocol messages are sent.
    pub protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    /// Location of the config directory.
    pub config_path: RwLock<std::path::PathBuf>,
    /// Name of the main config file.
    pub main_config_file: RwLock<std::path::PathBuf>,
    /// User config
    pub config: RwLock<crate::config::main::Config>,
    /// Just the size of the user's terminal. The animation canvas follows this.
    pub tty_size: RwLock<TTYSize>,
    /// Is the application logging?
    pub is_logging: RwLock<bool>,
}

impl SharedState {
    /// Initialise the shared state
    pub fn init(protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>) -> Arc<Self> {
        let state = Self {
            protocol_tx,
            config_path: RwLock::default(),
            main_config_file: RwLock::new(crate::cli_args::DEFAULT_CONFIG_FILE_NAME.into()),
            config: RwLock::default(),
            tty_size: RwLock::default(),
            is_logging: RwLock::default(),
        };

        Arc::new(state)
    }

    /// Get a read lock and return the current TTY size
    pub async fn get_tty_size(&self) -> TTYSize {
        let tty_size = self.tty_size.read().await;
        *tty_size
    }

    /// Get a write lock and set the a new TTY size
    pub async fn set_tty_size(&self, width: u16, height: u16) {
        let mut tty_size = self.tty_size.write().await;
        *tty_size = TTYSize { width, height };
    }
}
