//! Main entrypoint for running Synapse

use std::sync::Arc;

use clap::Parser as _;
use color_eyre::eyre::{ContextCompat as _, Result};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, Layer as _};

use crate::animation::Animation;
use crate::cli_args::CliArgs;
use crate::config::persisted::Persisted;
use crate::raw_input::RawInput;
use crate::renderer::Renderer;
use crate::shared_state::SharedState;

/// How many finished frames can queue up before the animation waits for the renderer.
const FRAME_BUFFER_SIZE: usize = 8;

/// Commands to control the various tasks/threads
#[non_exhaustive]
#[derive(Clone, Debug)]
pub(crate) enum Protocol {
    /// The entire application is exiting.
    End,
    /// User's TTY is resized.
    Resize {
        /// Width of new terminal.
        width: u16,
        /// Height of new terminal.
        height: u16,
    },
    /// A known keybinding was pressed.
    KeybindEvent(crate::keybindings::KeybindingAction),
    /// Synapse's configuration, sent whenever the config file changes.
    Config(crate::config::main::Config),
}

/// Main entrypoint
pub(crate) async fn run(state_arc: &std::sync::Arc<SharedState>) -> Result<()> {
    let protocol_tx = state_arc.protocol_tx.clone();
    let cli_args = setup(state_arc).await?;

    let directory = crate::config::main::Config::directory(state_arc).await;
    let persisted = Persisted::load_or_default(&directory);
    let configured_theme = state_arc.config.read().await.theme;
    let theme =
        crate::config::persisted::initial_theme(cli_args.theme, &persisted, configured_theme);

    let (surfaces_tx, surfaces_rx) = tokio::sync::mpsc::channel(FRAME_BUFFER_SIZE);
    let renderer = Renderer::start(Arc::clone(state_arc), surfaces_rx, protocol_tx.clone());
    let config_handle = crate::config::main::Config::watch(Arc::clone(state_arc));
    let input_thread_handle = RawInput::start(protocol_tx.clone());

    override_on_panic_behaviour();
    let animation_handle =
        Animation::start(Arc::clone(state_arc), surfaces_tx, theme, cli_args.seed);

    let animation_result = animation_handle.await;
    tracing::debug!("🏁 left animation task, exiting Synapse...");
    broadcast_protocol_end(&protocol_tx);
    animation_result??;

    if input_thread_handle.is_finished() {
        // The STDIN loop blocks on reads, so it can't hear the protocol's `End`. Therefore we
        // only join it if it finished of its own accord.
        input_thread_handle
            .join()
            .map_err(|err| color_eyre::eyre::eyre!("STDIN handle: {err:?}"))??;
    }
    renderer.await??;
    config_handle.await??;

    tracing::trace!("Leaving Synapse's main `run()` function");
    Ok(())
}

/// The default behaviour prints all panics to the CLI, which gets lost behind the alternate
/// screen. `set_hook` changes behaviour globally, so it's called as late as possible, after
/// startup errors have had their chance to be printed normally.
fn override_on_panic_behaviour() {
    std::panic::set_hook(Box::new(|info| {
        let message = if let Some(message) = info.payload().downcast_ref::<String>() {
            message
        } else if let Some(message) = info.payload().downcast_ref::<&str>() {
            message
        } else {
            "Caught a panic with an unknown type."
        };
        let location = match info.location() {
            Some(location) => format!(
                "{}@{}:{}",
                location.file(),
                location.line(),
                location.column()
            ),
            None => "Unknown location".to_owned(),
        };
        tracing::error!("Caught panic ({}): {message:?}", location);
    }));
}

/// Signal all task/thread loops to exit.
///
/// We keep it in its own function because the error needs handling separately. If it were
/// bubbled with `?` it might never be logged, because the `End` signal is itself what allows the
/// central error handler to be reached.
pub(crate) fn broadcast_protocol_end(protocol_tx: &tokio::sync::broadcast::Sender<Protocol>) {
    tracing::debug!("Broadcasting the protocol `End` message to all listeners");
    let result = protocol_tx.send(Protocol::End);
    if let Err(error) = result {
        tracing::error!("{error:?}");
    }
}

/// Prepare the application to start.
async fn setup(state: &std::sync::Arc<SharedState>) -> Result<CliArgs> {
    let cli_args = CliArgs::parse();

    let mut main_config_file = state.main_config_file.write().await;
    (*main_config_file).clone_from(&cli_args.main_config);
    drop(main_config_file);

    let directory_result =
        crate::config::main::Config::setup_directory(cli_args.config_dir.clone(), state).await;
    if let Err(directory_error) = directory_result {
        color_eyre::eyre::bail!("Error setting up config directory: {directory_error:?}");
    }

    let config_result = crate::config::main::Config::load_config_into_shared_state(state).await;
    if let Err(config_error) = config_result {
        let path = crate::config::main::Config::main_config_path(state).await;
        color_eyre::eyre::bail!(
            "Bad config file: {config_error:?}\n\nConfig path: {}",
            path.display()
        );
    }

    setup_logging(cli_args.clone(), state).await?;

    tracing::info!("Starting Synapse");
    tracing::debug!("Loaded config: {:?}", state.config.read().await);

    let tty_size = Renderer::get_users_tty_size()?;
    state
        .set_tty_size(tty_size.cols.try_into()?, tty_size.rows.try_into()?)
        .await;

    Ok(cli_args)
}

/// Setup logging
async fn setup_logging(cli_args: CliArgs, state: &std::sync::Arc<SharedState>) -> Result<()> {
    let are_log_filters_manually_set = std::env::var("SYNAPSE_LOG").is_ok();
    let mut path = state.config.read().await.log_path.clone();

    if let Some(cli_override_path) = cli_args.log_path {
        path = cli_override_path;
    }

    let mut level = state.config.read().await.log_level.clone();
    if let Some(cli_override_level) = cli_args.log_level {
        level = cli_override_level;
    }
    let level_as_string = format!("{level:?}").to_lowercase();

    let is_loggable =
        !matches!(level, crate::config::main::LogLevel::Off) || are_log_filters_manually_set;

    if !is_loggable {
        return Ok(());
    }

    let directory = path.parent().context("Couldn't get log path's parent")?;
    std::fs::create_dir_all(directory)?;
    let file = std::fs::File::create(&path)?;

    let filters = if are_log_filters_manually_set {
        tracing_subscriber::EnvFilter::builder()
            .with_default_directive("error".parse()?)
            .with_env_var("SYNAPSE_LOG")
            .from_env_lossy()
    } else {
        tracing_subscriber::EnvFilter::builder()
            .with_default_directive("off".parse()?)
            .from_env_lossy()
            .add_directive(format!("synapse={level_as_string}").parse()?)
            .add_directive(format!("particle_network={level_as_string}").parse()?)
    };

    let logfile_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_filter(filters);

    tracing_subscriber::registry().with(logfile_layer).init();

    state.config.write().await.log_path = path;
    let mut is_logging = state.is_logging.write().await;
    *is_logging = true;
    drop(is_logging);

    Ok(())
}
