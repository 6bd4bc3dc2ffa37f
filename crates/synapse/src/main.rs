//! Just `main()`. Keep as small as possible.

pub mod animation;
pub mod cli_args;
/// All the user-configurable settings, and what's remembered between runs.
pub mod config {
    pub mod main;
    pub mod persisted;
}
pub mod keybindings;
pub mod raw_input;
pub mod renderer;
pub mod run;
pub mod shared_state;
pub mod surface;

use color_eyre::eyre::Result;

#[expect(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "It's our central place for communicating with the user on CLI"
)]
#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let (protocol_tx, _) = tokio::sync::broadcast::channel(64);
    let state_arc = shared_state::SharedState::init(protocol_tx);
    let result = run::run(&std::sync::Arc::clone(&state_arc)).await;

    let logpath = state_arc.config.read().await.log_path.clone();
    let is_logging = *state_arc.is_logging.read().await;
    tracing::debug!("Synapse is exiting");

    match result {
        Ok(()) => {
            if is_logging {
                println!("Logs saved to {}", logpath.display());
            }
        }
        Err(error) => {
            tracing::error!("{error:?}");
            eprintln!("Error: {error}");
            if is_logging {
                eprintln!("See {} for more details", logpath.display());
            }
        }
    }

    Ok(())
}
