//! The task that drives the particle network, one frame at a time.

use std::sync::Arc;
use std::time::Instant;

use color_eyre::eyre::Result;
use particle_network::{Colour, FrameQueue, Theme, ThemedNetwork};

use crate::config::persisted::Persisted;
use crate::keybindings::KeybindingAction;
use crate::run::Protocol;
use crate::shared_state::SharedState;
use crate::surface::TerminalCanvas;

/// The number of microseonds in a second
const ONE_MICROSECOND: u64 = 1_000_000;

/// Light mode needs a light background, whatever the terminal's own background is. Slate 50.
const LIGHT_BACKDROP: Colour = Colour::new(248, 250, 252);

/// Owns the particle network and sends each new frame to the renderer.
pub(crate) struct Animation {
    /// Shared app state
    state: Arc<SharedState>,
    /// The particle network, rebuilt whenever the theme or config changes.
    network: ThemedNetwork<TerminalCanvas, FrameQueue>,
    /// A seed from the CLI, which beats any seed in the config.
    seed_override: Option<u64>,
    /// The target frame rate.
    frame_rate: u32,
    /// The time at which the previous frame was rendered.
    last_frame_tick: Instant,
    /// Where finished frames are sent.
    output: tokio::sync::mpsc::Sender<termwiz::surface::Surface>,
}

impl Animation {
    /// Instantiate
    async fn new(
        state: Arc<SharedState>,
        output: tokio::sync::mpsc::Sender<termwiz::surface::Surface>,
        theme: Theme,
        seed_override: Option<u64>,
    ) -> Self {
        let config = state.config.read().await.clone();
        let tty_size = state.get_tty_size().await;
        let canvas = TerminalCanvas::new(tty_size.width, tty_size.height, config.pixel_density);

        let mut animation = Self {
            state,
            network: ThemedNetwork::new(
                Some(canvas),
                FrameQueue::new(),
                Self::presets(&config, seed_override),
                theme,
                Instant::now(),
            ),
            seed_override,
            frame_rate: config.frame_rate,
            last_frame_tick: Instant::now(),
            output,
        };
        animation.apply_backdrop(theme);
        animation
    }

    /// Our main entrypoint.
    pub fn start(
        state: Arc<SharedState>,
        output: tokio::sync::mpsc::Sender<termwiz::surface::Surface>,
        theme: Theme,
        seed_override: Option<u64>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        let protocol_tx = state.protocol_tx.clone();
        let mut protocol = protocol_tx.subscribe();

        tokio::spawn(async move {
            let mut animation = Self::new(state, output, theme, seed_override).await;
            tracing::debug!("Starting animation loop with the {theme} theme");

            #[expect(
                clippy::integer_division_remainder_used,
                reason = "This is caused by the `tokio::select!`"
            )]
            loop {
                tokio::select! {
                    () = animation.sleep_until_next_frame_tick() => {
                        animation.render().await;
                    },
                    Ok(message) = protocol.recv() => {
                        if matches!(message, Protocol::End) {
                            break;
                        }
                        animation.handle_protocol_message(message).await;
                    }
                }
            }

            tracing::debug!("Leaving animation loop");
            Ok(())
        })
    }

    /// The particle network presets, with any seed from the CLI applied.
    fn presets(
        config: &crate::config::main::Config,
        seed_override: Option<u64>,
    ) -> particle_network::Presets {
        let mut presets = config.presets();
        if seed_override.is_some() {
            presets.set_seed(seed_override);
        }
        presets
    }

    /// Light mode gets its own background, dark mode uses the terminal's.
    fn apply_backdrop(&mut self, theme: Theme) {
        let backdrop = match theme {
            Theme::Dark => None,
            Theme::Light => Some(LIGHT_BACKDROP),
        };
        if let Some(canvas) = self.network.canvas_mut() {
            canvas.set_backdrop(backdrop);
        }
    }

    /// React to everything else that's happening in the app.
    async fn handle_protocol_message(&mut self, message: Protocol) {
        tracing::trace!("Animation received protocol message: {message:?}");
        let now = Instant::now();

        match message {
            Protocol::Resize { width, height } => {
                if let Some(canvas) = self.network.canvas_mut() {
                    canvas.set_container(width, height);
                }
                self.network.on_resize(now);
            }
            Protocol::KeybindEvent(action) => self.handle_keybinding(action, now).await,
            Protocol::Config(config) => {
                self.frame_rate = config.frame_rate;
                if let Some(canvas) = self.network.canvas_mut() {
                    canvas.set_pixel_density(config.pixel_density);
                }
                self.network
                    .reconfigure(Self::presets(&config, self.seed_override), now);
            }
            Protocol::End => (),
        }
    }

    /// Do whatever the user asked for.
    async fn handle_keybinding(&mut self, action: KeybindingAction, now: Instant) {
        match action {
            KeybindingAction::ToggleTheme => {
                let theme = self.network.toggle_theme(now);
                self.apply_backdrop(theme);

                let directory = crate::config::main::Config::directory(&self.state).await;
                if let Err(error) = Persisted::save_theme(&directory, theme) {
                    tracing::error!("Couldn't save the theme: {error:?}");
                }
            }
            KeybindingAction::TogglePause => {
                let is_visible = !self.network.is_visible();
                tracing::debug!("Animation {}", if is_visible { "resumed" } else { "paused" });
                self.network.set_visible(is_visible);
            }
            KeybindingAction::Quit => (),
        }
    }

    /// Sleep until the next frame render is due.
    async fn sleep_until_next_frame_tick(&mut self) {
        let target = ONE_MICROSECOND.wrapping_div(self.frame_rate.max(1).into());
        let target_frame_rate_micro = std::time::Duration::from_micros(target);
        if let Some(wait) = target_frame_rate_micro.checked_sub(self.last_frame_tick.elapsed()) {
            tokio::time::sleep(wait).await;
        }
        self.last_frame_tick = Instant::now();
    }

    /// One frame of the animation. Nothing is sent when nothing was drawn, so pausing leaves the
    /// last frame on screen.
    async fn render(&mut self) {
        if !self.network.tick(Instant::now()) {
            return;
        }
        let Some(canvas) = self.network.canvas() else {
            return;
        };

        let surface = canvas.to_termwiz();
        if self.output.send(surface).await.is_err() {
            tracing::debug!("Renderer isn't listening for frames");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    async fn animation(
        directory: &std::path::Path,
    ) -> (Animation, tokio::sync::mpsc::Receiver<termwiz::surface::Surface>) {
        let (protocol_tx, _) = tokio::sync::broadcast::channel(8);
        let state = SharedState::init(protocol_tx);
        *state.config_path.write().await = directory.to_path_buf();
        state.set_tty_size(20, 10).await;

        let (output, frames) = tokio::sync::mpsc::channel(8);
        let animation = Animation::new(state, output, Theme::Dark, Some(1)).await;
        (animation, frames)
    }

    #[tokio::test]
    async fn frames_are_sent_once_the_network_is_built() {
        let directory = tempfile::tempdir().unwrap();
        let (mut animation, mut frames) = animation(directory.path()).await;

        tokio::time::sleep(particle_network::theme::SETTLE_DELAY).await;
        animation.render().await;

        let mut frame = frames.try_recv().unwrap();
        assert_eq!(frame.dimensions(), (20, 10));
        let is_drawn = frame
            .screen_cells()
            .iter()
            .flat_map(|line| line.iter())
            .any(|cell| cell.str() == "▀" || cell.str() == "▄");
        assert!(is_drawn);
    }

    #[tokio::test]
    async fn toggling_the_theme_is_remembered() {
        let directory = tempfile::tempdir().unwrap();
        let (mut animation, _frames) = animation(directory.path()).await;

        animation
            .handle_protocol_message(Protocol::KeybindEvent(KeybindingAction::ToggleTheme))
            .await;

        assert_eq!(animation.network.theme(), Theme::Light);
        assert_eq!(
            Persisted::load(directory.path()).unwrap().theme,
            Some(Theme::Light)
        );
    }

    #[tokio::test]
    async fn pausing_stops_frames() {
        let directory = tempfile::tempdir().unwrap();
        let (mut animation, mut frames) = animation(directory.path()).await;
        tokio::time::sleep(particle_network::theme::SETTLE_DELAY).await;

        animation
            .handle_protocol_message(Protocol::KeybindEvent(KeybindingAction::TogglePause))
            .await;
        animation.render().await;
        assert!(frames.try_recv().is_err());

        animation
            .handle_protocol_message(Protocol::KeybindEvent(KeybindingAction::TogglePause))
            .await;
        animation.render().await;
        assert!(frames.try_recv().is_ok());
    }

    #[tokio::test]
    async fn resizes_reach_the_canvas() {
        let directory = tempfile::tempdir().unwrap();
        let (mut animation, _frames) = animation(directory.path()).await;

        animation
            .handle_protocol_message(Protocol::Resize {
                width: 30,
                height: 4,
            })
            .await;
        tokio::time::sleep(particle_network::theme::SETTLE_DELAY).await;
        animation.render().await;

        let dimensions = animation.network.canvas().map(TerminalCanvas::dimensions);
        assert_eq!(dimensions, Some((30, 8)));
    }
}
