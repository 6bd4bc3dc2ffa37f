//! Render frames of the animation to the user's terminal

use std::sync::Arc;

use color_eyre::eyre::Result;
use tokio::sync::mpsc;

use termwiz::surface::Change as TermwizChange;
use termwiz::surface::Surface as TermwizSurface;
use termwiz::terminal::buffered::BufferedTerminal;
use termwiz::terminal::{ScreenSize, Terminal as TermwizTerminal};

use crate::shared_state::SharedState;

/// How often to check the user's terminal for resizes, even when no frames are arriving.
const RESIZE_CHECK_INTERVAL: std::time::Duration = std::time::Duration::from_millis(100);

/// `Render`
pub(crate) struct Renderer {
    /// Shared app state
    pub state: Arc<SharedState>,
    /// The terminal's width
    pub width: u16,
    /// The terminal's height
    pub height: u16,
}

impl Renderer {
    /// Create a renderer to render to a user's terminal
    pub fn new(state: Arc<SharedState>) -> Result<Self> {
        let size = Self::get_users_tty_size()?;
        Ok(Self {
            state,
            width: size.cols.try_into()?,
            height: size.rows.try_into()?,
        })
    }

    /// Instantiate and run
    pub fn start(
        state: Arc<SharedState>,
        surfaces_rx: mpsc::Receiver<TermwizSurface>,
        protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        let protocol_rx = protocol_tx.subscribe();
        tokio::spawn(async move {
            // This would be much simpler if async closures where stable, because then we could use
            // the `?` syntax.
            match Self::new(Arc::clone(&state)) {
                Ok(mut renderer) => {
                    let result = renderer
                        .run(surfaces_rx, protocol_rx, protocol_tx.clone())
                        .await;

                    if let Err(error) = result {
                        crate::run::broadcast_protocol_end(&protocol_tx);
                        return Err(error);
                    };
                }
                Err(error) => {
                    crate::run::broadcast_protocol_end(&protocol_tx);
                    return Err(error);
                }
            };

            Ok(())
        })
    }

    /// We need this just because I can't figure out how to pass `Box<dyn Terminal>` to
    /// `BufferedTerminal::new()`
    fn get_termwiz_terminal() -> Result<impl TermwizTerminal> {
        let capabilities = termwiz::caps::Capabilities::new_from_env()?;
        Ok(termwiz::terminal::new_terminal(capabilities)?)
    }

    /// Just for initialisation
    pub fn get_users_tty_size() -> Result<ScreenSize> {
        let mut terminal = Self::get_termwiz_terminal()?;
        Ok(terminal.get_screen_size()?)
    }

    /// Get the user's current terminal size and propogate it
    pub async fn handle_resize<T: TermwizTerminal + Send>(
        &mut self,
        terminal: &mut BufferedTerminal<T>,
        protocol_tx: &tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<()> {
        let is_resized = terminal.check_for_resize()?;
        if !is_resized {
            return Ok(());
        }

        terminal.repaint()?;

        let (width, height) = terminal.dimensions();
        self.width = width.try_into()?;
        self.height = height.try_into()?;
        tracing::debug!("User's terminal resized to {}x{}", self.width, self.height);
        self.state.set_tty_size(self.width, self.height).await;
        protocol_tx.send(crate::run::Protocol::Resize {
            width: self.width,
            height: self.height,
        })?;

        Ok(())
    }

    /// Listen for new frames from the animation.
    /// It lives in its own method so that we can catch any errors and ensure that the user's
    /// terminal is always returned to cooked mode.
    async fn run(
        &mut self,
        mut surfaces: mpsc::Receiver<TermwizSurface>,
        mut protocol_rx: tokio::sync::broadcast::Receiver<crate::run::Protocol>,
        protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<()> {
        tracing::debug!("Putting user's terminal into raw mode");
        let mut users_terminal = Self::get_termwiz_terminal()?;
        users_terminal.set_raw_mode()?;
        users_terminal.enter_alternate_screen()?;
        let mut terminal = BufferedTerminal::new(users_terminal)?;
        Self::cursor_visibility(&mut terminal, false)?;

        let result = self
            .render_loop(&mut terminal, &mut surfaces, &mut protocol_rx, &protocol_tx)
            .await;

        tracing::debug!("Setting user's terminal to cooked mode");
        Self::cursor_visibility(&mut terminal, true)?;
        terminal.terminal().exit_alternate_screen()?;
        terminal.terminal().set_cooked_mode()?;

        result
    }

    /// Render every frame that arrives until the protocol says to stop.
    async fn render_loop<T: TermwizTerminal + Send>(
        &mut self,
        terminal: &mut BufferedTerminal<T>,
        surfaces: &mut mpsc::Receiver<TermwizSurface>,
        protocol_rx: &mut tokio::sync::broadcast::Receiver<crate::run::Protocol>,
        protocol_tx: &tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<()> {
        let mut resize_check = tokio::time::interval(RESIZE_CHECK_INTERVAL);

        tracing::debug!("Starting render loop");
        #[expect(
            clippy::integer_division_remainder_used,
            reason = "`tokio::select! generates this.`"
        )]
        loop {
            tokio::select! {
                Some(surface) = surfaces.recv() => {
                    self.handle_resize(terminal, protocol_tx).await?;
                    Self::render(&surface, terminal)?;
                }
                _ = resize_check.tick() => {
                    self.handle_resize(terminal, protocol_tx).await?;
                }
                Ok(message) = protocol_rx.recv() => {
                    if matches!(message, crate::run::Protocol::End) {
                        break;
                    }
                }
            }
        }
        tracing::debug!("Exited render loop");

        Ok(())
    }

    /// Hide/show the cursor in the end user's terminal.
    fn cursor_visibility(
        terminal: &mut BufferedTerminal<impl TermwizTerminal>,
        is_visible: bool,
    ) -> Result<()> {
        let cursor_visibility = if is_visible {
            termwiz::surface::CursorVisibility::Visible
        } else {
            termwiz::surface::CursorVisibility::Hidden
        };
        terminal.add_change(TermwizChange::CursorVisibility(cursor_visibility));
        terminal.flush()?;

        Ok(())
    }

    /// Do a single render to the user's actual terminal. It uses a diffing algorithm to make
    /// the minimum number of changes.
    fn render(
        surface: &TermwizSurface,
        terminal: &mut BufferedTerminal<impl TermwizTerminal>,
    ) -> Result<()> {
        terminal.draw_from_screen(surface, 0, 0);

        // This is where we actually render to the user's real terminal.
        terminal.flush()?;

        Ok(())
    }
}
