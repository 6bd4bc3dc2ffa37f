//! Light and dark modes, and rebuilding the network whenever the mode changes.

use std::time::{Duration, Instant};

use crate::canvas::Canvas;
use crate::config::Config;
use crate::debounce::Debouncer;
use crate::errors::{ThemeError, UnknownSnafu};
use crate::network::ParticleNetwork;
use crate::scheduler::FrameScheduler;

/// How long to wait after a mode change before rebuilding, so that other visual changes can
/// settle first.
pub const SETTLE_DELAY: Duration = Duration::from_millis(50);

/// The colour scheme.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    /// Light on dark
    #[default]
    Dark,
    /// Dark on light
    Light,
}

impl Theme {
    /// The other theme.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dark => write!(formatter, "dark"),
            Self::Light => write!(formatter, "light"),
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = ThemeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_lowercase().as_str() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            _ => UnknownSnafu { name }.fail(),
        }
    }
}

/// A network config for each theme.
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
#[non_exhaustive]
pub struct Presets {
    /// Used in dark mode
    pub dark: Config,
    /// Used in light mode
    pub light: Config,
}

impl Default for Presets {
    fn default() -> Self {
        Self {
            dark: Config::for_theme(Theme::Dark),
            light: Config::for_theme(Theme::Light),
        }
    }
}

impl Presets {
    /// Instantiate
    #[must_use]
    pub const fn new(dark: Config, light: Config) -> Self {
        Self { dark, light }
    }

    /// The config for the given theme.
    #[must_use]
    pub const fn for_theme(&self, theme: Theme) -> &Config {
        match theme {
            Theme::Dark => &self.dark,
            Theme::Light => &self.light,
        }
    }

    /// Use the same random seed for both themes.
    pub const fn set_seed(&mut self, seed: Option<u64>) {
        self.dark.seed = seed;
        self.light.seed = seed;
    }
}

/// Owns the one active [`ParticleNetwork`] and replaces it whenever the theme or the presets
/// change.
///
/// Replacements are never immediate: they happen on the first tick after [`SETTLE_DELAY`]. A
/// change that arrives whilst another is still waiting replaces it, so only the latest wins.
pub struct ThemedNetwork<C: Canvas, S: FrameScheduler> {
    /// The active animator. Only ever `None` mid-rebuild.
    network: Option<ParticleNetwork<C, S>>,
    /// Config for each theme
    presets: Presets,
    /// The current theme
    theme: Theme,
    /// Whether the host is visible. Hidden networks don't render.
    is_visible: bool,
    /// Delays rebuilds
    rebuild: Debouncer,
    /// How many networks have been built
    builds: u64,
}

impl<C: Canvas, S: FrameScheduler> ThemedNetwork<C, S> {
    /// Instantiate. The first network is built [`SETTLE_DELAY`] after `now`, giving the host's
    /// theme time to be applied.
    pub fn new(
        surface: Option<C>,
        scheduler: S,
        presets: Presets,
        theme: Theme,
        now: Instant,
    ) -> Self {
        let config = presets.for_theme(theme).clone();
        let mut rebuild = Debouncer::new(SETTLE_DELAY);
        rebuild.trigger(now);

        Self {
            network: Some(ParticleNetwork::new(surface, scheduler, config)),
            presets,
            theme,
            is_visible: true,
            rebuild,
            builds: 0,
        }
    }

    /// Change the theme. The network is rebuilt after the settle delay.
    pub fn switch_theme(&mut self, theme: Theme, now: Instant) {
        tracing::debug!("Switching to {theme} theme");
        self.theme = theme;
        self.rebuild.trigger(now);
    }

    /// Switch to the other theme, returning the new one.
    pub fn toggle_theme(&mut self, now: Instant) -> Theme {
        let theme = self.theme.toggled();
        self.switch_theme(theme, now);
        theme
    }

    /// Replace the config for both themes. The network is rebuilt after the settle delay.
    pub fn reconfigure(&mut self, presets: Presets, now: Instant) {
        tracing::debug!("Particle network presets changed");
        self.presets = presets;
        self.rebuild.trigger(now);
    }

    /// Pause or resume rendering as the host is hidden or shown.
    pub fn set_visible(&mut self, is_visible: bool) {
        self.is_visible = is_visible;
        if let Some(network) = self.network.as_mut() {
            if is_visible {
                network.start();
            } else {
                network.stop();
            }
        }
    }

    /// The container has been resized.
    pub fn on_resize(&mut self, now: Instant) {
        if let Some(network) = self.network.as_mut() {
            network.on_resize(now);
        }
    }

    /// To be called by the host on every display refresh. Returns whether a frame was drawn.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.rebuild.poll(now) {
            self.rebuild_network();
        }

        self.network
            .as_mut()
            .is_some_and(|network| network.tick(now))
    }

    /// Destroy the current network and start a new one on the same surface.
    fn rebuild_network(&mut self) {
        let Some(mut old) = self.network.take() else {
            return;
        };
        old.destroy();
        let (surface, scheduler) = old.into_parts();

        let config = self.presets.for_theme(self.theme).clone();
        let mut network = ParticleNetwork::new(surface, scheduler, config);
        network.initialize();
        if !self.is_visible {
            network.stop();
        }

        self.builds += 1;
        tracing::debug!(
            "Built particle network #{} ({} theme)",
            self.builds,
            self.theme
        );
        self.network = Some(network);
    }

    /// The current theme.
    #[must_use]
    pub const fn theme(&self) -> Theme {
        self.theme
    }

    /// The current presets.
    #[must_use]
    pub const fn presets(&self) -> &Presets {
        &self.presets
    }

    /// Is the host visible?
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.is_visible
    }

    /// Is a rebuild waiting for the settle delay?
    #[must_use]
    pub const fn is_rebuild_pending(&self) -> bool {
        self.rebuild.is_pending()
    }

    /// How many networks have been built.
    #[must_use]
    pub const fn builds(&self) -> u64 {
        self.builds
    }

    /// The active network.
    #[must_use]
    pub const fn network(&self) -> Option<&ParticleNetwork<C, S>> {
        self.network.as_ref()
    }

    /// The drawing surface.
    #[must_use]
    pub fn canvas(&self) -> Option<&C> {
        self.network.as_ref().and_then(ParticleNetwork::canvas)
    }

    /// Mutable access to the drawing surface.
    pub fn canvas_mut(&mut self) -> Option<&mut C> {
        self.network.as_mut().and_then(ParticleNetwork::canvas_mut)
    }
}
