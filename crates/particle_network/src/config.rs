//! All the variables that can be configured for a particle network

use snafu::ResultExt as _;

use crate::errors::{ColourError, ComponentCountSnafu, ComponentSnafu, HexSnafu};
use crate::theme::Theme;

/// An opaque RGB colour. Transparency is decided at draw time.
///
/// It can be written either as the comma-separated `"0, 243, 255"` form or as hex, `"#00f3ff"`.
#[derive(serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(try_from = "String")]
pub struct Colour(pub palette::Srgb<u8>);

impl Colour {
    /// Instantiate from 8 bit components.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self(palette::Srgb::new(red, green, blue))
    }

    /// The colour as floating point components from 0.0 to 1.0.
    #[must_use]
    pub fn components(self) -> (f32, f32, f32) {
        let colour = self.0.into_format::<f32>();
        (colour.red, colour.green, colour.blue)
    }
}

impl std::str::FromStr for Colour {
    type Err = ColourError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.starts_with('#') {
            let rgb = trimmed
                .parse::<palette::Srgb<u8>>()
                .context(HexSnafu { input })?;
            return Ok(Self(rgb));
        }

        let components: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        let &[red, green, blue] = components.as_slice() else {
            return ComponentCountSnafu {
                input,
                count: components.len(),
            }
            .fail();
        };

        let parse = |component: &str| -> Result<u8, ColourError> {
            component
                .parse::<u8>()
                .context(ComponentSnafu { input, component })
        };

        Ok(Self::new(parse(red)?, parse(green)?, parse(blue)?))
    }
}

impl TryFrom<String> for Colour {
    type Error = ColourError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for Colour {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}, {}, {}", self.0.red, self.0.green, self.0.blue)
    }
}

/// Neon cyan, the dark theme colour.
pub const CYAN: Colour = Colour::new(0, 243, 255);

/// Slate 900, particles in the light theme.
pub const SLATE_900: Colour = Colour::new(15, 23, 42);

/// Slate 800, lines in the light theme.
pub const SLATE_800: Colour = Colour::new(30, 41, 59);

/// The config for a single particle network. Every field can be left out.
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
#[non_exhaustive]
pub struct Config {
    /// How many particles to create on every (re)initialisation
    pub particle_count: usize,
    /// The fill colour of a particle
    #[serde(alias = "particle_color")]
    pub particle_colour: Colour,
    /// The colour of the lines between particles
    #[serde(alias = "line_color")]
    pub line_colour: Colour,
    /// The radius of every particle
    pub particle_radius: f32,
    /// The maximum distance a particle moves per frame
    pub particle_speed: f32,
    /// Particles closer than this get connected
    pub line_distance: f32,
    /// The stroke width of the connecting lines
    pub line_width: f32,
    /// The most lines that can be drawn from a single particle in a frame
    pub max_connections: usize,
    /// Seed for the random number generator. Random on every construction when not set.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            particle_count: 50,
            particle_colour: CYAN,
            line_colour: CYAN,
            particle_radius: 2.0,
            particle_speed: 0.5,
            line_distance: 120.0,
            line_width: 0.6,
            max_connections: 3,
            seed: None,
        }
    }
}

impl Config {
    /// The denser, longer-reaching network used for each theme.
    #[must_use]
    pub fn for_theme(theme: Theme) -> Self {
        let (particle_colour, line_colour) = match theme {
            Theme::Dark => (CYAN, CYAN),
            Theme::Light => (SLATE_900, SLATE_800),
        };

        Self {
            particle_count: 80,
            particle_colour,
            line_colour,
            particle_radius: 3.5,
            particle_speed: 0.8,
            line_distance: 200.0,
            line_width: 1.0,
            max_connections: 8,
            seed: None,
        }
    }
}
