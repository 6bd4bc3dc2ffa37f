//! Errors for this library
//!
//! The animation itself never fails. These only come from turning user-provided strings into
//! colours and themes.

/// Everything that can go wrong parsing a [`crate::config::Colour`].
#[derive(Debug, snafu::Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum ColourError {
    #[snafu(display("Colour component '{component}' in '{input}' isn't a number from 0 to 255"))]
    /// One of the comma-separated components isn't a `u8`.
    Component {
        /// The whole colour string
        input: String,
        /// The offending component
        component: String,
        /// The parent error type
        source: std::num::ParseIntError,
    },

    #[snafu(display("Expected 3 comma-separated components in '{input}', found {count}"))]
    /// A comma-separated colour without exactly red, green and blue.
    ComponentCount {
        /// The whole colour string
        input: String,
        /// How many components were found
        count: usize,
    },

    #[snafu(display("Couldn't parse '{input}' as a hex colour"))]
    /// A `#rrggbb` style colour that isn't valid hex.
    Hex {
        /// The whole colour string
        input: String,
        /// The parent error type
        source: palette::rgb::FromHexError,
    },
}

/// Parsing a [`crate::theme::Theme`] from a string.
#[derive(Debug, snafu::Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum ThemeError {
    #[snafu(display("Unknown theme '{name}', expected 'dark' or 'light'"))]
    /// Not one of the known themes
    Unknown {
        /// What was asked for
        name: String,
    },
}
