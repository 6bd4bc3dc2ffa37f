//! What's remembered between runs. Currently just the last theme the user chose.

use color_eyre::eyre::Result;
use particle_network::Theme;

/// The name of the file, in the config directory, where state is kept.
pub(crate) const PERSISTED_FILE_NAME: &str = "state.toml";

/// State saved whenever it changes and restored on the next start.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub(crate) struct Persisted {
    /// The theme last chosen by the user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

impl Persisted {
    /// Canonical path to the state file.
    pub fn path(directory: &std::path::Path) -> std::path::PathBuf {
        directory.join(PERSISTED_FILE_NAME)
    }

    /// Load saved state. Having nothing saved isn't an error.
    pub fn load(directory: &std::path::Path) -> Result<Self> {
        let path = Self::path(directory);
        if !path.exists() {
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(&path)?;
        Ok(toml::from_str::<Self>(&data)?)
    }

    /// Load saved state, falling back to nothing saved if it can't be read.
    pub fn load_or_default(directory: &std::path::Path) -> Self {
        Self::load(directory).unwrap_or_else(|error| {
            tracing::warn!("Ignoring unreadable persisted state: {error:?}");
            Self::default()
        })
    }

    /// Save the state.
    pub fn save(&self, directory: &std::path::Path) -> Result<()> {
        let data = toml::to_string(self)?;
        std::fs::write(Self::path(directory), data)?;
        tracing::trace!("Saved persisted state: {self:?}");
        Ok(())
    }

    /// Remember a newly chosen theme.
    pub fn save_theme(directory: &std::path::Path, theme: Theme) -> Result<()> {
        let mut persisted = Self::load_or_default(directory);
        persisted.theme = Some(theme);
        persisted.save(directory)
    }
}

/// The theme to start with. An explicit choice on the CLI beats the one remembered from the last
/// run, which beats the one in the config file.
pub(crate) fn initial_theme(
    cli_theme: Option<Theme>,
    persisted: &Persisted,
    configured: Theme,
) -> Theme {
    cli_theme.or(persisted.theme).unwrap_or(configured)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nothing_saved() {
        let directory = tempfile::tempdir().unwrap();
        let persisted = Persisted::load(directory.path()).unwrap();
        assert_eq!(persisted, Persisted::default());
    }

    #[test]
    fn themes_are_remembered() {
        let directory = tempfile::tempdir().unwrap();
        Persisted::save_theme(directory.path(), Theme::Light).unwrap();
        assert_eq!(
            Persisted::load(directory.path()).unwrap().theme,
            Some(Theme::Light)
        );

        Persisted::save_theme(directory.path(), Theme::Dark).unwrap();
        let data = std::fs::read_to_string(Persisted::path(directory.path())).unwrap();
        assert_eq!(data.trim(), "theme = \"dark\"");
    }

    #[test]
    fn corrupt_state_is_ignored() {
        let directory = tempfile::tempdir().unwrap();
        std::fs::write(Persisted::path(directory.path()), "theme = 42").unwrap();

        assert!(Persisted::load(directory.path()).is_err());
        assert_eq!(
            Persisted::load_or_default(directory.path()),
            Persisted::default()
        );

        Persisted::save_theme(directory.path(), Theme::Light).unwrap();
        assert_eq!(
            Persisted::load(directory.path()).unwrap().theme,
            Some(Theme::Light)
        );
    }

    #[test]
    fn initial_theme_precedence() {
        let remembered = Persisted {
            theme: Some(Theme::Light),
        };
        let forgotten = Persisted::default();

        assert_eq!(
            initial_theme(Some(Theme::Dark), &remembered, Theme::Light),
            Theme::Dark
        );
        assert_eq!(initial_theme(None, &remembered, Theme::Dark), Theme::Light);
        assert_eq!(initial_theme(None, &forgotten, Theme::Light), Theme::Light);
        assert_eq!(initial_theme(None, &forgotten, Theme::Dark), Theme::Dark);
    }
}
