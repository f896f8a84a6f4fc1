use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file at {config_path}: {source}")]
    ReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings file at {config_path}: {source}")]
    ParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Effective settings: the defaults with every settings file on the search
/// path merged over them, key by key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    /// The journal the commands operate on when none is given explicitly.
    pub main_file: PathBuf,
    /// Minimum similarity score for the filter, 0 to 100.
    pub tolerance: u8,
    /// Locale name for rendered weekday comments, e.g. "de_DE"; "C" keeps
    /// the POSIX names.
    pub locale: String,
    pub case_sensitive_leave: bool,
    pub case_sensitive_search: bool,
    /// How many filter excerpts the cache keeps around.
    pub history_count: usize,
    /// Cache size cap in bytes.
    pub history_size: u64,
    pub editor: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            main_file: PathBuf::from("daybook.dbk"),
            tolerance: 75,
            locale: "C".to_string(),
            case_sensitive_leave: false,
            case_sensitive_search: false,
            history_count: 10,
            history_size: 100_000_000,
            editor: "nvim".to_string(),
        }
    }
}

/// One settings file. Every key is optional so a file only overrides what it
/// names; unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    main_file: Option<PathBuf>,
    tolerance: Option<u8>,
    locale: Option<String>,
    case_sensitive_leave: Option<bool>,
    case_sensitive_search: Option<bool>,
    history_count: Option<usize>,
    history_size: Option<u64>,
    editor: Option<String>,
}

impl Settings {
    /// Loads the settings from the standard search path. Missing files are
    /// skipped; a file that exists but does not parse is an error.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_paths(&Self::search_paths())
    }

    pub fn load_from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        for path in paths {
            if let Some(file) = Self::load_file(path.as_ref())? {
                settings.apply(file);
            }
        }
        // Expand shell variables and tilde in the journal path
        settings.main_file = Self::expand_path(&settings.main_file).unwrap_or(settings.main_file);
        Ok(settings)
    }

    /// System file first, then the user's, then the working directory, so
    /// later files override earlier ones.
    pub fn search_paths() -> Vec<PathBuf> {
        let user = shellexpand::tilde("~/.config/daybook/config.toml");
        vec![
            PathBuf::from("/etc/daybook.toml"),
            PathBuf::from(user.as_ref()),
            PathBuf::from("daybook.toml"),
        ]
    }

    fn load_file(config_path: &Path) -> Result<Option<FileSettings>, ConfigError> {
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let file = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            config_path: config_path.to_path_buf(),
            source,
        })?;

        Ok(Some(file))
    }

    fn apply(&mut self, file: FileSettings) {
        if let Some(main_file) = file.main_file {
            self.main_file = main_file;
        }
        if let Some(tolerance) = file.tolerance {
            self.tolerance = tolerance;
        }
        if let Some(locale) = file.locale {
            self.locale = locale;
        }
        if let Some(case_sensitive_leave) = file.case_sensitive_leave {
            self.case_sensitive_leave = case_sensitive_leave;
        }
        if let Some(case_sensitive_search) = file.case_sensitive_search {
            self.case_sensitive_search = case_sensitive_search;
        }
        if let Some(history_count) = file.history_count {
            self.history_count = history_count;
        }
        if let Some(history_size) = file.history_size {
            self.history_size = history_size;
        }
        if let Some(editor) = file.editor {
            self.editor = editor;
        }
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults_when_no_files_exist() {
        let temp_dir = TempDir::new().unwrap();
        let paths = [
            temp_dir.path().join("missing.toml"),
            temp_dir.path().join("also-missing.toml"),
        ];

        let settings = Settings::load_from_paths(&paths).unwrap();

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_file(&temp_dir, "partial.toml", "tolerance = 60\n");

        let settings = Settings::load_from_paths(&[path]).unwrap();

        assert_eq!(settings.tolerance, 60);
        assert_eq!(settings.editor, "nvim");
        assert_eq!(settings.main_file, PathBuf::from("daybook.dbk"));
    }

    #[test]
    fn test_later_file_overrides_earlier() {
        let temp_dir = TempDir::new().unwrap();
        let system = write_file(&temp_dir, "system.toml", "tolerance = 60\neditor = \"vi\"\n");
        let local = write_file(&temp_dir, "local.toml", "tolerance = 90\n");

        let settings = Settings::load_from_paths(&[system, local]).unwrap();

        assert_eq!(settings.tolerance, 90);
        assert_eq!(settings.editor, "vi");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_file(&temp_dir, "broken.toml", "tolerance = [\n");

        let result = Settings::load_from_paths(&[path.clone()]);

        match result {
            Err(ConfigError::ParseError { config_path, .. }) => assert_eq!(config_path, path),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_file(&temp_dir, "extra.toml", "does_not_exist = 1\n");

        let settings = Settings::load_from_paths(&[path]).unwrap();

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_main_file_tilde_expands() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_file(
            &temp_dir,
            "tilde.toml",
            "main_file = \"~/journal/daybook.dbk\"\n",
        );

        let settings = Settings::load_from_paths(&[path]).unwrap();

        let main_file = settings.main_file.to_string_lossy();
        assert!(!main_file.starts_with('~'));
        assert!(main_file.ends_with("journal/daybook.dbk"));
    }

    #[test]
    fn test_main_file_env_var_expands() {
        unsafe {
            env::set_var("DAYBOOK_CONFIG_TEST_ROOT", "/srv/journals");
        }

        let temp_dir = TempDir::new().unwrap();
        let path = write_file(
            &temp_dir,
            "env.toml",
            "main_file = \"$DAYBOOK_CONFIG_TEST_ROOT/main.dbk\"\n",
        );

        let settings = Settings::load_from_paths(&[path]).unwrap();

        assert_eq!(settings.main_file, PathBuf::from("/srv/journals/main.dbk"));

        unsafe {
            env::remove_var("DAYBOOK_CONFIG_TEST_ROOT");
        }
    }

    #[test]
    fn test_search_paths_shape() {
        let paths = Settings::search_paths();

        assert_eq!(paths[0], PathBuf::from("/etc/daybook.toml"));
        let user = paths[1].to_string_lossy();
        assert!(!user.starts_with('~'));
        assert!(user.ends_with(".config/daybook/config.toml"));
        assert_eq!(paths[2], PathBuf::from("daybook.toml"));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let rendered = toml::to_string(&Settings::default()).unwrap();
        let path = write_file(&temp_dir, "full.toml", &rendered);

        let settings = Settings::load_from_paths(&[path]).unwrap();

        assert_eq!(settings, Settings::default());
    }
}
