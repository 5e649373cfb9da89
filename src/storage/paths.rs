//! Application paths for config, cache, and data.

use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};

/// Application directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config: PathBuf,
    pub cache: PathBuf,
    pub data: PathBuf,
}

impl AppPaths {
    #[must_use]
    pub fn new() -> Self {
        if let Some(dirs) = ProjectDirs::from("", "", "studygym") {
            Self {
                config: dirs.config_dir().to_path_buf(),
                cache: dirs.cache_dir().to_path_buf(),
                data: dirs.data_dir().to_path_buf(),
            }
        } else {
            let home = BaseDirs::new()
                .map_or_else(|| PathBuf::from("."), |d| d.home_dir().to_path_buf());
            Self {
                config: home.join(".config/studygym"),
                cache: home.join(".cache/studygym"),
                data: home.join(".local/share/studygym"),
            }
        }
    }

    /// All directories under one root, for tests and portable installs.
    #[must_use]
    pub fn rooted(root: &Path) -> Self {
        Self {
            config: root.join("config"),
            cache: root.join("cache"),
            data: root.join("data"),
        }
    }

    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    /// SQLite progress database.
    #[must_use]
    pub fn database_file(&self) -> PathBuf {
        self.data.join("gym-progress.sqlite")
    }

    /// # Errors
    /// Returns error if a directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config)?;
        std::fs::create_dir_all(&self.cache)?;
        std::fs::create_dir_all(&self.data)?;
        Ok(())
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
