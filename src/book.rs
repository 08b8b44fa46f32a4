use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use normpath::PathExt;

use crate::{Config, Error};

pub struct Book {
    pub root: PathBuf,
    pub summary: PathBuf,
    pub config: Config,
}

impl Book {
    /// Optional per-book configuration, looked up in the book's root directory.
    pub const CONFIG_FILE: &'static str = "gitbook-pandoc.toml";

    pub fn load(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::MissingDirectory(dir.to_path_buf()).into());
        }
        let root = dir
            .normalize()
            .with_context(|| format!("Unable to normalize path: {}", dir.display()))?
            .into_path_buf();

        let config = Self::load_config(&root.join(Self::CONFIG_FILE))?;

        let summary = root.join(&config.summary);
        if !summary.is_file() {
            return Err(Error::MissingManifest(summary).into());
        }

        Ok(Self {
            root,
            summary,
            config,
        })
    }

    fn load_config(path: &Path) -> anyhow::Result<Config> {
        if !path.try_exists()? {
            return Ok(Config::default());
        }
        let config = fs::read_to_string(path)
            .with_context(|| format!("Unable to read {}", path.display()))?;
        let config = toml::from_str(&config)
            .with_context(|| format!("Unable to deserialize {}", path.display()))?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Name of the book directory, used where no better title is known.
    pub fn name(&self) -> String {
        dir_name(&self.root)
    }

    pub fn read_summary(&self) -> anyhow::Result<String> {
        fs::read_to_string(&self.summary)
            .with_context(|| format!("Unable to read {}", self.summary.display()))
    }

    /// Strips the book root from `path` for display in log messages.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

/// Final component of `dir`, or `book` if it has none.
pub fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "book".into())
}
