use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context as _};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::{book::Book, workspace::Workspace};

/// Book metadata handed to pandoc through `--metadata-file`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Metadata {
    /// Any scalar is accepted, `title: 1984` being a perfectly good title.
    pub title: Value,
    /// A single name or a list of names.
    pub author: Value,
    pub date: Value,
    pub lang: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<PathBuf>,
    /// Keys pandoc understands that need no special handling here.
    #[serde(flatten)]
    pub rest: BTreeMap<String, Value>,
}

impl Metadata {
    /// Looked up in the book's root directory unless another file is given explicitly.
    pub const DEFAULT_FILE: &'static str = "metadata.yaml";

    pub fn defaults(title: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            title: Value::String(title.into()),
            author: "Unknown".into(),
            date: chrono::Local::now().year().into(),
            lang: Value::String(lang.into()),
            cover_image: None,
            css: None,
            rest: BTreeMap::new(),
        }
    }

    /// Loads the book's metadata, falling back to defaults derived from the book
    /// if the file is missing or cannot be parsed.
    pub fn load(book: &Book, custom: Option<&Path>) -> Self {
        let defaults = Self::defaults(book.name(), book.config.default_lang.as_str());
        let path = custom.map_or_else(|| book.root.join(Self::DEFAULT_FILE), Path::to_path_buf);

        if !path.is_file() {
            log::warn!(
                "Metadata file {} not found, using default metadata",
                book.relative(&path).display()
            );
            return defaults;
        }

        match Self::read(&path, &defaults) {
            Ok(metadata) => {
                log::info!("Read metadata from {}", book.relative(&path).display());
                metadata
            }
            Err(err) => {
                log::error!(
                    "Unable to parse {}, using default metadata: {err:#}",
                    book.relative(&path).display()
                );
                defaults
            }
        }
    }

    /// Reads `path`, filling any keys it lacks from `defaults`.
    fn read(path: &Path, defaults: &Self) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Unable to read {}", path.display()))?;
        let overrides: Option<Mapping> = if text.trim().is_empty() {
            None
        } else {
            serde_yaml::from_str(&text)?
        };

        let mut merged = match serde_yaml::to_value(defaults)? {
            Value::Mapping(mapping) => mapping,
            other => return Err(anyhow!("Default metadata is not a mapping: {other:?}")),
        };
        merged.extend(overrides.unwrap_or_default());
        Ok(serde_yaml::from_value(Value::Mapping(merged))?)
    }

    /// Writes the metadata into `workspace` for pandoc to read.
    pub fn write(&self, workspace: &Workspace) -> anyhow::Result<PathBuf> {
        let yaml = serde_yaml::to_string(self).context("Unable to serialize metadata")?;
        workspace.write(Self::DEFAULT_FILE, yaml)
    }

    /// The declared cover image, resolved against the book root, if it exists.
    pub fn cover_image(&self, root: &Path) -> Option<PathBuf> {
        let cover = root.join(self.cover_image.as_ref()?);
        if cover.is_file() {
            Some(cover)
        } else {
            log::warn!("Cover image not found: {}", cover.display());
            None
        }
    }
}
