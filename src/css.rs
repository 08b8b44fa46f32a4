use std::path::{Path, PathBuf};

use crate::{metadata::Metadata, workspace::Workspace};

/// Used when neither the command line nor the metadata names a stylesheet.
pub const DEFAULT_STYLESHEET: &str = r#"body {
  font-family: "Noto Serif SC", "Noto Serif", serif;
  line-height: 1.6;
}

h1, h2, h3 {
  margin-top: 1em;
}

.page-break {
  page-break-after: always;
}
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stylesheet {
    /// Given on the command line.
    Custom(PathBuf),
    /// Declared by the `css` metadata key, resolved against the book root.
    Metadata(PathBuf),
    Default,
}

impl Stylesheet {
    /// Picks the stylesheet to render with: a custom one wins over the
    /// metadata-declared one, which wins over the built-in default.
    ///
    /// The default only applies when no stylesheet was asked for at all, so a
    /// missing file never silently falls back to it.
    pub fn resolve(custom: Option<&Path>, metadata: &Metadata, root: &Path) -> Option<Self> {
        if let Some(custom) = custom {
            if custom.is_file() {
                log::info!("Using stylesheet {}", custom.display());
                return Some(Self::Custom(custom.to_path_buf()));
            }
            log::warn!("Stylesheet not found: {}", custom.display());
        }
        if let Some(css) = &metadata.css {
            let css = root.join(css);
            if css.is_file() {
                log::info!("Using stylesheet declared in metadata: {}", css.display());
                return Some(Self::Metadata(css));
            }
            log::warn!("Stylesheet declared in metadata not found: {}", css.display());
        }
        if custom.is_none() && metadata.css.is_none() {
            log::debug!("Using default stylesheet");
            return Some(Self::Default);
        }
        None
    }

    /// Path to hand to pandoc, writing the default stylesheet into `workspace` if needed.
    pub fn materialize(self, workspace: &Workspace) -> anyhow::Result<PathBuf> {
        match self {
            Self::Custom(path) | Self::Metadata(path) => Ok(path),
            Self::Default => workspace.write("default-style.css", DEFAULT_STYLESHEET),
        }
    }
}
