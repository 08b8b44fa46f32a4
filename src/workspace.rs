use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use tempfile::TempDir;

/// Temporary directory holding everything materialized for one conversion run.
///
/// The directory and its contents are removed when the workspace is dropped or
/// [cleaned up](Workspace::cleanup), whichever comes first.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("gitbook-pandoc-")
            .tempdir()
            .context("Unable to create temporary directory")?;
        log::debug!("Created workspace {}", dir.path().display());
        Ok(Self {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `contents` to `name` inside the workspace, creating parent directories as needed.
    pub fn write(
        &self,
        name: impl AsRef<Path>,
        contents: impl AsRef<[u8]>,
    ) -> anyhow::Result<PathBuf> {
        let path = self.path.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create directory: {}", parent.display()))?;
        }
        fs::write(&path, contents)
            .with_context(|| format!("Unable to write {}", path.display()))?;
        Ok(path)
    }

    /// Removes the workspace directory. Calling this more than once is a no-op.
    pub fn cleanup(&mut self) {
        if let Some(dir) = self.dir.take() {
            log::debug!("Removing workspace {}", self.path.display());
            if let Err(err) = dir.close() {
                log::warn!(
                    "Unable to remove temporary directory {}: {err}",
                    self.path.display()
                );
            }
        }
    }
}

/// Removes a workspace directory by path, treating an already removed directory as success.
///
/// Used from contexts such as interrupt handlers that cannot own the [`Workspace`].
pub fn remove(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        res => res,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_is_idempotent() {
        let mut workspace = Workspace::new().unwrap();
        let file = workspace.write("fragments/a.md", "# A").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "# A");

        let path = workspace.path().to_path_buf();
        workspace.cleanup();
        assert!(!path.exists());
        workspace.cleanup();
        remove(&path).unwrap();
    }

    #[test]
    fn dropped_workspace_is_removed() {
        let path = {
            let workspace = Workspace::new().unwrap();
            workspace.write("metadata.yaml", "title: x").unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
