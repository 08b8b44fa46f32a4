use std::{
    env,
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::Context as _;

use crate::Error;

/// A pending pandoc invocation.
pub struct Renderer {
    pandoc: Command,
    output: PathBuf,
    format: OutputFormat,
    num_inputs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Epub,
    Pdf,
    Other,
}

impl OutputFormat {
    /// Pandoc picks the writer from the output file's extension, so do the same.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(OsStr::to_str) {
            Some(ext) if ext.eq_ignore_ascii_case("epub") => Self::Epub,
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => Self::Pdf,
            _ => Self::Other,
        }
    }
}

impl Renderer {
    pub fn new(program: &str, output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        let mut pandoc = Command::new(program);
        pandoc.arg("-o").arg(&output);
        Self {
            pandoc,
            format: OutputFormat::from_path(&output),
            output,
            num_inputs: 0,
        }
    }

    pub fn current_dir(&mut self, working_dir: impl AsRef<Path>) -> &mut Self {
        self.pandoc.current_dir(working_dir);
        self
    }

    pub fn toc_depth(&mut self, depth: usize) -> &mut Self {
        self.pandoc.arg("--toc").arg(format!("--toc-depth={depth}"));
        self
    }

    pub fn metadata_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.pandoc.arg("--metadata-file").arg(path.as_ref());
        self
    }

    /// Only EPUB output has a cover, so this is a no-op for other formats.
    pub fn cover_image(&mut self, path: impl AsRef<Path>) -> &mut Self {
        if self.format == OutputFormat::Epub {
            self.pandoc.arg("--epub-cover-image").arg(path.as_ref());
        } else {
            log::debug!(
                "Ignoring cover image {} for non-EPUB output",
                path.as_ref().display()
            );
        }
        self
    }

    pub fn css(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.pandoc.arg("--css").arg(path.as_ref());
        self
    }

    /// Directories pandoc searches for images and other resources, in order.
    pub fn resource_path<I, P>(&mut self, dirs: I) -> anyhow::Result<&mut Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<OsStr>,
    {
        // A directory containing the path list separator cannot be expressed in the list
        let dirs = dirs
            .into_iter()
            .filter(|dir| {
                let joinable = env::join_paths([dir]).is_ok();
                if !joinable {
                    log::warn!(
                        "Leaving {} out of the resource path, it contains the path separator",
                        Path::new(dir).display()
                    );
                }
                joinable
            })
            .collect::<Vec<_>>();
        let dirs = env::join_paths(&dirs).context("Unable to build pandoc resource path")?;
        self.pandoc.arg("--resource-path").arg(dirs);
        Ok(self)
    }

    pub fn input(&mut self, input: impl AsRef<Path>) -> &mut Self {
        self.pandoc.arg(input.as_ref());
        self.num_inputs += 1;
        self
    }

    pub fn args(&self) -> impl Iterator<Item = &OsStr> + '_ {
        self.pandoc.get_args()
    }

    pub fn render(self) -> anyhow::Result<PathBuf> {
        let Self {
            mut pandoc,
            output,
            num_inputs,
            ..
        } = self;

        if let Some(parent) = output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create directory: {}", parent.display()))?;
        }

        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Running pandoc: {pandoc:?}");
        } else {
            log::info!("Running pandoc on {num_inputs} fragments");
        }
        let result = pandoc
            .stdin(Stdio::null())
            .output()
            .context("Unable to run `pandoc`")?;
        let stderr = String::from_utf8_lossy(&result.stderr);
        if !result.status.success() {
            return Err(Error::RenderFailed {
                status: result.status,
                stderr: stderr.into_owned(),
            }
            .into());
        }
        for line in stderr.lines().filter(|line| !line.trim().is_empty()) {
            log::warn!("pandoc: {line}");
        }

        log::info!("Wrote output to {}", output.display());
        Ok(output)
    }
}
