use std::{io, path::PathBuf, process::ExitStatus};

use thiserror::Error;

/// Failures that abort a conversion run.
///
/// Recoverable conditions such as missing chapter sources or an unparsable
/// metadata file are logged instead and never surface as an [`Error`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Book directory '{}' does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Manifest '{}' does not exist, unable to determine the book structure", .0.display())]
    MissingManifest(PathBuf),

    #[error("Unable to run `{program} -v`, is pandoc installed? See https://pandoc.org/installing.html")]
    RendererUnavailable {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("gitbook-pandoc is incompatible with detected Pandoc version (requires version {required}, but using {found})")]
    IncompatibleRenderer {
        required: semver::VersionReq,
        found: semver::Version,
    },

    #[error("No content found in manifest '{}', check that it lists links like `* [Title](path.md)`", .0.display())]
    NoContent(PathBuf),

    #[error("pandoc exited unsuccessfully ({status}){}", fmt_stderr(.stderr))]
    RenderFailed { status: ExitStatus, stderr: String },
}

fn fmt_stderr(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}
