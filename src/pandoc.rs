use std::{cmp, io, process::Command};

use anyhow::Context as _;
use once_cell::sync::Lazy;

use crate::Error;

mod renderer;
pub use renderer::{OutputFormat, Renderer};

/// Defines compatible versions of Pandoc
pub static VERSION_REQ: Lazy<semver::VersionReq> =
    // --metadata-file introduced in 2.3
    Lazy::new(|| semver::VersionReq::parse(">=2.3").unwrap());

/// Shallowest table of contents passed to pandoc, even for flat books.
pub const MIN_TOC_DEPTH: usize = 2;

pub fn check_compatibility(program: &str) -> anyhow::Result<semver::Version> {
    let output = match Command::new(program).arg("-v").output() {
        Ok(output) => output,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(Error::RendererUnavailable {
                program: program.into(),
                source: err,
            }
            .into())
        }
        Err(err) => return Err(err).with_context(|| format!("Unable to run `{program} -v`")),
    };
    anyhow::ensure!(
        output.status.success(),
        "`{program} -v` exited with error code {}",
        output.status
    );
    let output = String::from_utf8(output.stdout)
        .with_context(|| format!("`{program} -v` output is not UTF8"))?;
    let version = parse_version(&output)?;
    if VERSION_REQ.matches(&version) {
        log::debug!("Using pandoc {version}");
        Ok(version)
    } else {
        Err(Error::IncompatibleRenderer {
            required: VERSION_REQ.clone(),
            found: version,
        }
        .into())
    }
}

/// Extracts the version from the first line of `pandoc -v` output.
fn parse_version(output: &str) -> anyhow::Result<semver::Version> {
    match output.lines().next().and_then(|line| line.split_once(' ')) {
        Some(("pandoc", mut version)) => {
            version = version.trim();
            // Pandoc versions can contain more than three components (e.g. a.b.c.d).
            // If this is the case, only consider the first three.
            if let Some((idx, _)) = version.match_indices('.').nth(2) {
                version = &version[..idx];
            }
            // ...or fewer, as in 2.3
            let padded;
            if version.matches('.').count() < 2 {
                padded = format!("{version}.0");
                version = &padded;
            }
            semver::Version::parse(version)
                .with_context(|| format!("Unable to parse pandoc version '{version}'"))
        }
        _ => anyhow::bail!("`pandoc -v` output does not contain `pandoc VERSION`"),
    }
}

/// Table of contents depth for a book whose manifest nests `max_level` levels deep.
pub fn toc_depth(max_level: usize) -> usize {
    cmp::max(max_level, MIN_TOC_DEPTH)
}
