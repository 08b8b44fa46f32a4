//! Converts a GitBook-style book directory into a single EPUB or PDF by
//! normalizing its chapters and outsourcing the rendering to [`pandoc`](https://pandoc.org).

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

pub mod book;
use book::Book;

pub mod css;
use css::Stylesheet;

mod error;
pub use error::Error;

pub mod frontend;

pub mod headings;

pub mod metadata;
use metadata::Metadata;

pub mod pandoc;

pub mod preprocess;
use preprocess::{Fragments, Preprocessor};

pub mod summary;

mod url;

pub mod workspace;
pub use workspace::Workspace;

/// Per-book settings read from [`Book::CONFIG_FILE`]. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// File name of the manifest listing the book's chapters.
    #[serde(default = "defaults::summary")]
    pub summary: String,
    /// File name of index pages; one inside a subdirectory opens a chapter.
    #[serde(default = "defaults::index_page")]
    pub index_page: String,
    /// Extension a link target must have to be treated as part of the book.
    #[serde(default = "defaults::extension")]
    pub extension: String,
    #[serde(default = "defaults::enabled")]
    pub page_break: bool,
    /// Replaces every image with a textual placeholder.
    #[serde(default)]
    pub strip_images: bool,
    #[serde(default = "defaults::pandoc")]
    pub pandoc: String,
    /// Language of the generated metadata when the book does not declare one.
    #[serde(default = "defaults::lang")]
    pub default_lang: String,
}

mod defaults {
    pub fn summary() -> String {
        "SUMMARY.md".into()
    }

    pub fn index_page() -> String {
        "README.md".into()
    }

    pub fn extension() -> String {
        "md".into()
    }

    pub fn enabled() -> bool {
        true
    }

    pub fn pandoc() -> String {
        "pandoc".into()
    }

    pub fn lang() -> String {
        "zh-CN".into()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            summary: defaults::summary(),
            index_page: defaults::index_page(),
            extension: defaults::extension(),
            page_break: defaults::enabled(),
            strip_images: false,
            pandoc: defaults::pandoc(),
            default_lang: defaults::lang(),
        }
    }
}

/// A single conversion of one book directory into one output document.
#[derive(Debug, Clone)]
pub struct Converter {
    book_dir: PathBuf,
    output: Option<PathBuf>,
    metadata: Option<PathBuf>,
    style: Option<PathBuf>,
    markdown: Option<PathBuf>,
}

impl Converter {
    pub fn new(book_dir: impl Into<PathBuf>) -> Self {
        Self {
            book_dir: book_dir.into(),
            output: None,
            metadata: None,
            style: None,
            markdown: None,
        }
    }

    /// Output document; its extension selects the format. Defaults to
    /// `<book directory name>.epub` in the current directory.
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Metadata file to use instead of the book's `metadata.yaml`.
    pub fn metadata(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata = Some(path.into());
        self
    }

    /// Stylesheet taking priority over the one declared in the metadata.
    pub fn style(mut self, path: impl Into<PathBuf>) -> Self {
        self.style = Some(path.into());
        self
    }

    /// Also write the combined Markdown document to `path`.
    pub fn markdown(mut self, path: impl Into<PathBuf>) -> Self {
        self.markdown = Some(path.into());
        self
    }

    /// Runs the conversion, materializing intermediate files into `workspace`.
    ///
    /// Returns the path of the written document.
    pub fn convert(&self, workspace: &Workspace) -> anyhow::Result<PathBuf> {
        let book = Book::load(&self.book_dir)?;
        let version = pandoc::check_compatibility(&book.config.pandoc)?;
        log::info!("Converting {} with pandoc {version}", book.root.display());

        let (renderer, _) = self.prepare(&book, workspace)?;
        renderer.render()
    }

    /// Everything up to invoking pandoc: parses the manifest, materializes the
    /// fragments and metadata, and builds the pandoc command line.
    pub(crate) fn prepare(
        &self,
        book: &Book,
        workspace: &Workspace,
    ) -> anyhow::Result<(pandoc::Renderer, Fragments)> {
        let text = book.read_summary()?;
        let tree = summary::parse(book, &text)?;
        let fragments = Preprocessor::new(book).preprocess(&tree);
        log::info!(
            "Collected {} fragments, {} levels deep",
            fragments.iter().count(),
            fragments.max_level
        );

        if let Some(markdown) = &self.markdown {
            let markdown = absolute(markdown)?;
            if let Some(parent) = markdown.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Unable to create directory: {}", parent.display()))?;
            }
            fs::write(&markdown, fragments.combined())
                .with_context(|| format!("Unable to write {}", markdown.display()))?;
            log::info!("Wrote combined Markdown to {}", markdown.display());
        }

        let inputs = fragments.write(workspace)?;

        let custom_metadata = self.metadata.as_deref().map(absolute).transpose()?;
        let metadata = Metadata::load(book, custom_metadata.as_deref());
        let metadata_file = metadata.write(workspace)?;

        let custom_style = self.style.as_deref().map(absolute).transpose()?;
        let stylesheet = Stylesheet::resolve(custom_style.as_deref(), &metadata, &book.root);

        let output = match &self.output {
            Some(output) => absolute(output)?,
            None => absolute(&default_output(&book.name()))?,
        };

        let mut renderer = pandoc::Renderer::new(&book.config.pandoc, output);
        renderer
            .current_dir(&book.root)
            .toc_depth(pandoc::toc_depth(fragments.max_level))
            .metadata_file(&metadata_file);
        if let Some(cover) = metadata.cover_image(&book.root) {
            renderer.cover_image(cover);
        }
        if let Some(stylesheet) = stylesheet {
            renderer.css(stylesheet.materialize(workspace)?);
        }
        renderer.resource_path(fragments.resource_dirs(&book.root))?;
        for input in &inputs {
            renderer.input(input);
        }

        Ok((renderer, fragments))
    }
}

/// Checks that a compatible pandoc is installed, using the program configured
/// for `book_dir` if one is given.
pub fn check_pandoc(book_dir: Option<&Path>) -> anyhow::Result<semver::Version> {
    let program = match book_dir {
        Some(dir) => Book::load(dir)?.config.pandoc,
        None => defaults::pandoc(),
    };
    pandoc::check_compatibility(&program)
}

/// Document written when no output is given, relative to the current directory.
pub fn default_output(book_name: &str) -> PathBuf {
    PathBuf::from(format!("{book_name}.epub"))
}

/// Resolves `path` against the current directory, since pandoc runs inside the book.
fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = env::current_dir().context("Unable to determine current directory")?;
        Ok(cwd.join(path))
    }
}

#[cfg(test)]
mod tests;
