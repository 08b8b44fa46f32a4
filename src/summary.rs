//! Reconstructs a book's chapter hierarchy from its `SUMMARY.md` manifest.
//!
//! The manifest is a bullet list of Markdown links whose nesting is expressed
//! through indentation, two spaces per level:
//!
//! ```markdown
//! * [Preface](README.md)
//! * [Chapter 1](ch1/README.md)
//!   * [Section 1.1](ch1/s1.md)
//!   * [Part A](ch1/a/README.md)
//!     * [A.1](ch1/a/one.md)
//! ```
//!
//! Index pages inside a subdirectory open chapters (top level) and
//! sub-chapters (nested); every other link becomes a plain item.

use std::{
    borrow::Cow,
    collections::HashSet,
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{book::Book, url, Error};

static LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[*+-]\s").unwrap());

static LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<indent>\s*)[*+-]\s+\[(?P<title>.*?)\]\((?P<target>[^)]*)\)").unwrap()
});

/// Title of the book's root index page when the manifest does not name it.
pub const DEFAULT_PREFACE_TITLE: &str = "Preface";

#[derive(Debug, Default)]
pub struct ChapterTree {
    pub front_matter: Vec<Item>,
    pub chapters: Vec<Chapter>,
    /// Deepest indentation level seen in the manifest, at least 1.
    pub max_level: usize,
}

#[derive(Debug)]
pub struct Chapter {
    pub title: String,
    pub source: Source,
    pub files: Vec<ChapterEntry>,
}

#[derive(Debug)]
pub enum ChapterEntry {
    SubChapter(SubChapter),
    Item(Item),
}

/// A nested index page grouping the items listed beneath it.
#[derive(Debug)]
pub struct SubChapter {
    pub title: String,
    pub source: Source,
    pub files: Vec<Item>,
}

#[derive(Debug)]
pub struct Item {
    pub title: String,
    pub source: Source,
    /// Set only for the book's root index page.
    pub primary_index: bool,
    /// Whether the item sits one level below a chapter or sub-chapter.
    pub sub_item: bool,
}

/// Where a node's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    /// The manifest names a file that does not exist; a heading is generated in its place.
    Synthesized(PathBuf),
}

impl Source {
    fn resolve(path: PathBuf) -> Self {
        if path.is_file() {
            Self::File(path)
        } else {
            Self::Synthesized(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::File(path) | Self::Synthesized(path) => path,
        }
    }

    pub fn exists(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

impl ChapterTree {
    pub fn is_empty(&self) -> bool {
        self.front_matter.is_empty() && self.chapters.is_empty()
    }
}

/// Parser position within the tree being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// No chapter has been opened yet; nested entries have nowhere to go.
    NoChapter,
    Chapter,
    /// A sub-chapter listed at `indent` leading whitespace characters is open.
    SubChapter { indent: usize },
}

/// Tree mutation triggered by a manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    OpenChapter,
    PushFrontMatter,
    OpenSubChapter,
    PushChapterItem,
    PushSubChapterItem,
    Ignore,
}

/// The shape of a link target as far as tree building is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    /// An index page living in a subdirectory, e.g. `ch1/README.md`.
    DirectoryIndex,
    /// The index page at the root of the book.
    RootIndex,
    Page,
}

pub(crate) fn transition(state: State, indent: usize, target: Target) -> (State, Transition) {
    use Transition::*;

    if indent == 0 {
        return match target {
            Target::DirectoryIndex => (State::Chapter, OpenChapter),
            Target::RootIndex | Target::Page => (state, PushFrontMatter),
        };
    }
    match (state, target) {
        (State::NoChapter, _) => (state, Ignore),
        (_, Target::DirectoryIndex | Target::RootIndex) => {
            (State::SubChapter { indent }, OpenSubChapter)
        }
        (State::SubChapter { indent: open }, Target::Page) if indent > open => {
            (state, PushSubChapterItem)
        }
        (State::Chapter | State::SubChapter { .. }, Target::Page) => {
            (State::Chapter, PushChapterItem)
        }
    }
}

/// Indentation level of a manifest line with `indent` leading whitespace characters.
pub fn level(indent: usize) -> usize {
    indent / 2 + 1
}

struct Entry<'a> {
    indent: usize,
    title: &'a str,
    target: Cow<'a, str>,
}

pub struct Parser<'book> {
    book: &'book Book,
    tree: ChapterTree,
    state: State,
    registered: HashSet<PathBuf>,
    links: usize,
}

/// Parses the manifest `text` of `book` into a [`ChapterTree`].
pub fn parse(book: &Book, text: &str) -> anyhow::Result<ChapterTree> {
    Parser::new(book).parse(text)
}

impl<'book> Parser<'book> {
    pub fn new(book: &'book Book) -> Self {
        Self {
            book,
            tree: ChapterTree {
                max_level: 1,
                ..Default::default()
            },
            state: State::NoChapter,
            registered: HashSet::new(),
            links: 0,
        }
    }

    pub fn parse(mut self, text: &str) -> anyhow::Result<ChapterTree> {
        log::info!("Parsing {}", self.book.relative(&self.book.summary).display());

        self.register_primary_index(text);

        for line in text.lines() {
            if line.trim().is_empty() || !LIST_ITEM.is_match(line) {
                continue;
            }
            let indent = line.chars().take_while(|c| c.is_whitespace()).count();
            self.tree.max_level = self.tree.max_level.max(level(indent));

            if let Some(entry) = self.entry(line) {
                self.links += 1;
                self.push(entry);
            }
        }

        // Every link may have been ignored for lack of an enclosing chapter
        if self.links == 0 || self.tree.is_empty() {
            return Err(Error::NoContent(self.book.summary.clone()).into());
        }
        log::info!("Deepest level in manifest: {}", self.tree.max_level);
        Ok(self.tree)
    }

    fn entry<'a>(&self, line: &'a str) -> Option<Entry<'a>> {
        let caps = LINK.captures(line)?;
        let target = caps.name("target")?.as_str().trim();
        if url::is_remote(target) || !self.has_document_extension(target) {
            return None;
        }
        Some(Entry {
            indent: caps.name("indent")?.as_str().chars().count(),
            title: caps.name("title")?.as_str().trim(),
            target: url::best_effort_decode(target),
        })
    }

    fn has_document_extension(&self, target: &str) -> bool {
        Path::new(target)
            .extension()
            .is_some_and(|extension| {
                extension == self.book.config.extension.trim_start_matches('.')
            })
    }

    fn resolve(&self, target: &str) -> PathBuf {
        url::normalize_lexically(&self.book.root.join(target.trim_start_matches('/')))
    }

    fn classify(&self, target: &str) -> Target {
        let path = Path::new(target.trim_start_matches('/'));
        let index_page = path
            .file_name()
            .is_some_and(|name| name == self.book.config.index_page.as_str());
        let in_subdirectory = path
            .parent()
            .is_some_and(|parent| url::normalize_lexically(parent) != Path::new(""));
        match (index_page, in_subdirectory) {
            (true, true) => Target::DirectoryIndex,
            (true, false) => Target::RootIndex,
            (false, _) => Target::Page,
        }
    }

    /// Registers the book's root index page, if present, as the first front-matter item.
    fn register_primary_index(&mut self, text: &str) {
        let path = self.book.root.join(&self.book.config.index_page);
        if !path.is_file() {
            return;
        }
        let title = text
            .lines()
            .filter_map(|line| self.entry(line))
            .find(|entry| {
                entry.indent == 0 && self.classify(&entry.target) == Target::RootIndex
            })
            .map_or(DEFAULT_PREFACE_TITLE, |entry| entry.title)
            .to_owned();
        log::debug!("Registering {} as '{title}'", self.book.config.index_page);
        self.registered.insert(path.clone());
        self.tree.front_matter.push(Item {
            title,
            source: Source::File(path),
            primary_index: true,
            sub_item: false,
        });
    }

    fn push(&mut self, entry: Entry<'_>) {
        let path = self.resolve(&entry.target);
        if self.registered.contains(&path) {
            log::debug!("Skipping repeated entry '{}' ({})", entry.title, entry.target);
            return;
        }

        let target = self.classify(&entry.target);
        let (state, op) = transition(self.state, entry.indent, target);
        if op == Transition::Ignore {
            log::warn!(
                "Ignoring nested entry '{}' ({}) that does not belong to any chapter",
                entry.title,
                entry.target
            );
            return;
        }
        self.state = state;

        let source = Source::resolve(path.clone());
        if !source.exists() {
            log::warn!("Source not found for '{}': {}", entry.title, entry.target);
        }
        self.registered.insert(path);

        let title = entry.title.to_owned();
        let tree = &mut self.tree;
        match op {
            Transition::OpenChapter => tree.chapters.push(Chapter {
                title,
                source,
                files: Vec::new(),
            }),
            Transition::PushFrontMatter => {
                tree.front_matter.push(Item::new(title, source, false))
            }
            Transition::OpenSubChapter => {
                if let Some(chapter) = tree.chapters.last_mut() {
                    chapter.files.push(ChapterEntry::SubChapter(SubChapter {
                        title,
                        source,
                        files: Vec::new(),
                    }));
                }
            }
            Transition::PushSubChapterItem => {
                if let Some(chapter) = tree.chapters.last_mut() {
                    let item = Item::new(title, source, true);
                    match chapter.files.last_mut() {
                        Some(ChapterEntry::SubChapter(sub_chapter)) => {
                            sub_chapter.files.push(item)
                        }
                        _ => chapter.files.push(ChapterEntry::Item(item)),
                    }
                }
            }
            Transition::PushChapterItem => {
                if let Some(chapter) = tree.chapters.last_mut() {
                    chapter
                        .files
                        .push(ChapterEntry::Item(Item::new(title, source, true)));
                }
            }
            Transition::Ignore => {}
        }
    }
}

impl Item {
    fn new(title: String, source: Source, sub_item: bool) -> Self {
        Self {
            title,
            source,
            primary_index: false,
            sub_item,
        }
    }
}
