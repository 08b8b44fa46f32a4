use std::{
    borrow::Cow,
    collections::HashSet,
    fmt, fs,
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    book::Book,
    headings,
    summary::{ChapterEntry, ChapterTree, Source},
    workspace::Workspace,
};

/// Marker placed between consecutive fragments so that each starts on a new page.
pub const PAGE_BREAK: &str = r#"<div style="page-break-after: always;"></div>"#;

/// Placeholder substituted for images when `strip-images` is enabled.
pub const IMAGE_PLACEHOLDER: &str = "[image]";

static IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[.*?\]\(.*?\)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    FrontMatter,
    Chapter,
    SubChapter,
    Item,
    SubItem,
}

impl FragmentKind {
    /// Outline level the fragment's first heading is promoted to.
    pub fn level(self) -> usize {
        match self {
            Self::FrontMatter | Self::Chapter => 1,
            Self::SubChapter | Self::Item => 2,
            Self::SubItem => 3,
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FrontMatter => "front matter",
            Self::Chapter => "chapter",
            Self::SubChapter => "sub-chapter",
            Self::Item => "item",
            Self::SubItem => "sub-item",
        })
    }
}

/// Normalized content of a single node of the chapter tree.
#[derive(Debug)]
pub struct Fragment {
    /// File name the fragment is materialized under.
    pub name: String,
    pub source: Source,
    pub body: String,
}

#[derive(Debug)]
pub struct Fragments {
    fragments: Vec<Fragment>,
    pub max_level: usize,
    page_break: bool,
}

pub struct Preprocessor<'book> {
    book: &'book Book,
}

impl<'book> Preprocessor<'book> {
    pub fn new(book: &'book Book) -> Self {
        Self { book }
    }

    /// Resolves and normalizes the content of every node in `tree`, in reading order.
    pub fn preprocess(&self, tree: &ChapterTree) -> Fragments {
        let mut fragments = Vec::new();

        for (idx, item) in tree.front_matter.iter().enumerate() {
            let name = format!("frontmatter-{idx:02}-{}", file_name(&item.source));
            fragments.push(self.fragment(
                FragmentKind::FrontMatter,
                &item.title,
                &item.source,
                name,
            ));
        }

        for (chapter_idx, chapter) in tree.chapters.iter().enumerate() {
            let chapter_num = chapter_idx + 1;
            fragments.push(self.fragment(
                FragmentKind::Chapter,
                &chapter.title,
                &chapter.source,
                format!("chapter-{chapter_num}.md"),
            ));

            for (file_idx, entry) in chapter.files.iter().enumerate() {
                let file_num = file_idx + 1;
                match entry {
                    ChapterEntry::SubChapter(sub_chapter) => {
                        fragments.push(self.fragment(
                            FragmentKind::SubChapter,
                            &sub_chapter.title,
                            &sub_chapter.source,
                            format!("subchapter-{chapter_num}-{file_num}.md"),
                        ));
                        for (item_idx, item) in sub_chapter.files.iter().enumerate() {
                            let name = format!(
                                "subitem-{chapter_num}-{file_num}-{}-{}",
                                item_idx + 1,
                                file_name(&item.source)
                            );
                            fragments.push(self.fragment(
                                FragmentKind::SubItem,
                                &item.title,
                                &item.source,
                                name,
                            ));
                        }
                    }
                    ChapterEntry::Item(item) => {
                        let name =
                            format!("item-{chapter_num}-{file_num}-{}", file_name(&item.source));
                        fragments.push(self.fragment(
                            FragmentKind::Item,
                            &item.title,
                            &item.source,
                            name,
                        ));
                    }
                }
            }
        }

        Fragments {
            fragments,
            max_level: tree.max_level,
            page_break: self.book.config.page_break,
        }
    }

    fn fragment(
        &self,
        kind: FragmentKind,
        title: &str,
        source: &Source,
        name: String,
    ) -> Fragment {
        let level = kind.level();
        let body = match source {
            Source::File(path) => match fs::read_to_string(path) {
                Ok(text) => {
                    log::info!("Adding {kind} '{title}'");
                    Some(headings::normalize(&text, level).into_owned())
                }
                Err(err) => {
                    log::warn!(
                        "Unable to read {}, using its title instead: {err}",
                        self.book.relative(path).display()
                    );
                    None
                }
            },
            Source::Synthesized(_) => None,
        };
        let body = body.unwrap_or_else(|| match kind {
            FragmentKind::FrontMatter => {
                log::debug!("Adding empty {kind} '{title}'");
                String::new()
            }
            _ => {
                log::info!("Adding {kind} '{title}' (synthesized)");
                headings::stub(title, level)
            }
        });
        let body = if self.book.config.strip_images && IMAGE.is_match(&body) {
            IMAGE.replace_all(&body, IMAGE_PLACEHOLDER).into_owned()
        } else {
            body
        };
        Fragment {
            name,
            source: source.clone(),
            body,
        }
    }
}

fn file_name(source: &Source) -> Cow<'_, str> {
    source
        .path()
        .file_name()
        .map_or(Cow::Borrowed("untitled.md"), |name| name.to_string_lossy())
}

impl Fragments {
    pub fn iter(&self) -> impl Iterator<Item = &Fragment> + '_ {
        self.fragments.iter()
    }

    /// All fragment bodies in order, page breaks between consecutive fragments.
    pub fn combined(&self) -> String {
        let separator = if self.page_break {
            format!("\n\n{PAGE_BREAK}\n\n")
        } else {
            "\n\n".into()
        };
        self.fragments
            .iter()
            .map(|fragment| fragment.body.as_str())
            .collect::<Vec<_>>()
            .join(&separator)
    }

    /// Materializes every fragment as a file inside `workspace`, returning the paths in order.
    ///
    /// Each file but the last ends with a page break, so that rendering the files in
    /// sequence is equivalent to rendering [`Fragments::combined`].
    pub fn write(&self, workspace: &Workspace) -> anyhow::Result<Vec<PathBuf>> {
        let last = self.fragments.len().saturating_sub(1);
        self.fragments
            .iter()
            .enumerate()
            .map(|(idx, fragment)| {
                let name = Path::new("fragments").join(&fragment.name);
                if self.page_break && idx < last {
                    workspace.write(name, format!("{}\n\n{PAGE_BREAK}\n", fragment.body))
                } else {
                    workspace.write(name, &fragment.body)
                }
            })
            .collect()
    }

    /// Directories relative resources referenced by fragments should be looked up in:
    /// the book root, then each source's directory in reading order.
    pub fn resource_dirs<'a>(&'a self, root: &'a Path) -> Vec<&'a Path> {
        let mut seen = HashSet::new();
        std::iter::once(root)
            .chain(
                self.fragments
                    .iter()
                    .filter(|fragment| fragment.source.exists())
                    .filter_map(|fragment| fragment.source.path().parent()),
            )
            .filter(|dir| seen.insert(*dir))
            .collect()
    }
}
