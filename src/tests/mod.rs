use std::{
    fmt::{self, Write},
    fs::{self, File},
    io::{self, Read, Seek},
    path::{Path, PathBuf},
};

use normpath::PathExt;
use regex::Regex;
use tempfile::{tempfile, TempDir};

use crate::{book::Book, Converter, Workspace};

mod manifest;

pub struct TestBook {
    root: TempDir,
    _logger: tracing::subscriber::DefaultGuard,
    logfile: File,
}

pub struct BuildOutput {
    logs: String,
    fragments: Vec<(String, String)>,
    max_level: Option<usize>,
    args: Vec<String>,
    workspace: Workspace,
    root: TempDir,
}

impl TestBook {
    pub fn new() -> Self {
        Self::with_max_log_level(tracing::Level::WARN)
    }

    pub fn with_max_log_level(max_level: impl Into<tracing::level_filters::LevelFilter>) -> Self {
        // Initialize logger to captures `log` output and redirect it to a tempfile
        let logfile = tempfile().unwrap();
        let _logger = tracing::subscriber::set_default(
            tracing_subscriber::fmt()
                .with_max_level(max_level)
                .compact()
                .without_time()
                .with_writer({
                    let logfile = logfile.try_clone().unwrap();
                    move || logfile.try_clone().unwrap()
                })
                .finish(),
        );
        {
            let logger = tracing_log::LogTracer::new();
            let _ = log::set_boxed_logger(Box::new(logger));
            log::set_max_level(log::LevelFilter::Trace);
        }

        Self {
            root: TempDir::new().unwrap(),
            _logger,
            logfile,
        }
    }

    pub fn file(self, path: impl AsRef<Path>, contents: &str) -> Self {
        let path = self.root.path().join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
        self
    }

    pub fn summary(self, contents: &str) -> Self {
        self.file("SUMMARY.md", contents)
    }

    pub fn config(self, contents: &str) -> Self {
        self.file(Book::CONFIG_FILE, contents)
    }

    pub fn build(self) -> BuildOutput {
        self.build_with(|converter, _| converter)
    }

    /// Runs the conversion up to the point of invoking pandoc.
    pub fn build_with(
        mut self,
        configure: impl FnOnce(Converter, &Path) -> Converter,
    ) -> BuildOutput {
        let root = self.root.path().to_path_buf();
        let converter = configure(
            Converter::new(&root).output(root.join("book.epub")),
            root.as_path(),
        );
        let workspace = Workspace::new().unwrap();
        let res = Book::load(&root).and_then(|book| converter.prepare(&book, &workspace));

        self.logfile.seek(io::SeekFrom::Start(0)).unwrap();
        let mut logs = String::new();
        self.logfile.read_to_string(&mut logs).unwrap();

        let (fragments, max_level, args) = match res {
            Ok((renderer, fragments)) => (
                fragments
                    .iter()
                    .map(|fragment| (fragment.name.clone(), fragment.body.clone()))
                    .collect(),
                Some(fragments.max_level),
                renderer
                    .args()
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect(),
            ),
            Err(err) => {
                writeln!(&mut logs, "{err:#}").unwrap();
                (Vec::new(), None, Vec::new())
            }
        };

        let mut paths = vec![
            (root.clone(), "$ROOT"),
            (root.normalize().unwrap().into_path_buf(), "$ROOT"),
            (workspace.path().to_path_buf(), "$WORKSPACE"),
        ];
        paths.sort_by_key(|(path, _)| std::cmp::Reverse(path.as_os_str().len()));
        let re = Regex::new(
            &paths
                .iter()
                .map(|(path, _)| regex::escape(&path.display().to_string()))
                .collect::<Vec<_>>()
                .join("|"),
        )
        .unwrap();
        let redact = |text: &str| {
            re.replace_all(text, |caps: &regex::Captures| {
                let matched = Path::new(&caps[0]);
                paths
                    .iter()
                    .find(|(path, _)| path == matched)
                    .map_or("", |(_, name)| *name)
                    .to_owned()
            })
            .into_owned()
        };

        BuildOutput {
            logs: redact(&logs),
            fragments,
            max_level,
            args: args.iter().map(|arg| redact(arg)).collect(),
            workspace,
            root: self.root,
        }
    }
}

impl BuildOutput {
    pub fn max_level(&self) -> Option<usize> {
        self.max_level
    }

    pub fn fragment_names(&self) -> Vec<&str> {
        self.fragments.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Arguments pandoc would be invoked with, one per line.
    pub fn pandoc_args(&self) -> String {
        self.args.join("\n")
    }

    /// Contents of a file written into the book directory.
    pub fn read(&self, path: impl AsRef<Path>) -> String {
        fs::read_to_string(self.root.path().join(path)).unwrap()
    }

    /// Contents of a file materialized in the run's workspace.
    pub fn materialized(&self, path: impl AsRef<Path>) -> String {
        fs::read_to_string(self.workspace.path().join(path)).unwrap()
    }

    pub fn workspace_path(&self) -> PathBuf {
        self.workspace.path().to_path_buf()
    }
}

fn write_lines(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    for line in text.lines() {
        writeln!(f, "{}", format!("│ {line}").trim_end())?;
    }
    Ok(())
}

impl fmt::Display for BuildOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.logs.is_empty() {
            writeln!(f, "├─ log output")?;
            write_lines(f, &self.logs)?;
        }
        for (name, body) in &self.fragments {
            writeln!(f, "├─ {name}")?;
            write_lines(f, body)?;
        }
        Ok(())
    }
}
