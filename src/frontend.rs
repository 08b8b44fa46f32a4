//! Request/response boundary for driving conversions from an interactive shell.
//!
//! Hosts implement [`Dialogs`] with their native pickers and forward each
//! [`Request`] to [`Frontend::handle`]. Conversions run the command-line
//! converter as a child process so that a failing run cannot take the host
//! down; its output is pushed line by line into a progress channel.

use std::{
    ffi::{OsStr, OsString},
    io::{self, BufRead, BufReader, Read},
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
    sync::mpsc::Sender,
    thread,
};

use anyhow::{anyhow, Context as _};
use normpath::{BasePathBuf, PathExt};

use crate::book;

/// Kind of file a host is asked to pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Metadata,
    Style,
}

impl FileKind {
    pub fn description(self) -> &'static str {
        match self {
            Self::Metadata => "Metadata",
            Self::Style => "Stylesheet",
        }
    }

    /// Extensions offered as a filter by the host's file picker.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Metadata => &["yaml", "yml"],
            Self::Style => &["css"],
        }
    }

    pub fn accepts(self, path: &Path) -> bool {
        path.extension().and_then(OsStr::to_str).is_some_and(|ext| {
            self.extensions()
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
    }
}

/// Native pickers of the host. Each returns `None` if the user cancelled.
pub trait Dialogs {
    fn choose_directory(&mut self) -> Option<PathBuf>;
    fn choose_file(&mut self, kind: FileKind) -> Option<PathBuf>;
    fn choose_save_target(&mut self) -> Option<PathBuf>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub book_dir: PathBuf,
    pub output: Option<PathBuf>,
    pub metadata: Option<PathBuf>,
    pub style: Option<PathBuf>,
}

impl ConversionRequest {
    pub fn new(book_dir: impl Into<PathBuf>) -> Self {
        Self {
            book_dir: book_dir.into(),
            output: None,
            metadata: None,
            style: None,
        }
    }

    /// Document the converter writes, following its default when no output is given.
    pub fn output_path(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        let book_dir = self
            .book_dir
            .normalize()
            .map_or_else(|_| self.book_dir.clone(), BasePathBuf::into_path_buf);
        crate::default_output(&book::dir_name(&book_dir))
    }

    /// Command-line arguments of the converter for this request.
    pub fn args(&self) -> Vec<OsString> {
        let mut args = vec![self.book_dir.clone().into_os_string()];
        if let Some(output) = &self.output {
            args.push(output.clone().into_os_string());
        }
        if let Some(metadata) = &self.metadata {
            args.push("--metadata".into());
            args.push(metadata.clone().into_os_string());
        }
        if let Some(style) = &self.style {
            args.push("--style".into());
            args.push(style.clone().into_os_string());
        }
        args
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ChooseDirectory,
    ChooseFile(FileKind),
    ChooseSaveTarget,
    RunConversion(ConversionRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Answer to one of the `Choose*` requests.
    Path(Option<PathBuf>),
    Conversion(Outcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure(String),
}

pub struct Frontend<D> {
    dialogs: D,
    program: PathBuf,
    progress: Sender<String>,
}

impl<D: Dialogs> Frontend<D> {
    pub fn new(dialogs: D, progress: Sender<String>) -> Self {
        Self {
            dialogs,
            program: PathBuf::from(env!("CARGO_PKG_NAME")),
            progress,
        }
    }

    /// Converter executable to run, looked up on `PATH` unless absolute.
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::ChooseDirectory => Response::Path(self.dialogs.choose_directory()),
            Request::ChooseFile(kind) => {
                let path = self.dialogs.choose_file(kind).filter(|path| {
                    let accepted = kind.accepts(path);
                    if !accepted {
                        log::warn!(
                            "Ignoring {}: not a {} file",
                            path.display(),
                            kind.description().to_lowercase()
                        );
                    }
                    accepted
                });
                Response::Path(path)
            }
            Request::ChooseSaveTarget => Response::Path(self.dialogs.choose_save_target()),
            Request::RunConversion(request) => Response::Conversion(self.run(&request)),
        }
    }

    fn run(&self, request: &ConversionRequest) -> Outcome {
        match self.spawn(request) {
            Ok(status) if status.success() => {
                Outcome::Success(format!("Converted {}", request.output_path().display()))
            }
            Ok(status) => Outcome::Failure(format!("Conversion failed ({status})")),
            Err(err) => Outcome::Failure(format!("{err:#}")),
        }
    }

    fn spawn(&self, request: &ConversionRequest) -> anyhow::Result<ExitStatus> {
        log::info!("Converting {}", request.book_dir.display());
        let mut child = Command::new(&self.program)
            .args(request.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Unable to run `{}`", self.program.display()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Converter stdout is not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("Converter stderr is not captured"))?;

        let progress = &self.progress;
        thread::scope(|scope| {
            let errors = scope.spawn(|| forward(stderr, "error: ", progress));
            forward(stdout, "", progress)?;
            errors
                .join()
                .map_err(|_| anyhow!("Converter stderr reader panicked"))??;
            anyhow::Ok(())
        })?;

        child.wait().context("Unable to wait for converter")
    }
}

/// Pushes each line of `reader` into `progress` until the stream closes.
fn forward(reader: impl Read, prefix: &str, progress: &Sender<String>) -> io::Result<()> {
    for line in BufReader::new(reader).lines() {
        // The host may stop listening; keep draining so the child never blocks.
        let _ = progress.send(format!("{prefix}{}", line?));
    }
    Ok(())
}
