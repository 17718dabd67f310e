//! Path sources: tree walk, explicit path list, or newline-delimited list file.
//!
//! Every source yields `Ok(FileTask)` for regular files and skips everything else silently.
//! The first `Err` is terminal: the sequence is fused and yields nothing after it.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::EnumerationError;
use crate::types::FileTask;

/// One enumerated item: a regular file to digest or the terminal enumeration error.
pub type SourceItem = Result<FileTask, EnumerationError>;

/// Where candidate files come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSource {
    /// Recursive walk from a root. Symlinks are not followed.
    Tree(PathBuf),
    /// Explicit paths, each `stat`ed (following symlinks).
    Paths(Vec<PathBuf>),
    /// A file with one path per line.
    ListFile(PathBuf),
}

impl PathSource {
    /// Lazily enumerate tasks. Nothing touches the filesystem until the first `next()`.
    pub fn tasks(&self) -> Enumeration {
        let inner: Box<dyn Iterator<Item = SourceItem> + Send> = match self {
            PathSource::Tree(root) => Box::new(walk_iter(root.clone())),
            PathSource::Paths(paths) => Box::new(paths.clone().into_iter().filter_map(stat_task)),
            PathSource::ListFile(list) => Box::new(ListFileIter::new(list.clone())),
        };
        Enumeration {
            inner,
            finished: false,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            PathSource::Tree(root) => format!("tree {}", root.display()),
            PathSource::Paths(paths) => format!("{} explicit path(s)", paths.len()),
            PathSource::ListFile(list) => format!("path list {}", list.display()),
        }
    }
}

/// Fused iterator over [`SourceItem`]s: stops for good after the first error.
pub struct Enumeration {
    inner: Box<dyn Iterator<Item = SourceItem> + Send>,
    finished: bool,
}

impl Iterator for Enumeration {
    type Item = SourceItem;

    fn next(&mut self) -> Option<SourceItem> {
        if self.finished {
            return None;
        }
        let item = self.inner.next();
        if !matches!(item, Some(Ok(_))) {
            self.finished = true;
        }
        item
    }
}

fn walk_iter(root: PathBuf) -> impl Iterator<Item = SourceItem> + Send {
    WalkDir::new(&root)
        .follow_links(false)
        .into_iter()
        .filter_map(move |entry| match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() {
                    return None;
                }
                match entry.metadata() {
                    Ok(meta) => Some(Ok(FileTask {
                        size_hint: meta.len(),
                        path: entry.into_path(),
                    })),
                    Err(err) => Some(Err(walk_error(err, &root))),
                }
            }
            Err(err) => Some(Err(walk_error(err, &root))),
        })
}

fn walk_error(err: walkdir::Error, root: &Path) -> EnumerationError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = match err.into_io_error() {
        Some(inner) => inner,
        None => io::Error::other("filesystem loop detected"),
    };
    EnumerationError::Walk { path, source }
}

/// `stat` one listed path. Regular files become tasks; other types are skipped.
fn stat_task(path: PathBuf) -> Option<SourceItem> {
    match fs::metadata(&path) {
        Ok(meta) if meta.is_file() => Some(Ok(FileTask {
            size_hint: meta.len(),
            path,
        })),
        Ok(_) => None,
        Err(source) => Some(Err(EnumerationError::Stat { path, source })),
    }
}

/// Reads the list file on first use; opening it counts as enumeration. Lines are raw bytes, so
/// listed paths need not be UTF-8.
struct ListFileIter {
    list: PathBuf,
    reader: Option<BufReader<File>>,
    line: Vec<u8>,
}

impl ListFileIter {
    fn new(list: PathBuf) -> Self {
        Self {
            list,
            reader: None,
            line: Vec::new(),
        }
    }

    fn list_error(&self, source: io::Error) -> EnumerationError {
        EnumerationError::ListFile {
            path: self.list.clone(),
            source,
        }
    }
}

impl Iterator for ListFileIter {
    type Item = SourceItem;

    fn next(&mut self) -> Option<SourceItem> {
        if self.reader.is_none() {
            match File::open(&self.list) {
                Ok(file) => self.reader = Some(BufReader::new(file)),
                Err(source) => return Some(Err(self.list_error(source))),
            }
        }
        loop {
            self.line.clear();
            let read = self.reader.as_mut()?.read_until(b'\n', &mut self.line);
            match read {
                Ok(0) => return None,
                Ok(_) => {}
                Err(source) => return Some(Err(self.list_error(source))),
            }
            let entry = trim_line_ending(&self.line);
            if entry.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            if let Some(item) = stat_task(path_from_bytes(entry)) {
                return Some(item);
            }
        }
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}
