// FILE: src/engine/walker.rs
//! Depth-first traversal of a scan root.
//!
//! Entries are visited in file-name order, recursing into a subdirectory as
//! soon as it is encountered. Progress is reported per directory: the
//! denominator is the size of that directory's own listing, so the fraction
//! restarts in every directory.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use crate::config::IndexConfig;
use crate::error::{Result, IndexError};
use crate::storage::read_document;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub logical_path: String,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirProgress {
    pub directory: PathBuf,
    pub processed: usize,
    pub total: usize,
}

impl DirProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.processed as f64 / self.total as f64).min(1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WalkEvent {
    Document(Document),
    Progress(DirProgress),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    pub documents: usize,
    pub unreadable: usize,
    pub skipped: usize,
}

/// Open directory on the traversal stack.
struct DirFrame {
    path: PathBuf,
    processed: usize,
    total: usize,
}

impl DirFrame {
    fn open(path: &Path) -> Self {
        let total = std::fs::read_dir(path).map(|it| it.count()).unwrap_or(0);
        Self { path: path.to_path_buf(), processed: 0, total }
    }

    fn progress(&self) -> DirProgress {
        DirProgress { directory: self.path.clone(), processed: self.processed, total: self.total }
    }
}

pub type DocumentReader = fn(&Path) -> Result<String>;

pub struct Walker {
    suffix: String,
    reader: DocumentReader,
}

impl Walker {
    pub fn new(config: &IndexConfig) -> Self {
        Self::with_reader(config, read_document)
    }

    pub fn with_reader(config: &IndexConfig, reader: DocumentReader) -> Self {
        Self { suffix: config.document_suffix(), reader }
    }

    /// Eligible documents end with the configured suffix (case-sensitive).
    pub fn is_eligible(&self, file_name: &str) -> bool {
        file_name.ends_with(&self.suffix)
    }

    /// Walk `root`, feeding every readable eligible document and every
    /// progress step to `sink`. `sink` may stop the walk early.
    ///
    /// Unreadable files and directories are skipped. Only a root that is not
    /// a directory is an error.
    pub fn walk<F>(&self, root: &Path, mut sink: F) -> Result<WalkStats>
    where
        F: FnMut(WalkEvent) -> ControlFlow<()>,
    {
        if !root.is_dir() {
            return Err(IndexError::InvalidPath(format!("Not a directory: {}", root.display())));
        }

        let mut stats = WalkStats::default();
        // frames[d] is the open directory at depth d
        let mut frames: Vec<DirFrame> = Vec::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("[Walker] Skipping unreadable entry: {}", e);
                    stats.unreadable += 1;
                    continue;
                }
            };

            let depth = entry.depth();
            if depth == 0 {
                frames.push(DirFrame::open(entry.path()));
                continue;
            }
            if close_frames(&mut frames, depth, &mut sink).is_break() {
                return Ok(stats);
            }

            // A subdirectory counts towards its parent once its subtree is done.
            if entry.file_type().is_dir() {
                frames.push(DirFrame::open(entry.path()));
                continue;
            }

            if entry.file_type().is_file() {
                let name = entry.file_name().to_string_lossy();
                if self.is_eligible(&name) {
                    match self.load(root, entry.path()) {
                        Some(document) => {
                            stats.documents += 1;
                            if sink(WalkEvent::Document(document)).is_break() {
                                return Ok(stats);
                            }
                        }
                        None => stats.unreadable += 1,
                    }
                } else {
                    stats.skipped += 1;
                }
            }

            if let Some(parent) = frames.last_mut() {
                parent.processed += 1;
                if sink(WalkEvent::Progress(parent.progress())).is_break() {
                    return Ok(stats);
                }
            }
        }

        let _ = close_frames(&mut frames, 1, &mut sink);
        Ok(stats)
    }

    fn load(&self, root: &Path, path: &Path) -> Option<Document> {
        let logical_path = logical_path(root, path)?;
        match (self.reader)(path) {
            Ok(contents) => Some(Document { logical_path, contents }),
            Err(e) => {
                tracing::warn!("[Walker] Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Pop every frame deeper than `keep`, counting each finished directory
/// towards its parent.
fn close_frames<F>(frames: &mut Vec<DirFrame>, keep: usize, sink: &mut F) -> ControlFlow<()>
where
    F: FnMut(WalkEvent) -> ControlFlow<()>,
{
    while frames.len() > keep {
        frames.pop();
        if let Some(parent) = frames.last_mut() {
            parent.processed += 1;
            if sink(WalkEvent::Progress(parent.progress())).is_break() {
                return ControlFlow::Break(());
            }
        }
    }
    ControlFlow::Continue(())
}

/// Path of `path` relative to `root`, `/`-separated, without leading or
/// trailing separators.
pub fn logical_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}
