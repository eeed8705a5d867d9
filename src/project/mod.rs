//! Reader facade over a project file.
//!
//! [`ProjectReader`] owns the file window for its whole lifetime and orchestrates the
//! scanners on demand: HTTP history, scanner findings, UI tasks, repeater tabs, task
//! summaries. Every scan result is cached on first construction and immutable
//! afterwards; re-opening the file rebuilds identical caches.
//!
//! # Concurrency
//!
//! A single reader-writer lock protects the caches. Queries against populated caches
//! take the shared mode; the exclusive mode is held only while a cache is being
//! populated. The streaming history API runs its producer on a dedicated thread and
//! hands back two channels: entries, and a terminal error that reports cancellation
//! exactly once.
//!
//! # Examples
//!
//! ```rust,no_run
//! use burpscope::ProjectReader;
//! use std::path::Path;
//!
//! let reader = ProjectReader::open(Path::new("project.burp"))?;
//! println!("{} bytes", reader.metadata().file_size);
//! for entry in reader.http_history().iter() {
//!     println!("{} {}", entry.method, entry.url);
//! }
//! # Ok::<(), burpscope::Error>(())
//! ```

mod sitemap;

pub use sitemap::{build_site_map, SiteMap, SiteMapHost, SiteMapNode};

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
    thread,
};

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Serialize;

use crate::{
    defs::{DefinitionLookup, DefinitionSet},
    file::ProjectFile,
    http::{build_entry, HttpEntry},
    scan::{
        scan_http_records, scan_issue_metas, scan_repeater_tabs, scan_task_summaries,
        scan_ui_tasks, HttpRecordLocation, IssueMeta, TaskSummary, UiTask,
    },
    Error, Result,
};

/// Capacity of the streaming entry channel; the producer suspends when it is full.
const STREAM_BUFFER: usize = 100;

/// Project-level facts that need no scanning.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ProjectMetadata {
    /// Size of the project file in bytes
    pub file_size: u64,
    /// Number of HTTP entries, once the history scan has run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<usize>,
}

/// Cooperative cancellation handle for streaming queries.
///
/// Cloned freely; cancelling any clone cancels them all. The producer observes the
/// token between entries, so cancellation takes effect at the next suspension point.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    notify_tx: Sender<()>,
    notify_rx: Receiver<()>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> CancelToken {
        let (notify_tx, notify_rx) = bounded(1);
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
            notify_tx,
            notify_rx,
        }
    }

    /// Requests cancellation; idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let _ = self.notify_tx.try_send(());
    }

    /// Returns true once [`CancelToken::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct ProjectCache {
    locations: Option<Arc<Vec<HttpRecordLocation>>>,
    history: Option<Arc<Vec<HttpEntry>>>,
    issues: Option<Arc<Vec<IssueMeta>>>,
    tasks: Option<Arc<Vec<UiTask>>>,
    repeater_tabs: Option<Arc<Vec<String>>>,
    summaries: Option<Arc<Vec<TaskSummary>>>,
}

/// Read-only reader over one project file.
///
/// The underlying file handle is held for the reader's lifetime and released on drop,
/// on every exit path. Multiple readers over the same file are safe; the file is only
/// ever mapped read-only.
pub struct ProjectReader {
    file: ProjectFile,
    path: Option<PathBuf>,
    definitions: Arc<dyn DefinitionLookup>,
    cache: RwLock<ProjectCache>,
}

impl ProjectReader {
    /// Opens a project file with the embedded issue-definition dictionary.
    ///
    /// # Errors
    /// Fails on I/O errors, a too-small file, or a magic mismatch.
    pub fn open(path: &Path) -> Result<ProjectReader> {
        Self::open_with_definitions(path, Arc::new(DefinitionSet::embedded().clone()))
    }

    /// Opens a project file with a caller-provided definition lookup.
    ///
    /// The lookup is the only piece of configuration the reader takes; all other
    /// tuning lives with the individual consumers.
    ///
    /// # Errors
    /// Fails on I/O errors, a too-small file, or a magic mismatch.
    pub fn open_with_definitions(
        path: &Path,
        definitions: Arc<dyn DefinitionLookup>,
    ) -> Result<ProjectReader> {
        Ok(ProjectReader {
            file: ProjectFile::from_file(path)?,
            path: Some(path.to_path_buf()),
            definitions,
            cache: RwLock::new(ProjectCache::default()),
        })
    }

    /// Builds a reader over in-memory project bytes.
    ///
    /// # Errors
    /// Fails on a too-small buffer or a magic mismatch.
    pub fn from_bytes(data: Vec<u8>) -> Result<ProjectReader> {
        Self::from_bytes_with_definitions(data, Arc::new(DefinitionSet::embedded().clone()))
    }

    /// Builds a reader over in-memory project bytes with a caller-provided lookup.
    ///
    /// # Errors
    /// Fails on a too-small buffer or a magic mismatch.
    pub fn from_bytes_with_definitions(
        data: Vec<u8>,
        definitions: Arc<dyn DefinitionLookup>,
    ) -> Result<ProjectReader> {
        Ok(ProjectReader {
            file: ProjectFile::from_mem(data)?,
            path: None,
            definitions,
            cache: RwLock::new(ProjectCache::default()),
        })
    }

    /// The path the reader was opened from, absent for in-memory readers.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Direct access to the underlying file window.
    #[must_use]
    pub fn file(&self) -> &ProjectFile {
        &self.file
    }

    /// Project metadata; cheap, never triggers a scan.
    #[must_use]
    pub fn metadata(&self) -> ProjectMetadata {
        let cache = read_lock!(self.cache);
        ProjectMetadata {
            file_size: self.file.size(),
            record_count: cache.history.as_ref().map(|h| h.len()),
        }
    }

    /// Number of HTTP entries, materializing only the location scan.
    #[must_use]
    pub fn http_history_count(&self) -> usize {
        {
            let cache = read_lock!(self.cache);
            if let Some(history) = &cache.history {
                return history.len();
            }
            if let Some(locations) = &cache.locations {
                return locations.len();
            }
        }
        self.locations().len()
    }

    /// All HTTP entries, parsed and cached, in ascending id order.
    #[must_use]
    pub fn http_history(&self) -> Arc<Vec<HttpEntry>> {
        {
            let cache = read_lock!(self.cache);
            if let Some(history) = &cache.history {
                return Arc::clone(history);
            }
        }

        let locations = self.locations();
        let mut cache = write_lock!(self.cache);
        if let Some(history) = &cache.history {
            return Arc::clone(history);
        }

        let entries: Vec<HttpEntry> = locations
            .iter()
            .filter_map(|loc| self.parse_entry(loc))
            .collect();
        let entries = Arc::new(entries);
        cache.history = Some(Arc::clone(&entries));
        entries
    }

    /// Streams HTTP entries on a producer thread.
    ///
    /// Returns the entry channel and a terminal error channel. The producer suspends on
    /// each send once the buffer is full; the consumer may cancel between any two
    /// entries. On cancellation the entry channel closes and the cause is reported once
    /// on the error channel. Both channels close with nothing further after the last
    /// entry on success.
    #[must_use]
    pub fn stream_http_history(
        self: Arc<Self>,
        cancel: CancelToken,
    ) -> (Receiver<HttpEntry>, Receiver<Error>) {
        let (entry_tx, entry_rx) = bounded(STREAM_BUFFER);
        let (err_tx, err_rx) = bounded(1);
        let reader = Arc::clone(&self);

        thread::spawn(move || {
            let locations = reader.locations();

            for loc in locations.iter() {
                if cancel.is_cancelled() {
                    let _ = err_tx.send(Error::Cancelled);
                    return;
                }

                let Some(entry) = reader.parse_entry(loc) else {
                    continue;
                };

                if cancel.is_cancelled() {
                    let _ = err_tx.send(Error::Cancelled);
                    return;
                }

                crossbeam_channel::select! {
                    send(entry_tx, entry) -> sent => {
                        if sent.is_err() {
                            // consumer hung up
                            return;
                        }
                    }
                    recv(cancel.notify_rx) -> _ => {
                        let _ = err_tx.send(Error::Cancelled);
                        return;
                    }
                }
            }
        });

        (entry_rx, err_rx)
    }

    /// All scanner findings, union of both discovery paths, cached.
    #[must_use]
    pub fn scanner_issue_metas(&self) -> Arc<Vec<IssueMeta>> {
        {
            let cache = read_lock!(self.cache);
            if let Some(issues) = &cache.issues {
                return Arc::clone(issues);
            }
        }

        let mut cache = write_lock!(self.cache);
        if let Some(issues) = &cache.issues {
            return Arc::clone(issues);
        }

        let metas = Arc::new(scan_issue_metas(&self.file, self.definitions.as_ref()));
        cache.issues = Some(Arc::clone(&metas));
        metas
    }

    /// The UI task list, cached on success.
    ///
    /// # Errors
    /// Propagates task-list decoding failures; a corrupt root list is not recoverable.
    pub fn ui_tasks(&self) -> Result<Arc<Vec<UiTask>>> {
        {
            let cache = read_lock!(self.cache);
            if let Some(tasks) = &cache.tasks {
                return Ok(Arc::clone(tasks));
            }
        }

        let mut cache = write_lock!(self.cache);
        if let Some(tasks) = &cache.tasks {
            return Ok(Arc::clone(tasks));
        }

        let tasks = Arc::new(scan_ui_tasks(&self.file)?);
        cache.tasks = Some(Arc::clone(&tasks));
        Ok(tasks)
    }

    /// Repeater tab names, first-seen order, cached.
    #[must_use]
    pub fn repeater_tab_names(&self) -> Arc<Vec<String>> {
        {
            let cache = read_lock!(self.cache);
            if let Some(tabs) = &cache.repeater_tabs {
                return Arc::clone(tabs);
            }
        }

        let mut cache = write_lock!(self.cache);
        if let Some(tabs) = &cache.repeater_tabs {
            return Arc::clone(tabs);
        }

        let tabs = Arc::new(scan_repeater_tabs(&self.file));
        cache.repeater_tabs = Some(Arc::clone(&tabs));
        tabs
    }

    /// Per-task aggregation over the findings, cached.
    #[must_use]
    pub fn scanner_task_summaries(&self) -> Arc<Vec<TaskSummary>> {
        {
            let cache = read_lock!(self.cache);
            if let Some(summaries) = &cache.summaries {
                return Arc::clone(summaries);
            }
        }

        let metas = self.scanner_issue_metas();
        let mut cache = write_lock!(self.cache);
        if let Some(summaries) = &cache.summaries {
            return Arc::clone(summaries);
        }

        let summaries = Arc::new(scan_task_summaries(&self.file, &metas));
        cache.summaries = Some(Arc::clone(&summaries));
        summaries
    }

    /// Site map over the cached history, grouped by host then path segments.
    #[must_use]
    pub fn site_map(&self) -> SiteMap {
        build_site_map(&self.http_history())
    }

    /// HTTP record locations, cached; the scan behind everything history-shaped.
    fn locations(&self) -> Arc<Vec<HttpRecordLocation>> {
        {
            let cache = read_lock!(self.cache);
            if let Some(locations) = &cache.locations {
                return Arc::clone(locations);
            }
        }

        let mut cache = write_lock!(self.cache);
        if let Some(locations) = &cache.locations {
            return Arc::clone(locations);
        }

        let locations = Arc::new(scan_http_records(&self.file));
        cache.locations = Some(Arc::clone(&locations));
        locations
    }

    /// Reads and parses one located pair; `None` when the request bytes are gone.
    fn parse_entry(&self, loc: &HttpRecordLocation) -> Option<HttpEntry> {
        if loc.request_len == 0 {
            return None;
        }
        let request = self
            .file
            .read_at(loc.request_offset, loc.request_len as usize)
            .ok()?;

        let response = if loc.response_len > 0 && loc.response_offset > 0 {
            self.file
                .read_at(loc.response_offset, loc.response_len as usize)
                .ok()
        } else {
            None
        };

        Some(build_entry(loc.request_offset, Some(request), response))
    }
}
