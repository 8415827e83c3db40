//! Recursive, concurrent directory scanner.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Semaphore, SemaphorePermit, broadcast};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use dirscope_core::tree::{self, SortOrder};
use dirscope_core::{
    EntryInfo, FileTree, Node, ScanConfig, ScanError, ScanWarning, WarningKind,
};

use crate::dispatch::{Dispatcher, InlineDispatcher};
use crate::listing::{self, Listing};
use crate::progress::{ScanEvent, ScanProgress};
use crate::session::ScanSession;

/// Capacity of the live event channel.
pub const EVENT_CHANNEL_SIZE: usize = 1024;

type DirFuture = Pin<Box<dyn Future<Output = Result<u64, ScanError>> + Send + 'static>>;

/// Outcome of a scan that ran to completion.
#[derive(Debug)]
pub struct ScanReport {
    /// Root of the finished tree.
    pub root: Arc<Node>,
    /// Time taken by the scan.
    pub duration: Duration,
    /// Failures below the root that were absorbed.
    pub warnings: Vec<ScanWarning>,
    /// Final counters.
    pub progress: ScanProgress,
}

impl ScanReport {
    /// Total size of the scanned subtree.
    pub fn total_size(&self) -> u64 {
        self.root.size()
    }

    /// Wrap the root in a [`FileTree`] for lookups and removal.
    pub fn into_tree(self) -> FileTree {
        FileTree::new(self.root)
    }
}

/// Scanner that expands a directory tree with one task per directory.
///
/// A scanner runs at most one session at a time. Starting a new scan
/// supersedes (and cancels) the previous one.
pub struct Scanner {
    config: Arc<ScanConfig>,
    dispatcher: Arc<dyn Dispatcher>,
    events_tx: broadcast::Sender<ScanEvent>,
    current: Mutex<Option<Arc<ScanSession>>>,
}

impl Scanner {
    /// Create a scanner with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ScanConfig::default())
    }

    /// Create a scanner with a custom configuration.
    pub fn with_config(config: ScanConfig) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(InlineDispatcher),
            events_tx,
            current: Mutex::new(None),
        }
    }

    /// Route the root callback through `dispatcher`.
    pub fn with_dispatcher(mut self, dispatcher: impl Dispatcher) -> Self {
        self.dispatcher = Arc::new(dispatcher);
        self
    }

    /// The configuration used for every scan.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Subscribe to live tree events.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events_tx.subscribe()
    }

    /// The session currently running, if any.
    pub fn current_session(&self) -> Option<Arc<ScanSession>> {
        self.current.lock().clone()
    }

    /// Whether a scan is in progress.
    pub fn is_scanning(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Request cancellation of the running scan.
    ///
    /// Returns immediately; the scan unwinds cooperatively. Calling this with
    /// no scan running does nothing.
    pub fn stop(&self) {
        if let Some(session) = self.current.lock().as_ref() {
            debug!("Stop requested");
            session.cancel();
        }
    }

    /// Scan `path`, calling `on_root_created` once the root node exists.
    ///
    /// The callback is dispatched before any recursive work starts, so the
    /// consumer receives a root even if the scan is later cancelled. Failures
    /// below the root never fail the scan; they show up as warnings and
    /// zero-sized unreadable nodes.
    pub async fn scan<F>(
        &self,
        path: impl AsRef<Path>,
        on_root_created: F,
    ) -> Result<ScanReport, ScanError>
    where
        F: FnOnce(Arc<Node>) + Send + 'static,
    {
        let path = path.as_ref().to_path_buf();
        let session = self.begin_session();
        let ctx = Arc::new(ScanContext::new(
            self.config.clone(),
            session.clone(),
            self.events_tx.clone(),
        ));

        let result = self.run(ctx.clone(), path, on_root_created).await;
        self.end_session(&session);

        match &result {
            Ok(report) => {
                info!(
                    "Scan complete: {} bytes in {:.2}s ({} warnings)",
                    report.total_size(),
                    report.duration.as_secs_f64(),
                    report.warnings.len()
                );
                ctx.emit(ScanEvent::Completed {
                    elapsed: report.duration,
                });
            }
            Err(ScanError::Cancelled) => {
                info!("Scan cancelled");
                ctx.emit(ScanEvent::Cancelled);
            }
            Err(err) => warn!("Scan failed: {err}"),
        }
        result
    }

    async fn run<F>(
        &self,
        ctx: Arc<ScanContext>,
        path: PathBuf,
        on_root_created: F,
    ) -> Result<ScanReport, ScanError>
    where
        F: FnOnce(Arc<Node>) + Send + 'static,
    {
        info!("Starting scan of {}", path.display());

        let root_path = path.clone();
        let root = tokio::task::spawn_blocking(move || tree::create_root(&root_path))
            .await
            .map_err(|e| ScanError::Other {
                message: e.to_string(),
            })??;

        let callback_root = root.clone();
        self.dispatcher
            .dispatch(Box::new(move || on_root_created(callback_root)));
        ctx.emit(ScanEvent::RootCreated {
            id: root.id(),
            path: path.clone(),
        });

        if root.is_dir() {
            process_directory(ctx.clone(), root.clone()).await?;
        } else {
            let file_path = path.clone();
            let size = tokio::task::spawn_blocking(move || std::fs::metadata(&file_path))
                .await
                .map_err(|e| ScanError::Other {
                    message: e.to_string(),
                })?
                .map_err(|source| ScanError::RootUnreadable {
                    path: path.clone(),
                    source,
                })?
                .len();
            ctx.set_size(&root, size);
        }

        Ok(ScanReport {
            root,
            duration: ctx.session.counters.elapsed(),
            warnings: ctx.session.warnings(),
            progress: ctx.session.counters.snapshot(path),
        })
    }

    fn begin_session(&self) -> Arc<ScanSession> {
        let session = Arc::new(ScanSession::new());
        let mut current = self.current.lock();
        if let Some(previous) = current.replace(session.clone()) {
            debug!("Superseding running scan");
            previous.cancel();
        }
        session
    }

    fn end_session(&self, session: &Arc<ScanSession>) {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, session)) {
            *current = None;
        }
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared by every directory task of one session.
struct ScanContext {
    config: Arc<ScanConfig>,
    session: Arc<ScanSession>,
    events: broadcast::Sender<ScanEvent>,
    limiter: Semaphore,
}

impl ScanContext {
    fn new(
        config: Arc<ScanConfig>,
        session: Arc<ScanSession>,
        events: broadcast::Sender<ScanEvent>,
    ) -> Self {
        let permits = match config.max_concurrent_reads {
            0 => Semaphore::MAX_PERMITS,
            n => n,
        };
        Self {
            config,
            session,
            events,
            limiter: Semaphore::new(permits),
        }
    }

    fn emit(&self, event: ScanEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn warn(&self, warning: ScanWarning) {
        self.session.record_warning(warning.clone());
        self.emit(ScanEvent::Warning(warning));
    }

    fn set_size(&self, node: &Node, size: u64) {
        tree::update_size(node, size);
        self.emit(ScanEvent::SizeChanged { id: node.id(), size });
    }

    fn set_loading(&self, node: &Node, loading: bool) {
        tree::update_loading(node, loading);
        self.emit(ScanEvent::LoadingChanged {
            id: node.id(),
            loading,
        });
    }

    fn attach(&self, node: &Arc<Node>, entries: Vec<EntryInfo>) -> Vec<Arc<Node>> {
        let children = tree::attach_children(node, entries);
        self.emit(ScanEvent::ChildrenAttached {
            id: node.id(),
            count: children.len(),
        });
        children
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>, ScanError> {
        tokio::select! {
            biased;
            () = self.session.cancelled() => Err(ScanError::Cancelled),
            permit = self.limiter.acquire() => permit.map_err(|_| ScanError::Cancelled),
        }
    }

    async fn list(&self, dir: &Path) -> io::Result<Listing> {
        let dir = dir.to_path_buf();
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || listing::read_entries(&dir, &config))
            .await
            .map_err(io::Error::other)?
    }
}

/// Expand `node`, size its subtree, and return the subtree's total bytes.
///
/// Returns `Cancelled` as soon as the session is stopped; child tasks that
/// are still running are aborted with the task's `JoinSet`.
fn process_directory(ctx: Arc<ScanContext>, node: Arc<Node>) -> DirFuture {
    Box::pin(async move {
        if ctx.session.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        ctx.set_loading(&node, true);

        let listing = {
            let _permit = ctx.acquire().await?;
            ctx.list(node.path()).await
        };

        let listing = match listing {
            Ok(listing) => listing,
            Err(err) => {
                warn!("Error scanning {}: {err}", node.path().display());
                ctx.warn(ScanWarning::read_error(node.path(), &err));
                tree::mark_unreadable(&node);
                ctx.set_size(&node, 0);
                ctx.set_loading(&node, false);
                return Ok(0);
            }
        };

        for warning in listing.skipped.iter().cloned() {
            debug!("Skipping entry {}: {}", warning.path.display(), warning.message);
            ctx.warn(warning);
        }
        let (file_count, file_bytes) = listing.file_totals();
        debug!(
            "Listed {} ({} entries, {} files)",
            node.path().display(),
            listing.entries.len(),
            file_count
        );
        ctx.session.counters.record_listing(file_count, file_bytes);
        ctx.emit(ScanEvent::Progress(
            ctx.session.counters.snapshot(node.path().to_path_buf()),
        ));

        let children = ctx.attach(&node, listing.entries);

        let mut pending = JoinSet::new();
        for child in children.iter().filter(|c| c.is_dir()) {
            pending.spawn(process_directory(ctx.clone(), child.clone()));
        }

        let mut total = file_bytes;
        loop {
            let joined = tokio::select! {
                biased;
                () = ctx.session.cancelled() => return Err(ScanError::Cancelled),
                joined = pending.join_next() => joined,
            };
            let Some(joined) = joined else {
                break;
            };
            match joined {
                Ok(Ok(size)) => total += size,
                Ok(Err(err)) => return Err(err),
                Err(err) if err.is_panic() => {
                    warn!("Directory task under {} panicked", node.path().display());
                    ctx.warn(ScanWarning::new(
                        node.path(),
                        "Directory task failed",
                        WarningKind::TaskFailed,
                    ));
                }
                Err(_) => return Err(ScanError::Cancelled),
            }
        }

        ctx.set_size(&node, total);
        tree::sort_children(&node, SortOrder::Size);
        ctx.set_loading(&node, false);
        Ok(total)
    })
}
