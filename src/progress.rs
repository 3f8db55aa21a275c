//! Progress-callback trait: the busy indicator and status line of each action.
//!
//! Inject an [`Arc<dyn OperationProgressCallback>`] into
//! [`crate::dispatch::Dispatcher::with_progress`] to receive events while a
//! handler runs. The CLI uses this to drive its spinner; tests use it to
//! count busy transitions.
//!
//! For every handler invocation that gets past validation,
//! `on_operation_start` is called exactly once and `on_operation_complete`
//! is called exactly once, on success and on failure alike. Invocations that
//! fail validation produce neither.
//!
//! # Example
//!
//! ```rust
//! use pdfdesk::{Action, OperationProgressCallback};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct PageCounter(AtomicUsize);
//!
//! impl OperationProgressCallback for PageCounter {
//!     fn on_page_complete(&self, _action: Action, page_num: usize, total_pages: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages}");
//!     }
//! }
//! ```

use crate::dispatch::Action;
use crate::output::StatusMessage;
use std::sync::Arc;

/// Receives busy, status and per-page events from the dispatcher.
///
/// Implementations must be `Send + Sync`: handlers run their library work on
/// the blocking thread pool and different actions may run concurrently. All
/// methods have default no-op implementations.
pub trait OperationProgressCallback: Send + Sync {
    /// The busy indicator for `action` should appear.
    fn on_operation_start(&self, action: Action) {
        let _ = action;
    }

    /// The status line for `action` changed.
    fn on_status(&self, action: Action, status: &StatusMessage) {
        let _ = (action, status);
    }

    /// A page finished (rendered, split off, copied, rotated).
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: pages this operation will touch
    fn on_page_complete(&self, action: Action, page_num: usize, total_pages: usize) {
        let _ = (action, page_num, total_pages);
    }

    /// The busy indicator for `action` should disappear.
    ///
    /// # Arguments
    /// * `status`: the final status (success or error)
    fn on_operation_complete(&self, action: Action, status: &StatusMessage) {
        let _ = (action, status);
    }
}

/// A no-op implementation for callers that don't need events.
pub struct NoopProgressCallback;

impl OperationProgressCallback for NoopProgressCallback {}

/// Convenience alias for the shared callback handle.
pub type ProgressCallback = Arc<dyn OperationProgressCallback>;

/// Keeps the busy indicator up for as long as it lives.
///
/// Created right before an action starts working; dropping it (normally, by
/// `?`, or by unwinding) fires `on_operation_complete` once. The final status
/// is whatever was last passed to [`BusyGuard::finish`], or a generic error
/// if the guard is dropped without one.
pub(crate) struct BusyGuard {
    action: Action,
    callback: ProgressCallback,
    final_status: Option<StatusMessage>,
}

impl BusyGuard {
    pub(crate) fn start(action: Action, callback: ProgressCallback) -> Self {
        callback.on_operation_start(action);
        Self {
            action,
            callback,
            final_status: None,
        }
    }

    /// Record the status to report when the indicator is cleared.
    pub(crate) fn finish(&mut self, status: StatusMessage) {
        self.final_status = Some(status);
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let status = self
            .final_status
            .take()
            .unwrap_or_else(|| StatusMessage::error(&crate::PdfDeskError::Internal(
                "operation ended unexpectedly".into(),
            )));
        self.callback.on_operation_complete(self.action, &status);
    }
}
