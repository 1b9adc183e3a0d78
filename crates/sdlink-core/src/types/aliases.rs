//! Type aliases for commonly used complex types.
//!
//! Shared state between a transfer worker and its caller goes through
//! `parking_lot` primitives wrapped in `Arc`.

use crate::data::ProgressEvent;
use parking_lot::Mutex;
use std::sync::Arc;

/// A thread-safe, mutex-protected wrapper for cross-thread sharing.
///
/// # Example
/// ```rust,ignore
/// let log: ThreadSafe<Vec<String>> = thread_safe(Vec::new());
/// log.lock().push("ok".to_string());
/// ```
pub type ThreadSafe<T> = Arc<Mutex<T>>;

/// Observer invoked with each progress snapshot of a transfer.
pub type ProgressCallback = Box<dyn FnMut(&ProgressEvent) + Send>;

/// Create a new `ThreadSafe<T>` from a value.
pub fn thread_safe<T>(value: T) -> ThreadSafe<T> {
    Arc::new(Mutex::new(value))
}
