//! td-reconcile
//!
//! Price reconciliation for one category at a time:
//! - the whole candidate batch is validated before anything changes
//! - each candidate is diffed field-by-field against the stored record with
//!   the same id; every differing field becomes one audit entry
//! - the category slice of the store is replaced and the store persisted
//! - only a successful persist is followed by a change notification
//!
//! `validate` and `diff` are pure. `engine` owns the state and the IO.

mod diff;
mod engine;
mod error;
mod locks;
mod validate;

pub use diff::{diff_batch, diff_record};
pub use engine::{Notifier, ReconcileEngine, ReconcileOutcome};
pub use error::{BatchRejection, ReconcileError};
pub use locks::CategoryLocks;
pub use validate::{is_valid_entry, validate_batch};
