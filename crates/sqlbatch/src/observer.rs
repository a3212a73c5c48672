//! Change notification for model writes.
//!
//! A [`Model`](crate::Model) can carry one [`ChangeObserver`]. Inserts and
//! replaces report the stored row after the write; updates, increments and
//! deletes report the rows as they were before the write.

use std::sync::mpsc::Sender;

use sqlbatch_core::{Row, SqlValue};
use tracing::debug;

/// The write that produced a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A row was inserted.
    Insert,
    /// A row was inserted or replaced with `REPLACE`.
    Replace,
    /// A row was updated.
    Update,
    /// A counter column was incremented.
    Increment,
    /// A row was deleted.
    Delete,
}

/// One changed row.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Table the row belongs to.
    pub table: String,
    /// What happened.
    pub kind: ChangeKind,
    /// Primary key value.
    pub id: SqlValue,
    /// Post-image for inserts and replaces, pre-image otherwise.
    pub row: Row,
}

/// Receives change events from a model.
pub trait ChangeObserver: Send {
    /// Called once per changed row, after the write succeeded.
    fn on_change(&mut self, event: &ChangeEvent);
}

/// Adapts a closure into a [`ChangeObserver`].
pub struct FnObserver<F>(F);

/// Wraps `f` as an observer.
pub const fn from_fn<F>(f: F) -> FnObserver<F>
where
    F: FnMut(&ChangeEvent) + Send,
{
    FnObserver(f)
}

impl<F> ChangeObserver for FnObserver<F>
where
    F: FnMut(&ChangeEvent) + Send,
{
    fn on_change(&mut self, event: &ChangeEvent) {
        (self.0)(event);
    }
}

impl ChangeObserver for Sender<ChangeEvent> {
    fn on_change(&mut self, event: &ChangeEvent) {
        if self.send(event.clone()).is_err() {
            debug!(table = %event.table, "Change receiver dropped");
        }
    }
}
