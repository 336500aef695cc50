//! Run phases and progress reporting.

use serde::Serialize;

/// Where a run currently is.
///
/// Backup: `Idle → Pruning → Serializing → Uploading → CleaningRemote → Done | Failed`.
/// Restore: `Idle → Listing → Downloading → ParsingManifests → Committing → Done | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncPhase {
    Idle,
    Pruning,
    Serializing,
    Uploading,
    CleaningRemote,
    Listing,
    Downloading,
    ParsingManifests,
    Committing,
    Done,
    Failed,
}

/// One progress notification.
///
/// Phase changes carry no `item`. Per-item events carry the item name, a
/// running count and the error message if that item failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub phase: SyncPhase,
    pub item: Option<String>,
    pub completed: usize,
    pub total: usize,
    pub error: Option<String>,
}

impl ProgressEvent {
    pub fn phase(phase: SyncPhase) -> Self {
        Self {
            phase,
            item: None,
            completed: 0,
            total: 0,
            error: None,
        }
    }

    pub fn item(
        phase: SyncPhase,
        name: &str,
        completed: usize,
        total: usize,
        error: Option<String>,
    ) -> Self {
        Self {
            phase,
            item: Some(name.to_string()),
            completed,
            total,
            error,
        }
    }
}

/// Receives progress events, possibly from several workers at once.
pub trait ProgressSink: Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
