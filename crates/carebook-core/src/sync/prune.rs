//! Local orphan removal.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::{SyncError, SyncResult};
use crate::files::{paths, LocalFiles};
use crate::models::Category;

/// Delete files in `category`'s directory that `live` does not reference.
///
/// Paths are compared in portable form, so `file://` and plain references
/// to the same file match. A file that fails to delete is logged and
/// skipped. Only a failure to list the directory is an error.
pub fn prune_orphans(
    files: &dyn LocalFiles,
    category: Category,
    live: &BTreeSet<String>,
) -> SyncResult<usize> {
    let base = files.base_uri();
    let keep: BTreeSet<String> = live.iter().map(|uri| paths::to_portable(uri, base)).collect();

    let entries = files
        .list_directory(category)
        .map_err(|e| SyncError::local_io(&paths::join(base, category.dir_name()), e))?;

    let mut deleted = 0;
    for entry in entries {
        if keep.contains(&paths::to_portable(&entry.path, base)) {
            continue;
        }
        match files.delete(&entry.path) {
            Ok(()) => {
                debug!(%category, name = %entry.name, "pruned orphan");
                deleted += 1;
            }
            Err(e) => warn!(%category, path = %entry.path, error = %e, "failed to prune orphan"),
        }
    }
    Ok(deleted)
}
