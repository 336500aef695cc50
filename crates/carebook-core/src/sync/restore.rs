//! Remote → local restore.

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use carebook_drive::{Query, RemoteFile, FOLDER_MIME_TYPE, ROOT_FOLDER_ID};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::folders::FolderResolver;
use super::live_set::LiveSet;
use super::progress::{ProgressEvent, SyncPhase};
use super::{manifest, pool, prune, SyncContext, SyncError, SyncResult};
use crate::files::{paths, LocalFiles};
use crate::models::{Category, MedicalRecord, Patient};

/// Outcome of a committed restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub success: bool,
    pub patients_count: usize,
    pub records_count: usize,
    pub files_restored: usize,
    /// Local files no restored entry references
    pub pruned_local: usize,
}

/// Replace local state with the remote backup.
///
/// Files are downloaded into a staging directory first. Any failure up to
/// and including manifest parsing discards the staged files and returns
/// `Err` with the watched directories and collections untouched.
pub fn restore(ctx: &SyncContext<'_>) -> SyncResult<RestoreReport> {
    let mut run = RestoreRun {
        ctx,
        phase: SyncPhase::Idle,
    };
    match run.execute() {
        Ok(report) => {
            run.enter(SyncPhase::Done);
            Ok(report)
        }
        Err(e) => {
            error!(phase = ?run.phase, error = %e, "restore failed");
            run.enter(SyncPhase::Failed);
            Err(e)
        }
    }
}

/// One remote file on its way into a watched directory.
struct Download {
    file: RemoteFile,
    staged: String,
    target: String,
}

struct RestoreRun<'c, 'a> {
    ctx: &'c SyncContext<'a>,
    phase: SyncPhase,
}

impl RestoreRun<'_, '_> {
    fn enter(&mut self, phase: SyncPhase) {
        debug!(from = ?self.phase, to = ?phase, "restore phase");
        self.phase = phase;
        self.ctx.progress.on_progress(&ProgressEvent::phase(phase));
    }

    fn execute(&mut self) -> SyncResult<RestoreReport> {
        let ctx = self.ctx;
        let token = ctx.credentials.access_token()?;

        self.enter(SyncPhase::Listing);
        let mut folders = FolderResolver::new(ctx.remote, &token);
        let root_id = folders
            .find(&ctx.config.root_folder_name, ROOT_FOLDER_ID)?
            .ok_or_else(|| {
                SyncError::NotFound(format!("backup folder {}", ctx.config.root_folder_name))
            })?;
        let mut downloads = Vec::new();
        for category in Category::ALL {
            let Some(folder_id) = folders.find(category.dir_name(), &root_id)? else {
                debug!(%category, "no remote folder, nothing to restore");
                continue;
            };
            let listed = ctx.remote.list_files(
                &token,
                &Query::new().in_parent(&folder_id).not_mime_type(FOLDER_MIME_TYPE),
            )?;
            let (safe, rejected): (Vec<_>, Vec<_>) =
                listed.into_iter().partition(|f| paths::is_safe_name(&f.name));
            for file in &rejected {
                warn!(
                    %category,
                    name = ?file.name,
                    id = %file.id,
                    "skipping remote file with unusable name"
                );
            }
            downloads.extend(newest_by_name(safe).into_iter().map(|file| Download {
                staged: paths::staging_path(ctx.files.base_uri(), category, &file.name),
                target: ctx.files.category_path(category, &file.name),
                file,
            }));
        }
        info!(files = downloads.len(), "restore listing complete");

        let (patients, records) = match self.stage(&token, &root_id, &downloads) {
            Ok(parsed) => parsed,
            Err(e) => {
                discard_staged(ctx.files, &downloads);
                return Err(e);
            }
        };

        self.enter(SyncPhase::Committing);
        let committed = downloads.iter().try_for_each(|download| {
            ctx.files
                .copy(&download.staged, &download.target)
                .map_err(|e| SyncError::local_io(&download.target, e))
        });
        discard_staged(ctx.files, &downloads);
        committed?;

        let patients = manifest::localize_patients(patients, ctx.files)?;
        let records = manifest::localize_records(records, ctx.files)?;
        ctx.store.replace_all(&patients, &records)?;
        if let Err(e) = ctx.store.set_last_restore_at(Utc::now()) {
            warn!(error = %e, "failed to record restore time");
        }

        let live = LiveSet::compute(&patients, &records, ctx.files.base_uri());
        let mut pruned_local = 0;
        for category in Category::ALL {
            match prune::prune_orphans(ctx.files, category, live.get(category)) {
                Ok(count) => pruned_local += count,
                Err(e) => warn!(%category, error = %e, "post-restore prune failed"),
            }
        }

        let report = RestoreReport {
            success: true,
            patients_count: patients.len(),
            records_count: records.len(),
            files_restored: downloads.len(),
            pruned_local,
        };
        info!(
            patients = report.patients_count,
            records = report.records_count,
            files = report.files_restored,
            pruned_local,
            "restore committed"
        );
        Ok(report)
    }

    /// Download every file into staging, then fetch and parse both manifests.
    fn stage(
        &mut self,
        token: &str,
        root_id: &str,
        downloads: &[Download],
    ) -> SyncResult<(Vec<Patient>, Vec<MedicalRecord>)> {
        let ctx = self.ctx;

        self.enter(SyncPhase::Downloading);
        let remote = ctx.remote;
        let files = ctx.files;
        let progress = ctx.progress;
        let total = downloads.len();
        let completed = AtomicUsize::new(0);
        let results = pool::run_bounded(downloads, ctx.config.workers(), |download| {
            let result = remote
                .download_file(token, &download.file.id)
                .and_then(|bytes| {
                    files
                        .write(&download.staged, &bytes)
                        .map_err(|e| SyncError::local_io(&download.staged, e))
                });
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            let error = result.as_ref().err().map(ToString::to_string);
            progress.on_progress(&ProgressEvent::item(
                SyncPhase::Downloading,
                &download.file.name,
                done,
                total,
                error,
            ));
            result
        });
        results.into_iter().collect::<SyncResult<Vec<()>>>()?;

        self.enter(SyncPhase::ParsingManifests);
        let patients = self.fetch_manifest(token, root_id, &ctx.config.patients_manifest)?;
        let records = self.fetch_manifest(token, root_id, &ctx.config.records_manifest)?;
        Ok((patients, records))
    }

    fn fetch_manifest<T: DeserializeOwned>(
        &self,
        token: &str,
        root_id: &str,
        name: &str,
    ) -> SyncResult<Vec<T>> {
        let remote = self.ctx.remote;
        let candidates = remote.list_files(
            token,
            &Query::new()
                .named(name)
                .in_parent(root_id)
                .not_mime_type(FOLDER_MIME_TYPE),
        )?;
        let file = newest(candidates)
            .ok_or_else(|| SyncError::NotFound(format!("manifest {}", name)))?;
        let bytes = remote.download_file(token, &file.id)?;
        manifest::decode(name, &bytes)
    }
}

/// Latest copy of each file name.
fn newest_by_name(files: Vec<RemoteFile>) -> Vec<RemoteFile> {
    let mut by_name: BTreeMap<String, Vec<RemoteFile>> = BTreeMap::new();
    for file in files {
        by_name.entry(file.name.clone()).or_default().push(file);
    }
    by_name.into_values().filter_map(newest).collect()
}

/// Most recently modified file, ties broken by id.
fn newest(files: Vec<RemoteFile>) -> Option<RemoteFile> {
    files
        .into_iter()
        .max_by(|a, b| (&a.modified_time, &a.id).cmp(&(&b.modified_time, &b.id)))
}

/// Remove staged files, then the staging directories if they are empty.
fn discard_staged(files: &dyn LocalFiles, downloads: &[Download]) {
    for download in downloads {
        if let Err(e) = files.delete(&download.staged) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %download.staged, error = %e, "failed to remove staged file");
            }
        }
    }
    let base = files.base_uri();
    let dirs = Category::ALL
        .into_iter()
        .map(|category| paths::staging_dir(base, Some(category)))
        .chain([paths::staging_dir(base, None)]);
    for dir in dirs {
        match files.remove_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => debug!(path = %dir, error = %e, "staging directory left in place"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_file(id: &str, name: &str, modified: Option<&str>) -> RemoteFile {
        RemoteFile {
            id: id.to_string(),
            name: name.to_string(),
            parents: vec!["p".to_string()],
            mime_type: "image/png".to_string(),
            modified_time: modified.map(str::to_string),
        }
    }

    #[test]
    fn test_newest_prefers_latest_modified() {
        let files = vec![
            remote_file("b", "a.png", Some("2024-01-01T00:00:00.000Z")),
            remote_file("a", "a.png", Some("2024-02-01T00:00:00.000Z")),
        ];
        assert_eq!(newest(files).unwrap().id, "a");
    }

    #[test]
    fn test_newest_by_name_dedupes() {
        let files = vec![
            remote_file("1", "a.png", Some("2024-01-01T00:00:00.000Z")),
            remote_file("2", "b.png", None),
            remote_file("3", "a.png", Some("2024-03-01T00:00:00.000Z")),
        ];
        let kept = newest_by_name(files);
        let ids: Vec<&str> = kept.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);
    }

    #[test]
    fn test_newest_of_nothing() {
        assert!(newest(Vec::new()).is_none());
    }
}
