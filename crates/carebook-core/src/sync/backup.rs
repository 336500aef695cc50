//! Local → remote backup.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use carebook_drive::{Query, RemoteFile, FOLDER_MIME_TYPE, JSON_MIME_TYPE, ROOT_FOLDER_ID};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::folders::FolderResolver;
use super::live_set::LiveSet;
use super::progress::{ProgressEvent, ProgressSink, SyncPhase};
use super::{manifest, pool, prune, RemoteStore, SyncContext, SyncError, SyncResult};
use crate::files::{paths, LocalFiles};
use crate::models::Category;

/// One item that could not be backed up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    pub name: String,
    pub message: String,
}

/// Outcome of a backup that got past folder resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupReport {
    /// True when no item failed
    pub success: bool,
    pub uploaded: usize,
    /// Data files already present remotely
    pub skipped: usize,
    pub deleted_remote: usize,
    pub pruned_local: usize,
    pub errors: Vec<ItemError>,
    pub completed_at: DateTime<Utc>,
}

/// Back up the local collections and their live files.
///
/// Returns `Err` only when the run as a whole failed: no token, unreadable
/// collections, folder resolution failing, or the backend rejecting the
/// credentials. Remote cleanup never runs in that case. Per-item failures
/// are collected in [`BackupReport::errors`] instead.
pub fn backup(ctx: &SyncContext<'_>) -> SyncResult<BackupReport> {
    let mut run = BackupRun {
        ctx,
        phase: SyncPhase::Idle,
    };
    match run.execute() {
        Ok(report) => {
            run.enter(SyncPhase::Done);
            Ok(report)
        }
        Err(e) => {
            error!(phase = ?run.phase, error = %e, "backup failed");
            run.enter(SyncPhase::Failed);
            Err(e)
        }
    }
}

enum Payload {
    Manifest(Vec<u8>),
    File(String),
}

/// One upload task.
struct UploadItem {
    /// Remote file name
    name: String,
    folder_id: String,
    /// `None` for manifests
    category: Option<Category>,
    payload: Payload,
}

enum Uploaded {
    New,
    AlreadyPresent,
}

struct BackupRun<'c, 'a> {
    ctx: &'c SyncContext<'a>,
    phase: SyncPhase,
}

impl BackupRun<'_, '_> {
    fn enter(&mut self, phase: SyncPhase) {
        debug!(from = ?self.phase, to = ?phase, "backup phase");
        self.phase = phase;
        self.ctx.progress.on_progress(&ProgressEvent::phase(phase));
    }

    fn execute(&mut self) -> SyncResult<BackupReport> {
        let ctx = self.ctx;
        let token = ctx.credentials.access_token()?;
        let patients = ctx.store.read_patients()?;
        let records = ctx.store.read_records()?;
        let base = ctx.files.base_uri();
        let mut live = LiveSet::compute(&patients, &records, base);
        info!(
            patients = patients.len(),
            records = records.len(),
            live_files = live.len(),
            "starting backup"
        );

        self.enter(SyncPhase::Pruning);
        let mut pruned_local = 0;
        for category in Category::ALL {
            match prune::prune_orphans(ctx.files, category, live.get(category)) {
                Ok(count) => pruned_local += count,
                Err(e) => warn!(%category, error = %e, "local prune failed"),
            }
        }

        self.enter(SyncPhase::Serializing);
        let stale = live.retain_existing(ctx.files);
        if stale > 0 {
            info!(stale, "stale references left out of the backup");
        }
        let patients_json = manifest::encode(&manifest::portable_patients(&patients, base, &live))?;
        let records_json = manifest::encode(&manifest::portable_records(&records, base, &live))?;

        self.enter(SyncPhase::Uploading);
        let mut folders = FolderResolver::new(ctx.remote, &token);
        let root_id = folders.resolve(&ctx.config.root_folder_name, ROOT_FOLDER_ID)?;
        let mut category_folders = BTreeMap::new();
        for category in Category::ALL {
            category_folders.insert(category, folders.resolve(category.dir_name(), &root_id)?);
        }

        let mut items = vec![
            UploadItem {
                name: ctx.config.patients_manifest.clone(),
                folder_id: root_id.clone(),
                category: None,
                payload: Payload::Manifest(patients_json),
            },
            UploadItem {
                name: ctx.config.records_manifest.clone(),
                folder_id: root_id.clone(),
                category: None,
                payload: Payload::Manifest(records_json),
            },
        ];
        for (category, folder_id) in &category_folders {
            items.extend(data_items(*category, folder_id, &live));
        }

        let outcomes = upload_all(ctx, &token, &items);

        let mut report = BackupReport {
            success: false,
            uploaded: 0,
            skipped: 0,
            deleted_remote: 0,
            pruned_local,
            errors: Vec::new(),
            completed_at: Utc::now(),
        };
        let mut confirmed: BTreeMap<Category, BTreeSet<&str>> = BTreeMap::new();
        let mut failed_categories = BTreeSet::new();
        for (item, outcome) in items.iter().zip(outcomes) {
            match outcome {
                Ok(uploaded) => {
                    match uploaded {
                        Uploaded::New => report.uploaded += 1,
                        Uploaded::AlreadyPresent => report.skipped += 1,
                    }
                    if let Some(category) = item.category {
                        confirmed.entry(category).or_default().insert(item.name.as_str());
                    }
                }
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    warn!(name = %item.name, error = %e, "item failed to upload");
                    if let Some(category) = item.category {
                        failed_categories.insert(category);
                    }
                    report.errors.push(ItemError {
                        name: item.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        self.enter(SyncPhase::CleaningRemote);
        let mut doomed = Vec::new();
        for (category, folder_id) in &category_folders {
            if failed_categories.contains(category) {
                warn!(%category, "skipping remote cleanup after failed uploads");
                continue;
            }
            let keep = confirmed.remove(category).unwrap_or_default();
            match ctx.remote.list_files(&token, &Query::new().in_parent(folder_id)) {
                Ok(listed) => doomed.extend(
                    listed
                        .into_iter()
                        .filter(|f| !f.is_folder() && !f.is_json())
                        .filter(|f| !keep.contains(f.name.as_str())),
                ),
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => report.errors.push(ItemError {
                    name: category.dir_name().to_string(),
                    message: e.to_string(),
                }),
            }
        }

        let deletions = delete_all(ctx, &token, &doomed);
        for (file, result) in doomed.iter().zip(deletions) {
            match result {
                Ok(()) => report.deleted_remote += 1,
                Err(e) => {
                    warn!(name = %file.name, id = %file.id, error = %e, "failed to delete remote orphan");
                    report.errors.push(ItemError {
                        name: file.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        report.completed_at = Utc::now();
        report.success = report.errors.is_empty();
        if report.success {
            ctx.store.set_last_backup_at(report.completed_at)?;
        }
        info!(
            success = report.success,
            uploaded = report.uploaded,
            skipped = report.skipped,
            deleted_remote = report.deleted_remote,
            pruned_local = report.pruned_local,
            errors = report.errors.len(),
            folders_created = folders.created_count(),
            "backup finished"
        );
        Ok(report)
    }
}

/// Upload items for the live files of one category.
///
/// Two references sharing a file name would collide in the flat remote
/// folder; the first one wins.
fn data_items(category: Category, folder_id: &str, live: &LiveSet) -> Vec<UploadItem> {
    let mut names = BTreeSet::new();
    let mut items = Vec::new();
    for uri in live.get(category) {
        let name = paths::basename(uri);
        if !names.insert(name.to_string()) {
            warn!(%category, name, "duplicate file name among live references");
            continue;
        }
        items.push(UploadItem {
            name: name.to_string(),
            folder_id: folder_id.to_string(),
            category: Some(category),
            payload: Payload::File(uri.clone()),
        });
    }
    items
}

fn upload_all(ctx: &SyncContext<'_>, token: &str, items: &[UploadItem]) -> Vec<SyncResult<Uploaded>> {
    let remote = ctx.remote;
    let files = ctx.files;
    let progress = ctx.progress;
    let total = items.len();
    let completed = AtomicUsize::new(0);

    pool::run_bounded(items, ctx.config.workers(), |item| {
        let result = upload_item(remote, files, token, item);
        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        let error = result.as_ref().err().map(ToString::to_string);
        progress.on_progress(&ProgressEvent::item(
            SyncPhase::Uploading,
            &item.name,
            done,
            total,
            error,
        ));
        result
    })
}

fn upload_item(
    remote: &dyn RemoteStore,
    files: &dyn LocalFiles,
    token: &str,
    item: &UploadItem,
) -> SyncResult<Uploaded> {
    let same_name = Query::new()
        .named(&item.name)
        .in_parent(&item.folder_id)
        .not_mime_type(FOLDER_MIME_TYPE);
    match &item.payload {
        Payload::Manifest(bytes) => {
            let previous = remote.list_files(token, &same_name)?;
            let id = remote.upload_file(token, &item.name, &item.folder_id, JSON_MIME_TYPE, bytes)?;
            for old in previous.iter().filter(|f| f.id != id) {
                remote.delete_file(token, &old.id)?;
            }
            debug!(name = %item.name, id = %id, replaced = previous.len(), "manifest uploaded");
            Ok(Uploaded::New)
        }
        Payload::File(uri) => {
            if let Some(existing) = remote.list_files(token, &same_name)?.first() {
                debug!(name = %item.name, id = %existing.id, "already backed up");
                return Ok(Uploaded::AlreadyPresent);
            }
            let bytes = files.read(uri).map_err(|e| SyncError::local_io(uri, e))?;
            let mime = mime_guess::from_path(&item.name).first_or_octet_stream();
            let id = remote.upload_file(token, &item.name, &item.folder_id, mime.essence_str(), &bytes)?;
            debug!(name = %item.name, id = %id, size = bytes.len(), "file uploaded");
            Ok(Uploaded::New)
        }
    }
}

fn delete_all(ctx: &SyncContext<'_>, token: &str, doomed: &[RemoteFile]) -> Vec<SyncResult<()>> {
    let remote = ctx.remote;
    let progress: &dyn ProgressSink = ctx.progress;
    let total = doomed.len();
    let completed = AtomicUsize::new(0);

    pool::run_bounded(doomed, ctx.config.workers(), |file| {
        let result = remote.delete_file(token, &file.id);
        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        let error = result.as_ref().err().map(ToString::to_string);
        progress.on_progress(&ProgressEvent::item(
            SyncPhase::CleaningRemote,
            &file.name,
            done,
            total,
            error,
        ));
        result
    })
}
