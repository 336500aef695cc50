//! Find-or-create for remote folders.

use std::collections::HashMap;

use carebook_drive::{Query, RemoteFile};
use tracing::{debug, info, warn};

use super::{RemoteStore, SyncResult};

/// Resolves `(name, parent)` pairs to folder ids for one run.
///
/// Every lookup is memoized, so within a run a folder is created at most
/// once and every caller sees the same id. When earlier racing runs left
/// duplicates behind, the smallest id wins; concurrent runs converge on the
/// same folder that way.
pub struct FolderResolver<'a> {
    remote: &'a dyn RemoteStore,
    token: &'a str,
    cache: HashMap<(String, String), String>,
    created: usize,
}

impl<'a> FolderResolver<'a> {
    pub fn new(remote: &'a dyn RemoteStore, token: &'a str) -> Self {
        Self {
            remote,
            token,
            cache: HashMap::new(),
            created: 0,
        }
    }

    /// Id of folder `name` under `parent_id`, creating it if absent.
    pub fn resolve(&mut self, name: &str, parent_id: &str) -> SyncResult<String> {
        if let Some(id) = self.find(name, parent_id)? {
            return Ok(id);
        }

        let id = self.remote.create_folder(self.token, name, parent_id)?;
        info!(name, parent_id, id = %id, "created remote folder");
        self.created += 1;
        self.cache
            .insert((name.to_string(), parent_id.to_string()), id.clone());
        Ok(id)
    }

    /// Id of folder `name` under `parent_id` if it exists. Never creates.
    pub fn find(&mut self, name: &str, parent_id: &str) -> SyncResult<Option<String>> {
        let key = (name.to_string(), parent_id.to_string());
        if let Some(id) = self.cache.get(&key) {
            return Ok(Some(id.clone()));
        }

        let matches = self
            .remote
            .list_files(self.token, &Query::folder(name, parent_id))?;
        let Some(id) = pick_folder(name, &matches) else {
            debug!(name, parent_id, "remote folder not found");
            return Ok(None);
        };
        self.cache.insert(key, id.clone());
        Ok(Some(id))
    }

    /// Folders this resolver created.
    pub fn created_count(&self) -> usize {
        self.created
    }
}

fn pick_folder(name: &str, candidates: &[RemoteFile]) -> Option<String> {
    let mut folders: Vec<&str> = candidates
        .iter()
        .filter(|f| f.is_folder())
        .map(|f| f.id.as_str())
        .collect();
    folders.sort_unstable();
    if folders.len() > 1 {
        warn!(name, count = folders.len(), chosen = folders[0], "duplicate remote folders");
    }
    folders.first().map(|id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::test_utils::MemoryRemote;
    use carebook_drive::ROOT_FOLDER_ID;

    #[test]
    fn test_resolve_creates_once() {
        let remote = MemoryRemote::new();
        let mut resolver = FolderResolver::new(&remote, "t");

        let first = resolver.resolve("avatars", "root-1").unwrap();
        let second = resolver.resolve("avatars", "root-1").unwrap();
        assert_eq!(first, second);
        assert_eq!(remote.calls().create_folder, 1);
        assert_eq!(remote.calls().list, 1);
        assert_eq!(resolver.created_count(), 1);
    }

    #[test]
    fn test_resolve_finds_existing() {
        let remote = MemoryRemote::new();
        let existing = remote.insert_folder("CarebookBackup", ROOT_FOLDER_ID);
        let mut resolver = FolderResolver::new(&remote, "t");

        assert_eq!(resolver.resolve("CarebookBackup", ROOT_FOLDER_ID).unwrap(), existing);
        assert_eq!(remote.calls().create_folder, 0);
        assert_eq!(resolver.created_count(), 0);
    }

    #[test]
    fn test_same_name_different_parent() {
        let remote = MemoryRemote::new();
        let mut resolver = FolderResolver::new(&remote, "t");

        let a = resolver.resolve("avatars", "root-a").unwrap();
        let b = resolver.resolve("avatars", "root-b").unwrap();
        assert_ne!(a, b);
        assert_eq!(remote.calls().create_folder, 2);
    }

    #[test]
    fn test_duplicates_pick_smallest_id() {
        let remote = MemoryRemote::new();
        let first = remote.insert_folder("avatars", "root-1");
        let _second = remote.insert_folder("avatars", "root-1");
        let mut resolver = FolderResolver::new(&remote, "t");

        assert_eq!(resolver.resolve("avatars", "root-1").unwrap(), first);
    }

    #[test]
    fn test_find_never_creates() {
        let remote = MemoryRemote::new();
        let mut resolver = FolderResolver::new(&remote, "t");

        assert_eq!(resolver.find("avatars", "root-1").unwrap(), None);
        assert_eq!(remote.calls().create_folder, 0);
    }

    #[test]
    fn test_ignores_files_with_folder_name() {
        let remote = MemoryRemote::new();
        remote.insert_file("avatars", "root-1", "image/png", b"not a folder");
        let mut resolver = FolderResolver::new(&remote, "t");

        assert_eq!(resolver.find("avatars", "root-1").unwrap(), None);
    }
}
