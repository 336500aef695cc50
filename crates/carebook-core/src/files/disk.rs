//! `std::fs` implementation of [`LocalFiles`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{paths, LocalEntry, LocalFiles};
use crate::models::Category;

/// Files stored under one base directory on the local disk.
#[derive(Debug, Clone)]
pub struct DiskFiles {
    root: PathBuf,
    base_uri: String,
}

impl DiskFiles {
    /// Use `root` as the app's base directory. Nothing is created yet.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let base_uri = paths::normalize_base(&root.to_string_lossy());
        Self { root, base_uri }
    }

    fn resolve(&self, uri: &str) -> PathBuf {
        PathBuf::from(paths::strip_file_scheme(uri))
    }
}

impl LocalFiles for DiskFiles {
    fn base_uri(&self) -> &str {
        &self.base_uri
    }

    fn list_directory(&self, category: Category) -> io::Result<Vec<LocalEntry>> {
        let dir = self.root.join(category.dir_name());
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut listed = Vec::new();
        for entry in entries {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            listed.push(LocalEntry {
                path: self.category_path(category, &name),
                name,
                size: metadata.len(),
            });
        }
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }

    fn stat(&self, path: &str) -> io::Result<Option<u64>> {
        match fs::metadata(self.resolve(path)) {
            Ok(metadata) if metadata.is_file() => Ok(Some(metadata.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path))
    }

    fn write(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, bytes)
    }

    fn delete(&self, path: &str) -> io::Result<()> {
        fs::remove_file(self.resolve(path))
    }

    fn remove_dir(&self, path: &str) -> io::Result<()> {
        fs::remove_dir(self.resolve(path))
    }

    fn copy(&self, from: &str, to: &str) -> io::Result<()> {
        let target = self.resolve(to);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(self.resolve(from), target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, DiskFiles) {
        let dir = tempfile::tempdir().unwrap();
        let files = DiskFiles::new(dir.path());
        (dir, files)
    }

    #[test]
    fn test_missing_directory_lists_empty() {
        let (_dir, files) = setup();
        assert!(files.list_directory(Category::Avatars).unwrap().is_empty());
    }

    #[test]
    fn test_write_list_stat_delete() {
        let (_dir, files) = setup();
        let path = files.category_path(Category::Attachments, "r1.jpg");

        files.write(&path, b"scan").unwrap();
        assert_eq!(files.stat(&path).unwrap(), Some(4));

        let listed = files.list_directory(Category::Attachments).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "r1.jpg");
        assert_eq!(listed[0].path, path);
        assert_eq!(listed[0].size, 4);

        files.delete(&path).unwrap();
        assert_eq!(files.stat(&path).unwrap(), None);
    }

    #[test]
    fn test_file_scheme_uris() {
        let (_dir, files) = setup();
        let path = format!("file://{}", files.category_path(Category::Avatars, "a.png"));

        files.write(&path, b"png").unwrap();
        assert_eq!(files.read(&path).unwrap(), b"png");
    }

    #[test]
    fn test_copy_overwrites() {
        let (_dir, files) = setup();
        let from = paths::staging_path(files.base_uri(), Category::Avatars, "a.png");
        let to = files.category_path(Category::Avatars, "a.png");

        files.write(&to, b"old").unwrap();
        files.write(&from, b"new").unwrap();
        files.copy(&from, &to).unwrap();

        assert_eq!(files.read(&to).unwrap(), b"new");
    }

    #[test]
    fn test_remove_dir_only_when_empty() {
        let (_dir, files) = setup();
        let staged = paths::staging_path(files.base_uri(), Category::Avatars, "a.png");
        let staging = paths::staging_dir(files.base_uri(), Some(Category::Avatars));
        files.write(&staged, b"x").unwrap();

        assert!(files.remove_dir(&staging).is_err());
        files.delete(&staged).unwrap();
        files.remove_dir(&staging).unwrap();
        assert_eq!(
            files.remove_dir(&staging).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_subdirectories_are_not_listed() {
        let (dir, files) = setup();
        std::fs::create_dir_all(dir.path().join("avatars").join("thumbs")).unwrap();
        files
            .write(&files.category_path(Category::Avatars, "a.png"), b"x")
            .unwrap();

        let names: Vec<_> = files
            .list_directory(Category::Avatars)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.png".to_string()]);
    }
}
