//! Files the current collections still reference.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::files::{paths, LocalFiles};
use crate::models::{Category, MedicalRecord, Patient};

/// Referenced local URIs, per category.
///
/// Avatars come from patients and attachments from records. A reference is
/// live only when it points directly into its own category's directory
/// under `base`; anything else is stale and never backed up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSet {
    avatars: BTreeSet<String>,
    attachments: BTreeSet<String>,
}

impl LiveSet {
    pub fn compute(patients: &[Patient], records: &[MedicalRecord], base: &str) -> Self {
        let avatars = patients.iter().filter_map(Patient::avatar_uri);
        let attachments = records.iter().flat_map(MedicalRecord::attachment_uris);
        Self {
            avatars: watched(avatars, Category::Avatars, base),
            attachments: watched(attachments, Category::Attachments, base),
        }
    }

    /// Drop references whose file no longer exists. Returns how many went.
    ///
    /// A reference that cannot be stat'ed stays live so the upload reports it.
    pub fn retain_existing(&mut self, files: &dyn LocalFiles) -> usize {
        let mut dropped = 0;
        for category in Category::ALL {
            let set = match category {
                Category::Avatars => &mut self.avatars,
                Category::Attachments => &mut self.attachments,
            };
            set.retain(|uri| match files.stat(uri) {
                Ok(Some(_)) => true,
                Ok(None) => {
                    warn!(%category, uri = %uri, "skipping stale reference");
                    dropped += 1;
                    false
                }
                Err(e) => {
                    debug!(uri = %uri, error = %e, "stat failed, upload will report it");
                    true
                }
            });
        }
        dropped
    }

    pub fn get(&self, category: Category) -> &BTreeSet<String> {
        match category {
            Category::Avatars => &self.avatars,
            Category::Attachments => &self.attachments,
        }
    }

    pub fn contains(&self, category: Category, uri: &str) -> bool {
        self.get(category).contains(uri)
    }

    pub fn len(&self) -> usize {
        self.avatars.len() + self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn watched<'a>(
    uris: impl Iterator<Item = &'a str>,
    category: Category,
    base: &str,
) -> BTreeSet<String> {
    uris.filter(|uri| {
        let keep = paths::is_in_category(&paths::to_portable(uri, base), category);
        if !keep {
            debug!(%category, uri = %uri, "reference outside watched directory");
        }
        keep
    })
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::DiskFiles;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const BASE: &str = "/base/";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_compute_by_category() {
        let patients = vec![
            Patient::new(1, "A").with_avatar("/base/avatars/a.png"),
            Patient::new(2, "B"),
            Patient::new(3, "C").with_avatar(""),
        ];
        let records = vec![
            MedicalRecord::new(1, 1, date(), "visit")
                .with_attachment("/base/attachments/r1.jpg")
                .with_attachment("/base/attachments/r2.pdf"),
            MedicalRecord::new(2, 1, date(), "lab").with_attachment("/base/attachments/r1.jpg"),
        ];

        let live = LiveSet::compute(&patients, &records, BASE);
        assert_eq!(live.get(Category::Avatars).len(), 1);
        assert!(live.contains(Category::Avatars, "/base/avatars/a.png"));
        assert_eq!(live.get(Category::Attachments).len(), 2);
        assert_eq!(live.len(), 3);
    }

    #[test]
    fn test_references_outside_watched_dirs_are_not_live() {
        let patients = vec![
            Patient::new(1, "A").with_avatar("/base/attachments/swapped.png"),
            Patient::new(2, "B").with_avatar("/base/avatars/thumbs/t.png"),
        ];
        let records = vec![MedicalRecord::new(1, 1, date(), "visit")
            .with_attachment("/tmp/elsewhere/r1.jpg")
            .with_attachment("file:///base/attachments/r2.jpg")];

        let live = LiveSet::compute(&patients, &records, BASE);
        assert!(live.get(Category::Avatars).is_empty());
        assert_eq!(
            live.get(Category::Attachments).iter().collect::<Vec<_>>(),
            vec!["file:///base/attachments/r2.jpg"]
        );
    }

    #[test]
    fn test_retain_existing_drops_missing_files() {
        let dir = TempDir::new().unwrap();
        let files = DiskFiles::new(dir.path());
        let present = files.category_path(Category::Attachments, "here.jpg");
        let missing = files.category_path(Category::Attachments, "gone.jpg");
        files.write(&present, b"x").unwrap();
        let records = vec![MedicalRecord::new(1, 1, date(), "visit")
            .with_attachment(present.clone())
            .with_attachment(missing)];

        let mut live = LiveSet::compute(&[], &records, files.base_uri());
        assert_eq!(live.retain_existing(&files), 1);
        assert_eq!(live.get(Category::Attachments).iter().collect::<Vec<_>>(), vec![&present]);
    }

    #[test]
    fn test_empty_collections() {
        let live = LiveSet::compute(&[], &[], BASE);
        assert!(live.is_empty());
        assert!(live.get(Category::Avatars).is_empty());
    }
}
