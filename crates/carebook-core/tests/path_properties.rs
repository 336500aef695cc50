//! Property tests for path mapping and live-set computation.

use carebook_core::files::paths;
use carebook_core::models::{Category, MedicalRecord, Patient};
use carebook_core::sync::LiveSet;
use chrono::NaiveDate;
use proptest::prelude::*;

fn file_name() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,12}\\.(png|jpg|pdf)"
}

fn base_dir() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9]{1,8}", 1..4).prop_map(|parts| format!("/{}", parts.join("/")))
}

fn category() -> impl Strategy<Value = Category> {
    prop_oneof![Just(Category::Avatars), Just(Category::Attachments)]
}

proptest! {
    #[test]
    fn portable_then_local_is_identity(base in base_dir(), cat in category(), name in file_name()) {
        let uri = paths::category_path(&base, cat, &name);
        let portable = paths::to_portable(&uri, &base);

        prop_assert_eq!(&portable, &format!("{}/{}", cat.dir_name(), name));
        prop_assert_eq!(paths::to_local(&portable, &base), uri);
    }

    #[test]
    fn file_scheme_maps_like_plain_path(base in base_dir(), cat in category(), name in file_name()) {
        let plain = paths::category_path(&base, cat, &name);
        let with_scheme = format!("file://{}", plain);

        prop_assert_eq!(paths::to_portable(&with_scheme, &base), paths::to_portable(&plain, &base));
    }

    #[test]
    fn foreign_base_keeps_category_segment(
        old_base in base_dir(),
        new_base in base_dir(),
        cat in category(),
        name in file_name(),
    ) {
        let old_uri = paths::category_path(&old_base, cat, &name);
        let portable = paths::to_portable(&old_uri, &new_base);

        prop_assert_eq!(paths::category_of(&portable), Some(cat));
        prop_assert_eq!(paths::basename(&portable), name.as_str());
    }

    #[test]
    fn live_set_covers_every_reference(
        avatars in prop::collection::vec(prop::option::of(file_name()), 0..8),
        attachments in prop::collection::vec(prop::collection::vec(file_name(), 0..4), 0..8),
    ) {
        let base = "/data/files";
        let patients: Vec<Patient> = avatars
            .iter()
            .enumerate()
            .map(|(i, avatar)| {
                let patient = Patient::new(i as i64, format!("p{}", i));
                match avatar {
                    Some(name) => patient.with_avatar(paths::category_path(base, Category::Avatars, name)),
                    None => patient,
                }
            })
            .collect();
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let records: Vec<MedicalRecord> = attachments
            .iter()
            .enumerate()
            .map(|(i, names)| {
                names.iter().fold(MedicalRecord::new(i as i64, 0, date, "visit"), |record, name| {
                    record.with_attachment(paths::category_path(base, Category::Attachments, name))
                })
            })
            .collect();

        let live = LiveSet::compute(&patients, &records, base);

        for patient in &patients {
            if let Some(uri) = patient.avatar_uri() {
                prop_assert!(live.get(Category::Avatars).contains(uri));
            }
        }
        for uri in records.iter().flat_map(MedicalRecord::attachment_uris) {
            prop_assert!(live.get(Category::Attachments).contains(uri));
        }
        let referenced = patients.iter().filter(|p| p.avatar_uri().is_some()).count()
            + records.iter().map(|r| r.attachments.len()).sum::<usize>();
        prop_assert!(live.len() <= referenced);
    }
}
