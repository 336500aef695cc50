//! Medical record models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::FileRef;

/// A dated medical record belonging to one patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    /// Local integer id
    pub id: i64,
    /// Owning patient (not enforced here)
    pub patient_id: i64,
    /// Date of the visit, test or expense
    pub date: NaiveDate,
    /// Free-form category (e.g. "lab", "visit", "pharmacy")
    pub category: String,
    /// Notes
    #[serde(default)]
    pub text: String,
    /// Amount paid
    #[serde(default)]
    pub amount: f64,
    /// Attached scans and photos, in display order
    #[serde(default)]
    pub attachments: Vec<FileRef>,
}

impl MedicalRecord {
    /// Create an empty record.
    pub fn new(id: i64, patient_id: i64, date: NaiveDate, category: impl Into<String>) -> Self {
        Self {
            id,
            patient_id,
            date,
            category: category.into(),
            text: String::new(),
            amount: 0.0,
            attachments: Vec::new(),
        }
    }

    /// Append an attachment.
    pub fn with_attachment(mut self, local_uri: impl Into<String>) -> Self {
        self.attachments.push(FileRef::new(local_uri));
        self
    }

    /// Non-empty attachment paths.
    pub fn attachment_uris(&self) -> impl Iterator<Item = &str> {
        self.attachments
            .iter()
            .map(|a| a.local_uri.as_str())
            .filter(|uri| !uri.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_attachment_uris_skip_empty() {
        let record = MedicalRecord::new(1, 1, date(), "lab")
            .with_attachment("/files/attachments/r1.jpg")
            .with_attachment("")
            .with_attachment("/files/attachments/r2.pdf");

        let uris: Vec<_> = record.attachment_uris().collect();
        assert_eq!(uris, vec!["/files/attachments/r1.jpg", "/files/attachments/r2.pdf"]);
    }

    #[test]
    fn test_json_shape() {
        let mut record = MedicalRecord::new(3, 1, date(), "visit").with_attachment("attachments/r1.jpg");
        record.amount = 42.5;

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["patientId"], 1);
        assert_eq!(json["date"], "2024-01-15");
        assert_eq!(json["amount"], 42.5);
        assert_eq!(json["attachments"][0]["localUri"], "attachments/r1.jpg");

        let back: MedicalRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
