//
// models.rs
// Dicom-Tag-Census
//
// Defines the study records, modality buckets and row types that flow from the walker into the CSV tables.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Tag keyword -> rendered scalar value. Keyword order is the iteration order.
pub type TagMap = BTreeMap<String, String>;

/// One exported line, either freshly scanned or loaded back from a prior export.
pub type Row = TagMap;

/// Study identity inside a bucket: `PatientID_StudyDate`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StudyKey(String);

impl StudyKey {
    pub fn new(patient_id: &str, study_date: &str) -> Self {
        Self(format!("{}_{}", patient_id, study_date))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output table a study is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Pet,
    Mri,
}

impl Modality {
    /// Route a raw modality code. CT and PT both land in the PET table; only an exact `MR` is MRI.
    pub fn classify(code: &str) -> Option<Self> {
        if code.contains("CT") || code.contains("PT") {
            Some(Modality::Pet)
        } else if code == "MR" {
            Some(Modality::Mri)
        } else {
            None
        }
    }

    /// Prefix used for export file names.
    pub fn file_prefix(self) -> &'static str {
        match self {
            Modality::Pet => "pet",
            Modality::Mri => "mri",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Pet => f.write_str("PET"),
            Modality::Mri => f.write_str("MRI"),
        }
    }
}

/// Everything the image reader hands back for a single file.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyImage {
    pub key: StudyKey,
    pub modality: String,
    pub tags: TagMap,
}

/// Insertion-ordered study records; a repeated key replaces the whole record in place.
#[derive(Debug, Default)]
pub struct StudyBucket {
    index: HashMap<StudyKey, usize>,
    records: Vec<TagMap>,
}

impl StudyBucket {
    pub fn insert(&mut self, key: StudyKey, tags: TagMap) {
        match self.index.get(&key) {
            Some(&slot) => self.records[slot] = tags,
            None => {
                self.index.insert(key, self.records.len());
                self.records.push(tags);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.records
    }
}

/// The PET and MRI accumulators threaded through a walk.
#[derive(Debug, Default)]
pub struct StudyBuckets {
    pub pet: StudyBucket,
    pub mri: StudyBucket,
}

impl StudyBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the image in its modality bucket. Returns `None` when the modality is not tracked.
    pub fn route(&mut self, image: StudyImage) -> Option<Modality> {
        let modality = Modality::classify(&image.modality)?;
        self.bucket_mut(modality).insert(image.key, image.tags);
        Some(modality)
    }

    pub fn bucket(&self, modality: Modality) -> &StudyBucket {
        match modality {
            Modality::Pet => &self.pet,
            Modality::Mri => &self.mri,
        }
    }

    fn bucket_mut(&mut self, modality: Modality) -> &mut StudyBucket {
        match modality {
            Modality::Pet => &mut self.pet,
            Modality::Mri => &mut self.mri,
        }
    }

    pub fn into_rows(self) -> ScanRows {
        ScanRows {
            pet: self.pet.into_rows(),
            mri: self.mri.into_rows(),
        }
    }
}

/// Fresh rows produced by a scan, one list per output table.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScanRows {
    pub pet: Vec<Row>,
    pub mri: Vec<Row>,
}

impl ScanRows {
    pub fn take(&mut self, modality: Modality) -> Vec<Row> {
        match modality {
            Modality::Pet => std::mem::take(&mut self.pet),
            Modality::Mri => std::mem::take(&mut self.mri),
        }
    }
}

/// Counters reported at the end of a walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub files_visited: usize,
    pub images_read: usize,
    pub images_dropped: usize,
    pub skipped: usize,
    pub failures: usize,
    pub volumes_mounted: usize,
}
