//
// metadata.rs
// Dicom-Tag-Census
//
// Image reader: opens a single DICOM file and flattens its dataset into a keyword -> value table.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use dicom::core::dictionary::DataDictionary;
use dicom::core::value::Value;
use dicom::core::{PrimitiveValue, Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{open_file, DefaultDicomObject};

use crate::error::ReadError;
use crate::models::{StudyImage, StudyKey, TagMap};

const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";

/// Capability to turn one file on disk into a study image.
pub trait ImageReader {
    fn read(&self, path: &Path) -> Result<StudyImage, ReadError>;
}

/// Reader backed by dicom-rs, resolving keywords through the standard dictionary.
#[derive(Debug, Default, Clone, Copy)]
pub struct DicomReader;

impl ImageReader for DicomReader {
    fn read(&self, path: &Path) -> Result<StudyImage, ReadError> {
        let is_dicom = is_dicom_file(path).map_err(|source| ReadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if !is_dicom {
            return Err(ReadError::NotDicom(path.to_path_buf()));
        }

        let obj: DefaultDicomObject = open_file(path).map_err(|source| ReadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        study_image_from(path, extract_tags(&obj))
    }
}

/// Checks for the 128-byte preamble followed by the `DICM` magic code.
pub fn is_dicom_file(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut head = [0u8; PREAMBLE_LEN + 4];
    match file.read_exact(&mut head) {
        Ok(()) => Ok(&head[PREAMBLE_LEN..] == MAGIC),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Flatten every keyword-bearing scalar element of the dataset. Sequences and binary payloads are dropped.
pub fn extract_tags(obj: &DefaultDicomObject) -> TagMap {
    let mut tags = TagMap::new();
    for elem in obj.iter() {
        let tag = elem.header().tag;
        // Group length elements carry no study information.
        if tag.element() == 0x0000 || is_binary_vr(elem.header().vr) {
            continue;
        }
        let text = match elem.value() {
            Value::Primitive(p) => render_primitive(p),
            Value::Sequence(_) | Value::PixelSequence(_) => continue,
        };
        if let Some(keyword) = keyword_for(tag) {
            tags.insert(keyword.to_string(), text);
        }
    }
    tags
}

fn study_image_from(path: &Path, tags: TagMap) -> Result<StudyImage, ReadError> {
    let required = |attribute: &'static str| {
        tags.get(attribute)
            .cloned()
            .ok_or_else(|| ReadError::MissingAttribute {
                path: path.to_path_buf(),
                attribute,
            })
    };

    let patient_id = required("PatientID")?;
    let study_date = required("StudyDate")?;
    let modality = required("Modality")?;

    Ok(StudyImage {
        key: StudyKey::new(&patient_id, &study_date),
        modality,
        tags,
    })
}

fn is_binary_vr(vr: VR) -> bool {
    matches!(
        vr,
        VR::SQ | VR::OB | VR::OW | VR::OF | VR::OD | VR::OL | VR::OV | VR::UN
    )
}

fn render_primitive(value: &PrimitiveValue) -> String {
    value
        .to_str()
        .trim_end_matches(|c: char| c == '\0' || c == ' ')
        .to_string()
}

fn keyword_for(tag: Tag) -> Option<&'static str> {
    StandardDataDictionary::default()
        .by_tag(tag)
        .map(|entry| entry.alias)
}
