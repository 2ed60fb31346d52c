//
// walker.rs
// Dicom-Tag-Census
//
// Depth-first traversal of files, directories and mounted volumes, routing each readable image into its bucket.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::metadata::ImageReader;
use crate::models::{ScanRows, ScanStats, StudyBuckets};
use crate::mount::{is_volume_image, MountGuard, VolumeMounter};

/// Walks a root path with an injected reader and mounter.
pub struct Walker<'a, R: ImageReader + ?Sized, M: VolumeMounter + ?Sized> {
    reader: &'a R,
    mounter: &'a M,
}

impl<'a, R: ImageReader + ?Sized, M: VolumeMounter + ?Sized> Walker<'a, R, M> {
    pub fn new(reader: &'a R, mounter: &'a M) -> Self {
        Self { reader, mounter }
    }

    /// Walk `root` into fresh buckets and flatten them into rows.
    pub fn scan(&self, root: &Path) -> (ScanRows, ScanStats) {
        let mut buckets = StudyBuckets::new();
        let stats = self.walk(root, &mut buckets);
        (buckets.into_rows(), stats)
    }

    /// Process a file, directory or volume image. Per-file errors are logged and never returned.
    pub fn walk(&self, root: &Path, buckets: &mut StudyBuckets) -> ScanStats {
        let mut stats = ScanStats::default();
        self.walk_into(root, buckets, &mut stats);
        stats
    }

    fn walk_into(&self, root: &Path, buckets: &mut StudyBuckets, stats: &mut ScanStats) {
        if root.is_file() {
            self.visit_file(root, buckets, stats);
            return;
        }
        if !root.exists() {
            warn!("{} does not exist, nothing to scan", root.display());
            return;
        }

        let entries = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!("Skipping unreadable entry under {}: {}", root.display(), err);
                    None
                }
            })
            // Links to directories are not descended into and are not files either.
            .filter(|entry| !entry.path().is_dir());

        for entry in entries {
            self.visit_file(entry.path(), buckets, stats);
        }
    }

    fn visit_file(&self, path: &Path, buckets: &mut StudyBuckets, stats: &mut ScanStats) {
        stats.files_visited += 1;
        if is_volume_image(path) {
            self.visit_volume(path, buckets, stats);
        } else {
            self.visit_image(path, buckets, stats);
        }
    }

    fn visit_volume(&self, image: &Path, buckets: &mut StudyBuckets, stats: &mut ScanStats) {
        info!("Mounting volume: {}", image.display());
        match MountGuard::mount(self.mounter, image) {
            Ok(guard) => {
                stats.volumes_mounted += 1;
                self.walk_into(guard.root(), buckets, stats);
            }
            Err(err) => {
                stats.failures += 1;
                info!("failed: {}", image.display());
                debug!("{:#}", anyhow::Error::new(err));
            }
        }
    }

    fn visit_image(&self, path: &Path, buckets: &mut StudyBuckets, stats: &mut ScanStats) {
        match self.reader.read(path) {
            Ok(image) => {
                stats.images_read += 1;
                let key = image.key.clone();
                match buckets.route(image) {
                    Some(modality) => info!("{} study {} from {}", modality, key, path.display()),
                    None => stats.images_dropped += 1,
                }
            }
            Err(err) if err.is_not_dicom() => stats.skipped += 1,
            Err(err) => {
                stats.failures += 1;
                info!("failed: {}", path.display());
                debug!("{:#}", anyhow::Error::new(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MountError, ReadError};
    use crate::models::{StudyImage, StudyKey, TagMap};
    use std::cell::RefCell;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use tempfile::tempdir;

    /// Reads `FAKE` text files: header line, then `patient|date|modality`, then `key=value` lines.
    struct FakeReader;

    impl ImageReader for FakeReader {
        fn read(&self, path: &Path) -> Result<StudyImage, ReadError> {
            let text = fs::read_to_string(path).map_err(|source| ReadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let mut lines = text.lines();
            if lines.next() != Some("FAKE") {
                return Err(ReadError::NotDicom(path.to_path_buf()));
            }
            let ident: Vec<&str> = lines.next().unwrap_or_default().split('|').collect();
            if ident.len() != 3 {
                return Err(ReadError::MissingAttribute {
                    path: path.to_path_buf(),
                    attribute: "PatientID",
                });
            }
            let tags: TagMap = lines
                .filter_map(|line| line.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            Ok(StudyImage {
                key: StudyKey::new(ident[0], ident[1]),
                modality: ident[2].to_string(),
                tags,
            })
        }
    }

    /// Serves a prepared directory per volume name and records every call.
    #[derive(Default)]
    struct FakeMounter {
        volumes: Vec<(String, PathBuf)>,
        calls: RefCell<Vec<String>>,
    }

    impl VolumeMounter for FakeMounter {
        fn prepare(&self, image: &Path) -> Result<PathBuf, MountError> {
            let name = image.file_name().and_then(|n| n.to_str()).unwrap_or("");
            self.calls.borrow_mut().push(format!("prepare {}", name));
            Ok(self
                .volumes
                .iter()
                .find(|(volume, _)| volume == name)
                .map(|(_, dir)| dir.clone())
                .unwrap_or_else(|| PathBuf::from("/nonexistent")))
        }

        fn mount(&self, image: &Path, _mount_point: &Path) -> Result<(), MountError> {
            let name = image.file_name().and_then(|n| n.to_str()).unwrap_or("");
            self.calls.borrow_mut().push(format!("mount {}", name));
            if self.volumes.iter().any(|(volume, _)| volume == name) {
                Ok(())
            } else {
                Err(MountError::Spawn {
                    program: "mount",
                    source: io::Error::new(io::ErrorKind::InvalidData, "corrupt volume"),
                })
            }
        }

        fn unmount(&self, mount_point: &Path) -> Result<(), MountError> {
            self.calls
                .borrow_mut()
                .push(format!("unmount {}", mount_point.display()));
            Ok(())
        }
    }

    fn write_fake(dir: &Path, name: &str, ident: &str, tags: &[(&str, &str)]) -> PathBuf {
        let mut body = format!("FAKE\n{}\n", ident);
        for (k, v) in tags {
            body.push_str(&format!("{}={}\n", k, v));
        }
        let path = dir.join(name);
        fs::write(&path, body).expect("write fake image");
        path
    }

    #[test]
    fn directory_walk_routes_by_modality() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).expect("nested");
        write_fake(dir.path(), "1.dcm", "P1|20240101|CT", &[("Tag", "ct")]);
        write_fake(&nested, "2.dcm", "P2|20240102|PT", &[("Tag", "pt")]);
        write_fake(&nested, "3.dcm", "P3|20240103|MR", &[("Tag", "mr")]);
        write_fake(dir.path(), "4.dcm", "P4|20240104|OT", &[("Tag", "ot")]);
        fs::write(dir.path().join("readme.txt"), "hello").expect("text");

        let mounter = FakeMounter::default();
        let (rows, stats) = Walker::new(&FakeReader, &mounter).scan(dir.path());

        assert_eq!(rows.pet.len(), 2);
        assert_eq!(rows.mri.len(), 1);
        assert_eq!(rows.mri[0]["Tag"], "mr");
        assert!(rows.pet.iter().all(|row| row["Tag"] != "ot"));
        assert_eq!(stats.images_read, 4);
        assert_eq!(stats.images_dropped, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failures, 0);
        assert!(mounter.calls.borrow().is_empty());
    }

    #[test]
    fn same_study_is_last_write_wins() {
        let dir = tempdir().expect("tempdir");
        write_fake(dir.path(), "a.dcm", "123|20240101|CT", &[("Tag1", "a")]);
        write_fake(
            dir.path(),
            "b.dcm",
            "123|20240101|CT",
            &[("Tag1", "b"), ("Tag2", "c")],
        );

        let mounter = FakeMounter::default();
        let (rows, _) = Walker::new(&FakeReader, &mounter).scan(dir.path());

        let expected: TagMap = [("Tag1", "b"), ("Tag2", "c")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(rows.pet, vec![expected]);
    }

    #[test]
    fn single_file_root_is_read_directly() {
        let dir = tempdir().expect("tempdir");
        let path = write_fake(dir.path(), "only.dcm", "P|D|MR", &[("X", "1")]);

        let mounter = FakeMounter::default();
        let (rows, stats) = Walker::new(&FakeReader, &mounter).scan(&path);
        assert_eq!(rows.mri.len(), 1);
        assert_eq!(stats.files_visited, 1);
    }

    #[test]
    fn volume_contents_are_walked_and_released() {
        let dir = tempdir().expect("tempdir");
        let volume_root = dir.path().join("volume-content");
        fs::create_dir_all(&volume_root).expect("volume dir");
        write_fake(&volume_root, "inside.dcm", "V1|20240201|MR", &[("Tag", "vol")]);

        let scan_root = dir.path().join("scan");
        fs::create_dir_all(&scan_root).expect("scan dir");
        fs::write(scan_root.join("disc.iso"), "FAKE\nX|Y|MR\n").expect("iso");

        let mounter = FakeMounter {
            volumes: vec![("disc.iso".into(), volume_root.clone())],
            ..Default::default()
        };
        let (rows, stats) = Walker::new(&FakeReader, &mounter).scan(&scan_root);

        // The container itself is never parsed as an image.
        assert_eq!(rows.mri.len(), 1);
        assert_eq!(rows.mri[0]["Tag"], "vol");
        assert_eq!(stats.volumes_mounted, 1);
        assert_eq!(
            *mounter.calls.borrow(),
            vec![
                "prepare disc.iso".to_string(),
                "mount disc.iso".to_string(),
                format!("unmount {}", volume_root.display()),
            ]
        );
    }

    #[test]
    fn corrupt_volume_does_not_stop_siblings() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a_broken.iso"), "garbage").expect("iso");
        write_fake(dir.path(), "b.dcm", "P|D|CT", &[("Tag", "ok")]);
        fs::write(dir.path().join("c.dcm"), "FAKE\nincomplete\n").expect("corrupt");

        let mounter = FakeMounter::default();
        let (rows, stats) = Walker::new(&FakeReader, &mounter).scan(dir.path());

        assert_eq!(rows.pet.len(), 1);
        assert_eq!(stats.failures, 2);
        let calls = mounter.calls.borrow();
        assert_eq!(calls.iter().filter(|c| c.starts_with("unmount")).count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn directory_links_are_not_treated_as_files() {
        let dir = tempdir().expect("tempdir");
        let other = dir.path().join("other");
        fs::create_dir_all(&other).expect("other");
        let root = dir.path().join("root");
        fs::create_dir_all(&root).expect("root");
        std::os::unix::fs::symlink(&other, root.join("link")).expect("symlink");

        let mounter = FakeMounter::default();
        let (rows, stats) = Walker::new(&FakeReader, &mounter).scan(&root);

        assert_eq!(rows, ScanRows::default());
        assert_eq!(stats.files_visited, 0);
        assert_eq!(stats.failures, 0);
    }

    #[test]
    fn missing_root_yields_nothing() {
        let dir = tempdir().expect("tempdir");
        let mounter = FakeMounter::default();
        let (rows, stats) =
            Walker::new(&FakeReader, &mounter).scan(&dir.path().join("does-not-exist"));
        assert_eq!(rows, ScanRows::default());
        assert_eq!(stats, ScanStats::default());
    }
}
