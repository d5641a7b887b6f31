//! Directory-based face registration.
//!
//! Builds the ordered name → embedding registry the attendance loop
//! matches against: one image file per identity, keyed by file stem.

use crate::detector::Detect;
use crate::encoder::Encode;
use crate::normalize::has_image_extension;
use crate::types::{Embedding, RegisteredFace};
use image::ImageReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registration directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("failed to read registration directory {0}: {1}")]
    DirectoryUnreadable(String, #[source] std::io::Error),
    #[error("no usable face image in {0}")]
    NoFacesRegistered(String),
}

/// Outcome of registering one image file.
#[derive(Debug)]
pub enum FileOutcome {
    /// Embedding stored under the file's stem.
    Registered { name: String, embedding: Embedding },
    /// Image decoded but contained no detectable face.
    NoFace,
    /// Image could not be decoded, or inference failed on it.
    Failed(String),
}

/// Aggregated per-file counts for a directory load.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadReport {
    pub registered: usize,
    pub no_face: usize,
    pub failed: usize,
}

/// Insertion-ordered set of registered identities.
///
/// Entries keep the order they were registered in (file-name order for a
/// directory load); [`first_match`](Self::first_match) resolves ties by
/// that order. Built once at startup, immutable afterwards.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<RegisteredFace>,
}

impl Registry {
    /// Load every face image in `dir` into a fresh registry.
    ///
    /// Files are visited in file-name order. Unreadable images and images
    /// without a detectable face are skipped with a warning; the load only
    /// fails when the directory is missing or nothing could be registered.
    pub fn load<D: Detect, E: Encode>(
        dir: &Path,
        detector: &mut D,
        encoder: &mut E,
    ) -> Result<(Self, LoadReport), RegistryError> {
        if !dir.is_dir() {
            return Err(RegistryError::DirectoryNotFound(dir.display().to_string()));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| RegistryError::DirectoryUnreadable(dir.display().to_string(), e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| has_image_extension(path))
            .collect();
        files.sort();

        let mut registry = Registry::default();
        let mut report = LoadReport::default();

        for path in &files {
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            match register_file(path, detector, encoder) {
                FileOutcome::Registered { name, embedding } => {
                    tracing::debug!(file = %file, name = %name, "registered face");
                    registry.insert(name, embedding);
                    report.registered += 1;
                }
                FileOutcome::NoFace => {
                    tracing::warn!(file = %file, "no face detected, skipping");
                    report.no_face += 1;
                }
                FileOutcome::Failed(reason) => {
                    tracing::warn!(file = %file, reason = %reason, "skipping unusable image");
                    report.failed += 1;
                }
            }
        }

        if registry.is_empty() {
            return Err(RegistryError::NoFacesRegistered(dir.display().to_string()));
        }

        Ok((registry, report))
    }

    /// Build a registry from pre-computed entries, keeping their order.
    pub fn from_entries(entries: Vec<RegisteredFace>) -> Self {
        Self { entries }
    }

    /// Insert an entry. A duplicate name replaces the stored embedding
    /// (last-loaded wins) without changing the entry's position.
    fn insert(&mut self, name: String, embedding: Embedding) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => existing.embedding = embedding,
            None => self.entries.push(RegisteredFace { name, embedding }),
        }
    }

    /// First registered identity within `tolerance` of `probe`, in
    /// insertion order, along with its distance.
    pub fn first_match(&self, probe: &Embedding, tolerance: f32) -> Option<(&RegisteredFace, f32)> {
        self.entries.iter().find_map(|entry| {
            let distance = entry.embedding.distance(probe);
            (distance <= tolerance).then_some((entry, distance))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn entries(&self) -> &[RegisteredFace] {
        &self.entries
    }
}

/// Register a single image file: decode, detect, encode the first
/// (highest-confidence) face.
fn register_file<D: Detect, E: Encode>(
    path: &Path,
    detector: &mut D,
    encoder: &mut E,
) -> FileOutcome {
    let image = match ImageReader::open(path) {
        Ok(reader) => match reader.decode() {
            Ok(image) => image.to_rgb8(),
            Err(e) => return FileOutcome::Failed(e.to_string()),
        },
        Err(e) => return FileOutcome::Failed(e.to_string()),
    };

    let faces = match detector.detect(&image) {
        Ok(faces) => faces,
        Err(e) => return FileOutcome::Failed(e.to_string()),
    };
    let Some(face) = faces.first() else {
        return FileOutcome::NoFace;
    };

    match encoder.encode(&image, face) {
        Ok(embedding) => {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            FileOutcome::Registered { name, embedding }
        }
        Err(e) => FileOutcome::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::DetectorError;
    use crate::encoder::EncoderError;
    use crate::types::FaceLocation;
    use image::RgbImage;

    /// Reports one full-image face when the image is at least
    /// `min_width` wide, none otherwise.
    struct SizeGatedDetector {
        min_width: u32,
    }

    impl Detect for SizeGatedDetector {
        fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceLocation>, DetectorError> {
            if image.width() >= self.min_width {
                Ok(vec![FaceLocation {
                    top: 0,
                    right: image.width(),
                    bottom: image.height(),
                    left: 0,
                    confidence: 0.9,
                }])
            } else {
                Ok(vec![])
            }
        }
    }

    /// Derives the embedding from the top-left pixel, so each test image
    /// gets a distinguishable vector.
    struct PixelEncoder;

    impl Encode for PixelEncoder {
        fn encode(
            &mut self,
            image: &RgbImage,
            _face: &FaceLocation,
        ) -> Result<Embedding, EncoderError> {
            let p = image.get_pixel(0, 0);
            Ok(Embedding { values: vec![p[0] as f32, p[1] as f32] })
        }
    }

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "rollcall-registry-{label}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn save_face(dir: &Path, file: &str, side: u32, red: u8) {
        RgbImage::from_pixel(side, side, image::Rgb([red, 0, 0]))
            .save(dir.join(file))
            .unwrap();
    }

    #[test]
    fn test_load_registers_each_detectable_file() {
        let dir = temp_dir("all-detectable");
        save_face(&dir, "alice.png", 8, 10);
        save_face(&dir, "carol.png", 8, 20);
        std::fs::write(dir.join("notes.txt"), "not an image").unwrap();

        let (registry, report) =
            Registry::load(&dir, &mut SizeGatedDetector { min_width: 8 }, &mut PixelEncoder)
                .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["alice", "carol"]);
        assert_eq!(report.registered, 2);
        assert_eq!(report.no_face, 0);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn test_load_skips_file_without_face() {
        // alice.png has a detectable face, bob.png does not: exactly one
        // key, "alice".
        let dir = temp_dir("alice-bob");
        save_face(&dir, "alice.png", 8, 10);
        save_face(&dir, "bob.png", 4, 20);

        let (registry, report) =
            Registry::load(&dir, &mut SizeGatedDetector { min_width: 8 }, &mut PixelEncoder)
                .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["alice"]);
        assert_eq!(report.no_face, 1);
    }

    #[test]
    fn test_load_skips_undecodable_file() {
        let dir = temp_dir("undecodable");
        save_face(&dir, "alice.png", 8, 10);
        std::fs::write(dir.join("broken.jpg"), b"garbage bytes").unwrap();

        let (registry, report) =
            Registry::load(&dir, &mut SizeGatedDetector { min_width: 8 }, &mut PixelEncoder)
                .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = temp_dir("missing").join("nope");
        let result =
            Registry::load(&dir, &mut SizeGatedDetector { min_width: 8 }, &mut PixelEncoder);
        assert!(matches!(result, Err(RegistryError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_load_empty_directory() {
        let dir = temp_dir("empty");
        let result =
            Registry::load(&dir, &mut SizeGatedDetector { min_width: 8 }, &mut PixelEncoder);
        assert!(matches!(result, Err(RegistryError::NoFacesRegistered(_))));
    }

    #[test]
    fn test_load_all_undetectable_directory() {
        let dir = temp_dir("no-faces");
        save_face(&dir, "bob.png", 4, 20);
        let result =
            Registry::load(&dir, &mut SizeGatedDetector { min_width: 8 }, &mut PixelEncoder);
        assert!(matches!(result, Err(RegistryError::NoFacesRegistered(_))));
    }

    #[test]
    fn test_duplicate_stem_last_loaded_wins() {
        // alice.jpg sorts before alice.png, so the png's embedding must
        // end up stored under the single "alice" key.
        let dir = temp_dir("duplicate-stems");
        save_face(&dir, "alice.jpg", 8, 10);
        save_face(&dir, "alice.png", 8, 99);

        let (registry, report) =
            Registry::load(&dir, &mut SizeGatedDetector { min_width: 8 }, &mut PixelEncoder)
                .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(report.registered, 2);
        assert_eq!(registry.entries()[0].embedding.values[0], 99.0);
    }

    #[test]
    fn test_first_match_prefers_insertion_order() {
        let shared = Embedding { values: vec![1.0, 0.0] };
        let registry = Registry::from_entries(vec![
            RegisteredFace { name: "first".into(), embedding: shared.clone() },
            RegisteredFace { name: "second".into(), embedding: shared.clone() },
        ]);

        let (entry, distance) = registry.first_match(&shared, 0.6).unwrap();
        assert_eq!(entry.name, "first");
        assert_eq!(distance, 0.0);
    }

    #[test]
    fn test_first_match_respects_tolerance() {
        let registry = Registry::from_entries(vec![RegisteredFace {
            name: "alice".into(),
            embedding: Embedding { values: vec![0.0, 0.0] },
        }]);

        let near = Embedding { values: vec![0.3, 0.4] }; // distance 0.5
        let far = Embedding { values: vec![3.0, 4.0] }; // distance 5.0
        assert!(registry.first_match(&near, 0.6).is_some());
        assert!(registry.first_match(&far, 0.6).is_none());
    }

    #[test]
    fn test_first_match_skips_out_of_tolerance_earlier_entry() {
        let registry = Registry::from_entries(vec![
            RegisteredFace {
                name: "far".into(),
                embedding: Embedding { values: vec![10.0, 10.0] },
            },
            RegisteredFace {
                name: "near".into(),
                embedding: Embedding { values: vec![0.0, 0.0] },
            },
        ]);

        let probe = Embedding { values: vec![0.1, 0.0] };
        let (entry, _) = registry.first_match(&probe, 0.6).unwrap();
        assert_eq!(entry.name, "near");
    }
}
