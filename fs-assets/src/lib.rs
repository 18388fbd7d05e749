//! Locates base avatar images on disk.
//!
//! Every gender has its own asset directory under a common root. The mixed
//! `random` set is a numbered sequence (`1.png` .. `N.png`) while the male and
//! female sets are enumerated and sorted, so the configured counts may drift
//! from the real number of files without breaking selection.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use data_error::{MemojiError, Result};
use gender_detect::Gender;

pub const ASSET_EXTENSION: &str = "png";

/// Static description of one gender's asset set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenderConfig {
    pub directory: &'static str,
    pub count: usize,
}

pub const MALE: GenderConfig = GenderConfig {
    directory: "male",
    count: 27,
};
pub const FEMALE: GenderConfig = GenderConfig {
    directory: "female",
    count: 31,
};
/// Original numbered set, kept for backwards compatibility of old avatars
pub const RANDOM: GenderConfig = GenderConfig {
    directory: "v1",
    count: 58,
};

impl GenderConfig {
    pub fn of(gender: Gender) -> Self {
        match gender {
            Gender::Male => MALE,
            Gender::Female => FEMALE,
            Gender::Random => RANDOM,
        }
    }
}

/// Resolver from `(gender, image index)` to a base image path.
///
/// Non-empty directory listings are cached for the lifetime of the value.
pub struct AssetSet {
    root: PathBuf,
    listings: RwLock<HashMap<Gender, Arc<Vec<PathBuf>>>>,
}

impl AssetSet {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            listings: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the base image for `image_index`.
    ///
    /// `Random` indexes the numbered sequence directly. `Male` and `Female`
    /// index their sorted listing modulo its length, and fall back to the
    /// numbered sequence when the directory holds no images.
    ///
    /// The path is not checked for existence; a missing file surfaces when
    /// it is decoded.
    pub fn resolve(&self, gender: Gender, image_index: usize) -> Result<PathBuf> {
        if gender == Gender::Random {
            return Ok(self.numbered(image_index));
        }

        let files = self.listing(gender)?;
        if files.is_empty() {
            log::warn!(
                "assets/{}: no images found, falling back to {}",
                gender,
                RANDOM.directory
            );
            return Ok(self.numbered(image_index % RANDOM.count));
        }

        Ok(files[image_index % files.len()].clone())
    }

    /// Sorted image files of a gender's directory
    pub fn listing(&self, gender: Gender) -> Result<Arc<Vec<PathBuf>>> {
        if let Some(files) = self
            .listings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&gender)
        {
            return Ok(Arc::clone(files));
        }

        let files = Arc::new(self.scan(gender)?);
        if !files.is_empty() {
            self.listings
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(gender, Arc::clone(&files));
        }
        Ok(files)
    }

    /// Drops cached listings so the next lookup rescans the directories
    pub fn refresh(&self) {
        self.listings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn numbered(&self, image_index: usize) -> PathBuf {
        self.root
            .join(RANDOM.directory)
            .join(format!("{}.{}", image_index + 1, ASSET_EXTENSION))
    }

    fn scan(&self, gender: Gender) -> Result<Vec<PathBuf>> {
        let directory = self.root.join(GenderConfig::of(gender).directory);
        log::debug!("assets/{}: scanning {}", gender, directory.display());

        if !directory.exists() {
            return Ok(Vec::new());
        }
        if !directory.is_dir() {
            return Err(MemojiError::Path(format!(
                "{} is not a directory",
                directory.display()
            )));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&directory)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(ASSET_EXTENSION)
            })
            .collect();
        // read_dir order is platform dependent
        files.sort();

        log::debug!("assets/{}: found {} images", gender, files.len());
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempdir::TempDir;

    fn touch(dir: &Path, names: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        for name in names {
            fs::write(dir.join(name), b"png").unwrap();
        }
    }

    #[rstest]
    #[case(0, "1.png")]
    #[case(3, "4.png")]
    #[case(57, "58.png")]
    fn random_is_one_based_sequence(#[case] index: usize, #[case] file: &str) {
        let assets = AssetSet::new("/srv/avatars");
        assert_eq!(
            assets.resolve(Gender::Random, index).unwrap(),
            PathBuf::from("/srv/avatars/v1").join(file)
        );
    }

    #[test]
    fn gendered_listing_is_sorted() {
        let dir = TempDir::new("fs_assets").unwrap();
        touch(&dir.path().join("male"), &["c.png", "a.png", "b.png", "notes.txt"]);

        let assets = AssetSet::new(dir.path());
        let files = assets.listing(Gender::Male).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn index_wraps_around_actual_file_count() {
        let dir = TempDir::new("fs_assets").unwrap();
        let female = dir.path().join("female");
        touch(&female, &["01.png", "02.png", "03.png"]);

        let assets = AssetSet::new(dir.path());
        // configured count is 31, only 3 files exist
        for index in 0..FEMALE.count {
            let path = assets.resolve(Gender::Female, index).unwrap();
            assert!(path.exists(), "{} should exist", path.display());
        }
        assert_eq!(
            assets.resolve(Gender::Female, 4).unwrap(),
            female.join("02.png")
        );
    }

    #[test]
    fn empty_directory_falls_back_to_numbered_set() {
        let dir = TempDir::new("fs_assets").unwrap();
        fs::create_dir_all(dir.path().join("male")).unwrap();

        let assets = AssetSet::new(dir.path());
        assert_eq!(
            assets.resolve(Gender::Male, 60).unwrap(),
            dir.path().join("v1").join("3.png")
        );
        // missing directory behaves the same way
        assert_eq!(
            assets.resolve(Gender::Female, 1).unwrap(),
            dir.path().join("v1").join("2.png")
        );
    }

    #[test]
    fn listing_is_cached_until_refresh() {
        let dir = TempDir::new("fs_assets").unwrap();
        let male = dir.path().join("male");
        touch(&male, &["a.png"]);

        let assets = AssetSet::new(dir.path());
        assert_eq!(assets.listing(Gender::Male).unwrap().len(), 1);

        touch(&male, &["b.png"]);
        assert_eq!(assets.listing(Gender::Male).unwrap().len(), 1);

        assets.refresh();
        assert_eq!(assets.listing(Gender::Male).unwrap().len(), 2);
    }

    #[test]
    fn empty_listing_is_not_cached() {
        let dir = TempDir::new("fs_assets").unwrap();
        let assets = AssetSet::new(dir.path());
        assert!(assets.listing(Gender::Female).unwrap().is_empty());

        touch(&dir.path().join("female"), &["x.png"]);
        assert_eq!(assets.listing(Gender::Female).unwrap().len(), 1);
    }
}
