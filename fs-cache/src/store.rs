use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use data_error::{MemojiError, Result};
use fs_atomic_light::temp_and_move;

/// Durable content-addressed store.
///
/// Every key maps to one file `{key}.{extension}` in a flat directory. A
/// value is written once and never replaced afterwards.
pub struct ArtifactStore {
    /// Label for logging
    label: String,
    /// Path to the underlying folder where data is persisted
    path: PathBuf,
    extension: String,
}

impl ArtifactStore {
    /// Creates a store over an existing directory.
    ///
    /// # Arguments
    /// * `label` - Identifier used in logs
    /// * `path` - Directory where artifacts are stored
    /// * `extension` - File extension appended to every key
    pub fn new(label: String, path: &Path, extension: &str) -> Result<Self> {
        Self::validate_path(path, &label)?;

        log::debug!("store/{}: initialized at {}", label, path.display());
        Ok(Self {
            label,
            path: PathBuf::from(path),
            extension: extension.to_owned(),
        })
    }

    fn validate_path(path: &Path, label: &str) -> Result<()> {
        if !path.exists() {
            return Err(MemojiError::Storage(
                label.to_owned(),
                "Folder does not exist".to_owned(),
            ));
        }

        if !path.is_dir() {
            return Err(MemojiError::Storage(
                label.to_owned(),
                "Path is not a directory".to_owned(),
            ));
        }

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the artifact for `key`
    pub fn file_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.path.join(self.file_name(key)?))
    }

    pub fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.file_path(key)?.is_file())
    }

    /// Reads the artifact, `None` if it was never written or was removed
    pub fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.file_path(key)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Persists `value` unless an artifact for `key` already exists.
    ///
    /// Returns whether this call wrote the file. Racing writers of the same
    /// key may both write; the content is identical so the last rename wins.
    pub fn write(&self, key: &str, value: &[u8]) -> Result<bool> {
        if self.exists(key)? {
            log::debug!("store/{}: {} already present", self.label, key);
            return Ok(false);
        }
        let file_name = self.file_name(key)?;

        log::debug!("store/{}: writing {} bytes for {}", self.label, value.len(), key);
        temp_and_move(value, &self.path, &file_name).map_err(|err| {
            MemojiError::Storage(
                self.label.clone(),
                format!("Failed to write value for key {}: {}", key, err),
            )
        })?;
        Ok(true)
    }

    fn file_name(&self, key: &str) -> Result<String> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(MemojiError::Path(format!(
                "store/{}: invalid key {:?}",
                self.label, key
            )));
        }
        Ok(format!("{}.{}", key, self.extension))
    }
}

#[cfg(test)]
impl ArtifactStore {
    /// Returns all stored keys in sorted order
    fn keys(&self) -> Result<Vec<String>> {
        let suffix = format!(".{}", self.extension);
        let mut keys: Vec<String> = fs::read_dir(&self.path)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| !fs_atomic_light::is_temp_file(name))
            .filter_map(|name| name.strip_suffix(&suffix).map(str::to_owned))
            .collect();
        keys.sort();
        Ok(keys)
    }
}
