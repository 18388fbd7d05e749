use data_error::Result;

use std::fs;
use std::path::Path;

const TEMP_PREFIX: &str = ".tmp-";

/// Write data to a temporary file next to the destination and rename it
/// into place.
///
/// Readers observe either no file or the complete content. Concurrent
/// writers of the same filename each rename their own temporary file, the
/// last rename wins.
///
/// May fail if writing or renaming fails, the temporary file is removed in
/// that case.
pub fn temp_and_move(
    data: &[u8],
    dest_dir: impl AsRef<Path>,
    filename: &str,
) -> Result<()> {
    let suffix: String = std::iter::repeat_with(fastrand::alphanumeric)
        .take(10)
        .collect();
    let temp_path = dest_dir
        .as_ref()
        .join(format!("{}{}.{}", TEMP_PREFIX, filename, suffix));

    let result = fs::write(&temp_path, data)
        .and_then(|_| fs::rename(&temp_path, dest_dir.as_ref().join(filename)));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    Ok(result?)
}

/// Whether `filename` is a leftover temporary file of [`temp_and_move`]
pub fn is_temp_file(filename: &str) -> bool {
    filename.starts_with(TEMP_PREFIX)
}
