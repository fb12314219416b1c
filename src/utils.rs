//! Paths of the files kept in the data directory.

use std::path::{Path, PathBuf};

/// Name of the mirror file inside the data directory.
pub const MIRROR_FILE: &str = "mirror.json";

/// Location of the local mirror for `data_dir`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(mirror_path(Path::new("/var/lib/minbar")), PathBuf::from("/var/lib/minbar/mirror.json"));
/// ```
pub fn mirror_path(data_dir: &Path) -> PathBuf {
    data_dir.join(MIRROR_FILE)
}
