use std::io::Write;
use std::path::{Path, PathBuf};

use burrow_types::Hash20;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{CheckoutError, CheckoutResult};
use crate::snapshot::{decode_snapshot, encode_snapshot};

const SNAPSHOT_FILE: &str = "SNAPSHOT";
const OVERLAY_DIR: &str = "local";

/// On-disk metadata of a single checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Where the checkout is mounted.
    pub mount_path: PathBuf,
    /// Private directory holding the checkout's metadata.
    pub client_directory: PathBuf,
}

impl CheckoutConfig {
    pub fn new(mount_path: impl Into<PathBuf>, client_directory: impl Into<PathBuf>) -> Self {
        Self {
            mount_path: mount_path.into(),
            client_directory: client_directory.into(),
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.client_directory.join(SNAPSHOT_FILE)
    }

    pub fn overlay_path(&self) -> PathBuf {
        self.client_directory.join(OVERLAY_DIR)
    }

    /// Read the commit the checkout currently points at.
    pub fn parent_commit(&self) -> CheckoutResult<Hash20> {
        let path = self.snapshot_path();
        let data = std::fs::read(&path)?;
        decode_snapshot(&data).map_err(|source| CheckoutError::Snapshot { path, source })
    }

    /// Point the checkout at `parent`.
    ///
    /// The record is written to a temporary file next to the SNAPSHOT file
    /// and renamed over it, so readers see either the old or the new record.
    pub fn set_parent_commit(&self, parent: &Hash20) -> CheckoutResult<()> {
        let path = self.snapshot_path();
        write_atomic(&path, &encode_snapshot(parent))?;
        debug!(path = %path.display(), %parent, "updated parent commit");
        Ok(())
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> CheckoutResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SnapshotError;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> CheckoutConfig {
        CheckoutConfig::new("/mnt/repo", dir.path())
    }

    #[test]
    fn paths() {
        let c = CheckoutConfig::new("/mnt/repo", "/var/burrow/clients/repo");
        assert_eq!(
            c.snapshot_path(),
            PathBuf::from("/var/burrow/clients/repo/SNAPSHOT")
        );
        assert_eq!(c.overlay_path(), PathBuf::from("/var/burrow/clients/repo/local"));
    }

    #[test]
    fn set_then_read_parent() {
        let dir = TempDir::new().unwrap();
        let c = config(&dir);
        let first = Hash20::sha1(b"first");
        let second = Hash20::sha1(b"second");

        c.set_parent_commit(&first).unwrap();
        assert_eq!(c.parent_commit().unwrap(), first);
        c.set_parent_commit(&second).unwrap();
        assert_eq!(c.parent_commit().unwrap(), second);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("SNAPSHOT")]);
    }

    #[test]
    fn missing_snapshot_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            config(&dir).parent_commit(),
            Err(CheckoutError::Io(_))
        ));
    }

    #[test]
    fn corrupt_snapshot_names_the_file() {
        let dir = TempDir::new().unwrap();
        let c = config(&dir);
        std::fs::write(c.snapshot_path(), b"eden").unwrap();

        let err = c.parent_commit().unwrap_err();
        match &err {
            CheckoutError::Snapshot { path, source } => {
                assert_eq!(path, &c.snapshot_path());
                assert_eq!(source, &SnapshotError::TooShort(4));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("SNAPSHOT file is too short"));
        assert!(err.to_string().contains(&c.snapshot_path().display().to_string()));
    }
}
