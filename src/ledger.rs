use crate::error::Error;
use crate::hasher::ContentDigest;
use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Digests of every capture already accepted by the remote service.
///
/// Persisted as a flat JSON array of hex strings. Only grows: there is no removal.
#[derive(Debug)]
pub struct UploadLedger {
    path: PathBuf,
    digests: HashSet<ContentDigest>,
}

impl UploadLedger {
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            digests: HashSet::new(),
        }
    }

    /// Absent, unreadable or malformed ledger files all load as empty.
    pub fn load(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No ledger at {}, starting empty", path.display());
                return Self::empty(path);
            }
            Err(e) => {
                warn!(
                    "Uploaded log file {} is unreadable ({}). Starting fresh.",
                    path.display(),
                    e
                );
                return Self::empty(path);
            }
        };

        let entries: Vec<String> = match serde_json::from_str(&contents) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "Uploaded log file {} is corrupt ({}). Starting fresh.",
                    path.display(),
                    e
                );
                return Self::empty(path);
            }
        };

        let mut digests = HashSet::with_capacity(entries.len());
        for entry in entries {
            match ContentDigest::parse(&entry) {
                Some(digest) => {
                    digests.insert(digest);
                }
                None => warn!("Dropping malformed ledger entry '{}'", entry),
            }
        }
        debug!("Loaded {} digests from {}", digests.len(), path.display());

        Self {
            path: path.to_path_buf(),
            digests,
        }
    }

    /// Write to a temp file beside the ledger, then rename over it.
    pub fn save(&self) -> Result<(), Error> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let mut sorted: Vec<&ContentDigest> = self.digests.iter().collect();
        sorted.sort();

        let tmp = NamedTempFile::new_in(&parent)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, &sorted)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!("Saved {} digests to {}", sorted.len(), self.path.display());
        Ok(())
    }

    pub fn contains(&self, digest: &ContentDigest) -> bool {
        self.digests.contains(digest)
    }

    /// Returns `true` if the digest was not already recorded.
    pub fn insert(&mut self, digest: ContentDigest) -> bool {
        self.digests.insert(digest)
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
