//! [`Storage`] implementation backed by a JSON file.

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt as _;
use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write as _},
    path::{Path, PathBuf},
};

use tracerr::Traced;

use super::{Change, Error, Storage};

/// [`Storage`] persisting its entries as a JSON object in a file.
///
/// The file is re-read on every operation, so several processes sharing it
/// observe each other's changes on a best-effort basis. Writes go through a
/// temporary sibling file which is renamed over the original one.
#[derive(Clone, Debug)]
pub struct File {
    /// Path to the file storing the entries.
    path: PathBuf,
}

impl File {
    /// Creates a new [`File`] storage at the provided `path`.
    ///
    /// The file isn't touched until the first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of this [`File`] storage.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all the entries from the file.
    ///
    /// A missing file is considered empty.
    fn read(&self) -> Result<BTreeMap<String, String>, Traced<Error>> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(tracerr::from_and_wrap!(=> Error)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Ok(BTreeMap::new())
            }
            Err(e) => Err(tracerr::new!(Error::Io(e))),
        }
    }

    /// Replaces the file contents with the provided entries.
    ///
    /// On Unix, the file is readable by its owner only.
    fn write(
        &self,
        entries: &BTreeMap<String, String>,
    ) -> Result<(), Traced<Error>> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .map_err(tracerr::from_and_wrap!(=> Error))?;
            }
        }

        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        match fs::remove_file(&tmp) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(tracerr::new!(Error::Io(e))),
        }

        let mut options = fs::OpenOptions::new();
        _ = options.write(true).create_new(true);
        #[cfg(unix)]
        {
            _ = options.mode(0o600);
        }
        let mut file = options
            .open(&tmp)
            .map_err(tracerr::from_and_wrap!(=> Error))?;
        file.write_all(&bytes)
            .and_then(|()| file.sync_all())
            .map_err(tracerr::from_and_wrap!(=> Error))?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(tracerr::from_and_wrap!(=> Error))
    }
}

impl Storage for File {
    fn get(&self, key: &str) -> Result<Option<String>, Traced<Error>> {
        Ok(self.read().map_err(tracerr::wrap!())?.remove(key))
    }

    fn apply(&self, changes: &[Change<'_>]) -> Result<(), Traced<Error>> {
        let mut entries = self.read().map_err(tracerr::wrap!())?;
        for change in changes {
            match *change {
                Change::Set(key, value) => {
                    drop(entries.insert(key.to_owned(), value.to_owned()));
                }
                Change::Remove(key) => drop(entries.remove(key)),
            }
        }
        self.write(&entries).map_err(tracerr::wrap!())
    }
}
