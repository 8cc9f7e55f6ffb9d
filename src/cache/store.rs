// Response store for reading and writing cached responses.
// One directory per named store; one subdirectory per cached request,
// holding JSON metadata beside the raw body.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::resource::{Request, Response};

use super::paths;

/// Metadata stored beside each cached body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    /// URL the response was fetched from.
    pub url: String,
    /// Request method.
    pub method: String,
    /// Response status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// When the response was cached.
    pub cached_at: DateTime<Utc>,
}

impl StoredEntry {
    fn new(request: &Request, response: &Response) -> Self {
        Self {
            url: request.url.clone(),
            method: request.method.clone(),
            status: response.status,
            headers: response.headers.clone(),
            cached_at: Utc::now(),
        }
    }
}

/// A named, versioned on-disk response store.
///
/// Entries are keyed by request identity (method + URL) and persist until
/// removed or until the store itself is superseded by a version change.
/// There is no TTL and no eviction.
#[derive(Debug, Clone)]
pub struct ResponseStore {
    root: PathBuf,
    dir: PathBuf,
    name: String,
}

impl ResponseStore {
    /// Open (creating if missing) the store with the given name under `root`.
    pub fn open(root: &Path, name: &str) -> Result<Self> {
        let dir = paths::store_dir(root, name);
        fs::create_dir_all(&dir)?;

        Ok(Self {
            root: root.to_path_buf(),
            dir,
            name: name.to_string(),
        })
    }

    /// The store's versioned name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a cached response for the request.
    ///
    /// Returns `Ok(None)` when no entry exists. A present but unreadable
    /// entry is an error; callers decide whether that means "miss".
    pub fn lookup(&self, request: &Request) -> Result<Option<Response>> {
        let meta_path = paths::entry_meta_path(&self.dir, request);
        if !meta_path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&meta_path)?;
        let entry: StoredEntry = serde_json::from_str(&contents)?;
        let body = fs::read(paths::entry_body_path(&self.dir, request))?;

        Ok(Some(Response {
            status: entry.status,
            headers: entry.headers,
            body,
        }))
    }

    /// Store a response for the request, replacing any previous entry.
    pub fn store(&self, request: &Request, response: &Response) -> Result<()> {
        let entry_dir = paths::entry_dir(&self.dir, request);
        fs::create_dir_all(&entry_dir)?;

        write_atomic(
            &paths::entry_body_path(&self.dir, request),
            &response.body,
        )?;

        let entry = StoredEntry::new(request, response);
        let json = serde_json::to_string_pretty(&entry)?;
        write_atomic(&paths::entry_meta_path(&self.dir, request), json.as_bytes())?;

        Ok(())
    }

    /// Check whether an entry exists for the request.
    pub fn contains(&self, request: &Request) -> bool {
        paths::entry_meta_path(&self.dir, request).exists()
    }

    /// Delete the entry for the request, if present.
    pub fn remove(&self, request: &Request) -> Result<()> {
        let entry_dir = paths::entry_dir(&self.dir, request);
        if entry_dir.exists() {
            fs::remove_dir_all(&entry_dir)?;
        }
        Ok(())
    }

    /// Delete every entry in this store.
    pub fn clear(&self) -> Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            }
        }
        Ok(())
    }

    /// Delete sibling stores carrying a different (stale) version name.
    /// Returns the number of stores removed.
    pub fn purge_stale_versions(&self) -> Result<usize> {
        let stores_dir = paths::stores_dir(&self.root);
        if !stores_dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(&stores_dir)? {
            let path = entry?.path();
            if path.is_dir() && path != self.dir {
                fs::remove_dir_all(&path)?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

/// Write bytes atomically via temp file + rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}
