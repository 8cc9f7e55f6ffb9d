// Cache path utilities.
// Constructs filesystem paths for stores and entries keyed by request identity.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use xxhash_rust::xxh3::xxh3_64;

use crate::resource::Request;

/// File holding the entry metadata (status, headers, timestamps).
pub const ENTRY_META_FILE: &str = "entry.json";

/// File holding the raw response body.
pub const ENTRY_BODY_FILE: &str = "body.bin";

/// Get the platform cache root (~/.cache/airlock on Linux).
pub fn default_cache_root() -> Option<PathBuf> {
    ProjectDirs::from("", "", "airlock").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Directory holding all named stores under a cache root.
pub fn stores_dir(root: &Path) -> PathBuf {
    root.join("stores")
}

/// Directory for a named store.
pub fn store_dir(root: &Path, name: &str) -> PathBuf {
    stores_dir(root).join(sanitize_name(name))
}

/// Directory for a single cache entry within a store.
/// Entry identity is the request method plus a hash of the URL, so
/// arbitrarily long or hostile URLs never leak into path components.
pub fn entry_dir(store: &Path, request: &Request) -> PathBuf {
    store.join(entry_name(request))
}

/// Path to an entry's metadata file.
pub fn entry_meta_path(store: &Path, request: &Request) -> PathBuf {
    entry_dir(store, request).join(ENTRY_META_FILE)
}

/// Path to an entry's body file.
pub fn entry_body_path(store: &Path, request: &Request) -> PathBuf {
    entry_dir(store, request).join(ENTRY_BODY_FILE)
}

/// Directory name for an entry: `<method>-<xxh3 of url>`.
fn entry_name(request: &Request) -> String {
    format!(
        "{}-{:016x}",
        sanitize_name(&request.method.to_lowercase()),
        xxh3_64(request.url.as_bytes())
    )
}

/// Sanitize a name for use in filesystem paths.
/// Replaces problematic characters with underscores.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}
