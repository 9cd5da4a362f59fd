// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watched-file content hashing

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Hex SHA-256 of `bytes`
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Hash of one watched file, or `None` when it is missing or unreadable
fn hash_watched(project_root: &Path, watched: &Path) -> Option<String> {
    let path = project_root.join(watched);
    match std::fs::read(&path) {
        Ok(bytes) => Some(content_hash(&bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to hash watched file");
            None
        }
    }
}

/// Current hashes of the watched files. Absolute paths are used as-is.
pub fn observe(project_root: &Path, watch_files: &[PathBuf]) -> Vec<(PathBuf, Option<String>)> {
    watch_files
        .iter()
        .map(|watched| (watched.clone(), hash_watched(project_root, watched)))
        .collect()
}

/// Fold observations into the stored baseline, returning files that changed.
///
/// A file seen for the first time only seeds the baseline. Files that
/// could not be hashed keep their previous baseline.
pub fn apply_observations(
    stored: &mut HashMap<PathBuf, String>,
    observed: Vec<(PathBuf, Option<String>)>,
) -> Vec<PathBuf> {
    let mut changed = Vec::new();
    for (path, hash) in observed {
        let Some(hash) = hash else {
            continue;
        };
        match stored.insert(path.clone(), hash.clone()) {
            Some(previous) if previous != hash => changed.push(path),
            _ => {}
        }
    }
    changed
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
