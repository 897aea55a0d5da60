//! Track picking
//!
//! Turns command-line paths into track references. Files are taken as given;
//! directories are walked recursively for audio files in sorted order.

use std::path::{Path, PathBuf};

use bgmp_common::TrackRef;
use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};

/// Extensions picked up when scanning a directory
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "opus", "m4a", "aac", "wav"];

/// Whether `path` has an audio extension (case-insensitive)
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Collect track references for `paths`, in argument order
///
/// Every path must exist. Unreadable directory entries are skipped with a
/// warning.
pub fn collect_tracks(paths: &[PathBuf]) -> Result<Vec<TrackRef>> {
    let mut tracks = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(Error::PathNotFound(path.clone()));
        }
        if path.is_dir() {
            let found = scan_directory(path)?;
            tracing::debug!("Found {} audio files under {}", found.len(), path.display());
            tracks.extend(found);
        } else {
            tracks.push(track_ref(path)?);
        }
    }
    Ok(tracks)
}

fn scan_directory(root: &Path) -> Result<Vec<TrackRef>> {
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    let mut tracks = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && is_audio_file(entry.path()) {
                    tracks.push(track_ref(entry.path())?);
                }
            }
            Err(e) => tracing::warn!("Error accessing entry: {}", e),
        }
    }
    Ok(tracks)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Absolute path as a track reference
fn track_ref(path: &Path) -> Result<TrackRef> {
    let absolute = path.canonicalize()?;
    absolute
        .to_str()
        .map(TrackRef::from)
        .ok_or_else(|| Error::NonUtf8Path(absolute.clone()))
}
