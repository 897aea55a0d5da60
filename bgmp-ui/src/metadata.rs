//! Track metadata for display

use std::path::Path;

use bgmp_common::TrackRef;
use tracing::debug;

/// Image files looked for next to a track, in order
const COVER_FILE_NAMES: &[&str] = &[
    "cover.jpg",
    "cover.png",
    "folder.jpg",
    "folder.png",
    "front.jpg",
    "front.png",
];

/// What the presentation shows for a track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    /// Encoded image bytes; `None` shows the "no album art" placeholder
    pub album_art: Option<Vec<u8>>,
}

/// Looks up display metadata for a track reference
pub trait MetadataProvider: Send + Sync {
    fn track_info(&self, track: &TrackRef) -> TrackInfo;
}

/// Derives metadata from the file name
///
/// `Artist - Title.ext` splits into both fields; anything else becomes the
/// title with an empty artist. Album art is a cover image in the same
/// directory as a local track.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileNameMetadata;

impl MetadataProvider for FileNameMetadata {
    fn track_info(&self, track: &TrackRef) -> TrackInfo {
        let reference = track.as_str();
        let path = reference.strip_prefix("file://").unwrap_or(reference);
        let name = path
            .rsplit(['/', '\\'])
            .find(|segment| !segment.is_empty())
            .unwrap_or(path);
        let stem = match name.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem,
            _ => name,
        };
        let stem = stem.replace('_', " ");
        let album_art = if reference.contains("://") && !reference.starts_with("file://") {
            None
        } else {
            Path::new(path).parent().and_then(read_cover)
        };

        match stem.split_once(" - ") {
            Some((artist, title)) if !artist.trim().is_empty() && !title.trim().is_empty() => {
                TrackInfo {
                    title: title.trim().to_string(),
                    artist: artist.trim().to_string(),
                    album_art,
                }
            }
            _ => TrackInfo {
                title: stem.trim().to_string(),
                artist: String::new(),
                album_art,
            },
        }
    }
}

/// First readable cover image in `dir`
fn read_cover(dir: &Path) -> Option<Vec<u8>> {
    COVER_FILE_NAMES.iter().find_map(|name| {
        let candidate = dir.join(name);
        if !candidate.is_file() {
            return None;
        }
        match std::fs::read(&candidate) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!("Skipping {}: {}", candidate.display(), e);
                None
            }
        }
    })
}
