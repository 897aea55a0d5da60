//! Playlist
//!
//! Ordered sequence of track references with a wrap-around cursor.
//! The cursor is `Some` exactly when the playlist is non-empty.

use bgmp_common::TrackRef;

pub use bgmp_common::events::EMPTY_PLAYLIST_SUMMARY as EMPTY_SUMMARY;

#[derive(Debug, Default, Clone)]
pub struct Playlist {
    items: Vec<TrackRef>,
    cursor: Option<usize>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the end; the cursor only moves if the playlist was empty
    pub fn append(&mut self, track: TrackRef) {
        self.items.push(track);
        if self.cursor.is_none() {
            self.cursor = Some(0);
        }
    }

    /// Move to the next track, wrapping to the first
    pub fn advance(&mut self) {
        if let Some(cursor) = self.cursor {
            self.cursor = Some((cursor + 1) % self.items.len());
        }
    }

    /// Move to the previous track, wrapping to the last
    pub fn retreat(&mut self) {
        if let Some(cursor) = self.cursor {
            let len = self.items.len();
            self.cursor = Some((cursor + len - 1) % len);
        }
    }

    /// Track at the cursor, `None` if empty
    pub fn current(&self) -> Option<&TrackRef> {
        self.cursor.map(|cursor| &self.items[cursor])
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.cursor = None;
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[TrackRef] {
        &self.items
    }

    /// One-line description for the presentation process
    pub fn summary(&self) -> String {
        match self.cursor {
            Some(cursor) => format!(
                "Track {} of {} in the Playlist.",
                cursor + 1,
                self.items.len()
            ),
            None => EMPTY_SUMMARY.to_string(),
        }
    }
}
