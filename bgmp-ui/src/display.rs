//! Terminal display state and text layout

use bgmp_common::events::EMPTY_PLAYLIST_SUMMARY;

/// Lines the title may occupy before it is truncated
const TITLE_MAX_LINES: usize = 2;

/// Wrap `text` at word boundaries to at most `max_columns` characters per line
///
/// Text that already fits is returned unchanged. Otherwise whitespace runs
/// collapse to single spaces and words longer than a line are broken.
/// `max_lines` truncates the result; `Some(0)` means no limit.
pub fn wrap(text: &str, max_columns: usize, max_lines: Option<usize>) -> String {
    let width = max_columns.max(1);
    if text.chars().count() <= width {
        return text.to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if line_len > 0 && line_len + 1 + word_len <= width {
            line.push(' ');
            line.push_str(word);
            line_len += 1 + word_len;
            continue;
        }

        if line_len > 0 {
            lines.push(std::mem::take(&mut line));
        }
        let mut rest: Vec<char> = word.chars().collect();
        while rest.len() > width {
            lines.push(rest.drain(..width).collect());
        }
        line = rest.into_iter().collect();
        line_len = line.chars().count();
    }
    if line_len > 0 {
        lines.push(line);
    }

    if let Some(max) = max_lines.filter(|&n| n > 0) {
        lines.truncate(max);
    }
    lines.join("\n")
}

/// Everything the presentation shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    pub title: String,
    pub artist: String,
    pub playlist: String,
    /// Encoded cover image for the current track
    pub album_art: Option<Vec<u8>>,
    /// The play/pause control currently offers "pause"
    pub show_pause: bool,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            title: String::new(),
            artist: String::new(),
            playlist: EMPTY_PLAYLIST_SUMMARY.to_string(),
            album_art: None,
            show_pause: false,
        }
    }
}

impl DisplayState {
    /// Neutral presentation shown when the controller is not running
    pub fn stopped() -> Self {
        Self::default()
    }

    /// Render for a terminal `columns` wide
    pub fn render(&self, columns: usize) -> String {
        let mut out = Vec::new();
        out.push(wrap(&self.playlist, columns, None));
        if !self.title.is_empty() {
            out.push(wrap(&self.title, columns, Some(TITLE_MAX_LINES)));
        }
        if !self.artist.is_empty() {
            out.push(wrap(&self.artist, columns, None));
        }
        let control = if self.show_pause { "pause" } else { "play" };
        out.push(format!("[previous] [{}] [next]", control));
        out.join("\n")
    }
}
