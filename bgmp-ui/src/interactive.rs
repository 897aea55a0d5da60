//! Line commands for the interactive front end

use std::path::PathBuf;

/// One line typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Add(Vec<PathBuf>),
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    Stop,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  add <path>...   add files or directories to the playlist
  play | pause    start or pause playback
  toggle | t      switch between play and pause
  next | n        skip to the next track
  previous | p    skip to the previous track
  stop            stop the player and clear the playlist
  status | s      show the player state
  quit | q        leave (the player keeps running)";

/// Parse one input line; `None` for blank lines
pub fn parse_line(line: &str) -> Option<Result<Input, String>> {
    let mut words = line.split_whitespace();
    let verb = words.next()?;
    let input = match verb.to_ascii_lowercase().as_str() {
        "add" | "a" => {
            let paths: Vec<PathBuf> = words.map(PathBuf::from).collect();
            if paths.is_empty() {
                return Some(Err("add needs at least one path".to_string()));
            }
            return Some(Ok(Input::Add(paths)));
        }
        "play" => Input::Play,
        "pause" => Input::Pause,
        "toggle" | "t" => Input::Toggle,
        "next" | "n" => Input::Next,
        "previous" | "prev" | "p" => Input::Previous,
        "stop" => Input::Stop,
        "status" | "s" => Input::Status,
        "help" | "h" | "?" => Input::Help,
        "quit" | "q" | "exit" => Input::Quit,
        other => return Some(Err(format!("unknown command '{}', try help", other))),
    };
    if words.next().is_some() {
        return Some(Err(format!("{} takes no arguments", verb)));
    }
    Some(Ok(input))
}
