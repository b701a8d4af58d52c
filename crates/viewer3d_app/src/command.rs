use std::path::PathBuf;

/// A line typed at the viewer prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `open <path>`: pick a local file.
    Open(PathBuf),
    /// `load <id>` or any other text: enter a resource identifier.
    Load(String),
    Refresh,
    Clear,
    History,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match (word, rest.is_empty()) {
        ("", _) => Command::Empty,
        ("open", false) => Command::Open(PathBuf::from(rest)),
        ("open", true) => Command::Invalid("open needs a file path".to_string()),
        ("load", false) => Command::Load(rest.to_string()),
        ("load", true) => Command::Invalid("load needs a path or URL".to_string()),
        ("refresh", true) => Command::Refresh,
        ("clear", true) => Command::Clear,
        ("history", true) => Command::History,
        ("help" | "?", true) => Command::Help,
        ("quit" | "exit", true) => Command::Quit,
        _ => Command::Load(line.to_string()),
    }
}
