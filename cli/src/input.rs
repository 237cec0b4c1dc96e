//! Parsing of lines typed at the prompt.

/// What a line of input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send as a chat message.
    Say(String),
    Nick(String),
    /// Leave the current channel and follow another.
    Join(String),
    Help,
    Quit,
    /// A `/word` we do not know.
    Unknown(String),
    Empty,
}

pub const HELP_TEXT: &[&str] = &[
    "/nick NAME  change your nickname",
    "/join NAME  switch to another channel",
    "/help       show this list",
    "/quit       leave (also Ctrl-D, or Ctrl-C at any time, even mid-send)",
    "//text      send a message starting with /",
];

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        if let Some(escaped) = line.strip_prefix("//") {
            return Command::Say(format!("/{escaped}"));
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Say(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match name {
            "nick" => Command::Nick(arg.to_string()),
            "join" => Command::Join(arg.to_string()),
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}
