//! Line commands that stand in for clicks and for the browser console.

use std::str::FromStr;

use thiserror::Error;

pub const HELP: &str = "\
commands:
  filter <name>  click the filter button <name>
  camera         click the Camera button
  photo          click the Take Photo button
  show           print the document outline
  hello          GET hello/everyone
  data           print the data fetched at startup
  inbox          print the dummy payloads received so far
  help           this text
  quit           exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Filter(String),
    Camera,
    Photo,
    Show,
    Hello,
    Data,
    Inbox,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'; try 'help'")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));

        let command = match word.to_ascii_lowercase().as_str() {
            "" => return Err(CommandError::Empty),
            "filter" if rest.is_empty() => return Err(CommandError::MissingArgument("filter")),
            "filter" => Command::Filter(rest.to_string()),
            "camera" => Command::Camera,
            "photo" => Command::Photo,
            "show" => Command::Show,
            "hello" => Command::Hello,
            "data" => Command::Data,
            "inbox" => Command::Inbox,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
