//! Line commands typed at the reviewer prompt.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: String, password: String },
    Select { path: PathBuf },
    Submit,
    Result,
    History,
    Trend,
    Refresh,
    Status,
    Logout,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command '{0}'; type 'help' for the list of commands")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
commands:
  login <email> <password>  sign in
  select <path>             pick a manuscript file
  submit                    run a new audit on the selected manuscript
  result                    show the current audit result
  history                   list past audits
  trend                     show the quality score trend
  refresh                   reload the audit history
  status                    show session and submission state
  logout                    sign out and forget all session data
  help                      show this help
  quit                      exit";

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    let Some((verb, rest)) = split_verb(line) else {
        return Ok(None);
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "login" => {
            let mut args = rest.split_whitespace();
            match (args.next(), args.next(), args.next()) {
                (Some(email), Some(password), None) => Command::Login {
                    email: email.to_string(),
                    password: password.to_string(),
                },
                _ => return Err(ParseError::Usage("login <email> <password>")),
            }
        }
        // Paths may contain spaces, so everything after the verb is the path.
        "select" if !rest.is_empty() => Command::Select {
            path: PathBuf::from(rest.trim_matches('"')),
        },
        "select" => return Err(ParseError::Usage("select <path>")),
        "submit" | "run" => Command::Submit,
        "result" => Command::Result,
        "history" => Command::History,
        "trend" | "metrics" => Command::Trend,
        "refresh" => Command::Refresh,
        "status" => Command::Status,
        "logout" => Command::Logout,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn split_verb(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => Some((verb, rest.trim())),
        None => Some((line, "")),
    }
}
