use thiserror::Error;

/// One line typed by the test-taker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Next,
    Previous,
    Jump(i64),
    Answer(String),
    Grid,
    Submit,
    Confirm,
    Cancel,
    Pause,
    Resume,
    Reload,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum CommandError {
    #[error("unknown command `{0}`; type `help` for the list")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("`{0}` is not a question number")]
    InvalidPosition(String),
}

impl Command {
    pub(crate) fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "n" | "next" => Self::Next,
            "p" | "prev" | "previous" => Self::Previous,
            "j" | "jump" | "goto" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument("jump"));
                }
                Self::Jump(parse_position(rest)?)
            }
            "a" | "answer" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument("answer"));
                }
                Self::Answer(rest.to_string())
            }
            "g" | "grid" => Self::Grid,
            "submit" => Self::Submit,
            "y" | "yes" | "confirm" => Self::Confirm,
            "no" | "cancel" => Self::Cancel,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "r" | "reload" => Self::Reload,
            "h" | "?" | "help" => Self::Help,
            "q" | "quit" | "exit" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(Some(command))
    }
}

/// Whole numbers too large for `i64` saturate; the session clamps them anyway.
fn parse_position(raw: &str) -> Result<i64, CommandError> {
    if let Ok(position) = raw.parse::<i64>() {
        return Ok(position);
    }
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(CommandError::InvalidPosition(raw.to_string()));
    }
    Ok(if negative { i64::MIN } else { i64::MAX })
}

/// Lets `answer 2` pick the second listed option; anything else is sent verbatim.
pub(crate) fn resolve_choice(options: &[String], raw: &str) -> String {
    raw.parse::<usize>()
        .ok()
        .and_then(|index| index.checked_sub(1))
        .and_then(|index| options.get(index))
        .cloned()
        .unwrap_or_else(|| raw.to_string())
}

pub(crate) const HELP: &str = "\
Commands:
  next | prev            move one question
  jump N                 go to question N
  answer V               answer with option number or text
  grid                   show the question overview
  submit, then confirm   finish the exam (cancel to go back)
  pause | resume         pause and keep your remaining time
  reload                 fetch the current question again
  quit                   pause and leave";
