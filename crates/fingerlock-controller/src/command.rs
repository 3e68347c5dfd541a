//! Control channel commands.
//!
//! The control channel is line oriented: one command per line, surrounding
//! whitespace ignored, case sensitive. Blank lines are skipped.

use std::fmt;
use std::str::FromStr;

use fingerlock_core::{Error, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Queue depth between the reader task and the controller.
const COMMAND_QUEUE_DEPTH: usize = 16;

/// An operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Enroll a new fingerprint in the next free slot.
    Enroll,

    /// Erase every stored fingerprint.
    Clear,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Enroll => "enroll",
            Command::Clear => "clear",
        }
    }

    /// Parse one control line.
    ///
    /// Returns `None` for a blank line.
    ///
    /// # Examples
    ///
    /// ```
    /// use fingerlock_controller::Command;
    ///
    /// assert_eq!(Command::parse_line("  enroll\r\n").unwrap().unwrap(), Command::Enroll);
    /// assert!(Command::parse_line("ENROLL").unwrap().is_err());
    /// assert!(Command::parse_line("   ").is_none());
    /// ```
    pub fn parse_line(line: &str) -> Option<Result<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        Some(line.parse())
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "enroll" => Ok(Command::Enroll),
            "clear" => Ok(Command::Clear),
            other => Err(Error::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads commands from a line stream on a background task.
///
/// The controller drains the receiver between ticks, so a command typed
/// while an enrollment or unlock hold is running waits in the queue.
#[derive(Debug)]
pub struct CommandReader {
    rx: mpsc::Receiver<Result<Command>>,
    task: Option<JoinHandle<()>>,
}

impl CommandReader {
    /// Spawn a reader over `input`.
    ///
    /// The task ends at end of input or on the first read error; the
    /// receiver then reports no more commands.
    pub fn spawn<R>(input: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);

        let task = tokio::spawn(async move {
            let mut lines = input.lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(parsed) = Command::parse_line(&line) else {
                            continue;
                        };
                        debug!(line = line.trim(), "Control line received");
                        if tx.send(parsed).await.is_err() {
                            debug!("Controller gone, stopping command reader");
                            break;
                        }
                    }
                    Ok(None) => {
                        info!("Control channel closed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Control channel read failed");
                        break;
                    }
                }
            }
        });

        Self {
            rx,
            task: Some(task),
        }
    }

    /// Take the next queued command without waiting.
    ///
    /// Returns `None` when nothing is queued, including after end of input.
    pub fn try_next(&mut self) -> Option<Result<Command>> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next command; `None` once the input has ended.
    pub async fn next(&mut self) -> Option<Result<Command>> {
        self.rx.recv().await
    }

    /// Build a reader fed directly by a channel, bypassing line parsing.
    pub fn from_channel(rx: mpsc::Receiver<Result<Command>>) -> Self {
        Self { rx, task: None }
    }
}

impl Drop for CommandReader {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("enroll", Command::Enroll)]
    #[case("clear", Command::Clear)]
    #[case("  enroll  ", Command::Enroll)]
    #[case("clear\r\n", Command::Clear)]
    #[case("\tenroll\n", Command::Enroll)]
    fn test_parse_known_commands(#[case] line: &str, #[case] expected: Command) {
        assert_eq!(Command::parse_line(line).unwrap().unwrap(), expected);
    }

    #[rstest]
    #[case("Enroll")]
    #[case("CLEAR")]
    #[case("delete 3")]
    #[case("enroll now")]
    fn test_parse_unknown_commands(#[case] line: &str) {
        let err = Command::parse_line(line).unwrap().unwrap_err();
        assert!(matches!(err, Error::UnknownCommand(text) if text == line.trim()));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\r\n")]
    fn test_blank_lines_are_skipped(#[case] line: &str) {
        assert!(Command::parse_line(line).is_none());
    }

    #[test]
    fn test_display_round_trips() {
        for command in [Command::Enroll, Command::Clear] {
            assert_eq!(command.to_string().parse::<Command>().unwrap(), command);
        }
    }

    #[tokio::test]
    async fn test_reader_yields_commands_in_order() {
        let input: &[u8] = b"enroll\n\n  clear \nbogus\n";
        let mut reader = CommandReader::spawn(input);

        assert_eq!(reader.next().await.unwrap().unwrap(), Command::Enroll);
        assert_eq!(reader.next().await.unwrap().unwrap(), Command::Clear);
        assert!(reader.next().await.unwrap().is_err());
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn test_try_next_does_not_block() {
        let (_tx, rx) = mpsc::channel(1);
        let mut reader = CommandReader::from_channel(rx);
        assert!(reader.try_next().is_none());
    }

    #[tokio::test]
    async fn test_reader_handles_missing_trailing_newline() {
        let input: &[u8] = b"clear";
        let mut reader = CommandReader::spawn(input);
        assert_eq!(reader.next().await.unwrap().unwrap(), Command::Clear);
    }
}
