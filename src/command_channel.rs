//! IPC command intake: a dedicated thread reads NDJSON commands from stdin
//! and forwards them over a channel, so the frame-processing loop can poll
//! for a `stop` without blocking on stdin itself.

use std::io::BufRead;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Command {
    Start { input: String },
    Stop,
}

#[derive(Debug)]
pub enum CommandError {
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Io(e) => write!(f, "stdin read error: {e}"),
            CommandError::Parse(msg) => write!(f, "{msg}"),
        }
    }
}

/// Spawns a thread reading newline-delimited JSON commands from `reader`
/// and sending each parsed (or failed) result on the returned channel. The
/// channel closes when the reader hits EOF.
pub fn spawn<R: BufRead + Send + 'static>(reader: R) -> flume::Receiver<Result<Command, CommandError>> {
    let (tx, rx) = flume::unbounded();
    std::thread::spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    let _ = tx.send(Err(CommandError::Io(e)));
                    continue;
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let parsed = serde_json::from_str::<Command>(trimmed)
                .map_err(|e| CommandError::Parse(format!("invalid command: {e}")));
            if tx.send(parsed).is_err() {
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_start_and_stop_commands() {
        let input = "{\"action\":\"start\",\"input\":\"video.mp4\"}\n{\"action\":\"stop\"}\n";
        let rx = spawn(Cursor::new(input.as_bytes().to_vec()));
        let first = rx.recv().unwrap().unwrap();
        match first {
            Command::Start { input } => assert_eq!(input, "video.mp4"),
            Command::Stop => panic!("expected Start"),
        }
        let second = rx.recv().unwrap().unwrap();
        assert!(matches!(second, Command::Stop));
    }

    #[test]
    fn malformed_line_surfaces_as_parse_error_without_killing_the_stream() {
        let input = "not json\n{\"action\":\"stop\"}\n";
        let rx = spawn(Cursor::new(input.as_bytes().to_vec()));
        assert!(rx.recv().unwrap().is_err());
        assert!(matches!(rx.recv().unwrap().unwrap(), Command::Stop));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let input = "\n\n{\"action\":\"stop\"}\n";
        let rx = spawn(Cursor::new(input.as_bytes().to_vec()));
        assert!(matches!(rx.recv().unwrap().unwrap(), Command::Stop));
    }
}
