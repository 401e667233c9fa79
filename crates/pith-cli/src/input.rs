//! Multi-line input with control lines

use std::io::{self, BufRead};

use tokio::sync::mpsc;

/// Line that submits the collected message
pub const SUBMIT_KEYWORD: &str = "FIN";
/// Line that resets the conversation
pub const CLEAR_KEYWORD: &str = "CLEAR";

/// What one read produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Conversation content
    Message(String),
    /// Reset history; any lines typed before it are discarded
    Clear,
    /// A slash command given as the first line, e.g. `/model grok-3-beta`
    Command(String),
    /// Nothing typed before `FIN`, or end of input
    Empty,
}

/// Slash commands recognized on the first line of a submission
const COMMANDS: &[&str] = &["/model", "/help"];

/// Whole-line, case-insensitive keyword match. Keywords win over content, so a
/// message cannot contain a line that is only `FIN` or `CLEAR`.
fn is_keyword(line: &str, keyword: &str) -> bool {
    line.trim().eq_ignore_ascii_case(keyword)
}

fn is_command(line: &str) -> bool {
    let head = line.split_whitespace().next().unwrap_or_default();
    COMMANDS.iter().any(|c| head.eq_ignore_ascii_case(c))
}

pub struct InputReader<R> {
    reader: R,
    exhausted: bool,
}

impl<R: BufRead> InputReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            exhausted: false,
        }
    }

    /// Read lines until a control line or end of input
    pub fn read_submission(&mut self) -> io::Result<Submission> {
        if self.exhausted {
            return Ok(Submission::Empty);
        }

        let mut lines: Vec<String> = Vec::new();
        loop {
            let mut buf = String::new();
            if self.reader.read_line(&mut buf)? == 0 {
                self.exhausted = true;
                break;
            }
            let line = buf.trim_end_matches(['\n', '\r']);

            if is_keyword(line, CLEAR_KEYWORD) {
                return Ok(Submission::Clear);
            }
            if is_keyword(line, SUBMIT_KEYWORD) {
                break;
            }
            if lines.is_empty() && is_command(line) {
                return Ok(Submission::Command(line.trim().to_string()));
            }
            lines.push(line.to_string());
        }

        if lines.is_empty() {
            Ok(Submission::Empty)
        } else {
            Ok(Submission::Message(lines.join("\n")))
        }
    }
}

fn pump<R: BufRead>(mut input: InputReader<R>, tx: mpsc::Sender<io::Result<Submission>>) {
    loop {
        let next = input.read_submission();
        let last = matches!(next, Ok(Submission::Empty) | Err(_));
        if tx.blocking_send(next).is_err() || last {
            break;
        }
    }
}

/// Read submissions from `reader` on a dedicated thread. The channel closes
/// after `Empty` or a read error.
pub fn spawn_reader<R>(reader: R) -> mpsc::Receiver<io::Result<Submission>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    std::thread::spawn(move || pump(InputReader::new(reader), tx));
    rx
}

/// [`spawn_reader`] over the process's stdin
pub fn spawn_stdin_reader() -> mpsc::Receiver<io::Result<Submission>> {
    spawn_reader(io::BufReader::new(io::stdin()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(text: &str) -> InputReader<Cursor<Vec<u8>>> {
        InputReader::new(Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn test_lines_until_fin() {
        let mut r = reader("hello\nworld\nFIN\nsecond\nfin\n");
        assert_eq!(
            r.read_submission().unwrap(),
            Submission::Message("hello\nworld".into())
        );
        assert_eq!(r.read_submission().unwrap(), Submission::Message("second".into()));
        assert_eq!(r.read_submission().unwrap(), Submission::Empty);
    }

    #[test]
    fn test_fin_without_lines_is_empty() {
        assert_eq!(reader("FIN\n").read_submission().unwrap(), Submission::Empty);
    }

    #[test]
    fn test_clear_discards_pending_lines() {
        let mut r = reader("draft\n  Clear \nnext\nFIN\n");
        assert_eq!(r.read_submission().unwrap(), Submission::Clear);
        assert_eq!(r.read_submission().unwrap(), Submission::Message("next".into()));
    }

    #[test]
    fn test_keywords_must_be_whole_lines() {
        let mut r = reader("FINISH the CLEAR plan\nFIN\n");
        assert_eq!(
            r.read_submission().unwrap(),
            Submission::Message("FINISH the CLEAR plan".into())
        );
    }

    #[test]
    fn test_command_only_on_first_line() {
        let mut r = reader("/model grok-3-beta\nask about /model\n/model\nFIN\n");
        assert_eq!(
            r.read_submission().unwrap(),
            Submission::Command("/model grok-3-beta".into())
        );
        assert_eq!(
            r.read_submission().unwrap(),
            Submission::Message("ask about /model\n/model".into())
        );
    }

    #[test]
    fn test_eof_submits_pending_then_empty() {
        let mut r = reader("no newline at end");
        assert_eq!(
            r.read_submission().unwrap(),
            Submission::Message("no newline at end".into())
        );
        assert_eq!(r.read_submission().unwrap(), Submission::Empty);
    }

    #[test]
    fn test_crlf_lines() {
        let mut r = reader("a\r\nb\r\nFIN\r\n");
        assert_eq!(r.read_submission().unwrap(), Submission::Message("a\nb".into()));
    }

    #[tokio::test]
    async fn test_reader_thread_delivers_then_closes() {
        let mut rx = spawn_reader(Cursor::new(b"one\nFIN\n/help\nFIN\n".to_vec()));
        assert_eq!(rx.recv().await.unwrap().unwrap(), Submission::Message("one".into()));
        assert_eq!(rx.recv().await.unwrap().unwrap(), Submission::Command("/help".into()));
        assert_eq!(rx.recv().await.unwrap().unwrap(), Submission::Empty);
        assert!(rx.recv().await.is_none());
    }
}
