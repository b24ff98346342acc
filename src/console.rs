use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Where `display`/`write-line` send their output and `read-line` reads from.
pub trait Console {
    fn write(&mut self, text: &str) -> io::Result<()>;

    /// Reads one line without its line terminator; `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Process stdout/stdin.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn write(&mut self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(strip_line_ending(line)))
    }
}

/// In-memory console: collects output and serves scripted input lines.
#[derive(Debug, Default)]
pub struct BufferConsole {
    output: String,
    input: VecDeque<String>,
}

impl BufferConsole {
    pub fn new() -> Self {
        BufferConsole::default()
    }

    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BufferConsole {
            output: String::new(),
            input: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }
}

impl Console for BufferConsole {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.output.push_str(text);
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.input.pop_front())
    }
}

fn strip_line_ending(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}
