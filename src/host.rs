//! The small boundary between the interpreter and the outside world. The
//! interpreter is generic over `Host` so tests can swap in an in-memory
//! implementation instead of talking to real stdio.

use std::io::{self, BufRead, Write};

pub trait Host {
    /// Emits one line of program output.
    fn output(&mut self, line: &str);

    /// Reads one line of input, without the trailing newline.
    fn input(&mut self) -> io::Result<String>;
}

/// The default host, backed by process stdin/stdout.
pub struct StdHost {
    stdin: io::Stdin,
}

impl StdHost {
    pub fn new() -> StdHost {
        StdHost { stdin: io::stdin() }
    }
}

impl Default for StdHost {
    fn default() -> Self {
        StdHost::new()
    }
}

impl Host for StdHost {
    fn output(&mut self, line: &str) {
        println!("{}", line);
        let _ = io::stdout().flush();
    }

    fn input(&mut self) -> io::Result<String> {
        let mut line = String::new();
        self.stdin.lock().read_line(&mut line)?;
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }
}

/// An in-memory host for tests: records every emitted line and serves
/// input from a pre-supplied queue.
#[derive(Default)]
pub struct MockHost {
    pub output: Vec<String>,
    pub input: std::collections::VecDeque<String>,
}

impl MockHost {
    pub fn with_input<'a>(lines: impl IntoIterator<Item = &'a str>) -> MockHost {
        MockHost {
            output: Vec::new(),
            input: lines.into_iter().map(str::to_string).collect(),
        }
    }
}

impl Host for MockHost {
    fn output(&mut self, line: &str) {
        self.output.push(line.to_string());
    }

    fn input(&mut self) -> io::Result<String> {
        self.input
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more mock input"))
    }
}
