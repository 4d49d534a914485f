//! Yes/no questions on the terminal.

use std::io::{BufRead, Write};

use pipeline_schema_core::Prompter;

/// Asks questions on stderr and reads answers from a line reader.
///
/// An empty answer takes the default; end of input or a read error also
/// takes the default so piping `/dev/null` never hangs.
pub struct TerminalPrompter<R> {
    input: R,
}

impl TerminalPrompter<std::io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self {
            input: std::io::stdin().lock(),
        }
    }
}

impl<R: BufRead> TerminalPrompter<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> Prompter for TerminalPrompter<R> {
    fn confirm(&mut self, question: &str, default: bool) -> bool {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            eprint!("{question} {hint} ");
            let _ = std::io::stderr().flush();

            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) | Err(_) => {
                    eprintln!();
                    return default;
                }
                Ok(_) => {}
            }
            match parse_answer(&line, default) {
                Some(answer) => return answer,
                None => eprintln!("Please answer 'y' or 'n'."),
            }
        }
    }
}

fn parse_answer(line: &str, default: bool) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}
