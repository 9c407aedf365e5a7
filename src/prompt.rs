use std::io::{self, BufRead, Write};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Failed to read confirmation: {0}")]
    Io(#[from] io::Error),

    #[error("Input closed before a confirmation was given")]
    Eof,
}

/// Operator-facing input and output channels.
///
/// The upgrade flow writes reports and questions through the same
/// console, so tests can swap in a `Cursor` and a `Vec<u8>`.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }

    /// Ask a yes/no question and read exactly one line of answer.
    ///
    /// Only "y" or "yes" (any case, surrounding whitespace ignored) count
    /// as consent. A read failure or closed input is an error, not a "no".
    pub fn confirm(&mut self, question: &str) -> Result<bool, PromptError> {
        write!(self.output, "{} [y/N]: ", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PromptError::Eof);
        }
        Ok(is_affirmative(&line))
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
