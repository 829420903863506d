//! Interactive terminal I/O: prompts, retry loops and colored messages.
//!
//! Answers come from a [`Prompt`] source so the whole interactive flow can be
//! driven by [`ScriptedPrompt`] in tests. Every loop ends with
//! [`PromptError::Exhausted`] once the source runs dry, so a closed stdin
//! never spins forever.

use std::collections::VecDeque;
use std::fmt::Display;
use std::io::{self, BufRead, Write};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("No more input available.")]
    Exhausted,

    #[error("Terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// A source of answers, one line at a time.
pub trait Prompt {
    /// Next answer without its line ending, or `None` once input is exhausted.
    fn read_line(&mut self) -> Result<Option<String>, PromptError>;
}

/// Reads answers from stdin.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn read_line(&mut self) -> Result<Option<String>, PromptError> {
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Replays a fixed list of answers.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
}

impl ScriptedPrompt {
    pub fn new<I, T>(answers: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompt for ScriptedPrompt {
    fn read_line(&mut self) -> Result<Option<String>, PromptError> {
        Ok(self.answers.pop_front())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Yellow,
    BrightBlue,
}

impl Color {
    fn ansi(self) -> &'static str {
        match self {
            Color::Red => "31",
            Color::Green => "32",
            Color::Yellow => "33",
            Color::BrightBlue => "94",
        }
    }
}

pub fn paint(text: &str, color: Color) -> String {
    format!("\x1b[{}m{text}\x1b[0m", color.ansi())
}

/// Prompts and messages over one answer source and one output stream.
pub struct Console<P: Prompt, W: Write> {
    prompt: P,
    out: W,
    color: bool,
}

impl Console<TerminalPrompt, io::Stdout> {
    pub fn stdio(color: bool) -> Self {
        Self::new(TerminalPrompt, io::stdout()).with_color(color)
    }
}

impl<P: Prompt, W: Write> Console<P, W> {
    pub fn new(prompt: P, out: W) -> Self {
        Self {
            prompt,
            out,
            color: false,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn into_parts(self) -> (P, W) {
        (self.prompt, self.out)
    }

    /// Prints one message line.
    pub fn say(&mut self, color: Color, text: &str) -> io::Result<()> {
        if self.color {
            writeln!(self.out, "{}", paint(text, color))
        } else {
            writeln!(self.out, "{text}")
        }
    }

    /// Asks for a non-empty answer. An empty answer takes `default` when there is one.
    pub fn ask(&mut self, label: &str, default: Option<&str>) -> Result<String, PromptError> {
        loop {
            match default {
                Some(d) => write!(self.out, "{label} [{d}]: ")?,
                None => write!(self.out, "{label}: ")?,
            }
            self.out.flush()?;

            let answer = self.prompt.read_line()?.ok_or(PromptError::Exhausted)?;
            let answer = answer.trim();
            if !answer.is_empty() {
                return Ok(answer.to_string());
            }
            if let Some(d) = default {
                return Ok(d.to_string());
            }
        }
    }

    /// Asks a yes/no question.
    pub fn confirm(&mut self, label: &str, default: bool) -> Result<bool, PromptError> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            write!(self.out, "{label} [{hint}]: ")?;
            self.out.flush()?;

            let answer = self.prompt.read_line()?.ok_or(PromptError::Exhausted)?;
            match answer.trim().to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.say(Color::Yellow, "Please answer y or n.")?,
            }
        }
    }

    /// Asks until `parse` accepts the answer, warning in yellow after each rejection.
    pub fn ask_until<T, E, F>(
        &mut self,
        label: &str,
        default: Option<&str>,
        mut parse: F,
    ) -> Result<T, PromptError>
    where
        E: Display,
        F: FnMut(&str) -> Result<T, E>,
    {
        loop {
            let answer = self.ask(label, default)?;
            match parse(&answer) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::debug!(label, answer = %answer, error = %e, "Rejected prompt answer");
                    self.say(Color::Yellow, &e.to_string())?;
                }
            }
        }
    }
}
