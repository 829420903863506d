//! Progress reporting for streamed downloads.

use std::io::{self, Write};

const BAR_WIDTH: usize = 36;

/// Receives byte counts as a transfer proceeds.
pub trait Progress {
    /// Called once before the first chunk. `total` is 0 when the size is unknown.
    fn start(&mut self, total: u64);
    fn advance(&mut self, bytes: u64);
    fn finish(&mut self);
}

/// Discards all updates.
#[derive(Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&mut self, _total: u64) {}
    fn advance(&mut self, _bytes: u64) {}
    fn finish(&mut self) {}
}

/// Draws a single-line bar, redrawn in place with `\r`.
pub struct TerminalProgress<W: Write> {
    out: W,
    total: u64,
    done: u64,
    drawn_percent: Option<u64>,
}

impl TerminalProgress<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> TerminalProgress<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            total: 0,
            done: 0,
            drawn_percent: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self) {
        let line = if self.total == 0 {
            format!("\r[{}] {}", "?".repeat(BAR_WIDTH), crate::size::format_size(self.done))
        } else {
            let done = self.done.min(self.total);
            let percent = done * 100 / self.total;
            if self.drawn_percent == Some(percent) {
                return;
            }
            self.drawn_percent = Some(percent);
            let filled = (done as u128 * BAR_WIDTH as u128 / self.total as u128) as usize;
            format!(
                "\r[{}{}] {:>3}%",
                "#".repeat(filled),
                "-".repeat(BAR_WIDTH - filled),
                percent
            )
        };
        // A broken terminal must not abort the transfer.
        let _ = self.out.write_all(line.as_bytes());
        let _ = self.out.flush();
    }
}

impl<W: Write> Progress for TerminalProgress<W> {
    fn start(&mut self, total: u64) {
        self.total = total;
        self.done = 0;
        self.drawn_percent = None;
        self.draw();
    }

    fn advance(&mut self, bytes: u64) {
        self.done = self.done.saturating_add(bytes);
        self.draw();
    }

    fn finish(&mut self) {
        let _ = self.out.write_all(b"\n");
        let _ = self.out.flush();
    }
}
