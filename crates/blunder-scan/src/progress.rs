//! Console game counter, rewritten in place.

use std::io::Write;

/// Prints `Games: N` followed by a carriage return so the next update
/// overwrites it.
pub struct Progress<W: Write> {
    out: W,
    enabled: bool,
    dirty: bool,
}

impl<W: Write> Progress<W> {
    pub fn new(out: W, enabled: bool) -> Self {
        Self {
            out,
            enabled,
            dirty: false,
        }
    }

    /// Show the current game count. Write errors are ignored; progress is
    /// not part of the output contract.
    pub fn games(&mut self, count: u32) {
        if !self.enabled {
            return;
        }
        let _ = write!(self.out, "Games: {}\r", count);
        let _ = self.out.flush();
        self.dirty = true;
    }

    /// Move past the counter line so later output starts clean.
    pub fn finish(&mut self) {
        if self.dirty {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
            self.dirty = false;
        }
    }
}
