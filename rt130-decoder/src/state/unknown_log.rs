//! Bounded accumulator for unrecognized log lines

use crate::types::Result;
use std::sync::{Arc, Mutex, MutexGuard};

/// Append-only text buffer that never grows past its limit
///
/// When an append takes the buffer over `limit`, the oldest `trim`
/// characters are dropped, repeatedly, until it fits again.
#[derive(Debug, Clone)]
pub struct UnknownLog {
    text: String,
    limit: usize,
    trim: usize,
    discarded: usize,
}

impl UnknownLog {
    pub fn new(limit: usize, trim: usize) -> Self {
        Self {
            text: String::new(),
            limit,
            trim: trim.max(1),
            discarded: 0,
        }
    }

    /// Append one line (a newline is added)
    pub fn append(&mut self, line: &str) -> Result<()> {
        self.text.try_reserve(line.len() + 1)?;
        self.text.push_str(line);
        self.text.push('\n');

        let before = self.discarded;
        while self.text.len() > self.limit {
            let mut cut = self.trim.min(self.text.len());
            while !self.text.is_char_boundary(cut) {
                cut += 1;
            }
            self.text.drain(..cut);
            self.discarded += cut;
        }
        if self.discarded > before {
            log::debug!("Unknown log trimmed by {} chars", self.discarded - before);
        }
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Total characters dropped so far
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

/// Unknown-log buffer shared between a unit task and inspection tools
#[derive(Debug, Clone)]
pub struct SharedUnknownLog(Arc<Mutex<UnknownLog>>);

impl SharedUnknownLog {
    pub fn new(limit: usize, trim: usize) -> Self {
        Self(Arc::new(Mutex::new(UnknownLog::new(limit, trim))))
    }

    /// Lock the buffer; a poisoned lock still yields the text
    pub fn lock(&self) -> MutexGuard<'_, UnknownLog> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn append(&self, line: &str) -> Result<()> {
        self.lock().append(line)
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> String {
        self.lock().text().to_string()
    }
}
