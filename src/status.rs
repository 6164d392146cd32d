//! Status text shown under the score.
//!
//! Text is word-wrapped for the narrow status area and handed to the
//! renderer pre-wrapped, one `\n` per line break. A single deferred slot lets
//! an announcement stay up for a while before the next message replaces it.

use core::fmt::Write as _;

use heapless::String;

use crate::Instant;
use crate::config::{STATUS_CAPACITY, STATUS_WIDTH};

pub type StatusText = String<STATUS_CAPACITY>;

/// Greedily packs whitespace-separated words into lines of at most `width`
/// characters. Words are never split; a word longer than `width` gets a line
/// of its own. Text that does not fit in the buffer is truncated at a word
/// boundary.
pub fn wrap(text: &str, width: usize) -> StatusText {
    let mut out = StatusText::new();
    let mut line_len = 0;
    for word in text.split_whitespace() {
        let len = word.chars().count();
        let sep = if out.is_empty() {
            None
        } else if line_len + 1 + len <= width {
            Some(' ')
        } else {
            Some('\n')
        };
        let needed = sep.map_or(0, char::len_utf8) + word.len();
        if out.len() + needed > STATUS_CAPACITY {
            warn!("status text truncated");
            break;
        }
        match sep {
            Some(' ') => {
                let _ = out.push(' ');
                line_len += 1 + len;
            }
            Some(_) => {
                let _ = out.push('\n');
                line_len = len;
            }
            None => line_len = len,
        }
        let _ = out.push_str(word);
    }
    out
}

/// Formats into a status string, truncating on overflow.
pub fn format(args: core::fmt::Arguments<'_>) -> StatusText {
    let mut text = StatusText::new();
    if text.write_fmt(args).is_err() {
        warn!("status text overflow");
    }
    text
}

struct Deferred {
    text: StatusText,
    due: Instant,
}

pub struct StatusLine {
    wrapped: StatusText,
    dirty: bool,
    deferred: Option<Deferred>,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusLine {
    pub const fn new() -> Self {
        Self {
            wrapped: String::new(),
            dirty: false,
            deferred: None,
        }
    }

    /// Shows `text` now and drops any pending deferred message.
    pub fn set(&mut self, text: &str) {
        self.deferred = None;
        self.show(text);
    }

    /// Schedules `text` to replace the current message at `due`.
    ///
    /// Only one message can be pending: a later call overwrites an earlier
    /// one that has not been shown yet (latest wins).
    pub fn schedule(&mut self, text: &str, due: Instant) {
        if let Some(old) = &self.deferred {
            debug!("deferred status replaced: {}", old.text.as_str());
        }
        let mut pending = StatusText::new();
        let _ = pending.push_str(truncate(text));
        self.deferred = Some(Deferred { text: pending, due });
    }

    /// Updates the status without cutting an announcement short: while a
    /// deferred message is pending, `text` takes its place and keeps its due
    /// time; otherwise `text` is shown now.
    pub fn show_or_defer(&mut self, text: &str) {
        match &mut self.deferred {
            Some(pending) => {
                pending.text.clear();
                let _ = pending.text.push_str(truncate(text));
            }
            None => self.show(text),
        }
    }

    /// Applies the deferred message once its due time has passed.
    pub fn deliver(&mut self, now: Instant) -> bool {
        let due = match &self.deferred {
            Some(pending) => pending.due,
            None => return false,
        };
        if now < due {
            return false;
        }
        if let Some(pending) = self.deferred.take() {
            self.show(&pending.text);
        }
        true
    }

    pub fn is_pending(&self) -> bool {
        self.deferred.is_some()
    }

    pub fn pending(&self) -> Option<&str> {
        self.deferred.as_ref().map(|d| d.text.as_str())
    }

    /// Current text, wrapped.
    pub fn text(&self) -> &str {
        &self.wrapped
    }

    /// Returns the wrapped text if it changed since the last call.
    pub fn take_changed(&mut self) -> Option<&str> {
        if core::mem::take(&mut self.dirty) {
            Some(&self.wrapped)
        } else {
            None
        }
    }

    fn show(&mut self, text: &str) {
        let wrapped = wrap(text, STATUS_WIDTH);
        if wrapped != self.wrapped {
            self.wrapped = wrapped;
            self.dirty = true;
        }
    }
}

fn truncate(text: &str) -> &str {
    if text.len() <= STATUS_CAPACITY {
        return text;
    }
    let mut end = STATUS_CAPACITY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
