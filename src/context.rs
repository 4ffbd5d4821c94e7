//! Compilation context threaded through the parser and resolver
//!
//! The context owns the one piece of run-wide mutable state: a bounded ring
//! buffer of non-fatal notices.  It is passed explicitly into every phase;
//! nothing in the front end reaches for process-wide state.

use std::collections::VecDeque;

use crate::ast::SourceLocation;
use crate::diagnostics::Notice;

/// Maximum number of notices retained per run; older notices are dropped.
const NOTICE_CAPACITY: usize = 64;

/// Per-run compilation state shared by the parser and the resolver.
#[derive(Debug, Default)]
pub struct Context {
    notices: VecDeque<Notice>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    /// Record a non-fatal notice.  If the ring is full the oldest notice is
    /// discarded to make room.
    pub fn notice(&mut self, message: impl Into<String>, location: Option<SourceLocation>) {
        if self.notices.len() == NOTICE_CAPACITY {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice {
            message: message.into(),
            location,
        });
    }

    /// Drain all accumulated notices in arrival order, leaving the ring
    /// empty for the next run.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Discard any notices left over from a previous run.
    pub fn clear_notices(&mut self) {
        self.notices.clear();
    }

    pub fn notice_count(&self) -> usize {
        self.notices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_are_bounded() {
        let mut ctx = Context::new();
        for i in 0..(NOTICE_CAPACITY + 10) {
            ctx.notice(format!("notice {i}"), None);
        }
        assert_eq!(ctx.notice_count(), NOTICE_CAPACITY);

        let notices = ctx.take_notices();
        assert_eq!(notices[0].message, "notice 10");
        assert_eq!(ctx.notice_count(), 0);
    }
}
