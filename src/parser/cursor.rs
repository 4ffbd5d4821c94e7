//! Backtracking token cursor
//!
//! The cursor sits between the lexer and the grammar rules.  A fresh token
//! is pulled from the lexer only the first time a position is visited;
//! revisits after a revert replay the buffered token.  Snapshots are
//! explicit handles: a rule that wants to speculate takes one, then either
//! reverts (restoring the position) or commits (discarding the handle).
//! A handle that is simply dropped panics — a leaked snapshot is a
//! programming fault, not a recoverable condition.

use drop_bomb::DropBomb;

use crate::ast::SourceLocation;
use crate::diagnostics::FrontendError;
use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};

impl From<LexError> for FrontendError {
    fn from(err: LexError) -> Self {
        let expected = match err.offending {
            Some(ch) => format!("a well-formed token ({}, found {ch:?})", err.message),
            None => format!("a well-formed token ({})", err.message),
        };
        FrontendError::Syntax {
            expected,
            location: err.location,
        }
    }
}

/// Handle for one speculative position.  Must be passed back to
/// [`TokenCursor::revert`] or [`TokenCursor::commit`].
pub struct CursorSnapshot {
    pos: usize,
    bomb: DropBomb,
}

pub struct TokenCursor {
    lexer: Lexer,
    /// Buffered tokens covering absolute positions `base..base+buffer.len()`.
    buffer: Vec<Token>,
    base: usize,
    /// Absolute position of the next token to hand out.
    pos: usize,
    /// Number of snapshots not yet reverted or committed.
    outstanding: usize,
}

impl TokenCursor {
    pub fn new(source: &str) -> Self {
        Self {
            lexer: Lexer::new(source),
            buffer: Vec::new(),
            base: 0,
            pos: 0,
            outstanding: 0,
        }
    }

    /// Pull tokens from the lexer until the buffer covers `abs`.
    fn fill_to(&mut self, abs: usize) -> Result<(), FrontendError> {
        while self.base + self.buffer.len() <= abs {
            if matches!(self.buffer.last(), Some(t) if t.kind == TokenKind::Eof) {
                break;
            }
            let token = self.lexer.next_token()?;
            self.buffer.push(token);
        }
        Ok(())
    }

    /// Return the next token and move past it.  At end of input the `Eof`
    /// token is returned without moving, so callers may keep asking.
    pub fn advance(&mut self) -> Result<Token, FrontendError> {
        self.fill_to(self.pos)?;
        let token = self.buffer[self.pos - self.base].clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
            self.trim();
        }
        Ok(token)
    }

    /// The token `advance` would return, without consuming it.
    pub fn peek(&mut self) -> Result<&Token, FrontendError> {
        self.fill_to(self.pos)?;
        Ok(&self.buffer[self.pos - self.base])
    }

    pub fn peek_kind(&mut self) -> Result<TokenKind, FrontendError> {
        Ok(self.peek()?.kind)
    }

    pub fn at_end(&mut self) -> Result<bool, FrontendError> {
        Ok(self.peek_kind()? == TokenKind::Eof)
    }

    /// Location of the next token, for diagnostics.
    pub fn location(&mut self) -> SourceLocation {
        if let Ok(token) = self.peek() {
            return token.location;
        }
        SourceLocation::new(self.lexer.current_line(), self.lexer.current_column())
    }

    /// Remember the current position for a speculative parse.
    pub fn snapshot(&mut self) -> CursorSnapshot {
        self.outstanding += 1;
        CursorSnapshot {
            pos: self.pos,
            bomb: DropBomb::new("cursor snapshot must be reverted or committed"),
        }
    }

    /// Restore the position saved in `snap` and discard the snapshot.
    pub fn revert(&mut self, mut snap: CursorSnapshot) {
        snap.bomb.defuse();
        self.pos = snap.pos;
        self.outstanding -= 1;
    }

    /// Discard `snap` without restoring: the speculative parse is now the
    /// committed interpretation.
    pub fn commit(&mut self, mut snap: CursorSnapshot) {
        snap.bomb.defuse();
        self.outstanding -= 1;
        self.trim();
    }

    /// Move the cursor back exactly one position, replaying the token on
    /// the next `advance`.  Used when a single lookahead token has to be
    /// put back (e.g. a colon that turned out not to belong to a label).
    ///
    /// Panics if there is nothing to step back over; that is a bug in the
    /// calling rule.
    pub fn shift_backward(&mut self) {
        assert!(
            self.pos > self.base,
            "shift_backward with no buffered token to step back over"
        );
        self.pos -= 1;
    }

    /// Best-effort self-trim: when the cursor sits at the newest buffered
    /// position and no snapshots are outstanding, drop all but the most
    /// recent token.  One token of history is kept so a `shift_backward`
    /// immediately after a trim still has something to step back over.
    fn trim(&mut self) {
        if self.outstanding == 0 && self.pos == self.base + self.buffer.len() && self.buffer.len() > 1
        {
            let keep_from = self.buffer.len() - 1;
            self.buffer.drain(..keep_from);
            self.base += keep_from;
        }
    }

    /// Number of buffered tokens, exposed for tests of the trim behavior.
    #[cfg(test)]
    fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_and_replay() {
        let mut cursor = TokenCursor::new("a b c");

        let snap = cursor.snapshot();
        let first = cursor.advance().unwrap();
        let second = cursor.advance().unwrap();
        assert_eq!(first.text(), Some("a"));
        assert_eq!(second.text(), Some("b"));

        cursor.revert(snap);
        let replayed = cursor.advance().unwrap();
        assert_eq!(replayed.text(), Some("a"));
        assert_eq!(replayed, first);
    }

    #[test]
    fn test_commit_discards_without_restoring() {
        let mut cursor = TokenCursor::new("a b");
        let snap = cursor.snapshot();
        cursor.advance().unwrap();
        cursor.commit(snap);
        assert_eq!(cursor.advance().unwrap().text(), Some("b"));
    }

    #[test]
    fn test_shift_backward_replays_one_token() {
        let mut cursor = TokenCursor::new("x : y");
        let x = cursor.advance().unwrap();
        assert_eq!(x.text(), Some("x"));
        let colon = cursor.advance().unwrap();
        assert_eq!(colon.kind, TokenKind::Colon);
        cursor.shift_backward();
        assert_eq!(cursor.peek_kind().unwrap(), TokenKind::Colon);
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut cursor = TokenCursor::new("a");
        cursor.advance().unwrap();
        assert_eq!(cursor.advance().unwrap().kind, TokenKind::Eof);
        assert_eq!(cursor.advance().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_trim_bounds_buffer_growth() {
        let source = "a ".repeat(100);
        let mut cursor = TokenCursor::new(&source);
        for _ in 0..100 {
            cursor.advance().unwrap();
        }
        assert!(cursor.buffered() <= 2);
    }

    #[test]
    fn test_no_trim_while_snapshot_outstanding() {
        let source = "a ".repeat(50);
        let mut cursor = TokenCursor::new(&source);
        let snap = cursor.snapshot();
        for _ in 0..50 {
            cursor.advance().unwrap();
        }
        assert!(cursor.buffered() >= 50);
        cursor.revert(snap);
        assert_eq!(cursor.advance().unwrap().text(), Some("a"));
    }
}
