//! Statement parsing implementation
//!
//! Statements push exactly one completed node each.  The compound
//! statement is the canonical pipe-owner rule: it checkpoints, parses
//! block items while locking each one, then releases and drains the batch
//! into the block node.  The labeled-statement ambiguity is resolved with
//! a single-token pushback: the identifier is consumed, and if no colon
//! follows, the cursor shifts backward and the statement reparses as an
//! expression.

use crate::ast::NodeKind;
use crate::diagnostics::FrontendError;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::Parser;

impl Parser<'_> {
    /// A block item is either a declaration or a statement; the known
    /// type-alias table decides what an identifier at statement head means.
    pub(crate) fn parse_block_item(&mut self) -> Result<(), FrontendError> {
        if self.at(TokenKind::KwTypedef)? || self.at_type_name()? {
            self.parse_declaration()
        } else {
            self.parse_statement()
        }
    }

    /// Parse a statement and push it.
    pub(crate) fn parse_statement(&mut self) -> Result<(), FrontendError> {
        match self.cursor.peek_kind()? {
            TokenKind::LBrace => self.parse_compound_statement(),
            TokenKind::KwReturn => self.parse_return_statement(),
            TokenKind::KwIf => self.parse_if_statement(),
            TokenKind::KwWhile => self.parse_while_statement(),
            TokenKind::KwDo => self.parse_do_while_statement(),
            TokenKind::KwFor => self.parse_for_statement(),
            TokenKind::KwSwitch => self.parse_switch_statement(),
            TokenKind::KwBreak => {
                let location = self.cursor.advance()?.location;
                self.expect(TokenKind::Semicolon, "after 'break'")?;
                let id = self.tree.alloc(NodeKind::Break, location);
                self.pipe.push(id);
                Ok(())
            }
            TokenKind::KwContinue => {
                let location = self.cursor.advance()?.location;
                self.expect(TokenKind::Semicolon, "after 'continue'")?;
                let id = self.tree.alloc(NodeKind::Continue, location);
                self.pipe.push(id);
                Ok(())
            }
            TokenKind::KwGoto => {
                let location = self.cursor.advance()?.location;
                let (label, _) = self.expect_identifier("after 'goto'")?;
                self.expect(TokenKind::Semicolon, "after 'goto'")?;
                let id = self.tree.alloc(NodeKind::Goto { label }, location);
                self.pipe.push(id);
                Ok(())
            }
            TokenKind::KwCase | TokenKind::KwDefault => {
                let location = self.cursor.location();
                Err(FrontendError::syntax(
                    "a statement ('case' outside of switch)",
                    location,
                ))
            }
            TokenKind::Identifier => self.parse_labeled_or_expression_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    /// `{ block-items }` — the pipe-owner pattern for statement lists.
    pub(crate) fn parse_compound_statement(&mut self) -> Result<(), FrontendError> {
        let location = self.expect(TokenKind::LBrace, "to begin block")?;
        self.push_alias_scope();
        let mark = self.pipe.checkpoint();

        while !self.at(TokenKind::RBrace)? && !self.cursor.at_end()? {
            self.parse_block_item()?;
            self.pipe.lock();
        }

        self.expect(TokenKind::RBrace, "after block")?;
        self.pop_alias_scope();
        self.pipe.release_until(mark);
        let items = self.pipe.drain_since(mark);
        let id = self.tree.alloc(NodeKind::Block { items }, location);
        self.pipe.push(id);
        Ok(())
    }

    /// Identifier at statement head: speculatively a label, otherwise an
    /// expression statement.  The lookahead colon test uses the cursor's
    /// single-step pushback rather than a full snapshot.
    fn parse_labeled_or_expression_statement(&mut self) -> Result<(), FrontendError> {
        let token = self.cursor.advance()?;
        if self.at(TokenKind::Colon)? {
            self.cursor.advance()?;
            let name = token
                .text()
                .expect("identifier token always carries its name")
                .to_string();
            let id = self.tree.alloc(NodeKind::Label { name }, token.location);
            self.pipe.push(id);
            return Ok(());
        }
        // Not a label after all; put the identifier back and reparse.
        self.cursor.shift_backward();
        self.parse_expression_statement()
    }

    /// An expression used as a statement; the expression node itself is the
    /// block item.
    fn parse_expression_statement(&mut self) -> Result<(), FrontendError> {
        self.parse_expression()?;
        self.expect(TokenKind::Semicolon, "after expression")?;
        Ok(())
    }

    fn parse_return_statement(&mut self) -> Result<(), FrontendError> {
        let location = self.cursor.advance()?.location;
        let value = if self.at(TokenKind::Semicolon)? {
            None
        } else {
            self.parse_expression()?;
            Some(self.pop_node())
        };
        self.expect(TokenKind::Semicolon, "after return")?;
        let id = self.tree.alloc(NodeKind::Return { value }, location);
        self.pipe.push(id);
        Ok(())
    }

    fn parse_if_statement(&mut self) -> Result<(), FrontendError> {
        let location = self.cursor.advance()?.location;
        self.expect(TokenKind::LParen, "after 'if'")?;
        self.parse_expression()?;
        let condition = self.pop_node();
        self.expect(TokenKind::RParen, "after if condition")?;

        self.parse_statement()?;
        let then_branch = self.pop_node();

        let else_branch = if self.match_token(TokenKind::KwElse)? {
            self.parse_statement()?;
            Some(self.pop_node())
        } else {
            None
        };

        let id = self.tree.alloc(
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            },
            location,
        );
        self.pipe.push(id);
        Ok(())
    }

    fn parse_while_statement(&mut self) -> Result<(), FrontendError> {
        let location = self.cursor.advance()?.location;
        self.expect(TokenKind::LParen, "after 'while'")?;
        self.parse_expression()?;
        let condition = self.pop_node();
        self.expect(TokenKind::RParen, "after while condition")?;

        self.parse_statement()?;
        let body = self.pop_node();

        let id = self.tree.alloc(NodeKind::While { condition, body }, location);
        self.pipe.push(id);
        Ok(())
    }

    fn parse_do_while_statement(&mut self) -> Result<(), FrontendError> {
        let location = self.cursor.advance()?.location;
        self.parse_statement()?;
        let body = self.pop_node();

        self.expect(TokenKind::KwWhile, "after do body")?;
        self.expect(TokenKind::LParen, "after 'while'")?;
        self.parse_expression()?;
        let condition = self.pop_node();
        self.expect(TokenKind::RParen, "after do-while condition")?;
        self.expect(TokenKind::Semicolon, "after do-while")?;

        let id = self
            .tree
            .alloc(NodeKind::DoWhile { body, condition }, location);
        self.pipe.push(id);
        Ok(())
    }

    fn parse_for_statement(&mut self) -> Result<(), FrontendError> {
        let location = self.cursor.advance()?.location;
        self.expect(TokenKind::LParen, "after 'for'")?;

        let init = if self.match_token(TokenKind::Semicolon)? {
            None
        } else if self.at_type_name()? {
            // Declaration initializer consumes its own semicolon.
            self.parse_declaration()?;
            Some(self.pop_node())
        } else {
            self.parse_expression()?;
            self.expect(TokenKind::Semicolon, "after for initializer")?;
            Some(self.pop_node())
        };

        let condition = if self.at(TokenKind::Semicolon)? {
            None
        } else {
            self.parse_expression()?;
            Some(self.pop_node())
        };
        self.expect(TokenKind::Semicolon, "after for condition")?;

        let step = if self.at(TokenKind::RParen)? {
            None
        } else {
            self.parse_expression()?;
            Some(self.pop_node())
        };
        self.expect(TokenKind::RParen, "after for clauses")?;

        self.parse_statement()?;
        let body = self.pop_node();

        let id = self.tree.alloc(
            NodeKind::For {
                init,
                condition,
                step,
                body,
            },
            location,
        );
        self.pipe.push(id);
        Ok(())
    }

    fn parse_switch_statement(&mut self) -> Result<(), FrontendError> {
        let location = self.cursor.advance()?.location;
        self.expect(TokenKind::LParen, "after 'switch'")?;
        self.parse_expression()?;
        let condition = self.pop_node();
        self.expect(TokenKind::RParen, "after switch expression")?;
        let body_loc = self.expect(TokenKind::LBrace, "before switch body")?;

        let mut cases = Vec::new();
        while !self.at(TokenKind::RBrace)? && !self.cursor.at_end()? {
            if self.at(TokenKind::KwCase)? {
                let case_loc = self.cursor.advance()?.location;
                self.parse_conditional_expression()?;
                let value = self.pop_node();
                self.expect(TokenKind::Colon, "after case value")?;
                let body = self.parse_case_body()?;
                cases.push(self.tree.alloc(NodeKind::Case { value, body }, case_loc));
            } else if self.at(TokenKind::KwDefault)? {
                let default_loc = self.cursor.advance()?.location;
                self.expect(TokenKind::Colon, "after 'default'")?;
                let body = self.parse_case_body()?;
                cases.push(self.tree.alloc(NodeKind::DefaultCase { body }, default_loc));
            } else {
                let location = self.cursor.location();
                return Err(FrontendError::syntax(
                    "'case' or 'default' in switch body",
                    location,
                ));
            }
        }
        self.expect(TokenKind::RBrace, "after switch body")?;

        let body = self.tree.alloc(NodeKind::Block { items: cases }, body_loc);
        let id = self.tree.alloc(NodeKind::Switch { condition, body }, location);
        self.pipe.push(id);
        Ok(())
    }

    /// Statements of one case clause, up to the next `case`, `default`, or
    /// the closing brace.
    fn parse_case_body(&mut self) -> Result<Vec<crate::ast::NodeId>, FrontendError> {
        let mark = self.pipe.checkpoint();
        while !self.at(TokenKind::KwCase)?
            && !self.at(TokenKind::KwDefault)?
            && !self.at(TokenKind::RBrace)?
            && !self.cursor.at_end()?
        {
            self.parse_block_item()?;
            self.pipe.lock();
        }
        self.pipe.release_until(mark);
        Ok(self.pipe.drain_since(mark))
    }
}
