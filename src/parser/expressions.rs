//! Expression parsing implementation
//!
//! Classic precedence ladder over the descent pipe: each level parses its
//! operands through the next-tighter level, popping completed operands and
//! pushing the combined operator node.
//!
//! Two ambiguities are resolved here by speculation:
//!
//! - `(` may open a cast, a compound literal, or a parenthesized
//!   expression.  The cast interpretation is attempted under a cursor
//!   snapshot and a pipe checkpoint; it commits only if a full cast
//!   expression followed and the pipe actually grew, otherwise both are
//!   rolled back and the parenthesized interpretation runs.
//! - `sizeof(` may be followed by a type name or an expression; the type
//!   interpretation is speculated first, matching the original grammar's
//!   preference.

use tracing::trace;

use crate::ast::{BinOp, NodeKind, UnOp};
use crate::diagnostics::FrontendError;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::Parser;

/// Names that resolve to compile-time calls during semantic analysis.
const BUILTIN_CALL_NAMES: &[&str] = &["static_assert", "_Static_assert"];

impl Parser<'_> {
    /// Parse an expression (assignment level) and push it.
    pub(crate) fn parse_expression(&mut self) -> Result<(), FrontendError> {
        self.parse_assignment_expression()
    }

    /// Assignment and compound assignment, right-associative.
    pub(crate) fn parse_assignment_expression(&mut self) -> Result<(), FrontendError> {
        self.parse_conditional_expression()?;

        let compound_op = match self.cursor.peek_kind()? {
            TokenKind::Eq => {
                let location = self.cursor.advance()?.location;
                self.parse_assignment_expression()?;
                let right = self.pop_node();
                let left = self.pop_node();
                let id = self.tree.alloc(
                    NodeKind::Binary {
                        op: BinOp::Assign,
                        left,
                        right,
                    },
                    location,
                );
                self.pipe.push(id);
                return Ok(());
            }
            TokenKind::PlusEq => BinOp::Add,
            TokenKind::MinusEq => BinOp::Sub,
            TokenKind::StarEq => BinOp::Mul,
            TokenKind::SlashEq => BinOp::Div,
            TokenKind::PercentEq => BinOp::Mod,
            _ => return Ok(()),
        };

        let location = self.cursor.advance()?.location;
        self.parse_assignment_expression()?;
        let value = self.pop_node();
        let target = self.pop_node();
        let id = self.tree.alloc(
            NodeKind::CompoundAssign {
                op: compound_op,
                target,
                value,
            },
            location,
        );
        self.pipe.push(id);
        Ok(())
    }

    /// `cond ? then : else`, right-associative.
    pub(crate) fn parse_conditional_expression(&mut self) -> Result<(), FrontendError> {
        self.parse_logical_or()?;

        if self.at(TokenKind::Question)? {
            let location = self.cursor.advance()?.location;
            self.parse_expression()?;
            self.expect(TokenKind::Colon, "in conditional expression")?;
            self.parse_conditional_expression()?;

            let else_value = self.pop_node();
            let then_value = self.pop_node();
            let condition = self.pop_node();
            let id = self.tree.alloc(
                NodeKind::Conditional {
                    condition,
                    then_value,
                    else_value,
                },
                location,
            );
            self.pipe.push(id);
        }
        Ok(())
    }

    /// Shared driver for the left-associative binary levels.
    fn parse_binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<(), FrontendError>,
        table: &[(TokenKind, BinOp)],
    ) -> Result<(), FrontendError> {
        next(self)?;
        loop {
            let kind = self.cursor.peek_kind()?;
            let Some(&(_, op)) = table.iter().find(|(token, _)| *token == kind) else {
                return Ok(());
            };
            let location = self.cursor.advance()?.location;
            next(self)?;
            let right = self.pop_node();
            let left = self.pop_node();
            let id = self
                .tree
                .alloc(NodeKind::Binary { op, left, right }, location);
            self.pipe.push(id);
        }
    }

    fn parse_logical_or(&mut self) -> Result<(), FrontendError> {
        self.parse_binary_level(
            Self::parse_logical_and,
            &[(TokenKind::PipePipe, BinOp::LogicalOr)],
        )
    }

    fn parse_logical_and(&mut self) -> Result<(), FrontendError> {
        self.parse_binary_level(
            Self::parse_bitwise_or,
            &[(TokenKind::AmpAmp, BinOp::LogicalAnd)],
        )
    }

    fn parse_bitwise_or(&mut self) -> Result<(), FrontendError> {
        self.parse_binary_level(Self::parse_bitwise_xor, &[(TokenKind::Pipe, BinOp::BitOr)])
    }

    fn parse_bitwise_xor(&mut self) -> Result<(), FrontendError> {
        self.parse_binary_level(Self::parse_bitwise_and, &[(TokenKind::Caret, BinOp::BitXor)])
    }

    fn parse_bitwise_and(&mut self) -> Result<(), FrontendError> {
        self.parse_binary_level(Self::parse_equality, &[(TokenKind::Amp, BinOp::BitAnd)])
    }

    fn parse_equality(&mut self) -> Result<(), FrontendError> {
        self.parse_binary_level(
            Self::parse_relational,
            &[(TokenKind::EqEq, BinOp::Eq), (TokenKind::BangEq, BinOp::Ne)],
        )
    }

    fn parse_relational(&mut self) -> Result<(), FrontendError> {
        self.parse_binary_level(
            Self::parse_shift,
            &[
                (TokenKind::Lt, BinOp::Lt),
                (TokenKind::LtEq, BinOp::Le),
                (TokenKind::Gt, BinOp::Gt),
                (TokenKind::GtEq, BinOp::Ge),
            ],
        )
    }

    fn parse_shift(&mut self) -> Result<(), FrontendError> {
        self.parse_binary_level(
            Self::parse_additive,
            &[(TokenKind::Shl, BinOp::Shl), (TokenKind::Shr, BinOp::Shr)],
        )
    }

    fn parse_additive(&mut self) -> Result<(), FrontendError> {
        self.parse_binary_level(
            Self::parse_multiplicative,
            &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
        )
    }

    fn parse_multiplicative(&mut self) -> Result<(), FrontendError> {
        self.parse_binary_level(
            Self::parse_cast_expression,
            &[
                (TokenKind::Star, BinOp::Mul),
                (TokenKind::Slash, BinOp::Div),
                (TokenKind::Percent, BinOp::Mod),
            ],
        )
    }

    /// Cast vs. parenthesized expression vs. compound literal.
    pub(crate) fn parse_cast_expression(&mut self) -> Result<(), FrontendError> {
        if self.at(TokenKind::LParen)? {
            let snap = self.cursor.snapshot();
            let mark = self.pipe.checkpoint();
            match self.try_parse_cast_or_compound_literal() {
                Ok(()) if self.pipe.changed_since(mark) => {
                    trace!("cast interpretation committed");
                    self.cursor.commit(snap);
                    return Ok(());
                }
                outcome => {
                    if let Err(err) = outcome {
                        trace!(%err, "cast interpretation reverted");
                    }
                    self.cursor.revert(snap);
                    self.pipe.rollback(mark);
                }
            }
        }
        self.parse_unary_expression()
    }

    /// The speculative `( type-name ) ...` interpretation.  Pushes exactly
    /// one node on success; any failure is converted by the caller into the
    /// parenthesized-expression alternative.
    fn try_parse_cast_or_compound_literal(&mut self) -> Result<(), FrontendError> {
        let lparen_loc = self.expect(TokenKind::LParen, "before cast type")?;
        if !self.at_type_name()? {
            let location = self.cursor.location();
            return Err(FrontendError::syntax("a type name in cast", location));
        }
        let facade = self.parse_type_name()?;
        self.expect(TokenKind::RParen, "after cast type")?;

        // `(type){ ... }` is a compound literal, not a cast.
        if self.at(TokenKind::LBrace)? {
            self.parse_initializer_list()?;
            let initializer = self.pop_node();
            let id = self.tree.alloc_typed(
                NodeKind::CompoundLiteral { initializer },
                lparen_loc,
                facade,
            );
            self.pipe.push(id);
            return Ok(());
        }

        self.parse_cast_expression()?;
        let operand = self.pop_node();
        let id = self
            .tree
            .alloc_typed(NodeKind::Cast { operand }, lparen_loc, facade);
        self.pipe.push(id);
        Ok(())
    }

    /// Abstract type name as used by casts, compound literals, and
    /// `sizeof`: specifiers plus pointer stars, no declarator.  Unlike
    /// declaration specifiers, a `struct`/`enum` here is always a
    /// reference — a brace after the tag belongs to a compound literal,
    /// never to a record body.
    pub(crate) fn parse_type_name(&mut self) -> Result<crate::ast::TypeFacade, FrontendError> {
        let mut facade = self.parse_type_name_specifier()?;
        while self.match_token(TokenKind::Star)? {
            facade = facade.with_pointer();
        }
        Ok(facade)
    }

    fn parse_unary_expression(&mut self) -> Result<(), FrontendError> {
        let op = match self.cursor.peek_kind()? {
            TokenKind::Bang => UnOp::Not,
            TokenKind::Tilde => UnOp::BitNot,
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Plus => {
                // Unary plus is the identity; no node.
                self.cursor.advance()?;
                return self.parse_cast_expression();
            }
            TokenKind::Amp => UnOp::AddrOf,
            TokenKind::Star => UnOp::Deref,
            TokenKind::PlusPlus => UnOp::PreInc,
            TokenKind::MinusMinus => UnOp::PreDec,
            TokenKind::KwSizeof => return self.parse_sizeof(),
            _ => return self.parse_postfix_expression(),
        };

        let location = self.cursor.advance()?.location;
        self.parse_cast_expression()?;
        let operand = self.pop_node();
        let id = self.tree.alloc(NodeKind::Unary { op, operand }, location);
        self.pipe.push(id);
        Ok(())
    }

    /// `sizeof(type-name)` or `sizeof(expression)`, both producing a
    /// compile-time call executed during static folding.
    fn parse_sizeof(&mut self) -> Result<(), FrontendError> {
        let location = self.cursor.advance()?.location;
        self.expect(TokenKind::LParen, "after 'sizeof'")?;

        if self.at_type_name()? {
            let committed = self.speculate("sizeof type argument", |p| {
                let facade = p.parse_type_name()?;
                p.expect(TokenKind::RParen, "after sizeof type")?;
                let arguments = p.tree.alloc(
                    NodeKind::ArgumentList {
                        arguments: Vec::new(),
                    },
                    location,
                );
                let id = p.tree.alloc(
                    NodeKind::BuiltinCall {
                        name: "sizeof".to_string(),
                        arguments,
                        type_argument: Some(facade),
                    },
                    location,
                );
                p.pipe.push(id);
                Ok(())
            })?;
            if committed {
                return Ok(());
            }
        }

        self.parse_expression()?;
        self.expect(TokenKind::RParen, "after sizeof expression")?;
        let operand = self.pop_node();
        let arguments = self.tree.alloc(
            NodeKind::ArgumentList {
                arguments: vec![operand],
            },
            location,
        );
        let id = self.tree.alloc(
            NodeKind::BuiltinCall {
                name: "sizeof".to_string(),
                arguments,
                type_argument: None,
            },
            location,
        );
        self.pipe.push(id);
        Ok(())
    }

    /// Postfix chains: `++` `--` `[index]` `.member` `->member` `(args)`.
    fn parse_postfix_expression(&mut self) -> Result<(), FrontendError> {
        self.parse_primary_expression()?;

        loop {
            match self.cursor.peek_kind()? {
                TokenKind::PlusPlus => {
                    let location = self.cursor.advance()?.location;
                    let operand = self.pop_node();
                    let id = self.tree.alloc(
                        NodeKind::Unary {
                            op: UnOp::PostInc,
                            operand,
                        },
                        location,
                    );
                    self.pipe.push(id);
                }
                TokenKind::MinusMinus => {
                    let location = self.cursor.advance()?.location;
                    let operand = self.pop_node();
                    let id = self.tree.alloc(
                        NodeKind::Unary {
                            op: UnOp::PostDec,
                            operand,
                        },
                        location,
                    );
                    self.pipe.push(id);
                }
                TokenKind::LBracket => {
                    let location = self.cursor.advance()?.location;
                    self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "after array index")?;
                    let index = self.pop_node();
                    let array = self.pop_node();
                    let id = self
                        .tree
                        .alloc(NodeKind::Subscript { array, index }, location);
                    self.pipe.push(id);
                }
                TokenKind::Dot => {
                    let location = self.cursor.advance()?.location;
                    let (member, _) = self.expect_identifier("after '.'")?;
                    let object = self.pop_node();
                    let id = self.tree.alloc(
                        NodeKind::Member {
                            object,
                            member,
                            through_pointer: false,
                        },
                        location,
                    );
                    self.pipe.push(id);
                }
                TokenKind::Arrow => {
                    let location = self.cursor.advance()?.location;
                    let (member, _) = self.expect_identifier("after '->'")?;
                    let object = self.pop_node();
                    let id = self.tree.alloc(
                        NodeKind::Member {
                            object,
                            member,
                            through_pointer: true,
                        },
                        location,
                    );
                    self.pipe.push(id);
                }
                TokenKind::LParen => {
                    self.parse_call_arguments()?;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Argument list of a call; the callee is the node currently on top of
    /// the pipe.  Calls to known compile-time names become builtin calls.
    fn parse_call_arguments(&mut self) -> Result<(), FrontendError> {
        let lparen_loc = self.expect(TokenKind::LParen, "to begin arguments")?;

        let mark = self.pipe.checkpoint();
        if !self.at(TokenKind::RParen)? {
            loop {
                self.parse_assignment_expression()?;
                self.pipe.lock();
                if !self.match_token(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "after function arguments")?;

        self.pipe.release_until(mark);
        let args = self.pipe.drain_since(mark);
        let arguments = self
            .tree
            .alloc(NodeKind::ArgumentList { arguments: args }, lparen_loc);

        let callee = self.pop_node();
        let builtin_name = match &self.tree.node(callee).kind {
            NodeKind::Identifier { name, .. } if BUILTIN_CALL_NAMES.contains(&name.as_str()) => {
                Some("static_assert".to_string())
            }
            _ => None,
        };

        let id = match builtin_name {
            // The identifier node is abandoned; the builtin call carries
            // the name itself.
            Some(name) => self.tree.alloc(
                NodeKind::BuiltinCall {
                    name,
                    arguments,
                    type_argument: None,
                },
                lparen_loc,
            ),
            None => self
                .tree
                .alloc(NodeKind::Call { callee, arguments }, lparen_loc),
        };
        self.pipe.push(id);
        Ok(())
    }

    fn parse_primary_expression(&mut self) -> Result<(), FrontendError> {
        use crate::parser::lexer::LitValue;

        let token = self.cursor.peek()?.clone();
        match token.kind {
            TokenKind::IntLiteral => {
                self.cursor.advance()?;
                let Some(LitValue::Int(value)) = token.value else {
                    unreachable!("integer token always carries its value");
                };
                let id = self.tree.alloc(NodeKind::IntLiteral(value), token.location);
                self.pipe.push(id);
                Ok(())
            }
            TokenKind::FloatLiteral => {
                self.cursor.advance()?;
                let Some(LitValue::Float(value)) = token.value else {
                    unreachable!("float token always carries its value");
                };
                let id = self
                    .tree
                    .alloc(NodeKind::FloatLiteral(value), token.location);
                self.pipe.push(id);
                Ok(())
            }
            TokenKind::CharLiteral => {
                self.cursor.advance()?;
                let Some(LitValue::Char(value)) = token.value else {
                    unreachable!("character token always carries its value");
                };
                let id = self.tree.alloc(NodeKind::CharLiteral(value), token.location);
                self.pipe.push(id);
                Ok(())
            }
            TokenKind::StringLiteral => {
                self.cursor.advance()?;
                let Some(LitValue::Str(value)) = token.value else {
                    unreachable!("string token always carries its value");
                };
                let id = self
                    .tree
                    .alloc(NodeKind::StringLiteral(value), token.location);
                self.pipe.push(id);
                Ok(())
            }
            TokenKind::Identifier => {
                self.cursor.advance()?;
                let name = token
                    .text()
                    .expect("identifier token always carries its name")
                    .to_string();
                let id = self.tree.alloc(
                    NodeKind::Identifier {
                        name,
                        resolved: None,
                    },
                    token.location,
                );
                self.pipe.push(id);
                Ok(())
            }
            TokenKind::LParen => {
                self.cursor.advance()?;
                self.parse_expression()?;
                self.expect(TokenKind::RParen, "after expression")?;
                let inner = self.pop_node();
                let id = self.tree.alloc(NodeKind::Paren { inner }, token.location);
                self.pipe.push(id);
                Ok(())
            }
            _ => Err(FrontendError::syntax("an expression", token.location)),
        }
    }

    /// `= initializer` right-hand sides: either a braced list or an
    /// assignment expression.
    pub(crate) fn parse_initializer(&mut self) -> Result<(), FrontendError> {
        if self.at(TokenKind::LBrace)? {
            self.parse_initializer_list()
        } else {
            self.parse_assignment_expression()
        }
    }

    /// `{ init, init, ... }` with optional trailing comma.
    pub(crate) fn parse_initializer_list(&mut self) -> Result<(), FrontendError> {
        let lbrace_loc = self.expect(TokenKind::LBrace, "to begin initializer list")?;

        let mark = self.pipe.checkpoint();
        if !self.at(TokenKind::RBrace)? {
            loop {
                self.parse_initializer()?;
                self.pipe.lock();
                if !self.match_token(TokenKind::Comma)? {
                    break;
                }
                if self.at(TokenKind::RBrace)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace, "after initializer list")?;

        self.pipe.release_until(mark);
        let items = self.pipe.drain_since(mark);
        let id = self
            .tree
            .alloc(NodeKind::InitializerList { items }, lbrace_loc);
        self.pipe.push(id);
        Ok(())
    }
}
