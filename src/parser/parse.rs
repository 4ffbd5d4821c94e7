//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing
//! infrastructure: helper methods, the speculation driver, the known
//! type-alias table, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The parser is recursive descent with backtracking, organized as:
//! - This module: parser state, helpers, and coordination
//! - `declarations`: declarations, declarators, records, enums, typedefs
//! - `statements`: statements and blocks
//! - `expressions`: the expression precedence ladder
//!
//! Grammar rules read tokens through the [`TokenCursor`] and push completed
//! nodes onto the [`DescentPipe`]; rules that own variable-length lists
//! checkpoint the pipe, lock after each successful iteration, and drain the
//! fragments into the composite node.  Ambiguities are resolved by
//! speculating with a cursor snapshot plus a pipe checkpoint, committing on
//! success and reverting both on failure.  A failed speculation is not an
//! error: it is converted into the other grammar alternative and never
//! surfaces to the caller.
//!
//! Parser methods are split across multiple files using `impl Parser`
//! blocks, allowing each module to extend the parser with related
//! functionality while sharing the same state.

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::ast::{NodeId, SourceLocation, SyntaxTree, TypeFacade};
use crate::context::Context;
use crate::diagnostics::FrontendError;
use crate::parser::cursor::TokenCursor;
use crate::parser::lexer::TokenKind;
use crate::parser::pipe::DescentPipe;

/// Recursive descent parser for the C subset.
pub struct Parser<'ctx> {
    pub(crate) cursor: TokenCursor,
    pub(crate) pipe: DescentPipe,
    pub(crate) tree: SyntaxTree,
    pub(crate) ctx: &'ctx mut Context,
    /// Scope stack of names registered by `typedef`, each mapped to its
    /// alias declaration.  Consulted to decide whether an identifier token
    /// names a type; this coupling between declaration parsing and
    /// lookahead is inherent to C's grammar.
    pub(crate) type_aliases: Vec<FxHashMap<String, NodeId>>,
    /// Record tags seen so far, for `struct Name` references.
    pub(crate) record_tags: FxHashMap<String, NodeId>,
    /// Declared-type side stack; one entry per declaration being parsed.
    pub(crate) decl_types: Vec<TypeFacade>,
    /// Declared-identifier side stack, popped at declarator completion.
    pub(crate) decl_names: Vec<(String, SourceLocation)>,
    /// Running pointer nesting, applied to the type facade when the
    /// declarator completes.
    pub(crate) pointer_depth: usize,
}

impl<'ctx> Parser<'ctx> {
    pub fn new(source: &str, ctx: &'ctx mut Context) -> Self {
        Self {
            cursor: TokenCursor::new(source),
            pipe: DescentPipe::new(),
            tree: SyntaxTree::new(),
            ctx,
            type_aliases: vec![FxHashMap::default()],
            record_tags: FxHashMap::default(),
            decl_types: Vec::new(),
            decl_names: Vec::new(),
            pointer_depth: 0,
        }
    }

    /// Parse the entire translation unit and return the finished tree.
    ///
    /// On success every declaration, statement, and expression node carries
    /// its source location; type information beyond declarations is filled
    /// in later by the semantic resolver.
    pub fn parse(mut self) -> Result<SyntaxTree, FrontendError> {
        let mark = self.pipe.checkpoint();
        while !self.cursor.at_end()? {
            self.parse_external_declaration()?;
            self.pipe.lock();
        }
        self.pipe.release_until(mark);
        let items = self.pipe.drain_since(mark);
        self.tree.set_root_items(items);
        Ok(self.tree)
    }

    // ===== Helper methods =====

    pub(crate) fn at(&mut self, kind: TokenKind) -> Result<bool, FrontendError> {
        Ok(self.cursor.peek_kind()? == kind)
    }

    /// Consume the next token if it has the given kind.
    pub(crate) fn match_token(&mut self, kind: TokenKind) -> Result<bool, FrontendError> {
        if self.at(kind)? {
            self.cursor.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Consume a token of the given kind or fail with a syntax error such
    /// as `expected ';' after variable declaration`.
    pub(crate) fn expect(
        &mut self,
        kind: TokenKind,
        after: &str,
    ) -> Result<SourceLocation, FrontendError> {
        if self.at(kind)? {
            let token = self.cursor.advance()?;
            Ok(token.location)
        } else {
            let found = self.cursor.peek()?.to_string();
            let location = self.cursor.location();
            Err(FrontendError::syntax(
                format!("{} {after}, found {found}", kind.describe()),
                location,
            ))
        }
    }

    /// Consume an identifier token and return its name and location.
    pub(crate) fn expect_identifier(
        &mut self,
        after: &str,
    ) -> Result<(String, SourceLocation), FrontendError> {
        if self.at(TokenKind::Identifier)? {
            let token = self.cursor.advance()?;
            let name = token
                .text()
                .expect("identifier token always carries its name")
                .to_string();
            Ok((name, token.location))
        } else {
            let found = self.cursor.peek()?.to_string();
            let location = self.cursor.location();
            Err(FrontendError::syntax(
                format!("an identifier {after}, found {found}"),
                location,
            ))
        }
    }

    /// Pop the single result a sub-rule just pushed.
    ///
    /// Panics if the pipe is empty: a grammar rule that returned `Ok` is
    /// required to have pushed its fragment, so an empty pipe here is a
    /// bug, not an input error.
    pub(crate) fn pop_node(&mut self) -> NodeId {
        self.pipe
            .pop()
            .expect("grammar rule returned without pushing its fragment")
    }

    /// Run a speculative alternative.  On success the consumed tokens are
    /// committed; on failure both the cursor and the pipe are restored and
    /// `false` is returned so the caller can try the other interpretation.
    /// Errors raised inside the attempt never escape.
    pub(crate) fn speculate(
        &mut self,
        what: &str,
        attempt: impl FnOnce(&mut Self) -> Result<(), FrontendError>,
    ) -> Result<bool, FrontendError> {
        let snap = self.cursor.snapshot();
        let mark = self.pipe.checkpoint();
        let types_depth = self.decl_types.len();
        let names_depth = self.decl_names.len();
        let pointer_depth = self.pointer_depth;
        match attempt(self) {
            Ok(()) => {
                trace!(rule = what, "speculation committed");
                self.cursor.commit(snap);
                Ok(true)
            }
            Err(err) => {
                trace!(rule = what, %err, "speculation reverted");
                self.cursor.revert(snap);
                self.pipe.rollback(mark);
                self.decl_types.truncate(types_depth);
                self.decl_names.truncate(names_depth);
                self.pointer_depth = pointer_depth;
                Ok(false)
            }
        }
    }

    // ===== Type-alias bookkeeping =====

    pub(crate) fn push_alias_scope(&mut self) {
        self.type_aliases.push(FxHashMap::default());
    }

    pub(crate) fn pop_alias_scope(&mut self) {
        self.type_aliases.pop();
    }

    /// Register a typedef name eagerly so later statements in the same or
    /// nested scopes can recognize it as a type.
    pub(crate) fn register_alias(&mut self, name: &str, decl: NodeId) {
        if let Some(scope) = self.type_aliases.last_mut() {
            scope.insert(name.to_string(), decl);
        }
    }

    /// Innermost alias declaration registered under `name`, if any.
    pub(crate) fn lookup_alias(&self, name: &str) -> Option<NodeId> {
        self.type_aliases
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    pub(crate) fn register_record_tag(&mut self, name: &str, decl: NodeId) {
        self.record_tags.insert(name.to_string(), decl);
    }

    pub(crate) fn lookup_record_tag(&self, name: &str) -> Option<NodeId> {
        self.record_tags.get(name).copied()
    }

    /// Whether the next token can begin a type name.  An identifier counts
    /// only if it was previously registered by a `typedef`.
    pub(crate) fn at_type_name(&mut self) -> Result<bool, FrontendError> {
        let kind = self.cursor.peek_kind()?;
        Ok(match kind {
            TokenKind::KwConst
            | TokenKind::KwVoid
            | TokenKind::KwChar
            | TokenKind::KwInt
            | TokenKind::KwLong
            | TokenKind::KwFloat
            | TokenKind::KwDouble
            | TokenKind::KwStruct
            | TokenKind::KwEnum => true,
            TokenKind::Identifier => {
                let name = self
                    .cursor
                    .peek()?
                    .text()
                    .expect("identifier token always carries its name")
                    .to_string();
                self.lookup_alias(&name).is_some()
            }
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use crate::ast::RenderMode;
    use crate::context::Context;

    use super::*;

    fn parse(source: &str) -> SyntaxTree {
        let mut ctx = Context::new();
        Parser::new(source, &mut ctx).parse().expect("parse failed")
    }

    #[test]
    fn test_top_level_variable() {
        let tree = parse("int x = 1 + 2;");
        expect![[r#"
            TranslationUnit
              DeclStatement
                VarDecl(x) : int
                  Binary(Add)
                    IntLiteral(1)
                    IntLiteral(2)
        "#]]
        .assert_eq(&tree.render(RenderMode::Current));
    }

    #[test]
    fn test_function_definition() {
        let tree = parse("int f(int a) { return a; }");
        expect![[r#"
            TranslationUnit
              FunctionDecl(f) : int
                ParameterList
                  ParamDecl(a) : int
                Block
                  Return
                    Identifier(a)
        "#]]
        .assert_eq(&tree.render(RenderMode::Current));
    }

    #[test]
    fn test_paren_minus_is_not_a_cast() {
        let tree = parse("int main(void) { int a; int b; (a) - b; }");
        let rendered = tree.render(RenderMode::Current);
        assert!(rendered.contains("Binary(Sub)"));
        assert!(!rendered.contains("Cast"));
    }

    #[test]
    fn test_typedef_name_enables_cast() {
        let tree = parse("typedef int myint; int main(void) { int a; (myint) - a; }");
        let rendered = tree.render(RenderMode::Current);
        // With the alias registered, `(myint) - a` parses as a cast of the
        // unary negation.
        assert!(rendered.contains("Cast : myint"));
        assert!(rendered.contains("Unary(Neg)"));
    }

    #[test]
    fn test_expected_token_error() {
        let mut ctx = Context::new();
        let err = Parser::new("int x = 1", &mut ctx).parse().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("expected"), "unexpected message: {text}");
        assert!(text.contains("';'"), "unexpected message: {text}");
    }
}
