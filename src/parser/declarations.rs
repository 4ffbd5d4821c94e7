//! Declaration parsing implementation
//!
//! Handles external declarations, declaration statements, typedefs, record
//! and enum specifiers, declarators, and parameter lists (both the modern
//! typed form and the old-style bare identifier list with trailing
//! parameter declarations).
//!
//! # Grammar
//!
//! ```text
//! declaration  ::= "typedef" specifiers declarator ";"
//!                | specifiers ";"
//!                | specifiers init-declarator ("," init-declarator)* ";"
//!                | specifiers declarator "(" params ")" (";" | knr-decls? block)
//! specifiers   ::= "const"? (builtin | record-spec | enum-spec | alias-name)
//! declarator   ::= "*"* identifier ("[" expr? "]")*
//! ```
//!
//! Declared base types and declared identifiers accumulate on two side
//! stacks while a declaration is in flight; pointer nesting is a running
//! counter applied to the type facade when each declarator completes.

use crate::ast::{BuiltinType, NodeId, NodeKind, SourceLocation, TypeFacade};
use crate::diagnostics::FrontendError;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::Parser;

/// Keyword-to-builtin mapping shared by declaration specifiers and
/// abstract type names.
fn builtin_type_from(kind: TokenKind) -> Option<BuiltinType> {
    match kind {
        TokenKind::KwVoid => Some(BuiltinType::Void),
        TokenKind::KwChar => Some(BuiltinType::Char),
        TokenKind::KwInt => Some(BuiltinType::Int),
        TokenKind::KwLong => Some(BuiltinType::Long),
        TokenKind::KwFloat => Some(BuiltinType::Float),
        TokenKind::KwDouble => Some(BuiltinType::Double),
        _ => None,
    }
}

impl Parser<'_> {
    /// Parse one top-level declaration: a function, or a declaration
    /// statement holding variables, records, enums, or typedefs.
    pub(crate) fn parse_external_declaration(&mut self) -> Result<(), FrontendError> {
        self.parse_declaration()
    }

    /// Parse a full declaration and push the resulting nodes.  Used at file
    /// scope, as a block item, and as a `for` initializer.
    pub(crate) fn parse_declaration(&mut self) -> Result<(), FrontendError> {
        let location = self.cursor.location();
        if self.match_token(TokenKind::KwTypedef)? {
            return self.parse_typedef(location);
        }

        let mark = self.pipe.checkpoint();
        let base = self.parse_declaration_specifiers()?;
        self.decl_types.push(base);

        // `struct S { ... };` or `enum E { ... };` with no declarator.
        if self.match_token(TokenKind::Semicolon)? {
            self.decl_types.pop();
            return self.finish_declaration_statement(mark, location);
        }

        self.parse_declarator_prefix()?;

        // A parenthesis after the first declarator makes this a function.
        if self.at(TokenKind::LParen)? {
            let (name, name_loc, facade) = self.finish_declarator();
            self.decl_types.pop();
            return self.parse_function_declaration(name, name_loc, facade);
        }

        loop {
            let (name, name_loc, mut facade) = self.finish_declarator();
            facade = self.parse_array_suffix(facade)?;

            let init = if self.match_token(TokenKind::Eq)? {
                self.parse_initializer()?;
                Some(self.pop_node())
            } else {
                None
            };

            let id = self
                .tree
                .alloc_typed(NodeKind::VarDecl { name, init }, name_loc, facade);
            self.pipe.push(id);
            self.pipe.lock();

            if !self.match_token(TokenKind::Comma)? {
                break;
            }
            self.parse_declarator_prefix()?;
        }

        self.expect(TokenKind::Semicolon, "after declaration")?;
        self.decl_types.pop();
        self.finish_declaration_statement(mark, location)
    }

    /// `typedef` specifiers declarator `;` — registers the alias name
    /// eagerly so later statements in this and nested scopes recognize it
    /// as a type.
    fn parse_typedef(&mut self, location: SourceLocation) -> Result<(), FrontendError> {
        let mark = self.pipe.checkpoint();
        let base = self.parse_declaration_specifiers()?;
        self.decl_types.push(base);
        self.parse_declarator_prefix()?;
        let (name, name_loc, facade) = self.finish_declarator();
        self.expect(TokenKind::Semicolon, "after typedef")?;
        self.decl_types.pop();

        let id = self.tree.alloc_typed(
            NodeKind::TypeAliasDecl { name: name.clone() },
            name_loc,
            facade,
        );
        self.register_alias(&name, id);
        self.pipe.push(id);
        self.pipe.lock();
        self.finish_declaration_statement(mark, location)
    }

    /// Wrap everything pushed since `mark` into a declaration statement.
    fn finish_declaration_statement(
        &mut self,
        mark: crate::parser::pipe::PipeMark,
        location: SourceLocation,
    ) -> Result<(), FrontendError> {
        self.pipe.release_until(mark);
        let declarations = self.pipe.drain_since(mark);
        let id = self
            .tree
            .alloc(NodeKind::DeclStatement { declarations }, location);
        self.pipe.push(id);
        Ok(())
    }

    /// Parse declaration specifiers down to a base type facade.  Record and
    /// enum definitions encountered here push their declaration node as a
    /// side effect.
    pub(crate) fn parse_declaration_specifiers(&mut self) -> Result<TypeFacade, FrontendError> {
        // Qualifiers are accepted and dropped; the facade carries none.
        let _ = self.match_token(TokenKind::KwConst)?;

        let location = self.cursor.location();
        let kind = self.cursor.peek_kind()?;
        let facade = if let Some(builtin) = builtin_type_from(kind) {
            self.cursor.advance()?;
            if builtin == BuiltinType::Long {
                // `long int` spells the same type.
                let _ = self.match_token(TokenKind::KwInt)?;
            }
            TypeFacade::builtin(builtin)
        } else {
            match kind {
                TokenKind::KwStruct => self.parse_record_specifier()?,
                TokenKind::KwEnum => self.parse_enum_specifier()?,
                TokenKind::Identifier => {
                    let name = self
                        .cursor
                        .peek()?
                        .text()
                        .expect("identifier token always carries its name")
                        .to_string();
                    match self.lookup_alias(&name) {
                        Some(decl) => {
                            self.cursor.advance()?;
                            TypeFacade::alias(decl)
                        }
                        None => {
                            return Err(FrontendError::syntax("a type name", location));
                        }
                    }
                }
                _ => return Err(FrontendError::syntax("a type name", location)),
            }
        };

        let _ = self.match_token(TokenKind::KwConst)?;
        Ok(facade)
    }

    /// The specifier part of an abstract type name (casts, `sizeof`,
    /// compound literals).  Records and enums are referenced by tag only;
    /// their bodies cannot be defined here.
    pub(crate) fn parse_type_name_specifier(&mut self) -> Result<TypeFacade, FrontendError> {
        let _ = self.match_token(TokenKind::KwConst)?;

        let location = self.cursor.location();
        let kind = self.cursor.peek_kind()?;
        if let Some(builtin) = builtin_type_from(kind) {
            self.cursor.advance()?;
            if builtin == BuiltinType::Long {
                let _ = self.match_token(TokenKind::KwInt)?;
            }
            return Ok(TypeFacade::builtin(builtin));
        }
        match kind {
            TokenKind::KwStruct => {
                self.cursor.advance()?;
                let (name, name_loc) = self.expect_identifier("after 'struct'")?;
                if let Some(decl) = self.lookup_record_tag(&name) {
                    return Ok(TypeFacade::record(decl));
                }
                let id = self.tree.alloc(
                    NodeKind::RecordDecl {
                        name: name.clone(),
                        fields: Vec::new(),
                    },
                    name_loc,
                );
                self.register_record_tag(&name, id);
                Ok(TypeFacade::record(id))
            }
            TokenKind::KwEnum => {
                self.cursor.advance()?;
                self.expect_identifier("after 'enum'")?;
                Ok(TypeFacade::builtin(BuiltinType::Int))
            }
            TokenKind::Identifier => {
                let name = self
                    .cursor
                    .peek()?
                    .text()
                    .expect("identifier token always carries its name")
                    .to_string();
                match self.lookup_alias(&name) {
                    Some(decl) => {
                        self.cursor.advance()?;
                        Ok(TypeFacade::alias(decl))
                    }
                    None => Err(FrontendError::syntax("a type name", location)),
                }
            }
            _ => Err(FrontendError::syntax("a type name", location)),
        }
    }

    /// `struct Name { fields }` | `struct Name` | `struct { fields }`
    fn parse_record_specifier(&mut self) -> Result<TypeFacade, FrontendError> {
        let location = self.expect(TokenKind::KwStruct, "to begin record type")?;
        let name = if self.at(TokenKind::Identifier)? {
            self.expect_identifier("after 'struct'")?.0
        } else {
            String::new()
        };

        if !self.at(TokenKind::LBrace)? {
            // Reference to a record declared elsewhere; forward references
            // get a placeholder declaration with no fields yet.
            if name.is_empty() {
                let location = self.cursor.location();
                return Err(FrontendError::syntax(
                    "'{' or a record name after 'struct'",
                    location,
                ));
            }
            if let Some(decl) = self.lookup_record_tag(&name) {
                return Ok(TypeFacade::record(decl));
            }
            let id = self.tree.alloc(
                NodeKind::RecordDecl {
                    name: name.clone(),
                    fields: Vec::new(),
                },
                location,
            );
            self.register_record_tag(&name, id);
            return Ok(TypeFacade::record(id));
        }

        self.expect(TokenKind::LBrace, "after record name")?;
        let mut fields = Vec::new();
        while !self.at(TokenKind::RBrace)? {
            let base = self.parse_declaration_specifiers()?;
            self.decl_types.push(base);
            self.parse_declarator_prefix()?;
            let (field_name, field_loc, mut facade) = self.finish_declarator();
            facade = self.parse_array_suffix(facade)?;
            self.expect(TokenKind::Semicolon, "after record field")?;
            self.decl_types.pop();

            let field = self.tree.alloc_typed(
                NodeKind::FieldDecl { name: field_name },
                field_loc,
                facade,
            );
            fields.push(field);
        }
        self.expect(TokenKind::RBrace, "after record fields")?;

        let id = self.tree.alloc(
            NodeKind::RecordDecl {
                name: name.clone(),
                fields,
            },
            location,
        );
        if !name.is_empty() {
            self.register_record_tag(&name, id);
        }
        self.pipe.push(id);
        self.pipe.lock();
        Ok(TypeFacade::record(id))
    }

    /// `enum Name { A, B = expr, ... }` | `enum Name`
    ///
    /// Enumerations behave as `int`; the constants become declarations in
    /// the enclosing scope.
    fn parse_enum_specifier(&mut self) -> Result<TypeFacade, FrontendError> {
        let location = self.expect(TokenKind::KwEnum, "to begin enum type")?;
        let name = if self.at(TokenKind::Identifier)? {
            self.expect_identifier("after 'enum'")?.0
        } else {
            String::new()
        };

        if !self.at(TokenKind::LBrace)? {
            return Ok(TypeFacade::builtin(BuiltinType::Int));
        }

        self.expect(TokenKind::LBrace, "after enum name")?;
        let mut constants = Vec::new();
        while !self.at(TokenKind::RBrace)? {
            let (constant_name, constant_loc) = self.expect_identifier("in enum body")?;
            let value = if self.match_token(TokenKind::Eq)? {
                self.parse_conditional_expression()?;
                Some(self.pop_node())
            } else {
                None
            };
            constants.push(self.tree.alloc(
                NodeKind::EnumConstantDecl {
                    name: constant_name,
                    value,
                },
                constant_loc,
            ));
            if !self.match_token(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "after enum body")?;

        let id = self.tree.alloc(NodeKind::EnumDecl { name, constants }, location);
        self.pipe.push(id);
        self.pipe.lock();
        Ok(TypeFacade::builtin(BuiltinType::Int))
    }

    // ===== Declarators =====

    /// Consume pointer stars and the declared identifier, accumulating them
    /// on the running pointer counter and the declared-identifier stack.
    pub(crate) fn parse_declarator_prefix(&mut self) -> Result<(), FrontendError> {
        while self.match_token(TokenKind::Star)? {
            self.pointer_depth += 1;
        }
        let (name, location) = self.expect_identifier("in declarator")?;
        self.decl_names.push((name, location));
        Ok(())
    }

    /// Complete the declarator in flight: pop the declared identifier and
    /// apply the accumulated pointer nesting to the declared base type.
    pub(crate) fn finish_declarator(&mut self) -> (String, SourceLocation, TypeFacade) {
        let (name, location) = self
            .decl_names
            .pop()
            .expect("declarator completed without a declared identifier");
        let base = *self
            .decl_types
            .last()
            .expect("declarator completed without a declared type");
        let facade = base.with_pointers(self.pointer_depth);
        self.pointer_depth = 0;
        (name, location, facade)
    }

    /// `[size]` suffixes; arrays decay to pointers in the type facade, and
    /// the size expression is parsed but not retained.
    pub(crate) fn parse_array_suffix(
        &mut self,
        mut facade: TypeFacade,
    ) -> Result<TypeFacade, FrontendError> {
        while self.match_token(TokenKind::LBracket)? {
            if !self.at(TokenKind::RBracket)? {
                self.parse_assignment_expression()?;
                let _ = self.pop_node();
            }
            self.expect(TokenKind::RBracket, "after array size")?;
            facade = facade.with_pointer();
        }
        Ok(facade)
    }

    // ===== Functions =====

    /// Everything after `type name` once `(` is known to follow: parameter
    /// list, then either `;` (prototype) or an optional run of old-style
    /// parameter declarations and the body.
    fn parse_function_declaration(
        &mut self,
        name: String,
        name_loc: SourceLocation,
        return_facade: TypeFacade,
    ) -> Result<(), FrontendError> {
        let params = self.parse_parameter_list()?;

        if self.match_token(TokenKind::Semicolon)? {
            let id = self.tree.alloc_typed(
                NodeKind::FunctionDecl {
                    name,
                    params,
                    body: None,
                    binding: None,
                },
                name_loc,
                return_facade,
            );
            self.pipe.push(id);
            return Ok(());
        }

        if !self.at(TokenKind::LBrace)? {
            self.parse_knr_parameter_declarations(params)?;
        }

        self.parse_compound_statement()?;
        let body = self.pop_node();

        let id = self.tree.alloc_typed(
            NodeKind::FunctionDecl {
                name,
                params,
                body: Some(body),
                binding: None,
            },
            name_loc,
            return_facade,
        );
        self.pipe.push(id);
        Ok(())
    }

    /// Parameter list including both parentheses.  The modern typed form is
    /// speculated first; on failure the old-style bare identifier list is
    /// accepted and the identifiers are typed by the trailing declarations
    /// parsed in [`Parser::parse_knr_parameter_declarations`].
    fn parse_parameter_list(&mut self) -> Result<NodeId, FrontendError> {
        let lparen_loc = self.expect(TokenKind::LParen, "after function name")?;

        if self.match_token(TokenKind::RParen)? {
            let id = self.tree.alloc(
                NodeKind::ParameterList {
                    parameters: Vec::new(),
                },
                lparen_loc,
            );
            return Ok(id);
        }

        // `(void)` means no parameters, unless the void begins `void *p`.
        if self.at(TokenKind::KwVoid)? {
            let empty = self.speculate("empty parameter list", |p| {
                p.cursor.advance()?;
                p.expect(TokenKind::RParen, "after parameters")?;
                Ok(())
            })?;
            if empty {
                let id = self.tree.alloc(
                    NodeKind::ParameterList {
                        parameters: Vec::new(),
                    },
                    lparen_loc,
                );
                return Ok(id);
            }
        }

        let mark = self.pipe.checkpoint();
        let typed = self.speculate("typed parameter list", |p| {
            loop {
                if p.at(TokenKind::Ellipsis)? {
                    let loc = p.cursor.location();
                    p.cursor.advance()?;
                    let id =
                        p.tree
                            .alloc_typed(NodeKind::VariadicMarker, loc, TypeFacade::variadic());
                    p.pipe.push(id);
                    break;
                }
                p.parse_parameter_declaration()?;
                if !p.match_token(TokenKind::Comma)? {
                    break;
                }
            }
            p.expect(TokenKind::RParen, "after parameters")?;
            Ok(())
        })?;

        if typed {
            self.pipe.release_until(mark);
            let parameters = self.pipe.drain_since(mark);
            let id = self
                .tree
                .alloc(NodeKind::ParameterList { parameters }, lparen_loc);
            return Ok(id);
        }

        // Old-style bare identifier list; every name defaults to int until
        // a trailing parameter declaration says otherwise.
        let mut parameters = Vec::new();
        loop {
            let (param_name, param_loc) = self.expect_identifier("in parameter list")?;
            parameters.push(self.tree.alloc_typed(
                NodeKind::ParamDecl { name: param_name },
                param_loc,
                TypeFacade::builtin(BuiltinType::Int),
            ));
            if !self.match_token(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RParen, "after parameters")?;
        self.ctx
            .notice("old-style function parameter list", Some(lparen_loc));

        let id = self
            .tree
            .alloc(NodeKind::ParameterList { parameters }, lparen_loc);
        Ok(id)
    }

    /// One typed parameter: specifiers, pointers, optional name, optional
    /// array suffix.  Prototypes may omit the name.
    fn parse_parameter_declaration(&mut self) -> Result<(), FrontendError> {
        let base = self.parse_declaration_specifiers()?;
        let mut facade = base;
        while self.match_token(TokenKind::Star)? {
            facade = facade.with_pointer();
        }
        let (name, location) = if self.at(TokenKind::Identifier)? {
            self.expect_identifier("in parameter declaration")?
        } else {
            (String::new(), self.cursor.location())
        };
        facade = self.parse_array_suffix(facade)?;

        let id = self
            .tree
            .alloc_typed(NodeKind::ParamDecl { name }, location, facade);
        self.pipe.push(id);
        Ok(())
    }

    /// Old-style trailing parameter declarations: `int f(a, b) int a; char
    /// b; { ... }`.  Each one retypes a parameter already listed by name.
    fn parse_knr_parameter_declarations(&mut self, params: NodeId) -> Result<(), FrontendError> {
        while self.at_type_name()? {
            let base = self.parse_declaration_specifiers()?;
            self.decl_types.push(base);
            loop {
                self.parse_declarator_prefix()?;
                let (name, name_loc, facade) = self.finish_declarator();
                let Some(param) = self.find_parameter(params, &name) else {
                    self.decl_types.pop();
                    return Err(FrontendError::syntax(
                        format!("a listed parameter (no parameter named '{name}')"),
                        name_loc,
                    ));
                };
                self.tree.node_mut(param).facade = Some(facade);
                if !self.match_token(TokenKind::Comma)? {
                    break;
                }
            }
            self.expect(TokenKind::Semicolon, "after parameter declaration")?;
            self.decl_types.pop();
        }
        Ok(())
    }

    fn find_parameter(&self, params: NodeId, name: &str) -> Option<NodeId> {
        let NodeKind::ParameterList { parameters } = &self.tree.node(params).kind else {
            return None;
        };
        parameters
            .iter()
            .copied()
            .find(|&p| self.tree.node(p).kind.declared_name() == Some(name))
    }
}
