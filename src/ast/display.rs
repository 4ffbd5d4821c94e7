//! Tree rendering
//!
//! Two modes: the current shape, and the shape as originally parsed.  The
//! original shape is reconstructed from each node's stashed prior shapes,
//! so the renderer doubles as the proof that in-place mutation is
//! non-destructive to provenance.

use std::fmt::Write as _;

use crate::ast::node::{NodeId, NodeKind};
use crate::ast::tree::SyntaxTree;

/// Which shape of the tree to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// The tree as it stands, mutations included.
    Current,
    /// The tree as the parser built it, before any resolver pass.
    AsParsed,
}

impl SyntaxTree {
    /// Render the whole tree as an indented outline.
    pub fn render(&self, mode: RenderMode) -> String {
        let mut out = String::new();
        self.render_node(Self::ROOT, mode, 0, &mut out);
        out
    }

    fn render_node(&self, id: NodeId, mode: RenderMode, depth: usize, out: &mut String) {
        let node = self.node(id);
        let kind = match mode {
            RenderMode::Current => &node.kind,
            RenderMode::AsParsed => node.original_kind(),
        };

        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(&self.describe_kind(kind));
        if let Some(facade) = &node.facade {
            let _ = write!(out, " : {}", facade.describe(self));
        }
        out.push('\n');

        for child in kind.children() {
            self.render_node(child, mode, depth + 1, out);
        }
    }

    fn describe_kind(&self, kind: &NodeKind) -> String {
        match kind {
            NodeKind::Binary { op, .. } => format!("Binary({op:?})"),
            NodeKind::Unary { op, .. } => format!("Unary({op:?})"),
            NodeKind::Conditional { .. } => "Conditional".to_string(),
            NodeKind::CompoundAssign { op, .. } => format!("CompoundAssign({op:?})"),
            NodeKind::IntLiteral(value) => format!("IntLiteral({value})"),
            NodeKind::FloatLiteral(value) => format!("FloatLiteral({value})"),
            NodeKind::CharLiteral(value) => format!("CharLiteral({value})"),
            NodeKind::StringLiteral(value) => format!("StringLiteral({value:?})"),
            NodeKind::VarDecl { name, .. } => format!("VarDecl({name})"),
            NodeKind::ParamDecl { name } => format!("ParamDecl({name})"),
            NodeKind::VariadicMarker => "VariadicMarker".to_string(),
            NodeKind::TypeAliasDecl { name } => format!("TypeAliasDecl({name})"),
            NodeKind::FieldDecl { name } => format!("FieldDecl({name})"),
            NodeKind::RecordDecl { name, .. } => format!("RecordDecl({name})"),
            NodeKind::EnumConstantDecl { name, .. } => format!("EnumConstantDecl({name})"),
            NodeKind::EnumDecl { name, .. } => format!("EnumDecl({name})"),
            NodeKind::FunctionDecl { name, body, .. } => {
                if body.is_some() {
                    format!("FunctionDecl({name})")
                } else {
                    format!("FunctionDecl({name}, prototype)")
                }
            }
            NodeKind::TranslationUnit { .. } => "TranslationUnit".to_string(),
            NodeKind::Identifier { name, resolved } => {
                if resolved.is_some() {
                    format!("Identifier({name}, resolved)")
                } else {
                    format!("Identifier({name})")
                }
            }
            NodeKind::Call { .. } => "Call".to_string(),
            NodeKind::BuiltinCall { name, .. } => format!("BuiltinCall({name})"),
            NodeKind::Cast { .. } => "Cast".to_string(),
            NodeKind::Conversion { .. } => "Conversion".to_string(),
            NodeKind::Paren { .. } => "Paren".to_string(),
            NodeKind::InitializerList { .. } => "InitializerList".to_string(),
            NodeKind::CompoundLiteral { .. } => "CompoundLiteral".to_string(),
            NodeKind::Subscript { .. } => "Subscript".to_string(),
            NodeKind::Member {
                member,
                through_pointer,
                ..
            } => {
                if *through_pointer {
                    format!("Member(->{member})")
                } else {
                    format!("Member(.{member})")
                }
            }
            NodeKind::Continue => "Continue".to_string(),
            NodeKind::Break => "Break".to_string(),
            NodeKind::Return { .. } => "Return".to_string(),
            NodeKind::If { .. } => "If".to_string(),
            NodeKind::Switch { .. } => "Switch".to_string(),
            NodeKind::While { .. } => "While".to_string(),
            NodeKind::DoWhile { .. } => "DoWhile".to_string(),
            NodeKind::For { .. } => "For".to_string(),
            NodeKind::Case { .. } => "Case".to_string(),
            NodeKind::DefaultCase { .. } => "DefaultCase".to_string(),
            NodeKind::DeclStatement { .. } => "DeclStatement".to_string(),
            NodeKind::ArgumentList { .. } => "ArgumentList".to_string(),
            NodeKind::ParameterList { .. } => "ParameterList".to_string(),
            NodeKind::Label { name } => format!("Label({name})"),
            NodeKind::Goto { label } => format!("Goto({label})"),
            NodeKind::Block { .. } => "Block".to_string(),
        }
    }
}
