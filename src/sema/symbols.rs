//! Symbol table
//!
//! Maps a scope id to the names declared in it.  Scope id 0 is the global
//! (file) scope — literally the translation-unit root's arena id — and
//! every other scope id is the arena id of a function declaration.  The
//! table is populated by the collection pass and only consulted afterwards,
//! except for recording which declarations have been referenced.

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{NodeId, SyntaxTree};

/// Scope identifier: the translation-unit root for file scope, otherwise a
/// function declaration's id.
pub type ScopeId = NodeId;

/// The file (global) scope id.
pub const GLOBAL_SCOPE: ScopeId = SyntaxTree::ROOT;

#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: FxHashMap<ScopeId, IndexMap<String, NodeId>>,
    /// Prototype-only function declarations, in collection order.
    prototypes: Vec<NodeId>,
    /// Declarations with at least one reference.
    used: FxHashSet<NodeId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// The declaration already recorded under `name` in `scope`, if any.
    pub fn entry(&self, scope: ScopeId, name: &str) -> Option<NodeId> {
        self.scopes.get(&scope)?.get(name).copied()
    }

    /// Record `name` → `decl` in `scope`, replacing any previous entry.
    pub fn insert(&mut self, scope: ScopeId, name: &str, decl: NodeId) {
        self.scopes
            .entry(scope)
            .or_default()
            .insert(name.to_string(), decl);
    }

    /// Look `name` up in `scope` alone; callers fall back to the global
    /// scope themselves.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<NodeId> {
        self.entry(scope, name)
    }

    pub fn add_prototype(&mut self, decl: NodeId) {
        self.prototypes.push(decl);
    }

    pub fn prototypes(&self) -> &[NodeId] {
        &self.prototypes
    }

    /// Record that `decl` has at least one reference.
    pub fn mark_used(&mut self, decl: NodeId) {
        self.used.insert(decl);
    }

    pub fn is_used(&self, decl: NodeId) -> bool {
        self.used.contains(&decl)
    }

    /// All (scope, name, declaration) entries, scopes in ascending id order
    /// and names in declaration order, so reports are deterministic.
    pub fn entries(&self) -> Vec<(ScopeId, &str, NodeId)> {
        let mut scope_ids: Vec<ScopeId> = self.scopes.keys().copied().collect();
        scope_ids.sort_unstable();
        let mut out = Vec::new();
        for scope in scope_ids {
            for (name, &decl) in &self.scopes[&scope] {
                out.push((scope, name.as_str(), decl));
            }
        }
        out
    }
}
