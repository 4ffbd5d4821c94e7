//! Arena-backed syntax tree
//!
//! All nodes live in a single arena owned by [`SyntaxTree`] and are
//! addressed by stable [`NodeId`] indices.  Forward (parent→child) edges —
//! the ids stored in [`NodeKind`] fields — are the only owning edges;
//! the per-node parent back-reference is strictly observational.  Nodes are
//! never destroyed individually: fragments abandoned by parser backtracking
//! simply stay unreachable until the whole tree is dropped.
//!
//! # Mutation protocol
//!
//! After construction the tree changes only through
//! [`SyntaxTree::replace_child`]: replace the child at position K of a node
//! with another node.  The primitive bumps the node's alteration counter,
//! stashes its previous shape (so the tree can still be displayed as
//! originally parsed), detaches the old child, and re-establishes parent
//! back-references on the new child and its descendants.

use crate::ast::node::{Node, NodeId, NodeKind, SourceLocation};
use crate::ast::types::TypeFacade;

#[derive(Debug, Default)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
}

impl SyntaxTree {
    /// Id of the translation-unit root.  The root is allocated first, so
    /// its id — and the global scope id derived from it — is always 0.
    pub const ROOT: NodeId = 0;

    /// Create a tree holding an empty translation unit.
    pub fn new() -> Self {
        let mut tree = SyntaxTree { nodes: Vec::new() };
        tree.alloc(
            NodeKind::TranslationUnit { items: Vec::new() },
            SourceLocation::new(1, 1),
        );
        tree
    }

    /// Allocate a node and adopt its children: every child id already held
    /// in `kind` gets its parent back-reference set to the new node.
    pub fn alloc(&mut self, kind: NodeKind, location: SourceLocation) -> NodeId {
        let id = self.nodes.len();
        let children = kind.children();
        self.nodes.push(Node::new(kind, location));
        for child in children {
            self.nodes[child].parent = Some(id);
        }
        id
    }

    /// [`SyntaxTree::alloc`] with a type facade attached.
    pub fn alloc_typed(
        &mut self,
        kind: NodeKind,
        location: SourceLocation,
        facade: TypeFacade,
    ) -> NodeId {
        let id = self.alloc(kind, location);
        self.nodes[id].facade = Some(facade);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    /// Number of arena slots, including nodes made unreachable by
    /// backtracking or mutation.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Install the top-level items of the translation unit.
    pub fn set_root_items(&mut self, items: Vec<NodeId>) {
        for &item in &items {
            self.nodes[item].parent = Some(Self::ROOT);
        }
        match &mut self.nodes[Self::ROOT].kind {
            NodeKind::TranslationUnit {
                items: ref mut slot,
            } => *slot = items,
            _ => unreachable!("root is always a translation unit"),
        }
    }

    /// Position of `child` among `parent`'s children, if it is one.
    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes[parent]
            .kind
            .children()
            .iter()
            .position(|&c| c == child)
    }

    /// The single structural mutation primitive: replace the child at
    /// position `index` of `parent` with `new_child`.
    ///
    /// Panics if `index` is out of range — callers compute the index from
    /// the same tree, so a miss is a programming fault, not an input error.
    pub fn replace_child(&mut self, parent: NodeId, index: usize, new_child: NodeId) {
        let prior_kind = self.nodes[parent].kind.clone();

        let old_child = {
            let mut slots = self.nodes[parent].kind.child_slots();
            let slot = &mut slots[index];
            let old = **slot;
            **slot = new_child;
            old
        };

        let node = &mut self.nodes[parent];
        node.prior.push(prior_kind);
        node.alterations += 1;

        // The old child may already have been adopted elsewhere (e.g. when a
        // conversion wrapper claimed it before the swap); only detach it if
        // it still points here.
        if self.nodes[old_child].parent == Some(parent) {
            self.nodes[old_child].parent = None;
        }
        self.nodes[new_child].parent = Some(parent);
        self.reparent_descendants(new_child);
    }

    /// Re-establish parent back-references throughout a subtree.
    fn reparent_descendants(&mut self, root: NodeId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            for child in self.nodes[id].kind.children() {
                self.nodes[child].parent = Some(id);
                stack.push(child);
            }
        }
    }

    /// Preorder walk over owning edges starting at `from`.
    pub fn descendants(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            let children = self.nodes[id].kind.children();
            for &child in children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Ids of every node reachable from the root that satisfies the
    /// predicate, in preorder.  The resolver passes are all built on this.
    pub fn find_matching(&self, predicate: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        self.descendants(Self::ROOT)
            .into_iter()
            .filter(|&id| predicate(&self.nodes[id]))
            .collect()
    }

    /// Nearest enclosing function declaration, following parent
    /// back-references.  `None` means the node sits at file scope.
    pub fn enclosing_function(&self, id: NodeId) -> Option<NodeId> {
        let mut cursor = self.nodes[id].parent;
        while let Some(current) = cursor {
            if matches!(self.nodes[current].kind, NodeKind::FunctionDecl { .. }) {
                return Some(current);
            }
            cursor = self.nodes[current].parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::node::BinOp;

    fn loc() -> SourceLocation {
        SourceLocation::new(1, 1)
    }

    #[test]
    fn alloc_adopts_children() {
        let mut tree = SyntaxTree::new();
        let one = tree.alloc(NodeKind::IntLiteral(1), loc());
        let two = tree.alloc(NodeKind::IntLiteral(2), loc());
        let sum = tree.alloc(
            NodeKind::Binary {
                op: BinOp::Add,
                left: one,
                right: two,
            },
            loc(),
        );

        assert_eq!(tree.node(one).parent, Some(sum));
        assert_eq!(tree.node(two).parent, Some(sum));
        assert_eq!(tree.node(sum).parent, None);
    }

    #[test]
    fn replace_child_records_prior_shape() {
        let mut tree = SyntaxTree::new();
        let one = tree.alloc(NodeKind::IntLiteral(1), loc());
        let two = tree.alloc(NodeKind::IntLiteral(2), loc());
        let sum = tree.alloc(
            NodeKind::Binary {
                op: BinOp::Add,
                left: one,
                right: two,
            },
            loc(),
        );

        let three = tree.alloc(NodeKind::IntLiteral(3), loc());
        tree.replace_child(sum, 1, three);

        assert_eq!(tree.node(sum).alterations, 1);
        assert_eq!(tree.node(two).parent, None);
        assert_eq!(tree.node(three).parent, Some(sum));
        match tree.node(sum).original_kind() {
            NodeKind::Binary { right, .. } => assert_eq!(*right, two),
            other => panic!("unexpected prior shape: {other:?}"),
        }
        match &tree.node(sum).kind {
            NodeKind::Binary { right, .. } => assert_eq!(*right, three),
            other => panic!("unexpected current shape: {other:?}"),
        }
    }

    #[test]
    fn alteration_counter_strictly_increases() {
        let mut tree = SyntaxTree::new();
        let one = tree.alloc(NodeKind::IntLiteral(1), loc());
        let paren = tree.alloc(NodeKind::Paren { inner: one }, loc());

        let mut last = tree.node(paren).alterations;
        for value in 2..5 {
            let lit = tree.alloc(NodeKind::IntLiteral(value), loc());
            tree.replace_child(paren, 0, lit);
            let now = tree.node(paren).alterations;
            assert!(now > last);
            last = now;
        }
    }

    #[test]
    fn descendants_visit_each_node_once() {
        let mut tree = SyntaxTree::new();
        let one = tree.alloc(NodeKind::IntLiteral(1), loc());
        let two = tree.alloc(NodeKind::IntLiteral(2), loc());
        let sum = tree.alloc(
            NodeKind::Binary {
                op: BinOp::Add,
                left: one,
                right: two,
            },
            loc(),
        );
        tree.set_root_items(vec![sum]);

        let visited = tree.descendants(SyntaxTree::ROOT);
        assert_eq!(visited.len(), 4);
        let mut unique = visited.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), visited.len());
    }
}
