use codemap::Span;

use crate::style::Style;

pub(crate) type NodeId = usize;

/// A node in the compiled CSS tree. Generalizes the teacher's `Css` (a
/// `Vec<Toplevel>` of owned, self-contained blocks) into an arena of
/// nodes addressed by `NodeId` rather than nested owned `Vec`s or parent
/// back-pointers (REDESIGN FLAG, spec.md §9 "prefer arena-allocated
/// nodes with integer indices") — this is what lets the evaluator bubble
/// a nested style rule up to the stylesheet root without cloning/
/// restructuring the whole subtree it's attached under.
#[derive(Debug, Clone)]
pub(crate) struct CssNode {
    pub kind: CssNodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub(crate) enum CssNodeKind {
    Root,
    Style {
        selector: String,
        declarations: Vec<Style>,
    },
    Media {
        query: String,
    },
    Supports {
        query: String,
    },
    AtRoot,
    Unknown {
        name: String,
        params: String,
        declarations: Vec<Style>,
    },
    Comment(String),
    Import(String),
    Charset,
}

impl CssNodeKind {
    /// A node that never carries declarations or children of its own
    /// kind is still a valid container for nested rules (`@media` etc.);
    /// `Comment`/`Import`/`Charset` are the true leaves.
    pub fn is_leaf(&self) -> bool {
        matches!(self, CssNodeKind::Comment(_) | CssNodeKind::Import(_) | CssNodeKind::Charset)
    }
}

/// Arena owning every node produced by a single compilation. Index 0 is
/// always the root. Nodes are appended, never removed — at-root
/// exclusion and media-merge splicing both work by creating new nodes
/// under a different parent rather than mutating existing ones in place,
/// matching the teacher's "build once, print once" pipeline shape.
#[derive(Debug, Clone)]
pub(crate) struct CssTree {
    nodes: Vec<CssNode>,
}

impl CssTree {
    pub fn new(root_span: Span) -> Self {
        CssTree {
            nodes: vec![CssNode {
                kind: CssNodeKind::Root,
                parent: None,
                children: Vec::new(),
                span: root_span,
            }],
        }
    }

    pub const ROOT: NodeId = 0;

    pub fn node(&self, id: NodeId) -> &CssNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut CssNode {
        &mut self.nodes[id]
    }

    /// Append a new child of `parent`, returning its id.
    pub fn push_child(&mut self, parent: NodeId, kind: CssNodeKind, span: Span) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(CssNode {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            span,
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// Move `node` to become a child of `new_parent` instead of its
    /// current parent — used by style-rule bubbling (§4.H: a style rule
    /// nested inside `@media`/`@supports` stays nested, but one nested
    /// inside another style rule's *declaration* context bubbles to
    /// toplevel next to its enclosing rule).
    pub fn reparent(&mut self, node: NodeId, new_parent: NodeId) {
        if let Some(old_parent) = self.nodes[node].parent {
            self.nodes[old_parent].children.retain(|&c| c != node);
        }
        self.nodes[node].parent = Some(new_parent);
        self.nodes[new_parent].children.push(node);
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// True once every style-rule descendant has at least one emittable
    /// declaration or a non-empty child, i.e. this node would actually
    /// produce output (§4.J "empty rules are omitted").
    pub fn has_visible_output(&self, id: NodeId) -> bool {
        match &self.nodes[id].kind {
            CssNodeKind::Style { declarations, .. } | CssNodeKind::Unknown { declarations, .. } => {
                declarations.iter().any(Style::is_emittable)
                    || self.nodes[id].children.iter().any(|&c| self.has_visible_output(c))
            }
            CssNodeKind::Comment(_) | CssNodeKind::Import(_) | CssNodeKind::Charset => true,
            _ => self.nodes[id].children.iter().any(|&c| self.has_visible_output(c)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        let mut map = codemap::CodeMap::new();
        map.add_file("t".into(), "x".into()).span
    }

    #[test]
    fn reparent_moves_node_between_parents() {
        let mut tree = CssTree::new(span());
        let media = tree.push_child(CssTree::ROOT, CssNodeKind::Media { query: "screen".into() }, span());
        let style = tree.push_child(
            media,
            CssNodeKind::Style {
                selector: ".a".into(),
                declarations: vec![Style::new("color", "red")],
            },
            span(),
        );
        assert_eq!(tree.children(media), &[style]);
        tree.reparent(style, CssTree::ROOT);
        assert!(tree.children(media).is_empty());
        assert_eq!(tree.children(CssTree::ROOT), &[media, style]);
    }

    #[test]
    fn empty_style_rule_has_no_visible_output() {
        let mut tree = CssTree::new(span());
        let style = tree.push_child(
            CssTree::ROOT,
            CssNodeKind::Style {
                selector: ".a".into(),
                declarations: vec![Style::new("color", "")],
            },
            span(),
        );
        assert!(!tree.has_visible_output(style));
    }
}
