//! NodeArena access methods and lexical-ancestry queries.

use super::base::NodeIndex;
use super::node::{Node, NodeArena, NodeKind, SourceFileInfo};
use exflow_common::{FileId, Span};

impl NodeArena {
    #[inline]
    pub fn get(&self, index: NodeIndex) -> Option<&Node> {
        if index.is_none() {
            None
        } else {
            self.nodes.get(index.0 as usize)
        }
    }

    #[inline]
    pub fn get_mut(&mut self, index: NodeIndex) -> Option<&mut Node> {
        if index.is_none() {
            None
        } else {
            self.nodes.get_mut(index.0 as usize)
        }
    }

    #[inline]
    pub fn kind(&self, index: NodeIndex) -> Option<&NodeKind> {
        self.get(index).map(|n| &n.kind)
    }

    #[inline]
    pub fn parent(&self, index: NodeIndex) -> NodeIndex {
        self.get(index).map_or(NodeIndex::NONE, |n| n.parent)
    }

    #[inline]
    pub fn span(&self, index: NodeIndex) -> Span {
        self.get(index).map_or(Span::default(), |n| n.span)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn file(&self, id: FileId) -> Option<&SourceFileInfo> {
        if id.is_none() {
            None
        } else {
            self.files.get(id.0 as usize)
        }
    }

    pub fn files(&self) -> &[SourceFileInfo] {
        &self.files
    }

    pub fn file_of(&self, index: NodeIndex) -> Option<&SourceFileInfo> {
        self.get(index).and_then(|n| self.file(n.file))
    }

    /// Source text covered by a node.
    pub fn text_of(&self, index: NodeIndex) -> &str {
        let Some(node) = self.get(index) else {
            return "";
        };
        let Some(file) = self.file(node.file) else {
            return "";
        };
        file.text
            .get(node.span.start as usize..node.span.end as usize)
            .unwrap_or("")
    }

    /// Iterate strict ancestors of `index`, innermost first.
    pub fn ancestors(&self, index: NodeIndex) -> Ancestors<'_> {
        Ancestors {
            arena: self,
            current: self.parent(index),
        }
    }

    /// `true` if `node` is `ancestor` or lies inside it.
    pub fn is_within(&self, node: NodeIndex, ancestor: NodeIndex) -> bool {
        if node == ancestor {
            return true;
        }
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Nearest enclosing function-like scope (method, constructor, accessor,
    /// local function, lambda), not counting `index` itself.
    pub fn enclosing_function_like(&self, index: NodeIndex) -> NodeIndex {
        self.ancestors(index)
            .find(|&a| self.kind(a).is_some_and(NodeKind::is_function_like))
            .unwrap_or(NodeIndex::NONE)
    }

    /// Nearest enclosing declaration that can carry a contract for
    /// `index`, including expression-bodied properties.
    pub fn enclosing_contract_owner(&self, index: NodeIndex) -> NodeIndex {
        for a in self.ancestors(index) {
            match self.kind(a) {
                Some(kind) if kind.is_function_like() => return a,
                Some(NodeKind::Property(p)) if !p.has_accessor_list() => return a,
                Some(NodeKind::Field(_)) => return a,
                _ => {}
            }
        }
        NodeIndex::NONE
    }

    pub fn enclosing_type(&self, index: NodeIndex) -> NodeIndex {
        self.ancestors(index)
            .find(|&a| matches!(self.kind(a), Some(NodeKind::TypeDecl(_))))
            .unwrap_or(NodeIndex::NONE)
    }

    /// Skip parentheses and null-forgiving operators.
    pub fn skip_parentheses(&self, mut index: NodeIndex) -> NodeIndex {
        loop {
            match self.kind(index) {
                Some(NodeKind::Parenthesized(inner)) => index = *inner,
                Some(NodeKind::Unary(u)) if u.op == super::node::UnaryOp::SuppressNull => {
                    index = u.operand;
                }
                _ => return index,
            }
        }
    }

    /// Name of a simple identifier expression.
    pub fn identifier_name(&self, index: NodeIndex) -> Option<&str> {
        match self.kind(index)? {
            NodeKind::Identifier(id) => Some(id.name.as_str()),
            _ => None,
        }
    }

    /// Declared name of a type, member or local function.
    pub fn declaration_name(&self, index: NodeIndex) -> Option<&str> {
        match self.kind(index)? {
            NodeKind::TypeDecl(d) => Some(&d.name),
            NodeKind::Method(d) | NodeKind::Constructor(d) | NodeKind::LocalFunction(d) => {
                Some(&d.name)
            }
            NodeKind::Property(d) => Some(&d.name),
            NodeKind::Accessor(d) => Some(d.kind.keyword()),
            NodeKind::VariableDeclarator(d) => Some(&d.name),
            NodeKind::Parameter(d) => Some(&d.name),
            NodeKind::Namespace(d) => Some(&d.name),
            _ => None,
        }
    }

    /// Attribute list of a declaration, if it has one.
    pub fn attributes_of(&self, index: NodeIndex) -> &[NodeIndex] {
        match self.kind(index) {
            Some(NodeKind::TypeDecl(d)) => &d.attributes,
            Some(NodeKind::Method(d) | NodeKind::Constructor(d) | NodeKind::LocalFunction(d)) => {
                &d.attributes
            }
            Some(NodeKind::Property(d)) => &d.attributes,
            Some(NodeKind::Accessor(d)) => &d.attributes,
            Some(NodeKind::Field(d)) => &d.attributes,
            Some(NodeKind::Lambda(d)) => &d.attributes,
            Some(NodeKind::Parameter(d)) => &d.attributes,
            _ => &[],
        }
    }

    /// Body of a function-like node (block or expression).
    pub fn function_body(&self, index: NodeIndex) -> NodeIndex {
        match self.kind(index) {
            Some(NodeKind::Method(d) | NodeKind::Constructor(d) | NodeKind::LocalFunction(d)) => {
                d.body
            }
            Some(NodeKind::Accessor(d)) => d.body,
            Some(NodeKind::Lambda(d)) => d.body,
            Some(NodeKind::Property(d)) => d.expression_body,
            _ => NodeIndex::NONE,
        }
    }

    /// Parameters of a function-like node.
    pub fn function_params(&self, index: NodeIndex) -> &[NodeIndex] {
        match self.kind(index) {
            Some(NodeKind::Method(d) | NodeKind::Constructor(d) | NodeKind::LocalFunction(d)) => {
                &d.params
            }
            Some(NodeKind::Lambda(d)) => &d.params,
            Some(NodeKind::Property(d)) => &d.params,
            _ => &[],
        }
    }

    /// Doc comment text attached to a declaration.
    pub fn doc_comment(&self, index: NodeIndex) -> Option<&str> {
        match self.kind(index)? {
            NodeKind::TypeDecl(d) => d.doc.as_deref(),
            NodeKind::Method(d) | NodeKind::Constructor(d) | NodeKind::LocalFunction(d) => {
                d.doc.as_deref()
            }
            NodeKind::Property(d) => d.doc.as_deref(),
            _ => None,
        }
    }
}

pub struct Ancestors<'a> {
    arena: &'a NodeArena,
    current: NodeIndex,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<NodeIndex> {
        let current = self.current.some()?;
        self.current = self.arena.parent(current);
        Some(current)
    }
}
