//! NodeArena creation methods.

use super::base::NodeIndex;
use super::node::{Node, NodeArena, NodeKind, SourceFileInfo};
use exflow_common::{FileId, LineMap, Span};
use std::sync::Arc;

impl NodeArena {
    /// Maximum pre-allocation to avoid capacity overflow in huge inputs.
    const MAX_NODE_PREALLOC: usize = 5_000_000;

    pub fn new() -> NodeArena {
        NodeArena::default()
    }

    pub fn with_capacity(capacity: usize) -> NodeArena {
        NodeArena {
            nodes: Vec::with_capacity(capacity.min(Self::MAX_NODE_PREALLOC)),
            files: Vec::new(),
        }
    }

    /// Register a file and return its id. The root is filled in once parsed.
    pub fn add_file(
        &mut self,
        file_name: impl Into<String>,
        text: Arc<str>,
        is_library: bool,
    ) -> FileId {
        let id = FileId(self.files.len() as u32);
        let line_map = LineMap::build(&text);
        self.files.push(SourceFileInfo {
            id,
            file_name: file_name.into(),
            text,
            root: NodeIndex::NONE,
            nullable_enabled: false,
            is_library,
            line_map,
        });
        id
    }

    pub(crate) fn finish_file(&mut self, file: FileId, root: NodeIndex, nullable_enabled: bool) {
        if let Some(info) = self.files.get_mut(file.0 as usize) {
            info.root = root;
            info.nullable_enabled = nullable_enabled;
        }
        self.link_parents(root);
    }

    pub fn add_node(&mut self, kind: NodeKind, span: Span, file: FileId) -> NodeIndex {
        let index = NodeIndex(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            span,
            file,
            parent: NodeIndex::NONE,
        });
        index
    }

    /// Replace the payload of an existing node (used when a node's children
    /// are only known after the node itself was allocated).
    pub(crate) fn set_kind(&mut self, index: NodeIndex, kind: NodeKind) {
        if let Some(node) = self.get_mut(index) {
            node.kind = kind;
        }
    }

    pub(crate) fn set_span(&mut self, index: NodeIndex, span: Span) {
        if let Some(node) = self.get_mut(index) {
            node.span = span;
        }
    }

    /// Fill in parent links for the subtree rooted at `root`.
    fn link_parents(&mut self, root: NodeIndex) {
        let mut stack = vec![root];
        while let Some(parent) = stack.pop() {
            let children = match self.get(parent) {
                Some(node) => node.kind.children(),
                None => continue,
            };
            for child in children {
                if let Some(node) = self.get_mut(child) {
                    node.parent = parent;
                }
                stack.push(child);
            }
        }
    }
}
