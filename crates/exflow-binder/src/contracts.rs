//! Declared exception contracts (`[Throws(typeof(A), typeof(B))]`).

use crate::types::TypeId;
use exflow_parser::NodeIndex;
use exflow_parser::parser::node::AttributeData;
use smallvec::SmallVec;

/// One `typeof(...)` argument of a contract attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractEntry {
    pub ty: TypeId,
    pub attribute: NodeIndex,
    /// The `typeof` expression; its span locates per-entry diagnostics.
    pub argument: NodeIndex,
}

/// The ordered contract of one declaration. Built once by the binder; the
/// owner is a function-like node or a property declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeclaredContract {
    pub owner: NodeIndex,
    pub entries: SmallVec<[ContractEntry; 2]>,
}

impl DeclaredContract {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declared types in declaration order, duplicates included.
    pub fn types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.entries.iter().map(|e| e.ty)
    }

    pub fn contains(&self, ty: TypeId) -> bool {
        self.entries.iter().any(|e| e.ty == ty)
    }
}

pub fn is_throws_attribute(attribute: &AttributeData) -> bool {
    attribute.short_name() == "Throws"
}

pub fn is_does_not_return_attribute(attribute: &AttributeData) -> bool {
    attribute.short_name() == "DoesNotReturn"
}
