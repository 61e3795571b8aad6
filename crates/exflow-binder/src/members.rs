//! Member table: methods, constructors, properties, accessors, fields and
//! the anonymous callables (lambdas, local functions) that own contracts.

use crate::types::{Ty, TypeId};
use exflow_common::FileId;
use exflow_parser::NodeIndex;
use exflow_parser::parser::node::AccessorKind;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Method,
    Constructor,
    Property,
    Indexer,
    Event,
    Field,
    Accessor(AccessorKind),
    LocalFunction,
    Lambda,
}

impl MemberKind {
    /// Members that are invoked with an argument list.
    pub const fn is_invocable(self) -> bool {
        matches!(
            self,
            MemberKind::Method
                | MemberKind::Constructor
                | MemberKind::LocalFunction
                | MemberKind::Lambda
        )
    }

    pub const fn is_property_like(self) -> bool {
        matches!(
            self,
            MemberKind::Property | MemberKind::Indexer | MemberKind::Event
        )
    }
}

#[derive(Clone, Debug)]
pub struct ParamInfo {
    pub name: String,
    /// `Unknown` for implicitly typed lambda parameters.
    pub ty: Ty,
    /// Written with a `?` annotation.
    pub annotated_nullable: bool,
    pub has_default: bool,
    pub is_params: bool,
    pub node: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct MemberInfo {
    pub name: String,
    pub kind: MemberKind,
    pub owner: TypeId,
    pub decl: NodeIndex,
    pub file: FileId,
    pub type_params: Vec<String>,
    pub params: Vec<ParamInfo>,
    /// Return type, property type or field type.
    pub ty: Ty,
    pub is_static: bool,
    pub is_extension: bool,
    /// Annotated `[DoesNotReturn]`.
    pub does_not_return: bool,
    /// Declared in a file with `#nullable enable`.
    pub nullable_context: bool,
    /// For accessors, the owning property, indexer or event.
    pub property: Option<MemberId>,
    /// For properties, indexers and events, the declared accessors.
    pub accessors: SmallVec<[MemberId; 2]>,
    /// Base member this one overrides.
    pub overrides: Option<MemberId>,
    /// Interface members this one implements.
    pub implements: SmallVec<[MemberId; 1]>,
}

impl MemberInfo {
    pub fn accessor_kind(&self) -> Option<AccessorKind> {
        match self.kind {
            MemberKind::Accessor(kind) => Some(kind),
            _ => None,
        }
    }

    /// Minimum and maximum number of arguments a call may pass.
    pub fn arity_range(&self) -> (usize, Option<usize>) {
        let required = self
            .params
            .iter()
            .filter(|p| !p.has_default && !p.is_params)
            .count();
        let max = if self.params.iter().any(|p| p.is_params) {
            None
        } else {
            Some(self.params.len())
        };
        (required, max)
    }

    pub fn accepts_arity(&self, count: usize) -> bool {
        let (min, max) = self.arity_range();
        count >= min && max.is_none_or(|m| count <= m)
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemberTable {
    members: Vec<MemberInfo>,
}

impl MemberTable {
    pub fn insert(&mut self, info: MemberInfo) -> MemberId {
        let id = MemberId(self.members.len() as u32);
        self.members.push(info);
        id
    }

    #[inline]
    pub fn get(&self, id: MemberId) -> Option<&MemberInfo> {
        self.members.get(id.0 as usize)
    }

    pub(crate) fn get_mut(&mut self, id: MemberId) -> Option<&mut MemberInfo> {
        self.members.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MemberId, &MemberInfo)> {
        self.members
            .iter()
            .enumerate()
            .map(|(i, m)| (MemberId(i as u32), m))
    }

    /// The accessor of `kind` declared by a property-like member.
    pub fn accessor_of(&self, property: MemberId, kind: AccessorKind) -> Option<MemberId> {
        let info = self.get(property)?;
        info.accessors
            .iter()
            .copied()
            .find(|&a| self.get(a).and_then(MemberInfo::accessor_kind) == Some(kind))
    }
}
