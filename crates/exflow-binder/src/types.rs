//! Type table: nominal type definitions and constructed type references.

use crate::members::MemberId;
use exflow_common::FileId;
use exflow_parser::NodeIndex;
use exflow_parser::parser::node::TypeDeclKind;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Index of a type definition in the [`TypeTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// A (possibly constructed) type as seen by expression typing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Named(TypeId, Vec<Ty>),
    Array(Box<Ty>),
    /// Generic type parameter, by name.
    Param(String),
    /// The `null` literal.
    Null,
    Unknown,
}

impl Ty {
    pub fn named(def: TypeId) -> Ty {
        Ty::Named(def, Vec::new())
    }

    /// The type definition, for named types.
    pub fn def(&self) -> Option<TypeId> {
        match self {
            Ty::Named(def, _) => Some(*def),
            _ => None,
        }
    }

    pub fn args(&self) -> &[Ty] {
        match self {
            Ty::Named(_, args) => args,
            _ => &[],
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Ty::Unknown)
    }

    /// Replace type parameters bound in `map`.
    pub fn substitute(&self, map: &FxHashMap<String, Ty>) -> Ty {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            Ty::Param(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            Ty::Named(def, args) => {
                Ty::Named(*def, args.iter().map(|a| a.substitute(map)).collect())
            }
            Ty::Array(elem) => Ty::Array(Box::new(elem.substitute(map))),
            Ty::Null | Ty::Unknown => self.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TypeInfo {
    pub name: String,
    pub namespace: String,
    /// Namespace, enclosing types and name, dot separated.
    pub full_name: String,
    pub kind: TypeDeclKind,
    pub type_params: Vec<String>,
    /// Base class; `None` for `System.Object` and interfaces.
    pub base: Option<Ty>,
    pub interfaces: Vec<Ty>,
    pub members: Vec<MemberId>,
    pub decl: NodeIndex,
    pub file: FileId,
    pub is_static: bool,
    pub is_sealed: bool,
    pub outer: Option<TypeId>,
}

impl TypeInfo {
    pub fn is_interface(&self) -> bool {
        self.kind == TypeDeclKind::Interface
    }

    pub fn is_value_type(&self) -> bool {
        self.kind == TypeDeclKind::Struct
    }

    /// Binding of this definition's type parameters to `args`.
    pub fn substitution(&self, args: &[Ty]) -> FxHashMap<String, Ty> {
        self.type_params
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect()
    }
}

/// All type definitions known to an analysis, with name indexes.
#[derive(Clone, Debug, Default)]
pub struct TypeTable {
    types: Vec<TypeInfo>,
    by_full_name: FxHashMap<(String, usize), TypeId>,
    by_simple_name: FxHashMap<String, SmallVec<[TypeId; 2]>>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. A later definition with the same full name and
    /// arity shadows the earlier one in the full-name index.
    pub fn insert(&mut self, info: TypeInfo) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        let arity = info.type_params.len();
        self.by_full_name
            .insert((info.full_name.clone(), arity), id);
        self.by_simple_name
            .entry(info.name.clone())
            .or_default()
            .push(id);
        self.types.push(info);
        id
    }

    #[inline]
    pub fn get(&self, id: TypeId) -> Option<&TypeInfo> {
        self.types.get(id.0 as usize)
    }

    pub(crate) fn get_mut(&mut self, id: TypeId) -> Option<&mut TypeInfo> {
        self.types.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeInfo)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, t)| (TypeId(i as u32), t))
    }

    pub fn lookup_full(&self, full_name: &str, arity: usize) -> Option<TypeId> {
        self.by_full_name
            .get(&(full_name.to_string(), arity))
            .copied()
    }

    /// Definitions with the given simple name, in declaration order.
    pub fn lookup_simple(&self, name: &str) -> &[TypeId] {
        self.by_simple_name.get(name).map_or(&[], |v| v.as_slice())
    }
}
