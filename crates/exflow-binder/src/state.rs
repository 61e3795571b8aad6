//! Binder state: the bound program every semantic query runs against.
//!
//! A [`ProgramBuilder`] collects source files (user code and referenced
//! library modules) into one arena that starts with the embedded prelude.
//! [`ProgramBuilder::bind`] then runs the declaration passes once; after that
//! the state is immutable apart from the memo caches, so it can be shared
//! across analysis threads.

use crate::contracts::DeclaredContract;
use crate::members::{MemberId, MemberTable};
use crate::prelude::prelude_arena;
use crate::state_resolution::ResolvedCall;
use crate::types::{Ty, TypeId, TypeTable};
use crate::well_known::WellKnownType;
use dashmap::DashMap;
use exflow_common::FileId;
use exflow_parser::{NodeArena, NodeIndex, ParseDiagnostic, parse_source_file};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info_span};

/// Collects the files of one analysis.
pub struct ProgramBuilder {
    arena: NodeArena,
    diagnostics: Vec<ParseDiagnostic>,
    module_paths: FxHashMap<FileId, PathBuf>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        ProgramBuilder {
            arena: prelude_arena(),
            diagnostics: Vec::new(),
            module_paths: FxHashMap::default(),
        }
    }

    /// Add a file to analyse.
    pub fn add_source(&mut self, file_name: &str, text: impl Into<Arc<str>>) -> FileId {
        let result = parse_source_file(&mut self.arena, file_name, text, false);
        self.diagnostics.extend(result.diagnostics);
        result.file
    }

    /// Add a referenced module: its declarations are visible to the analysed
    /// files but its bodies are not analysed. Members without an inline doc
    /// comment fall back to the module's sibling `.xml` documentation file.
    pub fn add_reference(&mut self, path: &Path, text: impl Into<Arc<str>>) -> FileId {
        let file_name = path.to_string_lossy();
        let result = parse_source_file(&mut self.arena, &file_name, text, true);
        self.diagnostics.extend(result.diagnostics);
        self.module_paths.insert(result.file, path.to_path_buf());
        result.file
    }

    pub fn bind(self) -> BinderState {
        let _span = info_span!("bind", files = self.arena.files().len()).entered();
        let mut state = BinderState {
            arena: self.arena,
            types: TypeTable::new(),
            members: MemberTable::default(),
            contracts: FxHashMap::default(),
            member_by_node: FxHashMap::default(),
            type_by_node: FxHashMap::default(),
            extension_methods: FxHashMap::default(),
            well_known: FxHashMap::default(),
            parse_diagnostics: self.diagnostics,
            module_paths: self.module_paths,
            type_cache: DashMap::new(),
            call_cache: DashMap::new(),
        };
        state.declare_types();
        state.resolve_bases();
        state.declare_members();
        state.declare_anonymous_callables();
        state.collect_contracts();
        state.link_base_members();
        debug!(
            types = state.types.len(),
            members = state.members.len(),
            contracts = state.contracts.len(),
            "bound program"
        );
        state
    }
}

pub struct BinderState {
    pub(crate) arena: NodeArena,
    pub(crate) types: TypeTable,
    pub(crate) members: MemberTable,
    /// Contracts keyed by the declaring node (function-like or property).
    pub(crate) contracts: FxHashMap<NodeIndex, DeclaredContract>,
    pub(crate) member_by_node: FxHashMap<NodeIndex, MemberId>,
    pub(crate) type_by_node: FxHashMap<NodeIndex, TypeId>,
    pub(crate) extension_methods: FxHashMap<String, SmallVec<[MemberId; 4]>>,
    pub(crate) well_known: FxHashMap<WellKnownType, TypeId>,
    pub(crate) parse_diagnostics: Vec<ParseDiagnostic>,
    pub(crate) module_paths: FxHashMap<FileId, PathBuf>,
    pub(crate) type_cache: DashMap<NodeIndex, Ty>,
    pub(crate) call_cache: DashMap<NodeIndex, Option<ResolvedCall>>,
}

impl BinderState {
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn members(&self) -> &MemberTable {
        &self.members
    }

    /// Parse errors of the analysed and referenced files.
    pub fn parse_diagnostics(&self) -> &[ParseDiagnostic] {
        &self.parse_diagnostics
    }

    /// Files that are analysed (not the prelude or referenced modules).
    pub fn user_files(&self) -> impl Iterator<Item = FileId> + '_ {
        self.arena
            .files()
            .iter()
            .filter(|f| !f.is_library)
            .map(|f| f.id)
    }

    pub fn type_of_declaration(&self, node: NodeIndex) -> Option<TypeId> {
        self.type_by_node.get(&node).copied()
    }

    pub fn member_of_declaration(&self, node: NodeIndex) -> Option<MemberId> {
        self.member_by_node.get(&node).copied()
    }

    pub fn well_known_type(&self, kind: WellKnownType) -> Option<TypeId> {
        self.well_known.get(&kind).copied()
    }

    pub(crate) fn object_ty(&self) -> Ty {
        self.well_known_type(WellKnownType::Object)
            .map_or(Ty::Unknown, Ty::named)
    }

    pub(crate) fn well_known_ty(&self, kind: WellKnownType) -> Ty {
        self.well_known_type(kind).map_or(Ty::Unknown, Ty::named)
    }

    /// Path of a referenced module file.
    pub fn module_path(&self, file: FileId) -> Option<&Path> {
        self.module_paths.get(&file).map(PathBuf::as_path)
    }
}
