//! Binder for the exflow analyzer.
//!
//! Builds the type and member tables of a program (the embedded prelude,
//! referenced modules and the analysed files), attaches declared exception
//! contracts to their declarations in a single pre-pass, and answers the
//! semantic queries the analysis core needs through [`SemanticModel`].

pub mod contracts;
pub use contracts::{ContractEntry, DeclaredContract};

pub mod members;
pub use members::{MemberId, MemberInfo, MemberKind, MemberTable, ParamInfo};

pub mod model;
pub use model::{SemanticModel, TypeHierarchy};

pub mod prelude;
pub use prelude::{PRELUDE_FILE_NAME, prelude_diagnostics};

pub mod state;
pub use state::{BinderState, ProgramBuilder};

mod state_declarations;

pub mod state_resolution;
pub use state_resolution::ResolvedCall;

pub mod state_typing;
pub use state_typing::{ConstValue, LocalKind, LocalSymbol, parse_integer_literal};

pub mod types;
pub use types::{Ty, TypeId, TypeInfo, TypeTable};

pub mod well_known;
pub use well_known::{NumericKind, WellKnownType};
