//! Node structures.
//!
//! Every syntax node lives in the [`NodeArena`] and is addressed by a
//! [`NodeIndex`]. The node kind is a closed sum type carrying its payload, so
//! every consumer matches exhaustively (or falls into an explicit default
//! arm) instead of probing side tables.

use super::base::{NodeIndex, NodeList};
use bitflags::bitflags;
use exflow_common::{FileId, LineMap, Span};
use smallvec::SmallVec;
use std::sync::Arc;

bitflags! {
    /// Declaration modifiers.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u32 {
        const PUBLIC = 1 << 0;
        const PRIVATE = 1 << 1;
        const PROTECTED = 1 << 2;
        const INTERNAL = 1 << 3;
        const STATIC = 1 << 4;
        const ABSTRACT = 1 << 5;
        const VIRTUAL = 1 << 6;
        const OVERRIDE = 1 << 7;
        const SEALED = 1 << 8;
        const READONLY = 1 << 9;
        const CONST = 1 << 10;
        const EXTERN = 1 << 11;
        const NEW = 1 << 12;
        const ASYNC = 1 << 13;
        const PARTIAL = 1 << 14;
    }
}

/// A type as written in source: `System.Collections.Generic.List<int>?[]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeSyntax {
    /// Dotted name as written, without type arguments.
    pub name: String,
    pub type_args: Vec<TypeSyntax>,
    pub nullable: bool,
    pub array_rank: u8,
    pub span: Span,
}

impl TypeSyntax {
    pub fn simple(name: impl Into<String>, span: Span) -> Self {
        TypeSyntax {
            name: name.into(),
            type_args: Vec::new(),
            nullable: false,
            array_rank: 0,
            span,
        }
    }

    /// `var` as a local declaration type.
    pub fn is_var(&self) -> bool {
        self.name == "var" && self.type_args.is_empty() && self.array_rank == 0
    }

    /// The last segment of the dotted name.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Source-like rendering, used in diagnostics and tests.
    pub fn display(&self) -> String {
        let mut out = self.name.clone();
        if !self.type_args.is_empty() {
            out.push('<');
            let args: Vec<String> = self.type_args.iter().map(TypeSyntax::display).collect();
            out.push_str(&args.join(", "));
            out.push('>');
        }
        if self.nullable {
            out.push('?');
        }
        for _ in 0..self.array_rank {
            out.push_str("[]");
        }
        out
    }
}

// =============================================================================
// Declarations
// =============================================================================

#[derive(Clone, Debug)]
pub struct SourceFileData {
    pub members: NodeList,
}

#[derive(Clone, Debug)]
pub struct NamespaceData {
    pub name: String,
    pub members: NodeList,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeDeclKind {
    Class,
    Interface,
    Struct,
}

#[derive(Clone, Debug)]
pub struct TypeDeclData {
    pub kind: TypeDeclKind,
    pub name: String,
    pub type_params: Vec<String>,
    pub bases: Vec<TypeSyntax>,
    pub members: NodeList,
    pub modifiers: Modifiers,
    pub attributes: NodeList,
    pub doc: Option<String>,
}

/// Methods, constructors and local functions.
#[derive(Clone, Debug)]
pub struct MethodData {
    pub name: String,
    pub name_span: Span,
    pub type_params: Vec<String>,
    /// For constructors, the declaring type's name.
    pub return_type: TypeSyntax,
    pub params: NodeList,
    /// Block, expression (when `expression_body`), or NONE for abstract/extern.
    pub body: NodeIndex,
    pub expression_body: bool,
    /// `: base(...)` / `: this(...)` constructor initializer invocation.
    pub initializer: NodeIndex,
    pub modifiers: Modifiers,
    pub attributes: NodeList,
    pub doc: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Property,
    Indexer,
    Event,
}

#[derive(Clone, Debug)]
pub struct PropertyData {
    pub kind: PropertyKind,
    /// `this` for indexers.
    pub name: String,
    pub name_span: Span,
    pub ty: TypeSyntax,
    /// Indexer parameters.
    pub params: NodeList,
    /// `None` for an expression-bodied property (`int P => 1;`).
    pub accessors: Option<NodeList>,
    pub expression_body: NodeIndex,
    pub initializer: NodeIndex,
    pub modifiers: Modifiers,
    pub attributes: NodeList,
    pub doc: Option<String>,
}

impl PropertyData {
    pub fn has_accessor_list(&self) -> bool {
        self.accessors.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    Get,
    Set,
    Init,
    Add,
    Remove,
}

impl AccessorKind {
    pub const fn keyword(self) -> &'static str {
        match self {
            AccessorKind::Get => "get",
            AccessorKind::Set => "set",
            AccessorKind::Init => "init",
            AccessorKind::Add => "add",
            AccessorKind::Remove => "remove",
        }
    }

    pub const fn is_setter_like(self) -> bool {
        matches!(self, AccessorKind::Set | AccessorKind::Init)
    }
}

#[derive(Clone, Debug)]
pub struct AccessorData {
    pub kind: AccessorKind,
    /// Block, expression (when `expression_body`), or NONE for auto accessors.
    pub body: NodeIndex,
    pub expression_body: bool,
    pub modifiers: Modifiers,
    pub attributes: NodeList,
}

#[derive(Clone, Debug)]
pub struct FieldData {
    pub ty: TypeSyntax,
    pub declarators: NodeList,
    pub modifiers: Modifiers,
    pub attributes: NodeList,
    pub is_event: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ParameterModifier {
    #[default]
    None,
    Ref,
    Out,
    In,
    Params,
    This,
}

#[derive(Clone, Debug)]
pub struct ParameterData {
    pub name: String,
    /// `None` for implicitly typed lambda parameters.
    pub ty: Option<TypeSyntax>,
    pub default: NodeIndex,
    pub modifier: ParameterModifier,
    pub attributes: NodeList,
}

#[derive(Clone, Debug)]
pub struct AttributeData {
    /// Name as written, e.g. `Throws` or `System.Diagnostics.CodeAnalysis.DoesNotReturn`.
    pub name: String,
    pub arguments: NodeList,
}

impl AttributeData {
    /// Name without namespace qualification or `Attribute` suffix.
    pub fn short_name(&self) -> &str {
        let last = self.name.rsplit('.').next().unwrap_or(&self.name);
        last.strip_suffix("Attribute").unwrap_or(last)
    }
}

#[derive(Clone, Debug)]
pub struct LambdaData {
    pub params: NodeList,
    /// Block or expression.
    pub body: NodeIndex,
    pub attributes: NodeList,
    pub is_async: bool,
}

// =============================================================================
// Statements
// =============================================================================

#[derive(Clone, Debug)]
pub struct BlockData {
    pub statements: NodeList,
}

#[derive(Clone, Debug)]
pub struct LocalDeclarationData {
    pub ty: TypeSyntax,
    pub declarators: NodeList,
    pub is_const: bool,
    pub is_using: bool,
}

#[derive(Clone, Debug)]
pub struct VariableDeclaratorData {
    pub name: String,
    pub initializer: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct IfData {
    pub condition: NodeIndex,
    pub then_statement: NodeIndex,
    pub else_statement: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct LoopData {
    pub condition: NodeIndex,
    pub body: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ForData {
    pub initializers: NodeList,
    pub condition: NodeIndex,
    pub incrementors: NodeList,
    pub body: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ForEachData {
    pub ty: TypeSyntax,
    pub name: String,
    pub expression: NodeIndex,
    pub body: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct SwitchData {
    pub expression: NodeIndex,
    pub sections: NodeList,
}

#[derive(Clone, Debug)]
pub struct SwitchSectionData {
    pub labels: NodeList,
    pub is_default: bool,
    pub statements: NodeList,
}

#[derive(Clone, Debug)]
pub struct TryData {
    pub block: NodeIndex,
    pub catches: NodeList,
    pub finally_block: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct CatchData {
    /// `None` for a catch-all clause.
    pub ty: Option<TypeSyntax>,
    pub name: Option<String>,
    pub filter: NodeIndex,
    pub block: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct UsingData {
    /// Local declaration or expression.
    pub resource: NodeIndex,
    pub body: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct LockData {
    pub expression: NodeIndex,
    pub body: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct CheckedData {
    pub inner: NodeIndex,
    pub checked: bool,
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Integer,
    Real,
    String,
    Char,
    True,
    False,
    Null,
}

#[derive(Clone, Debug)]
pub struct LiteralData {
    pub kind: LiteralKind,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct IdentifierData {
    pub name: String,
    pub type_args: Vec<TypeSyntax>,
}

#[derive(Clone, Debug)]
pub struct MemberAccessData {
    pub expression: NodeIndex,
    pub name: String,
    pub name_span: Span,
    pub type_args: Vec<TypeSyntax>,
    /// `?.`
    pub conditional: bool,
}

#[derive(Clone, Debug)]
pub struct ElementAccessData {
    pub expression: NodeIndex,
    pub arguments: NodeList,
    pub conditional: bool,
}

#[derive(Clone, Debug)]
pub struct InvocationData {
    pub expression: NodeIndex,
    pub arguments: NodeList,
}

#[derive(Clone, Debug)]
pub struct ObjectCreationData {
    /// `None` for target-typed `new()`.
    pub ty: Option<TypeSyntax>,
    pub arguments: NodeList,
    pub initializer: NodeList,
}

#[derive(Clone, Debug)]
pub struct ArrayCreationData {
    /// `None` for implicitly typed `new[] { ... }`.
    pub element_type: Option<TypeSyntax>,
    pub sizes: NodeList,
    pub initializer: NodeList,
}

#[derive(Clone, Debug)]
pub struct CastData {
    pub ty: TypeSyntax,
    pub expression: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct TypeTestData {
    pub expression: NodeIndex,
    /// Type operand; `None` for constant patterns such as `is null`.
    pub ty: Option<TypeSyntax>,
    pub designation: Option<String>,
    /// Constant pattern operand.
    pub pattern: NodeIndex,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Equal,
    NotEqual,
    LogicalAnd,
    LogicalOr,
    BitwiseAnd,
    BitwiseOr,
    ExclusiveOr,
    LeftShift,
    RightShift,
    Coalesce,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    BitwiseNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
    /// Null-forgiving `x!`.
    SuppressNull,
}

impl UnaryOp {
    pub const fn is_increment_or_decrement(self) -> bool {
        matches!(
            self,
            UnaryOp::PreIncrement
                | UnaryOp::PreDecrement
                | UnaryOp::PostIncrement
                | UnaryOp::PostDecrement
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssignmentOp {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    And,
    Or,
    ExclusiveOr,
    Coalesce,
}

#[derive(Clone, Debug)]
pub struct BinaryData {
    pub op: BinaryOp,
    pub left: NodeIndex,
    pub right: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct UnaryData {
    pub op: UnaryOp,
    pub operand: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct AssignmentData {
    pub op: AssignmentOp,
    pub target: NodeIndex,
    pub value: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ConditionalData {
    pub condition: NodeIndex,
    pub when_true: NodeIndex,
    pub when_false: NodeIndex,
}

// =============================================================================
// Node
// =============================================================================

#[derive(Clone, Debug)]
pub enum NodeKind {
    SourceFile(SourceFileData),
    Namespace(NamespaceData),
    TypeDecl(TypeDeclData),
    Method(MethodData),
    Constructor(MethodData),
    Property(PropertyData),
    Accessor(AccessorData),
    Field(FieldData),
    Parameter(ParameterData),
    Attribute(AttributeData),

    // Statements
    Block(BlockData),
    LocalDeclaration(LocalDeclarationData),
    VariableDeclarator(VariableDeclaratorData),
    LocalFunction(MethodData),
    ExpressionStatement(NodeIndex),
    If(IfData),
    While(LoopData),
    Do(LoopData),
    For(ForData),
    ForEach(ForEachData),
    Switch(SwitchData),
    SwitchSection(SwitchSectionData),
    Try(TryData),
    Catch(CatchData),
    /// `NONE` operand for a rethrow.
    Throw(NodeIndex),
    Return(NodeIndex),
    Break,
    Continue,
    Empty,
    Using(UsingData),
    Lock(LockData),
    CheckedStatement(CheckedData),

    // Expressions
    Literal(LiteralData),
    Identifier(IdentifierData),
    This,
    Base,
    Parenthesized(NodeIndex),
    MemberAccess(MemberAccessData),
    ElementAccess(ElementAccessData),
    Invocation(InvocationData),
    ObjectCreation(ObjectCreationData),
    ArrayCreation(ArrayCreationData),
    /// Brace-delimited initializer list (`{ 1, 2 }`, `{ [k] = v }`).
    InitializerList(NodeList),
    Cast(CastData),
    As(TypeTestData),
    Is(TypeTestData),
    Binary(BinaryData),
    Unary(UnaryData),
    Assignment(AssignmentData),
    Conditional(ConditionalData),
    Lambda(LambdaData),
    ThrowExpression(NodeIndex),
    TypeOf(TypeSyntax),
    Default(Option<TypeSyntax>),
    InterpolatedString(NodeList),
    CheckedExpression(CheckedData),

    /// Placeholder produced by error recovery.
    Missing,
}

impl NodeKind {
    /// Every direct child index, in source order.
    pub fn children(&self) -> SmallVec<[NodeIndex; 4]> {
        let mut out: SmallVec<[NodeIndex; 4]> = SmallVec::new();
        let mut push = |idx: NodeIndex| {
            if idx.is_some() {
                out.push(idx);
            }
        };
        match self {
            NodeKind::SourceFile(d) => d.members.iter().copied().for_each(&mut push),
            NodeKind::Namespace(d) => d.members.iter().copied().for_each(&mut push),
            NodeKind::TypeDecl(d) => {
                d.attributes.iter().copied().for_each(&mut push);
                d.members.iter().copied().for_each(&mut push);
            }
            NodeKind::Method(d) | NodeKind::Constructor(d) | NodeKind::LocalFunction(d) => {
                d.attributes.iter().copied().for_each(&mut push);
                d.params.iter().copied().for_each(&mut push);
                push(d.initializer);
                push(d.body);
            }
            NodeKind::Property(d) => {
                d.attributes.iter().copied().for_each(&mut push);
                d.params.iter().copied().for_each(&mut push);
                if let Some(accessors) = &d.accessors {
                    accessors.iter().copied().for_each(&mut push);
                }
                push(d.expression_body);
                push(d.initializer);
            }
            NodeKind::Accessor(d) => {
                d.attributes.iter().copied().for_each(&mut push);
                push(d.body);
            }
            NodeKind::Field(d) => {
                d.attributes.iter().copied().for_each(&mut push);
                d.declarators.iter().copied().for_each(&mut push);
            }
            NodeKind::Parameter(d) => {
                d.attributes.iter().copied().for_each(&mut push);
                push(d.default);
            }
            NodeKind::Attribute(d) => d.arguments.iter().copied().for_each(&mut push),
            NodeKind::Block(d) => d.statements.iter().copied().for_each(&mut push),
            NodeKind::LocalDeclaration(d) => d.declarators.iter().copied().for_each(&mut push),
            NodeKind::VariableDeclarator(d) => push(d.initializer),
            NodeKind::ExpressionStatement(e)
            | NodeKind::Throw(e)
            | NodeKind::Return(e)
            | NodeKind::Parenthesized(e)
            | NodeKind::ThrowExpression(e) => push(*e),
            NodeKind::If(d) => {
                push(d.condition);
                push(d.then_statement);
                push(d.else_statement);
            }
            NodeKind::While(d) => {
                push(d.condition);
                push(d.body);
            }
            NodeKind::Do(d) => {
                push(d.body);
                push(d.condition);
            }
            NodeKind::For(d) => {
                d.initializers.iter().copied().for_each(&mut push);
                push(d.condition);
                d.incrementors.iter().copied().for_each(&mut push);
                push(d.body);
            }
            NodeKind::ForEach(d) => {
                push(d.expression);
                push(d.body);
            }
            NodeKind::Switch(d) => {
                push(d.expression);
                d.sections.iter().copied().for_each(&mut push);
            }
            NodeKind::SwitchSection(d) => {
                d.labels.iter().copied().for_each(&mut push);
                d.statements.iter().copied().for_each(&mut push);
            }
            NodeKind::Try(d) => {
                push(d.block);
                d.catches.iter().copied().for_each(&mut push);
                push(d.finally_block);
            }
            NodeKind::Catch(d) => {
                push(d.filter);
                push(d.block);
            }
            NodeKind::Using(d) => {
                push(d.resource);
                push(d.body);
            }
            NodeKind::Lock(d) => {
                push(d.expression);
                push(d.body);
            }
            NodeKind::CheckedStatement(d) | NodeKind::CheckedExpression(d) => push(d.inner),
            NodeKind::MemberAccess(d) => push(d.expression),
            NodeKind::ElementAccess(d) => {
                push(d.expression);
                d.arguments.iter().copied().for_each(&mut push);
            }
            NodeKind::Invocation(d) => {
                push(d.expression);
                d.arguments.iter().copied().for_each(&mut push);
            }
            NodeKind::ObjectCreation(d) => {
                d.arguments.iter().copied().for_each(&mut push);
                d.initializer.iter().copied().for_each(&mut push);
            }
            NodeKind::ArrayCreation(d) => {
                d.sizes.iter().copied().for_each(&mut push);
                d.initializer.iter().copied().for_each(&mut push);
            }
            NodeKind::InitializerList(items) | NodeKind::InterpolatedString(items) => {
                items.iter().copied().for_each(&mut push)
            }
            NodeKind::Cast(d) => push(d.expression),
            NodeKind::As(d) | NodeKind::Is(d) => {
                push(d.expression);
                push(d.pattern);
            }
            NodeKind::Binary(d) => {
                push(d.left);
                push(d.right);
            }
            NodeKind::Unary(d) => push(d.operand),
            NodeKind::Assignment(d) => {
                push(d.target);
                push(d.value);
            }
            NodeKind::Conditional(d) => {
                push(d.condition);
                push(d.when_true);
                push(d.when_false);
            }
            NodeKind::Lambda(d) => {
                d.attributes.iter().copied().for_each(&mut push);
                d.params.iter().copied().for_each(&mut push);
                push(d.body);
            }
            NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Empty
            | NodeKind::Literal(_)
            | NodeKind::Identifier(_)
            | NodeKind::This
            | NodeKind::Base
            | NodeKind::TypeOf(_)
            | NodeKind::Default(_)
            | NodeKind::Missing => {}
        }
        out
    }

    /// Short kind name for logging and test assertions.
    pub const fn name(&self) -> &'static str {
        match self {
            NodeKind::SourceFile(_) => "SourceFile",
            NodeKind::Namespace(_) => "Namespace",
            NodeKind::TypeDecl(_) => "TypeDecl",
            NodeKind::Method(_) => "Method",
            NodeKind::Constructor(_) => "Constructor",
            NodeKind::Property(_) => "Property",
            NodeKind::Accessor(_) => "Accessor",
            NodeKind::Field(_) => "Field",
            NodeKind::Parameter(_) => "Parameter",
            NodeKind::Attribute(_) => "Attribute",
            NodeKind::Block(_) => "Block",
            NodeKind::LocalDeclaration(_) => "LocalDeclaration",
            NodeKind::VariableDeclarator(_) => "VariableDeclarator",
            NodeKind::LocalFunction(_) => "LocalFunction",
            NodeKind::ExpressionStatement(_) => "ExpressionStatement",
            NodeKind::If(_) => "If",
            NodeKind::While(_) => "While",
            NodeKind::Do(_) => "Do",
            NodeKind::For(_) => "For",
            NodeKind::ForEach(_) => "ForEach",
            NodeKind::Switch(_) => "Switch",
            NodeKind::SwitchSection(_) => "SwitchSection",
            NodeKind::Try(_) => "Try",
            NodeKind::Catch(_) => "Catch",
            NodeKind::Throw(_) => "Throw",
            NodeKind::Return(_) => "Return",
            NodeKind::Break => "Break",
            NodeKind::Continue => "Continue",
            NodeKind::Empty => "Empty",
            NodeKind::Using(_) => "Using",
            NodeKind::Lock(_) => "Lock",
            NodeKind::CheckedStatement(_) => "CheckedStatement",
            NodeKind::Literal(_) => "Literal",
            NodeKind::Identifier(_) => "Identifier",
            NodeKind::This => "This",
            NodeKind::Base => "Base",
            NodeKind::Parenthesized(_) => "Parenthesized",
            NodeKind::MemberAccess(_) => "MemberAccess",
            NodeKind::ElementAccess(_) => "ElementAccess",
            NodeKind::Invocation(_) => "Invocation",
            NodeKind::ObjectCreation(_) => "ObjectCreation",
            NodeKind::ArrayCreation(_) => "ArrayCreation",
            NodeKind::InitializerList(_) => "InitializerList",
            NodeKind::Cast(_) => "Cast",
            NodeKind::As(_) => "As",
            NodeKind::Is(_) => "Is",
            NodeKind::Binary(_) => "Binary",
            NodeKind::Unary(_) => "Unary",
            NodeKind::Assignment(_) => "Assignment",
            NodeKind::Conditional(_) => "Conditional",
            NodeKind::Lambda(_) => "Lambda",
            NodeKind::ThrowExpression(_) => "ThrowExpression",
            NodeKind::TypeOf(_) => "TypeOf",
            NodeKind::Default(_) => "Default",
            NodeKind::InterpolatedString(_) => "InterpolatedString",
            NodeKind::CheckedExpression(_) => "CheckedExpression",
            NodeKind::Missing => "Missing",
        }
    }

    /// Function-like scopes own a declared contract and bound handler search.
    pub const fn is_function_like(&self) -> bool {
        matches!(
            self,
            NodeKind::Method(_)
                | NodeKind::Constructor(_)
                | NodeKind::LocalFunction(_)
                | NodeKind::Accessor(_)
                | NodeKind::Lambda(_)
        )
    }

    /// Statements that may appear in a block.
    pub const fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::Block(_)
                | NodeKind::LocalDeclaration(_)
                | NodeKind::LocalFunction(_)
                | NodeKind::ExpressionStatement(_)
                | NodeKind::If(_)
                | NodeKind::While(_)
                | NodeKind::Do(_)
                | NodeKind::For(_)
                | NodeKind::ForEach(_)
                | NodeKind::Switch(_)
                | NodeKind::Try(_)
                | NodeKind::Throw(_)
                | NodeKind::Return(_)
                | NodeKind::Break
                | NodeKind::Continue
                | NodeKind::Empty
                | NodeKind::Using(_)
                | NodeKind::Lock(_)
                | NodeKind::CheckedStatement(_)
        )
    }
}

/// A node in the arena.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub file: FileId,
    pub parent: NodeIndex,
}

/// Per-file information kept alongside the nodes.
#[derive(Clone, Debug)]
pub struct SourceFileInfo {
    pub id: FileId,
    pub file_name: String,
    pub text: Arc<str>,
    pub root: NodeIndex,
    /// `#nullable enable` appeared in the file.
    pub nullable_enabled: bool,
    /// Embedded library source rather than user code.
    pub is_library: bool,
    pub line_map: LineMap,
}

/// Storage for every node of every parsed file.
#[derive(Clone, Debug, Default)]
pub struct NodeArena {
    pub(crate) nodes: Vec<Node>,
    pub(crate) files: Vec<SourceFileInfo>,
}
