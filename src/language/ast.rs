use crate::language::{
    span::Span,
    types::{FuncType, TypeExpr},
};
use std::path::PathBuf;

/// Identity of a syntax node within one parsed file; keys the resolver's side tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Clone, Debug)]
pub struct File {
    pub package: Ident,
    pub path: PathBuf,
    pub decls: Vec<Decl>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    pub id: NodeId,
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }
}

#[derive(Clone, Debug)]
pub enum Decl {
    Type(TypeDecl),
    Func(FuncDecl),
    Var(VarDecl),
}

#[derive(Clone, Debug)]
pub struct TypeDecl {
    pub name: Ident,
    pub type_params: Vec<TypeParam>,
    /// `type A = T` rather than `type A T`.
    pub alias: bool,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct TypeParam {
    pub name: Ident,
    pub constraint: TypeExpr,
}

#[derive(Clone, Debug)]
pub struct FuncDecl {
    pub name: Ident,
    pub ty: FuncType,
    pub body: Block,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct VarDecl {
    pub specs: Vec<VarSpec>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct VarSpec {
    pub names: Vec<Ident>,
    pub ty: Option<TypeExpr>,
    pub values: Vec<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum Statement {
    Var(VarDecl),
    Assign(AssignStmt),
    Return(ReturnStmt),
    Expr(Expr),
    Block(Block),
}

#[derive(Clone, Debug)]
pub struct AssignStmt {
    pub lhs: Vec<Expr>,
    pub rhs: Vec<Expr>,
    /// `:=` short variable declaration.
    pub define: bool,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct ReturnStmt {
    pub values: Vec<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Ident(String),
    Int(i128),
    Str(String),
    Paren(Box<Expr>),
    Call(CallExpr),
    Index {
        base: Box<Expr>,
        indices: Vec<Expr>,
    },
    TypeAssert {
        expr: Box<Expr>,
        ty: TypeExpr,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    FuncLit {
        ty: FuncType,
        body: Block,
    },
    Composite {
        ty: Box<Expr>,
        elements: Vec<KeyedElement>,
    },
    /// A type written where an operand is expected: `[]int`, `map[K]V`, `func()`.
    Type(TypeExpr),
}

#[derive(Clone, Debug)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
    /// The last argument is spread with `...`.
    pub spread: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Deref,
    AddrOf,
}

#[derive(Clone, Debug)]
pub struct KeyedElement {
    pub key: Option<Expr>,
    pub value: Expr,
}

impl Expr {
    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Strips any number of enclosing parentheses.
    pub fn unparen(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) => inner.unparen(),
            _ => self,
        }
    }
}
