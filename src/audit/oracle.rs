//! The query surface the audit engine needs from a host type checker.
//!
//! The engine never resolves types itself. Everything it knows about a program
//! element comes through [`TypeOracle`], which keeps the engine testable against
//! a stub over a handful of synthetic types.

use crate::language::{
    ast::{Expr, Ident},
    types::TypeExpr,
};

/// Opaque handle to a resolved type. Equal handles denote identical types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// Identity of a generic alias definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OriginId(pub u32);

/// A program element whose type can be asked for.
#[derive(Clone, Copy, Debug)]
pub enum Element<'a> {
    Expr(&'a Expr),
    Binding(&'a Ident),
    TypeSyntax(&'a TypeExpr),
}

/// Resolved shape of a callable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: Vec<TypeId>,
    /// The last parameter collects trailing arguments; its type is a sequence type.
    pub variadic: bool,
    pub results: Vec<TypeId>,
}

/// The alias a type was instantiated from and the arguments it was given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasInstance {
    pub origin: OriginId,
    pub args: Vec<TypeId>,
}

pub trait TypeOracle {
    /// `None` when the element has no single resolvable value type.
    fn type_of(&self, element: Element<'_>) -> Option<TypeId>;

    /// Component types of a comma-ok expression (`m[k]`, `x.(T)`) in a two-target context.
    fn tuple_of(&self, expr: &Expr) -> Option<Vec<TypeId>>;

    /// Signature of a call target; `None` for conversions, builtins and non-callables.
    fn signature_of(&self, callee: &Expr) -> Option<Signature>;

    /// Element type of a sequence type such as a variadic parameter's `[]T`.
    fn element_type(&self, ty: TypeId) -> Option<TypeId>;

    fn alias(&self, ty: TypeId) -> Option<AliasInstance>;

    fn assignable(&self, from: TypeId, to: TypeId) -> bool;

    /// Renders a type the way a programmer would write it.
    fn display(&self, ty: TypeId) -> String;

    fn is_alias_instantiation(&self, ty: TypeId) -> bool {
        self.alias(ty).is_some()
    }

    fn origin(&self, ty: TypeId) -> Option<OriginId> {
        self.alias(ty).map(|alias| alias.origin)
    }

    fn type_arguments(&self, ty: TypeId) -> Vec<TypeId> {
        self.alias(ty).map(|alias| alias.args).unwrap_or_default()
    }
}
