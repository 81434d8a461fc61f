use crate::language::{
    ast::{Ident, NodeId},
    span::Span,
};

/// A type as written in source. Resolution into interned types happens in `typeinfo`.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeExpr {
    pub id: NodeId,
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeExprKind {
    Named(String, Vec<TypeExpr>),
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    Func(FuncType),
    Interface,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncType {
    pub params: Vec<Param>,
    /// When set, the last parameter's type is the element type of the variadic tail.
    pub variadic: bool,
    pub results: Vec<Param>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Option<Ident>,
    pub ty: TypeExpr,
}

impl TypeExpr {
    /// Returns the bare identifier when this is an unparameterised named type.
    pub fn as_plain_name(&self) -> Option<&str> {
        match &self.kind {
            TypeExprKind::Named(name, args) if args.is_empty() => Some(name),
            _ => None,
        }
    }

    pub fn canonical_name(&self) -> String {
        match &self.kind {
            TypeExprKind::Named(name, args) => {
                if args.is_empty() {
                    name.clone()
                } else {
                    let rendered: Vec<String> = args.iter().map(|ty| ty.canonical_name()).collect();
                    format!("{}[{}]", name, rendered.join(", "))
                }
            }
            TypeExprKind::Pointer(inner) => format!("*{}", inner.canonical_name()),
            TypeExprKind::Slice(inner) => format!("[]{}", inner.canonical_name()),
            TypeExprKind::Map { key, value } => {
                format!("map[{}]{}", key.canonical_name(), value.canonical_name())
            }
            TypeExprKind::Func(func) => func.canonical_name(),
            TypeExprKind::Interface => "interface{}".into(),
        }
    }
}

impl FuncType {
    pub fn canonical_name(&self) -> String {
        let last = self.params.len().saturating_sub(1);
        let params: Vec<String> = self
            .params
            .iter()
            .enumerate()
            .map(|(idx, param)| {
                if self.variadic && idx == last {
                    format!("...{}", param.ty.canonical_name())
                } else {
                    param.ty.canonical_name()
                }
            })
            .collect();
        let results: Vec<String> = self
            .results
            .iter()
            .map(|param| param.ty.canonical_name())
            .collect();
        match results.len() {
            0 => format!("func({})", params.join(", ")),
            1 => format!("func({}) {}", params.join(", "), results[0]),
            _ => format!("func({}) ({})", params.join(", "), results.join(", ")),
        }
    }
}
