use crate::audit::oracle::{OriginId, Signature, TypeId};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Int,
    String,
    Bool,
    UntypedInt,
    UntypedString,
    UntypedBool,
    UntypedNil,
}

impl BasicKind {
    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Int => "int",
            BasicKind::String => "string",
            BasicKind::Bool => "bool",
            BasicKind::UntypedInt => "untyped int",
            BasicKind::UntypedString => "untyped string",
            BasicKind::UntypedBool => "untyped bool",
            BasicKind::UntypedNil => "untyped nil",
        }
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            BasicKind::UntypedInt
                | BasicKind::UntypedString
                | BasicKind::UntypedBool
                | BasicKind::UntypedNil
        )
    }

    /// The typed kind an untyped constant takes when nothing else constrains it.
    pub fn default_kind(self) -> Option<BasicKind> {
        match self {
            BasicKind::UntypedInt => Some(BasicKind::Int),
            BasicKind::UntypedString => Some(BasicKind::String),
            BasicKind::UntypedBool => Some(BasicKind::Bool),
            BasicKind::UntypedNil => None,
            typed => Some(typed),
        }
    }
}

/// Identity of a defined (non-alias) type declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NamedId(pub u32);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Basic(BasicKind),
    /// The empty interface; every value type implements it.
    Interface,
    Pointer(TypeId),
    Slice(TypeId),
    Map {
        key: TypeId,
        value: TypeId,
    },
    Func(Signature),
    /// Multiple call results. Never the type of a single value.
    Tuple(Vec<TypeId>),
    Named {
        name: String,
        id: NamedId,
        underlying: TypeId,
    },
    Alias {
        name: String,
        origin: OriginId,
        args: Vec<TypeId>,
        actual: TypeId,
    },
}

/// Interning arena: structurally equal types share one `TypeId`.
#[derive(Debug)]
pub struct TypeTable {
    package: String,
    types: Vec<Type>,
    interned: HashMap<Type, TypeId>,
}

impl TypeTable {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            types: Vec::new(),
            interned: HashMap::new(),
        }
    }

    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(id) = self.interned.get(&ty) {
            return *id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty.clone());
        self.interned.insert(ty, id);
        id
    }

    pub fn basic(&mut self, kind: BasicKind) -> TypeId {
        self.intern(Type::Basic(kind))
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Follows alias chains to the aliased type.
    pub fn unalias(&self, mut id: TypeId) -> TypeId {
        while let Type::Alias { actual, .. } = self.get(id) {
            id = *actual;
        }
        id
    }

    pub fn underlying(&self, id: TypeId) -> TypeId {
        let id = self.unalias(id);
        match self.get(id) {
            Type::Named { underlying, .. } => self.unalias(*underlying),
            _ => id,
        }
    }

    pub fn basic_kind(&self, id: TypeId) -> Option<BasicKind> {
        match self.get(self.unalias(id)) {
            Type::Basic(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_tuple(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Tuple(_))
    }

    /// Defined and predeclared types; untyped constants and type literals are unnamed.
    fn is_named(&self, id: TypeId) -> bool {
        match self.get(self.unalias(id)) {
            Type::Named { .. } => true,
            Type::Basic(kind) => !kind.is_untyped(),
            _ => false,
        }
    }

    /// Identity modulo aliases, at every level of the type structure.
    pub fn identical(&self, a: TypeId, b: TypeId) -> bool {
        let (a, b) = (self.unalias(a), self.unalias(b));
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (Type::Pointer(x), Type::Pointer(y)) | (Type::Slice(x), Type::Slice(y)) => {
                self.identical(*x, *y)
            }
            (Type::Map { key: k1, value: v1 }, Type::Map { key: k2, value: v2 }) => {
                self.identical(*k1, *k2) && self.identical(*v1, *v2)
            }
            (Type::Func(s1), Type::Func(s2)) => {
                s1.variadic == s2.variadic
                    && self.all_identical(&s1.params, &s2.params)
                    && self.all_identical(&s1.results, &s2.results)
            }
            (Type::Tuple(xs), Type::Tuple(ys)) => self.all_identical(xs, ys),
            _ => false,
        }
    }

    fn all_identical(&self, xs: &[TypeId], ys: &[TypeId]) -> bool {
        xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| self.identical(*x, *y))
    }

    /// Whether a value of type `value` may be stored in a location of type `target`.
    pub fn assignable(&self, value: TypeId, target: TypeId) -> bool {
        if self.is_tuple(self.unalias(value)) || self.is_tuple(self.unalias(target)) {
            return false;
        }
        if self.identical(value, target) {
            return true;
        }
        let target_under = self.underlying(target);
        if matches!(self.get(target_under), Type::Interface) {
            return true;
        }
        if let Some(kind) = self.basic_kind(value).filter(|kind| kind.is_untyped()) {
            return match kind {
                BasicKind::UntypedNil => matches!(
                    self.get(target_under),
                    Type::Pointer(_) | Type::Slice(_) | Type::Map { .. } | Type::Func(_)
                ),
                untyped => untyped.default_kind() == self.basic_kind(target_under),
            };
        }
        let value_under = self.underlying(value);
        self.identical(value_under, target_under)
            && (!self.is_named(value) || !self.is_named(target))
    }

    pub fn display(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Basic(kind) => kind.name().to_string(),
            Type::Interface => "any".into(),
            Type::Pointer(inner) => format!("*{}", self.display(*inner)),
            Type::Slice(elem) => format!("[]{}", self.display(*elem)),
            Type::Map { key, value } => {
                format!("map[{}]{}", self.display(*key), self.display(*value))
            }
            Type::Func(sig) => self.display_signature(sig),
            Type::Tuple(items) => format!("({})", self.display_list(items)),
            Type::Named { name, .. } => format!("{}.{}", self.package, name),
            Type::Alias { name, args, .. } => {
                if args.is_empty() {
                    format!("{}.{}", self.package, name)
                } else {
                    format!("{}.{}[{}]", self.package, name, self.display_list(args))
                }
            }
        }
    }

    fn display_list(&self, items: &[TypeId]) -> String {
        items
            .iter()
            .map(|item| self.display(*item))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn display_signature(&self, sig: &Signature) -> String {
        let last = sig.params.len().saturating_sub(1);
        let params: Vec<String> = sig
            .params
            .iter()
            .enumerate()
            .map(|(idx, param)| match self.get(*param) {
                Type::Slice(elem) if sig.variadic && idx == last => {
                    format!("...{}", self.display(*elem))
                }
                _ => self.display(*param),
            })
            .collect();
        match sig.results.as_slice() {
            [] => format!("func({})", params.join(", ")),
            [single] => format!("func({}) {}", params.join(", "), self.display(*single)),
            many => format!("func({}) ({})", params.join(", "), self.display_list(many)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TypeTable {
        TypeTable::new("a")
    }

    fn alias(table: &mut TypeTable, origin: u32, args: Vec<TypeId>, actual: TypeId) -> TypeId {
        table.intern(Type::Alias {
            name: "A".into(),
            origin: OriginId(origin),
            args,
            actual,
        })
    }

    #[test]
    fn interning_gives_structural_identity() {
        let mut table = table();
        let int = table.basic(BasicKind::Int);
        let s1 = table.intern(Type::Slice(int));
        let s2 = table.intern(Type::Slice(int));
        assert_eq!(s1, s2);
    }

    #[test]
    fn alias_instances_are_transparent_to_assignability() {
        let mut table = table();
        let any = table.intern(Type::Interface);
        let string = table.basic(BasicKind::String);
        let boolean = table.basic(BasicKind::Bool);
        let a_string = alias(&mut table, 0, vec![string], any);
        let a_bool = alias(&mut table, 0, vec![boolean], any);
        assert_ne!(a_string, a_bool);
        assert!(table.identical(a_string, a_bool));
        assert!(table.assignable(a_bool, a_string));
        assert_eq!(table.display(a_bool), "a.A[bool]");
    }

    #[test]
    fn untyped_constants_follow_their_kind() {
        let mut table = table();
        let int = table.basic(BasicKind::Int);
        let string = table.basic(BasicKind::String);
        let untyped_int = table.basic(BasicKind::UntypedInt);
        let nil = table.basic(BasicKind::UntypedNil);
        let slice = table.intern(Type::Slice(int));
        assert!(table.assignable(untyped_int, int));
        assert!(!table.assignable(untyped_int, string));
        assert!(table.assignable(nil, slice));
        assert!(!table.assignable(nil, int));
    }

    #[test]
    fn named_types_need_one_unnamed_side() {
        let mut table = table();
        let int = table.basic(BasicKind::Int);
        let slice = table.intern(Type::Slice(int));
        let ids = table.intern(Type::Named {
            name: "IDs".into(),
            id: NamedId(0),
            underlying: slice,
        });
        let other = table.intern(Type::Named {
            name: "Other".into(),
            id: NamedId(1),
            underlying: slice,
        });
        let my_int = table.intern(Type::Named {
            name: "MyInt".into(),
            id: NamedId(2),
            underlying: int,
        });
        assert!(table.assignable(slice, ids));
        assert!(table.assignable(ids, slice));
        assert!(!table.assignable(ids, other));
        assert!(!table.assignable(int, my_int));
    }

    #[test]
    fn tuples_are_never_assignable() {
        let mut table = table();
        let any = table.intern(Type::Interface);
        let int = table.basic(BasicKind::Int);
        let tuple = table.intern(Type::Tuple(vec![int, int]));
        assert!(!table.assignable(tuple, any));
        assert_eq!(table.display(tuple), "(int, int)");
    }

    #[test]
    fn displays_variadic_signatures() {
        let mut table = table();
        let int = table.basic(BasicKind::Int);
        let string = table.basic(BasicKind::String);
        let rest = table.intern(Type::Slice(string));
        let func = table.intern(Type::Func(Signature {
            params: vec![int, rest],
            variadic: true,
            results: vec![int, string],
        }));
        assert_eq!(table.display(func), "func(int, ...string) (int, string)");
    }
}
