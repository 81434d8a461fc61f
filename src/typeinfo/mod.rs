//! Reference type resolver for `.ph` sources and its [`TypeOracle`] implementation.

pub mod resolve;
pub mod types;

pub use resolve::{resolve_file, ResolveError, TypeInfo};

use crate::audit::oracle::{AliasInstance, Element, Signature, TypeId, TypeOracle};
use crate::language::ast::Expr;
use types::Type;

impl TypeOracle for TypeInfo {
    fn type_of(&self, element: Element<'_>) -> Option<TypeId> {
        let ty = match element {
            Element::Expr(expr) => self.exprs.get(&expr.id),
            Element::Binding(ident) => self.bindings.get(&ident.id),
            Element::TypeSyntax(ty) => self.type_exprs.get(&ty.id),
        }
        .copied()?;
        (!self.table.is_tuple(ty)).then_some(ty)
    }

    fn tuple_of(&self, expr: &Expr) -> Option<Vec<TypeId>> {
        self.tuples.get(&expr.id).cloned()
    }

    fn signature_of(&self, callee: &Expr) -> Option<Signature> {
        let ty = self.exprs.get(&callee.id)?;
        match self.table.get(self.table.underlying(*ty)) {
            Type::Func(sig) => Some(sig.clone()),
            _ => None,
        }
    }

    fn element_type(&self, ty: TypeId) -> Option<TypeId> {
        match self.table.get(self.table.underlying(ty)) {
            Type::Slice(elem) => Some(*elem),
            _ => None,
        }
    }

    fn alias(&self, ty: TypeId) -> Option<AliasInstance> {
        match self.table.get(ty) {
            Type::Alias { origin, args, .. } if !args.is_empty() => Some(AliasInstance {
                origin: *origin,
                args: args.clone(),
            }),
            _ => None,
        }
    }

    fn assignable(&self, from: TypeId, to: TypeId) -> bool {
        self.table.assignable(from, to)
    }

    fn display(&self, ty: TypeId) -> String {
        self.table.display(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{
        ast::{Decl, ExprKind, File, Statement},
        parser::parse_file,
    };
    use std::path::PathBuf;

    fn resolve(source: &str) -> (File, TypeInfo) {
        let file = parse_file(PathBuf::from("a.ph"), source).expect("source parses");
        let info = resolve_file(&file);
        (file, info)
    }

    fn body(file: &File, name: &str) -> Vec<Statement> {
        file.decls
            .iter()
            .find_map(|decl| match decl {
                Decl::Func(func) if func.name.name == name => Some(func.body.statements.clone()),
                _ => None,
            })
            .expect("function exists")
    }

    #[test]
    fn instantiations_share_an_origin_but_not_an_identity() {
        let (file, info) = resolve(
            "package a\n\ntype A[T any] = any\n\nfunc f() {\n\tx := A[bool](nil)\n\tvar y A[string] = x\n}\n",
        );
        assert!(info.errors.is_empty(), "{:?}", info.errors);
        let statements = body(&file, "f");
        let Statement::Assign(assign) = &statements[0] else {
            panic!("expected assignment")
        };
        let Statement::Var(decl) = &statements[1] else {
            panic!("expected var")
        };
        let x = info.type_of(Element::Expr(&assign.lhs[0])).expect("x typed");
        let y = info
            .type_of(Element::Binding(&decl.specs[0].names[0]))
            .expect("y typed");
        assert_eq!(info.display(x), "a.A[bool]");
        assert_eq!(info.display(y), "a.A[string]");
        assert_eq!(info.origin(x), info.origin(y));
        assert_ne!(info.type_arguments(x), info.type_arguments(y));
        assert!(info.assignable(x, y));
    }

    #[test]
    fn multi_value_calls_have_no_single_type() {
        let (file, info) = resolve(
            "package a\n\nfunc pair() (int, string) { return 1, \"x\" }\n\nfunc f() {\n\tpair()\n}\n",
        );
        assert!(info.errors.is_empty(), "{:?}", info.errors);
        let statements = body(&file, "f");
        let Statement::Expr(call) = &statements[0] else {
            panic!("expected call statement")
        };
        assert_eq!(info.type_of(Element::Expr(call)), None);
        let ExprKind::Call(call) = &call.kind else {
            panic!("expected call")
        };
        let sig = info.signature_of(&call.callee).expect("callee is a function");
        assert_eq!(sig.results.len(), 2);
    }

    #[test]
    fn comma_ok_lookups_record_a_tuple() {
        let (file, info) =
            resolve("package a\n\nfunc f(m map[int]string) {\n\tv, ok := m[1]\n\t_, _ = v, ok\n}\n");
        assert!(info.errors.is_empty(), "{:?}", info.errors);
        let statements = body(&file, "f");
        let Statement::Assign(assign) = &statements[0] else {
            panic!("expected assignment")
        };
        let tuple = info.tuple_of(&assign.rhs[0]).expect("comma-ok tuple");
        let rendered: Vec<String> = tuple.iter().map(|ty| info.display(*ty)).collect();
        assert_eq!(rendered, ["string", "bool"]);
    }

    #[test]
    fn variadic_parameters_are_slices() {
        let (file, info) = resolve(
            "package a\n\nfunc g(n int, rest ...string) {}\n\nfunc f() {\n\tg(1, \"a\", \"b\")\n}\n",
        );
        assert!(info.errors.is_empty(), "{:?}", info.errors);
        let statements = body(&file, "f");
        let Statement::Expr(expr) = &statements[0] else {
            panic!("expected call statement")
        };
        let ExprKind::Call(call) = &expr.kind else {
            panic!("expected call")
        };
        let sig = info.signature_of(&call.callee).expect("signature");
        assert!(sig.variadic);
        let elem = info.element_type(sig.params[1]).expect("slice element");
        assert_eq!(info.display(elem), "string");
        // A call with no results is not a value.
        assert_eq!(info.type_of(Element::Expr(expr)), None);
    }

    #[test]
    fn blank_assignment_targets_stay_unresolved() {
        let (file, info) = resolve("package a\n\nfunc f() {\n\t_ = 1\n}\n");
        assert!(info.errors.is_empty(), "{:?}", info.errors);
        let statements = body(&file, "f");
        let Statement::Assign(assign) = &statements[0] else {
            panic!("expected assignment")
        };
        assert_eq!(info.type_of(Element::Expr(&assign.lhs[0])), None);
        assert!(info.type_of(Element::Expr(&assign.rhs[0])).is_some());
    }

    #[test]
    fn reports_undefined_names_and_recursive_types() {
        let (_, info) = resolve("package a\n\ntype R = []R\n\nfunc f() {\n\tx := missing\n}\n");
        let messages: Vec<&str> = info.errors.iter().map(|err| err.message.as_str()).collect();
        assert!(messages.contains(&"invalid recursive type R"), "{messages:?}");
        assert!(messages.contains(&"undefined: missing"), "{messages:?}");
    }

    #[test]
    fn wrong_type_argument_count_is_an_error() {
        let (_, info) = resolve("package a\n\ntype A[T any] = any\n\nvar x A[int, string]\n");
        assert_eq!(info.errors.len(), 1);
        assert_eq!(
            info.errors[0].message,
            "too many type arguments for type A: have 2, want 1"
        );
    }

    #[test]
    fn package_variables_are_visible_in_earlier_functions() {
        let (_, info) = resolve("package a\n\nfunc f() {\n\tx := v\n\t_ = x\n}\n\nvar v = \"s\"\n");
        assert!(info.errors.is_empty(), "{:?}", info.errors);
    }
}
