//! Site extraction: every place where a value flows into a typed slot.
//!
//! The walk is pre-order and in document order. A statement's own sites are
//! produced before any site nested in its sub-expressions, and a call's argument
//! sites before those of calls inside its callee or arguments.

use super::{
    oracle::{Element, TypeId, TypeOracle},
    Pass,
};
use crate::language::{ast::*, span::Span};
use tracing::debug;

/// The syntactic forms that produce sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// `N` targets and `N` sources bound positionally.
    Parallel,
    /// `N` targets fed by a single multi-value source.
    Destructure,
    CallArguments,
    /// `var` specs with initializers.
    Declaration,
}

impl Shape {
    pub const ALL: [Shape; 4] = [
        Shape::Parallel,
        Shape::Destructure,
        Shape::CallArguments,
        Shape::Declaration,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Shape::Parallel => "parallel",
            Shape::Destructure => "destructure",
            Shape::CallArguments => "call-arguments",
            Shape::Declaration => "declaration",
        }
    }
}

/// One side of a site: either something to ask the oracle about, or a type it already gave us.
#[derive(Clone, Copy, Debug)]
pub enum Endpoint<'a> {
    Element(Element<'a>),
    Resolved(TypeId),
}

#[derive(Clone, Copy, Debug)]
pub struct Site<'a> {
    pub shape: Shape,
    pub span: Span,
    pub source: Endpoint<'a>,
    pub target: Endpoint<'a>,
}

/// Streams the sites of `file` to `sink` in traversal order.
pub fn extract_sites<'a, O, F>(file: &'a File, oracle: &O, pass: Pass, sink: F)
where
    O: TypeOracle + ?Sized,
    F: FnMut(Site<'a>),
{
    let mut walker = Walker { oracle, pass, sink };
    for decl in &file.decls {
        walker.decl(decl);
    }
}

struct Walker<'o, O: ?Sized, F> {
    oracle: &'o O,
    pass: Pass,
    sink: F,
}

fn expr(expr: &Expr) -> Endpoint<'_> {
    Endpoint::Element(Element::Expr(expr))
}

impl<'a, O, F> Walker<'_, O, F>
where
    O: TypeOracle + ?Sized,
    F: FnMut(Site<'a>),
{
    fn emit(&mut self, shape: Shape, span: Span, source: Endpoint<'a>, target: Endpoint<'a>) {
        (self.sink)(Site {
            shape,
            span,
            source,
            target,
        });
    }

    fn decl(&mut self, decl: &'a Decl) {
        match decl {
            Decl::Type(_) => {}
            Decl::Func(func) => self.block(&func.body),
            Decl::Var(var) => self.var_decl(var),
        }
    }

    fn block(&mut self, block: &'a Block) {
        for statement in &block.statements {
            self.statement(statement);
        }
    }

    fn statement(&mut self, statement: &'a Statement) {
        match statement {
            Statement::Var(decl) => self.var_decl(decl),
            Statement::Assign(assign) => {
                self.assign(assign);
                for target in &assign.lhs {
                    self.expr(target);
                }
                for source in &assign.rhs {
                    self.expr(source);
                }
            }
            Statement::Return(ret) => {
                for value in &ret.values {
                    self.expr(value);
                }
            }
            Statement::Expr(value) => self.expr(value),
            Statement::Block(block) => self.block(block),
        }
    }

    fn var_decl(&mut self, decl: &'a VarDecl) {
        for spec in &decl.specs {
            self.declaration(spec, decl.span);
        }
        for spec in &decl.specs {
            for value in &spec.values {
                self.expr(value);
            }
        }
    }

    fn declaration(&mut self, spec: &'a VarSpec, statement: Span) {
        if spec.values.is_empty() {
            return;
        }
        if spec.names.len() == spec.values.len() {
            for (name, value) in spec.names.iter().zip(&spec.values) {
                self.emit(
                    Shape::Declaration,
                    spec.span,
                    expr(value),
                    Endpoint::Element(Element::Binding(name)),
                );
            }
            return;
        }
        if self.pass == Pass::TypeAnnotation || spec.values.len() != 1 {
            debug!(start = spec.span.start, "declaration arity has no binding form");
            return;
        }
        // Unlike assignments, declarations only destructure calls; lookups and assertions are left alone.
        let ExprKind::Call(call) = &spec.values[0].kind else {
            debug!(start = spec.span.start, "declaration source is not a call");
            return;
        };
        let Some(results) = self.call_results(call, spec.names.len()) else {
            return;
        };
        for (result, name) in results.into_iter().zip(&spec.names) {
            self.emit(
                Shape::Declaration,
                statement,
                Endpoint::Resolved(result),
                Endpoint::Element(Element::Binding(name)),
            );
        }
    }

    fn assign(&mut self, assign: &'a AssignStmt) {
        let (lhs, rhs) = (&assign.lhs, &assign.rhs);
        if lhs.len() == rhs.len() {
            for (target, source) in lhs.iter().zip(rhs) {
                self.emit(Shape::Parallel, assign.span, expr(source), expr(target));
            }
            return;
        }
        if self.pass == Pass::TypeAnnotation || rhs.len() != 1 {
            debug!(start = assign.span.start, "assignment arity has no binding form");
            return;
        }

        let source = &rhs[0];
        match &source.kind {
            ExprKind::Call(call) => {
                let Some(results) = self.call_results(call, lhs.len()) else {
                    return;
                };
                for (result, target) in results.into_iter().zip(lhs) {
                    self.emit(
                        Shape::Destructure,
                        assign.span,
                        Endpoint::Resolved(result),
                        expr(target),
                    );
                }
            }
            // The presence flag is always a boolean and is never checked.
            ExprKind::Index { .. } if lhs.len() == 2 => match self.oracle.tuple_of(source) {
                Some(tuple) if tuple.len() == 2 => {
                    self.emit(
                        Shape::Destructure,
                        assign.span,
                        Endpoint::Resolved(tuple[0]),
                        expr(&lhs[0]),
                    );
                }
                _ => debug!(start = source.span.start, "lookup does not yield a pair"),
            },
            ExprKind::TypeAssert { ty, .. } if lhs.len() == 2 => {
                self.emit(
                    Shape::Destructure,
                    assign.span,
                    Endpoint::Element(Element::TypeSyntax(ty)),
                    expr(&lhs[0]),
                );
            }
            _ => debug!(
                start = assign.span.start,
                targets = lhs.len(),
                "single source cannot be destructured"
            ),
        }
    }

    fn call_results(&self, call: &CallExpr, count: usize) -> Option<Vec<TypeId>> {
        let Some(signature) = self.oracle.signature_of(&call.callee) else {
            debug!(start = call.callee.span.start, "call target has no signature");
            return None;
        };
        if signature.results.len() != count {
            debug!(
                start = call.callee.span.start,
                results = signature.results.len(),
                targets = count,
                "result count does not match targets"
            );
            return None;
        }
        Some(signature.results)
    }

    fn call(&mut self, call: &'a CallExpr, span: Span) {
        let Some(signature) = self.oracle.signature_of(&call.callee) else {
            debug!(start = span.start, "call target has no signature");
            return;
        };
        let args = &call.args;

        if self.pass == Pass::TypeAnnotation {
            if signature.params.len() != args.len() {
                debug!(start = span.start, "argument count differs from parameter count");
                return;
            }
            for (arg, param) in args.iter().zip(&signature.params) {
                self.emit(Shape::CallArguments, span, expr(arg), Endpoint::Resolved(*param));
            }
            return;
        }

        if !signature.variadic {
            for (arg, param) in args.iter().zip(&signature.params) {
                self.emit(Shape::CallArguments, span, expr(arg), Endpoint::Resolved(*param));
            }
            return;
        }

        let Some((&rest, fixed)) = signature.params.split_last() else {
            return;
        };
        for (arg, param) in args.iter().zip(fixed) {
            self.emit(Shape::CallArguments, span, expr(arg), Endpoint::Resolved(*param));
        }
        if args.len() <= fixed.len() {
            return;
        }
        let element = self.oracle.element_type(rest);
        for (idx, arg) in args.iter().enumerate().skip(fixed.len()) {
            // `f(xs...)` passes the sequence itself, so it binds to the parameter's
            // slice type. Binding it to the element type would flag every valid spread.
            let spread = call.spread && idx + 1 == args.len();
            let target = if spread { Some(rest) } else { element };
            match target {
                Some(target) => {
                    self.emit(Shape::CallArguments, span, expr(arg), Endpoint::Resolved(target))
                }
                None => debug!(start = arg.span.start, "variadic parameter has no element type"),
            }
        }
    }

    fn expr(&mut self, value: &'a Expr) {
        match &value.kind {
            ExprKind::Ident(_) | ExprKind::Int(_) | ExprKind::Str(_) | ExprKind::Type(_) => {}
            ExprKind::Paren(inner) => self.expr(inner),
            ExprKind::Call(call) => {
                self.call(call, value.span);
                self.expr(&call.callee);
                for arg in &call.args {
                    self.expr(arg);
                }
            }
            ExprKind::Index { base, indices } => {
                self.expr(base);
                for index in indices {
                    self.expr(index);
                }
            }
            ExprKind::TypeAssert { expr: inner, .. } => self.expr(inner),
            ExprKind::Unary { operand, .. } => self.expr(operand),
            ExprKind::FuncLit { body, .. } => self.block(body),
            ExprKind::Composite { ty, elements } => {
                self.expr(ty);
                for element in elements {
                    if let Some(key) = &element.key {
                        self.expr(key);
                    }
                    self.expr(&element.value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        language::parser::parse_file,
        typeinfo::{resolve_file, TypeInfo},
    };
    use std::{collections::HashSet, path::PathBuf};

    fn shapes(source: &str, pass: Pass) -> Vec<Shape> {
        let file = parse_file(PathBuf::from("a.ph"), source).expect("source parses");
        let info: TypeInfo = resolve_file(&file);
        let mut shapes = Vec::new();
        extract_sites(&file, &info, pass, |site| shapes.push(site.shape));
        shapes
    }

    const EVERY_SHAPE: &str = r#"package a

func pair() (int, string) { return 1, "s" }

func take(n int, rest ...string) {}

func f(m map[int]string) {
	var a, b = pair()
	var c string = "c"
	var d int
	d, _ = pair()
	v, ok := m[1]
	take(d, c, v)
	_, _, _, _ = a, b, d, ok
}
"#;

    #[test]
    fn every_shape_is_produced() {
        let seen: HashSet<Shape> = shapes(EVERY_SHAPE, Pass::Assignable).into_iter().collect();
        for shape in Shape::ALL {
            assert!(seen.contains(&shape), "no {} site was produced", shape.name());
        }
    }

    #[test]
    fn sites_follow_document_order() {
        assert_eq!(
            shapes(EVERY_SHAPE, Pass::Assignable),
            [
                // var a, b = pair()
                Shape::Declaration,
                Shape::Declaration,
                // var c string = "c"
                Shape::Declaration,
                // d, _ = pair()
                Shape::Destructure,
                Shape::Destructure,
                // v, ok := m[1]
                Shape::Destructure,
                // take(d, c, v)
                Shape::CallArguments,
                Shape::CallArguments,
                Shape::CallArguments,
                // _, _, _, _ = a, b, d, ok
                Shape::Parallel,
                Shape::Parallel,
                Shape::Parallel,
                Shape::Parallel,
            ]
        );
    }

    #[test]
    fn type_annotation_pass_only_binds_equal_arity() {
        assert_eq!(
            shapes(EVERY_SHAPE, Pass::TypeAnnotation),
            [
                Shape::Declaration,
                Shape::Parallel,
                Shape::Parallel,
                Shape::Parallel,
                Shape::Parallel,
            ]
        );
    }

    #[test]
    fn declarations_do_not_destructure_lookups() {
        let source = "package a\n\nfunc f(m map[int]string) {\n\tvar v, ok = m[1]\n\t_, _ = v, ok\n}\n";
        assert_eq!(
            shapes(source, Pass::Assignable),
            [Shape::Parallel, Shape::Parallel]
        );
    }

    #[test]
    fn calls_nested_in_function_literals_are_visited() {
        let source = "package a\n\nfunc g(s string) {}\n\nvar h = func() {\n\tg(\"x\")\n}\n";
        assert_eq!(
            shapes(source, Pass::Assignable),
            [Shape::Declaration, Shape::CallArguments]
        );
    }
}
