use super::types::{BasicKind, NamedId, Type, TypeTable};
use crate::audit::oracle::{OriginId, Signature, TypeId};
use crate::language::{
    ast::*,
    span::Span,
    types::{FuncType, Param, TypeExpr, TypeExprKind},
};
use std::collections::HashMap;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct ResolveError {
    pub message: String,
    pub span: Span,
}

/// Everything the resolver learned about one file, keyed by syntax node.
#[derive(Debug)]
pub struct TypeInfo {
    pub table: TypeTable,
    pub(super) exprs: HashMap<NodeId, TypeId>,
    pub(super) bindings: HashMap<NodeId, TypeId>,
    pub(super) type_exprs: HashMap<NodeId, TypeId>,
    pub(super) tuples: HashMap<NodeId, Vec<TypeId>>,
    pub errors: Vec<ResolveError>,
}

/// Resolves every expression, binding and type expression in `file`.
///
/// Problems are collected in [`TypeInfo::errors`]; resolution always runs to the
/// end of the file so that partially invalid programs still get typed where possible.
pub fn resolve_file(file: &File) -> TypeInfo {
    let mut resolver = Resolver::new(file);
    resolver.collect_package_scope();
    resolver.resolve_declarations();
    debug!(
        path = %file.path.display(),
        types = resolver.info.table.len(),
        errors = resolver.info.errors.len(),
        "resolved file"
    );
    resolver.info
}

#[derive(Clone, Copy, Debug)]
enum Entity {
    Value(TypeId),
    Type(TypeId),
    /// A package-level type declaration, resolved on first use.
    Decl(usize),
    Builtin(Builtin),
    /// A name whose declaration failed to resolve; uses stay silent.
    Invalid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Builtin {
    New,
}

#[derive(Clone, Copy, Debug)]
enum DeclState {
    Pending,
    InProgress,
    Done(TypeId),
}

#[derive(Clone, Copy, Debug)]
enum Operand {
    Value(TypeId),
    Type(TypeId),
    Generic(usize),
    Builtin(Builtin),
    NoValue,
    Invalid,
}

struct Resolver<'f> {
    file: &'f File,
    info: TypeInfo,
    universe: HashMap<String, Entity>,
    package: HashMap<String, Entity>,
    locals: Vec<HashMap<String, Entity>>,
    type_decls: Vec<&'f TypeDecl>,
    decl_states: Vec<DeclState>,
    instances: HashMap<(usize, Vec<TypeId>), TypeId>,
    /// Package variable types resolved while collecting the package scope.
    declared_types: HashMap<NodeId, Option<TypeId>>,
}

impl<'f> Resolver<'f> {
    fn new(file: &'f File) -> Self {
        let mut table = TypeTable::new(file.package.name.clone());
        let mut universe = HashMap::new();
        for (name, kind) in [
            ("int", BasicKind::Int),
            ("string", BasicKind::String),
            ("bool", BasicKind::Bool),
        ] {
            universe.insert(name.to_string(), Entity::Type(table.basic(kind)));
        }
        universe.insert("any".into(), Entity::Type(table.intern(Type::Interface)));
        let nil = table.basic(BasicKind::UntypedNil);
        universe.insert("nil".into(), Entity::Value(nil));
        let untyped_bool = table.basic(BasicKind::UntypedBool);
        universe.insert("true".into(), Entity::Value(untyped_bool));
        universe.insert("false".into(), Entity::Value(untyped_bool));
        universe.insert("new".into(), Entity::Builtin(Builtin::New));

        Self {
            file,
            info: TypeInfo {
                table,
                exprs: HashMap::new(),
                bindings: HashMap::new(),
                type_exprs: HashMap::new(),
                tuples: HashMap::new(),
                errors: Vec::new(),
            },
            universe,
            package: HashMap::new(),
            locals: Vec::new(),
            type_decls: Vec::new(),
            decl_states: Vec::new(),
            instances: HashMap::new(),
            declared_types: HashMap::new(),
        }
    }

    fn collect_package_scope(&mut self) {
        let file = self.file;
        for decl in &file.decls {
            if let Decl::Type(ty) = decl {
                let idx = self.type_decls.len();
                self.type_decls.push(ty);
                self.decl_states.push(DeclState::Pending);
                self.declare_package(&ty.name, Entity::Decl(idx));
            }
        }
        for decl in &file.decls {
            if let Decl::Func(func) = decl {
                let entity = match self.signature(&func.ty, true) {
                    Some(sig) => {
                        let ty = self.info.table.intern(Type::Func(sig));
                        self.info.bindings.insert(func.name.id, ty);
                        Entity::Value(ty)
                    }
                    None => Entity::Invalid,
                };
                self.declare_package(&func.name, entity);
            }
        }
        // Explicitly typed package variables are visible before their declaration.
        for decl in &file.decls {
            if let Decl::Var(var) = decl {
                for spec in &var.specs {
                    let Some(ty) = &spec.ty else { continue };
                    let resolved = self.resolve_type(ty, true);
                    self.declared_types.insert(ty.id, resolved);
                    let entity = resolved.map(Entity::Value).unwrap_or(Entity::Invalid);
                    for name in &spec.names {
                        self.declare_package(name, entity);
                    }
                }
            }
        }
    }

    fn resolve_declarations(&mut self) {
        for idx in 0..self.type_decls.len() {
            let decl = self.type_decls[idx];
            if decl.type_params.is_empty() {
                self.decl_type(idx, decl.name.span);
            } else {
                for param in &decl.type_params {
                    self.resolve_type(&param.constraint, true);
                }
            }
        }
        // Package variables are typed before any function body reads them.
        let file = self.file;
        for decl in &file.decls {
            if let Decl::Var(var) = decl {
                self.var_decl(var);
            }
        }
        for decl in &file.decls {
            if let Decl::Func(func) = decl {
                let sig = self.info.bindings.get(&func.name.id).and_then(|ty| {
                    match self.info.table.get(*ty) {
                        Type::Func(sig) => Some(sig.clone()),
                        _ => None,
                    }
                });
                self.func_body(&func.ty, sig.as_ref(), &func.body);
            }
        }
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        let message = message.into();
        debug!(start = span.start, %message, "resolve error");
        self.info.errors.push(ResolveError { message, span });
    }

    fn declare_package(&mut self, name: &Ident, entity: Entity) {
        if name.is_blank() {
            return;
        }
        if self.package.insert(name.name.clone(), entity).is_some() {
            self.error(name.span, format!("{} redeclared in this block", name.name));
        }
    }

    fn declare(&mut self, name: &str, entity: Entity) {
        if name == "_" {
            return;
        }
        match self.locals.last_mut() {
            Some(scope) => {
                scope.insert(name.to_string(), entity);
            }
            None => {
                self.package.insert(name.to_string(), entity);
            }
        }
    }

    fn declared_in_current_scope(&self, name: &str) -> bool {
        match self.locals.last() {
            Some(scope) => scope.contains_key(name),
            None => self.package.contains_key(name),
        }
    }

    fn lookup(&self, name: &str) -> Option<Entity> {
        self.locals
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.package.get(name))
            .or_else(|| self.universe.get(name))
            .copied()
    }

    /// Resolves a non-generic type declaration, caching the result.
    fn decl_type(&mut self, idx: usize, use_span: Span) -> Option<TypeId> {
        match self.decl_states[idx] {
            DeclState::Done(ty) => return Some(ty),
            DeclState::InProgress => {
                let name = self.type_decls[idx].name.name.clone();
                self.error(use_span, format!("invalid recursive type {name}"));
                return None;
            }
            DeclState::Pending => {}
        }
        let decl = self.type_decls[idx];
        if !decl.type_params.is_empty() {
            self.error(
                use_span,
                format!(
                    "cannot use generic type {} without instantiation",
                    decl.name.name
                ),
            );
            return None;
        }

        self.decl_states[idx] = DeclState::InProgress;
        let saved = std::mem::take(&mut self.locals);
        let actual = self.resolve_type(&decl.ty, true);
        self.locals = saved;

        let Some(actual) = actual else {
            self.decl_states[idx] = DeclState::Pending;
            return None;
        };
        let ty = if decl.alias {
            Type::Alias {
                name: decl.name.name.clone(),
                origin: OriginId(idx as u32),
                args: Vec::new(),
                actual,
            }
        } else {
            Type::Named {
                name: decl.name.name.clone(),
                id: NamedId(idx as u32),
                underlying: self.info.table.underlying(actual),
            }
        };
        let ty = self.info.table.intern(ty);
        self.decl_states[idx] = DeclState::Done(ty);
        Some(ty)
    }

    fn instantiate(&mut self, idx: usize, args: Vec<TypeId>, span: Span) -> Option<TypeId> {
        let decl = self.type_decls[idx];
        if decl.type_params.is_empty() {
            self.error(span, format!("{} is not a generic type", decl.name.name));
            return None;
        }
        if !decl.alias {
            self.error(
                span,
                format!("generic defined type {} is not supported", decl.name.name),
            );
            return None;
        }
        if args.len() != decl.type_params.len() {
            let qualifier = if args.len() < decl.type_params.len() {
                "not enough"
            } else {
                "too many"
            };
            self.error(
                span,
                format!(
                    "{qualifier} type arguments for type {}: have {}, want {}",
                    decl.name.name,
                    args.len(),
                    decl.type_params.len()
                ),
            );
            return None;
        }
        let key = (idx, args);
        if let Some(ty) = self.instances.get(&key) {
            return Some(*ty);
        }

        let scope: HashMap<String, Entity> = decl
            .type_params
            .iter()
            .zip(&key.1)
            .map(|(param, arg)| (param.name.name.clone(), Entity::Type(*arg)))
            .collect();
        let saved = std::mem::replace(&mut self.locals, vec![scope]);
        let actual = self.resolve_type(&decl.ty, false);
        self.locals = saved;

        let actual = actual?;
        let ty = self.info.table.intern(Type::Alias {
            name: decl.name.name.clone(),
            origin: OriginId(idx as u32),
            args: key.1.clone(),
            actual,
        });
        self.instances.insert(key, ty);
        Some(ty)
    }

    fn resolve_type(&mut self, expr: &TypeExpr, record: bool) -> Option<TypeId> {
        let ty = match &expr.kind {
            TypeExprKind::Named(name, args) => match self.lookup(name) {
                Some(Entity::Type(ty)) => {
                    if !args.is_empty() {
                        self.error(expr.span, format!("{name} is not a generic type"));
                        return None;
                    }
                    ty
                }
                Some(Entity::Decl(idx)) => {
                    if args.is_empty() {
                        self.decl_type(idx, expr.span)?
                    } else {
                        let resolved: Option<Vec<TypeId>> = args
                            .iter()
                            .map(|arg| self.resolve_type(arg, record))
                            .collect();
                        self.instantiate(idx, resolved?, expr.span)?
                    }
                }
                Some(Entity::Invalid) => return None,
                Some(_) => {
                    self.error(expr.span, format!("{name} is not a type"));
                    return None;
                }
                None => {
                    self.error(expr.span, format!("undefined: {name}"));
                    return None;
                }
            },
            TypeExprKind::Pointer(inner) => {
                let inner = self.resolve_type(inner, record)?;
                self.info.table.intern(Type::Pointer(inner))
            }
            TypeExprKind::Slice(elem) => {
                let elem = self.resolve_type(elem, record)?;
                self.info.table.intern(Type::Slice(elem))
            }
            TypeExprKind::Map { key, value } => {
                let key = self.resolve_type(key, record)?;
                let value = self.resolve_type(value, record)?;
                self.info.table.intern(Type::Map { key, value })
            }
            TypeExprKind::Func(func) => {
                let sig = self.signature(func, record)?;
                self.info.table.intern(Type::Func(sig))
            }
            TypeExprKind::Interface => self.info.table.intern(Type::Interface),
        };
        if record {
            self.info.type_exprs.insert(expr.id, ty);
        }
        Some(ty)
    }

    fn param_types(&mut self, func: &FuncType, record: bool) -> Option<Vec<TypeId>> {
        let last = func.params.len().saturating_sub(1);
        let mut params = Vec::with_capacity(func.params.len());
        for (idx, param) in func.params.iter().enumerate() {
            let ty = self.resolve_type(&param.ty, record)?;
            if func.variadic && idx == last {
                params.push(self.info.table.intern(Type::Slice(ty)));
            } else {
                params.push(ty);
            }
        }
        Some(params)
    }

    fn signature(&mut self, func: &FuncType, record: bool) -> Option<Signature> {
        let params = self.param_types(func, record);
        let results: Option<Vec<TypeId>> = func
            .results
            .iter()
            .map(|result| self.resolve_type(&result.ty, record))
            .collect();
        Some(Signature {
            params: params?,
            variadic: func.variadic,
            results: results?,
        })
    }

    fn func_body(&mut self, func: &FuncType, sig: Option<&Signature>, body: &Block) {
        self.locals.push(HashMap::new());
        for (idx, param) in func.params.iter().enumerate() {
            self.bind_param(param, sig.map(|sig| sig.params[idx]));
        }
        for (idx, result) in func.results.iter().enumerate() {
            self.bind_param(result, sig.map(|sig| sig.results[idx]));
        }
        for statement in &body.statements {
            self.statement(statement);
        }
        self.locals.pop();
    }

    fn bind_param(&mut self, param: &Param, ty: Option<TypeId>) {
        let Some(name) = &param.name else { return };
        let entity = match ty {
            Some(ty) => {
                self.info.bindings.insert(name.id, ty);
                Entity::Value(ty)
            }
            None => Entity::Invalid,
        };
        self.declare(&name.name, entity);
    }

    fn block(&mut self, block: &Block) {
        self.locals.push(HashMap::new());
        for statement in &block.statements {
            self.statement(statement);
        }
        self.locals.pop();
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Var(decl) => self.var_decl(decl),
            Statement::Assign(assign) => self.assign(assign),
            Statement::Return(ret) => {
                for value in &ret.values {
                    self.operand(value);
                }
            }
            Statement::Expr(expr) => {
                self.operand(expr);
            }
            Statement::Block(block) => self.block(block),
        }
    }

    fn var_decl(&mut self, decl: &VarDecl) {
        for spec in &decl.specs {
            self.var_spec(spec);
        }
    }

    fn var_spec(&mut self, spec: &VarSpec) {
        let count = spec.names.len();
        let declared = match &spec.ty {
            Some(ty) => match self.declared_types.remove(&ty.id) {
                Some(resolved) => resolved,
                None => self.resolve_type(ty, true),
            },
            None => None,
        };
        let explicit = spec.ty.is_some();
        let value_types = self.bind_values(&spec.values, count, spec.span);
        for (name, value) in spec.names.iter().zip(value_types) {
            let ty = if explicit {
                declared
            } else {
                value.and_then(|value| self.default_type(value, name.span))
            };
            let entity = match ty {
                Some(ty) => {
                    self.info.bindings.insert(name.id, ty);
                    Entity::Value(ty)
                }
                None => Entity::Invalid,
            };
            self.declare(&name.name, entity);
        }
    }

    /// Types the right-hand side of a binding with `count` targets, one entry per target.
    fn bind_values(&mut self, values: &[Expr], count: usize, span: Span) -> Vec<Option<TypeId>> {
        if values.is_empty() {
            return vec![None; count];
        }
        if values.len() == count {
            return values.iter().map(|value| self.single_value(value)).collect();
        }
        if values.len() == 1 {
            return match self.multi_value(&values[0], count) {
                Some(types) => types.into_iter().map(Some).collect(),
                None => vec![None; count],
            };
        }
        for value in values {
            self.operand(value);
        }
        self.error(
            span,
            format!(
                "assignment mismatch: {count} variables but {} values",
                values.len()
            ),
        );
        vec![None; count]
    }

    fn multi_value(&mut self, expr: &Expr, count: usize) -> Option<Vec<TypeId>> {
        if count == 2 {
            if let Some(tuple) = self.comma_ok(expr) {
                return Some(tuple);
            }
        }
        let ty = self.value(expr)?;
        match self.info.table.get(ty) {
            Type::Tuple(items) if items.len() == count => Some(items.clone()),
            Type::Tuple(items) => {
                let have = items.len();
                self.error(
                    expr.span,
                    format!("assignment mismatch: {count} variables but call returns {have} values"),
                );
                None
            }
            _ => {
                self.error(
                    expr.span,
                    format!("assignment mismatch: {count} variables but 1 value"),
                );
                None
            }
        }
    }

    /// `m[k]` on a map and `x.(T)` yield an extra presence flag when two targets receive them.
    fn comma_ok(&mut self, expr: &Expr) -> Option<Vec<TypeId>> {
        let is_candidate = match &expr.kind {
            ExprKind::Index { base, .. } => {
                // Generic instantiations also parse as index expressions.
                !matches!(base.as_ident().and_then(|name| self.lookup(name)), Some(Entity::Decl(_)))
            }
            ExprKind::TypeAssert { .. } => true,
            _ => false,
        };
        if !is_candidate {
            return None;
        }
        let value = self.single_value(expr)?;
        if let ExprKind::Index { base, .. } = &expr.kind {
            let base_ty = self.info.exprs.get(&base.id).copied()?;
            let under = self.info.table.underlying(base_ty);
            if !matches!(self.info.table.get(under), Type::Map { .. }) {
                self.error(
                    expr.span,
                    "assignment mismatch: 2 variables but 1 value",
                );
                return None;
            }
        }
        let flag = self.info.table.basic(BasicKind::Bool);
        let tuple = vec![value, flag];
        self.info.tuples.insert(expr.id, tuple.clone());
        Some(tuple)
    }

    fn assign(&mut self, assign: &AssignStmt) {
        let values = self.bind_values(&assign.rhs, assign.lhs.len(), assign.span);
        if !assign.define {
            for target in &assign.lhs {
                if target.as_ident() == Some("_") {
                    continue;
                }
                self.single_value(target);
            }
            return;
        }

        let mut fresh = false;
        for (target, value) in assign.lhs.iter().zip(values) {
            let Some(name) = target.as_ident() else { continue };
            if name == "_" {
                continue;
            }
            if self.declared_in_current_scope(name) {
                self.single_value(target);
                continue;
            }
            fresh = true;
            let ty = value.and_then(|value| self.default_type(value, target.span));
            match ty {
                Some(ty) => {
                    self.info.exprs.insert(target.id, ty);
                    self.declare(name, Entity::Value(ty));
                }
                None => self.declare(name, Entity::Invalid),
            }
        }
        if !fresh {
            self.error(assign.span, "no new variables on left side of :=");
        }
    }

    fn default_type(&mut self, ty: TypeId, span: Span) -> Option<TypeId> {
        match self.info.table.basic_kind(ty) {
            Some(kind) if kind.is_untyped() => match kind.default_kind() {
                Some(kind) => Some(self.info.table.basic(kind)),
                None => {
                    self.error(span, "use of untyped nil in variable declaration");
                    None
                }
            },
            _ => Some(ty),
        }
    }

    fn value(&mut self, expr: &Expr) -> Option<TypeId> {
        match self.operand(expr) {
            Operand::Value(ty) => Some(ty),
            Operand::Type(ty) => {
                let rendered = self.info.table.display(ty);
                self.error(expr.span, format!("{rendered} (type) is not an expression"));
                None
            }
            Operand::Generic(idx) => {
                let name = self.type_decls[idx].name.name.clone();
                self.error(
                    expr.span,
                    format!("cannot use generic type {name} without instantiation"),
                );
                None
            }
            Operand::Builtin(_) => {
                self.error(expr.span, "builtin must be called");
                None
            }
            Operand::NoValue => {
                self.error(expr.span, "call (no value) used as value");
                None
            }
            Operand::Invalid => None,
        }
    }

    fn single_value(&mut self, expr: &Expr) -> Option<TypeId> {
        let ty = self.value(expr)?;
        if self.info.table.is_tuple(ty) {
            self.error(expr.span, "multiple-value call in single-value context");
            return None;
        }
        Some(ty)
    }

    fn as_type(&mut self, expr: &Expr) -> Option<TypeId> {
        match self.operand(expr) {
            Operand::Type(ty) => Some(ty),
            Operand::Invalid => None,
            _ => {
                self.error(expr.span, "expected a type");
                None
            }
        }
    }

    fn operand(&mut self, expr: &Expr) -> Operand {
        let result = self.operand_kind(expr);
        if let Operand::Value(ty) = result {
            self.info.exprs.insert(expr.id, ty);
        }
        result
    }

    fn operand_kind(&mut self, expr: &Expr) -> Operand {
        match &expr.kind {
            ExprKind::Ident(name) => self.ident(name, expr.span),
            ExprKind::Int(_) => Operand::Value(self.info.table.basic(BasicKind::UntypedInt)),
            ExprKind::Str(_) => Operand::Value(self.info.table.basic(BasicKind::UntypedString)),
            ExprKind::Paren(inner) => self.operand(inner),
            ExprKind::Call(call) => self.call(call, expr.span),
            ExprKind::Index { base, indices } => self.index(base, indices, expr.span),
            ExprKind::TypeAssert { expr: inner, ty } => {
                let value = self.single_value(inner);
                let asserted = self.resolve_type(ty, true);
                if let Some(value) = value {
                    let under = self.info.table.underlying(value);
                    if !matches!(self.info.table.get(under), Type::Interface) {
                        let rendered = self.info.table.display(value);
                        self.error(
                            inner.span,
                            format!("invalid operation: {rendered} is not an interface"),
                        );
                    }
                }
                asserted.map(Operand::Value).unwrap_or(Operand::Invalid)
            }
            ExprKind::Unary { op, operand } => self.unary(*op, operand, expr.span),
            ExprKind::FuncLit { ty, body } => {
                let sig = self.signature(ty, true);
                self.func_body(ty, sig.as_ref(), body);
                match sig {
                    Some(sig) => Operand::Value(self.info.table.intern(Type::Func(sig))),
                    None => Operand::Invalid,
                }
            }
            ExprKind::Composite { ty, elements } => self.composite(ty, elements),
            ExprKind::Type(ty) => self
                .resolve_type(ty, true)
                .map(Operand::Type)
                .unwrap_or(Operand::Invalid),
        }
    }

    fn ident(&mut self, name: &str, span: Span) -> Operand {
        if name == "_" {
            self.error(span, "cannot use _ as value");
            return Operand::Invalid;
        }
        match self.lookup(name) {
            Some(Entity::Value(ty)) => Operand::Value(ty),
            Some(Entity::Type(ty)) => Operand::Type(ty),
            Some(Entity::Decl(idx)) => {
                if self.type_decls[idx].type_params.is_empty() {
                    self.decl_type(idx, span)
                        .map(Operand::Type)
                        .unwrap_or(Operand::Invalid)
                } else {
                    Operand::Generic(idx)
                }
            }
            Some(Entity::Builtin(builtin)) => Operand::Builtin(builtin),
            Some(Entity::Invalid) => Operand::Invalid,
            None => {
                self.error(span, format!("undefined: {name}"));
                Operand::Invalid
            }
        }
    }

    fn visit_args(&mut self, args: &[Expr]) {
        for arg in args {
            self.operand(arg);
        }
    }

    fn call(&mut self, call: &CallExpr, span: Span) -> Operand {
        match self.operand(&call.callee) {
            Operand::Type(target) => {
                if call.args.len() != 1 {
                    self.visit_args(&call.args);
                    let rendered = self.info.table.display(target);
                    self.error(span, format!("conversion to {rendered} needs exactly one argument"));
                    return Operand::Invalid;
                }
                if let Some(value) = self.single_value(&call.args[0]) {
                    let table = &self.info.table;
                    let convertible = table.assignable(value, target)
                        || table.identical(table.underlying(value), table.underlying(target));
                    if !convertible {
                        let message = format!(
                            "cannot convert {} to type {}",
                            table.display(value),
                            table.display(target)
                        );
                        self.error(span, message);
                    }
                }
                Operand::Value(target)
            }
            Operand::Builtin(Builtin::New) => {
                if call.args.len() != 1 {
                    self.visit_args(&call.args);
                    self.error(span, "new expects exactly one type argument");
                    return Operand::Invalid;
                }
                match self.as_type(&call.args[0]) {
                    Some(ty) => Operand::Value(self.info.table.intern(Type::Pointer(ty))),
                    None => Operand::Invalid,
                }
            }
            Operand::Value(callee) => {
                self.visit_args(&call.args);
                let under = self.info.table.underlying(callee);
                let Type::Func(sig) = self.info.table.get(under).clone() else {
                    let rendered = self.info.table.display(callee);
                    self.error(span, format!("invalid operation: cannot call non-function of type {rendered}"));
                    return Operand::Invalid;
                };
                if call.spread && !sig.variadic {
                    self.error(span, "cannot use ... in call to non-variadic function");
                }
                match sig.results.as_slice() {
                    [] => Operand::NoValue,
                    [single] => Operand::Value(*single),
                    many => Operand::Value(self.info.table.intern(Type::Tuple(many.to_vec()))),
                }
            }
            Operand::Generic(idx) => {
                self.visit_args(&call.args);
                let name = self.type_decls[idx].name.name.clone();
                self.error(span, format!("cannot use generic type {name} without instantiation"));
                Operand::Invalid
            }
            Operand::NoValue => {
                self.visit_args(&call.args);
                self.error(span, "call (no value) used as value");
                Operand::Invalid
            }
            Operand::Invalid => {
                self.visit_args(&call.args);
                Operand::Invalid
            }
        }
    }

    fn index(&mut self, base: &Expr, indices: &[Expr], span: Span) -> Operand {
        match self.operand(base) {
            Operand::Generic(idx) => {
                let args: Option<Vec<TypeId>> =
                    indices.iter().map(|index| self.as_type(index)).collect();
                match args {
                    Some(args) => self
                        .instantiate(idx, args, span)
                        .map(Operand::Type)
                        .unwrap_or(Operand::Invalid),
                    None => Operand::Invalid,
                }
            }
            Operand::Value(ty) => {
                let index_types: Vec<Option<TypeId>> =
                    indices.iter().map(|index| self.single_value(index)).collect();
                if indices.len() != 1 {
                    self.error(span, "unexpected comma; expecting ]");
                    return Operand::Invalid;
                }
                let under = self.info.table.underlying(ty);
                match self.info.table.get(under).clone() {
                    Type::Map { key, value } => {
                        if let Some(index) = index_types[0] {
                            if !self.info.table.assignable(index, key) {
                                let message = format!(
                                    "cannot use {} as {} value in map index",
                                    self.info.table.display(index),
                                    self.info.table.display(key)
                                );
                                self.error(indices[0].span, message);
                            }
                        }
                        Operand::Value(value)
                    }
                    Type::Slice(elem) => Operand::Value(elem),
                    _ => {
                        let rendered = self.info.table.display(ty);
                        self.error(span, format!("invalid operation: cannot index {rendered}"));
                        Operand::Invalid
                    }
                }
            }
            Operand::Type(ty) => {
                let rendered = self.info.table.display(ty);
                self.error(span, format!("{rendered} is not a generic type"));
                Operand::Invalid
            }
            Operand::Invalid => Operand::Invalid,
            Operand::Builtin(_) | Operand::NoValue => {
                self.error(span, "invalid operation: cannot index expression");
                Operand::Invalid
            }
        }
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr, span: Span) -> Operand {
        match (op, self.operand(operand)) {
            (UnaryOp::Deref, Operand::Type(ty)) => {
                Operand::Type(self.info.table.intern(Type::Pointer(ty)))
            }
            (UnaryOp::Deref, Operand::Value(ty)) => {
                let under = self.info.table.underlying(ty);
                match self.info.table.get(under) {
                    Type::Pointer(elem) => Operand::Value(*elem),
                    _ => {
                        let rendered = self.info.table.display(ty);
                        self.error(span, format!("invalid operation: cannot indirect value of type {rendered}"));
                        Operand::Invalid
                    }
                }
            }
            (UnaryOp::AddrOf, Operand::Value(ty)) => {
                if self.info.table.basic_kind(ty).map(BasicKind::is_untyped).unwrap_or(false) {
                    self.error(span, "invalid operation: cannot take address of constant");
                    return Operand::Invalid;
                }
                Operand::Value(self.info.table.intern(Type::Pointer(ty)))
            }
            (_, Operand::Invalid) => Operand::Invalid,
            _ => {
                self.error(span, "invalid operand for unary operator");
                Operand::Invalid
            }
        }
    }

    fn composite(&mut self, ty: &Expr, elements: &[KeyedElement]) -> Operand {
        let Some(literal) = self.as_type(ty) else {
            for element in elements {
                if let Some(key) = &element.key {
                    self.operand(key);
                }
                self.operand(&element.value);
            }
            return Operand::Invalid;
        };
        let under = self.info.table.underlying(literal);
        let keyed = match self.info.table.get(under) {
            Type::Map { .. } => true,
            Type::Slice(_) => false,
            _ => {
                let rendered = self.info.table.display(literal);
                self.error(ty.span, format!("invalid composite literal type {rendered}"));
                false
            }
        };
        for element in elements {
            match (&element.key, keyed) {
                (Some(key), true) => {
                    self.single_value(key);
                }
                (None, true) => self.error(element.value.span, "missing key in map literal"),
                (Some(key), false) => {
                    self.single_value(key);
                }
                (None, false) => {}
            }
            self.single_value(&element.value);
        }
        Operand::Value(literal)
    }
}
