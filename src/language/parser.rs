use crate::language::{
    ast::*,
    errors::{SyntaxError, SyntaxErrors},
    lexer::lex,
    span::Span,
    token::{Token, TokenKind},
    types::{FuncType, Param, TypeExpr, TypeExprKind},
};
use std::path::PathBuf;

pub fn parse_file(path: PathBuf, source: &str) -> Result<File, SyntaxErrors> {
    let tokens = match lex(source) {
        Ok(tokens) => tokens,
        Err(errors) => {
            let errs = errors
                .into_iter()
                .map(|err| SyntaxError::new(err.message, err.span))
                .collect();
            return Err(SyntaxErrors::new(errs));
        }
    };
    Parser::new(path, tokens).parse()
}

struct Parser {
    path: PathBuf,
    tokens: Vec<Token>,
    pos: usize,
    next_id: u32,
    errors: Vec<SyntaxError>,
}

/// One entry of a parenthesised parameter list before name grouping is applied.
struct ParamEntry {
    name: Option<Ident>,
    ty: TypeExpr,
    variadic: bool,
}

impl Parser {
    fn new(path: PathBuf, tokens: Vec<Token>) -> Self {
        Self {
            path,
            tokens,
            pos: 0,
            next_id: 0,
            errors: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<File, SyntaxErrors> {
        self.skip_terminators();
        let package = match self.parse_package_clause() {
            Ok(package) => package,
            Err(err) => return Err(SyntaxErrors::new(vec![err])),
        };

        let mut decls = Vec::new();
        while !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            match self.parse_decl() {
                Ok(decl) => decls.push(decl),
                Err(err) => {
                    self.report(err);
                    self.synchronize_decl();
                }
            }
        }

        if self.errors.is_empty() {
            Ok(File {
                package,
                path: self.path,
                decls,
            })
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }

    fn parse_package_clause(&mut self) -> Result<Ident, SyntaxError> {
        if !self.matches(TokenKind::Package) {
            return Err(self
                .error_here("Expected package clause")
                .with_help("every file starts with `package <name>`"));
        }
        let name = self.expect_identifier("Expected package name")?;
        self.expect_terminator()?;
        Ok(name)
    }

    fn parse_decl(&mut self) -> Result<Decl, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Type) => self.parse_type_decl().map(Decl::Type),
            Some(TokenKind::Func) => self.parse_func_decl().map(Decl::Func),
            Some(TokenKind::Var) => {
                let decl = self.parse_var_decl()?;
                self.expect_terminator()?;
                Ok(Decl::Var(decl))
            }
            _ => Err(self.error_here("Expected `type`, `func` or `var` declaration")),
        }
    }

    fn parse_type_decl(&mut self) -> Result<TypeDecl, SyntaxError> {
        let start = self.expect(TokenKind::Type)?.span.start;
        let name = self.expect_identifier("Expected type name")?;
        let mut type_params = Vec::new();
        // `type S []int` declares a slice type; `type A[T any]` opens a parameter list.
        if self.check(TokenKind::LBracket) && self.peek_kind_n(1) != Some(TokenKind::RBracket) {
            self.advance();
            type_params = self.parse_type_params()?;
            self.expect(TokenKind::RBracket)?;
        }
        let alias = self.matches(TokenKind::Eq);
        let ty = self.parse_type()?;
        let end = ty.span.end;
        self.expect_terminator()?;
        Ok(TypeDecl {
            name,
            type_params,
            alias,
            ty,
            span: Span::new(start, end),
        })
    }

    fn parse_type_params(&mut self) -> Result<Vec<TypeParam>, SyntaxError> {
        let mut pending: Vec<Ident> = Vec::new();
        let mut params = Vec::new();
        loop {
            let name = self.expect_identifier("Expected type parameter name")?;
            pending.push(name);
            if self.matches(TokenKind::Comma) {
                continue;
            }
            let constraint = self.parse_type()?;
            for name in pending.drain(..) {
                params.push(TypeParam {
                    name,
                    constraint: constraint.clone(),
                });
            }
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_func_decl(&mut self) -> Result<FuncDecl, SyntaxError> {
        let start = self.expect(TokenKind::Func)?.span.start;
        let name = self.expect_identifier("Expected function name")?;
        let ty = self.parse_signature(start)?;
        let body = self.parse_block()?;
        let span = Span::new(start, body.span.end);
        self.expect_terminator()?;
        Ok(FuncDecl {
            name,
            ty,
            body,
            span,
        })
    }

    fn parse_var_decl(&mut self) -> Result<VarDecl, SyntaxError> {
        let start = self.expect(TokenKind::Var)?.span.start;
        let mut specs = Vec::new();
        if self.matches(TokenKind::LParen) {
            while !self.check(TokenKind::RParen) && !self.is_eof() {
                if self.matches(TokenKind::Semi) {
                    continue;
                }
                specs.push(self.parse_var_spec()?);
                if !self.check(TokenKind::RParen) {
                    self.expect_terminator()?;
                }
            }
            self.expect(TokenKind::RParen)?;
        } else {
            specs.push(self.parse_var_spec()?);
        }
        let end = self.last_span_end(start);
        Ok(VarDecl {
            specs,
            span: Span::new(start, end),
        })
    }

    fn parse_var_spec(&mut self) -> Result<VarSpec, SyntaxError> {
        let start = self.current_span_start();
        let mut names = vec![self.expect_identifier("Expected variable name")?];
        while self.matches(TokenKind::Comma) {
            names.push(self.expect_identifier("Expected variable name")?);
        }
        let ty = if self.check(TokenKind::Eq) || self.at_terminator() {
            None
        } else {
            Some(self.parse_type()?)
        };
        let values = if self.matches(TokenKind::Eq) {
            self.parse_expression_list()?
        } else {
            Vec::new()
        };
        if ty.is_none() && values.is_empty() {
            return Err(self.error_here("Expected type or initializer in variable declaration"));
        }
        let end = self.last_span_end(start);
        Ok(VarSpec {
            names,
            ty,
            values,
            span: Span::new(start, end),
        })
    }

    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        let start = self.expect(TokenKind::LBrace)?.span.start;
        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            statements.push(self.parse_statement()?);
            if !self.check(TokenKind::RBrace) {
                self.expect_terminator()?;
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span.end;
        Ok(Block {
            statements,
            span: Span::new(start, end),
        })
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Var) => self.parse_var_decl().map(Statement::Var),
            Some(TokenKind::Return) => {
                let start = self.advance().span.start;
                let values = if self.at_terminator() || self.check(TokenKind::RBrace) {
                    Vec::new()
                } else {
                    self.parse_expression_list()?
                };
                let end = self.last_span_end(start);
                Ok(Statement::Return(ReturnStmt {
                    values,
                    span: Span::new(start, end),
                }))
            }
            Some(TokenKind::LBrace) => self.parse_block().map(Statement::Block),
            _ => self.parse_simple_statement(),
        }
    }

    fn parse_simple_statement(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.current_span_start();
        let mut lhs = self.parse_expression_list()?;
        let define = if self.matches(TokenKind::ColonEq) {
            true
        } else if self.matches(TokenKind::Eq) {
            false
        } else {
            if lhs.len() != 1 {
                return Err(self.error_here("Expected `=` or `:=` after expression list"));
            }
            return Ok(Statement::Expr(lhs.remove(0)));
        };
        if define {
            if let Some(bad) = lhs.iter().find(|expr| expr.as_ident().is_none()) {
                return Err(SyntaxError::new(
                    "Non-name on left side of `:=`",
                    bad.span,
                ));
            }
        }
        let rhs = self.parse_expression_list()?;
        let end = self.last_span_end(start);
        Ok(Statement::Assign(AssignStmt {
            lhs,
            rhs,
            define,
            span: Span::new(start, end),
        }))
    }

    fn parse_expression_list(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut exprs = vec![self.parse_expression()?];
        while self.matches(TokenKind::Comma) {
            exprs.push(self.parse_expression()?);
        }
        Ok(exprs)
    }

    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_unary()
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek_kind() {
            Some(TokenKind::Star) => UnaryOp::Deref,
            Some(TokenKind::Ampersand) => UnaryOp::AddrOf,
            _ => return self.parse_postfix(),
        };
        let start = self.advance().span.start;
        let operand = self.parse_unary()?;
        let span = Span::new(start, operand.span.end);
        Ok(self.node(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_operand()?;
        loop {
            match self.peek_kind() {
                Some(TokenKind::LParen) => {
                    self.advance();
                    let (args, spread) = self.parse_call_arguments()?;
                    let end = self.expect(TokenKind::RParen)?.span.end;
                    let span = Span::new(expr.span.start, end);
                    expr = self.node(
                        ExprKind::Call(CallExpr {
                            callee: Box::new(expr),
                            args,
                            spread,
                        }),
                        span,
                    );
                }
                Some(TokenKind::LBracket) => {
                    self.advance();
                    let indices = self.parse_expression_list()?;
                    let end = self.expect(TokenKind::RBracket)?.span.end;
                    let span = Span::new(expr.span.start, end);
                    expr = self.node(
                        ExprKind::Index {
                            base: Box::new(expr),
                            indices,
                        },
                        span,
                    );
                }
                Some(TokenKind::Dot) => {
                    self.advance();
                    self.expect(TokenKind::LParen)
                        .map_err(|err| err.with_help("only type assertions `x.(T)` follow a `.`"))?;
                    let ty = self.parse_type()?;
                    let end = self.expect(TokenKind::RParen)?.span.end;
                    let span = Span::new(expr.span.start, end);
                    expr = self.node(
                        ExprKind::TypeAssert {
                            expr: Box::new(expr),
                            ty,
                        },
                        span,
                    );
                }
                Some(TokenKind::LBrace) if denotes_type_syntax(&expr) => {
                    expr = self.parse_composite(expr)?;
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_call_arguments(&mut self) -> Result<(Vec<Expr>, bool), SyntaxError> {
        let mut args = Vec::new();
        let mut spread = false;
        while !self.check(TokenKind::RParen) && !self.is_eof() {
            args.push(self.parse_expression()?);
            if self.matches(TokenKind::Ellipsis) {
                spread = true;
                self.consume_optional(TokenKind::Comma);
                break;
            }
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        Ok((args, spread))
    }

    fn parse_composite(&mut self, ty: Expr) -> Result<Expr, SyntaxError> {
        self.expect(TokenKind::LBrace)?;
        let mut elements = Vec::new();
        loop {
            self.skip_terminators();
            if self.check(TokenKind::RBrace) || self.is_eof() {
                break;
            }
            let first = self.parse_expression()?;
            let element = if self.matches(TokenKind::Colon) {
                KeyedElement {
                    key: Some(first),
                    value: self.parse_expression()?,
                }
            } else {
                KeyedElement {
                    key: None,
                    value: first,
                }
            };
            elements.push(element);
            self.skip_terminators();
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.skip_terminators();
        let end = self.expect(TokenKind::RBrace)?.span.end;
        let span = Span::new(ty.span.start, end);
        Ok(self.node(
            ExprKind::Composite {
                ty: Box::new(ty),
                elements,
            },
            span,
        ))
    }

    fn parse_operand(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Identifier(name)) => {
                let span = self.advance().span;
                Ok(self.node(ExprKind::Ident(name), span))
            }
            Some(TokenKind::Integer(value)) => {
                let span = self.advance().span;
                Ok(self.node(ExprKind::Int(value), span))
            }
            Some(TokenKind::String(value)) => {
                let span = self.advance().span;
                Ok(self.node(ExprKind::Str(value), span))
            }
            Some(TokenKind::LParen) => {
                let start = self.advance().span.start;
                let inner = self.parse_expression()?;
                let end = self.expect(TokenKind::RParen)?.span.end;
                Ok(self.node(ExprKind::Paren(Box::new(inner)), Span::new(start, end)))
            }
            Some(TokenKind::Func) => {
                let start = self.advance().span.start;
                let ty = self.parse_signature(start)?;
                if self.check(TokenKind::LBrace) {
                    let body = self.parse_block()?;
                    let span = Span::new(start, body.span.end);
                    Ok(self.node(ExprKind::FuncLit { ty, body }, span))
                } else {
                    let span = ty.span;
                    let ty = TypeExpr {
                        id: self.fresh_id(),
                        kind: TypeExprKind::Func(ty),
                        span,
                    };
                    Ok(self.node(ExprKind::Type(ty), span))
                }
            }
            Some(TokenKind::LBracket | TokenKind::Map | TokenKind::Interface) => {
                let ty = self.parse_type()?;
                let span = ty.span;
                Ok(self.node(ExprKind::Type(ty), span))
            }
            _ => Err(self.error_here("Expected expression")),
        }
    }

    fn parse_type(&mut self) -> Result<TypeExpr, SyntaxError> {
        let start = self.current_span_start();
        let kind = match self.peek_kind() {
            Some(TokenKind::Identifier(name)) => {
                self.advance();
                let mut args = Vec::new();
                if self.matches(TokenKind::LBracket) {
                    args.push(self.parse_type()?);
                    while self.matches(TokenKind::Comma) {
                        args.push(self.parse_type()?);
                    }
                    self.expect(TokenKind::RBracket)?;
                }
                TypeExprKind::Named(name, args)
            }
            Some(TokenKind::Star) => {
                self.advance();
                TypeExprKind::Pointer(Box::new(self.parse_type()?))
            }
            Some(TokenKind::LBracket) => {
                self.advance();
                self.expect(TokenKind::RBracket)
                    .map_err(|err| err.with_help("only slice types `[]T` are supported"))?;
                TypeExprKind::Slice(Box::new(self.parse_type()?))
            }
            Some(TokenKind::Map) => {
                self.advance();
                self.expect(TokenKind::LBracket)?;
                let key = self.parse_type()?;
                self.expect(TokenKind::RBracket)?;
                let value = self.parse_type()?;
                TypeExprKind::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                }
            }
            Some(TokenKind::Func) => {
                self.advance();
                TypeExprKind::Func(self.parse_signature(start)?)
            }
            Some(TokenKind::Interface) => {
                self.advance();
                self.expect(TokenKind::LBrace)?;
                self.expect(TokenKind::RBrace)
                    .map_err(|err| err.with_help("only the empty interface is supported"))?;
                TypeExprKind::Interface
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let inner = self.parse_type()?;
                self.expect(TokenKind::RParen)?;
                return Ok(inner);
            }
            _ => return Err(self.error_here("Expected type")),
        };
        let end = self.last_span_end(start);
        Ok(TypeExpr {
            id: self.fresh_id(),
            kind,
            span: Span::new(start, end),
        })
    }

    /// Parses `(params) results` after the `func` keyword (and name, for declarations).
    fn parse_signature(&mut self, start: usize) -> Result<FuncType, SyntaxError> {
        self.expect(TokenKind::LParen)?;
        let entries = self.parse_param_entries()?;
        let (params, variadic) = self.group_params(entries)?;
        let results = if self.check(TokenKind::LParen) {
            self.advance();
            let entries = self.parse_param_entries()?;
            let (results, variadic) = self.group_params(entries)?;
            if variadic {
                return Err(self.error_here("Result parameters cannot be variadic"));
            }
            results
        } else if self.at_type_start() {
            vec![Param {
                name: None,
                ty: self.parse_type()?,
            }]
        } else {
            Vec::new()
        };
        let end = self.last_span_end(start);
        Ok(FuncType {
            params,
            variadic,
            results,
            span: Span::new(start, end),
        })
    }

    /// Reads entries up to and including the closing `)`.
    fn parse_param_entries(&mut self) -> Result<Vec<ParamEntry>, SyntaxError> {
        let mut entries = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_eof() {
            entries.push(self.parse_param_entry()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(entries)
    }

    fn parse_param_entry(&mut self) -> Result<ParamEntry, SyntaxError> {
        if self.matches(TokenKind::Ellipsis) {
            return Ok(ParamEntry {
                name: None,
                ty: self.parse_type()?,
                variadic: true,
            });
        }
        if let Some(TokenKind::Identifier(_)) = self.peek_kind() {
            let named = match self.peek_kind_n(1) {
                Some(
                    TokenKind::Identifier(_)
                    | TokenKind::Star
                    | TokenKind::Map
                    | TokenKind::Func
                    | TokenKind::Interface
                    | TokenKind::LParen
                    | TokenKind::Ellipsis,
                ) => true,
                // `a []int` names a slice parameter; `A[int]` instantiates a generic type.
                Some(TokenKind::LBracket) => self.peek_kind_n(2) == Some(TokenKind::RBracket),
                _ => false,
            };
            if named {
                let name = self.expect_identifier("Expected parameter name")?;
                let variadic = self.matches(TokenKind::Ellipsis);
                return Ok(ParamEntry {
                    name: Some(name),
                    ty: self.parse_type()?,
                    variadic,
                });
            }
        }
        Ok(ParamEntry {
            name: None,
            ty: self.parse_type()?,
            variadic: false,
        })
    }

    /// Applies grouping: in `(a, b int)` the bare `a` shares the type of the next named entry.
    fn group_params(&mut self, entries: Vec<ParamEntry>) -> Result<(Vec<Param>, bool), SyntaxError> {
        let last = entries.len().saturating_sub(1);
        if let Some(entry) = entries.iter().take(last).find(|entry| entry.variadic) {
            return Err(SyntaxError::new(
                "Only the final parameter can be variadic",
                entry.ty.span,
            ));
        }
        let variadic = entries.last().map(|entry| entry.variadic).unwrap_or(false);
        let any_named = entries.iter().any(|entry| entry.name.is_some());
        if !any_named {
            let params = entries
                .into_iter()
                .map(|entry| Param {
                    name: None,
                    ty: entry.ty,
                })
                .collect();
            return Ok((params, variadic));
        }

        let mut params = Vec::with_capacity(entries.len());
        let mut carried: Option<TypeExpr> = None;
        for entry in entries.into_iter().rev() {
            match entry.name {
                Some(name) => {
                    carried = Some(entry.ty.clone());
                    params.push(Param {
                        name: Some(name),
                        ty: entry.ty,
                    });
                }
                None => {
                    let Some(name) = entry.ty.as_plain_name().map(str::to_string) else {
                        return Err(SyntaxError::new(
                            "Mixed named and unnamed parameters",
                            entry.ty.span,
                        ));
                    };
                    let Some(ty) = carried.clone() else {
                        return Err(SyntaxError::new(
                            format!("Missing type for parameter `{name}`"),
                            entry.ty.span,
                        ));
                    };
                    params.push(Param {
                        name: Some(Ident {
                            id: entry.ty.id,
                            name,
                            span: entry.ty.span,
                        }),
                        ty,
                    });
                }
            }
        }
        params.reverse();
        Ok((params, variadic))
    }

    fn at_type_start(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(
                TokenKind::Identifier(_)
                    | TokenKind::Star
                    | TokenKind::LBracket
                    | TokenKind::Map
                    | TokenKind::Func
                    | TokenKind::Interface
            )
        )
    }

    fn node(&mut self, kind: ExprKind, span: Span) -> Expr {
        Expr {
            id: self.fresh_id(),
            kind,
            span,
        }
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn expect_identifier(&mut self, msg: &str) -> Result<Ident, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Identifier(name)) => {
                let span = self.advance().span;
                let id = self.fresh_id();
                Ok(Ident { id, name, span })
            }
            _ => Err(self.error_here(msg)),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, SyntaxError> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            let found = self
                .peek_kind()
                .map(|kind| kind.describe())
                .unwrap_or_else(|| "end of file".into());
            Err(self
                .error_here(&format!("Expected {}", kind.describe()))
                .with_label(format!("found {found}")))
        }
    }

    fn expect_terminator(&mut self) -> Result<(), SyntaxError> {
        if self.matches(TokenKind::Semi) || self.is_eof() || self.check(TokenKind::RParen) {
            Ok(())
        } else {
            Err(self.error_here("Expected end of statement"))
        }
    }

    fn at_terminator(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(TokenKind::Semi | TokenKind::Eof | TokenKind::RParen) | None
        )
    }

    fn skip_terminators(&mut self) {
        while self.matches(TokenKind::Semi) {}
    }

    fn consume_optional(&mut self, kind: TokenKind) -> bool {
        self.matches(kind)
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        matches!(self.peek_kind(), Some(tk) if tk == kind)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind.clone())
    }

    fn peek_kind_n(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind.clone())
    }

    fn advance(&mut self) -> &Token {
        let idx = self.pos.min(self.tokens.len().saturating_sub(1));
        self.pos = (self.pos + 1).min(self.tokens.len());
        &self.tokens[idx]
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
    }

    fn current_span_start(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.start)
            .unwrap_or_else(|| self.tokens.last().map(|t| t.span.end).unwrap_or(0))
    }

    fn last_span_end(&self, fallback: usize) -> usize {
        if self.pos == 0 {
            return fallback;
        }
        self.tokens
            .get(self.pos - 1)
            .map(|t| t.span.end)
            .unwrap_or(fallback)
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        let span = self
            .tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or_else(|| {
                self.tokens
                    .last()
                    .map(|t| t.span)
                    .unwrap_or_else(|| Span::new(0, 0))
            });
        SyntaxError::new(message.to_string(), span)
    }

    fn report(&mut self, err: SyntaxError) {
        self.errors.push(err);
    }

    fn synchronize_decl(&mut self) {
        // Always make progress past the token that failed.
        self.advance();
        while !self.is_eof() {
            match self.peek_kind() {
                Some(TokenKind::Type | TokenKind::Func | TokenKind::Var)
                    if self.previous_is_terminator() =>
                {
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn previous_is_terminator(&self) -> bool {
        self.pos
            .checked_sub(1)
            .and_then(|idx| self.tokens.get(idx))
            .map(|t| matches!(t.kind, TokenKind::Semi))
            .unwrap_or(true)
    }
}

/// Whether an operand can head a composite literal `T{...}`.
fn denotes_type_syntax(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Type(ty) => !matches!(ty.kind, TypeExprKind::Func(_)),
        ExprKind::Ident(_) => true,
        ExprKind::Index { base, .. } => base.as_ident().is_some(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> File {
        parse_file(PathBuf::from("test.ph"), source).expect("parse")
    }

    fn body(file: &File) -> &[Statement] {
        match file.decls.last() {
            Some(Decl::Func(func)) => &func.body.statements,
            other => panic!("expected trailing function, found {other:?}"),
        }
    }

    #[test]
    fn parses_generic_alias_declaration() {
        let file = parse("package a\n\ntype A[T any] = any\n");
        let Decl::Type(decl) = &file.decls[0] else {
            panic!("expected type decl");
        };
        assert!(decl.alias);
        assert_eq!(decl.name.name, "A");
        assert_eq!(decl.type_params.len(), 1);
        assert_eq!(decl.type_params[0].name.name, "T");
        assert_eq!(decl.ty.canonical_name(), "any");
    }

    #[test]
    fn defined_slice_type_is_not_a_parameter_list() {
        let file = parse("package a\ntype S []int\n");
        let Decl::Type(decl) = &file.decls[0] else {
            panic!("expected type decl");
        };
        assert!(!decl.alias);
        assert!(decl.type_params.is_empty());
        assert_eq!(decl.ty.canonical_name(), "[]int");
    }

    #[test]
    fn groups_parameter_names_with_following_type() {
        let file = parse("package a\nfunc f(a, b int, rest ...string) {}\n");
        let Decl::Func(func) = &file.decls[0] else {
            panic!("expected func decl");
        };
        assert!(func.ty.variadic);
        let names: Vec<_> = func
            .ty
            .params
            .iter()
            .map(|p| p.name.as_ref().map(|n| n.name.clone()).unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["a", "b", "rest"]);
        assert_eq!(func.ty.canonical_name(), "func(int, int, ...string)");
    }

    #[test]
    fn unnamed_generic_parameter_is_a_type() {
        let file = parse("package a\nfunc f() {\n\tfunc(A[string]) {}(A[bool](nil))\n}\n");
        let Statement::Expr(expr) = &body(&file)[0] else {
            panic!("expected expression statement");
        };
        let ExprKind::Call(call) = &expr.kind else {
            panic!("expected call");
        };
        let ExprKind::FuncLit { ty, .. } = &call.callee.kind else {
            panic!("expected func literal callee");
        };
        assert!(ty.params[0].name.is_none());
        assert_eq!(ty.params[0].ty.canonical_name(), "A[string]");
        assert!(matches!(call.args[0].kind, ExprKind::Call(_)));
    }

    #[test]
    fn parses_destructuring_assignment_forms() {
        let source = r#"package a
func f() {
	*new(A[string]), *new(bool) = map[int]A[bool]{}[0]
	*new(A[string]), *new(bool) = any(nil).(A[bool])
	x, ok := m[1]
}
"#;
        let file = parse(source);
        let stmts = body(&file);
        assert_eq!(stmts.len(), 3);
        let Statement::Assign(first) = &stmts[0] else {
            panic!("expected assignment");
        };
        assert_eq!(first.lhs.len(), 2);
        assert!(matches!(first.rhs[0].kind, ExprKind::Index { .. }));
        let Statement::Assign(second) = &stmts[1] else {
            panic!("expected assignment");
        };
        assert!(matches!(second.rhs[0].kind, ExprKind::TypeAssert { .. }));
        let Statement::Assign(third) = &stmts[2] else {
            panic!("expected assignment");
        };
        assert!(third.define);
    }

    #[test]
    fn parses_grouped_var_declarations() {
        let source = "package a\nvar (\n\tx int = 1\n\ty, z = 2, \"s\"\n)\n";
        let file = parse(source);
        let Decl::Var(decl) = &file.decls[0] else {
            panic!("expected var decl");
        };
        assert_eq!(decl.specs.len(), 2);
        assert_eq!(decl.specs[1].names.len(), 2);
        assert_eq!(decl.specs[1].values.len(), 2);
    }

    #[test]
    fn func_literal_with_named_results() {
        let source = "package a\nfunc f() {\n\tvar _, _ A[string] = func() (_, _ A[bool]) { return }()\n}\n";
        let file = parse(source);
        let Statement::Var(decl) = &body(&file)[0] else {
            panic!("expected var statement");
        };
        let ExprKind::Call(call) = &decl.specs[0].values[0].kind else {
            panic!("expected call");
        };
        let ExprKind::FuncLit { ty, .. } = &call.callee.kind else {
            panic!("expected func literal");
        };
        assert_eq!(ty.results.len(), 2);
        assert_eq!(ty.results[1].ty.canonical_name(), "A[bool]");
    }

    #[test]
    fn spread_call_is_marked() {
        let file = parse("package a\nfunc f() {\n\tg(1, xs...)\n}\n");
        let Statement::Expr(expr) = &body(&file)[0] else {
            panic!("expected expression statement");
        };
        let ExprKind::Call(call) = &expr.kind else {
            panic!("expected call");
        };
        assert!(call.spread);
        assert_eq!(call.args.len(), 2);
    }

    #[test]
    fn node_ids_are_unique() {
        let file = parse("package a\nfunc f() {\n\tx, y := g(h(1), 2)\n}\n");
        let Statement::Assign(assign) = &body(&file)[0] else {
            panic!("expected assignment");
        };
        let ExprKind::Call(call) = &assign.rhs[0].kind else {
            panic!("expected call");
        };
        let mut ids = vec![assign.lhs[0].id, assign.lhs[1].id, assign.rhs[0].id, call.callee.id];
        ids.extend(call.args.iter().map(|arg| arg.id));
        let count = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), count);
    }

    #[test]
    fn reports_missing_package_clause() {
        let errors = parse_file(PathBuf::from("bad.ph"), "var x = 1\n").expect_err("should fail");
        assert!(errors.errors[0].message.contains("package"));
    }

    #[test]
    fn recovers_after_bad_declaration() {
        let errors = parse_file(
            PathBuf::from("bad.ph"),
            "package a\n= 1\nvar x = \nfunc f() {}\n",
        )
        .expect_err("should fail");
        assert_eq!(errors.errors.len(), 2);
    }
}
