use crate::language::span::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Integer(i128),
    String(String),

    Package,
    Type,
    Func,
    Var,
    Return,
    Map,
    Interface,

    Ampersand,
    Star,
    Eq,
    ColonEq,
    Colon,
    Comma,
    Dot,
    Ellipsis,
    Semi,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Eof,
}

impl TokenKind {
    /// Tokens after which a line break terminates the statement.
    pub fn ends_statement(&self) -> bool {
        matches!(
            self,
            TokenKind::Identifier(_)
                | TokenKind::Integer(_)
                | TokenKind::String(_)
                | TokenKind::Return
                | TokenKind::RParen
                | TokenKind::RBrace
                | TokenKind::RBracket
        )
    }

    pub fn describe(&self) -> String {
        match self {
            TokenKind::Identifier(name) => format!("identifier `{name}`"),
            TokenKind::Integer(value) => format!("integer `{value}`"),
            TokenKind::String(_) => "string literal".into(),
            TokenKind::Package => "`package`".into(),
            TokenKind::Type => "`type`".into(),
            TokenKind::Func => "`func`".into(),
            TokenKind::Var => "`var`".into(),
            TokenKind::Return => "`return`".into(),
            TokenKind::Map => "`map`".into(),
            TokenKind::Interface => "`interface`".into(),
            TokenKind::Ampersand => "`&`".into(),
            TokenKind::Star => "`*`".into(),
            TokenKind::Eq => "`=`".into(),
            TokenKind::ColonEq => "`:=`".into(),
            TokenKind::Colon => "`:`".into(),
            TokenKind::Comma => "`,`".into(),
            TokenKind::Dot => "`.`".into(),
            TokenKind::Ellipsis => "`...`".into(),
            TokenKind::Semi => "end of statement".into(),
            TokenKind::LParen => "`(`".into(),
            TokenKind::RParen => "`)`".into(),
            TokenKind::LBrace => "`{`".into(),
            TokenKind::RBrace => "`}`".into(),
            TokenKind::LBracket => "`[`".into(),
            TokenKind::RBracket => "`]`".into(),
            TokenKind::Eof => "end of file".into(),
        }
    }
}
