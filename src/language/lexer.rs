use crate::language::{
    span::Span,
    token::{Token, TokenKind},
};

#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

pub fn lex(source: &str) -> Result<Vec<Token>, Vec<LexError>> {
    let lexer = Lexer::new(source);
    lexer.run()
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::str::Chars<'a>,
    current: Option<char>,
    offset: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        let mut chars = src.chars();
        let current = chars.next();
        Self {
            src,
            chars,
            current,
            offset: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, Vec<LexError>> {
        while let Some(ch) = self.current {
            match ch {
                '/' if self.peek() == Some('/') => self.eat_line_comment(),
                '/' if self.peek() == Some('*') => self.eat_block_comment(),
                '\n' => {
                    self.terminate_line(self.offset);
                    self.bump();
                }
                ch if ch.is_whitespace() => {
                    self.bump();
                }
                ch if ch.is_ascii_alphabetic() || ch == '_' => self.lex_identifier(),
                ch if ch.is_ascii_digit() => self.lex_number(),
                '"' => self.lex_string(),
                '`' => self.lex_raw_string(),
                _ => self.lex_symbol(),
            }
        }
        self.terminate_line(self.offset);
        self.push_token(TokenKind::Eof, self.offset, self.offset);

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    fn bump(&mut self) -> Option<char> {
        if let Some(ch) = self.current {
            self.offset += ch.len_utf8();
        }
        self.current = self.chars.next();
        self.current
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn push_token(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, end),
        });
    }

    fn error(&mut self, start: usize, end: usize, message: impl Into<String>) {
        self.errors.push(LexError {
            message: message.into(),
            span: Span::new(start, end),
        });
    }

    /// Inserts an implicit statement terminator when the line ends on an operand or closer.
    fn terminate_line(&mut self, at: usize) {
        let ends = self
            .tokens
            .last()
            .map(|token| token.kind.ends_statement())
            .unwrap_or(false);
        if ends {
            self.push_token(TokenKind::Semi, at, at);
        }
    }

    fn eat_line_comment(&mut self) {
        self.bump();
        self.bump();
        while let Some(ch) = self.current {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn eat_block_comment(&mut self) {
        let start = self.offset;
        self.bump();
        self.bump();
        let mut saw_newline = false;
        while let Some(ch) = self.current {
            if ch == '*' && self.peek() == Some('/') {
                self.bump();
                self.bump();
                if saw_newline {
                    self.terminate_line(start);
                }
                return;
            }
            saw_newline |= ch == '\n';
            self.bump();
        }
        self.error(start, self.offset, "Unterminated block comment");
    }

    fn lex_identifier(&mut self) {
        let start = self.offset;
        while let Some(ch) = self.current {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }

        let end = self.offset;
        let slice = &self.src[start..end];
        let kind = match slice {
            "package" => TokenKind::Package,
            "type" => TokenKind::Type,
            "func" => TokenKind::Func,
            "var" => TokenKind::Var,
            "return" => TokenKind::Return,
            "map" => TokenKind::Map,
            "interface" => TokenKind::Interface,
            _ => TokenKind::Identifier(slice.to_string()),
        };
        self.push_token(kind, start, end);
    }

    fn lex_number(&mut self) {
        let start = self.offset;
        while let Some(ch) = self.current {
            if ch.is_ascii_digit() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }

        let end = self.offset;
        let text: String = self.src[start..end].chars().filter(|c| *c != '_').collect();
        match text.parse::<i128>() {
            Ok(value) => self.push_token(TokenKind::Integer(value), start, end),
            Err(_) => self.error(start, end, "Invalid integer literal"),
        }
    }

    fn lex_string(&mut self) {
        let start = self.offset;
        self.bump();
        let mut value = String::new();
        while let Some(ch) = self.current {
            match ch {
                '"' => {
                    self.bump();
                    let end = self.offset;
                    self.push_token(TokenKind::String(value), start, end);
                    return;
                }
                '\n' => break,
                '\\' => {
                    self.bump();
                    if let Some(escaped) = self.current {
                        value.push(match escaped {
                            'n' => '\n',
                            'r' => '\r',
                            't' => '\t',
                            '\\' => '\\',
                            '"' => '"',
                            other => other,
                        });
                        self.bump();
                    } else {
                        break;
                    }
                }
                _ => {
                    value.push(ch);
                    self.bump();
                }
            }
        }
        self.error(start, self.offset, "Unterminated string literal");
    }

    fn lex_raw_string(&mut self) {
        let start = self.offset;
        self.bump();
        let mut value = String::new();
        while let Some(ch) = self.current {
            if ch == '`' {
                self.bump();
                let end = self.offset;
                self.push_token(TokenKind::String(value), start, end);
                return;
            }
            value.push(ch);
            self.bump();
        }
        self.error(start, self.offset, "Unterminated raw string literal");
    }

    fn lex_symbol(&mut self) {
        let start = self.offset;
        match self.current {
            Some('(') => self.single(TokenKind::LParen),
            Some(')') => self.single(TokenKind::RParen),
            Some('{') => self.single(TokenKind::LBrace),
            Some('}') => self.single(TokenKind::RBrace),
            Some('[') => self.single(TokenKind::LBracket),
            Some(']') => self.single(TokenKind::RBracket),
            Some(',') => self.single(TokenKind::Comma),
            Some(';') => self.single(TokenKind::Semi),
            Some('*') => self.single(TokenKind::Star),
            Some('&') => self.single(TokenKind::Ampersand),
            Some('=') => self.single(TokenKind::Eq),
            Some('.') => {
                self.bump();
                if self.current == Some('.') && self.peek() == Some('.') {
                    self.bump();
                    self.bump();
                    self.push_token(TokenKind::Ellipsis, start, self.offset);
                } else {
                    self.push_token(TokenKind::Dot, start, self.offset);
                }
            }
            Some(':') => {
                self.bump();
                if self.current == Some('=') {
                    self.bump();
                    self.push_token(TokenKind::ColonEq, start, self.offset);
                } else {
                    self.push_token(TokenKind::Colon, start, self.offset);
                }
            }
            Some(ch) => {
                self.bump();
                self.error(start, self.offset, format!("Unexpected character '{}'", ch));
            }
            None => {}
        }
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.offset;
        self.bump();
        self.push_token(kind, start, self.offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .expect("lex")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn inserts_terminators_after_operands_at_line_end() {
        let tokens = kinds("x = f()\ny := 1\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Identifier("x".into()),
                TokenKind::Eq,
                TokenKind::Identifier("f".into()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Semi,
                TokenKind::Identifier("y".into()),
                TokenKind::ColonEq,
                TokenKind::Integer(1),
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn no_terminator_after_open_brace_or_comma() {
        let tokens = kinds("f(a,\n b) {\n}");
        assert!(!tokens[..4].contains(&TokenKind::Semi));
        assert_eq!(tokens[tokens.len() - 2], TokenKind::Semi);
    }

    #[test]
    fn comments_are_skipped_but_end_lines() {
        let tokens = kinds("x = 1 // want `boom`\n");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[3], TokenKind::Semi);
    }

    #[test]
    fn ellipsis_and_dot_are_distinct() {
        let tokens = kinds("f(xs...) x.(T)");
        assert!(tokens.contains(&TokenKind::Ellipsis));
        assert!(tokens.contains(&TokenKind::Dot));
    }

    #[test]
    fn reports_unterminated_strings() {
        let errors = lex("x = \"open\n").expect_err("should fail");
        assert_eq!(errors[0].message, "Unterminated string literal");
    }
}
