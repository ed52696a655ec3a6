use anyhow::anyhow;

use crate::sql::ast::{Token, TokenType};

/// Tokenizer for Hive SQL batches.
pub struct Scanner {
    source_chars: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: u32,
    col: u32,
}

impl Scanner {
    pub fn new(sql: &str) -> Self {
        Self {
            source_chars: sql.chars().collect(),
            tokens: vec![],
            start: 0,
            current: 0,
            line: 1,
            col: 1,
        }
    }

    /// Consumes the scanner and returns every token, terminated by `Eof`.
    pub fn scan(mut self) -> anyhow::Result<Vec<Token>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }
        self.tokens.push(Token {
            kind: TokenType::Eof,
            lexeme: String::from("eof"),
            line: self.line,
            col: self.col,
        });
        Ok(self.tokens)
    }

    fn advance(&mut self) -> char {
        let c = self.source_chars[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        c
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source_chars.len()
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> char {
        self.source_chars
            .get(self.current + offset)
            .copied()
            .unwrap_or('\0')
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.peek() != expected {
            return false;
        }
        self.advance();
        true
    }

    fn lexeme(&self) -> String {
        self.source_chars[self.start..self.current].iter().collect()
    }

    fn push_token(&mut self, kind: TokenType) {
        self.tokens.push(Token {
            kind,
            lexeme: self.lexeme(),
            line: self.line,
            col: self.col,
        });
    }

    fn scan_token(&mut self) -> anyhow::Result<()> {
        let c = self.advance();
        match c {
            '(' => self.push_token(TokenType::LeftParen),
            ')' => self.push_token(TokenType::RightParen),
            ',' => self.push_token(TokenType::Comma),
            ';' => self.push_token(TokenType::Semicolon),
            '.' if self.peek().is_ascii_digit() => self.scan_number(),
            '.' => self.push_token(TokenType::Dot),
            '-' if self.match_char('-') => self.skip_line_comment(),
            '/' if self.match_char('*') => self.skip_block_comment()?,
            '$' if self.peek() == '{' => self.scan_placeholder()?,
            '\'' | '"' => self.scan_string(c)?,
            '`' => self.scan_quoted_identifier()?,
            c if c.is_whitespace() => {}
            c if c.is_ascii_digit() => self.scan_number(),
            c if c.is_alphabetic() || c == '_' => self.scan_identifier(),
            c => self.push_token(TokenType::Symbol(c)),
        }
        Ok(())
    }

    /// Quoted literal; a backslash escapes the next character.
    fn scan_string(&mut self, delimiter: char) -> anyhow::Result<()> {
        loop {
            if self.is_at_end() {
                return Err(anyhow!(self.error_str("Found unterminated string")));
            }
            match self.advance() {
                '\\' if !self.is_at_end() => {
                    self.advance();
                }
                c if c == delimiter => break,
                _ => {}
            }
        }
        let content = self.source_chars[self.start + 1..self.current - 1]
            .iter()
            .collect();
        self.push_token(TokenType::String(content));
        Ok(())
    }

    fn scan_number(&mut self) {
        loop {
            let c = self.peek();
            // `1.x` is a number followed by a dot, `1.5` a decimal
            if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_ascii_digit()) {
                self.advance();
            } else {
                break;
            }
        }
        // Hive accepts identifiers starting with digits, e.g. `2024_orders`
        if self.peek().is_alphabetic() || self.peek() == '_' {
            self.scan_identifier();
            return;
        }
        self.push_token(TokenType::Number(self.lexeme()));
    }

    fn scan_identifier(&mut self) {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }
        self.push_token(TokenType::Identifier(self.lexeme()));
    }

    fn scan_quoted_identifier(&mut self) -> anyhow::Result<()> {
        loop {
            if self.is_at_end() {
                return Err(anyhow!(
                    self.error_str("Found unterminated quoted identifier")
                ));
            }
            if self.advance() == '`' {
                break;
            }
        }
        if self.current - self.start == 2 {
            return Err(anyhow!(self.error_str("Found empty quoted identifier")));
        }
        let ident = self.source_chars[self.start + 1..self.current - 1]
            .iter()
            .collect();
        self.push_token(TokenType::QuotedIdentifier(ident));
        Ok(())
    }

    /// An unexpanded `${...}` macro, kept as a single token.
    fn scan_placeholder(&mut self) -> anyhow::Result<()> {
        self.advance();
        loop {
            if self.is_at_end() || self.peek() == '\n' {
                return Err(anyhow!(self.error_str("Found unterminated placeholder")));
            }
            if self.advance() == '}' {
                break;
            }
        }
        self.push_token(TokenType::Placeholder(self.lexeme()));
        Ok(())
    }

    fn skip_block_comment(&mut self) -> anyhow::Result<()> {
        while !(self.peek() == '*' && self.peek_at(1) == '/') {
            if self.is_at_end() {
                return Err(anyhow!(self.error_str("Found unterminated comment")));
            }
            self.advance();
        }
        self.advance();
        self.advance();
        Ok(())
    }

    fn skip_line_comment(&mut self) {
        while !self.is_at_end() && self.peek() != '\n' {
            self.advance();
        }
    }

    fn error_str(&self, error: &str) -> String {
        format!(
            "[line: {}, col: {}] Scanner error: {}",
            self.line, self.col, error
        )
    }
}
