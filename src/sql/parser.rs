use std::collections::HashSet;

use anyhow::anyhow;
use indexmap::IndexSet;
use strum::IntoDiscriminant;

use crate::sql::ast::{
    InsertSelectStatement, Statement, TableName, Token, TokenType, TokenTypeVariant,
};

/// Statement-level parser for Hive SQL.
///
/// Statements are classified by their leading keywords; only the parts that
/// matter for table lineage (target tables, source query tokens) are kept.
pub struct Parser<'a> {
    source_tokens: &'a Vec<Token>,
    curr: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a Vec<Token>) -> Parser<'a> {
        Self {
            source_tokens: tokens,
            curr: 0,
        }
    }

    // statements -> statement (";" statement)* [";"]
    pub fn parse(&mut self) -> anyhow::Result<Vec<Statement>> {
        let mut statements = vec![];
        loop {
            while self.match_token_type(TokenTypeVariant::Semicolon) {}
            if self.is_at_end() {
                break;
            }
            statements.push(self.parse_statement()?);
            if !self.is_at_end() {
                self.consume(TokenTypeVariant::Semicolon)?;
            }
        }
        Ok(statements)
    }

    fn peek(&self) -> &Token {
        &self.source_tokens[self.curr]
    }

    fn peek_next_i(&self, i: usize) -> &Token {
        match self.source_tokens.get(self.curr + i) {
            Some(token) => token,
            None => self.peek(),
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            // Do not advance if we peek Eof
            self.curr += 1;
        }
        &self.source_tokens[self.curr - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenType::Eof
    }

    fn check_token_type(&self, token_type: TokenTypeVariant) -> bool {
        self.peek().kind.discriminant() == token_type
    }

    fn match_token_type(&mut self, token_type: TokenTypeVariant) -> bool {
        if self.check_token_type(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check_keyword(&self, value: &str) -> bool {
        self.peek().is_keyword(value)
    }

    fn match_keyword(&mut self, value: &str) -> bool {
        if self.check_keyword(value) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_keyword(&mut self, value: &str) -> anyhow::Result<&Token> {
        if self.check_keyword(value) {
            Ok(self.advance())
        } else {
            let err_msg = format!("Expected `{}`.", value.to_uppercase());
            Err(anyhow!(self.error(self.peek(), &err_msg)))
        }
    }

    fn consume(&mut self, token_type: TokenTypeVariant) -> anyhow::Result<&Token> {
        if self.check_token_type(token_type) {
            Ok(self.advance())
        } else {
            let err_msg = format!("Expected `{}`.", token_type.variant_str());
            Err(anyhow!(self.error(self.peek(), &err_msg)))
        }
    }

    fn error(&self, token: &Token, message: &str) -> String {
        format!(
            "[line {}, col {}] Error {}: {}",
            token.line,
            token.col,
            &format!("at '{}'", token.lexeme),
            message
        )
    }

    fn leading_keyword(&self) -> String {
        self.peek().lexeme.to_uppercase()
    }

    fn parse_statement(&mut self) -> anyhow::Result<Statement> {
        if self.check_keyword("alter") {
            self.parse_alter()
        } else if self.check_keyword("insert") {
            self.parse_insert(vec![])
        } else if self.check_keyword("with") {
            self.parse_with()
        } else if self.check_keyword("select") || self.check_token_type(TokenTypeVariant::LeftParen)
        {
            self.skip_statement()?;
            Ok(Statement::Select)
        } else if self.check_keyword("set") {
            self.skip_statement()?;
            Ok(Statement::Set)
        } else if self.check_keyword("analyze") {
            self.parse_analyze()
        } else if self.check_keyword("truncate") {
            self.parse_truncate()
        } else {
            let kind = self.leading_keyword();
            self.skip_statement()?;
            Ok(Statement::Other(kind))
        }
    }

    // alter -> "ALTER" "TABLE" table_name ...
    fn parse_alter(&mut self) -> anyhow::Result<Statement> {
        self.consume_keyword("alter")?;
        if !self.match_keyword("table") {
            let kind = format!("ALTER {}", self.leading_keyword());
            self.skip_statement()?;
            return Ok(Statement::Other(kind));
        }
        let table = self.parse_table_name()?;
        self.skip_statement()?;
        Ok(Statement::AlterTable(table))
    }

    // analyze -> "ANALYZE" "TABLE" table_name ...
    fn parse_analyze(&mut self) -> anyhow::Result<Statement> {
        self.consume_keyword("analyze")?;
        if !self.match_keyword("table") {
            let kind = format!("ANALYZE {}", self.leading_keyword());
            self.skip_statement()?;
            return Ok(Statement::Other(kind));
        }
        let table = self.parse_table_name()?;
        self.skip_statement()?;
        Ok(Statement::AnalyzeTable(table))
    }

    // truncate -> "TRUNCATE" ["TABLE"] table_name [partition_spec]
    fn parse_truncate(&mut self) -> anyhow::Result<Statement> {
        self.consume_keyword("truncate")?;
        self.match_keyword("table");
        let table = self.parse_table_name()?;
        self.skip_statement()?;
        Ok(Statement::TruncateTable(table))
    }

    // with -> "WITH" ["RECURSIVE"] cte ("," cte)* (insert | query)
    // cte -> name ["(" columns ")"] "AS" "(" query ")"
    fn parse_with(&mut self) -> anyhow::Result<Statement> {
        let with_start = self.curr;
        self.consume_keyword("with")?;
        self.match_keyword("recursive");
        loop {
            self.parse_name_part()?;
            if self.check_token_type(TokenTypeVariant::LeftParen) {
                self.skip_parenthesized()?;
            }
            self.consume_keyword("as")?;
            self.skip_parenthesized()?;
            if !self.match_token_type(TokenTypeVariant::Comma) {
                break;
            }
        }
        let with_tokens = self.source_tokens[with_start..self.curr].to_vec();

        if self.check_keyword("insert") {
            self.parse_insert(with_tokens)
        } else if self.check_keyword("select") || self.check_token_type(TokenTypeVariant::LeftParen)
        {
            self.skip_statement()?;
            Ok(Statement::Select)
        } else {
            let kind = format!("WITH ... {}", self.leading_keyword());
            self.skip_statement()?;
            Ok(Statement::Other(kind))
        }
    }

    // insert -> "INSERT" ("INTO" | "OVERWRITE") ["TABLE"] table_name
    //           ["PARTITION" "(" ... ")"] ["IF" "NOT" "EXISTS"] ["(" columns ")"] query
    fn parse_insert(&mut self, with_tokens: Vec<Token>) -> anyhow::Result<Statement> {
        self.consume_keyword("insert")?;
        let overwrite = self.match_keyword("overwrite");
        if overwrite {
            if self.check_keyword("local") || self.check_keyword("directory") {
                self.skip_statement()?;
                return Ok(Statement::Other("INSERT OVERWRITE DIRECTORY".to_owned()));
            }
        } else {
            self.consume_keyword("into")?;
        }
        self.match_keyword("table");
        let table = self.parse_table_name()?;

        if self.match_keyword("partition") {
            self.skip_parenthesized()?;
        }
        if self.match_keyword("if") {
            self.consume_keyword("not")?;
            self.consume_keyword("exists")?;
        }
        if self.check_token_type(TokenTypeVariant::LeftParen) {
            let next = self.peek_next_i(1);
            if !(next.is_keyword("select") || next.is_keyword("with")) {
                // column list
                self.skip_parenthesized()?;
            }
        }

        if self.check_keyword("values") {
            self.skip_statement()?;
            return Ok(Statement::Other("INSERT VALUES".to_owned()));
        }
        if !(self.check_keyword("select")
            || self.check_keyword("with")
            || self.check_token_type(TokenTypeVariant::LeftParen))
        {
            return Err(anyhow!(
                self.error(self.peek(), "Expected a query after the INSERT target.")
            ));
        }

        let mut query = with_tokens;
        query.extend(self.consume_statement_tokens()?);
        Ok(Statement::InsertSelect(InsertSelectStatement {
            table,
            overwrite,
            query,
        }))
    }

    // table_name -> name_part ("." name_part)*
    fn parse_table_name(&mut self) -> anyhow::Result<TableName> {
        let mut parts = self.parse_name_part()?;
        while self.check_token_type(TokenTypeVariant::Dot) && is_name_part(self.peek_next_i(1)) {
            self.advance();
            parts.extend(self.parse_name_part()?);
        }
        Ok(table_name_from_parts(parts))
    }

    fn parse_name_part(&mut self) -> anyhow::Result<Vec<String>> {
        if !is_name_part(self.peek()) {
            return Err(anyhow!(self.error(self.peek(), "Expected a name.")));
        }
        Ok(name_parts(self.advance()))
    }

    fn skip_parenthesized(&mut self) -> anyhow::Result<()> {
        self.consume(TokenTypeVariant::LeftParen)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek().kind {
                TokenType::Eof => {
                    return Err(anyhow!(
                        self.error(self.peek(), "Found unclosed parenthesis.")
                    ));
                }
                TokenType::LeftParen => depth += 1,
                TokenType::RightParen => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    /// Consumes the rest of the current statement, up to a top-level `;`.
    fn consume_statement_tokens(&mut self) -> anyhow::Result<Vec<Token>> {
        let mut tokens = vec![];
        let mut depth = 0usize;
        loop {
            match self.peek().kind {
                TokenType::Eof if depth > 0 => {
                    return Err(anyhow!(
                        self.error(self.peek(), "Found unclosed parenthesis.")
                    ));
                }
                TokenType::Eof => break,
                TokenType::Semicolon if depth == 0 => break,
                TokenType::LeftParen => depth += 1,
                TokenType::RightParen if depth == 0 => {
                    return Err(anyhow!(
                        self.error(self.peek(), "Found unbalanced closing parenthesis.")
                    ));
                }
                TokenType::RightParen => depth -= 1,
                _ => {}
            }
            tokens.push(self.advance().clone());
        }
        Ok(tokens)
    }

    fn skip_statement(&mut self) -> anyhow::Result<()> {
        self.consume_statement_tokens().map(|_| ())
    }
}

fn is_name_part(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenType::Identifier(_) | TokenType::QuotedIdentifier(_) | TokenType::Placeholder(_)
    )
}

/// A back-quoted `db.table` holds two parts in one token.
fn name_parts(token: &Token) -> Vec<String> {
    match &token.kind {
        TokenType::QuotedIdentifier(ident) => ident.split('.').map(str::to_owned).collect(),
        TokenType::Identifier(ident) => vec![ident.to_owned()],
        _ => vec![token.lexeme.to_owned()],
    }
}

fn table_name_from_parts(mut parts: Vec<String>) -> TableName {
    let table = parts.pop().unwrap_or_default();
    TableName {
        schema: parts.pop(),
        table,
    }
}

/// Words that may precede `(` without making it a function call.
const NON_CALL_KEYWORDS: &[&str] = &[
    "all", "and", "as", "by", "distinct", "else", "exists", "from", "having", "in", "join", "not",
    "on", "or", "select", "table", "then", "union", "using", "values", "when", "where", "with",
];

/// Words that end a table reference instead of aliasing it.
const ALIAS_TERMINATORS: &[&str] = &[
    "anti", "cluster", "cross", "distribute", "except", "full", "group", "having", "inner",
    "insert", "intersect", "join", "lateral", "left", "limit", "natural", "on", "order", "outer",
    "right", "select", "semi", "sort", "tablesample", "union", "using", "where", "window",
];

/// Tables read by a query: every table named after `FROM` or `JOIN`, CTE names
/// excluded, in first-seen order.
pub fn table_references(query: &[Token]) -> IndexSet<TableName> {
    let ctes = cte_names(query);
    let mut references = IndexSet::new();
    // one entry per open parenthesis: whether it belongs to a function call
    let mut call_parens: Vec<bool> = vec![];
    let mut i = 0;
    while i < query.len() {
        let token = &query[i];
        match &token.kind {
            TokenType::LeftParen => {
                let is_call = i > 0
                    && matches!(&query[i - 1].kind, TokenType::Identifier(ident)
                        if !NON_CALL_KEYWORDS.iter().any(|kw| ident.eq_ignore_ascii_case(kw)));
                call_parens.push(is_call);
            }
            TokenType::RightParen => {
                call_parens.pop();
            }
            _ if (token.is_keyword("from") || token.is_keyword("join"))
                && call_parens.last() != Some(&true) =>
            {
                let allow_list = token.is_keyword("from");
                i = collect_from_items(query, i + 1, allow_list, &ctes, &mut references);
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    references
}

/// Reads `table [alias] ("," table [alias])*` starting at `i` and returns the
/// index of the first token that is not part of it.
fn collect_from_items(
    query: &[Token],
    mut i: usize,
    allow_list: bool,
    ctes: &HashSet<String>,
    references: &mut IndexSet<TableName>,
) -> usize {
    loop {
        let Some((table, next)) = read_table_name(query, i) else {
            return i;
        };
        // table-valued function, e.g. `FROM unnest(...)`
        if query
            .get(next)
            .is_some_and(|token| token.kind == TokenType::LeftParen)
        {
            return i;
        }
        let is_cte = table.schema.is_none() && ctes.contains(&table.table.to_lowercase());
        if !is_cte {
            references.insert(table);
        }

        i = skip_alias(query, next);
        if allow_list && query.get(i).is_some_and(|token| token.kind == TokenType::Comma) {
            i += 1;
            continue;
        }
        return i;
    }
}

fn read_table_name(query: &[Token], mut i: usize) -> Option<(TableName, usize)> {
    let first = query.get(i).filter(|token| is_name_part(token))?;
    let mut parts = name_parts(first);
    i += 1;
    while query
        .get(i)
        .is_some_and(|token| token.kind == TokenType::Dot)
    {
        let Some(part) = query.get(i + 1).filter(|token| is_name_part(token)) else {
            break;
        };
        parts.extend(name_parts(part));
        i += 2;
    }
    Some((table_name_from_parts(parts), i))
}

fn skip_alias(query: &[Token], i: usize) -> usize {
    let Some(token) = query.get(i) else {
        return i;
    };
    if token.is_keyword("as") {
        return match query.get(i + 1) {
            Some(alias) if is_name_part(alias) => i + 2,
            _ => i + 1,
        };
    }
    match &token.kind {
        TokenType::Identifier(ident)
            if !ALIAS_TERMINATORS
                .iter()
                .any(|kw| ident.eq_ignore_ascii_case(kw)) =>
        {
            i + 1
        }
        TokenType::QuotedIdentifier(_) => i + 1,
        _ => i,
    }
}

/// Names introduced by `WITH name AS (` or `, name AS (`, lowercased.
fn cte_names(query: &[Token]) -> HashSet<String> {
    let mut names = HashSet::new();
    for i in 1..query.len().saturating_sub(2) {
        let prev = &query[i - 1];
        let starts_cte = prev.is_keyword("with")
            || prev.is_keyword("recursive")
            || prev.kind == TokenType::Comma;
        if starts_cte
            && query[i + 1].is_keyword("as")
            && query[i + 2].kind == TokenType::LeftParen
        {
            if let TokenType::Identifier(name) | TokenType::QuotedIdentifier(name) = &query[i].kind
            {
                names.insert(name.to_lowercase());
            }
        }
    }
    names
}
