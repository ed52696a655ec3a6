pub mod ast;
pub mod parser;
pub mod scanner;

use indexmap::IndexSet;
use strum_macros::{Display, EnumString};

use crate::sql::{
    ast::{InsertSelectStatement, Statement, TableName},
    parser::Parser,
    scanner::Scanner,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SqlDialect {
    Hive,
}

/// Statement splitting and classification, plus table extraction from queries.
pub trait SqlParser: Send + Sync {
    fn parse_statements(&self, sql: &str, dialect: SqlDialect) -> anyhow::Result<Vec<Statement>>;

    /// Tables read by the query of an `INSERT ... SELECT`.
    fn table_references(&self, statement: &InsertSelectStatement) -> IndexSet<TableName>;
}

/// The built-in [`SqlParser`], backed by [`Scanner`] and [`Parser`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HiveParser;

impl SqlParser for HiveParser {
    fn parse_statements(&self, sql: &str, dialect: SqlDialect) -> anyhow::Result<Vec<Statement>> {
        match dialect {
            SqlDialect::Hive => parse_sql(sql),
        }
    }

    fn table_references(&self, statement: &InsertSelectStatement) -> IndexSet<TableName> {
        parser::table_references(&statement.query)
    }
}

pub fn parse_sql(sql: &str) -> anyhow::Result<Vec<Statement>> {
    log::debug!("Parsing {}", sql.chars().take(50).collect::<String>());

    let tokens = Scanner::new(sql).scan()?;

    log::debug!("Tokens:");
    tokens.iter().for_each(|tok| log::debug!("{:?}", tok));

    let mut parser = Parser::new(&tokens);
    let statements = parser.parse()?;
    log::debug!("Statements: {:?}", statements);
    Ok(statements)
}
