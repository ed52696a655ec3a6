use serde::Serialize;
use strum_macros::EnumDiscriminants;

#[derive(PartialEq, Clone, Debug, EnumDiscriminants, Serialize)]
#[strum_discriminants(name(TokenTypeVariant))]
pub enum TokenType {
    LeftParen,
    RightParen,
    Comma,
    Dot,
    Semicolon,
    /// Any other punctuation or operator character.
    Symbol(char),
    QuotedIdentifier(String),
    Identifier(String),
    String(String),
    Number(String),
    /// An unexpanded `${...}` placeholder.
    Placeholder(String),
    Eof,
}

impl TokenTypeVariant {
    pub fn variant_str(&self) -> &str {
        match self {
            TokenTypeVariant::LeftParen => "(",
            TokenTypeVariant::RightParen => ")",
            TokenTypeVariant::Comma => ",",
            TokenTypeVariant::Dot => ".",
            TokenTypeVariant::Semicolon => ";",
            TokenTypeVariant::Symbol => "Symbol",
            TokenTypeVariant::QuotedIdentifier => "QuotedIdentifier",
            TokenTypeVariant::Identifier => "Identifier",
            TokenTypeVariant::String => "String",
            TokenTypeVariant::Number => "Number",
            TokenTypeVariant::Placeholder => "Placeholder",
            TokenTypeVariant::Eof => "EOF",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Token {
    pub kind: TokenType,
    pub lexeme: String,
    pub line: u32,
    pub col: u32,
}

impl Token {
    /// Whether this is the (case-insensitive) bare word `keyword`.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        match &self.kind {
            TokenType::Identifier(ident) => ident.eq_ignore_ascii_case(keyword),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TableName {
    pub schema: Option<String>,
    pub table: String,
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.table),
            None => write!(f, "{}", self.table),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InsertSelectStatement {
    pub table: TableName,
    pub overwrite: bool,
    /// Tokens of the source query, including any leading `WITH` clause.
    pub query: Vec<Token>,
}

#[derive(Debug, Clone, Serialize)]
pub enum Statement {
    AlterTable(TableName),
    InsertSelect(InsertSelectStatement),
    Select,
    Set,
    AnalyzeTable(TableName),
    TruncateTable(TableName),
    /// A statement kind without lineage mapping, named by its leading keywords.
    Other(String),
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::AlterTable(table) => write!(f, "ALTER TABLE {}", table),
            Statement::InsertSelect(insert) if insert.overwrite => {
                write!(f, "INSERT OVERWRITE {}", insert.table)
            }
            Statement::InsertSelect(insert) => write!(f, "INSERT INTO {}", insert.table),
            Statement::Select => write!(f, "SELECT"),
            Statement::Set => write!(f, "SET"),
            Statement::AnalyzeTable(table) => write!(f, "ANALYZE TABLE {}", table),
            Statement::TruncateTable(table) => write!(f, "TRUNCATE TABLE {}", table),
            Statement::Other(kind) => write!(f, "OTHER {}", kind),
        }
    }
}
