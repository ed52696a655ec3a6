use crate::{
    analyzer::Analyzer,
    instance::{DataNode, DataSourceInstance},
    sql::{
        SqlDialect,
        ast::{Statement, TableName},
    },
    task::LineageTask,
};

impl Analyzer<'_> {
    /// Lineage of a SQL batch run against `instance`.
    ///
    /// A batch that fails to parse, or that contains a statement kind without a
    /// lineage mapping, is handed as a whole to
    /// [`LineageHooks::analyze_other_sql`](super::hooks::LineageHooks::analyze_other_sql).
    pub fn analyze_sql(&self, instance: &DataSourceInstance, sql: &str) -> LineageTask {
        let statements = match self.sql_parser.parse_statements(sql, SqlDialect::Hive) {
            Ok(statements) => statements,
            Err(err) => {
                log::warn!("Failed to parse sql due to error: {}\n{}", err, sql);
                return self.hooks.analyze_other_sql(instance, sql);
            }
        };

        let mut lineage = LineageTask::empty();
        for statement in &statements {
            let mut statement_lineage = LineageTask::empty();
            match statement {
                Statement::AlterTable(table) | Statement::TruncateTable(table) => {
                    statement_lineage.add_generated_node(table_node(instance, table));
                }
                Statement::InsertSelect(insert) => {
                    for table in self.sql_parser.table_references(insert) {
                        statement_lineage.add_dependent_node(table_node(instance, &table));
                    }
                    statement_lineage.add_generated_node(table_node(instance, &insert.table));
                }
                Statement::Select | Statement::Set | Statement::AnalyzeTable(_) => continue,
                Statement::Other(_) => {
                    log::debug!("No lineage mapping for statement: {}", statement);
                    return self.hooks.analyze_other_sql(instance, sql);
                }
            }
            lineage = lineage.merge(&statement_lineage);
        }
        lineage
    }
}

fn table_node(instance: &DataSourceInstance, table: &TableName) -> DataNode {
    DataNode::new(instance, table.schema.as_deref(), Some(&table.table))
}
