use hanlu::{
    sql::{HiveParser, SqlDialect, SqlParser, ast::Statement, parse_sql},
    test_utils::{PARSING_TESTS_FILE, TestParsingData},
};

fn test_sql(sql: &str) {
    let statements = parse_sql(sql);
    if let Err(err) = &statements {
        println!("{}", err)
    }
    assert!(statements.is_ok());
}

fn load_tests() -> TestParsingData {
    let parsing_test_file =
        std::fs::read_to_string(PARSING_TESTS_FILE).expect("Cannot open parsing test cases");
    toml::from_str(&parsing_test_file).expect("Cannot parse test cases defined in toml")
}

#[test]
fn test_should_parse() {
    for test in load_tests().tests {
        let sql = &test.sql;
        println!("Testing parsing for SQL: {}", sql);
        test_sql(sql);
        test_sql(&sql.to_uppercase());
        test_sql(&sql.to_lowercase());
    }
}

#[test]
fn test_statements_and_references() {
    let parser = HiveParser;
    for test in load_tests().tests {
        println!("Testing statements for SQL: {}", test.sql);
        let statements = parser
            .parse_statements(&test.sql, SqlDialect::Hive)
            .expect("valid sql");

        let rendered: Vec<String> = statements.iter().map(Statement::to_string).collect();
        assert_eq!(rendered, test.statements);

        let references: Vec<Vec<String>> = statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::InsertSelect(insert) => Some(
                    parser
                        .table_references(insert)
                        .iter()
                        .map(ToString::to_string)
                        .collect(),
                ),
                _ => None,
            })
            .collect();
        assert_eq!(references, test.references);
    }
}

#[test]
fn test_should_not_parse() {
    let sqls = [
        // unterminated string
        "select 'abc from t",
        // unclosed parenthesis
        "insert into dw.t select * from (select 1",
        // unbalanced closing parenthesis
        "select 1)",
        // missing INTO
        "insert dw.c select * from ods.a",
        // missing query
        "insert overwrite table dw.t",
        "select 1 /* unterminated",
        "select `` from t",
    ];
    for sql in sqls {
        println!("Testing parsing error for SQL: {}", sql);
        assert!(parse_sql(sql).is_err())
    }
}

#[test]
fn test_error_position() {
    let err = parse_sql("select 1;\nselect 2)").expect_err("unbalanced parenthesis");
    assert!(err.to_string().starts_with("[line 2, col "));
}
