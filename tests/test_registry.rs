use hanlu::{
    config::EngineConfig,
    instance::{DataSourceInstance, DataSourceKind, HdfsInstance, HiveInstance, MySqlInstance},
    registry::InstanceRegistry,
};

fn hosts(hosts: &[&str]) -> Vec<String> {
    hosts.iter().map(|&host| host.to_owned()).collect()
}

fn obs_instance() -> HdfsInstance {
    HdfsInstance::obs(Some("obs.example.com"), "dw-bucket")
}

#[test]
fn test_resolve_hive_url() {
    let registry = InstanceRegistry::new();
    let instance = registry.resolve_by_connection_url(
        "jdbc:hive2://h1:2181,h2:2181/mydb;x=y",
        Some("etl"),
        None,
    );
    let DataSourceInstance::Hive(hive) = &instance else {
        panic!("Expected a hive instance, got {:?}", instance);
    };
    assert_eq!(hive.hosts, hosts(&["h1:2181", "h2:2181"]));
    assert_eq!(hive.schema.as_deref(), Some("mydb"));
    assert_eq!(hive.username.as_deref(), Some("etl"));
    assert_eq!(hive.name, None);
}

#[test]
fn test_resolve_hive_url_without_schema() {
    let registry = InstanceRegistry::new();
    for url in [
        "jdbc:hive2://h1:10000",
        "jdbc:hive2://h1:10000/",
        "jdbc:hive2://h1:10000/;serviceDiscoveryMode=zooKeeper",
    ] {
        let DataSourceInstance::Hive(hive) = registry.resolve_by_connection_url(url, None, None)
        else {
            panic!("Expected a hive instance for {}", url);
        };
        assert_eq!(hive.hosts, hosts(&["h1:10000"]));
        assert_eq!(hive.schema, None);
    }
}

#[test]
fn test_display_name_does_not_change_identity() {
    let mut registry = InstanceRegistry::new();
    registry.register_hive_cluster(&hosts(&["h1:2181", "h2:2181"]), "warehouse", None);

    let url = "jdbc:hive2://h1:2181,h2:2181/dw";
    let named = registry.resolve_by_connection_url(url, None, None);
    let unnamed = InstanceRegistry::new().resolve_by_connection_url(url, None, None);
    assert_eq!(named.name(), Some("warehouse"));
    assert_eq!(unnamed.name(), None);
    assert_eq!(named, unnamed);
}

#[test]
fn test_name_is_looked_up_from_first_host() {
    let mut registry = InstanceRegistry::new();
    registry.register_hive_cluster(&hosts(&["h1:2181", "h2:2181"]), "warehouse", None);

    let instance =
        registry.resolve_by_connection_url("jdbc:hive2://h3:2181,h1:2181/dw", None, None);
    assert_eq!(instance.name(), None);
}

#[test]
fn test_resolve_mysql_url() {
    let mut registry = InstanceRegistry::new();
    registry.register_mysql_server("10.0.1.1", 3306, "orders_db");

    let instance = registry.resolve_by_connection_url(
        "jdbc:mysql://10.0.1.1:3306/shop?useSSL=false&characterEncoding=utf8",
        Some("reader"),
        Some("secret"),
    );
    let expected = DataSourceInstance::MySql(MySqlInstance {
        name: None,
        host: "10.0.1.1".to_owned(),
        port: 3306,
        username: Some("reader".to_owned()),
        password: Some("secret".to_owned()),
        schema: Some("shop".to_owned()),
    });
    assert_eq!(instance, expected);
    assert_eq!(instance.name(), Some("orders_db"));
    assert_eq!(instance.kind(), DataSourceKind::MySql);
}

#[test]
fn test_unsupported_urls_resolve_to_unknown() {
    let registry = InstanceRegistry::new();
    for url in [
        "hive2://h1:2181/db",
        "jdbc:postgresql://10.0.0.1:5432/db",
        "jdbc:mysql://10.0.1.1/shop",
        "jdbc:mysql://10.0.1.1:port/shop",
    ] {
        assert!(
            registry
                .resolve_by_connection_url(url, None, None)
                .is_unknown(),
            "{} should resolve to unknown",
            url
        );
    }
}

#[test]
fn test_resolve_from_filesystem_path() {
    let mut registry = InstanceRegistry::new();
    registry.register_hive_cluster(
        &hosts(&["h1:2181"]),
        "warehouse",
        Some((obs_instance(), "/user/hive/warehouse")),
    );

    let resolved = registry.resolve_from_filesystem_path(
        &obs_instance(),
        "/user/hive/warehouse/ods.db/orders",
    );
    let expected = DataSourceInstance::Hive(HiveInstance {
        name: Some("warehouse".to_owned()),
        hosts: hosts(&["h1:2181"]),
        username: None,
        password: None,
        schema: Some("ods".to_owned()),
    });
    assert_eq!(resolved, Some(expected));
    assert_eq!(
        resolved.and_then(|instance| instance.name().map(str::to_owned)),
        Some("warehouse".to_owned())
    );
}

#[test]
fn test_resolve_from_filesystem_path_misses() {
    let mut registry = InstanceRegistry::new();
    registry.register_hive_cluster(
        &hosts(&["h1:2181"]),
        "warehouse",
        Some((obs_instance(), "/user/hive/warehouse")),
    );

    // other filesystem
    let other = HdfsInstance::obs(Some("obs.example.com"), "other-bucket");
    assert_eq!(
        registry.resolve_from_filesystem_path(&other, "/user/hive/warehouse/ods.db/orders"),
        None
    );
    // outside the root
    assert_eq!(
        registry.resolve_from_filesystem_path(&obs_instance(), "/tmp/ods.db/orders"),
        None
    );
    // no schema directory
    assert_eq!(
        registry.resolve_from_filesystem_path(&obs_instance(), "/user/hive/warehouse/"),
        None
    );
}

#[test]
fn test_first_registered_root_wins() {
    let path = "/a/b/db1.db/t1";

    let mut inner_first = InstanceRegistry::new();
    inner_first.register_hive_cluster(
        &hosts(&["inner:2181"]),
        "inner",
        Some((obs_instance(), "/a/b")),
    );
    inner_first.register_hive_cluster(
        &hosts(&["outer:2181"]),
        "outer",
        Some((obs_instance(), "/a")),
    );
    let resolved = inner_first
        .resolve_from_filesystem_path(&obs_instance(), path)
        .expect("path is under a registered root");
    assert_eq!(resolved.name(), Some("inner"));
    let DataSourceInstance::Hive(hive) = resolved else {
        panic!("Expected a hive instance");
    };
    assert_eq!(hive.schema.as_deref(), Some("db1"));

    let mut outer_first = InstanceRegistry::new();
    outer_first.register_hive_cluster(
        &hosts(&["outer:2181"]),
        "outer",
        Some((obs_instance(), "/a")),
    );
    outer_first.register_hive_cluster(
        &hosts(&["inner:2181"]),
        "inner",
        Some((obs_instance(), "/a/b")),
    );
    let resolved = outer_first
        .resolve_from_filesystem_path(&obs_instance(), path)
        .expect("path is under a registered root");
    assert_eq!(resolved.name(), Some("outer"));
    let DataSourceInstance::Hive(hive) = resolved else {
        panic!("Expected a hive instance");
    };
    assert_eq!(hive.schema.as_deref(), Some("b"));
}

#[test]
fn test_resolve_warehouse_node() {
    let mut registry = InstanceRegistry::new();
    let hdfs = HdfsInstance::new("hdfs://nameservice1");
    registry.register_hive_cluster(
        &hosts(&["h1:2181"]),
        "warehouse",
        Some((hdfs.clone(), "/warehouse")),
    );

    let node = registry
        .resolve_warehouse_node(&hdfs, "/warehouse/dw.db/orders/dt=20240730")
        .expect("path is under a registered root");
    assert_eq!(node.schema.as_deref(), Some("dw"));
    assert_eq!(node.table.as_deref(), Some("orders"));
    assert_eq!(node.qualified_name(), "dw.orders");

    let schema_only = registry
        .resolve_warehouse_node(&hdfs, "/warehouse/dw.db")
        .expect("path is under a registered root");
    assert_eq!(schema_only.table, None);
}

#[test]
fn test_registry_from_config() {
    let config = EngineConfig::from_toml_str(
        r#"
        [[hive]]
        name = "warehouse"
        hosts = ["10.0.0.1:2181", "10.0.0.2:2181"]
        warehouse = { default_fs = "obs://dw-bucket", obs_endpoint = "obs.example.com", obs_bucket = "dw-bucket", root_path = "/user/hive/warehouse" }

        [[mysql]]
        name = "orders_db"
        host = "10.0.1.1"
        port = 3306
        "#,
    )
    .expect("valid configuration");
    let registry = InstanceRegistry::from_config(&config);

    assert_eq!(
        registry
            .resolve_by_connection_url("jdbc:hive2://10.0.0.2:2181/dw", None, None)
            .name(),
        Some("warehouse")
    );
    assert_eq!(
        registry
            .resolve_by_connection_url("jdbc:mysql://10.0.1.1:3306/shop", None, None)
            .name(),
        Some("orders_db")
    );
    assert!(
        registry
            .resolve_from_filesystem_path(&obs_instance(), "/user/hive/warehouse/ods.db/orders")
            .is_some()
    );
}

#[test]
fn test_config_defaults_and_unknown_fields() {
    let config = EngineConfig::from_toml_str("").expect("empty configuration is valid");
    assert!(config.shell.is_ignored("echo"));
    for test_command in ["[", "[[", "test"] {
        assert!(config.shell.is_ignored(test_command));
    }
    assert!(!config.shell.is_ignored("beeline"));
    assert_eq!(config.shell.beeline_command, "beeline");
    assert!(config.hive.is_empty());

    let config = EngineConfig::from_toml_str(
        r#"
        [shell]
        ignored_commands = ["hdfs"]
        "#,
    )
    .expect("valid configuration");
    assert!(config.shell.is_ignored("hdfs"));
    assert!(!config.shell.is_ignored("echo"));
    assert_eq!(config.shell.spark_submit_command, "spark-submit");

    assert!(EngineConfig::from_toml_str("[[hive]]\nname = \"x\"\nhosts = []\nport = 1").is_err());
}
