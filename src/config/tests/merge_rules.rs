use crate::config::api::*;
use std::collections::BTreeMap;

fn parse(text: &str) -> ActivationConfig {
    let table: toml::Table = toml::from_str(text).unwrap();
    ActivationConfig::from_toml_table(&table, "test.toml").unwrap()
}

#[test]
fn test_toml_forms() {
    let config = parse(
        r#"
        modules = ["seo", "search"]
        analytics = false
        sitemap = ["index", "images"]

        [schema]
        article = true
        product = false
        "#,
    );

    assert_eq!(config.get("seo"), Some(&ModuleSetting::Enabled(true)));
    assert_eq!(config.get("search"), Some(&ModuleSetting::Enabled(true)));
    assert_eq!(config.get("analytics"), Some(&ModuleSetting::Enabled(false)));

    let sitemap = config.get("sitemap").unwrap();
    assert!(sitemap.is_enabled());
    assert_eq!(sitemap.feature("images"), Some(true));
    assert_eq!(sitemap.feature("video"), None);

    let schema = config.get("schema").unwrap();
    assert_eq!(schema.feature("article"), Some(true));
    assert_eq!(schema.feature("product"), Some(false));
}

#[test]
fn test_queue_table_is_not_a_module() {
    let config = parse(
        r#"
        seo = true
        [queue]
        time_limit = 5
        "#,
    );
    assert_eq!(config.module_ids().collect::<Vec<_>>(), vec!["seo"]);
}

#[test]
fn test_rejects_non_boolean_feature_values() {
    let table: toml::Table = toml::from_str("[seo]\nsitemap = \"yes\"").unwrap();
    let err = ActivationConfig::from_toml_table(&table, "bad.toml").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "seo"));
    assert!(err.to_string().contains("bad.toml"));
}

#[test]
fn test_rejects_mixed_module_list() {
    let table: toml::Table = toml::from_str("modules = [\"seo\", 3]").unwrap();
    assert!(ActivationConfig::from_toml_table(&table, "bad.toml").is_err());
}

#[test]
fn test_later_layer_wins_per_key() {
    let base = ActivationConfig::new()
        .feature("seo", "sitemap", true)
        .feature("seo", "schema", true)
        .enable("search");
    let over = ActivationConfig::new()
        .feature("seo", "schema", false)
        .disable("search");

    let merged = ActivationConfig::merge_all([&base, &over]);

    let seo = merged.get("seo").unwrap();
    assert_eq!(seo.feature("sitemap"), Some(true));
    assert_eq!(seo.feature("schema"), Some(false));
    assert_eq!(merged.get("search"), Some(&ModuleSetting::Enabled(false)));
}

#[test]
fn test_boolean_replaces_feature_map() {
    let base = ActivationConfig::new().feature("seo", "sitemap", true);
    let over = ActivationConfig::new().disable("seo");

    let merged = ActivationConfig::merge_all([&base, &over]);
    assert_eq!(merged.get("seo"), Some(&ModuleSetting::Enabled(false)));
}

#[test]
fn test_merge_is_associative_and_idempotent() {
    let a = ActivationConfig::new().feature("seo", "sitemap", true).enable("a");
    let b = ActivationConfig::new().feature("seo", "schema", false).disable("a");
    let c = ActivationConfig::new().feature("seo", "sitemap", false).enable("c");

    let left = {
        let mut ab = ActivationConfig::merge_all([&a, &b]);
        ab.merge(&c);
        ab
    };
    let right = {
        let bc = ActivationConfig::merge_all([&b, &c]);
        let mut merged = a.clone();
        merged.merge(&bc);
        merged
    };
    assert_eq!(left, right);

    let twice = ActivationConfig::merge_all([&a, &a]);
    assert_eq!(twice, a);
}

#[test]
fn test_feature_on_boolean_entry_becomes_map() {
    let config = ActivationConfig::new().enable("seo").feature("seo", "sitemap", true);
    let expected: BTreeMap<String, bool> = [("sitemap".to_string(), true)].into();
    assert_eq!(config.get("seo"), Some(&ModuleSetting::Features(expected)));
}

#[test]
fn test_empty_feature_map_is_off() {
    assert!(!ModuleSetting::Features(BTreeMap::new()).is_enabled());
}

#[test]
fn test_serializes_as_plain_map() {
    let config = ActivationConfig::new().enable("seo").feature("search", "facets", true);
    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["seo"], true);
    assert_eq!(json["search"]["facets"], true);

    let back: ActivationConfig = serde_json::from_value(json).unwrap();
    assert_eq!(back, config);
}
