use anyhow::Result;
use flotilla_config::{Config, ConfigError};

const CANONICAL: &str = "\
settings:
  catalog_url: https://example.com/catalog
products:
- name: Product A
  enabled: true
  namespace: product-a
- name: Product B
  enabled: false
";

#[test]
fn marshal_unmarshal_round_trip() -> Result<()> {
    let config = Config::from_yaml(CANONICAL, "installer")?;
    let payload = config.to_yaml()?;
    assert_eq!(payload, CANONICAL);
    Ok(())
}

#[test]
fn empty_settings_block_is_permitted() -> Result<()> {
    let config = Config::from_yaml("settings: {}\nproducts: []\n", "installer")?;
    assert!(config.settings.is_empty());
    assert_eq!(config.products().count(), 0);
    Ok(())
}

#[test]
fn missing_settings_key_is_rejected() {
    let err = Config::from_yaml("products: []\n", "installer").unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
fn enabled_product_defaults_to_installer_namespace() -> Result<()> {
    let config = Config::from_yaml(
        "settings: {}\nproducts:\n- name: P\n  enabled: true\n",
        "installer",
    )?;
    assert_eq!(config.product("P")?.namespace_or("installer"), "installer");
    Ok(())
}

#[test]
fn enabled_product_without_any_namespace_is_rejected() {
    let err = Config::from_yaml(
        "settings: {}\nproducts:\n- name: P\n  enabled: true\n",
        "",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ProductWithoutNamespace(name) if name == "P"));
}

#[test]
fn disabled_products_skip_namespace_validation() -> Result<()> {
    Config::from_yaml("settings: {}\nproducts:\n- name: P\n", "")?;
    Ok(())
}

#[test]
fn product_lookup_by_name() -> Result<()> {
    let mut config = Config::from_yaml(CANONICAL, "installer")?;
    assert!(config.product("Product A")?.enabled);
    assert!(matches!(
        config.product("Nope"),
        Err(ConfigError::ProductNotFound(_))
    ));

    config.product_mut("Product B")?.enabled = true;
    assert_eq!(config.enabled_products().count(), 2);
    Ok(())
}
