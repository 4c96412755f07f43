//! The shipped config file parses and matches the built-in defaults.

use cinemetrics_core::DashboardConfig;

#[test]
fn shipped_config_equals_defaults() {
    let config = DashboardConfig::from_toml_str(include_str!("../cinemetrics.toml")).unwrap();
    config.validate().unwrap();
    assert_eq!(config, DashboardConfig::default());
}
