//! Integration test: TOML configuration files feeding the loops.

use std::io::Write;

use balance_common::config::{ConfigError, ConfigLoader};
use balance_common::control_unit::config::BalanceConfig;
use balance_control_unit::cycle::TickOutcome;
use balance_control_unit::supervisor::DisengageReason;

use super::Harness;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn file_overrides_reach_the_supervisor() {
    let file = write_config(
        r#"
[mechanics]
mount_angle = 0.0

[estimator]
filter_w = 100.0

[safety]
tip_angle = 0.5
"#,
    );
    let config = BalanceConfig::load(file.path()).unwrap();
    config.validate().unwrap();
    assert_eq!(config.safety.tip_angle, 0.5);
    assert_eq!(config.rates, BalanceConfig::default().rates);

    let mut h = Harness::running_at(config, 0.0);
    h.engage();
    h.tick(0.6);
    assert!(matches!(
        h.tick(0.6),
        TickOutcome::Disengaged(DisengageReason::TipOver { .. })
    ));
}

#[test]
fn custom_inner_coefficients_parse() {
    let file = write_config(
        r#"
[inner.filter]
gain = 0.8
num = [-4.0, 7.0, -3.0]
den = [1.0, -1.5, 0.5]
"#,
    );
    let config = BalanceConfig::load(file.path()).unwrap();
    config.validate().unwrap();
    assert_eq!(config.inner.filter.gain, 0.8);
    assert_eq!(config.inner.filter.num.as_slice(), &[-4.0, 7.0, -3.0]);
}

#[test]
fn invalid_file_is_rejected_at_validation() {
    let file = write_config("[estimator]\nfilter_w = 250.0\n");
    let config = BalanceConfig::load(file.path()).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = BalanceConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert_eq!(err, ConfigError::FileNotFound);
}
