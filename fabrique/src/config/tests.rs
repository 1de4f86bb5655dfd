//! Tests for layered configuration loading.

use camino::Utf8Path;
use rstest::rstest;

use super::FactoryConfig;

fn load_in_jail(path: Option<&str>) -> figment::error::Result<FactoryConfig> {
    FactoryConfig::load(path.map(Utf8Path::new), "FABRIQUE_")
        .map_err(|err| figment::Error::from(err.to_string()))
}

#[rstest]
fn defaults_start_at_zero() {
    figment::Jail::expect_with(|jail| {
        jail.clear_env();
        let config = load_in_jail(None)?;
        assert_eq!(config, FactoryConfig::new());
        assert_eq!(config.start(), 0);
        Ok(())
    });
}

#[rstest]
fn file_sets_starting_number() {
    figment::Jail::expect_with(|jail| {
        jail.clear_env();
        jail.create_file("factory.toml", "startingSequenceNumber = 100")?;
        let config = load_in_jail(Some("factory.toml"))?;
        assert_eq!(config.start(), 100);
        Ok(())
    });
}

#[rstest]
fn environment_overrides_file() {
    figment::Jail::expect_with(|jail| {
        jail.clear_env();
        jail.create_file("factory.toml", "starting_sequence_number = 100")?;
        jail.set_env("FABRIQUE_STARTING_SEQUENCE_NUMBER", "7");
        let config = load_in_jail(Some("factory.toml"))?;
        assert_eq!(config.start(), 7);
        Ok(())
    });
}

#[rstest]
fn missing_file_is_ignored() {
    figment::Jail::expect_with(|jail| {
        jail.clear_env();
        let config = load_in_jail(Some("absent.toml"))?;
        assert_eq!(config.start(), 0);
        Ok(())
    });
}

#[rstest]
fn malformed_value_is_reported() {
    figment::Jail::expect_with(|jail| {
        jail.clear_env();
        jail.set_env("FABRIQUE_STARTING_SEQUENCE_NUMBER", "not-a-number");
        let outcome = FactoryConfig::load(None, "FABRIQUE_");
        assert!(outcome.is_err(), "expected a configuration error");
        Ok(())
    });
}

#[rstest]
fn builder_style_setter() {
    let config = FactoryConfig::new().with_starting_sequence_number(3);
    assert_eq!(config.starting_sequence_number, Some(3));
    assert_eq!(config.start(), 3);
}
