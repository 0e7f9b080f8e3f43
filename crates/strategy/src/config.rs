use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use common::{Error, Result};

/// Top-level strategy config file (TOML).
///
/// Families are registered in file order; each contributes its buy rule and
/// then its sell rule. Example `config/strategies.toml`:
/// ```toml
/// [[family]]
/// type = "lr"
///
/// [[family]]
/// type = "lg"
///
/// [family.params]
/// lower_band = 0.2
/// upper_band = 0.8
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    #[serde(rename = "family")]
    pub families: Vec<FamilyConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FamilyConfig {
    /// Rule family identifier: "lr" or "lg".
    #[serde(rename = "type")]
    pub family_type: String,
    /// Family-specific parameters.
    #[serde(default)]
    pub params: HashMap<String, toml::Value>,
}

impl FamilyConfig {
    pub fn new(family_type: impl Into<String>) -> Self {
        Self {
            family_type: family_type.into(),
            params: HashMap::new(),
        }
    }

    /// Fails on any parameter not listed in `known`.
    pub fn check_params(&self, known: &[&str]) -> Result<()> {
        let mut unknown: Vec<&str> = self
            .params
            .keys()
            .map(String::as_str)
            .filter(|k| !known.iter().any(|n| n == k))
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }
        unknown.sort_unstable();
        Err(Error::Config(format!(
            "family '{}': unknown parameter(s) {}",
            self.family_type,
            unknown.join(", ")
        )))
    }

    /// Float parameter with a default. Integers are accepted as floats.
    pub fn param_f64(&self, key: &str, default: f64) -> Result<f64> {
        match self.params.get(key) {
            None => Ok(default),
            Some(toml::Value::Float(v)) => Ok(*v),
            Some(toml::Value::Integer(v)) => Ok(*v as f64),
            Some(other) => Err(Error::Config(format!(
                "family '{}': parameter '{key}' must be a number, got {other}",
                self.family_type
            ))),
        }
    }
}

impl StrategyFileConfig {
    /// The LR family followed by the LG family with default bands.
    pub fn standard() -> Self {
        Self {
            families: vec![FamilyConfig::new("lr"), FamilyConfig::new("lg")],
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("invalid strategy config: {e}")))
    }

    /// Load from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read strategy config at '{path}': {e}"))
        })?;
        Self::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_families_in_order() {
        let cfg = StrategyFileConfig::parse(
            r#"
            [[family]]
            type = "lr"

            [[family]]
            type = "lg"

            [family.params]
            lower_band = 0.25
            upper_band = 1
            "#,
        )
        .unwrap();
        assert_eq!(cfg.families.len(), 2);
        assert_eq!(cfg.families[0].family_type, "lr");
        let lg = &cfg.families[1];
        assert_eq!(lg.param_f64("lower_band", 0.2).unwrap(), 0.25);
        assert_eq!(lg.param_f64("upper_band", 0.8).unwrap(), 1.0);
        assert_eq!(lg.param_f64("missing", 0.5).unwrap(), 0.5);
    }

    #[test]
    fn non_numeric_param_is_config_error() {
        let cfg = StrategyFileConfig::parse(
            r#"
            [[family]]
            type = "lg"
            params = { upper_band = "high" }
            "#,
        )
        .unwrap();
        assert!(matches!(
            cfg.families[0].param_f64("upper_band", 0.8),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn unknown_params_are_named() {
        let cfg = StrategyFileConfig::parse(
            r#"
            [[family]]
            type = "lg"
            params = { upper_bnad = 0.95, lower_band = 0.1, zz = 1 }
            "#,
        )
        .unwrap();
        let family = &cfg.families[0];
        match family.check_params(&["lower_band", "upper_band"]) {
            Err(Error::Config(msg)) => assert!(msg.ends_with("upper_bnad, zz"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(family
            .check_params(&["lower_band", "upper_band", "upper_bnad", "zz"])
            .is_ok());
    }

    #[test]
    fn garbage_is_config_error() {
        assert!(matches!(
            StrategyFileConfig::parse("family = 3"),
            Err(Error::Config(_))
        ));
    }
}
