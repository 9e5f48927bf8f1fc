//! Runtime configuration: an optional JSON file overridden by environment.
//!
//! The file named by `UPLIFT_CONFIG` is the base layer; any `UPLIFT_*`
//! variable set in the environment wins over it. Everything is validated
//! before a session can be built from it.

use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bidding::domain::BidStrategy;
use crate::common::error::{UpliftError, UpliftResult};
use crate::common::log::LogFormat;
use crate::pacing::domain::ControllerConfig;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_PATH_VAR: &str = "UPLIFT_CONFIG";

/// Snapshot of configuration values consumed by the core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppCfg {
    /// Directory holding the treatment and control model artefacts.
    pub model_dir: PathBuf,
    /// Monetary value of one incremental conversion.
    pub conversion_value: f64,
    pub controller: ControllerConfig,
    /// Budget for one pacing period; enables the spend ledger when set.
    pub budget: Option<f64>,
    pub workers: usize,
    pub strategy: BidStrategy,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("./models/v2"),
            conversion_value: 100.0,
            controller: ControllerConfig::default(),
            budget: None,
            workers: 4,
            strategy: BidStrategy::Uplift,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppCfg {
    /// Load from the process environment.
    pub fn load() -> UpliftResult<Self> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn load_from<F>(lookup: F) -> UpliftResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        cfg.apply_env(&lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> UpliftResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| {
            UpliftError::invalid_config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> UpliftResult<Self> {
        serde_json::from_str(raw)
            .map_err(|err| UpliftError::invalid_config(format!("config file: {err}")))
    }

    fn apply_env<F>(&mut self, lookup: &F) -> UpliftResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("UPLIFT_MODEL_DIR") {
            self.model_dir = PathBuf::from(dir);
        }
        override_with(lookup, "UPLIFT_CONVERSION_VALUE", &mut self.conversion_value)?;
        override_with(lookup, "UPLIFT_KP", &mut self.controller.kp)?;
        override_with(lookup, "UPLIFT_KI", &mut self.controller.ki)?;
        override_with(lookup, "UPLIFT_KD", &mut self.controller.kd)?;
        override_with(
            lookup,
            "UPLIFT_TARGET_SPEND_RATE",
            &mut self.controller.target_spend_rate,
        )?;
        if let Some(budget) = parse_var(lookup, "UPLIFT_BUDGET")? {
            self.budget = Some(budget);
        }
        override_with(lookup, "UPLIFT_WORKERS", &mut self.workers)?;
        override_with(lookup, "UPLIFT_STRATEGY", &mut self.strategy)?;
        if let Some(level) = lookup("UPLIFT_LOG_LEVEL") {
            self.log_level = level;
        }
        override_with(lookup, "UPLIFT_LOG_FORMAT", &mut self.log_format)?;
        Ok(())
    }

    pub fn validate(&self) -> UpliftResult<()> {
        self.controller.validate()?;
        if !self.conversion_value.is_finite() {
            return Err(UpliftError::invalid_config(format!(
                "conversion_value must be finite, got {}",
                self.conversion_value
            )));
        }
        if self.workers == 0 {
            return Err(UpliftError::invalid_config("workers must be at least 1"));
        }
        if let Some(budget) = self.budget {
            if !(budget.is_finite() && budget > 0.0) {
                return Err(UpliftError::invalid_config(format!(
                    "budget must be finite and positive, got {budget}"
                )));
            }
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> UpliftResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| UpliftError::invalid_config(format!("{key}={raw:?}: {err}"))),
    }
}

fn override_with<F, T>(lookup: &F, key: &str, slot: &mut T) -> UpliftResult<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    if let Some(value) = parse_var(lookup, key)? {
        *slot = value;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;
    use crate::common::error::ErrorCode;
    use crate::pacing::domain::AntiWindup;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = AppCfg::load_from(vars(&[])).unwrap();
        assert_eq!(cfg, AppCfg::default());
        assert_eq!(cfg.conversion_value, 100.0);
        assert_eq!(cfg.model_dir, PathBuf::from("./models/v2"));
    }

    #[test]
    fn environment_overrides() {
        let cfg = AppCfg::load_from(vars(&[
            ("UPLIFT_KP", "0.2"),
            ("UPLIFT_TARGET_SPEND_RATE", "0.05"),
            ("UPLIFT_CONVERSION_VALUE", "42.5"),
            ("UPLIFT_BUDGET", "500"),
            ("UPLIFT_STRATEGY", "propensity"),
            ("UPLIFT_LOG_FORMAT", "json"),
            ("UPLIFT_MODEL_DIR", "/srv/models"),
        ]))
        .unwrap();
        assert_eq!(cfg.controller.kp, 0.2);
        assert_eq!(cfg.controller.target_spend_rate, 0.05);
        assert_eq!(cfg.conversion_value, 42.5);
        assert_eq!(cfg.budget, Some(500.0));
        assert_eq!(cfg.strategy, BidStrategy::Propensity);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.model_dir, PathBuf::from("/srv/models"));
    }

    #[test]
    fn unparseable_values_fail_fast() {
        let err = AppCfg::load_from(vars(&[("UPLIFT_KI", "lots")])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidConfig);
        assert!(err.to_string().contains("UPLIFT_KI"));
    }

    #[test]
    fn invalid_controller_settings_fail_fast() {
        let err = AppCfg::load_from(vars(&[("UPLIFT_TARGET_SPEND_RATE", "1.5")])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidConfig);
        assert!(AppCfg::load_from(vars(&[("UPLIFT_WORKERS", "0")])).is_err());
        assert!(AppCfg::load_from(vars(&[("UPLIFT_BUDGET", "-1")])).is_err());
    }

    #[test]
    fn file_is_overridden_by_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"conversion_value": 80.0,
                "workers": 2,
                "controller": {{"kp": 0.3, "ki": 0.0, "kd": 0.1, "target_spend_rate": 0.25,
                                "ceiling": 4.0, "anti_windup": {{"mode": "reset_on_saturation"}}}}}}"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let cfg = AppCfg::load_from(vars(&[
            (CONFIG_PATH_VAR, path.as_str()),
            ("UPLIFT_WORKERS", "8"),
        ]))
        .unwrap();
        assert_eq!(cfg.conversion_value, 80.0);
        assert_eq!(cfg.workers, 8);
        assert_eq!(cfg.controller.kp, 0.3);
        assert_eq!(cfg.controller.ceiling, Some(4.0));
        assert_eq!(cfg.controller.anti_windup, AntiWindup::ResetOnSaturation);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = AppCfg::load_from(vars(&[(CONFIG_PATH_VAR, "/definitely/not/here.json")]))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidConfig);
    }
}
