//! Configuration validation.
//!
//! Validates all config fields before a run starts.

use crate::domain::error::StratbenchError;
use crate::domain::exact::Exact;
use crate::domain::policy::PolicyKind;
use crate::ports::config_port::ConfigPort;

pub const RESULT_BACKENDS: [&str; 3] = ["csv", "sqlite", "none"];

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), StratbenchError> {
    validate_balances(config)?;
    validate_fee_rate(config)?;
    validate_step_interval(config)?;
    validate_risk_free_rate(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), StratbenchError> {
    require_non_empty(config, "data", "price_dir")
}

pub fn validate_results_config(config: &dyn ConfigPort) -> Result<(), StratbenchError> {
    let backend = config
        .get_string("results", "backend")
        .unwrap_or_else(|| "csv".to_string());
    match backend.trim() {
        "csv" => require_non_empty(config, "results", "dir"),
        "sqlite" => require_non_empty(config, "results", "sqlite_path"),
        "none" => Ok(()),
        other => Err(invalid(
            "results",
            "backend",
            format!("unknown backend '{other}', expected one of: {}", RESULT_BACKENDS.join(", ")),
        )),
    }
}

pub fn validate_policy_config(config: &dyn ConfigPort) -> Result<(), StratbenchError> {
    let kind = match config.get_string("policy", "kind") {
        Some(s) if !s.trim().is_empty() => s
            .parse::<PolicyKind>()
            .map_err(|e| invalid("policy", "kind", e.to_string()))?,
        _ => return Err(missing("policy", "kind")),
    };
    match kind {
        PolicyKind::Dca => validate_initial_buy_pct(config),
        PolicyKind::FearGreed => {
            require_non_empty(config, "policy", "sentiment_path")?;
            validate_thresholds(config)
        }
        PolicyKind::AllIn | PolicyKind::AllInBottom | PolicyKind::AllInTop => Ok(()),
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StratbenchError {
    StratbenchError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> StratbenchError {
    StratbenchError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn require_non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), StratbenchError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(missing(section, key)),
    }
}

fn validate_balances(config: &dyn ConfigPort) -> Result<(), StratbenchError> {
    let cash = config.get_exact("simulation", "starting_cash", Exact::from(100))?;
    if cash.is_negative() {
        return Err(invalid("simulation", "starting_cash", "starting_cash must be non-negative"));
    }
    let asset = config.get_exact("simulation", "starting_asset", Exact::zero())?;
    if asset.is_negative() {
        return Err(invalid("simulation", "starting_asset", "starting_asset must be non-negative"));
    }
    if cash.is_zero() && asset.is_zero() {
        return Err(invalid(
            "simulation",
            "starting_cash",
            "starting_cash and starting_asset cannot both be zero",
        ));
    }
    Ok(())
}

fn validate_fee_rate(config: &dyn ConfigPort) -> Result<(), StratbenchError> {
    let value = config.get_exact("simulation", "fee_rate", Exact::ratio(997, 1000)?)?;
    if !value.is_positive() || value > Exact::one() {
        return Err(invalid(
            "simulation",
            "fee_rate",
            "fee_rate is the share kept after fees and must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_step_interval(config: &dyn ConfigPort) -> Result<(), StratbenchError> {
    let value = config.get_int("simulation", "step_interval", 86_400);
    if value <= 0 {
        return Err(invalid(
            "simulation",
            "step_interval",
            "step_interval must be a positive number of seconds",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), StratbenchError> {
    let value = config.get_double("simulation", "risk_free_rate", 0.03);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "simulation",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_initial_buy_pct(config: &dyn ConfigPort) -> Result<(), StratbenchError> {
    let value = config.get_exact("policy", "initial_buy_pct", Exact::from(30))?;
    if value.is_negative() || value > Exact::from(100) {
        return Err(invalid(
            "policy",
            "initial_buy_pct",
            "initial_buy_pct must be between 0 and 100",
        ));
    }
    Ok(())
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), StratbenchError> {
    let buy = config.get_int("policy", "buy_threshold", 60);
    let sell = config.get_int("policy", "sell_threshold", 40);
    for (key, value) in [("buy_threshold", buy), ("sell_threshold", sell)] {
        if !(0..=100).contains(&value) {
            return Err(invalid("policy", key, format!("{key} must be between 0 and 100")));
        }
    }
    if sell >= buy {
        return Err(invalid(
            "policy",
            "sell_threshold",
            "sell_threshold must be below buy_threshold",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_simulation_config_passes() {
        let config = make_config(
            r#"
[simulation]
starting_cash = 100
starting_asset = 0
fee_rate = 0.997
step_interval = 86400
risk_free_rate = 0.03
"#,
        );
        assert!(validate_simulation_config(&config).is_ok());
    }

    #[test]
    fn empty_simulation_section_uses_defaults() {
        let config = make_config("[simulation]\n");
        assert!(validate_simulation_config(&config).is_ok());
    }

    #[test]
    fn negative_cash_fails() {
        let config = make_config("[simulation]\nstarting_cash = -1\n");
        let err = validate_simulation_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigInvalid { key, .. } if key == "starting_cash"));
    }

    #[test]
    fn zero_balances_fail() {
        let config = make_config("[simulation]\nstarting_cash = 0\nstarting_asset = 0\n");
        let err = validate_simulation_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigInvalid { key, .. } if key == "starting_cash"));
    }

    #[test]
    fn asset_only_start_passes() {
        let config = make_config("[simulation]\nstarting_cash = 0\nstarting_asset = 3/2\n");
        assert!(validate_simulation_config(&config).is_ok());
    }

    #[test]
    fn non_numeric_cash_fails() {
        let config = make_config("[simulation]\nstarting_cash = lots\n");
        let err = validate_simulation_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigInvalid { key, .. } if key == "starting_cash"));
    }

    #[test]
    fn fee_rate_bounds() {
        for bad in ["0", "-0.5", "1.01"] {
            let config = make_config(&format!("[simulation]\nfee_rate = {bad}\n"));
            let err = validate_simulation_config(&config).unwrap_err();
            assert!(matches!(err, StratbenchError::ConfigInvalid { key, .. } if key == "fee_rate"));
        }
        let config = make_config("[simulation]\nfee_rate = 1\n");
        assert!(validate_simulation_config(&config).is_ok());
    }

    #[test]
    fn step_interval_must_be_positive() {
        let config = make_config("[simulation]\nstep_interval = 0\n");
        let err = validate_simulation_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigInvalid { key, .. } if key == "step_interval"));
    }

    #[test]
    fn risk_free_rate_out_of_range_fails() {
        let config = make_config("[simulation]\nrisk_free_rate = 1.5\n");
        let err = validate_simulation_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigInvalid { key, .. } if key == "risk_free_rate"));
    }

    #[test]
    fn missing_price_dir_fails() {
        let config = make_config("[data]\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigMissing { key, .. } if key == "price_dir"));
    }

    #[test]
    fn results_backends() {
        let config = make_config("[results]\nbackend = csv\ndir = results\n");
        assert!(validate_results_config(&config).is_ok());

        let config = make_config("[results]\nbackend = none\n");
        assert!(validate_results_config(&config).is_ok());

        let config = make_config("[results]\nbackend = sqlite\n");
        let err = validate_results_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigMissing { key, .. } if key == "sqlite_path"));

        let config = make_config("[results]\nbackend = parquet\n");
        let err = validate_results_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigInvalid { key, .. } if key == "backend"));
    }

    #[test]
    fn missing_policy_kind_fails() {
        let config = make_config("[policy]\n");
        let err = validate_policy_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigMissing { key, .. } if key == "kind"));
    }

    #[test]
    fn unknown_policy_kind_fails() {
        let config = make_config("[policy]\nkind = hodl\n");
        let err = validate_policy_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigInvalid { key, .. } if key == "kind"));
    }

    #[test]
    fn dca_split_bounds() {
        let config = make_config("[policy]\nkind = dca\ninitial_buy_pct = 30\n");
        assert!(validate_policy_config(&config).is_ok());

        let config = make_config("[policy]\nkind = dca\ninitial_buy_pct = 120\n");
        let err = validate_policy_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigInvalid { key, .. } if key == "initial_buy_pct"));
    }

    #[test]
    fn fear_greed_needs_sentiment_file() {
        let config = make_config("[policy]\nkind = fear_greed\n");
        let err = validate_policy_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigMissing { key, .. } if key == "sentiment_path"));
    }

    #[test]
    fn fear_greed_thresholds_must_be_ordered() {
        let config = make_config(
            "[policy]\nkind = fear_greed\nsentiment_path = fng.csv\nbuy_threshold = 40\nsell_threshold = 60\n",
        );
        let err = validate_policy_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigInvalid { key, .. } if key == "sell_threshold"));

        let config = make_config(
            "[policy]\nkind = fear_greed\nsentiment_path = fng.csv\nbuy_threshold = 150\n",
        );
        let err = validate_policy_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigInvalid { key, .. } if key == "buy_threshold"));
    }
}
