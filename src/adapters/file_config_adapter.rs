//! INI file configuration adapter.

use crate::domain::error::StratbenchError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StratbenchError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StratbenchError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config file not found: {}", path.display()),
            )));
        }
        let mut config = Ini::new();
        config.load(path).map_err(|reason| StratbenchError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::exact::Exact;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[simulation]
starting_cash = 100
step_interval = 86400

[data]
price_dir = data/price_periods

[policy]
kind = dca
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "price_dir"),
            Some("data/price_periods".to_string())
        );
        assert_eq!(adapter.get_string("policy", "kind"), Some("dca".to_string()));
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[simulation]\nstarting_cash = 100\n").unwrap();
        assert_eq!(adapter.get_string("simulation", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[simulation]\nstep_interval = 3600\nbad = abc\n").unwrap();
        assert_eq!(adapter.get_int("simulation", "step_interval", 0), 3600);
        assert_eq!(adapter.get_int("simulation", "missing", 42), 42);
        assert_eq!(adapter.get_int("simulation", "bad", 42), 42);
    }

    #[test]
    fn get_double_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[simulation]\nrisk_free_rate = 0.05\nbad = x\n").unwrap();
        assert_eq!(adapter.get_double("simulation", "risk_free_rate", 0.0), 0.05);
        assert_eq!(adapter.get_double("simulation", "missing", 99.9), 99.9);
        assert_eq!(adapter.get_double("simulation", "bad", 99.9), 99.9);
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[results]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\n",
        )
        .unwrap();
        assert!(adapter.get_bool("results", "a", false));
        assert!(adapter.get_bool("results", "b", false));
        assert!(adapter.get_bool("results", "c", false));
        assert!(!adapter.get_bool("results", "d", true));
        assert!(!adapter.get_bool("results", "e", true));
        assert!(!adapter.get_bool("results", "f", true));
        assert!(adapter.get_bool("results", "missing", true));
    }

    #[test]
    fn get_exact_keeps_decimal_text_exact() {
        let adapter = FileConfigAdapter::from_string(
            "[simulation]\nfee_rate = 0.997\nstarting_asset = 3/2\nstarting_cash = plenty\n",
        )
        .unwrap();
        assert_eq!(
            adapter.get_exact("simulation", "fee_rate", Exact::one()).unwrap(),
            Exact::ratio(997, 1000).unwrap()
        );
        assert_eq!(
            adapter.get_exact("simulation", "starting_asset", Exact::zero()).unwrap(),
            Exact::ratio(3, 2).unwrap()
        );
        assert_eq!(
            adapter.get_exact("simulation", "missing", Exact::from(7)).unwrap(),
            Exact::from(7)
        );
        assert!(matches!(
            adapter.get_exact("simulation", "starting_cash", Exact::zero()),
            Err(StratbenchError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[results]\nbackend = sqlite\nsqlite_path = out.db\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("results", "sqlite_path"),
            Some("out.db".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(StratbenchError::Io(_))));
    }
}
