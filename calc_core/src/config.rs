//! # Configuration
//!
//! TOML configuration shared by the CLI and the daemon. Every section and
//! key is optional.
//!
//! ```toml
//! [context]
//! timezone = "Europe/Berlin"
//! ppi = 96.0
//! em_size = 16.0
//!
//! # name = expression, evaluated in order of name when a session starts
//! [variables]
//! USD = "1"
//! EUR = "0.92"
//!
//! [server]
//! bind = "127.0.0.1:8888"
//!
//! [log]
//! filter = "info"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::context::{CalculatorContext, DEFAULT_EM_SIZE, DEFAULT_PPI, DEFAULT_TIMEZONE};
use crate::errors::{CalcError, CalcResult};
use crate::session::{Session, ANSWER_VARIABLE};

/// Default daemon listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:8888";

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalcConfig {
    pub context: ContextSettings,
    /// Variables to pre-seed, as expressions
    pub variables: BTreeMap<String, String>,
    pub server: ServerSettings,
    pub log: LogSettings,
}

/// Starting settings for every new context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    pub timezone: String,
    pub ppi: f64,
    pub em_size: f64,
}

impl Default for ContextSettings {
    fn default() -> Self {
        ContextSettings {
            timezone: DEFAULT_TIMEZONE.to_string(),
            ppi: DEFAULT_PPI,
            em_size: DEFAULT_EM_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            filter: "info".to_string(),
        }
    }
}

impl CalcConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> CalcResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| CalcError::file_error("read config", path.display().to_string(), e.to_string()))?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text.
    ///
    /// # Example
    /// ```
    /// use calc_core::config::CalcConfig;
    ///
    /// let config = CalcConfig::from_toml_str("[context]\nppi = 144.0").unwrap();
    /// assert_eq!(config.context.ppi, 144.0);
    /// assert_eq!(config.context.timezone, "UTC");
    /// ```
    pub fn from_toml_str(text: &str) -> CalcResult<Self> {
        let config: CalcConfig = toml::from_str(text).map_err(CalcError::serialization)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that settings are usable.
    ///
    /// `ans` is rebound after every line, so it cannot be configured.
    pub fn validate(&self) -> CalcResult<()> {
        validate_settings(&self.context.timezone, self.context.ppi, self.context.em_size)?;
        if self.variables.contains_key(ANSWER_VARIABLE) {
            return Err(CalcError::invalid_input(
                "variables",
                ANSWER_VARIABLE,
                "Name is reserved for the previous result",
            ));
        }
        if self.log.filter.trim().is_empty() {
            return Err(CalcError::invalid_input("log.filter", "", "Filter must not be empty"));
        }
        Ok(())
    }

    /// Build the starting context: settings plus evaluated `[variables]`.
    ///
    /// Variables are evaluated in name order through a [`Session`], so a
    /// later name may refer to an earlier one. Failing expressions are bound
    /// as error values.
    pub fn to_context(&self) -> CalculatorContext {
        let base = CalculatorContext::new(self.context.timezone.clone(), self.context.ppi, self.context.em_size);
        let mut session = Session::new(base);
        for (name, expression) in &self.variables {
            let value = session.evaluate_line(expression).into_value();
            session.context_mut().bind(name.clone(), value);
        }
        let mut context = session.into_context();
        context.unbind(ANSWER_VARIABLE);
        context
    }
}

/// Validate context settings from any source (config file, CLI, request).
pub fn validate_settings(timezone: &str, ppi: f64, em_size: f64) -> CalcResult<()> {
    if timezone.parse::<Tz>().is_err() {
        return Err(CalcError::invalid_input(
            "timezone",
            timezone,
            "Timezone must be an IANA name such as 'UTC' or 'Europe/Berlin'",
        ));
    }
    if !ppi.is_finite() || ppi <= 0.0 {
        return Err(CalcError::invalid_input("ppi", ppi.to_string(), "PPI must be positive"));
    }
    if !em_size.is_finite() || em_size <= 0.0 {
        return Err(CalcError::invalid_input("em_size", em_size.to_string(), "Em size must be positive"));
    }
    Ok(())
}
