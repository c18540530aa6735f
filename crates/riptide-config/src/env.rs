//! Environment variable loading and configuration management
//!
//! This module provides utilities for loading configuration from environment variables
//! with type conversion, validation, and error handling.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Environment loading errors
#[derive(Error, Debug)]
pub enum EnvError {
    #[error("Environment variable not found: {var}")]
    NotFound { var: String },

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },

    #[error("Type conversion error for {var}: {reason}")]
    ConversionError { var: String, reason: String },
}

/// Environment configuration loader
pub struct EnvConfigLoader {
    prefix: Option<String>,
    required: Vec<String>,
    defaults: HashMap<String, String>,
}

impl EnvConfigLoader {
    /// Create a new environment config loader
    pub fn new() -> Self {
        Self {
            prefix: None,
            required: Vec::new(),
            defaults: HashMap::new(),
        }
    }

    /// Set prefix for environment variables (e.g., "RIPTIDE_")
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Mark a variable as required
    pub fn require(mut self, var: impl Into<String>) -> Self {
        self.required.push(var.into());
        self
    }

    /// Set default value for a variable
    pub fn default(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(var.into(), value.into());
        self
    }

    /// Get environment variable with prefix
    pub fn get(&self, var: &str) -> Result<String, EnvError> {
        let full_var = self.make_var_name(var);

        env::var(&full_var).or_else(|_| {
            // Check default
            self.defaults
                .get(var)
                .cloned()
                .ok_or_else(|| EnvError::NotFound {
                    var: full_var.clone(),
                })
        })
    }

    /// Get optional environment variable
    pub fn get_optional(&self, var: &str) -> Option<String> {
        let full_var = self.make_var_name(var);
        env::var(&full_var)
            .ok()
            .or_else(|| self.defaults.get(var).cloned())
    }

    /// Get environment variable as integer
    pub fn get_int(&self, var: &str) -> Result<i64, EnvError> {
        let value = self.get(var)?;
        value.parse().map_err(|e| EnvError::ConversionError {
            var: self.make_var_name(var),
            reason: format!("Cannot parse as integer: {}", e),
        })
    }

    /// Get environment variable as unsigned integer
    pub fn get_uint(&self, var: &str) -> Result<u64, EnvError> {
        let value = self.get(var)?;
        value.parse().map_err(|e| EnvError::ConversionError {
            var: self.make_var_name(var),
            reason: format!("Cannot parse as unsigned integer: {}", e),
        })
    }

    /// Get environment variable as float
    pub fn get_float(&self, var: &str) -> Result<f64, EnvError> {
        let value = self.get(var)?;
        value.parse().map_err(|e| EnvError::ConversionError {
            var: self.make_var_name(var),
            reason: format!("Cannot parse as float: {}", e),
        })
    }

    /// Get environment variable as boolean
    pub fn get_bool(&self, var: &str) -> Result<bool, EnvError> {
        let value = self.get(var)?;
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(EnvError::InvalidValue {
                var: self.make_var_name(var),
                reason: format!("Invalid boolean value: {}", value),
            }),
        }
    }

    /// Get environment variable as duration (supports "30s", "5m", "1h" format)
    pub fn get_duration(&self, var: &str) -> Result<Duration, EnvError> {
        let value = self.get(var)?;
        parse_duration(&value).map_err(|e| EnvError::ConversionError {
            var: self.make_var_name(var),
            reason: format!("Cannot parse as duration: {}", e),
        })
    }

    /// Get environment variable as list (comma-separated)
    pub fn get_list(&self, var: &str) -> Result<Vec<String>, EnvError> {
        let value = self.get(var)?;
        Ok(value.split(',').map(|s| s.trim().to_string()).collect())
    }

    /// Load all environment variables with prefix into a map
    pub fn load_all(&self) -> HashMap<String, String> {
        let mut result = HashMap::new();

        // Add defaults first
        for (key, value) in &self.defaults {
            result.insert(key.clone(), value.clone());
        }

        // Load from environment
        for (key, value) in env::vars() {
            if let Some(ref prefix) = self.prefix {
                if let Some(stripped) = key.strip_prefix(prefix) {
                    result.insert(stripped.to_lowercase(), value);
                }
            }
        }

        result
    }

    /// Validate required variables are present
    pub fn validate(&self) -> Result<(), EnvError> {
        for var in &self.required {
            self.get(var)?;
        }
        Ok(())
    }

    /// Make full variable name with prefix
    fn make_var_name(&self, var: &str) -> String {
        if let Some(ref prefix) = self.prefix {
            format!("{}{}", prefix, var.to_uppercase())
        } else {
            var.to_uppercase()
        }
    }

}

impl Default for EnvConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse duration string (supports "30s", "5m", "1h", "500ms")
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim().to_lowercase();

    if s.ends_with("ms") {
        let num = s[..s.len() - 2]
            .parse::<u64>()
            .map_err(|e| format!("Invalid milliseconds: {}", e))?;
        Ok(Duration::from_millis(num))
    } else if s.ends_with('s') {
        let num = s[..s.len() - 1]
            .parse::<u64>()
            .map_err(|e| format!("Invalid seconds: {}", e))?;
        Ok(Duration::from_secs(num))
    } else if s.ends_with('m') {
        let num = s[..s.len() - 1]
            .parse::<u64>()
            .map_err(|e| format!("Invalid minutes: {}", e))?;
        Ok(Duration::from_secs(num * 60))
    } else if s.ends_with('h') {
        let num = s[..s.len() - 1]
            .parse::<u64>()
            .map_err(|e| format!("Invalid hours: {}", e))?;
        Ok(Duration::from_secs(num * 3600))
    } else if let Ok(num) = s.parse::<u64>() {
        // Default to seconds
        Ok(Duration::from_secs(num))
    } else {
        Err(format!("Invalid duration format: {}", s))
    }
}
