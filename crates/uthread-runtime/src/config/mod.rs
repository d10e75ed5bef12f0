//! Runtime Configuration
//!
//! Provides compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Environment variables (runtime)
//! 2. User's uthread_config.rs (compile-time, via `UTHREAD_CONFIG_RS`)
//! 3. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use uthread_runtime::config::RuntimeConfig;
//!
//! // Use defaults with env overrides
//! let config = RuntimeConfig::from_env();
//!
//! // Or customize programmatically
//! let config = RuntimeConfig::from_env()
//!     .stack_size(256 * 1024)
//!     .max_waiters(64);
//! ```

pub mod defaults;

use uthread_core::constants::{MAX_STACK_SIZE, MIN_STACK_SIZE};
use uthread_core::env::{env_get, env_get_bool};
use uthread_core::error::SchedError;
use uthread_core::kprintln;

/// Runtime configuration with builder pattern.
///
/// Use `from_env()` to start with compile-time defaults and apply
/// any environment variable overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Usable stack bytes per spawned thread (a guard page is added on top)
    pub stack_size: usize,
    /// Capacity of each channel wait queue (blocked senders / receivers)
    pub max_waiters: usize,
    /// Log every spawn, exit and run transition at debug level
    pub debug_logging: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl RuntimeConfig {
    /// Create config from compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `UTHREAD_STACK_SIZE` - Stack size per thread in bytes
    /// - `UTHREAD_MAX_WAITERS` - Wait queue capacity per channel direction
    /// - `UTHREAD_DEBUG` - Enable debug logging (0/1)
    pub fn from_env() -> Self {
        Self {
            stack_size: env_get("UTHREAD_STACK_SIZE", defaults::STACK_SIZE),
            max_waiters: env_get("UTHREAD_MAX_WAITERS", defaults::MAX_WAITERS),
            debug_logging: env_get_bool("UTHREAD_DEBUG", defaults::DEBUG_LOGGING),
        }
    }

    /// Create config with explicit defaults (no env override).
    /// Useful for testing or when you want full control.
    pub fn new() -> Self {
        Self {
            stack_size: defaults::STACK_SIZE,
            max_waiters: defaults::MAX_WAITERS,
            debug_logging: defaults::DEBUG_LOGGING,
        }
    }

    // Builder methods

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    pub fn max_waiters(mut self, n: usize) -> Self {
        self.max_waiters = n;
        self
    }

    pub fn debug_logging(mut self, enable: bool) -> Self {
        self.debug_logging = enable;
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stack_size < MIN_STACK_SIZE {
            return Err(ConfigError::InvalidValue("stack_size must be >= 16KB"));
        }
        if self.stack_size > MAX_STACK_SIZE {
            return Err(ConfigError::InvalidValue("stack_size must be <= 1GB"));
        }
        if self.max_waiters == 0 {
            return Err(ConfigError::InvalidValue("max_waiters must be > 0"));
        }
        Ok(())
    }

    /// Print configuration (for debugging)
    pub fn print(&self) {
        kprintln!("uthread Configuration:");
        kprintln!("  stack_size:     {}", self.stack_size);
        kprintln!("  max_waiters:    {}", self.max_waiters);
        kprintln!("  debug_logging:  {}", self.debug_logging);
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for SchedError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::InvalidValue(msg) => SchedError::InvalidConfig(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RuntimeConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.stack_size, defaults::STACK_SIZE);
    }

    #[test]
    fn test_builder() {
        let config = RuntimeConfig::new()
            .stack_size(64 * 1024)
            .max_waiters(8)
            .debug_logging(true);

        assert_eq!(config.stack_size, 64 * 1024);
        assert_eq!(config.max_waiters, 8);
        assert!(config.debug_logging);
    }

    #[test]
    fn test_validation() {
        let config = RuntimeConfig::new().stack_size(1024);
        assert!(config.validate().is_err());

        let config = RuntimeConfig::new().stack_size(usize::MAX - 10);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidValue("stack_size must be <= 1GB"))
        );
        assert!(RuntimeConfig::new().stack_size(MAX_STACK_SIZE).validate().is_ok());

        let config = RuntimeConfig::new().max_waiters(0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidValue("max_waiters must be > 0"))
        );
    }

    #[test]
    fn test_config_error_into_sched_error() {
        let err: SchedError = ConfigError::InvalidValue("nope").into();
        assert_eq!(err, SchedError::InvalidConfig("nope"));
    }

    #[test]
    fn test_from_env_override() {
        std::env::set_var("UTHREAD_MAX_WAITERS", "33");
        let config = RuntimeConfig::from_env();
        std::env::remove_var("UTHREAD_MAX_WAITERS");
        assert_eq!(config.max_waiters, 33);
    }
}
