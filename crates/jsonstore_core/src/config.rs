//! Store configuration.

use std::fmt;
use std::time::Duration;

/// Configuration for creating or opening a store.
#[derive(Clone)]
pub struct Config {
    /// Whether a background thread flushes the root document when it is dirty.
    pub auto_save: bool,

    /// How often the autosave thread checks the dirty flag.
    pub auto_save_interval: Duration,

    /// Password for encryption at rest (`None` = plaintext JSON).
    pub password: Option<String>,

    /// Whether to write indented JSON.
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_save: false,
            auto_save_interval: Duration::from_secs(1),
            password: None,
            pretty: true,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("auto_save", &self.auto_save)
            .field("auto_save_interval", &self.auto_save_interval)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("pretty", &self.pretty)
            .finish()
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the background autosave loop.
    #[must_use]
    pub const fn auto_save(mut self, value: bool) -> Self {
        self.auto_save = value;
        self
    }

    /// Sets how often the autosave loop runs.
    #[must_use]
    pub const fn auto_save_interval(mut self, interval: Duration) -> Self {
        self.auto_save_interval = interval;
        self
    }

    /// Encrypts the stored stream with the given password.
    ///
    /// An empty password means no encryption.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = (!password.is_empty()).then_some(password);
        self
    }

    /// Sets whether to write indented JSON.
    #[must_use]
    pub const fn pretty(mut self, value: bool) -> Self {
        self.pretty = value;
        self
    }
}
