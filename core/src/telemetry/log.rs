use log::{info, warn};

/// Thin wrapper over the `log` facade that tags lines with a component scope.
pub struct LogManager {
    scope: &'static str,
}

impl LogManager {
    pub fn new() -> Self {
        Self::scoped("ecobot")
    }

    pub fn scoped(scope: &'static str) -> Self {
        Self { scope }
    }

    pub fn record(&self, message: &str) {
        info!(target: "ecobot", "[{}] {}", self.scope, message);
    }

    pub fn warn(&self, message: &str) {
        warn!(target: "ecobot", "[{}] {}", self.scope, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}
