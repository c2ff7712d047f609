use log::{debug, error, info, warn};

/// Thin per-component wrapper around the `log` facade.
///
/// Every record is tagged with the owning component as its log target so
/// `RUST_LOG=sonarcore::mosaic=debug` style filters work per stage.
#[derive(Debug, Clone)]
pub struct LogManager {
    target: &'static str,
}

impl LogManager {
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }

    pub fn record(&self, message: &str) {
        info!(target: self.target, "{}", message);
    }

    pub fn detail(&self, message: &str) {
        debug!(target: self.target, "{}", message);
    }

    pub fn warn(&self, message: &str) {
        warn!(target: self.target, "{}", message);
    }

    pub fn fail(&self, message: &str) {
        error!(target: self.target, "{}", message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("sonarcore")
    }
}
