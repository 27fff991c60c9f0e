//! Console logging backend.

use super::MetricLogger;
use std::collections::HashMap;

/// Logger that prints metrics to stdout via tracing.
///
/// The trainer uses this backend when no other logger is supplied.
pub struct ConsoleLogger;

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self
    }

    /// One "key=value" line, keys sorted for stable output.
    fn render(metrics: &HashMap<String, f64>) -> String {
        let mut pairs: Vec<_> = metrics.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs
            .iter()
            .map(|(key, value)| format!("{}={:.4}", key, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl MetricLogger for ConsoleLogger {
    fn log_scalar(&self, name: &str, value: f64, step: u64) {
        tracing::info!(update = step, "{} = {:.4}", name, value);
    }

    fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64) {
        // Group output to avoid spamming one line per metric
        tracing::info!(update = step, "{}", Self::render(metrics));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_is_sorted_and_stable() {
        let mut metrics = HashMap::new();
        metrics.insert("mean_return".to_string(), 2.5);
        metrics.insert("loss".to_string(), 0.125);
        assert_eq!(
            ConsoleLogger::render(&metrics),
            "loss=0.1250, mean_return=2.5000"
        );
    }

    #[test]
    fn test_logging_does_not_panic_without_subscriber() {
        let logger = ConsoleLogger::new();
        logger.log_scalar("loss", 1.0, 1);
        logger.log_metrics(&HashMap::new(), 2);
    }
}
