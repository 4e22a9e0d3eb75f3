//! Engine policy settings.

/// Low-stock threshold used when none is configured.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// A decrement that leaves `current_count` at or below this raises a low-stock alert.
    /// `None` disables low-stock alerts.
    pub low_stock_threshold: Option<i64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: Some(DEFAULT_LOW_STOCK_THRESHOLD),
        }
    }
}
