//! In-memory engine configuration. Loading this from a file or environment
//! is an external concern; this crate only defines the struct and defaults.

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub symbol: String,
    pub max_trade_history: usize,
    pub enable_price_improvement: bool,
    pub maker_fee_rate: f64,
    pub taker_fee_rate: f64,
    /// Seconds between expiry sweeps; `<= 0.0` disables the reaper thread.
    pub check_expiry_interval: f64,
    pub latency_sample_capacity: usize,
}

impl EngineConfig {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default_with_symbol(String::new())
        }
    }

    fn default_with_symbol(symbol: String) -> Self {
        Self {
            symbol,
            max_trade_history: 10_000,
            enable_price_improvement: false,
            maker_fee_rate: 0.0,
            taker_fee_rate: 0.0,
            check_expiry_interval: 0.0,
            latency_sample_capacity: 1000,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::default_with_symbol(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::new("BTC-USD");
        assert_eq!(cfg.symbol, "BTC-USD");
        assert_eq!(cfg.max_trade_history, 10_000);
        assert!(!cfg.enable_price_improvement);
        assert_eq!(cfg.maker_fee_rate, 0.0);
        assert_eq!(cfg.taker_fee_rate, 0.0);
        assert_eq!(cfg.check_expiry_interval, 0.0);
        assert_eq!(cfg.latency_sample_capacity, 1000);
    }
}
