//! Cost model: slippage and commission.
//!
//! Slippage is directional: buyers pay more, sellers receive less.
//! Commission is a symmetric per-side fraction of fill notional.

use super::config::SimulatorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

/// Execution friction as fractions of price and notional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub slippage_rate: f64,
    pub commission_rate: f64,
}

impl CostModel {
    pub fn new(slippage_rate: f64, commission_rate: f64) -> Self {
        Self {
            slippage_rate,
            commission_rate,
        }
    }

    pub fn from_config(config: &SimulatorConfig) -> Self {
        Self::new(config.slippage_rate, config.commission_rate)
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Fill price after slippage against the trade.
    pub fn fill_price(&self, raw_price: f64, side: Side) -> f64 {
        match side {
            Side::Buy => raw_price * (1.0 + self.slippage_rate),
            Side::Sell => raw_price * (1.0 - self.slippage_rate),
        }
    }

    /// Currency cost of slippage for `quantity` units.
    pub fn slippage_amount(&self, raw_price: f64, fill_price: f64, quantity: f64) -> f64 {
        (fill_price - raw_price).abs() * quantity
    }

    /// `fill_price * quantity * commission_rate`
    pub fn commission(&self, fill_price: f64, quantity: f64) -> f64 {
        fill_price * quantity * self.commission_rate
    }

    /// Effective per-unit price including commission: a buyer's cost per
    /// unit, or a seller's net proceeds per unit.
    pub fn effective_price(&self, fill_price: f64, side: Side) -> f64 {
        match side {
            Side::Buy => fill_price * (1.0 + self.commission_rate),
            Side::Sell => fill_price * (1.0 - self.commission_rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frictionless_returns_raw_price() {
        let cost = CostModel::frictionless();
        assert_eq!(cost.fill_price(100.0, Side::Buy), 100.0);
        assert_eq!(cost.fill_price(100.0, Side::Sell), 100.0);
        assert_eq!(cost.commission(100.0, 50.0), 0.0);
    }

    #[test]
    fn slippage_moves_against_the_trade() {
        let cost = CostModel::new(0.001, 0.0);
        let buy = cost.fill_price(100.0, Side::Buy);
        let sell = cost.fill_price(100.0, Side::Sell);
        assert!((buy - 100.10).abs() < 1e-10);
        assert!((sell - 99.90).abs() < 1e-10);
        assert!((cost.slippage_amount(100.0, buy, 100.0) - 10.0).abs() < 1e-9);
        assert!((cost.slippage_amount(100.0, sell, 100.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn commission_is_fraction_of_notional() {
        let cost = CostModel::new(0.0, 0.0005);
        // 100 * 1000 * 0.0005 = 50
        assert!((cost.commission(100.0, 1000.0) - 50.0).abs() < 1e-10);
        assert!((cost.effective_price(100.0, Side::Buy) - 100.05).abs() < 1e-10);
        assert!((cost.effective_price(100.0, Side::Sell) - 99.95).abs() < 1e-10);
    }
}
