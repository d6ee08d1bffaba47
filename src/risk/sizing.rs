use crate::config::{InstrumentConfig, RiskConfig};
use crate::models::{EntryRequest, Quote, Side};

/// Stop-loss, take-profit and size rules for new entries
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSizer {
    pub risk_pct: f64,
    pub stop_loss_atr_multiplier: f64,
    pub min_stop_loss_points: f64,
    pub reward_multiple: f64,
    pub point: f64,
    pub value_per_point: f64,
    pub min_size: f64,
}

impl PositionSizer {
    pub fn new(risk: &RiskConfig, instrument: &InstrumentConfig) -> Self {
        Self {
            risk_pct: risk.risk_percent,
            stop_loss_atr_multiplier: risk.stop_loss_atr_multiplier,
            min_stop_loss_points: risk.min_stop_loss_points,
            reward_multiple: risk.reward_multiple,
            point: instrument.point,
            value_per_point: instrument.value_per_point,
            min_size: instrument.min_size,
        }
    }

    /// Stop distance in points: `max(ATR * k / point, floor)`
    pub fn stop_loss_points(&self, atr: f64) -> f64 {
        (atr.max(0.0) * self.stop_loss_atr_multiplier / self.point).max(self.min_stop_loss_points)
    }

    /// Take-profit distance in points at the configured reward:risk ratio
    pub fn take_profit_points(&self, stop_loss_points: f64) -> f64 {
        stop_loss_points * self.reward_multiple
    }

    /// Size risking `risk_pct` of `balance` over the stop distance
    ///
    /// Rounded to two decimals and never below the minimum tradable size.
    pub fn position_size(&self, balance: f64, stop_loss_points: f64) -> f64 {
        let risk_amount = balance * self.risk_pct / 100.0;
        let per_lot_risk = stop_loss_points * self.value_per_point;
        if per_lot_risk <= 0.0 {
            return self.min_size;
        }

        round2(risk_amount / per_lot_risk).max(self.min_size)
    }

    /// Build the entry order for `side` at the current quote
    pub fn plan_entry(
        &self,
        symbol: &str,
        side: Side,
        quote: &Quote,
        atr: f64,
        balance: f64,
    ) -> EntryRequest {
        let price = quote.entry_price(side);
        let sl_points = self.stop_loss_points(atr);
        let tp_points = self.take_profit_points(sl_points);
        let size = self.position_size(balance, sl_points);

        tracing::info!(
            "Size: {:.2} | Risk: {:.2} | SL points: {:.1}",
            size,
            balance * self.risk_pct / 100.0,
            sl_points
        );

        EntryRequest {
            symbol: symbol.to_string(),
            side,
            size,
            price,
            stop_loss: price - side.direction() * sl_points * self.point,
            take_profit: price + side.direction() * tp_points * self.point,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizer() -> PositionSizer {
        PositionSizer::new(&RiskConfig::default(), &InstrumentConfig::default())
    }

    fn unit_sizer() -> PositionSizer {
        PositionSizer {
            point: 1.0,
            min_stop_loss_points: 50.0,
            ..sizer()
        }
    }

    #[test]
    fn test_stop_loss_floor() {
        let sizer = unit_sizer();

        // 2 * 10 = 20 < floor 50
        assert_eq!(sizer.stop_loss_points(10.0), 50.0);
        // 2 * 40 = 80 > floor
        assert_eq!(sizer.stop_loss_points(40.0), 80.0);
    }

    #[test]
    fn test_stop_loss_monotone_in_atr() {
        let sizer = unit_sizer();
        let mut previous = 0.0;
        for step in 0..200 {
            let atr = step as f64 * 0.5;
            let distance = sizer.stop_loss_points(atr);
            assert!(distance >= previous);
            assert!(distance >= sizer.min_stop_loss_points);
            previous = distance;
        }
    }

    #[test]
    fn test_stop_loss_in_points() {
        // ATR 1.0 on a 0.01 point instrument = 200 points at multiplier 2
        assert!((sizer().stop_loss_points(1.0) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_size_floors_to_minimum() {
        let sizer = PositionSizer {
            value_per_point: 1.0,
            ..sizer()
        };

        // 10_000 * 0.05% = 5 over 100 points = 0.05
        assert_eq!(sizer.position_size(10_000.0, 100.0), 0.05);

        let contract = PositionSizer {
            value_per_point: 100.0,
            ..sizer
        };
        // 5 / (100 points * 100 per point) = 0.0005, floored to 0.01
        assert_eq!(contract.position_size(10_000.0, 100.0), 0.01);
    }

    #[test]
    fn test_position_size_never_below_minimum() {
        let sizer = sizer();
        for balance in [1.0, 100.0, 5_000.0, 1_000_000.0] {
            for sl in [1.0, 50.0, 500.0, 10_000.0] {
                assert!(sizer.position_size(balance, sl) >= sizer.min_size);
            }
        }
    }

    #[test]
    fn test_plan_long_entry() {
        let sizer = unit_sizer();
        let quote = Quote {
            bid: 1999.0,
            ask: 2000.0,
        };

        let request = sizer.plan_entry("XAUUSD", Side::Long, &quote, 40.0, 10_000.0);

        assert_eq!(request.price, 2000.0);
        assert_eq!(request.stop_loss, 1920.0);
        assert_eq!(request.take_profit, 2240.0);
        assert_eq!(request.side, Side::Long);
    }

    #[test]
    fn test_plan_short_entry() {
        let sizer = unit_sizer();
        let quote = Quote {
            bid: 1999.0,
            ask: 2000.0,
        };

        let request = sizer.plan_entry("XAUUSD", Side::Short, &quote, 10.0, 10_000.0);

        assert_eq!(request.price, 1999.0);
        assert_eq!(request.stop_loss, 2049.0);
        assert_eq!(request.take_profit, 1849.0);
    }
}
