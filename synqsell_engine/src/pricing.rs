//! Supplier price-list arithmetic.
//!
//! A supplier variant has one authoritative retail price. From it SynqSell derives what a retailer pays per unit
//! (the retail price less the retailer margin granted on the price list) and what the supplier keeps of that once
//! the platform fee is deducted. All amounts are whole cents, rounded half away from zero.
use synq_common::{basis_points_of, Cents};

pub const MAX_BPS: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantPricing {
    pub retail_price: Cents,
    pub retailer_payment: Cents,
    pub supplier_profit: Cents,
}

impl VariantPricing {
    /// The platform's cut of one unit.
    pub fn platform_fee(&self) -> Cents {
        self.retailer_payment - self.supplier_profit
    }
}

pub fn price_variant(retail_price: Cents, retailer_margin_bps: i64, platform_fee_bps: i64) -> VariantPricing {
    let margin = basis_points_of(retail_price, retailer_margin_bps.clamp(0, MAX_BPS));
    let retailer_payment = retail_price - margin;
    let fee = basis_points_of(retailer_payment, platform_fee_bps.clamp(0, MAX_BPS));
    VariantPricing { retail_price, retailer_payment, supplier_profit: retailer_payment - fee }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prices_are_derived_from_retail_price() {
        let p = price_variant(Cents::from(1000), 2000, 1000);
        assert_eq!(p.retailer_payment, Cents::from(800));
        assert_eq!(p.supplier_profit, Cents::from(720));
        assert_eq!(p.platform_fee(), Cents::from(80));
    }

    #[test]
    fn rates_are_clamped() {
        let p = price_variant(Cents::from(1000), 15_000, -5);
        assert_eq!(p.retailer_payment, Cents::from(0));
        assert_eq!(p.supplier_profit, Cents::from(0));
        let p = price_variant(Cents::from(999), 0, 0);
        assert_eq!(p.retailer_payment, Cents::from(999));
        assert_eq!(p.supplier_profit, Cents::from(999));
    }

    #[test]
    fn rounding() {
        // 12.5% of 10.01 is 1.25125
        let p = price_variant(Cents::from(1001), 1250, 0);
        assert_eq!(p.retailer_payment, Cents::from(876));
    }
}
