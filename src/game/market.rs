use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::FuelType;

/// Half-width of the buy/sell spread around the current exchange rate.
pub const SPREAD: Decimal = dec!(0.05);

/// How hard one standard lot of volume pushes the rate toward its bound.
pub const PRESSURE: Decimal = dec!(0.05);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommodityConfig {
    pub min_exchange_rate: Decimal,
    pub max_exchange_rate: Decimal,
    pub unit_size: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommodityBook {
    pub config: CommodityConfig,
    pub current_exchange_rate: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarketRates {
    pub buy_price: Decimal,
    pub sell_price: Decimal,
}

/// One exchange rate per fuel commodity, nudged by traded volume and
/// clamped to the configured range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommodityMarket {
    books: BTreeMap<FuelType, CommodityBook>,
}

impl CommodityMarket {
    pub fn standard() -> Self {
        let mut books = BTreeMap::new();
        books.insert(FuelType::Coal, book(dec!(1), dec!(8), dec!(10), dec!(2)));
        books.insert(FuelType::Oil, book(dec!(1.5), dec!(10), dec!(10), dec!(3)));
        books.insert(FuelType::Gas, book(dec!(1), dec!(9), dec!(10), dec!(2.5)));
        books.insert(FuelType::Uranium, book(dec!(5), dec!(30), dec!(1), dec!(12)));
        Self { books }
    }

    pub fn book(&self, fuel: FuelType) -> &CommodityBook {
        &self.books[&fuel]
    }

    pub fn current_rate(&self, fuel: FuelType) -> Decimal {
        self.books[&fuel].current_exchange_rate
    }

    pub fn market_rates(&self, fuel: FuelType) -> MarketRates {
        let rate = self.current_rate(fuel);
        MarketRates {
            buy_price: rate * (Decimal::ONE + SPREAD),
            sell_price: rate * (Decimal::ONE - SPREAD),
        }
    }

    /// Buy pressure pushes the rate toward its maximum, proportionally to
    /// the traded volume in standard lots.
    pub fn apply_buy(&mut self, fuel: FuelType, units: u32) {
        let book = self
            .books
            .get_mut(&fuel)
            .unwrap_or_else(|| unreachable!("every fuel has a book"));
        let lots = Decimal::from(units) / book.config.unit_size;
        let push = (book.config.max_exchange_rate - book.current_exchange_rate) * PRESSURE * lots;
        book.current_exchange_rate = (book.current_exchange_rate + push)
            .clamp(book.config.min_exchange_rate, book.config.max_exchange_rate);
    }

    pub fn apply_sell(&mut self, fuel: FuelType, units: u32) {
        let book = self
            .books
            .get_mut(&fuel)
            .unwrap_or_else(|| unreachable!("every fuel has a book"));
        let lots = Decimal::from(units) / book.config.unit_size;
        let push = (book.current_exchange_rate - book.config.min_exchange_rate) * PRESSURE * lots;
        book.current_exchange_rate = (book.current_exchange_rate - push)
            .clamp(book.config.min_exchange_rate, book.config.max_exchange_rate);
    }
}

fn book(min: Decimal, max: Decimal, unit_size: Decimal, start: Decimal) -> CommodityBook {
    debug_assert!(min <= start && start <= max);
    CommodityBook {
        config: CommodityConfig {
            min_exchange_rate: min,
            max_exchange_rate: max,
            unit_size,
        },
        current_exchange_rate: start,
    }
}
