use solana_program::msg;

use crate::{
    config::BookConfig,
    error::{AoError, AoResult},
    fractional::Fractional,
    state::{
        critbit::{OrderEntry, Slab},
        AccountTag, Side,
    },
};

/// All the resting orders of one side at a given price
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLevel {
    /// Price in ticks
    pub price: u64,
    #[allow(missing_docs)]
    pub total_quantity: u64,
    #[allow(missing_docs)]
    pub order_count: u64,
    /// The level's orders in time priority, left empty for aggregated levels
    pub orders: Vec<OrderEntry>,
}

impl PriceLevel {
    pub(crate) fn new(price: u64) -> Self {
        Self {
            price,
            total_quantity: 0,
            order_count: 0,
            orders: vec![],
        }
    }

    pub(crate) fn push(&mut self, entry: OrderEntry, aggregate: bool) -> AoResult {
        self.total_quantity = self
            .total_quantity
            .checked_add(entry.base_quantity)
            .ok_or(AoError::NumericOverflow)?;
        self.order_count += 1;
        if !aggregate {
            self.orders.push(entry);
        }
        Ok(())
    }

    /// The level's price converted with the market's tick size and offset
    pub fn decimal_price(&self, config: &BookConfig) -> AoResult<Fractional> {
        config.to_decimal_price(self.price)
    }
}

/// A snapshot of both sides of the book, grouped into price levels.
///
/// Bids are ordered by descending price and asks by ascending price, so the first level
/// of each side is the best one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBookView {
    #[allow(missing_docs)]
    pub bids: Vec<PriceLevel>,
    #[allow(missing_docs)]
    pub asks: Vec<PriceLevel>,
}

impl OrderBookView {
    #[allow(missing_docs)]
    pub fn new(bids: &Slab, asks: &Slab, config: &BookConfig) -> AoResult<Self> {
        for (slab, expected) in [(bids, AccountTag::Bids), (asks, AccountTag::Asks)] {
            if slab.account_tag() != expected {
                msg!(
                    "Expected a {:?} slab, got {:?}",
                    expected,
                    slab.account_tag()
                );
                return Err(AoError::MalformedAccount);
            }
        }
        Ok(Self {
            bids: bids.price_levels(Side::Bid, config.aggregate, config.depth)?,
            asks: asks.price_levels(Side::Ask, config.aggregate, config.depth)?,
        })
    }

    #[allow(missing_docs)]
    pub fn levels(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    #[allow(missing_docs)]
    pub fn best_bid(&self) -> AoResult<&PriceLevel> {
        self.bids.first().ok_or(AoError::EmptyBook)
    }

    #[allow(missing_docs)]
    pub fn best_ask(&self) -> AoResult<&PriceLevel> {
        self.asks.first().ok_or(AoError::EmptyBook)
    }

    /// Best ask minus best bid, in ticks
    pub fn spread(&self) -> AoResult<Fractional> {
        let best_ask = Fractional::from_u64(self.best_ask()?.price)?;
        let best_bid = Fractional::from_u64(self.best_bid()?.price)?;
        best_ask.checked_sub(best_bid)
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
