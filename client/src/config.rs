//! Presentation settings for building an orderbook view out of raw slabs.
use crate::error::AoResult;
use crate::fractional::Fractional;

/// Converts tick prices to decimal prices and controls how much of the book is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookConfig {
    /// Decimal value of one price tick
    pub tick_size: Fractional,
    /// Subtracted from the scaled tick price
    pub price_offset: Fractional,
    /// Maximum number of price levels kept per side, or all of them when `None`
    pub depth: Option<usize>,
    /// Whether levels drop their individual orders and only keep totals
    pub aggregate: bool,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            tick_size: Fractional::new(1, 0),
            price_offset: Fractional::new(0, 0),
            depth: None,
            aggregate: true,
        }
    }
}

impl BookConfig {
    #[allow(missing_docs)]
    pub fn with_tick_size(mut self, tick_size: Fractional) -> Self {
        self.tick_size = tick_size;
        self
    }

    #[allow(missing_docs)]
    pub fn with_price_offset(mut self, price_offset: Fractional) -> Self {
        self.price_offset = price_offset;
        self
    }

    #[allow(missing_docs)]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    #[allow(missing_docs)]
    pub fn with_orders(mut self) -> Self {
        self.aggregate = false;
        self
    }

    /// `ticks * tick_size - price_offset`
    pub fn to_decimal_price(&self, ticks: u64) -> AoResult<Fractional> {
        Fractional::from_u64(ticks)?
            .checked_mul(self.tick_size)?
            .checked_sub(self.price_offset)
    }
}
