use std::convert::TryFrom;

use borsh::{BorshDeserialize, BorshSerialize};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use solana_program::msg;

use crate::error::{AoError, AoResult};
use crate::utils::check_buffer_len;

pub use crate::state::critbit::Slab;
pub use crate::state::event_queue::{EventQueue, OrderSummary, ORDER_SUMMARY_SIZE, REGISTER_SIZE};
pub use crate::state::market_state::MarketState;

/// Account image writers, used for fixtures and offline simulation
#[cfg(any(test, feature = "utils"))]
pub mod builder;
/// The critbit slab holding one side of the book
pub mod critbit;
/// The event queue and its register
pub mod event_queue;
/// The market state account
pub mod market_state;
/// Price level views over both slabs
pub mod orderbook;

/// The size in bytes of the account tag which prefixes every account owned by the program
pub const ACCOUNT_TAG_LEN: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u64)]
#[allow(missing_docs)]
pub enum AccountTag {
    Uninitialized,
    Market,
    EventQueue,
    Bids,
    Asks,
}

impl AccountTag {
    /// Reads the account tag which starts every account buffer
    pub fn from_buffer(buf: &[u8]) -> AoResult<Self> {
        check_buffer_len(buf, ACCOUNT_TAG_LEN, "account tag")?;
        let mut raw = [0u8; ACCOUNT_TAG_LEN];
        raw.copy_from_slice(&buf[..ACCOUNT_TAG_LEN]);
        let raw = u64::from_le_bytes(raw);
        AccountTag::try_from(raw).map_err(|_| {
            msg!("Unknown account tag {}", raw);
            AoError::MalformedAccount
        })
    }
}

#[derive(
    BorshDeserialize,
    BorshSerialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    TryFromPrimitive,
    IntoPrimitive,
)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Helper function to get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// The account tag of the slab holding this side's orders
    pub fn slab_tag(&self) -> AccountTag {
        match self {
            Side::Bid => AccountTag::Bids,
            Side::Ask => AccountTag::Asks,
        }
    }
}

/// An account buffer decoded according to its account tag
pub enum ParsedAccount<'a> {
    #[allow(missing_docs)]
    Uninitialized,
    #[allow(missing_docs)]
    Market(MarketState),
    #[allow(missing_docs)]
    EventQueue(EventQueue<'a>),
    #[allow(missing_docs)]
    Bids(Slab<'a>),
    #[allow(missing_docs)]
    Asks(Slab<'a>),
}

/// Decodes any account owned by the orderbook program
pub fn parse_account(buf: &[u8]) -> AoResult<ParsedAccount<'_>> {
    let parsed = match AccountTag::from_buffer(buf)? {
        AccountTag::Uninitialized => ParsedAccount::Uninitialized,
        AccountTag::Market => ParsedAccount::Market(MarketState::from_buffer(buf)?),
        AccountTag::EventQueue => ParsedAccount::EventQueue(EventQueue::from_buffer(buf)?),
        AccountTag::Bids => ParsedAccount::Bids(Slab::from_buffer(buf, AccountTag::Bids)?),
        AccountTag::Asks => ParsedAccount::Asks(Slab::from_buffer(buf, AccountTag::Asks)?),
    };
    Ok(parsed)
}
