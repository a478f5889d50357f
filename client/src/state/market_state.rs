//! The market state struct tracks metadata and security information about the orderbook and its
//! relevant accounts
use bytemuck::{Pod, Zeroable};
use solana_program::pubkey::Pubkey;
use std::mem::size_of;

use crate::error::AoResult;
use crate::state::event_queue::Event;
use crate::utils::{check_buffer_len, check_field};

use super::AccountTag;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
/// The orderbook market's central state
pub struct MarketState {
    #[allow(missing_docs)]
    pub tag: u64,
    /// The program allowed to place and cancel orders on this market
    pub caller_authority: Pubkey,
    /// The public key of the orderbook's event queue account
    pub event_queue: Pubkey,
    /// The public key of the orderbook's bids account
    pub bids: Pubkey,
    /// The public key of the orderbook's asks account
    pub asks: Pubkey,
    #[allow(missing_docs)]
    pub callback_id_len: u64,
    /// Length of the callback information stored with each order and event
    pub callback_info_len: u64,
    #[allow(missing_docs)]
    pub fee_budget: u64,
    #[allow(missing_docs)]
    pub initial_lamports: u64,
    /// The minimum order size that can be inserted into the orderbook after matching.
    pub min_base_order_size: u64,
    /// Mask applied to limit prices, which sets the tick size of the market
    pub price_bitmask: u64,
    #[allow(missing_docs)]
    pub cranker_reward: u64,
}

impl MarketState {
    /// Expected size in bytes of MarketState
    pub const LEN: usize = size_of::<Self>();

    /// Copies the market state out of an account buffer, which does not need to be aligned
    pub fn from_buffer(account_data: &[u8]) -> AoResult<Self> {
        check_buffer_len(account_data, Self::LEN, "market state")?;
        let state: Self = bytemuck::pod_read_unaligned(&account_data[..Self::LEN]);
        check_field(
            state.tag == u64::from(AccountTag::Market),
            "Invalid market state account tag",
        )?;
        Ok(state)
    }

    /// The ring buffer slot size used by this market's event queue
    pub fn event_slot_size(&self) -> usize {
        Event::compute_slot_size(self.callback_info_len as usize)
    }
}
