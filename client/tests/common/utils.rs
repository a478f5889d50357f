use aob_reader::error::AoResult;
use aob_reader::state::builder::{order_key, EventQueueBuilder, SlabBuilder};
use aob_reader::state::critbit::LeafNode;
use aob_reader::state::event_queue::{Event, FillEvent, OutEvent, OrderSummary};
use aob_reader::state::{AccountTag, MarketState, Side};
use solana_program::pubkey::Pubkey;

/// The account images of a market, kept in sync the way the orderbook program would
pub struct MarketFixture {
    pub market_state: MarketState,
    pub bids: SlabBuilder,
    pub asks: SlabBuilder,
    pub event_queue: EventQueueBuilder,
    pub owners: Vec<Pubkey>,
    next_seq_num: u64,
}

/// Creates the accounts of a market with room for `order_capacity` orders per side and
/// `event_capacity` events.
pub fn create_market_and_accounts(order_capacity: usize, event_capacity: usize) -> MarketFixture {
    let market = Pubkey::new_unique();
    let event_size = Event::compute_slot_size(32);
    let market_state = MarketState {
        tag: AccountTag::Market.into(),
        caller_authority: Pubkey::new_unique(),
        event_queue: Pubkey::new_unique(),
        bids: Pubkey::new_unique(),
        asks: Pubkey::new_unique(),
        callback_id_len: 32,
        callback_info_len: 32,
        fee_budget: 0,
        initial_lamports: 0,
        min_base_order_size: 1,
        price_bitmask: u64::MAX,
        cranker_reward: 0,
    };
    MarketFixture {
        market_state,
        bids: SlabBuilder::new(2 * order_capacity, AccountTag::Bids, market.to_bytes()),
        asks: SlabBuilder::new(2 * order_capacity, AccountTag::Asks, market.to_bytes()),
        event_queue: EventQueueBuilder::new(event_capacity * event_size, event_size),
        owners: vec![],
        next_seq_num: 0,
    }
}

impl MarketFixture {
    pub fn market_bytes(&self) -> Vec<u8> {
        bytemuck::bytes_of(&self.market_state).to_vec()
    }

    pub fn slab_mut(&mut self, side: Side) -> &mut SlabBuilder {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Rests an order on the book and returns its order id
    pub fn post_order(&mut self, side: Side, price: u64, quantity: u64, owner: Pubkey) -> u128 {
        let order_id = order_key(price, self.next_seq_num, side).unwrap();
        self.next_seq_num += 1;
        let callback_info_pt = self.owners.len() as u64;
        self.owners.push(owner);
        self.slab_mut(side)
            .insert_leaf(&LeafNode::new(order_id, callback_info_pt, quantity))
            .unwrap();
        self.event_queue
            .set_register(Some(OrderSummary {
                posted_order_id: Some(order_id),
                total_base_qty: quantity,
                total_quote_qty: quantity * price,
                total_base_qty_posted: quantity,
            }))
            .unwrap();
        order_id
    }

    /// Matches `quantity` of a resting order against a taker, pushing the matching events
    pub fn fill(&mut self, maker_side: Side, order_id: u128, quantity: u64, taker: Pubkey) -> AoResult {
        let (_, maker) = self
            .slab_mut(maker_side)
            .slab()?
            .find_by_key(order_id)?
            .expect("unknown maker order");
        let maker_owner = self.owners[maker.callback_info_pt as usize];
        let matched = std::cmp::min(quantity, maker.base_quantity);
        self.event_queue.push_back(&Event::Fill(FillEvent {
            taker_side: maker_side.opposite(),
            maker_order_id: order_id,
            quote_size: matched * maker.price(),
            base_size: matched,
            maker_callback_info: maker_owner.to_bytes(),
            taker_callback_info: taker.to_bytes(),
        }))?;
        if matched == maker.base_quantity {
            self.slab_mut(maker_side).remove_by_key(order_id)?;
            self.event_queue.push_back(&Event::Out(OutEvent {
                side: maker_side,
                order_id,
                base_size: 0,
                delete: true,
                callback_info: maker_owner.to_bytes(),
            }))?;
        } else {
            let remaining = LeafNode::new(order_id, maker.callback_info_pt, maker.base_quantity - matched);
            self.slab_mut(maker_side).insert_leaf(&remaining)?;
        }
        Ok(())
    }

    /// Cancels a resting order, pushing the out event
    pub fn cancel(&mut self, side: Side, order_id: u128) -> AoResult {
        if let Some(leaf) = self.slab_mut(side).remove_by_key(order_id)? {
            self.event_queue.push_back(&Event::Out(OutEvent {
                side,
                order_id,
                base_size: leaf.base_quantity,
                delete: true,
                callback_info: self.owners[leaf.callback_info_pt as usize].to_bytes(),
            }))?;
        }
        Ok(())
    }
}
