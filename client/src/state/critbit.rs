//! A slab contains a header followed by an array of fixed-size slots holding the nodes of a
//! critbit tree. The leaves of the tree reference the resting orders of one side of the book.
//!
//! Nodes are decoded lazily: a [`Slab`] only keeps the parsed header and a borrow of the slot
//! region, and every access goes through [`Slab::get_node`].
#![allow(missing_docs)]
use std::convert::TryFrom;

use borsh::{BorshDeserialize, BorshSerialize};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use solana_program::msg;

use crate::error::{AoError, AoResult};
use crate::state::orderbook::PriceLevel;
use crate::state::{AccountTag, Side};
use crate::utils::{check_buffer_len, check_field};

pub type NodeHandle = u32;

#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlabHeader {
    pub account_tag: u64,
    pub bump_index: u64,
    pub free_list_len: u64,
    pub free_list_head: u32,
    pub callback_memory_offset: u64,
    pub callback_free_list_len: u64,
    pub callback_free_list_head: u64,
    pub callback_bump_index: u64,
    pub root_node: u32,
    pub leaf_count: u64,
    pub market_address: [u8; 32],
}

impl SlabHeader {
    pub const LEN: usize = 104;
}

/// The header length rounded up to the next multiple of 8
pub const PADDED_SLAB_HEADER_LEN: usize = SlabHeader::LEN + ((8 - SlabHeader::LEN % 8) % 8);
pub const NODE_TAG_SIZE: usize = 8;
pub const NODE_PAYLOAD_SIZE: usize = 32;
pub const SLOT_SIZE: usize = NODE_TAG_SIZE + NODE_PAYLOAD_SIZE;

/// Number of low key bits holding the sequence number
pub const SEQ_NUM_BITS: u32 = 64;
/// Number of key bits holding the binary fraction of the price
pub const BINARY_ORDER_SCALE: u32 = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u64)]
#[allow(missing_docs)]
pub enum NodeTag {
    Uninitialized,
    Inner,
    Leaf,
    Free,
    LastFree,
}

#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnerNode {
    pub prefix_len: u64,
    pub key: u128,
    pub children: [NodeHandle; 2],
}

impl InnerNode {
    pub(crate) fn walk_down(&self, search_key: u128) -> (NodeHandle, bool) {
        let crit_bit_mask = (1u128 << 127) >> self.prefix_len;
        let crit_bit = (search_key & crit_bit_mask) != 0;
        (self.children[crit_bit as usize], crit_bit)
    }
}

#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafNode {
    /// The key is the associated order id
    pub key: u128,
    /// Pointer into the callback memory region of the slab
    pub callback_info_pt: u64,
    /// The quantity of base asset associated with the underlying order
    pub base_quantity: u64,
}

impl LeafNode {
    pub fn new(key: u128, callback_info_pt: u64, base_quantity: u64) -> Self {
        Self {
            key,
            callback_info_pt,
            base_quantity,
        }
    }

    /// Parse a leaf node's price in ticks
    pub fn price(&self) -> u64 {
        (self.key >> (SEQ_NUM_BITS + BINARY_ORDER_SCALE)) as u64
    }

    /// The price as a FP32 number of ticks
    pub fn fp32_price(&self) -> u64 {
        (self.key >> SEQ_NUM_BITS) as u64
    }

    /// Get the associated order id
    pub fn order_id(&self) -> u128 {
        self.key
    }

    /// Recovers the sequence number, which is stored negated for bids
    pub fn seq_num(&self, side: Side) -> u64 {
        let raw = self.key as u64;
        match side {
            Side::Bid => !raw,
            Side::Ask => raw,
        }
    }
}

#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeNode {
    pub next: NodeHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Uninitialized,
    Inner(InnerNode),
    Leaf(LeafNode),
    Free(FreeNode),
    LastFree(FreeNode),
}

impl Node {
    /// Decodes a single slot: an 8-byte tag followed by the node payload
    pub fn deserialize(slot: &[u8]) -> AoResult<Self> {
        check_buffer_len(slot, SLOT_SIZE, "slab slot")?;
        let mut raw_tag = [0u8; NODE_TAG_SIZE];
        raw_tag.copy_from_slice(&slot[..NODE_TAG_SIZE]);
        let raw_tag = u64::from_le_bytes(raw_tag);
        let tag = NodeTag::try_from(raw_tag).map_err(|_| {
            msg!("Unknown node tag {}", raw_tag);
            AoError::MalformedAccount
        })?;
        let payload = &mut &slot[NODE_TAG_SIZE..SLOT_SIZE];
        let node = match tag {
            NodeTag::Uninitialized => Node::Uninitialized,
            NodeTag::Inner => Node::Inner(InnerNode::deserialize(payload).map_err(malformed)?),
            NodeTag::Leaf => Node::Leaf(LeafNode::deserialize(payload).map_err(malformed)?),
            NodeTag::Free => Node::Free(FreeNode::deserialize(payload).map_err(malformed)?),
            NodeTag::LastFree => {
                Node::LastFree(FreeNode::deserialize(payload).map_err(malformed)?)
            }
        };
        Ok(node)
    }

    /// Writes the node into a zeroed slot
    pub fn serialize(&self, slot: &mut [u8]) -> AoResult {
        if slot.len() < SLOT_SIZE {
            return Err(AoError::IndexOutOfRange);
        }
        let slot = &mut slot[..SLOT_SIZE];
        slot.fill(0);
        slot[..NODE_TAG_SIZE].copy_from_slice(&u64::from(self.tag()).to_le_bytes());
        let mut w: &mut [u8] = &mut slot[NODE_TAG_SIZE..];
        match self {
            Node::Uninitialized => Ok(()),
            Node::Inner(n) => n.serialize(&mut w),
            Node::Leaf(n) => n.serialize(&mut w),
            Node::Free(n) | Node::LastFree(n) => n.serialize(&mut w),
        }
        .map_err(malformed)
    }

    pub fn tag(&self) -> NodeTag {
        match self {
            Node::Uninitialized => NodeTag::Uninitialized,
            Node::Inner(_) => NodeTag::Inner,
            Node::Leaf(_) => NodeTag::Leaf,
            Node::Free(_) => NodeTag::Free,
            Node::LastFree(_) => NodeTag::LastFree,
        }
    }

    pub fn key(&self) -> Option<u128> {
        match self {
            Node::Inner(inner) => Some(inner.key),
            Node::Leaf(leaf) => Some(leaf.key),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&[NodeHandle; 2]> {
        match self {
            Node::Inner(InnerNode { children, .. }) => Some(children),
            _ => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            Node::Leaf(leaf_ref) => Some(leaf_ref),
            _ => None,
        }
    }
}

fn malformed(e: std::io::Error) -> AoError {
    msg!("Failed to decode slab node: {}", e);
    AoError::MalformedAccount
}

/// A resting order as seen by a traversal of the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderEntry {
    pub price: u64,
    pub order_id: u128,
    pub base_quantity: u64,
    pub callback_info_pt: u64,
    pub slot: NodeHandle,
}

impl OrderEntry {
    fn new(leaf: &LeafNode, slot: NodeHandle) -> Self {
        Self {
            price: leaf.price(),
            order_id: leaf.order_id(),
            base_quantity: leaf.base_quantity,
            callback_info_pt: leaf.callback_info_pt,
            slot,
        }
    }
}

/// Read-only view over a bids or asks account buffer
#[derive(Debug, Clone, Copy)]
pub struct Slab<'a> {
    header: SlabHeader,
    tag: AccountTag,
    slots: &'a [u8],
}

impl<'a> Slab<'a> {
    pub fn from_buffer(buf: &'a [u8], expected_tag: AccountTag) -> AoResult<Self> {
        check_buffer_len(buf, PADDED_SLAB_HEADER_LEN, "slab header")?;
        let header = SlabHeader::deserialize(&mut &buf[..SlabHeader::LEN]).map_err(|e| {
            msg!("Failed to decode slab header: {}", e);
            AoError::MalformedAccount
        })?;
        let tag = AccountTag::try_from(header.account_tag).map_err(|_| {
            msg!("Unknown slab account tag {}", header.account_tag);
            AoError::MalformedAccount
        })?;
        if tag != expected_tag {
            msg!("Invalid slab account tag {:?}, expected {:?}", tag, expected_tag);
            return Err(AoError::MalformedAccount);
        }
        let slots = &buf[PADDED_SLAB_HEADER_LEN..];
        let capacity = (slots.len() / SLOT_SIZE) as u64;
        check_field(
            header.bump_index <= capacity,
            "Slab header bump index out of bounds",
        )?;
        check_field(
            header.free_list_len <= header.bump_index,
            "Slab header free list longer than the allocated slots",
        )?;
        check_field(
            header.leaf_count <= capacity,
            "Slab header leaf count exceeds the slab capacity",
        )?;
        check_field(
            header.leaf_count == 0 || (header.root_node as u64) < capacity,
            "Slab header root node out of bounds",
        )?;
        Ok(Self { header, tag, slots })
    }

    pub fn header(&self) -> &SlabHeader {
        &self.header
    }

    pub fn account_tag(&self) -> AccountTag {
        self.tag
    }

    /// Number of slots the buffer can hold
    pub fn capacity(&self) -> u64 {
        (self.slots.len() / SLOT_SIZE) as u64
    }

    pub fn get_node(&self, slot: NodeHandle) -> AoResult<Node> {
        let offset = (slot as usize)
            .checked_mul(SLOT_SIZE)
            .ok_or(AoError::IndexOutOfRange)?;
        let end = offset
            .checked_add(SLOT_SIZE)
            .ok_or(AoError::IndexOutOfRange)?;
        if end > self.slots.len() {
            return Err(AoError::IndexOutOfRange);
        }
        Node::deserialize(&self.slots[offset..end])
    }

    pub fn root(&self) -> Option<NodeHandle> {
        if self.header.leaf_count == 0 {
            return None;
        }
        Some(self.header.root_node)
    }

    fn find_min_max(&self, find_max: bool) -> AoResult<Option<(NodeHandle, Node)>> {
        let mut handle = match self.root() {
            Some(h) => h,
            None => return Ok(None),
        };
        for _ in 0..=self.capacity() {
            let node = self.get_node(handle)?;
            match node {
                Node::Inner(inner) => handle = inner.children[find_max as usize],
                _ => return Ok(Some((handle, node))),
            }
        }
        msg!("Slab walk exceeded the slab capacity");
        Err(AoError::MalformedAccount)
    }

    pub fn find_min(&self) -> AoResult<Option<NodeHandle>> {
        Ok(self.find_min_max(false)?.map(|(h, _)| h))
    }

    pub fn find_max(&self) -> AoResult<Option<NodeHandle>> {
        Ok(self.find_min_max(true)?.map(|(h, _)| h))
    }

    /// Returns the best order of the side: the maximum key for bids and the minimum for asks.
    pub fn find_extreme(&self, side: Side) -> AoResult<Option<LeafNode>> {
        match self.find_min_max(side == Side::Bid)? {
            None => Ok(None),
            Some((_, Node::Leaf(leaf))) => Ok(Some(leaf)),
            Some((handle, node)) => {
                msg!("Slab walk ended on a {:?} node at slot {}", node.tag(), handle);
                Err(AoError::MalformedAccount)
            }
        }
    }

    /// Iterates over the orders of the subtree rooted at `slot`, best price first.
    pub fn inorder_traversal(&self, slot: NodeHandle, side: Side) -> SlabIterator<'a> {
        SlabIterator {
            slab: *self,
            search_stack: vec![slot],
            ascending: side == Side::Ask,
            remaining_visits: self.capacity(),
            failed: false,
        }
    }

    /// Get a best-price-first iterator over all the slab's orders.
    ///
    /// Bids are walked by descending price and asks by ascending price. Among orders
    /// at the same price the oldest comes first.
    pub fn iter(&self, side: Side) -> SlabIterator<'a> {
        match self.root() {
            Some(root) => self.inorder_traversal(root, side),
            None => SlabIterator {
                slab: *self,
                search_stack: vec![],
                ascending: side == Side::Ask,
                remaining_visits: 0,
                failed: false,
            },
        }
    }

    pub(crate) fn price_levels(
        &self,
        side: Side,
        aggregate: bool,
        max_levels: Option<usize>,
    ) -> AoResult<Vec<PriceLevel>> {
        let mut levels: Vec<PriceLevel> = Vec::new();
        for entry in self.iter(side) {
            let entry = entry?;
            match levels.last_mut() {
                Some(level) if level.price == entry.price => level.push(entry, aggregate)?,
                _ => {
                    if max_levels.map(|m| levels.len() >= m).unwrap_or(false) {
                        break;
                    }
                    let mut level = PriceLevel::new(entry.price);
                    level.push(entry, aggregate)?;
                    levels.push(level);
                }
            }
        }
        Ok(levels)
    }

    /// Groups the orders of a side into price levels, best to worst.
    ///
    /// When `aggregate` is false each level also lists its individual orders in time priority.
    pub fn build_price_levels(&self, side: Side, aggregate: bool) -> AoResult<Vec<PriceLevel>> {
        self.price_levels(side, aggregate, None)
    }

    /// Returns the first `depth` aggregated `(price, quantity)` levels.
    pub fn l2_depth(&self, depth: usize, side: Side) -> AoResult<Vec<(u64, u64)>> {
        Ok(self
            .price_levels(side, true, Some(depth))?
            .into_iter()
            .map(|l| (l.price, l.total_quantity))
            .collect())
    }

    pub fn find_by_key(&self, search_key: u128) -> AoResult<Option<(NodeHandle, LeafNode)>> {
        let mut node_handle = match self.root() {
            Some(h) => h,
            None => return Ok(None),
        };
        for _ in 0..=self.capacity() {
            match self.get_node(node_handle)? {
                Node::Leaf(leaf) => {
                    return Ok(if leaf.key == search_key {
                        Some((node_handle, leaf))
                    } else {
                        None
                    });
                }
                Node::Inner(inner) => {
                    let common_prefix_len = (search_key ^ inner.key).leading_zeros();
                    if common_prefix_len < inner.prefix_len as u32 {
                        return Ok(None);
                    }
                    node_handle = inner.walk_down(search_key).0;
                }
                _ => return Ok(None),
            }
        }
        msg!("Slab walk exceeded the slab capacity");
        Err(AoError::MalformedAccount)
    }

    #[cfg(any(test, feature = "utils"))]
    pub fn get_depth(&self) -> AoResult<usize> {
        let root = match self.root() {
            Some(r) => r,
            None => return Ok(0),
        };
        let mut stack = vec![(root, 1)];
        let mut max_depth = 0;
        let mut visits = 0;
        while let Some((current_node, current_depth)) = stack.pop() {
            visits += 1;
            if visits > self.capacity() {
                return Err(AoError::MalformedAccount);
            }
            match self.get_node(current_node)? {
                Node::Inner(node) => {
                    stack.push((node.children[0], current_depth + 1));
                    stack.push((node.children[1], current_depth + 1));
                }
                _ => max_depth = std::cmp::max(current_depth, max_depth),
            }
        }
        Ok(max_depth)
    }

    #[cfg(any(test, feature = "utils"))]
    pub fn dump(&self) {
        println!("Header (parsed):");
        println!("{:?}", self.header);
        for k in 0..self.header.bump_index as u32 {
            match self.get_node(k) {
                Ok(node) => println!("Slot {:?}: {:?}", k, node),
                Err(e) => println!("Slot {:?}: {}", k, e),
            }
        }
    }
}

/// Stack based walk over the leaves of a slab.
///
/// The iterator yields an error and stops when the walk visits more nodes than the slab
/// has slots, which only happens when the tree contains a cycle.
pub struct SlabIterator<'a> {
    slab: Slab<'a>,
    search_stack: Vec<NodeHandle>,
    ascending: bool,
    remaining_visits: u64,
    failed: bool,
}

impl<'a> SlabIterator<'a> {
    fn fail(&mut self, err: AoError) -> Option<AoResult<OrderEntry>> {
        self.failed = true;
        self.search_stack.clear();
        Some(Err(err))
    }
}

impl<'a> Iterator for SlabIterator<'a> {
    type Item = AoResult<OrderEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while let Some(current) = self.search_stack.pop() {
            if self.remaining_visits == 0 {
                msg!("Slab traversal visited more nodes than the slab has slots");
                return self.fail(AoError::MalformedAccount);
            }
            self.remaining_visits -= 1;
            match self.slab.get_node(current) {
                Ok(Node::Inner(n)) => {
                    self.search_stack.push(n.children[self.ascending as usize]);
                    self.search_stack.push(n.children[!self.ascending as usize]);
                }
                Ok(Node::Leaf(leaf)) => return Some(Ok(OrderEntry::new(&leaf, current))),
                Ok(_) => {}
                Err(e) => return self.fail(e),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::builder::{order_key, SlabBuilder};
    use rand::prelude::*;
    use std::collections::BTreeMap;

    fn leaf(price: u64, seq: u64, side: Side, qty: u64) -> LeafNode {
        LeafNode::new(order_key(price, seq, side).unwrap(), seq, qty)
    }

    #[test]
    fn header_layout() {
        assert_eq!(PADDED_SLAB_HEADER_LEN, 104);
        assert_eq!(SLOT_SIZE, 40);
        let mut bytes = Vec::new();
        SlabHeader::default().serialize(&mut bytes).unwrap();
        assert_eq!(bytes.len(), SlabHeader::LEN);
    }

    #[test]
    fn single_leaf() {
        let mut builder = SlabBuilder::new(4, AccountTag::Bids, [0; 32]);
        let order = LeafNode::new(order_key(100, 42, Side::Bid).unwrap(), 0, 5);
        builder.insert_leaf(&order).unwrap();
        let slab = Slab::from_buffer(builder.bytes(), AccountTag::Bids).unwrap();

        assert_eq!(slab.find_extreme(Side::Bid).unwrap(), Some(order));
        assert_eq!(slab.find_extreme(Side::Ask).unwrap(), Some(order));
        assert_eq!(order.seq_num(Side::Bid), 42);

        let levels = slab.build_price_levels(Side::Bid, true).unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].price, 100);
        assert_eq!(levels[0].total_quantity, 5);
        assert_eq!(levels[0].order_count, 1);
        assert!(levels[0].orders.is_empty());
        assert_eq!(slab.l2_depth(10, Side::Bid).unwrap(), vec![(100, 5)]);
    }

    #[test]
    fn empty_slab() {
        let builder = SlabBuilder::new(4, AccountTag::Asks, [0; 32]);
        let slab = Slab::from_buffer(builder.bytes(), AccountTag::Asks).unwrap();
        assert_eq!(slab.root(), None);
        assert_eq!(slab.find_extreme(Side::Ask).unwrap(), None);
        assert_eq!(slab.find_min().unwrap(), None);
        assert_eq!(slab.iter(Side::Ask).count(), 0);
        assert!(slab.build_price_levels(Side::Ask, false).unwrap().is_empty());
        assert_eq!(slab.get_depth().unwrap(), 0);
    }

    #[test]
    fn levels_follow_side_order() {
        let mut bids = SlabBuilder::new(32, AccountTag::Bids, [0; 32]);
        let mut asks = SlabBuilder::new(32, AccountTag::Asks, [0; 32]);
        for (seq, (price, qty)) in [(10, 1), (12, 2), (10, 3), (11, 4), (12, 5)]
            .iter()
            .enumerate()
        {
            bids.insert_leaf(&leaf(*price, seq as u64, Side::Bid, *qty))
                .unwrap();
            asks.insert_leaf(&leaf(*price, seq as u64, Side::Ask, *qty))
                .unwrap();
        }
        let bids = Slab::from_buffer(bids.bytes(), AccountTag::Bids).unwrap();
        let asks = Slab::from_buffer(asks.bytes(), AccountTag::Asks).unwrap();

        assert_eq!(
            bids.l2_depth(10, Side::Bid).unwrap(),
            vec![(12, 7), (11, 4), (10, 4)]
        );
        assert_eq!(
            asks.l2_depth(10, Side::Ask).unwrap(),
            vec![(10, 4), (11, 4), (12, 7)]
        );
        assert_eq!(asks.l2_depth(2, Side::Ask).unwrap(), vec![(10, 4), (11, 4)]);

        // Time priority inside a level, for both sides
        let bid_levels = bids.build_price_levels(Side::Bid, false).unwrap();
        let seqs: Vec<u64> = bid_levels[0]
            .orders
            .iter()
            .map(|o| !(o.order_id as u64))
            .collect();
        assert_eq!(seqs, vec![1, 4]);
        let ask_levels = asks.build_price_levels(Side::Ask, false).unwrap();
        let seqs: Vec<u64> = ask_levels[0]
            .orders
            .iter()
            .map(|o| o.order_id as u64)
            .collect();
        assert_eq!(seqs, vec![0, 2]);
        assert_eq!(ask_levels[0].order_count, 2);
    }

    #[test]
    fn simulate_traversal() {
        for trial in 0..10u64 {
            let mut rng = StdRng::seed_from_u64(trial);
            for side in [Side::Bid, Side::Ask] {
                let mut builder = SlabBuilder::new(512, side.slab_tag(), [0; 32]);
                let mut model: BTreeMap<u128, LeafNode> = BTreeMap::new();
                let n = rng.gen_range(1..200);
                for seq in 0..n {
                    let order = leaf(rng.gen_range(1..50), seq, side, rng.gen_range(1..1000));
                    builder.insert_leaf(&order).unwrap();
                    model.insert(order.key, order);
                }
                let slab = Slab::from_buffer(builder.bytes(), side.slab_tag()).unwrap();

                let entries: Vec<OrderEntry> = slab.iter(side).collect::<AoResult<_>>().unwrap();
                assert_eq!(entries.len() as u64, n);
                for w in entries.windows(2) {
                    match side {
                        Side::Bid => assert!(w[0].price >= w[1].price),
                        Side::Ask => assert!(w[0].price <= w[1].price),
                    }
                }
                let expected: Vec<u128> = match side {
                    Side::Bid => model.keys().rev().copied().collect(),
                    Side::Ask => model.keys().copied().collect(),
                };
                let walked: Vec<u128> = entries.iter().map(|e| e.order_id).collect();
                assert_eq!(walked, expected);

                let extreme = slab.find_extreme(side).unwrap().unwrap();
                assert_eq!(extreme.key, entries[0].order_id);
                let min_h = slab.find_min().unwrap().unwrap();
                assert_eq!(
                    slab.get_node(min_h).unwrap().key(),
                    model.keys().next().copied()
                );

                let search_key = *model.keys().choose(&mut rng).unwrap();
                let found = slab.find_by_key(search_key).unwrap().unwrap();
                assert_eq!(found.1, model[&search_key]);
                assert_eq!(slab.find_by_key(search_key ^ (1 << 100)).unwrap(), None);

                let total: u64 = model.values().map(|l| l.base_quantity).sum();
                let levels = slab.build_price_levels(side, true).unwrap();
                assert_eq!(
                    levels.iter().map(|l| l.total_quantity).sum::<u64>(),
                    total
                );
                assert!(slab.get_depth().unwrap() as u64 <= n);
            }
        }
    }

    #[test]
    fn corrupt_cycle() {
        let mut builder = SlabBuilder::new(8, AccountTag::Asks, [0; 32]);
        builder.insert_leaf(&leaf(1, 0, Side::Ask, 1)).unwrap();
        builder.insert_leaf(&leaf(2, 1, Side::Ask, 1)).unwrap();
        let mut bytes = builder.bytes().to_vec();
        let slab = Slab::from_buffer(&bytes, AccountTag::Asks).unwrap();
        let root = slab.root().unwrap();

        // Point the root's left child back at the root
        let children_offset = PADDED_SLAB_HEADER_LEN + root as usize * SLOT_SIZE + NODE_TAG_SIZE + 24;
        bytes[children_offset..children_offset + 4].copy_from_slice(&root.to_le_bytes());
        let slab = Slab::from_buffer(&bytes, AccountTag::Asks).unwrap();

        let result: AoResult<Vec<OrderEntry>> = slab.iter(Side::Ask).collect();
        assert_eq!(result.err(), Some(AoError::MalformedAccount));
        assert_eq!(
            slab.find_extreme(Side::Ask).err(),
            Some(AoError::MalformedAccount)
        );
        let mut iter = slab.iter(Side::Ask);
        while let Some(Ok(_)) = iter.next() {}
        assert!(iter.next().is_none());
    }

    #[test]
    fn node_errors() {
        let mut builder = SlabBuilder::new(2, AccountTag::Asks, [0; 32]);
        builder.insert_leaf(&leaf(1, 0, Side::Ask, 1)).unwrap();
        let mut bytes = builder.bytes().to_vec();
        {
            let slab = Slab::from_buffer(&bytes, AccountTag::Asks).unwrap();
            assert_eq!(slab.get_node(2).err(), Some(AoError::IndexOutOfRange));
            assert_eq!(slab.get_node(u32::MAX).err(), Some(AoError::IndexOutOfRange));
            assert_eq!(slab.get_node(1).unwrap(), Node::Uninitialized);
        }
        bytes[PADDED_SLAB_HEADER_LEN] = 9;
        let slab = Slab::from_buffer(&bytes, AccountTag::Asks).unwrap();
        assert_eq!(slab.get_node(0).err(), Some(AoError::MalformedAccount));
        assert_eq!(
            slab.find_extreme(Side::Ask).err(),
            Some(AoError::MalformedAccount)
        );
    }

    #[test]
    fn header_validation() {
        let builder = SlabBuilder::new(2, AccountTag::Asks, [0; 32]);
        let bytes = builder.bytes();
        assert_eq!(
            Slab::from_buffer(bytes, AccountTag::Bids).err(),
            Some(AoError::MalformedAccount)
        );
        assert_eq!(
            Slab::from_buffer(&bytes[..100], AccountTag::Asks).err(),
            Some(AoError::MalformedAccount)
        );

        let mut header = SlabHeader {
            account_tag: AccountTag::Asks.into(),
            leaf_count: 1,
            root_node: 5,
            bump_index: 1,
            ..SlabHeader::default()
        };
        let mut bytes = vec![0u8; PADDED_SLAB_HEADER_LEN + 2 * SLOT_SIZE];
        header.serialize(&mut &mut bytes[..]).unwrap();
        assert_eq!(
            Slab::from_buffer(&bytes, AccountTag::Asks).err(),
            Some(AoError::MalformedAccount)
        );

        header.root_node = 0;
        header.bump_index = 3;
        header.serialize(&mut &mut bytes[..]).unwrap();
        assert_eq!(
            Slab::from_buffer(&bytes, AccountTag::Asks).err(),
            Some(AoError::MalformedAccount)
        );

        header.bump_index = 1;
        header.free_list_len = 2;
        header.serialize(&mut &mut bytes[..]).unwrap();
        assert_eq!(
            Slab::from_buffer(&bytes, AccountTag::Asks).err(),
            Some(AoError::MalformedAccount)
        );
    }
}
