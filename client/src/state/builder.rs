//! Writers producing account images in the exact layout the orderbook program uses.
//!
//! They are used to build fixtures for the decoders and to simulate program activity
//! offline. The insertion and removal logic follows the program's own critbit tree.
use borsh::BorshSerialize;
use solana_program::msg;

use crate::error::{AoError, AoResult};
use crate::state::critbit::{
    FreeNode, InnerNode, LeafNode, Node, NodeHandle, Slab, SlabHeader, PADDED_SLAB_HEADER_LEN,
    SLOT_SIZE,
};
use crate::state::event_queue::{
    Event, EventQueueHeader, OrderSummary, EVENT_QUEUE_HEADER_LEN, REGISTER_SIZE,
};
use crate::state::{AccountTag, Side};
use crate::utils::assert;

/// Builds a leaf key: the price in the top 32 bits and the sequence number in the low 64 bits,
/// negated for bids so that older orders come first in a descending walk.
pub fn order_key(price: u64, seq_num: u64, side: Side) -> AoResult<u128> {
    if price > u32::MAX as u64 {
        msg!("Price {} does not fit in 32 bits", price);
        return Err(AoError::NumericOverflow);
    }
    let upper = (price as u128) << 96;
    let lower = match side {
        Side::Bid => !seq_num,
        Side::Ask => seq_num,
    };
    Ok(upper | (lower as u128))
}

/// An owned, writable bids or asks account image
pub struct SlabBuilder {
    header: SlabHeader,
    tag: AccountTag,
    buffer: Vec<u8>,
}

impl SlabBuilder {
    #[allow(missing_docs)]
    pub fn new(capacity: usize, tag: AccountTag, market_address: [u8; 32]) -> Self {
        let mut builder = Self {
            header: SlabHeader {
                account_tag: tag.into(),
                market_address,
                ..SlabHeader::default()
            },
            tag,
            buffer: vec![0; PADDED_SLAB_HEADER_LEN + capacity * SLOT_SIZE],
        };
        builder.write_header();
        builder
    }

    /// The serialized account
    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Decodes the current image
    pub fn slab(&self) -> AoResult<Slab<'_>> {
        Slab::from_buffer(&self.buffer, self.tag)
    }

    #[allow(missing_docs)]
    pub fn header(&self) -> &SlabHeader {
        &self.header
    }

    #[allow(missing_docs)]
    pub fn capacity(&self) -> u64 {
        ((self.buffer.len() - PADDED_SLAB_HEADER_LEN) / SLOT_SIZE) as u64
    }

    fn write_header(&mut self) {
        let mut w: &mut [u8] = &mut self.buffer[..SlabHeader::LEN];
        // The buffer always holds at least the header
        let _ = self.header.serialize(&mut w);
    }

    fn slot_range(&self, handle: NodeHandle) -> AoResult<std::ops::Range<usize>> {
        if handle as u64 >= self.capacity() {
            return Err(AoError::IndexOutOfRange);
        }
        let offset = PADDED_SLAB_HEADER_LEN + handle as usize * SLOT_SIZE;
        Ok(offset..offset + SLOT_SIZE)
    }

    fn read_node(&self, handle: NodeHandle) -> AoResult<Node> {
        let range = self.slot_range(handle)?;
        Node::deserialize(&self.buffer[range])
    }

    fn write_node(&mut self, handle: NodeHandle, node: &Node) -> AoResult {
        let range = self.slot_range(handle)?;
        node.serialize(&mut self.buffer[range])
    }

    fn free_slots(&self) -> u64 {
        self.header.free_list_len + (self.capacity() - self.header.bump_index)
    }

    fn allocate(&mut self, node: &Node) -> AoResult<NodeHandle> {
        if self.header.free_list_len == 0 {
            assert(
                self.header.bump_index < self.capacity(),
                AoError::SlabOutOfSpace,
            )?;
            let handle = self.header.bump_index as NodeHandle;
            self.header.bump_index += 1;
            self.write_node(handle, node)?;
            return Ok(handle);
        }

        let handle = self.header.free_list_head;
        let next_free_list_head = match self.read_node(handle)? {
            Node::Free(f) if self.header.free_list_len > 1 => f.next,
            Node::LastFree(f) if self.header.free_list_len == 1 => f.next,
            _ => {
                msg!("Corrupt free list at slot {}", handle);
                return Err(AoError::MalformedAccount);
            }
        };
        self.header.free_list_head = next_free_list_head;
        self.header.free_list_len -= 1;
        self.write_node(handle, node)?;
        Ok(handle)
    }

    fn free(&mut self, handle: NodeHandle) -> AoResult<Node> {
        let val = self.read_node(handle)?;
        let new_free_node = FreeNode {
            next: self.header.free_list_head,
        };
        let node = if self.header.free_list_len == 0 {
            Node::LastFree(new_free_node)
        } else {
            Node::Free(new_free_node)
        };
        self.write_node(handle, &node)?;
        self.header.free_list_head = handle;
        self.header.free_list_len += 1;
        Ok(val)
    }

    /// Inserts a leaf, replacing and returning any leaf with the same key
    pub fn insert_leaf(&mut self, new_leaf: &LeafNode) -> AoResult<(NodeHandle, Option<LeafNode>)> {
        let result = self.insert_leaf_inner(new_leaf);
        self.write_header();
        result
    }

    fn insert_leaf_inner(
        &mut self,
        new_leaf: &LeafNode,
    ) -> AoResult<(NodeHandle, Option<LeafNode>)> {
        let mut root: NodeHandle = if self.header.leaf_count == 0 {
            // create a new root if none exists
            let new_leaf_handle = self.allocate(&Node::Leaf(*new_leaf))?;
            self.header.root_node = new_leaf_handle;
            self.header.leaf_count += 1;
            return Ok((new_leaf_handle, None));
        } else {
            self.header.root_node
        };
        let mut parent: Option<(NodeHandle, bool)> = None;
        for _ in 0..=self.capacity() {
            let shared_prefix_len = match self.read_node(root)? {
                Node::Inner(root_node) => {
                    let shared_prefix_len: u32 = (root_node.key ^ new_leaf.key).leading_zeros();
                    if shared_prefix_len >= root_node.prefix_len as u32 {
                        let (child, crit_bit) = root_node.walk_down(new_leaf.key);
                        parent = Some((root, crit_bit));
                        root = child;
                        continue;
                    }
                    shared_prefix_len
                }
                Node::Leaf(root_node) => {
                    if root_node.key == new_leaf.key {
                        // clobber the existing leaf
                        self.write_node(root, &Node::Leaf(*new_leaf))?;
                        return Ok((root, Some(root_node)));
                    }
                    (root_node.key ^ new_leaf.key).leading_zeros()
                }
                _ => {
                    msg!("Unexpected node in the live tree at slot {}", root);
                    return Err(AoError::MalformedAccount);
                }
            };
            assert(self.free_slots() >= 2, AoError::SlabOutOfSpace)?;

            // the new inner node takes the place of [root] and holds it next to the new leaf
            let crit_bit_mask: u128 = (1u128 << 127) >> shared_prefix_len;
            let new_leaf_crit_bit = (crit_bit_mask & new_leaf.key) != 0;
            let old_root_crit_bit = !new_leaf_crit_bit;

            let new_leaf_handle = self.allocate(&Node::Leaf(*new_leaf))?;
            let mut children = [0; 2];
            children[new_leaf_crit_bit as usize] = new_leaf_handle;
            children[old_root_crit_bit as usize] = root;
            let new_root_node_handle = self.allocate(&Node::Inner(InnerNode {
                prefix_len: shared_prefix_len as u64,
                key: new_leaf.key,
                children,
            }))?;

            match parent {
                Some((parent_handle, crit_bit)) => match self.read_node(parent_handle)? {
                    Node::Inner(mut node) => {
                        node.children[crit_bit as usize] = new_root_node_handle;
                        self.write_node(parent_handle, &Node::Inner(node))?;
                    }
                    _ => return Err(AoError::MalformedAccount),
                },
                None => self.header.root_node = new_root_node_handle,
            }
            self.header.leaf_count += 1;
            return Ok((new_leaf_handle, None));
        }
        msg!("Slab walk exceeded the slab capacity");
        Err(AoError::MalformedAccount)
    }

    /// Removes the leaf with the given key. The removed leaf's sibling is moved into the
    /// parent's slot, so handles of the sibling subtree root change.
    pub fn remove_by_key(&mut self, search_key: u128) -> AoResult<Option<LeafNode>> {
        let result = self.remove_by_key_inner(search_key);
        self.write_header();
        result
    }

    fn remove_by_key_inner(&mut self, search_key: u128) -> AoResult<Option<LeafNode>> {
        if self.header.leaf_count == 0 {
            return Ok(None);
        }
        let mut parent_h = self.header.root_node;
        let (mut child_h, mut crit_bit) = match self.read_node(parent_h)? {
            Node::Leaf(leaf) if leaf.key == search_key => {
                self.header.root_node = 0;
                self.header.leaf_count = 0;
                self.free(parent_h)?;
                return Ok(Some(leaf));
            }
            Node::Leaf(_) => return Ok(None),
            Node::Inner(inner) => inner.walk_down(search_key),
            _ => return Err(AoError::MalformedAccount),
        };
        let mut steps = 0;
        let removed_leaf = loop {
            steps += 1;
            if steps > self.capacity() {
                return Err(AoError::MalformedAccount);
            }
            match self.read_node(child_h)? {
                Node::Inner(inner) => {
                    let (grandchild_h, grandchild_crit_bit) = inner.walk_down(search_key);
                    parent_h = child_h;
                    child_h = grandchild_h;
                    crit_bit = grandchild_crit_bit;
                }
                Node::Leaf(leaf) => {
                    if leaf.key != search_key {
                        return Ok(None);
                    }
                    break leaf;
                }
                _ => return Err(AoError::MalformedAccount),
            }
        };

        // replace parent with its remaining child node
        let other_child_h = match self.read_node(parent_h)? {
            Node::Inner(inner) => inner.children[!crit_bit as usize],
            _ => return Err(AoError::MalformedAccount),
        };
        let other_child_node_contents = self.free(other_child_h)?;
        self.write_node(parent_h, &other_child_node_contents)?;
        self.header.leaf_count -= 1;
        self.free(child_h)?;
        Ok(Some(removed_leaf))
    }
}

/// An owned, writable event queue account image
pub struct EventQueueBuilder {
    header: EventQueueHeader,
    buffer: Vec<u8>,
}

impl EventQueueBuilder {
    #[allow(missing_docs)]
    pub fn new(ring_len: usize, event_size: usize) -> Self {
        let mut builder = Self {
            header: EventQueueHeader {
                account_tag: AccountTag::EventQueue.into(),
                event_size: event_size as u64,
                ..EventQueueHeader::default()
            },
            buffer: vec![0; EVENT_QUEUE_HEADER_LEN + REGISTER_SIZE + ring_len],
        };
        builder.write_header();
        builder
    }

    /// The serialized account
    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    #[allow(missing_docs)]
    pub fn header(&self) -> &EventQueueHeader {
        &self.header
    }

    fn ring_len(&self) -> usize {
        self.buffer.len() - EVENT_QUEUE_HEADER_LEN - REGISTER_SIZE
    }

    #[allow(missing_docs)]
    pub fn capacity(&self) -> u64 {
        self.ring_len()
            .checked_div(self.header.event_size as usize)
            .unwrap_or(0) as u64
    }

    fn write_header(&mut self) {
        let mut w: &mut [u8] = &mut self.buffer[..EVENT_QUEUE_HEADER_LEN];
        let _ = self.header.serialize(&mut w);
    }

    /// Appends an event after the last one, splitting it across the end of the ring if needed
    pub fn push_back(&mut self, event: &Event) -> AoResult {
        assert(self.header.count < self.capacity(), AoError::EventQueueFull)?;
        let event_size = self.header.event_size as usize;
        let mut slot = Vec::with_capacity(event_size);
        event.serialize(&mut slot).map_err(|_| AoError::MalformedAccount)?;
        if slot.len() > event_size {
            msg!("Event does not fit in a {} byte slot", event_size);
            return Err(AoError::IndexOutOfRange);
        }
        slot.resize(event_size, 0);

        let ring_len = self.ring_len();
        let start = (self.header.head as usize + self.header.count as usize * event_size) % ring_len;
        let ring = &mut self.buffer[EVENT_QUEUE_HEADER_LEN + REGISTER_SIZE..];
        let first = std::cmp::min(event_size, ring_len - start);
        ring[start..start + first].copy_from_slice(&slot[..first]);
        ring[..event_size - first].copy_from_slice(&slot[first..]);

        self.header.count += 1;
        self.header.seq_num += 1;
        self.write_header();
        Ok(())
    }

    /// Pop n entries from the event queue
    pub fn pop_n(&mut self, number_of_entries_to_pop: u64) {
        let capped_number_of_entries_to_pop =
            std::cmp::min(self.header.count, number_of_entries_to_pop);
        if capped_number_of_entries_to_pop == 0 {
            return;
        }
        self.header.count -= capped_number_of_entries_to_pop;
        self.header.head = (self.header.head
            + capped_number_of_entries_to_pop * self.header.event_size)
            % self.ring_len() as u64;
        self.write_header();
    }

    /// Writes the order summary register
    pub fn set_register(&mut self, summary: Option<OrderSummary>) -> AoResult {
        let window =
            &mut self.buffer[EVENT_QUEUE_HEADER_LEN..EVENT_QUEUE_HEADER_LEN + REGISTER_SIZE];
        window.fill(0);
        let mut w: &mut [u8] = window;
        summary
            .serialize(&mut w)
            .map_err(|_| AoError::MalformedAccount)
    }
}
