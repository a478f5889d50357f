use std::borrow::Cow;
use std::collections::HashSet;
use std::convert::TryFrom;
use std::io::Write;

use borsh::{BorshDeserialize, BorshSerialize};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use solana_program::{msg, pubkey::Pubkey};

use crate::error::{AoError, AoResult};
use crate::utils::{check_buffer_len, check_field};

use super::{AccountTag, Side};

#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Describes the current state of the event queue
pub struct EventQueueHeader {
    #[allow(missing_docs)]
    pub account_tag: u64,
    /// Byte offset of the oldest event in the ring buffer
    pub head: u64,
    /// The current event queue length
    pub count: u64,
    /// Size in bytes of a ring buffer slot
    pub event_size: u64,
    /// Sequence number of the next event pushed by the program
    pub seq_num: u64,
    #[allow(missing_docs)]
    pub reserved: u64,
}

impl EventQueueHeader {
    #[allow(missing_docs)]
    pub const LEN: usize = 48;
}

#[allow(missing_docs)]
pub const EVENT_QUEUE_HEADER_LEN: usize = EventQueueHeader::LEN;

/// This struct is written back into the event queue's register after new_order or cancel_order.
///
/// In the case of a new order, the quantities describe the total order amounts which
/// were either matched against other orders or written into the orderbook.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummary {
    /// When applicable, the order id of the newly created order.
    pub posted_order_id: Option<u128>,
    #[allow(missing_docs)]
    pub total_base_qty: u64,
    #[allow(missing_docs)]
    pub total_quote_qty: u64,
    #[allow(missing_docs)]
    pub total_base_qty_posted: u64,
}

/// The serialized size of an OrderSummary object.
pub const ORDER_SUMMARY_SIZE: usize = 41;
/// The size of the register window, which holds an optional OrderSummary.
pub const REGISTER_SIZE: usize = ORDER_SUMMARY_SIZE + 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum EventTag {
    Fill,
    Out,
}

#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq)]
/// Emitted when a taker order matches a resting maker order
pub struct FillEvent {
    #[allow(missing_docs)]
    pub taker_side: Side,
    /// The order id of the maker order
    pub maker_order_id: u128,
    /// The total quote size of the transaction
    pub quote_size: u64,
    /// The total base size of the transaction
    pub base_size: u64,
    #[allow(missing_docs)]
    pub maker_callback_info: [u8; 32],
    #[allow(missing_docs)]
    pub taker_callback_info: [u8; 32],
}

#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq)]
/// Emitted when an order leaves the book, or when a new order could not be fully posted
pub struct OutEvent {
    #[allow(missing_docs)]
    pub side: Side,
    #[allow(missing_docs)]
    pub order_id: u128,
    /// The base size which was left on the order
    pub base_size: u64,
    /// Whether the order was removed from the book
    pub delete: bool,
    #[allow(missing_docs)]
    pub callback_info: [u8; 32],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Event {
    Fill(FillEvent),
    Out(OutEvent),
}

impl Event {
    /// Size of a ring buffer slot able to hold any event for the given callback info length
    pub fn compute_slot_size(callback_info_len: usize) -> usize {
        1 + 33 + 2 * callback_info_len
    }

    /// Decodes an event from the start of `buf`, which may hold trailing slot padding
    pub fn deserialize(buf: &[u8]) -> AoResult<Self> {
        check_buffer_len(buf, 1, "event tag")?;
        let tag = EventTag::try_from(buf[0]).map_err(|_| {
            msg!("Unknown event tag {}", buf[0]);
            AoError::MalformedAccount
        })?;
        let body = &mut &buf[1..];
        let event = match tag {
            EventTag::Fill => Event::Fill(FillEvent::deserialize(body).map_err(malformed)?),
            EventTag::Out => Event::Out(OutEvent::deserialize(body).map_err(malformed)?),
        };
        Ok(event)
    }

    #[allow(missing_docs)]
    pub fn serialize<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&[u8::from(self.tag())])?;
        match self {
            Event::Fill(e) => e.serialize(w),
            Event::Out(e) => e.serialize(w),
        }
    }

    #[allow(missing_docs)]
    pub fn tag(&self) -> EventTag {
        match self {
            Event::Fill(_) => EventTag::Fill,
            Event::Out(_) => EventTag::Out,
        }
    }

    /// The accounts which need to be settled for this event, without duplicates
    pub fn participant_accounts(&self) -> Vec<Pubkey> {
        match self {
            Event::Fill(e) => {
                let maker = Pubkey::new_from_array(e.maker_callback_info);
                let taker = Pubkey::new_from_array(e.taker_callback_info);
                if maker == taker {
                    vec![maker]
                } else {
                    vec![maker, taker]
                }
            }
            Event::Out(e) => vec![Pubkey::new_from_array(e.callback_info)],
        }
    }
}

fn malformed(e: std::io::Error) -> AoError {
    msg!("Failed to decode event: {}", e);
    AoError::MalformedAccount
}

/// The event queue account contains a serialized header, a register
/// and a circular buffer of serialized events.
///
/// Events are decoded on access, and only the header and register are parsed up front.
#[derive(Debug, Clone, Copy)]
pub struct EventQueue<'a> {
    header: EventQueueHeader,
    register: Option<OrderSummary>,
    ring: &'a [u8],
}

impl<'a> EventQueue<'a> {
    #[allow(missing_docs)]
    pub fn from_buffer(buf: &'a [u8]) -> AoResult<Self> {
        check_buffer_len(buf, EVENT_QUEUE_HEADER_LEN + REGISTER_SIZE, "event queue header")?;
        let header = EventQueueHeader::deserialize(&mut &buf[..EVENT_QUEUE_HEADER_LEN])
            .map_err(|e| {
                msg!("Failed to decode event queue header: {}", e);
                AoError::MalformedAccount
            })?;
        check_field(
            header.account_tag == u64::from(AccountTag::EventQueue),
            "Invalid event queue account tag",
        )?;
        let register = Option::<OrderSummary>::deserialize(
            &mut &buf[EVENT_QUEUE_HEADER_LEN..EVENT_QUEUE_HEADER_LEN + REGISTER_SIZE],
        )
        .map_err(|e| {
            msg!("Failed to decode event queue register: {}", e);
            AoError::MalformedAccount
        })?;
        let ring = &buf[EVENT_QUEUE_HEADER_LEN + REGISTER_SIZE..];
        let ring_len = ring.len() as u64;
        check_field(header.event_size != 0, "Event queue event size is zero")?;
        check_field(
            header.event_size <= ring_len,
            "Event queue event size exceeds the ring buffer length",
        )?;
        check_field(
            header.count <= ring_len / header.event_size,
            "Event queue count exceeds its capacity",
        )?;
        check_field(
            header.head < ring_len,
            "Event queue head out of bounds",
        )?;
        Ok(Self {
            header,
            register,
            ring,
        })
    }

    #[allow(missing_docs)]
    pub fn header(&self) -> &EventQueueHeader {
        &self.header
    }

    /// The summary of the last order processed by the program
    pub fn register(&self) -> Option<&OrderSummary> {
        self.register.as_ref()
    }

    /// Number of events the ring buffer can hold
    pub fn capacity(&self) -> u64 {
        self.ring.len() as u64 / self.header.event_size
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> u64 {
        self.header.count
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.header.count == 0
    }

    /// Raw bytes of the event at `index`. A slot which straddles the end of the ring buffer is
    /// reassembled from the ring's tail and head.
    pub fn event_bytes(&self, index: u64) -> AoResult<Cow<'a, [u8]>> {
        if index >= self.header.count {
            return Err(AoError::IndexOutOfRange);
        }
        let ring_len = self.ring.len();
        let event_size = self.header.event_size as usize;
        let start = ((self.header.head as u128 + index as u128 * event_size as u128)
            % ring_len as u128) as usize;
        let end = start + event_size;
        if end <= ring_len {
            return Ok(Cow::Borrowed(&self.ring[start..end]));
        }
        let mut bytes = Vec::with_capacity(event_size);
        bytes.extend_from_slice(&self.ring[start..]);
        bytes.extend_from_slice(&self.ring[..end - ring_len]);
        Ok(Cow::Owned(bytes))
    }

    /// Retrieves the event at position index in the queue.
    pub fn event_at(&self, index: u64) -> AoResult<Event> {
        Event::deserialize(&self.event_bytes(index)?)
    }

    /// Returns an iterator over all the queue's events
    pub fn iter(&self) -> QueueIterator<'a> {
        QueueIterator {
            queue: *self,
            current_index: 0,
        }
    }

    /// Collects the accounts touched by the first `max_events` events, in queue order and
    /// without duplicates.
    pub fn participant_accounts(&self, max_events: usize) -> AoResult<Vec<Pubkey>> {
        let mut seen = HashSet::new();
        let mut accounts = Vec::new();
        for event in self.iter().take(max_events) {
            for key in event?.participant_accounts() {
                if seen.insert(key) {
                    accounts.push(key);
                }
            }
        }
        Ok(accounts)
    }
}

/// Utility struct for iterating over a queue
pub struct QueueIterator<'a> {
    queue: EventQueue<'a>,
    current_index: u64,
}

impl<'a> Iterator for QueueIterator<'a> {
    type Item = AoResult<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_index >= self.queue.header.count {
            return None;
        }
        let event = self.queue.event_at(self.current_index);
        self.current_index += 1;
        Some(event)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.queue.header.count - self.current_index) as usize;
        (remaining, Some(remaining))
    }
}
