#![warn(missing_docs)]
/*!
Read-side library for the accounts of an agnostic orderbook market.

## Overview

An orderbook market is made of four accounts owned by the orderbook program: the market state,
the bids and asks slabs, and the event queue. This crate decodes raw snapshots of those
accounts into typed, read-only views. Decoding never mutates or caches the input: every view
borrows the buffer it was decoded from, and a fresh fetch means a fresh decode.

Any buffer can be decoded with [`parse_account`][`state::parse_account`], which dispatches on the
account tag stored in its first 8 bytes.

## Reading the book

The bids and asks accounts are [`Slab`][`state::critbit::Slab`] objects, which hold a critbit
tree in a flat slot arena. A slab can be walked best price first with its
[`iter`][`state::critbit::Slab::iter`] method, or grouped into price levels. The
[`OrderBookView`][`state::orderbook::OrderBookView`] object does this for both sides at once,
using a [`BookConfig`][`config::BookConfig`] to convert tick prices into decimal prices and to
limit the depth of the view.

## Processing the queue

The event queue can be parsed as an [`EventQueue`][`state::event_queue::EventQueue`] object. Its
[`event_at`][`state::event_queue::EventQueue::event_at`] method can be used to retrieve
particular events. Alternatively, the events can be iterated through with the object's `iter`
method. The set of accounts which a settlement crank has to pass along is given by
[`participant_accounts`][`state::event_queue::EventQueue::participant_accounts`].

## Decimal values

Prices and sizes shown to users go through [`Fractional`][`fractional::Fractional`], a fixed point
decimal with checked arithmetic.
*/

/// Settings applied when converting a slab into price levels
pub mod config;
/// Error type shared by every decoder
pub mod error;
/// Fixed point decimal values
pub mod fractional;
/// Layouts of the accounts owned by the orderbook program
pub mod state;
#[doc(hidden)]
pub mod utils;
