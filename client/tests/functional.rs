use aob_reader::config::BookConfig;
use aob_reader::error::AoError;
use aob_reader::fractional::Fractional;
use aob_reader::state::event_queue::Event;
use aob_reader::state::orderbook::OrderBookView;
use aob_reader::state::{parse_account, ParsedAccount, Side};
use solana_program::pubkey::Pubkey;
pub mod common;
use crate::common::utils::create_market_and_accounts;

#[test]
fn test_market_snapshot() {
    let mut market = create_market_and_accounts(100, 16);
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    let carol = Pubkey::new_unique();

    let bid_1 = market.post_order(Side::Bid, 990, 10, alice);
    market.post_order(Side::Bid, 1000, 5, bob);
    market.post_order(Side::Bid, 1000, 7, alice);
    let ask_1 = market.post_order(Side::Ask, 1010, 4, carol);
    market.post_order(Side::Ask, 1020, 8, bob);

    // A taker sells into the best bid
    let best_bid = market.bids.slab().unwrap().find_extreme(Side::Bid).unwrap().unwrap();
    market.fill(Side::Bid, best_bid.key, 5, carol).unwrap();
    market.fill(Side::Ask, ask_1, 1, alice).unwrap();
    market.cancel(Side::Bid, bid_1).unwrap();

    // Decode everything from raw bytes
    let market_bytes = market.market_bytes();
    let market_state = match parse_account(&market_bytes).unwrap() {
        ParsedAccount::Market(m) => m,
        _ => panic!("expected the market account"),
    };
    assert_eq!(market_state.event_slot_size(), Event::compute_slot_size(32));

    let bids = match parse_account(market.bids.bytes()).unwrap() {
        ParsedAccount::Bids(s) => s,
        _ => panic!("expected the bids account"),
    };
    let asks = match parse_account(market.asks.bytes()).unwrap() {
        ParsedAccount::Asks(s) => s,
        _ => panic!("expected the asks account"),
    };
    let queue = match parse_account(market.event_queue.bytes()).unwrap() {
        ParsedAccount::EventQueue(q) => q,
        _ => panic!("expected the event queue account"),
    };

    let config = BookConfig::default()
        .with_tick_size(Fractional::new(1, 2))
        .with_orders();
    let view = OrderBookView::new(&bids, &asks, &config).unwrap();

    // bob's bid was filled out, alice's later bid at the same price remains
    assert_eq!(view.bids.len(), 1);
    assert_eq!(view.best_bid().unwrap().price, 1000);
    assert_eq!(view.best_bid().unwrap().total_quantity, 7);
    assert_eq!(view.best_ask().unwrap().total_quantity, 3);
    assert_eq!(view.spread().unwrap(), Fractional::new(10, 0));
    assert_eq!(
        view.best_ask()
            .unwrap()
            .decimal_price(&config)
            .unwrap()
            .to_string(),
        "10.1"
    );

    // Fill + Out for bob, Fill for carol's ask, Out for the cancel
    assert_eq!(queue.len(), 4);
    let events = queue.iter().collect::<Result<Vec<_>, _>>().unwrap();
    match events[0] {
        Event::Fill(f) => {
            assert_eq!(f.maker_callback_info, bob.to_bytes());
            assert_eq!(f.taker_callback_info, carol.to_bytes());
            assert_eq!(f.base_size, 5);
            assert_eq!(f.taker_side, Side::Ask);
        }
        _ => panic!("expected a fill"),
    }
    match events[3] {
        Event::Out(o) => {
            assert_eq!(o.order_id, bid_1);
            assert_eq!(o.base_size, 10);
            assert!(o.delete);
        }
        _ => panic!("expected an out event"),
    }
    assert_eq!(
        queue.participant_accounts(10).unwrap(),
        vec![bob, carol, alice]
    );
    assert_eq!(queue.participant_accounts(1).unwrap(), vec![bob, carol]);
    assert_eq!(
        queue.register().unwrap().posted_order_id,
        Some(market.asks.slab().unwrap().find_extreme(Side::Bid).unwrap().unwrap().key)
    );
}

#[test]
fn test_consumed_events_wrap() {
    let mut market = create_market_and_accounts(10, 3);
    let maker = Pubkey::new_unique();
    let order = market.post_order(Side::Ask, 50, 100, maker);
    for i in 0..10 {
        market.fill(Side::Ask, order, 1, Pubkey::new_unique()).unwrap();
        if i % 2 == 1 {
            market.event_queue.pop_n(2);
        }
    }
    market.event_queue.pop_n(1);

    let queue = match parse_account(market.event_queue.bytes()).unwrap() {
        ParsedAccount::EventQueue(q) => q,
        _ => panic!("expected the event queue account"),
    };
    assert_eq!(queue.header().seq_num, 10);
    assert_eq!(queue.len(), 0);
    assert_eq!(queue.event_at(0).err(), Some(AoError::IndexOutOfRange));

    market.fill(Side::Ask, order, 1, maker).unwrap();
    let queue = match parse_account(market.event_queue.bytes()).unwrap() {
        ParsedAccount::EventQueue(q) => q,
        _ => panic!("expected the event queue account"),
    };
    assert_eq!(queue.participant_accounts(5).unwrap(), vec![maker]);
}
