use std::convert::TryFrom;

use aob_reader::error::{AoError, AoResult};
use aob_reader::state::{critbit::Slab, AccountTag, Side};

use wasm_bindgen::prelude::*;

fn to_js(e: AoError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn load_slab(data: &[u8]) -> AoResult<Slab<'_>> {
    match AccountTag::from_buffer(data)? {
        tag @ AccountTag::Bids | tag @ AccountTag::Asks => Slab::from_buffer(data, tag),
        _ => Err(AoError::MalformedAccount),
    }
}

fn slab_side(slab: &Slab) -> Side {
    match slab.account_tag() {
        AccountTag::Bids => Side::Bid,
        _ => Side::Ask,
    }
}

fn l2_depth(data: &[u8], depth: u64, increasing: bool) -> AoResult<Vec<u64>> {
    let side = if increasing { Side::Ask } else { Side::Bid };
    // saturate on 32-bit targets
    let depth = usize::try_from(depth).unwrap_or(usize::MAX);
    let levels = load_slab(data)?.l2_depth(depth, side)?;
    Ok(levels
        .into_iter()
        .flat_map(|(price, quantity)| vec![price, quantity])
        .collect())
}

fn best_price(data: &[u8]) -> AoResult<Option<u64>> {
    let slab = load_slab(data)?;
    Ok(slab.find_extreme(slab_side(&slab))?.map(|leaf| leaf.price()))
}

/// Forwards panic messages to the browser console
#[wasm_bindgen]
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Slot of the order with the highest key
#[wasm_bindgen]
pub fn find_max(data: &[u8]) -> Result<Option<u32>, JsValue> {
    load_slab(data).and_then(|s| s.find_max()).map_err(to_js)
}

/// Slot of the order with the lowest key
#[wasm_bindgen]
pub fn find_min(data: &[u8]) -> Result<Option<u32>, JsValue> {
    load_slab(data).and_then(|s| s.find_min()).map_err(to_js)
}

/// Best price in ticks of a bids or asks account
#[wasm_bindgen]
pub fn find_best_price(data: &[u8]) -> Result<Option<u64>, JsValue> {
    best_price(data).map_err(to_js)
}

/// Flattened `[price, quantity, price, quantity, ...]` levels, walked by ascending price when
/// `increasing` is set
#[wasm_bindgen]
pub fn find_l2_depth(data: &[u8], depth: u64, increasing: bool) -> Result<Vec<u64>, JsValue> {
    l2_depth(data, depth, increasing).map_err(to_js)
}
