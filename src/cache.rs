//! Thread-local cache of position maps.
//!
//! Re-locating several suggestions inside the same rendered HTML would
//! otherwise rebuild an identical map on every lookup. Maps are keyed by the
//! HTML's length and xxh3 hash. The cache is capped at 64 entries and is
//! cleared wholesale when full.

use crate::html::PositionMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use xxhash_rust::xxh3::xxh3_64;

const MAX_CACHE_ENTRIES: usize = 64;

thread_local! {
    static MAP_CACHE: RefCell<HashMap<(usize, u64), Rc<PositionMap>>> =
        RefCell::new(HashMap::new());
}

/// Get the position map for `html`, building and caching it on a miss.
pub fn position_map_for(html: &str) -> Rc<PositionMap> {
    let key = (html.len(), xxh3_64(html.as_bytes()));

    MAP_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(map) = cache.get(&key) {
            return Rc::clone(map);
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let map = Rc::new(PositionMap::build(html));
        cache.insert(key, Rc::clone(&map));
        map
    })
}

/// Clear the map cache (mainly for testing).
pub fn clear_cache() {
    MAP_CACHE.with(|cache| cache.borrow_mut().clear());
}

pub fn cache_size() -> usize {
    MAP_CACHE.with(|cache| cache.borrow().len())
}
