//! Core order book data structure.
//!
//! Levels live in four flat arrays (price and quantity per side), one
//! slot per quoted rank. The feed delivers level lists pre-sorted
//! best-first, so slot index encodes priority and no sorting or
//! price-based merging happens here. A quantity of zero marks a deleted
//! slot, which is why best-level lookup is a scan rather than a pointer.

use crate::types::{Price, Qty};

/// Number of level slots per side.
pub const DEPTH: usize = 1000;

/// Lanes folded per iteration of the word-parallel scan.
const LANES: usize = 8;

// The blocked scan has no remainder loop.
const _: () = assert!(DEPTH % LANES == 0);

/// Strategy for the best-level scan.
///
/// Both strategies return identical results for every input; the choice
/// only affects how the quantity array is traversed. [`ScanMode::detect`]
/// picks one at runtime so a single binary serves machines with and
/// without wide vector units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Element-by-element scan; portable baseline.
    Scalar,
    /// Blocked scan folding 8-wide lane groups into an occupancy
    /// bitmask, localized with `trailing_zeros`. Autovectorizes on
    /// targets with wide compares.
    Wordwise,
}

impl ScanMode {
    /// Pick a scan strategy for the running machine.
    #[must_use]
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if std::arch::is_x86_feature_detected!("avx2") {
                return Self::Wordwise;
            }
        }
        Self::Scalar
    }
}

/// Fixed-capacity order book for a single symbol.
///
/// # Design Decisions
///
/// 1. **Integer prices**: 1e-4 ticks and 1e-8 quantity units, avoiding
///    floating-point arithmetic and enabling exact comparisons.
///
/// 2. **Structure of arrays**: each side is a contiguous price array and
///    quantity array, 8 KiB apiece, so the best-level scan touches one
///    dense array.
///
/// 3. **Rank-indexed slots**: slot `i` is the feed's `i`-th best level.
///    Callers must pass full, consistently sorted level lists, exactly as
///    the depth stream provides them; partial or unsorted lists are
///    outside the contract.
///
/// # Thread Safety
///
/// This struct is `Send + Sync` but not internally synchronized. For
/// concurrent access, wrap in `parking_lot::Mutex` and apply both sides
/// of one update under a single lock acquisition.
#[derive(Debug, Clone)]
pub struct OrderBook {
    bid_px: Box<[Price; DEPTH]>,
    bid_qty: Box<[Qty; DEPTH]>,
    ask_px: Box<[Price; DEPTH]>,
    ask_qty: Box<[Qty; DEPTH]>,
    scan: ScanMode,
}

impl OrderBook {
    /// Create an empty book using the detected scan strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_scan(ScanMode::detect())
    }

    /// Create an empty book pinned to the given scan strategy.
    #[must_use]
    pub fn with_scan(scan: ScanMode) -> Self {
        Self {
            bid_px: Box::new([0; DEPTH]),
            bid_qty: Box::new([0; DEPTH]),
            ask_px: Box::new([0; DEPTH]),
            ask_qty: Box::new([0; DEPTH]),
            scan,
        }
    }

    /// The scan strategy this book was built with.
    #[must_use]
    pub const fn scan_mode(&self) -> ScanMode {
        self.scan
    }

    /// Overwrite bid slots `0..len` with the given levels.
    ///
    /// `px` and `qty` are parallel, best price first. Entries beyond
    /// [`DEPTH`] are dropped; a `debug_assert` flags that in debug builds.
    pub fn apply_bid_delta(&mut self, px: &[Price], qty: &[Qty]) {
        debug_assert_eq!(px.len(), qty.len());
        debug_assert!(px.len() <= DEPTH, "level list deeper than the book");
        let n = px.len().min(qty.len()).min(DEPTH);
        self.bid_px[..n].copy_from_slice(&px[..n]);
        self.bid_qty[..n].copy_from_slice(&qty[..n]);
    }

    /// Overwrite ask slots `0..len` with the given levels.
    ///
    /// Same contract as [`apply_bid_delta`](Self::apply_bid_delta).
    pub fn apply_ask_delta(&mut self, px: &[Price], qty: &[Qty]) {
        debug_assert_eq!(px.len(), qty.len());
        debug_assert!(px.len() <= DEPTH, "level list deeper than the book");
        let n = px.len().min(qty.len()).min(DEPTH);
        self.ask_px[..n].copy_from_slice(&px[..n]);
        self.ask_qty[..n].copy_from_slice(&qty[..n]);
    }

    /// Write a single bid slot.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= DEPTH`.
    pub fn set_bid_level(&mut self, idx: usize, price: Price, qty: Qty) {
        self.bid_px[idx] = price;
        self.bid_qty[idx] = qty;
    }

    /// Write a single ask slot.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= DEPTH`.
    pub fn set_ask_level(&mut self, idx: usize, price: Price, qty: Qty) {
        self.ask_px[idx] = price;
        self.ask_qty[idx] = qty;
    }

    /// Read a bid slot as `(price, quantity)`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= DEPTH`.
    #[must_use]
    pub fn bid_level(&self, idx: usize) -> (Price, Qty) {
        (self.bid_px[idx], self.bid_qty[idx])
    }

    /// Read an ask slot as `(price, quantity)`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= DEPTH`.
    #[must_use]
    pub fn ask_level(&self, idx: usize) -> (Price, Qty) {
        (self.ask_px[idx], self.ask_qty[idx])
    }

    /// Index of the best bid: the lowest-index slot with quantity > 0.
    ///
    /// Returns `None` when no bid slot is occupied. Deleted levels leave
    /// zeroed quantities mid-array, so this scans rather than assuming
    /// slot 0 is live.
    #[must_use]
    pub fn best_bid(&self) -> Option<usize> {
        scan(self.scan, &self.bid_qty[..])
    }

    /// Index of the best ask: the lowest-index slot with quantity > 0.
    ///
    /// Returns `None` when no ask slot is occupied.
    #[must_use]
    pub fn best_ask(&self) -> Option<usize> {
        scan(self.scan, &self.ask_qty[..])
    }

    /// Best bid as `(price, quantity)`, or `None` if the side is empty.
    #[must_use]
    pub fn best_bid_level(&self) -> Option<(Price, Qty)> {
        self.best_bid().map(|i| self.bid_level(i))
    }

    /// Best ask as `(price, quantity)`, or `None` if the side is empty.
    #[must_use]
    pub fn best_ask_level(&self) -> Option<(Price, Qty)> {
        self.best_ask().map(|i| self.ask_level(i))
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

fn scan(mode: ScanMode, qty: &[Qty]) -> Option<usize> {
    match mode {
        ScanMode::Scalar => scan_scalar(qty),
        ScanMode::Wordwise => scan_wordwise(qty),
    }
}

fn scan_scalar(qty: &[Qty]) -> Option<usize> {
    qty.iter().position(|&q| q > 0)
}

fn scan_wordwise(qty: &[Qty]) -> Option<usize> {
    for (block, lanes) in qty.chunks_exact(LANES).enumerate() {
        let mut mask: u32 = 0;
        for (bit, &q) in lanes.iter().enumerate() {
            mask |= u32::from(q > 0) << bit;
        }
        if mask != 0 {
            return Some(block * LANES + mask.trailing_zeros() as usize);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: [ScanMode; 2] = [ScanMode::Scalar, ScanMode::Wordwise];

    #[test]
    fn test_fresh_book_is_empty() {
        for mode in MODES {
            let book = OrderBook::with_scan(mode);
            assert_eq!(book.best_bid(), None);
            assert_eq!(book.best_ask(), None);
            assert_eq!(book.best_bid_level(), None);
        }
    }

    #[test]
    fn test_best_levels_by_slot() {
        for mode in MODES {
            let mut book = OrderBook::with_scan(mode);
            book.set_bid_level(0, 3_000_000, 1);
            book.set_ask_level(2, 3_010_000, 2);

            assert_eq!(book.best_bid(), Some(0));
            assert_eq!(book.best_ask(), Some(2));
            assert_eq!(book.best_bid_level(), Some((3_000_000, 1)));
            assert_eq!(book.best_ask_level(), Some((3_010_000, 2)));
        }
    }

    #[test]
    fn test_apply_delta_overwrites_in_place() {
        let mut book = OrderBook::new();
        book.apply_bid_delta(&[3_000_000, 2_999_000], &[1, 2]);

        assert_eq!(book.bid_level(0), (3_000_000, 1));
        assert_eq!(book.bid_level(1), (2_999_000, 2));
        // Untouched slots stay zero.
        assert_eq!(book.bid_level(2), (0, 0));
    }

    #[test]
    fn test_apply_delta_is_idempotent() {
        let mut book = OrderBook::new();
        let px = [3_000_000, 2_999_000, 2_998_500];
        let qty = [5, 0, 7];

        book.apply_bid_delta(&px, &qty);
        let first = book.clone();
        book.apply_bid_delta(&px, &qty);

        for i in 0..px.len() {
            assert_eq!(book.bid_level(i), first.bid_level(i));
        }
        assert_eq!(book.best_bid(), first.best_bid());
    }

    #[test]
    fn test_zeroed_mid_array_levels_are_skipped() {
        for mode in MODES {
            let mut book = OrderBook::with_scan(mode);
            book.apply_ask_delta(&[3_010_000, 3_011_000, 3_012_000], &[0, 0, 9]);
            assert_eq!(book.best_ask(), Some(2));
        }
    }

    #[test]
    fn test_oversized_delta_is_truncated() {
        let px = vec![1_i64; DEPTH + 5];
        let qty = vec![1_i64; DEPTH + 5];
        // Release-mode behavior: excess entries are dropped.
        if cfg!(debug_assertions) {
            let result = std::panic::catch_unwind(move || {
                let mut book = OrderBook::new();
                book.apply_bid_delta(&px, &qty);
            });
            assert!(result.is_err());
        } else {
            let mut book = OrderBook::new();
            book.apply_bid_delta(&px, &qty);
            assert_eq!(book.bid_level(DEPTH - 1), (1, 1));
        }
    }

    #[test]
    fn test_scan_modes_agree_on_single_occupied_slot() {
        // The word-parallel and scalar paths must agree for a lone
        // non-zero quantity at every possible position.
        let mut qty = [0_i64; DEPTH];
        for i in 0..DEPTH {
            qty[i] = 1;
            assert_eq!(scan_scalar(&qty), Some(i));
            assert_eq!(scan_wordwise(&qty), Some(i));
            qty[i] = 0;
        }
        assert_eq!(scan_scalar(&qty), None);
        assert_eq!(scan_wordwise(&qty), None);
    }

    #[test]
    fn test_scan_modes_agree_on_random_books() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let mut qty = [0_i64; DEPTH];
            for slot in qty.iter_mut() {
                // Sparse books exercise long zero prefixes.
                if rng.gen_ratio(1, 16) {
                    *slot = rng.gen_range(1..1_000_000);
                }
            }
            assert_eq!(scan_scalar(&qty), scan_wordwise(&qty));
        }
    }

    #[test]
    fn test_detect_returns_a_usable_mode() {
        let mode = ScanMode::detect();
        let mut book = OrderBook::with_scan(mode);
        book.set_bid_level(3, 100, 1);
        assert_eq!(book.best_bid(), Some(3));
    }
}
