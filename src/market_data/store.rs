// =============================================================================
// CandleStore — bounded per-(symbol, interval) candle history
// =============================================================================
//
// The sole owner of candle data. Every mutation funnels through one write
// lock over the whole map, and readers receive cloned candles, so no caller
// can observe a half-written record or alias stored data.
//
// The tracked key space is fixed at construction: one empty series is
// pre-created per tracked pair, and updates for anything else are dropped.
// Write rates are sub-second ticks across a handful of pairs, so one coarse
// lock is sufficient.
// =============================================================================

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;
use tracing::debug;

use crate::types::{Candle, SeriesKey};

pub struct CandleStore {
    series: RwLock<HashMap<SeriesKey, VecDeque<Candle>>>,
    capacity: usize,
}

impl CandleStore {
    /// Create a store retaining at most `capacity` candles for each tracked
    /// (symbol, interval) pair.
    pub fn new(symbols: &[String], intervals: &[String], capacity: usize) -> Self {
        let mut series = HashMap::new();
        for symbol in symbols {
            for interval in intervals {
                series.insert(
                    SeriesKey::new(symbol.clone(), interval.clone()),
                    VecDeque::with_capacity(capacity + 1),
                );
            }
        }

        Self {
            series: RwLock::new(series),
            capacity,
        }
    }

    /// Insert or replace the latest candle for the given key.
    ///
    /// * Empty series: append.
    /// * Same `open_time` as the tail: replace the tail (in-progress period
    ///   update).
    /// * Newer than the tail: append, then evict from the front while over
    ///   capacity.
    /// * Older than the tail: drop (stale / out-of-order tick).
    pub fn upsert(&self, key: &SeriesKey, candle: Candle) {
        let mut map = self.series.write();
        match map.get_mut(key) {
            Some(ring) => Self::apply(ring, self.capacity, key, candle),
            None => debug!(key = %key, "update for untracked pair dropped"),
        }
    }

    /// Bulk variant used by backfill: applies the upsert rule per element, in
    /// order, under a single lock acquisition.
    pub fn extend(&self, key: &SeriesKey, candles: Vec<Candle>) {
        let mut map = self.series.write();
        let Some(ring) = map.get_mut(key) else {
            debug!(key = %key, count = candles.len(), "backfill for untracked pair dropped");
            return;
        };
        for candle in candles {
            Self::apply(ring, self.capacity, key, candle);
        }
    }

    fn apply(ring: &mut VecDeque<Candle>, capacity: usize, key: &SeriesKey, candle: Candle) {
        let Some(tail_time) = ring.back().map(|c| c.open_time) else {
            ring.push_back(candle);
            return;
        };

        if candle.open_time == tail_time {
            // In-progress period update: replace the tail in place.
            if let Some(tail) = ring.back_mut() {
                *tail = candle;
            }
        } else if candle.open_time > tail_time {
            ring.push_back(candle);
            while ring.len() > capacity {
                ring.pop_front();
            }
        } else {
            debug!(
                key = %key,
                open_time = candle.open_time,
                tail = tail_time,
                "stale candle dropped"
            );
        }
    }

    /// Return the last `limit` candles for a pair (fewer if not yet filled),
    /// oldest-first. Unknown pairs return an empty vector, never an error.
    pub fn snapshot(&self, key: &SeriesKey, limit: usize) -> Vec<Candle> {
        let map = self.series.read();
        match map.get(key) {
            Some(ring) => {
                let start = ring.len().saturating_sub(limit);
                ring.iter().skip(start).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Return the last `limit` close prices for a pair, oldest-first.
    pub fn closes(&self, key: &SeriesKey, limit: usize) -> Vec<f64> {
        self.snapshot(key, limit).iter().map(|c| c.close).collect()
    }

    /// Number of candles currently stored for a key.
    pub fn series_len(&self, key: &SeriesKey) -> usize {
        let map = self.series.read();
        map.get(key).map_or(0, VecDeque::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_candle(open_time: i64, close: f64) -> Candle {
        Candle {
            open_time,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100.0,
        }
    }

    fn tracked_store(capacity: usize) -> (CandleStore, SeriesKey) {
        let store = CandleStore::new(
            &["BTCUSDT".to_string()],
            &["1m".to_string()],
            capacity,
        );
        (store, SeriesKey::new("BTCUSDT", "1m"))
    }

    #[test]
    fn upserts_keep_strictly_ascending_unique_times() {
        let (store, key) = tracked_store(10);
        for t in [100, 200, 150, 200, 300, 50, 400] {
            store.upsert(&key, sample_candle(t, t as f64));
        }

        let times: Vec<i64> = store
            .snapshot(&key, 10)
            .iter()
            .map(|c| c.open_time)
            .collect();
        assert_eq!(times, vec![100, 200, 300, 400]);
    }

    #[test]
    fn replacing_tail_is_idempotent_on_length() {
        let (store, key) = tracked_store(10);
        store.upsert(&key, sample_candle(100, 1.0));
        store.upsert(&key, sample_candle(100, 2.0));
        store.upsert(&key, sample_candle(100, 3.0));

        let snap = store.snapshot(&key, 10);
        assert_eq!(snap.len(), 1);
        assert!((snap[0].close - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn eviction_keeps_last_capacity_candles() {
        let (store, key) = tracked_store(3);
        for i in 0..6 {
            store.upsert(&key, sample_candle(i * 60_000, i as f64));
        }

        let snap = store.snapshot(&key, 10);
        assert_eq!(snap.len(), 3);
        let times: Vec<i64> = snap.iter().map(|c| c.open_time).collect();
        assert_eq!(times, vec![180_000, 240_000, 300_000]);
    }

    #[test]
    fn stale_candle_leaves_series_unchanged() {
        let (store, key) = tracked_store(10);
        store.upsert(&key, sample_candle(100, 1.0));
        store.upsert(&key, sample_candle(200, 2.0));
        store.upsert(&key, sample_candle(150, 9.0));

        let snap = store.snapshot(&key, 10);
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[1].open_time, 200);
        assert!((snap[1].close - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn scenario_capacity_three_with_tail_update() {
        let (store, key) = tracked_store(3);
        store.upsert(&key, sample_candle(100, 1.0));
        store.upsert(&key, sample_candle(200, 2.0));
        store.upsert(&key, sample_candle(300, 3.0));
        store.upsert(&key, sample_candle(300, 5.0));
        store.upsert(&key, sample_candle(400, 4.0));

        let snap = store.snapshot(&key, 10);
        assert_eq!(snap.len(), 3);
        let times: Vec<i64> = snap.iter().map(|c| c.open_time).collect();
        assert_eq!(times, vec![200, 300, 400]);
        assert!((snap[1].close - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_pair_snapshot_is_empty_not_an_error() {
        let (store, _) = tracked_store(10);
        let unknown = SeriesKey::new("ZZZUSD", "1m");
        assert!(store.snapshot(&unknown, 10).is_empty());
        assert_eq!(store.series_len(&unknown), 0);
    }

    #[test]
    fn untracked_upsert_is_dropped() {
        let (store, _) = tracked_store(10);
        let unknown = SeriesKey::new("ZZZUSD", "1m");
        store.upsert(&unknown, sample_candle(100, 1.0));
        assert!(store.snapshot(&unknown, 10).is_empty());
    }

    #[test]
    fn extend_seeds_in_chronological_order() {
        let (store, key) = tracked_store(300);
        let batch: Vec<Candle> = (0..5).map(|i| sample_candle(i * 60_000, i as f64)).collect();
        store.extend(&key, batch);

        let snap = store.snapshot(&key, 300);
        assert_eq!(snap.len(), 5);
        assert_eq!(snap[0].open_time, 0);
        assert_eq!(snap[4].open_time, 240_000);
    }

    #[test]
    fn backfill_after_live_tick_preserves_invariants() {
        // A live update can land before backfill finishes; both paths share
        // the same rule, so the series stays ascending with unique keys.
        let (store, key) = tracked_store(300);
        store.upsert(&key, sample_candle(300, 30.0));

        let batch: Vec<Candle> = vec![
            sample_candle(100, 1.0),
            sample_candle(200, 2.0),
            sample_candle(300, 3.0),
        ];
        store.extend(&key, batch);

        let snap = store.snapshot(&key, 300);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].open_time, 300);
        assert!((snap[0].close - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_returns_at_most_limit() {
        let (store, key) = tracked_store(300);
        for i in 0..20 {
            store.upsert(&key, sample_candle(i * 60_000, i as f64));
        }

        let snap = store.snapshot(&key, 5);
        assert_eq!(snap.len(), 5);
        assert_eq!(snap[0].open_time, 15 * 60_000);
        assert_eq!(store.snapshot(&key, 0).len(), 0);
    }

    #[test]
    fn snapshots_never_observe_partial_state() {
        use std::sync::Arc;

        let store = Arc::new(CandleStore::new(
            &["BTCUSDT".to_string()],
            &["1m".to_string()],
            50,
        ));
        let key = SeriesKey::new("BTCUSDT", "1m");

        let writer_store = store.clone();
        let writer_key = key.clone();
        let writer = std::thread::spawn(move || {
            for i in 0..2_000i64 {
                writer_store.upsert(&writer_key, sample_candle(i * 1_000, i as f64));
            }
        });

        for _ in 0..500 {
            let snap = store.snapshot(&key, 50);
            assert!(snap.len() <= 50);
            for pair in snap.windows(2) {
                assert!(pair[0].open_time < pair[1].open_time);
            }
            // Each candle is either fully pre- or fully post-write.
            for c in &snap {
                assert!((c.close - (c.open_time / 1_000) as f64).abs() < f64::EPSILON);
            }
        }

        writer.join().expect("writer thread panicked");
    }
}
