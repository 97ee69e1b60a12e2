//! Per-key event coalescing.
//!
//! Raw notifications are keyed on `(path, op)`. A repeat of the same key
//! replaces the pending event and pushes its deadline out by one window, so a
//! burst of writes to one file comes out as a single event once the file goes
//! quiet. Distinct keys keep independent deadlines.
//!
//! Time is passed in explicitly so the logic can be tested without sleeping.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::{ChangeEvent, WatchOp};

struct Pending {
    event: ChangeEvent,
    deadline: Instant,
    /// Arrival order of the latest notification, breaks deadline ties
    seq: u64,
}

/// Debounce buffer keyed on `(path, op)`.
pub struct KeyedDebouncer {
    window: Duration,
    pending: HashMap<(PathBuf, WatchOp), Pending>,
    next_seq: u64,
}

impl KeyedDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Record a notification observed at `now`.
    pub fn add_at(&mut self, event: ChangeEvent, now: Instant) {
        let key = (event.path.clone(), event.op);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(
            key,
            Pending {
                event,
                deadline: now + self.window,
                seq,
            },
        );
    }

    pub fn add(&mut self, event: ChangeEvent) {
        self.add_at(event, Instant::now());
    }

    /// Remove and return every event whose window has elapsed by `now`,
    /// oldest deadline first.
    pub fn take_expired_at(&mut self, now: Instant) -> Vec<ChangeEvent> {
        let expired: Vec<(PathBuf, WatchOp)> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        let mut ready: Vec<Pending> = expired
            .into_iter()
            .filter_map(|key| self.pending.remove(&key))
            .collect();
        ready.sort_by_key(|p| (p.deadline, p.seq));
        ready.into_iter().map(|p| p.event).collect()
    }

    pub fn take_expired(&mut self) -> Vec<ChangeEvent> {
        self.take_expired_at(Instant::now())
    }

    /// Flush everything regardless of deadlines, oldest deadline first.
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        let mut all: Vec<Pending> = self.pending.drain().map(|(_, p)| p).collect();
        all.sort_by_key(|p| (p.deadline, p.seq));
        all.into_iter().map(|p| p.event).collect()
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// How long the event loop may sleep before something can expire.
    ///
    /// `None` when nothing is pending.
    pub fn sleep_duration_at(&self, now: Instant) -> Option<Duration> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(50);

    fn event(path: &str, op: WatchOp) -> ChangeEvent {
        ChangeEvent {
            path: PathBuf::from(path),
            op,
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_burst_on_one_key_collapses() {
        let start = Instant::now();
        let mut debouncer = KeyedDebouncer::new(WINDOW);

        for i in 0..5 {
            debouncer.add_at(event("/m/a.go", WatchOp::Write), start + ms(i * 10));
        }
        assert_eq!(debouncer.len(), 1);

        // Last notification at +40ms, so nothing is ready before +90ms
        assert!(debouncer.take_expired_at(start + ms(89)).is_empty());
        let ready = debouncer.take_expired_at(start + ms(90));
        assert_eq!(ready, vec![event("/m/a.go", WatchOp::Write)]);
        assert!(debouncer.is_empty());
    }

    #[test]
    fn test_distinct_paths_expire_independently() {
        let start = Instant::now();
        let mut debouncer = KeyedDebouncer::new(WINDOW);

        debouncer.add_at(event("/m/a.go", WatchOp::Write), start);
        debouncer.add_at(event("/m/b.go", WatchOp::Write), start + ms(30));

        assert_eq!(
            debouncer.take_expired_at(start + ms(60)),
            vec![event("/m/a.go", WatchOp::Write)]
        );
        assert_eq!(
            debouncer.take_expired_at(start + ms(80)),
            vec![event("/m/b.go", WatchOp::Write)]
        );
    }

    #[test]
    fn test_same_path_different_ops_are_separate_keys() {
        let start = Instant::now();
        let mut debouncer = KeyedDebouncer::new(WINDOW);

        debouncer.add_at(event("/m/a.go", WatchOp::Remove), start);
        debouncer.add_at(event("/m/a.go", WatchOp::Create), start + ms(1));
        assert_eq!(debouncer.len(), 2);

        let ready = debouncer.take_expired_at(start + ms(100));
        assert_eq!(
            ready,
            vec![
                event("/m/a.go", WatchOp::Remove),
                event("/m/a.go", WatchOp::Create)
            ]
        );
    }

    #[test]
    fn test_drain_flushes_everything_in_order() {
        let start = Instant::now();
        let mut debouncer = KeyedDebouncer::new(WINDOW);

        debouncer.add_at(event("/m/b", WatchOp::Create), start);
        debouncer.add_at(event("/m/a", WatchOp::Create), start);
        debouncer.add_at(event("/m/c", WatchOp::Write), start + ms(5));

        assert_eq!(
            debouncer.drain(),
            vec![
                event("/m/b", WatchOp::Create),
                event("/m/a", WatchOp::Create),
                event("/m/c", WatchOp::Write),
            ]
        );
        assert!(debouncer.is_empty());
        assert_eq!(debouncer.sleep_duration_at(start), None);
    }

    #[test]
    fn test_sleep_duration_tracks_earliest_deadline() {
        let start = Instant::now();
        let mut debouncer = KeyedDebouncer::new(WINDOW);

        debouncer.add_at(event("/m/a", WatchOp::Write), start);
        debouncer.add_at(event("/m/b", WatchOp::Write), start + ms(20));

        assert_eq!(debouncer.sleep_duration_at(start + ms(10)), Some(ms(40)));
        assert_eq!(debouncer.sleep_duration_at(start + ms(70)), Some(Duration::ZERO));
    }
}
