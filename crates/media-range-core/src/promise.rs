//! The promise registry: an ordered list of pending `(packet-index, signal)`
//! entries created by reader calls awaiting a fill.
//!
//! Every operation here is expected to run under the session mutex; this
//! type has no internal locking of its own.

use std::sync::mpsc;

/// The reader-held end of a one-shot fill notification. A plain
/// `sync_channel(1)` pair is the simplest idiomatic stand-in for
/// `std::promise<void>`/`std::future<void>` here: it works equally well for
/// a blocking `recv()` from a reader thread and is dropped cleanly (with the
/// receiver observing a disconnect) if the registry itself is torn down.
pub type Signal = mpsc::Receiver<SignalResult>;
type SignalSender = mpsc::SyncSender<SignalResult>;

/// What a promise resolves to: the slot was filled, or the session tore
/// down / the transfer failed permanently before it could be.
#[derive(Debug, Clone)]
pub enum SignalResult {
    Filled,
    TornDown,
    TransferFailed(String),
}

struct Promise {
    index: usize,
    sender: SignalSender,
}

/// FIFO list of pending promises. Multiple promises may exist for the same
/// index (many readers waiting on the same fill).
#[derive(Default)]
pub struct PromiseRegistry {
    entries: Vec<Promise>,
}

impl PromiseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append `(index, new_signal)` and return the reader-held receiving end.
    pub fn register(&mut self, index: usize) -> Signal {
        let (tx, rx) = mpsc::sync_channel(1);
        self.entries.push(Promise { index, sender: tx });
        rx
    }

    /// Index of the oldest unsignaled promise, if any.
    pub fn front_index(&self) -> Option<usize> {
        self.entries.first().map(|p| p.index)
    }

    /// Signal every entry with this index, in registry order, and remove them.
    pub fn resolve_all(&mut self, index: usize) {
        self.entries.retain(|p| {
            if p.index == index {
                // A full receiver buffer (capacity 1) or a dropped receiver
                // both just mean nobody is listening anymore; neither is a
                // bug here.
                let _ = p.sender.try_send(SignalResult::Filled);
                false
            } else {
                true
            }
        });
    }

    /// Signal and drop every remaining entry with `TornDown`. Called once
    /// at session teardown.
    pub fn drain_torn_down(&mut self) {
        for p in self.entries.drain(..) {
            let _ = p.sender.try_send(SignalResult::TornDown);
        }
    }

    /// Signal and drop every entry whose index falls in `[left, right)` with
    /// a terminal transfer failure. Used when the retry budget for a range
    /// is exhausted (see `MediaSessionConfig::max_retries`).
    pub fn fail_range(&mut self, left: usize, right: usize, reason: &str) {
        self.entries.retain(|p| {
            if p.index >= left && p.index < right {
                let _ = p
                    .sender
                    .try_send(SignalResult::TransferFailed(reason.to_string()));
                false
            } else {
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_resolve_delivers_filled() {
        let mut reg = PromiseRegistry::new();
        let rx = reg.register(3);
        reg.resolve_all(3);
        assert!(matches!(rx.recv().unwrap(), SignalResult::Filled));
    }

    #[test]
    fn resolve_all_only_touches_matching_index() {
        let mut reg = PromiseRegistry::new();
        let rx_a = reg.register(1);
        let rx_b = reg.register(2);
        reg.resolve_all(1);
        assert!(matches!(rx_a.recv().unwrap(), SignalResult::Filled));
        assert!(rx_b.try_recv().is_err());
        assert_eq!(reg.front_index(), Some(2));
    }

    #[test]
    fn multiple_waiters_on_same_index_all_resolve() {
        let mut reg = PromiseRegistry::new();
        let rx1 = reg.register(5);
        let rx2 = reg.register(5);
        reg.resolve_all(5);
        assert!(matches!(rx1.recv().unwrap(), SignalResult::Filled));
        assert!(matches!(rx2.recv().unwrap(), SignalResult::Filled));
    }

    #[test]
    fn front_index_is_oldest_entry() {
        let mut reg = PromiseRegistry::new();
        reg.register(7);
        reg.register(2);
        assert_eq!(reg.front_index(), Some(7));
    }

    #[test]
    fn drain_torn_down_signals_everyone_remaining() {
        let mut reg = PromiseRegistry::new();
        let rx = reg.register(0);
        reg.drain_torn_down();
        assert!(matches!(rx.recv().unwrap(), SignalResult::TornDown));
        assert!(reg.is_empty());
    }

    #[test]
    fn fail_range_only_matches_in_range_entries() {
        let mut reg = PromiseRegistry::new();
        let rx_in = reg.register(5);
        let rx_out = reg.register(50);
        reg.fail_range(0, 10, "boom");
        assert!(matches!(
            rx_in.recv().unwrap(),
            SignalResult::TransferFailed(_)
        ));
        assert!(rx_out.try_recv().is_err());
    }
}
