// src/render/slot.rs

use parking_lot::{Condvar, Mutex};

struct SlotState<T> {
    value: Option<T>,
    closed: bool,
    superseded: u64,
}

/// Single-item overwrite handoff between one producer and one consumer.
///
/// The producer never waits: a new value replaces any value the consumer has not
/// taken yet. Backlog is therefore bounded at one.
pub struct LatestSlot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                value: None,
                closed: false,
                superseded: 0,
            }),
            ready: Condvar::new(),
        }
    }

    /// Stores `value`, replacing an untaken one. Returns `false` once closed.
    pub fn publish(&self, value: T) -> bool {
        let mut st = self.state.lock();
        if st.closed {
            return false;
        }
        if st.value.replace(value).is_some() {
            st.superseded += 1;
        }
        drop(st);
        self.ready.notify_one();
        true
    }

    /// Blocks until a value is available. A value published before `close` is
    /// still handed out; `None` means closed and drained.
    pub fn take(&self) -> Option<T> {
        let mut st = self.state.lock();
        loop {
            if let Some(v) = st.value.take() {
                return Some(v);
            }
            if st.closed {
                return None;
            }
            self.ready.wait(&mut st);
        }
    }

    pub fn try_take(&self) -> Option<T> {
        self.state.lock().value.take()
    }

    pub fn close(&self) {
        self.state.lock().closed = true;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Values overwritten before the consumer got to them.
    pub fn superseded(&self) -> u64 {
        self.state.lock().superseded
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
