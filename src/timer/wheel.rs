//! Slot arena and the delta-ordered active list.
//!
//! Nothing here knows about guards or dispatch; the controllers serialize
//! access and decide when callbacks run.

use super::{INACTIVE, MAX_TIMER_CAPACITY, Mode, NO_TIMER, Start, TimerId};
use crate::delegate::Delegate;

#[derive(Clone, Copy)]
struct TimerSlot<'a> {
    callback: Delegate<'a>,
    period: u32,
    delta: u32,
    id: u8,
    previous: u8,
    next: u8,
    repeating: bool,
    priority: u32,
}

impl TimerSlot<'_> {
    const EMPTY: Self = Self {
        callback: Delegate::empty(),
        period: INACTIVE,
        delta: INACTIVE,
        id: NO_TIMER,
        previous: NO_TIMER,
        next: NO_TIMER,
        repeating: true,
        priority: 0,
    };

    #[inline]
    fn is_registered(&self) -> bool {
        self.id != NO_TIMER
    }

    #[inline]
    fn is_active(&self) -> bool {
        self.delta != INACTIVE
    }
}

/// A timer taken off the head of the active list.
#[derive(Clone, Copy)]
pub(crate) struct Expired<'a> {
    pub(crate) id: TimerId,
    pub(crate) callback: Delegate<'a>,
    pub(crate) priority: u32,
}

/// Fixed pool of timer slots plus the active list threaded through them.
pub(crate) struct TimerWheel<'a, const MAX_TIMERS: usize> {
    slots: [TimerSlot<'a>; MAX_TIMERS],
    head: u8,
    tail: u8,
    registered: usize,
}

impl<'a, const MAX_TIMERS: usize> TimerWheel<'a, MAX_TIMERS> {
    const CAPACITY_CHECK: () = assert!(
        MAX_TIMERS <= MAX_TIMER_CAPACITY,
        "MAX_TIMERS must not exceed 254"
    );

    pub(crate) const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_CHECK;
        Self {
            slots: [TimerSlot::EMPTY; MAX_TIMERS],
            head: NO_TIMER,
            tail: NO_TIMER,
            registered: 0,
        }
    }

    #[inline]
    fn slot(&self, id: TimerId) -> Option<&TimerSlot<'a>> {
        self.slots.get(id.index()).filter(|slot| slot.is_registered())
    }

    pub(crate) fn registered(&self) -> usize {
        self.registered
    }

    /// Places a timer in the first free slot. The timer is not started.
    pub(crate) fn register(
        &mut self,
        callback: Delegate<'a>,
        period: u32,
        mode: Mode,
        priority: u32,
    ) -> Option<TimerId> {
        if self.registered >= MAX_TIMERS {
            return None;
        }

        let index = self.slots.iter().position(|slot| !slot.is_registered())?;
        // capacity is at most 254, so every index fits below NO_TIMER
        let id = index as u8;
        self.slots[index] = TimerSlot {
            callback,
            period,
            id,
            repeating: mode.is_repeating(),
            priority,
            ..TimerSlot::EMPTY
        };
        self.registered += 1;
        Some(TimerId(id))
    }

    pub(crate) fn unregister(&mut self, id: TimerId) -> bool {
        let Some(slot) = self.slot(id) else {
            return false;
        };
        if slot.is_active() {
            self.remove(id.get(), false);
        }
        self.slots[id.index()] = TimerSlot::EMPTY;
        self.registered -= 1;
        true
    }

    /// Unregisters every timer.
    pub(crate) fn clear(&mut self) {
        self.slots.fill(TimerSlot::EMPTY);
        self.head = NO_TIMER;
        self.tail = NO_TIMER;
        self.registered = 0;
    }

    /// Inserts a timer into the active list, restarting it if it already
    /// runs.
    ///
    /// Refuses timers without a usable period: the inactive sentinel, or zero
    /// for a repeating timer, which would expire endlessly within one tick.
    pub(crate) fn start(&mut self, id: TimerId, start: Start) -> bool {
        let Some(slot) = self.slot(id) else {
            return false;
        };
        if slot.period == INACTIVE || (slot.repeating && slot.period == 0) {
            return false;
        }
        if slot.is_active() {
            self.remove(id.get(), false);
        }

        let slot = &mut self.slots[id.index()];
        slot.delta = match start {
            Start::Immediate => 0,
            Start::Delayed => slot.period,
        };
        self.insert(id.get());
        true
    }

    /// Takes a timer out of the active list. Succeeds for any registered
    /// timer, running or not.
    pub(crate) fn stop(&mut self, id: TimerId) -> bool {
        let Some(slot) = self.slot(id) else {
            return false;
        };
        if slot.is_active() {
            self.remove(id.get(), false);
        }
        true
    }

    pub(crate) fn set_period(&mut self, id: TimerId, period: u32) -> bool {
        if !self.stop(id) {
            return false;
        }
        self.slots[id.index()].period = period;
        true
    }

    pub(crate) fn set_mode(&mut self, id: TimerId, mode: Mode) -> bool {
        if !self.stop(id) {
            return false;
        }
        self.slots[id.index()].repeating = mode.is_repeating();
        true
    }

    pub(crate) fn is_active(&self, id: TimerId) -> bool {
        self.slot(id).is_some_and(TimerSlot::is_active)
    }

    pub(crate) fn has_active(&self) -> bool {
        self.head != NO_TIMER
    }

    /// Ticks until the head of the active list expires.
    pub(crate) fn time_to_next(&self) -> Option<u32> {
        self.slots
            .get(usize::from(self.head))
            .map(|head| head.delta)
    }

    /// Pops the head if it expires within `count` ticks, charging its delta
    /// against `count`.
    ///
    /// A repeating timer goes straight back into the list with its full
    /// period before the caller sees it, so its callback finds it running and
    /// may stop, restart or unregister it like any other timer.
    pub(crate) fn pop_expired(&mut self, count: &mut u32) -> Option<Expired<'a>> {
        let head = self.slots.get(usize::from(self.head))?;
        if head.delta > *count {
            return None;
        }

        *count -= head.delta;
        let expired = Expired {
            id: TimerId(head.id),
            callback: head.callback,
            priority: head.priority,
        };
        self.remove(expired.id.get(), true);
        self.rearm(expired.id.get());
        Some(expired)
    }

    fn rearm(&mut self, id: u8) {
        let slot = &mut self.slots[usize::from(id)];
        // a zero period would expire forever within one tick
        if !slot.repeating || slot.period == 0 || slot.period == INACTIVE {
            return;
        }
        slot.delta = slot.period;
        self.insert(id);
    }

    /// Charges ticks that did not expire anything against the head.
    pub(crate) fn consume(&mut self, count: u32) {
        if let Some(head) = self.slots.get_mut(usize::from(self.head)) {
            head.delta -= count;
        }
    }

    /// Sorted insert using the slot's `delta` as the time from now.
    ///
    /// A new timer goes ahead of the first entry whose delta is not smaller,
    /// so on equal deadlines the newest insert fires first.
    fn insert(&mut self, id: u8) {
        let index = usize::from(id);

        if self.head == NO_TIMER {
            let slot = &mut self.slots[index];
            slot.previous = NO_TIMER;
            slot.next = NO_TIMER;
            self.head = id;
            self.tail = id;
            return;
        }

        let mut test_id = self.head;
        while test_id != NO_TIMER {
            let test = usize::from(test_id);
            let delta = self.slots[index].delta;

            if delta <= self.slots[test].delta {
                let previous = self.slots[test].previous;
                self.slots[index].previous = previous;
                self.slots[index].next = test_id;
                self.slots[test].previous = id;
                self.slots[test].delta -= delta;

                if previous == NO_TIMER {
                    self.head = id;
                } else {
                    self.slots[usize::from(previous)].next = id;
                }
                return;
            }

            self.slots[index].delta -= self.slots[test].delta;
            test_id = self.slots[test].next;
        }

        // ran off the end, append
        let tail = self.tail;
        self.slots[usize::from(tail)].next = id;
        let slot = &mut self.slots[index];
        slot.previous = tail;
        slot.next = NO_TIMER;
        self.tail = id;
    }

    /// Unlinks a timer from the active list.
    ///
    /// A cancelled timer hands its delta to its successor. An expired one
    /// does not, since the successor's delta already counts from the expiry.
    fn remove(&mut self, id: u8, expired: bool) {
        let index = usize::from(id);
        let TimerSlot {
            previous,
            next,
            delta,
            ..
        } = self.slots[index];

        if self.head == id {
            self.head = next;
        } else {
            self.slots[usize::from(previous)].next = next;
        }

        if self.tail == id {
            self.tail = previous;
        } else {
            self.slots[usize::from(next)].previous = previous;
        }

        if !expired && next != NO_TIMER {
            self.slots[usize::from(next)].delta += delta;
        }

        let slot = &mut self.slots[index];
        slot.previous = NO_TIMER;
        slot.next = NO_TIMER;
        slot.delta = INACTIVE;
    }
}

#[cfg(test)]
impl<const MAX_TIMERS: usize> TimerWheel<'_, MAX_TIMERS> {
    /// Walks the active list, returning `(id, delta)` pairs in order.
    pub(crate) fn active_deltas(&self) -> heapless::Vec<(u8, u32), MAX_TIMERS> {
        let mut deltas = heapless::Vec::new();
        let mut id = self.head;
        while id != NO_TIMER {
            let slot = &self.slots[usize::from(id)];
            let _ = deltas.push((id, slot.delta));
            id = slot.next;
        }
        deltas
    }
}
