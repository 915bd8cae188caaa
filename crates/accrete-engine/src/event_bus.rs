//! The Event Bus.
//!
//! Channel-indexed outbound ring buffers with soft/hard backpressure
//! watermarks, read by the transport bridge between ticks.

use std::collections::{HashMap, VecDeque};

use accrete_core::id::{ChannelIndex, StepId};

/// One outbound event, opaque to the bus outside its `channel`/`type`
/// routing fields.
#[derive(Clone, Debug, PartialEq)]
pub struct EventRecord {
    /// Target channel.
    pub channel: ChannelIndex,
    /// Event type tag, handler-defined.
    pub event_type: String,
    /// The tick this event was published during.
    pub tick: StepId,
    /// Simulation-clock timestamp at publish.
    pub issued_at: f64,
    /// Assigns a total order among events published within one tick.
    pub dispatch_order: u64,
    /// Opaque event body.
    pub payload: Vec<u8>,
}

/// Backpressure counters for one channel over the last tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelBackPressure {
    /// Total publishes accepted into the ring.
    pub published: u64,
    /// Publishes that crossed the soft watermark but were still accepted.
    pub soft_limited: u64,
    /// Publishes dropped after crossing the hard watermark.
    pub overflowed: u64,
}

struct Channel {
    ring: VecDeque<EventRecord>,
    capacity: usize,
    soft_watermark: usize,
    hard_watermark: usize,
    stats: ChannelBackPressure,
}

/// Registry of named outbound channels, keyed by dense [`ChannelIndex`].
#[derive(Default)]
pub struct EventBus {
    index_of: HashMap<String, ChannelIndex>,
    channels: Vec<Channel>,
    next_dispatch_order: u64,
}

impl EventBus {
    /// Builds an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a channel, returning its dense index. Registering the
    /// same name twice returns the existing index.
    pub fn register_channel(
        &mut self,
        name: impl Into<String>,
        capacity: usize,
        soft_watermark: usize,
        hard_watermark: usize,
    ) -> ChannelIndex {
        let name = name.into();
        if let Some(index) = self.index_of.get(&name) {
            return *index;
        }
        let index = ChannelIndex(self.channels.len() as u32);
        self.channels.push(Channel {
            ring: VecDeque::with_capacity(capacity),
            capacity,
            soft_watermark,
            hard_watermark,
            stats: ChannelBackPressure::default(),
        });
        self.index_of.insert(name, index);
        index
    }

    /// Looks up a channel's dense index by name.
    pub fn channel_index(&self, name: &str) -> Option<ChannelIndex> {
        self.index_of.get(name).copied()
    }

    /// Publishes one event to `channel`. Drops it past the hard
    /// watermark; accepts (and counts) it past the soft watermark.
    pub fn publish(&mut self, channel: ChannelIndex, tick: StepId, issued_at: f64, event_type: String, payload: Vec<u8>) {
        let Some(chan) = self.channels.get_mut(channel.0 as usize) else {
            return;
        };
        chan.stats.published += 1;
        let occupancy = chan.ring.len();

        if occupancy >= chan.hard_watermark {
            chan.stats.overflowed += 1;
            return;
        }
        if occupancy >= chan.soft_watermark {
            chan.stats.soft_limited += 1;
        }

        let dispatch_order = self.next_dispatch_order;
        self.next_dispatch_order += 1;

        if chan.ring.len() >= chan.capacity {
            chan.ring.pop_front();
        }
        chan.ring.push_back(EventRecord {
            channel,
            event_type,
            tick,
            issued_at,
            dispatch_order,
            payload,
        });
    }

    /// Drains and returns the outbound buffer for one channel.
    pub fn drain_outbound_buffer(&mut self, channel: ChannelIndex) -> Vec<EventRecord> {
        match self.channels.get_mut(channel.0 as usize) {
            Some(chan) => chan.ring.drain(..).collect(),
            None => Vec::new(),
        }
    }

    /// Drains every channel's outbound buffer and returns the combined
    /// records sorted by `(tick, dispatch_order)`.
    pub fn drain_all_sorted(&mut self) -> Vec<EventRecord> {
        let mut all = Vec::new();
        for chan in &mut self.channels {
            all.extend(chan.ring.drain(..));
        }
        all.sort_by_key(|e| (e.tick, e.dispatch_order));
        all
    }

    /// Snapshot of backpressure counters for every registered channel,
    /// keyed by channel name, as observed at call time.
    pub fn backpressure_snapshot(&self) -> HashMap<String, ChannelBackPressure> {
        self.index_of
            .iter()
            .map(|(name, index)| (name.clone(), self.channels[index.0 as usize].stats))
            .collect()
    }

    /// Resets every channel's backpressure counters to zero, without
    /// touching buffered events. Called once per tick by the scheduler.
    pub fn reset_backpressure_counters(&mut self) {
        for chan in &mut self.channels {
            chan.stats = ChannelBackPressure::default();
        }
    }
}
