//! Broadcast-based event channel with per-agent history.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use parking_lot::Mutex;
use steward_core::metrics::EVENTS_PUBLISH_DROPS_TOTAL;
use steward_core::{AgentEvent, channel_name};
use tokio::sync::broadcast;
use tracing::debug;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 1024;

/// Per-agent stream bound; oldest events are evicted beyond this.
const MAX_STREAM_LEN: usize = 256;

/// An event paired with the channel name it was published on
/// (`{prefix}:{agent_id}:{kind}`).
#[derive(Clone, Debug)]
pub struct PublishedEvent {
    /// Resolved channel name.
    pub channel: String,
    /// The event itself.
    pub event: AgentEvent,
}

/// Named pub/sub bus plus append-only per-agent streams.
///
/// Non-blocking: `publish` never awaits and never errors. Slow receivers lag
/// and drop rather than blocking the sender.
pub struct EventChannel {
    prefix: String,
    tx: broadcast::Sender<PublishedEvent>,
    streams: Mutex<HashMap<String, VecDeque<AgentEvent>>>,
    publish_count: AtomicU64,
}

impl EventChannel {
    /// Create a channel with the given name prefix and default capacity.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_capacity(prefix, DEFAULT_CAPACITY)
    }

    /// Create a channel with a custom broadcast capacity.
    #[must_use]
    pub fn with_capacity(prefix: impl Into<String>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            prefix: prefix.into(),
            tx,
            streams: Mutex::new(HashMap::new()),
            publish_count: AtomicU64::new(0),
        }
    }

    /// Publish an event. Best-effort: a missing audience is not an error.
    pub fn publish(&self, event: AgentEvent) {
        let _ = self.publish_count.fetch_add(1, Ordering::Relaxed);
        let channel = channel_name(&self.prefix, &event.agent_id, event.kind);

        {
            let mut streams = self.streams.lock();
            let stream = streams.entry(event.agent_id.clone()).or_default();
            if stream.len() >= MAX_STREAM_LEN {
                let _ = stream.pop_front();
            }
            stream.push_back(event.clone());
        }

        let receivers = self
            .tx
            .send(PublishedEvent { channel: channel.clone(), event })
            .unwrap_or(0);
        if receivers == 0 {
            counter!(EVENTS_PUBLISH_DROPS_TOTAL).increment(1);
            debug!(channel, "published event with no subscribers");
        }
    }

    /// Subscribe to all events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.tx.subscribe()
    }

    /// The append-only stream for one agent, delivery order.
    #[must_use]
    pub fn history(&self, agent_id: &str) -> Vec<AgentEvent> {
        self.streams
            .lock()
            .get(agent_id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Total events published.
    #[must_use]
    pub fn publish_count(&self) -> u64 {
        self.publish_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_core::events::{progress_event, response_event, started_event};

    #[test]
    fn publish_with_no_subscribers_is_swallowed() {
        let channel = EventChannel::new("steward");
        channel.publish(started_event("a1"));
        assert_eq!(channel.publish_count(), 1);
        assert_eq!(channel.history("a1").len(), 1);
    }

    #[tokio::test]
    async fn publish_and_receive_with_channel_name() {
        let channel = EventChannel::new("steward");
        let mut rx = channel.subscribe();

        channel.publish(response_event("a1", "done", true));

        let published = rx.recv().await.unwrap();
        assert_eq!(published.channel, "steward:a1:response");
        assert_eq!(published.event.agent_id, "a1");
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let channel = EventChannel::new("steward");
        let mut rx1 = channel.subscribe();
        let mut rx2 = channel.subscribe();
        assert_eq!(channel.subscriber_count(), 2);

        channel.publish(started_event("a1"));

        assert_eq!(rx1.recv().await.unwrap().event.agent_id, "a1");
        assert_eq!(rx2.recv().await.unwrap().event.agent_id, "a1");
    }

    #[test]
    fn history_is_per_agent_and_ordered() {
        let channel = EventChannel::new("steward");
        channel.publish(started_event("a1"));
        channel.publish(progress_event("a1", "halfway"));
        channel.publish(started_event("a2"));

        let a1 = channel.history("a1");
        assert_eq!(a1.len(), 2);
        assert_eq!(a1[0].kind, steward_core::EventKind::Started);
        assert_eq!(a1[1].kind, steward_core::EventKind::Progress);
        assert_eq!(channel.history("a2").len(), 1);
        assert!(channel.history("unknown").is_empty());
    }

    #[test]
    fn stream_is_bounded() {
        let channel = EventChannel::new("steward");
        for i in 0..300 {
            channel.publish(progress_event("a1", &format!("step {i}")));
        }
        let history = channel.history("a1");
        assert_eq!(history.len(), 256);
        // Oldest entries were evicted.
        assert_eq!(history[0].payload["note"], "step 44");
    }

    #[tokio::test]
    async fn lagged_receiver_drops_not_blocks() {
        let channel = EventChannel::with_capacity("steward", 2);
        let mut rx = channel.subscribe();

        channel.publish(started_event("a1"));
        channel.publish(started_event("a2"));
        channel.publish(started_event("a3"));

        // Receiver lagged; sender was never blocked.
        assert!(rx.recv().await.is_err());
    }
}
