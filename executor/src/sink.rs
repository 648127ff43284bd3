//! Event Sink (spec §4.11): the Executor emits each trace entry through
//! this cooperative interface as it happens, not in a batch at the end.
//! Two fixed consumer modes are provided: `CollectSink` accumulates for
//! the synchronous `/agent/run` response; `ChannelSink` forwards each
//! entry over a `tokio::sync::mpsc` channel for `/agent/stream`'s SSE
//! framing, which lives in `agent-api` (this crate only pushes
//! `TraceEntry` values, it has no notion of HTTP).

use agent_core::TraceEntry;
use async_trait::async_trait;
use tokio::sync::mpsc;

#[async_trait]
pub trait EventSink: Send {
    async fn emit(&mut self, entry: TraceEntry);
}

/// Accumulates every entry; used when the caller wants the whole trace
/// back in one response rather than incrementally.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub entries: Vec<TraceEntry>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventSink for CollectSink {
    async fn emit(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }
}

/// Forwards each entry to a bounded channel as it is produced. The
/// receiving end (in `agent-api`) frames each item as
/// `event: trace\ndata: <json>\n\n`.
pub struct ChannelSink {
    tx: mpsc::Sender<TraceEntry>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<TraceEntry>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&mut self, entry: TraceEntry) {
        // The receiver may have been dropped if the client disconnected
        // mid-stream; that is not this run's problem to surface as an
        // error, the run simply keeps going to completion.
        let _ = self.tx.send(entry).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_sink_accumulates_in_order() {
        let mut sink = CollectSink::new();
        sink.emit(TraceEntry::Plan { steps: vec!["a".into()], notes: None }).await;
        sink.emit(TraceEntry::Final { notes: None }).await;
        assert_eq!(sink.entries.len(), 2);
        assert!(matches!(sink.entries[0], TraceEntry::Plan { .. }));
    }

    #[tokio::test]
    async fn channel_sink_forwards_entries() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut sink = ChannelSink::new(tx);
        sink.emit(TraceEntry::Plan { steps: vec!["a".into()], notes: None }).await;
        let received = rx.recv().await.unwrap();
        assert!(matches!(received, TraceEntry::Plan { .. }));
    }

    #[tokio::test]
    async fn channel_sink_survives_dropped_receiver() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let mut sink = ChannelSink::new(tx);
        // Must not panic even though nothing is listening.
        sink.emit(TraceEntry::Final { notes: None }).await;
    }
}
