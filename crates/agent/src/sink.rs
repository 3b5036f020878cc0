//! The producer side of a run's event stream.

use chrono::{DateTime, Utc};
use flightdeck_core::error::RunError;
use flightdeck_core::event::AgentEvent;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Ordered, single-producer event channel for one run.
///
/// `emit` waits for channel capacity rather than dropping events. Once a
/// terminal event has gone out, further emissions are discarded.
pub struct EventSink {
    tx: mpsc::Sender<AgentEvent>,
    last_timestamp: Option<DateTime<Utc>>,
    terminated: bool,
    emitted: usize,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<AgentEvent>) -> Self {
        Self {
            tx,
            last_timestamp: None,
            terminated: false,
            emitted: 0,
        }
    }

    /// A sink and the receiver that consumes it.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AgentEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Deliver one event, in order.
    ///
    /// Fails with [`RunError::Detached`] when the receiver is gone.
    pub async fn emit(&mut self, mut event: AgentEvent) -> Result<(), RunError> {
        if self.terminated {
            warn!(kind = %event.kind, title = %event.title, "Discarding event after terminal event");
            return Ok(());
        }

        // Wall clocks can step backwards; a run's timestamps never do.
        if let Some(last) = self.last_timestamp
            && event.timestamp < last
        {
            event.timestamp = last;
        }
        self.last_timestamp = Some(event.timestamp);

        let terminal = event.is_terminal();
        debug!(kind = %event.kind, title = %event.title, "Emitting event");

        self.tx.send(event).await.map_err(|_| RunError::Detached)?;
        self.emitted += 1;
        self.terminated = terminal;
        Ok(())
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Whether the consumer has gone away.
    pub fn is_detached(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightdeck_core::event::EventKind;

    #[tokio::test]
    async fn events_arrive_in_order() {
        let (mut sink, mut rx) = EventSink::channel(8);
        sink.emit(AgentEvent::annotation("one", "")).await.unwrap();
        sink.emit(AgentEvent::annotation("two", "")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().title, "one");
        assert_eq!(rx.recv().await.unwrap().title, "two");
        assert_eq!(sink.emitted(), 2);
    }

    #[tokio::test]
    async fn timestamps_never_go_backwards() {
        let (mut sink, mut rx) = EventSink::channel(8);
        let first = AgentEvent::annotation("later", "");
        let mut second = AgentEvent::annotation("earlier", "");
        second.timestamp = first.timestamp - chrono::Duration::seconds(5);

        sink.emit(first).await.unwrap();
        sink.emit(second).await.unwrap();

        let a = rx.recv().await.unwrap();
        let b = rx.recv().await.unwrap();
        assert!(b.timestamp >= a.timestamp);
    }

    #[tokio::test]
    async fn nothing_after_terminal_event() {
        let (mut sink, mut rx) = EventSink::channel(8);
        sink.emit(AgentEvent::done("answer")).await.unwrap();
        assert!(sink.is_terminated());
        sink.emit(AgentEvent::message("late")).await.unwrap();
        drop(sink);

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::Done);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropped_receiver_is_detached() {
        let (mut sink, rx) = EventSink::channel(8);
        drop(rx);
        assert!(sink.is_detached());
        let err = sink.emit(AgentEvent::annotation("x", "")).await.unwrap_err();
        assert!(matches!(err, RunError::Detached));
    }

    #[tokio::test]
    async fn recoverable_error_does_not_terminate() {
        let (mut sink, _rx) = EventSink::channel(8);
        sink.emit(AgentEvent::tool_error("foo", "boom")).await.unwrap();
        assert!(!sink.is_terminated());
    }
}
