//! Point-update notification sinks
//!
//! Every successful commit is handed to an `UpdateSink`. The transport layer
//! owns the sink and turns updates into outbound traffic (unsolicited
//! responses, event buffers); the core only reports what changed.

use tokio::sync::mpsc;
use tracing::warn;
use voltage_rtdb::Point;

/// Receiver of committed point updates, invoked synchronously after each commit
pub trait UpdateSink {
    fn on_update(&mut self, point: &Point);
}

/// Collects updates in commit order
impl UpdateSink for Vec<Point> {
    fn on_update(&mut self, point: &Point) {
        self.push(*point);
    }
}

/// Forwards updates to an async consumer
///
/// A closed receiver is logged and the update dropped; the commit itself has
/// already happened and stays in the database.
impl UpdateSink for mpsc::UnboundedSender<Point> {
    fn on_update(&mut self, point: &Point) {
        if self.send(*point).is_err() {
            warn!(index = point.index, "Point update dropped: receiver closed");
        }
    }
}

/// Discards updates
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl UpdateSink for NullSink {
    fn on_update(&mut self, _point: &Point) {}
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use voltage_rtdb::Timestamp;

    #[test]
    fn test_vec_sink_keeps_order() {
        let mut sink: Vec<Point> = Vec::new();
        sink.on_update(&Point::online(4, 1.0, Timestamp::ZERO));
        sink.on_update(&Point::online(6, 1.0, Timestamp::ZERO));
        let indices: Vec<u16> = sink.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![4, 6]);
    }

    #[tokio::test]
    async fn test_channel_sink_forwards() {
        let (mut tx, mut rx) = mpsc::unbounded_channel::<Point>();
        tx.on_update(&Point::online(1, 42.0, Timestamp::ZERO));
        let point = rx.recv().await.unwrap();
        assert_eq!(point.index, 1);
        assert_eq!(point.value, 42.0);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_channel_sink_closed_receiver() {
        let (mut tx, rx) = mpsc::unbounded_channel::<Point>();
        drop(rx);
        tx.on_update(&Point::online(2, 3.0, Timestamp::ZERO));
        assert!(logs_contain("Point update dropped"));
    }
}
