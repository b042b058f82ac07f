//! Fan-out of a frame to the members of one room.

use super::session::{SessionHandle, SessionId};

/// Per-broadcast delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Queue `text` for every open member except `exclude`.
///
/// Never waits on a peer: a full or closed queue is logged and skipped, and the remaining
/// members still receive the frame.
pub fn broadcast(
    members: &[SessionHandle],
    text: &str,
    exclude: Option<SessionId>,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    for member in members {
        if Some(member.id()) == exclude || !member.is_open() {
            continue;
        }

        match member.deliver(text) {
            Ok(()) => report.delivered += 1,
            Err(err) => {
                report.dropped += 1;
                tracing::warn!(
                    room = member.room(),
                    client_id = member.client_id(),
                    session_id = %member.id(),
                    error = %err,
                    "Broadcast delivery failed"
                );
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn member(client_id: &str, capacity: usize) -> (SessionHandle, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (SessionHandle::new(client_id, tx), rx)
    }

    #[test]
    fn test_exclude_sender() {
        let (a, mut rx_a) = member("p1", 4);
        let (b, mut rx_b) = member("p2", 4);
        let (c, mut rx_c) = member("p3", 4);
        let members = vec![a.clone(), b, c];

        let report = broadcast(&members, "hello", Some(a.id()));
        assert_eq!(report, BroadcastReport { delivered: 2, dropped: 0 });
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().ok().as_deref(), Some("hello"));
        assert_eq!(rx_c.try_recv().ok().as_deref(), Some("hello"));

        let report = broadcast(&members, "all", None);
        assert_eq!(report.delivered, 3);
        assert_eq!(rx_a.try_recv().ok().as_deref(), Some("all"));
    }

    #[test]
    fn test_slow_peer_does_not_block_others() {
        let (slow, _rx_slow) = member("slow", 1);
        let (fast, mut rx_fast) = member("fast", 8);
        let members = vec![slow, fast];

        let first = broadcast(&members, "1", None);
        let second = broadcast(&members, "2", None);

        assert_eq!(first, BroadcastReport { delivered: 2, dropped: 0 });
        assert_eq!(second, BroadcastReport { delivered: 1, dropped: 1 });
        assert_eq!(rx_fast.try_recv().ok().as_deref(), Some("1"));
        assert_eq!(rx_fast.try_recv().ok().as_deref(), Some("2"));
    }

    #[test]
    fn test_closed_sockets_are_skipped() {
        let (gone, rx_gone) = member("gone", 4);
        let (live, mut rx_live) = member("live", 4);
        drop(rx_gone);

        let report = broadcast(&[gone, live], "ping", None);
        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 0 });
        assert_eq!(rx_live.try_recv().ok().as_deref(), Some("ping"));
    }
}
