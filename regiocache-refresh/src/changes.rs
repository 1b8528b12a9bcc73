use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 16;

/// Broadcast hub for "configuration changed somewhere" signals.
///
/// The signal carries no payload: it does not say which region changed, so
/// every subscribed scheduler reacts with a full sweep of its known keys.
/// Clones share the same channel.
///
/// # Examples
///
/// ```
/// use regiocache_refresh::ChangeNotifier;
///
/// let changes = ChangeNotifier::new();
/// assert_eq!(changes.notify(), 0);
///
/// let _rx = changes.subscribe();
/// assert_eq!(changes.notify(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<()>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Signals every subscriber.
    ///
    /// # Returns
    ///
    /// The number of subscribers reached; `0` when nobody listens.
    pub fn notify(&self) -> usize {
        let reached = self.sender.send(()).unwrap_or(0);
        debug!(subscribers = reached, "change notification sent");
        reached
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_notify_without_subscribers() {
        let changes = ChangeNotifier::new();
        assert_eq!(changes.notify(), 0);
        assert_eq!(changes.subscriber_count(), 0);
    }

    #[test]
    fn test_clones_share_channel() {
        let changes = ChangeNotifier::new();
        let mut rx = changes.clone().subscribe();

        assert_eq!(changes.notify(), 1);
        assert!(rx.try_recv().is_ok());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_slow_subscriber_lags() {
        let changes = ChangeNotifier::new();
        let mut rx = changes.subscribe();

        for _ in 0..CHANNEL_CAPACITY + 4 {
            changes.notify();
        }

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Lagged(4))));
        assert!(rx.try_recv().is_ok());
    }
}
