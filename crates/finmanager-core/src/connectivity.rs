//! Online/offline signal.

use std::sync::Arc;

use tokio::sync::watch;

/// Boolean reachability flag with transition notifications.
///
/// Fed by whatever observes the network (the CLI probes the remote URL).
#[derive(Clone)]
pub struct Connectivity {
    sender: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (sender, _) = watch::channel(online);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// Update the flag; subscribers are woken only on an actual change.
    pub fn set_online(&self, online: bool) {
        let changed = self.sender.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!("Connectivity changed: {}", if online { "online" } else { "offline" });
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn transitions_notify_subscribers() {
        let connectivity = Connectivity::new(false);
        let mut receiver = connectivity.subscribe();
        assert!(!connectivity.is_online());

        connectivity.set_online(true);
        receiver.changed().await.unwrap();
        assert!(*receiver.borrow_and_update());
    }

    #[test]
    fn setting_same_value_is_not_a_transition() {
        let connectivity = Connectivity::new(true);
        let receiver = connectivity.subscribe();

        connectivity.set_online(true);
        assert!(!receiver.has_changed().unwrap());
        connectivity.set_online(false);
        assert!(receiver.has_changed().unwrap());
    }
}
