use std::collections::HashMap;
use std::sync::Mutex;
use tickler_domain::{ReminderNotification, ID};
use tokio::sync::broadcast;
use tracing::debug;

/// Fans out `ReminderNotification`s to the open sessions of each owner.
///
/// Every owner with at least one session gets its own broadcast channel.
/// Channels without receivers are dropped lazily when the hub is asked for the
/// active owners.
pub struct ReminderHub {
    channels: Mutex<HashMap<ID, broadcast::Sender<ReminderNotification>>>,
    capacity: usize,
}

impl ReminderHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Opens a new session for the owner
    pub fn subscribe(&self, owner_id: &ID) -> broadcast::Receiver<ReminderNotification> {
        let mut channels = self.channels.lock().unwrap();
        match channels.get(owner_id) {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(self.capacity);
                channels.insert(owner_id.clone(), sender);
                receiver
            }
        }
    }

    /// Sends the notification to every open session of the owner and returns
    /// how many sessions received it
    pub fn publish(&self, owner_id: &ID, notification: ReminderNotification) -> usize {
        let channels = self.channels.lock().unwrap();
        let sender = match channels.get(owner_id) {
            Some(sender) => sender,
            None => return 0,
        };
        match sender.send(notification) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No open sessions for owner: {}", owner_id);
                0
            }
        }
    }

    /// Owners that currently have at least one open session
    pub fn active_owners(&self) -> Vec<ID> {
        let mut channels = self.channels.lock().unwrap();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        channels.keys().cloned().collect()
    }

    pub fn session_count(&self, owner_id: &ID) -> usize {
        let channels = self.channels.lock().unwrap();
        channels
            .get(owner_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_every_session_of_the_owner() {
        let hub = ReminderHub::new(8);
        let owner = ID::default();
        let other = ID::default();
        let mut first = hub.subscribe(&owner);
        let mut second = hub.subscribe(&owner);
        let mut others = hub.subscribe(&other);

        let reminder_id = ID::default();
        let receivers = hub.publish(
            &owner,
            ReminderNotification::Deleted {
                reminder_id: reminder_id.clone(),
            },
        );
        assert_eq!(receivers, 2);
        assert_eq!(first.recv().await.unwrap().reminder_id(), &reminder_id);
        assert_eq!(second.recv().await.unwrap().reminder_id(), &reminder_id);
        assert!(others.try_recv().is_err());
    }

    #[test]
    fn forgets_owners_without_sessions() {
        let hub = ReminderHub::new(8);
        let owner = ID::default();
        assert_eq!(
            hub.publish(
                &owner,
                ReminderNotification::Deleted {
                    reminder_id: ID::default()
                }
            ),
            0
        );

        let session = hub.subscribe(&owner);
        assert_eq!(hub.active_owners(), vec![owner.clone()]);
        assert_eq!(hub.session_count(&owner), 1);

        drop(session);
        assert!(hub.active_owners().is_empty());
        assert_eq!(hub.session_count(&owner), 0);
    }
}
