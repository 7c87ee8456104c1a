use blockview_core::Address;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

pub mod observer;

pub use observer::{ObserverList, Subscription};

/// Push notifications fired by the analysis engine when its state changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    // ========================================================================
    // Structural changes (full reload)
    // ========================================================================
    /// The control-flow graph of `function` was recomputed.
    GraphUpdated { function: Address },

    // ========================================================================
    // Content changes (cheap redraw or in-place update)
    // ========================================================================
    /// Knowledge base or blanket view changed in a way that only affects text.
    KnowledgeBaseUpdated,
    LabelRenamed { addr: Address },
    CommentChanged { addr: Address, text: Option<String> },

    // ========================================================================
    // Selection sync
    // ========================================================================
    SelectedAddressChanged { addr: Option<Address> },
    SelectedOperandChanged { operand: Option<(Address, usize)> },
}

impl Notification {
    /// Whether handling this notification rebuilds the scene from scratch.
    pub fn requires_reload(&self) -> bool {
        matches!(self, Notification::GraphUpdated { .. })
    }
}

#[derive(Clone)]
pub struct NotificationBus {
    tx: Sender<Notification>,
    rx: Receiver<Notification>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Notification> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Notification> {
        self.rx.clone()
    }

    pub fn publish(&self, notification: Notification) {
        tracing::trace!(?notification, "publishing notification");
        let _ = self.tx.send(notification);
    }

    /// Dispatch all pending notifications to a listener, in publish order.
    /// Called once per UI loop turn.
    pub fn dispatch_to<L: NotificationListener>(&self, listener: &mut L) -> usize {
        let mut handled = 0;
        while let Ok(notification) = self.rx.try_recv() {
            listener.handle_notification(&notification);
            handled += 1;
        }
        handled
    }
}

/// Components that react to engine notifications.
pub trait NotificationListener {
    fn handle_notification(&mut self, notification: &Notification);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<Notification>,
    }

    impl NotificationListener for Recorder {
        fn handle_notification(&mut self, notification: &Notification) {
            self.seen.push(notification.clone());
        }
    }

    #[test]
    fn test_bus_publish_receive() {
        let bus = NotificationBus::new();
        let sender = bus.sender();
        let receiver = bus.receiver();

        sender
            .send(Notification::LabelRenamed { addr: Address(0x401000) })
            .unwrap();

        match receiver.recv().unwrap() {
            Notification::LabelRenamed { addr } => assert_eq!(addr, Address(0x401000)),
            other => panic!("Expected LabelRenamed, got {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_preserves_order_and_drains() {
        let bus = NotificationBus::new();
        bus.publish(Notification::GraphUpdated { function: Address(1) });
        bus.publish(Notification::KnowledgeBaseUpdated);
        bus.publish(Notification::SelectedAddressChanged { addr: None });

        let mut recorder = Recorder::default();
        assert_eq!(bus.dispatch_to(&mut recorder), 3);
        assert_eq!(recorder.seen.len(), 3);
        assert!(recorder.seen[0].requires_reload());
        assert!(!recorder.seen[1].requires_reload());

        assert_eq!(bus.dispatch_to(&mut recorder), 0);
    }
}
