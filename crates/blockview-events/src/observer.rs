//! Publisher-owned observer lists.
//!
//! A publisher keeps an [`ObserverList`] and hands out a [`Subscription`] per
//! observer. Cancelling (or dropping) the subscription detaches the observer;
//! the list never holds hidden references back into subscribers.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

type Callback<E> = Box<dyn FnMut(&E)>;

struct Entry<E> {
    active: Rc<Cell<bool>>,
    callback: Callback<E>,
}

/// Single-threaded list of callbacks notified in subscription order.
///
/// Cloning yields another handle to the same list, so a publisher can give a
/// notifier to a collaborator without giving up ownership.
pub struct ObserverList<E> {
    entries: Rc<RefCell<Vec<Entry<E>>>>,
    /// Events raised by an observer while a round is in progress.
    pending: Rc<RefCell<VecDeque<E>>>,
    notifying: Rc<Cell<bool>>,
}

impl<E> Clone for ObserverList<E> {
    fn clone(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
            pending: Rc::clone(&self.pending),
            notifying: Rc::clone(&self.notifying),
        }
    }
}

impl<E> Default for ObserverList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for ObserverList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("observers", &self.len())
            .finish()
    }
}

impl<E> ObserverList<E> {
    pub fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(Vec::new())),
            pending: Rc::new(RefCell::new(VecDeque::new())),
            notifying: Rc::new(Cell::new(false)),
        }
    }

    #[must_use = "dropping the subscription detaches the observer immediately"]
    pub fn subscribe(&self, callback: impl FnMut(&E) + 'static) -> Subscription {
        let active = Rc::new(Cell::new(true));
        self.entries.borrow_mut().push(Entry {
            active: Rc::clone(&active),
            callback: Box::new(callback),
        });
        Subscription { active }
    }

    /// Number of live observers.
    pub fn len(&self) -> usize {
        self.entries
            .try_borrow()
            .map(|entries| entries.iter().filter(|e| e.active.get()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every live observer once with `event`.
    ///
    /// Observers may subscribe or cancel while being notified; new observers
    /// first see the next event. An observer that notifies the same list
    /// queues its event, which is delivered once the current round ends.
    pub fn notify(&self, event: &E)
    where
        E: Clone,
    {
        if self.notifying.get() {
            tracing::trace!("Nested notify queued");
            self.pending.borrow_mut().push_back(event.clone());
            return;
        }

        self.notifying.set(true);
        self.deliver(event);
        loop {
            let next = self.pending.borrow_mut().pop_front();
            match next {
                Some(queued) => self.deliver(&queued),
                None => break,
            }
        }
        self.notifying.set(false);
    }

    fn deliver(&self, event: &E) {
        let mut current = std::mem::take(&mut *self.entries.borrow_mut());

        for entry in current.iter_mut() {
            if entry.active.get() {
                (entry.callback)(event);
            }
        }

        let mut entries = self.entries.borrow_mut();
        let added = std::mem::take(&mut *entries);
        current.extend(added);
        current.retain(|entry| entry.active.get());
        *entries = current;
    }
}

/// Cancellation handle returned by [`ObserverList::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    active: Rc<Cell<bool>>,
}

impl Subscription {
    pub fn cancel(self) {
        // Drop does the work.
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Keep the observer attached for the lifetime of the list.
    pub fn detach(self) {
        std::mem::forget(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.set(false);
    }
}
