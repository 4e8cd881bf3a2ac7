/// Callback stored in an [`ObserverList`].
pub type ObserverCallback<T> = Box<dyn Fn(&T) + Send + Sync>;

// The alias leaves `T` unconstrained so it also covers unsized event types
// such as `[Rgb]`.

/// Handle identifying one subscription. Stays valid until unsubscribed, no
/// matter what happens to other subscriptions in the meantime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionToken(usize);

/// Token-based subscription list. Freed slots are reused first-fit, and
/// unsubscribing never moves other entries.
pub struct ObserverList<T: ?Sized> {
    subscriptions: Vec<Option<ObserverCallback<T>>>,
}

impl<T: ?Sized> ObserverList<T> {
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, callback: ObserverCallback<T>) -> SubscriptionToken {
        for (slot, entry) in self.subscriptions.iter_mut().enumerate() {
            if entry.is_none() {
                *entry = Some(callback);
                return SubscriptionToken(slot);
            }
        }

        self.subscriptions.push(Some(callback));
        SubscriptionToken(self.subscriptions.len() - 1)
    }

    /// Invalidates the slot instead of removing it, keeping previously
    /// handed-out tokens valid. Stale tokens are ignored.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) {
        if let Some(entry) = self.subscriptions.get_mut(token.0) {
            *entry = None;
        }
    }

    /// Invokes every live callback in subscription order.
    pub fn notify(&self, event: &T) {
        for callback in self.subscriptions.iter().flatten() {
            callback(event);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.subscriptions.iter().flatten().count()
    }
}

impl<T: ?Sized> Default for ObserverList<T> {
    fn default() -> Self {
        Self::new()
    }
}
