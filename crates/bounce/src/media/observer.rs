use crossbeam_channel::Sender;

use super::player::{EndOfMedia, ItemId, Player, SubscriptionHandle};
use super::types::{ActionAtEnd, PlaybackMode};

/// Change made by a single [`EndOfMediaObserver::reconcile`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Unchanged,
    Subscribed(ItemId, SubscriptionHandle),
    Unsubscribed(SubscriptionHandle),
}

/// Keeps one end-of-media subscription alive exactly while a mode is active.
#[derive(Debug, Default)]
pub struct EndOfMediaObserver {
    subscription: Option<SubscriptionHandle>,
}

impl EndOfMediaObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Option<SubscriptionHandle> {
        self.subscription
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    /// Bring the subscription and the player's action-at-end policy in line with `mode`.
    ///
    /// Calling again with the same state is a no-op. With no item loaded the
    /// policy is still applied but subscribing waits for the next source change.
    pub fn reconcile<P: Player>(
        &mut self,
        player: &mut P,
        mode: PlaybackMode,
        notify: &Sender<EndOfMedia>,
    ) -> Reconciled {
        if !mode.is_active() {
            let released = self.release(player);
            apply_policy(player, ActionAtEnd::PauseAndStop);
            return released.map_or(Reconciled::Unchanged, Reconciled::Unsubscribed);
        }

        apply_policy(player, ActionAtEnd::SuspendDefaultAction);

        if self.subscription.is_some() {
            return Reconciled::Unchanged;
        }

        let Some(item) = player.current_item() else {
            log::debug!("No current item, deferring end-of-media subscription");
            return Reconciled::Unchanged;
        };
        let handle = player.subscribe_end_of_media(item, notify.clone());
        self.subscription = Some(handle);
        Reconciled::Subscribed(item, handle)
    }

    /// Drop the subscription, if any, regardless of mode.
    pub fn release<P: Player>(&mut self, player: &mut P) -> Option<SubscriptionHandle> {
        let handle = self.subscription.take()?;
        player.unsubscribe(handle);
        Some(handle)
    }
}

fn apply_policy<P: Player>(player: &mut P, policy: ActionAtEnd) {
    if player.action_at_end() != policy {
        player.set_action_at_end(policy);
    }
}
