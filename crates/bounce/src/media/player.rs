//! The host player as seen by the direction controller.
//!
//! Implementors own decode and render. The controller only queries position
//! and range state and issues seek, rate and pause commands.

use crossbeam_channel::Sender;

use super::types::{ActionAtEnd, SeekTolerance};

/// Identifies a media item loaded into a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(pub u64);

/// Token for one end-of-media subscription.
///
/// Players mint these in `subscribe_end_of_media` and must stop sending for a
/// handle once `unsubscribe` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Sent once each time the subscribed item plays to the end of its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfMedia {
    pub handle: SubscriptionHandle,
    pub item: ItemId,
}

pub trait Player {
    /// Whatever the player loads; opaque to the controller.
    type Item;

    fn current_item(&self) -> Option<ItemId>;
    fn current_position_secs(&self) -> f64;
    /// `None` while loading, or for live streams (may also be non-finite).
    fn current_item_duration_secs(&self) -> Option<f64>;
    /// `(reverse_end, forward_end)`; unset for untrimmed items and while a
    /// trim handle is being dragged.
    fn current_item_trim_bounds(&self) -> (Option<f64>, Option<f64>);
    fn can_play_reverse(&self) -> bool;
    fn rate(&self) -> f64;
    fn action_at_end(&self) -> ActionAtEnd;

    fn seek(&mut self, secs: f64, tolerance: SeekTolerance);
    fn set_rate(&mut self, rate: f64);
    fn pause(&mut self);
    fn set_action_at_end(&mut self, policy: ActionAtEnd);
    fn set_trim_bounds(&mut self, reverse_end_secs: f64, forward_end_secs: f64);
    fn replace_current_item(&mut self, item: Option<Self::Item>);

    fn subscribe_end_of_media(
        &mut self,
        item: ItemId,
        notify: Sender<EndOfMedia>,
    ) -> SubscriptionHandle;
    fn unsubscribe(&mut self, handle: SubscriptionHandle);
}

/// Lend a player to a controller without giving up ownership.
impl<P: Player + ?Sized> Player for &mut P {
    type Item = P::Item;

    fn current_item(&self) -> Option<ItemId> {
        (**self).current_item()
    }

    fn current_position_secs(&self) -> f64 {
        (**self).current_position_secs()
    }

    fn current_item_duration_secs(&self) -> Option<f64> {
        (**self).current_item_duration_secs()
    }

    fn current_item_trim_bounds(&self) -> (Option<f64>, Option<f64>) {
        (**self).current_item_trim_bounds()
    }

    fn can_play_reverse(&self) -> bool {
        (**self).can_play_reverse()
    }

    fn rate(&self) -> f64 {
        (**self).rate()
    }

    fn action_at_end(&self) -> ActionAtEnd {
        (**self).action_at_end()
    }

    fn seek(&mut self, secs: f64, tolerance: SeekTolerance) {
        (**self).seek(secs, tolerance);
    }

    fn set_rate(&mut self, rate: f64) {
        (**self).set_rate(rate);
    }

    fn pause(&mut self) {
        (**self).pause();
    }

    fn set_action_at_end(&mut self, policy: ActionAtEnd) {
        (**self).set_action_at_end(policy);
    }

    fn set_trim_bounds(&mut self, reverse_end_secs: f64, forward_end_secs: f64) {
        (**self).set_trim_bounds(reverse_end_secs, forward_end_secs);
    }

    fn replace_current_item(&mut self, item: Option<Self::Item>) {
        (**self).replace_current_item(item);
    }

    fn subscribe_end_of_media(
        &mut self,
        item: ItemId,
        notify: Sender<EndOfMedia>,
    ) -> SubscriptionHandle {
        (**self).subscribe_end_of_media(item, notify)
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        (**self).unsubscribe(handle);
    }
}
