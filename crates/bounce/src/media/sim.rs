//! Deterministic in-memory player.
//!
//! Advances position by `rate * dt` on each [`SimulatedPlayer::tick`] and
//! sends end-of-media notifications the way a real player would. Every command
//! is recorded so callers can inspect exactly what the controller asked for.

use crossbeam_channel::Sender;

use super::player::{EndOfMedia, ItemId, Player, SubscriptionHandle};
use super::range;
use super::types::{ActionAtEnd, SeekTolerance};

/// A media item with known (or unknown) timing.
#[derive(Debug, Clone, PartialEq)]
pub struct SimItem {
    pub id: ItemId,
    pub duration_secs: Option<f64>,
    pub reverse_end_secs: Option<f64>,
    pub forward_end_secs: Option<f64>,
    pub can_play_reverse: bool,
}

impl SimItem {
    pub fn new(id: ItemId, duration_secs: Option<f64>) -> Self {
        Self {
            id,
            duration_secs,
            reverse_end_secs: None,
            forward_end_secs: None,
            can_play_reverse: true,
        }
    }

    pub fn with_trim(mut self, reverse_end_secs: f64, forward_end_secs: f64) -> Self {
        self.reverse_end_secs = Some(reverse_end_secs);
        self.forward_end_secs = Some(forward_end_secs);
        self
    }

    pub fn without_reverse(mut self) -> Self {
        self.can_play_reverse = false;
        self
    }
}

/// A command issued to the player, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Seek { secs: f64, tolerance: SeekTolerance },
    SetRate(f64),
    Pause,
    SetActionAtEnd(ActionAtEnd),
    SetTrimBounds(f64, f64),
    ReplaceItem(Option<ItemId>),
    Subscribe(ItemId, SubscriptionHandle),
    Unsubscribe(SubscriptionHandle),
}

struct Subscriber {
    handle: SubscriptionHandle,
    item: ItemId,
    notify: Sender<EndOfMedia>,
}

pub struct SimulatedPlayer {
    item: Option<SimItem>,
    position: f64,
    rate: f64,
    action_at_end: ActionAtEnd,
    subscribers: Vec<Subscriber>,
    next_handle: u64,
    history: Vec<PlayerCommand>,
    // Set on arrival at an end so the notification fires once per arrival
    at_end: bool,
    reverse_end_notifies: bool,
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self {
            item: None,
            position: 0.0,
            rate: 0.0,
            action_at_end: ActionAtEnd::default(),
            subscribers: Vec::new(),
            next_handle: 1,
            history: Vec::new(),
            at_end: false,
            reverse_end_notifies: false,
        }
    }

    pub fn with_item(item: SimItem) -> Self {
        let mut player = Self::new();
        player.item = Some(item);
        player
    }

    /// Also notify when reverse playback reaches the range start.
    pub fn set_reverse_end_notifies(&mut self, enabled: bool) {
        self.reverse_end_notifies = enabled;
    }

    pub fn item(&self) -> Option<&SimItem> {
        self.item.as_ref()
    }

    /// Mutable access to the loaded item, e.g. to simulate a trim-handle drag.
    pub fn item_mut(&mut self) -> Option<&mut SimItem> {
        self.item.as_mut()
    }

    /// Place the playhead without recording a command.
    pub fn set_position(&mut self, secs: f64) {
        self.position = secs;
        self.at_end = false;
    }

    pub fn play(&mut self) {
        self.set_rate(1.0);
    }

    pub fn history(&self) -> &[PlayerCommand] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Advance playback by `dt_secs`. Returns true if an end-of-media
    /// notification was sent.
    pub fn tick(&mut self, dt_secs: f64) -> bool {
        if self.rate == 0.0 {
            return false;
        }
        let Some(item) = &self.item else {
            return false;
        };
        let id = item.id;
        let range = range::playback_range(
            (item.reverse_end_secs, item.forward_end_secs),
            item.duration_secs,
        );

        self.position += self.rate * dt_secs;

        if self.rate > 0.0 {
            // Live or still loading: no end to reach
            let Some(end) = range.map(|r| r.end()) else {
                return false;
            };
            if self.position < end {
                return false;
            }
            self.position = end;
            if self.action_at_end == ActionAtEnd::PauseAndStop {
                self.rate = 0.0;
            }
        } else {
            let start = range.map_or(0.0, |r| r.start());
            if self.position > start {
                return false;
            }
            self.position = start;
            if !self.reverse_end_notifies || self.action_at_end == ActionAtEnd::PauseAndStop {
                self.rate = 0.0;
            }
            if !self.reverse_end_notifies {
                return false;
            }
        }

        if self.at_end {
            return false;
        }
        self.at_end = true;
        self.notify_end(id)
    }

    fn notify_end(&self, item: ItemId) -> bool {
        let mut sent = false;
        for sub in self.subscribers.iter().filter(|s| s.item == item) {
            let _ = sub.notify.send(EndOfMedia {
                handle: sub.handle,
                item,
            });
            sent = true;
        }
        sent
    }
}

impl Player for SimulatedPlayer {
    type Item = SimItem;

    fn current_item(&self) -> Option<ItemId> {
        self.item.as_ref().map(|i| i.id)
    }

    fn current_position_secs(&self) -> f64 {
        self.position
    }

    fn current_item_duration_secs(&self) -> Option<f64> {
        self.item.as_ref().and_then(|i| i.duration_secs)
    }

    fn current_item_trim_bounds(&self) -> (Option<f64>, Option<f64>) {
        self.item
            .as_ref()
            .map_or((None, None), |i| (i.reverse_end_secs, i.forward_end_secs))
    }

    fn can_play_reverse(&self) -> bool {
        self.item.as_ref().is_some_and(|i| i.can_play_reverse)
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn action_at_end(&self) -> ActionAtEnd {
        self.action_at_end
    }

    fn seek(&mut self, secs: f64, tolerance: SeekTolerance) {
        self.history.push(PlayerCommand::Seek { secs, tolerance });
        let max = self
            .current_item_duration_secs()
            .filter(|d| d.is_finite())
            .unwrap_or(f64::MAX);
        self.position = secs.clamp(0.0, max.max(0.0));
        self.at_end = false;
    }

    fn set_rate(&mut self, rate: f64) {
        self.history.push(PlayerCommand::SetRate(rate));
        self.rate = rate;
    }

    fn pause(&mut self) {
        self.history.push(PlayerCommand::Pause);
        self.rate = 0.0;
    }

    fn set_action_at_end(&mut self, policy: ActionAtEnd) {
        self.history.push(PlayerCommand::SetActionAtEnd(policy));
        self.action_at_end = policy;
    }

    fn set_trim_bounds(&mut self, reverse_end_secs: f64, forward_end_secs: f64) {
        self.history
            .push(PlayerCommand::SetTrimBounds(reverse_end_secs, forward_end_secs));
        if let Some(item) = self.item.as_mut() {
            item.reverse_end_secs = Some(reverse_end_secs);
            item.forward_end_secs = Some(forward_end_secs);
        }
    }

    fn replace_current_item(&mut self, item: Option<SimItem>) {
        self.history
            .push(PlayerCommand::ReplaceItem(item.as_ref().map(|i| i.id)));
        self.item = item;
        self.position = 0.0;
        self.at_end = false;
    }

    fn subscribe_end_of_media(
        &mut self,
        item: ItemId,
        notify: Sender<EndOfMedia>,
    ) -> SubscriptionHandle {
        let handle = SubscriptionHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        self.history.push(PlayerCommand::Subscribe(item, handle));
        self.subscribers.push(Subscriber {
            handle,
            item,
            notify,
        });
        handle
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        self.history.push(PlayerCommand::Unsubscribe(handle));
        self.subscribers.retain(|s| s.handle != handle);
    }
}
