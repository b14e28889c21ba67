use serde::{Deserialize, Serialize};

use super::player::{ItemId, SubscriptionHandle};

/// Playback direction. Maps to a rate of `+1` or `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn rate(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }
}

/// Loop and bounce flags. Both may be set; bounce wins on each forward end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackMode {
    pub looping: bool,
    pub bouncing: bool,
}

impl PlaybackMode {
    pub const OFF: Self = Self {
        looping: false,
        bouncing: false,
    };

    /// True when either flag is set and end-of-media must be handled here.
    pub fn is_active(self) -> bool {
        self.looping || self.bouncing
    }
}

/// What the player does on its own when the current item plays to its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionAtEnd {
    /// Pause and stay at the end.
    #[default]
    PauseAndStop,
    /// Do nothing; whoever observes end-of-media decides.
    SuspendDefaultAction,
}

/// How far a seek may land from the requested time, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekTolerance {
    pub before: f64,
    pub after: f64,
}

impl SeekTolerance {
    /// Frame-exact seek, no snapping to nearby keyframes.
    pub const EXACT: Self = Self {
        before: 0.0,
        after: 0.0,
    };

    pub fn is_exact(&self) -> bool {
        self.before == 0.0 && self.after == 0.0
    }
}

/// Observability record emitted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    ModeChanged(PlaybackMode),
    Subscribed {
        item: ItemId,
        handle: SubscriptionHandle,
    },
    Unsubscribed(SubscriptionHandle),
    /// Reached the end going forward; now heading back from `target`.
    Bounced { from: f64, target: Option<f64> },
    /// Restarted from `target`.
    Looped { from: f64, target: f64 },
    /// End of media with no mode able to act.
    Stopped { at: f64 },
    /// Bounce was disabled while running backward.
    RateReset,
}
