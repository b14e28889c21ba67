//! Loop and bounce control for a host media player.
//!
//! The host implements [`Player`]; [`PlaybackDirectionController`] takes it
//! over and handles end-of-media according to the current [`PlaybackMode`].

pub mod controller;
pub mod observer;
pub mod player;
pub mod range;
pub mod sim;
pub mod types;

pub use controller::PlaybackDirectionController;
pub use player::{EndOfMedia, ItemId, Player, SubscriptionHandle};
pub use range::PlayableRange;
pub use types::{ActionAtEnd, ControllerEvent, Direction, PlaybackMode, SeekTolerance};
