use crossbeam_channel::{Receiver, Sender};

use super::observer::{EndOfMediaObserver, Reconciled};
use super::player::{EndOfMedia, Player};
use super::range::{self, PlayableRange};
use super::types::{ControllerEvent, Direction, PlaybackMode, SeekTolerance};

/// Decides what happens when the current item plays to its end: restart it,
/// run it backward, or leave it paused.
///
/// Owns the player. Dropping the controller releases its end-of-media
/// subscription. Notifications are queued on an internal channel and acted on
/// in [`process_end_of_media`](Self::process_end_of_media), which the host
/// calls from the same thread as the setters.
pub struct PlaybackDirectionController<P: Player> {
    player: P,
    mode: PlaybackMode,
    observer: EndOfMediaObserver,
    end_tx: Sender<EndOfMedia>,
    end_rx: Receiver<EndOfMedia>,
    listeners: Vec<Sender<ControllerEvent>>,
}

impl<P: Player> PlaybackDirectionController<P> {
    pub fn new(player: P) -> Self {
        Self::with_mode(player, PlaybackMode::OFF)
    }

    pub fn with_mode(player: P, mode: PlaybackMode) -> Self {
        let (end_tx, end_rx) = crossbeam_channel::unbounded();
        let mut controller = Self {
            player,
            mode,
            observer: EndOfMediaObserver::new(),
            end_tx,
            end_rx,
            listeners: Vec::new(),
        };
        controller.reconcile();
        controller
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn is_looping(&self) -> bool {
        self.mode.looping
    }

    pub fn is_bouncing(&self) -> bool {
        self.mode.bouncing
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    /// Direct player access. Call [`on_source_replaced`](Self::on_source_replaced)
    /// after swapping the item through this.
    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    /// Receive a [`ControllerEvent`] for every decision and lifecycle change.
    pub fn subscribe_events(&mut self) -> Receiver<ControllerEvent> {
        let (tx, rx) = crossbeam_channel::bounded(256);
        self.listeners.push(tx);
        rx
    }

    pub fn set_loop(&mut self, enabled: bool) {
        log::info!("Loop playback: {enabled}");
        self.apply_mode(PlaybackMode {
            looping: enabled,
            ..self.mode
        });
    }

    /// Disabling bounce while running backward puts playback forward again.
    pub fn set_bounce(&mut self, enabled: bool) {
        log::info!("Bounce playback: {enabled}");
        self.apply_mode(PlaybackMode {
            bouncing: enabled,
            ..self.mode
        });
    }

    /// Set both flags at once. The subscription survives any change between
    /// two active modes.
    pub fn set_mode(&mut self, mode: PlaybackMode) {
        log::info!(
            "Playback mode: loop={} bounce={}",
            mode.looping,
            mode.bouncing
        );
        self.apply_mode(mode);
    }

    fn apply_mode(&mut self, mode: PlaybackMode) {
        self.mode = mode;
        self.emit(ControllerEvent::ModeChanged(mode));
        self.reconcile();

        if !mode.bouncing && self.player.rate() == Direction::Backward.rate() {
            self.player.set_rate(Direction::Forward.rate());
            self.emit(ControllerEvent::RateReset);
        }
    }

    /// Re-attach to the player's current item. Must follow every item change.
    pub fn on_source_replaced(&mut self) {
        log::info!("Media source replaced");
        if let Some(handle) = self.observer.release(&mut self.player) {
            self.emit(ControllerEvent::Unsubscribed(handle));
        }
        // Anything still queued belongs to the old item
        while self.end_rx.try_recv().is_ok() {}
        self.reconcile();
    }

    /// Load `item` into the player and re-attach to it.
    pub fn replace_current_item(&mut self, item: Option<P::Item>) {
        self.player.replace_current_item(item);
        self.on_source_replaced();
    }

    /// Trim bounds if set, else the full duration. `None` while unresolved.
    pub fn playback_range(&self) -> Option<PlayableRange> {
        range::playback_range(
            self.player.current_item_trim_bounds(),
            self.player.current_item_duration_secs(),
        )
    }

    /// Write `range` back to the player as its trim bounds.
    pub fn set_playback_range(&mut self, range: Option<PlayableRange>) {
        let Some(range) = range else {
            return;
        };
        self.player.set_trim_bounds(range.start(), range.end());
    }

    /// Exact seek to the start of the playable range (or zero). Returns the target.
    pub fn seek_to_start(&mut self) -> f64 {
        let secs = self.playback_range().map_or(0.0, |r| r.start());
        self.player.seek(secs, SeekTolerance::EXACT);
        secs
    }

    /// Exact seek to the end of the playable range. The range already falls
    /// back to the full duration, so this does nothing only when neither the
    /// trim bounds nor the duration are known.
    pub fn seek_to_end(&mut self) -> Option<f64> {
        let secs = self.playback_range()?.end();
        self.player.seek(secs, SeekTolerance::EXACT);
        Some(secs)
    }

    /// Act on queued end-of-media notifications. Returns how many were handled.
    pub fn process_end_of_media(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.end_rx.try_recv() {
            if self.observer.handle() != Some(event.handle) {
                log::debug!(
                    "Ignoring end-of-media from stale subscription {:?}",
                    event.handle
                );
                continue;
            }
            self.on_end_of_media();
            handled += 1;
        }
        handled
    }

    fn on_end_of_media(&mut self) {
        self.player.pause();

        let position = self.player.current_position_secs();
        let range_start = self.playback_range().map_or(0.0, |r| r.start());

        if self.mode.bouncing && self.player.can_play_reverse() && position > range_start {
            let target = self.seek_to_end();
            self.player.set_rate(Direction::Backward.rate());
            log::debug!("Bounce at {position:.3}s, reversing from {target:?}");
            self.emit(ControllerEvent::Bounced {
                from: position,
                target,
            });
        } else if self.mode.looping {
            let target = self.seek_to_start();
            self.player.set_rate(Direction::Forward.rate());
            log::debug!("Loop at {position:.3}s, restarting from {target:.3}s");
            self.emit(ControllerEvent::Looped {
                from: position,
                target,
            });
        } else {
            log::debug!("End of media at {position:.3}s, staying paused");
            self.emit(ControllerEvent::Stopped { at: position });
        }
    }

    fn reconcile(&mut self) {
        let change = self
            .observer
            .reconcile(&mut self.player, self.mode, &self.end_tx);
        match change {
            Reconciled::Unchanged => {}
            Reconciled::Subscribed(item, handle) => {
                log::info!("Observing end of media for item {:?}", item);
                self.emit(ControllerEvent::Subscribed { item, handle });
            }
            Reconciled::Unsubscribed(handle) => {
                log::info!("Stopped observing end of media");
                self.emit(ControllerEvent::Unsubscribed(handle));
            }
        }
    }

    fn emit(&mut self, event: ControllerEvent) {
        self.listeners.retain(|tx| {
            match tx.try_send(event.clone()) {
                Ok(_) => true,
                Err(crossbeam_channel::TrySendError::Full(_)) => true, // slow listener, keep
                Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
            }
        });
    }
}

impl<P: Player> Drop for PlaybackDirectionController<P> {
    fn drop(&mut self) {
        // Hand the player back in its unobserved state: no subscription, pause at end
        self.observer
            .reconcile(&mut self.player, PlaybackMode::OFF, &self.end_tx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::player::ItemId;
    use crate::media::sim::{PlayerCommand, SimItem, SimulatedPlayer};
    use crate::media::types::ActionAtEnd;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn trimmed_item() -> SimItem {
        SimItem::new(ItemId(1), Some(12.0)).with_trim(2.0, 10.0)
    }

    fn controller(
        item: SimItem,
        looping: bool,
        bouncing: bool,
    ) -> PlaybackDirectionController<SimulatedPlayer> {
        let mut c = PlaybackDirectionController::with_mode(
            SimulatedPlayer::with_item(item),
            PlaybackMode { looping, bouncing },
        );
        c.player_mut().clear_history();
        c
    }

    /// Deliver one end-of-media notification at `position`.
    fn end_at(c: &mut PlaybackDirectionController<SimulatedPlayer>, position: f64) -> usize {
        let handle = c.observer.handle().expect("subscription");
        c.player_mut().set_position(position);
        c.end_tx
            .send(EndOfMedia {
                handle,
                item: ItemId(1),
            })
            .unwrap();
        c.process_end_of_media()
    }

    fn exact_seek(secs: f64) -> PlayerCommand {
        PlayerCommand::Seek {
            secs,
            tolerance: SeekTolerance::EXACT,
        }
    }

    #[test]
    fn loop_only_restarts_from_range_start() {
        let mut c = controller(trimmed_item(), true, false);
        assert_eq!(end_at(&mut c, 10.0), 1);
        assert_eq!(
            c.player().history(),
            &[PlayerCommand::Pause, exact_seek(2.0), PlayerCommand::SetRate(1.0)]
        );
        assert!(approx_eq(c.player().current_position_secs(), 2.0));
    }

    #[test]
    fn bounce_only_reverses_from_range_end() {
        let mut c = controller(trimmed_item(), false, true);
        end_at(&mut c, 9.5);
        assert_eq!(
            c.player().history(),
            &[PlayerCommand::Pause, exact_seek(10.0), PlayerCommand::SetRate(-1.0)]
        );
        assert!(approx_eq(c.player().rate(), -1.0));
    }

    #[test]
    fn bounce_without_reverse_support_stays_paused() {
        let mut c = controller(trimmed_item().without_reverse(), false, true);
        end_at(&mut c, 9.5);
        assert_eq!(c.player().history(), &[PlayerCommand::Pause]);
        assert!(approx_eq(c.player().current_position_secs(), 9.5));
    }

    #[test]
    fn both_modes_without_range_bounce_skips_seek() {
        let mut c = controller(SimItem::new(ItemId(1), None), true, true);
        end_at(&mut c, 5.0);
        assert_eq!(
            c.player().history(),
            &[PlayerCommand::Pause, PlayerCommand::SetRate(-1.0)]
        );
    }

    #[test]
    fn both_modes_without_range_or_reverse_loops_from_zero() {
        let mut c = controller(SimItem::new(ItemId(1), None).without_reverse(), true, true);
        end_at(&mut c, 5.0);
        assert_eq!(
            c.player().history(),
            &[PlayerCommand::Pause, exact_seek(0.0), PlayerCommand::SetRate(1.0)]
        );
    }

    #[test]
    fn bounce_uses_full_duration_mid_drag() {
        let mut item = SimItem::new(ItemId(1), Some(12.0));
        item.forward_end_secs = Some(10.0);
        let mut c = controller(item, false, true);
        end_at(&mut c, 10.0);
        assert_eq!(
            c.player().history(),
            &[PlayerCommand::Pause, exact_seek(12.0), PlayerCommand::SetRate(-1.0)]
        );
    }

    #[test]
    fn both_modes_at_range_start_loops() {
        let mut c = controller(trimmed_item(), true, true);
        end_at(&mut c, 2.0);
        assert_eq!(
            c.player().history(),
            &[PlayerCommand::Pause, exact_seek(2.0), PlayerCommand::SetRate(1.0)]
        );
    }

    #[test]
    fn disabling_bounce_while_reversing_resets_rate() {
        let mut c = controller(trimmed_item(), false, true);
        let events = c.subscribe_events();
        c.player_mut().set_rate(-1.0);
        c.set_bounce(false);
        assert!(approx_eq(c.player().rate(), 1.0));
        assert!(events.try_iter().any(|e| e == ControllerEvent::RateReset));
    }

    #[test]
    fn disabling_bounce_while_forward_keeps_rate() {
        let mut c = controller(trimmed_item(), true, true);
        c.player_mut().set_rate(0.5);
        c.set_bounce(false);
        assert!(approx_eq(c.player().rate(), 0.5));
    }

    #[test]
    fn mode_off_drops_subscription_and_ignores_end() {
        let mut c = controller(trimmed_item(), true, false);
        let handle = c.observer.handle().unwrap();
        c.set_loop(false);
        assert_eq!(c.player().subscriber_count(), 0);
        assert_eq!(c.player().action_at_end(), ActionAtEnd::PauseAndStop);

        c.player_mut().clear_history();
        c.end_tx
            .send(EndOfMedia {
                handle,
                item: ItemId(1),
            })
            .unwrap();
        assert_eq!(c.process_end_of_media(), 0);
        assert!(c.player().history().is_empty());
    }

    #[test]
    fn enabling_second_mode_keeps_subscription() {
        let mut c = controller(trimmed_item(), true, false);
        c.set_bounce(true);
        assert_eq!(c.player().subscriber_count(), 1);
        assert!(!c
            .player()
            .history()
            .iter()
            .any(|cmd| matches!(cmd, PlayerCommand::Subscribe(..))));
    }

    #[test]
    fn source_replacement_resubscribes_to_new_item() {
        let mut c = controller(trimmed_item(), true, false);
        let old = c.observer.handle().unwrap();
        c.replace_current_item(Some(SimItem::new(ItemId(2), Some(4.0))));
        let new = c.observer.handle().unwrap();
        assert_ne!(old, new);
        assert_eq!(c.player().subscriber_count(), 1);
        assert_eq!(
            c.player().history(),
            &[
                PlayerCommand::ReplaceItem(Some(ItemId(2))),
                PlayerCommand::Unsubscribe(old),
                PlayerCommand::Subscribe(ItemId(2), new),
            ]
        );
    }

    #[test]
    fn queued_end_from_old_source_is_discarded() {
        let mut c = controller(trimmed_item(), true, false);
        let old = c.observer.handle().unwrap();
        c.end_tx
            .send(EndOfMedia {
                handle: old,
                item: ItemId(1),
            })
            .unwrap();
        c.replace_current_item(Some(SimItem::new(ItemId(2), Some(4.0))));
        c.player_mut().clear_history();
        assert_eq!(c.process_end_of_media(), 0);
        assert!(c.player().history().is_empty());
    }

    #[test]
    fn source_replacement_with_modes_off_stays_unsubscribed() {
        let mut c = controller(trimmed_item(), false, false);
        c.replace_current_item(Some(SimItem::new(ItemId(2), Some(4.0))));
        assert_eq!(c.player().subscriber_count(), 0);
    }

    #[test]
    fn subscription_deferred_until_item_loaded() {
        let mut c = PlaybackDirectionController::new(SimulatedPlayer::new());
        c.set_loop(true);
        assert_eq!(c.player().subscriber_count(), 0);
        c.replace_current_item(Some(SimItem::new(ItemId(1), Some(3.0))));
        assert_eq!(c.player().subscriber_count(), 1);
    }

    #[test]
    fn seek_helpers() {
        let mut c = controller(SimItem::new(ItemId(1), Some(8.0)), false, false);
        assert!(approx_eq(c.seek_to_start(), 0.0));
        assert_eq!(c.seek_to_end(), Some(8.0));

        let mut live = controller(SimItem::new(ItemId(1), None), false, false);
        assert_eq!(live.seek_to_end(), None);
        assert!(live.player().history().is_empty());
    }

    #[test]
    fn set_playback_range_writes_trim_bounds() {
        let mut c = controller(SimItem::new(ItemId(1), Some(20.0)), false, false);
        c.set_playback_range(Some(PlayableRange::new(15.0, 5.0)));
        let r = c.playback_range().unwrap();
        assert!(approx_eq(r.start(), 5.0));
        assert!(approx_eq(r.end(), 15.0));
        c.set_playback_range(None);
        assert_eq!(c.player().history(), &[PlayerCommand::SetTrimBounds(5.0, 15.0)]);
    }

    #[test]
    fn drop_releases_subscription() {
        let mut sim = SimulatedPlayer::with_item(trimmed_item());
        {
            let c = PlaybackDirectionController::with_mode(
                &mut sim,
                PlaybackMode {
                    looping: true,
                    bouncing: true,
                },
            );
            assert_eq!(c.player().subscriber_count(), 1);
        }
        assert_eq!(sim.subscriber_count(), 0);
        assert_eq!(sim.action_at_end(), ActionAtEnd::PauseAndStop);
        assert!(matches!(
            sim.history().last(),
            Some(PlayerCommand::SetActionAtEnd(ActionAtEnd::PauseAndStop))
        ));

        // Nobody observes the player any more; it stops at the end on its own
        sim.play();
        for _ in 0..200 {
            sim.tick(0.1);
        }
        assert!(approx_eq(sim.current_position_secs(), 10.0));
        assert!(approx_eq(sim.rate(), 0.0));
    }

    #[test]
    fn set_mode_between_active_modes_keeps_subscription() {
        let mut c = controller(trimmed_item(), true, false);
        let handle = c.observer.handle().unwrap();
        let events = c.subscribe_events();
        c.end_tx
            .send(EndOfMedia {
                handle,
                item: ItemId(1),
            })
            .unwrap();

        let bounce_only = PlaybackMode {
            looping: false,
            bouncing: true,
        };
        c.set_mode(bounce_only);

        assert_eq!(c.observer.handle(), Some(handle));
        assert!(c.player().history().is_empty());
        assert_eq!(
            events.try_iter().collect::<Vec<_>>(),
            vec![ControllerEvent::ModeChanged(bounce_only)]
        );

        // The end queued before the switch is still acted on, now as a bounce
        c.player_mut().set_position(10.0);
        assert_eq!(c.process_end_of_media(), 1);
        assert!(approx_eq(c.player().rate(), -1.0));
    }

    #[test]
    fn set_mode_off_while_reversing_resets_rate() {
        let mut c = controller(trimmed_item(), true, true);
        c.player_mut().set_rate(-1.0);
        c.set_mode(PlaybackMode::OFF);
        assert_eq!(c.player().subscriber_count(), 0);
        assert!(approx_eq(c.player().rate(), 1.0));
    }

    #[test]
    fn events_report_decisions() {
        let mut c = controller(trimmed_item(), true, false);
        let events = c.subscribe_events();
        end_at(&mut c, 10.0);
        let got: Vec<_> = events.try_iter().collect();
        assert_eq!(
            got,
            vec![ControllerEvent::Looped {
                from: 10.0,
                target: 2.0
            }]
        );
    }

    #[test]
    fn dropped_listener_is_pruned() {
        let mut c = controller(trimmed_item(), true, false);
        drop(c.subscribe_events());
        c.set_bounce(true);
        assert!(c.listeners.is_empty());
    }

    #[test]
    fn simulated_bounce_then_stop_at_start() {
        let mut c = controller(trimmed_item(), true, true);
        c.player_mut().seek(2.0, SeekTolerance::EXACT);
        c.player_mut().play();

        let mut decisions = Vec::new();
        let events = c.subscribe_events();
        for _ in 0..400 {
            c.player_mut().tick(0.05);
            c.process_end_of_media();
            decisions.extend(events.try_iter());
        }
        assert_eq!(
            decisions,
            vec![ControllerEvent::Bounced {
                from: 10.0,
                target: Some(10.0)
            }]
        );
        assert!(approx_eq(c.player().current_position_secs(), 2.0));
        assert!(approx_eq(c.player().rate(), 0.0));
    }

    #[test]
    fn simulated_ping_pong_when_reverse_end_notifies() {
        let mut c = controller(trimmed_item(), true, true);
        c.player_mut().set_reverse_end_notifies(true);
        c.player_mut().seek(2.0, SeekTolerance::EXACT);
        c.player_mut().play();

        let events = c.subscribe_events();
        for _ in 0..1000 {
            c.player_mut().tick(0.05);
            c.process_end_of_media();
        }
        let got: Vec<_> = events.try_iter().collect();
        let bounces = got
            .iter()
            .filter(|e| matches!(e, ControllerEvent::Bounced { .. }))
            .count();
        let loops = got
            .iter()
            .filter(|e| matches!(e, ControllerEvent::Looped { .. }))
            .count();
        // 50s of playback over an 8s range, 16s per round trip
        assert_eq!(bounces, 3);
        assert_eq!(loops, 3);
        assert!(matches!(got[0], ControllerEvent::Bounced { .. }));
        assert!(matches!(got[1], ControllerEvent::Looped { .. }));
    }
}
