use anyhow::{Context, Result};

use bounce::media::sim::{SimItem, SimulatedPlayer};
use bounce::media::{ControllerEvent, ItemId, PlaybackDirectionController, PlaybackMode, Player};
use bounce::settings::SettingsConfig;

const TICK_SECS: f64 = 1.0 / 30.0;

/// Options for one headless run against the simulated player.
#[derive(Debug, Clone, PartialEq)]
struct RunOptions {
    mode: PlaybackMode,
    can_play_reverse: bool,
    /// `None` simulates a live stream.
    duration_secs: Option<f64>,
    trim: Option<(f64, f64)>,
    run_secs: f64,
    reverse_end_notifies: bool,
    save_settings: bool,
}

impl RunOptions {
    fn new(mode: PlaybackMode) -> Self {
        Self {
            mode,
            can_play_reverse: true,
            duration_secs: Some(4.0),
            trim: None,
            run_secs: 20.0,
            reverse_end_notifies: false,
            save_settings: false,
        }
    }
}

fn parse_secs(value: &str, flag: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .with_context(|| format!("{flag} expects seconds, got '{value}'"))
}

fn parse_args(
    args: impl IntoIterator<Item = String>,
    defaults: PlaybackMode,
) -> Result<RunOptions> {
    let mut opts = RunOptions::new(defaults);
    for arg in args {
        match arg.as_str() {
            "--loop" => opts.mode.looping = true,
            "--no-loop" => opts.mode.looping = false,
            "--bounce" => opts.mode.bouncing = true,
            "--no-bounce" => opts.mode.bouncing = false,
            "--no-reverse" => opts.can_play_reverse = false,
            "--reverse-end-notifies" => opts.reverse_end_notifies = true,
            "--save-settings" => opts.save_settings = true,
            "--duration=live" => opts.duration_secs = None,
            _ => {
                if let Some(v) = arg.strip_prefix("--duration=") {
                    opts.duration_secs = Some(parse_secs(v, "--duration")?);
                } else if let Some(v) = arg.strip_prefix("--run=") {
                    opts.run_secs = parse_secs(v, "--run")?;
                } else if let Some(v) = arg.strip_prefix("--trim=") {
                    let (start, end) = v
                        .split_once(',')
                        .with_context(|| format!("--trim expects START,END, got '{v}'"))?;
                    opts.trim = Some((
                        parse_secs(start, "--trim")?,
                        parse_secs(end, "--trim")?,
                    ));
                } else {
                    log::warn!("Ignoring unknown argument: {arg}");
                }
            }
        }
    }
    Ok(opts)
}

fn describe(event: &ControllerEvent) -> String {
    match event {
        ControllerEvent::ModeChanged(mode) => {
            format!("mode: loop={} bounce={}", mode.looping, mode.bouncing)
        }
        ControllerEvent::Subscribed { item, handle } => {
            format!("observing item {} (subscription {})", item.0, handle.raw())
        }
        ControllerEvent::Unsubscribed(handle) => {
            format!("released subscription {}", handle.raw())
        }
        ControllerEvent::Bounced { from, target } => match target {
            Some(t) => format!("bounce at {from:.2}s, reversing from {t:.2}s"),
            None => format!("bounce at {from:.2}s, reversing in place"),
        },
        ControllerEvent::Looped { from, target } => {
            format!("loop at {from:.2}s, restarting from {target:.2}s")
        }
        ControllerEvent::Stopped { at } => format!("stopped at {at:.2}s"),
        ControllerEvent::RateReset => "rate reset to forward".to_string(),
    }
}

fn run(opts: &RunOptions) {
    let mut item = SimItem::new(ItemId(1), opts.duration_secs);
    if let Some((start, end)) = opts.trim {
        item = item.with_trim(start, end);
    }
    if !opts.can_play_reverse {
        item = item.without_reverse();
    }

    let mut player = SimulatedPlayer::with_item(item);
    player.set_reverse_end_notifies(opts.reverse_end_notifies);

    let mut controller = PlaybackDirectionController::new(player);
    let events = controller.subscribe_events();
    controller.set_mode(opts.mode);
    controller.seek_to_start();
    controller.player_mut().play();

    let steps = (opts.run_secs / TICK_SECS).ceil() as u64;
    for step in 0..steps {
        controller.player_mut().tick(TICK_SECS);
        controller.process_end_of_media();
        for event in events.try_iter() {
            log::info!(
                "[{:>7.2}s] {}",
                step as f64 * TICK_SECS,
                describe(&event)
            );
        }
    }

    let player = controller.player();
    log::info!(
        "Finished after {:.2}s: position {:.2}s, rate {:+.1}",
        opts.run_secs,
        player.current_position_secs(),
        player.rate()
    );
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut settings = SettingsConfig::load();
    let opts = parse_args(std::env::args().skip(1), settings.mode())?;

    if opts.save_settings {
        settings.set_mode(opts.mode);
        settings.save();
    }

    run(&opts);
    Ok(())
}
