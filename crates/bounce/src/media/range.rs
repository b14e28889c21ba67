//! Playable-range arithmetic.
//!
//! Every bound pair goes through [`clamp_ordered_range`], so an inverted
//! range can never be built. Missing or non-numeric inputs yield `None`
//! instead of an error.

/// A closed time interval in seconds with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayableRange {
    start: f64,
    end: f64,
}

impl PlayableRange {
    /// Build a range from two bounds in either order.
    pub fn new(bound1: f64, bound2: f64) -> Self {
        clamp_ordered_range(bound1, bound2)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Length of the range in seconds.
    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0.0
    }

    pub fn contains(&self, secs: f64) -> bool {
        secs >= self.start && secs <= self.end
    }
}

/// Range from zero to the item's duration.
///
/// `None` while the duration is unknown (asset still loading), not finite
/// (live or indeterminate stream) or negative.
pub fn duration_range(duration_secs: Option<f64>) -> Option<PlayableRange> {
    let duration = duration_secs.filter(|d| d.is_finite() && *d >= 0.0)?;
    Some(clamp_ordered_range(0.0, duration))
}

/// Order two bounds into a range. Never fails.
pub fn clamp_ordered_range(bound1: f64, bound2: f64) -> PlayableRange {
    if bound1 <= bound2 {
        PlayableRange {
            start: bound1,
            end: bound2,
        }
    } else {
        PlayableRange {
            start: bound2,
            end: bound1,
        }
    }
}

/// Range between the reverse and forward playback end times of a trimmed item.
///
/// Both bounds are unavailable while the user is dragging a trim handle, and
/// for items that were never trimmed.
pub fn trim_range(
    reverse_end_secs: Option<f64>,
    forward_end_secs: Option<f64>,
) -> Option<PlayableRange> {
    let start = reverse_end_secs.filter(|s| s.is_finite())?;
    let end = forward_end_secs.filter(|s| s.is_finite())?;
    Some(clamp_ordered_range(start, end))
}

/// The range playback is confined to: trim bounds if set, else the full duration.
pub fn playback_range(
    trim: (Option<f64>, Option<f64>),
    duration_secs: Option<f64>,
) -> Option<PlayableRange> {
    trim_range(trim.0, trim.1).or_else(|| duration_range(duration_secs))
}
