//! Transport position, loop region and ruler input handling

use serde::{Deserialize, Serialize};

use crate::arrangement::ArrangementClip;

/// Smallest allowed loop region, in bars
pub const MIN_LOOP_BARS: f64 = 0.5;

/// What the ruler pointer is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    #[default]
    Idle,
    Scrubbing,
    DraggingLoopStart,
    DraggingLoopEnd,
}

/// Which edge of the loop region a pointer grabbed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopHandle {
    Start,
    End,
}

/// Convert a ruler x coordinate to a bar position (never negative)
pub fn pointer_to_bar(x: f64, ruler_left: f64, pixels_per_bar: f64, scroll_bars: f64) -> f64 {
    let scroll = if scroll_bars.is_finite() { scroll_bars } else { 0.0 };
    let bar = if pixels_per_bar > 0.0 && pixels_per_bar.is_finite() {
        scroll + (x - ruler_left) / pixels_per_bar
    } else {
        scroll
    };
    if bar.is_finite() { bar.max(0.0) } else { 0.0 }
}

/// Playhead and loop region, driven by scrub and loop-handle drags
///
/// `loop_end >= loop_start + MIN_LOOP_BARS` holds after every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TransportRecord")]
pub struct TransportClock {
    playhead_bar: f64,
    loop_enabled: bool,
    loop_start: f64,
    loop_end: f64,
    #[serde(skip)]
    mode: TransportMode,
}

#[derive(Deserialize)]
#[serde(default)]
struct TransportRecord {
    playhead_bar: f64,
    loop_enabled: bool,
    loop_start: f64,
    loop_end: f64,
}

impl Default for TransportRecord {
    fn default() -> Self {
        let clock = TransportClock::default();
        Self {
            playhead_bar: clock.playhead_bar,
            loop_enabled: clock.loop_enabled,
            loop_start: clock.loop_start,
            loop_end: clock.loop_end,
        }
    }
}

impl From<TransportRecord> for TransportClock {
    fn from(record: TransportRecord) -> Self {
        let mut clock = Self::default();
        clock.seek_to_bar(record.playhead_bar);
        clock.set_loop_region(record.loop_start, record.loop_end);
        clock.loop_enabled = record.loop_enabled;
        clock
    }
}

impl Default for TransportClock {
    fn default() -> Self {
        Self {
            playhead_bar: 0.0,
            loop_enabled: false,
            loop_start: 0.0,
            loop_end: 4.0,
            mode: TransportMode::Idle,
        }
    }
}

impl TransportClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn playhead_bar(&self) -> f64 {
        self.playhead_bar
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn loop_start(&self) -> f64 {
        self.loop_start
    }

    pub fn loop_end(&self) -> f64 {
        self.loop_end
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.mode == TransportMode::Idle
    }

    /// Jump the playhead. Negative bars clamp to 0, NaN is ignored.
    pub fn seek_to_bar(&mut self, bar: f64) {
        if bar.is_nan() {
            return;
        }
        self.playhead_bar = bar.max(0.0);
    }

    /// Move the playhead forward, wrapping inside the loop when enabled
    pub fn advance(&mut self, bars: f64) {
        if !(bars > 0.0 && bars.is_finite()) {
            return;
        }
        self.playhead_bar += bars;

        if self.loop_enabled && self.playhead_bar >= self.loop_end {
            let len = self.loop_end - self.loop_start;
            let overshoot = (self.playhead_bar - self.loop_end).rem_euclid(len);
            self.playhead_bar = self.loop_start + overshoot;
        }
    }

    // ------------------------------------------------------------------
    // Loop region
    // ------------------------------------------------------------------

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.loop_enabled = !self.loop_enabled;
        self.loop_enabled
    }

    /// Move the loop start, kept at least `MIN_LOOP_BARS` before the end
    pub fn set_loop_start(&mut self, bar: f64) {
        if !bar.is_finite() {
            return;
        }
        self.loop_start = bar.max(0.0).min(self.loop_end - MIN_LOOP_BARS);
    }

    /// Move the loop end, kept at least `MIN_LOOP_BARS` after the start
    pub fn set_loop_end(&mut self, bar: f64) {
        if !bar.is_finite() {
            return;
        }
        self.loop_end = bar.max(self.loop_start + MIN_LOOP_BARS);
    }

    /// Set both edges; the end is pushed out if the region is too short
    pub fn set_loop_region(&mut self, start: f64, end: f64) {
        let start = if start.is_finite() { start.max(0.0) } else { self.loop_start };
        let end = if end.is_finite() { end } else { self.loop_end };
        self.loop_start = start;
        self.loop_end = end.max(start + MIN_LOOP_BARS);
    }

    /// Loop exactly over a clip and enable looping
    pub fn loop_clip(&mut self, clip: &ArrangementClip) {
        self.set_loop_region(clip.start_bar, clip.end_bar());
        self.loop_enabled = true;
        tracing::debug!("Looping clip {}: {}..{}", clip.id, self.loop_start, self.loop_end);
    }

    /// Pull the loop region inside a song of `length_bars`
    ///
    /// Songs shorter than `MIN_LOOP_BARS` leave the region untouched.
    pub fn constrain_to_song(&mut self, length_bars: f64) {
        if !(length_bars >= MIN_LOOP_BARS) || self.loop_end <= length_bars {
            return;
        }
        let start = self.loop_start.min(length_bars - MIN_LOOP_BARS);
        self.set_loop_region(start, length_bars);
    }

    /// Loop handle within `tolerance` bars of `bar`; the nearer one wins,
    /// the start handle on a tie
    pub fn hit_test(&self, bar: f64, tolerance: f64) -> Option<LoopHandle> {
        let to_start = (bar - self.loop_start).abs();
        let to_end = (bar - self.loop_end).abs();
        match (to_start <= tolerance, to_end <= tolerance) {
            (true, true) if to_end < to_start => Some(LoopHandle::End),
            (true, _) => Some(LoopHandle::Start),
            (false, true) => Some(LoopHandle::End),
            (false, false) => None,
        }
    }

    // ------------------------------------------------------------------
    // Pointer state machine
    // ------------------------------------------------------------------

    /// Pointer pressed on the ruler at `bar`
    ///
    /// Grabs a loop handle when looping is on and one is within `tolerance`,
    /// otherwise starts scrubbing. Ignored unless idle.
    pub fn press(&mut self, bar: f64, tolerance: f64) -> TransportMode {
        let handle = self
            .loop_enabled
            .then(|| self.hit_test(bar, tolerance))
            .flatten();
        match handle {
            Some(handle) => {
                self.begin_loop_drag(handle);
            }
            None => {
                self.begin_scrub(bar);
            }
        }
        self.mode
    }

    /// Start scrubbing at `bar`. Ignored unless idle.
    pub fn begin_scrub(&mut self, bar: f64) -> bool {
        if !self.is_idle() {
            tracing::trace!("begin_scrub ignored while {:?}", self.mode);
            return false;
        }
        self.mode = TransportMode::Scrubbing;
        self.seek_to_bar(bar);
        tracing::debug!("Scrub started at bar {}", self.playhead_bar);
        true
    }

    /// Start dragging a loop edge. Ignored unless idle.
    pub fn begin_loop_drag(&mut self, handle: LoopHandle) -> bool {
        if !self.is_idle() {
            tracing::trace!("begin_loop_drag ignored while {:?}", self.mode);
            return false;
        }
        self.mode = match handle {
            LoopHandle::Start => TransportMode::DraggingLoopStart,
            LoopHandle::End => TransportMode::DraggingLoopEnd,
        };
        tracing::debug!("Loop edge drag started: {:?}", handle);
        true
    }

    /// Pointer moved to `bar` while pressed; returns false when idle
    pub fn pointer_moved(&mut self, bar: f64) -> bool {
        match self.mode {
            TransportMode::Idle => return false,
            TransportMode::Scrubbing => self.seek_to_bar(bar),
            TransportMode::DraggingLoopStart => self.set_loop_start(bar),
            TransportMode::DraggingLoopEnd => self.set_loop_end(bar),
        }
        true
    }

    /// Pointer released; keeps whatever the drag already changed
    pub fn release(&mut self) {
        if !self.is_idle() {
            tracing::debug!(
                "{:?} finished: playhead {} loop {}..{}",
                self.mode,
                self.playhead_bar,
                self.loop_start,
                self.loop_end
            );
        }
        self.mode = TransportMode::Idle;
    }

    /// Pointer left the ruler; same as a release
    pub fn pointer_left(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrangement::ClipId;
    use crate::pattern::PatternId;

    fn gap_holds(clock: &TransportClock) -> bool {
        clock.loop_end() - clock.loop_start() >= MIN_LOOP_BARS - 1e-12
    }

    #[test]
    fn test_scrub_updates_playhead() {
        let mut clock = TransportClock::new();
        assert!(clock.begin_scrub(1.5));
        assert_eq!(clock.mode(), TransportMode::Scrubbing);
        assert_eq!(clock.playhead_bar(), 1.5);

        clock.pointer_moved(3.25);
        assert_eq!(clock.playhead_bar(), 3.25);
        clock.pointer_moved(-2.0);
        assert_eq!(clock.playhead_bar(), 0.0);

        clock.release();
        assert!(clock.is_idle());
        assert!(!clock.pointer_moved(5.0));
        assert_eq!(clock.playhead_bar(), 0.0);
    }

    #[test]
    fn test_scrub_ignored_while_dragging_loop() {
        let mut clock = TransportClock::new();
        clock.set_loop_enabled(true);
        assert!(clock.begin_loop_drag(LoopHandle::End));
        assert!(!clock.begin_scrub(2.0));
        assert!(!clock.begin_loop_drag(LoopHandle::Start));
        assert_eq!(clock.mode(), TransportMode::DraggingLoopEnd);
        assert_eq!(clock.playhead_bar(), 0.0);

        clock.pointer_left();
        assert!(clock.begin_scrub(2.0));
    }

    #[test]
    fn test_loop_end_clamped_to_min_gap() {
        let mut clock = TransportClock::new();
        clock.set_loop_enabled(true);
        clock.set_loop_region(2.0, 2.3);
        assert_eq!(clock.loop_end(), 2.5);

        clock.begin_loop_drag(LoopHandle::End);
        clock.pointer_moved(2.0);
        assert_eq!(clock.loop_end(), 2.5);
        clock.pointer_moved(6.0);
        assert_eq!(clock.loop_end(), 6.0);
    }

    #[test]
    fn test_loop_start_clamped_to_min_gap() {
        let mut clock = TransportClock::new();
        clock.set_loop_region(1.0, 3.0);
        clock.begin_loop_drag(LoopHandle::Start);
        clock.pointer_moved(5.0);
        assert_eq!(clock.loop_start(), 2.5);
        clock.pointer_moved(-1.0);
        assert_eq!(clock.loop_start(), 0.0);
        clock.release();
        // Partial motion is kept
        assert_eq!((clock.loop_start(), clock.loop_end()), (0.0, 3.0));
    }

    #[test]
    fn test_gap_holds_through_random_drags() {
        let mut rng = fastrand::Rng::with_seed(5);
        let mut clock = TransportClock::new();
        clock.set_loop_enabled(true);

        for _ in 0..1000 {
            let bar = rng.f64() * 20.0 - 4.0;
            match rng.u8(0..6) {
                0 => {
                    clock.press(bar, 0.5);
                }
                1 => clock.release(),
                2 => clock.set_loop_region(bar, rng.f64() * 20.0 - 4.0),
                _ => {
                    clock.pointer_moved(bar);
                }
            }
            assert!(gap_holds(&clock), "{}..{}", clock.loop_start(), clock.loop_end());
            assert!(clock.loop_start() >= 0.0);
        }
    }

    #[test]
    fn test_press_picks_handle_or_scrub() {
        let mut clock = TransportClock::new();
        clock.set_loop_region(2.0, 6.0);

        // Looping off: handles are not grabbable
        assert_eq!(clock.press(2.1, 0.25), TransportMode::Scrubbing);
        clock.release();

        clock.set_loop_enabled(true);
        assert_eq!(clock.press(2.1, 0.25), TransportMode::DraggingLoopStart);
        clock.release();
        assert_eq!(clock.press(5.9, 0.25), TransportMode::DraggingLoopEnd);
        clock.release();
        assert_eq!(clock.press(4.0, 0.25), TransportMode::Scrubbing);
        assert_eq!(clock.playhead_bar(), 4.0);
    }

    #[test]
    fn test_hit_test_prefers_nearer_handle() {
        let mut clock = TransportClock::new();
        clock.set_loop_region(1.0, 1.5);
        assert_eq!(clock.hit_test(1.4, 1.0), Some(LoopHandle::End));
        assert_eq!(clock.hit_test(1.25, 1.0), Some(LoopHandle::Start));
        assert_eq!(clock.hit_test(3.0, 0.5), None);
    }

    #[test]
    fn test_advance_wraps_inside_loop() {
        let mut clock = TransportClock::new();
        clock.set_loop_region(2.0, 4.0);
        clock.seek_to_bar(3.5);
        clock.advance(1.0);
        assert_eq!(clock.playhead_bar(), 4.5);

        clock.set_loop_enabled(true);
        clock.seek_to_bar(3.5);
        clock.advance(1.0);
        assert_eq!(clock.playhead_bar(), 2.5);
    }

    #[test]
    fn test_loop_clip_and_constrain() {
        let mut clock = TransportClock::new();
        let clip = ArrangementClip {
            id: ClipId(1),
            pattern_id: PatternId(1),
            start_bar: 8.0,
            length: 4.0,
            stack: 0,
        };
        clock.loop_clip(&clip);
        assert!(clock.loop_enabled());
        assert_eq!((clock.loop_start(), clock.loop_end()), (8.0, 12.0));

        clock.constrain_to_song(10.0);
        assert_eq!((clock.loop_start(), clock.loop_end()), (8.0, 10.0));
        clock.constrain_to_song(4.0);
        assert_eq!((clock.loop_start(), clock.loop_end()), (3.5, 4.0));
        clock.constrain_to_song(0.0);
        assert_eq!((clock.loop_start(), clock.loop_end()), (3.5, 4.0));
    }

    #[test]
    fn test_pointer_to_bar() {
        assert_eq!(pointer_to_bar(140.0, 20.0, 40.0, 0.0), 3.0);
        assert_eq!(pointer_to_bar(20.0, 20.0, 40.0, 2.0), 2.0);
        assert_eq!(pointer_to_bar(0.0, 20.0, 40.0, 0.0), 0.0);
        assert_eq!(pointer_to_bar(100.0, 0.0, 0.0, 1.0), 1.0);
    }

    #[test]
    fn test_toggle_loop() {
        let mut clock = TransportClock::new();
        assert!(!clock.loop_enabled());
        assert!(clock.toggle_loop());
        assert!(clock.loop_enabled());
        assert!(!clock.toggle_loop());
        assert!(!clock.loop_enabled());
    }

    #[test]
    fn test_deserialize_repairs_loop_gap() {
        let json = r#"{"playhead_bar":-3.0,"loop_enabled":true,"loop_start":2.0,"loop_end":2.1}"#;
        let clock: TransportClock = serde_json::from_str(json).unwrap();
        assert_eq!(clock.playhead_bar(), 0.0);
        assert_eq!(clock.loop_end(), 2.5);
        assert!(clock.loop_enabled());
        assert!(clock.is_idle());
    }
}
