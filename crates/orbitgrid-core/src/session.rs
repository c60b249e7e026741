//! Song session: the single owner of patterns, rows, arrangement and transport

use serde::{Deserialize, Serialize};

use crate::arrangement::{Arrangement, ArrangementClip, ClipId};
use crate::pattern::{BaseLength, Pattern, PatternId, PatternLibrary, Subdivision, VisualSettings};
use crate::quantize::MusicalParameter;
use crate::rows::{Effect, Instrument, RowConfigManager, RowId, RowKind};
use crate::transport::TransportClock;

/// A clip as the renderer sees it
#[derive(Debug, Clone, Copy)]
pub enum ClipView<'a> {
    Live {
        clip: &'a ArrangementClip,
        pattern: &'a Pattern,
    },
    /// The referenced pattern was deleted
    MissingPattern { clip: &'a ArrangementClip },
}

impl<'a> ClipView<'a> {
    pub fn clip(&self) -> &'a ArrangementClip {
        match *self {
            Self::Live { clip, .. } | Self::MissingPattern { clip } => clip,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingPattern { .. })
    }

    pub fn label(&self) -> String {
        match self {
            Self::Live { pattern, .. } => pattern.name.clone(),
            Self::MissingPattern { clip } => format!("missing pattern {}", clip.pattern_id),
        }
    }
}

fn default_tempo() -> f64 {
    120.0
}

/// Whole editable song state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongSession {
    #[serde(default)]
    pub patterns: PatternLibrary,
    #[serde(default)]
    pub rows: RowConfigManager,
    #[serde(default)]
    pub arrangement: Arrangement,
    #[serde(default)]
    pub transport: TransportClock,
    #[serde(default = "default_tempo")]
    tempo_bpm: f64,
}

impl Default for SongSession {
    fn default() -> Self {
        Self {
            patterns: PatternLibrary::new(),
            rows: RowConfigManager::with_default_rows(),
            arrangement: Arrangement::new(),
            transport: TransportClock::new(),
            tempo_bpm: default_tempo(),
        }
    }
}

impl SongSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm
    }

    /// Snap and store a tempo; returns the stored value
    pub fn set_tempo(&mut self, raw_bpm: f64) -> f64 {
        self.tempo_bpm = MusicalParameter::Tempo.quantize(raw_bpm);
        tracing::debug!("Tempo set to {} (requested {})", self.tempo_bpm, raw_bpm);
        self.tempo_bpm
    }

    // ------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------

    /// New pattern with an empty lane for every current row
    pub fn add_pattern(&mut self, name: impl Into<String>, bars: u32) -> PatternId {
        let id = self.patterns.add_pattern(name, bars);
        let kinds: Vec<RowKind> = self.rows.rows().iter().map(|r| r.kind).collect();
        if let Some(pattern) = self.patterns.get_mut(id) {
            for kind in kinds {
                pattern.ensure_lane(kind);
            }
        }
        id
    }

    /// Remove a pattern; clips that used it become missing-pattern clips
    pub fn remove_pattern(&mut self, id: PatternId) -> Option<Pattern> {
        let removed = self.patterns.remove_pattern(id)?;
        let dangling = self.arrangement.clips().iter().filter(|c| c.pattern_id == id).count();
        if dangling > 0 {
            tracing::debug!("{} clips now reference missing pattern {}", dangling, id);
        }
        Some(removed)
    }

    pub fn toggle_hit(&mut self, pattern_id: PatternId, kind: RowKind, step: usize) -> bool {
        self.patterns
            .get_mut(pattern_id)
            .is_some_and(|p| p.ensure_lane(kind).toggle(step))
    }

    pub fn cycle_subdivision(
        &mut self,
        pattern_id: PatternId,
        kind: RowKind,
    ) -> Option<Subdivision> {
        let pattern = self.patterns.get_mut(pattern_id)?;
        Some(pattern.ensure_lane(kind).cycle_subdivision())
    }

    pub fn cycle_base_length(
        &mut self,
        pattern_id: PatternId,
        kind: RowKind,
    ) -> Option<BaseLength> {
        let pattern = self.patterns.get_mut(pattern_id)?;
        Some(pattern.ensure_lane(kind).cycle_base_length())
    }

    /// Quantize and store a per-pattern visual parameter
    ///
    /// Only orbit scale, rotation and swing live on a pattern.
    pub fn set_pattern_visual(
        &mut self,
        pattern_id: PatternId,
        param: MusicalParameter,
        raw: f64,
    ) -> Option<f64> {
        if !matches!(
            param,
            MusicalParameter::OrbitScale | MusicalParameter::Rotation | MusicalParameter::Swing
        ) {
            return None;
        }
        let pattern = self.patterns.get_mut(pattern_id)?;
        let value = param.quantize(raw);
        let visual = pattern.visual_settings.get_or_insert_with(VisualSettings::default);
        match param {
            MusicalParameter::OrbitScale => visual.orbit_scale = value,
            MusicalParameter::Rotation => visual.rotation = value,
            _ => visual.swing = value,
        }
        Some(value)
    }

    // ------------------------------------------------------------------
    // Rows
    // ------------------------------------------------------------------

    pub fn add_row(&mut self, instrument: Instrument) -> RowId {
        self.rows.add_row(instrument)
    }

    pub fn add_effect_row(&mut self, effect: Effect) -> RowId {
        self.rows.add_effect_row(effect)
    }

    /// Hide a row. Lanes already recorded in patterns are kept.
    pub fn remove_row(&mut self, id: RowId) -> bool {
        self.rows.remove_row(id).is_some()
    }

    pub fn move_row_up(&mut self, id: RowId) -> bool {
        self.rows.move_row_up(id)
    }

    pub fn move_row_down(&mut self, id: RowId) -> bool {
        self.rows.move_row_down(id)
    }

    // ------------------------------------------------------------------
    // Arrangement
    // ------------------------------------------------------------------

    /// Append a clip of `pattern_id` to `stack`, sized to the pattern's bars
    pub fn add_clip(&mut self, pattern_id: PatternId, stack: usize) -> Option<ClipId> {
        let Some(bars) = self.patterns.get(pattern_id).map(|p| p.bars) else {
            tracing::trace!("add_clip: unknown pattern {}", pattern_id);
            return None;
        };
        Some(self.arrangement.add_clip(pattern_id, bars as f64, stack))
    }

    pub fn move_clip(&mut self, id: ClipId, new_start_bar: f64, new_stack: Option<usize>) -> bool {
        self.arrangement.move_clip(id, new_start_bar, new_stack)
    }

    pub fn duplicate_clip(
        &mut self,
        id: ClipId,
        new_start_bar: f64,
        new_stack: Option<usize>,
    ) -> Option<ClipId> {
        self.arrangement.duplicate_clip(id, new_start_bar, new_stack)
    }

    pub fn remove_clip(&mut self, id: ClipId) -> Option<ArrangementClip> {
        self.arrangement.remove_clip(id)
    }

    pub fn stack_count(&self) -> usize {
        self.arrangement.stack_count()
    }

    /// Quantize and store one stack transform field
    ///
    /// Tempo, subdivision and swing are not stack settings and return `None`.
    pub fn set_stack_param(
        &mut self,
        stack: usize,
        param: MusicalParameter,
        raw: f64,
    ) -> Option<f64> {
        let mut settings = self.arrangement.stack_settings(stack);
        let value = param.quantize(raw);
        match param {
            MusicalParameter::OrbitScale => settings.scale = value,
            MusicalParameter::Rotation => settings.rotation = value,
            MusicalParameter::Opacity => settings.opacity = value,
            MusicalParameter::OffsetX => settings.offset_x = value,
            MusicalParameter::OffsetY => settings.offset_y = value,
            MusicalParameter::Tempo | MusicalParameter::Subdivision | MusicalParameter::Swing => {
                return None;
            }
        }
        self.arrangement.set_stack_settings(stack, settings);
        Some(self.arrangement.stack_settings(stack).field(param))
    }

    pub fn resolve_clip(&self, id: ClipId) -> Option<ClipView<'_>> {
        self.arrangement.clip(id).map(|clip| self.view(clip))
    }

    /// Every clip on a stack in timeline order, with its pattern resolved
    pub fn stack_views(&self, stack: usize) -> Vec<ClipView<'_>> {
        let mut views: Vec<_> = self
            .arrangement
            .clips()
            .iter()
            .filter(|c| c.stack == stack)
            .map(|c| self.view(c))
            .collect();
        views.sort_by(|a, b| a.clip().start_bar.total_cmp(&b.clip().start_bar));
        views
    }

    fn view<'a>(&'a self, clip: &'a ArrangementClip) -> ClipView<'a> {
        match self.patterns.get(clip.pattern_id) {
            Some(pattern) => ClipView::Live { clip, pattern },
            None => ClipView::MissingPattern { clip },
        }
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    /// Loop over one clip. Unknown ids are ignored.
    pub fn loop_clip(&mut self, id: ClipId) -> bool {
        let Some(clip) = self.arrangement.clip(id).copied() else {
            return false;
        };
        self.transport.loop_clip(&clip);
        true
    }

    /// Keep the loop region inside the arranged song
    pub fn constrain_loop_to_song(&mut self) {
        self.transport.constrain_to_song(self.arrangement.song_length_bars());
    }
}
