//! Multi-stack arrangement timeline of pattern clips

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::pattern::PatternId;
use crate::quantize::MusicalParameter;

/// Unique identifier for clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(pub u64);

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A pattern placed on a stack at a bar offset
///
/// `pattern_id` is a weak reference: the pattern may have been deleted since.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrangementClip {
    pub id: ClipId,
    pub pattern_id: PatternId,
    /// Start position in bars (>= 0)
    pub start_bar: f64,
    /// Length in bars (> 0)
    pub length: f64,
    /// Parallel track index
    pub stack: usize,
}

impl ArrangementClip {
    /// End position in bars (start + length)
    pub fn end_bar(&self) -> f64 {
        self.start_bar + self.length
    }

    /// Whether `bar` falls inside `[start, end)`
    pub fn contains_bar(&self, bar: f64) -> bool {
        bar >= self.start_bar && bar < self.end_bar()
    }

    pub fn overlaps(&self, other: &ArrangementClip) -> bool {
        self.start_bar < other.end_bar() && other.start_bar < self.end_bar()
    }
}

/// Per-stack visual transform, read by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackSettings {
    pub flip_y: bool,
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    /// 0.0 to 1.0
    pub opacity: f64,
    /// Degrees, 0.0 to 360.0
    pub rotation: f64,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            flip_y: false,
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            opacity: 1.0,
            rotation: 0.0,
        }
    }
}

impl StackSettings {
    /// Pull every field back into its valid range
    pub fn normalized(self) -> Self {
        let finite_or = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };
        Self {
            flip_y: self.flip_y,
            scale: if self.scale > 0.0 && self.scale.is_finite() { self.scale } else { 1.0 },
            offset_x: finite_or(self.offset_x, 0.0),
            offset_y: finite_or(self.offset_y, 0.0),
            opacity: finite_or(self.opacity, 1.0).clamp(0.0, 1.0),
            rotation: finite_or(self.rotation, 0.0).rem_euclid(360.0),
        }
    }

    /// Numeric value of the field a parameter controls (0.0 for others)
    pub fn field(&self, param: MusicalParameter) -> f64 {
        match param {
            MusicalParameter::OrbitScale => self.scale,
            MusicalParameter::Rotation => self.rotation,
            MusicalParameter::Opacity => self.opacity,
            MusicalParameter::OffsetX => self.offset_x,
            MusicalParameter::OffsetY => self.offset_y,
            MusicalParameter::Tempo
            | MusicalParameter::Subdivision
            | MusicalParameter::Swing => 0.0,
        }
    }
}

/// Convert a pointer offset in pixels to a whole bar index
///
/// `bar = round((pixel_offset - grab_offset) / cell_pixel_width)`. A width
/// that is not a positive finite number maps everything to bar 0.
pub fn pixel_to_bar(pixel_offset: f64, grab_offset: f64, cell_pixel_width: f64) -> f64 {
    if !(cell_pixel_width > 0.0 && cell_pixel_width.is_finite()) {
        return 0.0;
    }
    let bar = ((pixel_offset - grab_offset) / cell_pixel_width).round();
    if bar.is_finite() { bar } else { 0.0 }
}

/// Clamp to >= 0 and round to the timeline cell (one bar)
fn snap_start_bar(bar: f64) -> f64 {
    if bar.is_finite() { bar.max(0.0).round() } else { 0.0 }
}

/// All clips in the song, grouped into stacks by index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "ArrangementRecord")]
pub struct Arrangement {
    clips: Vec<ArrangementClip>,
    stack_settings: BTreeMap<usize, StackSettings>,
    next_clip_id: u64,
}

#[derive(Deserialize)]
struct ArrangementRecord {
    #[serde(default)]
    clips: Vec<ArrangementClip>,
    #[serde(default)]
    stack_settings: BTreeMap<usize, StackSettings>,
    #[serde(default)]
    next_clip_id: u64,
}

/// A stored counter never trails the ids already in use
impl From<ArrangementRecord> for Arrangement {
    fn from(record: ArrangementRecord) -> Self {
        let highest = record.clips.iter().map(|c| c.id.0).max().unwrap_or(0);
        Self {
            clips: record.clips,
            stack_settings: record
                .stack_settings
                .into_iter()
                .map(|(stack, settings)| (stack, settings.normalized()))
                .collect(),
            next_clip_id: record.next_clip_id.max(highest),
        }
    }
}

impl Arrangement {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&mut self) -> ClipId {
        self.next_clip_id += 1;
        ClipId(self.next_clip_id)
    }

    /// Append a clip after the last clip on `stack`
    ///
    /// A stack index past the current count creates that stack.
    pub fn add_clip(&mut self, pattern_id: PatternId, length_bars: f64, stack: usize) -> ClipId {
        let start_bar = self
            .clips
            .iter()
            .filter(|c| c.stack == stack)
            .map(|c| c.end_bar())
            .fold(0.0, f64::max);
        let length = if length_bars > 0.0 && length_bars.is_finite() { length_bars } else { 1.0 };

        let id = self.alloc_id();
        self.clips.push(ArrangementClip {
            id,
            pattern_id,
            start_bar,
            length,
            stack,
        });
        tracing::debug!(
            "Added clip {} ({}) at bar {} on stack {}",
            id,
            pattern_id,
            start_bar,
            stack
        );
        id
    }

    pub fn remove_clip(&mut self, id: ClipId) -> Option<ArrangementClip> {
        let pos = self.clips.iter().position(|c| c.id == id)?;
        tracing::debug!("Removed clip {}", id);
        Some(self.clips.remove(pos))
    }

    /// Move a clip. Unknown ids are ignored. Overlaps are not resolved.
    pub fn move_clip(&mut self, id: ClipId, new_start_bar: f64, new_stack: Option<usize>) -> bool {
        let Some(clip) = self.clips.iter_mut().find(|c| c.id == id) else {
            tracing::trace!("move_clip: unknown clip {}", id);
            return false;
        };
        clip.start_bar = snap_start_bar(new_start_bar);
        clip.stack = new_stack.unwrap_or(clip.stack);
        tracing::debug!("Moved clip {} to bar {} on stack {}", id, clip.start_bar, clip.stack);
        true
    }

    /// Copy a clip to a new position under a new id. Unknown ids are ignored.
    pub fn duplicate_clip(
        &mut self,
        id: ClipId,
        new_start_bar: f64,
        new_stack: Option<usize>,
    ) -> Option<ClipId> {
        let Some(source) = self.clip(id).copied() else {
            tracing::trace!("duplicate_clip: unknown clip {}", id);
            return None;
        };
        let new_id = self.alloc_id();
        let copy = ArrangementClip {
            id: new_id,
            start_bar: snap_start_bar(new_start_bar),
            stack: new_stack.unwrap_or(source.stack),
            ..source
        };
        tracing::debug!(
            "Duplicated clip {} as {} at bar {} on stack {}",
            id,
            new_id,
            copy.start_bar,
            copy.stack
        );
        self.clips.push(copy);
        Some(new_id)
    }

    /// Highest referenced stack + 1, never less than 1
    pub fn stack_count(&self) -> usize {
        self.clips
            .iter()
            .map(|c| c.stack + 1)
            .max()
            .unwrap_or(1)
            .max(1)
    }

    /// Delete every clip on `stack` and shift higher stacks down by one
    pub fn remove_stack(&mut self, stack: usize) -> Vec<ArrangementClip> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.clips.drain(..).partition(|c| c.stack == stack);
        self.clips = kept
            .into_iter()
            .map(|c| ArrangementClip {
                stack: if c.stack > stack { c.stack - 1 } else { c.stack },
                ..c
            })
            .collect();

        self.stack_settings = std::mem::take(&mut self.stack_settings)
            .into_iter()
            .filter(|(idx, _)| *idx != stack)
            .map(|(idx, s)| if idx > stack { (idx - 1, s) } else { (idx, s) })
            .collect();

        tracing::debug!("Removed stack {} ({} clips)", stack, removed.len());
        removed
    }

    pub fn clip(&self, id: ClipId) -> Option<&ArrangementClip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn clips(&self) -> &[ArrangementClip] {
        &self.clips
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Clips on one stack, ordered by start bar
    pub fn clips_on_stack(&self, stack: usize) -> Vec<ArrangementClip> {
        let mut clips: Vec<_> = self.clips.iter().filter(|c| c.stack == stack).copied().collect();
        clips.sort_by(|a, b| a.start_bar.total_cmp(&b.start_bar).then(a.id.cmp(&b.id)));
        clips
    }

    /// Pairs of clips on `stack` whose bar ranges intersect
    ///
    /// Overlap is a valid state; playback plays every clip covering a bar.
    pub fn overlapping_clips(&self, stack: usize) -> Vec<(ClipId, ClipId)> {
        let clips = self.clips_on_stack(stack);
        clips
            .iter()
            .enumerate()
            .flat_map(|(i, a)| {
                clips[i + 1..]
                    .iter()
                    .filter(move |b| a.overlaps(b))
                    .map(move |b| (a.id, b.id))
            })
            .collect()
    }

    /// Clips covering `bar` on any stack
    pub fn active_clips_at(&self, bar: f64) -> Vec<ArrangementClip> {
        self.clips.iter().filter(|c| c.contains_bar(bar)).copied().collect()
    }

    /// End of the last clip in bars, 0 when empty
    pub fn song_length_bars(&self) -> f64 {
        self.clips.iter().map(|c| c.end_bar()).fold(0.0, f64::max)
    }

    /// Stored settings for `stack`, or the default record
    pub fn stack_settings(&self, stack: usize) -> StackSettings {
        self.stack_settings.get(&stack).copied().unwrap_or_default()
    }

    pub fn set_stack_settings(&mut self, stack: usize, settings: StackSettings) {
        self.stack_settings.insert(stack, settings.normalized());
    }
}
