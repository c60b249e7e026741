//! Hit patterns, per-row lanes and nearest-neighbour resampling

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{OrbitError, Result};
use crate::rows::{Instrument, RowConfig, RowKind};

// ============================================================================
// Resampling
// ============================================================================

/// Resize a hit pattern to `new_len` cells
///
/// Target cell `i` copies source cell `floor(i / new_len * old_len)`. This is
/// lossy: shrinking can drop hits for good, growing repeats neighbours.
///
/// # Example
/// ```
/// use orbitgrid_core::resize;
/// let hits = [true, false, true, false];
/// assert_eq!(resize(&hits, 2), vec![true, true]);
/// assert_eq!(resize(&hits, 8).len(), 8);
/// ```
pub fn resize(pattern: &[bool], new_len: usize) -> Vec<bool> {
    let old_len = pattern.len();
    (0..new_len)
        .map(|i| pattern.get(i * old_len / new_len).copied().unwrap_or(false))
        .collect()
}

/// Parse a hit string such as `x..x..x.`
pub fn hits_from_str(s: &str) -> Result<Vec<bool>> {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .enumerate()
        .map(|(step, ch)| match ch {
            'x' | 'X' | '1' | '#' => Ok(true),
            '.' | '-' | '0' | '_' => Ok(false),
            _ => Err(OrbitError::InvalidHit { ch, step }),
        })
        .collect()
}

pub fn hits_to_string(hits: &[bool]) -> String {
    hits.iter().map(|&h| if h { 'x' } else { '.' }).collect()
}

// ============================================================================
// Subdivision and base length
// ============================================================================

/// Cells per beat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum Subdivision {
    Quarter,
    Half,
    Whole,
    Double,
    #[default]
    Quadruple,
}

impl Subdivision {
    pub const ALL: [Subdivision; 5] = [
        Self::Quarter,
        Self::Half,
        Self::Whole,
        Self::Double,
        Self::Quadruple,
    ];

    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Quarter => 0.25,
            Self::Half => 0.5,
            Self::Whole => 1.0,
            Self::Double => 2.0,
            Self::Quadruple => 4.0,
        }
    }

    /// Next subdivision, wrapping from 4 back to 0.25
    pub fn next(&self) -> Self {
        match self {
            Self::Quarter => Self::Half,
            Self::Half => Self::Whole,
            Self::Whole => Self::Double,
            Self::Double => Self::Quadruple,
            Self::Quadruple => Self::Quarter,
        }
    }
}

impl TryFrom<f64> for Subdivision {
    type Error = OrbitError;

    fn try_from(value: f64) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|s| (s.multiplier() - value).abs() < 1e-9)
            .ok_or_else(|| OrbitError::InvalidSubdivision(value.to_string()))
    }
}

impl From<Subdivision> for f64 {
    fn from(value: Subdivision) -> Self {
        value.multiplier()
    }
}

impl FromStr for Subdivision {
    type Err = OrbitError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches(['x', '×']).trim_end_matches(['x', '×']);
        let value = match trimmed {
            "1/4" => 0.25,
            "1/2" => 0.5,
            other => other
                .parse::<f64>()
                .map_err(|_| OrbitError::InvalidSubdivision(s.to_string()))?,
        };
        Self::try_from(value)
    }
}

impl fmt::Display for Subdivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}

/// Allowed pattern lengths in beats, in cycling order
pub const BASE_LENGTHS: [u32; 9] = [2, 3, 4, 5, 6, 7, 8, 12, 16];

/// Pattern length in beats, restricted to [`BASE_LENGTHS`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BaseLength(u32);

impl Default for BaseLength {
    fn default() -> Self {
        Self(4)
    }
}

impl BaseLength {
    pub fn beats(&self) -> u32 {
        self.0
    }

    /// Next allowed length, wrapping from the longest to the shortest
    pub fn next(&self) -> Self {
        let idx = BASE_LENGTHS.iter().position(|&b| b == self.0).unwrap_or(0);
        Self(BASE_LENGTHS[(idx + 1) % BASE_LENGTHS.len()])
    }
}

impl TryFrom<u32> for BaseLength {
    type Error = OrbitError;

    fn try_from(beats: u32) -> Result<Self> {
        if BASE_LENGTHS.contains(&beats) {
            Ok(Self(beats))
        } else {
            Err(OrbitError::InvalidBaseLength(beats))
        }
    }
}

impl From<BaseLength> for u32 {
    fn from(value: BaseLength) -> Self {
        value.0
    }
}

/// Number of cells for a lane: `round(base × subdivision)`
pub fn cell_count(base: BaseLength, subdivision: Subdivision) -> usize {
    (base.beats() as f64 * subdivision.multiplier()).round() as usize
}

// ============================================================================
// Lanes
// ============================================================================

/// Hit pattern for one row of a pattern
///
/// Fields are private so the cell count can never disagree with the
/// subdivision and base length it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LaneRecord")]
pub struct Lane {
    kind: RowKind,
    hits: Vec<bool>,
    subdivision: Subdivision,
    base_length: BaseLength,
}

/// Wire shape of a lane; normalised on load
#[derive(Deserialize)]
struct LaneRecord {
    kind: RowKind,
    #[serde(default)]
    hits: Vec<bool>,
    #[serde(default)]
    subdivision: Subdivision,
    #[serde(default)]
    base_length: BaseLength,
}

impl From<LaneRecord> for Lane {
    fn from(record: LaneRecord) -> Self {
        let len = cell_count(record.base_length, record.subdivision);
        let hits = if record.hits.len() == len {
            record.hits
        } else {
            resize(&record.hits, len)
        };
        Self {
            kind: record.kind,
            hits,
            subdivision: record.subdivision,
            base_length: record.base_length,
        }
    }
}

impl Lane {
    pub fn new(kind: RowKind) -> Self {
        Self::with_shape(kind, BaseLength::default(), Subdivision::default())
    }

    pub fn with_shape(kind: RowKind, base_length: BaseLength, subdivision: Subdivision) -> Self {
        Self {
            kind,
            hits: vec![false; cell_count(base_length, subdivision)],
            subdivision,
            base_length,
        }
    }

    pub fn kind(&self) -> RowKind {
        self.kind
    }

    pub fn hits(&self) -> &[bool] {
        &self.hits
    }

    pub fn subdivision(&self) -> Subdivision {
        self.subdivision
    }

    pub fn base_length(&self) -> BaseLength {
        self.base_length
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Flip one cell. Out of range steps are ignored.
    pub fn toggle(&mut self, step: usize) -> bool {
        let Some(cell) = self.hits.get_mut(step) else {
            tracing::trace!("toggle: step {} outside {} cells", step, self.hits.len());
            return false;
        };
        *cell = !*cell;
        true
    }

    /// Replace the hits, resampling to the current cell count
    pub fn set_hits(&mut self, hits: &[bool]) {
        self.hits = resize(hits, self.hits.len());
    }

    pub fn clear(&mut self) {
        self.hits.iter_mut().for_each(|h| *h = false);
    }

    pub fn active_steps(&self) -> Vec<usize> {
        self.hits
            .iter()
            .enumerate()
            .filter_map(|(i, &h)| h.then_some(i))
            .collect()
    }

    /// Change the subdivision, resampling the hits in the same step
    pub fn set_subdivision(&mut self, subdivision: Subdivision) {
        self.reshape(self.base_length, subdivision);
    }

    pub fn cycle_subdivision(&mut self) -> Subdivision {
        self.set_subdivision(self.subdivision.next());
        self.subdivision
    }

    /// Change the base length, resampling the hits in the same step
    pub fn set_base_length(&mut self, base_length: BaseLength) {
        self.reshape(base_length, self.subdivision);
    }

    pub fn cycle_base_length(&mut self) -> BaseLength {
        self.set_base_length(self.base_length.next());
        self.base_length
    }

    fn reshape(&mut self, base_length: BaseLength, subdivision: Subdivision) {
        let new_len = cell_count(base_length, subdivision);
        let hits = resize(&self.hits, new_len);
        tracing::debug!(
            "Reshaped {} lane: {} beats x {} -> {} cells (was {})",
            self.kind,
            base_length.beats(),
            subdivision,
            new_len,
            self.hits.len()
        );
        *self = Self {
            kind: self.kind,
            hits,
            subdivision,
            base_length,
        };
    }
}

// ============================================================================
// Patterns
// ============================================================================

/// Unique identifier for patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternId(pub u64);

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Per-pattern visual tweaks consumed by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualSettings {
    pub orbit_scale: f64,
    pub rotation: f64,
    pub swing: f64,
}

impl Default for VisualSettings {
    fn default() -> Self {
        Self {
            orbit_scale: 1.0,
            rotation: 0.0,
            swing: 50.0,
        }
    }
}

/// A named set of lanes, placed in the arrangement by reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    pub name: String,
    /// Length in bars when placed in the arrangement
    pub bars: u32,
    /// Lead voice shown on the pattern chip
    pub instrument: Instrument,
    #[serde(default)]
    pub lanes: Vec<Lane>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_rows: Option<Vec<RowConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_settings: Option<VisualSettings>,
}

impl Pattern {
    pub fn new(id: PatternId, name: impl Into<String>, bars: u32) -> Self {
        Self {
            id,
            name: name.into(),
            bars: bars.max(1),
            instrument: Instrument::Kick,
            lanes: Vec::new(),
            visible_rows: None,
            visual_settings: None,
        }
    }

    pub fn lane(&self, kind: RowKind) -> Option<&Lane> {
        self.lanes.iter().find(|l| l.kind == kind)
    }

    pub fn lane_mut(&mut self, kind: RowKind) -> Option<&mut Lane> {
        self.lanes.iter_mut().find(|l| l.kind == kind)
    }

    /// Lane for `kind`, created empty with default shape if missing
    pub fn ensure_lane(&mut self, kind: RowKind) -> &mut Lane {
        let idx = match self.lanes.iter().position(|l| l.kind == kind) {
            Some(idx) => idx,
            None => {
                self.lanes.push(Lane::new(kind));
                self.lanes.len() - 1
            }
        };
        &mut self.lanes[idx]
    }

    /// True when no lane has any hit
    pub fn is_silent(&self) -> bool {
        self.lanes.iter().all(|l| l.hits.iter().all(|h| !h))
    }
}

/// All patterns in a song
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "PatternLibraryRecord")]
pub struct PatternLibrary {
    patterns: Vec<Pattern>,
    next_id: u64,
}

#[derive(Deserialize)]
struct PatternLibraryRecord {
    #[serde(default)]
    patterns: Vec<Pattern>,
    #[serde(default)]
    next_id: u64,
}

impl From<PatternLibraryRecord> for PatternLibrary {
    fn from(record: PatternLibraryRecord) -> Self {
        let highest = record.patterns.iter().map(|p| p.id.0).max().unwrap_or(0);
        Self {
            patterns: record.patterns,
            next_id: record.next_id.max(highest),
        }
    }
}

impl PatternLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pattern(&mut self, name: impl Into<String>, bars: u32) -> PatternId {
        self.next_id += 1;
        let id = PatternId(self.next_id);
        let pattern = Pattern::new(id, name, bars);
        tracing::debug!("Added pattern {} '{}' ({} bars)", id, pattern.name, pattern.bars);
        self.patterns.push(pattern);
        id
    }

    /// Remove a pattern. Clips referring to it are left dangling.
    pub fn remove_pattern(&mut self, id: PatternId) -> Option<Pattern> {
        let pos = self.patterns.iter().position(|p| p.id == id)?;
        tracing::debug!("Removed pattern {}", id);
        Some(self.patterns.remove(pos))
    }

    /// Copy a pattern under a new identity
    pub fn duplicate_pattern(&mut self, id: PatternId) -> Option<PatternId> {
        let mut copy = self.get(id)?.clone();
        self.next_id += 1;
        copy.id = PatternId(self.next_id);
        copy.name = format!("{} copy", copy.name);
        let new_id = copy.id;
        self.patterns.push(copy);
        tracing::debug!("Duplicated pattern {} as {}", id, new_id);
        Some(new_id)
    }

    pub fn get(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PatternId) -> Option<&mut Pattern> {
        self.patterns.iter_mut().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
