//! Sequencer row configuration (instrument and effect lanes)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::OrbitError;

/// Unique identifier for sequencer rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub u64);

/// Percussion voice a row triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    Kick,
    Snare,
    HiHat,
    OpenHat,
    Clap,
    Rim,
    Tom,
    Cowbell,
    Shaker,
    Crash,
}

impl Instrument {
    pub const ALL: [Instrument; 10] = [
        Self::Kick,
        Self::Snare,
        Self::HiHat,
        Self::OpenHat,
        Self::Clap,
        Self::Rim,
        Self::Tom,
        Self::Cowbell,
        Self::Shaker,
        Self::Crash,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Kick => "Kick",
            Self::Snare => "Snare",
            Self::HiHat => "Hi-Hat",
            Self::OpenHat => "Open Hat",
            Self::Clap => "Clap",
            Self::Rim => "Rim",
            Self::Tom => "Tom",
            Self::Cowbell => "Cowbell",
            Self::Shaker => "Shaker",
            Self::Crash => "Crash",
        }
    }

    fn key(&self) -> &'static str {
        match self {
            Self::Kick => "kick",
            Self::Snare => "snare",
            Self::HiHat => "hihat",
            Self::OpenHat => "openhat",
            Self::Clap => "clap",
            Self::Rim => "rim",
            Self::Tom => "tom",
            Self::Cowbell => "cowbell",
            Self::Shaker => "shaker",
            Self::Crash => "crash",
        }
    }
}

impl FromStr for Instrument {
    type Err = OrbitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        Self::ALL
            .into_iter()
            .find(|i| i.key() == wanted)
            .ok_or_else(|| OrbitError::UnknownInstrument(s.to_string()))
    }
}

/// Effect a row toggles on the visualisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Flash,
    Pulse,
    Spin,
    Invert,
    Blur,
}

impl Effect {
    pub const ALL: [Effect; 5] = [Self::Flash, Self::Pulse, Self::Spin, Self::Invert, Self::Blur];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Flash => "Flash",
            Self::Pulse => "Pulse",
            Self::Spin => "Spin",
            Self::Invert => "Invert",
            Self::Blur => "Blur",
        }
    }
}

impl FromStr for Effect {
    type Err = OrbitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| OrbitError::UnknownEffect(s.to_string()))
    }
}

/// What a row drives: a percussion voice or a visual effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Instrument(Instrument),
    Effect(Effect),
}

impl RowKind {
    pub fn is_effect(&self) -> bool {
        matches!(self, Self::Effect(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Instrument(instrument) => instrument.name(),
            Self::Effect(effect) => effect.name(),
        }
    }
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instrument(instrument) => write!(f, "{}", instrument.name()),
            Self::Effect(effect) => write!(f, "FX {}", effect.name()),
        }
    }
}

/// Accepts `kick`, `hi-hat`, or `fx:flash` style names
impl FromStr for RowKind {
    type Err = OrbitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().strip_prefix("fx:") {
            Some(effect) => Ok(Self::Effect(effect.parse()?)),
            None => Ok(Self::Instrument(s.parse()?)),
        }
    }
}

/// A visible sequencer row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowConfig {
    pub id: RowId,
    pub kind: RowKind,
    /// Sparse sort key; only relative order matters
    pub order: u32,
}

impl RowConfig {
    pub fn is_effect(&self) -> bool {
        self.kind.is_effect()
    }
}

/// Ordered set of active rows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "RowConfigRecord")]
pub struct RowConfigManager {
    rows: Vec<RowConfig>,
    next_id: u64,
    next_order: u32,
}

#[derive(Deserialize)]
struct RowConfigRecord {
    #[serde(default)]
    rows: Vec<RowConfig>,
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    next_order: u32,
}

impl From<RowConfigRecord> for RowConfigManager {
    fn from(record: RowConfigRecord) -> Self {
        let mut rows = record.rows;
        rows.sort_by_key(|r| r.order);
        let mut seen_ids = HashSet::new();
        rows.retain(|r| seen_ids.insert(r.id));
        // Stored orders that collide are renumbered, keeping their relative order
        if rows.windows(2).any(|w| w[0].order == w[1].order) {
            for (order, row) in (0u32..).zip(rows.iter_mut()) {
                row.order = order;
            }
        }

        let highest_id = rows.iter().map(|r| r.id.0).max().unwrap_or(0);
        let next_order = rows.iter().map(|r| r.order.saturating_add(1)).max().unwrap_or(0);
        Self {
            rows,
            next_id: record.next_id.max(highest_id),
            next_order: record.next_order.max(next_order),
        }
    }
}

impl RowConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kick, snare and hi-hat, the rows a fresh session starts with
    pub fn with_default_rows() -> Self {
        let mut manager = Self::new();
        manager.add_row(Instrument::Kick);
        manager.add_row(Instrument::Snare);
        manager.add_row(Instrument::HiHat);
        manager
    }

    pub fn add_row(&mut self, instrument: Instrument) -> RowId {
        self.push(RowKind::Instrument(instrument))
    }

    pub fn add_effect_row(&mut self, effect: Effect) -> RowId {
        self.push(RowKind::Effect(effect))
    }

    fn push(&mut self, kind: RowKind) -> RowId {
        self.next_id += 1;
        let id = RowId(self.next_id);
        let order = self.next_order;
        self.next_order += 1;
        self.rows.push(RowConfig { id, kind, order });
        tracing::debug!("Added row {} ({}) at order {}", id.0, kind, order);
        id
    }

    /// Remove a row; remaining orders are left as they are
    pub fn remove_row(&mut self, id: RowId) -> Option<RowConfig> {
        let pos = self.rows.iter().position(|r| r.id == id)?;
        let removed = self.rows.remove(pos);
        tracing::debug!("Removed row {} ({})", id.0, removed.kind);
        Some(removed)
    }

    /// Swap with the preceding row. No-op at the top.
    pub fn move_row_up(&mut self, id: RowId) -> bool {
        let Some(target) = self.get(id).map(|r| r.order) else {
            tracing::trace!("move_row_up: unknown row {}", id.0);
            return false;
        };
        let neighbor = self
            .rows
            .iter()
            .filter(|r| r.order < target)
            .max_by_key(|r| r.order)
            .map(|r| r.id);
        self.swap_orders(id, neighbor)
    }

    /// Swap with the following row. No-op at the bottom.
    pub fn move_row_down(&mut self, id: RowId) -> bool {
        let Some(target) = self.get(id).map(|r| r.order) else {
            tracing::trace!("move_row_down: unknown row {}", id.0);
            return false;
        };
        let neighbor = self
            .rows
            .iter()
            .filter(|r| r.order > target)
            .min_by_key(|r| r.order)
            .map(|r| r.id);
        self.swap_orders(id, neighbor)
    }

    fn swap_orders(&mut self, id: RowId, neighbor: Option<RowId>) -> bool {
        let Some(neighbor) = neighbor else {
            return false;
        };
        let (Some(a), Some(b)) = (
            self.rows.iter().position(|r| r.id == id),
            self.rows.iter().position(|r| r.id == neighbor),
        ) else {
            return false;
        };
        let order = self.rows[a].order;
        self.rows[a].order = self.rows[b].order;
        self.rows[b].order = order;
        tracing::debug!("Swapped rows {} and {}", id.0, neighbor.0);
        true
    }

    pub fn get(&self, id: RowId) -> Option<&RowConfig> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Rows in display order
    pub fn rows(&self) -> Vec<RowConfig> {
        let mut rows = self.rows.clone();
        rows.sort_by_key(|r| r.order);
        rows
    }

    /// Display index of a row
    pub fn position(&self, id: RowId) -> Option<usize> {
        self.rows().iter().position(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(manager: &RowConfigManager) -> Vec<RowKind> {
        manager.rows().iter().map(|r| r.kind).collect()
    }

    #[test]
    fn test_add_rows_append_in_order() {
        let mut manager = RowConfigManager::new();
        manager.add_row(Instrument::Kick);
        manager.add_effect_row(Effect::Flash);
        manager.add_row(Instrument::Clap);

        assert_eq!(
            kinds(&manager),
            vec![
                RowKind::Instrument(Instrument::Kick),
                RowKind::Effect(Effect::Flash),
                RowKind::Instrument(Instrument::Clap),
            ]
        );
        assert!(manager.rows()[1].is_effect());
    }

    #[test]
    fn test_remove_keeps_relative_order() {
        let mut manager = RowConfigManager::with_default_rows();
        let snare = manager.rows()[1].id;
        let removed = manager.remove_row(snare);

        assert!(removed.is_some());
        assert_eq!(
            kinds(&manager),
            vec![RowKind::Instrument(Instrument::Kick), RowKind::Instrument(Instrument::HiHat)]
        );
        // Orders are not renumbered
        assert_eq!(manager.rows()[1].order, 2);
        assert!(manager.remove_row(snare).is_none());
    }

    #[test]
    fn test_move_swaps_with_neighbor() {
        let mut manager = RowConfigManager::with_default_rows();
        let hihat = manager.rows()[2].id;

        assert!(manager.move_row_up(hihat));
        assert_eq!(manager.position(hihat), Some(1));
        assert!(manager.move_row_up(hihat));
        assert_eq!(manager.position(hihat), Some(0));
        assert!(manager.move_row_down(hihat));
        assert_eq!(manager.position(hihat), Some(1));
    }

    #[test]
    fn test_move_at_edges_is_noop() {
        let mut manager = RowConfigManager::with_default_rows();
        let first = manager.rows()[0].id;
        let last = manager.rows()[2].id;
        let before = manager.rows();

        assert!(!manager.move_row_up(first));
        assert!(!manager.move_row_down(last));
        assert!(!manager.move_row_up(RowId(999)));
        assert_eq!(manager.rows(), before);
    }

    #[test]
    fn test_move_across_removed_gap() {
        let mut manager = RowConfigManager::with_default_rows();
        let rows = manager.rows();
        manager.remove_row(rows[1].id);

        assert!(manager.move_row_up(rows[2].id));
        assert_eq!(manager.position(rows[2].id), Some(0));
    }

    #[test]
    fn test_orders_stay_unique() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mut manager = RowConfigManager::new();
        let mut live = Vec::new();

        for _ in 0..200 {
            match rng.u8(0..5) {
                0 | 1 => live.push(manager.add_row(Instrument::ALL[rng.usize(0..10)])),
                2 if !live.is_empty() => {
                    let id = live.swap_remove(rng.usize(0..live.len()));
                    manager.remove_row(id);
                }
                3 if !live.is_empty() => {
                    manager.move_row_up(live[rng.usize(0..live.len())]);
                }
                _ if !live.is_empty() => {
                    manager.move_row_down(live[rng.usize(0..live.len())]);
                }
                _ => {}
            }
        }

        let rows = manager.rows();
        assert_eq!(rows.len(), live.len());
        assert!(rows.windows(2).all(|w| w[0].order < w[1].order));
        assert!(live.iter().all(|id| manager.get(*id).is_some()));
    }

    #[test]
    fn test_parse_row_kind() {
        assert_eq!("hi-hat".parse::<RowKind>(), Ok(RowKind::Instrument(Instrument::HiHat)));
        assert_eq!("fx:spin".parse::<RowKind>(), Ok(RowKind::Effect(Effect::Spin)));
        assert!("theremin".parse::<RowKind>().is_err());
    }

    #[test]
    fn test_load_with_stale_counters() {
        let manager = RowConfigManager::with_default_rows();
        let mut value = serde_json::to_value(&manager).unwrap();
        value["next_id"] = serde_json::json!(0);
        value["next_order"] = serde_json::json!(0);
        let mut loaded: RowConfigManager = serde_json::from_value(value).unwrap();

        let clap = loaded.add_row(Instrument::Clap);
        let ids: HashSet<RowId> = loaded.rows().iter().map(|r| r.id).collect();
        let orders: HashSet<u32> = loaded.rows().iter().map(|r| r.order).collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(orders.len(), 4);
        assert_eq!(loaded.position(clap), Some(3));
    }

    #[test]
    fn test_load_renumbers_colliding_orders() {
        let manager = RowConfigManager::with_default_rows();
        let mut value = serde_json::to_value(&manager).unwrap();
        for row in value["rows"].as_array_mut().unwrap() {
            row["order"] = serde_json::json!(5);
        }
        let mut loaded: RowConfigManager = serde_json::from_value(value).unwrap();

        let orders: HashSet<u32> = loaded.rows().iter().map(|r| r.order).collect();
        assert_eq!(orders.len(), 3);
        assert_eq!(
            kinds(&loaded),
            vec![
                RowKind::Instrument(Instrument::Kick),
                RowKind::Instrument(Instrument::Snare),
                RowKind::Instrument(Instrument::HiHat),
            ]
        );
        let snare = loaded.rows()[1].id;
        assert!(loaded.move_row_up(snare));
        assert_eq!(kinds(&loaded)[0], RowKind::Instrument(Instrument::Snare));
    }
}
