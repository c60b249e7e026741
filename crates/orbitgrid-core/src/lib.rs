//! orbitgrid-core: Pattern, arrangement and transport engine for the orbitgrid sequencer

pub mod arrangement;
mod error;
pub mod pattern;
pub mod quantize;
pub mod rows;
pub mod session;
pub mod transport;

pub use arrangement::{pixel_to_bar, Arrangement, ArrangementClip, ClipId, StackSettings};
pub use error::{OrbitError, Result};
pub use pattern::{
    cell_count, hits_from_str, hits_to_string, resize,
    BaseLength, Lane, Pattern, PatternId, PatternLibrary, Subdivision, VisualSettings,
};
pub use quantize::{smart_quantize, MusicalParameter, ParameterConfig, SnapSet};
pub use rows::{Effect, Instrument, RowConfig, RowConfigManager, RowId, RowKind};
pub use session::{ClipView, SongSession};
pub use transport::{pointer_to_bar, LoopHandle, TransportClock, TransportMode, MIN_LOOP_BARS};
