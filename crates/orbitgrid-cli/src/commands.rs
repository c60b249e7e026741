use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use orbitgrid_core::{hits_from_str, hits_to_string, resize, MusicalParameter, SongSession};

use crate::config::AppConfig;
use crate::script::run_script;

/// `quantize <parameter> <value>`: snapped value and its display label
pub(crate) fn quantize(parameter: &str, value: &str) -> Result<String> {
    let param: MusicalParameter = parameter.parse()?;
    let raw: f64 = value
        .parse()
        .with_context(|| format!("invalid value '{}'", value))?;
    let snapped = param.quantize(raw);
    tracing::debug!("{} {} -> {}", param, raw, snapped);
    Ok(format!("{} ({})", snapped, param.format(snapped)))
}

/// `resize <hits> <length>`
pub(crate) fn resize_hits(hits: &str, length: &str) -> Result<String> {
    let hits = hits_from_str(hits)?;
    let length: usize = length
        .parse()
        .with_context(|| format!("invalid length '{}'", length))?;
    Ok(hits_to_string(&resize(&hits, length)))
}

pub(crate) fn load_session(path: &Path) -> Result<SongSession> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// `script <file>`: replay onto an empty session and dump it as JSON
pub(crate) fn script(path: &Path, config: &AppConfig) -> Result<String> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut session = SongSession::new();
    run_script(&mut session, &source, config)?;
    tracing::info!(
        "Script produced {} patterns and {} clips",
        session.patterns.len(),
        session.arrangement.clips().len()
    );
    Ok(serde_json::to_string_pretty(&session)?)
}

/// Plain-text overview used by `inspect`
pub(crate) fn render_summary(session: &SongSession) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "tempo: {}",
        MusicalParameter::Tempo.format(session.tempo_bpm())
    );

    let _ = writeln!(out, "rows:");
    for row in session.rows.rows() {
        let _ = writeln!(out, "  r{} {}", row.id.0, row.kind);
    }

    let _ = writeln!(out, "patterns:");
    for pattern in session.patterns.iter() {
        let _ = writeln!(
            out,
            "  {} {} ({} bars, {} lanes)",
            pattern.id,
            pattern.name,
            pattern.bars,
            pattern.lanes.len()
        );
    }

    for stack in 0..session.stack_count() {
        let settings = session.arrangement.stack_settings(stack);
        let _ = writeln!(
            out,
            "stack {}: scale {} rotation {} opacity {}{}",
            stack,
            MusicalParameter::OrbitScale.format(settings.scale),
            MusicalParameter::Rotation.format(settings.rotation),
            MusicalParameter::Opacity.format(settings.opacity),
            if settings.flip_y { " flipped" } else { "" }
        );
        for view in session.stack_views(stack) {
            let clip = view.clip();
            let _ = writeln!(
                out,
                "  {} bars {}..{} {}",
                clip.id,
                clip.start_bar,
                clip.end_bar(),
                view.label()
            );
        }
        for (a, b) in session.arrangement.overlapping_clips(stack) {
            let _ = writeln!(out, "  overlap: {} {}", a, b);
        }
    }

    let transport = &session.transport;
    let _ = writeln!(
        out,
        "transport: playhead {} loop {}..{} ({})",
        transport.playhead_bar(),
        transport.loop_start(),
        transport.loop_end(),
        if transport.loop_enabled() { "on" } else { "off" }
    );
    out
}
