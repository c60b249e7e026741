//! Line-based edit scripts replayed against a fresh session
//!
//! One command per line, `#` starts a comment:
//!
//! ```text
//! tempo 128
//! pattern Verse 4
//! hits p1 kick x...x...x...x...
//! clip p1 0
//! drag c1 170 10 1
//! loop-clip c1
//! ```

use anyhow::{anyhow, bail, Context, Result};

use orbitgrid_core::{
    hits_from_str, pixel_to_bar, pointer_to_bar, ClipId, MusicalParameter, PatternId, RowId,
    RowKind, SongSession,
};

use crate::config::AppConfig;

/// Run every line of `source` against `session`
pub(crate) fn run_script(
    session: &mut SongSession,
    source: &str,
    config: &AppConfig,
) -> Result<()> {
    for (idx, line) in source.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        apply_line(session, line, config).with_context(|| format!("line {}: {}", idx + 1, line))?;
    }
    Ok(())
}

fn apply_line(session: &mut SongSession, line: &str, config: &AppConfig) -> Result<()> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let (command, args) = words.split_first().ok_or_else(|| anyhow!("empty command"))?;
    let arg = |i: usize| args.get(i).copied().ok_or_else(|| anyhow!("missing argument {}", i + 1));
    let opt_stack = |i: usize| args.get(i).map(|s| s.parse::<usize>()).transpose();

    match *command {
        "tempo" => {
            session.set_tempo(arg(0)?.parse()?);
        }
        "pattern" => {
            let bars = args.get(1).map(|b| b.parse::<u32>()).transpose()?.unwrap_or(1);
            let id = session.add_pattern(arg(0)?, bars);
            tracing::info!("Created pattern {}", id);
        }
        "remove-pattern" => {
            session.remove_pattern(pattern_id(arg(0)?)?);
        }
        "row" => {
            session.add_row(arg(0)?.parse()?);
        }
        "effect-row" => {
            session.add_effect_row(arg(0)?.parse()?);
        }
        "remove-row" => {
            session.remove_row(row_id(arg(0)?)?);
        }
        "row-up" => {
            session.move_row_up(row_id(arg(0)?)?);
        }
        "row-down" => {
            session.move_row_down(row_id(arg(0)?)?);
        }
        "hit" => {
            let kind: RowKind = arg(1)?.parse()?;
            session.toggle_hit(pattern_id(arg(0)?)?, kind, arg(2)?.parse()?);
        }
        "hits" => {
            let id = pattern_id(arg(0)?)?;
            let kind: RowKind = arg(1)?.parse()?;
            let hits = hits_from_str(arg(2)?)?;
            let pattern = session
                .patterns
                .get_mut(id)
                .ok_or_else(|| anyhow!("unknown pattern {}", id))?;
            pattern.ensure_lane(kind).set_hits(&hits);
        }
        "subdivision" => {
            session.cycle_subdivision(pattern_id(arg(0)?)?, arg(1)?.parse()?);
        }
        "length" => {
            session.cycle_base_length(pattern_id(arg(0)?)?, arg(1)?.parse()?);
        }
        "visual" => {
            let param: MusicalParameter = arg(1)?.parse()?;
            session.set_pattern_visual(pattern_id(arg(0)?)?, param, arg(2)?.parse()?);
        }
        "clip" => {
            let id = pattern_id(arg(0)?)?;
            let stack = args.get(1).map(|s| s.parse::<usize>()).transpose()?.unwrap_or(0);
            if session.add_clip(id, stack).is_none() {
                tracing::warn!("No pattern {}; clip not added", id);
            }
        }
        "move" => {
            session.move_clip(clip_id(arg(0)?)?, arg(1)?.parse()?, opt_stack(2)?);
        }
        "drag" => {
            let width = config.timeline.cell_pixel_width;
            let bar = pixel_to_bar(arg(1)?.parse()?, arg(2)?.parse()?, width);
            session.move_clip(clip_id(arg(0)?)?, bar, opt_stack(3)?);
        }
        "dup" => {
            session.duplicate_clip(clip_id(arg(0)?)?, arg(1)?.parse()?, opt_stack(2)?);
        }
        "remove-clip" => {
            session.remove_clip(clip_id(arg(0)?)?);
        }
        "remove-stack" => {
            session.arrangement.remove_stack(arg(0)?.parse()?);
        }
        "stack" => {
            let param: MusicalParameter = arg(1)?.parse()?;
            session.set_stack_param(arg(0)?.parse()?, param, arg(2)?.parse()?);
        }
        "loop" => {
            session.transport.set_loop_region(arg(0)?.parse()?, arg(1)?.parse()?);
        }
        "loop-on" => session.transport.set_loop_enabled(true),
        "loop-off" => session.transport.set_loop_enabled(false),
        "loop-clip" => {
            session.loop_clip(clip_id(arg(0)?)?);
        }
        "fit-loop" => session.constrain_loop_to_song(),
        "seek" => session.transport.seek_to_bar(arg(0)?.parse()?),
        "press" => {
            let bar = ruler_bar(arg(0)?.parse()?, config);
            session.transport.press(bar, config.transport.handle_tolerance_bars);
        }
        "pointer" => {
            let bar = ruler_bar(arg(0)?.parse()?, config);
            session.transport.pointer_moved(bar);
        }
        "release" => session.transport.release(),
        other => bail!("unknown command '{}'", other),
    }
    Ok(())
}

fn ruler_bar(x: f64, config: &AppConfig) -> f64 {
    pointer_to_bar(x, 0.0, config.transport.pixels_per_bar, 0.0)
}

/// Accept `p3` or `3`
fn parse_id(s: &str, prefix: char) -> Result<u64> {
    s.strip_prefix(prefix)
        .unwrap_or(s)
        .parse()
        .with_context(|| format!("invalid id '{}'", s))
}

fn pattern_id(s: &str) -> Result<PatternId> {
    parse_id(s, 'p').map(PatternId)
}

fn clip_id(s: &str) -> Result<ClipId> {
    parse_id(s, 'c').map(ClipId)
}

fn row_id(s: &str) -> Result<RowId> {
    parse_id(s, 'r').map(RowId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbitgrid_core::{Instrument, TransportMode};

    fn run(source: &str) -> SongSession {
        let mut session = SongSession::new();
        run_script(&mut session, source, &AppConfig::default()).unwrap();
        session
    }

    #[test]
    fn test_script_builds_arrangement() {
        let session = run(
            "# two verses and a chorus\n\
             tempo 131\n\
             pattern Verse 4\n\
             pattern Chorus 2\n\
             hits p1 kick x...x...x...x...\n\
             clip p1 0\n\
             clip p1 0\n\
             clip p2 1\n\
             drag c3 170 10 2\n",
        );

        assert_eq!(session.tempo_bpm(), 132.0);
        assert_eq!(session.arrangement.clips().len(), 3);
        let dragged = session.arrangement.clip(ClipId(3)).unwrap();
        assert_eq!((dragged.start_bar, dragged.stack), (4.0, 2));
        let lane = session
            .patterns
            .get(PatternId(1))
            .and_then(|p| p.lane(RowKind::Instrument(Instrument::Kick)))
            .unwrap();
        assert_eq!(lane.active_steps(), vec![0, 4, 8, 12]);
    }

    #[test]
    fn test_script_drives_transport() {
        let session = run(
            "loop 2 6\n\
             loop-on\n\
             press 240\n\
             pointer 320\n",
        );
        // 240px at 40px/bar is bar 6, the loop end handle
        assert_eq!(session.transport.mode(), TransportMode::DraggingLoopEnd);
        assert_eq!(session.transport.loop_end(), 8.0);
    }

    #[test]
    fn test_script_reports_line_of_error() {
        let mut session = SongSession::new();
        let err = run_script(&mut session, "pattern A 2\nfrobnicate\n", &AppConfig::default())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_parse_ids() {
        assert_eq!(pattern_id("p7").unwrap(), PatternId(7));
        assert_eq!(clip_id("12").unwrap(), ClipId(12));
        assert!(row_id("rx").is_err());
    }
}
