//! End-to-end editing scenarios against a song session

use orbitgrid_core::{
    hits_from_str, resize, ClipId, Instrument, LoopHandle, MusicalParameter, RowKind, SongSession,
    Subdivision, TransportMode,
};

const SNARE: RowKind = RowKind::Instrument(Instrument::Snare);

#[test]
fn test_two_clips_on_empty_stack() {
    let mut session = SongSession::new();
    let p1 = session.add_pattern("p1", 4);

    let first = session.add_clip(p1, 0).unwrap();
    let second = session.add_clip(p1, 0).unwrap();

    let a = *session.arrangement.clip(first).unwrap();
    let b = *session.arrangement.clip(second).unwrap();
    assert_eq!((a.start_bar, a.length, a.stack), (0.0, 4.0, 0));
    assert_eq!((b.start_bar, b.length, b.stack), (4.0, 4.0, 0));
    assert_eq!(session.stack_count(), 1);
}

#[test]
fn test_subdivision_change_samples_every_other_cell() {
    let hits = hits_from_str("x.x.x.x.xx..x..x").unwrap();
    let resized = resize(&hits, 8);
    let expected: Vec<bool> = (0..8).map(|i| hits[i * 2]).collect();
    assert_eq!(resized, expected);

    let mut session = SongSession::new();
    let p = session.add_pattern("Groove", 1);
    let pattern = session.patterns.get_mut(p).unwrap();
    let lane = pattern.ensure_lane(SNARE);
    lane.set_subdivision(Subdivision::Whole);
    assert_eq!(lane.len(), 4);
    assert_eq!(lane.cycle_subdivision(), Subdivision::Double);
    assert_eq!(lane.len(), 8);
}

#[test]
fn test_loop_end_drag_respects_min_gap() {
    let mut session = SongSession::new();
    let transport = &mut session.transport;
    transport.set_loop_enabled(true);
    transport.set_loop_region(2.0, 2.3);

    assert!(transport.begin_loop_drag(LoopHandle::End));
    transport.pointer_moved(2.0);
    assert_eq!(transport.loop_end(), 2.5);
    transport.release();
    assert_eq!(transport.mode(), TransportMode::Idle);
}

#[test]
fn test_move_unknown_clip_leaves_arrangement_unchanged() {
    let mut session = SongSession::new();
    let p = session.add_pattern("A", 2);
    session.add_clip(p, 0);
    session.add_clip(p, 0);
    session.add_clip(p, 1);
    let before = session.arrangement.clips().to_vec();

    assert!(!session.move_clip(ClipId(12345), 5.0, None));
    assert_eq!(session.arrangement.clips(), before.as_slice());
}

#[test]
fn test_overlapping_clips_are_kept() {
    let mut session = SongSession::new();
    let p = session.add_pattern("A", 4);
    let a = session.add_clip(p, 0).unwrap();
    let b = session.duplicate_clip(a, 1.0, None).unwrap();

    assert_eq!(session.arrangement.overlapping_clips(0), vec![(a, b)]);
    assert_eq!(session.stack_views(0).len(), 2);
}

#[test]
fn test_editing_session_flow() {
    let mut session = SongSession::new();
    session.set_tempo(125.0);
    assert_eq!(session.tempo_bpm(), 126.0);
    assert_eq!(MusicalParameter::Tempo.format(session.tempo_bpm()), "126 BPM");

    let verse = session.add_pattern("Verse", 2);
    let chorus = session.add_pattern("Chorus", 4);
    session.add_clip(verse, 0);
    let c = session.add_clip(chorus, 0).unwrap();
    session.add_clip(chorus, 2);
    assert_eq!(session.stack_count(), 3);
    assert_eq!(session.arrangement.clip(c).map(|c| c.start_bar), Some(2.0));

    session.remove_pattern(verse);
    let missing = session.stack_views(0).iter().filter(|v| v.is_missing()).count();
    assert_eq!(missing, 1);

    assert!(session.loop_clip(c));
    session.transport.press(3.0, 0.25);
    assert_eq!(session.transport.mode(), TransportMode::Scrubbing);
    session.transport.pointer_moved(5.5);
    session.transport.pointer_left();
    assert_eq!(session.transport.playhead_bar(), 5.5);
}
