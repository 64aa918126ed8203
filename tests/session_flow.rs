use drumfill::{
    decode, encode, Cell, Command, DrumfillConfig, NullSink, Percussion, PlayMode,
    SequencerSession, Trigger,
};

fn toggle(session: &mut SequencerSession, row: usize, col: usize) {
    session.handle(Command::ToggleCell {
        row,
        col,
        break_symmetry: false,
    });
}

fn letter(session: &mut SequencerSession, row: usize, col: usize, ch: char) {
    session.handle(Command::EnterLetter {
        row,
        col,
        letter: Some(ch),
    });
}

fn percussion(triggers: &[Trigger]) -> Vec<Percussion> {
    triggers
        .iter()
        .filter_map(|t| match t {
            Trigger::Percussion { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect()
}

#[test]
fn test_grid_mode_bar() {
    let mut session = SequencerSession::new();
    letter(&mut session, 0, 0, 'k');
    letter(&mut session, 5, 0, 'k');
    letter(&mut session, 2, 2, 'h');
    toggle(&mut session, 1, 4);

    let mut sink = Vec::new();
    session.handle(Command::Start);
    let mut reports = Vec::new();
    for i in 0..8 {
        if let Some(report) = session.poll(i as f64 * 0.5, &mut sink) {
            reports.push(report);
        }
    }
    assert_eq!(reports.len(), 8);

    // Column 0: two kicks, one fires
    assert_eq!(percussion(&reports[0].triggers), vec![Percussion::Kick]);
    assert_eq!(reports[0].playing, vec![(0, 0)]);
    // Column 2: hat
    assert_eq!(percussion(&reports[2].triggers), vec![Percussion::Hat]);
    // Column 3 holds the mirror block of (1, 4), column 4 the block itself
    assert_eq!(reports[3].playing, vec![(6, 3)]);
    assert_eq!(reports[4].playing, vec![(1, 4)]);
    assert!(reports[1].triggers.is_empty());

    assert_eq!(sink.len(), 4);
    assert!(sink.windows(2).all(|w| w[0].time() <= w[1].time()));
}

#[test]
fn test_word_mode_phasing() {
    let mut session = SequencerSession::new();
    // Row 0 split into "KS" (cols 0-1) and a 5-cell word; the mirror splits row 7
    toggle(&mut session, 0, 2);
    letter(&mut session, 0, 0, 'k');
    letter(&mut session, 0, 1, 's');
    letter(&mut session, 0, 3, 'a');
    session.handle(Command::ChangeMode(PlayMode::Word));

    let mut sink = Vec::new();
    session.handle(Command::Start);
    let first = session.poll(0.0, &mut sink).unwrap();
    assert!(first.active.contains(&(0, 0)));
    assert!(first.active.contains(&(0, 3)));
    assert_eq!(first.playing, vec![(0, 0), (0, 3)]);

    let second = session.poll(0.5, &mut sink).unwrap();
    assert_eq!(second.playing, vec![(0, 1)]);
    assert_eq!(percussion(&second.triggers), vec![Percussion::Snare]);

    // Step 2 wraps the two-cell word back to the kick
    let third = session.poll(1.0, &mut sink).unwrap();
    assert_eq!(third.playing, vec![(0, 0)]);
}

#[test]
fn test_stop_resumes_in_place() {
    let mut session = SequencerSession::new();
    session.handle(Command::TogglePlay);
    session.poll(0.0, &mut NullSink);
    session.poll(0.5, &mut NullSink);

    session.handle(Command::TogglePlay);
    session.handle(Command::Stop);
    assert!(!session.is_running());
    assert!(session.scheduler().active_cells().is_empty());
    assert_eq!(session.scheduler().current_step(), 2);

    session.handle(Command::Start);
    let report = session.poll(9.0, &mut NullSink).unwrap();
    assert_eq!(report.step, 2);
    assert!(report.active.iter().all(|&(_, c)| c == 2));
}

#[test]
fn test_resize_mid_playback() {
    let mut session = SequencerSession::new();
    session.handle(Command::Resize(16));
    session.handle(Command::Start);
    for i in 0..13 {
        session.poll(i as f64 * 0.5, &mut NullSink);
    }
    session.handle(Command::Resize(8));
    let report = session.poll(6.5, &mut NullSink).unwrap();
    assert_eq!(report.step, 13);
    assert!(report.active.iter().all(|&(r, c)| r < 8 && c == 5));
}

#[test]
fn test_resize_round_trip_through_session() {
    let mut session = SequencerSession::new();
    session.handle(Command::Resize(10));
    toggle(&mut session, 3, 3);
    let before = session.grid().to_rows();

    session.handle(Command::Resize(8));
    assert!(session.grid().is_blocked(3, 3));
    session.handle(Command::Resize(10));
    assert_eq!(session.grid().to_rows(), before);
}

#[test]
fn test_share_link_survives_codec() {
    let mut session = SequencerSession::new();
    toggle(&mut session, 2, 5);
    letter(&mut session, 4, 4, 'q');
    session.handle(Command::ChangeTempo(133));

    let link = session.share_link();
    let snapshot = decode(&link).unwrap();
    assert_eq!(snapshot.grid_size, 8);
    assert_eq!(snapshot.bpm, 133);
    assert_eq!(snapshot.cells[4][4], Cell::Letter('Q'));
    assert_eq!(encode(&snapshot), link);

    let restored = SequencerSession::from_link(&link, &DrumfillConfig::default());
    assert_eq!(restored.grid().to_rows(), session.grid().to_rows());
}

#[test]
fn test_silent_when_everything_blocked() {
    let mut session = SequencerSession::new();
    for row in 0..4 {
        for col in 0..8 {
            toggle(&mut session, row, col);
        }
    }
    assert!(session.words().is_empty());

    session.handle(Command::ChangeMode(PlayMode::Word));
    session.handle(Command::Start);
    let mut sink = Vec::new();
    let report = session.poll(0.0, &mut sink).unwrap();
    assert!(report.active.is_empty());
    assert!(sink.is_empty());
}
