// Result-record persistence through a real (temp-dir) sqlite database,
// fed from an actual scripted session rather than hand-built records.

use fokus::clock::{Clock, ManualClock};
use fokus::results::{ResultsDb, SessionResult};
use fokus::session::Session;
use fokus::stimulus::PlayArea;
use std::time::Duration;

fn finished_session(seed: u64) -> (SessionResult, u32) {
    let clock = ManualClock::new();
    let mut session = Session::with_seed(PlayArea::default(), seed);
    session.start(clock.now());

    while session.correct_hits < 5 {
        clock.advance_ms(50);
        session.on_tick(clock.now());
        let ripe: Vec<u64> = session
            .active
            .iter()
            .filter(|s| s.is_target() && clock.now() >= s.spawned_at + Duration::from_millis(300))
            .map(|s| s.id)
            .collect();
        for id in ripe {
            session.resolve(id, clock.now());
        }
    }
    session.stop(clock.now());

    let elapsed = session.elapsed(clock.now());
    (SessionResult::from_session(&session, elapsed), session.score)
}

#[test]
fn session_result_captures_the_contract_fields() {
    let (result, score) = finished_session(17);
    assert_eq!(result.score, score);
    assert_eq!(result.correct_hits, 5);
    assert!(result.mean_reaction_ms > 0.0);
    assert!(result.duration_secs > 0.0);
    assert!((0.0..=100.0).contains(&result.accuracy));
}

#[test]
fn append_and_reload_through_a_file_backed_db() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.db");

    let (result, _) = finished_session(23);
    {
        let db = ResultsDb::open(&path).unwrap();
        db.append(&result).unwrap();
    }

    // Reopen to prove the record actually hit the disk.
    let db = ResultsDb::open(&path).unwrap();
    let history = db.history().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].score, result.score);
    assert_eq!(history[0].attention_level, result.attention_level);
    assert_eq!(history[0].risk_level, result.risk_level);
    assert_eq!(history[0].max_streak, result.max_streak);
}

#[test]
fn save_failure_leaves_the_record_usable() {
    // A directory path can't be opened as a database file.
    let dir = tempfile::tempdir().unwrap();
    let err = ResultsDb::open(dir.path());
    assert!(err.is_err());

    // The in-memory record is unaffected and can still be shared.
    let (result, _) = finished_session(31);
    let text = result.summary_text();
    assert!(text.contains("accuracy"));
    assert!(text.contains(&result.score.to_string()));
}

#[test]
fn csv_export_matches_history() {
    let dir = tempfile::tempdir().unwrap();
    let db = ResultsDb::open(&dir.path().join("results.db")).unwrap();

    let (a, _) = finished_session(1);
    let (b, _) = finished_session(2);
    db.append(&a).unwrap();
    db.append(&b).unwrap();

    let csv_path = dir.path().join("export.csv");
    db.export_csv(&csv_path).unwrap();

    let contents = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(contents.lines().count(), 3);
    assert!(contents.contains(&a.score.to_string()));
    assert!(contents.contains(&b.score.to_string()));
}
