use crate::app_dirs::AppDirs;
use crate::metrics::{AttentionLevel, MetricsSnapshot, RiskLevel};
use crate::session::Session;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The persisted record for one finished assessment. The field set is part
/// of the core contract; the storage medium is not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub timestamp: DateTime<Local>,
    pub score: u32,
    pub accuracy: f64,
    pub attention_level: AttentionLevel,
    pub risk_level: RiskLevel,
    pub correct_hits: u32,
    pub missed_targets: u32,
    pub false_alarms: u32,
    pub mean_reaction_ms: f64,
    pub max_streak: u32,
    pub duration_secs: f64,
}

impl SessionResult {
    pub fn from_session(session: &Session, duration: Duration) -> Self {
        let metrics = session.metrics();
        Self {
            timestamp: Local::now(),
            score: session.score,
            accuracy: metrics.accuracy,
            attention_level: metrics.attention_level,
            risk_level: metrics.risk_level,
            correct_hits: session.correct_hits,
            missed_targets: session.missed_targets,
            false_alarms: session.false_alarms,
            mean_reaction_ms: metrics.mean_reaction_ms,
            max_streak: session.max_streak,
            duration_secs: duration.as_secs_f64(),
        }
    }

    /// Short human-readable summary for sharing.
    pub fn summary_text(&self) -> String {
        format!(
            "Focus assessment: {}% accuracy, {} attention, score {}, max streak {}",
            self.accuracy.round(),
            self.attention_level,
            self.score,
            self.max_streak
        )
    }
}

/// Narrative interpretation of a finished session, shown on the results
/// screen. Wording tracks the attention level with a reaction-speed remark
/// appended at the extremes.
pub fn analysis_text(metrics: &MetricsSnapshot) -> String {
    let mut text = match metrics.attention_level {
        AttentionLevel::Excellent => {
            "Your attention span and focus are exceptional. You demonstrate strong \
             sustained attention with minimal distractibility."
        }
        AttentionLevel::Good => {
            "You show good attention control with some minor lapses. Overall \
             cognitive focus is within normal range."
        }
        AttentionLevel::Fair => {
            "Your attention shows moderate variability. Some difficulty maintaining \
             consistent focus over time."
        }
        AttentionLevel::NeedsImprovement => {
            "Results suggest challenges with sustained attention and impulse \
             control. Consider consultation with a healthcare professional."
        }
    }
    .to_string();

    if metrics.mean_reaction_ms > 800.0 {
        text.push_str(
            " Reaction times are slower than average, which may indicate processing \
             speed considerations.",
        );
    } else if metrics.mean_reaction_ms > 0.0 && metrics.mean_reaction_ms < 400.0 {
        text.push_str(
            " Excellent reaction times suggest good cognitive processing speed and \
             alertness.",
        );
    }

    text
}

pub fn recommendations(risk_level: RiskLevel) -> &'static [&'static str] {
    match risk_level {
        RiskLevel::High => &[
            "Consider consultation with a mental health professional or physician",
            "Practice mindfulness and meditation exercises daily",
            "Use focus training apps and cognitive exercises regularly",
            "Implement structured routines and environmental modifications",
        ],
        RiskLevel::Moderate => &[
            "Regular cognitive training exercises may be beneficial",
            "Practice attention-building activities like puzzles and reading",
            "Maintain consistent sleep schedule and exercise routine",
            "Monitor progress with regular assessments",
        ],
        RiskLevel::Low => &[
            "Continue maintaining good cognitive health practices",
            "Engage in regular mental stimulation activities",
            "Practice mindfulness for enhanced focus",
            "Consider challenging cognitive games for improvement",
        ],
    }
}

/// Append-only results store. A persistence failure is recoverable and never
/// touches in-memory session state; callers decide whether to surface it.
#[derive(Debug)]
pub struct ResultsDb {
    conn: Connection,
}

impl ResultsDb {
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("fokus_results.db"));
        Self::open(&db_path)
    }

    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS session_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                score INTEGER NOT NULL,
                accuracy REAL NOT NULL,
                attention_level TEXT NOT NULL,
                risk_level TEXT NOT NULL,
                correct_hits INTEGER NOT NULL,
                missed_targets INTEGER NOT NULL,
                false_alarms INTEGER NOT NULL,
                mean_reaction_ms REAL NOT NULL,
                max_streak INTEGER NOT NULL,
                duration_secs REAL NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_session_results_timestamp ON session_results(timestamp)",
            [],
        )?;

        Ok(ResultsDb { conn })
    }

    pub fn append(&self, result: &SessionResult) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO session_results
            (timestamp, score, accuracy, attention_level, risk_level,
             correct_hits, missed_targets, false_alarms, mean_reaction_ms,
             max_streak, duration_secs)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                result.timestamp.to_rfc3339(),
                result.score,
                result.accuracy,
                serde_json::to_string(&result.attention_level).unwrap_or_default(),
                serde_json::to_string(&result.risk_level).unwrap_or_default(),
                result.correct_hits,
                result.missed_targets,
                result.false_alarms,
                result.mean_reaction_ms,
                result.max_streak,
                result.duration_secs,
            ],
        )?;
        Ok(())
    }

    /// Past results, newest first.
    pub fn history(&self) -> Result<Vec<SessionResult>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT timestamp, score, accuracy, attention_level, risk_level,
                   correct_hits, missed_targets, false_alarms, mean_reaction_ms,
                   max_streak, duration_secs
            FROM session_results
            ORDER BY timestamp DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let timestamp_str: String = row.get(0)?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        0,
                        "timestamp".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);
            let attention_json: String = row.get(3)?;
            let risk_json: String = row.get(4)?;

            Ok(SessionResult {
                timestamp,
                score: row.get(1)?,
                accuracy: row.get(2)?,
                attention_level: serde_json::from_str(&attention_json)
                    .unwrap_or(AttentionLevel::NeedsImprovement),
                risk_level: serde_json::from_str(&risk_json).unwrap_or(RiskLevel::Low),
                correct_hits: row.get(5)?,
                missed_targets: row.get(6)?,
                false_alarms: row.get(7)?,
                mean_reaction_ms: row.get(8)?,
                max_streak: row.get(9)?,
                duration_secs: row.get(10)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM session_results", [])?;
        Ok(())
    }

    /// Write the full history as CSV, newest first.
    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let history = self
            .history()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "date",
            "score",
            "accuracy",
            "attention_level",
            "risk_level",
            "correct_hits",
            "missed_targets",
            "false_alarms",
            "mean_reaction_ms",
            "max_streak",
            "duration_secs",
        ])?;
        for result in &history {
            writer.write_record([
                result.timestamp.to_rfc3339(),
                result.score.to_string(),
                format!("{:.1}", result.accuracy),
                result.attention_level.to_string(),
                result.risk_level.to_string(),
                result.correct_hits.to_string(),
                result.missed_targets.to_string(),
                result.false_alarms.to_string(),
                format!("{:.1}", result.mean_reaction_ms),
                result.max_streak.to_string(),
                format!("{:.1}", result.duration_secs),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{derive, RawCounts};

    fn sample_result(score: u32) -> SessionResult {
        SessionResult {
            timestamp: Local::now(),
            score,
            accuracy: 92.5,
            attention_level: AttentionLevel::Excellent,
            risk_level: RiskLevel::Low,
            correct_hits: 12,
            missed_targets: 1,
            false_alarms: 0,
            mean_reaction_ms: 420.0,
            max_streak: 8,
            duration_secs: 120.0,
        }
    }

    #[test]
    fn append_and_history_roundtrip() {
        let db = ResultsDb::open_in_memory().unwrap();
        db.append(&sample_result(1500)).unwrap();

        let history = db.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].score, 1500);
        assert_eq!(history[0].attention_level, AttentionLevel::Excellent);
        assert_eq!(history[0].risk_level, RiskLevel::Low);
        assert_eq!(history[0].max_streak, 8);
    }

    #[test]
    fn history_is_newest_first() {
        let db = ResultsDb::open_in_memory().unwrap();
        let mut older = sample_result(100);
        older.timestamp = Local::now() - chrono::Duration::hours(2);
        let newer = sample_result(200);

        db.append(&older).unwrap();
        db.append(&newer).unwrap();

        let history = db.history().unwrap();
        assert_eq!(history[0].score, 200);
        assert_eq!(history[1].score, 100);
    }

    #[test]
    fn clear_empties_history() {
        let db = ResultsDb::open_in_memory().unwrap();
        db.append(&sample_result(10)).unwrap();
        db.clear().unwrap();
        assert!(db.history().unwrap().is_empty());
    }

    #[test]
    fn csv_export_writes_all_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db = ResultsDb::open_in_memory().unwrap();
        db.append(&sample_result(100)).unwrap();
        db.append(&sample_result(200)).unwrap();

        let path = dir.path().join("log.csv");
        db.export_csv(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3); // header + 2 rows
        assert!(lines[0].starts_with("date,score,accuracy"));
    }

    #[test]
    fn summary_text_carries_the_four_contract_fields() {
        let text = sample_result(1500).summary_text();
        assert!(text.contains("93%"));
        assert!(text.contains("Excellent"));
        assert!(text.contains("1500"));
        assert!(text.contains("streak 8"));
    }

    #[test]
    fn analysis_mentions_fast_reactions() {
        let rts: Vec<Duration> = (0..6).map(|_| Duration::from_millis(300)).collect();
        let metrics = derive(RawCounts {
            correct_hits: 6,
            targets_spawned: 6,
            reaction_times: &rts,
            ..Default::default()
        });
        let text = analysis_text(&metrics);
        assert!(text.contains("exceptional"));
        assert!(text.contains("Excellent reaction times"));
    }

    #[test]
    fn analysis_flags_slow_reactions() {
        let rts: Vec<Duration> = (0..6).map(|_| Duration::from_millis(900)).collect();
        let metrics = derive(RawCounts {
            correct_hits: 6,
            targets_spawned: 6,
            reaction_times: &rts,
            ..Default::default()
        });
        assert!(analysis_text(&metrics).contains("slower than average"));
    }

    #[test]
    fn recommendations_vary_with_risk() {
        assert_ne!(
            recommendations(RiskLevel::High)[0],
            recommendations(RiskLevel::Low)[0]
        );
        assert_eq!(recommendations(RiskLevel::Moderate).len(), 4);
    }
}
