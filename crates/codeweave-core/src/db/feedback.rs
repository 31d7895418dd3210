//! Retrieval event log and feedback summaries

use super::Database;
use crate::error::Result;
use crate::feedback::{
    infer_signals, EventSnapshot, FeedbackSeed, FeedbackSummary, FileFeedback, RecordedEvent,
    RetrievalEventInput, SummaryOptions,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashSet};

fn parse_terms(raw: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(raw)
        .map(|terms| {
            terms
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Most recent event of the session, with its ranked chunks
fn last_event(conn: &Connection, session: Option<&str>) -> Result<Option<EventSnapshot>> {
    let row = conn
        .query_row(
            "SELECT id, query, technical_terms, seed_count
             FROM retrieval_events
             WHERE session IS ?1
             ORDER BY id DESC
             LIMIT 1",
            params![session],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((id, query, terms, seed_count)) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT chunk_id, file_path, chunk_index, score, source
         FROM retrieval_event_chunks
         WHERE event_id = ?1
         ORDER BY rank ASC",
    )?;
    let chunks = stmt
        .query_map(params![id], |row| {
            Ok(FeedbackSeed {
                chunk_id: row.get(0)?,
                file_path: row.get(1)?,
                chunk_index: row.get::<_, i64>(2)? as usize,
                score: row.get(3)?,
                source: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(EventSnapshot {
        id,
        query,
        technical_terms: parse_terms(&terms),
        seed_count: seed_count as usize,
        chunks,
    }))
}

fn count(conn: &Connection, sql: &str, cutoff: i64) -> Result<u64> {
    let value: i64 = conn.query_row(sql, params![cutoff], |row| row.get(0))?;
    Ok(value.max(0) as u64)
}

impl Database {
    /// Record one retrieval event and the signals it implies about the previous one
    pub fn record_retrieval_event(&self, input: &RetrievalEventInput) -> Result<RecordedEvent> {
        let input = input.normalized()?;
        let created_at = input
            .created_at_ms
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
        let file_count = input
            .seeds
            .iter()
            .map(|s| s.file_path.as_str())
            .collect::<HashSet<_>>()
            .len();

        let conn = self.conn();
        let previous = last_event(&conn, input.session.as_deref())?;

        conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| -> Result<RecordedEvent> {
            conn.execute(
                "INSERT INTO retrieval_events (created_at, session, query, technical_terms, seed_count, file_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    created_at,
                    input.session,
                    input.query,
                    serde_json::to_string(&input.technical_terms)?,
                    input.seeds.len() as i64,
                    file_count as i64
                ],
            )?;
            let event_id = conn.last_insert_rowid();

            for (rank, seed) in input.seeds.iter().enumerate() {
                conn.execute(
                    "INSERT INTO retrieval_event_chunks (event_id, rank, chunk_id, file_path, chunk_index, score, source)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        event_id,
                        rank as i64,
                        seed.chunk_id,
                        seed.file_path,
                        seed.chunk_index as i64,
                        seed.score,
                        seed.source
                    ],
                )?;
            }

            let current = EventSnapshot {
                id: event_id,
                query: input.query.clone(),
                technical_terms: input.technical_terms.clone(),
                seed_count: input.seeds.len(),
                chunks: input.seeds.clone(),
            };
            let signals = match &previous {
                Some(prev) => infer_signals(prev, &current),
                None => Vec::new(),
            };

            if let Some(prev) = &previous {
                for signal in &signals {
                    conn.execute(
                        "INSERT INTO retrieval_signals (created_at, source_event_id, target_event_id,
                            signal_type, weight, target_chunk_id, target_file_path, evidence)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                        params![
                            created_at,
                            prev.id,
                            event_id,
                            signal.kind.as_str(),
                            signal.weight,
                            signal.target_chunk_id,
                            signal.target_file_path,
                            signal.evidence.to_string()
                        ],
                    )?;
                }
            }

            Ok(RecordedEvent {
                event_id,
                inferred_signals: signals,
            })
        })();

        if result.is_ok() {
            conn.execute("COMMIT", [])?;
        } else {
            let _ = conn.execute("ROLLBACK", []);
        }
        if let Ok(recorded) = &result {
            tracing::debug!(
                event_id = recorded.event_id,
                signals = recorded.inferred_signals.len(),
                "retrieval event recorded"
            );
        }
        result
    }

    /// Aggregate events and signals inside the summary window
    pub fn feedback_summary(&self, options: &SummaryOptions) -> Result<FeedbackSummary> {
        let cutoff = options.cutoff_ms();
        let conn = self.conn();

        let total_events = count(
            &conn,
            "SELECT COUNT(*) FROM retrieval_events WHERE created_at >= ?1",
            cutoff,
        )?;
        let zero_hit_events = count(
            &conn,
            "SELECT COUNT(*) FROM retrieval_events WHERE created_at >= ?1 AND seed_count = 0",
            cutoff,
        )?;
        let positive_signals = count(
            &conn,
            "SELECT COUNT(*) FROM retrieval_signals WHERE created_at >= ?1 AND weight > 0",
            cutoff,
        )?;
        let negative_signals = count(
            &conn,
            "SELECT COUNT(*) FROM retrieval_signals WHERE created_at >= ?1 AND weight < 0",
            cutoff,
        )?;
        let successful_events = count(
            &conn,
            "SELECT COUNT(DISTINCT source_event_id) FROM retrieval_signals
             WHERE created_at >= ?1 AND weight > 0",
            cutoff,
        )?;

        let mut stmt = conn.prepare(
            "SELECT target_file_path, COUNT(*) AS hit_count, SUM(weight) AS total_weight
             FROM retrieval_signals
             WHERE created_at >= ?1 AND target_file_path IS NOT NULL AND weight > 0
             GROUP BY target_file_path
             ORDER BY total_weight DESC, hit_count DESC, target_file_path ASC
             LIMIT ?2",
        )?;
        let top_files = stmt
            .query_map(params![cutoff, options.top as i64], |row| {
                Ok(FileFeedback {
                    file_path: row.get(0)?,
                    hit_count: row.get::<_, i64>(1)?.max(0) as u64,
                    total_weight: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT signal_type, COUNT(*) FROM retrieval_signals
             WHERE created_at >= ?1
             GROUP BY signal_type",
        )?;
        let signal_breakdown = stmt
            .query_map(params![cutoff], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?.max(0) as u64))
            })?
            .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;

        let rate = |n: u64| {
            if total_events == 0 {
                0.0
            } else {
                n as f64 / total_events as f64
            }
        };

        Ok(FeedbackSummary {
            total_events,
            zero_hit_rate: rate(zero_hit_events),
            implicit_success_rate: rate(successful_events),
            positive_signals,
            negative_signals,
            signal_breakdown,
            top_files,
        })
    }
}
