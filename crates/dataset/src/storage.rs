//! SQLite persistence.
//!
//! The aggregated feature table and trained-model artifacts are the two
//! durable outputs the pipeline is responsible for. All I/O lives here at
//! the boundary; the alignment/aggregation/assembly logic never touches a
//! connection.

use rusqlite::{params, Connection};

use fomc_core::{AggregatedFeatureRow, Error, FeatureVector, PolicyOutcome, Result};

fn db_err(e: rusqlite::Error) -> Error {
    Error::database(e.to_string())
}

/// Create the tables if they do not exist.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS event_features (
            event_id          INTEGER PRIMARY KEY,
            decision_ts       INTEGER NOT NULL,
            outcome           TEXT NOT NULL,
            features          TEXT NOT NULL,
            document_count    INTEGER NOT NULL,
            insufficient_data INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS model_artifacts (
            name TEXT PRIMARY KEY,
            data BLOB NOT NULL
        );",
    )
    .map_err(db_err)
}

/// Persist the aggregated feature table, replacing existing rows.
pub fn save_feature_table(
    conn: &mut Connection,
    rows: &[AggregatedFeatureRow],
) -> Result<()> {
    init_schema(conn)?;
    let tx = conn.transaction().map_err(db_err)?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT OR REPLACE INTO event_features
                 (event_id, decision_ts, outcome, features, document_count, insufficient_data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .map_err(db_err)?;
        for row in rows {
            let features = serde_json::to_string(&row.features)?;
            stmt.execute(params![
                row.event_id as i64,
                row.decision_ts,
                row.outcome.label(),
                features,
                row.document_count as i64,
                row.insufficient_data as i64,
            ])
            .map_err(db_err)?;
        }
    }
    tx.commit().map_err(db_err)
}

/// Load the aggregated feature table, ordered by decision time.
pub fn load_feature_table(conn: &Connection) -> Result<Vec<AggregatedFeatureRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT event_id, decision_ts, outcome, features, document_count, insufficient_data
             FROM event_features ORDER BY decision_ts ASC",
        )
        .map_err(db_err)?;
    let raw_rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;

    let mut rows = Vec::with_capacity(raw_rows.len());
    for (event_id, decision_ts, outcome, features, document_count, insufficient) in raw_rows {
        let outcome = PolicyOutcome::from_label(&outcome).ok_or_else(|| {
            Error::database(format!("unknown outcome label {outcome:?} for event {event_id}"))
        })?;
        let features: FeatureVector = serde_json::from_str(&features)?;
        if !features.has_declared_width() {
            return Err(Error::database(format!(
                "persisted feature vector for event {event_id} has the wrong width"
            )));
        }
        rows.push(AggregatedFeatureRow {
            event_id: event_id as u64,
            decision_ts,
            outcome,
            features,
            document_count: document_count as usize,
            insufficient_data: insufficient != 0,
        });
    }
    Ok(rows)
}

/// Persist a named model artifact, replacing any previous version.
pub fn save_model_artifact(conn: &Connection, name: &str, data: &[u8]) -> Result<()> {
    init_schema(conn)?;
    conn.execute(
        "INSERT OR REPLACE INTO model_artifacts (name, data) VALUES (?1, ?2)",
        params![name, data],
    )
    .map_err(db_err)?;
    Ok(())
}

/// Load a named model artifact, if present.
pub fn load_model_artifact(conn: &Connection, name: &str) -> Result<Option<Vec<u8>>> {
    match conn.query_row(
        "SELECT data FROM model_artifacts WHERE name = ?1",
        params![name],
        |row| row.get::<_, Vec<u8>>(0),
    ) {
        Ok(data) => Ok(Some(data)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(db_err(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomc_core::combined_index;

    fn make_row(event_id: u64, outcome: PolicyOutcome) -> AggregatedFeatureRow {
        let mut features = FeatureVector::zeroed();
        features.set(combined_index(0), 0.42, false);
        features.set(combined_index(1), -0.1, true);
        AggregatedFeatureRow {
            event_id,
            decision_ts: event_id as i64 * 1_000,
            outcome,
            features,
            document_count: 7,
            insufficient_data: false,
        }
    }

    #[test]
    fn test_feature_table_round_trip() {
        let mut conn = Connection::open_in_memory().unwrap();
        let rows = vec![
            make_row(1, PolicyOutcome::Hold),
            make_row(2, PolicyOutcome::Cut),
        ];
        save_feature_table(&mut conn, &rows).unwrap();

        let loaded = load_feature_table(&conn).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].event_id, 1);
        assert_eq!(loaded[1].outcome, PolicyOutcome::Cut);
        assert!((loaded[0].features.get(combined_index(0)) - 0.42).abs() < 1e-12);
        assert!(loaded[0].features.is_imputed(combined_index(1)));
        assert_eq!(loaded[0].document_count, 7);
    }

    #[test]
    fn test_save_replaces_existing_rows() {
        let mut conn = Connection::open_in_memory().unwrap();
        save_feature_table(&mut conn, &[make_row(1, PolicyOutcome::Hold)]).unwrap();

        let mut updated = make_row(1, PolicyOutcome::Cut);
        updated.document_count = 9;
        save_feature_table(&mut conn, &[updated]).unwrap();

        let loaded = load_feature_table(&conn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].outcome, PolicyOutcome::Cut);
        assert_eq!(loaded[0].document_count, 9);
    }

    #[test]
    fn test_model_artifact_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(load_model_artifact(&conn, "missing").is_err()); // no schema yet

        save_model_artifact(&conn, "gbm-v1", b"serialized-model").unwrap();
        let loaded = load_model_artifact(&conn, "gbm-v1").unwrap();
        assert_eq!(loaded.as_deref(), Some(&b"serialized-model"[..]));
        assert!(load_model_artifact(&conn, "other").unwrap().is_none());
    }
}
