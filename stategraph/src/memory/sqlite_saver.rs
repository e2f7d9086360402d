//! SQLite-backed checkpointer (SqliteSaver). Persistent across restarts.
//!
//! One row per `(thread_id, seq)`; `seq` is a per-thread monotonically
//! increasing version so the latest checkpoint is `MAX(seq)`. Values are
//! stored as JSON text. Uses spawn_blocking around rusqlite.

use std::path::Path;

use async_trait::async_trait;
use rusqlite::params;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata};
use super::checkpointer::{CheckpointError, Checkpointer};
use super::config::RunnableConfig;

/// SQLite-backed checkpointer. Key: `(thread_id, checkpoint_id)` with an
/// append-only per-thread sequence; `get_tuple` without a checkpoint_id
/// returns the row with the highest sequence.
pub struct SqliteSaver<S> {
    db_path: std::path::PathBuf,
    _marker: std::marker::PhantomData<fn(S)>,
}

impl<S> SqliteSaver<S> {
    /// Opens (and creates if needed) the checkpoint table at `path`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open(&db_path)
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id     TEXT NOT NULL,
                seq           INTEGER NOT NULL,
                checkpoint_id TEXT NOT NULL,
                payload       TEXT NOT NULL,
                PRIMARY KEY (thread_id, seq)
            )
            "#,
            [],
        )
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        Ok(Self {
            db_path,
            _marker: std::marker::PhantomData,
        })
    }

    fn thread_key(config: &RunnableConfig) -> Result<String, CheckpointError> {
        config
            .thread_id
            .clone()
            .ok_or(CheckpointError::ThreadIdRequired)
    }
}

#[async_trait]
impl<S> Checkpointer<S> for SqliteSaver<S>
where
    S: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError> {
        let thread_id = Self::thread_key(config)?;
        let checkpoint_id = checkpoint.id.clone();
        let payload = serde_json::to_string(checkpoint)?;
        let db_path = self.db_path.clone();
        let id = checkpoint_id.clone();

        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path)
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let next_seq: i64 = conn
                .query_row(
                    "SELECT COALESCE(MAX(seq), -1) + 1 FROM checkpoints WHERE thread_id = ?1",
                    params![thread_id],
                    |row| row.get(0),
                )
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            conn.execute(
                "INSERT INTO checkpoints (thread_id, seq, checkpoint_id, payload) VALUES (?1, ?2, ?3, ?4)",
                params![thread_id, next_seq, checkpoint_id, payload],
            )
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            Ok::<(), CheckpointError>(())
        })
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))??;

        Ok(id)
    }

    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<Checkpoint<S>>, CheckpointError> {
        let thread_id = Self::thread_key(config)?;
        let checkpoint_id = config.checkpoint_id.clone();
        let db_path = self.db_path.clone();

        let payload: Option<String> = tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path)
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let row: Option<String> = match checkpoint_id {
                Some(cid) => conn
                    .query_row(
                        "SELECT payload FROM checkpoints WHERE thread_id = ?1 AND checkpoint_id = ?2",
                        params![thread_id, cid],
                        |row| row.get(0),
                    )
                    .ok(),
                None => conn
                    .query_row(
                        "SELECT payload FROM checkpoints WHERE thread_id = ?1 ORDER BY seq DESC LIMIT 1",
                        params![thread_id],
                        |row| row.get(0),
                    )
                    .ok(),
            };
            Ok::<_, CheckpointError>(row)
        })
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))??;

        match payload {
            Some(p) => Ok(Some(serde_json::from_str(&p)?)),
            None => Ok(None),
        }
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let thread_id = Self::thread_key(config)?;
        let db_path = self.db_path.clone();

        let payloads: Vec<String> = tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path)
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let mut stmt = conn
                .prepare("SELECT payload FROM checkpoints WHERE thread_id = ?1 ORDER BY seq ASC")
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(params![thread_id], |row| row.get::<_, String>(0))
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let mut out = Vec::new();
            for r in rows {
                out.push(r.map_err(|e| CheckpointError::Storage(e.to_string()))?);
            }
            Ok::<_, CheckpointError>(out)
        })
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))??;

        let mut items = Vec::with_capacity(payloads.len());
        for p in payloads {
            let cp: Checkpoint<S> = serde_json::from_str(&p)?;
            items.push(CheckpointListItem {
                checkpoint_id: cp.id,
                metadata: CheckpointMetadata {
                    source: cp.metadata.source,
                    step: cp.metadata.step,
                    created_at: None,
                },
            });
        }
        if let Some(n) = limit {
            let len = items.len();
            if len > n {
                items = items[len - n..].to_vec();
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::checkpoint::CheckpointSource;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct State {
        query: String,
        round: u32,
    }

    fn cfg(thread: &str) -> RunnableConfig {
        RunnableConfig::for_thread(thread)
    }

    /// **Scenario**: a checkpoint written to SQLite reads back identical
    /// (serialize/deserialize through the store is the identity).
    #[tokio::test]
    async fn sqlite_roundtrip_identity() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let saver: SqliteSaver<State> = SqliteSaver::new(file.path()).unwrap();
        let cp = Checkpoint::from_state(
            State {
                query: "tea temperature".into(),
                round: 2,
            },
            vec!["final_synthesis".into()],
            CheckpointSource::Loop,
            4,
        );
        saver.put(&cfg("u:c"), &cp).await.unwrap();

        let back = saver.get_tuple(&cfg("u:c")).await.unwrap().unwrap();
        assert_eq!(back.values, cp.values);
        assert_eq!(back.next, cp.next);
        assert_eq!(back.id, cp.id);
    }

    /// **Scenario**: latest checkpoint is the highest sequence; branching by
    /// checkpoint_id opens an earlier version.
    #[tokio::test]
    async fn sqlite_latest_and_branch() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let saver: SqliteSaver<State> = SqliteSaver::new(file.path()).unwrap();
        let first = Checkpoint::from_state(
            State {
                query: "a".into(),
                round: 1,
            },
            vec![],
            CheckpointSource::Loop,
            0,
        );
        let second = Checkpoint::from_state(
            State {
                query: "b".into(),
                round: 2,
            },
            vec![],
            CheckpointSource::Loop,
            1,
        );
        saver.put(&cfg("t"), &first).await.unwrap();
        saver.put(&cfg("t"), &second).await.unwrap();

        let latest = saver.get_tuple(&cfg("t")).await.unwrap().unwrap();
        assert_eq!(latest.values.round, 2);

        let mut named = cfg("t");
        named.checkpoint_id = Some(first.id.clone());
        let branched = saver.get_tuple(&named).await.unwrap().unwrap();
        assert_eq!(branched.values.round, 1);

        let items = saver.list(&cfg("t"), None).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].checkpoint_id, first.id);
    }
}
