//! `StorageBackend` implementation over two `libSQL` tables, one connection
//! per call (mirrors the teacher's `get_connection().await` pattern).

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use libsql::{params, Row};
use tracing::debug;

use reason_memory_core::embeddings::cosine_similarity;
use reason_memory_core::error::{Error, Result};
use reason_memory_core::memory::stats::compute_statistics;
use reason_memory_core::storage::{
    MemoryMetadata, RetentionReport, SimilarityFilters, SimilarityMatch, SimilarityMetric,
    StorageBackend, WorkspaceDeletionReport,
};
use reason_memory_core::types::{MemoryId, MemoryItem, ReasoningTrace, Statistics, TraceId, WorkspaceId};

use crate::HostedStorage;

fn trace_from_row(row: &Row) -> Result<ReasoningTrace> {
    let payload: String = row
        .get(5)
        .map_err(|e| Error::Storage(format!("read trace payload column: {e}")))?;
    Ok(serde_json::from_str(&payload)?)
}

fn memory_from_row(row: &Row) -> Result<MemoryItem> {
    let payload: String = row
        .get(5)
        .map_err(|e| Error::Storage(format!("read memory payload column: {e}")))?;
    Ok(serde_json::from_str(&payload)?)
}

#[async_trait]
impl StorageBackend for HostedStorage {
    fn similarity_metric(&self) -> SimilarityMetric {
        SimilarityMetric::CosineComplement
    }

    async fn store_trace(&self, trace: &ReasoningTrace, memories: &[MemoryItem]) -> Result<TraceId> {
        let mut trace = trace.clone();
        if trace.task_embedding.is_none() {
            trace.task_embedding = Some(self.embedder.embed(&trace.task)?);
        }
        let mut memories = memories.to_vec();
        for memory in &mut memories {
            if memory.content_embedding.is_none() {
                memory.content_embedding = Some(self.embedder.embed(&memory.content)?);
            }
        }
        trace.memory_items = memories.iter().map(|m| m.id).collect();

        let conn = self.connection().await?;
        conn.execute("BEGIN", ())
            .await
            .map_err(|e| Error::Storage(format!("begin transaction: {e}")))?;

        let result: Result<()> = async {
            let trace_payload = serde_json::to_string(&trace)?;
            conn.execute(
                "INSERT OR REPLACE INTO traces (id, task, workspace_id, outcome, timestamp_unix, payload) \
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    trace.id.to_string(),
                    trace.task.clone(),
                    trace.workspace_id.clone(),
                    trace.outcome.to_string(),
                    trace.timestamp.timestamp(),
                    trace_payload,
                ],
            )
            .await
            .map_err(|e| Error::Storage(format!("insert trace: {e}")))?;

            for memory in &memories {
                let payload = serde_json::to_string(memory)?;
                conn.execute(
                    "INSERT OR REPLACE INTO memories \
                     (id, workspace_id, domain_category, has_error_context, created_at_unix, payload) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                    params![
                        memory.id.to_string(),
                        memory.workspace_id.clone(),
                        memory.domain_category.clone(),
                        i64::from(memory.error_context.is_some()),
                        memory.created_at.timestamp(),
                        payload,
                    ],
                )
                .await
                .map_err(|e| Error::Storage(format!("insert memory: {e}")))?;
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                conn.execute("COMMIT", ())
                    .await
                    .map_err(|e| Error::Storage(format!("commit: {e}")))?;
                debug!(trace_id = %trace.id, memories = memories.len(), "stored trace");
                Ok(trace.id)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }

    async fn query_similar_memories(
        &self,
        query_text: &str,
        k: usize,
        filters: &SimilarityFilters,
        workspace_id: Option<&WorkspaceId>,
    ) -> Result<Vec<SimilarityMatch>> {
        let query_embedding = self.embedder.embed(query_text)?;
        let conn = self.connection().await?;

        let (sql, bound_workspace): (&str, Option<String>) = match workspace_id {
            Some(ws) => (
                "SELECT id, workspace_id, domain_category, has_error_context, created_at_unix, payload \
                 FROM memories WHERE workspace_id = ?",
                Some(ws.clone()),
            ),
            None => (
                "SELECT id, workspace_id, domain_category, has_error_context, created_at_unix, payload \
                 FROM memories",
                None,
            ),
        };

        let mut rows = match bound_workspace {
            Some(ws) => conn
                .query(sql, params![ws])
                .await
                .map_err(|e| Error::Storage(format!("query memories: {e}")))?,
            None => conn
                .query(sql, ())
                .await
                .map_err(|e| Error::Storage(format!("query memories: {e}")))?,
        };

        let mut candidates = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::Storage(format!("fetch memory row: {e}")))?
        {
            let memory = memory_from_row(&row)?;
            if !filters.include_failures && memory.error_context.is_some() {
                continue;
            }
            if let Some(domain) = &filters.domain_filter {
                if &memory.domain_category != domain {
                    continue;
                }
            }
            if let Some(tags) = &filters.pattern_tags {
                if !tags.iter().any(|t| memory.pattern_tags.contains(t)) {
                    continue;
                }
            }
            let Some(embedding) = &memory.content_embedding else {
                continue;
            };
            let similarity = cosine_similarity(&query_embedding, embedding);
            if let Some(min_similarity) = filters.min_similarity {
                if similarity < min_similarity {
                    continue;
                }
            }
            candidates.push(SimilarityMatch {
                memory,
                distance: 1.0 - similarity,
            });
        }

        candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        candidates.truncate(k);
        Ok(candidates)
    }

    async fn get_trace(&self, id: TraceId) -> Result<Option<ReasoningTrace>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(
                "SELECT id, task, workspace_id, outcome, timestamp_unix, payload FROM traces WHERE id = ?",
                params![id.to_string()],
            )
            .await
            .map_err(|e| Error::Storage(format!("query trace: {e}")))?;
        match rows
            .next()
            .await
            .map_err(|e| Error::Storage(format!("fetch trace row: {e}")))?
        {
            Some(row) => Ok(Some(trace_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_memory(&self, id: MemoryId) -> Result<Option<MemoryItem>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(
                "SELECT id, workspace_id, domain_category, has_error_context, created_at_unix, payload \
                 FROM memories WHERE id = ?",
                params![id.to_string()],
            )
            .await
            .map_err(|e| Error::Storage(format!("query memory: {e}")))?;
        match rows
            .next()
            .await
            .map_err(|e| Error::Storage(format!("fetch memory row: {e}")))?
        {
            Some(row) => Ok(Some(memory_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn count_traces(&self) -> Result<u64> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM traces", ())
            .await
            .map_err(|e| Error::Storage(format!("count traces: {e}")))?;
        let row = rows
            .next()
            .await
            .map_err(|e| Error::Storage(format!("fetch count row: {e}")))?
            .ok_or_else(|| Error::Storage("COUNT(*) returned no row".to_string()))?;
        let count: i64 = row.get(0).map_err(|e| Error::Storage(e.to_string()))?;
        Ok(count as u64)
    }

    async fn count_memories(&self) -> Result<u64> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM memories", ())
            .await
            .map_err(|e| Error::Storage(format!("count memories: {e}")))?;
        let row = rows
            .next()
            .await
            .map_err(|e| Error::Storage(format!("fetch count row: {e}")))?
            .ok_or_else(|| Error::Storage("COUNT(*) returned no row".to_string()))?;
        let count: i64 = row.get(0).map_err(|e| Error::Storage(e.to_string()))?;
        Ok(count as u64)
    }

    async fn get_statistics(&self) -> Result<Statistics> {
        let traces = self.list_all_traces(None).await?;
        let memories = self.list_all_memories(None).await?;
        Ok(compute_statistics(&traces, &memories))
    }

    async fn get_all_memories_metadata(
        &self,
        workspace_id: Option<&WorkspaceId>,
    ) -> Result<Vec<MemoryMetadata>> {
        let memories = self.list_all_memories(workspace_id).await?;
        Ok(memories
            .into_iter()
            .map(|m| MemoryMetadata {
                id: m.id,
                parent_memory_id: m.parent_memory_id,
                derived_from: m.derived_from,
                evolution_stage: m.evolution_stage,
                workspace_id: m.workspace_id,
            })
            .collect())
    }

    async fn delete_old_traces(
        &self,
        retention_days: u32,
        workspace_id: Option<&WorkspaceId>,
    ) -> Result<RetentionReport> {
        let cutoff = Utc::now() - ChronoDuration::days(i64::from(retention_days));
        let stale_traces: Vec<ReasoningTrace> = self
            .list_all_traces(workspace_id)
            .await?
            .into_iter()
            .filter(|t| t.timestamp < cutoff)
            .collect();
        let stale_memory_ids: std::collections::HashSet<MemoryId> = stale_traces
            .iter()
            .flat_map(|t| t.memory_items.iter().copied())
            .collect();

        let conn = self.connection().await?;
        for trace in &stale_traces {
            conn.execute("DELETE FROM traces WHERE id = ?", params![trace.id.to_string()])
                .await
                .map_err(|e| Error::Storage(format!("delete trace: {e}")))?;
        }
        for id in &stale_memory_ids {
            conn.execute("DELETE FROM memories WHERE id = ?", params![id.to_string()])
                .await
                .map_err(|e| Error::Storage(format!("delete memory: {e}")))?;
        }

        Ok(RetentionReport {
            deleted_traces: stale_traces.len() as u64,
            deleted_memories: stale_memory_ids.len() as u64,
            freed_bytes_estimate: 0,
            cutoff,
        })
    }

    async fn delete_workspace(&self, workspace_id: &WorkspaceId) -> Result<WorkspaceDeletionReport> {
        let conn = self.connection().await?;
        let trace_count = self.count_workspace_rows(&conn, "traces", workspace_id).await?;
        let memory_count = self.count_workspace_rows(&conn, "memories", workspace_id).await?;

        conn.execute(
            "DELETE FROM traces WHERE workspace_id = ?",
            params![workspace_id.clone()],
        )
        .await
        .map_err(|e| Error::Storage(format!("delete workspace traces: {e}")))?;
        conn.execute(
            "DELETE FROM memories WHERE workspace_id = ?",
            params![workspace_id.clone()],
        )
        .await
        .map_err(|e| Error::Storage(format!("delete workspace memories: {e}")))?;

        Ok(WorkspaceDeletionReport {
            deleted_traces: trace_count,
            deleted_memories: memory_count,
        })
    }

    async fn list_all_traces(&self, workspace_id: Option<&WorkspaceId>) -> Result<Vec<ReasoningTrace>> {
        let conn = self.connection().await?;
        let mut rows = match workspace_id {
            Some(ws) => conn
                .query(
                    "SELECT id, task, workspace_id, outcome, timestamp_unix, payload FROM traces WHERE workspace_id = ?",
                    params![ws.clone()],
                )
                .await
                .map_err(|e| Error::Storage(format!("list traces: {e}")))?,
            None => conn
                .query(
                    "SELECT id, task, workspace_id, outcome, timestamp_unix, payload FROM traces",
                    (),
                )
                .await
                .map_err(|e| Error::Storage(format!("list traces: {e}")))?,
        };
        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::Storage(format!("fetch trace row: {e}")))?
        {
            out.push(trace_from_row(&row)?);
        }
        Ok(out)
    }

    async fn list_all_memories(&self, workspace_id: Option<&WorkspaceId>) -> Result<Vec<MemoryItem>> {
        let conn = self.connection().await?;
        let mut rows = match workspace_id {
            Some(ws) => conn
                .query(
                    "SELECT id, workspace_id, domain_category, has_error_context, created_at_unix, payload \
                     FROM memories WHERE workspace_id = ?",
                    params![ws.clone()],
                )
                .await
                .map_err(|e| Error::Storage(format!("list memories: {e}")))?,
            None => conn
                .query(
                    "SELECT id, workspace_id, domain_category, has_error_context, created_at_unix, payload \
                     FROM memories",
                    (),
                )
                .await
                .map_err(|e| Error::Storage(format!("list memories: {e}")))?,
        };
        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::Storage(format!("fetch memory row: {e}")))?
        {
            out.push(memory_from_row(&row)?);
        }
        Ok(out)
    }

    async fn restore_records(
        &self,
        traces: &[ReasoningTrace],
        memories: &[MemoryItem],
        overwrite: bool,
    ) -> Result<(u64, u64)> {
        let conn = self.connection().await?;
        let mut traces_inserted = 0u64;
        let mut memories_inserted = 0u64;

        for trace in traces {
            if !overwrite && self.get_trace(trace.id).await?.is_some() {
                continue;
            }
            let payload = serde_json::to_string(trace)?;
            conn.execute(
                "INSERT OR REPLACE INTO traces (id, task, workspace_id, outcome, timestamp_unix, payload) \
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    trace.id.to_string(),
                    trace.task.clone(),
                    trace.workspace_id.clone(),
                    trace.outcome.to_string(),
                    trace.timestamp.timestamp(),
                    payload,
                ],
            )
            .await
            .map_err(|e| Error::Storage(format!("restore trace: {e}")))?;
            traces_inserted += 1;
        }

        for memory in memories {
            if !overwrite && self.get_memory(memory.id).await?.is_some() {
                continue;
            }
            let payload = serde_json::to_string(memory)?;
            conn.execute(
                "INSERT OR REPLACE INTO memories \
                 (id, workspace_id, domain_category, has_error_context, created_at_unix, payload) \
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    memory.id.to_string(),
                    memory.workspace_id.clone(),
                    memory.domain_category.clone(),
                    i64::from(memory.error_context.is_some()),
                    memory.created_at.timestamp(),
                    payload,
                ],
            )
            .await
            .map_err(|e| Error::Storage(format!("restore memory: {e}")))?;
            memories_inserted += 1;
        }

        Ok((traces_inserted, memories_inserted))
    }
}

impl HostedStorage {
    async fn count_workspace_rows(
        &self,
        conn: &libsql::Connection,
        table: &str,
        workspace_id: &WorkspaceId,
    ) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE workspace_id = ?");
        let mut rows = conn
            .query(&sql, params![workspace_id.clone()])
            .await
            .map_err(|e| Error::Storage(format!("count {table} rows: {e}")))?;
        let row = rows
            .next()
            .await
            .map_err(|e| Error::Storage(format!("fetch count row: {e}")))?
            .ok_or_else(|| Error::Storage("COUNT(*) returned no row".to_string()))?;
        let count: i64 = row.get(0).map_err(|e| Error::Storage(e.to_string()))?;
        Ok(count as u64)
    }
}
