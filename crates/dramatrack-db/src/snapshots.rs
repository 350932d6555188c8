//! Postgres-backed [`SnapshotStore`] over the `snapshots` and `ranked_items` tables.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dramatrack_core::{
    validate_snapshot, HistoryPoint, ItemRecord, Snapshot, SnapshotPair, SnapshotStore,
    StoreError,
};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotHeaderRow {
    pub id: i64,
    pub platform: String,
    pub captured_at: DateTime<Utc>,
    pub item_count: i32,
    pub created_at: DateTime<Utc>,
}

/// A row from the `ranked_items` table.
///
/// Integer columns are signed in Postgres; `CHECK` constraints keep them
/// non-negative so the conversions in [`RankedItemRow::into_record`] only
/// fail on rows written outside this crate.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RankedItemRow {
    pub snapshot_id: i64,
    pub platform: String,
    pub captured_at: DateTime<Utc>,
    pub item_id: String,
    pub title: String,
    pub rank: i32,
    pub read_count: i64,
    pub collect_count: i64,
    pub genres: Vec<String>,
    pub description: Option<String>,
    pub episode_count: Option<i32>,
    pub like_count: Option<i64>,
    pub score: Option<f64>,
    pub cover_url: Option<String>,
}

impl RankedItemRow {
    fn into_record(self) -> Result<ItemRecord, DbError> {
        Ok(ItemRecord {
            rank: to_unsigned("ranked_items.rank", self.rank)?,
            read_count: to_unsigned("ranked_items.read_count", self.read_count)?,
            collect_count: to_unsigned("ranked_items.collect_count", self.collect_count)?,
            episode_count: self
                .episode_count
                .map(|v| to_unsigned("ranked_items.episode_count", v))
                .transpose()?,
            like_count: self
                .like_count
                .map(|v| to_unsigned("ranked_items.like_count", v))
                .transpose()?,
            genres: self.genres.into_iter().collect(),
            platform: self.platform,
            item_id: self.item_id,
            title: self.title,
            captured_at: self.captured_at,
            description: self.description,
            score: self.score,
            cover_url: self.cover_url,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    captured_at: DateTime<Utc>,
    rank: i32,
    read_count: i64,
    collect_count: i64,
}

fn to_unsigned<S, U>(column: &'static str, value: S) -> Result<U, DbError>
where
    S: Copy + std::fmt::Display,
    U: TryFrom<S>,
{
    U::try_from(value).map_err(|_| DbError::OutOfRange {
        column,
        value: value.to_string(),
    })
}

fn to_signed<U, S>(column: &'static str, value: U) -> Result<S, DbError>
where
    U: Copy + std::fmt::Display,
    S: TryFrom<U>,
{
    S::try_from(value).map_err(|_| DbError::OutOfRange {
        column,
        value: value.to_string(),
    })
}

fn read_error(err: impl std::fmt::Display) -> StoreError {
    StoreError::Read(err.to_string())
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

const HEADER_COLUMNS: &str = "id, platform, captured_at, item_count, created_at";

const ITEM_COLUMNS: &str = "snapshot_id, platform, captured_at, item_id, title, rank, \
     read_count, collect_count, genres, description, episode_count, like_count, score, cover_url";

/// Snapshot history persisted in Postgres.
///
/// Each [`SnapshotStore::append`] runs in one transaction that first takes a
/// transaction-scoped advisory lock keyed on the platform id, so concurrent
/// appends for the same platform commit one after the other. Database
/// triggers reject `UPDATE` and `DELETE` on both tables.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_snapshot(
        &self,
        platform: &str,
        captured_at: DateTime<Utc>,
        records: &[ItemRecord],
    ) -> Result<i64, DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1)::bigint)")
            .bind(platform)
            .execute(&mut *tx)
            .await?;

        let item_count: i32 = to_signed("snapshots.item_count", records.len())?;
        let snapshot_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO snapshots (platform, captured_at, item_count) \
             VALUES ($1, $2, $3) \
             RETURNING id",
        )
        .bind(platform)
        .bind(captured_at)
        .bind(item_count)
        .fetch_one(&mut *tx)
        .await?;

        for record in records {
            let rank: i32 = to_signed("ranked_items.rank", record.rank)?;
            let read_count: i64 = to_signed("ranked_items.read_count", record.read_count)?;
            let collect_count: i64 =
                to_signed("ranked_items.collect_count", record.collect_count)?;
            let episode_count: Option<i32> = record
                .episode_count
                .map(|v| to_signed("ranked_items.episode_count", v))
                .transpose()?;
            let like_count: Option<i64> = record
                .like_count
                .map(|v| to_signed("ranked_items.like_count", v))
                .transpose()?;
            let genres: Vec<&str> = record.genres.iter().map(String::as_str).collect();

            sqlx::query(
                "INSERT INTO ranked_items \
                     (snapshot_id, platform, captured_at, item_id, title, rank, \
                      read_count, collect_count, genres, description, episode_count, \
                      like_count, score, cover_url) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
            )
            .bind(snapshot_id)
            .bind(platform)
            .bind(captured_at)
            .bind(&record.item_id)
            .bind(&record.title)
            .bind(rank)
            .bind(read_count)
            .bind(collect_count)
            .bind(genres)
            .bind(&record.description)
            .bind(episode_count)
            .bind(like_count)
            .bind(record.score)
            .bind(&record.cover_url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(snapshot_id)
    }

    /// Attach item rows to their headers, preserving header order.
    async fn load_snapshots(
        &self,
        headers: Vec<SnapshotHeaderRow>,
    ) -> Result<Vec<Snapshot>, DbError> {
        if headers.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = headers.iter().map(|h| h.id).collect();

        let rows = sqlx::query_as::<_, RankedItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM ranked_items \
             WHERE snapshot_id = ANY($1) \
             ORDER BY snapshot_id, rank"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_snapshot: HashMap<i64, Vec<ItemRecord>> = HashMap::new();
        for row in rows {
            let snapshot_id = row.snapshot_id;
            by_snapshot
                .entry(snapshot_id)
                .or_default()
                .push(row.into_record()?);
        }

        Ok(headers
            .into_iter()
            .map(|h| Snapshot {
                items: by_snapshot.remove(&h.id).unwrap_or_default(),
                platform: h.platform,
                captured_at: h.captured_at,
                sequence: h.id,
            })
            .collect())
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn append(
        &self,
        platform: &str,
        captured_at: DateTime<Utc>,
        mut records: Vec<ItemRecord>,
    ) -> Result<Snapshot, StoreError> {
        validate_snapshot(platform, &records)?;
        records.sort_by_key(|r| r.rank);
        for r in &mut records {
            r.captured_at = captured_at;
        }

        let snapshot_id = self
            .insert_snapshot(platform, captured_at, &records)
            .await
            .map_err(|e| StoreError::Write {
                platform: platform.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(
            platform,
            snapshot_id,
            items = records.len(),
            "snapshot committed"
        );

        Ok(Snapshot {
            platform: platform.to_string(),
            captured_at,
            sequence: snapshot_id,
            items: records,
        })
    }

    async fn latest_two(&self, platform: &str) -> Result<SnapshotPair, StoreError> {
        let headers = sqlx::query_as::<_, SnapshotHeaderRow>(&format!(
            "SELECT {HEADER_COLUMNS} FROM snapshots \
             WHERE platform = $1 \
             ORDER BY captured_at DESC, id DESC \
             LIMIT 2"
        ))
        .bind(platform)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error)?;

        let mut newest_first = self
            .load_snapshots(headers)
            .await
            .map_err(read_error)?
            .into_iter();
        let current = newest_first.next();
        let previous = newest_first.next();
        Ok(SnapshotPair { previous, current })
    }

    async fn snapshots_since(
        &self,
        platform: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Snapshot>, StoreError> {
        let headers = sqlx::query_as::<_, SnapshotHeaderRow>(&format!(
            "SELECT {HEADER_COLUMNS} FROM snapshots \
             WHERE platform = $1 AND captured_at >= $2 \
             ORDER BY captured_at ASC, id ASC"
        ))
        .bind(platform)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error)?;

        self.load_snapshots(headers).await.map_err(read_error)
    }

    async fn item_history(
        &self,
        platform: &str,
        item_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, StoreError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT captured_at, rank, read_count, collect_count \
             FROM ranked_items \
             WHERE platform = $1 AND item_id = $2 AND captured_at >= $3 \
             ORDER BY captured_at ASC, snapshot_id ASC",
        )
        .bind(platform)
        .bind(item_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error)?;

        rows.into_iter()
            .map(|r| {
                Ok(HistoryPoint {
                    captured_at: r.captured_at,
                    rank: to_unsigned("ranked_items.rank", r.rank)?,
                    read_count: to_unsigned("ranked_items.read_count", r.read_count)?,
                    collect_count: to_unsigned("ranked_items.collect_count", r.collect_count)?,
                })
            })
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(read_error)
    }

    async fn platforms(&self) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>("SELECT DISTINCT platform FROM snapshots ORDER BY platform")
            .fetch_all(&self.pool)
            .await
            .map_err(read_error)
    }
}
