mod activity;
mod state;

use std::{path::Path, sync::Arc};

use anyhow::Context;
use state::LogState;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::clamp_confidence;

pub use activity::{ActivityEntry, ActivityFilter, ActivityRepository, NewActivity, StatusFilter};

/// SQLite-backed activity log
#[derive(Debug, Clone)]
pub struct ActivityLog {
    state: Arc<LogState>,
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: String,
    plate_number: String,
    region: String,
    is_legal: bool,
    timestamp: String,
    confidence: f64,
}

impl TryFrom<ActivityRow> for ActivityEntry {
    type Error = anyhow::Error;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let timestamp = OffsetDateTime::parse(
            &row.timestamp,
            &time::format_description::well_known::Rfc3339,
        )
        .with_context(|| format!("Invalid timestamp in activity {}", row.id))?;
        Ok(ActivityEntry {
            id: Uuid::parse_str(&row.id)?,
            plate_number: row.plate_number,
            region: row.region,
            is_legal: row.is_legal,
            timestamp,
            confidence: row.confidence as f32,
        })
    }
}

impl ActivityLog {
    /// Open the log at `database_file`, creating it and its directory if missing
    pub async fn open<P: AsRef<Path>>(database_file: P) -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(LogState::open(database_file).await?),
        })
    }

    pub fn database_file(&self) -> &Path {
        self.state.database_file()
    }

    /// Flush and close the underlying connections
    pub async fn close(&self) {
        self.state.close().await;
    }
}

impl ActivityRepository for ActivityLog {
    async fn append(&self, activity: NewActivity) -> anyhow::Result<ActivityEntry> {
        let entry = ActivityEntry {
            id: Uuid::new_v4(),
            plate_number: activity.plate_number,
            region: activity.region,
            is_legal: activity.is_legal,
            timestamp: OffsetDateTime::now_utc(),
            confidence: clamp_confidence(activity.confidence),
        };
        let timestamp = entry
            .timestamp
            .format(&time::format_description::well_known::Rfc3339)?;

        let mut conn = self.state.conn().await?;
        sqlx::query(
            r#"INSERT INTO activity_log (id, plate_number, region, is_legal, timestamp, confidence)
            VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(entry.id.to_string())
        .bind(&entry.plate_number)
        .bind(&entry.region)
        .bind(entry.is_legal)
        .bind(timestamp)
        .bind(entry.confidence as f64)
        .execute(&mut **conn)
        .await?;
        Ok(entry)
    }

    async fn load_all(&self) -> anyhow::Result<Vec<ActivityEntry>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, ActivityRow>(
            r#"SELECT id, plate_number, region, is_legal, timestamp, confidence
            FROM activity_log ORDER BY seq DESC"#,
        )
        .fetch_all(&mut **conn)
        .await?
        .into_iter()
        .map(ActivityEntry::try_from)
        .collect()
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        sqlx::query("DELETE FROM activity_log")
            .execute(&mut **conn)
            .await?;
        Ok(())
    }

    async fn len(&self) -> anyhow::Result<u64> {
        let mut conn = self.state.conn().await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM activity_log")
            .fetch_one(&mut **conn)
            .await?;
        Ok(count as u64)
    }
}
