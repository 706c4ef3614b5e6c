//! Group repository implementation

use sqlx::PgPool;
use crate::models::group::Group;
use crate::utils::errors::Result;

const GROUP_COLUMNS: &str = "id, name, teacher_id, weekly_day, start_time, duration_minutes, timezone, start_date, end_date, status, is_deleted, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find group by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Group>> {
        let sql = format!("SELECT {} FROM groups WHERE id = $1", GROUP_COLUMNS);
        let group = sqlx::query_as::<_, Group>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(group)
    }

    /// Active, non-archived groups
    pub async fn list_schedulable(&self) -> Result<Vec<Group>> {
        let sql = format!(
            "SELECT {} FROM groups WHERE status = 'active' AND is_deleted = false ORDER BY id ASC",
            GROUP_COLUMNS
        );
        let groups = sqlx::query_as::<_, Group>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(groups)
    }
}
