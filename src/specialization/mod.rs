/// Doctor specializations (read-only reference data)
use crate::error::ClinicResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Specialization record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialization {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait SpecializationRepository: Send + Sync {
    async fn get_all_specializations(&self) -> ClinicResult<Vec<Specialization>>;

    async fn specialization_exists(&self, id: &str) -> ClinicResult<bool>;
}

/// SQLite-backed specialization lookups
#[derive(Clone)]
pub struct SqliteSpecializationRepository {
    db: SqlitePool,
}

impl SqliteSpecializationRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SpecializationRepository for SqliteSpecializationRepository {
    async fn get_all_specializations(&self) -> ClinicResult<Vec<Specialization>> {
        let rows = sqlx::query("SELECT id, name FROM specialization ORDER BY name ASC")
            .fetch_all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Specialization {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect())
    }

    async fn specialization_exists(&self, id: &str) -> ClinicResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM specialization WHERE id = ?")
            .bind(id)
            .fetch_one(&self.db)
            .await?;

        Ok(count > 0)
    }
}
