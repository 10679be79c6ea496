/// Resolution persistence
///
/// The repository owns all persisted resolution state. List queries return
/// rows carrying `COUNT(*) OVER ()`, so the page and its total always come
/// from the same statement.
use super::query::{
    like_pattern, DateResolutionFilter, DoctorResolutionFilter, ListQuery,
    PatientResolutionFilter, Scope, SpecializationResolutionFilter,
};
use super::{Appointment, NewResolution, Resolution, ResolutionPatch, ResolutionRow};
use crate::error::{ClinicError, ClinicResult};
use crate::metrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::time::Instant;

/// Storage contract the resolution service relies on
#[async_trait]
pub trait ResolutionRepository: Send + Sync {
    /// Insert a resolution. Fails with `DuplicateResolution` when the
    /// appointment already has one.
    async fn create_resolution(&self, record: NewResolution) -> ClinicResult<Resolution>;

    async fn update_resolution(
        &self,
        id: &str,
        patch: ResolutionPatch,
        doctor_id: &str,
    ) -> ClinicResult<Resolution>;

    async fn delete_resolution(&self, id: &str, doctor_id: &str) -> ClinicResult<String>;

    async fn get_resolution_by_appointment_id(
        &self,
        appointment_id: &str,
    ) -> ClinicResult<Option<Resolution>>;

    async fn get_resolution_by_id(&self, id: &str) -> ClinicResult<Option<Resolution>>;

    /// Resolutions for one patient
    async fn get_resolutions(
        &self,
        filter: &PatientResolutionFilter,
    ) -> ClinicResult<Vec<ResolutionRow>>;

    async fn get_patient_resolutions_by_doctor_specialization_id(
        &self,
        filter: &SpecializationResolutionFilter,
    ) -> ClinicResult<Vec<ResolutionRow>>;

    async fn get_patient_resolutions_by_date(
        &self,
        filter: &DateResolutionFilter,
    ) -> ClinicResult<Vec<ResolutionRow>>;

    /// Resolutions authored by one doctor
    async fn get_my_resolutions(
        &self,
        filter: &DoctorResolutionFilter,
    ) -> ClinicResult<Vec<ResolutionRow>>;

    async fn get_appointment_by_id(&self, id: &str) -> ClinicResult<Option<Appointment>>;
}

const RESOLUTION_COLUMNS: &str = r#"
    r.id, r.appointment_id, r.doctor_id, a.patient_id, r.resolution, a.visit_date,
    d.first_name || ' ' || d.last_name AS doctor_name,
    p.first_name || ' ' || p.last_name AS patient_name,
    r.created_at, r.updated_at"#;

const RESOLUTION_JOINS: &str = r#"
    FROM resolution r
    JOIN appointment a ON a.id = r.appointment_id
    JOIN user d ON d.id = r.doctor_id
    JOIN user p ON p.id = a.patient_id"#;

/// SQLite-backed repository
#[derive(Clone)]
pub struct SqliteResolutionRepository {
    db: SqlitePool,
}

impl SqliteResolutionRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn find_one(&self, column: &str, value: &str) -> ClinicResult<Option<Resolution>> {
        let sql = format!("SELECT {RESOLUTION_COLUMNS} {RESOLUTION_JOINS} WHERE r.{column} = ?");
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;

        row.map(|row| parse_resolution(&row)).transpose()
    }

    /// Start a list statement; callers append `AND ...` conditions
    fn list_builder(&self) -> QueryBuilder<'static, Sqlite> {
        QueryBuilder::new(format!(
            "SELECT {RESOLUTION_COLUMNS}, COUNT(*) OVER () AS total {RESOLUTION_JOINS} WHERE 1 = 1"
        ))
    }

    async fn fetch_page(
        &self,
        operation: &str,
        mut builder: QueryBuilder<'static, Sqlite>,
        scope: Scope,
        query: &ListQuery,
    ) -> ClinicResult<Vec<ResolutionRow>> {
        if let Some(name) = &query.name {
            builder
                .push(" AND ")
                .push(scope.counterpart_name_sql())
                .push(" LIKE ")
                .push_bind(like_pattern(name))
                .push(" ESCAPE '\\'");
        }

        builder
            .push(" ORDER BY ")
            .push(query.sort.order_by_sql(scope))
            .push(" LIMIT ")
            .push_bind(i64::from(query.pagination.count))
            .push(" OFFSET ")
            .push_bind(i64::from(query.pagination.offset));

        let started = Instant::now();
        let rows = builder.build().fetch_all(&self.db).await?;
        metrics::record_db_query(operation, started.elapsed().as_secs_f64());

        rows.iter()
            .map(|row| {
                Ok(ResolutionRow {
                    resolution: parse_resolution(row)?,
                    total: row.get("total"),
                })
            })
            .collect()
    }
}

#[async_trait]
impl ResolutionRepository for SqliteResolutionRepository {
    async fn create_resolution(&self, record: NewResolution) -> ClinicResult<Resolution> {
        let now = Utc::now().to_rfc3339();

        // The unique index on appointment_id is the real guard; the pre-check
        // inside the transaction only produces a cleaner error.
        let mut tx = self.db.begin().await?;

        let existing = sqlx::query("SELECT id FROM resolution WHERE appointment_id = ?")
            .bind(&record.appointment_id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(ClinicError::DuplicateResolution(record.appointment_id));
        }

        sqlx::query(
            r#"
            INSERT INTO resolution (id, appointment_id, doctor_id, resolution, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.appointment_id)
        .bind(&record.doctor_id)
        .bind(&record.resolution)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, &record.appointment_id))?;

        tx.commit()
            .await
            .map_err(|e| map_unique_violation(e, &record.appointment_id))?;

        self.find_one("id", &record.id).await?.ok_or_else(|| {
            ClinicError::Internal(format!("Resolution {} vanished after insert", record.id))
        })
    }

    async fn update_resolution(
        &self,
        id: &str,
        patch: ResolutionPatch,
        doctor_id: &str,
    ) -> ClinicResult<Resolution> {
        let result = sqlx::query(
            r#"
            UPDATE resolution
            SET resolution = ?,
                updated_at = ?
            WHERE id = ? AND doctor_id = ?
            "#,
        )
        .bind(&patch.resolution)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .bind(doctor_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::ResolutionNotFound(id.to_string()));
        }

        self.find_one("id", id)
            .await?
            .ok_or_else(|| ClinicError::ResolutionNotFound(id.to_string()))
    }

    async fn delete_resolution(&self, id: &str, doctor_id: &str) -> ClinicResult<String> {
        let result = sqlx::query("DELETE FROM resolution WHERE id = ? AND doctor_id = ?")
            .bind(id)
            .bind(doctor_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::ResolutionNotFound(id.to_string()));
        }

        Ok(id.to_string())
    }

    async fn get_resolution_by_appointment_id(
        &self,
        appointment_id: &str,
    ) -> ClinicResult<Option<Resolution>> {
        self.find_one("appointment_id", appointment_id).await
    }

    async fn get_resolution_by_id(&self, id: &str) -> ClinicResult<Option<Resolution>> {
        self.find_one("id", id).await
    }

    async fn get_resolutions(
        &self,
        filter: &PatientResolutionFilter,
    ) -> ClinicResult<Vec<ResolutionRow>> {
        let mut builder = self.list_builder();
        builder
            .push(" AND a.patient_id = ")
            .push_bind(filter.patient_id.clone());
        if let Some(date) = filter.date {
            builder
                .push(" AND date(a.visit_date) = ")
                .push_bind(date.format("%Y-%m-%d").to_string());
        }

        self.fetch_page("get_resolutions", builder, Scope::Patient, &filter.query)
            .await
    }

    async fn get_patient_resolutions_by_doctor_specialization_id(
        &self,
        filter: &SpecializationResolutionFilter,
    ) -> ClinicResult<Vec<ResolutionRow>> {
        let mut builder = self.list_builder();
        builder
            .push(" AND a.patient_id = ")
            .push_bind(filter.patient_id.clone())
            .push(
                " AND EXISTS (SELECT 1 FROM doctor_specialization ds \
                 WHERE ds.doctor_id = r.doctor_id AND ds.specialization_id = ",
            )
            .push_bind(filter.specialization_id.clone())
            .push(")");

        self.fetch_page(
            "get_resolutions_by_specialization",
            builder,
            Scope::Patient,
            &filter.query,
        )
        .await
    }

    async fn get_patient_resolutions_by_date(
        &self,
        filter: &DateResolutionFilter,
    ) -> ClinicResult<Vec<ResolutionRow>> {
        let mut builder = self.list_builder();
        builder
            .push(" AND a.patient_id = ")
            .push_bind(filter.patient_id.clone())
            .push(" AND date(a.visit_date) = ")
            .push_bind(filter.date.format("%Y-%m-%d").to_string());

        self.fetch_page(
            "get_resolutions_by_date",
            builder,
            Scope::Patient,
            &filter.query,
        )
        .await
    }

    async fn get_my_resolutions(
        &self,
        filter: &DoctorResolutionFilter,
    ) -> ClinicResult<Vec<ResolutionRow>> {
        let mut builder = self.list_builder();
        builder
            .push(" AND r.doctor_id = ")
            .push_bind(filter.doctor_id.clone());
        if let Some(date) = filter.date {
            builder
                .push(" AND date(a.visit_date) = ")
                .push_bind(date.format("%Y-%m-%d").to_string());
        }

        self.fetch_page("get_my_resolutions", builder, Scope::Doctor, &filter.query)
            .await
    }

    async fn get_appointment_by_id(&self, id: &str) -> ClinicResult<Option<Appointment>> {
        let row = sqlx::query(
            "SELECT id, patient_id, doctor_id, visit_date FROM appointment WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(|row| {
            Ok(Appointment {
                id: row.get("id"),
                patient_id: row.get("patient_id"),
                doctor_id: row.get("doctor_id"),
                visit_date: parse_timestamp(&row, "visit_date")?,
            })
        })
        .transpose()
    }
}

fn map_unique_violation(err: sqlx::Error, appointment_id: &str) -> ClinicError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            ClinicError::DuplicateResolution(appointment_id.to_string())
        }
        _ => ClinicError::Database(err),
    }
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> ClinicResult<DateTime<Utc>> {
    let raw: String = row.get(column);
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ClinicError::Internal(format!("Invalid timestamp in {}: {}", column, e)))
}

fn parse_resolution(row: &SqliteRow) -> ClinicResult<Resolution> {
    Ok(Resolution {
        id: row.get("id"),
        appointment_id: row.get("appointment_id"),
        doctor_id: row.get("doctor_id"),
        patient_id: row.get("patient_id"),
        resolution: row.get("resolution"),
        visit_date: parse_timestamp(row, "visit_date")?,
        doctor_name: row.get("doctor_name"),
        patient_name: row.get("patient_name"),
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}
