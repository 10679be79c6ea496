//! Fixtures for tests that need reference data in the database.

use chrono::Utc;
use sqlx::SqlitePool;

async fn seed_user(db: &SqlitePool, id: &str, first_name: &str, last_name: &str, role: &str) {
    sqlx::query(
        "INSERT INTO user (id, first_name, last_name, role, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(first_name)
    .bind(last_name)
    .bind(role)
    .bind(Utc::now().to_rfc3339())
    .execute(db)
    .await
    .unwrap();
}

pub async fn seed_doctor(db: &SqlitePool, id: &str, first_name: &str, last_name: &str) {
    seed_user(db, id, first_name, last_name, "doctor").await;
}

pub async fn seed_patient(db: &SqlitePool, id: &str, first_name: &str, last_name: &str) {
    seed_user(db, id, first_name, last_name, "patient").await;
}

/// `visit_date` is an RFC 3339 timestamp
pub async fn seed_appointment(
    db: &SqlitePool,
    id: &str,
    patient_id: &str,
    doctor_id: &str,
    visit_date: &str,
) {
    sqlx::query(
        "INSERT INTO appointment (id, patient_id, doctor_id, visit_date, reason, created_at) \
         VALUES (?, ?, ?, ?, NULL, ?)",
    )
    .bind(id)
    .bind(patient_id)
    .bind(doctor_id)
    .bind(visit_date)
    .bind(Utc::now().to_rfc3339())
    .execute(db)
    .await
    .unwrap();
}

pub async fn seed_specialization(db: &SqlitePool, id: &str, name: &str, doctor_ids: &[&str]) {
    sqlx::query("INSERT INTO specialization (id, name) VALUES (?, ?)")
        .bind(id)
        .bind(name)
        .execute(db)
        .await
        .unwrap();

    for doctor_id in doctor_ids {
        sqlx::query(
            "INSERT INTO doctor_specialization (doctor_id, specialization_id) VALUES (?, ?)",
        )
        .bind(doctor_id)
        .bind(id)
        .execute(db)
        .await
        .unwrap();
    }
}
