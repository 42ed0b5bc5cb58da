use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::pending_user::PendingUser,
    models::user::User,
};

fn row_to_pending(row: &Row) -> Result<PendingUser> {
    Ok(PendingUser {
        email: row.try_get("email").map_err(|_| AppError::MissingData("email".to_string()))?,
        name: row.try_get("name").map_err(|_| AppError::MissingData("name".to_string()))?,
        student_id: row.try_get("student_id").map_err(|_| AppError::MissingData("student_id".to_string()))?,
        rfid_card_number: row.try_get("rfid_card_number").map_err(|_| AppError::MissingData("rfid_card_number".to_string()))?,
        phone: row.try_get("phone").map_err(|_| AppError::MissingData("phone".to_string()))?,
        password: row.try_get("password").map_err(|_| AppError::MissingData("password".to_string()))?,
        verification_code: row.try_get("verification_code").map_err(|_| AppError::MissingData("verification_code".to_string()))?,
        code_expires_at: row.try_get("code_expires_at").map_err(|_| AppError::MissingData("code_expires_at".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
    })
}

/// Upserts the single pending registration for an email.
///
/// Registering again (or resending) replaces the previous code, keeping
/// one active code per email at a time.
pub async fn upsert(
    pool: &Pool,
    email: &str,
    name: &str,
    student_id: &str,
    rfid: &str,
    phone: &str,
    password_hash: &str,
    code: &str,
    code_expires_at: DateTime<Utc>,
) -> Result<PendingUser> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO pending_users
                (email, name, student_id, rfid_card_number, phone, password,
                 verification_code, code_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email) DO UPDATE SET
                name = EXCLUDED.name,
                student_id = EXCLUDED.student_id,
                rfid_card_number = EXCLUDED.rfid_card_number,
                phone = EXCLUDED.phone,
                password = EXCLUDED.password,
                verification_code = EXCLUDED.verification_code,
                code_expires_at = EXCLUDED.code_expires_at
            RETURNING *
            "#,
            &[
                &email,
                &name,
                &student_id,
                &rfid,
                &phone,
                &password_hash,
                &code,
                &code_expires_at,
            ],
        )
        .await?;
    row_to_pending(&row)
}

/// Finds the pending registration for an email, if any.
pub async fn find_by_email(pool: &Pool, email: &str) -> Result<Option<PendingUser>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM pending_users
            WHERE email = $1
            "#,
            &[&email],
        )
        .await?;
    row.map(|r| row_to_pending(&r)).transpose()
}

/// Refreshes the verification code on an existing pending row.
pub async fn refresh_code(
    pool: &Pool,
    email: &str,
    code: &str,
    code_expires_at: DateTime<Utc>,
) -> Result<()> {
    let client = pool.get().await?;
    let updated = client
        .execute(
            r#"
            UPDATE pending_users
            SET verification_code = $2, code_expires_at = $3
            WHERE email = $1
            "#,
            &[&email, &code, &code_expires_at],
        )
        .await?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Promotes a pending registration to a verified user.
///
/// The insert and the pending-row delete run in one transaction so a
/// crash cannot leave both (or neither) behind. The stored hash is
/// reused as-is.
pub async fn promote(pool: &Pool, pending: &PendingUser) -> Result<User> {
    let mut client = pool.get().await?;
    let transaction = client.transaction().await?;

    let id = Uuid::new_v4();
    let row = transaction
        .query_one(
            r#"
            INSERT INTO users
                (id, name, student_id, rfid_card_number, email, phone, password,
                 is_verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7, true)
            RETURNING *
            "#,
            &[
                &id,
                &pending.name,
                &pending.student_id,
                &pending.rfid_card_number,
                &pending.email,
                &pending.phone,
                &pending.password,
            ],
        )
        .await?;

    transaction
        .execute(
            r#"
            DELETE FROM pending_users
            WHERE email = $1
            "#,
            &[&pending.email],
        )
        .await?;

    transaction.commit().await?;

    row_to_promoted_user(&row)
}

fn row_to_promoted_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        name: row.try_get("name").map_err(|_| AppError::MissingData("name".to_string()))?,
        student_id: row.try_get("student_id").map_err(|_| AppError::MissingData("student_id".to_string()))?,
        rfid_card_number: row.try_get("rfid_card_number").map_err(|_| AppError::MissingData("rfid_card_number".to_string()))?,
        email: row.try_get("email").map_err(|_| AppError::MissingData("email".to_string()))?,
        phone: row.try_get("phone").map_err(|_| AppError::MissingData("phone".to_string()))?,
        password: row.try_get("password").map_err(|_| AppError::MissingData("password".to_string()))?,
        role: row.try_get("role").map_err(|_| AppError::MissingData("role".to_string()))?,
        points: row.try_get("points").map_err(|_| AppError::MissingData("points".to_string()))?,
        is_verified: row.try_get("is_verified").map_err(|_| AppError::MissingData("is_verified".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}
