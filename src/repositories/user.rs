use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::user::{Role, User},
};

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
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

/// Finds a user by their email address.
pub async fn find_by_email(pool: &Pool, email: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM users
            WHERE email = $1
            "#,
            &[&email],
        )
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Finds a user by their ID.
pub async fn find_by_id(pool: &Pool, user_id: &Uuid) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM users
            WHERE id = $1
            "#,
            &[user_id],
        )
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Finds a user by student ID.
pub async fn find_by_student_id(pool: &Pool, student_id: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM users
            WHERE student_id = $1
            "#,
            &[&student_id],
        )
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Finds a user by RFID card number.
pub async fn find_by_rfid(pool: &Pool, rfid: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM users
            WHERE rfid_card_number = $1
            "#,
            &[&rfid],
        )
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Reports which identity field is already taken by a verified user.
pub async fn find_identity_conflict(
    pool: &Pool,
    email: &str,
    student_id: &str,
    rfid: &str,
) -> Result<Option<&'static str>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT email, student_id, rfid_card_number
            FROM users
            WHERE email = $1 OR student_id = $2 OR rfid_card_number = $3
            LIMIT 1
            "#,
            &[&email, &student_id, &rfid],
        )
        .await?;

    Ok(row.map(|r| {
        let existing_email: String = r.get("email");
        let existing_sid: String = r.get("student_id");
        if existing_email == email {
            "email"
        } else if existing_sid == student_id {
            "student ID"
        } else {
            "RFID card number"
        }
    }))
}

/// Lists all users, newest first.
pub async fn list_users(pool: &Pool, limit: i64, offset: i64) -> Result<Vec<User>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT *
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
            &[&limit, &offset],
        )
        .await?;
    rows.iter().map(row_to_user).collect()
}

/// Gets a user's current point balance.
pub async fn get_points(pool: &Pool, user_id: &Uuid) -> Result<i32> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT points
            FROM users
            WHERE id = $1
            "#,
            &[user_id],
        )
        .await?
        .ok_or(AppError::NotFound)?;
    row.try_get("points")
        .map_err(|_| AppError::MissingData("points".to_string()))
}

/// Atomically deducts points, requiring a sufficient balance.
///
/// The check and the write are one conditional statement so two
/// concurrent completions can never both spend the same balance.
///
/// # Returns
///
/// The new balance, or `None` when the balance was insufficient.
pub async fn deduct_points(pool: &Pool, user_id: &Uuid, amount: i32) -> Result<Option<i32>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE users
            SET points = GREATEST(0, points - $2), updated_at = NOW()
            WHERE id = $1 AND points >= $2
            RETURNING points
            "#,
            &[user_id, &amount],
        )
        .await?;
    row.map(|r| {
        r.try_get("points")
            .map_err(|_| AppError::MissingData("points".to_string()))
    })
    .transpose()
}

/// Adds points to a balance (administrative grant or saga refund).
pub async fn add_points(pool: &Pool, user_id: &Uuid, amount: i32) -> Result<i32> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE users
            SET points = points + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING points
            "#,
            &[user_id, &amount],
        )
        .await?
        .ok_or(AppError::NotFound)?;
    row.try_get("points")
        .map_err(|_| AppError::MissingData("points".to_string()))
}

/// Sets a user's absolute point balance (admin edit).
pub async fn set_points(pool: &Pool, user_id: &Uuid, points: i32) -> Result<()> {
    let client = pool.get().await?;
    let updated = client
        .execute(
            r#"
            UPDATE users
            SET points = $2, updated_at = NOW()
            WHERE id = $1
            "#,
            &[user_id, &points],
        )
        .await?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Updates a user's role.
pub async fn set_role(pool: &Pool, user_id: &Uuid, role: Role) -> Result<()> {
    let client = pool.get().await?;
    let updated = client
        .execute(
            r#"
            UPDATE users
            SET role = $2, updated_at = NOW()
            WHERE id = $1
            "#,
            &[user_id, &role],
        )
        .await?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Updates a user's verification flag.
pub async fn set_verified(pool: &Pool, user_id: &Uuid, verified: bool) -> Result<()> {
    let client = pool.get().await?;
    let updated = client
        .execute(
            r#"
            UPDATE users
            SET is_verified = $2, updated_at = NOW()
            WHERE id = $1
            "#,
            &[user_id, &verified],
        )
        .await?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Updates a user's password hash.
pub async fn update_password(pool: &Pool, user_id: &Uuid, password_hash: &str) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            r#"
            UPDATE users
            SET password = $2, updated_at = NOW()
            WHERE id = $1
            "#,
            &[user_id, &password_hash],
        )
        .await?;
    Ok(())
}

/// Deletes a user. Print jobs cascade via the foreign key; the caller
/// collects their storage references beforehand for file cleanup.
pub async fn delete_user(pool: &Pool, user_id: &Uuid) -> Result<()> {
    let client = pool.get().await?;
    let deleted = client
        .execute(
            r#"
            DELETE FROM users
            WHERE id = $1
            "#,
            &[user_id],
        )
        .await?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
