use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::booth::BoothManager,
};

fn row_to_booth(row: &Row) -> Result<BoothManager> {
    Ok(BoothManager {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        name: row.try_get("name").map_err(|_| AppError::MissingData("name".to_string()))?,
        email: row.try_get("email").map_err(|_| AppError::MissingData("email".to_string()))?,
        password: row.try_get("password").map_err(|_| AppError::MissingData("password".to_string()))?,
        booth_name: row.try_get("booth_name").map_err(|_| AppError::MissingData("booth_name".to_string()))?,
        booth_location: row.try_get("booth_location").map_err(|_| AppError::MissingData("booth_location".to_string()))?,
        booth_number: row.try_get("booth_number").map_err(|_| AppError::MissingData("booth_number".to_string()))?,
        paper_capacity: row.try_get("paper_capacity").map_err(|_| AppError::MissingData("paper_capacity".to_string()))?,
        loaded_paper: row.try_get("loaded_paper").map_err(|_| AppError::MissingData("loaded_paper".to_string()))?,
        printer_name: row.try_get("printer_name").map_err(|_| AppError::MissingData("printer_name".to_string()))?,
        printer_model: row.try_get("printer_model").map_err(|_| AppError::MissingData("printer_model".to_string()))?,
        is_active: row.try_get("is_active").map_err(|_| AppError::MissingData("is_active".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
    })
}

/// Creates a booth manager (admin action).
#[allow(clippy::too_many_arguments)]
pub async fn create(
    pool: &Pool,
    name: &str,
    email: &str,
    password_hash: &str,
    booth_name: &str,
    booth_location: &str,
    booth_number: &str,
    paper_capacity: i32,
    printer_name: &str,
    printer_model: &str,
) -> Result<BoothManager> {
    let client = pool.get().await?;
    let id = Uuid::new_v4();
    let row = client
        .query_one(
            r#"
            INSERT INTO booth_managers
                (id, name, email, password, booth_name, booth_location,
                 booth_number, paper_capacity, loaded_paper, printer_name,
                 printer_model)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $10)
            RETURNING *
            "#,
            &[
                &id,
                &name,
                &email,
                &password_hash,
                &booth_name,
                &booth_location,
                &booth_number,
                &paper_capacity,
                &printer_name,
                &printer_model,
            ],
        )
        .await?;
    row_to_booth(&row)
}

/// Finds a booth manager by email.
pub async fn find_by_email(pool: &Pool, email: &str) -> Result<Option<BoothManager>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM booth_managers
            WHERE email = $1
            "#,
            &[&email],
        )
        .await?;
    row.map(|r| row_to_booth(&r)).transpose()
}

/// Finds a booth manager by ID.
pub async fn find_by_id(pool: &Pool, booth_id: &Uuid) -> Result<Option<BoothManager>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM booth_managers
            WHERE id = $1
            "#,
            &[booth_id],
        )
        .await?;
    row.map(|r| row_to_booth(&r)).transpose()
}

/// Lists all booth managers.
pub async fn list(pool: &Pool) -> Result<Vec<BoothManager>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT *
            FROM booth_managers
            ORDER BY booth_number ASC
            "#,
            &[],
        )
        .await?;
    rows.iter().map(row_to_booth).collect()
}

/// Applies an admin update to booth metadata.
pub async fn update(
    pool: &Pool,
    booth_id: &Uuid,
    paper_capacity: Option<i32>,
    printer_name: Option<&str>,
    printer_model: Option<&str>,
    is_active: Option<bool>,
) -> Result<BoothManager> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE booth_managers
            SET paper_capacity = COALESCE($2, paper_capacity),
                printer_name = COALESCE($3, printer_name),
                printer_model = COALESCE($4, printer_model),
                is_active = COALESCE($5, is_active)
            WHERE id = $1
            RETURNING *
            "#,
            &[
                booth_id,
                &paper_capacity,
                &printer_name,
                &printer_model,
                &is_active,
            ],
        )
        .await?
        .ok_or(AppError::NotFound)?;
    row_to_booth(&row)
}

/// Updates the loaded-paper count, enforcing the capacity invariant in
/// the same statement.
///
/// # Returns
///
/// The updated booth, or `None` when the count exceeded capacity.
pub async fn update_loaded_paper(
    pool: &Pool,
    booth_id: &Uuid,
    loaded_paper: i32,
) -> Result<Option<BoothManager>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE booth_managers
            SET loaded_paper = $2
            WHERE id = $1 AND $2 >= 0 AND $2 <= paper_capacity
            RETURNING *
            "#,
            &[booth_id, &loaded_paper],
        )
        .await?;
    row.map(|r| row_to_booth(&r)).transpose()
}

/// Deletes a booth manager.
pub async fn delete(pool: &Pool, booth_id: &Uuid) -> Result<()> {
    let client = pool.get().await?;
    let deleted = client
        .execute(
            r#"
            DELETE FROM booth_managers
            WHERE id = $1
            "#,
            &[booth_id],
        )
        .await?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
