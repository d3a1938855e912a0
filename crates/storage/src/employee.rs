use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;

use crewdeck_core::types::{Employee, Position};

use crate::to_rfc3339;

/// Repository used to read and maintain employee records.
#[derive(Clone)]
pub struct EmployeeRepository {
    pub(crate) pool: SqlitePool,
}

impl EmployeeRepository {
    /// Inserts a new employee and returns its generated id.
    pub async fn insert(&self, record: &NewEmployee<'_>) -> Result<i64, EmployeeError> {
        let now = to_rfc3339(record.created_at);
        let result = sqlx::query(
            "INSERT INTO employees (employee_name, email, position, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.employee_name)
        .bind(record.email)
        .bind(record.position.as_i64())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Loads an employee by id, soft-deleted rows included.
    pub async fn fetch(&self, employee_id: i64) -> Result<Employee, EmployeeError> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            "SELECT employee_id, employee_name, email, position, created_at, updated_at, deleted_at \
             FROM employees WHERE employee_id = ?",
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(EmployeeError::NotFound)?;

        Ok(row.into_domain())
    }

    /// Lists the ids of every active admin except the provided employee.
    pub async fn admin_ids_except(&self, employee_id: i64) -> Result<Vec<i64>, EmployeeError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT employee_id FROM employees \
             WHERE employee_id != ? AND position = ? AND deleted_at IS NULL \
             ORDER BY employee_id",
        )
        .bind(employee_id)
        .bind(Position::Admin.as_i64())
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Marks an employee as deleted without removing the row.
    pub async fn soft_delete(
        &self,
        employee_id: i64,
        deleted_at: DateTime<Utc>,
    ) -> Result<(), EmployeeError> {
        let stamp = to_rfc3339(deleted_at);
        let result = sqlx::query(
            "UPDATE employees SET deleted_at = ?, updated_at = ? \
             WHERE employee_id = ? AND deleted_at IS NULL",
        )
        .bind(&stamp)
        .bind(&stamp)
        .bind(employee_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EmployeeError::NotFound);
        }
        Ok(())
    }
}

/// Data required to create an employee row.
pub struct NewEmployee<'a> {
    pub employee_name: &'a str,
    pub email: &'a str,
    pub position: Position,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct EmployeeRow {
    employee_id: i64,
    employee_name: String,
    email: String,
    position: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl EmployeeRow {
    fn into_domain(self) -> Employee {
        Employee {
            employee_id: self.employee_id,
            employee_name: self.employee_name,
            email: self.email,
            position: Position::from_i64(self.position),
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }
}

/// Errors that can occur while operating on employees.
#[derive(Debug, Error)]
pub enum EmployeeError {
    #[error("employee not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
