use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::info;
use uuid::Uuid;

use crate::db::{init_db, row_to_user, USER_SELECT_SQL};
use crate::error::{Result, UserError};
use crate::types::{NewUser, User};

/// Thread-safe store for user profiles.
///
/// Shares one SQLite connection with the other engine components; a Mutex is
/// sufficient at the single-node target scale.
pub struct UserStore {
    db: Arc<Mutex<Connection>>,
}

impl UserStore {
    /// Wrap a shared connection, initialising the schema if needed.
    pub fn new(db: Arc<Mutex<Connection>>) -> Result<Self> {
        {
            let conn = db.lock().unwrap();
            init_db(&conn)?;
        }
        Ok(Self { db })
    }

    /// Insert a brand-new profile. The id is generated here so the caller
    /// immediately has the canonical id without a follow-up query.
    pub fn create(&self, input: NewUser) -> Result<User> {
        validate_birthdate(&input.birthdate)?;
        if input.email.trim().is_empty() {
            return Err(UserError::InvalidInput("email must not be empty".into()));
        }

        let now = Utc::now().to_rfc3339();
        let user = User {
            id: Uuid::now_v7().to_string(),
            name: input.name,
            surname: input.surname,
            email: input.email.to_lowercase(),
            nationality: input.nationality,
            birthdate: input.birthdate,
            gender: input.gender,
            timezone: input.timezone.unwrap_or_else(|| "UTC".to_string()),
            role: routinely_core::types::Role::User,
            active: true,
            created_at: now.clone(),
            updated_at: now,
        };

        let conn = self.db.lock().unwrap();
        let inserted = conn.execute(
            "INSERT INTO users
                (id, name, surname, email, nationality, birthdate, gender,
                 timezone, role, active, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
            params![
                user.id,
                user.name,
                user.surname,
                user.email,
                user.nationality,
                user.birthdate,
                user.gender.to_string(),
                user.timezone,
                user.role.to_string(),
                user.active as i32,
                user.created_at,
                user.updated_at,
            ],
        );

        match inserted {
            Ok(_) => {
                info!(user_id = %user.id, "user created");
                Ok(user)
            }
            // The UNIQUE(email) constraint is the duplicate check.
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(UserError::AlreadyExists(user.email))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load a profile by primary key. Returns None instead of an error when
    /// absent so callers decide whether missing is exceptional.
    pub fn get(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.db.lock().unwrap();
        let sql = format!("{USER_SELECT_SQL} WHERE id = ?1");
        match conn.query_row(&sql, params![user_id], row_to_user) {
            Ok(u) => Ok(Some(u)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Change the IANA zone the midnight reset keys on.
    pub fn set_timezone(&self, user_id: &str, timezone: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.db.lock().unwrap();
        let rows = conn.execute(
            "UPDATE users SET timezone = ?2, updated_at = ?3 WHERE id = ?1",
            params![user_id, timezone, now],
        )?;
        if rows == 0 {
            return Err(UserError::NotFound(user_id.to_string()));
        }
        Ok(())
    }

    /// Soft-delete / reactivate. Inactive users are skipped by the reset
    /// engine; their routines and activities stay untouched.
    pub fn set_active(&self, user_id: &str, active: bool) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.db.lock().unwrap();
        let rows = conn.execute(
            "UPDATE users SET active = ?2, updated_at = ?3 WHERE id = ?1",
            params![user_id, active as i32, now],
        )?;
        if rows == 0 {
            return Err(UserError::NotFound(user_id.to_string()));
        }
        info!(user_id, active, "user active flag changed");
        Ok(())
    }
}

fn validate_birthdate(s: &str) -> Result<()> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| UserError::InvalidInput(format!("birthdate must be YYYY-MM-DD, got {s:?}")))
}
