use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};

use crate::Database;
use crate::models::UserRow;

impl Database {
    /// Look up a user by normalized email, creating the row (plus its
    /// default subscription) on first sight. The caller supplies fresh ids
    /// for the insert path; they are unused when the user already exists.
    ///
    /// Both inserts are `OR IGNORE`: two concurrent first-time resolutions
    /// for the same email converge on a single user row and a single
    /// subscription row, with the loser re-reading the winner's row.
    pub fn resolve_user(
        &self,
        email: &str,
        display_name: Option<&str>,
        new_user_id: &str,
        new_subscription_id: &str,
    ) -> Result<UserRow> {
        self.with_writer(|conn| {
            let tx = conn.transaction()?;

            let row = match query_user_by_email(&tx, email)? {
                Some(user) => {
                    tx.execute(
                        "UPDATE users SET last_login_at = datetime('now') WHERE id = ?1",
                        [&user.id],
                    )?;
                    if let Some(name) = display_name
                        && !name.is_empty()
                        && user.display_name.as_deref() != Some(name)
                    {
                        tx.execute(
                            "UPDATE users SET display_name = ?1 WHERE id = ?2",
                            params![name, user.id],
                        )?;
                    }
                    query_user_by_email(&tx, email)?
                        .ok_or_else(|| anyhow!("User {} vanished mid-update", email))?
                }
                None => {
                    tx.execute(
                        "INSERT OR IGNORE INTO users (id, email, display_name) VALUES (?1, ?2, ?3)",
                        params![new_user_id, email, display_name],
                    )?;
                    let user = query_user_by_email(&tx, email)?
                        .ok_or_else(|| anyhow!("User {} missing after insert", email))?;
                    tx.execute(
                        "INSERT OR IGNORE INTO subscriptions (id, user_id, provider, plan, status)
                         VALUES (?1, ?2, 'internal', 'free', 'active')",
                        params![new_subscription_id, user.id],
                    )?;
                    user
                }
            };

            tx.commit()?;
            Ok(row)
        })
    }
}

fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, email, display_name, last_login_at, created_at FROM users WHERE email = ?1",
    )?;

    let row = stmt
        .query_row([email], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                display_name: row.get(2)?,
                last_login_at: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}
