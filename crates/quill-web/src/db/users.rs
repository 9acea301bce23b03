//! User persistence operations on the `users` table.

use quill_core::{NewUser, User};
use sqlx::{AnyConnection, AnyPool};

/// Insert a user and return the assigned id.
pub async fn insert(conn: &mut AnyConnection, user: &NewUser) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (email, password, name) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .fetch_one(conn)
    .await
}

/// Fetch a user by id.
pub async fn get_by_id(pool: &AnyPool, id: i64) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, password, name FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(UserRow::into_record))
}

/// Fetch the first user registered with `email`.
///
/// Emails are not unique at the schema level; the lowest id wins.
pub async fn find_by_email(pool: &AnyPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, password, name FROM users WHERE email = $1 ORDER BY id LIMIT 1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(UserRow::into_record))
}

/// Whether any user is registered with `email`.
pub async fn email_exists(pool: &AnyPool, email: &str) -> Result<bool, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Number of registered users.
pub async fn count(pool: &AnyPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password: String,
    name: String,
}

impl UserRow {
    fn into_record(self) -> User {
        if let Err(e) = quill_core::check_hash_format(&self.password) {
            tracing::warn!(user_id = self.id, error = %e, "stored password hash is unreadable");
        }
        User {
            id: self.id,
            email: self.email,
            password_hash: self.password,
            name: self.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ada".to_string(),
            email: email.to_string(),
            password_hash: quill_core::PasswordHasher::new(1_000).hash("pw"),
        }
    }

    #[tokio::test]
    async fn first_user_gets_id_one() {
        let (pool, _dir) = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let first = insert(&mut conn, &new_user("a@example.com")).await.unwrap();
        let second = insert(&mut conn, &new_user("b@example.com")).await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(count(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn lookup_by_id_and_email() {
        let (pool, _dir) = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let id = insert(&mut conn, &new_user("a@example.com")).await.unwrap();

        let by_id = get_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@example.com");
        assert_eq!(by_id.name, "Ada");
        assert!(quill_core::verify_password(&by_id.password_hash, "pw"));

        let by_email = find_by_email(&pool, "a@example.com").await.unwrap().unwrap();
        assert_eq!(by_email, by_id);

        assert!(get_by_id(&pool, 99).await.unwrap().is_none());
        assert!(find_by_email(&pool, "nobody@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn email_exists_is_exact_match() {
        let (pool, _dir) = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        insert(&mut conn, &new_user("a@example.com")).await.unwrap();

        assert!(email_exists(&pool, "a@example.com").await.unwrap());
        assert!(!email_exists(&pool, "b@example.com").await.unwrap());
    }
}
