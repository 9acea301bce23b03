//! Comment persistence operations on the `comments` table.

use quill_core::{Comment, CommentWithAuthor, NewComment};
use sqlx::{AnyConnection, AnyPool};

/// Insert a comment and return the assigned id.
pub async fn insert(conn: &mut AnyConnection, comment: &NewComment) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO comments (body, time, user_id, post_id) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&comment.body)
    .bind(&comment.time)
    .bind(comment.user_id)
    .bind(comment.post_id)
    .fetch_one(conn)
    .await
}

/// Comments on `post_id` in insertion order, with author name and email.
pub async fn find_comments_by_post(
    pool: &AnyPool,
    post_id: i64,
) -> Result<Vec<CommentWithAuthor>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CommentAuthorRow>(
        "SELECT c.id, c.body, c.time, c.user_id, c.post_id,
         u.name AS author_name, u.email AS author_email
         FROM comments c JOIN users u ON u.id = c.user_id
         WHERE c.post_id = $1
         ORDER BY c.id",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CommentAuthorRow::into_record).collect())
}

/// Delete every comment on `post_id`, returning how many were removed.
pub async fn delete_by_post(conn: &mut AnyConnection, post_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM comments WHERE post_id = $1")
        .bind(post_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Number of comments.
pub async fn count(pool: &AnyPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments")
        .fetch_one(pool)
        .await
}

#[derive(sqlx::FromRow)]
struct CommentAuthorRow {
    id: i64,
    body: String,
    time: String,
    user_id: i64,
    post_id: i64,
    author_name: String,
    author_email: String,
}

impl CommentAuthorRow {
    fn into_record(self) -> CommentWithAuthor {
        CommentWithAuthor {
            comment: Comment {
                id: self.id,
                body: self.body,
                time: self.time,
                user_id: self.user_id,
                post_id: self.post_id,
            },
            author_name: self.author_name,
            author_email: self.author_email,
        }
    }
}
