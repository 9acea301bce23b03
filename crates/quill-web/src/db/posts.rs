//! Post persistence operations on the `blog_posts` table.

use quill_core::{NewPost, Post, PostUpdate, PostWithAuthor};
use sqlx::{AnyConnection, AnyPool};

const POST_COLUMNS: &str = "id, title, subtitle, date, body, img_url, user_id";

/// Insert a post and return the assigned id.
pub async fn insert(conn: &mut AnyConnection, post: &NewPost) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO blog_posts (title, subtitle, date, body, img_url, user_id)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(&post.title)
    .bind(&post.subtitle)
    .bind(&post.date)
    .bind(&post.body)
    .bind(&post.img_url)
    .bind(post.user_id)
    .fetch_one(conn)
    .await
}

/// All posts in insertion order, each with its author's name.
pub async fn list_all(pool: &AnyPool) -> Result<Vec<PostWithAuthor>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PostAuthorRow>(
        "SELECT p.id, p.title, p.subtitle, p.date, p.body, p.img_url, p.user_id,
         u.name AS author_name
         FROM blog_posts p JOIN users u ON u.id = p.user_id
         ORDER BY p.id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PostAuthorRow::into_record).collect())
}

/// Fetch a post by id.
pub async fn get_by_id(pool: &AnyPool, id: i64) -> Result<Option<Post>, sqlx::Error> {
    let row = sqlx::query_as::<_, PostRow>(&format!(
        "SELECT {POST_COLUMNS} FROM blog_posts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(PostRow::into_record))
}

/// Overwrite the editable fields of a post and reassign its author.
///
/// `date` is left as it was. Returns `false` when no post has `id`.
pub async fn update(
    conn: &mut AnyConnection,
    id: i64,
    update: &PostUpdate,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE blog_posts SET title = $1, subtitle = $2, body = $3, img_url = $4, user_id = $5
         WHERE id = $6",
    )
    .bind(&update.title)
    .bind(&update.subtitle)
    .bind(&update.body)
    .bind(&update.img_url)
    .bind(update.user_id)
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a post row. Returns `false` when no post has `id`.
///
/// Comments referencing the post must be removed first, see
/// [`super::comments::delete_by_post`].
pub async fn delete(conn: &mut AnyConnection, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Whether a post other than `excluding` already uses `title`.
pub async fn title_taken(
    pool: &AnyPool,
    title: &str,
    excluding: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let count = match excluding {
        Some(id) => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM blog_posts WHERE title = $1 AND id <> $2",
            )
            .bind(title)
            .bind(id)
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blog_posts WHERE title = $1")
                .bind(title)
                .fetch_one(pool)
                .await?
        }
    };
    Ok(count > 0)
}

/// Posts written by `user_id`, oldest first.
pub async fn find_posts_by_user(pool: &AnyPool, user_id: i64) -> Result<Vec<Post>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PostRow>(&format!(
        "SELECT {POST_COLUMNS} FROM blog_posts WHERE user_id = $1 ORDER BY id"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PostRow::into_record).collect())
}

/// Number of posts.
pub async fn count(pool: &AnyPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blog_posts")
        .fetch_one(pool)
        .await
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    subtitle: String,
    date: String,
    body: String,
    img_url: String,
    user_id: i64,
}

impl PostRow {
    fn into_record(self) -> Post {
        Post {
            id: self.id,
            title: self.title,
            subtitle: self.subtitle,
            date: self.date,
            body: self.body,
            img_url: self.img_url,
            user_id: self.user_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostAuthorRow {
    #[sqlx(flatten)]
    post: PostRow,
    author_name: String,
}

impl PostAuthorRow {
    fn into_record(self) -> PostWithAuthor {
        PostWithAuthor {
            post: self.post.into_record(),
            author_name: self.author_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_pool, users};
    use quill_core::NewUser;

    async fn seed_user(pool: &AnyPool, name: &str) -> i64 {
        let mut conn = pool.acquire().await.unwrap();
        users::insert(
            &mut conn,
            &NewUser {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: "pbkdf2:sha256:1000$salt1234$00".to_string(),
            },
        )
        .await
        .unwrap()
    }

    fn new_post(title: &str, user_id: i64) -> NewPost {
        NewPost {
            title: title.to_string(),
            subtitle: "Sub".to_string(),
            date: "October 18, 2026".to_string(),
            body: "<p>Body</p>".to_string(),
            img_url: "https://img.example.com/a.png".to_string(),
            user_id,
        }
    }

    #[tokio::test]
    async fn insert_and_list_with_author() {
        let (pool, _dir) = test_pool().await;
        let ada = seed_user(&pool, "Ada").await;
        let mut conn = pool.acquire().await.unwrap();
        let first = insert(&mut conn, &new_post("First", ada)).await.unwrap();
        let second = insert(&mut conn, &new_post("Second", ada)).await.unwrap();

        let posts = list_all(&pool).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].post.id, first);
        assert_eq!(posts[1].post.id, second);
        assert_eq!(posts[0].author_name, "Ada");
        assert_eq!(count(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn titles_are_unique() {
        let (pool, _dir) = test_pool().await;
        let ada = seed_user(&pool, "Ada").await;
        let mut conn = pool.acquire().await.unwrap();
        let id = insert(&mut conn, &new_post("Same", ada)).await.unwrap();

        assert!(title_taken(&pool, "Same", None).await.unwrap());
        assert!(!title_taken(&pool, "Same", Some(id)).await.unwrap());
        assert!(!title_taken(&pool, "Other", None).await.unwrap());
        assert!(insert(&mut conn, &new_post("Same", ada)).await.is_err());
    }

    #[tokio::test]
    async fn update_keeps_date_and_reassigns_author() {
        let (pool, _dir) = test_pool().await;
        let ada = seed_user(&pool, "Ada").await;
        let bob = seed_user(&pool, "Bob").await;
        let mut conn = pool.acquire().await.unwrap();
        let id = insert(&mut conn, &new_post("Draft", ada)).await.unwrap();

        let changed = update(
            &mut conn,
            id,
            &PostUpdate {
                title: "Final".to_string(),
                subtitle: "New sub".to_string(),
                body: "New body".to_string(),
                img_url: "https://img.example.com/b.png".to_string(),
                user_id: bob,
            },
        )
        .await
        .unwrap();
        assert!(changed);

        let post = get_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(post.title, "Final");
        assert_eq!(post.subtitle, "New sub");
        assert_eq!(post.body, "New body");
        assert_eq!(post.date, "October 18, 2026");
        assert_eq!(post.user_id, bob);
    }

    #[tokio::test]
    async fn missing_rows_report_false() {
        let (pool, _dir) = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        assert!(get_by_id(&pool, 7).await.unwrap().is_none());
        assert!(!delete(&mut conn, 7).await.unwrap());
        let update_payload = PostUpdate {
            title: "t".to_string(),
            subtitle: "s".to_string(),
            body: "b".to_string(),
            img_url: "https://x/y.png".to_string(),
            user_id: 1,
        };
        assert!(!update(&mut conn, 7, &update_payload).await.unwrap());
    }

    #[tokio::test]
    async fn posts_by_user() {
        let (pool, _dir) = test_pool().await;
        let ada = seed_user(&pool, "Ada").await;
        let bob = seed_user(&pool, "Bob").await;
        let mut conn = pool.acquire().await.unwrap();
        insert(&mut conn, &new_post("A1", ada)).await.unwrap();
        insert(&mut conn, &new_post("B1", bob)).await.unwrap();
        insert(&mut conn, &new_post("A2", ada)).await.unwrap();

        let titles: Vec<String> = find_posts_by_user(&pool, ada)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["A1", "A2"]);
    }
}
