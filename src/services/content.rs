use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use crate::config::Config;
use crate::db::{is_unique_violation, StoreError, StoreResult};
use crate::models::{Comment, CreatePost, Post, PostWithTaxonomy, UpdatePost};
use crate::services::markdown::ContentRenderer;
use crate::services::policy::ContentClass;
use crate::services::slug::{generate_slug_at, SlugKind, SlugScript};
use crate::services::tags::{category_by_id, category_by_slug, parse_tag_list, set_post_tags, tags_for_post};
use crate::Database;

/// Attempts made before giving up on a post slug that keeps colliding.
pub const MAX_SLUG_ATTEMPTS: u32 = 5;

/// Everything a content write needs besides the database.
#[derive(Debug, Clone)]
pub struct ContentPipeline {
    pub renderer: ContentRenderer,
    pub script: SlugScript,
    pub excerpt_length: usize,
}

impl Default for ContentPipeline {
    fn default() -> Self {
        Self {
            renderer: ContentRenderer::default(),
            script: SlugScript::default(),
            excerpt_length: 200,
        }
    }
}

impl ContentPipeline {
    pub fn from_config(config: &Config) -> Self {
        Self {
            renderer: ContentRenderer::new(config.policy_set()),
            script: config.slug.script,
            excerpt_length: config.content.excerpt_length,
        }
    }
}

/// Run `insert` with `base`, then `base-2`, `base-3`, ... while it reports
/// [`StoreError::DuplicateSlug`].
pub fn with_unique_slug<T>(
    base: &str,
    mut insert: impl FnMut(&str) -> StoreResult<T>,
) -> StoreResult<T> {
    for attempt in 1..=MAX_SLUG_ATTEMPTS {
        let candidate = if attempt == 1 {
            base.to_string()
        } else {
            format!("{}-{}", base, attempt)
        };
        match insert(&candidate) {
            Err(e) if e.is_retryable() => {
                tracing::debug!(slug = %candidate, attempt, "slug collision, retrying");
            }
            other => return other,
        }
    }
    Err(StoreError::SlugExhausted(base.to_string()))
}

fn slug_taken(err: rusqlite::Error, slug: &str) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::DuplicateSlug(slug.to_string())
    } else {
        err.into()
    }
}

const POST_COLUMNS: &str =
    "id, title, slug, summary, content, content_html, category_id, created_at, updated_at";

fn row_to_post(row: &rusqlite::Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        summary: row.get(3)?,
        content: row.get(4)?,
        content_html: row.get(5)?,
        category_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn post_by_slug(conn: &Connection, slug: &str) -> StoreResult<Option<Post>> {
    let post = conn
        .query_row(
            &format!("SELECT {} FROM posts WHERE slug = ?", POST_COLUMNS),
            [slug],
            row_to_post,
        )
        .optional()?;
    Ok(post)
}

fn enrich_post(conn: &Connection, post: Post) -> StoreResult<PostWithTaxonomy> {
    let category = match post.category_id {
        Some(id) => category_by_id(conn, id)?,
        None => None,
    };
    let tags = tags_for_post(conn, post.id)?;
    Ok(PostWithTaxonomy {
        post,
        category,
        tags,
    })
}

fn post_not_found(slug: &str) -> StoreError {
    StoreError::NotFound {
        kind: SlugKind::Post,
        slug: slug.to_string(),
    }
}

/// Create a post. The slug comes from the title plus a creation timestamp; if another post
/// already holds it, a counter is appended. The body is rendered once, here.
pub fn create_post(
    db: &Database,
    pipeline: &ContentPipeline,
    input: CreatePost,
) -> StoreResult<PostWithTaxonomy> {
    if input.content.trim().is_empty() {
        return Err(StoreError::EmptyContent);
    }

    let base_slug = generate_slug_at(&input.title, SlugKind::Post, pipeline.script, Utc::now());
    let content_html = pipeline.renderer.render(&input.content, ContentClass::Post);
    let summary = match input.summary {
        Some(summary) if !summary.trim().is_empty() => summary,
        _ => pipeline
            .renderer
            .excerpt(&input.content, pipeline.excerpt_length),
    };

    let mut conn = db.get()?;
    let tx = conn.transaction()?;

    let category_id = match input.category.as_deref() {
        Some(slug) => Some(
            category_by_slug(&tx, slug)?
                .ok_or(StoreError::NotFound {
                    kind: SlugKind::Category,
                    slug: slug.to_string(),
                })?
                .id,
        ),
        None => None,
    };

    let slug = with_unique_slug(&base_slug, |slug| {
        tx.execute(
            "INSERT INTO posts (title, slug, summary, content, content_html, category_id) VALUES (?, ?, ?, ?, ?, ?)",
            (
                &input.title,
                slug,
                &summary,
                &input.content,
                &content_html,
                category_id,
            ),
        )
        .map_err(|e| slug_taken(e, slug))?;
        Ok(slug.to_string())
    })?;
    let post_id = tx.last_insert_rowid();

    if let Some(tags) = input.tags.as_deref() {
        set_post_tags(&tx, pipeline.script, post_id, &parse_tag_list(tags, pipeline.script))?;
    }

    let post = post_by_slug(&tx, &slug)?.ok_or_else(|| post_not_found(&slug))?;
    let post = enrich_post(&tx, post)?;
    tx.commit()?;

    tracing::info!(slug = %post.post.slug, "created post");
    Ok(post)
}

/// Apply an edit. Title changes leave the slug alone; content changes re-render the body.
pub fn update_post(
    db: &Database,
    pipeline: &ContentPipeline,
    slug: &str,
    input: UpdatePost,
) -> StoreResult<PostWithTaxonomy> {
    let mut conn = db.get()?;
    let tx = conn.transaction()?;
    let mut post = post_by_slug(&tx, slug)?.ok_or_else(|| post_not_found(slug))?;

    if let Some(title) = input.title {
        post.title = title;
    }
    if let Some(content) = input.content {
        if content.trim().is_empty() {
            return Err(StoreError::EmptyContent);
        }
        post.content_html = pipeline.renderer.render(&content, ContentClass::Post);
        post.content = content;
    }
    if let Some(summary) = input.summary {
        post.summary = summary;
    }

    tx.execute(
        "UPDATE posts SET title = ?, summary = ?, content = ?, content_html = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        (&post.title, &post.summary, &post.content, &post.content_html, post.id),
    )?;

    if let Some(tags) = input.tags.as_deref() {
        set_post_tags(&tx, pipeline.script, post.id, &parse_tag_list(tags, pipeline.script))?;
    }

    let post = post_by_slug(&tx, slug)?.ok_or_else(|| post_not_found(slug))?;
    let post = enrich_post(&tx, post)?;
    tx.commit()?;
    Ok(post)
}

pub fn get_post_by_slug(db: &Database, slug: &str) -> StoreResult<Option<PostWithTaxonomy>> {
    let conn = db.get()?;
    match post_by_slug(&conn, slug)? {
        Some(post) => Ok(Some(enrich_post(&conn, post)?)),
        None => Ok(None),
    }
}

pub fn list_posts(db: &Database) -> StoreResult<Vec<Post>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts ORDER BY created_at DESC, id DESC",
        POST_COLUMNS
    ))?;
    let posts = stmt
        .query_map([], row_to_post)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

pub fn add_comment(
    db: &Database,
    pipeline: &ContentPipeline,
    post_slug: &str,
    content: &str,
) -> StoreResult<Comment> {
    if content.trim().is_empty() {
        return Err(StoreError::EmptyContent);
    }

    let conn = db.get()?;
    let post = post_by_slug(&conn, post_slug)?.ok_or_else(|| post_not_found(post_slug))?;
    let content_html = pipeline.renderer.render(content, ContentClass::Comment);

    conn.execute(
        "INSERT INTO comments (post_id, content, content_html) VALUES (?, ?, ?)",
        (post.id, content, &content_html),
    )?;
    let id = conn.last_insert_rowid();

    let comment = conn.query_row(
        "SELECT id, post_id, content, content_html, created_at FROM comments WHERE id = ?",
        [id],
        row_to_comment,
    )?;
    Ok(comment)
}

fn row_to_comment(row: &rusqlite::Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        content: row.get(2)?,
        content_html: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn list_comments(db: &Database, post_slug: &str) -> StoreResult<Vec<Comment>> {
    let conn = db.get()?;
    let post = post_by_slug(&conn, post_slug)?.ok_or_else(|| post_not_found(post_slug))?;
    let mut stmt = conn.prepare(
        "SELECT id, post_id, content, content_html, created_at FROM comments WHERE post_id = ? ORDER BY id",
    )?;
    let comments = stmt
        .query_map([post.id], row_to_comment)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RerenderReport {
    pub posts: usize,
    pub comments: usize,
    pub changed: usize,
}

/// Recompute every stored HTML body from its raw text. Rows whose HTML is already current
/// are left untouched, so running this twice in a row changes nothing the second time.
pub fn rerender_all_content(db: &Database, renderer: &ContentRenderer) -> StoreResult<RerenderReport> {
    let mut conn = db.get()?;
    let tx = conn.transaction()?;
    let mut report = RerenderReport::default();

    for (table, class) in [("posts", ContentClass::Post), ("comments", ContentClass::Comment)] {
        let rows: Vec<(i64, String, String)> = {
            let mut stmt = tx.prepare(&format!("SELECT id, content, content_html FROM {}", table))?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        match class {
            ContentClass::Post => report.posts += rows.len(),
            ContentClass::Comment => report.comments += rows.len(),
            ContentClass::Inline => {}
        }

        for (id, content, current_html) in rows {
            let html = renderer.render(&content, class);
            if html != current_html {
                tx.execute(
                    &format!("UPDATE {} SET content_html = ? WHERE id = ?", table),
                    (&html, id),
                )?;
                report.changed += 1;
            }
        }
    }

    tx.commit()?;
    tracing::info!(
        posts = report.posts,
        comments = report.comments,
        changed = report.changed,
        "re-rendered content"
    );
    Ok(report)
}
