use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use crate::db::{is_unique_violation, StoreError, StoreResult};
use crate::models::{Category, CreateCategory, Tag};
use crate::services::slug::{generate_slug_at, validate_slug, SlugKind, SlugScript};
use crate::Database;

/// Split a comma separated tag field into names. Blank entries are dropped and names that
/// normalise to the same slug are kept once, first spelling wins.
pub fn parse_tag_list(input: &str, script: SlugScript) -> Vec<String> {
    let now = Utc::now();
    let mut seen = std::collections::HashSet::new();
    input
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(generate_slug_at(name, SlugKind::Tag, script, now)))
        .map(String::from)
        .collect()
}

fn name_in_use(err: rusqlite::Error, kind: SlugKind, name: &str) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::NameInUse {
            kind,
            name: name.to_string(),
        }
    } else {
        err.into()
    }
}

fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn row_to_tag(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Category slugs carry no disambiguator, so a name that normalises onto an existing
/// slug is reported as [`StoreError::NameInUse`].
pub fn create_category(
    db: &Database,
    script: SlugScript,
    input: CreateCategory,
) -> StoreResult<Category> {
    let name = input.name.trim();
    let slug = match input.slug {
        Some(slug) if validate_slug(&slug, script) => slug,
        Some(slug) => return Err(StoreError::InvalidSlug(slug)),
        None => generate_slug_at(name, SlugKind::Category, script, Utc::now()),
    };
    let conn = db.get()?;
    conn.execute(
        "INSERT INTO categories (name, slug, description) VALUES (?, ?, ?)",
        (name, &slug, &input.description),
    )
    .map_err(|e| name_in_use(e, SlugKind::Category, name))?;

    tracing::debug!(slug = %slug, "created category");
    category_by_slug(&conn, &slug)?.ok_or(StoreError::NotFound {
        kind: SlugKind::Category,
        slug,
    })
}

/// Rename a category. The slug is derived again from the new name and must still be free.
pub fn rename_category(
    db: &Database,
    script: SlugScript,
    slug: &str,
    new_name: &str,
) -> StoreResult<Category> {
    let new_name = new_name.trim();
    let new_slug = generate_slug_at(new_name, SlugKind::Category, script, Utc::now());
    let conn = db.get()?;
    let updated = conn
        .execute(
            "UPDATE categories SET name = ?, slug = ? WHERE slug = ?",
            (new_name, &new_slug, slug),
        )
        .map_err(|e| name_in_use(e, SlugKind::Category, new_name))?;

    if updated == 0 {
        return Err(StoreError::NotFound {
            kind: SlugKind::Category,
            slug: slug.to_string(),
        });
    }

    tracing::info!(from = %slug, to = %new_slug, "renamed category");
    category_by_slug(&conn, &new_slug)?.ok_or(StoreError::NotFound {
        kind: SlugKind::Category,
        slug: new_slug,
    })
}

pub(crate) fn category_by_slug(conn: &Connection, slug: &str) -> StoreResult<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, name, slug, description, created_at FROM categories WHERE slug = ?",
            [slug],
            row_to_category,
        )
        .optional()?;
    Ok(category)
}

pub(crate) fn category_by_id(conn: &Connection, id: i64) -> StoreResult<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, name, slug, description, created_at FROM categories WHERE id = ?",
            [id],
            row_to_category,
        )
        .optional()?;
    Ok(category)
}

pub fn get_category_by_slug(db: &Database, slug: &str) -> StoreResult<Option<Category>> {
    category_by_slug(&*db.get()?, slug)
}

pub fn list_categories(db: &Database) -> StoreResult<Vec<Category>> {
    let conn = db.get()?;
    let mut stmt = conn
        .prepare("SELECT id, name, slug, description, created_at FROM categories ORDER BY name")?;
    let categories = stmt
        .query_map([], row_to_category)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn create_tag(db: &Database, script: SlugScript, name: &str) -> StoreResult<Tag> {
    let name = name.trim();
    let slug = generate_slug_at(name, SlugKind::Tag, script, Utc::now());
    let conn = db.get()?;
    conn.execute("INSERT INTO tags (name, slug) VALUES (?, ?)", (name, &slug))
        .map_err(|e| name_in_use(e, SlugKind::Tag, name))?;
    tag_by_slug(&conn, &slug)?.ok_or(StoreError::NotFound {
        kind: SlugKind::Tag,
        slug,
    })
}

/// Look a tag up by name, creating it when missing. A new name whose slug already
/// belongs to another tag resolves to that tag.
pub(crate) fn find_or_create_tag(
    conn: &Connection,
    script: SlugScript,
    name: &str,
) -> StoreResult<i64> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM tags WHERE name = ?", [name], |row| row.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let slug = generate_slug_at(name, SlugKind::Tag, script, Utc::now());
    match conn.execute("INSERT INTO tags (name, slug) VALUES (?, ?)", (name, &slug)) {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(e) if is_unique_violation(&e) => {
            tracing::debug!(name, slug = %slug, "tag slug taken, reusing existing tag");
            let id = conn.query_row("SELECT id FROM tags WHERE slug = ?", [&slug], |row| {
                row.get(0)
            })?;
            Ok(id)
        }
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn tag_by_slug(conn: &Connection, slug: &str) -> StoreResult<Option<Tag>> {
    let tag = conn
        .query_row(
            "SELECT id, name, slug, created_at FROM tags WHERE slug = ?",
            [slug],
            row_to_tag,
        )
        .optional()?;
    Ok(tag)
}

pub fn get_tag_by_slug(db: &Database, slug: &str) -> StoreResult<Option<Tag>> {
    tag_by_slug(&*db.get()?, slug)
}

pub fn list_tags(db: &Database) -> StoreResult<Vec<Tag>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare("SELECT id, name, slug, created_at FROM tags ORDER BY name")?;
    let tags = stmt
        .query_map([], row_to_tag)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

pub(crate) fn tags_for_post(conn: &Connection, post_id: i64) -> StoreResult<Vec<Tag>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT t.id, t.name, t.slug, t.created_at
        FROM tags t
        JOIN post_tags pt ON pt.tag_id = t.id
        WHERE pt.post_id = ?
        ORDER BY t.name
        "#,
    )?;
    let tags = stmt
        .query_map([post_id], row_to_tag)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

/// Replace the tag set of a post.
pub(crate) fn set_post_tags(
    conn: &Connection,
    script: SlugScript,
    post_id: i64,
    names: &[String],
) -> StoreResult<()> {
    conn.execute("DELETE FROM post_tags WHERE post_id = ?", [post_id])?;
    for name in names {
        let tag_id = find_or_create_tag(conn, script, name)?;
        conn.execute(
            "INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)",
            (post_id, tag_id),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_list() {
        let tags = parse_tag_list(" rust, Web ,, rust! ,入门,", SlugScript::Han);
        assert_eq!(tags, vec!["rust", "Web", "入门"]);
    }

    #[test]
    fn test_parse_tag_list_empty() {
        assert!(parse_tag_list(" , ,", SlugScript::Han).is_empty());
    }
}
