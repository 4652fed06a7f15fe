use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tally_core::{
    AccountId, Category, CategoryId, CategoryPattern, MatchTarget, Pattern, PatternId, Tag, TagId,
    TagPattern,
};
use tally_engine::RuleSet;

use crate::db::{parse_column, DbPool, StorageError};

const CATEGORY_KIND: &str = "category";
const TAG_KIND: &str = "tag";

pub async fn save_category(pool: &DbPool, category: &Category) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO categories (id, name, is_default) VALUES (?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, is_default = excluded.is_default",
    )
    .bind(category.id.0)
    .bind(&category.name)
    .bind(category.is_default)
    .execute(pool)
    .await?;
    Ok(())
}

/// Removes a category along with the patterns voting for it. Tags preferring
/// it lose their preference; statements keep the dangling id until the next
/// classification run.
pub async fn delete_category(pool: &DbPool, id: CategoryId) -> Result<(), StorageError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM patterns WHERE kind = ? AND target_id = ?")
        .bind(CATEGORY_KIND)
        .bind(id.0)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id.0)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn get_categories(pool: &DbPool) -> Result<Vec<Category>, StorageError> {
    let rows = sqlx::query_as::<_, (i64, String, bool)>(
        "SELECT id, name, is_default FROM categories ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| Category {
            id: CategoryId(r.0),
            name: r.1,
            is_default: r.2,
        })
        .collect())
}

pub async fn save_tag(pool: &DbPool, tag: &Tag) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO tags (id, name, category_id) VALUES (?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, category_id = excluded.category_id",
    )
    .bind(tag.id.0)
    .bind(&tag.name)
    .bind(tag.category_id.map(|c| c.0))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_tags(pool: &DbPool) -> Result<Vec<Tag>, StorageError> {
    let rows = sqlx::query_as::<_, (i64, String, Option<i64>)>(
        "SELECT id, name, category_id FROM tags ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| Tag {
            id: TagId(r.0),
            name: r.1,
            category_id: r.2.map(CategoryId),
        })
        .collect())
}

async fn save_pattern(
    pool: &DbPool,
    kind: &str,
    pattern: &Pattern,
    target_id: i64,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO patterns (kind, id, target_id, regex, match_mode, match_targets, squish_data, account_targets) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(kind, id) DO UPDATE SET target_id = excluded.target_id, regex = excluded.regex, \
         match_mode = excluded.match_mode, match_targets = excluded.match_targets, \
         squish_data = excluded.squish_data, account_targets = excluded.account_targets",
    )
    .bind(kind)
    .bind(pattern.id.0)
    .bind(target_id)
    .bind(&pattern.regex)
    .bind(pattern.match_mode.to_string())
    .bind(serde_json::to_string(&pattern.match_targets)?)
    .bind(pattern.squish_data)
    .bind(serde_json::to_string(&pattern.account_targets)?)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn save_category_pattern(pool: &DbPool, cp: &CategoryPattern) -> Result<(), StorageError> {
    save_pattern(pool, CATEGORY_KIND, &cp.pattern, cp.category_id.0).await
}

pub async fn save_tag_pattern(pool: &DbPool, tp: &TagPattern) -> Result<(), StorageError> {
    save_pattern(pool, TAG_KIND, &tp.pattern, tp.tag_id.0).await
}

async fn get_patterns(pool: &DbPool, kind: &str) -> Result<Vec<(Pattern, i64)>, StorageError> {
    let rows = sqlx::query(
        "SELECT id, target_id, regex, match_mode, match_targets, squish_data, account_targets \
         FROM patterns WHERE kind = ? ORDER BY id",
    )
    .bind(kind)
    .fetch_all(pool)
    .await?;

    rows.iter().map(pattern_from_row).collect()
}

fn pattern_from_row(row: &SqliteRow) -> Result<(Pattern, i64), StorageError> {
    let match_targets: Vec<MatchTarget> =
        serde_json::from_str(&row.try_get::<String, _>("match_targets")?)?;
    let account_targets: Vec<AccountId> =
        serde_json::from_str(&row.try_get::<String, _>("account_targets")?)?;

    let pattern = Pattern {
        id: PatternId(row.try_get("id")?),
        regex: row.try_get("regex")?,
        match_mode: parse_column("match_mode", row.try_get("match_mode")?)?,
        match_targets,
        squish_data: row.try_get("squish_data")?,
        account_targets,
    };
    Ok((pattern, row.try_get("target_id")?))
}

pub async fn get_category_patterns(pool: &DbPool) -> Result<Vec<CategoryPattern>, StorageError> {
    Ok(get_patterns(pool, CATEGORY_KIND)
        .await?
        .into_iter()
        .map(|(pattern, target)| CategoryPattern {
            pattern,
            category_id: CategoryId(target),
        })
        .collect())
}

pub async fn get_tag_patterns(pool: &DbPool) -> Result<Vec<TagPattern>, StorageError> {
    Ok(get_patterns(pool, TAG_KIND)
        .await?
        .into_iter()
        .map(|(pattern, target)| TagPattern {
            pattern,
            tag_id: TagId(target),
        })
        .collect())
}

/// Upserts every entry of a rules file. Entries not in the file are left
/// untouched.
pub async fn save_rule_set(pool: &DbPool, rules: &RuleSet) -> Result<(), StorageError> {
    for category in &rules.categories {
        save_category(pool, category).await?;
    }
    for tag in &rules.tags {
        save_tag(pool, tag).await?;
    }
    for cp in &rules.category_patterns {
        save_category_pattern(pool, cp).await?;
    }
    for tp in &rules.tag_patterns {
        save_tag_pattern(pool, tp).await?;
    }
    Ok(())
}

/// Everything currently stored, in rule file shape.
pub async fn load_rule_set(pool: &DbPool) -> Result<RuleSet, StorageError> {
    Ok(RuleSet {
        categories: get_categories(pool).await?,
        tags: get_tags(pool).await?,
        category_patterns: get_category_patterns(pool).await?,
        tag_patterns: get_tag_patterns(pool).await?,
    })
}
