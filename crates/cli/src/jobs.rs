use anyhow::{Context, Result};
use std::path::Path;
use tally_core::StatementRecord;
use tally_engine::{Classifier, RuleSet, TransferLinker};
use tally_storage::{load_snapshot, DbPool};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReclassifyReport {
    pub statements: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub inserted: usize,
    pub duplicates: usize,
}

/// Re-runs tag and category resolution over every stored statement.
///
/// Rules are validated before anything is written; a bad pattern or missing
/// default category leaves the store untouched.
pub async fn reclassify_all(pool: &DbPool) -> Result<ReclassifyReport> {
    let snapshot = load_snapshot(pool).await?;
    let classifier = Classifier::new(
        &snapshot.tags,
        &snapshot.tag_patterns,
        &snapshot.category_patterns,
        &snapshot.categories,
    )?;

    let classifications = classifier.classify_all(&snapshot.statements);
    let updated = tally_storage::apply_classifications(pool, &classifications).await?;

    Ok(ReclassifyReport {
        statements: snapshot.statements.len(),
        updated,
    })
}

/// Rebuilds the whole transfer link set. Returns the number of links.
pub async fn relink_all(pool: &DbPool, linker: &TransferLinker) -> Result<usize> {
    let statements = tally_storage::get_statements(pool).await?;
    let links = linker.link_all(&statements);
    tally_storage::replace_links(pool, &links).await?;
    Ok(links.len())
}

/// Upserts a TOML rules file into the store.
///
/// The file is checked together with the rules already stored: it may refer
/// to categories and tags saved earlier, and nothing is written unless the
/// combined set has one default category, no dangling reference and only
/// valid regexes.
pub async fn load_rules(pool: &DbPool, path: &Path) -> Result<RuleSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let rules = RuleSet::from_toml(&content).map_err(anyhow::Error::msg)?;

    let mut combined = tally_storage::load_rule_set(pool).await?;
    combined.merge(rules.clone());
    combined
        .validate()
        .with_context(|| format!("Rejected rules file {}", path.display()))?;

    tally_storage::save_rule_set(pool, &rules).await?;
    info!(
        categories = rules.categories.len(),
        tags = rules.tags.len(),
        category_patterns = rules.category_patterns.len(),
        tag_patterns = rules.tag_patterns.len(),
        "rules loaded"
    );

    Ok(rules)
}

/// Inserts a JSON array of statement records, classifying each on the way
/// in. Records whose identity already exists are skipped.
pub async fn load_statements(pool: &DbPool, path: &Path) -> Result<LoadReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records: Vec<StatementRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid statement file {}", path.display()))?;

    let snapshot = load_snapshot(pool).await?;
    let classifier = Classifier::new(
        &snapshot.tags,
        &snapshot.tag_patterns,
        &snapshot.category_patterns,
        &snapshot.categories,
    )?;

    let mut report = LoadReport { inserted: 0, duplicates: 0 };
    for record in &records {
        let (category_id, tag_ids) = classifier.classify_record(record);
        match tally_storage::insert_statement(pool, record, category_id, &tag_ids).await? {
            Some(_) => report.inserted += 1,
            None => report.duplicates += 1,
        }
    }

    info!(inserted = report.inserted, duplicates = report.duplicates, "statements loaded");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tally_core::{CategoryId, StatementId, StatementLink, TagId};
    use tally_storage::{create_db, get_links, get_statement, set_statement_category};

    const RULES: &str = r#"
        [[categories]]
        id = 1
        name = "Unsorted"
        default = true

        [[categories]]
        id = 2
        name = "Shopping"

        [[categories]]
        id = 3
        name = "Transfers"

        [[tags]]
        id = 1
        name = "online"
        category_id = 2

        [[category_patterns]]
        id = 1
        regex = "TRANSFER"
        match_targets = ["type"]
        match_mode = "full_match"
        category_id = 3

        [[tag_patterns]]
        id = 1
        regex = "AMAZON"
        match_targets = ["third_party_name"]
        tag_id = 1
    "#;

    const STATEMENTS: &str = r#"[
        {"account_id": 1, "booking_date": "2024-01-10", "value_date": "2024-01-10",
         "type": "TRANSFER", "amount": "-50.00", "currency": "EUR"},
        {"account_id": 2, "booking_date": "2024-01-12", "value_date": "2024-01-12",
         "type": "TRANSFER", "amount": "50.00", "currency": "EUR"},
        {"account_id": 1, "booking_date": "2024-01-15", "value_date": "2024-01-15",
         "type": "CARD PAYMENT", "amount": "-19.99", "currency": "EUR",
         "third_party_name": "AMAZON EU SARL"}
    ]"#;

    async fn setup() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_db(&dir.path().join("tally.db")).await.unwrap();
        let rules = dir.path().join("rules.toml");
        let statements = dir.path().join("statements.json");
        std::fs::write(&rules, RULES).unwrap();
        std::fs::write(&statements, STATEMENTS).unwrap();
        load_rules(&pool, &rules).await.unwrap();
        load_statements(&pool, &statements).await.unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn statements_are_classified_on_load() {
        let (_dir, pool) = setup().await;
        let transfer = get_statement(&pool, StatementId(1)).await.unwrap();
        assert_eq!(transfer.category_id, CategoryId(3));

        let purchase = get_statement(&pool, StatementId(3)).await.unwrap();
        assert_eq!(purchase.category_id, CategoryId(2));
        assert_eq!(purchase.tag_ids, BTreeSet::from([TagId(1)]));
    }

    #[tokio::test]
    async fn reloading_statements_reports_duplicates() {
        let (dir, pool) = setup().await;
        let report = load_statements(&pool, &dir.path().join("statements.json")).await.unwrap();
        assert_eq!(report, LoadReport { inserted: 0, duplicates: 3 });
    }

    #[tokio::test]
    async fn relink_builds_transfer_pair() {
        let (_dir, pool) = setup().await;
        let count = relink_all(&pool, &TransferLinker::default()).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            get_links(&pool).await.unwrap(),
            vec![StatementLink::new(StatementId(1), StatementId(2))]
        );

        // Running again rebuilds the same set rather than adding to it.
        relink_all(&pool, &TransferLinker::default()).await.unwrap();
        assert_eq!(get_links(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reclassify_respects_pinned_category() {
        let (_dir, pool) = setup().await;
        set_statement_category(&pool, StatementId(3), CategoryId(1), true).await.unwrap();

        let report = reclassify_all(&pool).await.unwrap();
        assert_eq!(report.statements, 3);
        assert_eq!(get_statement(&pool, StatementId(3)).await.unwrap().category_id, CategoryId(1));
    }

    #[tokio::test]
    async fn reclassify_reassigns_orphaned_pinned_category() {
        let (_dir, pool) = setup().await;
        set_statement_category(&pool, StatementId(1), CategoryId(2), true).await.unwrap();
        tally_storage::delete_category(&pool, CategoryId(2)).await.unwrap();

        reclassify_all(&pool).await.unwrap();
        assert_eq!(get_statement(&pool, StatementId(1)).await.unwrap().category_id, CategoryId(3));
    }

    #[tokio::test]
    async fn bad_rules_abort_without_writing() {
        let (dir, pool) = setup().await;
        let bad = dir.path().join("bad.toml");
        std::fs::write(
            &bad,
            "[[tag_patterns]]\nid = 2\nregex = \"(\"\ntag_id = 1\n",
        )
        .unwrap();
        assert!(load_rules(&pool, &bad).await.is_err());
        assert_eq!(tally_storage::get_tag_patterns(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rules_pointing_at_missing_category_are_rejected() {
        let (dir, pool) = setup().await;
        let bad = dir.path().join("dangling.toml");
        std::fs::write(
            &bad,
            "[[category_patterns]]\nid = 2\nregex = \"ACME\"\ncategory_id = 42\n",
        )
        .unwrap();
        assert!(load_rules(&pool, &bad).await.is_err());
        assert_eq!(tally_storage::get_category_patterns(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rules_pointing_at_missing_tag_are_rejected() {
        let (dir, pool) = setup().await;
        let bad = dir.path().join("dangling.toml");
        std::fs::write(
            &bad,
            "[[tag_patterns]]\nid = 2\nregex = \"ACME\"\ntag_id = 7\n",
        )
        .unwrap();
        assert!(load_rules(&pool, &bad).await.is_err());

        let more = dir.path().join("more.json");
        std::fs::write(
            &more,
            r#"[{"account_id": 3, "booking_date": "2024-02-01", "value_date": "2024-02-01",
                 "type": "CARD PAYMENT", "amount": "-5.00", "currency": "EUR",
                 "third_party_name": "ACME"}]"#,
        )
        .unwrap();
        let report = load_statements(&pool, &more).await.unwrap();
        assert_eq!(report, LoadReport { inserted: 1, duplicates: 0 });
    }

    #[tokio::test]
    async fn rules_may_extend_stored_rules() {
        let (dir, pool) = setup().await;
        let extra = dir.path().join("extra.toml");
        std::fs::write(
            &extra,
            "[[tag_patterns]]\nid = 2\nregex = \"EBAY\"\ntag_id = 1\n",
        )
        .unwrap();
        load_rules(&pool, &extra).await.unwrap();
        assert_eq!(tally_storage::get_tag_patterns(&pool).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reimport_with_other_amount_scale_is_a_duplicate() {
        let (dir, pool) = setup().await;
        let rescaled = dir.path().join("rescaled.json");
        std::fs::write(
            &rescaled,
            r#"[{"account_id": 1, "booking_date": "2024-01-10", "value_date": "2024-01-10",
                 "type": "TRANSFER", "amount": "-50.0", "currency": "EUR"}]"#,
        )
        .unwrap();
        let report = load_statements(&pool, &rescaled).await.unwrap();
        assert_eq!(report, LoadReport { inserted: 0, duplicates: 1 });
    }
}
