//! Attribute and table metadata backing the direct importers.
//!
//! Loaded once per run from the live schema (or assembled directly in tests)
//! and injected into every resolver. Never a process-wide global: the
//! write-back state in here must not be shared across concurrent import
//! workers.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{Context, Result};
use sqlx::Row;
use tracing::info;

use crate::util::db::Db;

/// Which per-datatype value table an EAV attribute is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EavType {
    Varchar,
    Int,
}

impl EavType {
    /// Suffix of the value table (`{entity_table}_{suffix}`).
    pub fn table_suffix(self) -> &'static str {
        match self {
            EavType::Varchar => "varchar",
            EavType::Int => "int",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EavAttribute {
    pub id: u32,
    pub kind: EavType,
}

/// Per-category bookkeeping kept for the lifetime of one import run.
#[derive(Debug, Clone)]
pub struct CategoryInfo {
    /// Ancestor ids root..self, matching the entity's materialized path.
    pub id_path: Vec<u32>,
    /// url_key per store view id.
    pub url_keys: HashMap<u32, String>,
}

/// Read-mostly lookup service for the category importer.
///
/// `add_category_info` is the single write-back: newly created categories are
/// registered here so url-key uniqueness checks later in the same run see
/// them.
#[derive(Debug)]
pub struct MetaData {
    pub category_entity_table: String,
    pub url_rewrite_table: String,
    pub default_category_attribute_set_id: u32,
    /// Appended to category url paths when building request paths, e.g. ".html".
    pub category_url_suffix: String,
    pub category_attributes: HashMap<String, EavAttribute>,
    category_info: Mutex<HashMap<u32, CategoryInfo>>,
}

impl MetaData {
    pub fn new(
        category_entity_table: impl Into<String>,
        url_rewrite_table: impl Into<String>,
        default_category_attribute_set_id: u32,
        category_url_suffix: impl Into<String>,
        category_attributes: HashMap<String, EavAttribute>,
    ) -> Self {
        Self {
            category_entity_table: category_entity_table.into(),
            url_rewrite_table: url_rewrite_table.into(),
            default_category_attribute_set_id,
            category_url_suffix: category_url_suffix.into(),
            category_attributes,
            category_info: Mutex::new(HashMap::new()),
        }
    }

    /// Populate the metadata from a live catalog schema.
    pub async fn load(db: &Db) -> Result<Self> {
        let entity_type = sqlx::query(
            "SELECT entity_type_id, default_attribute_set_id
             FROM eav_entity_type
             WHERE entity_type_code = ?",
        )
        .bind("catalog_category")
        .fetch_one(&db.pool)
        .await
        .context("catalog_category entity type missing")?;
        let entity_type_id: u32 = entity_type.try_get("entity_type_id")?;
        let default_set_id: u32 = entity_type.try_get("default_attribute_set_id")?;

        let mut category_attributes = HashMap::new();
        let attribute_rows = sqlx::query(
            "SELECT attribute_id, attribute_code, backend_type
             FROM eav_attribute
             WHERE entity_type_id = ?",
        )
        .bind(entity_type_id)
        .fetch_all(&db.pool)
        .await?;
        for row in attribute_rows {
            let backend_type: String = row.try_get("backend_type")?;
            let kind = match backend_type.as_str() {
                "varchar" => EavType::Varchar,
                "int" => EavType::Int,
                // datetime/decimal/text/static: never written by this importer
                _ => continue,
            };
            let code: String = row.try_get("attribute_code")?;
            let id: u32 = row.try_get("attribute_id")?;
            category_attributes.insert(code, EavAttribute { id, kind });
        }

        let suffix: Option<String> = sqlx::query_scalar(
            "SELECT value FROM core_config_data
             WHERE path = 'catalog/seo/category_url_suffix' AND scope_id = 0",
        )
        .fetch_optional(&db.pool)
        .await?
        .flatten();

        let meta = Self::new(
            "catalog_category_entity",
            "url_rewrite",
            default_set_id,
            suffix.unwrap_or_else(|| ".html".to_string()),
            category_attributes,
        );
        meta.seed_existing_categories(db).await?;
        info!(
            attributes = meta.category_attributes.len(),
            categories = meta.category_info.lock().expect("category info mutex").len(),
            "category metadata loaded"
        );
        Ok(meta)
    }

    /// Seed the per-run category info with the ids, id paths and url keys
    /// already present in storage.
    async fn seed_existing_categories(&self, db: &Db) -> Result<()> {
        let url_key_attribute = self
            .attribute("url_key")
            .context("url_key attribute missing from category metadata")?;

        let mut url_keys: HashMap<u32, HashMap<u32, String>> = HashMap::new();
        let key_rows = sqlx::query(&format!(
            "SELECT entity_id, store_id, value FROM `{}_varchar` WHERE attribute_id = ?",
            self.category_entity_table
        ))
        .bind(url_key_attribute.id)
        .fetch_all(&db.pool)
        .await?;
        for row in key_rows {
            let entity_id: u32 = row.try_get("entity_id")?;
            let store_id: u32 = row.try_get("store_id")?;
            let value: String = row.try_get("value")?;
            url_keys.entry(entity_id).or_default().insert(store_id, value);
        }

        let entity_rows = sqlx::query(&format!(
            "SELECT entity_id, path FROM `{}`",
            self.category_entity_table
        ))
        .fetch_all(&db.pool)
        .await?;
        for row in entity_rows {
            let entity_id: u32 = row.try_get("entity_id")?;
            let path: String = row.try_get("path")?;
            let id_path: Vec<u32> = path.split('/').filter_map(|s| s.parse().ok()).collect();
            self.add_category_info(
                entity_id,
                id_path,
                url_keys.remove(&entity_id).unwrap_or_default(),
            );
        }
        Ok(())
    }

    pub fn attribute(&self, code: &str) -> Option<EavAttribute> {
        self.category_attributes.get(code).copied()
    }

    /// Url keys already taken by the direct children of `parent_id` at the
    /// given store view. Uniqueness for new keys is scoped to the parent,
    /// not global.
    pub fn existing_category_url_keys(&self, parent_id: u32, store_id: u32) -> HashSet<String> {
        let info = self.category_info.lock().expect("category info mutex");
        let mut keys = HashSet::new();
        for category in info.values() {
            let len = category.id_path.len();
            if len >= 2 && category.id_path[len - 2] == parent_id {
                if let Some(key) = category.url_keys.get(&store_id) {
                    keys.insert(key.clone());
                }
            }
        }
        keys
    }

    /// Register a category created during this run so later lookups and
    /// uniqueness checks see it.
    pub fn add_category_info(&self, id: u32, id_path: Vec<u32>, url_keys: HashMap<u32, String>) {
        self.category_info
            .lock()
            .expect("category info mutex")
            .insert(id, CategoryInfo { id_path, url_keys });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_meta() -> MetaData {
        MetaData::new("catalog_category_entity", "url_rewrite", 3, ".html", HashMap::new())
    }

    #[test]
    fn url_keys_are_scoped_to_parent_and_store() {
        let meta = empty_meta();
        meta.add_category_info(10, vec![1, 10], HashMap::from([(0, "men".to_string())]));
        meta.add_category_info(
            11,
            vec![1, 10, 11],
            HashMap::from([(0, "shoes".to_string()), (1, "schuhe".to_string())]),
        );
        meta.add_category_info(12, vec![1, 10, 12], HashMap::from([(0, "shirts".to_string())]));
        meta.add_category_info(20, vec![1, 20], HashMap::from([(0, "shoes".to_string())]));

        let keys = meta.existing_category_url_keys(10, 0);
        assert_eq!(
            keys,
            ["shoes".to_string(), "shirts".to_string()].into_iter().collect()
        );
        assert_eq!(
            meta.existing_category_url_keys(10, 1),
            ["schuhe".to_string()].into_iter().collect()
        );
        assert!(meta.existing_category_url_keys(11, 0).is_empty());
    }

    #[test]
    fn write_back_is_visible_to_later_checks() {
        let meta = empty_meta();
        assert!(meta.existing_category_url_keys(1, 0).is_empty());
        meta.add_category_info(2, vec![1, 2], HashMap::from([(0, "sale".to_string())]));
        assert!(meta.existing_category_url_keys(1, 0).contains("sale"));
    }
}
