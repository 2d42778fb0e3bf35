//! `CategoryStore` over the platform's EAV schema.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CategoryImportError;
use crate::meta::{EavAttribute, EavType, MetaData};
use crate::util::db::Db;

use super::store::{AttributeValue, CategoryStore, NewCategoryEntity, UrlRewrite};

/// Writes the category entity table, its per-datatype value tables and the
/// url rewrite table directly.
///
/// Table names are interpolated from trusted metadata only; every value is
/// bound as a statement parameter.
#[derive(Clone)]
pub struct MysqlCategoryStore {
    db: Db,
    meta: Arc<MetaData>,
}

impl MysqlCategoryStore {
    pub fn new(db: Db, meta: Arc<MetaData>) -> Self {
        Self { db, meta }
    }

    fn attribute(&self, code: &str) -> Result<EavAttribute, CategoryImportError> {
        self.meta
            .attribute(code)
            .ok_or_else(|| CategoryImportError::UnknownAttribute(code.to_string()))
    }
}

#[async_trait]
impl CategoryStore for MysqlCategoryStore {
    async fn child_by_name(
        &self,
        parent_id: u32,
        name: &str,
        store_id: u32,
    ) -> Result<Option<u32>, CategoryImportError> {
        let entity_table = &self.meta.category_entity_table;
        let name_attribute = self.attribute("name")?;
        let id: Option<u32> = sqlx::query_scalar(&format!(
            "SELECT E.entity_id
             FROM `{entity_table}` E
             INNER JOIN `{entity_table}_varchar` A
                ON A.entity_id = E.entity_id AND A.attribute_id = ? AND A.store_id = ?
             WHERE E.parent_id = ? AND A.value = ?"
        ))
        .bind(name_attribute.id)
        .bind(store_id)
        .bind(parent_id)
        .bind(name)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(id)
    }

    async fn create_entity(
        &self,
        entity: &NewCategoryEntity,
    ) -> Result<u32, CategoryImportError> {
        let result = sqlx::query(&format!(
            "INSERT INTO `{}`
                (attribute_set_id, parent_id, position, level, children_count)
             VALUES (?, ?, ?, ?, 0)",
            self.meta.category_entity_table
        ))
        .bind(entity.attribute_set_id)
        .bind(entity.parent_id)
        .bind(entity.position)
        .bind(entity.level)
        .execute(&self.db.pool)
        .await?;
        Ok(result.last_insert_id() as u32)
    }

    async fn assign_path(&self, entity_id: u32, path: &str) -> Result<(), CategoryImportError> {
        sqlx::query(&format!(
            "UPDATE `{}` SET path = ? WHERE entity_id = ?",
            self.meta.category_entity_table
        ))
        .bind(path)
        .bind(entity_id)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    async fn increment_children_count(
        &self,
        parent_id: u32,
    ) -> Result<(), CategoryImportError> {
        sqlx::query(&format!(
            "UPDATE `{}` SET children_count = children_count + 1 WHERE entity_id = ?",
            self.meta.category_entity_table
        ))
        .bind(parent_id)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    async fn max_sibling_position(
        &self,
        parent_path: &str,
        child_level: u32,
    ) -> Result<Option<u32>, CategoryImportError> {
        let max: Option<u32> = sqlx::query_scalar(&format!(
            "SELECT MAX(position) FROM `{}` WHERE path LIKE ? AND level = ?",
            self.meta.category_entity_table
        ))
        .bind(format!("{parent_path}/%"))
        .bind(child_level)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(max)
    }

    async fn set_attribute(
        &self,
        entity_id: u32,
        code: &str,
        value: AttributeValue,
        store_id: u32,
    ) -> Result<(), CategoryImportError> {
        let attribute = self.attribute(code)?;
        let sql = format!(
            "INSERT INTO `{}_{}` (entity_id, attribute_id, store_id, value) VALUES (?, ?, ?, ?)",
            self.meta.category_entity_table,
            attribute.kind.table_suffix()
        );
        let query = sqlx::query(&sql)
            .bind(entity_id)
            .bind(attribute.id)
            .bind(store_id);
        match attribute.kind {
            EavType::Varchar => query.bind(value.as_varchar()).execute(&self.db.pool).await?,
            EavType::Int => query.bind(value.as_int()).execute(&self.db.pool).await?,
        };
        Ok(())
    }

    async fn url_path(
        &self,
        entity_id: u32,
        store_id: u32,
    ) -> Result<Option<String>, CategoryImportError> {
        let attribute = self.attribute("url_path")?;
        let value: Option<String> = sqlx::query_scalar(&format!(
            "SELECT value FROM `{}_varchar`
             WHERE entity_id = ? AND attribute_id = ? AND store_id = ?",
            self.meta.category_entity_table
        ))
        .bind(entity_id)
        .bind(attribute.id)
        .bind(store_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(value)
    }

    async fn insert_rewrite(&self, rewrite: &UrlRewrite) -> Result<(), CategoryImportError> {
        sqlx::query(&format!(
            "INSERT INTO `{}`
                (entity_type, entity_id, request_path, target_path,
                 redirect_type, store_id, description, is_autogenerated, metadata)
             VALUES ('category', ?, ?, ?, 0, ?, NULL, 1, NULL)",
            self.meta.url_rewrite_table
        ))
        .bind(rewrite.entity_id)
        .bind(&rewrite.request_path)
        .bind(&rewrite.target_path)
        .bind(rewrite.store_id)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }
}
