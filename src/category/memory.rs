//! In-memory `CategoryStore`: the same contract as the EAV backend over
//! process-local maps. Backs the test suite and documents the contract for
//! alternative storage layouts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::CategoryImportError;
use crate::meta::MetaData;

use super::store::{AttributeValue, CategoryStore, NewCategoryEntity, UrlRewrite};
use super::TREE_ROOT_ID;

/// Entity row as kept by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCategory {
    pub parent_id: u32,
    pub position: u32,
    pub level: u32,
    pub children_count: u32,
    pub path: String,
}

#[derive(Default)]
struct Inner {
    next_id: u32,
    nodes: HashMap<u32, StoredCategory>,
    attributes: HashMap<(u32, String, u32), AttributeValue>,
    rewrites: Vec<UrlRewrite>,
    writes: u64,
}

/// Clones share the underlying state, so a handle kept outside a resolver
/// can inspect what the resolver wrote.
#[derive(Clone)]
pub struct MemoryCategoryStore {
    meta: Arc<MetaData>,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryCategoryStore {
    pub fn new(meta: Arc<MetaData>) -> Self {
        let mut inner = Inner {
            next_id: TREE_ROOT_ID + 1,
            ..Inner::default()
        };
        inner.nodes.insert(
            TREE_ROOT_ID,
            StoredCategory {
                parent_id: 0,
                position: 0,
                level: 0,
                children_count: 0,
                path: TREE_ROOT_ID.to_string(),
            },
        );
        Self {
            meta,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("category store mutex")
    }

    /// Number of write operations performed so far.
    pub fn write_count(&self) -> u64 {
        self.inner().writes
    }

    pub fn node_count(&self) -> usize {
        self.inner().nodes.len()
    }

    pub fn node(&self, entity_id: u32) -> Option<StoredCategory> {
        self.inner().nodes.get(&entity_id).cloned()
    }

    pub fn attribute_value(
        &self,
        entity_id: u32,
        code: &str,
        store_id: u32,
    ) -> Option<AttributeValue> {
        self.inner()
            .attributes
            .get(&(entity_id, code.to_string(), store_id))
            .cloned()
    }

    pub fn rewrites(&self) -> Vec<UrlRewrite> {
        self.inner().rewrites.clone()
    }
}

#[async_trait]
impl CategoryStore for MemoryCategoryStore {
    async fn child_by_name(
        &self,
        parent_id: u32,
        name: &str,
        store_id: u32,
    ) -> Result<Option<u32>, CategoryImportError> {
        let inner = self.inner();
        for (id, node) in &inner.nodes {
            if node.parent_id != parent_id {
                continue;
            }
            match inner.attributes.get(&(*id, "name".to_string(), store_id)) {
                Some(AttributeValue::Varchar(stored)) if stored == name => return Ok(Some(*id)),
                _ => {}
            }
        }
        Ok(None)
    }

    async fn create_entity(
        &self,
        entity: &NewCategoryEntity,
    ) -> Result<u32, CategoryImportError> {
        let mut inner = self.inner();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.nodes.insert(
            id,
            StoredCategory {
                parent_id: entity.parent_id,
                position: entity.position,
                level: entity.level,
                children_count: 0,
                path: String::new(),
            },
        );
        inner.writes += 1;
        Ok(id)
    }

    async fn assign_path(&self, entity_id: u32, path: &str) -> Result<(), CategoryImportError> {
        let mut inner = self.inner();
        if let Some(node) = inner.nodes.get_mut(&entity_id) {
            node.path = path.to_string();
        }
        inner.writes += 1;
        Ok(())
    }

    async fn increment_children_count(
        &self,
        parent_id: u32,
    ) -> Result<(), CategoryImportError> {
        let mut inner = self.inner();
        if let Some(node) = inner.nodes.get_mut(&parent_id) {
            node.children_count += 1;
        }
        inner.writes += 1;
        Ok(())
    }

    async fn max_sibling_position(
        &self,
        parent_path: &str,
        child_level: u32,
    ) -> Result<Option<u32>, CategoryImportError> {
        let prefix = format!("{parent_path}/");
        let inner = self.inner();
        Ok(inner
            .nodes
            .values()
            .filter(|node| node.level == child_level && node.path.starts_with(&prefix))
            .map(|node| node.position)
            .max())
    }

    async fn set_attribute(
        &self,
        entity_id: u32,
        code: &str,
        value: AttributeValue,
        store_id: u32,
    ) -> Result<(), CategoryImportError> {
        if self.meta.attribute(code).is_none() {
            return Err(CategoryImportError::UnknownAttribute(code.to_string()));
        }
        let mut inner = self.inner();
        inner
            .attributes
            .insert((entity_id, code.to_string(), store_id), value);
        inner.writes += 1;
        Ok(())
    }

    async fn url_path(
        &self,
        entity_id: u32,
        store_id: u32,
    ) -> Result<Option<String>, CategoryImportError> {
        match self
            .inner()
            .attributes
            .get(&(entity_id, "url_path".to_string(), store_id))
        {
            Some(AttributeValue::Varchar(path)) => Ok(Some(path.clone())),
            _ => Ok(None),
        }
    }

    async fn insert_rewrite(&self, rewrite: &UrlRewrite) -> Result<(), CategoryImportError> {
        let mut inner = self.inner();
        inner.rewrites.push(rewrite.clone());
        inner.writes += 1;
        Ok(())
    }
}
