use async_trait::async_trait;

use crate::error::CategoryImportError;

/// Row data for a new category entity; the store assigns the entity id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategoryEntity {
    pub attribute_set_id: u32,
    pub parent_id: u32,
    pub position: u32,
    pub level: u32,
}

/// Value for one EAV attribute row. The attribute's declared backend type
/// decides which value table the row lands in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Varchar(String),
    Int(i32),
}

impl AttributeValue {
    pub fn as_varchar(&self) -> String {
        match self {
            AttributeValue::Varchar(s) => s.clone(),
            AttributeValue::Int(i) => i.to_string(),
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            AttributeValue::Int(i) => i64::from(*i),
            AttributeValue::Varchar(s) => s.parse().unwrap_or_default(),
        }
    }
}

/// A category URL rewrite row. Fixed columns (entity type, redirect type,
/// auto-generated flag) are supplied by the store implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRewrite {
    pub entity_id: u32,
    pub request_path: String,
    pub target_path: String,
    pub store_id: u32,
}

/// Minimal repository contract the path resolver runs against.
///
/// The resolution algorithm is independent of the storage layout: the MySQL
/// EAV schema is one implementation, the in-memory store another.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Id of the direct child of `parent_id` whose name attribute equals
    /// `name` at the given store view. Exact string match, no normalization.
    async fn child_by_name(
        &self,
        parent_id: u32,
        name: &str,
        store_id: u32,
    ) -> Result<Option<u32>, CategoryImportError>;

    /// Insert a new entity row and return the assigned id. The row stays in
    /// a transient unpathed state until `assign_path` runs; path-based
    /// readers must not observe it in between.
    async fn create_entity(&self, entity: &NewCategoryEntity)
        -> Result<u32, CategoryImportError>;

    async fn assign_path(&self, entity_id: u32, path: &str) -> Result<(), CategoryImportError>;

    async fn increment_children_count(&self, parent_id: u32) -> Result<(), CategoryImportError>;

    /// Highest position among the direct children of a parent, i.e. rows one
    /// level below `parent_path`. `None` when the parent has no children.
    async fn max_sibling_position(
        &self,
        parent_path: &str,
        child_level: u32,
    ) -> Result<Option<u32>, CategoryImportError>;

    /// Write one EAV attribute row, routed to the value table matching the
    /// attribute's declared backend type. Fails with `UnknownAttribute` when
    /// the code is not present in the attribute metadata.
    async fn set_attribute(
        &self,
        entity_id: u32,
        code: &str,
        value: AttributeValue,
        store_id: u32,
    ) -> Result<(), CategoryImportError>;

    /// Stored url_path attribute of a category, if any.
    async fn url_path(
        &self,
        entity_id: u32,
        store_id: u32,
    ) -> Result<Option<String>, CategoryImportError>;

    async fn insert_rewrite(&self, rewrite: &UrlRewrite) -> Result<(), CategoryImportError>;
}
