use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::CategoryImportError;
use crate::meta::MetaData;
use crate::slug::SlugConverter;

use super::creator::import_child_category;
use super::store::CategoryStore;
use super::{DEFAULT_STORE_ID, TREE_ROOT_ID};

/// Outcome of resolving one category name path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PathResolution {
    /// Leaf category id the path resolves to.
    Resolved(u32),
    /// A segment had no matching child and auto-create was disabled.
    NotFound { segment: String },
}

impl PathResolution {
    pub fn id(&self) -> Option<u32> {
        match self {
            PathResolution::Resolved(id) => Some(*id),
            PathResolution::NotFound { .. } => None,
        }
    }
}

/// Resolves category name paths to entity ids, creating missing nodes on
/// demand.
///
/// Owns a path cache valid for its own lifetime; create one resolver per
/// import run and do not share it across concurrent workers.
pub struct CategoryPathResolver<S: CategoryStore> {
    store: S,
    meta: Arc<MetaData>,
    slugs: SlugConverter,
    path_cache: HashMap<String, u32>,
}

impl<S: CategoryStore> CategoryPathResolver<S> {
    pub fn new(store: S, meta: Arc<MetaData>) -> Self {
        Self {
            store,
            meta,
            slugs: SlugConverter,
            path_cache: HashMap::new(),
        }
    }

    /// Resolve a batch of name paths; one result per input path, in order.
    ///
    /// Recoverable failures (missing segment with auto-create off) are
    /// reported per path so callers decide their own abort-vs-continue
    /// policy. Configuration and storage errors abort the whole call.
    pub async fn import_category_paths(
        &mut self,
        paths: &[String],
        auto_create: bool,
        separator: &str,
    ) -> Result<Vec<PathResolution>, CategoryImportError> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            results.push(self.import_category_path(path, auto_create, separator).await?);
        }
        Ok(results)
    }

    /// Resolve one name path, walking root to leaf and creating missing
    /// nodes when `auto_create` is set.
    pub async fn import_category_path(
        &mut self,
        name_path: &str,
        auto_create: bool,
        separator: &str,
    ) -> Result<PathResolution, CategoryImportError> {
        match self.resolve_path(name_path, auto_create, separator).await {
            Ok(id) => Ok(PathResolution::Resolved(id)),
            Err(CategoryImportError::CategoryNotFound(segment)) => {
                Ok(PathResolution::NotFound { segment })
            }
            Err(fatal) => Err(fatal),
        }
    }

    async fn resolve_path(
        &mut self,
        name_path: &str,
        auto_create: bool,
        separator: &str,
    ) -> Result<u32, CategoryImportError> {
        if let Some(&id) = self.path_cache.get(name_path) {
            debug!(name_path, id, "category path cache hit");
            return Ok(id);
        }

        let mut id_path = vec![TREE_ROOT_ID];
        for segment in name_path.split(separator) {
            let parent_id = id_path[id_path.len() - 1];
            let child_id = match self
                .store
                .child_by_name(parent_id, segment, DEFAULT_STORE_ID)
                .await?
            {
                Some(id) => id,
                None if !auto_create => {
                    return Err(CategoryImportError::CategoryNotFound(segment.to_string()));
                }
                None => {
                    import_child_category(&self.store, &self.meta, &self.slugs, &id_path, segment)
                        .await?
                }
            };
            id_path.push(child_id);
        }

        let leaf = id_path[id_path.len() - 1];
        self.path_cache.insert(name_path.to_string(), leaf);
        Ok(leaf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{AttributeValue, MemoryCategoryStore};
    use crate::meta::{EavAttribute, EavType};

    const VARCHAR_CODES: [&str; 4] = ["name", "display_mode", "url_key", "url_path"];
    const INT_CODES: [&str; 5] = [
        "is_active",
        "is_anchor",
        "include_in_menu",
        "custom_use_parent_settings",
        "custom_apply_to_products",
    ];

    fn test_meta_without(missing: &str) -> Arc<MetaData> {
        let mut attributes = HashMap::new();
        let mut next_id = 40;
        for code in VARCHAR_CODES {
            attributes.insert(code.to_string(), EavAttribute { id: next_id, kind: EavType::Varchar });
            next_id += 1;
        }
        for code in INT_CODES {
            attributes.insert(code.to_string(), EavAttribute { id: next_id, kind: EavType::Int });
            next_id += 1;
        }
        attributes.remove(missing);
        Arc::new(MetaData::new(
            "catalog_category_entity",
            "url_rewrite",
            3,
            ".html",
            attributes,
        ))
    }

    fn test_meta() -> Arc<MetaData> {
        test_meta_without("")
    }

    fn resolver(
        meta: &Arc<MetaData>,
    ) -> (CategoryPathResolver<MemoryCategoryStore>, MemoryCategoryStore) {
        let store = MemoryCategoryStore::new(meta.clone());
        (CategoryPathResolver::new(store.clone(), meta.clone()), store)
    }

    #[tokio::test]
    async fn sibling_paths_share_one_parent_node() {
        let meta = test_meta();
        let (mut resolver, store) = resolver(&meta);

        let results = resolver
            .import_category_paths(
                &["Men/Shoes".to_string(), "Men/Shirts".to_string()],
                true,
                "/",
            )
            .await
            .unwrap();

        let shoes = results[0].id().unwrap();
        let shirts = results[1].id().unwrap();
        assert_ne!(shoes, shirts);
        // root + Men + Shoes + Shirts
        assert_eq!(store.node_count(), 4);

        let men_id = store.child_by_name(TREE_ROOT_ID, "Men", 0).await.unwrap().unwrap();
        let men = store.node(men_id).unwrap();
        assert_eq!(men.children_count, 2);
        for child_id in [shoes, shirts] {
            let child = store.node(child_id).unwrap();
            assert_eq!(child.level, men.level + 1);
            assert_eq!(child.parent_id, men_id);
        }
        assert_eq!(store.node(shoes).unwrap().position, 1);
        assert_eq!(store.node(shirts).unwrap().position, 2);
    }

    #[tokio::test]
    async fn repeated_paths_hit_the_cache_without_writes() {
        let meta = test_meta();
        let (mut resolver, store) = resolver(&meta);

        let first = resolver.import_category_path("Men/Shoes", true, "/").await.unwrap();
        let writes = store.write_count();
        let second = resolver.import_category_path("Men/Shoes", true, "/").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn existing_chain_resolves_without_creating() {
        let meta = test_meta();
        let (mut seeder, store) = resolver(&meta);
        let seeded = seeder
            .import_category_path("Men/Shoes", true, "/")
            .await
            .unwrap()
            .id()
            .unwrap();

        // fresh resolver: empty path cache, same storage
        let mut resolver = CategoryPathResolver::new(store.clone(), meta.clone());
        let writes = store.write_count();
        let result = resolver.import_category_path("Men/Shoes", false, "/").await.unwrap();

        assert_eq!(result, PathResolution::Resolved(seeded));
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn created_nodes_keep_path_and_level_invariants() {
        let meta = test_meta();
        let (mut resolver, store) = resolver(&meta);

        let leaf = resolver
            .import_category_path("Men|Shoes|Boots", true, "|")
            .await
            .unwrap()
            .id()
            .unwrap();

        let mut id = leaf;
        loop {
            let node = store.node(id).unwrap();
            assert_eq!(node.level as usize, node.path.split('/').count() - 1);
            if node.parent_id == 0 {
                break;
            }
            let parent = store.node(node.parent_id).unwrap();
            assert_eq!(node.path, format!("{}/{}", parent.path, id));
            assert_eq!(node.level, parent.level + 1);
            id = node.parent_id;
        }
    }

    #[tokio::test]
    async fn sibling_url_keys_are_disambiguated() {
        let meta = test_meta();
        let (mut resolver, store) = resolver(&meta);

        // exact-match lookup keeps "Sale" and "SALE" distinct, but both
        // slugify to "sale"
        let first = resolver
            .import_category_path("Outlet/Sale", true, "/")
            .await
            .unwrap()
            .id()
            .unwrap();
        let second = resolver
            .import_category_path("Outlet/SALE", true, "/")
            .await
            .unwrap()
            .id()
            .unwrap();
        assert_ne!(first, second);

        let key = |id| match store.attribute_value(id, "url_key", 0) {
            Some(AttributeValue::Varchar(k)) => k,
            other => panic!("url_key missing: {other:?}"),
        };
        assert_eq!(key(first), "sale");
        assert_eq!(key(second), "sale-1");

        let path = |id| match store.attribute_value(id, "url_path", 0) {
            Some(AttributeValue::Varchar(p)) => p,
            other => panic!("url_path missing: {other:?}"),
        };
        assert_eq!(path(second), "outlet/sale-1");

        let rewrites = store.rewrites();
        let rewrite = rewrites.iter().find(|r| r.entity_id == second).unwrap();
        assert_eq!(rewrite.request_path, "outlet/sale-1.html");
        assert_eq!(rewrite.target_path, format!("catalog/category/view/id/{second}"));
        assert_eq!(rewrite.store_id, 0);
    }

    #[tokio::test]
    async fn missing_middle_segment_reports_the_segment_without_writes() {
        let meta = test_meta();
        let (mut seeder, store) = resolver(&meta);
        seeder.import_category_path("Men", true, "/").await.unwrap();

        let mut resolver = CategoryPathResolver::new(store.clone(), meta.clone());
        let writes = store.write_count();
        let result = resolver
            .import_category_path("Men/Missing/Boots", false, "/")
            .await
            .unwrap();

        assert_eq!(
            result,
            PathResolution::NotFound { segment: "Missing".to_string() }
        );
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn unknown_attribute_code_aborts_the_batch() {
        let meta = test_meta_without("display_mode");
        let (mut resolver, store) = resolver(&meta);

        let err = resolver
            .import_category_paths(
                &["Men".to_string(), "Women".to_string()],
                true,
                "/",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CategoryImportError::UnknownAttribute(code) if code == "display_mode"));
        // the name row landed before the fatal lookup, nothing after it did
        let men_id = store.child_by_name(TREE_ROOT_ID, "Men", 0).await.unwrap().unwrap();
        assert!(store.attribute_value(men_id, "url_key", 0).is_none());
        // the second path was never processed
        assert!(store.child_by_name(TREE_ROOT_ID, "Women", 0).await.unwrap().is_none());
    }
}
