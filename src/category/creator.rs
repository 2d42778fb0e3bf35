//! Materializes a missing category node: entity row, tree bookkeeping,
//! url rewrite and the fixed attribute set.

use std::collections::HashMap;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::error::CategoryImportError;
use crate::meta::MetaData;
use crate::slug::SlugConverter;

use super::store::{AttributeValue, CategoryStore, NewCategoryEntity, UrlRewrite};
use super::{DEFAULT_STORE_ID, ID_PATH_SEPARATOR};

/// Display mode written on every imported category.
const DISPLAY_MODE_PRODUCTS: &str = "PRODUCTS";

/// Create a child category named `name` under the parent chain `id_path`
/// (root..parent) and return the new entity id.
///
/// The writes are discrete statements, not one transaction; a failure leaves
/// the rows written so far committed. Position and children-count
/// maintenance is read-then-write and assumes a single import process.
pub(super) async fn import_child_category<S: CategoryStore>(
    store: &S,
    meta: &MetaData,
    slugs: &SlugConverter,
    id_path: &[u32],
    name: &str,
) -> Result<u32, CategoryImportError> {
    debug_assert!(!id_path.is_empty(), "id path always starts at the tree root");
    let parent_id = id_path[id_path.len() - 1];
    let parent_path = id_path.iter().join(ID_PATH_SEPARATOR);
    // Root "1" is level 0; the child's id path is one id longer than the
    // parent chain, so its level equals `id_path.len()`.
    let child_level = id_path.len() as u32;

    store.increment_children_count(parent_id).await?;

    let position = store
        .max_sibling_position(&parent_path, child_level)
        .await?
        .map_or(1, |max| max + 1);

    let child_id = store
        .create_entity(&NewCategoryEntity {
            attribute_set_id: meta.default_category_attribute_set_id,
            parent_id,
            position,
            level: child_level,
        })
        .await?;

    // The entity id is only known after the insert, so the materialized path
    // lands in a second write. The node is unpathed in between; path-based
    // readers must not observe it until this completes.
    let child_path = format!("{parent_path}{ID_PATH_SEPARATOR}{child_id}");
    store.assign_path(child_id, &child_path).await?;

    let used_keys = meta.existing_category_url_keys(parent_id, DEFAULT_STORE_ID);
    let url_key = slugs.unique_url_key_from_name(name, &used_keys);
    let url_path = if id_path.len() == 1 {
        url_key.clone()
    } else {
        match store.url_path(parent_id, DEFAULT_STORE_ID).await? {
            Some(parent_url_path) => format!("{parent_url_path}/{url_key}"),
            None => {
                warn!(parent_id, "parent category has no url_path; using bare url key");
                url_key.clone()
            }
        }
    };

    store
        .insert_rewrite(&UrlRewrite {
            entity_id: child_id,
            request_path: format!("{url_path}{}", meta.category_url_suffix),
            target_path: format!("catalog/category/view/id/{child_id}"),
            store_id: DEFAULT_STORE_ID,
        })
        .await?;

    let varchar = |s: &str| AttributeValue::Varchar(s.to_string());
    store.set_attribute(child_id, "name", varchar(name), DEFAULT_STORE_ID).await?;
    store
        .set_attribute(child_id, "display_mode", varchar(DISPLAY_MODE_PRODUCTS), DEFAULT_STORE_ID)
        .await?;
    store.set_attribute(child_id, "url_key", varchar(&url_key), DEFAULT_STORE_ID).await?;
    store.set_attribute(child_id, "url_path", varchar(&url_path), DEFAULT_STORE_ID).await?;
    store.set_attribute(child_id, "is_active", AttributeValue::Int(1), DEFAULT_STORE_ID).await?;
    store.set_attribute(child_id, "is_anchor", AttributeValue::Int(1), DEFAULT_STORE_ID).await?;
    store
        .set_attribute(child_id, "include_in_menu", AttributeValue::Int(1), DEFAULT_STORE_ID)
        .await?;
    store
        .set_attribute(child_id, "custom_use_parent_settings", AttributeValue::Int(0), DEFAULT_STORE_ID)
        .await?;
    store
        .set_attribute(child_id, "custom_apply_to_products", AttributeValue::Int(0), DEFAULT_STORE_ID)
        .await?;

    // Register the new node so uniqueness checks and path lookups later in
    // the same run see it.
    let mut child_id_path = id_path.to_vec();
    child_id_path.push(child_id);
    meta.add_category_info(
        child_id,
        child_id_path,
        HashMap::from([(DEFAULT_STORE_ID, url_key)]),
    );

    debug!(child_id, name, path = %child_path, "created category");
    Ok(child_id)
}
