//! Value carriers supplied by callers of the import pipeline.

use bigdecimal::BigDecimal;

/// One selection line of a bundle product option, as it appears in the
/// import feed.
///
/// `product_id` starts out unresolved; the import assigns it once the sku is
/// matched against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleProductSelection {
    pub sku: String,
    pub is_default: bool,
    /// Price type column value: 0 = fixed, 1 = percent.
    pub price_type: i32,
    pub price_value: BigDecimal,
    pub quantity: BigDecimal,
    pub can_change_quantity: bool,
    pub product_id: Option<u32>,
}

impl BundleProductSelection {
    pub fn new(
        sku: impl Into<String>,
        is_default: bool,
        price_type: i32,
        price_value: BigDecimal,
        quantity: BigDecimal,
        can_change_quantity: bool,
    ) -> Self {
        Self {
            sku: sku.into(),
            is_default,
            price_type,
            price_value,
            quantity,
            can_change_quantity,
            product_id: None,
        }
    }
}
