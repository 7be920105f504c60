use store_gateway::ProductStatus;

use crate::{
    db::sqlite::DatabaseError,
    db_types::{ImportedProduct, ImportedVariant, NewImportedProduct, NewProduct, Product, Variant, VariantOrigin, VariantUpdate},
    InsertResult,
};

/// Supplier products and the retailer mirrors of them.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    /// Stores a product with its variants and inventory items in one transaction.
    async fn insert_product(&self, product: NewProduct) -> Result<InsertResult, DatabaseError>;

    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, DatabaseError>;

    async fn fetch_product_by_shopify_id(
        &self,
        supplier_id: i64,
        shopify_product_id: &str,
    ) -> Result<Option<Product>, DatabaseError>;

    async fn fetch_products_for_supplier(&self, supplier_id: i64) -> Result<Vec<Product>, DatabaseError>;

    async fn fetch_variants(&self, product_id: i64) -> Result<Vec<Variant>, DatabaseError>;

    async fn update_product(&self, product_id: i64, title: &str, status: ProductStatus) -> Result<(), DatabaseError>;

    /// Applies all variant updates of one product atomically.
    async fn update_variants(&self, updates: &[VariantUpdate]) -> Result<(), DatabaseError>;

    /// Deletes the product, its variants and every retailer mirror row of it.
    async fn delete_product(&self, product_id: i64) -> Result<bool, DatabaseError>;

    async fn insert_imported_product(&self, product: NewImportedProduct) -> Result<InsertResult, DatabaseError>;

    async fn fetch_imported_product_by_shopify_id(
        &self,
        retailer_id: i64,
        shopify_product_id: &str,
    ) -> Result<Option<ImportedProduct>, DatabaseError>;

    async fn fetch_imported_products_for_product(&self, product_id: i64) -> Result<Vec<ImportedProduct>, DatabaseError>;

    /// Every retailer mirror of every product owned by `supplier_id`.
    async fn fetch_imported_products_for_supplier(
        &self,
        supplier_id: i64,
    ) -> Result<Vec<ImportedProduct>, DatabaseError>;

    async fn fetch_imported_variants(&self, imported_product_id: i64) -> Result<Vec<ImportedVariant>, DatabaseError>;

    async fn delete_imported_product(&self, imported_product_id: i64) -> Result<bool, DatabaseError>;

    /// Deletes every mirror owned by the retailer. Returns the number of products removed.
    async fn delete_imported_products_for_retailer(&self, retailer_id: i64) -> Result<u64, DatabaseError>;

    /// Resolves a retailer variant to its supplier. `None` if the variant is not a SynqSell import.
    async fn resolve_variant_origin(
        &self,
        retailer_id: i64,
        shopify_variant_id: &str,
    ) -> Result<Option<VariantOrigin>, DatabaseError>;
}
