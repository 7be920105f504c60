use log::*;
use sqlx::SqliteConnection;
use store_gateway::ProductStatus;

use crate::{
    db::sqlite::DatabaseError,
    db_types::{
        ImportedProduct,
        ImportedVariant,
        NewImportedProduct,
        NewProduct,
        Product,
        Variant,
        VariantOrigin,
        VariantUpdate,
    },
    InsertResult,
};

const VARIANT_SELECT: &str = r#"
    SELECT
        v.id,
        v.product_id,
        v.shopify_variant_id,
        v.retail_price,
        v.retailer_payment,
        v.supplier_profit,
        v.inventory_quantity,
        i.shopify_inventory_item_id
    FROM variants v
    LEFT JOIN inventory_items i ON i.variant_id = v.id
"#;

const IMPORTED_VARIANT_SELECT: &str = r#"
    SELECT
        iv.id,
        iv.imported_product_id,
        iv.variant_id,
        iv.retailer_id,
        iv.shopify_variant_id,
        ii.shopify_inventory_item_id
    FROM imported_variants iv
    LEFT JOIN imported_inventory_items ii ON ii.imported_variant_id = iv.id
"#;

/// Inserts a product with its variants. Not atomic on its own; run it inside a transaction.
pub async fn idempotent_insert_product(
    product: NewProduct,
    conn: &mut SqliteConnection,
) -> Result<InsertResult, DatabaseError> {
    if let Some(existing) = fetch_product_by_shopify_id(product.supplier_id, &product.shopify_product_id, conn).await? {
        return Ok(InsertResult::AlreadyExists(existing.id));
    }
    let (id,): (i64,) = sqlx::query_as(
        r#"
            INSERT INTO products (supplier_id, shopify_product_id, title, status, retailer_margin_bps)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id;
        "#,
    )
    .bind(product.supplier_id)
    .bind(&product.shopify_product_id)
    .bind(&product.title)
    .bind(product.status.to_string())
    .bind(product.retailer_margin_bps)
    .fetch_one(&mut *conn)
    .await?;
    for variant in product.variants {
        let (variant_id,): (i64,) = sqlx::query_as(
            r#"
                INSERT INTO variants (product_id, shopify_variant_id, retail_price, retailer_payment, supplier_profit,
                    inventory_quantity)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id;
            "#,
        )
        .bind(id)
        .bind(&variant.shopify_variant_id)
        .bind(variant.retail_price)
        .bind(variant.retailer_payment)
        .bind(variant.supplier_profit)
        .bind(variant.inventory_quantity)
        .fetch_one(&mut *conn)
        .await?;
        if let Some(item_id) = variant.shopify_inventory_item_id {
            sqlx::query("INSERT INTO inventory_items (variant_id, shopify_inventory_item_id) VALUES ($1, $2)")
                .bind(variant_id)
                .bind(item_id)
                .execute(&mut *conn)
                .await?;
        }
    }
    trace!("🗃️ Product {} stored with id {id}", product.shopify_product_id);
    Ok(InsertResult::Inserted(id))
}

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, DatabaseError> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_product_by_shopify_id(
    supplier_id: i64,
    shopify_product_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, DatabaseError> {
    let product = sqlx::query_as("SELECT * FROM products WHERE supplier_id = $1 AND shopify_product_id = $2")
        .bind(supplier_id)
        .bind(shopify_product_id)
        .fetch_optional(conn)
        .await?;
    Ok(product)
}

pub async fn fetch_products_for_supplier(
    supplier_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Product>, DatabaseError> {
    let products = sqlx::query_as("SELECT * FROM products WHERE supplier_id = $1 ORDER BY id")
        .bind(supplier_id)
        .fetch_all(conn)
        .await?;
    Ok(products)
}

pub async fn fetch_variants(product_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Variant>, DatabaseError> {
    let query = format!("{VARIANT_SELECT} WHERE v.product_id = $1 ORDER BY v.id");
    let variants = sqlx::query_as(&query).bind(product_id).fetch_all(conn).await?;
    Ok(variants)
}

pub async fn update_product(
    product_id: i64,
    title: &str,
    status: ProductStatus,
    conn: &mut SqliteConnection,
) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE products SET title = $1, status = $2 WHERE id = $3")
        .bind(title)
        .bind(status.to_string())
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn update_variant(update: &VariantUpdate, conn: &mut SqliteConnection) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
            UPDATE variants SET
                retail_price = $1,
                retailer_payment = $2,
                supplier_profit = $3,
                inventory_quantity = $4
            WHERE id = $5
        "#,
    )
    .bind(update.retail_price)
    .bind(update.retailer_payment)
    .bind(update.supplier_profit)
    .bind(update.inventory_quantity)
    .bind(update.variant_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_product(product_id: i64, conn: &mut SqliteConnection) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(product_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Inserts a retailer mirror with its variants. Not atomic on its own; run it inside a transaction.
pub async fn idempotent_insert_imported_product(
    product: NewImportedProduct,
    conn: &mut SqliteConnection,
) -> Result<InsertResult, DatabaseError> {
    let existing =
        fetch_imported_product_by_shopify_id(product.retailer_id, &product.shopify_product_id, &mut *conn).await?;
    if let Some(existing) = existing {
        return Ok(InsertResult::AlreadyExists(existing.id));
    }
    let (id,): (i64,) = sqlx::query_as(
        r#"
            INSERT INTO imported_products (retailer_id, product_id, shopify_product_id) VALUES ($1, $2, $3)
            RETURNING id;
        "#,
    )
    .bind(product.retailer_id)
    .bind(product.product_id)
    .bind(&product.shopify_product_id)
    .fetch_one(&mut *conn)
    .await?;
    for variant in product.variants {
        let (imported_variant_id,): (i64,) = sqlx::query_as(
            r#"
                INSERT INTO imported_variants (imported_product_id, variant_id, retailer_id, shopify_variant_id)
                VALUES ($1, $2, $3, $4)
                RETURNING id;
            "#,
        )
        .bind(id)
        .bind(variant.variant_id)
        .bind(product.retailer_id)
        .bind(&variant.shopify_variant_id)
        .fetch_one(&mut *conn)
        .await?;
        if let Some(item_id) = variant.shopify_inventory_item_id {
            sqlx::query(
                "INSERT INTO imported_inventory_items (imported_variant_id, shopify_inventory_item_id) VALUES ($1, $2)",
            )
            .bind(imported_variant_id)
            .bind(item_id)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(InsertResult::Inserted(id))
}

pub async fn fetch_imported_product_by_shopify_id(
    retailer_id: i64,
    shopify_product_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ImportedProduct>, DatabaseError> {
    let product = sqlx::query_as(
        r#"SELECT id, retailer_id, product_id, shopify_product_id FROM imported_products
        WHERE retailer_id = $1 AND shopify_product_id = $2"#,
    )
    .bind(retailer_id)
    .bind(shopify_product_id)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_imported_products_for_product(
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ImportedProduct>, DatabaseError> {
    let products = sqlx::query_as(
        "SELECT id, retailer_id, product_id, shopify_product_id FROM imported_products WHERE product_id = $1 ORDER BY id",
    )
    .bind(product_id)
    .fetch_all(conn)
    .await?;
    Ok(products)
}

pub async fn fetch_imported_products_for_supplier(
    supplier_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ImportedProduct>, DatabaseError> {
    let products = sqlx::query_as(
        r#"
            SELECT ip.id, ip.retailer_id, ip.product_id, ip.shopify_product_id
            FROM imported_products ip
            JOIN products p ON p.id = ip.product_id
            WHERE p.supplier_id = $1
            ORDER BY ip.id
        "#,
    )
    .bind(supplier_id)
    .fetch_all(conn)
    .await?;
    Ok(products)
}

pub async fn fetch_imported_variants(
    imported_product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ImportedVariant>, DatabaseError> {
    let query = format!("{IMPORTED_VARIANT_SELECT} WHERE iv.imported_product_id = $1 ORDER BY iv.id");
    let variants = sqlx::query_as(&query).bind(imported_product_id).fetch_all(conn).await?;
    Ok(variants)
}

pub async fn delete_imported_product(
    imported_product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, DatabaseError> {
    let result =
        sqlx::query("DELETE FROM imported_products WHERE id = $1").bind(imported_product_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_imported_products_for_retailer(
    retailer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<u64, DatabaseError> {
    let result =
        sqlx::query("DELETE FROM imported_products WHERE retailer_id = $1").bind(retailer_id).execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn resolve_variant_origin(
    retailer_id: i64,
    shopify_variant_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<VariantOrigin>, DatabaseError> {
    let origin = sqlx::query_as(
        r#"
            SELECT
                iv.id AS imported_variant_id,
                v.id AS variant_id,
                v.shopify_variant_id,
                v.retailer_payment,
                v.supplier_profit,
                p.id AS product_id,
                p.supplier_id
            FROM imported_variants iv
            JOIN variants v ON v.id = iv.variant_id
            JOIN products p ON p.id = v.product_id
            WHERE iv.retailer_id = $1 AND iv.shopify_variant_id = $2
        "#,
    )
    .bind(retailer_id)
    .bind(shopify_variant_id)
    .fetch_optional(conn)
    .await?;
    Ok(origin)
}
