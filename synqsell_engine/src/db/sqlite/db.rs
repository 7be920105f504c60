use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;
use store_gateway::{ProductStatus, TrackingInfo};

use super::{
    catalog,
    db_url,
    fulfillments,
    new_pool,
    orders,
    payments,
    processed_events,
    sessions,
    DatabaseError,
};
use crate::{
    db::traits::{
        CatalogManagement,
        FulfillmentManagement,
        OrderManagement,
        PaymentManagement,
        SessionManagement,
        SynqsellDatabase,
    },
    db_types::{
        Fulfillment,
        FulfillmentLineItem,
        FulfillmentStatus,
        ImportedProduct,
        ImportedVariant,
        NewFulfillment,
        NewImportedProduct,
        NewOrder,
        NewPayment,
        NewProduct,
        NewSession,
        Order,
        OrderLineItem,
        Payment,
        PaymentRecordStatus,
        PaymentStatus,
        Product,
        Role,
        Session,
        StripeConnectAccount,
        StripeCustomerAccount,
        Variant,
        VariantOrigin,
        VariantUpdate,
    },
    ledger::IdempotencyLedger,
    InsertResult,
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using `SYNQ_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, DatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, DatabaseError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl SynqsellDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl IdempotencyLedger for SqliteDatabase {
    async fn has_processed(&self, event_id: &str) -> Result<bool, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        processed_events::has_processed(event_id, &mut conn).await
    }

    async fn mark_processed(&self, event_id: &str, topic: &str) -> Result<(), DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        processed_events::mark_processed(event_id, topic, &mut conn).await?;
        trace!("🗃️ Event {event_id} ({topic}) marked as processed");
        Ok(())
    }
}

impl SessionManagement for SqliteDatabase {
    async fn fetch_session(&self, id: i64) -> Result<Option<Session>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        sessions::fetch_session(id, &mut conn).await
    }

    async fn fetch_session_by_shop(&self, shop: &str) -> Result<Option<Session>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        sessions::fetch_session_by_shop(shop, &mut conn).await
    }

    async fn upsert_session(&self, session: NewSession) -> Result<Session, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let session = sessions::upsert_session(session, &mut conn).await?;
        debug!("🗃️ Session #{} saved for {}", session.id, session.shop);
        Ok(session)
    }

    async fn assign_role(&self, session_id: i64, role: Role) -> Result<(), DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        sessions::assign_role(session_id, role, &mut conn).await
    }

    async fn fetch_roles(&self, session_id: i64) -> Result<Vec<Role>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        sessions::fetch_roles(session_id, &mut conn).await
    }

    async fn mark_uninstalled(&self, session_id: i64) -> Result<(), DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        sessions::mark_uninstalled(session_id, &mut conn).await?;
        debug!("🗃️ Session #{session_id} flagged as uninstalled");
        Ok(())
    }

    async fn delete_session(&self, session_id: i64) -> Result<bool, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let deleted = sessions::delete_session(session_id, &mut conn).await?;
        debug!("🗃️ Session #{session_id} deleted: {deleted}");
        Ok(deleted)
    }

    async fn save_connect_account(&self, session_id: i64, stripe_account_id: &str) -> Result<(), DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        sessions::save_connect_account(session_id, stripe_account_id, &mut conn).await
    }

    async fn save_customer_account(
        &self,
        session_id: i64,
        stripe_customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        sessions::save_customer_account(session_id, stripe_customer_id, payment_method_id, &mut conn).await
    }

    async fn fetch_connect_account(&self, session_id: i64) -> Result<Option<StripeConnectAccount>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        sessions::fetch_connect_account(session_id, &mut conn).await
    }

    async fn fetch_customer_account(&self, session_id: i64) -> Result<Option<StripeCustomerAccount>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        sessions::fetch_customer_account(session_id, &mut conn).await
    }

    async fn delete_stripe_integrations(&self, session_id: i64) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sessions::delete_stripe_integrations(session_id, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_product(&self, product: NewProduct) -> Result<InsertResult, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let result = catalog::idempotent_insert_product(product, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_product(id, &mut conn).await
    }

    async fn fetch_product_by_shopify_id(
        &self,
        supplier_id: i64,
        shopify_product_id: &str,
    ) -> Result<Option<Product>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_product_by_shopify_id(supplier_id, shopify_product_id, &mut conn).await
    }

    async fn fetch_products_for_supplier(&self, supplier_id: i64) -> Result<Vec<Product>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_products_for_supplier(supplier_id, &mut conn).await
    }

    async fn fetch_variants(&self, product_id: i64) -> Result<Vec<Variant>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_variants(product_id, &mut conn).await
    }

    async fn update_product(&self, product_id: i64, title: &str, status: ProductStatus) -> Result<(), DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::update_product(product_id, title, status, &mut conn).await
    }

    async fn update_variants(&self, updates: &[VariantUpdate]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        for update in updates {
            catalog::update_variant(update, &mut tx).await?;
        }
        tx.commit().await?;
        trace!("🗃️ {} variants updated", updates.len());
        Ok(())
    }

    async fn delete_product(&self, product_id: i64) -> Result<bool, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::delete_product(product_id, &mut conn).await
    }

    async fn insert_imported_product(&self, product: NewImportedProduct) -> Result<InsertResult, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let result = catalog::idempotent_insert_imported_product(product, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_imported_product_by_shopify_id(
        &self,
        retailer_id: i64,
        shopify_product_id: &str,
    ) -> Result<Option<ImportedProduct>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_imported_product_by_shopify_id(retailer_id, shopify_product_id, &mut conn).await
    }

    async fn fetch_imported_products_for_product(&self, product_id: i64) -> Result<Vec<ImportedProduct>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_imported_products_for_product(product_id, &mut conn).await
    }

    async fn fetch_imported_products_for_supplier(
        &self,
        supplier_id: i64,
    ) -> Result<Vec<ImportedProduct>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_imported_products_for_supplier(supplier_id, &mut conn).await
    }

    async fn fetch_imported_variants(&self, imported_product_id: i64) -> Result<Vec<ImportedVariant>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_imported_variants(imported_product_id, &mut conn).await
    }

    async fn delete_imported_product(&self, imported_product_id: i64) -> Result<bool, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::delete_imported_product(imported_product_id, &mut conn).await
    }

    async fn delete_imported_products_for_retailer(&self, retailer_id: i64) -> Result<u64, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let count = catalog::delete_imported_products_for_retailer(retailer_id, &mut conn).await?;
        debug!("🗃️ Deleted {count} imported products of retailer #{retailer_id}");
        Ok(count)
    }

    async fn resolve_variant_origin(
        &self,
        retailer_id: i64,
        shopify_variant_id: &str,
    ) -> Result<Option<VariantOrigin>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::resolve_variant_origin(retailer_id, shopify_variant_id, &mut conn).await
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<InsertResult, DatabaseError> {
        let supplier_id = order.supplier_id;
        let fulfillment_order_id = order.shopify_retailer_fulfillment_order_id.clone();
        let mut tx = self.pool.begin().await?;
        match orders::idempotent_insert(order, &mut tx).await {
            Ok(result) => {
                tx.commit().await?;
                Ok(result)
            },
            Err(e) if e.is_unique_violation() => {
                tx.rollback().await?;
                let mut conn = self.pool.acquire().await?;
                let existing =
                    orders::fetch_order_for_fulfillment_order(supplier_id, &fulfillment_order_id, &mut conn).await?;
                match existing {
                    Some(o) => Ok(InsertResult::AlreadyExists(o.id)),
                    None => Err(e),
                }
            },
            Err(e) => Err(e),
        }
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await
    }

    async fn fetch_order_for_fulfillment_order(
        &self,
        supplier_id: i64,
        fulfillment_order_id: &str,
    ) -> Result<Option<Order>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_for_fulfillment_order(supplier_id, fulfillment_order_id, &mut conn).await
    }

    async fn fetch_order_by_supplier_order_id(
        &self,
        supplier_id: i64,
        shopify_order_id: &str,
    ) -> Result<Option<Order>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_supplier_order_id(supplier_id, shopify_order_id, &mut conn).await
    }

    async fn fetch_orders_for_fulfillment_order(&self, fulfillment_order_id: &str) -> Result<Vec<Order>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_fulfillment_order(fulfillment_order_id, &mut conn).await
    }

    async fn fetch_order_line_items(&self, order_id: i64) -> Result<Vec<OrderLineItem>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_line_items(order_id, &mut conn).await
    }

    async fn record_cancelled_quantities(&self, order_id: i64, quantities: &[(i64, i64)]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        for (line_item_id, cancelled) in quantities {
            orders::set_cancelled_quantity(order_id, *line_item_id, *cancelled, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Cancelled quantities recorded for order #{order_id}: {quantities:?}");
        Ok(())
    }

    async fn update_order_payment_status(&self, order_id: i64, status: PaymentStatus) -> Result<(), DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_payment_status(order_id, status, &mut conn).await?;
        debug!("🗃️ Order #{order_id} payment status is now {status}");
        Ok(())
    }
}

impl FulfillmentManagement for SqliteDatabase {
    async fn insert_fulfillment(&self, fulfillment: NewFulfillment) -> Result<InsertResult, DatabaseError> {
        let supplier_id = fulfillment.supplier_shopify_fulfillment_id.clone();
        let mut tx = self.pool.begin().await?;
        match fulfillments::idempotent_insert(fulfillment, &mut tx).await {
            Ok(result) => {
                tx.commit().await?;
                Ok(result)
            },
            Err(e) if e.is_unique_violation() => {
                tx.rollback().await?;
                let mut conn = self.pool.acquire().await?;
                match fulfillments::fetch_by_supplier_id(&supplier_id, &mut conn).await? {
                    Some(f) => Ok(InsertResult::AlreadyExists(f.id)),
                    None => Err(e),
                }
            },
            Err(e) => Err(e),
        }
    }

    async fn fetch_fulfillment(&self, id: i64) -> Result<Option<Fulfillment>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        fulfillments::fetch_fulfillment(id, &mut conn).await
    }

    async fn fetch_fulfillment_by_supplier_id(
        &self,
        supplier_fulfillment_id: &str,
    ) -> Result<Option<Fulfillment>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        fulfillments::fetch_by_supplier_id(supplier_fulfillment_id, &mut conn).await
    }

    async fn fetch_fulfillment_by_retailer_id(
        &self,
        retailer_fulfillment_id: &str,
    ) -> Result<Option<Fulfillment>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        fulfillments::fetch_by_retailer_id(retailer_fulfillment_id, &mut conn).await
    }

    async fn fetch_fulfillments_for_order(&self, order_id: i64) -> Result<Vec<Fulfillment>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        fulfillments::fetch_for_order(order_id, &mut conn).await
    }

    async fn fetch_fulfillment_line_items(&self, fulfillment_id: i64) -> Result<Vec<FulfillmentLineItem>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        fulfillments::fetch_line_items(fulfillment_id, &mut conn).await
    }

    async fn relink_retailer_fulfillment(
        &self,
        fulfillment_id: i64,
        retailer_fulfillment_id: &str,
    ) -> Result<(), DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        fulfillments::relink_retailer_fulfillment(fulfillment_id, retailer_fulfillment_id, &mut conn).await?;
        debug!("🗃️ Fulfillment #{fulfillment_id} relinked to retailer fulfillment {retailer_fulfillment_id}");
        Ok(())
    }

    async fn update_fulfillment_status(&self, fulfillment_id: i64, status: FulfillmentStatus) -> Result<(), DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        fulfillments::update_status(fulfillment_id, status, &mut conn).await?;
        debug!("🗃️ Fulfillment #{fulfillment_id} is now {status}");
        Ok(())
    }

    async fn update_fulfillment_tracking(
        &self,
        fulfillment_id: i64,
        tracking: &TrackingInfo,
        shipment_status: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        fulfillments::update_tracking(fulfillment_id, tracking, shipment_status, &mut conn).await
    }
}

impl PaymentManagement for SqliteDatabase {
    async fn insert_payment(&self, payment: NewPayment) -> Result<InsertResult, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let result = payments::idempotent_insert(payment, &mut conn).await?;
        trace!("🗃️ Payment insert result: {result:?}");
        Ok(result)
    }

    async fn fetch_payment_for_fulfillment(&self, fulfillment_id: i64) -> Result<Option<Payment>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_for_fulfillment(fulfillment_id, &mut conn).await
    }

    async fn fetch_payment_by_intent(&self, payment_intent_id: &str) -> Result<Option<Payment>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_by_intent(payment_intent_id, &mut conn).await
    }

    async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_for_order(order_id, &mut conn).await
    }

    async fn update_payment_record_status(
        &self,
        payment_id: i64,
        status: PaymentRecordStatus,
    ) -> Result<(), DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        payments::update_status(payment_id, status, &mut conn).await?;
        debug!("🗃️ Payment #{payment_id} is now {status}");
        Ok(())
    }
}
