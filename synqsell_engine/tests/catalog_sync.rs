use serde_json::json;
use store_gateway::ProductStatus;
use synq_common::Cents;
use synqsell_engine::{
    config::DEFAULT_PLATFORM_FEE_BPS,
    db_types::{Role, Session},
    events::Topic,
    pricing::price_variant,
    test_utils::{
        fakes::{FakePayments, FakeStore},
        prepare_env::fresh_database,
        seed::*,
    },
    CatalogManagement,
    EngineConfig,
    EventCoordinator,
    RetryPolicy,
    SqliteDatabase,
};

type Coordinator = EventCoordinator<SqliteDatabase, FakeStore, FakePayments>;

struct Catalogs {
    coordinator: Coordinator,
    store: FakeStore,
    supplier: Session,
    other_supplier: Session,
}

/// Two suppliers whose products are both mirrored by the retailer: product 1 ($10.00 mug, variant 11) belongs to
/// the supplier under test, product 2 ($5.00 coaster, variant 21) to an unrelated supplier.
async fn catalogs() -> Catalogs {
    let db = fresh_database().await;
    let store = FakeStore::new();
    let config = EngineConfig::default().with_retry(RetryPolicy::immediate(1));
    let coordinator = EventCoordinator::new(db, store.clone(), FakePayments::new(), config);
    let db = coordinator.db();
    let (supplier, retailer) = seed_stores(db).await;
    let other_supplier = seed_store(db, "coasters.myshopify.com", Role::Supplier, None).await;
    seed_catalog(db, &supplier, &retailer, 1, 2000, DEFAULT_PLATFORM_FEE_BPS, &[(11, 1000, 50)]).await;
    seed_catalog(db, &other_supplier, &retailer, 2, 2000, DEFAULT_PLATFORM_FEE_BPS, &[(21, 500, 10)]).await;
    Catalogs { coordinator, store, supplier, other_supplier }
}

#[tokio::test]
async fn supplier_price_change_reaches_every_mirror() {
    let Catalogs { coordinator, store, supplier, other_supplier } = catalogs().await;
    let db = coordinator.db();
    let update = product_snapshot("gid://shopify/Product/1", "active", &[("gid://shopify/ProductVariant/11", "12.00", 40)]);

    let report = coordinator
        .process_batch(vec![envelope("evt-price", Topic::ProductUpdated, SUPPLIER_SHOP, update)])
        .await;
    assert_eq!(report.processed, vec!["evt-price".to_string()]);

    let product = db.fetch_product_by_shopify_id(supplier.id, "gid://shopify/Product/1").await.unwrap().unwrap();
    let variant = db.fetch_variants(product.id).await.unwrap().remove(0);
    let expected = price_variant(Cents::from(1200), 2000, DEFAULT_PLATFORM_FEE_BPS);
    assert_eq!(variant.retail_price, Cents::from(1200));
    assert_eq!(variant.retailer_payment, expected.retailer_payment);
    assert_eq!(variant.retailer_payment, Cents::from(960));
    assert_eq!(variant.supplier_profit, expected.supplier_profit);
    assert_eq!(variant.inventory_quantity, 40);

    let state = store.state();
    let pushed = state.prices_for(RETAILER_SHOP);
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].0, "gid://shopify/Product/1001");
    assert_eq!(pushed[0].1[0].variant_id, "gid://shopify/ProductVariant/1011");
    assert_eq!(pushed[0].1[0].price, Cents::from(1200));
    assert_eq!(state.inventory.len(), 1);
    assert_eq!(state.inventory[0].1, SYNQSELL_LOCATION);
    assert_eq!(state.inventory[0].2[0].inventory_item_id, "gid://shopify/InventoryItem/1011");
    assert_eq!(state.inventory[0].2[0].quantity, 40);
    assert_eq!(state.statuses, vec![(
        RETAILER_SHOP.to_string(),
        "gid://shopify/Product/1001".to_string(),
        ProductStatus::Active
    )]);
    drop(state);

    // The unrelated supplier's product is untouched
    let other = db.fetch_product_by_shopify_id(other_supplier.id, "gid://shopify/Product/2").await.unwrap().unwrap();
    let other_variant = db.fetch_variants(other.id).await.unwrap().remove(0);
    assert_eq!(other_variant.retail_price, Cents::from(500));
    assert!(store.state().prices.iter().all(|(_, product, _)| product != "gid://shopify/Product/1002"));
}

#[tokio::test]
async fn mirror_echo_is_a_no_op_and_retailer_edits_are_reverted() {
    let Catalogs { coordinator, store, .. } = catalogs().await;

    let echo = product_snapshot("gid://shopify/Product/1001", "active", &[("gid://shopify/ProductVariant/1011", "10.00", 50)]);
    let report = coordinator.process_batch(vec![envelope("evt-echo", Topic::ProductUpdated, RETAILER_SHOP, echo)]).await;
    assert_eq!(report.skipped, vec!["evt-echo".to_string()]);
    assert!(store.state().prices.is_empty());

    let edited = product_snapshot("gid://shopify/Product/1001", "draft", &[("gid://shopify/ProductVariant/1011", "7.99", 50)]);
    let report = coordinator.process_batch(vec![envelope("evt-edit", Topic::ProductUpdated, RETAILER_SHOP, edited)]).await;
    assert_eq!(report.processed, vec!["evt-edit".to_string()]);
    let state = store.state();
    let reverted = state.prices_for(RETAILER_SHOP);
    assert_eq!(reverted.len(), 1);
    assert_eq!(reverted[0].1[0].price, Cents::from(1000));
    assert_eq!(state.statuses.last().map(|s| s.2), Some(ProductStatus::Active));
}

#[tokio::test]
async fn supplier_product_deletion_removes_mirrors() {
    let Catalogs { coordinator, store, supplier, other_supplier } = catalogs().await;
    let db = coordinator.db();
    let product = db.fetch_product_by_shopify_id(supplier.id, "gid://shopify/Product/1").await.unwrap().unwrap();

    let report = coordinator
        .process_batch(vec![envelope("evt-delete", Topic::ProductDeleted, SUPPLIER_SHOP, json!({ "id": 1 }))])
        .await;
    assert_eq!(report.processed, vec!["evt-delete".to_string()]);
    assert_eq!(store.state().deleted_products, vec![(
        RETAILER_SHOP.to_string(),
        "gid://shopify/Product/1001".to_string()
    )]);
    assert!(db.fetch_product_by_shopify_id(supplier.id, "gid://shopify/Product/1").await.unwrap().is_none());
    assert!(db.fetch_imported_products_for_product(product.id).await.unwrap().is_empty());
    assert!(db.fetch_product_by_shopify_id(other_supplier.id, "gid://shopify/Product/2").await.unwrap().is_some());

    let report = coordinator
        .process_batch(vec![envelope("evt-delete-dup", Topic::ProductDeleted, SUPPLIER_SHOP, json!({ "id": 1 }))])
        .await;
    assert_eq!(report.skipped, vec!["evt-delete-dup".to_string()]);
}

#[tokio::test]
async fn retailer_deleting_a_mirror_unlinks_it() {
    let Catalogs { coordinator, store, supplier, .. } = catalogs().await;
    let db = coordinator.db();
    let product = db.fetch_product_by_shopify_id(supplier.id, "gid://shopify/Product/1").await.unwrap().unwrap();

    let payload = json!({ "id": "gid://shopify/Product/1001" });
    let report =
        coordinator.process_batch(vec![envelope("evt-unlink", Topic::ProductDeleted, RETAILER_SHOP, payload)]).await;
    assert_eq!(report.processed.len(), 1);
    assert!(db.fetch_imported_products_for_product(product.id).await.unwrap().is_empty());
    assert!(store.state().deleted_products.is_empty());
    assert!(db.fetch_product(product.id).await.unwrap().is_some());
}
