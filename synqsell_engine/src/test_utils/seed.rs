//! Fixture data shared by the integration tests.
use serde_json::{json, Value};
use store_gateway::{FulfillmentOrderDetails, FulfillmentOrderLineItem, MailingAddress, ProductStatus, StoreOrder};
use synq_common::Cents;

use crate::{
    config::DEFAULT_PLATFORM_FEE_BPS,
    db_types::{
        ImportedProduct,
        ImportedVariant,
        NewImportedProduct,
        NewImportedVariant,
        NewProduct,
        NewSession,
        NewVariant,
        Product,
        Role,
        Session,
        Variant,
    },
    events::Topic,
    pricing::price_variant,
    test_utils::fakes::FakeStore,
    traits::SynqsellDatabase,
};

pub const SUPPLIER_SHOP: &str = "supplier.myshopify.com";
pub const RETAILER_SHOP: &str = "retailer.myshopify.com";
pub const SYNQSELL_LOCATION: &str = "gid://shopify/Location/777";

pub async fn seed_store<B: SynqsellDatabase>(db: &B, shop: &str, role: Role, location: Option<&str>) -> Session {
    let mut new_session = NewSession::new(shop, format!("shpat_{}", shop.replace('.', "_")));
    if let Some(location) = location {
        new_session = new_session.with_fulfillment_location(location);
    }
    let session = db.upsert_session(new_session).await.expect("Error creating session");
    db.assign_role(session.id, role).await.expect("Error assigning role");
    session
}

/// A supplier with a Stripe connected account and a retailer with a saved payment method, routed through
/// [`SYNQSELL_LOCATION`].
pub async fn seed_stores<B: SynqsellDatabase>(db: &B) -> (Session, Session) {
    let supplier = seed_store(db, SUPPLIER_SHOP, Role::Supplier, None).await;
    let retailer = seed_store(db, RETAILER_SHOP, Role::Retailer, Some(SYNQSELL_LOCATION)).await;
    db.save_connect_account(supplier.id, "acct_supplier").await.expect("Error saving connect account");
    db.save_customer_account(retailer.id, "cus_retailer", "pm_retailer").await.expect("Error saving customer");
    (supplier, retailer)
}

pub struct SeededCatalog {
    pub product: Product,
    pub variants: Vec<Variant>,
    pub mirror: ImportedProduct,
    pub mirror_variants: Vec<ImportedVariant>,
}

/// Seeds one supplier product and the retailer's mirror of it.
///
/// `variants` is a list of `(variant number, retail price, inventory)`. Supplier variants get the id
/// `gid://shopify/ProductVariant/<n>` and retailer variants `gid://shopify/ProductVariant/<n + 1000>`.
pub async fn seed_catalog<B: SynqsellDatabase>(
    db: &B,
    supplier: &Session,
    retailer: &Session,
    product_number: u64,
    margin_bps: i64,
    fee_bps: i64,
    variants: &[(u64, i64, i64)],
) -> SeededCatalog {
    let new_product = NewProduct {
        supplier_id: supplier.id,
        shopify_product_id: format!("gid://shopify/Product/{product_number}"),
        title: format!("Product {product_number}"),
        status: ProductStatus::Active,
        retailer_margin_bps: margin_bps,
        variants: variants
            .iter()
            .map(|(n, price, qty)| {
                let pricing = price_variant(Cents::from(*price), margin_bps, fee_bps);
                NewVariant {
                    shopify_variant_id: format!("gid://shopify/ProductVariant/{n}"),
                    shopify_inventory_item_id: Some(format!("gid://shopify/InventoryItem/{n}")),
                    retail_price: pricing.retail_price,
                    retailer_payment: pricing.retailer_payment,
                    supplier_profit: pricing.supplier_profit,
                    inventory_quantity: *qty,
                }
            })
            .collect(),
    };
    let product_id = db.insert_product(new_product).await.expect("Error inserting product").id();
    let product = db.fetch_product(product_id).await.expect("Error fetching product").expect("Product is missing");
    let variants = db.fetch_variants(product_id).await.expect("Error fetching variants");
    let new_mirror = NewImportedProduct {
        retailer_id: retailer.id,
        product_id,
        shopify_product_id: format!("gid://shopify/Product/{}", product_number + 1000),
        variants: variants
            .iter()
            .map(|v| {
                let n = variant_number(&v.shopify_variant_id) + 1000;
                NewImportedVariant {
                    variant_id: v.id,
                    shopify_variant_id: format!("gid://shopify/ProductVariant/{n}"),
                    shopify_inventory_item_id: Some(format!("gid://shopify/InventoryItem/{n}")),
                }
            })
            .collect(),
    };
    let mirror_id = db.insert_imported_product(new_mirror).await.expect("Error inserting mirror").id();
    let mirror = db
        .fetch_imported_products_for_product(product_id)
        .await
        .expect("Error fetching mirrors")
        .into_iter()
        .find(|m| m.id == mirror_id)
        .expect("Mirror is missing");
    let mirror_variants = db.fetch_imported_variants(mirror_id).await.expect("Error fetching mirror variants");
    SeededCatalog { product, variants, mirror, mirror_variants }
}

fn variant_number(gid: &str) -> u64 {
    gid.rsplit('/').next().and_then(|n| n.parse().ok()).unwrap_or_default()
}

/// A retailer fulfillment order assigned to [`SYNQSELL_LOCATION`]. `lines` is `(line number, variant id, quantity)`.
pub fn fulfillment_order(number: u64, order_number: u64, lines: &[(u64, &str, i64)]) -> FulfillmentOrderDetails {
    FulfillmentOrderDetails {
        id: format!("gid://shopify/FulfillmentOrder/{number}"),
        order_id: format!("gid://shopify/Order/{order_number}"),
        status: "OPEN".into(),
        assigned_location_id: Some(SYNQSELL_LOCATION.into()),
        destination: Some(MailingAddress {
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            city: Some("London".into()),
            country_code: Some("GB".into()),
            ..Default::default()
        }),
        line_items: lines
            .iter()
            .map(|(n, variant, qty)| FulfillmentOrderLineItem {
                id: format!("gid://shopify/FulfillmentOrderLineItem/{n}"),
                line_item_id: format!("gid://shopify/LineItem/{n}"),
                variant_id: Some(variant.to_string()),
                total_quantity: *qty,
                remaining_quantity: *qty,
            })
            .collect(),
        fulfillment_ids: Vec::new(),
    }
}

pub fn envelope(event_id: &str, topic: Topic, shop: &str, payload: Value) -> Value {
    json!({ "event_id": event_id, "topic": topic.as_str(), "shop": shop, "payload": payload })
}

pub fn routing_complete(fulfillment_order_id: &str) -> Value {
    json!({ "fulfillment_order": { "id": fulfillment_order_id, "status": "OPEN" } })
}

/// A supplier fulfillment webhook payload covering every line of `order`.
pub fn fulfillment_snapshot(id: u64, order: &StoreOrder, status: &str, shipment_status: Option<&str>) -> Value {
    let lines = order.line_items.iter().map(|l| json!({ "id": l.id, "quantity": l.quantity })).collect::<Vec<_>>();
    json!({
        "id": id,
        "order_id": order.id,
        "status": status,
        "shipment_status": shipment_status,
        "tracking_company": "UPS",
        "tracking_number": "1Z999AA10123456784",
        "tracking_url": null,
        "line_items": lines
    })
}

/// A `products/update` payload. `variants` is `(variant id, price, inventory quantity)`.
pub fn product_snapshot(product_id: &str, status: &str, variants: &[(&str, &str, i64)]) -> Value {
    let variants = variants
        .iter()
        .map(|(id, price, qty)| json!({ "id": id, "price": price, "inventory_quantity": qty }))
        .collect::<Vec<_>>();
    json!({ "id": product_id, "title": "Enamel mug", "status": status, "variants": variants })
}

pub struct Scenario {
    pub supplier: Session,
    pub retailer: Session,
    pub catalog: SeededCatalog,
    pub fulfillment_order_id: String,
}

/// One supplier product with two variants ($10.00 and $25.00, 20% retailer margin), mirrored by the retailer, and a
/// retailer fulfillment order (#501 on order #9001) for 3 + 1 of them plus 2 units of a non-SynqSell item.
pub async fn standard_scenario<B: SynqsellDatabase>(db: &B, store: &FakeStore) -> Scenario {
    let (supplier, retailer) = seed_stores(db).await;
    let catalog =
        seed_catalog(db, &supplier, &retailer, 1, 2000, DEFAULT_PLATFORM_FEE_BPS, &[(11, 1000, 50), (12, 2500, 5)]).await;
    let fo = fulfillment_order(501, 9001, &[
        (7001, "gid://shopify/ProductVariant/1011", 3),
        (7002, "gid://shopify/ProductVariant/1012", 1),
        (7003, "gid://shopify/ProductVariant/555", 2),
    ]);
    let fulfillment_order_id = fo.id.clone();
    store.add_fulfillment_order(fo);
    Scenario { supplier, retailer, catalog, fulfillment_order_id }
}
