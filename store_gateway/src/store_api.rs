use log::*;
use serde::Deserialize;
use serde_json::{json, Value};
use synq_common::Cents;

use crate::{
    data_objects::{IdOnly, Nodes, RawFulfillmentOrder, RawOrder, RawSuggestedTransaction},
    queries,
    FulfillmentOrderDetails,
    GatewayError,
    InventoryQuantity,
    NewRefund,
    NewStoreFulfillment,
    NewStoreOrder,
    ProductStatus,
    ShopifyGateway,
    StoreCredentials,
    StoreOrder,
    TrackingInfo,
    VariantPrice,
};

/// The typed store operations the reconciliation engine performs.
///
/// Every method targets the store identified by `store`. Ids are Shopify GIDs and are passed through unchanged.
/// Implementations must not retry; callers wrap calls in their own retry policy.
#[allow(async_fn_in_trait)]
pub trait StoreApi {
    /// Fetches a fulfillment order with its line items. Returns `None` if the store does not know the id.
    async fn fetch_fulfillment_order(
        &self,
        store: &StoreCredentials,
        fulfillment_order_id: &str,
    ) -> Result<Option<FulfillmentOrderDetails>, GatewayError>;

    /// Looks for an order carrying `tag`. Used to make order creation idempotent across re-deliveries.
    async fn find_order_by_tag(&self, store: &StoreCredentials, tag: &str) -> Result<Option<StoreOrder>, GatewayError>;

    async fn create_order(&self, store: &StoreCredentials, order: &NewStoreOrder) -> Result<StoreOrder, GatewayError>;

    /// Creates a fulfillment and returns its id.
    async fn create_fulfillment(
        &self,
        store: &StoreCredentials,
        fulfillment: &NewStoreFulfillment,
    ) -> Result<String, GatewayError>;

    async fn cancel_fulfillment(&self, store: &StoreCredentials, fulfillment_id: &str) -> Result<(), GatewayError>;

    async fn update_tracking(
        &self,
        store: &StoreCredentials,
        fulfillment_id: &str,
        tracking: &TrackingInfo,
    ) -> Result<(), GatewayError>;

    /// Issues a line-item scoped refund and returns the refund id.
    async fn create_refund(&self, store: &StoreCredentials, refund: &NewRefund) -> Result<String, GatewayError>;

    async fn update_variant_prices(
        &self,
        store: &StoreCredentials,
        product_id: &str,
        prices: &[VariantPrice],
    ) -> Result<(), GatewayError>;

    async fn set_inventory_quantities(
        &self,
        store: &StoreCredentials,
        location_id: &str,
        quantities: &[InventoryQuantity],
    ) -> Result<(), GatewayError>;

    async fn set_product_status(
        &self,
        store: &StoreCredentials,
        product_id: &str,
        status: ProductStatus,
    ) -> Result<(), GatewayError>;

    /// Deletes a product. Deleting a product that no longer exists succeeds.
    async fn delete_product(&self, store: &StoreCredentials, product_id: &str) -> Result<(), GatewayError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FulfillmentOrderResponse {
    fulfillment_order: Option<RawFulfillmentOrder>,
}

#[derive(Deserialize)]
struct OrdersResponse {
    orders: Nodes<RawOrder>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderCreateResponse {
    order_create: OrderCreatePayload,
}

#[derive(Deserialize)]
struct OrderCreatePayload {
    order: Option<RawOrder>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FulfillmentCreateResponse {
    fulfillment_create: FulfillmentPayload,
}

#[derive(Deserialize)]
struct FulfillmentPayload {
    fulfillment: Option<IdOnly>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestedRefundResponse {
    order: Option<SuggestedRefundOrder>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestedRefundOrder {
    suggested_refund: Option<SuggestedRefund>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestedRefund {
    suggested_transactions: Vec<RawSuggestedTransaction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefundCreateResponse {
    refund_create: RefundCreatePayload,
}

#[derive(Deserialize)]
struct RefundCreatePayload {
    refund: Option<IdOnly>,
}

fn is_missing_resource(err: &GatewayError) -> bool {
    match err {
        GatewayError::UserErrors { messages } => {
            messages.iter().any(|m| m.contains("does not exist") || m.contains("not found"))
        },
        _ => false,
    }
}

fn is_already_cancelled(err: &GatewayError) -> bool {
    match err {
        GatewayError::UserErrors { messages } => messages.iter().map(|m| m.to_lowercase()).any(|m| {
            m.contains("already") && m.contains("cancel")
        }),
        _ => false,
    }
}

impl StoreApi for ShopifyGateway {
    async fn fetch_fulfillment_order(
        &self,
        store: &StoreCredentials,
        fulfillment_order_id: &str,
    ) -> Result<Option<FulfillmentOrderDetails>, GatewayError> {
        let variables = json!({ "id": fulfillment_order_id });
        let result =
            self.query::<FulfillmentOrderResponse>(store, queries::FULFILLMENT_ORDER, Some(variables)).await?;
        Ok(result.fulfillment_order.map(FulfillmentOrderDetails::from))
    }

    async fn find_order_by_tag(&self, store: &StoreCredentials, tag: &str) -> Result<Option<StoreOrder>, GatewayError> {
        let variables = json!({ "query": format!("tag:'{tag}'") });
        let result = self.query::<OrdersResponse>(store, queries::ORDERS_BY_TAG, Some(variables)).await?;
        Ok(result.orders.nodes.into_iter().next().map(StoreOrder::from))
    }

    async fn create_order(&self, store: &StoreCredentials, order: &NewStoreOrder) -> Result<StoreOrder, GatewayError> {
        let line_items = order
            .line_items
            .iter()
            .map(|line| {
                json!({
                    "variantId": line.variant_id,
                    "quantity": line.quantity,
                    "priceSet": { "shopMoney": {
                        "amount": line.unit_price.to_decimal_string(),
                        "currencyCode": order.currency,
                    }},
                })
            })
            .collect::<Vec<Value>>();
        let mut input = json!({
            "currency": order.currency,
            "lineItems": line_items,
            "tags": order.tags,
            "financialStatus": "PENDING",
        });
        if let Some(note) = &order.note {
            input["note"] = json!(note);
        }
        if let Some(address) = &order.shipping_address {
            input["shippingAddress"] = address.to_input();
        }
        let variables = json!({
            "order": input,
            "options": { "inventoryBehaviour": "DECREMENT_OBEYING_POLICY", "sendReceipt": false },
        });
        let result = self.mutate::<OrderCreateResponse>(store, queries::ORDER_CREATE, Some(variables)).await?;
        let created = result.order_create.order.ok_or(GatewayError::EmptyResponse)?;
        debug!("🛍️ Created order {} on {}", created.id, store.shop);
        Ok(StoreOrder::from(created))
    }

    async fn create_fulfillment(
        &self,
        store: &StoreCredentials,
        fulfillment: &NewStoreFulfillment,
    ) -> Result<String, GatewayError> {
        let lines = fulfillment
            .line_items
            .iter()
            .map(|l| json!({ "id": l.fulfillment_order_line_item_id, "quantity": l.quantity }))
            .collect::<Vec<Value>>();
        let mut input = json!({
            "lineItemsByFulfillmentOrder": [{
                "fulfillmentOrderId": fulfillment.fulfillment_order_id,
                "fulfillmentOrderLineItems": lines,
            }],
            "notifyCustomer": fulfillment.notify_customer,
        });
        if !fulfillment.tracking.is_empty() {
            input["trackingInfo"] = fulfillment.tracking.to_input();
        }
        let variables = json!({ "fulfillment": input });
        let result =
            self.mutate::<FulfillmentCreateResponse>(store, queries::FULFILLMENT_CREATE, Some(variables)).await?;
        let created = result.fulfillment_create.fulfillment.ok_or(GatewayError::EmptyResponse)?;
        debug!("🛍️ Created fulfillment {} on {}", created.id, store.shop);
        Ok(created.id)
    }

    async fn cancel_fulfillment(&self, store: &StoreCredentials, fulfillment_id: &str) -> Result<(), GatewayError> {
        let variables = json!({ "id": fulfillment_id });
        match self.mutate::<Value>(store, queries::FULFILLMENT_CANCEL, Some(variables)).await {
            Ok(_) => {
                debug!("🛍️ Cancelled fulfillment {fulfillment_id} on {}", store.shop);
                Ok(())
            },
            Err(e) if is_already_cancelled(&e) => {
                debug!("🛍️ Fulfillment {fulfillment_id} on {} was already cancelled", store.shop);
                Ok(())
            },
            Err(e) => Err(e),
        }
    }

    async fn update_tracking(
        &self,
        store: &StoreCredentials,
        fulfillment_id: &str,
        tracking: &TrackingInfo,
    ) -> Result<(), GatewayError> {
        let variables = json!({ "fulfillmentId": fulfillment_id, "trackingInfoInput": tracking.to_input() });
        self.mutate::<Value>(store, queries::FULFILLMENT_TRACKING_UPDATE, Some(variables)).await?;
        Ok(())
    }

    async fn create_refund(&self, store: &StoreCredentials, refund: &NewRefund) -> Result<String, GatewayError> {
        let refund_lines = refund
            .line_items
            .iter()
            .map(|l| json!({ "lineItemId": l.line_item_id, "quantity": l.quantity, "restockType": "NO_RESTOCK" }))
            .collect::<Vec<Value>>();
        let variables = json!({ "id": refund.order_id, "refundLineItems": refund_lines });
        let suggestion =
            self.query::<SuggestedRefundResponse>(store, queries::SUGGESTED_REFUND, Some(variables)).await?;
        let transactions = suggestion
            .order
            .and_then(|o| o.suggested_refund)
            .map(|s| s.suggested_transactions)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|t| {
                let amount = t.amount_set.shop_money.amount.parse::<Cents>().ok()?;
                trace!("🛍️ Suggested refund transaction of {amount} {}", t.amount_set.shop_money.currency_code);
                Some(json!({
                    "orderId": refund.order_id,
                    "parentId": t.parent_transaction.map(|p| p.id),
                    "gateway": t.gateway,
                    "kind": "REFUND",
                    "amount": amount.to_decimal_string(),
                }))
            })
            .collect::<Vec<Value>>();
        let mut input = json!({
            "orderId": refund.order_id,
            "refundLineItems": refund_lines,
            "transactions": transactions,
            "notify": refund.notify,
        });
        if let Some(note) = &refund.note {
            input["note"] = json!(note);
        }
        let result =
            self.mutate::<RefundCreateResponse>(store, queries::REFUND_CREATE, Some(json!({ "input": input }))).await?;
        let created = result.refund_create.refund.ok_or(GatewayError::EmptyResponse)?;
        info!("🛍️ Refund {} created on order {} at {}", created.id, refund.order_id, store.shop);
        Ok(created.id)
    }

    async fn update_variant_prices(
        &self,
        store: &StoreCredentials,
        product_id: &str,
        prices: &[VariantPrice],
    ) -> Result<(), GatewayError> {
        if prices.is_empty() {
            return Ok(());
        }
        let variants = prices
            .iter()
            .map(|p| json!({ "id": p.variant_id, "price": p.price.to_decimal_string() }))
            .collect::<Vec<Value>>();
        let variables = json!({ "productId": product_id, "variants": variants });
        self.mutate::<Value>(store, queries::VARIANTS_BULK_UPDATE, Some(variables)).await?;
        Ok(())
    }

    async fn set_inventory_quantities(
        &self,
        store: &StoreCredentials,
        location_id: &str,
        quantities: &[InventoryQuantity],
    ) -> Result<(), GatewayError> {
        if quantities.is_empty() {
            return Ok(());
        }
        let quantities = quantities
            .iter()
            .map(|q| json!({ "inventoryItemId": q.inventory_item_id, "locationId": location_id, "quantity": q.quantity }))
            .collect::<Vec<Value>>();
        let variables = json!({ "input": {
            "name": "available",
            "reason": "correction",
            "ignoreCompareQuantity": true,
            "quantities": quantities,
        }});
        self.mutate::<Value>(store, queries::INVENTORY_SET_QUANTITIES, Some(variables)).await?;
        Ok(())
    }

    async fn set_product_status(
        &self,
        store: &StoreCredentials,
        product_id: &str,
        status: ProductStatus,
    ) -> Result<(), GatewayError> {
        let variables = json!({ "input": { "id": product_id, "status": status.to_string() } });
        self.mutate::<Value>(store, queries::PRODUCT_UPDATE_STATUS, Some(variables)).await?;
        Ok(())
    }

    async fn delete_product(&self, store: &StoreCredentials, product_id: &str) -> Result<(), GatewayError> {
        let variables = json!({ "input": { "id": product_id } });
        match self.mutate::<Value>(store, queries::PRODUCT_DELETE, Some(variables)).await {
            Ok(_) => Ok(()),
            Err(e) if is_missing_resource(&e) => {
                debug!("🛍️ Product {product_id} is already gone from {}", store.shop);
                Ok(())
            },
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_resources_are_recognised() {
        let gone = GatewayError::UserErrors { messages: vec!["id: Product does not exist".into()] };
        assert!(is_missing_resource(&gone));
        let other = GatewayError::UserErrors { messages: vec!["id: Access denied".into()] };
        assert!(!is_missing_resource(&other));
        assert!(!is_missing_resource(&GatewayError::EmptyResponse));
        let cancelled = GatewayError::UserErrors { messages: vec!["Fulfillment is already cancelled".into()] };
        assert!(is_already_cancelled(&cancelled));
        assert!(!is_already_cancelled(&gone));
    }
}
