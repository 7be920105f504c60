//! GraphQL documents sent to the Shopify Admin API.

pub const FULFILLMENT_ORDER: &str = r#"
query fulfillmentOrder($id: ID!) {
  fulfillmentOrder(id: $id) {
    id
    status
    order { id }
    assignedLocation { location { id } }
    destination { firstName lastName company address1 address2 city province countryCode zip phone }
    lineItems(first: 100) {
      nodes { id totalQuantity remainingQuantity lineItem { id } variant { id } }
    }
    fulfillments(first: 50) { nodes { id } }
  }
}"#;

pub const ORDERS_BY_TAG: &str = r#"
query ordersByTag($query: String!) {
  orders(first: 1, query: $query) {
    nodes { id lineItems(first: 100) { nodes { id quantity variant { id } } } }
  }
}"#;

pub const ORDER_CREATE: &str = r#"
mutation orderCreate($order: OrderCreateOrderInput!, $options: OrderCreateOptionsInput) {
  orderCreate(order: $order, options: $options) {
    order { id lineItems(first: 100) { nodes { id quantity variant { id } } } }
    userErrors { field message }
  }
}"#;

pub const FULFILLMENT_CREATE: &str = r#"
mutation fulfillmentCreate($fulfillment: FulfillmentInput!) {
  fulfillmentCreate(fulfillment: $fulfillment) {
    fulfillment { id status }
    userErrors { field message }
  }
}"#;

pub const FULFILLMENT_CANCEL: &str = r#"
mutation fulfillmentCancel($id: ID!) {
  fulfillmentCancel(id: $id) {
    fulfillment { id status }
    userErrors { field message }
  }
}"#;

pub const FULFILLMENT_TRACKING_UPDATE: &str = r#"
mutation fulfillmentTrackingInfoUpdate($fulfillmentId: ID!, $trackingInfoInput: FulfillmentTrackingInput!) {
  fulfillmentTrackingInfoUpdate(fulfillmentId: $fulfillmentId, trackingInfoInput: $trackingInfoInput, notifyCustomer: false) {
    fulfillment { id }
    userErrors { field message }
  }
}"#;

pub const SUGGESTED_REFUND: &str = r#"
query suggestedRefund($id: ID!, $refundLineItems: [RefundLineItemInput!]) {
  order(id: $id) {
    suggestedRefund(refundLineItems: $refundLineItems, suggestFullRefund: false) {
      suggestedTransactions {
        parentTransaction { id }
        gateway
        amountSet { shopMoney { amount currencyCode } }
      }
    }
  }
}"#;

pub const REFUND_CREATE: &str = r#"
mutation refundCreate($input: RefundInput!) {
  refundCreate(input: $input) {
    refund { id }
    userErrors { field message }
  }
}"#;

pub const VARIANTS_BULK_UPDATE: &str = r#"
mutation productVariantsBulkUpdate($productId: ID!, $variants: [ProductVariantsBulkInput!]!) {
  productVariantsBulkUpdate(productId: $productId, variants: $variants) {
    productVariants { id price }
    userErrors { field message }
  }
}"#;

pub const INVENTORY_SET_QUANTITIES: &str = r#"
mutation inventorySetQuantities($input: InventorySetQuantitiesInput!) {
  inventorySetQuantities(input: $input) {
    inventoryAdjustmentGroup { reason }
    userErrors { field message }
  }
}"#;

pub const PRODUCT_UPDATE_STATUS: &str = r#"
mutation productUpdate($input: ProductInput!) {
  productUpdate(input: $input) {
    product { id status }
    userErrors { field message }
  }
}"#;

pub const PRODUCT_DELETE: &str = r#"
mutation productDelete($input: ProductDeleteInput!) {
  productDelete(input: $input) {
    deletedProductId
    userErrors { field message }
  }
}"#;

#[cfg(test)]
mod test {
    use graphql_parser::parse_query;

    use super::*;

    #[test]
    fn all_documents_parse() {
        for doc in [
            FULFILLMENT_ORDER,
            ORDERS_BY_TAG,
            ORDER_CREATE,
            FULFILLMENT_CREATE,
            FULFILLMENT_CANCEL,
            FULFILLMENT_TRACKING_UPDATE,
            SUGGESTED_REFUND,
            REFUND_CREATE,
            VARIANTS_BULK_UPDATE,
            INVENTORY_SET_QUANTITIES,
            PRODUCT_UPDATE_STATUS,
            PRODUCT_DELETE,
        ] {
            assert!(parse_query::<String>(doc).is_ok(), "Could not parse {doc}");
        }
    }
}
