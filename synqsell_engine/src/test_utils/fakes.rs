//! In-memory stand-ins for the store and payment clients. Both record every mutation so that tests can assert on
//! exactly which remote effects an event produced.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use store_gateway::{
    FulfillmentOrderDetails,
    GatewayError,
    InventoryQuantity,
    NewRefund,
    NewStoreFulfillment,
    NewStoreOrder,
    ProductStatus,
    StoreApi,
    StoreCredentials,
    StoreOrder,
    StoreOrderLine,
    TrackingInfo,
    VariantPrice,
};
use stripe_tools::{DestinationCharge, PaymentIntent, PaymentIntentStatus, PaymentProcessor, PaymentProcessorError};

//--------------------------------------       FakeStore       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub shop: String,
    pub request: NewStoreOrder,
    pub order: StoreOrder,
}

#[derive(Debug, Clone)]
pub struct CreatedFulfillment {
    pub shop: String,
    pub id: String,
    pub request: NewStoreFulfillment,
}

#[derive(Debug, Default)]
pub struct FakeStoreState {
    pub fulfillment_orders: HashMap<String, FulfillmentOrderDetails>,
    pub orders: Vec<CreatedOrder>,
    pub fulfillments: Vec<CreatedFulfillment>,
    pub cancelled_fulfillments: Vec<(String, String)>,
    pub tracking_updates: Vec<(String, String, TrackingInfo)>,
    pub refunds: Vec<(String, NewRefund)>,
    pub prices: Vec<(String, String, Vec<VariantPrice>)>,
    pub inventory: Vec<(String, String, Vec<InventoryQuantity>)>,
    pub statuses: Vec<(String, String, ProductStatus)>,
    pub deleted_products: Vec<(String, String)>,
    /// Operation name to (error, remaining number of failures)
    failures: HashMap<&'static str, (GatewayError, u32)>,
    next_id: u64,
}

impl FakeStoreState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&mut self, op: &'static str) -> Result<(), GatewayError> {
        match self.failures.get_mut(op) {
            Some((err, remaining)) if *remaining > 0 => {
                *remaining -= 1;
                Err(err.clone())
            },
            _ => Ok(()),
        }
    }

    pub fn refunds_for(&self, shop: &str) -> Vec<NewRefund> {
        self.refunds.iter().filter(|(s, _)| s == shop).map(|(_, r)| r.clone()).collect()
    }

    pub fn orders_for(&self, shop: &str) -> Vec<CreatedOrder> {
        self.orders.iter().filter(|o| o.shop == shop).cloned().collect()
    }

    pub fn fulfillments_for(&self, shop: &str) -> Vec<CreatedFulfillment> {
        self.fulfillments.iter().filter(|f| f.shop == shop).cloned().collect()
    }

    pub fn prices_for(&self, shop: &str) -> Vec<(String, Vec<VariantPrice>)> {
        self.prices.iter().filter(|(s, _, _)| s == shop).map(|(_, p, v)| (p.clone(), v.clone())).collect()
    }
}

/// A store API backed by memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<FakeStoreState>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeStoreState> {
        self.state.lock().expect("FakeStore mutex poisoned")
    }

    pub fn add_fulfillment_order(&self, fo: FulfillmentOrderDetails) {
        self.state().fulfillment_orders.insert(fo.id.clone(), fo);
    }

    /// Makes the next `times` calls of `op` fail with `err`. `op` is the [`StoreApi`] method name.
    pub fn fail(&self, op: &'static str, err: GatewayError, times: u32) {
        self.state().failures.insert(op, (err, times));
    }

    /// Creates an order without going through the engine, as if a previous attempt crashed after creating it.
    pub fn insert_order(&self, shop: &str, request: NewStoreOrder) -> StoreOrder {
        let mut state = self.state();
        let order = build_order(&mut state, &request);
        state.orders.push(CreatedOrder { shop: shop.to_string(), request, order: order.clone() });
        order
    }
}

fn build_order(state: &mut FakeStoreState, request: &NewStoreOrder) -> StoreOrder {
    let id = format!("gid://shopify/Order/{}", state.next_id());
    let line_items = request
        .line_items
        .iter()
        .map(|l| StoreOrderLine {
            id: format!("gid://shopify/LineItem/{}", state.next_id()),
            variant_id: Some(l.variant_id.clone()),
            quantity: l.quantity,
        })
        .collect();
    StoreOrder { id, line_items }
}

impl StoreApi for FakeStore {
    async fn fetch_fulfillment_order(
        &self,
        _store: &StoreCredentials,
        fulfillment_order_id: &str,
    ) -> Result<Option<FulfillmentOrderDetails>, GatewayError> {
        let mut state = self.state();
        state.check("fetch_fulfillment_order")?;
        Ok(state.fulfillment_orders.get(fulfillment_order_id).cloned())
    }

    async fn find_order_by_tag(&self, store: &StoreCredentials, tag: &str) -> Result<Option<StoreOrder>, GatewayError> {
        let mut state = self.state();
        state.check("find_order_by_tag")?;
        let order = state
            .orders
            .iter()
            .find(|o| o.shop == store.shop && o.request.tags.iter().any(|t| t == tag))
            .map(|o| o.order.clone());
        Ok(order)
    }

    async fn create_order(&self, store: &StoreCredentials, order: &NewStoreOrder) -> Result<StoreOrder, GatewayError> {
        let mut state = self.state();
        state.check("create_order")?;
        let created = build_order(&mut state, order);
        state.orders.push(CreatedOrder { shop: store.shop.clone(), request: order.clone(), order: created.clone() });
        Ok(created)
    }

    async fn create_fulfillment(
        &self,
        store: &StoreCredentials,
        fulfillment: &NewStoreFulfillment,
    ) -> Result<String, GatewayError> {
        let mut state = self.state();
        state.check("create_fulfillment")?;
        let id = format!("gid://shopify/Fulfillment/{}", state.next_id());
        if let Some(fo) = state.fulfillment_orders.get_mut(&fulfillment.fulfillment_order_id) {
            for line in &fulfillment.line_items {
                let fo_line = fo
                    .line_items
                    .iter_mut()
                    .find(|l| l.id == line.fulfillment_order_line_item_id)
                    .filter(|l| l.remaining_quantity >= line.quantity)
                    .ok_or_else(|| GatewayError::UserErrors {
                        messages: vec!["Invalid fulfillment order line item quantity requested.".into()],
                    })?;
                fo_line.remaining_quantity -= line.quantity;
            }
            fo.fulfillment_ids.push(id.clone());
        }
        state.fulfillments.push(CreatedFulfillment { shop: store.shop.clone(), id: id.clone(), request: fulfillment.clone() });
        Ok(id)
    }

    async fn cancel_fulfillment(&self, store: &StoreCredentials, fulfillment_id: &str) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.check("cancel_fulfillment")?;
        let request = state.fulfillments.iter().find(|f| f.id == fulfillment_id).map(|f| f.request.clone());
        if let Some(request) = request {
            if let Some(fo) = state.fulfillment_orders.get_mut(&request.fulfillment_order_id) {
                for line in &request.line_items {
                    if let Some(l) = fo.line_items.iter_mut().find(|l| l.id == line.fulfillment_order_line_item_id) {
                        l.remaining_quantity += line.quantity;
                    }
                }
            }
        }
        state.cancelled_fulfillments.push((store.shop.clone(), fulfillment_id.to_string()));
        Ok(())
    }

    async fn update_tracking(
        &self,
        store: &StoreCredentials,
        fulfillment_id: &str,
        tracking: &TrackingInfo,
    ) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.check("update_tracking")?;
        state.tracking_updates.push((store.shop.clone(), fulfillment_id.to_string(), tracking.clone()));
        Ok(())
    }

    async fn create_refund(&self, store: &StoreCredentials, refund: &NewRefund) -> Result<String, GatewayError> {
        let mut state = self.state();
        state.check("create_refund")?;
        let id = format!("gid://shopify/Refund/{}", state.next_id());
        state.refunds.push((store.shop.clone(), refund.clone()));
        Ok(id)
    }

    async fn update_variant_prices(
        &self,
        store: &StoreCredentials,
        product_id: &str,
        prices: &[VariantPrice],
    ) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.check("update_variant_prices")?;
        state.prices.push((store.shop.clone(), product_id.to_string(), prices.to_vec()));
        Ok(())
    }

    async fn set_inventory_quantities(
        &self,
        store: &StoreCredentials,
        location_id: &str,
        quantities: &[InventoryQuantity],
    ) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.check("set_inventory_quantities")?;
        state.inventory.push((store.shop.clone(), location_id.to_string(), quantities.to_vec()));
        Ok(())
    }

    async fn set_product_status(
        &self,
        store: &StoreCredentials,
        product_id: &str,
        status: ProductStatus,
    ) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.check("set_product_status")?;
        state.statuses.push((store.shop.clone(), product_id.to_string(), status));
        Ok(())
    }

    async fn delete_product(&self, store: &StoreCredentials, product_id: &str) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.check("delete_product")?;
        state.deleted_products.push((store.shop.clone(), product_id.to_string()));
        Ok(())
    }
}

//--------------------------------------      FakePayments      --------------------------------------------------------
#[derive(Debug)]
pub struct FakePaymentsState {
    /// One entry per distinct idempotency key
    pub charges: Vec<DestinationCharge>,
    /// Every call, including replays of an idempotency key
    pub requests: usize,
    pub intents: HashMap<String, PaymentIntent>,
    /// The status new intents are created with
    pub next_status: PaymentIntentStatus,
    by_key: HashMap<String, String>,
    failures: u32,
    failure: Option<PaymentProcessorError>,
}

impl Default for FakePaymentsState {
    fn default() -> Self {
        Self {
            charges: Vec::new(),
            requests: 0,
            intents: HashMap::new(),
            next_status: PaymentIntentStatus::Succeeded,
            by_key: HashMap::new(),
            failures: 0,
            failure: None,
        }
    }
}

/// A payment processor backed by memory that honours idempotency keys. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakePayments {
    state: Arc<Mutex<FakePaymentsState>>,
}

impl FakePayments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakePaymentsState> {
        self.state.lock().expect("FakePayments mutex poisoned")
    }

    pub fn set_next_status(&self, status: PaymentIntentStatus) {
        self.state().next_status = status;
    }

    pub fn fail(&self, err: PaymentProcessorError, times: u32) {
        let mut state = self.state();
        state.failure = Some(err);
        state.failures = times;
    }
}

impl PaymentProcessor for FakePayments {
    async fn create_destination_charge(
        &self,
        charge: &DestinationCharge,
    ) -> Result<PaymentIntent, PaymentProcessorError> {
        let mut state = self.state();
        state.requests += 1;
        if state.failures > 0 {
            state.failures -= 1;
            if let Some(err) = state.failure.clone() {
                return Err(err);
            }
        }
        if let Some(id) = state.by_key.get(&charge.idempotency_key) {
            if let Some(intent) = state.intents.get(id) {
                return Ok(intent.clone());
            }
        }
        let id = format!("pi_{}", state.charges.len() + 1);
        let intent = PaymentIntent {
            id: id.clone(),
            status: state.next_status,
            amount: charge.amount.value(),
            currency: charge.currency.to_lowercase(),
            last_payment_error: None,
        };
        state.by_key.insert(charge.idempotency_key.clone(), id.clone());
        state.intents.insert(id, intent.clone());
        state.charges.push(charge.clone());
        Ok(intent)
    }
}
