use crate::{
    db::sqlite::DatabaseError,
    db_types::{NewPayment, Payment, PaymentRecordStatus},
    InsertResult,
};

/// Supplier payouts. There is at most one payment per fulfillment.
#[allow(async_fn_in_trait)]
pub trait PaymentManagement {
    async fn insert_payment(&self, payment: NewPayment) -> Result<InsertResult, DatabaseError>;

    async fn fetch_payment_for_fulfillment(&self, fulfillment_id: i64) -> Result<Option<Payment>, DatabaseError>;

    async fn fetch_payment_by_intent(&self, payment_intent_id: &str) -> Result<Option<Payment>, DatabaseError>;

    async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, DatabaseError>;

    async fn update_payment_record_status(&self, payment_id: i64, status: PaymentRecordStatus)
        -> Result<(), DatabaseError>;
}
