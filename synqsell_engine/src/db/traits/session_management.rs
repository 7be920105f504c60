use crate::{
    db::sqlite::DatabaseError,
    db_types::{NewSession, Role, Session, StripeConnectAccount, StripeCustomerAccount},
};

/// Installed stores, their roles and their Stripe integrations.
#[allow(async_fn_in_trait)]
pub trait SessionManagement {
    async fn fetch_session(&self, id: i64) -> Result<Option<Session>, DatabaseError>;

    async fn fetch_session_by_shop(&self, shop: &str) -> Result<Option<Session>, DatabaseError>;

    /// Creates the session for `shop`, or rotates its access token (and clears the uninstalled flag) if it exists.
    async fn upsert_session(&self, session: NewSession) -> Result<Session, DatabaseError>;

    /// Adds `role` to the session. Adding a role twice is a no-op.
    async fn assign_role(&self, session_id: i64, role: Role) -> Result<(), DatabaseError>;

    async fn fetch_roles(&self, session_id: i64) -> Result<Vec<Role>, DatabaseError>;

    async fn mark_uninstalled(&self, session_id: i64) -> Result<(), DatabaseError>;

    /// Deletes the session and, through cascading foreign keys, every row that depends on it.
    async fn delete_session(&self, session_id: i64) -> Result<bool, DatabaseError>;

    async fn save_connect_account(&self, session_id: i64, stripe_account_id: &str) -> Result<(), DatabaseError>;

    async fn save_customer_account(
        &self,
        session_id: i64,
        stripe_customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), DatabaseError>;

    async fn fetch_connect_account(&self, session_id: i64) -> Result<Option<StripeConnectAccount>, DatabaseError>;

    async fn fetch_customer_account(&self, session_id: i64) -> Result<Option<StripeCustomerAccount>, DatabaseError>;

    /// Removes the connected account and payer records of the session.
    async fn delete_stripe_integrations(&self, session_id: i64) -> Result<(), DatabaseError>;
}
