use std::sync::Arc;

use log::*;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{DestinationCharge, PaymentIntent, PaymentProcessor, PaymentProcessorError, StripeConfig};

/// A minimal client for the Stripe REST API. Requests are form encoded and authenticated with the secret key.
#[derive(Clone)]
pub struct StripeClient {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Result<Self, PaymentProcessorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentProcessorError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_base.trim_end_matches('/'))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        req.basic_auth(self.config.secret_key.reveal(), None::<&str>)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, PaymentProcessorError> {
        let response = self.authorize(req).send().await.map_err(|e| PaymentProcessorError::Transport {
            message: e.to_string(),
            timed_out: e.is_timeout(),
        })?;
        Self::parse_response(response).await
    }

    async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, PaymentProcessorError> {
        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| PaymentProcessorError::Transport { message: e.to_string(), timed_out: e.is_timeout() })?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        serde_json::from_value(body).map_err(|e| PaymentProcessorError::JsonError(e.to_string()))
    }
}

fn api_error(status: u16, body: &Value) -> PaymentProcessorError {
    let error = &body["error"];
    PaymentProcessorError::RemoteApi {
        status,
        error_type: error["type"].as_str().unwrap_or("unknown").to_string(),
        code: error["code"].as_str().map(String::from),
        message: error["message"].as_str().unwrap_or("No error message provided").to_string(),
    }
}

impl PaymentProcessor for StripeClient {
    async fn create_destination_charge(
        &self,
        charge: &DestinationCharge,
    ) -> Result<PaymentIntent, PaymentProcessorError> {
        debug!(
            "💳️ Creating destination charge of {} ({} fee) to {} with key {}",
            charge.amount, charge.application_fee, charge.destination_account_id, charge.idempotency_key
        );
        let req = self
            .client
            .post(self.url("/payment_intents"))
            .header("Idempotency-Key", charge.idempotency_key.as_str())
            .form(&charge.to_form());
        let intent = self.send::<PaymentIntent>(req).await?;
        info!("💳️ Payment intent {} is {}", intent.id, intent.status);
        Ok(intent)
    }
}
