use std::sync::Arc;

use graphql_parser::parse_query;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::{GatewayConfig, StoreCredentials},
    GatewayError,
};

/// A GraphQL client for the Shopify Admin API.
///
/// The gateway holds no per-store state. Credentials are supplied with every call, so a single instance serves the
/// retailer and all of its suppliers within one invocation.
#[derive(Clone)]
pub struct ShopifyGateway {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl ShopifyGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn url(&self, shop: &str) -> String {
        format!("https://{shop}/admin/api/{}/graphql.json", self.config.api_version)
    }

    /// Runs a read-only GraphQL query against `store` and deserializes the `data` member of the response.
    pub async fn query<T: DeserializeOwned>(
        &self,
        store: &StoreCredentials,
        query: &str,
        variables: Option<Value>,
    ) -> Result<T, GatewayError> {
        let data = self.graphql_request(store, query, variables).await?;
        serde_json::from_value(data).map_err(|e| GatewayError::JsonError(e.to_string()))
    }

    /// Runs a GraphQL mutation against `store`.
    ///
    /// Shopify reports validation failures as a `userErrors` array inside an otherwise successful response. Any
    /// non-empty `userErrors` array in the payload is converted into [`GatewayError::UserErrors`], so callers never
    /// see partially applied results.
    pub async fn mutate<T: DeserializeOwned>(
        &self,
        store: &StoreCredentials,
        mutation: &str,
        variables: Option<Value>,
    ) -> Result<T, GatewayError> {
        let data = self.graphql_request(store, mutation, variables).await?;
        let messages = collect_user_errors(&data);
        if !messages.is_empty() {
            warn!("🛍️ Mutation against {} returned user errors: {}", store.shop, messages.join("; "));
            return Err(GatewayError::UserErrors { messages });
        }
        serde_json::from_value(data).map_err(|e| GatewayError::JsonError(e.to_string()))
    }

    async fn graphql_request(
        &self,
        store: &StoreCredentials,
        query: &str,
        variables: Option<Value>,
    ) -> Result<Value, GatewayError> {
        let query = parse_query::<String>(query).map_err(|e| GatewayError::InvalidGraphQL(e.to_string()))?;
        let mut body = serde_json::json!({
            "query": query.to_string(),
        });
        if let Some(vars) = variables {
            body["variables"] = vars;
        }
        let url = self.url(&store.shop);
        trace!("🛍️ Sending GraphQL request to {url}: {body}");
        let token = HeaderValue::from_str(store.access_token.reveal().as_str())
            .map_err(|e| GatewayError::Initialization(format!("Invalid access token for {}. {e}", store.shop)))?;
        let response =
            self.client.post(url).header("X-Shopify-Access-Token", token).json(&body).send().await.map_err(|e| {
                GatewayError::Transport { shop: store.shop.clone(), message: e.to_string(), timed_out: e.is_timeout() }
            })?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|e| format!("Could not read response body. {e}"));
            debug!("🛍️ {} responded with status {status}: {message}", store.shop);
            return Err(GatewayError::RemoteApi { status: status.as_u16(), messages: vec![message] });
        }
        let result = response.json::<Value>().await.map_err(|e| GatewayError::Transport {
            shop: store.shop.clone(),
            message: e.to_string(),
            timed_out: e.is_timeout(),
        })?;
        if let Some(errors) = result["errors"].as_array() {
            let e = errors.iter().map(|e| e.to_string()).collect::<Vec<String>>().join(", ");
            return Err(GatewayError::GraphQLError(e));
        }
        let data = result["data"].clone();
        trace!("🛍️ GraphQL response: {data}");
        trace!("🛍️ GraphQL costs: {}", result["extensions"]["cost"]);
        if data.is_null() {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(data)
    }
}

/// Walks the top-level mutation payloads in `data` and collects every user error as `field: message`.
pub(crate) fn collect_user_errors(data: &Value) -> Vec<String> {
    let Some(payloads) = data.as_object() else {
        return Vec::new();
    };
    payloads
        .values()
        .filter_map(|payload| payload["userErrors"].as_array())
        .flatten()
        .map(|e| {
            let message = e["message"].as_str().unwrap_or("Unknown error");
            match &e["field"] {
                Value::Array(path) if !path.is_empty() => {
                    let field = path.iter().filter_map(|p| p.as_str()).collect::<Vec<_>>().join(".");
                    format!("{field}: {message}")
                },
                _ => message.to_string(),
            }
        })
        .collect()
}
