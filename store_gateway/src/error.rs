use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Remote call to {shop} failed before a response was received: {message}")]
    Transport { shop: String, message: String, timed_out: bool },
    #[error("Remote API error. Status {status}. {}", messages.join("; "))]
    RemoteApi { status: u16, messages: Vec<String> },
    #[error("The remote API rejected the mutation: {}", messages.join("; "))]
    UserErrors { messages: Vec<String> },
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Invalid GraphQL query: {0}")]
    InvalidGraphQL(String),
    #[error("GraphQL query failed: {0}")]
    GraphQLError(String),
    #[error("The remote API returned an empty response")]
    EmptyResponse,
}

impl GatewayError {
    /// Whether re-issuing the same call later could plausibly succeed. Rate limiting (429), server-side errors (5xx),
    /// timeouts and connection failures are transient. User errors and malformed requests are not.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Transport { .. } => true,
            GatewayError::RemoteApi { status, .. } => *status == 429 || *status >= 500,
            GatewayError::GraphQLError(msg) => msg.contains("THROTTLED"),
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Transport { timed_out: true, .. })
    }
}
