//! Request handler definitions
//!
//! Define each route and its handler here. Handlers only authenticate and frame the delivery; all reconciliation
//! happens in the engine's [`EventCoordinator`].
//!
//! Every webhook sender re-delivers on a non-2xx response. A delivery is therefore answered with a 5xx only when the
//! engine reports a transient failure. Rejected, ignored and permanently failed events are acknowledged with a 200 so
//! that they are not retried forever.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use serde::Serialize;
use serde_json::{json, Value};
use store_gateway::StoreApi;
use stripe_tools::{verify_webhook_signature, PaymentProcessor};
use synqsell_engine::{
    events::{EventEnvelope, Topic},
    EventCoordinator,
    SynqsellDatabase,
};

use crate::{
    config::StripeWebhookConfig,
    data_objects::RedeliveryHint,
    errors::ServerError,
    helpers::required_header,
};

pub const SHOPIFY_TOPIC_HEADER: &str = "X-Shopify-Topic";
pub const SHOPIFY_SHOP_HEADER: &str = "X-Shopify-Shop-Domain";
pub const SHOPIFY_WEBHOOK_ID_HEADER: &str = "X-Shopify-Webhook-Id";
pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("👍️\n")
}

fn respond<R: RedeliveryHint + Serialize>(report: &R) -> HttpResponse {
    if report.needs_redelivery() {
        HttpResponse::InternalServerError().json(report)
    } else {
        HttpResponse::Ok().json(report)
    }
}

fn parse_body(body: &[u8]) -> Result<Value, ServerError> {
    serde_json::from_slice(body).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))
}

//----------------------------------------------   Shopify  ----------------------------------------------------
route!(shopify_webhook => Post "/webhook" impl SynqsellDatabase, StoreApi, PaymentProcessor);
/// Every Shopify topic arrives here. The topic, shop and delivery id come from headers; the body is the payload.
/// Payment topics are only accepted from Stripe.
pub async fn shopify_webhook<B, S, P>(
    req: HttpRequest,
    body: web::Bytes,
    coordinator: web::Data<EventCoordinator<B, S, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let topic = required_header(&req, SHOPIFY_TOPIC_HEADER)?;
    let shop = required_header(&req, SHOPIFY_SHOP_HEADER)?;
    let event_id = required_header(&req, SHOPIFY_WEBHOOK_ID_HEADER)?;
    trace!("🛍️ Received {topic} webhook {event_id} from {shop}");
    if topic.parse::<Topic>().is_ok_and(|t| t.is_payment_topic()) {
        warn!("🛍️ Refusing payment topic {topic} delivered by {shop} on the Shopify route");
        return Err(ServerError::TopicNotAccepted(topic));
    }
    let payload = parse_body(&body)?;
    let envelope = EventEnvelope { event_id, topic, shop, payload };
    let report = coordinator.process_event(envelope).await;
    Ok(respond(&report))
}

//----------------------------------------------   Stripe  ----------------------------------------------------
route!(stripe_webhook => Post "/stripe/webhook" impl SynqsellDatabase, StoreApi, PaymentProcessor);
/// Stripe events carry their own id and type. They are not tied to a shop. Store topics are refused here.
pub async fn stripe_webhook<B, S, P>(
    req: HttpRequest,
    body: web::Bytes,
    webhook: web::Data<StripeWebhookConfig>,
    coordinator: web::Data<EventCoordinator<B, S, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let signature = required_header(&req, STRIPE_SIGNATURE_HEADER)?;
    let now = chrono::Utc::now().timestamp();
    verify_webhook_signature(&body, &signature, webhook.secret.reveal(), webhook.tolerance_secs, now).map_err(|e| {
        warn!("💳️ Stripe webhook rejected. {e}");
        ServerError::InvalidSignature(e.to_string())
    })?;
    let payload = parse_body(&body)?;
    let event_id = payload["id"].as_str().unwrap_or_default().to_string();
    let topic = payload["type"].as_str().unwrap_or_default().to_string();
    trace!("💳️ Received Stripe event {event_id} ({topic})");
    if topic.parse::<Topic>().is_ok_and(|t| !t.is_payment_topic()) {
        warn!("💳️ Refusing store topic {topic} on the Stripe route");
        return Err(ServerError::TopicNotAccepted(topic));
    }
    // An event without an id is rejected by the coordinator
    let message = json!({ "event_id": event_id, "topic": topic, "shop": "", "payload": payload });
    let report = coordinator.process_json(message).await;
    Ok(respond(&report))
}

//----------------------------------------------   Queue  ----------------------------------------------------
route!(event_batch => Post "/batch" impl SynqsellDatabase, StoreApi, PaymentProcessor);
/// A batch of envelopes from a message queue. A 500 tells the queue to re-deliver the batch; messages that did
/// succeed are answered from the ledger the second time around.
pub async fn event_batch<B, S, P>(
    body: web::Json<Vec<Value>>,
    coordinator: web::Data<EventCoordinator<B, S, P>>,
) -> HttpResponse
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let messages = body.into_inner();
    debug!("📬️ Received a batch of {} events", messages.len());
    let report = coordinator.process_batch(messages).await;
    respond(&report)
}
