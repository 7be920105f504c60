mod hmac;

pub use hmac::{HmacMiddlewareFactory, HmacMiddlewareService, QUEUE_HMAC_HEADER, SHOPIFY_HMAC_HEADER};
