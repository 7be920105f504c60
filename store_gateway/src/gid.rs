//! Shopify global ids (GIDs).
//!
//! Webhook payloads carry a mix of numeric REST ids and GraphQL GIDs. Everything SynqSell persists uses the GID form,
//! so ids are normalised here, at the boundary, and are otherwise treated as opaque strings.
use std::sync::OnceLock;

use regex::Regex;

pub const ORDER: &str = "Order";
pub const LINE_ITEM: &str = "LineItem";
pub const FULFILLMENT: &str = "Fulfillment";
pub const FULFILLMENT_ORDER: &str = "FulfillmentOrder";
pub const PRODUCT: &str = "Product";
pub const PRODUCT_VARIANT: &str = "ProductVariant";
pub const INVENTORY_ITEM: &str = "InventoryItem";
pub const LOCATION: &str = "Location";

fn gid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^gid://shopify/(?P<kind>\w+)/(?P<id>\d+)(\?.*)?$").expect("GID regex is valid"))
}

/// Returns the GID for `id`. Ids that are already GIDs are returned unchanged.
pub fn to_gid<S: AsRef<str>>(kind: &str, id: S) -> String {
    let id = id.as_ref().trim();
    if id.starts_with("gid://") {
        id.to_string()
    } else {
        format!("gid://shopify/{kind}/{id}")
    }
}

/// Extracts the numeric part of a GID, e.g. `1234` from `gid://shopify/Order/1234`.
pub fn numeric_id(gid: &str) -> Option<u64> {
    gid_regex().captures(gid).and_then(|c| c.name("id")).and_then(|m| m.as_str().parse::<u64>().ok())
}

/// The resource type encoded in a GID, e.g. `Order`.
pub fn kind(gid: &str) -> Option<&str> {
    gid_regex().captures(gid).and_then(|c| c.name("kind")).map(|m| m.as_str())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalises_numeric_ids() {
        assert_eq!(to_gid(ORDER, "1234"), "gid://shopify/Order/1234");
        assert_eq!(to_gid(ORDER, "gid://shopify/Order/1234"), "gid://shopify/Order/1234");
        assert_eq!(to_gid(LINE_ITEM, 55.to_string()), "gid://shopify/LineItem/55");
    }

    #[test]
    fn parses_gids() {
        assert_eq!(numeric_id("gid://shopify/FulfillmentOrder/987"), Some(987));
        assert_eq!(numeric_id("gid://shopify/Order/12?a=b"), Some(12));
        assert_eq!(numeric_id("1234"), None);
        assert_eq!(kind("gid://shopify/ProductVariant/4"), Some("ProductVariant"));
    }
}
