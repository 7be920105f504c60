use crate::Cents;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// `bps` basis points of `amount`, rounded half away from zero to the nearest cent.
pub fn basis_points_of(amount: Cents, bps: i64) -> Cents {
    let product = i128::from(amount.value()) * i128::from(bps);
    let rounded = if product >= 0 { (product + 5_000) / 10_000 } else { (product - 5_000) / 10_000 };
    #[allow(clippy::cast_possible_truncation)]
    Cents::from(rounded as i64)
}
