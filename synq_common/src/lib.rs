mod cents;
mod helpers;

pub mod op;
mod secret;

pub use cents::{Cents, CentsConversionError, DEFAULT_CURRENCY_CODE};
pub use helpers::{basis_points_of, parse_boolean_flag};
pub use secret::Secret;
