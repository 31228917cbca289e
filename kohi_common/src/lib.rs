mod helpers;
mod vnd;

pub mod op;
mod secret;

pub use helpers::parse_boolean_flag;
pub use secret::Secret;
pub use vnd::{Vnd, VndConversionError, VND_CURRENCY_CODE, VND_CURRENCY_CODE_LOWER};
