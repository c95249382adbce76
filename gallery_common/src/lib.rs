mod cents;

pub mod helpers;
pub mod op;
mod secret;

pub use cents::{Cents, CentsConversionError, STORE_CURRENCY_CODE, STORE_CURRENCY_CODE_LOWER};
pub use secret::Secret;
