use thiserror::Error;

use crate::traits::StorefrontError;

#[derive(Debug, Error)]
pub enum OrderFlowError {
    #[error("Storage error: {0}")]
    StorefrontError(#[from] StorefrontError),
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("The update contains no fields to apply")]
    EmptyUpdate,
}
