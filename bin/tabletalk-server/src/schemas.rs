//! JSON request bodies.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for `POST /results`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ResultsRequest {
    /// SQL to run against the configured table, forwarded as-is. At most
    /// 64 Ki characters.
    #[validate(length(min = 1, max = 65536))]
    pub command: String,
}

/// Request body for `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ChatRequest {
    /// Natural-language request for data.
    #[validate(length(min = 1, max = 65536))]
    pub message: String,
}
