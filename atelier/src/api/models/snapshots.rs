use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result of a whole-aggregate replace.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReplaceResponse {
    pub success: bool,
}
