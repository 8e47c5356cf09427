use serde::{Deserialize, Serialize};

use mentora_shared::clients::FunctionsClient;
use mentora_shared::errors::AppResult;
use mentora_shared::types::Session;

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Create a hosted checkout session for the signed-in user via the
/// payment function. Anonymous sessions are rejected before any request.
pub async fn create_checkout_session(
    functions: &FunctionsClient,
    session: &Session,
    request: &CheckoutRequest,
) -> AppResult<CheckoutSession> {
    let user_id = session.require_user()?;
    tracing::debug!(user_id = %user_id, price_id = %request.price_id, "creating checkout session");
    functions
        .invoke(session, "create-checkout-session", request)
        .await
}
