//! Signature-gated automation trigger.
//!
//! Transport-agnostic handler for the endpoint an external scheduler calls.
//! The host HTTP layer passes the signature header value in and writes the
//! returned status and JSON body out.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::automation::run_automation;
use crate::error::{EngineError, ErrorPayload};
use crate::state::AppState;
use crate::types::ExecutionTrigger;

/// Header the scheduler signs its requests with.
pub const SIGNATURE_HEADER: &str = "upstash-signature";

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

/// Run the inactivity sweep if the request carries a signature.
///
/// 401 without a signature; 500 with a generic message on any failure.
pub fn handle_trigger(
    state: &AppState,
    signature: Option<&str>,
    now: DateTime<Utc>,
) -> TriggerResponse {
    let result = authorize(signature)
        .and_then(|_| run_automation(state, ExecutionTrigger::Scheduled, now));

    match result {
        Ok(sweep) => {
            log::info!("Trigger executed: {}", sweep.message);
            TriggerResponse {
                status: 200,
                body: json!({
                    "success": true,
                    "message": "Automation executed successfully",
                    "result": sweep,
                }),
            }
        }
        Err(EngineError::Unauthorized) => TriggerResponse {
            status: 401,
            body: json!({ "error": "Unauthorized" }),
        },
        Err(e) => {
            // The response stays generic; the classified payload goes to the log.
            let payload = serde_json::to_string(&ErrorPayload::from(&e))
                .unwrap_or_else(|_| e.to_string());
            log::error!("Error executing triggered automation: {}", payload);
            TriggerResponse {
                status: 500,
                body: json!({ "error": "Internal server error" }),
            }
        }
    }
}

/// Readiness probe body for GET requests on the trigger endpoint.
pub fn describe_trigger() -> TriggerResponse {
    TriggerResponse {
        status: 200,
        body: json!({
            "message": "Automation endpoint is ready",
            "instructions": "Use POST to trigger the automation",
        }),
    }
}

fn authorize(signature: Option<&str>) -> Result<(), EngineError> {
    match signature {
        Some(sig) if !sig.trim().is_empty() => Ok(()),
        _ => Err(EngineError::Unauthorized),
    }
}
