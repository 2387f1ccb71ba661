//! Domain registration data over RDAP.

use brandscan_core::sources::RegistrationRecord;
use serde::Deserialize;
use serde_json::Value;

use crate::endpoints::SourceEndpoints;
use crate::error::CollectError;
use crate::fetch::{FetchClient, FetchOptions};

#[derive(Debug, Deserialize)]
struct RdapDomain {
    #[serde(default)]
    events: Vec<RdapEvent>,
    #[serde(default)]
    entities: Vec<RdapEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RdapEvent {
    event_action: String,
    #[serde(default)]
    event_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RdapEntity {
    #[serde(default)]
    vcard_array: Option<Value>,
}

/// # Errors
///
/// Returns [`CollectError`] on transport failure, a non-2xx answer, or a body
/// that is not an RDAP domain object.
pub async fn fetch_registration(
    client: &FetchClient,
    endpoints: &SourceEndpoints,
    domain: &str,
) -> Result<RegistrationRecord, CollectError> {
    let url = format!("{}/{domain}", endpoints.rdap.trim_end_matches('/'));
    let body: RdapDomain = client
        .fetch(&url, &FetchOptions::default().attempts(2))
        .await?
        .require_success()?
        .json()?;
    Ok(record_from(&body))
}

fn record_from(body: &RdapDomain) -> RegistrationRecord {
    let event = |action: &str| {
        body.events
            .iter()
            .find(|e| e.event_action == action)
            .and_then(|e| e.event_date.clone())
    };

    RegistrationRecord {
        registration_date: event("registration"),
        expires: event("expiration"),
        registrar: body
            .entities
            .first()
            .and_then(|e| e.vcard_array.as_ref())
            .and_then(vcard_full_name),
    }
}

/// The `fn` property of a jCard: `["vcard", [["fn", {}, "text", "Name"], ...]]`.
fn vcard_full_name(vcard: &Value) -> Option<String> {
    vcard
        .get(1)?
        .as_array()?
        .iter()
        .find(|prop| prop.get(0).and_then(Value::as_str) == Some("fn"))
        .and_then(|prop| prop.get(3))
        .and_then(Value::as_str)
        .map(str::to_string)
}
