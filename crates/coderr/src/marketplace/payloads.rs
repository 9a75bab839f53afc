//! Request bodies and query strings.
//!
//! Numeric fields that clients routinely send as strings are kept as raw
//! JSON values and coerced by the service, so a sloppy client gets sanitized
//! defaults or a 400 instead of an extractor rejection.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Absent stays `None`; an explicit `null` becomes an empty string.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(Option::<String>::deserialize(deserializer)?.unwrap_or_default()))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationPayload {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub repeated_password: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuestLoginPayload {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Partial profile update. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub file: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tel: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub working_hours: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// One tier as sent by the client; every value is coerced on the way in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailPayload {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub offer_type: Option<String>,
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub revisions: Option<Value>,
    #[serde(default)]
    pub delivery_time_in_days: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub features: Option<Value>,
}

/// Body of both offer creation and partial offer updates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub details: Option<Vec<DetailPayload>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPayload {
    #[serde(default)]
    pub offer_detail_id: Option<Value>,
}

/// Only `status` may be sent when updating an order; anything else lands in
/// `unexpected` and is rejected once the caller is known to be allowed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderStatusPatch {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub unexpected: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewPayload {
    #[serde(default)]
    pub business_user: Option<Value>,
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Only `rating` and `description` may be sent when editing a review.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewPatch {
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub unexpected: BTreeMap<String, Value>,
}

/// `GET /api/offers/` query string, kept raw so malformed numbers become 400s.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferQuery {
    #[serde(default)]
    pub creator_id: Option<String>,
    #[serde(default)]
    pub min_price: Option<String>,
    #[serde(default)]
    pub max_delivery_time: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub ordering: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub page_size: Option<String>,
}

impl OfferQuery {
    /// Relative link to `page` carrying every other filter along.
    pub fn link(&self, page: usize) -> String {
        let mut params: Vec<String> = [
            ("creator_id", &self.creator_id),
            ("max_delivery_time", &self.max_delivery_time),
            ("min_price", &self.min_price),
            ("ordering", &self.ordering),
            ("page_size", &self.page_size),
            ("search", &self.search),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|value| !value.is_empty())
                .map(|value| format!("{key}={}", urlencoding::encode(value)))
        })
        .collect();
        params.insert(0, format!("page={page}"));
        format!("/api/offers/?{}", params.join("&"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewQuery {
    #[serde(default)]
    pub business_user_id: Option<String>,
    #[serde(default)]
    pub reviewer_id: Option<String>,
    #[serde(default)]
    pub ordering: Option<String>,
}

/// Integer from a JSON number or a numeric string.
pub(crate) fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}
