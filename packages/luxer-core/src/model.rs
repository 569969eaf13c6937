//! Data types exchanged with the Luxer One API and the per-location view built
//! from them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type LocationId = i64;

/// Opaque API token returned by the OTP exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// Client-generated identifier sent with the OTP verification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceIdentifier(String);

impl DeviceIdentifier {
    /// Fresh random identifier, upper-case UUID as the service expects.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A physical locker location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
}

/// A pending delivery. Only the location is typed; everything else, label
/// pictures included, is kept as-is for consumers so one odd field never
/// fails the whole pending list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Delivery {
    /// First entry of `deliveryPictures.labels` when it is a string.
    pub fn first_label(&self) -> Option<&str> {
        self.extra
            .get("deliveryPictures")?
            .get("labels")?
            .as_array()?
            .first()?
            .as_str()
    }
}

/// Flat profile returned by `/user/info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserInfo {
    /// Human-readable account label, "First Last" when available.
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !name.is_empty() {
            return name;
        }
        self.email.clone().unwrap_or_else(|| "Luxer One".to_string())
    }
}

/// Pending deliveries grouped by location.
///
/// Every known location is a key, even with nothing pending. Deliveries for
/// locations outside the known set are never present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LocationView {
    by_location: HashMap<LocationId, Vec<Delivery>>,
}

impl LocationView {
    /// Group `deliveries` under `locations`, keeping server order per location.
    pub fn group(locations: &[Location], deliveries: Vec<Delivery>) -> Self {
        let mut by_location: HashMap<LocationId, Vec<Delivery>> = locations
            .iter()
            .map(|loc| (loc.id, Vec::new()))
            .collect();

        let mut dropped = 0usize;
        for delivery in deliveries {
            match delivery
                .location_id
                .and_then(|id| by_location.get_mut(&id))
            {
                Some(bucket) => bucket.push(delivery),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            tracing::debug!("Dropped {} deliveries for unknown locations", dropped);
        }

        Self { by_location }
    }

    pub fn deliveries(&self, id: LocationId) -> Option<&[Delivery]> {
        self.by_location.get(&id).map(Vec::as_slice)
    }

    pub fn contains(&self, id: LocationId) -> bool {
        self.by_location.contains_key(&id)
    }

    pub fn pending_count(&self, id: LocationId) -> usize {
        self.by_location.get(&id).map_or(0, Vec::len)
    }

    /// Label picture of the first pending delivery at `id`, if any.
    pub fn first_label_picture(&self, id: LocationId) -> Option<&str> {
        self.by_location.get(&id)?.first()?.first_label()
    }

    pub fn total_pending(&self) -> usize {
        self.by_location.values().map(Vec::len).sum()
    }

    pub fn location_ids(&self) -> impl Iterator<Item = LocationId> + '_ {
        self.by_location.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_location.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_location.is_empty()
    }
}
