use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Primary key of a registered (or guest) account.
    UserId
);
id_type!(OfferId);
id_type!(OfferDetailId);
id_type!(OrderId);
id_type!(ReviewId);

/// Which side of the marketplace an account acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileType {
    Business,
    Customer,
}

impl ProfileType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::Customer => "customer",
        }
    }
}

impl FromStr for ProfileType {
    type Err = UnknownChoice;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "business" => Ok(Self::Business),
            "customer" => Ok(Self::Customer),
            other => Err(UnknownChoice(other.to_string())),
        }
    }
}

/// Pricing tier of an offer detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferType {
    Basic,
    Standard,
    Premium,
}

impl OfferType {
    pub const fn ordered() -> [Self; 3] {
        [Self::Basic, Self::Standard, Self::Premium]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Premium => "premium",
        }
    }
}

impl FromStr for OfferType {
    type Err = UnknownChoice;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "basic" => Ok(Self::Basic),
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            other => Err(UnknownChoice(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownChoice;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownChoice(other.to_string())),
        }
    }
}

/// Raised when a string does not name one of the allowed choices.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid choice")]
pub struct UnknownChoice(pub String);

/// Login identity. Credentials never leave the store in API views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub password_salt: String,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

/// Marketplace-facing details attached one-to-one to every user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user: UserId,
    pub file: Option<String>,
    pub location: String,
    pub tel: String,
    pub description: String,
    pub working_hours: String,
    #[serde(rename = "type")]
    pub kind: ProfileType,
    pub created_at: DateTime<Utc>,
    pub is_guest: bool,
}

impl Profile {
    pub fn new(user: UserId, kind: ProfileType, created_at: DateTime<Utc>) -> Self {
        Self {
            user,
            file: None,
            location: String::new(),
            tel: String::new(),
            description: String::new(),
            working_hours: String::new(),
            kind,
            created_at,
            is_guest: false,
        }
    }

    pub fn is_business(&self) -> bool {
        self.kind == ProfileType::Business
    }

    pub fn is_customer(&self) -> bool {
        self.kind == ProfileType::Customer
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub key: String,
    pub user: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub creator: UserId,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One pricing tier of an offer. `revisions == -1` means unlimited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferDetail {
    pub id: OfferDetailId,
    pub offer: OfferId,
    pub offer_type: OfferType,
    pub title: String,
    pub revisions: i32,
    pub delivery_time_in_days: u32,
    pub price: f64,
    pub features: Vec<Feature>,
}

impl OfferDetail {
    pub fn feature_descriptions(&self) -> Vec<String> {
        self.features
            .iter()
            .map(|feature| feature.description.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feature {
    pub description: String,
}

impl Feature {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// Detail values before the store assigns identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferDetailDraft {
    pub offer_type: OfferType,
    pub title: String,
    pub revisions: i32,
    pub delivery_time_in_days: u32,
    pub price: f64,
    pub features: Vec<String>,
}

impl OfferDetailDraft {
    /// Placeholder tier used when an offer is created without it.
    pub fn placeholder(offer_type: OfferType) -> Self {
        Self {
            offer_type,
            title: String::new(),
            revisions: 1,
            delivery_time_in_days: 1,
            price: 0.0,
            features: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer: UserId,
    pub business_user: UserId,
    pub offer_detail: OfferDetailId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub reviewer: UserId,
    pub business_user: UserId,
    pub rating: u8,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Denormalized site statistics shown on the landing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseInfo {
    pub total_users: usize,
    pub total_offers: usize,
    pub total_completed_orders: usize,
    pub total_reviews: usize,
}

/// A resolved, authenticated caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub user: User,
    pub profile: Profile,
}

impl Actor {
    pub fn id(&self) -> UserId {
        self.user.id
    }
}
