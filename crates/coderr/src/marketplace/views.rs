//! Response shapes. Every field is populated; only `image` / `file` may be null.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    BaseInfo, Offer, OfferDetail, OfferDetailId, OfferId, OfferType, Order, OrderId,
    OrderStatus, Profile, ProfileType, Review, ReviewId, User, UserId,
};
use super::sanitize;
use super::store::MarketplaceData;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferDetailView {
    pub id: OfferDetailId,
    pub title: String,
    pub revisions: i32,
    pub delivery_time_in_days: u32,
    pub price: f64,
    pub features: Vec<String>,
    pub offer_type: OfferType,
}

impl From<&OfferDetail> for OfferDetailView {
    fn from(detail: &OfferDetail) -> Self {
        Self {
            id: detail.id,
            title: detail.title.clone(),
            revisions: sanitize::clamp_revisions(i64::from(detail.revisions)),
            delivery_time_in_days: detail.delivery_time_in_days.max(1),
            price: sanitize::clamp_price(detail.price),
            features: detail.feature_descriptions(),
            offer_type: detail.offer_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailLinkView {
    pub id: OfferDetailId,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserDetailsView {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
}

/// Offer as listed and retrieved: tiers are links, prices are summarized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferView {
    pub id: OfferId,
    pub user: UserId,
    pub title: String,
    pub image: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub details: Vec<DetailLinkView>,
    pub min_price: f64,
    pub min_delivery_time: u32,
    pub user_details: UserDetailsView,
}

impl OfferView {
    pub fn build(data: &MarketplaceData, offer: &Offer) -> Self {
        let user_details = data
            .user(offer.creator)
            .map(|creator| UserDetailsView {
                first_name: creator.first_name.clone(),
                last_name: creator.last_name.clone(),
                username: creator.username.clone(),
            })
            .unwrap_or_else(|| UserDetailsView {
                first_name: String::new(),
                last_name: String::new(),
                username: String::new(),
            });

        Self {
            id: offer.id,
            user: offer.creator,
            title: offer.title.clone(),
            image: offer.image.clone(),
            description: offer.description.clone(),
            created_at: offer.created_at,
            updated_at: offer.updated_at,
            details: data
                .details_of(offer.id)
                .into_iter()
                .map(|detail| DetailLinkView {
                    id: detail.id,
                    url: format!("/offerdetails/{}/", detail.id),
                })
                .collect(),
            min_price: sanitize::clamp_price(data.min_price(offer.id)),
            min_delivery_time: data.min_delivery_time(offer.id).max(1),
            user_details,
        }
    }
}

/// Offer returned after a write, with every tier expanded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferWithDetailsView {
    pub id: OfferId,
    pub title: String,
    pub image: Option<String>,
    pub description: String,
    pub details: Vec<OfferDetailView>,
}

impl OfferWithDetailsView {
    pub fn build(data: &MarketplaceData, offer: &Offer) -> Self {
        Self {
            id: offer.id,
            title: offer.title.clone(),
            image: offer.image.clone(),
            description: offer.description.clone(),
            details: data
                .details_of(offer.id)
                .into_iter()
                .map(OfferDetailView::from)
                .collect(),
        }
    }
}

/// Order with its tier values read through the ordered detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub customer_user: UserId,
    pub business_user: UserId,
    pub title: String,
    pub revisions: i32,
    pub delivery_time_in_days: u32,
    pub price: f64,
    pub features: Vec<String>,
    pub offer_type: OfferType,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    pub fn build(data: &MarketplaceData, order: &Order) -> Self {
        let detail = data.detail(order.offer_detail).map(OfferDetailView::from);
        let (title, revisions, delivery_time_in_days, price, features, offer_type) = match detail
        {
            Some(detail) => (
                detail.title,
                detail.revisions,
                detail.delivery_time_in_days,
                detail.price,
                detail.features,
                detail.offer_type,
            ),
            None => (String::new(), 1, 1, 0.0, Vec::new(), OfferType::Basic),
        };

        Self {
            id: order.id,
            customer_user: order.customer,
            business_user: order.business_user,
            title,
            revisions,
            delivery_time_in_days,
            price,
            features,
            offer_type,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewView {
    pub id: ReviewId,
    pub business_user: UserId,
    pub reviewer: UserId,
    pub rating: u8,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            id: review.id,
            business_user: review.business_user,
            reviewer: review.reviewer,
            rating: review.rating,
            description: review.description.clone(),
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileView {
    pub user: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub file: Option<String>,
    pub location: String,
    pub tel: String,
    pub description: String,
    pub working_hours: String,
    #[serde(rename = "type")]
    pub kind: ProfileType,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl ProfileView {
    pub fn new(user: &User, profile: &Profile) -> Self {
        Self {
            user: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            file: profile.file.clone(),
            location: profile.location.clone(),
            tel: profile.tel.clone(),
            description: profile.description.clone(),
            working_hours: profile.working_hours.clone(),
            kind: profile.kind,
            email: user.email.clone(),
            created_at: profile.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusinessProfileView {
    pub user: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub file: Option<String>,
    pub location: String,
    pub tel: String,
    pub description: String,
    pub working_hours: String,
    #[serde(rename = "type")]
    pub kind: ProfileType,
}

impl BusinessProfileView {
    pub fn new(user: &User, profile: &Profile) -> Self {
        Self {
            user: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            file: profile.file.clone(),
            location: profile.location.clone(),
            tel: profile.tel.clone(),
            description: profile.description.clone(),
            working_hours: profile.working_hours.clone(),
            kind: profile.kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerProfileView {
    pub user: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub file: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ProfileType,
}

impl CustomerProfileView {
    pub fn new(user: &User, profile: &Profile) -> Self {
        Self {
            user: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            file: profile.file.clone(),
            uploaded_at: profile.created_at,
            kind: profile.kind,
        }
    }
}

/// Returned by registration and login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthView {
    pub token: String,
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    #[serde(rename = "type")]
    pub kind: ProfileType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestLoginView {
    pub status: &'static str,
    pub token: String,
    pub user_id: UserId,
    pub username: String,
    pub is_guest: bool,
    #[serde(rename = "type")]
    pub kind: ProfileType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseInfoView {
    pub review_count: usize,
    pub average_rating: f64,
    pub business_profile_count: usize,
    pub offer_count: usize,
}

impl BaseInfoView {
    pub fn build(data: &MarketplaceData, info: BaseInfo) -> Self {
        let (sum, count) = data
            .reviews()
            .fold((0u64, 0u64), |(sum, count), review| {
                (sum + u64::from(review.rating), count + 1)
            });
        let average_rating = if count == 0 {
            0.0
        } else {
            sanitize::round_one_decimal(sum as f64 / count as f64)
        };

        Self {
            review_count: info.total_reviews,
            average_rating,
            business_profile_count: data.profiles(Some(ProfileType::Business)).len(),
            offer_count: info.total_offers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderCountView {
    pub order_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletedOrderCountView {
    pub completed_order_count: usize,
}
