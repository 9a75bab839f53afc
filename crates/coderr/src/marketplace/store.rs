use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Actor, AuthToken, BaseInfo, Feature, Offer, OfferDetail, OfferDetailDraft, OfferDetailId,
    OfferId, Order, OrderId, OrderStatus, Profile, ProfileType, Review, ReviewId, User, UserId,
};
use super::repository::RepositoryError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Sequences {
    user: u64,
    offer: u64,
    offer_detail: u64,
    order: u64,
    review: u64,
}

/// Fields needed to create an account; the profile is derived from them.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub password_salt: String,
    pub kind: ProfileType,
    pub is_guest: bool,
    pub is_staff: bool,
}

/// Rows removed by a cascading delete, per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletionCounts {
    pub users: usize,
    pub profiles: usize,
    pub tokens: usize,
    pub offers: usize,
    pub offer_details: usize,
    pub orders: usize,
    pub reviews: usize,
}

impl DeletionCounts {
    pub fn absorb(&mut self, other: DeletionCounts) {
        self.users += other.users;
        self.profiles += other.profiles;
        self.tokens += other.tokens;
        self.offers += other.offers;
        self.offer_details += other.offer_details;
        self.orders += other.orders;
        self.reviews += other.reviews;
    }

    pub fn total(&self) -> usize {
        self.users
            + self.profiles
            + self.tokens
            + self.offers
            + self.offer_details
            + self.orders
            + self.reviews
    }

    /// `(table, count)` pairs for rows that were actually removed.
    pub fn non_zero(&self) -> Vec<(&'static str, usize)> {
        [
            ("users", self.users),
            ("profiles", self.profiles),
            ("tokens", self.tokens),
            ("offers", self.offers),
            ("offer_details", self.offer_details),
            ("orders", self.orders),
            ("reviews", self.reviews),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect()
    }
}

/// All marketplace tables plus the statistics singleton.
///
/// Mutations keep the relational invariants (one profile per user, unique
/// review per reviewer/business pair, cascading deletes); request-level
/// validation lives in the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketplaceData {
    sequences: Sequences,
    users: BTreeMap<UserId, User>,
    profiles: BTreeMap<UserId, Profile>,
    tokens: BTreeMap<String, AuthToken>,
    offers: BTreeMap<OfferId, Offer>,
    details: BTreeMap<OfferDetailId, OfferDetail>,
    orders: BTreeMap<OrderId, Order>,
    reviews: BTreeMap<ReviewId, Review>,
    #[serde(default)]
    base_info: BaseInfo,
}

impl MarketplaceData {
    // users & profiles

    pub fn create_user(&mut self, new_user: NewUser, now: DateTime<Utc>) -> (User, Profile) {
        self.sequences.user += 1;
        let id = UserId(self.sequences.user);
        let user = User {
            id,
            username: new_user.username,
            email: new_user.email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            password_hash: new_user.password_hash,
            password_salt: new_user.password_salt,
            is_staff: new_user.is_staff,
            date_joined: now,
        };
        let mut profile = Profile::new(id, new_user.kind, now);
        profile.is_guest = new_user.is_guest;

        self.users.insert(id, user.clone());
        self.profiles.insert(id, profile.clone());
        (user, profile)
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn user_mut(&mut self, id: UserId) -> Option<&mut User> {
        self.users.get_mut(&id)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users.values().find(|user| user.username == username)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        let email = email.trim();
        self.users
            .values()
            .find(|user| !user.email.is_empty() && user.email.eq_ignore_ascii_case(email))
    }

    pub fn profile(&self, user: UserId) -> Option<&Profile> {
        self.profiles.get(&user)
    }

    pub fn profile_mut(&mut self, user: UserId) -> Option<&mut Profile> {
        self.profiles.get_mut(&user)
    }

    /// Profiles ordered by user id, optionally restricted to one type.
    pub fn profiles(&self, kind: Option<ProfileType>) -> Vec<&Profile> {
        self.profiles
            .values()
            .filter(|profile| kind.map_or(true, |kind| profile.kind == kind))
            .collect()
    }

    pub fn actor(&self, user: UserId) -> Option<Actor> {
        let user = self.users.get(&user)?.clone();
        let profile = self.profiles.get(&user.id)?.clone();
        Some(Actor { user, profile })
    }

    /// Removes the account and everything that references it.
    pub fn delete_user(&mut self, id: UserId) -> DeletionCounts {
        let mut counts = DeletionCounts::default();
        if self.users.remove(&id).is_none() {
            return counts;
        }
        counts.users = 1;
        counts.profiles = usize::from(self.profiles.remove(&id).is_some());

        let before = self.tokens.len();
        self.tokens.retain(|_, token| token.user != id);
        counts.tokens = before - self.tokens.len();

        let owned: Vec<OfferId> = self
            .offers
            .values()
            .filter(|offer| offer.creator == id)
            .map(|offer| offer.id)
            .collect();
        for offer in owned {
            counts.absorb(self.delete_offer(offer));
        }

        let before = self.orders.len();
        self.orders
            .retain(|_, order| order.customer != id && order.business_user != id);
        counts.orders += before - self.orders.len();

        let before = self.reviews.len();
        self.reviews
            .retain(|_, review| review.reviewer != id && review.business_user != id);
        counts.reviews = before - self.reviews.len();

        counts
    }

    // tokens

    pub fn token_for_user(&self, user: UserId) -> Option<&AuthToken> {
        self.tokens.values().find(|token| token.user == user)
    }

    pub fn insert_token(&mut self, token: AuthToken) -> Result<(), RepositoryError> {
        if self.tokens.contains_key(&token.key) {
            return Err(RepositoryError::Conflict);
        }
        self.tokens.insert(token.key.clone(), token);
        Ok(())
    }

    pub fn user_for_token(&self, key: &str) -> Option<UserId> {
        self.tokens.get(key).map(|token| token.user)
    }

    // offers & details

    pub fn insert_offer(
        &mut self,
        creator: UserId,
        title: String,
        description: String,
        image: Option<String>,
        drafts: Vec<OfferDetailDraft>,
        now: DateTime<Utc>,
    ) -> OfferId {
        self.sequences.offer += 1;
        let id = OfferId(self.sequences.offer);
        self.offers.insert(
            id,
            Offer {
                id,
                creator,
                title,
                description,
                image,
                created_at: now,
                updated_at: now,
            },
        );
        for draft in drafts {
            self.add_detail(id, draft);
        }
        id
    }

    pub fn add_detail(&mut self, offer: OfferId, draft: OfferDetailDraft) -> OfferDetailId {
        self.sequences.offer_detail += 1;
        let id = OfferDetailId(self.sequences.offer_detail);
        self.details.insert(
            id,
            OfferDetail {
                id,
                offer,
                offer_type: draft.offer_type,
                title: draft.title,
                revisions: draft.revisions,
                delivery_time_in_days: draft.delivery_time_in_days,
                price: draft.price,
                features: draft.features.into_iter().map(Feature::new).collect(),
            },
        );
        id
    }

    pub fn offer(&self, id: OfferId) -> Option<&Offer> {
        self.offers.get(&id)
    }

    pub fn offer_mut(&mut self, id: OfferId) -> Option<&mut Offer> {
        self.offers.get_mut(&id)
    }

    pub fn offers(&self) -> impl Iterator<Item = &Offer> {
        self.offers.values()
    }

    /// Tiers of an offer in basic, standard, premium order.
    pub fn details_of(&self, offer: OfferId) -> Vec<&OfferDetail> {
        let mut details: Vec<&OfferDetail> = self
            .details
            .values()
            .filter(|detail| detail.offer == offer)
            .collect();
        details.sort_by_key(|detail| (detail.offer_type, detail.id));
        details
    }

    pub fn detail(&self, id: OfferDetailId) -> Option<&OfferDetail> {
        self.details.get(&id)
    }

    pub fn detail_mut(&mut self, id: OfferDetailId) -> Option<&mut OfferDetail> {
        self.details.get_mut(&id)
    }

    pub fn details(&self) -> impl Iterator<Item = &OfferDetail> {
        self.details.values()
    }

    pub fn details_mut(&mut self) -> impl Iterator<Item = &mut OfferDetail> {
        self.details.values_mut()
    }

    pub fn min_price(&self, offer: OfferId) -> f64 {
        self.details_of(offer)
            .iter()
            .map(|detail| detail.price)
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    pub fn min_delivery_time(&self, offer: OfferId) -> u32 {
        self.details_of(offer)
            .iter()
            .map(|detail| detail.delivery_time_in_days)
            .min()
            .unwrap_or(0)
    }

    /// Deletes the offer, its tiers and every order placed on those tiers.
    pub fn delete_offer(&mut self, id: OfferId) -> DeletionCounts {
        let mut counts = DeletionCounts::default();
        if self.offers.remove(&id).is_none() {
            return counts;
        }
        counts.offers = 1;

        let removed: Vec<OfferDetailId> = self
            .details
            .values()
            .filter(|detail| detail.offer == id)
            .map(|detail| detail.id)
            .collect();
        for detail in &removed {
            self.details.remove(detail);
        }
        counts.offer_details = removed.len();

        let before = self.orders.len();
        self.orders
            .retain(|_, order| !removed.contains(&order.offer_detail));
        counts.orders = before - self.orders.len();
        counts
    }

    // orders

    pub fn insert_order(
        &mut self,
        customer: UserId,
        business_user: UserId,
        offer_detail: OfferDetailId,
        now: DateTime<Utc>,
    ) -> Order {
        self.sequences.order += 1;
        let order = Order {
            id: OrderId(self.sequences.order),
            customer,
            business_user,
            offer_detail,
            status: OrderStatus::InProgress,
            created_at: now,
            updated_at: now,
        };
        self.orders.insert(order.id, order.clone());
        order
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn order_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        self.orders.get_mut(&id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn delete_order(&mut self, id: OrderId) -> Option<Order> {
        self.orders.remove(&id)
    }

    pub fn count_orders(&self, business_user: UserId, status: OrderStatus) -> usize {
        self.orders
            .values()
            .filter(|order| order.business_user == business_user && order.status == status)
            .count()
    }

    // reviews

    /// Fails with `Conflict` when the reviewer already rated this business.
    pub fn insert_review(
        &mut self,
        reviewer: UserId,
        business_user: UserId,
        rating: u8,
        description: String,
        now: DateTime<Utc>,
    ) -> Result<Review, RepositoryError> {
        if self.has_review(reviewer, business_user) {
            return Err(RepositoryError::Conflict);
        }
        self.sequences.review += 1;
        let review = Review {
            id: ReviewId(self.sequences.review),
            reviewer,
            business_user,
            rating,
            description,
            created_at: now,
            updated_at: now,
        };
        self.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    pub fn has_review(&self, reviewer: UserId, business_user: UserId) -> bool {
        self.reviews
            .values()
            .any(|review| review.reviewer == reviewer && review.business_user == business_user)
    }

    pub fn review(&self, id: ReviewId) -> Option<&Review> {
        self.reviews.get(&id)
    }

    pub fn review_mut(&mut self, id: ReviewId) -> Option<&mut Review> {
        self.reviews.get_mut(&id)
    }

    pub fn reviews(&self) -> impl Iterator<Item = &Review> {
        self.reviews.values()
    }

    pub fn delete_review(&mut self, id: ReviewId) -> Option<Review> {
        self.reviews.remove(&id)
    }

    // statistics

    pub fn base_info(&self) -> BaseInfo {
        self.base_info
    }

    /// Recomputes the statistics singleton from the tables.
    pub fn refresh_base_info(&mut self) -> BaseInfo {
        self.base_info = BaseInfo {
            total_users: self.users.len(),
            total_offers: self.offers.len(),
            total_completed_orders: self
                .orders
                .values()
                .filter(|order| order.status == OrderStatus::Completed)
                .count(),
            total_reviews: self.reviews.len(),
        };
        self.base_info
    }
}
