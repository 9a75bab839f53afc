//! Freelance-services marketplace: business users publish tiered offers,
//! customers order and review them.
//!
//! Storage sits behind [`MarketplaceRepository`]; [`MarketplaceService`]
//! enforces validation and permissions; [`marketplace_router`] maps the
//! service onto the REST endpoints under `/api/`.

pub mod auth;
pub mod domain;
pub mod pagination;
pub mod payloads;
pub(crate) mod permissions;
pub mod repository;
pub mod router;
pub mod sanitize;
pub mod service;
pub mod store;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{
    Actor, AuthToken, BaseInfo, Feature, Offer, OfferDetail, OfferDetailDraft, OfferDetailId,
    OfferId, OfferType, Order, OrderId, OrderStatus, Profile, ProfileType, Review, ReviewId,
    UnknownChoice, User, UserId,
};
pub use pagination::{Page, PageRequest};
pub use repository::{InMemoryMarketplaceRepository, MarketplaceRepository, RepositoryError};
pub use router::marketplace_router;
pub use service::{
    Access, DemoAccounts, GuestCleanupReport, MarketplaceError, MarketplaceService, RepairReport,
    DEMO_PASSWORD,
};
pub use store::{DeletionCounts, MarketplaceData, NewUser};
