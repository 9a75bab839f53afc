use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::auth;
use super::permissions;
use super::domain::{Actor, AuthToken, OfferId, OrderId, ReviewId, UserId};
use super::repository::{MarketplaceRepository, RepositoryError};
use super::store::MarketplaceData;
use super::views::BaseInfoView;
use crate::config::MarketplaceConfig;

mod accounts;
mod maintenance;
mod offers;
mod orders;
mod reviews;

pub use maintenance::{DemoAccounts, GuestCleanupReport, RepairReport, DEMO_PASSWORD};

/// A write a caller wants to make, checked before its request body is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    CreateOffer,
    EditOffer(OfferId),
    PlaceOrder,
    UpdateOrder(OrderId),
    WriteReview,
    EditReview(ReviewId),
    EditProfile(UserId),
}

/// Marketplace use cases on top of a repository.
///
/// Every operation takes the already-resolved caller (`None` for anonymous
/// requests) and enforces its own permission rules.
pub struct MarketplaceService<R> {
    repository: Arc<R>,
    config: MarketplaceConfig,
}

impl<R> MarketplaceService<R>
where
    R: MarketplaceRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: MarketplaceConfig) -> Self {
        Self { repository, config }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn config(&self) -> &MarketplaceConfig {
        &self.config
    }

    /// Resolves an `Authorization` header value to the calling account.
    ///
    /// No header means an anonymous caller; a header that does not name a
    /// live token is rejected outright.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<Option<Actor>, MarketplaceError> {
        let Some(header) = authorization else {
            return Ok(None);
        };
        let Some(key) = auth::parse_authorization(header) else {
            warn!("malformed authorization header rejected");
            return Err(MarketplaceError::Unauthorized(
                "invalid token header".to_string(),
            ));
        };

        let actor = self.repository.read(|data| {
            data.user_for_token(key)
                .and_then(|user| data.actor(user))
        })?;
        match actor {
            Some(actor) => Ok(Some(actor)),
            None => {
                warn!("unknown token rejected");
                Err(MarketplaceError::Unauthorized("invalid token".to_string()))
            }
        }
    }

    /// Applies the same caller rules as the write behind `access`.
    ///
    /// A request is refused with 401, 403 or 404 before a malformed body can
    /// turn it into a 400.
    pub fn authorize(&self, actor: Option<&Actor>, access: Access) -> Result<(), MarketplaceError> {
        match access {
            Access::CreateOffer => permissions::business(actor).map(|_| ()),
            Access::PlaceOrder => permissions::customer(actor).map(|_| ()),
            Access::WriteReview => permissions::reviewing_customer(actor).map(|_| ()),
            Access::EditOffer(offer) => {
                let actor = permissions::authenticated(actor)?;
                self.repository
                    .read(|data| offers::ensure_offer_owner(data, actor, offer))?
            }
            Access::UpdateOrder(order) => {
                let actor = permissions::authenticated(actor)?;
                self.repository
                    .read(|data| orders::ensure_order_business_user(data, actor, order))?
            }
            Access::EditReview(review) => {
                let actor = permissions::authenticated(actor)?;
                self.repository
                    .read(|data| reviews::ensure_reviewer(data, actor, review))?
            }
            Access::EditProfile(user) => {
                let actor = permissions::authenticated(actor)?;
                self.repository
                    .read(|data| accounts::ensure_profile_editable(data, actor, user))?
            }
        }
    }

    /// Recomputes the statistics singleton and returns the public summary.
    pub fn base_info(&self) -> Result<BaseInfoView, MarketplaceError> {
        self.repository.write(|data| {
            let info = data.refresh_base_info();
            Ok(BaseInfoView::build(data, info))
        })
    }
}

/// Returns the user's token key, creating one on first use.
pub(super) fn issue_token(data: &mut MarketplaceData, user: UserId) -> Result<String, RepositoryError> {
    if let Some(token) = data.token_for_user(user) {
        return Ok(token.key.clone());
    }
    let token = AuthToken {
        key: auth::new_token_key(),
        user,
        created_at: Utc::now(),
    };
    let key = token.key.clone();
    data.insert_token(token)?;
    Ok(key)
}

/// Parses a numeric identifier taken from a path or query string.
pub(super) fn parse_id(raw: &str, field: &str) -> Result<u64, MarketplaceError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| MarketplaceError::BadRequest(format!("{field} must be an integer")))
}

pub(super) fn not_found(resource: &str) -> MarketplaceError {
    MarketplaceError::NotFound(format!("{resource} not found"))
}

/// Error raised by the marketplace service.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
