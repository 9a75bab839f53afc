use chrono::Utc;
use serde_json::Value;
use tracing::info;

use super::{not_found, parse_id, MarketplaceError, MarketplaceService};
use crate::marketplace::domain::{Actor, ProfileType, Review, ReviewId, UserId};
use crate::marketplace::payloads::{self, ReviewPatch, ReviewPayload, ReviewQuery};
use crate::marketplace::permissions;
use crate::marketplace::repository::MarketplaceRepository;
use crate::marketplace::store::MarketplaceData;
use crate::marketplace::views::ReviewView;

fn bad_request(message: impl Into<String>) -> MarketplaceError {
    MarketplaceError::BadRequest(message.into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReviewOrdering {
    UpdatedAt,
    NewestUpdate,
    Rating,
    HighestRating,
}

impl ReviewOrdering {
    fn parse(raw: Option<&str>) -> Result<Self, MarketplaceError> {
        match raw.map(str::trim).unwrap_or_default() {
            "" | "-updated_at" => Ok(Self::NewestUpdate),
            "updated_at" => Ok(Self::UpdatedAt),
            "rating" => Ok(Self::Rating),
            "-rating" => Ok(Self::HighestRating),
            other => Err(bad_request(format!(
                "ordering '{other}' is not supported, use updated_at, -updated_at, rating or -rating"
            ))),
        }
    }

    fn sort(self, reviews: &mut [&Review]) {
        match self {
            Self::UpdatedAt => {
                reviews.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)))
            }
            Self::NewestUpdate => {
                reviews.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)))
            }
            Self::Rating => reviews.sort_by(|a, b| a.rating.cmp(&b.rating).then(a.id.cmp(&b.id))),
            Self::HighestRating => {
                reviews.sort_by(|a, b| b.rating.cmp(&a.rating).then(b.id.cmp(&a.id)))
            }
        }
    }
}

fn optional_user_filter(raw: Option<&str>, field: &str) -> Result<Option<UserId>, MarketplaceError> {
    raw.map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| parse_id(raw, field).map(UserId))
        .transpose()
}

pub(super) fn ensure_reviewer(
    data: &MarketplaceData,
    actor: &Actor,
    review: ReviewId,
) -> Result<(), MarketplaceError> {
    let reviewer = data
        .review(review)
        .map(|found| found.reviewer)
        .ok_or_else(|| not_found("review"))?;
    permissions::owner(actor, reviewer, "review")
}

fn rating(value: &Value) -> Result<u8, MarketplaceError> {
    payloads::integer(value)
        .filter(|rating| (1..=5).contains(rating))
        .and_then(|rating| u8::try_from(rating).ok())
        .ok_or_else(|| bad_request("rating must be an integer between 1 and 5"))
}

fn description(raw: &str) -> Result<String, MarketplaceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(bad_request("description must not be blank"))
    } else {
        Ok(trimmed.to_string())
    }
}

impl<R> MarketplaceService<R>
where
    R: MarketplaceRepository + 'static,
{
    pub fn list_reviews(
        &self,
        actor: Option<&Actor>,
        query: &ReviewQuery,
    ) -> Result<Vec<ReviewView>, MarketplaceError> {
        permissions::authenticated(actor)?;
        let business_user =
            optional_user_filter(query.business_user_id.as_deref(), "business_user_id")?;
        let reviewer = optional_user_filter(query.reviewer_id.as_deref(), "reviewer_id")?;
        let ordering = ReviewOrdering::parse(query.ordering.as_deref())?;

        Ok(self.repository.read(|data| {
            let mut reviews: Vec<&Review> = data
                .reviews()
                .filter(|review| business_user.map_or(true, |id| review.business_user == id))
                .filter(|review| reviewer.map_or(true, |id| review.reviewer == id))
                .collect();
            ordering.sort(&mut reviews);
            reviews.into_iter().map(ReviewView::from).collect()
        })?)
    }

    /// One review per customer and business user.
    pub fn create_review(
        &self,
        actor: Option<&Actor>,
        payload: ReviewPayload,
    ) -> Result<ReviewView, MarketplaceError> {
        let actor = permissions::reviewing_customer(actor)?;
        let business_user = payload
            .business_user
            .as_ref()
            .ok_or_else(|| bad_request("business_user is required"))?;
        let business_user = payloads::integer(business_user)
            .and_then(|id| u64::try_from(id).ok())
            .map(UserId)
            .ok_or_else(|| bad_request("business_user must be an integer"))?;
        let rating = rating(
            payload
                .rating
                .as_ref()
                .ok_or_else(|| bad_request("rating is required"))?,
        )?;
        let description = description(payload.description.as_deref().unwrap_or_default())?;

        let view = self.repository.write(|data| -> Result<_, MarketplaceError> {
            let profile = data
                .profile(business_user)
                .ok_or_else(|| bad_request("business user does not exist"))?;
            if !profile.is_business() {
                return Err(bad_request("reviews can only be left for business users"));
            }
            if data.has_review(actor.id(), business_user) {
                return Err(MarketplaceError::Forbidden(
                    "you have already reviewed this business user".to_string(),
                ));
            }
            let review =
                data.insert_review(actor.id(), business_user, rating, description, Utc::now())?;
            data.refresh_base_info();
            Ok(ReviewView::from(&review))
        })?;

        info!(review_id = %view.id, business = %view.business_user, "review created");
        Ok(view)
    }

    /// Only `rating` and `description` may change, and only by the reviewer.
    pub fn update_review(
        &self,
        actor: Option<&Actor>,
        review: ReviewId,
        patch: ReviewPatch,
    ) -> Result<ReviewView, MarketplaceError> {
        let actor = permissions::authenticated(actor)?;

        let view = self.repository.write(|data| -> Result<_, MarketplaceError> {
            ensure_reviewer(data, actor, review)?;
            if let Some(field) = patch.unexpected.keys().next() {
                return Err(bad_request(format!(
                    "only rating and description can be updated, '{field}' is not allowed"
                )));
            }
            let rating = patch.rating.as_ref().map(rating).transpose()?;
            let description = patch.description.as_deref().map(description).transpose()?;

            let stored = data.review_mut(review).ok_or_else(|| not_found("review"))?;
            if let Some(rating) = rating {
                stored.rating = rating;
            }
            if let Some(description) = description {
                stored.description = description;
            }
            stored.updated_at = Utc::now();
            Ok(ReviewView::from(&*stored))
        })?;

        info!(review_id = %review, "review updated");
        Ok(view)
    }

    pub fn delete_review(&self, actor: Option<&Actor>, review: ReviewId) -> Result<(), MarketplaceError> {
        let actor = permissions::authenticated(actor)?;
        self.repository.write(|data| -> Result<_, MarketplaceError> {
            ensure_reviewer(data, actor, review)?;
            data.delete_review(review);
            data.refresh_base_info();
            Ok(())
        })?;
        info!(review_id = %review, "review deleted");
        Ok(())
    }

    /// Public list of reviews a business user received.
    pub fn reviews_for_business(&self, business_user: &str) -> Result<Vec<ReviewView>, MarketplaceError> {
        let business_user = UserId(parse_id(business_user, "business_user_id")?);
        self.reviews_of(business_user, ProfileType::Business, |review| {
            review.business_user == business_user
        })
    }

    /// Public list of reviews a customer wrote.
    pub fn reviews_by_reviewer(&self, reviewer: &str) -> Result<Vec<ReviewView>, MarketplaceError> {
        let reviewer = UserId(parse_id(reviewer, "reviewer_id")?);
        self.reviews_of(reviewer, ProfileType::Customer, |review| {
            review.reviewer == reviewer
        })
    }

    fn reviews_of(
        &self,
        user: UserId,
        expected: ProfileType,
        include: impl Fn(&Review) -> bool,
    ) -> Result<Vec<ReviewView>, MarketplaceError> {
        self.repository.read(|data| -> Result<_, MarketplaceError> {
            let profile = data.profile(user).ok_or_else(|| not_found("user"))?;
            if profile.kind != expected {
                return Err(bad_request(format!(
                    "user is not a {} user",
                    expected.as_str()
                )));
            }
            let mut reviews: Vec<&Review> = data.reviews().filter(|review| include(review)).collect();
            ReviewOrdering::NewestUpdate.sort(&mut reviews);
            Ok(reviews.into_iter().map(ReviewView::from).collect())
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ordering_accepts_known_fields_only() {
        assert_eq!(ReviewOrdering::parse(None).expect("default"), ReviewOrdering::NewestUpdate);
        assert_eq!(
            ReviewOrdering::parse(Some("-rating")).expect("known"),
            ReviewOrdering::HighestRating
        );
        assert!(ReviewOrdering::parse(Some("price")).is_err());
    }

    #[test]
    fn rating_must_be_between_one_and_five() {
        assert_eq!(rating(&json!(5)).expect("valid"), 5);
        assert_eq!(rating(&json!("3")).expect("numeric string"), 3);
        assert!(rating(&json!(0)).is_err());
        assert!(rating(&json!(6)).is_err());
        assert!(rating(&json!("great")).is_err());
    }
}
