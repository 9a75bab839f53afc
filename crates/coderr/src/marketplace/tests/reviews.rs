use serde_json::json;

use super::common::*;
use crate::marketplace::domain::{Actor, ReviewId};
use crate::marketplace::payloads::{ReviewPatch, ReviewPayload, ReviewQuery};
use crate::marketplace::views::ReviewView;
use crate::marketplace::MarketplaceError;

fn review(service: &Service, reviewer: &Actor, business_user: &Actor, rating: u8) -> ReviewView {
    service
        .create_review(
            Some(reviewer),
            ReviewPayload {
                business_user: Some(json!(business_user.id().0)),
                rating: Some(json!(rating)),
                description: Some(format!("{rating} stars from {}", reviewer.user.username)),
            },
        )
        .expect("review created")
}

#[test]
fn customers_review_business_users_once() {
    let (service, _) = build_service();
    let seller = business(&service, "bruno");
    let buyer = customer(&service, "olga");

    let created = review(&service, &buyer, &seller, 4);

    assert_eq!(created.reviewer, buyer.id());
    assert_eq!(created.business_user, seller.id());
    assert_eq!(created.rating, 4);
    assert_eq!(created.description, "4 stars from olga");

    let again = service.create_review(
        Some(&buyer),
        ReviewPayload {
            business_user: Some(json!(seller.id().0)),
            rating: Some(json!(5)),
            description: Some("Even better".to_string()),
        },
    );
    assert!(matches!(again, Err(MarketplaceError::Forbidden(_))));
}

#[test]
fn review_creation_requires_a_customer_and_valid_fields() {
    let (service, _) = build_service();
    let seller = business(&service, "bruno");
    let rival = business(&service, "carla");
    let buyer = customer(&service, "olga");
    let other = customer(&service, "sven");

    let payload = |business_user: serde_json::Value, rating: serde_json::Value, text: &str| {
        ReviewPayload {
            business_user: Some(business_user),
            rating: Some(rating),
            description: Some(text.to_string()),
        }
    };

    assert!(matches!(
        service.create_review(None, payload(json!(seller.id().0), json!(5), "Great")),
        Err(MarketplaceError::Unauthorized(_))
    ));
    assert!(matches!(
        service.create_review(Some(&rival), payload(json!(seller.id().0), json!(5), "Great")),
        Err(MarketplaceError::Unauthorized(_))
    ));

    let invalid = [
        payload(json!(seller.id().0), json!(0), "Great"),
        payload(json!(seller.id().0), json!(6), "Great"),
        payload(json!(seller.id().0), json!("five"), "Great"),
        payload(json!(seller.id().0), json!(5), "   "),
        payload(json!("bruno"), json!(5), "Great"),
        payload(json!(999), json!(5), "Great"),
        payload(json!(other.id().0), json!(5), "Great"),
    ];
    for body in invalid {
        assert!(matches!(
            service.create_review(Some(&buyer), body),
            Err(MarketplaceError::BadRequest(_))
        ));
    }
    assert!(matches!(
        service.create_review(Some(&buyer), ReviewPayload::default()),
        Err(MarketplaceError::BadRequest(_))
    ));
}

#[test]
fn review_list_filters_and_orders() {
    let (service, _) = build_service();
    let bruno = business(&service, "bruno");
    let carla = business(&service, "carla");
    let olga = customer(&service, "olga");
    let sven = customer(&service, "sven");

    let low = review(&service, &olga, &bruno, 2);
    let high = review(&service, &sven, &bruno, 5);
    let other = review(&service, &olga, &carla, 3);

    let ids = |reviews: Vec<ReviewView>| reviews.into_iter().map(|review| review.id).collect::<Vec<_>>();

    let for_bruno = service
        .list_reviews(
            Some(&olga),
            &ReviewQuery {
                business_user_id: Some(bruno.id().to_string()),
                ordering: Some("-rating".to_string()),
                ..ReviewQuery::default()
            },
        )
        .expect("reviews for bruno");
    assert_eq!(ids(for_bruno), vec![high.id, low.id]);

    let by_olga = service
        .list_reviews(
            Some(&olga),
            &ReviewQuery {
                reviewer_id: Some(olga.id().to_string()),
                ordering: Some("rating".to_string()),
                ..ReviewQuery::default()
            },
        )
        .expect("reviews by olga");
    assert_eq!(ids(by_olga), vec![low.id, other.id]);

    let everything = service
        .list_reviews(Some(&bruno), &ReviewQuery::default())
        .expect("all reviews");
    assert_eq!(everything.len(), 3);

    assert!(matches!(
        service.list_reviews(None, &ReviewQuery::default()),
        Err(MarketplaceError::Unauthorized(_))
    ));
    assert!(matches!(
        service.list_reviews(
            Some(&olga),
            &ReviewQuery {
                ordering: Some("price".to_string()),
                ..ReviewQuery::default()
            }
        ),
        Err(MarketplaceError::BadRequest(_))
    ));
    assert!(matches!(
        service.list_reviews(
            Some(&olga),
            &ReviewQuery {
                reviewer_id: Some("olga".to_string()),
                ..ReviewQuery::default()
            }
        ),
        Err(MarketplaceError::BadRequest(_))
    ));
}

#[test]
fn reviewers_edit_rating_and_description_only() {
    let (service, _) = build_service();
    let seller = business(&service, "bruno");
    let buyer = customer(&service, "olga");
    let stranger = customer(&service, "sven");
    let created = review(&service, &buyer, &seller, 3);

    let updated = service
        .update_review(
            Some(&buyer),
            created.id,
            ReviewPatch {
                rating: Some(json!(5)),
                ..ReviewPatch::default()
            },
        )
        .expect("review updated");
    assert_eq!(updated.rating, 5);
    assert_eq!(updated.description, created.description);
    assert!(updated.updated_at >= created.updated_at);

    let extra: ReviewPatch =
        serde_json::from_value(json!({ "rating": 4, "business_user": 9 })).expect("patch");
    assert!(matches!(
        service.update_review(Some(&stranger), created.id, extra.clone()),
        Err(MarketplaceError::Forbidden(_))
    ));
    assert!(matches!(
        service.update_review(Some(&buyer), created.id, extra),
        Err(MarketplaceError::BadRequest(_))
    ));
    assert!(matches!(
        service.update_review(
            Some(&buyer),
            created.id,
            ReviewPatch {
                rating: Some(json!(9)),
                ..ReviewPatch::default()
            }
        ),
        Err(MarketplaceError::BadRequest(_))
    ));
    assert!(matches!(
        service.update_review(Some(&buyer), ReviewId(404), ReviewPatch::default()),
        Err(MarketplaceError::NotFound(_))
    ));
}

#[test]
fn reviewers_delete_their_reviews() {
    let (service, _) = build_service();
    let seller = business(&service, "bruno");
    let buyer = customer(&service, "olga");
    let created = review(&service, &buyer, &seller, 3);

    assert!(matches!(
        service.delete_review(Some(&seller), created.id),
        Err(MarketplaceError::Forbidden(_))
    ));
    service
        .delete_review(Some(&buyer), created.id)
        .expect("review deleted");
    assert!(matches!(
        service.delete_review(Some(&buyer), created.id),
        Err(MarketplaceError::NotFound(_))
    ));

    review(&service, &buyer, &seller, 4);
}

#[test]
fn public_review_lists_check_the_user_type() {
    let (service, _) = build_service();
    let seller = business(&service, "bruno");
    let buyer = customer(&service, "olga");
    let created = review(&service, &buyer, &seller, 4);

    let received = service
        .reviews_for_business(&seller.id().to_string())
        .expect("received reviews");
    let written = service
        .reviews_by_reviewer(&buyer.id().to_string())
        .expect("written reviews");
    assert_eq!(received, vec![created.clone()]);
    assert_eq!(written, vec![created]);

    assert!(matches!(
        service.reviews_for_business(&buyer.id().to_string()),
        Err(MarketplaceError::BadRequest(_))
    ));
    assert!(matches!(
        service.reviews_by_reviewer(&seller.id().to_string()),
        Err(MarketplaceError::BadRequest(_))
    ));
    assert!(matches!(
        service.reviews_for_business("abc"),
        Err(MarketplaceError::BadRequest(_))
    ));
    assert!(matches!(
        service.reviews_by_reviewer("999"),
        Err(MarketplaceError::NotFound(_))
    ));
}

#[test]
fn base_info_tracks_reviews_and_offers() {
    let (service, _) = build_service();
    let seller = business(&service, "bruno");
    business(&service, "carla");
    let olga = customer(&service, "olga");
    let sven = customer(&service, "sven");
    publish(&service, &seller, "Logo");

    let empty = service.base_info().expect("base info");
    assert_eq!(empty.review_count, 0);
    assert_eq!(empty.average_rating, 0.0);
    assert_eq!(empty.business_profile_count, 2);
    assert_eq!(empty.offer_count, 1);

    review(&service, &olga, &seller, 5);
    review(&service, &sven, &seller, 4);
    let info = service.base_info().expect("base info");
    assert_eq!(info.review_count, 2);
    assert_eq!(info.average_rating, 4.5);
}
