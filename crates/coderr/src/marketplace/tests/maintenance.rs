use chrono::{Duration, Utc};
use serde_json::json;

use super::common::*;
use crate::marketplace::domain::{Feature, OfferDetailDraft, OfferType, UserId};
use crate::marketplace::payloads::{GuestLoginPayload, LoginPayload, OrderPayload};
use crate::marketplace::repository::{MarketplaceRepository, RepositoryError};
use crate::marketplace::{MarketplaceError, DEMO_PASSWORD};

fn age_account(service: &Service, user: UserId, days: i64) {
    service
        .repository()
        .write(|data| {
            let account = data.user_mut(user).expect("user exists");
            account.date_joined = Utc::now() - Duration::days(days);
            Ok::<_, RepositoryError>(())
        })
        .expect("write succeeds");
}

fn guest(service: &Service, kind: &str) -> UserId {
    service
        .guest_login(GuestLoginPayload {
            kind: Some(kind.to_string()),
        })
        .expect("guest login")
        .user_id
}

#[test]
fn cleanup_dry_run_reports_without_deleting() {
    let (service, repository) = build_service();
    let stale = guest(&service, "customer");
    guest(&service, "customer");
    age_account(&service, stale, 10);

    let report = service.cleanup_guests(7, true).expect("dry run");

    assert!(report.dry_run);
    assert_eq!(report.matched, 1);
    assert_eq!(report.sample.len(), 1);
    assert!(report.sample[0].starts_with("guest_"));
    assert_eq!(report.deleted.total(), 0);
    assert_eq!(repository.read(|data| data.users().count()).expect("read"), 2);
}

#[test]
fn cleanup_cascades_through_guest_data() {
    let (service, repository) = build_service();
    let seller_id = guest(&service, "business");
    let seller = actor(&service, seller_id);
    let buyer = customer(&service, "olga");
    let offer = publish(&service, &seller, "Guest offer");
    let basic = service.offer(Some(&buyer), offer).expect("offer").details[0].id;
    service
        .create_order(
            Some(&buyer),
            OrderPayload {
                offer_detail_id: Some(json!(basic.0)),
            },
        )
        .expect("order placed");
    age_account(&service, seller_id, 30);
    age_account(&service, buyer.id(), 30);

    let report = service.cleanup_guests(7, false).expect("cleanup");

    assert!(!report.dry_run);
    assert_eq!(report.matched, 1);
    assert_eq!(report.deleted.users, 1);
    assert_eq!(report.deleted.profiles, 1);
    assert_eq!(report.deleted.tokens, 1);
    assert_eq!(report.deleted.offers, 1);
    assert_eq!(report.deleted.offer_details, 3);
    assert_eq!(report.deleted.orders, 1);
    assert_eq!(
        report.deleted.non_zero().first().copied(),
        Some(("users", 1))
    );

    let remaining = repository
        .read(|data| data.users().map(|user| user.id).collect::<Vec<_>>())
        .expect("read");
    assert_eq!(remaining, vec![buyer.id()]);
    assert_eq!(service.base_info().expect("base info").offer_count, 0);
}

#[test]
fn cleanup_spares_demo_accounts_and_rejects_negative_days() {
    let (service, _) = build_service();
    let demo = service.seed_demo().expect("demo seeded");
    age_account(&service, demo.customer, 90);
    age_account(&service, demo.business, 90);

    let report = service.cleanup_guests(0, false).expect("cleanup");
    assert_eq!(report.matched, 0);
    assert!(actor(&service, demo.customer).profile.is_guest);

    assert!(matches!(
        service.cleanup_guests(-1, true),
        Err(MarketplaceError::BadRequest(_))
    ));
}

#[test]
fn repair_normalizes_details_and_restores_tiers() {
    let (service, repository) = build_service();
    let seller = business(&service, "bruno");
    let offer = publish(&service, &seller, "Logo");
    let basic = service.offer(Some(&seller), offer).expect("offer").details[0].id;

    repository
        .write(|data| {
            let detail = data.detail_mut(basic).expect("detail exists");
            detail.price = -12.0;
            detail.delivery_time_in_days = 0;
            detail.revisions = -8;
            detail.features.push(Feature::new("  "));
            data.insert_offer(
                seller.id(),
                "Partial".to_string(),
                "Only a premium tier".to_string(),
                None,
                vec![OfferDetailDraft {
                    title: "Premium".to_string(),
                    price: 90.0,
                    ..OfferDetailDraft::placeholder(OfferType::Premium)
                }],
                Utc::now(),
            );
            Ok::<_, RepositoryError>(())
        })
        .expect("write succeeds");

    let report = service.repair().expect("repair");

    assert_eq!(report.offers_checked, 2);
    assert_eq!(report.details_normalized, 1);
    assert_eq!(report.tiers_added, 2);
    assert!(!report.is_clean());

    let fixed = service.offer_detail(basic).expect("detail");
    assert_eq!(fixed.price, 0.0);
    assert_eq!(fixed.delivery_time_in_days, 1);
    assert_eq!(fixed.revisions, 1);
    assert_eq!(fixed.features, vec!["Logo Design", "Business card"]);

    let tiers = repository
        .read(|data| {
            data.offers()
                .map(|offer| data.details_of(offer.id).len())
                .collect::<Vec<_>>()
        })
        .expect("read");
    assert_eq!(tiers, vec![3, 3]);

    assert!(service.repair().expect("second repair").is_clean());
}

#[test]
fn demo_seed_is_idempotent() {
    let (service, _) = build_service();

    let first = service.seed_demo().expect("first seed");
    let second = service.seed_demo().expect("second seed");

    assert!(first.sample_created);
    assert!(!second.sample_created);
    assert_eq!(first.customer, second.customer);
    assert_eq!(first.customer_token, second.customer_token);
    assert_eq!(first.business_token, second.business_token);

    let info = service.base_info().expect("base info");
    assert_eq!(info.offer_count, 1);
    assert_eq!(info.review_count, 1);
    assert_eq!(info.average_rating, 5.0);

    let kevin = actor(&service, first.business);
    assert!(kevin.profile.is_business());
    assert_eq!(
        service
            .completed_order_count(Some(&kevin), &first.business.to_string())
            .expect("count")
            .completed_order_count,
        1
    );

    let login = service
        .login(LoginPayload {
            username: Some("andrey".to_string()),
            password: Some(DEMO_PASSWORD.to_string()),
        })
        .expect("demo login");
    assert_eq!(login.token, first.customer_token);
}
