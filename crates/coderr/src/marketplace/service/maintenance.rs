use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use super::{issue_token, MarketplaceError, MarketplaceService};
use crate::marketplace::auth;
use crate::marketplace::domain::{
    Feature, OfferDetailDraft, OfferType, OrderStatus, ProfileType, UserId,
};
use crate::marketplace::repository::MarketplaceRepository;
use crate::marketplace::sanitize;
use crate::marketplace::store::{DeletionCounts, MarketplaceData, NewUser};

/// Password shared by the seeded demo accounts.
pub const DEMO_PASSWORD: &str = "coderr-demo";

const CLEANUP_SAMPLE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestCleanupReport {
    pub cutoff: DateTime<Utc>,
    pub dry_run: bool,
    pub matched: usize,
    /// First few matching usernames, for operator review.
    pub sample: Vec<String>,
    pub deleted: DeletionCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub offers_checked: usize,
    pub details_normalized: usize,
    pub tiers_added: usize,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.details_normalized == 0 && self.tiers_added == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemoAccounts {
    pub customer: UserId,
    pub business: UserId,
    pub customer_token: String,
    pub business_token: String,
    pub sample_created: bool,
}

/// Guest accounts older than `cutoff`, excluding the reserved demo logins.
fn expired_guests(data: &MarketplaceData, cutoff: DateTime<Utc>) -> Vec<(UserId, String)> {
    data.users()
        .filter(|user| user.date_joined < cutoff)
        .filter(|user| !auth::is_reserved_username(&user.username))
        .filter(|user| data.profile(user.id).is_some_and(|profile| profile.is_guest))
        .map(|user| (user.id, user.username.clone()))
        .collect()
}

fn demo_account(
    data: &mut MarketplaceData,
    username: &str,
    kind: ProfileType,
    now: DateTime<Utc>,
) -> UserId {
    if let Some(user) = data.user_by_username(username) {
        return user.id;
    }
    let salt = auth::new_salt();
    let (user, _) = data.create_user(
        NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: auth::hash_password(DEMO_PASSWORD, &salt),
            password_salt: salt,
            kind,
            is_guest: true,
            is_staff: false,
        },
        now,
    );
    user.id
}

fn sample_tiers() -> Vec<OfferDetailDraft> {
    [
        (OfferType::Basic, "Basic logo", 2, 5, 100.0, vec!["Logo design", "Business card"]),
        (OfferType::Standard, "Standard logo", 5, 7, 200.0, vec!["Logo design", "Letterhead"]),
        (
            OfferType::Premium,
            "Premium logo",
            -1,
            10,
            500.0,
            vec!["Logo design", "Flyer", "Source files"],
        ),
    ]
    .into_iter()
    .map(|(offer_type, title, revisions, days, price, features)| OfferDetailDraft {
        offer_type,
        title: title.to_string(),
        revisions,
        delivery_time_in_days: days,
        price,
        features: features.into_iter().map(str::to_string).collect(),
    })
    .collect()
}

impl<R> MarketplaceService<R>
where
    R: MarketplaceRepository + 'static,
{
    /// Deletes guest accounts older than `older_than_days`, cascading to
    /// everything they own. A dry run only reports what would go.
    pub fn cleanup_guests(
        &self,
        older_than_days: i64,
        dry_run: bool,
    ) -> Result<GuestCleanupReport, MarketplaceError> {
        if older_than_days < 0 {
            return Err(MarketplaceError::BadRequest(
                "days must not be negative".to_string(),
            ));
        }
        let cutoff = Duration::try_days(older_than_days)
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .ok_or_else(|| MarketplaceError::BadRequest("days is out of range".to_string()))?;

        let report = if dry_run {
            self.repository.read(|data| {
                let guests = expired_guests(data, cutoff);
                GuestCleanupReport {
                    cutoff,
                    dry_run,
                    matched: guests.len(),
                    sample: guests
                        .into_iter()
                        .take(CLEANUP_SAMPLE)
                        .map(|(_, username)| username)
                        .collect(),
                    deleted: DeletionCounts::default(),
                }
            })?
        } else {
            self.repository.write(|data| -> Result<_, MarketplaceError> {
                let guests = expired_guests(data, cutoff);
                let mut deleted = DeletionCounts::default();
                for (id, _) in &guests {
                    deleted.absorb(data.delete_user(*id));
                }
                if deleted.total() > 0 {
                    data.refresh_base_info();
                }
                Ok(GuestCleanupReport {
                    cutoff,
                    dry_run,
                    matched: guests.len(),
                    sample: guests
                        .into_iter()
                        .take(CLEANUP_SAMPLE)
                        .map(|(_, username)| username)
                        .collect(),
                    deleted,
                })
            })?
        };

        info!(
            matched = report.matched,
            dry_run = report.dry_run,
            deleted_rows = report.deleted.total(),
            "guest cleanup finished"
        );
        Ok(report)
    }

    /// Normalizes stored tiers and restores the three-tier shape of every offer.
    pub fn repair(&self) -> Result<RepairReport, MarketplaceError> {
        let report = self.repository.write(|data| -> Result<_, MarketplaceError> {
            let mut report = RepairReport::default();

            for detail in data.details_mut() {
                let revisions = sanitize::clamp_revisions(i64::from(detail.revisions));
                let delivery = detail.delivery_time_in_days.max(1);
                let price = sanitize::clamp_price(detail.price);
                let features: Vec<Feature> = detail
                    .features
                    .iter()
                    .map(|feature| feature.description.trim())
                    .filter(|description| !description.is_empty())
                    .map(Feature::new)
                    .collect();

                if revisions != detail.revisions
                    || delivery != detail.delivery_time_in_days
                    || price != detail.price
                    || features != detail.features
                {
                    detail.revisions = revisions;
                    detail.delivery_time_in_days = delivery;
                    detail.price = price;
                    detail.features = features;
                    report.details_normalized += 1;
                }
            }

            let offers: Vec<_> = data.offers().map(|offer| offer.id).collect();
            report.offers_checked = offers.len();
            for offer in offers {
                let present: Vec<OfferType> = data
                    .details_of(offer)
                    .iter()
                    .map(|detail| detail.offer_type)
                    .collect();
                for offer_type in OfferType::ordered() {
                    if !present.contains(&offer_type) {
                        data.add_detail(offer, OfferDetailDraft::placeholder(offer_type));
                        report.tiers_added += 1;
                    }
                }
            }

            data.refresh_base_info();
            Ok(report)
        })?;

        info!(
            offers = report.offers_checked,
            details_normalized = report.details_normalized,
            tiers_added = report.tiers_added,
            "repair finished"
        );
        Ok(report)
    }

    /// Creates the `andrey` (customer) and `kevin` (business) demo logins and,
    /// on first run, a sample offer with an order and a review.
    pub fn seed_demo(&self) -> Result<DemoAccounts, MarketplaceError> {
        let accounts = self.repository.write(|data| -> Result<_, MarketplaceError> {
            let now = Utc::now();
            let customer = demo_account(data, "andrey", ProfileType::Customer, now);
            let business = demo_account(data, "kevin", ProfileType::Business, now);

            let sample_created = !data.offers().any(|offer| offer.creator == business);
            if sample_created {
                let offer = data.insert_offer(
                    business,
                    "Logo design".to_string(),
                    "A clean, memorable logo for your brand.".to_string(),
                    None,
                    sample_tiers(),
                    now,
                );
                if let Some(basic) = data.details_of(offer).first().map(|detail| detail.id) {
                    let order = data.insert_order(customer, business, basic, now);
                    if let Some(stored) = data.order_mut(order.id) {
                        stored.status = OrderStatus::Completed;
                    }
                }
                if !data.has_review(customer, business) {
                    data.insert_review(customer, business, 5, "Fast and friendly.".to_string(), now)?;
                }
            }

            let customer_token = issue_token(data, customer)?;
            let business_token = issue_token(data, business)?;
            data.refresh_base_info();
            Ok(DemoAccounts {
                customer,
                business,
                customer_token,
                business_token,
                sample_created,
            })
        })?;

        info!(
            customer = %accounts.customer,
            business = %accounts.business,
            sample_created = accounts.sample_created,
            "demo accounts ready"
        );
        Ok(accounts)
    }
}
