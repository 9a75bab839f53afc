use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::Utc;
use tracing::info;

use super::{not_found, parse_id, MarketplaceError, MarketplaceService};
use crate::marketplace::domain::{
    Actor, Feature, OfferDetailDraft, OfferDetailId, OfferId, OfferType, UserId,
};
use crate::marketplace::pagination::{Page, PageRequest};
use crate::marketplace::payloads::{DetailPayload, OfferPayload, OfferQuery};
use crate::marketplace::permissions;
use crate::marketplace::repository::MarketplaceRepository;
use crate::marketplace::sanitize;
use crate::marketplace::store::MarketplaceData;
use crate::marketplace::views::{OfferDetailView, OfferView, OfferWithDetailsView};

fn bad_request(message: impl Into<String>) -> MarketplaceError {
    MarketplaceError::BadRequest(message.into())
}

/// Parsed offer list filters.
#[derive(Debug, Default)]
struct OfferFilter {
    creator: Option<UserId>,
    min_price: Option<f64>,
    max_delivery_time: Option<u32>,
    search: Option<String>,
}

impl OfferFilter {
    fn from_query(query: &OfferQuery) -> Result<Self, MarketplaceError> {
        let creator = non_blank(query.creator_id.as_deref())
            .map(|raw| parse_id(raw, "creator_id").map(UserId))
            .transpose()?;
        let min_price = non_blank(query.min_price.as_deref())
            .map(|raw| {
                raw.parse::<f64>()
                    .ok()
                    .filter(|price| price.is_finite() && *price >= 0.0)
                    .ok_or_else(|| bad_request("min_price must be a non-negative number"))
            })
            .transpose()?;
        let max_delivery_time = non_blank(query.max_delivery_time.as_deref())
            .map(|raw| {
                raw.parse::<u32>()
                    .map_err(|_| bad_request("max_delivery_time must be a non-negative integer"))
            })
            .transpose()?;
        let search = non_blank(query.search.as_deref()).map(str::to_lowercase);

        Ok(Self {
            creator,
            min_price,
            max_delivery_time,
            search,
        })
    }

    fn matches(&self, data: &MarketplaceData, view: &OfferView) -> bool {
        if self.creator.is_some_and(|creator| creator != view.user) {
            return false;
        }
        let details = data.details_of(view.id);
        if let Some(min_price) = self.min_price {
            if !details.iter().any(|detail| detail.price >= min_price) {
                return false;
            }
        }
        if let Some(max_days) = self.max_delivery_time {
            if !details
                .iter()
                .any(|detail| detail.delivery_time_in_days <= max_days)
            {
                return false;
            }
        }
        match &self.search {
            Some(needle) => {
                view.title.to_lowercase().contains(needle)
                    || view.description.to_lowercase().contains(needle)
            }
            None => true,
        }
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|raw| !raw.is_empty())
}

fn sort_offers(views: &mut [OfferView], ordering: Option<&str>) {
    let newest_first = |a: &OfferView, b: &OfferView| {
        b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
    };
    match non_blank(ordering) {
        Some("updated_at") => {
            views.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)))
        }
        Some("-updated_at") => {
            views.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)))
        }
        Some("min_price") => views.sort_by(|a, b| {
            a.min_price
                .partial_cmp(&b.min_price)
                .unwrap_or(Ordering::Equal)
                .then_with(|| newest_first(a, b))
        }),
        Some("-min_price") => views.sort_by(|a, b| {
            b.min_price
                .partial_cmp(&a.min_price)
                .unwrap_or(Ordering::Equal)
                .then_with(|| newest_first(a, b))
        }),
        _ => views.sort_by(newest_first),
    }
}

fn parse_offer_type(raw: Option<&str>) -> Result<OfferType, MarketplaceError> {
    let raw = non_blank(raw).ok_or_else(|| bad_request("offer_type is required for every detail"))?;
    raw.parse::<OfferType>()
        .map_err(|error| bad_request(format!("offer_type: {error}")))
}

fn draft_from(offer_type: OfferType, payload: &DetailPayload) -> OfferDetailDraft {
    OfferDetailDraft {
        offer_type,
        title: sanitize::title(payload.title.as_ref()),
        revisions: sanitize::revisions(payload.revisions.as_ref()),
        delivery_time_in_days: sanitize::delivery_time(payload.delivery_time_in_days.as_ref()),
        price: sanitize::price(payload.price.as_ref()),
        features: sanitize::features(payload.features.as_ref()),
    }
}

/// One draft per tier: provided tiers are sanitized, missing ones get placeholders.
fn tier_drafts(details: &[DetailPayload]) -> Result<Vec<OfferDetailDraft>, MarketplaceError> {
    let mut drafts = Vec::with_capacity(OfferType::ordered().len());
    let mut seen = BTreeSet::new();
    for detail in details {
        let offer_type = parse_offer_type(detail.offer_type.as_deref())?;
        if !seen.insert(offer_type) {
            return Err(bad_request(format!(
                "offer_type '{}' appears more than once",
                offer_type.as_str()
            )));
        }
        drafts.push(draft_from(offer_type, detail));
    }
    for offer_type in OfferType::ordered() {
        if !seen.contains(&offer_type) {
            drafts.push(OfferDetailDraft::placeholder(offer_type));
        }
    }
    drafts.sort_by_key(|draft| draft.offer_type);
    Ok(drafts)
}

/// Only the creator may edit or delete an offer.
pub(super) fn ensure_offer_owner(
    data: &MarketplaceData,
    actor: &Actor,
    offer: OfferId,
) -> Result<(), MarketplaceError> {
    let creator = data.offer(offer).ok_or_else(|| not_found("offer"))?.creator;
    permissions::owner(actor, creator, "offer")
}

fn required_text(raw: Option<&str>, field: &str) -> Result<String, MarketplaceError> {
    non_blank(raw)
        .map(str::to_string)
        .ok_or_else(|| bad_request(format!("{field} must not be blank")))
}

/// Applies the provided fields of `payload` to an existing detail.
fn apply_detail_patch(
    data: &mut MarketplaceData,
    offer: OfferId,
    payload: &DetailPayload,
) -> Result<(), MarketplaceError> {
    let requested_type = non_blank(payload.offer_type.as_deref())
        .map(|raw| parse_offer_type(Some(raw)))
        .transpose()?;

    let target = match (payload.id, requested_type) {
        (Some(id), requested) => {
            let detail = data
                .detail(OfferDetailId(id))
                .filter(|detail| detail.offer == offer)
                .ok_or_else(|| bad_request(format!("offer detail {id} does not belong to this offer")))?;
            if requested.is_some_and(|requested| requested != detail.offer_type) {
                return Err(bad_request("offer_type of an existing detail cannot be changed"));
            }
            detail.id
        }
        (None, Some(offer_type)) => {
            let existing = data
                .details_of(offer)
                .into_iter()
                .find(|detail| detail.offer_type == offer_type)
                .map(|detail| detail.id);
            match existing {
                Some(id) => id,
                None => data.add_detail(offer, OfferDetailDraft::placeholder(offer_type)),
            }
        }
        (None, None) => {
            return Err(bad_request("each detail needs an id or an offer_type"));
        }
    };

    let detail = data
        .detail_mut(target)
        .ok_or_else(|| not_found("offer detail"))?;
    if payload.title.is_some() {
        detail.title = sanitize::title(payload.title.as_ref());
    }
    if payload.revisions.is_some() {
        detail.revisions = sanitize::revisions(payload.revisions.as_ref());
    }
    if payload.delivery_time_in_days.is_some() {
        detail.delivery_time_in_days = sanitize::delivery_time(payload.delivery_time_in_days.as_ref());
    }
    if payload.price.is_some() {
        detail.price = sanitize::price(payload.price.as_ref());
    }
    if payload.features.is_some() {
        detail.features = sanitize::features(payload.features.as_ref())
            .into_iter()
            .map(Feature::new)
            .collect();
    }
    Ok(())
}

impl<R> MarketplaceService<R>
where
    R: MarketplaceRepository + 'static,
{
    /// Public, filtered and paginated offer listing.
    pub fn list_offers(&self, query: &OfferQuery) -> Result<Page<OfferView>, MarketplaceError> {
        let filter = OfferFilter::from_query(query)?;
        let request = PageRequest::resolve(
            query.page.as_deref(),
            query.page_size.as_deref(),
            self.config.default_page_size,
            self.config.max_page_size,
        )?;

        let mut views = self.repository.read(|data| {
            data.offers()
                .map(|offer| OfferView::build(data, offer))
                .filter(|view| filter.matches(data, view))
                .collect::<Vec<_>>()
        })?;
        sort_offers(&mut views, query.ordering.as_deref());

        Page::paginate(views, request, |page| query.link(page))
    }

    pub fn offer(&self, actor: Option<&Actor>, offer: OfferId) -> Result<OfferView, MarketplaceError> {
        permissions::authenticated(actor)?;
        self.repository
            .read(|data| data.offer(offer).map(|found| OfferView::build(data, found)))?
            .ok_or_else(|| not_found("offer"))
    }

    pub fn offer_detail(&self, detail: OfferDetailId) -> Result<OfferDetailView, MarketplaceError> {
        self.repository
            .read(|data| data.detail(detail).map(OfferDetailView::from))?
            .ok_or_else(|| not_found("offer detail"))
    }

    pub fn create_offer(
        &self,
        actor: Option<&Actor>,
        payload: OfferPayload,
    ) -> Result<OfferWithDetailsView, MarketplaceError> {
        let actor = permissions::business(actor)?;
        let title = required_text(payload.title.as_deref(), "title")?;
        let description = required_text(payload.description.as_deref(), "description")?;
        let image = sanitize::image(payload.image.as_deref()).map_err(bad_request)?;
        let drafts = tier_drafts(payload.details.as_deref().unwrap_or_default())?;

        let view = self.repository.write(|data| {
            let id = data.insert_offer(actor.id(), title, description, image, drafts, Utc::now());
            data.refresh_base_info();
            data.offer(id)
                .map(|offer| OfferWithDetailsView::build(data, offer))
                .ok_or_else(|| not_found("offer"))
        })?;

        info!(offer_id = %view.id, creator = %actor.id(), "offer created");
        Ok(view)
    }

    /// Partial update by the creator; tiers are matched by id or offer type.
    pub fn update_offer(
        &self,
        actor: Option<&Actor>,
        offer: OfferId,
        payload: OfferPayload,
    ) -> Result<OfferWithDetailsView, MarketplaceError> {
        let actor = permissions::authenticated(actor)?;

        let view = self.repository.write(|data| -> Result<_, MarketplaceError> {
            ensure_offer_owner(data, actor, offer)?;

            let title = payload
                .title
                .as_deref()
                .map(|raw| required_text(Some(raw), "title"))
                .transpose()?;
            let description = payload
                .description
                .as_deref()
                .map(|raw| required_text(Some(raw), "description"))
                .transpose()?;
            let image = match non_blank(payload.image.as_deref()) {
                Some(raw) => sanitize::image(Some(raw)).map_err(bad_request)?,
                None => None,
            };

            for detail in payload.details.as_deref().unwrap_or_default() {
                apply_detail_patch(data, offer, detail)?;
            }

            let stored = data.offer_mut(offer).ok_or_else(|| not_found("offer"))?;
            if let Some(title) = title {
                stored.title = title;
            }
            if let Some(description) = description {
                stored.description = description;
            }
            if let Some(image) = image {
                stored.image = Some(image);
            }
            stored.updated_at = Utc::now();

            let stored = data.offer(offer).ok_or_else(|| not_found("offer"))?;
            Ok(OfferWithDetailsView::build(data, stored))
        })?;

        info!(offer_id = %offer, "offer updated");
        Ok(view)
    }

    pub fn delete_offer(&self, actor: Option<&Actor>, offer: OfferId) -> Result<(), MarketplaceError> {
        let actor = permissions::authenticated(actor)?;

        let removed = self.repository.write(|data| -> Result<_, MarketplaceError> {
            ensure_offer_owner(data, actor, offer)?;
            let removed = data.delete_offer(offer);
            data.refresh_base_info();
            Ok(removed)
        })?;

        info!(
            offer_id = %offer,
            details = removed.offer_details,
            orders = removed.orders,
            "offer deleted"
        );
        Ok(())
    }
}
