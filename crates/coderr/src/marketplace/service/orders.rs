use chrono::Utc;
use tracing::info;

use super::{not_found, parse_id, MarketplaceError, MarketplaceService};
use crate::marketplace::domain::{Actor, OfferDetailId, OrderId, OrderStatus, UserId};
use crate::marketplace::payloads::{self, OrderPayload, OrderStatusPatch};
use crate::marketplace::permissions;
use crate::marketplace::repository::MarketplaceRepository;
use crate::marketplace::store::MarketplaceData;
use crate::marketplace::views::{CompletedOrderCountView, OrderCountView, OrderView};

/// Status changes are reserved for the business user fulfilling the order.
pub(super) fn ensure_order_business_user(
    data: &MarketplaceData,
    actor: &Actor,
    order: OrderId,
) -> Result<(), MarketplaceError> {
    let business_user = data
        .order(order)
        .map(|found| found.business_user)
        .ok_or_else(|| not_found("order"))?;
    if actor.profile.is_business() && actor.id() == business_user {
        Ok(())
    } else {
        Err(MarketplaceError::Forbidden(
            "only the business user of this order may update it".to_string(),
        ))
    }
}

impl<R> MarketplaceService<R>
where
    R: MarketplaceRepository + 'static,
{
    /// Business users see the orders they fulfil, customers the ones they placed.
    pub fn list_orders(&self, actor: Option<&Actor>) -> Result<Vec<OrderView>, MarketplaceError> {
        let actor = permissions::authenticated(actor)?;
        let as_business = actor.profile.is_business();
        let caller = actor.id();

        Ok(self.repository.read(|data| {
            let mut orders: Vec<_> = data
                .orders()
                .filter(|order| {
                    if as_business {
                        order.business_user == caller
                    } else {
                        order.customer == caller
                    }
                })
                .collect();
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            orders
                .into_iter()
                .map(|order| OrderView::build(data, order))
                .collect()
        })?)
    }

    pub fn create_order(
        &self,
        actor: Option<&Actor>,
        payload: OrderPayload,
    ) -> Result<OrderView, MarketplaceError> {
        let actor = permissions::customer(actor)?;
        let raw = payload
            .offer_detail_id
            .ok_or_else(|| MarketplaceError::BadRequest("offer_detail_id is required".to_string()))?;
        let detail = payloads::integer(&raw)
            .and_then(|id| u64::try_from(id).ok())
            .map(OfferDetailId)
            .ok_or_else(|| {
                MarketplaceError::BadRequest("offer_detail_id must be an integer".to_string())
            })?;

        let view = self.repository.write(|data| -> Result<_, MarketplaceError> {
            let offer = data
                .detail(detail)
                .map(|found| found.offer)
                .ok_or_else(|| not_found("offer detail"))?;
            let business_user = data
                .offer(offer)
                .map(|found| found.creator)
                .ok_or_else(|| not_found("offer"))?;
            let order = data.insert_order(actor.id(), business_user, detail, Utc::now());
            Ok(OrderView::build(data, &order))
        })?;

        info!(
            order_id = %view.id,
            customer = %view.customer_user,
            business = %view.business_user,
            "order placed"
        );
        Ok(view)
    }

    pub fn update_order_status(
        &self,
        actor: Option<&Actor>,
        order: OrderId,
        patch: OrderStatusPatch,
    ) -> Result<OrderView, MarketplaceError> {
        let actor = permissions::authenticated(actor)?;

        let view = self.repository.write(|data| -> Result<_, MarketplaceError> {
            ensure_order_business_user(data, actor, order)?;
            if let Some(field) = patch.unexpected.keys().next() {
                return Err(MarketplaceError::BadRequest(format!(
                    "only status can be updated, '{field}' is not allowed"
                )));
            }
            let status = patch
                .status
                .as_deref()
                .ok_or_else(|| MarketplaceError::BadRequest("status is required".to_string()))?
                .parse::<OrderStatus>()
                .map_err(|error| MarketplaceError::BadRequest(format!("status: {error}")))?;

            let stored = data.order_mut(order).ok_or_else(|| not_found("order"))?;
            stored.status = status;
            stored.updated_at = Utc::now();
            let stored = stored.clone();
            if status == OrderStatus::Completed {
                data.refresh_base_info();
            }
            Ok(OrderView::build(data, &stored))
        })?;

        info!(order_id = %order, status = view.status.as_str(), "order status updated");
        Ok(view)
    }

    pub fn delete_order(&self, actor: Option<&Actor>, order: OrderId) -> Result<(), MarketplaceError> {
        permissions::staff(actor)?;
        self.repository.write(|data| -> Result<_, MarketplaceError> {
            data.delete_order(order).ok_or_else(|| not_found("order"))?;
            data.refresh_base_info();
            Ok(())
        })?;
        info!(order_id = %order, "order deleted");
        Ok(())
    }

    /// Number of orders still in progress for a business user.
    pub fn order_count(
        &self,
        actor: Option<&Actor>,
        business_user: &str,
    ) -> Result<OrderCountView, MarketplaceError> {
        let order_count = self.count_for_business(actor, business_user, OrderStatus::InProgress)?;
        Ok(OrderCountView { order_count })
    }

    pub fn completed_order_count(
        &self,
        actor: Option<&Actor>,
        business_user: &str,
    ) -> Result<CompletedOrderCountView, MarketplaceError> {
        let completed_order_count =
            self.count_for_business(actor, business_user, OrderStatus::Completed)?;
        Ok(CompletedOrderCountView {
            completed_order_count,
        })
    }

    fn count_for_business(
        &self,
        actor: Option<&Actor>,
        business_user: &str,
        status: OrderStatus,
    ) -> Result<usize, MarketplaceError> {
        permissions::authenticated(actor)?;
        let business_user = UserId(parse_id(business_user, "business_user_id")?);

        self.repository.read(|data| -> Result<usize, MarketplaceError> {
            let profile = data
                .profile(business_user)
                .ok_or_else(|| not_found("business user"))?;
            if !profile.is_business() {
                return Err(MarketplaceError::BadRequest(
                    "user is not a business user".to_string(),
                ));
            }
            Ok(data.count_orders(business_user, status))
        })?
    }
}
