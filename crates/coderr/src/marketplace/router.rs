use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use super::domain::{Actor, OfferDetailId, OfferId, OrderId, ReviewId, UserId};
use super::payloads::{
    GuestLoginPayload, LoginPayload, OfferPayload, OfferQuery, OrderPayload, OrderStatusPatch,
    ProfilePatch, RegistrationPayload, ReviewPatch, ReviewPayload, ReviewQuery,
};
use super::repository::{MarketplaceRepository, RepositoryError};
use super::service::{Access, MarketplaceError, MarketplaceService};

type SharedService<R> = State<Arc<MarketplaceService<R>>>;

/// Router exposing the marketplace REST API under `/api/`.
pub fn marketplace_router<R>(service: Arc<MarketplaceService<R>>) -> Router
where
    R: MarketplaceRepository + 'static,
{
    Router::new()
        .route("/api/registration/", post(registration_handler::<R>))
        .route("/api/login/", post(login_handler::<R>))
        .route("/api/guest-login/", post(guest_login_handler::<R>))
        .route(
            "/api/profile/:user_id/",
            get(profile_handler::<R>).patch(update_profile_handler::<R>),
        )
        .route(
            "/api/profile/user/:user_id/",
            get(profile_handler::<R>).patch(update_profile_handler::<R>),
        )
        .route("/api/profiles/", get(profiles_handler::<R>))
        .route("/api/profiles/business/", get(business_profiles_handler::<R>))
        .route("/api/profiles/customer/", get(customer_profiles_handler::<R>))
        .route(
            "/api/offers/",
            get(list_offers_handler::<R>).post(create_offer_handler::<R>),
        )
        .route(
            "/api/offers/:offer_id/",
            get(offer_handler::<R>)
                .patch(update_offer_handler::<R>)
                .delete(delete_offer_handler::<R>),
        )
        .route("/api/offerdetails/:detail_id/", get(offer_detail_handler::<R>))
        .route(
            "/api/orders/",
            get(list_orders_handler::<R>).post(create_order_handler::<R>),
        )
        .route(
            "/api/orders/:order_id/",
            patch(update_order_handler::<R>).delete(delete_order_handler::<R>),
        )
        .route("/api/order-count/:business_user_id/", get(order_count_handler::<R>))
        .route(
            "/api/orders/order-count/:business_user_id/",
            get(order_count_handler::<R>),
        )
        .route(
            "/api/completed-order-count/:business_user_id/",
            get(completed_order_count_handler::<R>),
        )
        .route(
            "/api/orders/completed-order-count/:business_user_id/",
            get(completed_order_count_handler::<R>),
        )
        .route(
            "/api/reviews/",
            get(list_reviews_handler::<R>).post(create_review_handler::<R>),
        )
        .route(
            "/api/reviews/:review_id/",
            patch(update_review_handler::<R>).delete(delete_review_handler::<R>),
        )
        .route(
            "/api/reviews/business/:business_user_id/",
            get(business_reviews_handler::<R>),
        )
        .route(
            "/api/reviews/reviewer/:reviewer_id/",
            get(reviewer_reviews_handler::<R>),
        )
        .route("/api/base-info/", get(base_info_handler::<R>))
        .with_state(service)
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = match &self {
            MarketplaceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            MarketplaceError::Forbidden(_) => StatusCode::FORBIDDEN,
            MarketplaceError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketplaceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            MarketplaceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            MarketplaceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            MarketplaceError::Repository(other) => {
                error!(error = %other, "marketplace storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, MarketplaceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error.into_response(),
    }
}

fn no_content(result: Result<(), MarketplaceError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error.into_response(),
    }
}

fn caller<R>(service: &MarketplaceService<R>, headers: &HeaderMap) -> Result<Option<Actor>, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
{
    let header = headers
        .get(AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default());
    service.authenticate(header)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, MarketplaceError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| MarketplaceError::BadRequest(rejection.body_text()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, MarketplaceError> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| MarketplaceError::BadRequest(rejection.body_text()))
}

/// Resource ids in the path; anything non-numeric cannot name a resource.
fn path_id(raw: &str) -> Result<u64, MarketplaceError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| MarketplaceError::NotFound("not found".to_string()))
}

pub(crate) async fn registration_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    payload: Result<Json<RegistrationPayload>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers)
        .and_then(|_| body(payload))
        .and_then(|payload| service.register(payload));
    respond(StatusCode::OK, result)
}

pub(crate) async fn login_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers)
        .and_then(|_| body(payload))
        .and_then(|payload| service.login(payload));
    respond(StatusCode::OK, result)
}

/// The body is optional here, so it is read raw instead of through `Json`.
pub(crate) async fn guest_login_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    raw: Bytes,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers)
        .and_then(|_| {
            if raw.iter().all(u8::is_ascii_whitespace) {
                Ok(GuestLoginPayload::default())
            } else {
                serde_json::from_slice::<GuestLoginPayload>(&raw)
                    .map_err(|error| MarketplaceError::BadRequest(error.to_string()))
            }
        })
        .and_then(|payload| service.guest_login(payload));
    respond(StatusCode::OK, result)
}

pub(crate) async fn profile_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers).and_then(|actor| {
        let user = UserId(path_id(&user_id)?);
        service.profile(actor.as_ref(), user)
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn update_profile_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    payload: Result<Json<ProfilePatch>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers).and_then(|actor| {
        let user = UserId(path_id(&user_id)?);
        service.authorize(actor.as_ref(), Access::EditProfile(user))?;
        service.update_profile(actor.as_ref(), user, body(payload)?)
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn profiles_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers).and_then(|actor| service.profiles(actor.as_ref()));
    respond(StatusCode::OK, result)
}

pub(crate) async fn business_profiles_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result =
        caller(&service, &headers).and_then(|actor| service.business_profiles(actor.as_ref()));
    respond(StatusCode::OK, result)
}

pub(crate) async fn customer_profiles_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result =
        caller(&service, &headers).and_then(|actor| service.customer_profiles(actor.as_ref()));
    respond(StatusCode::OK, result)
}

pub(crate) async fn list_offers_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    params: Result<Query<OfferQuery>, QueryRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers)
        .and_then(|_| query(params))
        .and_then(|params| service.list_offers(&params));
    respond(StatusCode::OK, result)
}

pub(crate) async fn offer_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(offer_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers).and_then(|actor| {
        let offer = OfferId(path_id(&offer_id)?);
        service.offer(actor.as_ref(), offer)
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn create_offer_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    payload: Result<Json<OfferPayload>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers).and_then(|actor| {
        service.authorize(actor.as_ref(), Access::CreateOffer)?;
        service.create_offer(actor.as_ref(), body(payload)?)
    });
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn update_offer_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(offer_id): Path<String>,
    payload: Result<Json<OfferPayload>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers).and_then(|actor| {
        let offer = OfferId(path_id(&offer_id)?);
        service.authorize(actor.as_ref(), Access::EditOffer(offer))?;
        service.update_offer(actor.as_ref(), offer, body(payload)?)
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn delete_offer_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(offer_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    no_content(caller(&service, &headers).and_then(|actor| {
        let offer = OfferId(path_id(&offer_id)?);
        service.delete_offer(actor.as_ref(), offer)
    }))
}

pub(crate) async fn offer_detail_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(detail_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers).and_then(|_| {
        let detail = OfferDetailId(path_id(&detail_id)?);
        service.offer_detail(detail)
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn list_orders_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers).and_then(|actor| service.list_orders(actor.as_ref()));
    respond(StatusCode::OK, result)
}

pub(crate) async fn create_order_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    payload: Result<Json<OrderPayload>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers).and_then(|actor| {
        service.authorize(actor.as_ref(), Access::PlaceOrder)?;
        service.create_order(actor.as_ref(), body(payload)?)
    });
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn update_order_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(order_id): Path<String>,
    payload: Result<Json<OrderStatusPatch>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers).and_then(|actor| {
        let order = OrderId(path_id(&order_id)?);
        service.authorize(actor.as_ref(), Access::UpdateOrder(order))?;
        service.update_order_status(actor.as_ref(), order, body(payload)?)
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn delete_order_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(order_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    no_content(caller(&service, &headers).and_then(|actor| {
        let order = OrderId(path_id(&order_id)?);
        service.delete_order(actor.as_ref(), order)
    }))
}

pub(crate) async fn order_count_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(business_user_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers)
        .and_then(|actor| service.order_count(actor.as_ref(), &business_user_id));
    respond(StatusCode::OK, result)
}

pub(crate) async fn completed_order_count_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(business_user_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers)
        .and_then(|actor| service.completed_order_count(actor.as_ref(), &business_user_id));
    respond(StatusCode::OK, result)
}

pub(crate) async fn list_reviews_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    params: Result<Query<ReviewQuery>, QueryRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers)
        .and_then(|actor| service.list_reviews(actor.as_ref(), &query(params)?));
    respond(StatusCode::OK, result)
}

pub(crate) async fn create_review_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    payload: Result<Json<ReviewPayload>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers).and_then(|actor| {
        service.authorize(actor.as_ref(), Access::WriteReview)?;
        service.create_review(actor.as_ref(), body(payload)?)
    });
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn update_review_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(review_id): Path<String>,
    payload: Result<Json<ReviewPatch>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers).and_then(|actor| {
        let review = ReviewId(path_id(&review_id)?);
        service.authorize(actor.as_ref(), Access::EditReview(review))?;
        service.update_review(actor.as_ref(), review, body(payload)?)
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn delete_review_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(review_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    no_content(caller(&service, &headers).and_then(|actor| {
        let review = ReviewId(path_id(&review_id)?);
        service.delete_review(actor.as_ref(), review)
    }))
}

pub(crate) async fn business_reviews_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(business_user_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers)
        .and_then(|_| service.reviews_for_business(&business_user_id));
    respond(StatusCode::OK, result)
}

pub(crate) async fn reviewer_reviews_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(reviewer_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result =
        caller(&service, &headers).and_then(|_| service.reviews_by_reviewer(&reviewer_id));
    respond(StatusCode::OK, result)
}

pub(crate) async fn base_info_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let result = caller(&service, &headers).and_then(|_| service.base_info());
    respond(StatusCode::OK, result)
}
