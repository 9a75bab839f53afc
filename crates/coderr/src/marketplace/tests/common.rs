use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use serde_json::{json, Value};

use crate::config::MarketplaceConfig;
use crate::marketplace::domain::{Actor, OfferId, UserId};
use crate::marketplace::payloads::{DetailPayload, OfferPayload, RegistrationPayload};
use crate::marketplace::repository::{
    InMemoryMarketplaceRepository, MarketplaceRepository, RepositoryError,
};
use crate::marketplace::store::MarketplaceData;
use crate::marketplace::views::AuthView;
use crate::marketplace::{marketplace_router, MarketplaceService};

pub(super) type Service = MarketplaceService<InMemoryMarketplaceRepository>;

pub(super) const PASSWORD: &str = "correct-horse-7";

pub(super) fn marketplace_config() -> MarketplaceConfig {
    MarketplaceConfig {
        data_file: None,
        default_page_size: 6,
        max_page_size: 100,
        guest_retention_days: 7,
    }
}

pub(super) fn build_service() -> (Service, Arc<InMemoryMarketplaceRepository>) {
    let repository = Arc::new(InMemoryMarketplaceRepository::new());
    let service = MarketplaceService::new(repository.clone(), marketplace_config());
    (service, repository)
}

pub(super) fn registration(username: &str, kind: &str) -> RegistrationPayload {
    RegistrationPayload {
        username: Some(username.to_string()),
        email: Some(format!("{username}@mail.test")),
        password: Some(PASSWORD.to_string()),
        repeated_password: Some(PASSWORD.to_string()),
        kind: Some(kind.to_string()),
        first_name: Some(format!("{username}-first")),
        last_name: Some(format!("{username}-last")),
    }
}

pub(super) fn register(service: &Service, username: &str, kind: &str) -> AuthView {
    service
        .register(registration(username, kind))
        .expect("registration succeeds")
}

pub(super) fn actor(service: &Service, user: UserId) -> Actor {
    service
        .repository()
        .read(|data| data.actor(user))
        .expect("read succeeds")
        .expect("actor exists")
}

pub(super) fn business(service: &Service, username: &str) -> Actor {
    let view = register(service, username, "business");
    actor(service, view.user_id)
}

pub(super) fn customer(service: &Service, username: &str) -> Actor {
    let view = register(service, username, "customer");
    actor(service, view.user_id)
}

pub(super) fn make_staff(service: &Service, user: UserId) -> Actor {
    service
        .repository()
        .write(|data| {
            data.user_mut(user).expect("user exists").is_staff = true;
            Ok::<_, RepositoryError>(())
        })
        .expect("write succeeds");
    actor(service, user)
}

pub(super) fn detail(offer_type: &str, price: f64, days: u32) -> DetailPayload {
    DetailPayload {
        id: None,
        offer_type: Some(offer_type.to_string()),
        title: Some(json!(format!("{offer_type} package"))),
        revisions: Some(json!(3)),
        delivery_time_in_days: Some(json!(days)),
        price: Some(json!(price)),
        features: Some(json!(["Logo Design", "Business card"])),
    }
}

pub(super) fn offer_payload(title: &str) -> OfferPayload {
    OfferPayload {
        title: Some(title.to_string()),
        description: Some(format!("{title} for growing brands")),
        image: None,
        details: Some(vec![
            detail("basic", 100.0, 7),
            detail("standard", 200.0, 5),
            detail("premium", 500.0, 3),
        ]),
    }
}

pub(super) fn publish(service: &Service, seller: &Actor, title: &str) -> OfferId {
    service
        .create_offer(Some(seller), offer_payload(title))
        .expect("offer created")
        .id
}

pub(super) fn router_with_service(service: Service) -> axum::Router {
    marketplace_router(Arc::new(service))
}

pub(super) fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("serializable body")))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Repository whose storage is offline.
pub(super) struct UnavailableRepository;

impl MarketplaceRepository for UnavailableRepository {
    fn read<T, F>(&self, _f: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&MarketplaceData) -> T,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn write<T, E, F>(&self, _f: F) -> Result<T, E>
    where
        F: FnOnce(&mut MarketplaceData) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(E::from(RepositoryError::Unavailable(
            "database offline".to_string(),
        )))
    }
}
