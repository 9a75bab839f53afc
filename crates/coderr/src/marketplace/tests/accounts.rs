use super::common::*;
use crate::marketplace::auth::RESERVED_USERNAMES;
use crate::marketplace::domain::{ProfileType, UserId};
use crate::marketplace::payloads::{GuestLoginPayload, LoginPayload, ProfilePatch};
use crate::marketplace::MarketplaceError;

#[test]
fn registration_returns_token_and_creates_profile() {
    let (service, _) = build_service();

    let view = register(&service, "mara", "business");

    assert_eq!(view.username, "mara");
    assert_eq!(view.email, "mara@mail.test");
    assert_eq!(view.kind, ProfileType::Business);
    assert_eq!(view.token.len(), 40);

    let authenticated = service
        .authenticate(Some(&format!("Token {}", view.token)))
        .expect("token accepted")
        .expect("caller resolved");
    assert_eq!(authenticated.id(), view.user_id);
    assert!(authenticated.profile.is_business());
    assert!(!authenticated.profile.is_guest);
}

#[test]
fn registration_rejects_invalid_input() {
    let (service, _) = build_service();
    register(&service, "taken", "customer");

    let mut mismatch = registration("newbie", "customer");
    mismatch.repeated_password = Some("something-else".to_string());

    let mut bad_type = registration("newbie", "customer");
    bad_type.kind = Some("admin".to_string());

    let mut bad_email = registration("newbie", "customer");
    bad_email.email = Some("not-an-email".to_string());

    let mut reused_email = registration("newbie", "customer");
    reused_email.email = Some("TAKEN@mail.test".to_string());

    let cases = vec![
        registration("taken", "customer"),
        registration("has space", "customer"),
        mismatch,
        bad_type,
        bad_email,
        reused_email,
    ];
    for payload in cases {
        let username = payload.username.clone();
        match service.register(payload) {
            Err(MarketplaceError::BadRequest(_)) => {}
            other => panic!("expected bad request for {username:?}, got {other:?}"),
        }
    }
}

#[test]
fn reserved_demo_usernames_cannot_be_registered() {
    let (service, _) = build_service();

    for name in RESERVED_USERNAMES {
        let upper = name.to_uppercase();
        assert!(matches!(
            service.register(registration(&upper, "customer")),
            Err(MarketplaceError::BadRequest(_))
        ));
    }
}

#[test]
fn login_accepts_username_or_email_and_reuses_the_token() {
    let (service, _) = build_service();
    let registered = register(&service, "lena", "customer");

    let by_name = service
        .login(LoginPayload {
            username: Some("lena".to_string()),
            password: Some(PASSWORD.to_string()),
        })
        .expect("login by username");
    let by_email = service
        .login(LoginPayload {
            username: Some("LENA@mail.test".to_string()),
            password: Some(PASSWORD.to_string()),
        })
        .expect("login by email");

    assert_eq!(by_name.token, registered.token);
    assert_eq!(by_email.user_id, registered.user_id);
    assert_eq!(by_email.kind, ProfileType::Customer);
}

#[test]
fn login_with_wrong_password_reports_invalid_credentials() {
    let (service, _) = build_service();
    register(&service, "lena", "customer");

    match service.login(LoginPayload {
        username: Some("lena".to_string()),
        password: Some("wrong".to_string()),
    }) {
        Err(MarketplaceError::BadRequest(message)) => assert_eq!(message, "Invalid credentials"),
        other => panic!("expected invalid credentials, got {other:?}"),
    }
    assert!(matches!(
        service.login(LoginPayload::default()),
        Err(MarketplaceError::BadRequest(_))
    ));
}

#[test]
fn guest_login_creates_guest_accounts() {
    let (service, _) = build_service();

    let customer = service
        .guest_login(GuestLoginPayload::default())
        .expect("guest customer");
    let seller = service
        .guest_login(GuestLoginPayload {
            kind: Some("business".to_string()),
        })
        .expect("guest business");

    assert_eq!(customer.status, "success");
    assert!(customer.is_guest);
    assert!(customer.username.starts_with("guest_"));
    assert_eq!(customer.kind, ProfileType::Customer);
    assert_eq!(seller.kind, ProfileType::Business);
    assert_ne!(customer.user_id, seller.user_id);

    let stored = actor(&service, customer.user_id);
    assert_eq!(stored.user.email, format!("{}@example.com", customer.username));
    assert!(stored.profile.is_guest);

    assert!(matches!(
        service.guest_login(GuestLoginPayload {
            kind: Some("admin".to_string()),
        }),
        Err(MarketplaceError::BadRequest(_))
    ));
}

#[test]
fn unknown_tokens_are_rejected() {
    let (service, _) = build_service();

    assert!(service.authenticate(None).expect("anonymous").is_none());
    assert!(matches!(
        service.authenticate(Some("Token deadbeef")),
        Err(MarketplaceError::Unauthorized(_))
    ));
    assert!(matches!(
        service.authenticate(Some("Basic abc")),
        Err(MarketplaceError::Unauthorized(_))
    ));
}

#[test]
fn profile_reads_require_authentication() {
    let (service, _) = build_service();
    let owner = customer(&service, "olga");

    assert!(matches!(
        service.profile(None, owner.id()),
        Err(MarketplaceError::Unauthorized(_))
    ));
    assert!(matches!(
        service.profile(Some(&owner), UserId(999)),
        Err(MarketplaceError::NotFound(_))
    ));

    let view = service
        .profile(Some(&owner), owner.id())
        .expect("profile visible");
    assert_eq!(view.username, "olga");
    assert_eq!(view.location, "");
    assert!(view.file.is_none());
}

#[test]
fn owners_update_their_profile_with_nulls_stored_as_empty() {
    let (service, _) = build_service();
    let owner = business(&service, "bruno");
    service
        .update_profile(
            Some(&owner),
            owner.id(),
            ProfilePatch {
                location: Some("Berlin".to_string()),
                tel: Some("0301234".to_string()),
                ..ProfilePatch::default()
            },
        )
        .expect("first update");

    let patch: ProfilePatch = serde_json::from_value(serde_json::json!({
        "location": null,
        "working_hours": "9-17",
        "email": "bruno@new.test",
        "file": "avatar.png",
        "ignored": true
    }))
    .expect("patch parses");
    let view = service
        .update_profile(Some(&owner), owner.id(), patch)
        .expect("second update");

    assert_eq!(view.location, "");
    assert_eq!(view.tel, "0301234");
    assert_eq!(view.working_hours, "9-17");
    assert_eq!(view.email, "bruno@new.test");
    assert_eq!(view.file.as_deref(), Some("avatar.png"));
}

#[test]
fn profile_updates_are_owner_only_and_closed_to_guests() {
    let (service, _) = build_service();
    let owner = customer(&service, "olga");
    let stranger = customer(&service, "sven");
    let guest = service
        .guest_login(GuestLoginPayload::default())
        .expect("guest");
    let guest = actor(&service, guest.user_id);

    assert!(matches!(
        service.update_profile(Some(&stranger), owner.id(), ProfilePatch::default()),
        Err(MarketplaceError::Forbidden(_))
    ));
    match service.update_profile(Some(&guest), guest.id(), ProfilePatch::default()) {
        Err(MarketplaceError::Forbidden(message)) => {
            assert_eq!(message, "Guest users cannot update profiles")
        }
        other => panic!("expected guest rejection, got {other:?}"),
    }
    assert!(matches!(
        service.update_profile(
            Some(&owner),
            owner.id(),
            ProfilePatch {
                email: Some("broken".to_string()),
                ..ProfilePatch::default()
            }
        ),
        Err(MarketplaceError::BadRequest(_))
    ));
    assert!(matches!(
        service.update_profile(
            Some(&owner),
            owner.id(),
            ProfilePatch {
                email: Some("sven@mail.test".to_string()),
                ..ProfilePatch::default()
            }
        ),
        Err(MarketplaceError::BadRequest(_))
    ));
}

#[test]
fn profile_lists_are_split_by_type() {
    let (service, _) = build_service();
    let seller = business(&service, "bruno");
    customer(&service, "olga");
    customer(&service, "sven");

    assert!(matches!(
        service.business_profiles(None),
        Err(MarketplaceError::Unauthorized(_))
    ));

    let all = service.profiles(Some(&seller)).expect("all profiles");
    let businesses = service.business_profiles(Some(&seller)).expect("business");
    let customers = service.customer_profiles(Some(&seller)).expect("customers");

    assert_eq!(all.len(), 3);
    assert_eq!(businesses.len(), 1);
    assert_eq!(businesses[0].username, "bruno");
    assert_eq!(customers.len(), 2);
    assert!(customers
        .iter()
        .all(|profile| profile.kind == ProfileType::Customer));
}
