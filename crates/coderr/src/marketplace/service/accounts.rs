use chrono::Utc;
use tracing::{info, warn};

use super::{issue_token, not_found, MarketplaceError, MarketplaceService};
use crate::marketplace::auth;
use crate::marketplace::domain::{Actor, Profile, ProfileType, User, UserId};
use crate::marketplace::payloads::{GuestLoginPayload, LoginPayload, ProfilePatch, RegistrationPayload};
use crate::marketplace::permissions;
use crate::marketplace::repository::MarketplaceRepository;
use crate::marketplace::store::{MarketplaceData, NewUser};
use crate::marketplace::views::{
    AuthView, BusinessProfileView, CustomerProfileView, GuestLoginView, ProfileView,
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

fn bad_request(message: impl Into<String>) -> MarketplaceError {
    MarketplaceError::BadRequest(message.into())
}

fn parse_profile_type(raw: Option<&str>) -> Result<ProfileType, MarketplaceError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(bad_request("type is required"));
    }
    raw.parse::<ProfileType>()
        .map_err(|error| bad_request(format!("type: {error}")))
}

fn profile_pairs(
    data: &MarketplaceData,
    kind: Option<ProfileType>,
) -> Vec<(&User, &Profile)> {
    data.profiles(kind)
        .into_iter()
        .filter_map(|profile| data.user(profile.user).map(|user| (user, profile)))
        .collect()
}

/// Owners may edit their profile unless it belongs to a guest account.
pub(super) fn ensure_profile_editable(
    data: &MarketplaceData,
    actor: &Actor,
    user: UserId,
) -> Result<(), MarketplaceError> {
    let profile = data.profile(user).ok_or_else(|| not_found("profile"))?;
    permissions::owner(actor, profile.user, "profile")?;
    if profile.is_guest {
        return Err(MarketplaceError::Forbidden(
            "Guest users cannot update profiles".to_string(),
        ));
    }
    Ok(())
}

impl<R> MarketplaceService<R>
where
    R: MarketplaceRepository + 'static,
{
    pub fn register(&self, payload: RegistrationPayload) -> Result<AuthView, MarketplaceError> {
        let username = payload.username.unwrap_or_default().trim().to_string();
        auth::validate_username(&username).map_err(bad_request)?;
        if auth::is_reserved_username(&username) {
            return Err(bad_request("this username is reserved for demo accounts"));
        }

        let email = payload.email.unwrap_or_default().trim().to_string();
        if email.is_empty() {
            return Err(bad_request("email is required"));
        }
        if !auth::is_valid_email(&email) {
            return Err(bad_request("enter a valid email address"));
        }

        let password = payload.password.unwrap_or_default();
        if password.is_empty() {
            return Err(bad_request("password is required"));
        }
        if payload.repeated_password.as_deref() != Some(password.as_str()) {
            return Err(bad_request("passwords do not match"));
        }

        let kind = parse_profile_type(payload.kind.as_deref())?;
        let salt = auth::new_salt();
        let new_user = NewUser {
            username,
            email,
            first_name: payload.first_name.unwrap_or_default().trim().to_string(),
            last_name: payload.last_name.unwrap_or_default().trim().to_string(),
            password_hash: auth::hash_password(&password, &salt),
            password_salt: salt,
            kind,
            is_guest: false,
            is_staff: false,
        };

        let view = self.repository.write(|data| -> Result<AuthView, MarketplaceError> {
            if data.user_by_username(&new_user.username).is_some() {
                return Err(bad_request("a user with that username already exists"));
            }
            if data.user_by_email(&new_user.email).is_some() {
                return Err(bad_request("a user with that email already exists"));
            }
            let (user, profile) = data.create_user(new_user, Utc::now());
            let token = issue_token(data, user.id)?;
            data.refresh_base_info();
            Ok(AuthView {
                token,
                user_id: user.id,
                username: user.username,
                email: user.email,
                kind: profile.kind,
            })
        })?;

        info!(user_id = %view.user_id, kind = view.kind.as_str(), "user registered");
        Ok(view)
    }

    /// Accepts either the username or the email address as the login name.
    pub fn login(&self, payload: LoginPayload) -> Result<AuthView, MarketplaceError> {
        let login = payload.username.unwrap_or_default().trim().to_string();
        let password = payload.password.unwrap_or_default();
        if login.is_empty() || password.is_empty() {
            return Err(bad_request("username and password are required"));
        }

        let result = self.repository.write(|data| -> Result<AuthView, MarketplaceError> {
            let user = data
                .user_by_username(&login)
                .or_else(|| {
                    login
                        .contains('@')
                        .then(|| data.user_by_email(&login))
                        .flatten()
                })
                .filter(|user| {
                    auth::verify_password(&password, &user.password_salt, &user.password_hash)
                })
                .cloned()
                .ok_or_else(|| bad_request(INVALID_CREDENTIALS))?;
            let kind = data
                .profile(user.id)
                .map(|profile| profile.kind)
                .unwrap_or(ProfileType::Customer);
            let token = issue_token(data, user.id)?;
            Ok(AuthView {
                token,
                user_id: user.id,
                username: user.username,
                email: user.email,
                kind,
            })
        });

        match result {
            Ok(view) => {
                info!(user_id = %view.user_id, "user logged in");
                Ok(view)
            }
            Err(error) => {
                warn!(%error, "login rejected");
                Err(error)
            }
        }
    }

    /// Creates a throwaway guest account with a random password.
    pub fn guest_login(&self, payload: GuestLoginPayload) -> Result<GuestLoginView, MarketplaceError> {
        let kind = match payload.kind.as_deref().map(str::trim) {
            None | Some("") => ProfileType::Customer,
            Some(raw) => raw
                .parse::<ProfileType>()
                .map_err(|error| bad_request(format!("type: {error}")))?,
        };

        let view = self.repository.write(|data| -> Result<GuestLoginView, MarketplaceError> {
            let mut username = auth::guest_username();
            while data.user_by_username(&username).is_some() {
                username = auth::guest_username();
            }
            let salt = auth::new_salt();
            let new_user = NewUser {
                email: format!("{username}@example.com"),
                username,
                first_name: String::new(),
                last_name: String::new(),
                password_hash: auth::hash_password(&auth::new_salt(), &salt),
                password_salt: salt,
                kind,
                is_guest: true,
                is_staff: false,
            };
            let (user, profile) = data.create_user(new_user, Utc::now());
            let token = issue_token(data, user.id)?;
            data.refresh_base_info();
            Ok(GuestLoginView {
                status: "success",
                token,
                user_id: user.id,
                username: user.username,
                is_guest: profile.is_guest,
                kind: profile.kind,
            })
        })?;

        info!(user_id = %view.user_id, kind = view.kind.as_str(), "guest account created");
        Ok(view)
    }

    pub fn profile(&self, actor: Option<&Actor>, user: UserId) -> Result<ProfileView, MarketplaceError> {
        permissions::authenticated(actor)?;
        self.repository
            .read(|data| {
                let account = data.user(user)?;
                let profile = data.profile(user)?;
                Some(ProfileView::new(account, profile))
            })?
            .ok_or_else(|| not_found("profile"))
    }

    /// Applies a partial update; only the owner of a non-guest account may edit.
    pub fn update_profile(
        &self,
        actor: Option<&Actor>,
        user: UserId,
        patch: ProfilePatch,
    ) -> Result<ProfileView, MarketplaceError> {
        let actor = permissions::authenticated(actor)?;

        let view = self.repository.write(|data| -> Result<ProfileView, MarketplaceError> {
            ensure_profile_editable(data, actor, user)?;

            let email = match patch.email.as_deref().map(str::trim) {
                None => None,
                Some(email) if !auth::is_valid_email(email) => {
                    return Err(bad_request("enter a valid email address"));
                }
                Some(email) => {
                    if data
                        .user_by_email(email)
                        .is_some_and(|other| other.id != user)
                    {
                        return Err(bad_request("a user with that email already exists"));
                    }
                    Some(email.to_string())
                }
            };

            let account = data.user_mut(user).ok_or_else(|| not_found("profile"))?;
            if let Some(email) = email {
                account.email = email;
            }
            if let Some(first_name) = patch.first_name {
                account.first_name = first_name;
            }
            if let Some(last_name) = patch.last_name {
                account.last_name = last_name;
            }

            let profile = data.profile_mut(user).ok_or_else(|| not_found("profile"))?;
            if let Some(file) = patch.file {
                profile.file = Some(file).filter(|file| !file.trim().is_empty());
            }
            if let Some(location) = patch.location {
                profile.location = location;
            }
            if let Some(tel) = patch.tel {
                profile.tel = tel;
            }
            if let Some(description) = patch.description {
                profile.description = description;
            }
            if let Some(working_hours) = patch.working_hours {
                profile.working_hours = working_hours;
            }

            let account = data.user(user).ok_or_else(|| not_found("profile"))?;
            let profile = data.profile(user).ok_or_else(|| not_found("profile"))?;
            Ok(ProfileView::new(account, profile))
        })?;

        info!(user_id = %user, "profile updated");
        Ok(view)
    }

    pub fn profiles(&self, actor: Option<&Actor>) -> Result<Vec<ProfileView>, MarketplaceError> {
        permissions::authenticated(actor)?;
        Ok(self.repository.read(|data| {
            profile_pairs(data, None)
                .into_iter()
                .map(|(user, profile)| ProfileView::new(user, profile))
                .collect()
        })?)
    }

    pub fn business_profiles(
        &self,
        actor: Option<&Actor>,
    ) -> Result<Vec<BusinessProfileView>, MarketplaceError> {
        permissions::authenticated(actor)?;
        Ok(self.repository.read(|data| {
            profile_pairs(data, Some(ProfileType::Business))
                .into_iter()
                .map(|(user, profile)| BusinessProfileView::new(user, profile))
                .collect()
        })?)
    }

    pub fn customer_profiles(
        &self,
        actor: Option<&Actor>,
    ) -> Result<Vec<CustomerProfileView>, MarketplaceError> {
        permissions::authenticated(actor)?;
        Ok(self.repository.read(|data| {
            profile_pairs(data, Some(ProfileType::Customer))
                .into_iter()
                .map(|(user, profile)| CustomerProfileView::new(user, profile))
                .collect()
        })?)
    }
}
