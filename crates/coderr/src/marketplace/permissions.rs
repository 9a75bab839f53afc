//! Per-action access rules. Each check returns the caller on success so
//! handlers can chain them with `?`.

use super::domain::{Actor, UserId};
use super::service::MarketplaceError;

pub(crate) const NOT_AUTHENTICATED: &str = "authentication credentials were not provided";

pub(crate) fn authenticated(actor: Option<&Actor>) -> Result<&Actor, MarketplaceError> {
    actor.ok_or_else(|| MarketplaceError::Unauthorized(NOT_AUTHENTICATED.to_string()))
}

pub(crate) fn business(actor: Option<&Actor>) -> Result<&Actor, MarketplaceError> {
    let actor = authenticated(actor)?;
    if actor.profile.is_business() {
        Ok(actor)
    } else {
        Err(MarketplaceError::Forbidden(
            "authenticated user does not have a business profile".to_string(),
        ))
    }
}

pub(crate) fn customer(actor: Option<&Actor>) -> Result<&Actor, MarketplaceError> {
    let actor = authenticated(actor)?;
    if actor.profile.is_customer() {
        Ok(actor)
    } else {
        Err(MarketplaceError::Forbidden(
            "only customer profiles may place orders".to_string(),
        ))
    }
}

/// Reviews report a missing customer profile as an authentication failure.
pub(crate) fn reviewing_customer(actor: Option<&Actor>) -> Result<&Actor, MarketplaceError> {
    match actor {
        Some(actor) if actor.profile.is_customer() => Ok(actor),
        _ => Err(MarketplaceError::Unauthorized(
            "user must be authenticated and have a customer profile".to_string(),
        )),
    }
}

pub(crate) fn staff(actor: Option<&Actor>) -> Result<&Actor, MarketplaceError> {
    let actor = authenticated(actor)?;
    if actor.user.is_staff {
        Ok(actor)
    } else {
        Err(MarketplaceError::Forbidden(
            "only staff members may delete orders".to_string(),
        ))
    }
}

pub(crate) fn owner(actor: &Actor, owner: UserId, resource: &str) -> Result<(), MarketplaceError> {
    if actor.id() == owner {
        Ok(())
    } else {
        Err(MarketplaceError::Forbidden(format!(
            "authenticated user is not the owner of this {resource}"
        )))
    }
}
