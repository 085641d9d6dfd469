/// Authorization policy for blog-service
///
/// `decide` is a pure function over (action, actor, resource). Reads are
/// public. Creating needs a login. Changing or deleting needs a login and
/// ownership.
///
/// The two denials surface differently: an anonymous actor is sent to the
/// login page, a logged-in non-owner gets a hard 403.
use crate::error::{AppError, Result};
use crate::middleware::Actor;
use crate::models::{Post, Profile};
use uuid::Uuid;

/// What the actor is trying to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewList,
    ViewDetail,
    Create,
    Edit,
    Delete,
}

/// What the action targets
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// A listing or "new item" target with no owner yet
    Collection,
    Post(&'a Post),
    Profile(&'a Profile),
}

impl Resource<'_> {
    fn owner(&self) -> Option<Uuid> {
        match self {
            Resource::Collection => None,
            Resource::Post(post) => Some(post.author_id),
            Resource::Profile(profile) => Some(profile.user_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Redirect to the login page
    LoginRequired,
    /// 403, no redirect
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(Denial::LoginRequired) => Err(AppError::login_required()),
            Decision::Deny(Denial::Forbidden) => Err(AppError::Forbidden(
                "You don't have permission to modify this resource".to_string(),
            )),
        }
    }
}

pub fn decide(action: Action, actor: &Actor, resource: Resource<'_>) -> Decision {
    match (action, resource) {
        // Profiles are private to their user, reads included
        (Action::ViewList | Action::ViewDetail, Resource::Profile(_)) => owner_only(actor, resource),
        (Action::ViewList | Action::ViewDetail, _) => Decision::Allow,
        (Action::Create, _) => match actor {
            Actor::Anonymous => Decision::Deny(Denial::LoginRequired),
            Actor::User(_) => Decision::Allow,
        },
        (Action::Edit | Action::Delete, _) => owner_only(actor, resource),
    }
}

fn owner_only(actor: &Actor, resource: Resource<'_>) -> Decision {
    match actor {
        Actor::Anonymous => Decision::Deny(Denial::LoginRequired),
        Actor::User(user) if resource.owner() == Some(user.id) => Decision::Allow,
        Actor::User(_) => Decision::Deny(Denial::Forbidden),
    }
}

/// Author to persist after an allowed create or edit.
///
/// Edits also re-stamp the author with the acting user. Today this is inert
/// because only the author can edit; loosening `decide` for `Edit` would turn
/// it into an ownership transfer.
pub fn stamp_author(actor: &Actor) -> Result<Uuid> {
    actor.id().ok_or_else(AppError::login_required)
}

/// Shorthand for post ownership checks in services
pub fn check_post_access(action: Action, actor: &Actor, post: &Post) -> Result<()> {
    decide(action, actor, Resource::Post(post)).into_result()
}
