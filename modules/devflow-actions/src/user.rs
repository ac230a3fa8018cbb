// User directory: profile upkeep and the paged community listing.

use tracing::{debug, info};

use devflow_common::params::{search_query, ListUsersParams, SaveProfileParams};
use devflow_common::types::{Actor, Page, User, UserList};
use devflow_common::{ActionResponse, DevflowError, FieldErrors, Validate};
use devflow_store::{Store, UnitOfWork, UserRepo};

use crate::{require_actor, respond, settle};

/// Create or update the actor's public profile.
pub async fn save_profile<S: Store>(
    store: &S,
    actor: Option<&Actor>,
    params: SaveProfileParams,
) -> ActionResponse<User> {
    respond("save_profile", save_profile_inner(store, actor, params).await)
}

async fn save_profile_inner<S: Store>(
    store: &S,
    actor: Option<&Actor>,
    params: SaveProfileParams,
) -> Result<User, DevflowError> {
    params.validate()?;
    let actor = require_actor(actor)?;

    let name = params.name.trim();
    let username = params.username.trim();

    let mut tx = store.begin().await?;
    let result = claim_username(&mut tx, actor, name, username).await;
    let user = settle(tx, result).await?;

    info!(user_id = %user.id, username = %user.username, "Profile saved");
    Ok(user)
}

async fn claim_username<U: UnitOfWork>(
    tx: &mut U,
    actor: &Actor,
    name: &str,
    username: &str,
) -> Result<User, DevflowError> {
    if let Some(owner) = tx.find_user_by_username(username).await? {
        if owner.id != actor.user_id {
            let mut errors = FieldErrors::new();
            errors.push("username", "Username is already taken.");
            return Err(errors.into());
        }
    }
    Ok(tx.upsert_user(actor.user_id, name, username).await?)
}

/// Page through profiles, optionally filtered by a name or username substring.
pub async fn list_users<S: Store>(store: &S, params: ListUsersParams) -> ActionResponse<UserList> {
    respond("list_users", list_users_inner(store, params).await)
}

async fn list_users_inner<S: Store>(
    store: &S,
    params: ListUsersParams,
) -> Result<UserList, DevflowError> {
    let page = Page::new(params.page, params.page_size);
    let query = search_query(params.query.as_deref());
    let sort = params.filter.unwrap_or_default();

    let mut tx = store.begin().await?;
    let result = tx
        .list_users(query.as_deref(), sort, page)
        .await
        .map_err(DevflowError::from);
    let rows = settle(tx, result).await?;

    let (users, is_next) = page.finish(rows);
    debug!(count = users.len(), is_next, ?sort, "Listed users");
    Ok(UserList { users, is_next })
}
