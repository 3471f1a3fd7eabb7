//! Users: numeric IDs, timestamp hooks, logging listeners and a delete guard.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crudkit_api::{CrudController, PageSerializer};
use crudkit_core::{ContentAlias, CrudRequest, CrudResponse, Entity, IgnoredFields, MergeError};
use crudkit_events::{EntityEvent, Event, EventKind, HandlerError, InMemoryEventBus, Interest};
use crudkit_infra::{CrudHooks, CrudMapper, CrudService, InMemoryEntityStore, mapper::merge_request};

/// The user nobody may delete.
pub const PROTECTED_USER: i64 = 1;

#[derive(Debug, Clone, Default, Serialize)]
pub struct User {
    pub id: Option<i64>,
    pub version: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub name: Option<String>,
}

impl Entity for User {
    type Id = i64;
    const TYPE_NAME: &'static str = "User";

    fn id(&self) -> Option<&i64> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn version(&self) -> Option<u64> {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = Some(version);
    }
}

crudkit_core::entity_identity!(User);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRequest {
    pub name: Option<String>,
}

impl CrudRequest for UserRequest {}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ContentAlias for UserResponse {}

impl CrudResponse for UserResponse {
    type Id = i64;

    fn id(&self) -> Option<&i64> {
        self.id.as_ref()
    }
}

crudkit_core::partial_merge!(UserRequest => User { name });

pub struct UserMapper;

impl CrudMapper for UserMapper {
    type Entity = User;
    type Request = UserRequest;
    type Response = UserResponse;

    fn to_create(&self, request: &UserRequest) -> User {
        User {
            name: request.name.clone(),
            ..User::default()
        }
    }

    fn to_update(&self, request: &UserRequest, entity: &mut User, ignored: &IgnoredFields) -> Result<(), MergeError> {
        merge_request(request, entity, ignored)
    }

    fn to_response(&self, entity: &User) -> UserResponse {
        UserResponse {
            id: entity.id,
            name: entity.name.clone(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

pub struct UserHooks;

impl CrudHooks<User, UserRequest> for UserHooks {
    fn on_create(&self, request: &UserRequest, user: &mut User) {
        info!(?request, "stamping new user");
        let now = Utc::now();
        user.created_at = Some(now);
        user.updated_at = Some(now);
    }

    fn on_update(&self, request: &UserRequest, user: &mut User) {
        info!(id = ?user.id, ?request, "stamping updated user");
        user.updated_at = Some(Utc::now());
    }

    fn on_create_event(&self, user: &User) -> Option<EntityEvent<User>> {
        Some(EntityEvent::created(user.clone()))
    }

    fn on_update_event(&self, user: &User) -> Option<EntityEvent<User>> {
        Some(EntityEvent::updated(user.clone()))
    }

    fn on_delete_event(&self, user: &User) -> Option<EntityEvent<User>> {
        Some(EntityEvent::deleted(user.clone()))
    }
}

pub type UserStore = Arc<InMemoryEntityStore<User>>;
pub type UserBus = Arc<InMemoryEventBus<EntityEvent<User>>>;
pub type UserController = CrudController<UserStore, UserMapper, UserHooks, UserBus, EntityEvent<User>>;

/// Registers the user listeners: log every lifecycle event in both phases and
/// refuse to delete [`PROTECTED_USER`].
pub fn register_listeners(bus: &InMemoryEventBus<EntityEvent<User>>) {
    bus.on_in_transaction("user-delete-guard", Interest::kind(EventKind::Deleted), |event: &EntityEvent<User>| {
        if event.entity_id() == Some(&PROTECTED_USER) {
            return Err(HandlerError::rejected(format!(
                "deleting a user with id {PROTECTED_USER} is not allowed"
            )));
        }
        Ok(())
    });

    bus.on_in_transaction("user-audit", Interest::all(), |event: &EntityEvent<User>| {
        info!(kind = event.kind().as_str(), id = ?event.entity_id(), "user event within transaction");
        Ok(())
    });

    bus.on_after_commit("user-audit-committed", Interest::all(), |event: &EntityEvent<User>| {
        info!(kind = event.kind().as_str(), id = ?event.entity_id(), "user event after commit");
        Ok(())
    });
}

pub fn controller(serializer: Arc<PageSerializer>) -> UserController {
    let bus: UserBus = Arc::new(InMemoryEventBus::new());
    register_listeners(&bus);
    let service = CrudService::new(Arc::new(InMemoryEntityStore::new()), UserMapper, UserHooks, bus);
    CrudController::new(service, serializer)
}
