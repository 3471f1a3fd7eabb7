//! HTTP surface for a [`CrudService`].
//!
//! [`crud_router`] mounts the five CRUD endpoints for one resource:
//!
//! ```text
//! POST   /        create            201 + response DTO
//! GET    /        list              200 + array, or rendered page when ?page/?size
//! GET    /:id     get one           200 | 404
//! PATCH  /:id     partial update    200 | 404
//! DELETE /:id     delete            204 | 404
//! ```
//!
//! `?sort=name,asc;age,desc` sorts both plain and paged lists.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crudkit_core::{CrudResult, Entity, Order, PageRequest, Sort, page::DEFAULT_PAGE_SIZE};
use crudkit_events::{EntityEvent, Event, EventPublisher};
use crudkit_infra::{CrudHooks, CrudMapper, CrudService, EntityStore};

use crate::errors;
use crate::serializer::PageSerializer;

/// Query string of the list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub size: Option<u64>,
    /// `;`-separated `property[,asc|desc]` clauses.
    pub sort: Option<String>,
}

impl ListQuery {
    pub fn sort(&self) -> CrudResult<Sort> {
        let Some(raw) = self.sort.as_deref() else {
            return Ok(Sort::unsorted());
        };
        let orders = raw
            .split(';')
            .filter(|clause| !clause.trim().is_empty())
            .map(Order::from_str)
            .collect::<CrudResult<Vec<_>>>()?;
        Ok(Sort::from(orders))
    }

    /// `Some` when the caller asked for a page.
    pub fn page_request(&self) -> CrudResult<Option<PageRequest>> {
        if self.page.is_none() && self.size.is_none() {
            return Ok(None);
        }
        let request = PageRequest::of(self.page.unwrap_or(0), self.size.unwrap_or(DEFAULT_PAGE_SIZE));
        Ok(Some(request.sorted(self.sort()?)))
    }
}

/// One resource behind [`crud_router`].
pub trait CrudEndpoint: Send + Sync + 'static {
    type Id: FromStr + Send;
    type Request: DeserializeOwned + Send;

    fn create(&self, request: Self::Request) -> axum::response::Response;
    fn get(&self, id: Self::Id) -> axum::response::Response;
    fn update(&self, id: Self::Id, request: Self::Request) -> axum::response::Response;
    fn delete(&self, id: Self::Id) -> axum::response::Response;
    fn list(&self, query: ListQuery) -> axum::response::Response;
}

/// Adapts a [`CrudService`] to [`CrudEndpoint`], rendering pages with a
/// shared [`PageSerializer`].
pub struct CrudController<St, M, H, P, E> {
    service: CrudService<St, M, H, P, E>,
    serializer: Arc<PageSerializer>,
}

impl<St, M, H, P, E> CrudController<St, M, H, P, E> {
    pub fn new(service: CrudService<St, M, H, P, E>, serializer: Arc<PageSerializer>) -> Self {
        Self { service, serializer }
    }

    pub fn service(&self) -> &CrudService<St, M, H, P, E> {
        &self.service
    }
}

impl<St, M, H, P, E> CrudEndpoint for CrudController<St, M, H, P, E>
where
    M: CrudMapper + 'static,
    M::Request: DeserializeOwned,
    <M::Entity as Entity>::Id: FromStr,
    St: EntityStore<M::Entity> + 'static,
    H: CrudHooks<M::Entity, M::Request> + 'static,
    P: EventPublisher<E> + 'static,
    E: Event + From<EntityEvent<M::Entity>>,
{
    type Id = <M::Entity as Entity>::Id;
    type Request = M::Request;

    fn create(&self, request: M::Request) -> axum::response::Response {
        match self.service.create(&request) {
            Ok(created) => {
                info!(entity_type = <M::Entity as Entity>::TYPE_NAME, "created via api");
                (StatusCode::CREATED, Json(created)).into_response()
            }
            Err(e) => errors::crud_error_to_response(e),
        }
    }

    fn get(&self, id: Self::Id) -> axum::response::Response {
        match self.service.get_one(&id) {
            Ok(Some(found)) => (StatusCode::OK, Json(found)).into_response(),
            Ok(None) => errors::not_found(<M::Entity as Entity>::TYPE_NAME, &id),
            Err(e) => errors::crud_error_to_response(e),
        }
    }

    fn update(&self, id: Self::Id, request: M::Request) -> axum::response::Response {
        match self.service.update(&id, &request) {
            Ok(Some(updated)) => (StatusCode::OK, Json(updated)).into_response(),
            Ok(None) => errors::not_found(<M::Entity as Entity>::TYPE_NAME, &id),
            Err(e) => errors::crud_error_to_response(e),
        }
    }

    fn delete(&self, id: Self::Id) -> axum::response::Response {
        match self.service.delete(&id) {
            Ok(true) => {
                info!(entity_type = <M::Entity as Entity>::TYPE_NAME, %id, "deleted via api");
                StatusCode::NO_CONTENT.into_response()
            }
            Ok(false) => errors::not_found(<M::Entity as Entity>::TYPE_NAME, &id),
            Err(e) => errors::crud_error_to_response(e),
        }
    }

    fn list(&self, query: ListQuery) -> axum::response::Response {
        let result = match query.page_request() {
            Ok(Some(request)) => self
                .service
                .get_page(&request)
                .and_then(|page| self.serializer.to_value(&page)),
            Ok(None) => query
                .sort()
                .and_then(|sort| {
                    if sort.is_sorted() {
                        self.service.get_sorted(&sort)
                    } else {
                        self.service.get_all()
                    }
                })
                .and_then(|items| Ok(serde_json::to_value(items)?)),
            Err(e) => Err(e),
        };

        match result {
            Ok(body) => (StatusCode::OK, Json(body)).into_response(),
            Err(e) => errors::crud_error_to_response(e),
        }
    }
}

/// Router exposing `endpoint` at `/` and `/:id`. Nest it under the resource path.
pub fn crud_router<C: CrudEndpoint>(endpoint: Arc<C>) -> Router {
    Router::new()
        .route("/", post(create::<C>).get(list::<C>))
        .route("/:id", get(get_one::<C>).patch(update::<C>).delete(delete::<C>))
        .layer(Extension(endpoint))
}

fn parse_id<C: CrudEndpoint>(raw: &str) -> Result<C::Id, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid id '{raw}'")))
}

async fn create<C: CrudEndpoint>(
    Extension(endpoint): Extension<Arc<C>>,
    Json(body): Json<C::Request>,
) -> axum::response::Response {
    endpoint.create(body)
}

async fn list<C: CrudEndpoint>(
    Extension(endpoint): Extension<Arc<C>>,
    Query(query): Query<ListQuery>,
) -> axum::response::Response {
    endpoint.list(query)
}

async fn get_one<C: CrudEndpoint>(
    Extension(endpoint): Extension<Arc<C>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match parse_id::<C>(&id) {
        Ok(id) => endpoint.get(id),
        Err(resp) => resp,
    }
}

async fn update<C: CrudEndpoint>(
    Extension(endpoint): Extension<Arc<C>>,
    Path(id): Path<String>,
    Json(body): Json<C::Request>,
) -> axum::response::Response {
    match parse_id::<C>(&id) {
        Ok(id) => endpoint.update(id, body),
        Err(resp) => resp,
    }
}

async fn delete<C: CrudEndpoint>(
    Extension(endpoint): Extension<Arc<C>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match parse_id::<C>(&id) {
        Ok(id) => endpoint.delete(id),
        Err(resp) => resp,
    }
}
