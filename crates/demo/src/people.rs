//! People and their cars, keyed by UUIDs.
//!
//! Person updates are reported after commit to a worker thread that looks up
//! the person's cars. Cars keep the default hooks and publish nothing.

use std::sync::Arc;
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crudkit_api::{CrudController, PageSerializer};
use crudkit_core::{ContentAlias, CrudRequest, CrudResponse, Entity, IgnoredFields, MergeError, define_id};
use crudkit_events::{EntityEvent, EventKind, InMemoryEventBus, Interest, NoopPublisher, Subscription};
use crudkit_infra::{
    CrudHooks, CrudMapper, CrudService, DefaultHooks, EntityStore, InMemoryEntityStore, mapper::merge_request,
};

define_id!(pub PersonId);
define_id!(pub CarId);

#[derive(Debug, Clone, Default, Serialize)]
pub struct Person {
    pub id: Option<PersonId>,
    pub version: Option<u64>,
    pub name: Option<String>,
}

impl Entity for Person {
    type Id = PersonId;
    const TYPE_NAME: &'static str = "Person";

    fn id(&self) -> Option<&PersonId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: PersonId) {
        self.id = Some(id);
    }

    fn version(&self) -> Option<u64> {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = Some(version);
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Car {
    pub id: Option<CarId>,
    pub person_id: Option<PersonId>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
}

impl Entity for Car {
    type Id = CarId;
    const TYPE_NAME: &'static str = "Car";

    fn id(&self) -> Option<&CarId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: CarId) {
        self.id = Some(id);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonRequest {
    pub name: Option<String>,
}

impl CrudRequest for PersonRequest {}

#[derive(Debug, Clone, Serialize)]
pub struct PersonResponse {
    pub id: Option<PersonId>,
    pub name: Option<String>,
}

impl ContentAlias for PersonResponse {
    const CONTENT_ALIAS: Option<&'static str> = Some("people");
}

impl CrudResponse for PersonResponse {
    type Id = PersonId;

    fn id(&self) -> Option<&PersonId> {
        self.id.as_ref()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarRequest {
    pub person_id: Option<PersonId>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
}

impl CrudRequest for CarRequest {}

#[derive(Debug, Clone, Serialize)]
pub struct CarResponse {
    pub id: Option<CarId>,
    pub person_id: Option<PersonId>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
}

impl ContentAlias for CarResponse {}

impl CrudResponse for CarResponse {
    type Id = CarId;

    fn id(&self) -> Option<&CarId> {
        self.id.as_ref()
    }
}

crudkit_core::partial_merge!(PersonRequest => Person { name });
crudkit_core::partial_merge!(CarRequest => Car { person_id, brand, model, year });

pub struct PersonMapper;

impl CrudMapper for PersonMapper {
    type Entity = Person;
    type Request = PersonRequest;
    type Response = PersonResponse;

    fn to_create(&self, request: &PersonRequest) -> Person {
        Person {
            name: request.name.clone(),
            ..Person::default()
        }
    }

    fn to_update(&self, request: &PersonRequest, entity: &mut Person, ignored: &IgnoredFields) -> Result<(), MergeError> {
        merge_request(request, entity, ignored)
    }

    fn to_response(&self, entity: &Person) -> PersonResponse {
        PersonResponse {
            id: entity.id,
            name: entity.name.clone(),
        }
    }
}

pub struct CarMapper;

impl CrudMapper for CarMapper {
    type Entity = Car;
    type Request = CarRequest;
    type Response = CarResponse;

    fn to_create(&self, request: &CarRequest) -> Car {
        Car {
            id: None,
            person_id: request.person_id,
            brand: request.brand.clone(),
            model: request.model.clone(),
            year: request.year,
        }
    }

    fn to_update(&self, request: &CarRequest, entity: &mut Car, ignored: &IgnoredFields) -> Result<(), MergeError> {
        merge_request(request, entity, ignored)
    }

    fn to_response(&self, entity: &Car) -> CarResponse {
        CarResponse {
            id: entity.id,
            person_id: entity.person_id,
            brand: entity.brand.clone(),
            model: entity.model.clone(),
            year: entity.year,
        }
    }
}

/// Only updates are announced.
pub struct PersonHooks;

impl CrudHooks<Person, PersonRequest> for PersonHooks {
    fn on_update_event(&self, person: &Person) -> Option<EntityEvent<Person>> {
        Some(EntityEvent::updated(person.clone()))
    }
}

pub type CarStore = Arc<InMemoryEntityStore<Car>>;
pub type PersonController = CrudController<
    Arc<InMemoryEntityStore<Person>>,
    PersonMapper,
    PersonHooks,
    Arc<InMemoryEventBus<EntityEvent<Person>>>,
    EntityEvent<Person>,
>;
pub type CarController = CrudController<CarStore, CarMapper, DefaultHooks, NoopPublisher, EntityEvent<Car>>;

/// Cars owned by `person`.
pub fn cars_of(cars: &CarStore, person: &PersonId) -> crudkit_core::CrudResult<Vec<Car>> {
    Ok(cars
        .list_all()?
        .into_iter()
        .filter(|car| car.person_id.as_ref() == Some(person))
        .collect())
}

/// Drains committed person updates on a dedicated thread. Returns once the
/// bus (and with it the sending side) is dropped.
pub fn spawn_update_worker(updates: Subscription<EntityEvent<Person>>, cars: CarStore) -> JoinHandle<usize> {
    std::thread::spawn(move || {
        let mut handled = 0;
        while let Ok(event) = updates.recv() {
            handled += 1;
            let Some(person) = event.entity() else { continue };
            let Some(id) = person.id else { continue };
            match cars_of(&cars, &id) {
                Ok(owned) => info!(%id, name = ?person.name, cars = owned.len(), "person updated"),
                Err(e) => warn!(%id, error = %e, "could not load cars of updated person"),
            }
        }
        handled
    })
}

pub struct People {
    pub people: PersonController,
    pub cars: CarController,
    pub worker: JoinHandle<usize>,
}

pub fn controllers(serializer: Arc<PageSerializer>) -> People {
    let car_store: CarStore = Arc::new(InMemoryEntityStore::new());
    let cars = CrudController::new(
        CrudService::without_events(car_store.clone(), CarMapper, DefaultHooks),
        serializer.clone(),
    );

    let bus = Arc::new(InMemoryEventBus::new());
    let updates = bus.after_commit_channel("person-update-worker", Interest::kind(EventKind::Updated));
    let worker = spawn_update_worker(updates, car_store);
    let people = CrudController::new(
        CrudService::new(Arc::new(InMemoryEntityStore::new()), PersonMapper, PersonHooks, bus),
        serializer,
    );

    People { people, cars, worker }
}
