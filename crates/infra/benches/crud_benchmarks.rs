use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use serde::Serialize;

use crudkit_core::{
    ContentAlias, CrudRequest, CrudResponse, Entity, IgnoredFields, MergeError, Order, PageRequest, Sort,
};
use crudkit_events::{EntityEvent, InMemoryEventBus, Interest};
use crudkit_infra::mapper::merge_request;
use crudkit_infra::{CrudHooks, CrudMapper, CrudService, EntityStore, InMemoryEntityStore};

#[derive(Debug, Clone, Default, Serialize)]
struct Car {
    id: Option<u64>,
    version: Option<u64>,
    model: Option<String>,
    horse_power: u32,
}

impl Entity for Car {
    type Id = u64;
    const TYPE_NAME: &'static str = "Car";

    fn id(&self) -> Option<&u64> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }

    fn version(&self) -> Option<u64> {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = Some(version);
    }
}

#[derive(Debug, Clone, Default)]
struct CarRequest {
    model: Option<String>,
    horse_power: Option<u32>,
}

impl CrudRequest for CarRequest {}

#[derive(Debug, Serialize)]
struct CarResponse {
    id: Option<u64>,
    model: Option<String>,
}

impl ContentAlias for CarResponse {}

impl CrudResponse for CarResponse {
    type Id = u64;

    fn id(&self) -> Option<&u64> {
        self.id.as_ref()
    }
}

crudkit_core::partial_merge!(CarRequest => Car { model, horse_power });

struct CarMapper;

impl CrudMapper for CarMapper {
    type Entity = Car;
    type Request = CarRequest;
    type Response = CarResponse;

    fn to_create(&self, request: &CarRequest) -> Car {
        Car {
            model: request.model.clone(),
            horse_power: request.horse_power.unwrap_or_default(),
            ..Car::default()
        }
    }

    fn to_update(&self, request: &CarRequest, entity: &mut Car, ignored: &IgnoredFields) -> Result<(), MergeError> {
        merge_request(request, entity, ignored)
    }

    fn to_response(&self, entity: &Car) -> CarResponse {
        CarResponse {
            id: entity.id,
            model: entity.model.clone(),
        }
    }
}

struct Events;

impl CrudHooks<Car, CarRequest> for Events {
    fn on_create_event(&self, entity: &Car) -> Option<EntityEvent<Car>> {
        Some(EntityEvent::created(entity.clone()))
    }

    fn on_update_event(&self, entity: &Car) -> Option<EntityEvent<Car>> {
        Some(EntityEvent::updated(entity.clone()))
    }
}

type Bus = InMemoryEventBus<EntityEvent<Car>>;
type Service = CrudService<Arc<InMemoryEntityStore<Car>>, CarMapper, Events, Arc<Bus>, EntityEvent<Car>>;

fn setup(listeners: usize) -> Service {
    let bus = Arc::new(Bus::new());
    for i in 0..listeners {
        bus.on_in_transaction(format!("in-tx-{i}"), Interest::all(), |_| Ok(()));
        bus.on_after_commit(format!("after-{i}"), Interest::all(), |_| Ok(()));
    }
    CrudService::new(Arc::new(InMemoryEntityStore::new()), CarMapper, Events, bus)
}

fn seeded(rows: u32) -> Service {
    let service = setup(0);
    for i in 0..rows {
        let request = CarRequest {
            model: Some(format!("model-{}", rows - i)),
            horse_power: Some(i * 7 % 500),
        };
        service.create(&request).unwrap();
    }
    service
}

fn bench_write_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_latency");

    for listeners in [0usize, 4, 16] {
        group.bench_with_input(BenchmarkId::new("create", listeners), &listeners, |b, &listeners| {
            let service = setup(listeners);
            let request = CarRequest {
                model: Some("beetle".into()),
                horse_power: Some(50),
            };
            b.iter(|| black_box(service.create(&request).unwrap()));
        });
    }

    let request = CarRequest {
        model: None,
        horse_power: Some(120),
    };
    for rows in [1u32, 10_000] {
        let service = seeded(rows);
        group.bench_with_input(BenchmarkId::new("partial_update", rows), &rows, |b, _| {
            b.iter(|| black_box(service.update(&1, &request).unwrap()));
        });
    }

    group.finish();
}

fn bench_listing(c: &mut Criterion) {
    let mut group = c.benchmark_group("listing");

    for rows in [100u32, 1_000, 10_000] {
        let service = seeded(rows);
        group.throughput(Throughput::Elements(rows as u64));

        group.bench_with_input(BenchmarkId::new("list_all", rows), &rows, |b, _| {
            b.iter(|| black_box(service.get_all().unwrap()));
        });

        let request = PageRequest::of(3, 20).sorted(Sort::from(vec![Order::desc("horse_power"), Order::asc("model")]));
        group.bench_with_input(BenchmarkId::new("sorted_page", rows), &rows, |b, _| {
            b.iter(|| black_box(service.get_page(&request).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("fetch_by_id", rows), &rows, |b, _| {
            b.iter(|| black_box(service.store().fetch_by_id(&(rows as u64 / 2)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_write_latency, bench_listing);
criterion_main!(benches);
