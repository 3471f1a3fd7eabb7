//! Integration tests for the full CRUD pipeline.
//!
//! Tests: request DTO → CrudService → EntityStore → EventBus → response DTO
//!
//! Verifies:
//! - Partial updates keep absent fields and bump the version
//! - Exactly one event per successful write, none for misses and reads
//! - In-transaction listeners can veto and roll the write back
//! - After-commit listeners only hear about committed writes
//! - Concurrent modifications fail loudly

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Utc};
    use serde::Serialize;

    use crudkit_core::{
        ContentAlias, CrudError, CrudRequest, CrudResponse, CrudResult, Entity, IgnoredFields, MergeError, Order,
        PageRequest, Sort,
    };
    use crudkit_events::{
        EntityEvent, Event, EventKind, EventPublisher, HandlerError, InMemoryEventBus, Interest, PendingEvents,
        Timing,
    };

    use crate::mapper::{CrudMapper, merge_request};
    use crate::service::{CrudHooks, CrudService, DefaultHooks};
    use crate::store::{EntityStore, InMemoryEntityStore};

    #[derive(Debug, Clone, Default, Serialize)]
    struct Model {
        id: Option<i64>,
        version: Option<u64>,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
        text: Option<String>,
        number: i32,
    }

    impl Entity for Model {
        type Id = i64;
        const TYPE_NAME: &'static str = "Model";

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

    #[derive(Debug, Clone, Default)]
    struct ModelRequest {
        text: Option<String>,
        number: Option<i32>,
    }

    impl CrudRequest for ModelRequest {}

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct ModelResponse {
        id: Option<i64>,
        text: Option<String>,
        number: i32,
    }

    impl ContentAlias for ModelResponse {}

    impl CrudResponse for ModelResponse {
        type Id = i64;

        fn id(&self) -> Option<&i64> {
            self.id.as_ref()
        }
    }

    crudkit_core::partial_merge!(ModelRequest => Model { text, number });
    crudkit_core::partial_merge!(Model => Model { id, version, created_at, updated_at, text, number });

    struct ModelMapper;

    impl CrudMapper for ModelMapper {
        type Entity = Model;
        type Request = ModelRequest;
        type Response = ModelResponse;

        fn to_create(&self, request: &ModelRequest) -> Model {
            Model {
                text: request.text.clone(),
                number: request.number.unwrap_or_default(),
                ..Model::default()
            }
        }

        fn to_update(&self, request: &ModelRequest, entity: &mut Model, ignored: &IgnoredFields) -> Result<(), MergeError> {
            merge_request(request, entity, ignored)
        }

        fn to_response(&self, entity: &Model) -> ModelResponse {
            ModelResponse {
                id: entity.id,
                text: entity.text.clone(),
                number: entity.number,
            }
        }
    }

    /// Emits the standard event for every write and stamps timestamps.
    struct EventfulHooks;

    impl CrudHooks<Model, ModelRequest> for EventfulHooks {
        fn on_create(&self, _request: &ModelRequest, entity: &mut Model) {
            entity.created_at = Some(Utc::now());
        }

        fn on_update(&self, _request: &ModelRequest, entity: &mut Model) {
            entity.updated_at = Some(Utc::now());
        }

        fn on_create_event(&self, entity: &Model) -> Option<EntityEvent<Model>> {
            Some(EntityEvent::created(entity.clone()))
        }

        fn on_update_event(&self, entity: &Model) -> Option<EntityEvent<Model>> {
            Some(EntityEvent::updated(entity.clone()))
        }

        fn on_delete_event(&self, entity: &Model) -> Option<EntityEvent<Model>> {
            entity.id.map(EntityEvent::deleted_reference)
        }
    }

    type Bus = InMemoryEventBus<EntityEvent<Model>>;
    type Store = Arc<InMemoryEntityStore<Model>>;
    type Service<H> = CrudService<Store, ModelMapper, H, Arc<Bus>, EntityEvent<Model>>;

    type Log = Arc<Mutex<Vec<(Timing, EventKind, Option<i64>)>>>;

    fn setup<H: CrudHooks<Model, ModelRequest>>(hooks: H) -> (Service<H>, Arc<Bus>, Log) {
        let store: Store = Arc::new(InMemoryEntityStore::new());
        let bus = Arc::new(Bus::new());
        let log: Log = Arc::new(Mutex::new(Vec::new()));

        for timing in [Timing::InTransaction, Timing::AfterCommit] {
            let log = Arc::clone(&log);
            let record = move |e: &EntityEvent<Model>| -> Result<(), HandlerError> {
                log.lock().unwrap().push((timing, e.kind(), e.entity_id().copied()));
                Ok(())
            };
            match timing {
                Timing::InTransaction => bus.on_in_transaction("recorder", Interest::all(), record),
                Timing::AfterCommit => bus.on_after_commit("recorder", Interest::all(), record),
            }
        }

        let service = CrudService::new(store, ModelMapper, hooks, Arc::clone(&bus));
        (service, bus, log)
    }

    fn request(text: Option<&str>, number: Option<i32>) -> ModelRequest {
        ModelRequest {
            text: text.map(str::to_string),
            number,
        }
    }

    fn events(log: &Log) -> Vec<(Timing, EventKind, Option<i64>)> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn create_returns_generated_id_and_fires_create_event() {
        let (service, _bus, log) = setup(EventfulHooks);

        let created = service.create(&request(Some("model1"), None)).unwrap();

        assert_eq!(created.id, Some(1));
        assert_eq!(created.text.as_deref(), Some("model1"));
        assert_eq!(
            events(&log),
            [
                (Timing::InTransaction, EventKind::Created, Some(1)),
                (Timing::AfterCommit, EventKind::Created, Some(1)),
            ]
        );

        let stored = service.get_one_entity(&1).unwrap().unwrap();
        assert!(stored.created_at.is_some());
        assert_eq!(stored.version, Some(0));
    }

    #[test]
    fn update_keeps_absent_fields_and_bumps_version() {
        let (service, _bus, log) = setup(EventfulHooks);
        service.create(&request(Some("text"), Some(7))).unwrap();

        let updated = service.update(&1, &request(Some("updated"), None)).unwrap().unwrap();

        assert_eq!(updated.text.as_deref(), Some("updated"));
        assert_eq!(updated.number, 7);
        let stored = service.get_one_entity(&1).unwrap().unwrap();
        assert_eq!(stored.version, Some(1));
        assert!(stored.updated_at.is_some());
        assert!(events(&log).contains(&(Timing::AfterCommit, EventKind::Updated, Some(1))));
    }

    #[test]
    fn update_of_unknown_id_returns_none_and_publishes_nothing() {
        let (service, _bus, log) = setup(EventfulHooks);

        assert!(service.update(&99, &request(Some("x"), None)).unwrap().is_none());
        assert!(events(&log).is_empty());
    }

    #[test]
    fn delete_of_unknown_id_returns_false_and_publishes_nothing() {
        let (service, _bus, log) = setup(EventfulHooks);

        assert!(!service.delete(&99).unwrap());
        assert!(events(&log).is_empty());
    }

    #[test]
    fn delete_fires_reference_event() {
        let (service, _bus, log) = setup(EventfulHooks);
        service.create(&request(Some("a"), None)).unwrap();
        log.lock().unwrap().clear();

        assert!(service.delete(&1).unwrap());
        assert!(service.get_one(&1).unwrap().is_none());
        assert_eq!(
            events(&log),
            [
                (Timing::InTransaction, EventKind::Deleted, Some(1)),
                (Timing::AfterCommit, EventKind::Deleted, Some(1)),
            ]
        );
    }

    #[test]
    fn default_hooks_publish_nothing() {
        let (service, _bus, log) = setup(DefaultHooks);

        service.create(&request(Some("a"), Some(1))).unwrap();
        service.create_entity(Model::default()).unwrap();
        service.update(&1, &request(None, Some(2))).unwrap();
        service.delete(&2).unwrap();

        assert!(events(&log).is_empty());
    }

    #[test]
    fn raw_entity_create_uses_the_same_event_hook() {
        let (service, _bus, log) = setup(EventfulHooks);

        let created = service
            .create_entity(Model {
                text: Some("raw".into()),
                ..Model::default()
            })
            .unwrap();

        assert_eq!(created.id, Some(1));
        assert_eq!(events(&log).len(), 2);
    }

    #[test]
    fn reads_publish_nothing() {
        let (service, _bus, log) = setup(EventfulHooks);
        service.create(&request(Some("a"), None)).unwrap();
        log.lock().unwrap().clear();

        service.get_one(&1).unwrap();
        service.get_all().unwrap();
        service.get_page(&PageRequest::of(0, 5)).unwrap();
        service.get_sorted(&Sort::by(["text"])).unwrap();

        assert!(events(&log).is_empty());
    }

    #[test]
    fn veto_rolls_back_delete_and_skips_after_commit() {
        let (service, bus, log) = setup(EventfulHooks);
        service.create(&request(Some("admin"), None)).unwrap();
        log.lock().unwrap().clear();

        bus.on_in_transaction(
            "protect-first",
            Interest::kind(EventKind::Deleted)
                .entity("Model")
                .when(|e: &EntityEvent<Model>| e.entity_id() == Some(&1)),
            |_| Err(HandlerError::rejected("model 1 is protected")),
        );

        let err = service.delete(&1).unwrap_err();

        assert_eq!(err, CrudError::vetoed("protect-first", "model 1 is protected"));
        assert!(service.get_one(&1).unwrap().is_some());
        assert!(
            events(&log).iter().all(|(timing, _, _)| *timing == Timing::InTransaction),
            "after-commit listeners must not run on rollback"
        );
    }

    #[test]
    fn listener_writes_join_the_caller_transaction() {
        let (service, bus, _log) = setup(EventfulHooks);
        service.create(&request(Some("watched"), None)).unwrap();

        let audit = CrudService::without_events(Arc::clone(service.store()), ModelMapper, DefaultHooks);
        bus.on_in_transaction("audit-trail", Interest::kind(EventKind::Updated), move |e: &EntityEvent<Model>| {
            let subject = e.entity_id().map(|id| *id as i32);
            audit
                .create(&request(Some("audit"), subject))
                .map(|_| ())
                .map_err(|err| HandlerError::failed(err.to_string()))
        });
        bus.on_in_transaction(
            "no-forbidden-text",
            Interest::kind(EventKind::Updated)
                .when(|e: &EntityEvent<Model>| e.entity().and_then(|m| m.text.as_deref()) == Some("forbidden")),
            |_| Err(HandlerError::rejected("forbidden text")),
        );

        service.update(&1, &request(Some("allowed"), None)).unwrap();
        assert_eq!(service.get_all().unwrap().len(), 2);

        let err = service.update(&1, &request(Some("forbidden"), None)).unwrap_err();
        assert_eq!(err, CrudError::vetoed("no-forbidden-text", "forbidden text"));

        let stored = service.get_all_entities().unwrap();
        let texts: Vec<_> = stored.iter().map(|m| m.text.as_deref()).collect();
        assert_eq!(texts, [Some("allowed"), Some("audit")]);
        assert_eq!(stored[0].version, Some(1));
    }

    #[test]
    fn veto_rolls_back_create() {
        let (service, bus, _log) = setup(EventfulHooks);
        bus.on_in_transaction("read-only", Interest::kind(EventKind::Created), |_| {
            Err(HandlerError::rejected("read-only"))
        });

        assert!(matches!(service.create(&request(Some("a"), None)), Err(CrudError::Vetoed { .. })));
        assert!(service.get_all().unwrap().is_empty());
    }

    #[test]
    fn failing_after_commit_listener_does_not_fail_the_operation() {
        let (service, bus, _log) = setup(EventfulHooks);
        bus.on_after_commit("mailer", Interest::all(), |_| Err(HandlerError::failed("smtp down")));

        let created = service.create(&request(Some("a"), None)).unwrap();
        assert_eq!(created.id, Some(1));
        assert!(service.get_one(&1).unwrap().is_some());
    }

    #[test]
    fn after_commit_channel_drained_by_worker_thread() {
        let (service, bus, _log) = setup(EventfulHooks);
        let subscription = bus.after_commit_channel("worker", Interest::kind(EventKind::Created));

        let worker = std::thread::spawn(move || {
            let event = subscription.recv().unwrap();
            event.entity().and_then(|m| m.text.clone())
        });

        service.create(&request(Some("hello"), None)).unwrap();
        assert_eq!(worker.join().unwrap().as_deref(), Some("hello"));
    }

    #[test]
    fn two_single_element_pages_cover_all() {
        let (service, _bus, _log) = setup(DefaultHooks);
        service.create(&request(Some("a"), None)).unwrap();
        service.create(&request(Some("b"), None)).unwrap();

        let first = service.get_page(&PageRequest::of(0, 1)).unwrap();
        let second = service.get_page(&PageRequest::of(1, 1)).unwrap();

        assert_eq!(first.total_pages(), 2);
        assert!(first.is_first() && !first.is_last());
        assert!(second.is_last());

        let mut ids: Vec<_> = first.iter().chain(second.iter()).map(|r| r.id).collect();
        ids.sort();
        let mut all: Vec<_> = service.get_all().unwrap().into_iter().map(|r| r.id).collect();
        all.sort();
        assert_eq!(ids, all);
        assert_ne!(first.content()[0].id, second.content()[0].id);
    }

    #[test]
    fn sorted_listing_and_invalid_sort() {
        let (service, _bus, _log) = setup(DefaultHooks);
        for (text, number) in [("b", 2), ("a", 3), ("c", 1)] {
            service.create(&request(Some(text), Some(number))).unwrap();
        }

        let sorted = service.get_sorted(&Sort::from(vec![Order::desc("number")])).unwrap();
        let numbers: Vec<_> = sorted.iter().map(|r| r.number).collect();
        assert_eq!(numbers, [3, 2, 1]);

        let err = service.get_sorted(&Sort::by(["nope"])).unwrap_err();
        assert!(matches!(err, CrudError::InvalidSort(_)));
    }

    #[test]
    fn raw_entity_update_honours_ignore_list() {
        let (service, _bus, _log) = setup(EventfulHooks);
        service.create(&request(Some("a"), Some(1))).unwrap();

        let source = Model {
            id: Some(500),
            version: Some(40),
            text: None,
            number: 9,
            ..Model::default()
        };
        let updated = service.update_entity(&1, &source).unwrap().unwrap();

        assert_eq!(updated.id, Some(1));
        assert_eq!(updated.version, Some(1));
        assert_eq!(updated.text.as_deref(), Some("a"));
        assert_eq!(updated.number, 9);
    }

    /// Store whose fetch-for-update races with another writer.
    struct RacingStore {
        inner: InMemoryEntityStore<Model>,
    }

    impl EntityStore<Model> for RacingStore {
        fn create(&self, entity: Model) -> CrudResult<Model> {
            self.inner.create(entity)
        }

        fn fetch_by_id(&self, id: &i64) -> CrudResult<Option<Model>> {
            self.inner.fetch_by_id(id)
        }

        fn fetch_to_update(&self, id: &i64) -> CrudResult<Option<Model>> {
            let fetched = self.inner.fetch_by_id(id)?;
            if let Some(concurrent) = fetched.clone() {
                self.inner.save(concurrent)?;
            }
            Ok(fetched)
        }

        fn save(&self, entity: Model) -> CrudResult<Model> {
            self.inner.save(entity)
        }

        fn remove(&self, entity: &Model) -> CrudResult<()> {
            self.inner.remove(entity)
        }

        fn list_all(&self) -> CrudResult<Vec<Model>> {
            self.inner.list_all()
        }

        fn list_page(&self, request: &PageRequest) -> CrudResult<crudkit_core::Page<Model>> {
            self.inner.list_page(request)
        }

        fn list_sorted(&self, sort: &Sort) -> CrudResult<Vec<Model>> {
            self.inner.list_sorted(sort)
        }

        fn transaction<R, F>(&self, work: F) -> CrudResult<R>
        where
            F: FnOnce() -> CrudResult<R>,
        {
            self.inner.transaction(work)
        }
    }

    #[test]
    fn concurrent_modification_is_propagated() {
        let bus = Arc::new(Bus::new());
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        bus.on_after_commit("recorder", Interest::kind(EventKind::Updated), move |e| {
            sink.lock().unwrap().push((Timing::AfterCommit, e.kind(), e.entity_id().copied()));
            Ok(())
        });
        let store = RacingStore {
            inner: InMemoryEntityStore::new(),
        };
        let service: CrudService<_, _, _, _, EntityEvent<Model>> =
            CrudService::new(store, ModelMapper, EventfulHooks, Arc::clone(&bus));
        service.create(&request(Some("a"), None)).unwrap();

        let err = service.update(&1, &request(Some("b"), None)).unwrap_err();

        assert!(matches!(err, CrudError::ConcurrencyConflict { expected: 0, actual: 1, .. }));
        assert!(err.is_retryable());
        assert!(events(&log).is_empty());
    }

    #[derive(Debug, Clone)]
    enum AppEvent {
        Model(EntityEvent<Model>),
    }

    impl From<EntityEvent<Model>> for AppEvent {
        fn from(event: EntityEvent<Model>) -> Self {
            Self::Model(event)
        }
    }

    impl Event for AppEvent {
        fn event_id(&self) -> uuid::Uuid {
            match self {
                Self::Model(e) => e.event_id(),
            }
        }

        fn kind(&self) -> EventKind {
            match self {
                Self::Model(e) => e.kind(),
            }
        }

        fn entity_type(&self) -> &'static str {
            match self {
                Self::Model(e) => e.entity_type(),
            }
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            match self {
                Self::Model(e) => e.occurred_at(),
            }
        }
    }

    #[test]
    fn application_wide_event_type() {
        let bus = Arc::new(InMemoryEventBus::<AppEvent>::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.on_in_transaction("models", Interest::all().entity("Model"), move |e| {
            sink.lock().unwrap().push(e.kind());
            Ok(())
        });

        let service: CrudService<_, _, _, _, AppEvent> = CrudService::new(
            InMemoryEntityStore::<Model>::new(),
            ModelMapper,
            EventfulHooks,
            Arc::clone(&bus),
        );
        service.create(&request(Some("a"), None)).unwrap();
        service.update(&1, &request(None, Some(3))).unwrap();

        assert_eq!(*seen.lock().unwrap(), [EventKind::Created, EventKind::Updated]);

        let mut pending = PendingEvents::new();
        bus.publish(AppEvent::from(EntityEvent::deleted_reference(1)), &mut pending)
            .unwrap();
        assert_eq!(seen.lock().unwrap().len(), 3);
    }
}
