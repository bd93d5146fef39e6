use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::criteria::{CriterionId, NewCriterion, TravelTimeTable};
use crate::listings::{Applicability, NewProperty, PropertyId, PropertyKind};
use crate::memory::{InMemoryQueueCache, InMemoryStore};
use crate::repository::RepositoryError;
use crate::reviews::{QueueCache, UserId};
use crate::service::ShortlistService;

pub(super) const BRUSSELS: &str = "VUB, Brussel";
pub(super) const LEUVEN: &str = "Campus Arenberg, Heverlee";
pub(super) const HERENT: &str = "Kerkstraat 1, 3020 Herent";

pub(super) type MemoryService = ShortlistService<InMemoryStore, InMemoryQueueCache>;

pub(super) fn travel_times() -> TravelTimeTable {
    TravelTimeTable::new()
        .with_route(HERENT, BRUSSELS, 3600)
        .with_route(HERENT, LEUVEN, 900)
}

pub(super) fn household() -> Vec<String> {
    vec!["ben".to_string(), "melissa".to_string()]
}

/// Service with the two-person household registered and the builtin
/// catalog synchronized.
pub(super) fn service() -> MemoryService {
    service_with_queue(Arc::new(InMemoryQueueCache::new()))
}

pub(super) fn service_with_queue<Q: QueueCache + 'static>(
    queues: Arc<Q>,
) -> ShortlistService<InMemoryStore, Q> {
    let service = ShortlistService::new(
        Arc::new(InMemoryStore::new()),
        queues,
        Arc::new(travel_times()),
    );
    service
        .register_household(&household())
        .expect("household registers");
    service.sync_catalog().expect("catalog syncs");
    service
}

pub(super) fn house(address: &str, price: u32, total_area: u32, information: &[(&str, &str)]) -> NewProperty {
    NewProperty {
        kind: PropertyKind::House,
        address: address.to_string(),
        seller: Some("Immo Vlaanderen".to_string()),
        price,
        total_area,
        inhabitable_area: Some(150),
        source_url: None,
        added_on: None,
        information: information
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        features: vec!["Garden".to_string()],
    }
}

pub(super) fn land(address: &str, price: u32, total_area: u32) -> NewProperty {
    NewProperty {
        kind: PropertyKind::Land,
        address: address.to_string(),
        seller: None,
        price,
        total_area,
        inhabitable_area: None,
        source_url: None,
        added_on: None,
        information: BTreeMap::new(),
        features: Vec::new(),
    }
}

/// House in Herent where every builtin criterion can be computed.
pub(super) fn complete_house() -> NewProperty {
    house(
        HERENT,
        135_000,
        900,
        &[
            ("Bouwjaar", "2016"),
            ("EPC waarde", "150 kWh/m²"),
            ("Type verwarming", "Gas"),
            ("Bebouwing", "Open"),
            ("Kadastraal Inkomen", "€700"),
            ("Ruimtelijke ordening", "Woongebied"),
        ],
    )
}

pub(super) fn manual_criterion(name: &str, dealbreaker: bool) -> NewCriterion {
    NewCriterion {
        name: name.to_string(),
        dealbreaker,
        importance: 7,
        applies_to: Applicability::BOTH,
        formula: None,
        positive_description: Some(format!("{name} is fine")),
        negative_description: Some(format!("{name} is a problem")),
        unknown_description: None,
    }
}

pub(super) fn criterion_id(service: &MemoryService, key: &str) -> CriterionId {
    service
        .criteria()
        .expect("criteria list")
        .into_iter()
        .find(|criterion| criterion.key == key)
        .map(|criterion| criterion.id)
        .expect("criterion exists")
}

/// Queue cache whose writes always fail, used to exercise rollbacks.
#[derive(Default)]
pub(super) struct BrokenQueue;

impl QueueCache for BrokenQueue {
    fn load(&self, _user: UserId) -> Result<Vec<PropertyId>, RepositoryError> {
        Ok(Vec::new())
    }

    fn replace(&self, _user: UserId, _queue: Vec<PropertyId>) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("queue offline".to_string()))
    }

    fn remove(&self, _user: UserId, _property: PropertyId) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("queue offline".to_string()))
    }

    fn push_front(&self, _user: UserId, _property: PropertyId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("queue offline".to_string()))
    }

    fn purge(&self, _property: PropertyId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("queue offline".to_string()))
    }
}

/// Queue cache that stops inside the first `replace` until released, so a
/// rebuild can be held between computing its order and writing it.
pub(super) struct PausingQueue {
    inner: InMemoryQueueCache,
    gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
}

/// Handles for a [`PausingQueue`]: `entered` fires once the rebuild is
/// waiting, `release` lets it finish.
pub(super) struct Pause {
    pub(super) entered: Receiver<()>,
    pub(super) release: Sender<()>,
}

impl PausingQueue {
    pub(super) fn new() -> (Self, Pause) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let queue = Self {
            inner: InMemoryQueueCache::new(),
            gate: Mutex::new(Some((entered_tx, release_rx))),
        };
        (
            queue,
            Pause {
                entered: entered_rx,
                release: release_tx,
            },
        )
    }
}

impl QueueCache for PausingQueue {
    fn load(&self, user: UserId) -> Result<Vec<PropertyId>, RepositoryError> {
        self.inner.load(user)
    }

    fn replace(&self, user: UserId, queue: Vec<PropertyId>) -> Result<(), RepositoryError> {
        let gate = self.gate.lock().ok().and_then(|mut gate| gate.take());
        if let Some((entered, release)) = gate {
            let _ = entered.send(());
            let _ = release.recv();
        }
        self.inner.replace(user, queue)
    }

    fn remove(&self, user: UserId, property: PropertyId) -> Result<bool, RepositoryError> {
        self.inner.remove(user, property)
    }

    fn push_front(&self, user: UserId, property: PropertyId) -> Result<(), RepositoryError> {
        self.inner.push_front(user, property)
    }

    fn purge(&self, property: PropertyId) -> Result<(), RepositoryError> {
        self.inner.purge(property)
    }
}
