//! In-memory store and queue cache used by the service binary and tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::criteria::{CriterionDefinition, CriterionId};
use crate::listings::{Property, PropertyId};
use crate::repository::{RepositoryError, ShortlistRepository};
use crate::reviews::{QueueCache, Review, User, UserId};
use crate::scoring::CriterionScore;

#[derive(Default)]
struct StoreState {
    users: BTreeMap<UserId, User>,
    properties: BTreeMap<PropertyId, Property>,
    criteria: BTreeMap<CriterionId, CriterionDefinition>,
    scores: BTreeMap<(PropertyId, CriterionId), CriterionScore>,
    reviews: BTreeMap<(UserId, PropertyId), Review>,
    last_user: u32,
    last_property: u64,
    last_criterion: u32,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl ShortlistRepository for InMemoryStore {
    fn insert_user(&self, username: &str) -> Result<User, RepositoryError> {
        let mut state = self.state()?;
        if state
            .users
            .values()
            .any(|user| user.username.eq_ignore_ascii_case(username))
        {
            return Err(RepositoryError::Conflict(format!("user {username}")));
        }
        state.last_user += 1;
        let user = User {
            id: UserId(state.last_user),
            username: username.to_string(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn users(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.state()?.users.values().cloned().collect())
    }

    fn user_by_name(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .state()?
            .users
            .values()
            .find(|user| user.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    fn next_property_id(&self) -> Result<PropertyId, RepositoryError> {
        let mut state = self.state()?;
        state.last_property += 1;
        Ok(PropertyId(state.last_property))
    }

    fn insert_property(&self, property: Property) -> Result<Property, RepositoryError> {
        let mut state = self.state()?;
        if state.properties.contains_key(&property.id) {
            return Err(RepositoryError::Conflict(format!("property {}", property.id)));
        }
        if let Some(url) = &property.source_url {
            if state
                .properties
                .values()
                .any(|existing| existing.source_url.as_ref() == Some(url))
            {
                return Err(RepositoryError::Conflict(format!("listing {url}")));
            }
        }
        state.last_property = state.last_property.max(property.id.0);
        state.properties.insert(property.id, property.clone());
        Ok(property)
    }

    fn update_property(&self, property: Property) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        match state.properties.get_mut(&property.id) {
            Some(existing) => {
                *existing = property;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_property(&self, id: PropertyId) -> Result<Option<Property>, RepositoryError> {
        Ok(self.state()?.properties.get(&id).cloned())
    }

    fn properties(&self) -> Result<Vec<Property>, RepositoryError> {
        Ok(self.state()?.properties.values().cloned().collect())
    }

    fn delete_property(&self, id: PropertyId) -> Result<Property, RepositoryError> {
        let mut state = self.state()?;
        let removed = state
            .properties
            .remove(&id)
            .ok_or(RepositoryError::NotFound)?;
        state.scores.retain(|(property, _), _| *property != id);
        state.reviews.retain(|(_, property), _| *property != id);
        Ok(removed)
    }

    fn next_criterion_id(&self) -> Result<CriterionId, RepositoryError> {
        let mut state = self.state()?;
        state.last_criterion += 1;
        Ok(CriterionId(state.last_criterion))
    }

    fn insert_criterion(&self, criterion: CriterionDefinition) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if state.criteria.contains_key(&criterion.id)
            || state
                .criteria
                .values()
                .any(|existing| existing.key == criterion.key)
        {
            return Err(RepositoryError::Conflict(format!("criterion {}", criterion.key)));
        }
        state.last_criterion = state.last_criterion.max(criterion.id.0);
        state.criteria.insert(criterion.id, criterion);
        Ok(())
    }

    fn update_criterion(&self, criterion: CriterionDefinition) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        match state.criteria.get_mut(&criterion.id) {
            Some(existing) => {
                *existing = criterion;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_criterion(
        &self,
        id: CriterionId,
    ) -> Result<Option<CriterionDefinition>, RepositoryError> {
        Ok(self.state()?.criteria.get(&id).cloned())
    }

    fn criteria(&self) -> Result<Vec<CriterionDefinition>, RepositoryError> {
        Ok(self.state()?.criteria.values().cloned().collect())
    }

    fn delete_criterion(&self, id: CriterionId) -> Result<CriterionDefinition, RepositoryError> {
        let mut state = self.state()?;
        let removed = state.criteria.remove(&id).ok_or(RepositoryError::NotFound)?;
        state.scores.retain(|(_, criterion), _| *criterion != id);
        Ok(removed)
    }

    fn upsert_score(&self, score: CriterionScore) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if !state.properties.contains_key(&score.property)
            || !state.criteria.contains_key(&score.criterion)
        {
            return Err(RepositoryError::NotFound);
        }
        state
            .scores
            .insert((score.property, score.criterion), score);
        Ok(())
    }

    fn fetch_score(
        &self,
        property: PropertyId,
        criterion: CriterionId,
    ) -> Result<Option<CriterionScore>, RepositoryError> {
        Ok(self.state()?.scores.get(&(property, criterion)).cloned())
    }

    fn scores_for(&self, property: PropertyId) -> Result<Vec<CriterionScore>, RepositoryError> {
        Ok(self
            .state()?
            .scores
            .range((property, CriterionId(0))..=(property, CriterionId(u32::MAX)))
            .map(|(_, score)| score.clone())
            .collect())
    }

    fn upsert_review(&self, review: Review) -> Result<Option<Review>, RepositoryError> {
        let mut state = self.state()?;
        if !state.users.contains_key(&review.user)
            || !state.properties.contains_key(&review.property)
        {
            return Err(RepositoryError::NotFound);
        }
        Ok(state.reviews.insert((review.user, review.property), review))
    }

    fn delete_review(
        &self,
        user: UserId,
        property: PropertyId,
    ) -> Result<Option<Review>, RepositoryError> {
        Ok(self.state()?.reviews.remove(&(user, property)))
    }

    fn reviews_for(&self, property: PropertyId) -> Result<Vec<Review>, RepositoryError> {
        Ok(self
            .state()?
            .reviews
            .values()
            .filter(|review| review.property == property)
            .cloned()
            .collect())
    }

    fn reviews_by(&self, user: UserId) -> Result<Vec<Review>, RepositoryError> {
        Ok(self
            .state()?
            .reviews
            .range((user, PropertyId(0))..=(user, PropertyId(u64::MAX)))
            .map(|(_, review)| review.clone())
            .collect())
    }
}

/// Queue cache keeping one deque per user behind a single lock.
#[derive(Default)]
pub struct InMemoryQueueCache {
    queues: Mutex<HashMap<UserId, VecDeque<PropertyId>>>,
}

impl InMemoryQueueCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn queues(&self) -> Result<MutexGuard<'_, HashMap<UserId, VecDeque<PropertyId>>>, RepositoryError> {
        self.queues
            .lock()
            .map_err(|_| RepositoryError::Unavailable("queue mutex poisoned".to_string()))
    }
}

impl QueueCache for InMemoryQueueCache {
    fn load(&self, user: UserId) -> Result<Vec<PropertyId>, RepositoryError> {
        Ok(self
            .queues()?
            .get(&user)
            .map(|queue| queue.iter().copied().collect())
            .unwrap_or_default())
    }

    fn replace(&self, user: UserId, queue: Vec<PropertyId>) -> Result<(), RepositoryError> {
        self.queues()?.insert(user, queue.into());
        Ok(())
    }

    fn remove(&self, user: UserId, property: PropertyId) -> Result<bool, RepositoryError> {
        let mut queues = self.queues()?;
        let Some(queue) = queues.get_mut(&user) else {
            return Ok(false);
        };
        let before = queue.len();
        queue.retain(|queued| *queued != property);
        Ok(queue.len() != before)
    }

    fn push_front(&self, user: UserId, property: PropertyId) -> Result<(), RepositoryError> {
        let mut queues = self.queues()?;
        let queue = queues.entry(user).or_default();
        queue.retain(|queued| *queued != property);
        queue.push_front(property);
        Ok(())
    }

    fn purge(&self, property: PropertyId) -> Result<(), RepositoryError> {
        for queue in self.queues()?.values_mut() {
            queue.retain(|queued| *queued != property);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::{NewProperty, PropertyKind};
    use crate::reviews::ReviewStatus;
    use chrono::Utc;

    fn listing(url: Option<&str>) -> NewProperty {
        NewProperty {
            kind: PropertyKind::House,
            address: "Stationsstraat 8, 3110 Rotselaar".to_string(),
            seller: None,
            price: 210_000,
            total_area: 500,
            inhabitable_area: Some(120),
            source_url: url.map(str::to_string),
            added_on: None,
            information: BTreeMap::new(),
            features: Vec::new(),
        }
    }

    #[test]
    fn duplicate_listing_urls_conflict() {
        let store = InMemoryStore::new();
        let first = store.next_property_id().expect("id");
        store
            .insert_property(Property::new(first, listing(Some("https://a")), BTreeMap::new()))
            .expect("insert");

        let second = store.next_property_id().expect("id");
        let result =
            store.insert_property(Property::new(second, listing(Some("https://a")), BTreeMap::new()));
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
        assert_eq!(store.properties().expect("list").len(), 1);
    }

    #[test]
    fn deleting_a_property_cascades() {
        let store = InMemoryStore::new();
        let user = store.insert_user("ben").expect("user");
        let id = store.next_property_id().expect("id");
        store
            .insert_property(Property::new(id, listing(None), BTreeMap::new()))
            .expect("insert");
        store
            .upsert_review(Review {
                user: user.id,
                property: id,
                status: ReviewStatus::Accepted,
                reviewed_at: Utc::now(),
            })
            .expect("review");

        store.delete_property(id).expect("delete");
        assert!(store.reviews_by(user.id).expect("reviews").is_empty());
        assert_eq!(store.delete_property(id), Err(RepositoryError::NotFound));
    }

    #[test]
    fn queue_cache_replaces_and_reinserts() {
        let cache = InMemoryQueueCache::new();
        let user = UserId(1);
        cache
            .replace(user, vec![PropertyId(3), PropertyId(1), PropertyId(2)])
            .expect("replace");

        assert!(cache.remove(user, PropertyId(1)).expect("remove"));
        assert!(!cache.remove(user, PropertyId(1)).expect("remove"));
        cache.push_front(user, PropertyId(1)).expect("push");
        assert_eq!(
            cache.load(user).expect("load"),
            vec![PropertyId(1), PropertyId(3), PropertyId(2)]
        );

        cache.purge(PropertyId(3)).expect("purge");
        assert_eq!(cache.load(user).expect("load"), vec![PropertyId(1), PropertyId(2)]);
        assert!(cache.load(UserId(9)).expect("load").is_empty());
    }
}
