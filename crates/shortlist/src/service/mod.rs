//! Shortlist service composing the store, the queue cache, the criterion
//! registry and the travel-time lookup.
//!
//! Every mutation either completes or leaves the store as it found it: where
//! two collaborators are touched (reviews and the queue cache), a failure in
//! the second step restores the first.

mod fields;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::criteria::{
    CatalogEntry, CriterionDefinition, CriterionError, CriterionId, CriterionRegistry,
    CriterionUpdate, NewCriterion, TravelTimeLookup,
};
use crate::listings::{InformationKey, NewProperty, Property, PropertyId, PropertyKind};
use crate::repository::{RepositoryError, ShortlistRepository};
use crate::reviews::{
    consensus_status, order_queue, ConsensusStatus, InvalidReviewStatus, QueueCache,
    QueueCandidate, QueueHead, Review, ReviewStatus, User, UserId,
};
use crate::scoring::{
    assess, ensure_default, manual_score_in_range, recompute_default, CriterionScore,
    CriterionView, PropertyAssessment,
};

pub use fields::{build_editable_fields, EditableField, FieldKind};

pub struct ShortlistService<S, Q> {
    store: Arc<S>,
    queues: Arc<Q>,
    registry: Arc<CriterionRegistry>,
    travel: Arc<dyn TravelTimeLookup>,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

/// Outcome of [`ShortlistService::sync_catalog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSync {
    pub criteria_created: usize,
    pub scores_filled: usize,
}

/// Outcome of [`ShortlistService::ingest_batch`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub created: Vec<PropertyId>,
    pub duplicates: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewDetail {
    pub username: String,
    pub status: ReviewStatus,
}

impl<S, Q> ShortlistService<S, Q>
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    pub fn new(store: Arc<S>, queues: Arc<Q>, travel: Arc<dyn TravelTimeLookup>) -> Self {
        Self::with_registry(store, queues, travel, CriterionRegistry::builtin())
    }

    pub fn with_registry(
        store: Arc<S>,
        queues: Arc<Q>,
        travel: Arc<dyn TravelTimeLookup>,
        registry: CriterionRegistry,
    ) -> Self {
        Self {
            store,
            queues,
            registry: Arc::new(registry),
            travel,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &CriterionRegistry {
        &self.registry
    }

    /// Registry rows for catalog synchronization.
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.registry.catalog()
    }

    /// Creates the household members that do not exist yet.
    pub fn register_household(&self, usernames: &[String]) -> Result<Vec<User>, ShortlistError> {
        for username in usernames {
            if self.store.user_by_name(username)?.is_none() {
                let user = self.store.insert_user(username)?;
                info!(user = %user.username, "registered household member");
            }
        }
        Ok(self.store.users()?)
    }

    pub fn users(&self) -> Result<Vec<User>, ShortlistError> {
        Ok(self.store.users()?)
    }

    /// Materializes missing builtin criteria and missing score rows. Rows that
    /// already carry a default score and comment are left alone.
    pub fn sync_catalog(&self) -> Result<CatalogSync, ShortlistError> {
        let mut outcome = CatalogSync::default();
        let existing: HashSet<String> = self
            .store
            .criteria()?
            .into_iter()
            .map(|criterion| criterion.key)
            .collect();

        for builtin in self.registry.entries() {
            if existing.contains(builtin.key) {
                continue;
            }
            let id = self.store.next_criterion_id()?;
            self.store
                .insert_criterion(CriterionDefinition::from_builtin(id, builtin))?;
            outcome.criteria_created += 1;
        }

        let criteria = self.store.criteria()?;
        for property in self.store.properties()? {
            outcome.scores_filled += self.fill_scores(&property, &criteria)?;
        }

        if outcome.criteria_created > 0 {
            info!(
                created = outcome.criteria_created,
                filled = outcome.scores_filled,
                "criterion catalog synchronized"
            );
        }
        Ok(outcome)
    }

    fn fill_scores(
        &self,
        property: &Property,
        criteria: &[CriterionDefinition],
    ) -> Result<usize, ShortlistError> {
        let mut filled = 0;
        for criterion in applicable(criteria, property.kind()) {
            let existing = self.store.fetch_score(property.id, criterion.id)?;
            let created = existing.is_none();
            let mut row =
                existing.unwrap_or_else(|| CriterionScore::new(property.id, criterion.id));
            let changed = ensure_default(
                &mut row,
                criterion,
                property,
                &self.registry,
                self.travel.as_ref(),
            );
            if created || changed {
                self.store.upsert_score(row)?;
                filled += 1;
            }
        }
        Ok(filled)
    }

    pub fn property(&self, id: PropertyId) -> Result<Property, ShortlistError> {
        Ok(self
            .store
            .fetch_property(id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    pub fn properties(&self) -> Result<Vec<Property>, ShortlistError> {
        Ok(self.store.properties()?)
    }

    /// Stores a scraped listing and computes a default for every applicable
    /// criterion. Unknown or inapplicable information fields are dropped.
    pub fn create_property(&self, listing: NewProperty) -> Result<Property, ShortlistError> {
        let mut information = BTreeMap::new();
        for (raw_key, value) in &listing.information {
            match InformationKey::resolve(raw_key) {
                Some(key) if key.category().applies_to.includes(listing.kind) => {
                    information.insert(key, value.clone());
                }
                Some(key) => {
                    debug!(%key, kind = listing.kind.label(), "dropping inapplicable information");
                }
                None => debug!(field = %raw_key, "dropping unknown information field"),
            }
        }

        let id = self.store.next_property_id()?;
        let property = self
            .store
            .insert_property(Property::new(id, listing, information))?;

        let criteria = self.store.criteria()?;
        if let Err(err) = self.fill_scores(&property, &criteria) {
            self.store.delete_property(property.id)?;
            return Err(err);
        }

        info!(
            property = %property.id,
            kind = property.kind().label(),
            address = %property.address,
            "property created"
        );
        Ok(property)
    }

    /// Creates every listing, counting duplicates instead of failing on them.
    pub fn ingest_batch(
        &self,
        listings: impl IntoIterator<Item = NewProperty>,
    ) -> Result<IngestReport, ShortlistError> {
        let mut report = IngestReport::default();
        for listing in listings {
            match self.create_property(listing) {
                Ok(property) => report.created.push(property.id),
                Err(ShortlistError::Repository(RepositoryError::Conflict(what))) => {
                    warn!(%what, "skipping duplicate listing");
                    report.duplicates += 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }

    /// Validates every field against the catalog before touching the listing,
    /// then refreshes the computed defaults.
    pub fn update_information(
        &self,
        property: PropertyId,
        values: BTreeMap<String, Option<String>>,
    ) -> Result<Property, ShortlistError> {
        let mut stored = self.property(property)?;

        let mut resolved = Vec::with_capacity(values.len());
        for (raw_key, value) in values {
            let key = InformationKey::resolve(&raw_key)
                .ok_or_else(|| ShortlistError::UnknownInformation(raw_key.clone()))?;
            if !key.category().applies_to.includes(stored.kind()) {
                warn!(%key, property = %property, "rejected inapplicable information");
                return Err(ShortlistError::InformationNotApplicable {
                    key,
                    kind: stored.kind(),
                });
            }
            resolved.push((key, value));
        }

        let mut changed = false;
        for (key, value) in resolved {
            changed |= stored.set_information(key, value);
        }
        if changed {
            self.store.update_property(stored.clone())?;
            self.on_information_changed(property)?;
        }
        Ok(stored)
    }

    /// Recomputes the cached default of every builtin criterion of the
    /// property. Returns the number of rows whose default changed.
    pub fn on_information_changed(&self, property: PropertyId) -> Result<usize, ShortlistError> {
        let property = self.property(property)?;
        let criteria = self.store.criteria()?;
        let mut refreshed = 0;

        for criterion in applicable(&criteria, property.kind()) {
            let existing = self.store.fetch_score(property.id, criterion.id)?;
            let created = existing.is_none();
            let mut row =
                existing.unwrap_or_else(|| CriterionScore::new(property.id, criterion.id));
            let changed = recompute_default(
                &mut row,
                criterion,
                &property,
                &self.registry,
                self.travel.as_ref(),
            );
            if created || changed {
                self.store.upsert_score(row)?;
            }
            if changed {
                refreshed += 1;
            }
        }

        debug!(property = %property.id, refreshed, "criterion defaults refreshed");
        Ok(refreshed)
    }

    pub fn criteria(&self) -> Result<Vec<CriterionDefinition>, ShortlistError> {
        let mut criteria = self.store.criteria()?;
        criteria.sort_by(|left, right| left.catalog_order(right));
        Ok(criteria)
    }

    fn criterion(&self, id: CriterionId) -> Result<CriterionDefinition, ShortlistError> {
        Ok(self
            .store
            .fetch_criterion(id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    /// Adds a manually scored criterion and a score row for every listing it
    /// applies to.
    pub fn add_criterion(
        &self,
        criterion: NewCriterion,
    ) -> Result<CriterionDefinition, ShortlistError> {
        let key = criterion.key();
        if self.registry.get(&key).is_some()
            || self
                .store
                .criteria()?
                .iter()
                .any(|existing| existing.key == key)
        {
            warn!(%key, "rejected duplicate criterion");
            return Err(CriterionError::DuplicateKey(key).into());
        }

        let id = self.store.next_criterion_id()?;
        let definition = criterion.into_definition(id)?;
        self.store.insert_criterion(definition.clone())?;

        for property in self.store.properties()? {
            if definition.applies_to.includes(property.kind()) {
                self.store
                    .upsert_score(CriterionScore::new(property.id, definition.id))?;
            }
        }

        info!(criterion = %definition.key, "criterion added");
        Ok(definition)
    }

    pub fn update_criterion(
        &self,
        id: CriterionId,
        update: CriterionUpdate,
    ) -> Result<CriterionDefinition, ShortlistError> {
        let mut criterion = self.criterion(id)?;
        update.apply(&mut criterion)?;
        self.store.update_criterion(criterion.clone())?;
        Ok(criterion)
    }

    /// Builtin criteria cannot be deleted; other criteria take their score
    /// rows with them.
    pub fn delete_criterion(&self, id: CriterionId) -> Result<CriterionDefinition, ShortlistError> {
        let criterion = self.criterion(id)?;
        if criterion.builtin {
            warn!(criterion = %criterion.key, "rejected deletion of builtin criterion");
            return Err(CriterionError::ImmutableBuiltin(criterion.key).into());
        }
        Ok(self.store.delete_criterion(id)?)
    }

    /// Overrides the computed default. `None` clears the manual score while
    /// keeping the comment.
    pub fn set_manual_score(
        &self,
        property: PropertyId,
        criterion: CriterionId,
        score: Option<u8>,
        comment: Option<String>,
    ) -> Result<CriterionScore, ShortlistError> {
        let stored = self.property(property)?;
        let definition = self.criterion(criterion)?;

        if !definition.applies_to.includes(stored.kind()) {
            warn!(criterion = %definition.key, property = %property, "rejected inapplicable score");
            return Err(ShortlistError::CriterionNotApplicable {
                criterion: definition.key,
                kind: stored.kind(),
            });
        }
        if let Some(score) = score {
            if !manual_score_in_range(&definition, score) {
                warn!(criterion = %definition.key, score, "rejected out of range score");
                return Err(ShortlistError::ScoreOutOfRange {
                    criterion: definition.key,
                    score,
                    max: if definition.dealbreaker { 1 } else { 10 },
                });
            }
        }

        let mut row = self
            .store
            .fetch_score(property, criterion)?
            .unwrap_or_else(|| CriterionScore::new(property, criterion));
        row.set_manual(score, comment);
        self.store.upsert_score(row.clone())?;
        Ok(row)
    }

    /// Drops the manual override so the default shows again.
    pub fn clear_manual_score(
        &self,
        property: PropertyId,
        criterion: CriterionId,
    ) -> Result<CriterionScore, ShortlistError> {
        let mut row = self
            .store
            .fetch_score(property, criterion)?
            .ok_or(RepositoryError::NotFound)?;
        row.clear_manual();
        self.store.upsert_score(row.clone())?;
        Ok(row)
    }

    pub fn assessment(&self, property: PropertyId) -> Result<PropertyAssessment, ShortlistError> {
        let property = self.property(property)?;
        let criteria = self.store.criteria()?;
        let scores = self.store.scores_for(property.id)?;
        Ok(assess(&property, &criteria, &scores))
    }

    pub fn aggregate_score(&self, property: PropertyId) -> Result<u8, ShortlistError> {
        Ok(self.assessment(property)?.score)
    }

    pub fn dealbreakers(&self, property: PropertyId) -> Result<Vec<CriterionView>, ShortlistError> {
        Ok(self.assessment(property)?.dealbreakers)
    }

    /// Positive and negative aspects.
    pub fn aspects(
        &self,
        property: PropertyId,
    ) -> Result<(Vec<CriterionView>, Vec<CriterionView>), ShortlistError> {
        let assessment = self.assessment(property)?;
        Ok((assessment.positive, assessment.negative))
    }

    pub fn potential_problems(
        &self,
        property: PropertyId,
    ) -> Result<Vec<CriterionView>, ShortlistError> {
        Ok(self.assessment(property)?.potential_problems)
    }

    pub fn dealbreaker_warning(&self, property: PropertyId) -> Result<Option<String>, ShortlistError> {
        Ok(self.assessment(property)?.dealbreaker_warning())
    }

    pub fn editable_fields(&self, property: PropertyId) -> Result<Vec<EditableField>, ShortlistError> {
        let property = self.property(property)?;
        let criteria = self.criteria()?;
        let scores = self.store.scores_for(property.id)?;
        Ok(build_editable_fields(&property, &criteria, &scores))
    }

    pub fn consensus_status(&self, property: PropertyId) -> Result<ConsensusStatus, ShortlistError> {
        self.property(property)?;
        let household = self.store.users()?.len();
        let reviews = self.store.reviews_for(property)?;
        Ok(consensus_status(
            reviews.iter().map(|review| review.status),
            household,
        ))
    }

    pub fn review_details(&self, property: PropertyId) -> Result<Vec<ReviewDetail>, ShortlistError> {
        self.property(property)?;
        let names: HashMap<UserId, String> = self
            .store
            .users()?
            .into_iter()
            .map(|user| (user.id, user.username))
            .collect();

        Ok(self
            .store
            .reviews_for(property)?
            .into_iter()
            .filter_map(|review| {
                names.get(&review.user).map(|username| ReviewDetail {
                    username: username.clone(),
                    status: review.status,
                })
            })
            .collect())
    }

    /// Unsold listings of the given kinds that somebody did not reject.
    pub fn shortlist(&self, kinds: &[PropertyKind]) -> Result<Vec<Property>, ShortlistError> {
        let mut shortlisted = Vec::new();
        for property in self.store.properties()? {
            if property.sold || !kinds.contains(&property.kind()) {
                continue;
            }
            let reviews = self.store.reviews_for(property.id)?;
            if reviews
                .iter()
                .any(|review| review.status != ReviewStatus::Rejected)
            {
                shortlisted.push(property);
            }
        }
        Ok(shortlisted)
    }

    fn user(&self, username: &str) -> Result<User, ShortlistError> {
        self.store
            .user_by_name(username)?
            .ok_or_else(|| ShortlistError::UnknownUser(username.to_string()))
    }

    fn user_lock(&self, user: UserId) -> Result<Arc<Mutex<()>>, ShortlistError> {
        let mut locks = self
            .user_locks
            .lock()
            .map_err(|_| RepositoryError::Unavailable("user lock table poisoned".to_string()))?;
        Ok(locks.entry(user).or_default().clone())
    }

    /// Runs `operation` while holding the user's review/queue boundary.
    fn with_user<T>(
        &self,
        user: UserId,
        operation: impl FnOnce() -> Result<T, ShortlistError>,
    ) -> Result<T, ShortlistError> {
        let lock = self.user_lock(user)?;
        let _guard = lock
            .lock()
            .map_err(|_| RepositoryError::Unavailable("user lock poisoned".to_string()))?;
        operation()
    }

    /// Runs `operation` while holding every household member's boundary,
    /// taken in id order.
    fn with_household<T>(
        &self,
        operation: impl FnOnce() -> Result<T, ShortlistError>,
    ) -> Result<T, ShortlistError> {
        let mut ids: Vec<UserId> = self.store.users()?.into_iter().map(|user| user.id).collect();
        ids.sort_unstable();
        ids.dedup();
        let locks = ids
            .into_iter()
            .map(|id| self.user_lock(id))
            .collect::<Result<Vec<_>, _>>()?;
        let mut guards = Vec::with_capacity(locks.len());
        for lock in &locks {
            guards.push(
                lock.lock()
                    .map_err(|_| RepositoryError::Unavailable("user lock poisoned".to_string()))?,
            );
        }
        let outcome = operation();
        drop(guards);
        outcome
    }

    /// Upserts the user's review and drops the property from their queue.
    pub fn record_review(
        &self,
        username: &str,
        property: PropertyId,
        status: ReviewStatus,
    ) -> Result<Review, ShortlistError> {
        let user = self.user(username)?;
        self.property(property)?;

        self.with_user(user.id, || {
            let review = Review {
                user: user.id,
                property,
                status,
                reviewed_at: Utc::now(),
            };
            let previous = self.store.upsert_review(review.clone())?;

            if let Err(err) = self.queues.remove(user.id, property) {
                match previous {
                    Some(previous) => self.store.upsert_review(previous).map(|_| ())?,
                    None => self.store.delete_review(user.id, property).map(|_| ())?,
                }
                return Err(err.into());
            }

            debug!(user = %user.username, property = %property, %status, "review recorded");
            Ok(review)
        })
    }

    /// Deletes the user's review and puts the property back at the front of
    /// their queue unless it has been sold.
    pub fn undo_review(&self, username: &str, property: PropertyId) -> Result<Review, ShortlistError> {
        let user = self.user(username)?;
        self.property(property)?;

        self.with_user(user.id, || {
            let stored = self.property(property)?;
            let removed = self
                .store
                .delete_review(user.id, property)?
                .ok_or(RepositoryError::NotFound)?;

            if !stored.sold {
                if let Err(err) = self.queues.push_front(user.id, property) {
                    self.store.upsert_review(removed)?;
                    return Err(err.into());
                }
            }

            debug!(user = %user.username, property = %property, "review undone");
            Ok(removed)
        })
    }

    /// Recomputes the user's queue from scratch and swaps it in.
    pub fn rebuild_queue(&self, username: &str) -> Result<Vec<PropertyId>, ShortlistError> {
        let user = self.user(username)?;
        self.rebuild_queue_for(&user)
    }

    fn rebuild_queue_for(&self, user: &User) -> Result<Vec<PropertyId>, ShortlistError> {
        self.with_user(user.id, || {
            let household = self.store.users()?.len();
            let criteria = self.store.criteria()?;
            let reviewed: HashSet<PropertyId> = self
                .store
                .reviews_by(user.id)?
                .into_iter()
                .map(|review| review.property)
                .collect();

            let mut candidates = Vec::new();
            for property in self.store.properties()? {
                if property.sold || reviewed.contains(&property.id) {
                    continue;
                }
                let reviews = self.store.reviews_for(property.id)?;
                let scores = self.store.scores_for(property.id)?;
                candidates.push(QueueCandidate {
                    property: property.id,
                    status: consensus_status(reviews.iter().map(|review| review.status), household),
                    score: assess(&property, &criteria, &scores).score,
                });
            }

            let queue = order_queue(candidates);
            self.queues.replace(user.id, queue.clone())?;
            info!(user = %user.username, length = queue.len(), "review queue rebuilt");
            Ok(queue)
        })
    }

    /// Periodic batch job: rebuilds every household member's queue.
    pub fn rebuild_all_queues(&self) -> Result<usize, ShortlistError> {
        let users = self.store.users()?;
        for user in &users {
            self.rebuild_queue_for(user)?;
        }
        Ok(users.len())
    }

    pub fn queue_for(&self, username: &str) -> Result<Vec<PropertyId>, ShortlistError> {
        let user = self.user(username)?;
        Ok(self.queues.load(user.id)?)
    }

    pub fn next_in_queue(&self, username: &str) -> Result<Option<QueueHead<Property>>, ShortlistError> {
        let queue = self.queue_for(username)?;
        for (index, id) in queue.iter().enumerate() {
            if let Some(property) = self.store.fetch_property(*id)? {
                return Ok(Some(QueueHead {
                    property,
                    remaining: queue.len() - index - 1,
                }));
            }
        }
        Ok(None)
    }

    /// Flags the listing as sold and takes it out of every queue.
    /// Flags the listing as sold and takes it out of every queue. Holds every
    /// user's boundary, so no rebuild or undo interleaves with the purge.
    pub fn mark_sold(&self, property: PropertyId) -> Result<Property, ShortlistError> {
        self.property(property)?;
        let stored = self.with_household(|| {
            let mut stored = self.property(property)?;
            if !stored.sold {
                stored.sold = true;
                self.store.update_property(stored.clone())?;
            }
            self.queues.purge(property)?;
            Ok(stored)
        })?;
        info!(property = %property, "property marked sold");
        Ok(stored)
    }

    pub fn delete_property(&self, property: PropertyId) -> Result<Property, ShortlistError> {
        let removed = self.with_household(|| {
            let removed = self.store.delete_property(property)?;
            self.queues.purge(property)?;
            Ok(removed)
        })?;
        info!(property = %property, "property deleted");
        Ok(removed)
    }
}

fn applicable(
    criteria: &[CriterionDefinition],
    kind: PropertyKind,
) -> impl Iterator<Item = &CriterionDefinition> {
    criteria
        .iter()
        .filter(move |criterion| criterion.applies_to.includes(kind))
}

/// Error raised by the shortlist service.
#[derive(Debug, thiserror::Error)]
pub enum ShortlistError {
    #[error(transparent)]
    InvalidCategory(#[from] InvalidReviewStatus),
    #[error("score {score} for '{criterion}' is outside 0..={max}")]
    ScoreOutOfRange { criterion: String, score: u8, max: u8 },
    #[error("unknown user '{0}'")]
    UnknownUser(String),
    #[error("information '{key}' does not apply to {} listings", .kind.label())]
    InformationNotApplicable { key: InformationKey, kind: PropertyKind },
    #[error("criterion '{criterion}' does not apply to {} listings", .kind.label())]
    CriterionNotApplicable { criterion: String, kind: PropertyKind },
    #[error("unknown information field '{0}'")]
    UnknownInformation(String),
    #[error(transparent)]
    Criterion(#[from] CriterionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
