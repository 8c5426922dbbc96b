//! Household workspace
//!
//! A workspace binds one session to one household at a time. It keeps one
//! store listener per collection; each listener task applies the snapshots
//! it receives to the shared [`HouseholdCache`] and notifies the session's
//! WebSocket clients.
//!
//! Switching households unsubscribes every listener from the store before
//! the cache is cleared, and bumps a generation counter so a snapshot that
//! was already in flight for the old household is dropped instead of being
//! applied to the new one. Writes go to the store; after each write the
//! affected collection is re-read so the caller sees its own change even
//! before the listener catches up. Snapshots carry the store's write
//! version, and an older version never replaces a newer one.

use crate::household::error::{HouseholdError, HouseholdResult};
use crate::household::key::HouseholdKey;
use crate::planner::{
    self, draw_range, in_window, meal_entries, plan_migration, redraw_meal, schedule,
    Collection, DateRange, DrawOutcome, DrawnMeal, DrawnMealPartition, GroceryCatalog,
    GroceryCatalogItem, HouseholdCache, Meal, PlannerError, Resolution, ShoppingListEntry,
    DEFAULT_GRACE_WINDOW_MS, SCHEMA_VERSION,
};
use crate::storage::{DbPath, ListenerId, Snapshot, TreeStore};
use crate::websocket::{ConnectionHub, WsEvent};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Planner knobs used by a workspace
#[derive(Debug, Clone, Copy)]
pub struct WorkspaceSettings {
    /// How long a past drawn meal still counts as upcoming
    pub grace_window_ms: i64,
    /// Longest date range a single draw may cover
    pub max_draw_days: u32,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            grace_window_ms: DEFAULT_GRACE_WINDOW_MS,
            max_draw_days: 31,
        }
    }
}

/// A drawn meal together with its meal's title
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledMeal {
    pub id: String,
    pub meal_id: String,
    /// `None` when the meal was deleted after being drawn
    pub title: Option<String>,
    pub assigned_date: NaiveDate,
}

/// Overview shown on the home page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeSummary {
    pub household: HouseholdKey,
    pub meal_count: usize,
    pub upcoming: Vec<ScheduledMeal>,
    /// Unpurchased entries for the coming week
    pub unpurchased_count: usize,
}

struct CacheSlot {
    household: Option<HouseholdKey>,
    generation: u64,
    versions: HashMap<Collection, u64>,
    cache: HouseholdCache,
}

impl CacheSlot {
    /// Apply a snapshot unless it belongs to an older generation or is older
    /// than what the cache already holds.
    fn apply(&mut self, generation: u64, collection: Collection, snapshot: Snapshot) -> bool {
        if generation != self.generation {
            return false;
        }
        if matches!(self.versions.get(&collection), Some(&seen) if snapshot.version < seen) {
            return false;
        }
        self.versions.insert(collection, snapshot.version);
        self.cache.apply_snapshot(collection, snapshot.value);
        true
    }

    fn reset(&mut self, household: Option<HouseholdKey>) -> u64 {
        self.generation += 1;
        self.household = household;
        self.versions.clear();
        self.cache.clear();
        self.generation
    }
}

struct ActiveListener {
    id: ListenerId,
    task: JoinHandle<()>,
}

/// One session's view of its active household
pub struct Workspace {
    store: Arc<TreeStore>,
    hub: Option<Arc<ConnectionHub>>,
    session_id: String,
    user: HouseholdKey,
    settings: WorkspaceSettings,
    slot: Arc<RwLock<CacheSlot>>,
    /// Held for the whole of a switch or close
    listeners: Mutex<Vec<ActiveListener>>,
}

impl Workspace {
    /// A workspace with no household yet
    pub fn new(
        store: Arc<TreeStore>,
        hub: Option<Arc<ConnectionHub>>,
        session_id: impl Into<String>,
        user: HouseholdKey,
        settings: WorkspaceSettings,
    ) -> Self {
        Self {
            store,
            hub,
            session_id: session_id.into(),
            user,
            settings,
            slot: Arc::new(RwLock::new(CacheSlot {
                household: None,
                generation: 0,
                versions: HashMap::new(),
                cache: HouseholdCache::new(),
            })),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Create a workspace and open `household`
    pub async fn open(
        store: Arc<TreeStore>,
        hub: Option<Arc<ConnectionHub>>,
        session_id: impl Into<String>,
        user: HouseholdKey,
        household: HouseholdKey,
        settings: WorkspaceSettings,
    ) -> HouseholdResult<Self> {
        let workspace = Self::new(store, hub, session_id, user, settings);
        workspace.switch(household).await?;
        Ok(workspace)
    }

    pub fn user(&self) -> &HouseholdKey {
        &self.user
    }

    pub fn settings(&self) -> WorkspaceSettings {
        self.settings
    }

    /// Household currently open, if any
    pub async fn household(&self) -> Option<HouseholdKey> {
        self.slot.read().await.household.clone()
    }

    async fn active(&self) -> HouseholdResult<HouseholdKey> {
        self.household().await.ok_or(HouseholdError::Closed)
    }

    /// Number of store listeners owned by this workspace
    pub async fn listener_count(&self) -> usize {
        self.listeners.lock().await.len()
    }

    /// Make `key` the active household. Returns false if it already was.
    ///
    /// On error no household is active and every new listener is released,
    /// so a later switch to the same key starts from scratch.
    pub async fn switch(&self, key: HouseholdKey) -> HouseholdResult<bool> {
        let mut listeners = self.listeners.lock().await;

        if self.slot.read().await.household.as_ref() == Some(&key) {
            tracing::debug!(household = %key, "Household already active");
            return Ok(false);
        }

        self.release(&mut listeners);
        let generation = self.slot.write().await.reset(Some(key.clone()));

        if let Err(e) = self.attach(&key, generation, &mut listeners).await {
            self.release(&mut listeners);
            self.slot.write().await.reset(None);
            tracing::warn!(
                session_id = %self.session_id,
                household = %key,
                error = %e,
                "Failed to open household"
            );
            return Err(e);
        }

        if let Some(hub) = &self.hub {
            hub.publish(WsEvent::switched(&self.session_id, key.as_str()));
        }

        tracing::info!(
            session_id = %self.session_id,
            household = %key,
            generation,
            "Household opened"
        );
        Ok(true)
    }

    async fn attach(
        &self,
        key: &HouseholdKey,
        generation: u64,
        listeners: &mut Vec<ActiveListener>,
    ) -> HouseholdResult<()> {
        self.migrate_if_needed(key).await?;

        for collection in Collection::ALL {
            let listener = self.listen(key, collection, generation).await?;
            listeners.push(listener);
            // Readable as soon as the switch returns
            self.refresh(key, collection).await;
        }

        self.store
            .set(&self.most_recent_path()?, Value::String(key.to_string()))
            .await?;
        Ok(())
    }

    /// Release every listener and forget the household
    pub async fn close(&self) {
        let mut listeners = self.listeners.lock().await;
        self.release(&mut listeners);
        self.slot.write().await.reset(None);
        tracing::debug!(session_id = %self.session_id, "Workspace closed");
    }

    /// Unsubscribe from the store first, then stop the tasks
    fn release(&self, listeners: &mut Vec<ActiveListener>) {
        for listener in listeners.drain(..) {
            if let Err(e) = self.store.unsubscribe(listener.id) {
                tracing::debug!(listener_id = %listener.id, error = %e, "Listener already gone");
            }
            listener.task.abort();
        }
    }

    async fn listen(
        &self,
        key: &HouseholdKey,
        collection: Collection,
        generation: u64,
    ) -> HouseholdResult<ActiveListener> {
        let mut subscription = self.store.subscribe(&key.collection(collection)).await?;
        let id = subscription.id();

        let slot = Arc::clone(&self.slot);
        let hub = self.hub.clone();
        let session_id = self.session_id.clone();
        let household = key.clone();

        let task = tokio::spawn(async move {
            while let Some(snapshot) = subscription.next().await {
                let applied = slot.write().await.apply(generation, collection, snapshot);
                if !applied {
                    tracing::trace!(%collection, household = %household, "Dropped stale snapshot");
                    continue;
                }
                if let Some(hub) = &hub {
                    hub.publish(WsEvent::changed(&session_id, household.as_str(), collection));
                }
            }
        });

        Ok(ActiveListener { id, task })
    }

    /// Convert a legacy shopping list once, then stamp the schema version
    async fn migrate_if_needed(&self, key: &HouseholdKey) -> HouseholdResult<()> {
        let version_path = key.child("schemaVersion")?;
        if self.store.get(&version_path).await.is_some() {
            return Ok(());
        }

        let list_path = key.collection(Collection::ShoppingList);
        if let Some(legacy) = self.store.get(&list_path).await.filter(planner::is_legacy) {
            let mut current = HouseholdCache::new();
            current.apply_snapshot(
                Collection::GroceryCatalog,
                self.store.get(&key.collection(Collection::GroceryCatalog)).await,
            );
            let plan = plan_migration(&legacy, current.catalog())?;

            for item in &plan.catalog_items {
                self.store
                    .set_record(&key.record(Collection::GroceryCatalog, &item.id)?, item)
                    .await?;
            }

            let mut entries = Map::new();
            for entry in &plan.entries {
                if let Some(payload) = crate::storage::to_payload(entry)? {
                    entries.insert(entry.id.clone(), payload);
                }
            }
            self.store.set(&list_path, Value::Object(entries)).await?;

            tracing::info!(
                household = %key,
                items = plan.entries.len(),
                new_groceries = plan.catalog_items.len(),
                "Migrated legacy shopping list"
            );
        }

        self.store.set(&version_path, json!(SCHEMA_VERSION)).await?;
        Ok(())
    }

    /// Re-read `collection` from the store into the cache
    async fn refresh(&self, key: &HouseholdKey, collection: Collection) {
        let snapshot = self.store.get_snapshot(&key.collection(collection)).await;
        let mut slot = self.slot.write().await;
        if slot.household.as_ref() == Some(key) {
            let generation = slot.generation;
            slot.apply(generation, collection, snapshot);
        }
    }

    /// Run `f` against the cache of the active household
    pub async fn read<R>(&self, f: impl FnOnce(&HouseholdCache) -> R) -> HouseholdResult<R> {
        let slot = self.slot.read().await;
        if slot.household.is_none() {
            return Err(HouseholdError::Closed);
        }
        Ok(f(&slot.cache))
    }

    // ---- meals ----

    pub async fn meals(&self) -> HouseholdResult<Vec<Meal>> {
        self.read(|c| c.meals().to_vec()).await
    }

    pub async fn meal(&self, id: &str) -> HouseholdResult<Meal> {
        self.read(|c| c.meal(id).cloned())
            .await?
            .ok_or_else(|| HouseholdError::not_found("Meal", id))
    }

    /// Store a new meal and return it with its id
    pub async fn add_meal(&self, mut meal: Meal) -> HouseholdResult<Meal> {
        meal.validate()?;
        let key = self.active().await?;
        self.link_ingredients(&key, &mut meal).await?;

        let id = self.store.push(&key.collection(Collection::Meals), &meal).await?;
        meal.id = id;
        self.refresh(&key, Collection::Meals).await;

        tracing::info!(household = %key, meal_id = %meal.id, title = %meal.title, "Meal added");
        Ok(meal)
    }

    /// Replace an existing meal
    pub async fn update_meal(&self, id: &str, mut meal: Meal) -> HouseholdResult<Meal> {
        meal.validate()?;
        let key = self.active().await?;
        let existing = self.meal(id).await?;

        meal.id = existing.id;
        self.link_ingredients(&key, &mut meal).await?;
        self.store
            .set_record(&key.record(Collection::Meals, id)?, &meal)
            .await?;
        self.refresh(&key, Collection::Meals).await;
        Ok(meal)
    }

    pub async fn delete_meal(&self, id: &str) -> HouseholdResult<()> {
        let key = self.active().await?;
        self.meal(id).await?;
        self.store.remove(&key.record(Collection::Meals, id)?).await?;
        self.refresh(&key, Collection::Meals).await;
        tracing::info!(household = %key, meal_id = %id, "Meal deleted");
        Ok(())
    }

    /// Point every ingredient at a catalog item, adding unknown groceries
    async fn link_ingredients(&self, key: &HouseholdKey, meal: &mut Meal) -> HouseholdResult<()> {
        for ingredient in &mut meal.ingredients {
            let item = self
                .resolve_grocery(key, &ingredient.name, ingredient.units.as_deref(), ingredient.aisle)
                .await?;
            ingredient.grocery_id = Some(item.id);
        }
        Ok(())
    }

    // ---- drawing ----

    /// Drawn meals split into history and upcoming
    pub async fn drawn_meals(&self, now: DateTime<Utc>) -> HouseholdResult<DrawnMealPartition> {
        let grace = self.settings.grace_window_ms;
        self.read(|c| c.partition(now, grace)).await
    }

    /// Attach meal titles to drawn meals
    pub async fn scheduled(&self, drawn: &[DrawnMeal]) -> HouseholdResult<Vec<ScheduledMeal>> {
        self.read(|c| {
            drawn
                .iter()
                .map(|d| ScheduledMeal {
                    id: d.id.clone(),
                    meal_id: d.meal_id.clone(),
                    title: c.meal(&d.meal_id).map(|m| m.title.clone()),
                    assigned_date: d.assigned_date,
                })
                .collect()
        })
        .await
    }

    /// Draw a meal for every unscheduled date in `start..=end`
    pub async fn draw<R: Rng + Send>(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        rng: &mut R,
    ) -> HouseholdResult<DrawOutcome> {
        let range = DateRange::bounded(start, end, self.settings.max_draw_days)?;
        let key = self.active().await?;

        let mut outcome = self
            .read(|c| draw_range(c.meals(), c.drawn_meals(), range, rng))
            .await?;

        if outcome.drawn.is_empty() && !outcome.unfilled.is_empty() {
            return Err(PlannerError::NoEligibleMeals(outcome.unfilled[0]).into());
        }

        let parent = key.collection(Collection::DrawnMeals);
        for drawn in &mut outcome.drawn {
            drawn.id = self.store.push(&parent, &*drawn).await?;
        }
        self.record_last_drawn(&key, &outcome.last_drawn).await?;

        self.refresh(&key, Collection::DrawnMeals).await;
        self.refresh(&key, Collection::Meals).await;

        tracing::info!(
            household = %key,
            drawn = outcome.drawn.len(),
            skipped = outcome.skipped.len(),
            unfilled = outcome.unfilled.len(),
            "Meals drawn"
        );
        Ok(outcome)
    }

    /// Replace the meal drawn for `date` with a different eligible one
    pub async fn redraw<R: Rng + Send>(
        &self,
        date: NaiveDate,
        rng: &mut R,
    ) -> HouseholdResult<DrawnMeal> {
        let key = self.active().await?;

        let (previous, meal_id) = self
            .read(|c| {
                let previous = schedule::on_date(c.drawn_meals(), date).cloned();
                let chosen = match &previous {
                    Some(p) => redraw_meal(c.meals(), p, rng),
                    None => planner::draw_meal(c.meals(), date, rng),
                };
                chosen.map(|m| (previous, m.id.clone()))
            })
            .await??;

        if let Some(previous) = &previous {
            self.store
                .remove(&key.record(Collection::DrawnMeals, &previous.id)?)
                .await?;
            self.forget_drawn(&key, previous).await?;
        }

        let mut drawn = DrawnMeal::new(String::new(), meal_id.clone(), date);
        drawn.id = self
            .store
            .push(&key.collection(Collection::DrawnMeals), &drawn)
            .await?;
        self.record_last_drawn(&key, &[(meal_id, date)].into_iter().collect())
            .await?;

        self.refresh(&key, Collection::DrawnMeals).await;
        self.refresh(&key, Collection::Meals).await;
        Ok(drawn)
    }

    pub async fn delete_drawn_meal(&self, id: &str) -> HouseholdResult<()> {
        let key = self.active().await?;
        let removed = self
            .read(|c| c.drawn_meal(id).cloned())
            .await?
            .ok_or_else(|| HouseholdError::not_found("Drawn meal", id))?;

        self.store
            .remove(&key.record(Collection::DrawnMeals, id)?)
            .await?;
        self.forget_drawn(&key, &removed).await?;
        self.refresh(&key, Collection::DrawnMeals).await;
        self.refresh(&key, Collection::Meals).await;
        Ok(())
    }

    /// Clear what a removed drawn meal leaves behind: the purchased flags of
    /// its ingredients, and a `lastDrawn` on its meal that only it backed
    async fn forget_drawn(&self, key: &HouseholdKey, removed: &DrawnMeal) -> HouseholdResult<()> {
        let prefix = format!("{}-", removed.id);
        let (flags, meal_exists, last_drawn) = self
            .read(|c| {
                let flags: Vec<String> = c
                    .purchases()
                    .keys()
                    .filter(|id| {
                        id.strip_prefix(&prefix)
                            .is_some_and(|index| index.parse::<usize>().is_ok())
                    })
                    .cloned()
                    .collect();
                let last_drawn = c
                    .drawn_meals()
                    .iter()
                    .filter(|d| d.meal_id == removed.meal_id && d.id != removed.id)
                    .map(|d| d.assigned_date)
                    .max();
                (flags, c.meal(&removed.meal_id).is_some(), last_drawn)
            })
            .await?;

        for id in &flags {
            self.store
                .remove(&key.record(Collection::Purchases, id)?)
                .await?;
        }
        if !flags.is_empty() {
            self.refresh(key, Collection::Purchases).await;
        }

        if meal_exists {
            let path = key.record(Collection::Meals, &removed.meal_id)?.child("lastDrawn")?;
            let value = last_drawn.map_or(Value::Null, |d| Value::String(d.to_string()));
            self.store.set(&path, value).await?;
        }

        tracing::debug!(
            household = %key,
            drawn_meal_id = %removed.id,
            purchases = flags.len(),
            last_drawn = ?last_drawn,
            "Drawn meal forgotten"
        );
        Ok(())
    }

    async fn record_last_drawn(
        &self,
        key: &HouseholdKey,
        last_drawn: &std::collections::BTreeMap<String, NaiveDate>,
    ) -> HouseholdResult<()> {
        for (meal_id, date) in last_drawn {
            let current = self.read(|c| c.meal(meal_id).and_then(|m| m.last_drawn)).await?;
            let date = current.map_or(*date, |c| c.max(*date));
            self.store
                .set(
                    &key.record(Collection::Meals, meal_id)?.child("lastDrawn")?,
                    Value::String(date.to_string()),
                )
                .await?;
        }
        Ok(())
    }

    // ---- shopping list ----

    /// The shopping list for the drawn meals in `start..=end` plus manual entries
    pub async fn shopping_list(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        include_purchased: bool,
    ) -> HouseholdResult<Vec<ShoppingListEntry>> {
        let range = DateRange::new(start, end)?;
        let entries = self
            .read(|c| {
                let drawn = in_window(c.drawn_meals(), range);
                planner::aggregate(c.meals(), &drawn, c.manual_entries(), c.purchases(), c.catalog())
            })
            .await?;

        Ok(if include_purchased {
            entries
        } else {
            planner::unpurchased(&entries)
        })
    }

    /// Find an entry by id, meal-derived or manual
    async fn entry(&self, id: &str) -> HouseholdResult<ShoppingListEntry> {
        self.read(|c| {
            if let Some(entry) = c.manual_entries().iter().find(|e| e.id == id) {
                let mut entry = entry.clone();
                if entry.aisle.is_none() {
                    entry.aisle = c.catalog().get(&entry.grocery_id).and_then(|i| i.default_aisle);
                }
                return Some(entry);
            }
            meal_entries(c.meals(), c.drawn_meals(), c.catalog())
                .into_iter()
                .find(|e| e.id == id)
                .map(|mut e| {
                    e.purchased = c.purchases().get(&e.id).copied().unwrap_or(false);
                    e
                })
        })
        .await?
        .ok_or_else(|| HouseholdError::not_found("Shopping list entry", id))
    }

    /// Add a grocery to the list by name
    pub async fn add_shopping_item(
        &self,
        name: &str,
        quantity: f64,
        units: Option<&str>,
        aisle: Option<u32>,
    ) -> HouseholdResult<ShoppingListEntry> {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(PlannerError::InvalidQuantity(quantity).into());
        }
        let key = self.active().await?;
        let item = self.resolve_grocery(&key, name, units, aisle).await?;

        let mut entry = ShoppingListEntry::manual(&item, quantity);
        if let Some(units) = units.filter(|u| !u.trim().is_empty()) {
            entry.units = Some(units.trim().to_string());
        }
        if aisle.is_some() {
            entry.aisle = aisle;
        }

        entry.id = self
            .store
            .push(&key.collection(Collection::ShoppingList), &entry)
            .await?;
        self.refresh(&key, Collection::ShoppingList).await;

        tracing::debug!(household = %key, entry_id = %entry.id, name = %entry.name, "Shopping item added");
        Ok(entry)
    }

    /// Flip an entry's purchased flag
    pub async fn toggle_purchased(&self, id: &str) -> HouseholdResult<ShoppingListEntry> {
        let key = self.active().await?;
        let entry = planner::toggle_purchased(&self.entry(id).await?);

        match entry.source {
            planner::EntrySource::Manual => {
                self.store
                    .set(
                        &key.record(Collection::ShoppingList, id)?.child("purchased")?,
                        Value::Bool(entry.purchased),
                    )
                    .await?;
                self.refresh(&key, Collection::ShoppingList).await;
            }
            planner::EntrySource::Meal => {
                let path = key.record(Collection::Purchases, id)?;
                let value = if entry.purchased { Value::Bool(true) } else { Value::Null };
                self.store.set(&path, value).await?;
                self.refresh(&key, Collection::Purchases).await;
            }
        }
        Ok(entry)
    }

    /// Change a manual entry's quantity; `None` when it dropped to zero and
    /// was removed.
    pub async fn adjust_quantity(
        &self,
        id: &str,
        delta: f64,
    ) -> HouseholdResult<Option<ShoppingListEntry>> {
        let key = self.active().await?;
        let entry = self.manual_entry(id).await?;
        let path = key.record(Collection::ShoppingList, id)?;

        let adjusted = planner::adjust_quantity(&entry, delta)?;
        match &adjusted {
            Some(updated) => self.store.set(&path.child("quantity")?, json!(updated.quantity)).await?,
            None => self.store.remove(&path).await?,
        }
        self.refresh(&key, Collection::ShoppingList).await;
        Ok(adjusted)
    }

    /// Set the aisle of an entry and make it the grocery's default aisle
    pub async fn set_aisle(&self, id: &str, aisle: Option<u32>) -> HouseholdResult<ShoppingListEntry> {
        let key = self.active().await?;
        let mut entry = self.entry(id).await?;

        if entry.source == planner::EntrySource::Manual {
            let path = key.record(Collection::ShoppingList, id)?.child("aisle")?;
            self.store.set(&path, aisle.map_or(Value::Null, |a| json!(a))).await?;
            self.refresh(&key, Collection::ShoppingList).await;
        }

        let known = self.read(|c| c.catalog().get(&entry.grocery_id).cloned()).await?;
        let mut item = match known {
            Some(item) => item,
            None => self.resolve_grocery(&key, &entry.name, entry.units.as_deref(), None).await?,
        };
        item.default_aisle = aisle;
        self.store
            .set_record(&key.record(Collection::GroceryCatalog, &item.id)?, &item)
            .await?;
        self.refresh(&key, Collection::GroceryCatalog).await;

        entry.aisle = aisle;
        Ok(entry)
    }

    /// Remove a manual entry
    pub async fn remove_entry(&self, id: &str) -> HouseholdResult<()> {
        let key = self.active().await?;
        self.manual_entry(id).await?;
        self.store
            .remove(&key.record(Collection::ShoppingList, id)?)
            .await?;
        self.refresh(&key, Collection::ShoppingList).await;
        Ok(())
    }

    /// Remove every purchased manual entry; returns how many were removed
    pub async fn clear_purchased(&self) -> HouseholdResult<usize> {
        let key = self.active().await?;
        let purchased: Vec<String> = self
            .read(|c| {
                c.manual_entries()
                    .iter()
                    .filter(|e| e.purchased)
                    .map(|e| e.id.clone())
                    .collect()
            })
            .await?;

        for id in &purchased {
            self.store
                .remove(&key.record(Collection::ShoppingList, id)?)
                .await?;
        }
        self.refresh(&key, Collection::ShoppingList).await;
        Ok(purchased.len())
    }

    async fn manual_entry(&self, id: &str) -> HouseholdResult<ShoppingListEntry> {
        let entry = self.entry(id).await?;
        if entry.source != planner::EntrySource::Manual {
            return Err(PlannerError::Invalid {
                kind: "shopping list entry",
                reason: "meal ingredients are changed on the meal".to_string(),
            }
            .into());
        }
        Ok(entry)
    }

    // ---- grocery catalog ----

    pub async fn catalog(&self) -> HouseholdResult<GroceryCatalog> {
        self.read(|c| c.catalog().clone()).await
    }

    /// Add a grocery to the catalog, or return the existing item
    pub async fn add_grocery(
        &self,
        name: &str,
        units: Option<&str>,
        aisle: Option<u32>,
    ) -> HouseholdResult<GroceryCatalogItem> {
        let key = self.active().await?;
        self.resolve_grocery(&key, name, units, aisle).await
    }

    /// Autocomplete grocery names
    pub async fn suggest(&self, query: &str, limit: usize) -> HouseholdResult<Vec<GroceryCatalogItem>> {
        self.read(|c| c.catalog().suggest(query, limit).into_iter().cloned().collect())
            .await
    }

    async fn resolve_grocery(
        &self,
        key: &HouseholdKey,
        name: &str,
        units: Option<&str>,
        aisle: Option<u32>,
    ) -> HouseholdResult<GroceryCatalogItem> {
        if name.trim().is_empty() {
            return Err(PlannerError::Invalid {
                kind: "grocery",
                reason: "name is required".to_string(),
            }
            .into());
        }

        let resolved = self
            .read(|c| match c.catalog().resolve(name, units, aisle) {
                Resolution::Existing(item) => Ok(item.clone()),
                Resolution::New(item) => Err(item),
            })
            .await?;
        let mut item = match resolved {
            Ok(existing) => return Ok(existing),
            Err(new_item) => new_item,
        };

        item.id = self
            .store
            .push(&key.collection(Collection::GroceryCatalog), &item)
            .await?;
        self.refresh(key, Collection::GroceryCatalog).await;
        tracing::debug!(household = %key, grocery_id = %item.id, name = %item.name, "Grocery added");
        Ok(item)
    }

    // ---- home ----

    pub async fn home(&self, now: DateTime<Utc>) -> HouseholdResult<HomeSummary> {
        let household = self.active().await?;
        let today = now.date_naive();
        let week_end = today + chrono::Duration::days(6);

        let upcoming = self.drawn_meals(now).await?.future;
        let upcoming = self.scheduled(&upcoming).await?;
        let unpurchased_count = self.shopping_list(today, week_end, false).await?.len();
        let meal_count = self.read(|c| c.meals().len()).await?;

        Ok(HomeSummary {
            household,
            meal_count,
            upcoming,
            unpurchased_count,
        })
    }

    /// Path of the user's pointer to the last opened household
    pub fn most_recent_path(&self) -> HouseholdResult<DbPath> {
        Ok(self.user.user_root()?.child("mostRecentDatabase")?)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Ok(mut listeners) = self.listeners.try_lock() {
            for listener in listeners.drain(..) {
                let _ = self.store.unsubscribe(listener.id);
                listener.task.abort();
            }
        }
    }
}
