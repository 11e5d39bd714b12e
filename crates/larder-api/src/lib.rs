use std::path::{Path, PathBuf};

use anyhow::Result;
use larder_core::{
    Category, ConsumptionAction, ConsumptionId, ConsumptionRecord, DomainError, HistoryFilter,
    ItemDraft, ItemFilter, ItemId, ItemView, Location, LocationDraft, LocationId, LocationStats,
    StatsSnapshot,
};
use larder_store_sqlite::{IntegrityReport, SchemaStatus, SqliteStore};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

pub const API_CONTRACT_VERSION: &str = "api.v1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrateResult {
    pub dry_run: bool,
    pub current_version: i64,
    pub target_version: i64,
    pub would_apply_versions: Vec<i64>,
    pub after_version: Option<i64>,
    pub up_to_date: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetQuantityRequest {
    pub quantity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UseItemRequest {
    #[serde(default = "default_amount")]
    pub amount: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddQuantityRequest {
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscardItemRequest {
    #[serde(default)]
    pub action: Option<ConsumptionAction>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReorderLocationsRequest {
    pub ids: Vec<LocationId>,
}

fn default_amount() -> f64 {
    1.0
}

/// Operation façade over the store. Holds only the database path; every
/// operation opens the store and brings the schema up to date first.
#[derive(Debug, Clone)]
pub struct InventoryApi {
    db_path: PathBuf,
}

impl InventoryApi {
    #[must_use]
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    fn open_store(&self) -> Result<SqliteStore> {
        let mut store = SqliteStore::open(&self.db_path)?;
        store.migrate()?;
        Ok(store)
    }

    /// Current local calendar date; falls back to UTC when the local offset
    /// cannot be determined.
    #[must_use]
    pub fn today() -> Date {
        OffsetDateTime::now_local().map_or_else(|_| OffsetDateTime::now_utc().date(), |now| now.date())
    }

    /// Inspect schema status without mutating data.
    ///
    /// # Errors
    /// Returns an error when the `SQLite` database cannot be opened or queried.
    pub fn schema_status(&self) -> Result<SchemaStatus> {
        let store = SqliteStore::open(&self.db_path)?;
        store.schema_status()
    }

    /// Apply pending migrations, or return planned versions for dry-run mode.
    ///
    /// # Errors
    /// Returns an error when migration planning or execution fails.
    pub fn migrate(&self, dry_run: bool) -> Result<MigrateResult> {
        let mut store = SqliteStore::open(&self.db_path)?;
        let before = store.schema_status()?;
        if dry_run {
            return Ok(MigrateResult {
                dry_run: true,
                current_version: before.current_version,
                target_version: before.target_version,
                would_apply_versions: before.pending_versions,
                after_version: None,
                up_to_date: None,
            });
        }

        let planned_versions = before.pending_versions;
        store.migrate()?;
        let after = store.schema_status()?;
        Ok(MigrateResult {
            dry_run: false,
            current_version: before.current_version,
            target_version: before.target_version,
            would_apply_versions: planned_versions,
            after_version: Some(after.current_version),
            up_to_date: Some(after.pending_versions.is_empty()),
        })
    }

    /// List items matching the filter in the fixed inventory order.
    ///
    /// # Errors
    /// Returns an error when the store cannot be opened or queried.
    pub fn list_items(&self, filter: &ItemFilter) -> Result<Vec<ItemView>> {
        let store = self.open_store()?;
        store.list_items(filter, Self::today())
    }

    /// Fetch one item with derived expiry fields.
    ///
    /// # Errors
    /// Returns [`DomainError::NotFound`] in the chain when the item does not
    /// exist, or an error when the store fails.
    pub fn get_item(&self, id: ItemId) -> Result<ItemView> {
        let store = self.open_store()?;
        store
            .get_item(id, Self::today())?
            .ok_or_else(|| anyhow::Error::new(DomainError::NotFound(format!("item {id}"))))
    }

    /// Validate, default, and persist a new item.
    ///
    /// # Errors
    /// Returns [`DomainError::Validation`] in the chain for a rejected draft,
    /// or an error when persistence fails.
    pub fn create_item(&self, draft: ItemDraft) -> Result<ItemView> {
        let mut store = self.open_store()?;
        let today = Self::today();
        let normalized = draft.normalize(today)?;
        let item = normalized.into_item(ItemId::new(), OffsetDateTime::now_utc());
        store.insert_item(&item)?;
        Ok(ItemView::derive(item, today))
    }

    /// Re-normalize and overwrite an existing item. A draft without an image
    /// path keeps the stored one.
    ///
    /// # Errors
    /// Returns [`DomainError::Validation`] or [`DomainError::NotFound`] in the
    /// chain, or an error when persistence fails.
    pub fn update_item(&self, id: ItemId, draft: ItemDraft) -> Result<ItemView> {
        let mut store = self.open_store()?;
        let today = Self::today();
        let existing = store
            .get_item(id, today)?
            .ok_or_else(|| anyhow::Error::new(DomainError::NotFound(format!("item {id}"))))?;
        let normalized = draft.normalize(today)?;
        let item = normalized.apply_to(existing.item, OffsetDateTime::now_utc());
        store.update_item(&item)?;
        Ok(ItemView::derive(item, today))
    }

    /// Overwrite an item's quantity. Never writes to the consumption log;
    /// recording usage is a separate operation.
    ///
    /// # Errors
    /// Returns [`DomainError::Validation`] for a negative or non-finite value,
    /// [`DomainError::NotFound`] for a missing item, or a store error.
    pub fn set_quantity(&self, id: ItemId, quantity: f64) -> Result<ItemView> {
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(anyhow::Error::new(DomainError::Validation(format!(
                "quantity MUST be a non-negative number, got {quantity}"
            ))));
        }

        let mut store = self.open_store()?;
        if !store.set_item_quantity(id, quantity, OffsetDateTime::now_utc())? {
            return Err(anyhow::Error::new(DomainError::NotFound(format!("item {id}"))));
        }
        store
            .get_item(id, Self::today())?
            .ok_or_else(|| anyhow::Error::new(DomainError::NotFound(format!("item {id}"))))
    }

    /// Increase an item's quantity. Never writes to the consumption log.
    ///
    /// # Errors
    /// Returns [`DomainError::Validation`] for a non-positive amount,
    /// [`DomainError::NotFound`] for a missing item, or a store error.
    pub fn add_quantity(&self, id: ItemId, amount: f64) -> Result<ItemView> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(anyhow::Error::new(DomainError::Validation(format!(
                "amount MUST be a positive number, got {amount}"
            ))));
        }

        let mut store = self.open_store()?;
        let today = Self::today();
        let existing = store
            .get_item(id, today)?
            .ok_or_else(|| anyhow::Error::new(DomainError::NotFound(format!("item {id}"))))?;
        let quantity = existing.item.quantity + amount;
        store.set_item_quantity(id, quantity, OffsetDateTime::now_utc())?;
        store
            .get_item(id, today)?
            .ok_or_else(|| anyhow::Error::new(DomainError::NotFound(format!("item {id}"))))
    }

    /// Record usage of an item: append one `used` consumption record for the
    /// requested amount (not clamped), then reduce the quantity, floored at
    /// zero. A missing item yields `Ok(None)` rather than an error.
    ///
    /// # Errors
    /// Returns [`DomainError::Validation`] for a non-positive amount, or a
    /// store error.
    pub fn use_item(
        &self,
        id: ItemId,
        amount: f64,
        notes: Option<String>,
    ) -> Result<Option<ItemView>> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(anyhow::Error::new(DomainError::Validation(format!(
                "amount MUST be a positive number, got {amount}"
            ))));
        }

        let mut store = self.open_store()?;
        let today = Self::today();
        let Some(existing) = store.get_item(id, today)? else {
            return Ok(None);
        };

        let now = OffsetDateTime::now_utc();
        store.append_consumption(&ConsumptionRecord {
            id: ConsumptionId::new(),
            item_id: Some(id),
            title: existing.item.title.clone(),
            unit: existing.item.unit,
            quantity: amount,
            action: ConsumptionAction::Used,
            notes,
            occurred_at: now,
        })?;

        let quantity = (existing.item.quantity - amount).max(0.0);
        store.set_item_quantity(id, quantity, now)?;
        store.get_item(id, today)
    }

    /// Write off an item's entire remaining quantity as `discarded` or
    /// `expired`: append one record snapshotting the pre-call quantity, then
    /// set the quantity to zero. At zero quantity nothing is appended.
    ///
    /// # Errors
    /// Returns [`DomainError::Validation`] when the action is `used`,
    /// [`DomainError::NotFound`] for a missing item, or a store error.
    pub fn discard_item(
        &self,
        id: ItemId,
        action: ConsumptionAction,
        notes: Option<String>,
    ) -> Result<ItemView> {
        if action == ConsumptionAction::Used {
            return Err(anyhow::Error::new(DomainError::Validation(
                "discard action MUST be discarded or expired".to_string(),
            )));
        }

        let mut store = self.open_store()?;
        let today = Self::today();
        let existing = store
            .get_item(id, today)?
            .ok_or_else(|| anyhow::Error::new(DomainError::NotFound(format!("item {id}"))))?;

        let now = OffsetDateTime::now_utc();
        if existing.item.quantity > 0.0 {
            store.append_consumption(&ConsumptionRecord {
                id: ConsumptionId::new(),
                item_id: Some(id),
                title: existing.item.title.clone(),
                unit: existing.item.unit,
                quantity: existing.item.quantity,
                action,
                notes,
                occurred_at: now,
            })?;
        }

        store.set_item_quantity(id, 0.0, now)?;
        store
            .get_item(id, today)?
            .ok_or_else(|| anyhow::Error::new(DomainError::NotFound(format!("item {id}"))))
    }

    /// Delete an item; its consumption records survive with snapshots intact.
    ///
    /// # Errors
    /// Returns [`DomainError::NotFound`] in the chain for a missing item, or a
    /// store error.
    pub fn delete_item(&self, id: ItemId) -> Result<()> {
        let mut store = self.open_store()?;
        if !store.delete_item(id)? {
            return Err(anyhow::Error::new(DomainError::NotFound(format!("item {id}"))));
        }
        Ok(())
    }

    /// Export the full inventory in the fixed order.
    ///
    /// # Errors
    /// Returns an error when the store cannot be opened or queried.
    pub fn export_items(&self) -> Result<Vec<ItemView>> {
        self.list_items(&ItemFilter::default())
    }

    /// List locations in display order.
    ///
    /// # Errors
    /// Returns an error when the store cannot be opened or queried.
    pub fn list_locations(&self, visible_only: bool) -> Result<Vec<Location>> {
        let store = self.open_store()?;
        store.list_locations(visible_only)
    }

    /// Fetch one location.
    ///
    /// # Errors
    /// Returns [`DomainError::NotFound`] in the chain when it does not exist.
    pub fn get_location(&self, id: LocationId) -> Result<Location> {
        let store = self.open_store()?;
        store
            .get_location(id)?
            .ok_or_else(|| anyhow::Error::new(DomainError::NotFound(format!("location {id}"))))
    }

    /// Validate, default, and persist a new location. Without an explicit
    /// sort order the location is appended after the current maximum.
    ///
    /// # Errors
    /// Returns [`DomainError::Validation`] in the chain for a rejected draft,
    /// or an error when persistence fails.
    pub fn create_location(&self, draft: LocationDraft) -> Result<Location> {
        let mut store = self.open_store()?;
        let normalized = draft.normalize()?;
        let sort_order = match normalized.sort_order {
            Some(order) => order,
            None => store.max_location_sort_order()? + 1,
        };
        let location = Location {
            id: LocationId::new(),
            name: normalized.name,
            kind: normalized.kind,
            icon: normalized.icon,
            color: normalized.color,
            sort_order,
            visible: normalized.visible,
        };
        store.insert_location(&location)?;
        Ok(location)
    }

    /// Update a location; unset draft fields keep their stored values.
    ///
    /// # Errors
    /// Returns [`DomainError::Validation`] or [`DomainError::NotFound`] in the
    /// chain, or an error when persistence fails.
    pub fn update_location(&self, id: LocationId, draft: LocationDraft) -> Result<Location> {
        let mut store = self.open_store()?;
        let existing = store
            .get_location(id)?
            .ok_or_else(|| anyhow::Error::new(DomainError::NotFound(format!("location {id}"))))?;
        let updated = draft.apply_to(&existing)?;
        store.update_location(&updated)?;
        Ok(updated)
    }

    /// Delete a location; dependent items are detached, not deleted.
    ///
    /// # Errors
    /// Returns [`DomainError::NotFound`] in the chain for a missing location,
    /// or a store error.
    pub fn delete_location(&self, id: LocationId) -> Result<()> {
        let mut store = self.open_store()?;
        if !store.delete_location(id)? {
            return Err(anyhow::Error::new(DomainError::NotFound(format!("location {id}"))));
        }
        Ok(())
    }

    /// Assign display order 1..N following the given id sequence and return
    /// the resulting list.
    ///
    /// # Errors
    /// Returns an error when persistence fails.
    pub fn reorder_locations(&self, ids: &[LocationId]) -> Result<Vec<Location>> {
        let mut store = self.open_store()?;
        store.reorder_locations(ids)?;
        store.list_locations(false)
    }

    /// Per-visible-location item/expired/expiring-soon counts.
    ///
    /// # Errors
    /// Returns an error when the aggregate query fails.
    pub fn location_counts(&self) -> Result<Vec<LocationStats>> {
        let store = self.open_store()?;
        store.location_stats(Self::today())
    }

    /// Consumption history, newest first.
    ///
    /// # Errors
    /// Returns an error when the store cannot be opened or queried.
    pub fn history(&self, filter: &HistoryFilter) -> Result<Vec<ConsumptionRecord>> {
        let store = self.open_store()?;
        store.list_consumption(filter, OffsetDateTime::now_utc())
    }

    /// The seeded category catalogue.
    ///
    /// # Errors
    /// Returns an error when the store cannot be opened or queried.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let store = self.open_store()?;
        store.list_categories()
    }

    /// Dashboard aggregates, computed fresh.
    ///
    /// # Errors
    /// Returns an error when any aggregate query fails.
    pub fn stats_snapshot(&self) -> Result<StatsSnapshot> {
        let store = self.open_store()?;
        store.stats_snapshot(Self::today(), OffsetDateTime::now_utc())
    }

    /// Create a `SQLite` backup file of the database.
    ///
    /// # Errors
    /// Returns an error when the backup fails.
    pub fn backup(&self, out_file: &Path) -> Result<()> {
        let store = self.open_store()?;
        store.backup_database(out_file)
    }

    /// Restore the database from a backup file and migrate to latest.
    ///
    /// # Errors
    /// Returns an error when the restore or migration fails.
    pub fn restore(&self, in_file: &Path) -> Result<()> {
        let mut store = SqliteStore::open(&self.db_path)?;
        store.restore_database(in_file)
    }

    /// Run database health probes.
    ///
    /// # Errors
    /// Returns an error when any probe fails.
    pub fn integrity_check(&self) -> Result<IntegrityReport> {
        let store = self.open_store()?;
        store.integrity_check()
    }
}

#[cfg(test)]
mod tests {
    use larder_core::{ExpiryStatus, LocationKind, LocationRef, Unit};
    use time::Duration;

    use super::*;

    fn unique_temp_db_path() -> PathBuf {
        std::env::temp_dir().join(format!("larder-api-{}.sqlite3", ulid::Ulid::new()))
    }

    fn chicken_draft(expires_in: i64) -> ItemDraft {
        ItemDraft {
            title: "Chicken".to_string(),
            quantity: Some(2.0),
            expires_on: Some(InventoryApi::today() + Duration::days(expires_in)),
            ..ItemDraft::default()
        }
    }

    #[test]
    fn garage_freezer_end_to_end() -> Result<()> {
        let db_path = unique_temp_db_path();
        let api = InventoryApi::new(db_path.clone());

        let freezer = api.create_location(LocationDraft {
            name: "Garage Freezer".to_string(),
            kind: Some(LocationKind::Freezer),
            ..LocationDraft::default()
        })?;

        let created = api.create_item(ItemDraft {
            location_id: Some(freezer.id),
            ..chicken_draft(2)
        })?;
        assert_eq!(created.expiry_status, ExpiryStatus::Soon);
        assert_eq!(created.days_until_expiry, Some(2));

        let filter = ItemFilter { location_id: Some(freezer.id), ..ItemFilter::default() };
        let in_freezer = api.list_items(&filter)?;
        assert_eq!(in_freezer.len(), 1);
        assert_eq!(in_freezer[0].item.title, "Chicken");

        let after_use = match api.use_item(created.item.id, 1.0, None)? {
            Some(view) => view,
            None => panic!("item should exist while being used"),
        };
        assert!((after_use.item.quantity - 1.0).abs() < f64::EPSILON);

        let history = api.history(&HistoryFilter {
            item_id: Some(created.item.id),
            ..HistoryFilter::default()
        })?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, ConsumptionAction::Used);
        assert!((history[0].quantity - 1.0).abs() < f64::EPSILON);
        assert_eq!(history[0].title, "Chicken");

        let stats = api.stats_snapshot()?;
        assert_eq!(stats.total_items, 1);
        assert_eq!(stats.expiring_soon, 1);
        let counts = api.location_counts()?;
        let freezer_counts = match counts.iter().find(|entry| entry.location_id == freezer.id) {
            Some(entry) => entry,
            None => panic!("freezer should appear in location counts"),
        };
        assert_eq!(freezer_counts.items, 1);
        assert_eq!(freezer_counts.expiring_soon, 1);

        api.delete_location(freezer.id)?;
        let reloaded = api.get_item(created.item.id)?;
        assert_eq!(reloaded.item.location_id, None);
        assert_eq!(reloaded.item.location_ref(), LocationRef::Unassigned);
        assert_eq!(api.list_items(&ItemFilter::default())?.len(), 1);

        let _ = std::fs::remove_file(&db_path);
        Ok(())
    }

    #[test]
    fn use_clamps_quantity_but_records_requested_amount() -> Result<()> {
        let db_path = unique_temp_db_path();
        let api = InventoryApi::new(db_path.clone());

        let created = api.create_item(ItemDraft {
            title: "Stock".to_string(),
            quantity: Some(1.0),
            unit: Some(Unit::Liters),
            ..ItemDraft::default()
        })?;

        let after = match api.use_item(created.item.id, 5.0, Some("soup night".to_string()))? {
            Some(view) => view,
            None => panic!("item should exist"),
        };
        assert!(after.item.quantity.abs() < f64::EPSILON);

        let history = api.history(&HistoryFilter::default())?;
        assert_eq!(history.len(), 1);
        assert!((history[0].quantity - 5.0).abs() < f64::EPSILON);
        assert_eq!(history[0].notes.as_deref(), Some("soup night"));

        let _ = std::fs::remove_file(&db_path);
        Ok(())
    }

    #[test]
    fn use_on_missing_item_returns_none_without_history() -> Result<()> {
        let db_path = unique_temp_db_path();
        let api = InventoryApi::new(db_path.clone());

        assert!(api.use_item(ItemId::new(), 1.0, None)?.is_none());
        assert!(api.history(&HistoryFilter::default())?.is_empty());

        let _ = std::fs::remove_file(&db_path);
        Ok(())
    }

    #[test]
    fn discard_snapshots_pre_call_quantity_and_skips_empty_items() -> Result<()> {
        let db_path = unique_temp_db_path();
        let api = InventoryApi::new(db_path.clone());

        let created = api.create_item(ItemDraft {
            title: "Leftovers".to_string(),
            quantity: Some(3.0),
            ..ItemDraft::default()
        })?;

        let after = api.discard_item(created.item.id, ConsumptionAction::Expired, None)?;
        assert!(after.item.quantity.abs() < f64::EPSILON);

        let history = api.history(&HistoryFilter::default())?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, ConsumptionAction::Expired);
        assert!((history[0].quantity - 3.0).abs() < f64::EPSILON);

        // A second discard at zero quantity appends nothing.
        api.discard_item(created.item.id, ConsumptionAction::Discarded, None)?;
        assert_eq!(api.history(&HistoryFilter::default())?.len(), 1);

        let Err(err) = api.discard_item(created.item.id, ConsumptionAction::Used, None) else {
            panic!("discard with action=used should be rejected");
        };
        assert!(matches!(err.downcast_ref::<DomainError>(), Some(DomainError::Validation(_))));

        let _ = std::fs::remove_file(&db_path);
        Ok(())
    }

    #[test]
    fn homemade_flag_round_trips_and_clears_brand() -> Result<()> {
        let db_path = unique_temp_db_path();
        let api = InventoryApi::new(db_path.clone());

        let created = api.create_item(ItemDraft {
            title: "Tomato sauce".to_string(),
            brand: Some("Acme".to_string()),
            ..ItemDraft::default()
        })?;
        assert_eq!(created.item.brand.as_deref(), Some("Acme"));

        let updated = api.update_item(
            created.item.id,
            ItemDraft {
                title: "Tomato sauce".to_string(),
                brand: Some("Acme".to_string()),
                homemade: true,
                ..ItemDraft::default()
            },
        )?;
        assert!(updated.item.homemade);
        assert_eq!(updated.item.brand, None);

        let reloaded = api.get_item(created.item.id)?;
        assert!(reloaded.item.homemade);
        assert_eq!(reloaded.item.brand, None);

        let _ = std::fs::remove_file(&db_path);
        Ok(())
    }

    #[test]
    fn update_preserves_image_path_when_absent() -> Result<()> {
        let db_path = unique_temp_db_path();
        let api = InventoryApi::new(db_path.clone());

        let created = api.create_item(ItemDraft {
            title: "Pie".to_string(),
            image_path: Some("images/pie.jpg".to_string()),
            ..ItemDraft::default()
        })?;

        let updated = api
            .update_item(created.item.id, ItemDraft { title: "Apple pie".to_string(), ..ItemDraft::default() })?;
        assert_eq!(updated.item.title, "Apple pie");
        assert_eq!(updated.item.image_path.as_deref(), Some("images/pie.jpg"));
        assert_eq!(updated.item.created_at, created.item.created_at);

        let _ = std::fs::remove_file(&db_path);
        Ok(())
    }

    #[test]
    fn quantity_operations_validate_and_never_log() -> Result<()> {
        let db_path = unique_temp_db_path();
        let api = InventoryApi::new(db_path.clone());

        let created = api.create_item(ItemDraft {
            title: "Rice".to_string(),
            quantity: Some(2.0),
            ..ItemDraft::default()
        })?;

        let set = api.set_quantity(created.item.id, 5.0)?;
        assert!((set.item.quantity - 5.0).abs() < f64::EPSILON);

        let added = api.add_quantity(created.item.id, 1.5)?;
        assert!((added.item.quantity - 6.5).abs() < f64::EPSILON);

        assert!(api.history(&HistoryFilter::default())?.is_empty());

        let Err(err) = api.set_quantity(created.item.id, -1.0) else {
            panic!("negative quantity should be rejected");
        };
        assert!(matches!(err.downcast_ref::<DomainError>(), Some(DomainError::Validation(_))));

        let Err(err) = api.set_quantity(ItemId::new(), 1.0) else {
            panic!("missing item should signal not-found");
        };
        assert!(matches!(err.downcast_ref::<DomainError>(), Some(DomainError::NotFound(_))));

        let _ = std::fs::remove_file(&db_path);
        Ok(())
    }

    #[test]
    fn migrate_dry_run_reports_pending_versions() -> Result<()> {
        let db_path = unique_temp_db_path();
        let api = InventoryApi::new(db_path.clone());

        let planned = api.migrate(true)?;
        assert!(planned.dry_run);
        assert_eq!(planned.current_version, 0);
        assert_eq!(planned.would_apply_versions, vec![1]);
        assert_eq!(planned.after_version, None);

        let applied = api.migrate(false)?;
        assert_eq!(applied.after_version, Some(1));
        assert_eq!(applied.up_to_date, Some(true));

        let _ = std::fs::remove_file(&db_path);
        Ok(())
    }

    #[test]
    fn reorder_locations_round_trip() -> Result<()> {
        let db_path = unique_temp_db_path();
        let api = InventoryApi::new(db_path.clone());

        let pantry = api.create_location(LocationDraft {
            name: "Pantry".to_string(),
            kind: Some(LocationKind::Pantry),
            ..LocationDraft::default()
        })?;
        let seeded = api.list_locations(false)?;
        assert_eq!(seeded.len(), 2);
        assert!(pantry.sort_order > seeded[0].sort_order || seeded[0].id == pantry.id);

        let freezer_id = match seeded.iter().find(|location| location.id != pantry.id) {
            Some(location) => location.id,
            None => panic!("seeded freezer should exist"),
        };

        let reordered = api.reorder_locations(&[pantry.id, freezer_id])?;
        assert_eq!(reordered[0].id, pantry.id);
        assert_eq!(reordered[0].sort_order, 1);
        assert_eq!(reordered[1].id, freezer_id);
        assert_eq!(reordered[1].sort_order, 2);

        let _ = std::fs::remove_file(&db_path);
        Ok(())
    }
}
