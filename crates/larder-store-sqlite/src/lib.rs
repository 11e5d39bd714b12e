use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use larder_core::{
    default_categories, Category, CategoryId, ConsumptionAction, ConsumptionId, ConsumptionRecord,
    ConsumptionSummary, DomainError, ExpiryStatus, HistoryFilter, Item, ItemFilter, ItemId,
    ItemView, Location, LocationId, LocationKind, LocationStats, StatsSnapshot, Unit,
    DEFAULT_LOCATION_COLOR, DEFAULT_LOCATION_NAME, LOW_STOCK_THRESHOLD, RECENT_CONSUMPTION_DAYS,
    SOON_WINDOW_DAYS,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, DatabaseName, OptionalExtension};
use serde::{Deserialize, Serialize};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};
use ulid::Ulid;

const LATEST_SCHEMA_VERSION: i64 = 1;

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

const CREATE_SCHEMA_MIGRATIONS_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at TEXT NOT NULL
);
";

const MIGRATION_001_SQL: &str = r"
CREATE TABLE IF NOT EXISTS locations (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  kind TEXT NOT NULL CHECK (kind IN ('fridge','freezer','cupboard','spice','pantry','other')),
  icon TEXT NOT NULL,
  color TEXT NOT NULL,
  sort_order INTEGER NOT NULL,
  visible INTEGER NOT NULL CHECK (visible IN (0, 1))
);

CREATE TABLE IF NOT EXISTS categories (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL UNIQUE,
  icon TEXT NOT NULL,
  sort_order INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS items (
  id TEXT PRIMARY KEY,
  title TEXT NOT NULL,
  description TEXT NOT NULL,
  category TEXT NOT NULL,
  legacy_location TEXT,
  location_id TEXT,
  brand TEXT,
  homemade INTEGER NOT NULL CHECK (homemade IN (0, 1)),
  quantity REAL NOT NULL CHECK (quantity >= 0),
  unit TEXT NOT NULL CHECK (unit IN ('pcs','g','kg','ml','L')),
  added_on TEXT NOT NULL,
  expires_on TEXT,
  image_path TEXT,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL,
  FOREIGN KEY (location_id) REFERENCES locations(id)
);

CREATE TABLE IF NOT EXISTS consumption (
  id TEXT PRIMARY KEY,
  item_id TEXT,
  title TEXT NOT NULL,
  unit TEXT NOT NULL CHECK (unit IN ('pcs','g','kg','ml','L')),
  quantity REAL NOT NULL CHECK (quantity > 0),
  action TEXT NOT NULL CHECK (action IN ('used','discarded','expired')),
  notes TEXT,
  occurred_at TEXT NOT NULL,
  FOREIGN KEY (item_id) REFERENCES items(id)
);

CREATE INDEX IF NOT EXISTS idx_items_location ON items(location_id);
CREATE INDEX IF NOT EXISTS idx_items_category ON items(category);
CREATE INDEX IF NOT EXISTS idx_items_expires ON items(expires_on);
CREATE INDEX IF NOT EXISTS idx_items_location_expires ON items(location_id, expires_on);
CREATE INDEX IF NOT EXISTS idx_consumption_occurred ON consumption(occurred_at);
CREATE INDEX IF NOT EXISTS idx_consumption_item ON consumption(item_id);
";

const ITEM_COLUMNS: &str = "i.id, i.title, i.description, i.category, i.legacy_location, \
     i.location_id, i.brand, i.homemade, i.quantity, i.unit, i.added_on, i.expires_on, \
     i.image_path, i.created_at, i.updated_at";

pub struct SqliteStore {
    conn: Connection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaStatus {
    pub current_version: i64,
    pub target_version: i64,
    pub pending_versions: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignKeyViolation {
    pub table: String,
    pub rowid: i64,
    pub parent: String,
    pub fk_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrityReport {
    pub quick_check_ok: bool,
    pub quick_check_message: String,
    pub foreign_key_violations: Vec<ForeignKeyViolation>,
    pub schema_status: SchemaStatus,
}

impl SqliteStore {
    /// Open a SQLite-backed inventory store and configure required runtime pragmas.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened or pragmas cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;

        Ok(Self { conn })
    }

    /// Report current and target schema versions plus pending migrations.
    ///
    /// # Errors
    /// Returns an error when schema metadata cannot be read or initialized.
    pub fn schema_status(&self) -> Result<SchemaStatus> {
        self.conn
            .execute_batch(CREATE_SCHEMA_MIGRATIONS_SQL)
            .context("failed to apply schema_migrations table")?;
        let current_version = current_schema_version(&self.conn)?;
        let pending_versions = if current_version < LATEST_SCHEMA_VERSION {
            ((current_version + 1)..=LATEST_SCHEMA_VERSION).collect::<Vec<_>>()
        } else {
            Vec::new()
        };

        Ok(SchemaStatus {
            current_version,
            target_version: LATEST_SCHEMA_VERSION,
            pending_versions,
        })
    }

    /// Apply all forward migrations up to the latest supported schema version.
    /// A freshly created database is also seeded with the default location and
    /// category list; re-running against an initialized database is a no-op.
    ///
    /// # Errors
    /// Returns an error when migration bootstrapping or any migration step fails.
    pub fn migrate(&mut self) -> Result<()> {
        self.conn
            .execute_batch(CREATE_SCHEMA_MIGRATIONS_SQL)
            .context("failed to apply schema_migrations table")?;

        let mut version = current_schema_version(&self.conn)?;
        let fresh = version == 0;

        if fresh {
            self.conn.execute_batch(MIGRATION_001_SQL).context("failed to apply migration v1")?;
            record_schema_version(&self.conn, 1)?;
            version = 1;
            tracing::debug!(version, "applied schema migration");
        }

        if version != LATEST_SCHEMA_VERSION {
            return Err(anyhow!(
                "unsupported schema version {version}; expected {LATEST_SCHEMA_VERSION}"
            ));
        }

        // Seed only on first initialization; a user who later empties the
        // location list keeps it empty.
        if fresh {
            self.seed_defaults()?;
        }
        Ok(())
    }

    fn seed_defaults(&mut self) -> Result<()> {
        let tx = self.conn.transaction().context("failed to start seed transaction")?;

        let location_count: i64 =
            tx.query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;
        if location_count == 0 {
            tx.execute(
                "INSERT INTO locations(id, name, kind, icon, color, sort_order, visible)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    LocationId::new().to_string(),
                    DEFAULT_LOCATION_NAME,
                    LocationKind::Freezer.as_str(),
                    LocationKind::Freezer.default_icon(),
                    DEFAULT_LOCATION_COLOR,
                    1_i64,
                    true,
                ],
            )
            .context("failed to seed default location")?;
            tracing::debug!(name = DEFAULT_LOCATION_NAME, "seeded default location");
        }

        // Unique name keeps this idempotent across re-runs.
        for (index, (name, icon)) in default_categories().into_iter().enumerate() {
            let sort_order = i64::try_from(index).unwrap_or(i64::MAX) + 1;
            tx.execute(
                "INSERT OR IGNORE INTO categories(id, name, icon, sort_order)
                 VALUES (?1, ?2, ?3, ?4)",
                params![CategoryId::new().to_string(), name, icon, sort_order],
            )
            .with_context(|| format!("failed to seed category {name}"))?;
        }

        tx.commit().context("failed to commit seed transaction")?;
        Ok(())
    }

    /// Checkpoint the write-ahead log into the main database file.
    ///
    /// # Errors
    /// Returns an error when the checkpoint pragma fails.
    pub fn flush(&self) -> Result<()> {
        let busy: i64 = self
            .conn
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |row| row.get(0))
            .context("failed to checkpoint write-ahead log")?;
        if busy != 0 {
            tracing::debug!("wal checkpoint returned busy; will retry on the next flush");
        }
        Ok(())
    }

    /// Create a `SQLite` backup file of the current main database.
    ///
    /// # Errors
    /// Returns an error when backup directories cannot be created or backup fails.
    pub fn backup_database(&self, out_file: &Path) -> Result<()> {
        if let Some(parent) = out_file.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create parent directory for backup file {}", out_file.display())
            })?;
        }

        self.conn
            .backup(DatabaseName::Main, out_file, None)
            .with_context(|| format!("failed to create sqlite backup at {}", out_file.display()))
    }

    /// Restore this database from a `SQLite` backup file, then migrate to latest.
    ///
    /// # Errors
    /// Returns an error when the backup file is missing, restore fails, or migrations fail.
    pub fn restore_database(&mut self, in_file: &Path) -> Result<()> {
        if !in_file.exists() {
            return Err(anyhow!("backup file does not exist: {}", in_file.display()));
        }

        self.conn
            .restore(DatabaseName::Main, in_file, None::<fn(rusqlite::backup::Progress)>)
            .with_context(|| {
                format!("failed to restore sqlite backup from {}", in_file.display())
            })?;

        self.migrate()?;
        Ok(())
    }

    /// Run quick-check, foreign-key-check, and schema status health probes.
    ///
    /// # Errors
    /// Returns an error when any integrity probe query fails.
    pub fn integrity_check(&self) -> Result<IntegrityReport> {
        let quick_check_message: String = self
            .conn
            .query_row("PRAGMA quick_check", [], |row| row.get::<_, String>(0))
            .context("failed to run PRAGMA quick_check")?;

        let mut stmt = self
            .conn
            .prepare("PRAGMA foreign_key_check")
            .context("failed to prepare PRAGMA foreign_key_check")?;
        let rows = stmt.query_map([], |row| {
            Ok(ForeignKeyViolation {
                table: row.get(0)?,
                rowid: row.get(1)?,
                parent: row.get(2)?,
                fk_index: row.get(3)?,
            })
        })?;

        let mut foreign_key_violations = Vec::new();
        for row in rows {
            foreign_key_violations.push(row?);
        }

        let schema_status = self.schema_status()?;
        Ok(IntegrityReport {
            quick_check_ok: quick_check_message == "ok",
            quick_check_message,
            foreign_key_violations,
            schema_status,
        })
    }

    /// Persist one new item row.
    ///
    /// # Errors
    /// Returns an error when serialization or the insert fails.
    pub fn insert_item(&mut self, item: &Item) -> Result<()> {
        let tx = self.conn.transaction().context("failed to start transaction")?;
        tx.execute(
            "INSERT INTO items(
                id, title, description, category, legacy_location, location_id, brand,
                homemade, quantity, unit, added_on, expires_on, image_path, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                item.id.to_string(),
                item.title,
                item.description,
                item.category,
                item.legacy_location,
                item.location_id.map(|id| id.to_string()),
                item.brand,
                item.homemade,
                item.quantity,
                item.unit.as_str(),
                format_date(item.added_on)?,
                item.expires_on.map(format_date).transpose()?,
                item.image_path,
                rfc3339(item.created_at)?,
                rfc3339(item.updated_at)?,
            ],
        )
        .context("failed to insert item")?;
        tx.commit().context("failed to commit item insert")?;
        Ok(())
    }

    /// Overwrite every mutable field of an existing item row.
    ///
    /// # Errors
    /// Returns an error when the row does not exist ([`DomainError::NotFound`]
    /// in the chain) or the update fails.
    pub fn update_item(&mut self, item: &Item) -> Result<()> {
        let tx = self.conn.transaction().context("failed to start transaction")?;
        let changed = tx
            .execute(
                "UPDATE items SET
                    title = ?2, description = ?3, category = ?4, legacy_location = ?5,
                    location_id = ?6, brand = ?7, homemade = ?8, quantity = ?9, unit = ?10,
                    added_on = ?11, expires_on = ?12, image_path = ?13, updated_at = ?14
                 WHERE id = ?1",
                params![
                    item.id.to_string(),
                    item.title,
                    item.description,
                    item.category,
                    item.legacy_location,
                    item.location_id.map(|id| id.to_string()),
                    item.brand,
                    item.homemade,
                    item.quantity,
                    item.unit.as_str(),
                    format_date(item.added_on)?,
                    item.expires_on.map(format_date).transpose()?,
                    item.image_path,
                    rfc3339(item.updated_at)?,
                ],
            )
            .context("failed to update item")?;
        tx.commit().context("failed to commit item update")?;

        if changed == 0 {
            return Err(anyhow::Error::new(DomainError::NotFound(format!("item {}", item.id))));
        }
        Ok(())
    }

    /// Fetch one item with its derived expiry fields.
    ///
    /// # Errors
    /// Returns an error when the row cannot be read or decoded.
    pub fn get_item(&self, id: ItemId, today: Date) -> Result<Option<ItemView>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items i WHERE i.id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt.query_row(params![id.to_string()], map_item_row).optional()?;

        match raw {
            Some(raw) => Ok(Some(ItemView::derive(item_from_raw(raw)?, today))),
            None => Ok(None),
        }
    }

    /// List items matching the filter, in the fixed inventory order: items
    /// without an expiry date after all dated items, then expiry ascending,
    /// ties broken by title. One parameterized statement per call.
    ///
    /// # Errors
    /// Returns an error when the query fails or a row cannot be decoded.
    pub fn list_items(&self, filter: &ItemFilter, today: Date) -> Result<Vec<ItemView>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(location_id) = filter.location_id {
            clauses.push("i.location_id = ?".to_string());
            values.push(Value::Text(location_id.to_string()));
        }

        if let Some(location) = &filter.location {
            clauses.push("(i.legacy_location = ? OR l.kind = ?)".to_string());
            values.push(Value::Text(location.clone()));
            values.push(Value::Text(location.clone()));
        }

        if let Some(category) = &filter.category {
            clauses.push("i.category = ?".to_string());
            values.push(Value::Text(category.clone()));
        }

        if let Some(search) = &filter.search {
            let needle = search.to_lowercase();
            clauses.push(
                "(instr(lower(i.title), ?) > 0 \
                 OR instr(lower(i.description), ?) > 0 \
                 OR instr(lower(COALESCE(i.brand, '')), ?) > 0)"
                    .to_string(),
            );
            values.push(Value::Text(needle.clone()));
            values.push(Value::Text(needle.clone()));
            values.push(Value::Text(needle));
        }

        if let Some(status) = filter.expiry_status {
            push_expiry_clause(status, today, &mut clauses, &mut values)?;
        }

        let mut sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items i LEFT JOIN locations l ON l.id = i.location_id"
        );
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY (i.expires_on IS NULL) ASC, i.expires_on ASC, i.title ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), map_item_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(ItemView::derive(item_from_raw(row?)?, today));
        }
        Ok(items)
    }

    /// Overwrite an item's quantity without touching the consumption log.
    ///
    /// # Errors
    /// Returns an error when the update fails; a missing row yields `Ok(false)`.
    pub fn set_item_quantity(
        &mut self,
        id: ItemId,
        quantity: f64,
        now: OffsetDateTime,
    ) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE items SET quantity = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.to_string(), quantity, rfc3339(now)?],
            )
            .context("failed to update item quantity")?;
        Ok(changed > 0)
    }

    /// Delete an item and detach its consumption records in one transaction.
    /// Snapshot columns on the records stay intact.
    ///
    /// # Errors
    /// Returns an error when either statement or the commit fails.
    pub fn delete_item(&mut self, id: ItemId) -> Result<bool> {
        let tx = self.conn.transaction().context("failed to start transaction")?;
        tx.execute(
            "UPDATE consumption SET item_id = NULL WHERE item_id = ?1",
            params![id.to_string()],
        )
        .context("failed to detach consumption records")?;
        let deleted = tx
            .execute("DELETE FROM items WHERE id = ?1", params![id.to_string()])
            .context("failed to delete item")?;
        tx.commit().context("failed to commit item delete")?;
        Ok(deleted > 0)
    }

    /// Persist one new location row.
    ///
    /// # Errors
    /// Returns an error when the insert fails.
    pub fn insert_location(&mut self, location: &Location) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO locations(id, name, kind, icon, color, sort_order, visible)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    location.id.to_string(),
                    location.name,
                    location.kind.as_str(),
                    location.icon,
                    location.color,
                    location.sort_order,
                    location.visible,
                ],
            )
            .context("failed to insert location")?;
        Ok(())
    }

    /// Overwrite every mutable field of an existing location row.
    ///
    /// # Errors
    /// Returns an error when the row does not exist ([`DomainError::NotFound`]
    /// in the chain) or the update fails.
    pub fn update_location(&mut self, location: &Location) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE locations SET name = ?2, kind = ?3, icon = ?4, color = ?5,
                    sort_order = ?6, visible = ?7
                 WHERE id = ?1",
                params![
                    location.id.to_string(),
                    location.name,
                    location.kind.as_str(),
                    location.icon,
                    location.color,
                    location.sort_order,
                    location.visible,
                ],
            )
            .context("failed to update location")?;

        if changed == 0 {
            return Err(anyhow::Error::new(DomainError::NotFound(format!(
                "location {}",
                location.id
            ))));
        }
        Ok(())
    }

    /// Fetch one location row.
    ///
    /// # Errors
    /// Returns an error when the row cannot be read or decoded.
    pub fn get_location(&self, id: LocationId) -> Result<Option<Location>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, kind, icon, color, sort_order, visible
             FROM locations WHERE id = ?1",
        )?;
        let raw = stmt.query_row(params![id.to_string()], map_location_row).optional()?;
        match raw {
            Some(raw) => Ok(Some(location_from_raw(raw)?)),
            None => Ok(None),
        }
    }

    /// List locations in display order, optionally restricted to visible ones.
    ///
    /// # Errors
    /// Returns an error when the query fails or a row cannot be decoded.
    pub fn list_locations(&self, visible_only: bool) -> Result<Vec<Location>> {
        let mut sql = String::from(
            "SELECT id, name, kind, icon, color, sort_order, visible FROM locations",
        );
        if visible_only {
            sql.push_str(" WHERE visible = 1");
        }
        sql.push_str(" ORDER BY sort_order ASC, name ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_location_row)?;

        let mut locations = Vec::new();
        for row in rows {
            locations.push(location_from_raw(row?)?);
        }
        Ok(locations)
    }

    /// Current maximum sort order, 0 when no locations exist.
    ///
    /// # Errors
    /// Returns an error when the query fails.
    pub fn max_location_sort_order(&self) -> Result<i64> {
        let max: i64 = self
            .conn
            .query_row("SELECT COALESCE(MAX(sort_order), 0) FROM locations", [], |row| row.get(0))
            .context("failed to read max location sort order")?;
        Ok(max)
    }

    /// Delete a location and detach its items in one transaction. Items keep
    /// any legacy label they carried.
    ///
    /// # Errors
    /// Returns an error when either statement or the commit fails.
    pub fn delete_location(&mut self, id: LocationId) -> Result<bool> {
        let tx = self.conn.transaction().context("failed to start transaction")?;
        tx.execute(
            "UPDATE items SET location_id = NULL WHERE location_id = ?1",
            params![id.to_string()],
        )
        .context("failed to detach items from location")?;
        let deleted = tx
            .execute("DELETE FROM locations WHERE id = ?1", params![id.to_string()])
            .context("failed to delete location")?;
        tx.commit().context("failed to commit location delete")?;
        Ok(deleted > 0)
    }

    /// Assign sort order 1..N following the given id sequence. Ids not listed
    /// keep their order; unknown ids are ignored.
    ///
    /// # Errors
    /// Returns an error when any update or the commit fails.
    pub fn reorder_locations(&mut self, ids: &[LocationId]) -> Result<usize> {
        let tx = self.conn.transaction().context("failed to start transaction")?;
        let mut reordered = 0_usize;
        for (index, id) in ids.iter().enumerate() {
            let sort_order = i64::try_from(index).unwrap_or(i64::MAX - 1) + 1;
            reordered += tx
                .execute(
                    "UPDATE locations SET sort_order = ?2 WHERE id = ?1",
                    params![id.to_string(), sort_order],
                )
                .context("failed to reorder location")?;
        }
        tx.commit().context("failed to commit reorder transaction")?;
        Ok(reordered)
    }

    /// List the seeded category catalogue in display order.
    ///
    /// # Errors
    /// Returns an error when the query fails or a row cannot be decoded.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, icon, sort_order FROM categories ORDER BY sort_order ASC, name ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut categories = Vec::new();
        for row in rows {
            let (id_raw, name, icon, sort_order) = row?;
            categories.push(Category { id: CategoryId(parse_ulid(&id_raw)?), name, icon, sort_order });
        }
        Ok(categories)
    }

    /// Append one consumption record. The log is append-only; nothing here
    /// updates or deletes existing rows.
    ///
    /// # Errors
    /// Returns an error when the insert fails (including the `quantity > 0`
    /// table constraint).
    pub fn append_consumption(&mut self, record: &ConsumptionRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO consumption(id, item_id, title, unit, quantity, action, notes, occurred_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id.to_string(),
                    record.item_id.map(|id| id.to_string()),
                    record.title,
                    record.unit.as_str(),
                    record.quantity,
                    record.action.as_str(),
                    record.notes,
                    rfc3339(record.occurred_at)?,
                ],
            )
            .context("failed to append consumption record")?;
        Ok(())
    }

    /// List consumption records, newest first, matching the history filter.
    ///
    /// # Errors
    /// Returns an error when the query fails or a row cannot be decoded.
    pub fn list_consumption(
        &self,
        filter: &HistoryFilter,
        now: OffsetDateTime,
    ) -> Result<Vec<ConsumptionRecord>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(item_id) = filter.item_id {
            clauses.push("item_id = ?".to_string());
            values.push(Value::Text(item_id.to_string()));
        }
        if let Some(action) = filter.action {
            clauses.push("action = ?".to_string());
            values.push(Value::Text(action.as_str().to_string()));
        }
        if let Some(days) = filter.days {
            let cutoff = rfc3339(now - Duration::days(days))?;
            clauses.push("datetime(occurred_at) >= datetime(?)".to_string());
            values.push(Value::Text(cutoff));
        }

        let mut sql = String::from(
            "SELECT id, item_id, title, unit, quantity, action, notes, occurred_at FROM consumption",
        );
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY occurred_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(limit));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), map_consumption_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(consumption_from_raw(row?)?);
        }
        Ok(records)
    }

    /// Per-location item/expired/expiring-soon counts for visible locations,
    /// in display order. Expiring-soon here includes items due today.
    ///
    /// # Errors
    /// Returns an error when the aggregate query fails.
    pub fn location_stats(&self, today: Date) -> Result<Vec<LocationStats>> {
        let today_str = format_date(today)?;
        let soon_str = format_date(today + Duration::days(SOON_WINDOW_DAYS))?;

        let mut stmt = self.conn.prepare(
            "SELECT l.id, l.name, l.kind, l.icon, l.color,
                    COUNT(i.id),
                    COALESCE(SUM(CASE WHEN i.expires_on IS NOT NULL AND i.expires_on < ?1
                                      THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN i.expires_on IS NOT NULL AND i.expires_on >= ?1
                                       AND i.expires_on <= ?2
                                      THEN 1 ELSE 0 END), 0)
             FROM locations l
             LEFT JOIN items i ON i.location_id = l.id
             WHERE l.visible = 1
             GROUP BY l.id
             ORDER BY l.sort_order ASC, l.name ASC",
        )?;

        let rows = stmt.query_map(params![today_str, soon_str], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, i64>(7)?,
            ))
        })?;

        let mut stats = Vec::new();
        for row in rows {
            let (id_raw, name, kind_raw, icon, color, items, expired, expiring_soon) = row?;
            stats.push(LocationStats {
                location_id: LocationId(parse_ulid(&id_raw)?),
                name,
                kind: parse_kind(&kind_raw)?,
                icon,
                color,
                items,
                expired,
                expiring_soon,
            });
        }
        Ok(stats)
    }

    /// Dashboard aggregates, computed fresh: global counts, per-visible-location
    /// counts, and the rolling 30-day consumption summary ordered by total
    /// quantity descending.
    ///
    /// # Errors
    /// Returns an error when any aggregate query fails.
    pub fn stats_snapshot(&self, today: Date, now: OffsetDateTime) -> Result<StatsSnapshot> {
        let today_str = format_date(today)?;
        let soon_str = format_date(today + Duration::days(SOON_WINDOW_DAYS))?;

        let (total_items, expired, expiring_soon, low_stock) = self
            .conn
            .query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN expires_on IS NOT NULL AND expires_on < ?1
                                          THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN expires_on IS NOT NULL AND expires_on >= ?1
                                           AND expires_on <= ?2
                                          THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN quantity > 0 AND quantity <= ?3
                                          THEN 1 ELSE 0 END), 0)
                 FROM items",
                params![today_str, soon_str, LOW_STOCK_THRESHOLD],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .context("failed to compute global item counts")?;

        let locations = self.location_stats(today)?;

        let cutoff = rfc3339(now - Duration::days(RECENT_CONSUMPTION_DAYS))?;
        let mut stmt = self.conn.prepare(
            "SELECT title, unit, SUM(quantity), COUNT(*)
             FROM consumption
             WHERE datetime(occurred_at) >= datetime(?1)
             GROUP BY title, unit
             ORDER BY SUM(quantity) DESC, title ASC",
        )?;
        let rows = stmt.query_map(params![cutoff], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut recent_consumption = Vec::new();
        for row in rows {
            let (title, unit_raw, total_quantity, events) = row?;
            recent_consumption.push(ConsumptionSummary {
                title,
                unit: parse_unit(&unit_raw)?,
                total_quantity,
                events,
            });
        }

        Ok(StatsSnapshot {
            total_items,
            expired,
            expiring_soon,
            low_stock,
            locations,
            recent_consumption,
        })
    }
}

fn push_expiry_clause(
    status: ExpiryStatus,
    today: Date,
    clauses: &mut Vec<String>,
    values: &mut Vec<Value>,
) -> Result<()> {
    let today_str = format_date(today)?;
    let soon_str = format_date(today + Duration::days(SOON_WINDOW_DAYS))?;

    match status {
        ExpiryStatus::None => clauses.push("i.expires_on IS NULL".to_string()),
        ExpiryStatus::Expired => {
            clauses.push("i.expires_on IS NOT NULL AND i.expires_on < ?".to_string());
            values.push(Value::Text(today_str));
        }
        ExpiryStatus::Today => {
            clauses.push("i.expires_on = ?".to_string());
            values.push(Value::Text(today_str));
        }
        ExpiryStatus::Soon => {
            clauses.push("i.expires_on > ? AND i.expires_on <= ?".to_string());
            values.push(Value::Text(today_str));
            values.push(Value::Text(soon_str));
        }
        ExpiryStatus::Ok => {
            clauses.push("i.expires_on > ?".to_string());
            values.push(Value::Text(soon_str));
        }
    }
    Ok(())
}

#[derive(Debug)]
struct RawItemRow {
    id: String,
    title: String,
    description: String,
    category: String,
    legacy_location: Option<String>,
    location_id: Option<String>,
    brand: Option<String>,
    homemade: bool,
    quantity: f64,
    unit: String,
    added_on: String,
    expires_on: Option<String>,
    image_path: Option<String>,
    created_at: String,
    updated_at: String,
}

fn map_item_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawItemRow> {
    Ok(RawItemRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        legacy_location: row.get(4)?,
        location_id: row.get(5)?,
        brand: row.get(6)?,
        homemade: row.get(7)?,
        quantity: row.get(8)?,
        unit: row.get(9)?,
        added_on: row.get(10)?,
        expires_on: row.get(11)?,
        image_path: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn item_from_raw(raw: RawItemRow) -> Result<Item> {
    Ok(Item {
        id: ItemId(parse_ulid(&raw.id)?),
        title: raw.title,
        description: raw.description,
        category: raw.category,
        legacy_location: raw.legacy_location,
        location_id: raw
            .location_id
            .as_deref()
            .map(|id| parse_ulid(id).map(LocationId))
            .transpose()?,
        brand: raw.brand,
        homemade: raw.homemade,
        quantity: raw.quantity,
        unit: parse_unit(&raw.unit)?,
        added_on: parse_date(&raw.added_on)?,
        expires_on: raw.expires_on.as_deref().map(parse_date).transpose()?,
        image_path: raw.image_path,
        created_at: parse_rfc3339(&raw.created_at)?,
        updated_at: parse_rfc3339(&raw.updated_at)?,
    })
}

type RawLocationRow = (String, String, String, String, String, i64, bool);

fn map_location_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawLocationRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn location_from_raw(raw: RawLocationRow) -> Result<Location> {
    let (id_raw, name, kind_raw, icon, color, sort_order, visible) = raw;
    Ok(Location {
        id: LocationId(parse_ulid(&id_raw)?),
        name,
        kind: parse_kind(&kind_raw)?,
        icon,
        color,
        sort_order,
        visible,
    })
}

type RawConsumptionRow =
    (String, Option<String>, String, String, f64, String, Option<String>, String);

fn map_consumption_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawConsumptionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn consumption_from_raw(raw: RawConsumptionRow) -> Result<ConsumptionRecord> {
    let (id_raw, item_id_raw, title, unit_raw, quantity, action_raw, notes, occurred_at) = raw;
    Ok(ConsumptionRecord {
        id: ConsumptionId(parse_ulid(&id_raw)?),
        item_id: item_id_raw.as_deref().map(|id| parse_ulid(id).map(ItemId)).transpose()?,
        title,
        unit: parse_unit(&unit_raw)?,
        quantity,
        action: ConsumptionAction::parse(&action_raw)
            .ok_or_else(|| anyhow!("unknown consumption action: {action_raw}"))?,
        notes,
        occurred_at: parse_rfc3339(&occurred_at)?,
    })
}

fn parse_unit(raw: &str) -> Result<Unit> {
    Unit::parse(raw).ok_or_else(|| anyhow!("unknown unit: {raw}"))
}

fn parse_kind(raw: &str) -> Result<LocationKind> {
    LocationKind::parse(raw).ok_or_else(|| anyhow!("unknown location kind: {raw}"))
}

fn parse_ulid(raw: &str) -> Result<Ulid> {
    Ulid::from_string(raw).with_context(|| format!("invalid ULID: {raw}"))
}

fn current_schema_version(conn: &Connection) -> Result<i64> {
    let version = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| {
            row.get::<_, i64>(0)
        })
        .context("failed to read current schema version")?;
    Ok(version)
}

fn record_schema_version(conn: &Connection, version: i64) -> Result<()> {
    let now = rfc3339(OffsetDateTime::now_utc())?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations(version, applied_at) VALUES (?1, ?2)",
        params![version, now],
    )
    .with_context(|| format!("failed to record migration version {version}"))?;
    Ok(())
}

fn rfc3339(value: OffsetDateTime) -> Result<String> {
    value
        .format(&time::format_description::well_known::Rfc3339)
        .context("failed to format RFC3339 timestamp")
}

fn parse_rfc3339(value: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339)
        .with_context(|| format!("invalid RFC3339 timestamp: {value}"))
}

fn format_date(value: Date) -> Result<String> {
    value.format(DATE_FORMAT).context("failed to format calendar date")
}

fn parse_date(value: &str) -> Result<Date> {
    Date::parse(value, DATE_FORMAT).with_context(|| format!("invalid calendar date: {value}"))
}
