use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use ulid::Ulid;

time::serde::format_description!(calendar_date, Date, "[year]-[month]-[day]");

/// Expiry dates within this many days of today classify as `soon`.
pub const SOON_WINDOW_DAYS: i64 = 3;
/// Items with 0 < quantity <= this threshold count as low stock.
pub const LOW_STOCK_THRESHOLD: f64 = 1.0;
/// Rolling window for the recent-consumption aggregate.
pub const RECENT_CONSUMPTION_DAYS: i64 = 30;

pub const DEFAULT_CATEGORY: &str = "Uncategorized";
pub const DEFAULT_LOCATION_NAME: &str = "Freezer";
pub const DEFAULT_LOCATION_COLOR: &str = "#607d8b";

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum DomainError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct LocationId(pub Ulid);

impl LocationId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for LocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for LocationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ItemId(pub Ulid);

impl ItemId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CategoryId(pub Ulid);

impl CategoryId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for CategoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for CategoryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ConsumptionId(pub Ulid);

impl ConsumptionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ConsumptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ConsumptionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Fridge,
    Freezer,
    Cupboard,
    Spice,
    Pantry,
    Other,
}

impl LocationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fridge => "fridge",
            Self::Freezer => "freezer",
            Self::Cupboard => "cupboard",
            Self::Spice => "spice",
            Self::Pantry => "pantry",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "fridge" => Some(Self::Fridge),
            "freezer" => Some(Self::Freezer),
            "cupboard" => Some(Self::Cupboard),
            "spice" => Some(Self::Spice),
            "pantry" => Some(Self::Pantry),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    #[must_use]
    pub fn default_icon(self) -> &'static str {
        match self {
            Self::Fridge => "🧊",
            Self::Freezer => "❄️",
            Self::Cupboard => "🗄️",
            Self::Spice => "🌶️",
            Self::Pantry => "🥫",
            Self::Other => "📦",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Unit {
    #[serde(rename = "pcs")]
    Pcs,
    #[serde(rename = "g")]
    Grams,
    #[serde(rename = "kg")]
    Kilograms,
    #[serde(rename = "ml")]
    Milliliters,
    #[serde(rename = "L")]
    Liters,
}

impl Unit {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pcs => "pcs",
            Self::Grams => "g",
            Self::Kilograms => "kg",
            Self::Milliliters => "ml",
            Self::Liters => "L",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pcs" => Some(Self::Pcs),
            "g" => Some(Self::Grams),
            "kg" => Some(Self::Kilograms),
            "ml" => Some(Self::Milliliters),
            "L" => Some(Self::Liters),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionAction {
    Used,
    Discarded,
    Expired,
}

impl ConsumptionAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Used => "used",
            Self::Discarded => "discarded",
            Self::Expired => "expired",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "used" => Some(Self::Used),
            "discarded" => Some(Self::Discarded),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    None,
    Expired,
    Today,
    Soon,
    Ok,
}

impl ExpiryStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Expired => "expired",
            Self::Today => "today",
            Self::Soon => "soon",
            Self::Ok => "ok",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "expired" => Some(Self::Expired),
            "today" => Some(Self::Today),
            "soon" => Some(Self::Soon),
            "ok" => Some(Self::Ok),
            _ => None,
        }
    }
}

/// Whole days between the expiry date and today; negative once expired.
#[must_use]
pub fn days_until_expiry(expires_on: Option<Date>, today: Date) -> Option<i64> {
    expires_on.map(|date| (date - today).whole_days())
}

/// Classify an expiry date against the current local calendar date.
///
/// The buckets partition the timeline: absent date is `none`, strictly past
/// is `expired`, the current day is `today`, within [`SOON_WINDOW_DAYS`] is
/// `soon`, and everything later is `ok`.
#[must_use]
pub fn expiry_status(expires_on: Option<Date>, today: Date) -> ExpiryStatus {
    match days_until_expiry(expires_on, today) {
        None => ExpiryStatus::None,
        Some(days) if days < 0 => ExpiryStatus::Expired,
        Some(0) => ExpiryStatus::Today,
        Some(days) if days <= SOON_WINDOW_DAYS => ExpiryStatus::Soon,
        Some(_) => ExpiryStatus::Ok,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub kind: LocationKind,
    pub icon: String,
    pub color: String,
    pub sort_order: i64,
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub icon: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub legacy_location: Option<String>,
    pub location_id: Option<LocationId>,
    pub brand: Option<String>,
    pub homemade: bool,
    pub quantity: f64,
    pub unit: Unit,
    #[serde(with = "calendar_date")]
    pub added_on: Date,
    #[serde(with = "calendar_date::option")]
    pub expires_on: Option<Date>,
    pub image_path: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Item {
    #[must_use]
    pub fn location_ref(&self) -> LocationRef {
        resolve_location_ref(self.location_id, self.legacy_location.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionRecord {
    pub id: ConsumptionId,
    pub item_id: Option<ItemId>,
    pub title: String,
    pub unit: Unit,
    pub quantity: f64,
    pub action: ConsumptionAction,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
}

/// Item plus the two read-time derived expiry fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    pub expiry_status: ExpiryStatus,
    pub days_until_expiry: Option<i64>,
}

impl ItemView {
    #[must_use]
    pub fn derive(item: Item, today: Date) -> Self {
        let status = expiry_status(item.expires_on, today);
        let days = days_until_expiry(item.expires_on, today);
        Self { item, expiry_status: status, days_until_expiry: days }
    }
}

/// Placement of an item: the numeric reference is authoritative, the legacy
/// free-text label is the pre-migration fallback.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LocationRef {
    ById(LocationId),
    ByLegacyLabel(String),
    Unassigned,
}

/// Single documented resolution order for the dual location columns:
/// a location id wins, a non-blank legacy label is the fallback, anything
/// else is unassigned.
#[must_use]
pub fn resolve_location_ref(
    location_id: Option<LocationId>,
    legacy_label: Option<&str>,
) -> LocationRef {
    if let Some(id) = location_id {
        return LocationRef::ById(id);
    }
    match legacy_label {
        Some(label) if !label.trim().is_empty() => LocationRef::ByLegacyLabel(label.to_string()),
        _ => LocationRef::Unassigned,
    }
}

/// Input shape for item create/update before defaults are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub legacy_location: Option<String>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub homemade: bool,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<Unit>,
    #[serde(default, with = "calendar_date::option")]
    pub added_on: Option<Date>,
    #[serde(default, with = "calendar_date::option")]
    pub expires_on: Option<Date>,
    #[serde(default)]
    pub image_path: Option<String>,
}

/// Fully defaulted and validated item fields, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedItem {
    pub title: String,
    pub description: String,
    pub category: String,
    pub legacy_location: Option<String>,
    pub location_id: Option<LocationId>,
    pub brand: Option<String>,
    pub homemade: bool,
    pub quantity: f64,
    pub unit: Unit,
    pub added_on: Date,
    pub expires_on: Option<Date>,
    pub image_path: Option<String>,
}

impl ItemDraft {
    /// Validate and apply field defaults: category falls back to
    /// "Uncategorized", quantity to 1, unit to pcs, added-on to today, and a
    /// homemade item never keeps a brand.
    ///
    /// # Errors
    /// Returns [`DomainError::Validation`] for an empty title or a negative
    /// or non-finite quantity.
    pub fn normalize(self, today: Date) -> Result<NormalizedItem, DomainError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::Validation("item title MUST be non-empty".to_string()));
        }

        let quantity = self.quantity.unwrap_or(1.0);
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(DomainError::Validation(format!(
                "item quantity MUST be a non-negative number, got {quantity}"
            )));
        }

        let category = match self.category {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => DEFAULT_CATEGORY.to_string(),
        };

        let brand = if self.homemade { None } else { non_blank(self.brand) };

        Ok(NormalizedItem {
            title,
            description: self.description,
            category,
            legacy_location: non_blank(self.legacy_location),
            location_id: self.location_id,
            brand,
            homemade: self.homemade,
            quantity,
            unit: self.unit.unwrap_or(Unit::Pcs),
            added_on: self.added_on.unwrap_or(today),
            expires_on: self.expires_on,
            image_path: non_blank(self.image_path),
        })
    }
}

impl NormalizedItem {
    /// Assemble a brand-new item row.
    #[must_use]
    pub fn into_item(self, id: ItemId, now: OffsetDateTime) -> Item {
        Item {
            id,
            title: self.title,
            description: self.description,
            category: self.category,
            legacy_location: self.legacy_location,
            location_id: self.location_id,
            brand: self.brand,
            homemade: self.homemade,
            quantity: self.quantity,
            unit: self.unit,
            added_on: self.added_on,
            expires_on: self.expires_on,
            image_path: self.image_path,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply onto an existing row, keeping id and created-at. An absent image
    /// path preserves the stored one; it is never cleared implicitly.
    #[must_use]
    pub fn apply_to(self, existing: Item, now: OffsetDateTime) -> Item {
        let image_path = self.image_path.or(existing.image_path);
        Item {
            id: existing.id,
            title: self.title,
            description: self.description,
            category: self.category,
            legacy_location: self.legacy_location,
            location_id: self.location_id,
            brand: self.brand,
            homemade: self.homemade,
            quantity: self.quantity,
            unit: self.unit,
            added_on: self.added_on,
            expires_on: self.expires_on,
            image_path,
            created_at: existing.created_at,
            updated_at: now,
        }
    }
}

/// Input shape for location create/update before defaults are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct LocationDraft {
    pub name: String,
    #[serde(default)]
    pub kind: Option<LocationKind>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NormalizedLocation {
    pub name: String,
    pub kind: LocationKind,
    pub icon: String,
    pub color: String,
    pub visible: bool,
    /// None means "append after the current maximum sort order".
    pub sort_order: Option<i64>,
}

impl LocationDraft {
    /// Validate and apply location defaults.
    ///
    /// # Errors
    /// Returns [`DomainError::Validation`] when the trimmed name is empty.
    pub fn normalize(self) -> Result<NormalizedLocation, DomainError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Validation("location name MUST be non-empty".to_string()));
        }

        let kind = self.kind.unwrap_or(LocationKind::Other);
        let icon = match non_blank(self.icon) {
            Some(value) => value,
            None => kind.default_icon().to_string(),
        };
        let color = non_blank(self.color).unwrap_or_else(|| DEFAULT_LOCATION_COLOR.to_string());

        Ok(NormalizedLocation {
            name,
            kind,
            icon,
            color,
            visible: self.visible.unwrap_or(true),
            sort_order: self.sort_order,
        })
    }

    /// Apply onto an existing location. Fields the draft leaves unset keep
    /// their stored values rather than reverting to creation defaults.
    ///
    /// # Errors
    /// Returns [`DomainError::Validation`] when the trimmed name is empty.
    pub fn apply_to(self, existing: &Location) -> Result<Location, DomainError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Validation("location name MUST be non-empty".to_string()));
        }

        Ok(Location {
            id: existing.id,
            name,
            kind: self.kind.unwrap_or(existing.kind),
            icon: non_blank(self.icon).unwrap_or_else(|| existing.icon.clone()),
            color: non_blank(self.color).unwrap_or_else(|| existing.color.clone()),
            sort_order: self.sort_order.unwrap_or(existing.sort_order),
            visible: self.visible.unwrap_or(existing.visible),
        })
    }
}

/// Zero or more independent item filters, combined with logical AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemFilter {
    pub location_id: Option<LocationId>,
    /// Legacy filter: matches the free-text label or the joined location kind.
    pub location: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub expiry_status: Option<ExpiryStatus>,
}

impl ItemFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.location_id.is_none()
            && self.location.is_none()
            && self.category.is_none()
            && self.search.is_none()
            && self.expiry_status.is_none()
    }

    /// Pure predicate equivalent of the store's parameterized query.
    /// `joined_kind` is the kind of the location the item references, when
    /// that location exists.
    #[must_use]
    pub fn matches(&self, item: &Item, joined_kind: Option<LocationKind>, today: Date) -> bool {
        if let Some(location_id) = self.location_id {
            if item.location_id != Some(location_id) {
                return false;
            }
        }

        if let Some(location) = &self.location {
            let label_match = item.legacy_location.as_deref() == Some(location.as_str());
            let kind_match = joined_kind.is_some_and(|kind| kind.as_str() == location);
            if !label_match && !kind_match {
                return false;
            }
        }

        if let Some(category) = &self.category {
            if &item.category != category {
                return false;
            }
        }

        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let brand = item.brand.as_deref().unwrap_or("");
            let hit = item.title.to_lowercase().contains(&needle)
                || item.description.to_lowercase().contains(&needle)
                || brand.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        if let Some(status) = self.expiry_status {
            if expiry_status(item.expires_on, today) != status {
                return false;
            }
        }

        true
    }
}

/// Fixed list ordering: items without an expiry date sort after all items
/// with one; then expiry ascending; ties broken by title (ordinal).
#[must_use]
pub fn compare_items(lhs: &Item, rhs: &Item) -> Ordering {
    match (lhs.expires_on, rhs.expires_on) {
        (None, None) => lhs.title.cmp(&rhs.title),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(&b).then_with(|| lhs.title.cmp(&rhs.title)),
    }
}

/// Filters for the consumption history listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct HistoryFilter {
    pub item_id: Option<ItemId>,
    pub days: Option<i64>,
    pub action: Option<ConsumptionAction>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct LocationStats {
    pub location_id: LocationId,
    pub name: String,
    pub kind: LocationKind,
    pub icon: String,
    pub color: String,
    pub items: i64,
    pub expired: i64,
    pub expiring_soon: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionSummary {
    pub title: String,
    pub unit: Unit,
    pub total_quantity: f64,
    pub events: i64,
}

/// Dashboard aggregates, computed fresh on every request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsSnapshot {
    pub total_items: i64,
    pub expired: i64,
    pub expiring_soon: i64,
    pub low_stock: i64,
    pub locations: Vec<LocationStats>,
    pub recent_consumption: Vec<ConsumptionSummary>,
}

/// Default category seed: (name, icon), inserted once on first init.
#[must_use]
pub fn default_categories() -> Vec<(&'static str, &'static str)> {
    vec![
        ("Beef", "🥩"),
        ("Pork", "🥓"),
        ("Poultry", "🍗"),
        ("Fish", "🐟"),
        ("Seafood", "🦐"),
        ("Vegetables", "🥕"),
        ("Fruit", "🍎"),
        ("Berries", "🫐"),
        ("Bread", "🍞"),
        ("Dairy", "🧀"),
        ("Eggs", "🥚"),
        ("Ready meals", "🍲"),
        ("Soups", "🥣"),
        ("Sauces", "🥫"),
        ("Grains", "🌾"),
        ("Pasta", "🍝"),
        ("Spices", "🌶️"),
        ("Baking", "🧁"),
        ("Drinks", "🥤"),
        ("Other", "📦"),
    ]
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
