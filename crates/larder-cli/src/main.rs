use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use larder_api::InventoryApi;
use larder_core::{
    ConsumptionAction, ExpiryStatus, HistoryFilter, ItemDraft, ItemFilter, ItemId, LocationDraft,
    LocationId, LocationKind, Unit,
};
use serde_json::Value;
use time::macros::format_description;
use time::Date;
use ulid::Ulid;

const CLI_CONTRACT_VERSION: &str = "cli.v1";

#[derive(Debug, Parser)]
#[command(name = "larder")]
#[command(about = "Home inventory tracker CLI")]
struct Cli {
    #[arg(long, default_value = "./larder.sqlite3")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Item {
        #[command(subcommand)]
        command: Box<ItemCommand>,
    },
    Location {
        #[command(subcommand)]
        command: Box<LocationCommand>,
    },
    History(HistoryArgs),
    Category {
        #[command(subcommand)]
        command: CategoryCommand,
    },
    Stats,
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ItemCommand {
    Add(ItemFieldArgs),
    List(ItemListArgs),
    Get(ItemIdArg),
    Update(ItemUpdateArgs),
    SetQuantity(SetQuantityArgs),
    Use(UseArgs),
    AddQuantity(AddQuantityArgs),
    Discard(DiscardArgs),
    Delete(ItemIdArg),
    Export,
}

#[derive(Debug, Args)]
struct ItemFieldArgs {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    location_id: Option<String>,
    #[arg(long)]
    brand: Option<String>,
    #[arg(long)]
    homemade: bool,
    #[arg(long)]
    quantity: Option<f64>,
    #[arg(long, value_enum)]
    unit: Option<UnitArg>,
    #[arg(long)]
    added_on: Option<String>,
    #[arg(long)]
    expires_on: Option<String>,
    #[arg(long)]
    image_path: Option<String>,
}

#[derive(Debug, Args)]
struct ItemListArgs {
    #[arg(long)]
    location_id: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long, value_enum)]
    expiry_status: Option<ExpiryStatusArg>,
}

#[derive(Debug, Args)]
struct ItemIdArg {
    #[arg(long)]
    id: String,
}

#[derive(Debug, Args)]
struct ItemUpdateArgs {
    #[arg(long)]
    id: String,
    #[command(flatten)]
    fields: ItemFieldArgs,
}

#[derive(Debug, Args)]
struct SetQuantityArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    quantity: f64,
}

#[derive(Debug, Args)]
struct UseArgs {
    #[arg(long)]
    id: String,
    #[arg(long, default_value_t = 1.0)]
    amount: f64,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Debug, Args)]
struct AddQuantityArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    amount: f64,
}

#[derive(Debug, Args)]
struct DiscardArgs {
    #[arg(long)]
    id: String,
    #[arg(long, value_enum, default_value = "discarded")]
    action: DiscardActionArg,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Debug, Subcommand)]
enum LocationCommand {
    Add(LocationFieldArgs),
    List(LocationListArgs),
    Get(LocationIdArg),
    Update(LocationUpdateArgs),
    Delete(LocationIdArg),
    Reorder(ReorderArgs),
    Counts,
}

#[derive(Debug, Args)]
struct LocationFieldArgs {
    #[arg(long)]
    name: String,
    #[arg(long, value_enum)]
    kind: Option<KindArg>,
    #[arg(long)]
    icon: Option<String>,
    #[arg(long)]
    color: Option<String>,
    #[arg(long)]
    visible: Option<bool>,
    #[arg(long)]
    sort_order: Option<i64>,
}

#[derive(Debug, Args)]
struct LocationListArgs {
    #[arg(long)]
    visible_only: bool,
}

#[derive(Debug, Args)]
struct LocationIdArg {
    #[arg(long)]
    id: String,
}

#[derive(Debug, Args)]
struct LocationUpdateArgs {
    #[arg(long)]
    id: String,
    #[command(flatten)]
    fields: LocationFieldArgs,
}

#[derive(Debug, Args)]
struct ReorderArgs {
    /// Location ids in the desired display order; repeat the flag per id.
    #[arg(long = "id", required = true)]
    ids: Vec<String>,
}

#[derive(Debug, Args)]
struct HistoryArgs {
    #[arg(long)]
    item_id: Option<String>,
    #[arg(long)]
    days: Option<i64>,
    #[arg(long, value_enum)]
    action: Option<ActionArg>,
    #[arg(long)]
    limit: Option<i64>,
}

#[derive(Debug, Subcommand)]
enum CategoryCommand {
    List,
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    SchemaVersion,
    Migrate(DbMigrateArgs),
    Backup(DbBackupArgs),
    Restore(DbRestoreArgs),
    IntegrityCheck,
}

#[derive(Debug, Args)]
struct DbMigrateArgs {
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct DbBackupArgs {
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Args)]
struct DbRestoreArgs {
    #[arg(long = "in")]
    input: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UnitArg {
    Pcs,
    G,
    Kg,
    Ml,
    L,
}

impl UnitArg {
    fn into_unit(self) -> Unit {
        match self {
            Self::Pcs => Unit::Pcs,
            Self::G => Unit::Grams,
            Self::Kg => Unit::Kilograms,
            Self::Ml => Unit::Milliliters,
            Self::L => Unit::Liters,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Fridge,
    Freezer,
    Cupboard,
    Spice,
    Pantry,
    Other,
}

impl KindArg {
    fn into_kind(self) -> LocationKind {
        match self {
            Self::Fridge => LocationKind::Fridge,
            Self::Freezer => LocationKind::Freezer,
            Self::Cupboard => LocationKind::Cupboard,
            Self::Spice => LocationKind::Spice,
            Self::Pantry => LocationKind::Pantry,
            Self::Other => LocationKind::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExpiryStatusArg {
    None,
    Expired,
    Today,
    Soon,
    Ok,
}

impl ExpiryStatusArg {
    fn into_status(self) -> ExpiryStatus {
        match self {
            Self::None => ExpiryStatus::None,
            Self::Expired => ExpiryStatus::Expired,
            Self::Today => ExpiryStatus::Today,
            Self::Soon => ExpiryStatus::Soon,
            Self::Ok => ExpiryStatus::Ok,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ActionArg {
    Used,
    Discarded,
    Expired,
}

impl ActionArg {
    fn into_action(self) -> ConsumptionAction {
        match self {
            Self::Used => ConsumptionAction::Used,
            Self::Discarded => ConsumptionAction::Discarded,
            Self::Expired => ConsumptionAction::Expired,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DiscardActionArg {
    Discarded,
    Expired,
}

impl DiscardActionArg {
    fn into_action(self) -> ConsumptionAction {
        match self {
            Self::Discarded => ConsumptionAction::Discarded,
            Self::Expired => ConsumptionAction::Expired,
        }
    }
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

fn parse_date(raw: &str) -> Result<Date> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("invalid calendar date (expected YYYY-MM-DD): {raw}"))
}

fn parse_item_id(raw: &str) -> Result<ItemId> {
    let parsed = Ulid::from_string(raw).with_context(|| format!("invalid item id: {raw}"))?;
    Ok(ItemId(parsed))
}

fn parse_location_id(raw: &str) -> Result<LocationId> {
    let parsed = Ulid::from_string(raw).with_context(|| format!("invalid location id: {raw}"))?;
    Ok(LocationId(parsed))
}

fn build_item_draft(args: ItemFieldArgs) -> Result<ItemDraft> {
    Ok(ItemDraft {
        title: args.title,
        description: args.description,
        category: args.category,
        legacy_location: args.location,
        location_id: args.location_id.as_deref().map(parse_location_id).transpose()?,
        brand: args.brand,
        homemade: args.homemade,
        quantity: args.quantity,
        unit: args.unit.map(UnitArg::into_unit),
        added_on: args.added_on.as_deref().map(parse_date).transpose()?,
        expires_on: args.expires_on.as_deref().map(parse_date).transpose()?,
        image_path: args.image_path,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let api = InventoryApi::new(cli.db);
    match cli.command {
        Command::Item { command } => run_item(*command, &api),
        Command::Location { command } => run_location(*command, &api),
        Command::History(args) => run_history(args, &api),
        Command::Category { command } => run_category(command, &api),
        Command::Stats => run_stats(&api),
        Command::Db { command } => run_db(command, &api),
    }
}

fn run_item(command: ItemCommand, api: &InventoryApi) -> Result<()> {
    match command {
        ItemCommand::Add(args) => {
            let view = api.create_item(build_item_draft(args)?)?;
            emit_json(serde_json::to_value(&view).context("failed to serialize item")?)
        }
        ItemCommand::List(args) => {
            let filter = ItemFilter {
                location_id: args.location_id.as_deref().map(parse_location_id).transpose()?,
                location: args.location,
                category: args.category,
                search: args.search,
                expiry_status: args.expiry_status.map(ExpiryStatusArg::into_status),
            };
            let items = api.list_items(&filter)?;
            emit_json(serde_json::json!({
                "count": items.len(),
                "items": items
            }))
        }
        ItemCommand::Get(args) => {
            let view = api.get_item(parse_item_id(&args.id)?)?;
            emit_json(serde_json::to_value(&view).context("failed to serialize item")?)
        }
        ItemCommand::Update(args) => {
            let id = parse_item_id(&args.id)?;
            let view = api.update_item(id, build_item_draft(args.fields)?)?;
            emit_json(serde_json::to_value(&view).context("failed to serialize item")?)
        }
        ItemCommand::SetQuantity(args) => {
            let view = api.set_quantity(parse_item_id(&args.id)?, args.quantity)?;
            emit_json(serde_json::to_value(&view).context("failed to serialize item")?)
        }
        ItemCommand::Use(args) => {
            let view = api.use_item(parse_item_id(&args.id)?, args.amount, args.notes)?;
            emit_json(serde_json::json!({
                "found": view.is_some(),
                "item": view
            }))
        }
        ItemCommand::AddQuantity(args) => {
            let view = api.add_quantity(parse_item_id(&args.id)?, args.amount)?;
            emit_json(serde_json::to_value(&view).context("failed to serialize item")?)
        }
        ItemCommand::Discard(args) => {
            let view =
                api.discard_item(parse_item_id(&args.id)?, args.action.into_action(), args.notes)?;
            emit_json(serde_json::to_value(&view).context("failed to serialize item")?)
        }
        ItemCommand::Delete(args) => {
            let id = parse_item_id(&args.id)?;
            api.delete_item(id)?;
            emit_json(serde_json::json!({
                "deleted": true,
                "id": id.to_string()
            }))
        }
        ItemCommand::Export => {
            let items = api.export_items()?;
            emit_json(serde_json::json!({
                "count": items.len(),
                "items": items
            }))
        }
    }
}

fn run_location(command: LocationCommand, api: &InventoryApi) -> Result<()> {
    match command {
        LocationCommand::Add(args) => {
            let location = api.create_location(LocationDraft {
                name: args.name,
                kind: args.kind.map(KindArg::into_kind),
                icon: args.icon,
                color: args.color,
                visible: args.visible,
                sort_order: args.sort_order,
            })?;
            emit_json(serde_json::to_value(&location).context("failed to serialize location")?)
        }
        LocationCommand::List(args) => {
            let locations = api.list_locations(args.visible_only)?;
            emit_json(serde_json::json!({
                "count": locations.len(),
                "locations": locations
            }))
        }
        LocationCommand::Get(args) => {
            let location = api.get_location(parse_location_id(&args.id)?)?;
            emit_json(serde_json::to_value(&location).context("failed to serialize location")?)
        }
        LocationCommand::Update(args) => {
            let id = parse_location_id(&args.id)?;
            let location = api.update_location(
                id,
                LocationDraft {
                    name: args.fields.name,
                    kind: args.fields.kind.map(KindArg::into_kind),
                    icon: args.fields.icon,
                    color: args.fields.color,
                    visible: args.fields.visible,
                    sort_order: args.fields.sort_order,
                },
            )?;
            emit_json(serde_json::to_value(&location).context("failed to serialize location")?)
        }
        LocationCommand::Delete(args) => {
            let id = parse_location_id(&args.id)?;
            api.delete_location(id)?;
            emit_json(serde_json::json!({
                "deleted": true,
                "id": id.to_string()
            }))
        }
        LocationCommand::Reorder(args) => {
            let mut ids = Vec::with_capacity(args.ids.len());
            for raw in &args.ids {
                ids.push(parse_location_id(raw)?);
            }
            let locations = api.reorder_locations(&ids)?;
            emit_json(serde_json::json!({
                "count": locations.len(),
                "locations": locations
            }))
        }
        LocationCommand::Counts => {
            let counts = api.location_counts()?;
            emit_json(serde_json::json!({
                "count": counts.len(),
                "locations": counts
            }))
        }
    }
}

fn run_history(args: HistoryArgs, api: &InventoryApi) -> Result<()> {
    let filter = HistoryFilter {
        item_id: args.item_id.as_deref().map(parse_item_id).transpose()?,
        days: args.days,
        action: args.action.map(ActionArg::into_action),
        limit: args.limit,
    };
    let records = api.history(&filter)?;
    emit_json(serde_json::json!({
        "count": records.len(),
        "records": records
    }))
}

fn run_category(command: CategoryCommand, api: &InventoryApi) -> Result<()> {
    match command {
        CategoryCommand::List => {
            let categories = api.list_categories()?;
            emit_json(serde_json::json!({
                "count": categories.len(),
                "categories": categories
            }))
        }
    }
}

fn run_stats(api: &InventoryApi) -> Result<()> {
    let snapshot = api.stats_snapshot()?;
    emit_json(serde_json::to_value(&snapshot).context("failed to serialize stats snapshot")?)
}

fn run_db(command: DbCommand, api: &InventoryApi) -> Result<()> {
    match command {
        DbCommand::SchemaVersion => {
            let status = api.schema_status()?;
            emit_json(serde_json::json!({
                "current_version": status.current_version,
                "target_version": status.target_version,
                "pending_versions": status.pending_versions,
                "up_to_date": status.pending_versions.is_empty()
            }))
        }
        DbCommand::Migrate(args) => {
            let result = api.migrate(args.dry_run)?;
            emit_json(serde_json::to_value(&result).context("failed to serialize migrate result")?)
        }
        DbCommand::Backup(args) => {
            api.backup(&args.out)?;
            emit_json(serde_json::json!({
                "backup_path": args.out,
                "status": "ok"
            }))
        }
        DbCommand::Restore(args) => {
            api.restore(&args.input)?;
            let status = api.schema_status()?;
            emit_json(serde_json::json!({
                "restored_from": args.input,
                "current_version": status.current_version,
                "target_version": status.target_version,
                "pending_versions": status.pending_versions
            }))
        }
        DbCommand::IntegrityCheck => {
            let report = api.integrity_check()?;
            emit_json(serde_json::to_value(&report).context("failed to serialize integrity report")?)
        }
    }
}
