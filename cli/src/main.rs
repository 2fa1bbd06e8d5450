use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use clientbook_config::{AppConfig, DEFAULT_LOG_FILTER, default_config_path};
use clientbook_core::TableSpec;
use clientbook_sqlite::introspect;
use clientbook_sqlite::{
    ClientStore, NewMachine, NewPurchaseItem, NewRepair, NewUser, Reconciler, RepairUpdate,
    client_catalog,
};
use rusqlite::{Connection, OpenFlags};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "clientbook")]
#[command(about = "Client and repair registry over a self-migrating SQLite database")]
#[command(version)]
struct Cli {
    /// Configuration file (default: the per-user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Database file, overriding the configured location.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log filter directive, e.g. `debug` or `clientbook_sqlite=trace`.
    #[arg(long, global = true)]
    log: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Bring the database schema in line with the catalog.
    Reconcile(ReportArgs),
    /// Show what `reconcile` would do, without writing.
    Plan(ReportArgs),
    /// Show each catalog table's on-disk state.
    Status,
    /// Manage customers.
    #[command(subcommand)]
    User(UserCommand),
    /// Manage machines.
    #[command(subcommand)]
    Machine(MachineCommand),
    /// Manage repairs.
    #[command(subcommand)]
    Repair(RepairCommand),
    /// Manage purchases.
    #[command(subcommand)]
    Purchase(PurchaseCommand),
    /// Configuration file helpers.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Args)]
struct ReportArgs {
    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum UserCommand {
    /// Add a customer.
    Add(UserAddArgs),
    /// List customers by name.
    List(ListArgs),
    /// Show one customer by id.
    Show(UserShowArgs),
    /// Find a customer by CPF, phone or contact name.
    Find(UserFindArgs),
    /// Remove a customer and their purchases.
    Remove(IdArgs),
}

#[derive(Debug, Args)]
struct UserAddArgs {
    /// Company or display name.
    #[arg(long)]
    id_name: String,
    /// Contact person.
    #[arg(long, default_value = "")]
    contact_name: String,
    #[arg(long, default_value = "")]
    cpf: String,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    cep: String,
    /// Address as `street, number, neighborhood, city`.
    #[arg(long, default_value = "")]
    address: String,
}

#[derive(Debug, Args)]
struct UserShowArgs {
    /// Customer id.
    id: i64,
    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct UserFindArgs {
    #[arg(long)]
    cpf: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    contact_name: Option<String>,
}

#[derive(Debug, Args)]
struct IdArgs {
    /// Record id.
    id: i64,
}

#[derive(Debug, Subcommand)]
enum MachineCommand {
    /// Register a machine.
    Add(MachineAddArgs),
    /// List machines by model.
    List(ListArgs),
    /// Remove a machine and its repairs.
    Remove(IdArgs),
}

#[derive(Debug, Args)]
struct MachineAddArgs {
    /// Serial number.
    #[arg(long)]
    serial: String,
    #[arg(long, default_value = "")]
    model: String,
    #[arg(long, default_value = "")]
    owner: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    phone2: String,
}

#[derive(Debug, Subcommand)]
enum RepairCommand {
    /// Record a repair for a machine.
    Add(RepairAddArgs),
    /// List a machine's repairs, newest first.
    List(RepairListArgs),
    /// Mark a repair as done.
    Done(IdArgs),
}

#[derive(Debug, Args)]
struct RepairAddArgs {
    /// Machine id.
    #[arg(long)]
    machine: i64,
    #[arg(long)]
    description: String,
    #[arg(long, default_value_t = 0.0)]
    price: f64,
    /// Date as YYYY-MM-DD (default: today).
    #[arg(long)]
    date: Option<String>,
    #[arg(long, default_value = "")]
    service_order: String,
}

#[derive(Debug, Args)]
struct RepairListArgs {
    /// Machine id.
    #[arg(long)]
    machine: i64,
    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum PurchaseCommand {
    /// Start a purchase for a customer.
    Add(PurchaseAddArgs),
    /// Add an item to a purchase and update its total.
    Item(PurchaseItemArgs),
    /// Show a customer's purchase history.
    History(PurchaseHistoryArgs),
}

#[derive(Debug, Args)]
struct PurchaseAddArgs {
    /// Customer id.
    #[arg(long)]
    user: i64,
    /// Date as YYYY-MM-DD (default: today).
    #[arg(long)]
    date: Option<String>,
}

#[derive(Debug, Args)]
struct PurchaseItemArgs {
    /// Purchase id.
    #[arg(long)]
    purchase: i64,
    #[arg(long)]
    name: String,
    #[arg(long, default_value_t = 1)]
    quantity: i64,
    #[arg(long)]
    price: f64,
    #[arg(long, default_value = "")]
    discount: String,
}

#[derive(Debug, Args)]
struct PurchaseHistoryArgs {
    /// Customer id.
    #[arg(long)]
    user: i64,
    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Write a default configuration file.
    Init(ConfigInitArgs),
}

#[derive(Debug, Args)]
struct ConfigInitArgs {
    /// Where to write the file.
    path: PathBuf,
    /// Overwrite an existing file.
    #[arg(long)]
    force: bool,
}

/// Settings resolved once at startup and shared by every command.
struct Context {
    config: AppConfig,
    db_override: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| {
        init_logging(cli.log.as_deref(), &config.logging.filter);
        let ctx = Context {
            config,
            db_override: cli.db,
        };
        run(cli.command, &ctx)
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(command: Command, ctx: &Context) -> Result<(), String> {
    match command {
        Command::Reconcile(args) => run_reconcile(args, ctx),
        Command::Plan(args) => run_plan(args, ctx),
        Command::Status => run_status(ctx),
        Command::User(cmd) => run_user(cmd, ctx),
        Command::Machine(cmd) => run_machine(cmd, ctx),
        Command::Repair(cmd) => run_repair(cmd, ctx),
        Command::Purchase(cmd) => run_purchase(cmd, ctx),
        Command::Config(cmd) => run_config(cmd),
    }
}

// ---------------------------------------------------------------------------
// startup
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<AppConfig, String> {
    match path {
        Some(path) => AppConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display())),
        None => match default_config_path() {
            Some(path) => AppConfig::load_or_default(&path)
                .map_err(|e| format!("Failed to load config '{}': {e}", path.display())),
            None => Ok(AppConfig::default()),
        },
    }
}

/// Installs the global subscriber. `--log` wins over `RUST_LOG`, which wins
/// over the configured filter. Logs go to stderr.
fn init_logging(cli_filter: Option<&str>, config_filter: &str) {
    let filter = match cli_filter {
        Some(directive) => EnvFilter::try_new(directive),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(config_filter)),
    }
    .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn database_path(ctx: &Context) -> Result<PathBuf, String> {
    match &ctx.db_override {
        Some(path) => Ok(path.clone()),
        None => ctx
            .config
            .database_path()
            .map_err(|e| format!("Failed to resolve database path: {e}")),
    }
}

/// Opens the database for writing, creating its directory if needed.
fn open_database(ctx: &Context) -> Result<Connection, String> {
    let path = database_path(ctx)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create directory '{}': {e}", parent.display()))?;
    }
    debug!(path = %path.display(), "Opening database");
    Connection::open(&path).map_err(|e| format!("Failed to open database '{}': {e}", path.display()))
}

/// Opens the database read-only. A missing file is inspected as an empty
/// in-memory database so nothing is created on disk.
fn open_database_read_only(ctx: &Context) -> Result<Connection, String> {
    let path = database_path(ctx)?;
    if !path.exists() {
        debug!(path = %path.display(), "Database does not exist yet");
        return Connection::open_in_memory().map_err(|e| format!("Failed to open database: {e}"));
    }
    Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| format!("Failed to open database '{}': {e}", path.display()))
}

/// Opens the database and reconciles it. Record commands never run against
/// an unreconciled schema.
fn open_reconciled(ctx: &Context) -> Result<Connection, String> {
    let mut conn = open_database(ctx)?;
    Reconciler::new(&client_catalog())
        .run(&mut conn)
        .map_err(|e| format!("Schema reconciliation failed: {e}"))?;
    Ok(conn)
}

// ---------------------------------------------------------------------------
// schema commands
// ---------------------------------------------------------------------------

fn run_reconcile(args: ReportArgs, ctx: &Context) -> Result<(), String> {
    let mut conn = open_database(ctx)?;
    let report = Reconciler::new(&client_catalog())
        .run(&mut conn)
        .map_err(|e| format!("Schema reconciliation failed: {e}"))?;

    if args.json {
        return print_json(&report);
    }
    for table in report.tables() {
        println!("{}: {}", table.table, table.outcome);
    }
    println!(
        "Reconciled {} table(s): {} created, {} rebuilt, {} unchanged.",
        report.tables().len(),
        report.created(),
        report.rebuilt(),
        report.unchanged()
    );
    Ok(())
}

fn run_plan(args: ReportArgs, ctx: &Context) -> Result<(), String> {
    let conn = open_database_read_only(ctx)?;
    let planned = Reconciler::new(&client_catalog())
        .plan(&conn)
        .map_err(|e| format!("Failed to plan reconciliation: {e}"))?;

    if args.json {
        return print_json(&planned);
    }
    for table in &planned {
        println!("{}: {}", table.table, table.plan);
    }
    Ok(())
}

fn run_status(ctx: &Context) -> Result<(), String> {
    let conn = open_database_read_only(ctx)?;
    println!("Database: {}", database_path(ctx)?.display());
    for spec in &client_catalog() {
        println!("{}", describe_table(&conn, spec)?);
    }
    Ok(())
}

fn describe_table(conn: &Connection, spec: &TableSpec) -> Result<String, String> {
    let table = spec.name.as_str();
    let read_err = |e: rusqlite::Error| format!("Failed to inspect table '{table}': {e}");

    if !introspect::table_exists(conn, table).map_err(read_err)? {
        return Ok(format!("  {table}: missing"));
    }
    let columns: Vec<String> = introspect::table_columns(conn, table)
        .map_err(read_err)?
        .into_iter()
        .map(|c| c.name)
        .collect();
    let rows = introspect::row_count(conn, table).map_err(read_err)?;
    let state = if spec.matches_columns(columns.as_slice()) {
        "matching"
    } else {
        "drifted"
    };
    Ok(format!(
        "  {table}: {state}, {rows} row(s), columns [{}]",
        columns.join(", ")
    ))
}

// ---------------------------------------------------------------------------
// record commands
// ---------------------------------------------------------------------------

fn run_user(cmd: UserCommand, ctx: &Context) -> Result<(), String> {
    let conn = open_reconciled(ctx)?;
    let store = ClientStore::new(&conn).map_err(|e| e.to_string())?;

    match cmd {
        UserCommand::Add(args) => {
            let id = store
                .insert_user(&NewUser {
                    cpf: args.cpf,
                    id_name: args.id_name,
                    contact_name: args.contact_name,
                    email: args.email,
                    phone: args.phone,
                    cep: args.cep,
                    address: args.address,
                })
                .map_err(|e| format!("Failed to add user: {e}"))?;
            println!("Added user {id}.");
        }
        UserCommand::List(args) => {
            let users = store
                .all_users()
                .map_err(|e| format!("Failed to list users: {e}"))?;
            if args.json {
                return print_json(&users);
            }
            for user in &users {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    user.internal_id, user.id_name, user.contact_name, user.phone, user.email
                );
            }
        }
        UserCommand::Show(args) => {
            let user = store
                .get_user(args.id)
                .map_err(|e| format!("Failed to load user: {e}"))?
                .ok_or_else(|| format!("user {} not found", args.id))?;
            if args.json {
                return print_json(&user);
            }
            println!("Id:        {}", user.internal_id);
            println!("Name:      {}", user.id_name);
            println!("Contact:   {}", user.contact_name);
            println!("CPF:       {}", user.cpf);
            println!("Email:     {}", user.email);
            println!("Phone:     {}", user.phone);
            println!("CEP:       {}", user.cep);
            match user.address_parts() {
                Some(address) => {
                    println!("Street:    {} {}", address.street, address.number);
                    println!("District:  {}", address.neighborhood);
                    println!("City:      {}", address.city);
                }
                None => println!("Address:   {}", user.address),
            }
        }
        UserCommand::Find(args) => {
            let found = if let Some(cpf) = &args.cpf {
                store.find_user_by_cpf(cpf)
            } else if let Some(phone) = &args.phone {
                store.find_user_by_phone(phone)
            } else if let Some(name) = &args.contact_name {
                store.find_user_by_contact_name(name)
            } else {
                return Err("Specify --cpf, --phone or --contact-name".to_string());
            }
            .map_err(|e| format!("Failed to search users: {e}"))?;
            match found {
                Some(user) => println!("{}\t{}\t{}", user.internal_id, user.id_name, user.contact_name),
                None => return Err("no matching user".to_string()),
            }
        }
        UserCommand::Remove(args) => {
            let removed = store
                .remove_user(args.id)
                .map_err(|e| format!("Failed to remove user: {e}"))?;
            if !removed {
                return Err(format!("user {} not found", args.id));
            }
            println!("Removed user {}.", args.id);
        }
    }
    Ok(())
}

fn run_machine(cmd: MachineCommand, ctx: &Context) -> Result<(), String> {
    let conn = open_reconciled(ctx)?;
    let store = ClientStore::new(&conn).map_err(|e| e.to_string())?;

    match cmd {
        MachineCommand::Add(args) => {
            let id = store
                .insert_machine(&NewMachine {
                    machine_id: args.serial,
                    machine_model: args.model,
                    owner_name: args.owner,
                    owner_phone: args.phone,
                    owner_phone2: args.phone2,
                })
                .map_err(|e| format!("Failed to add machine: {e}"))?;
            println!("Added machine {id}.");
        }
        MachineCommand::List(args) => {
            let machines = store
                .all_machines()
                .map_err(|e| format!("Failed to list machines: {e}"))?;
            if args.json {
                return print_json(&machines);
            }
            for machine in &machines {
                println!(
                    "{}\t{}\t{}\t{}",
                    machine.internal_id, machine.machine_id, machine.machine_model, machine.owner_name
                );
            }
        }
        MachineCommand::Remove(args) => {
            let removed = store
                .remove_machine(args.id)
                .map_err(|e| format!("Failed to remove machine: {e}"))?;
            if !removed {
                return Err(format!("machine {} not found", args.id));
            }
            println!("Removed machine {}.", args.id);
        }
    }
    Ok(())
}

fn run_repair(cmd: RepairCommand, ctx: &Context) -> Result<(), String> {
    let conn = open_reconciled(ctx)?;
    let store = ClientStore::new(&conn).map_err(|e| e.to_string())?;

    match cmd {
        RepairCommand::Add(args) => {
            let date = resolve_date(args.date.as_deref())?;
            if store
                .get_machine(args.machine)
                .map_err(|e| format!("Failed to load machine: {e}"))?
                .is_none()
            {
                return Err(format!("machine {} not found", args.machine));
            }
            let id = store
                .insert_repair(&NewRepair {
                    machine_id: args.machine,
                    description: args.description,
                    price: args.price,
                    date,
                    service_order: args.service_order,
                })
                .map_err(|e| format!("Failed to add repair: {e}"))?;
            println!("Added repair {id}.");
        }
        RepairCommand::List(args) => {
            let repairs = store
                .repairs_for_machine(args.machine)
                .map_err(|e| format!("Failed to list repairs: {e}"))?;
            if args.json {
                return print_json(&repairs);
            }
            for repair in &repairs {
                println!(
                    "{}\t{}\t{}\t{:.2}\t{}",
                    repair.repair_id,
                    repair.date,
                    repair.description,
                    repair.price,
                    if repair.done { "done" } else { "open" }
                );
            }
        }
        RepairCommand::Done(args) => {
            let repair = store
                .get_repair(args.id)
                .map_err(|e| format!("Failed to load repair: {e}"))?
                .ok_or_else(|| format!("repair {} not found", args.id))?;
            store
                .update_repair(
                    args.id,
                    &RepairUpdate {
                        description: repair.description,
                        service_order: repair.service_order,
                        done: true,
                    },
                )
                .map_err(|e| format!("Failed to update repair: {e}"))?;
            println!("Repair {} marked done.", args.id);
        }
    }
    Ok(())
}

fn run_purchase(cmd: PurchaseCommand, ctx: &Context) -> Result<(), String> {
    let conn = open_reconciled(ctx)?;
    let store = ClientStore::new(&conn).map_err(|e| e.to_string())?;

    match cmd {
        PurchaseCommand::Add(args) => {
            let date = resolve_date(args.date.as_deref())?;
            if store
                .get_user(args.user)
                .map_err(|e| format!("Failed to load user: {e}"))?
                .is_none()
            {
                return Err(format!("user {} not found", args.user));
            }
            let id = store
                .insert_purchase(args.user, &date)
                .map_err(|e| format!("Failed to add purchase: {e}"))?;
            println!("Added purchase {id}.");
        }
        PurchaseCommand::Item(args) => {
            store
                .insert_purchase_item(&NewPurchaseItem {
                    purchase_id: args.purchase,
                    item_name: args.name,
                    quantity: args.quantity,
                    price: args.price,
                    discount: args.discount,
                })
                .map_err(|e| format!("Failed to add item: {e}"))?;
            let total = store
                .update_total_price(args.purchase)
                .map_err(|e| format!("Failed to update total: {e}"))?;
            println!("Purchase {} total: {total:.2}", args.purchase);
        }
        PurchaseCommand::History(args) => {
            let history = store
                .purchase_history(args.user)
                .map_err(|e| format!("Failed to load history: {e}"))?;
            if args.json {
                return print_json(&history);
            }
            for entry in &history {
                println!(
                    "{}\t{}\t{}\t{} x {:.2}\t{}\ttotal {:.2}",
                    entry.purchase_id,
                    entry.date,
                    entry.item_name,
                    entry.quantity,
                    entry.price,
                    entry.discount,
                    entry.total_price
                );
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config command
// ---------------------------------------------------------------------------

fn run_config(cmd: ConfigCommand) -> Result<(), String> {
    match cmd {
        ConfigCommand::Init(args) => {
            if args.path.exists() && !args.force {
                return Err(format!(
                    "'{}' already exists; pass --force to overwrite",
                    args.path.display()
                ));
            }
            AppConfig::default()
                .save(&args.path)
                .map_err(|e| format!("Failed to write config '{}': {e}", args.path.display()))?;
            println!("Wrote default configuration to '{}'.", args.path.display());
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Validates a `YYYY-MM-DD` date, defaulting to today.
fn resolve_date(raw: Option<&str>) -> Result<String, String> {
    let date = match raw {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| format!("Invalid date '{raw}' (expected YYYY-MM-DD): {e}"))?,
        None => Local::now().date_naive(),
    };
    Ok(date.format("%Y-%m-%d").to_string())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize output: {e}"))?;
    println!("{json}");
    Ok(())
}
