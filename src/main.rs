use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mission_checklist::codec;
use mission_checklist::config::Settings;
use mission_checklist::eval::{aggregate_all, evaluate, live_value};
use mission_checklist::models::{
    AggregationMode, Criterion, CriterionKind, KindScope, Mission, NodeId, ResourceEntry,
    StepRecord, TransferDirection, TransferEntry,
};
use mission_checklist::render::{render_tree, RenderOptions};
use mission_checklist::store::{MissionStore, SaveMode, MISSION_EXTENSION};
use mission_checklist::telemetry::{EvalContext, VehicleSnapshot};

#[derive(Parser)]
#[command(name = "mcheck")]
#[command(about = "Hierarchical mission checklists checked against vehicle telemetry")]
struct Cli {
    /// Mission scope to use instead of the configured one
    #[arg(long, global = true)]
    scope: Option<String>,

    /// Missions directory to use instead of the configured one
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored missions
    List {
        /// Include missions from every scope
        #[arg(long)]
        all_scopes: bool,
    },
    /// Create an empty mission
    New {
        name: String,

        #[arg(long, default_value = "")]
        summary: String,
    },
    /// Delete a stored mission
    Delete { name: String },
    /// Print a mission's steps
    Show {
        /// Mission name or path to a .mission file
        mission: String,

        /// Prefix steps with their paths
        #[arg(short, long)]
        paths: bool,

        /// Expand collapsed steps
        #[arg(short, long)]
        all: bool,

        /// Show each step's criterion kind
        #[arg(short, long)]
        kinds: bool,
    },
    /// Add a step
    Add {
        mission: String,

        title: String,

        /// Path of the parent step; top level when omitted
        #[arg(long)]
        under: Option<String>,

        /// 1-based position among the siblings; appended when omitted
        #[arg(long)]
        position: Option<usize>,

        #[arg(long)]
        description: Option<String>,

        #[command(flatten)]
        criterion: CriterionArgs,
    },
    /// Edit a step's text or criterion
    Edit {
        mission: String,

        /// Step path, e.g. 2.1
        step: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[command(flatten)]
        criterion: CriterionArgs,
    },
    /// Remove a step and everything under it
    Remove { mission: String, step: String },
    /// Move a step under another step
    Move {
        mission: String,

        step: String,

        /// Path of the new parent; top level when omitted
        #[arg(long)]
        under: Option<String>,

        /// 1-based position among the new siblings; appended when omitted
        #[arg(long)]
        position: Option<usize>,
    },
    /// Swap a step with its previous or next sibling
    Shift {
        mission: String,

        step: String,

        #[arg(value_enum)]
        direction: Direction,
    },
    /// Make a step the sibling after its parent
    Promote { mission: String, step: String },
    /// Make a step the last child of its previous sibling
    Demote { mission: String, step: String },
    /// Copy a step and its children
    Duplicate { mission: String, step: String },
    /// Set a step flag
    Set {
        mission: String,

        step: String,

        #[arg(value_enum)]
        flag: Flag,

        /// true/false, or all/any for `mode`
        value: String,
    },
    /// Clear completion flags under a step, or in the whole mission
    Reset {
        mission: String,

        step: Option<String>,
    },
    /// Run one evaluation pass against a vehicle snapshot
    Evaluate {
        mission: String,

        /// Vehicle snapshot JSON file
        snapshot: PathBuf,

        /// Write completion flags back to the mission
        #[arg(long)]
        save: bool,

        #[arg(short, long)]
        paths: bool,
    },
    /// List criterion kinds and their parameters
    Kinds,
    /// Show the settings file, or change it
    Config {
        /// Default scope to save to
        #[arg(long = "set-scope")]
        scope: Option<String>,

        /// Missions directory
        #[arg(long = "set-dir")]
        missions_dir: Option<PathBuf>,

        /// What saving does when the file name is taken
        #[arg(long, value_enum)]
        on_collision: Option<Collision>,
    },
}

#[derive(Args)]
struct CriterionArgs {
    /// Criterion kind (see `mcheck kinds`)
    #[arg(long)]
    kind: Option<String>,

    /// Criterion parameter
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Required resource, added to the criterion's resource list
    #[arg(long = "resource", value_name = "NAME:AMOUNT[:CAPACITY]")]
    resources: Vec<String>,

    /// Planned transfer for `resource_transfer`
    #[arg(long = "transfer", value_name = "NAME:in|out:STARTING:ENDING")]
    transfers: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Up,
    Down,
}

#[derive(Clone, Copy, ValueEnum)]
enum Collision {
    Overwrite,
    KeepBoth,
    Fail,
}

impl From<Collision> for SaveMode {
    fn from(collision: Collision) -> Self {
        match collision {
            Collision::Overwrite => SaveMode::Overwrite,
            Collision::KeepBoth => SaveMode::KeepBoth,
            Collision::Fail => SaveMode::Fail,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Flag {
    Locked,
    Active,
    Completed,
    Expanded,
    Mode,
}

/// Initialize tracing with output to stderr so stdout only carries results
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "mission_checklist=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if let Commands::Config {
        scope,
        missions_dir,
        on_collision,
    } = cli.command
    {
        return configure(scope, missions_dir, on_collision);
    }

    let session = Session::open(cli.scope, cli.dir)?;

    match cli.command {
        Commands::List { all_scopes } => {
            let scope = (!all_scopes).then_some(session.scope.as_str());
            let listings = session.store.list(scope)?;
            if listings.is_empty() {
                println!("No missions in scope '{}'", session.scope);
            }
            for listing in listings {
                let saved = listing
                    .saved_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{}  [{}]  saved {}  {} top-level steps",
                    listing.name,
                    listing.scope,
                    saved,
                    listing.root_titles.len()
                );
            }
        }
        Commands::New { name, summary } => {
            let mut mission = Mission::new(name);
            mission.summary = summary;
            let path = session
                .store
                .save(&session.scope, &mut mission, session.on_collision)
                .context("Failed to create mission")?;
            println!("Created '{}' at {}", mission.name, path.display());
        }
        Commands::Delete { name } => {
            if !session.store.delete(&session.scope, &name)? {
                bail!("No mission '{}' in scope '{}'", name, session.scope);
            }
            println!("Deleted '{}'", name);
        }
        Commands::Show {
            mission,
            paths,
            all,
            kinds,
        } => {
            let (mission, _) = session.load(&mission)?;
            let annotate = |id: NodeId| {
                let record = mission.steps.record(id)?;
                Some(format!("[{}]", record.kind()))
            };
            let options = RenderOptions {
                show_paths: paths,
                show_all: all,
                annotate: if kinds { Some(&annotate) } else { None },
            };
            print_header(&mission);
            print!("{}", render_tree(&mission.steps, &options));
        }
        Commands::Add {
            mission,
            title,
            under,
            position,
            description,
            criterion,
        } => session.edit(&mission, |m| {
            let parent = under
                .as_deref()
                .map(|p| resolve_step(m, p))
                .transpose()?;
            let mut record = StepRecord::new(title, Criterion::Unconditional);
            if let Some(description) = description {
                record.description = description;
            }
            apply_criterion(&mut record, &criterion)?;
            let id = m
                .steps
                .insert(parent, to_index(position), record)
                .ok_or_else(|| anyhow!("Failed to insert step"))?;
            tracing::debug!(step = %id, "Added step");
            Ok(())
        })?,
        Commands::Edit {
            mission,
            step,
            title,
            description,
            criterion,
        } => session.edit(&mission, |m| {
            let id = resolve_step(m, &step)?;
            let record = m
                .steps
                .record_mut(id)
                .ok_or_else(|| anyhow!("No step at path '{}'", step))?;
            if let Some(title) = title {
                record.title = title;
            }
            if let Some(description) = description {
                record.description = description;
            }
            apply_criterion(record, &criterion)
        })?,
        Commands::Remove { mission, step } => session.edit(&mission, |m| {
            let id = resolve_step(m, &step)?;
            if let Some(removed) = m.steps.remove(id) {
                println!("Removed '{}'", removed.title);
            }
            Ok(())
        })?,
        Commands::Move {
            mission,
            step,
            under,
            position,
        } => session.edit(&mission, |m| {
            let id = resolve_step(m, &step)?;
            let parent = under
                .as_deref()
                .map(|p| resolve_step(m, p))
                .transpose()?;
            if !m.steps.move_node(id, parent, to_index(position)) {
                bail!("Cannot move step {} into its own subtree", step);
            }
            Ok(())
        })?,
        Commands::Shift {
            mission,
            step,
            direction,
        } => session.edit(&mission, |m| {
            let id = resolve_step(m, &step)?;
            let moved = match direction {
                Direction::Up => m.steps.shift_up(id),
                Direction::Down => m.steps.shift_down(id),
            };
            if !moved {
                bail!("Step {} has no sibling in that direction", step);
            }
            Ok(())
        })?,
        Commands::Promote { mission, step } => session.edit(&mission, |m| {
            let id = resolve_step(m, &step)?;
            if !m.steps.promote(id) {
                bail!("Step {} is already at the top level", step);
            }
            Ok(())
        })?,
        Commands::Demote { mission, step } => session.edit(&mission, |m| {
            let id = resolve_step(m, &step)?;
            if !m.steps.demote(id) {
                bail!("Step {} has no previous sibling", step);
            }
            Ok(())
        })?,
        Commands::Duplicate { mission, step } => session.edit(&mission, |m| {
            let id = resolve_step(m, &step)?;
            let copy = m
                .steps
                .duplicate(id)
                .ok_or_else(|| anyhow!("Failed to duplicate step {}", step))?;
            if let Some(path) = m.steps.path_of(copy) {
                println!("Copied to {}", path);
            }
            Ok(())
        })?,
        Commands::Set {
            mission,
            step,
            flag,
            value,
        } => session.edit(&mission, |m| {
            let id = resolve_step(m, &step)?;
            let node = m
                .steps
                .get_mut(id)
                .ok_or_else(|| anyhow!("No step at path '{}'", step))?;
            match flag {
                Flag::Locked => node.record.locked = parse_flag(&value)?,
                Flag::Active => node.record.active = parse_flag(&value)?,
                Flag::Completed => node.record.completed = parse_flag(&value)?,
                Flag::Expanded => node.expanded = parse_flag(&value)?,
                Flag::Mode => {
                    node.mode = AggregationMode::from_str(&value)
                        .ok_or_else(|| anyhow!("Expected 'all' or 'any', got '{}'", value))?;
                }
            }
            Ok(())
        })?,
        Commands::Reset { mission, step } => session.edit(&mission, |m| {
            let scope = step.as_deref().map(|p| resolve_step(m, p)).transpose()?;
            let cleared = m.steps.reset_completion(scope);
            println!("Cleared {} completion flags", cleared);
            Ok(())
        })?,
        Commands::Evaluate {
            mission,
            snapshot,
            save,
            paths,
        } => {
            let (mut mission, location) = session.load(&mission)?;
            let snapshot = VehicleSnapshot::load(&snapshot)?;
            let ctx = EvalContext::from_snapshot(&snapshot);
            if ctx.stages.is_empty() {
                tracing::debug!("Snapshot has no stage figures, engine delta-v and TWR read as zero");
            } else {
                tracing::debug!(stages = ctx.stages.len(), "Loaded stage figures");
            }
            let report = aggregate_all(&mut mission.steps, &ctx);
            tracing::info!(
                completed = report.completed,
                total = report.total,
                "Evaluated mission '{}'",
                mission.name
            );

            let annotate = |id: NodeId| {
                let record = mission.steps.record(id)?;
                let verdict = if evaluate(record, &ctx) { "pass" } else { "fail" };
                Some(match live_value(record.criterion(), &ctx) {
                    Some(value) => format!("[{} {} {:.1}]", verdict, record.kind(), value),
                    None => format!("[{} {}]", verdict, record.kind()),
                })
            };
            let options = RenderOptions {
                show_paths: paths,
                show_all: true,
                annotate: Some(&annotate),
            };
            print_header(&mission);
            print!("{}", render_tree(&mission.steps, &options));
            println!(
                "{}/{} steps complete, {}/{} top-level steps satisfied",
                report.completed,
                report.total,
                report.roots_satisfied,
                mission.steps.roots().len()
            );

            if save {
                let path = session.persist(&mut mission, &location)?;
                println!("Saved {}", path.display());
            }
        }
        Commands::Kinds => {
            for kind in CriterionKind::ALL {
                let scope = match kind.scope() {
                    KindScope::Anywhere => "",
                    KindScope::FlightOnly => " (flight only)",
                    KindScope::EditorOnly => " (editor only)",
                };
                println!("{:<18} {}{}", kind.as_str(), kind.describe(), scope);
            }
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Print the settings file, writing it first when any field is given.
/// Environment overrides are not written back.
fn configure(
    scope: Option<String>,
    missions_dir: Option<PathBuf>,
    on_collision: Option<Collision>,
) -> Result<()> {
    let mut settings = Settings::try_load()?;
    let changed = scope.is_some() || missions_dir.is_some() || on_collision.is_some();
    if let Some(scope) = scope {
        settings.scope = scope;
    }
    if let Some(dir) = missions_dir {
        settings.missions_dir = Some(dir);
    }
    if let Some(collision) = on_collision {
        settings.on_collision = collision.into();
    }
    if changed {
        settings.save()?;
        tracing::info!("Saved settings");
    }

    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

/// Where a loaded mission came from, and so where it is written back.
enum Location {
    Named,
    File(PathBuf),
}

struct Session {
    store: MissionStore,
    scope: String,
    on_collision: SaveMode,
}

impl Session {
    fn open(scope: Option<String>, dir: Option<PathBuf>) -> Result<Self> {
        let settings = Settings::load();
        let dir = match dir {
            Some(dir) => dir,
            None => settings.missions_dir()?,
        };
        let store = MissionStore::open(&dir)
            .with_context(|| format!("Failed to open missions directory {}", dir.display()))?;
        tracing::debug!(dir = %dir.display(), "Opened mission store");
        Ok(Self {
            store,
            scope: scope.unwrap_or(settings.scope),
            on_collision: settings.on_collision,
        })
    }

    /// Load a mission by name in the current scope, or from a file path.
    fn load(&self, arg: &str) -> Result<(Mission, Location)> {
        let path = Path::new(arg);
        let is_file = path.extension().is_some_and(|e| e == MISSION_EXTENSION)
            || arg.contains(std::path::MAIN_SEPARATOR);
        if is_file && path.exists() {
            let mission = self
                .store
                .load(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            return Ok((mission, Location::File(path.to_path_buf())));
        }

        let mission = self
            .store
            .load_named(&self.scope, arg)
            .with_context(|| format!("Failed to load mission '{}' in scope '{}'", arg, self.scope))?;
        Ok((mission, Location::Named))
    }

    fn persist(&self, mission: &mut Mission, location: &Location) -> Result<PathBuf> {
        match location {
            Location::Named => self
                .store
                .save(&self.scope, mission, SaveMode::Overwrite)
                .context("Failed to save mission"),
            Location::File(path) => {
                self.store
                    .save_to_path(path, mission)
                    .with_context(|| format!("Failed to save {}", path.display()))?;
                Ok(path.clone())
            }
        }
    }

    /// Load, change, save and print a mission.
    fn edit<F>(&self, arg: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut Mission) -> Result<()>,
    {
        let (mut mission, location) = self.load(arg)?;
        change(&mut mission)?;
        self.persist(&mut mission, &location)?;

        let options = RenderOptions {
            show_paths: true,
            ..RenderOptions::default()
        };
        print!("{}", render_tree(&mission.steps, &options));
        Ok(())
    }
}

fn print_header(mission: &Mission) {
    println!("{}", mission.name);
    if !mission.summary.is_empty() {
        println!("{}", mission.summary);
    }
    println!();
}

fn resolve_step(mission: &Mission, path: &str) -> Result<NodeId> {
    mission
        .steps
        .resolve_path(path)
        .ok_or_else(|| anyhow!("No step at path '{}'", path))
}

/// 1-based position to insertion index; `None` appends.
fn to_index(position: Option<usize>) -> usize {
    position.map_or(usize::MAX, |p| p.saturating_sub(1))
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!("Expected true or false, got '{}'", value),
    }
}

/// Switch kind (restoring stashed values) and apply parameters and list entries.
fn apply_criterion(record: &mut StepRecord, args: &CriterionArgs) -> Result<()> {
    if args.kind.is_none()
        && args.params.is_empty()
        && args.resources.is_empty()
        && args.transfers.is_empty()
    {
        return Ok(());
    }
    if record.locked {
        bail!("Step '{}' is locked; unlock it to change its criterion", record.title);
    }

    if let Some(name) = &args.kind {
        let kind = CriterionKind::from_str(name)
            .ok_or_else(|| anyhow!("Unknown criterion kind '{}' (see `mcheck kinds`)", name))?;
        record.set_kind(kind);
    }

    let params = args
        .params
        .iter()
        .map(|p| parse_param(p))
        .collect::<Result<Vec<_>>>()?;
    let mut criterion = codec::apply_params(record.criterion(), record.kind(), &params);

    if !args.resources.is_empty() {
        let kind = criterion.kind();
        let list = criterion
            .resource_list_mut()
            .ok_or_else(|| anyhow!("Criterion kind '{}' has no resource list", kind))?;
        for raw in &args.resources {
            list.push(parse_resource(raw)?);
        }
    }

    if !args.transfers.is_empty() {
        let Criterion::ResourceTransfer { transfers } = &mut criterion else {
            bail!("--transfer only applies to resource_transfer criteria");
        };
        for raw in &args.transfers {
            transfers.push(parse_transfer(raw)?);
        }
    }

    record.set_criterion(criterion);
    Ok(())
}

fn parse_param(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{}'", raw))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

fn parse_resource(raw: &str) -> Result<ResourceEntry> {
    let fields: Vec<&str> = raw.split(':').map(str::trim).collect();
    let (name, amount, capacity) = match fields.as_slice() {
        [name, amount] => (*name, *amount, "0"),
        [name, amount, capacity] => (*name, *amount, *capacity),
        _ => bail!("Expected NAME:AMOUNT[:CAPACITY], got '{}'", raw),
    };
    Ok(ResourceEntry::new(
        name,
        parse_number(amount, raw)?,
        parse_number(capacity, raw)?,
    ))
}

fn parse_transfer(raw: &str) -> Result<TransferEntry> {
    let fields: Vec<&str> = raw.split(':').map(str::trim).collect();
    let [name, direction, starting, ending] = fields.as_slice() else {
        bail!("Expected NAME:in|out:STARTING:ENDING, got '{}'", raw);
    };
    Ok(TransferEntry {
        resource: name.to_string(),
        direction: TransferDirection::from_str(direction)
            .ok_or_else(|| anyhow!("Transfer direction must be 'in' or 'out', got '{}'", direction))?,
        starting: parse_number(starting, raw)?,
        ending: parse_number(ending, raw)?,
    })
}

fn parse_number(value: &str, raw: &str) -> Result<f64> {
    value
        .parse()
        .with_context(|| format!("Invalid number '{}' in '{}'", value, raw))
}
