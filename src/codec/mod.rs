//! Mission <-> [`ConfigNode`] mapping.
//!
//! Decoding never fails. Every field has a default that applies when the stored
//! value is missing or does not parse, so files written by older versions, or
//! edited by hand, still load.

mod node;

pub use node::ConfigNode;

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::models::{
    AggregationMode, Criterion, CriterionKind, EngineCriterion, Mission, NodeId, RcsCriterion,
    ResourceEntry, ResourceListKind, StepRecord, StepTree, TransferDirection, TransferEntry,
};

pub const MISSION_NODE: &str = "MISSION";
pub const STEPS_NODE: &str = "STEPS";
pub const STEP_NODE: &str = "STEP";
pub const CRITERION_NODE: &str = "CRITERION";
pub const STASHED_NODE: &str = "STASHED";
pub const RESOURCE_NODE: &str = "RESOURCE";
pub const TRANSFER_NODE: &str = "TRANSFER";

// ============================================================
// Mission
// ============================================================

pub fn mission_to_node(mission: &Mission) -> ConfigNode {
    let mut root = ConfigNode::new(MISSION_NODE);
    root.add_value("name", &mission.name);
    root.add_value("summary", &mission.summary);
    if let Some(saved_at) = mission.saved_at {
        root.add_value("saved", saved_at.to_rfc3339());
    }

    let mut steps = ConfigNode::new(STEPS_NODE);
    for &id in mission.steps.roots() {
        if let Some(step) = step_to_node(&mission.steps, id) {
            steps.add_node(step);
        }
    }
    root.add_node(steps);
    root
}

/// Decode a `MISSION` block. Missing parts decode to an empty mission.
pub fn mission_from_node(node: &ConfigNode) -> Mission {
    let mut mission = Mission {
        name: node.value("name").unwrap_or_default().to_string(),
        summary: node.value("summary").unwrap_or_default().to_string(),
        saved_at: node.value("saved").and_then(parse_timestamp),
        steps: StepTree::new(),
    };
    if let Some(steps) = node.node(STEPS_NODE) {
        for step in steps.nodes_named(STEP_NODE) {
            step_from_node(step, &mut mission.steps, None);
        }
    }
    mission
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

// ============================================================
// Steps
// ============================================================

/// Encode a node and its subtree as a `STEP` block.
pub fn step_to_node(tree: &StepTree, id: NodeId) -> Option<ConfigNode> {
    let step = tree.get(id)?;
    let mut node = ConfigNode::new(STEP_NODE);
    node.add_value("title", &step.record.title);
    node.add_value("expanded", step.expanded);
    node.add_value("mode", step.mode.as_str());
    node.add_node(record_to_node(&step.record));
    for &child in step.children() {
        if let Some(child_node) = step_to_node(tree, child) {
            node.add_node(child_node);
        }
    }
    Some(node)
}

/// Decode a `STEP` block and its children into `tree` under `parent`.
pub fn step_from_node(
    node: &ConfigNode,
    tree: &mut StepTree,
    parent: Option<NodeId>,
) -> Option<NodeId> {
    let mut record = node
        .node(CRITERION_NODE)
        .map(record_from_node)
        .unwrap_or_default();
    if record.title.is_empty() {
        // Older files only carried the cached title.
        record.title = node.value("title").unwrap_or_default().to_string();
    }

    let id = tree.insert(parent, usize::MAX, record)?;
    if let Some(step) = tree.get_mut(id) {
        apply_structure(node, &mut step.mode, &mut step.expanded);
    }
    for child in node.nodes_named(STEP_NODE) {
        step_from_node(child, tree, Some(id));
    }
    Some(id)
}

/// Read the structural flags, keeping the current values when absent or bad.
pub fn apply_structure(node: &ConfigNode, mode: &mut AggregationMode, expanded: &mut bool) {
    if let Some(parsed) = node.value("mode").and_then(AggregationMode::from_str) {
        *mode = parsed;
    }
    if let Some(parsed) = node.value("expanded").and_then(parse_bool) {
        *expanded = parsed;
    }
}

// ============================================================
// Records and criteria
// ============================================================

pub fn record_to_node(record: &StepRecord) -> ConfigNode {
    let mut node = ConfigNode::new(CRITERION_NODE);
    node.add_value("title", &record.title)
        .add_value("description", &record.description)
        .add_value("completed", record.completed)
        .add_value("locked", record.locked)
        .add_value("active", record.active);
    write_criterion(&mut node, record.criterion());
    for stashed in record.stashed() {
        node.add_node(criterion_to_node(STASHED_NODE, stashed));
    }
    node
}

pub fn record_from_node(node: &ConfigNode) -> StepRecord {
    let defaults = StepRecord::default();
    let fields = Fields(node);
    let mut record = StepRecord::new(
        fields.string("title", &defaults.title),
        criterion_from_node(node),
    );
    record.description = fields.string("description", &defaults.description);
    record.completed = fields.bool("completed", defaults.completed);
    record.active = fields.bool("active", defaults.active);
    record.locked = fields.bool("locked", defaults.locked);
    for stashed in node.nodes_named(STASHED_NODE) {
        record.restore_stashed(criterion_from_node(stashed));
    }
    record
}

/// Encode a criterion's kind, scalar parameters and lists as a block.
pub fn criterion_to_node(name: &str, criterion: &Criterion) -> ConfigNode {
    let mut node = ConfigNode::new(name);
    write_criterion(&mut node, criterion);
    node
}

fn write_criterion(node: &mut ConfigNode, criterion: &Criterion) {
    node.add_value("kind", criterion.kind().as_str());
    match criterion {
        Criterion::Unconditional => {}
        Criterion::Batteries { min_capacity } => {
            node.add_value("min_capacity", min_capacity);
        }
        Criterion::Communication { min_power } => {
            node.add_value("min_power", min_power);
        }
        Criterion::ControlSource { min_count }
        | Criterion::DockingPorts { min_count }
        | Criterion::Drills { min_count }
        | Criterion::Lights { min_count }
        | Criterion::Parachutes { min_count }
        | Criterion::CrewCount { min_count }
        | Criterion::Flags { min_count } => {
            node.add_value("min_count", min_count);
        }
        Criterion::Engines(engine) => {
            node.add_value("type_key", &engine.type_key)
                .add_value("stage", engine.stage)
                .add_value("min_delta_v", engine.min_delta_v)
                .add_value("min_twr", engine.min_twr)
                .add_value("vacuum", engine.vacuum);
        }
        Criterion::FuelCells { min_rate }
        | Criterion::Generators { min_rate }
        | Criterion::SolarPanels { min_rate }
        | Criterion::ChargeRate { min_rate } => {
            node.add_value("min_rate", min_rate);
        }
        Criterion::Radiators { min_cooling } => {
            node.add_value("min_cooling", min_cooling);
        }
        Criterion::ReactionWheels {
            min_pitch,
            min_yaw,
            min_roll,
        } => {
            node.add_value("min_pitch", min_pitch)
                .add_value("min_yaw", min_yaw)
                .add_value("min_roll", min_roll);
        }
        Criterion::Rcs(rcs) => {
            node.add_value("type_key", &rcs.type_key);
        }
        Criterion::Part { part } => {
            node.add_value("part", part);
        }
        Criterion::Module { module } => {
            node.add_value("module", module);
        }
        Criterion::Resources { .. } => {}
        Criterion::CrewTrait { trait_name } => {
            node.add_value("trait", trait_name);
        }
        Criterion::Staging {
            stage,
            allow_docking_port,
        } => {
            node.add_value("stage", stage)
                .add_value("allow_docking_port", allow_docking_port);
        }
        Criterion::Orbit {
            apoapsis,
            periapsis,
            tolerance,
        } => {
            node.add_value("apoapsis", apoapsis)
                .add_value("periapsis", periapsis)
                .add_value("tolerance", tolerance);
        }
        Criterion::Inclination { min, max } => {
            node.add_value("min_inclination", min)
                .add_value("max_inclination", max);
        }
        Criterion::ResourceTransfer { transfers } => {
            for transfer in transfers {
                let mut entry = ConfigNode::new(TRANSFER_NODE);
                entry
                    .add_value("resource", &transfer.resource)
                    .add_value("direction", transfer.direction.as_str())
                    .add_value("starting", transfer.starting)
                    .add_value("ending", transfer.ending);
                node.add_node(entry);
            }
        }
        Criterion::VisitBody {
            body,
            landed,
            biome,
        } => {
            node.add_value("body", body)
                .add_value("landed", landed)
                .add_value("biome", biome);
        }
        Criterion::VisitAsteroid { asteroid } => {
            node.add_value("asteroid", asteroid);
        }
        Criterion::VisitVessel { vessel } => {
            node.add_value("vessel", vessel);
        }
        Criterion::SasLevel { min_level } => {
            node.add_value("min_level", min_level);
        }
        Criterion::VabCategory { category } => {
            node.add_value("category", category);
        }
    }

    if let Some((list, entries)) = criterion.resource_list() {
        for entry in entries {
            let mut block = ConfigNode::new(RESOURCE_NODE);
            block
                .add_value("type", list.as_str())
                .add_value("resource", &entry.resource)
                .add_value("amount", entry.amount)
                .add_value("capacity", entry.capacity)
                .add_value("locked", entry.locked);
            node.add_node(block);
        }
    }
}

/// Decode a criterion block. Unknown kinds decode to `Unconditional`; missing or
/// unparsable parameters take the kind's defaults.
pub fn criterion_from_node(node: &ConfigNode) -> Criterion {
    let kind = node
        .value("kind")
        .and_then(CriterionKind::from_str)
        .unwrap_or_default();
    let f = Fields(node);
    let resources = |list: ResourceListKind| -> Vec<ResourceEntry> {
        node.nodes_named(RESOURCE_NODE)
            .filter(|n| {
                n.value("type")
                    .and_then(ResourceListKind::from_str)
                    .unwrap_or(ResourceListKind::Resource)
                    == list
            })
            .map(resource_from_node)
            .collect()
    };

    match Criterion::default_for(kind) {
        Criterion::Unconditional => Criterion::Unconditional,
        Criterion::Batteries { min_capacity } => Criterion::Batteries {
            min_capacity: f.f64("min_capacity", min_capacity),
        },
        Criterion::Communication { min_power } => Criterion::Communication {
            min_power: f.f64("min_power", min_power),
        },
        Criterion::ControlSource { min_count } => Criterion::ControlSource {
            min_count: f.u32("min_count", min_count),
        },
        Criterion::DockingPorts { min_count } => Criterion::DockingPorts {
            min_count: f.u32("min_count", min_count),
        },
        Criterion::Drills { min_count } => Criterion::Drills {
            min_count: f.u32("min_count", min_count),
        },
        Criterion::Engines(d) => Criterion::Engines(EngineCriterion {
            type_key: f.string("type_key", &d.type_key),
            resources: resources(ResourceListKind::Engine),
            stage: f.u32("stage", d.stage),
            min_delta_v: f.f64("min_delta_v", d.min_delta_v),
            min_twr: f.f64("min_twr", d.min_twr),
            vacuum: f.bool("vacuum", d.vacuum),
        }),
        Criterion::FuelCells { min_rate } => Criterion::FuelCells {
            min_rate: f.f64("min_rate", min_rate),
        },
        Criterion::Generators { min_rate } => Criterion::Generators {
            min_rate: f.f64("min_rate", min_rate),
        },
        Criterion::Lights { min_count } => Criterion::Lights {
            min_count: f.u32("min_count", min_count),
        },
        Criterion::Parachutes { min_count } => Criterion::Parachutes {
            min_count: f.u32("min_count", min_count),
        },
        Criterion::Radiators { min_cooling } => Criterion::Radiators {
            min_cooling: f.f64("min_cooling", min_cooling),
        },
        Criterion::ReactionWheels {
            min_pitch,
            min_yaw,
            min_roll,
        } => Criterion::ReactionWheels {
            min_pitch: f.f64("min_pitch", min_pitch),
            min_yaw: f.f64("min_yaw", min_yaw),
            min_roll: f.f64("min_roll", min_roll),
        },
        Criterion::Rcs(d) => Criterion::Rcs(RcsCriterion {
            type_key: f.string("type_key", &d.type_key),
            resources: resources(ResourceListKind::Rcs),
        }),
        Criterion::SolarPanels { min_rate } => Criterion::SolarPanels {
            min_rate: f.f64("min_rate", min_rate),
        },
        Criterion::Part { part } => Criterion::Part {
            part: f.string("part", &part),
        },
        Criterion::Module { module } => Criterion::Module {
            module: f.string("module", &module),
        },
        Criterion::Resources { .. } => Criterion::Resources {
            entries: resources(ResourceListKind::Resource),
        },
        Criterion::CrewTrait { trait_name } => Criterion::CrewTrait {
            trait_name: f.string("trait", &trait_name),
        },
        Criterion::CrewCount { min_count } => Criterion::CrewCount {
            min_count: f.u32("min_count", min_count),
        },
        Criterion::Staging {
            stage,
            allow_docking_port,
        } => Criterion::Staging {
            stage: f.u32("stage", stage),
            allow_docking_port: f.bool("allow_docking_port", allow_docking_port),
        },
        Criterion::Orbit {
            apoapsis,
            periapsis,
            tolerance,
        } => Criterion::Orbit {
            apoapsis: f.f64("apoapsis", apoapsis),
            periapsis: f.f64("periapsis", periapsis),
            tolerance: f.f64("tolerance", tolerance),
        },
        Criterion::Inclination { min, max } => Criterion::Inclination {
            min: f.f64("min_inclination", min),
            max: f.f64("max_inclination", max),
        },
        Criterion::ResourceTransfer { .. } => Criterion::ResourceTransfer {
            transfers: node
                .nodes_named(TRANSFER_NODE)
                .map(transfer_from_node)
                .collect(),
        },
        Criterion::VisitBody {
            body,
            landed,
            biome,
        } => Criterion::VisitBody {
            body: f.string("body", &body),
            landed: f.bool("landed", landed),
            biome: f.string("biome", &biome),
        },
        Criterion::VisitAsteroid { asteroid } => Criterion::VisitAsteroid {
            asteroid: f.string("asteroid", &asteroid),
        },
        Criterion::VisitVessel { vessel } => Criterion::VisitVessel {
            vessel: f.string("vessel", &vessel),
        },
        Criterion::SasLevel { min_level } => Criterion::SasLevel {
            min_level: f.u32("min_level", min_level),
        },
        Criterion::VabCategory { category } => Criterion::VabCategory {
            category: f.string("category", &category),
        },
        Criterion::ChargeRate { min_rate } => Criterion::ChargeRate {
            min_rate: f.f64("min_rate", min_rate),
        },
        Criterion::Flags { min_count } => Criterion::Flags {
            min_count: f.u32("min_count", min_count),
        },
    }
}

fn resource_from_node(node: &ConfigNode) -> ResourceEntry {
    let f = Fields(node);
    ResourceEntry {
        resource: f.string("resource", ""),
        amount: f.f64("amount", 0.0),
        capacity: f.f64("capacity", 0.0),
        locked: f.bool("locked", false),
    }
}

fn transfer_from_node(node: &ConfigNode) -> TransferEntry {
    let f = Fields(node);
    TransferEntry {
        resource: f.string("resource", ""),
        direction: node
            .value("direction")
            .and_then(TransferDirection::from_str)
            .unwrap_or_default(),
        // Files without a starting amount carried it as `baseline`.
        starting: f.f64("starting", f.f64("baseline", 0.0)),
        ending: f.f64("ending", 0.0),
    }
}

/// Re-decode `criterion` as `kind` with `params` overriding its stored values.
///
/// Parameters go through the same parsing as stored files, so a bad value falls
/// back to the current (or default) one rather than failing.
pub fn apply_params(
    criterion: &Criterion,
    kind: CriterionKind,
    params: &[(String, String)],
) -> Criterion {
    let mut node = if criterion.kind() == kind {
        criterion_to_node(CRITERION_NODE, criterion)
    } else {
        criterion_to_node(CRITERION_NODE, &Criterion::default_for(kind))
    };
    for (key, value) in params {
        node.set_value(key, value);
    }
    criterion_from_node(&node)
}

/// Typed reads with fallbacks.
struct Fields<'a>(&'a ConfigNode);

impl Fields<'_> {
    fn string(&self, key: &str, default: &str) -> String {
        self.0.value(key).unwrap_or(default).to_string()
    }

    fn f64(&self, key: &str, default: f64) -> f64 {
        self.parsed(key).unwrap_or(default)
    }

    fn u32(&self, key: &str, default: u32) -> u32 {
        self.parsed(key).unwrap_or(default)
    }

    fn bool(&self, key: &str, default: bool) -> bool {
        self.0.value(key).and_then(parse_bool).unwrap_or(default)
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.0.value(key).and_then(|v| v.trim().parse().ok())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
