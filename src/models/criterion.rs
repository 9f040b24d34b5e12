use serde::{Deserialize, Serialize};

use crate::telemetry::Scene;

/// The kind of condition a step checks.
///
/// Every [`Criterion`] variant has exactly one kind. The text tag returned by
/// [`CriterionKind::as_str`] is what the mission file stores; unknown tags decode
/// to [`CriterionKind::Unconditional`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    #[default]
    Unconditional,
    Batteries,
    Communication,
    ControlSource,
    DockingPorts,
    Drills,
    Engines,
    FuelCells,
    Generators,
    Lights,
    Parachutes,
    Radiators,
    ReactionWheels,
    Rcs,
    SolarPanels,
    Part,
    Module,
    Resources,
    CrewTrait,
    CrewCount,
    Staging,
    Orbit,
    Inclination,
    ResourceTransfer,
    VisitBody,
    VisitAsteroid,
    VisitVessel,
    SasLevel,
    VabCategory,
    ChargeRate,
    Flags,
}

/// Where a criterion is meaningful. Outside its scope a criterion passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindScope {
    Anywhere,
    FlightOnly,
    EditorOnly,
}

impl CriterionKind {
    pub const ALL: [CriterionKind; 31] = [
        Self::Unconditional,
        Self::Batteries,
        Self::Communication,
        Self::ControlSource,
        Self::DockingPorts,
        Self::Drills,
        Self::Engines,
        Self::FuelCells,
        Self::Generators,
        Self::Lights,
        Self::Parachutes,
        Self::Radiators,
        Self::ReactionWheels,
        Self::Rcs,
        Self::SolarPanels,
        Self::Part,
        Self::Module,
        Self::Resources,
        Self::CrewTrait,
        Self::CrewCount,
        Self::Staging,
        Self::Orbit,
        Self::Inclination,
        Self::ResourceTransfer,
        Self::VisitBody,
        Self::VisitAsteroid,
        Self::VisitVessel,
        Self::SasLevel,
        Self::VabCategory,
        Self::ChargeRate,
        Self::Flags,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconditional => "unconditional",
            Self::Batteries => "batteries",
            Self::Communication => "communication",
            Self::ControlSource => "control_source",
            Self::DockingPorts => "docking_ports",
            Self::Drills => "drills",
            Self::Engines => "engines",
            Self::FuelCells => "fuel_cells",
            Self::Generators => "generators",
            Self::Lights => "lights",
            Self::Parachutes => "parachutes",
            Self::Radiators => "radiators",
            Self::ReactionWheels => "reaction_wheels",
            Self::Rcs => "rcs",
            Self::SolarPanels => "solar_panels",
            Self::Part => "part",
            Self::Module => "module",
            Self::Resources => "resources",
            Self::CrewTrait => "crew_trait",
            Self::CrewCount => "crew_count",
            Self::Staging => "staging",
            Self::Orbit => "orbit",
            Self::Inclination => "inclination",
            Self::ResourceTransfer => "resource_transfer",
            Self::VisitBody => "visit_body",
            Self::VisitAsteroid => "visit_asteroid",
            Self::VisitVessel => "visit_vessel",
            Self::SasLevel => "sas_level",
            Self::VabCategory => "vab_category",
            Self::ChargeRate => "charge_rate",
            Self::Flags => "flags",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
    }

    /// One-line description used by `mcheck kinds`.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Unconditional => "always satisfied; useful as a grouping step",
            Self::Batteries => "stored electric charge >= min_capacity",
            Self::Communication => "combined antenna power >= min_power",
            Self::ControlSource => "control sources >= min_count",
            Self::DockingPorts => "docking ports >= min_count",
            Self::Drills => "drills >= min_count",
            Self::Engines => "engine of type_key with propellants, stage delta-v and TWR",
            Self::FuelCells => "fuel cell output >= min_rate",
            Self::Generators => "generator output >= min_rate",
            Self::Lights => "lights >= min_count",
            Self::Parachutes => "parachutes >= min_count",
            Self::Radiators => "radiator cooling >= min_cooling",
            Self::ReactionWheels => "reaction wheel torque per axis (min_pitch/min_yaw/min_roll)",
            Self::Rcs => "RCS thruster of type_key with propellants",
            Self::SolarPanels => "solar output >= min_rate",
            Self::Part => "a part named `part` is installed",
            Self::Module => "a part carries module `module`",
            Self::Resources => "every resource entry meets its amount and capacity",
            Self::CrewTrait => "a crew member has trait `trait`",
            Self::CrewCount => "crew on board (flight) or capacity (editor) >= min_count",
            Self::Staging => "stage `stage` holds a separator (or docking port if allowed)",
            Self::Orbit => "apoapsis and periapsis within tolerance percent of targets",
            Self::Inclination => "inclination between min_inclination and max_inclination",
            Self::ResourceTransfer => "every transfer entry has reached its planned ending amount",
            Self::VisitBody => "body visited, optionally landed in a biome",
            Self::VisitAsteroid => "asteroid `asteroid` visited",
            Self::VisitVessel => "vessel `vessel` visited",
            Self::SasLevel => "SAS capability level >= min_level",
            Self::VabCategory => "a part is filed under organizer category `category`",
            Self::ChargeRate => "solar + generator + fuel cell output >= min_rate",
            Self::Flags => "flags planted >= min_count",
        }
    }

    pub fn scope(&self) -> KindScope {
        match self {
            Self::Orbit
            | Self::Inclination
            | Self::ResourceTransfer
            | Self::VisitBody
            | Self::VisitAsteroid
            | Self::VisitVessel
            | Self::Flags => KindScope::FlightOnly,
            Self::VabCategory => KindScope::EditorOnly,
            _ => KindScope::Anywhere,
        }
    }

    pub fn applies_in(&self, scene: Scene) -> bool {
        match self.scope() {
            KindScope::Anywhere => true,
            KindScope::FlightOnly => scene == Scene::Flight,
            KindScope::EditorOnly => scene == Scene::Editor,
        }
    }
}

impl std::fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the three resource lists an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceListKind {
    Resource,
    Engine,
    Rcs,
}

impl ResourceListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Engine => "engine",
            Self::Rcs => "rcs",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resource" => Some(Self::Resource),
            "engine" => Some(Self::Engine),
            "rcs" => Some(Self::Rcs),
            _ => None,
        }
    }
}

/// A minimum amount and capacity required of one resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceEntry {
    pub resource: String,
    pub amount: f64,
    pub capacity: f64,
    /// Presentation hint: the entry should not be edited.
    pub locked: bool,
}

impl ResourceEntry {
    pub fn new(resource: impl Into<String>, amount: f64, capacity: f64) -> Self {
        Self {
            resource: resource.into(),
            amount,
            capacity,
            locked: false,
        }
    }
}

/// Which side of a transfer the vehicle is on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransferDirection {
    /// The vehicle receives the resource.
    #[default]
    In,
    /// The vehicle gives the resource away.
    Out,
}

impl TransferDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" => Some(Self::In),
            "out" => Some(Self::Out),
            _ => None,
        }
    }
}

/// A planned resource transfer.
///
/// `starting` is the amount on board when the transfer was planned and `ending`
/// the amount planned to be on board once it is done. Inbound transfers end
/// above where they started, outbound ones below.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferEntry {
    pub resource: String,
    pub direction: TransferDirection,
    pub starting: f64,
    pub ending: f64,
}

/// Parameters of an engine check.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCriterion {
    /// Normalized engine type key, see [`type_key`].
    pub type_key: String,
    pub resources: Vec<ResourceEntry>,
    /// Stage whose delta-v and TWR are checked. Clamped to the last stage.
    pub stage: u32,
    pub min_delta_v: f64,
    pub min_twr: f64,
    /// Use vacuum figures instead of sea-level ones.
    pub vacuum: bool,
}

impl Default for EngineCriterion {
    fn default() -> Self {
        Self {
            type_key: String::new(),
            resources: Vec::new(),
            stage: 0,
            min_delta_v: 0.0,
            min_twr: 0.0,
            vacuum: true,
        }
    }
}

/// Parameters of an RCS check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RcsCriterion {
    pub type_key: String,
    pub resources: Vec<ResourceEntry>,
}

/// The condition attached to a step.
///
/// Each variant carries only the parameters its check reads. Defaults for every
/// variant come from [`Criterion::default_for`].
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Unconditional,
    Batteries { min_capacity: f64 },
    Communication { min_power: f64 },
    ControlSource { min_count: u32 },
    DockingPorts { min_count: u32 },
    Drills { min_count: u32 },
    Engines(EngineCriterion),
    FuelCells { min_rate: f64 },
    Generators { min_rate: f64 },
    Lights { min_count: u32 },
    Parachutes { min_count: u32 },
    Radiators { min_cooling: f64 },
    ReactionWheels { min_pitch: f64, min_yaw: f64, min_roll: f64 },
    Rcs(RcsCriterion),
    SolarPanels { min_rate: f64 },
    Part { part: String },
    Module { module: String },
    Resources { entries: Vec<ResourceEntry> },
    CrewTrait { trait_name: String },
    CrewCount { min_count: u32 },
    Staging { stage: u32, allow_docking_port: bool },
    Orbit { apoapsis: f64, periapsis: f64, tolerance: f64 },
    Inclination { min: f64, max: f64 },
    ResourceTransfer { transfers: Vec<TransferEntry> },
    VisitBody { body: String, landed: bool, biome: String },
    VisitAsteroid { asteroid: String },
    VisitVessel { vessel: String },
    SasLevel { min_level: u32 },
    VabCategory { category: String },
    ChargeRate { min_rate: f64 },
    Flags { min_count: u32 },
}

/// Biome value matching any biome of a body.
pub const ANY_BIOME: &str = "any";

impl Default for Criterion {
    fn default() -> Self {
        Self::Unconditional
    }
}

impl Criterion {
    pub fn default_for(kind: CriterionKind) -> Self {
        match kind {
            CriterionKind::Unconditional => Self::Unconditional,
            CriterionKind::Batteries => Self::Batteries { min_capacity: 0.0 },
            CriterionKind::Communication => Self::Communication { min_power: 0.0 },
            CriterionKind::ControlSource => Self::ControlSource { min_count: 1 },
            CriterionKind::DockingPorts => Self::DockingPorts { min_count: 1 },
            CriterionKind::Drills => Self::Drills { min_count: 1 },
            CriterionKind::Engines => Self::Engines(EngineCriterion::default()),
            CriterionKind::FuelCells => Self::FuelCells { min_rate: 0.0 },
            CriterionKind::Generators => Self::Generators { min_rate: 0.0 },
            CriterionKind::Lights => Self::Lights { min_count: 1 },
            CriterionKind::Parachutes => Self::Parachutes { min_count: 1 },
            CriterionKind::Radiators => Self::Radiators { min_cooling: 0.0 },
            CriterionKind::ReactionWheels => Self::ReactionWheels {
                min_pitch: 0.0,
                min_yaw: 0.0,
                min_roll: 0.0,
            },
            CriterionKind::Rcs => Self::Rcs(RcsCriterion::default()),
            CriterionKind::SolarPanels => Self::SolarPanels { min_rate: 0.0 },
            CriterionKind::Part => Self::Part { part: String::new() },
            CriterionKind::Module => Self::Module {
                module: String::new(),
            },
            CriterionKind::Resources => Self::Resources {
                entries: Vec::new(),
            },
            CriterionKind::CrewTrait => Self::CrewTrait {
                trait_name: String::new(),
            },
            CriterionKind::CrewCount => Self::CrewCount { min_count: 1 },
            CriterionKind::Staging => Self::Staging {
                stage: 0,
                allow_docking_port: false,
            },
            CriterionKind::Orbit => Self::Orbit {
                apoapsis: 0.0,
                periapsis: 0.0,
                tolerance: 5.0,
            },
            CriterionKind::Inclination => Self::Inclination { min: 0.0, max: 0.0 },
            CriterionKind::ResourceTransfer => Self::ResourceTransfer {
                transfers: Vec::new(),
            },
            CriterionKind::VisitBody => Self::VisitBody {
                body: String::new(),
                landed: false,
                biome: ANY_BIOME.to_string(),
            },
            CriterionKind::VisitAsteroid => Self::VisitAsteroid {
                asteroid: String::new(),
            },
            CriterionKind::VisitVessel => Self::VisitVessel {
                vessel: String::new(),
            },
            CriterionKind::SasLevel => Self::SasLevel { min_level: 0 },
            CriterionKind::VabCategory => Self::VabCategory {
                category: String::new(),
            },
            CriterionKind::ChargeRate => Self::ChargeRate { min_rate: 0.0 },
            CriterionKind::Flags => Self::Flags { min_count: 1 },
        }
    }

    pub fn kind(&self) -> CriterionKind {
        match self {
            Self::Unconditional => CriterionKind::Unconditional,
            Self::Batteries { .. } => CriterionKind::Batteries,
            Self::Communication { .. } => CriterionKind::Communication,
            Self::ControlSource { .. } => CriterionKind::ControlSource,
            Self::DockingPorts { .. } => CriterionKind::DockingPorts,
            Self::Drills { .. } => CriterionKind::Drills,
            Self::Engines(_) => CriterionKind::Engines,
            Self::FuelCells { .. } => CriterionKind::FuelCells,
            Self::Generators { .. } => CriterionKind::Generators,
            Self::Lights { .. } => CriterionKind::Lights,
            Self::Parachutes { .. } => CriterionKind::Parachutes,
            Self::Radiators { .. } => CriterionKind::Radiators,
            Self::ReactionWheels { .. } => CriterionKind::ReactionWheels,
            Self::Rcs(_) => CriterionKind::Rcs,
            Self::SolarPanels { .. } => CriterionKind::SolarPanels,
            Self::Part { .. } => CriterionKind::Part,
            Self::Module { .. } => CriterionKind::Module,
            Self::Resources { .. } => CriterionKind::Resources,
            Self::CrewTrait { .. } => CriterionKind::CrewTrait,
            Self::CrewCount { .. } => CriterionKind::CrewCount,
            Self::Staging { .. } => CriterionKind::Staging,
            Self::Orbit { .. } => CriterionKind::Orbit,
            Self::Inclination { .. } => CriterionKind::Inclination,
            Self::ResourceTransfer { .. } => CriterionKind::ResourceTransfer,
            Self::VisitBody { .. } => CriterionKind::VisitBody,
            Self::VisitAsteroid { .. } => CriterionKind::VisitAsteroid,
            Self::VisitVessel { .. } => CriterionKind::VisitVessel,
            Self::SasLevel { .. } => CriterionKind::SasLevel,
            Self::VabCategory { .. } => CriterionKind::VabCategory,
            Self::ChargeRate { .. } => CriterionKind::ChargeRate,
            Self::Flags { .. } => CriterionKind::Flags,
        }
    }

    /// The resource list this criterion carries, if any.
    pub fn resource_list(&self) -> Option<(ResourceListKind, &[ResourceEntry])> {
        match self {
            Self::Resources { entries } => Some((ResourceListKind::Resource, entries)),
            Self::Engines(engine) => Some((ResourceListKind::Engine, &engine.resources)),
            Self::Rcs(rcs) => Some((ResourceListKind::Rcs, &rcs.resources)),
            _ => None,
        }
    }

    pub fn resource_list_mut(&mut self) -> Option<&mut Vec<ResourceEntry>> {
        match self {
            Self::Resources { entries } => Some(entries),
            Self::Engines(engine) => Some(&mut engine.resources),
            Self::Rcs(rcs) => Some(&mut rcs.resources),
            _ => None,
        }
    }
}

/// A propellant burned by an engine or RCS thruster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Propellant {
    pub name: String,
    /// Propellants like electric charge that do not define the engine type.
    #[serde(default)]
    pub ignore_for_isp: bool,
}

/// Build the normalized type key of a propulsion part:
/// `<type>:<sorted propellant names joined by '+'>`, skipping ignored propellants.
pub fn type_key(engine_type: &str, propellants: &[Propellant]) -> String {
    let mut names: Vec<&str> = propellants
        .iter()
        .filter(|p| !p.ignore_for_isp)
        .map(|p| p.name.as_str())
        .collect();
    names.sort_unstable();
    names.dedup();
    format!("{}:{}", engine_type, names.join("+"))
}
