use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::*;

/// A recorded vehicle state, loadable from JSON.
///
/// Every field is optional. A snapshot answers all telemetry queries from the
/// figures it holds, which makes it usable both for offline evaluation and as a
/// fixture in tests.
///
/// ```json
/// {
///   "vessel_id": "Kerbal X",
///   "scene": "flight",
///   "parts": [{ "name": "mk1pod", "modules": ["ModuleCommand"] }],
///   "resources": { "LiquidFuel": { "amount": 360, "capacity": 360 } },
///   "power": { "storage": { "total": 150, "contributors": 2 } }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleSnapshot {
    pub vessel_id: String,
    pub scene: Scene,
    pub parts: Vec<PartInfo>,
    pub resources: BTreeMap<String, ResourceLevel>,
    pub crew: Vec<CrewMember>,
    pub crew_capacity: u32,
    pub current_stage: u32,
    pub orbit: Option<OrbitalElements>,
    pub flags_planted: u32,
    pub power: PowerFigures,
    pub comms: CommsFigures,
    pub utility: UtilityFigures,
    /// Separation hardware keyed by stage number.
    pub staging: BTreeMap<u32, StageHardware>,
    pub guidance: GuidanceFigures,
    pub engines: Vec<PropulsionPart>,
    pub rcs: Vec<PropulsionPart>,
    /// Delta-v and TWR per stage, index = stage number.
    pub stages: Vec<StageStats>,
    pub visits: VisitLog,
    /// Organizer categories to part names. Absent when the organizer is not installed.
    pub categories: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerFigures {
    pub storage: Capability,
    pub solar: Capability,
    pub generators: Capability,
    pub fuel_cells: Capability,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommsFigures {
    pub antennas: Capability,
    pub control_sources: Capability,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilityFigures {
    pub lights: Capability,
    pub parachutes: Capability,
    pub drills: Capability,
    pub docking_ports: Capability,
    pub radiators: Capability,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceFigures {
    pub torque: Torque,
    pub sas_level: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Landing {
    pub body: String,
    #[serde(default)]
    pub biome: String,
}

/// Destinations this vessel has reached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitLog {
    pub bodies: Vec<String>,
    pub landings: Vec<Landing>,
    pub asteroids: Vec<String>,
    pub vessels: Vec<String>,
}

impl VehicleSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vehicle snapshot {}", path.display()))?;
        let snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse vehicle snapshot {}", path.display()))?;
        Ok(snapshot)
    }

    pub fn organizer(&self) -> Option<&dyn CategoryOrganizer> {
        self.categories
            .as_ref()
            .map(|_| self as &dyn CategoryOrganizer)
    }
}

impl VehicleContext for VehicleSnapshot {
    fn vessel_id(&self) -> &str {
        &self.vessel_id
    }

    fn scene(&self) -> Scene {
        self.scene
    }

    fn parts(&self) -> &[PartInfo] {
        &self.parts
    }

    fn resource(&self, name: &str) -> ResourceLevel {
        self.resources.get(name).copied().unwrap_or_default()
    }

    fn crew(&self) -> &[CrewMember] {
        &self.crew
    }

    fn crew_capacity(&self) -> u32 {
        self.crew_capacity
    }

    fn current_stage(&self) -> u32 {
        self.current_stage
    }

    fn orbit(&self) -> Option<&OrbitalElements> {
        self.orbit.as_ref()
    }

    fn flags_planted(&self) -> u32 {
        self.flags_planted
    }
}

impl PowerProvider for VehicleSnapshot {
    fn storage(&self) -> Capability {
        self.power.storage
    }

    fn solar(&self) -> Capability {
        self.power.solar
    }

    fn generators(&self) -> Capability {
        self.power.generators
    }

    fn fuel_cells(&self) -> Capability {
        self.power.fuel_cells
    }
}

impl CommsProvider for VehicleSnapshot {
    fn antennas(&self) -> Capability {
        self.comms.antennas
    }

    fn control_sources(&self) -> Capability {
        self.comms.control_sources
    }
}

impl UtilityProvider for VehicleSnapshot {
    fn lights(&self) -> Capability {
        self.utility.lights
    }

    fn parachutes(&self) -> Capability {
        self.utility.parachutes
    }

    fn drills(&self) -> Capability {
        self.utility.drills
    }

    fn docking_ports(&self) -> Capability {
        self.utility.docking_ports
    }

    fn radiators(&self) -> Capability {
        self.utility.radiators
    }
}

impl StagingProvider for VehicleSnapshot {
    fn stage_hardware(&self, stage: u32) -> StageHardware {
        self.staging.get(&stage).copied().unwrap_or_default()
    }
}

impl GuidanceProvider for VehicleSnapshot {
    fn torque(&self) -> Torque {
        self.guidance.torque
    }

    fn sas_level(&self) -> Option<u32> {
        self.guidance.sas_level
    }
}

impl PropulsionProvider for VehicleSnapshot {
    fn engines(&self) -> &[PropulsionPart] {
        &self.engines
    }

    fn rcs_thrusters(&self) -> &[PropulsionPart] {
        &self.rcs
    }

    fn stage_stats(&self) -> Vec<StageStats> {
        self.stages.clone()
    }
}

impl VisitHistoryProvider for VehicleSnapshot {
    fn has_visited_body(&self, vessel: &str, body: &str) -> bool {
        vessel == self.vessel_id && self.visits.bodies.iter().any(|b| b == body)
    }

    fn has_landed(&self, vessel: &str, body: &str, biome: Option<&str>) -> bool {
        vessel == self.vessel_id
            && self
                .visits
                .landings
                .iter()
                .filter(|l| l.body == body)
                .any(|l| biome.map_or(true, |b| l.biome.eq_ignore_ascii_case(b)))
    }

    fn has_visited_asteroid(&self, vessel: &str, asteroid: &str) -> bool {
        vessel == self.vessel_id && self.visits.asteroids.iter().any(|a| a == asteroid)
    }

    fn has_visited_vessel(&self, vessel: &str, target: &str) -> bool {
        vessel == self.vessel_id && self.visits.vessels.iter().any(|v| v == target)
    }
}

impl CategoryOrganizer for VehicleSnapshot {
    fn is_in_category(&self, part: &str, category: &str) -> bool {
        self.categories
            .as_ref()
            .and_then(|c| c.get(category))
            .is_some_and(|parts| parts.iter().any(|p| p == part))
    }
}
