//! Interfaces to the vehicle being checked.
//!
//! The evaluator never computes telemetry itself. It reads a [`VehicleContext`]
//! (parts, resources, crew, orbit) and one provider per subsystem, each reporting
//! an aggregate figure. [`Telemetry`] is the union of all of them, and
//! [`EvalContext`] bundles one telemetry source with the per-scene data the
//! evaluator needs for a pass.

mod snapshot;

pub use snapshot::*;

use serde::{Deserialize, Serialize};

use crate::models::{type_key, Propellant};

/// Whether the vehicle is flying or being built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scene {
    #[default]
    Flight,
    Editor,
}

/// A part as seen by presence checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartInfo {
    pub name: String,
    #[serde(default)]
    pub modules: Vec<String>,
}

/// Amount and capacity of one resource across the vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLevel {
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub capacity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrewMember {
    pub name: String,
    #[serde(rename = "trait")]
    pub trait_name: String,
}

/// Keplerian elements of the current orbit. Distances in metres, angles in degrees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    pub body: String,
    pub body_radius: f64,
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    #[serde(default)]
    pub inclination: f64,
}

impl OrbitalElements {
    pub fn apoapsis_altitude(&self) -> f64 {
        self.semi_major_axis * (1.0 + self.eccentricity) - self.body_radius
    }

    pub fn periapsis_altitude(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity) - self.body_radius
    }
}

/// An aggregate figure reported by a subsystem provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    #[serde(default)]
    pub total: f64,
    /// How many parts contributed to `total`.
    #[serde(default)]
    pub contributors: u32,
}

impl Capability {
    pub fn new(total: f64, contributors: u32) -> Self {
        Self {
            total,
            contributors,
        }
    }
}

/// Reaction wheel torque per axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Torque {
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub yaw: f64,
    #[serde(default)]
    pub roll: f64,
}

/// Separation hardware activated in one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageHardware {
    #[serde(default)]
    pub separators: u32,
    #[serde(default)]
    pub docking_ports: u32,
}

/// An engine or RCS thruster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropulsionPart {
    /// Engine type (e.g. `LiquidFuel`, `SolidBooster`) or RCS type.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub propellants: Vec<Propellant>,
}

impl PropulsionPart {
    pub fn type_key(&self) -> String {
        type_key(&self.type_name, &self.propellants)
    }
}

/// Delta-v and thrust-to-weight figures of one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageStats {
    #[serde(default)]
    pub delta_v_vacuum: f64,
    #[serde(default)]
    pub delta_v_sea_level: f64,
    #[serde(default)]
    pub twr_vacuum: f64,
    #[serde(default)]
    pub twr_sea_level: f64,
}

/// The vehicle currently being checked.
pub trait VehicleContext {
    fn vessel_id(&self) -> &str;
    fn scene(&self) -> Scene;
    fn parts(&self) -> &[PartInfo];
    /// Aggregate amount and capacity; unknown resources are zero.
    fn resource(&self, name: &str) -> ResourceLevel;
    fn crew(&self) -> &[CrewMember];
    fn crew_capacity(&self) -> u32;
    /// Index of the next stage to fire.
    fn current_stage(&self) -> u32;
    fn orbit(&self) -> Option<&OrbitalElements>;
    fn flags_planted(&self) -> u32;
}

pub trait PowerProvider {
    fn storage(&self) -> Capability;
    fn solar(&self) -> Capability;
    fn generators(&self) -> Capability;
    fn fuel_cells(&self) -> Capability;
}

pub trait CommsProvider {
    fn antennas(&self) -> Capability;
    fn control_sources(&self) -> Capability;
}

pub trait UtilityProvider {
    fn lights(&self) -> Capability;
    fn parachutes(&self) -> Capability;
    fn drills(&self) -> Capability;
    fn docking_ports(&self) -> Capability;
    fn radiators(&self) -> Capability;
}

pub trait StagingProvider {
    fn stage_hardware(&self, stage: u32) -> StageHardware;
}

pub trait GuidanceProvider {
    fn torque(&self) -> Torque;
    /// Highest SAS level available, `None` without any SAS source.
    fn sas_level(&self) -> Option<u32>;
}

pub trait PropulsionProvider {
    fn engines(&self) -> &[PropulsionPart];
    fn rcs_thrusters(&self) -> &[PropulsionPart];
    /// Per-stage figures, indexed by stage number.
    fn stage_stats(&self) -> Vec<StageStats>;
}

pub trait VisitHistoryProvider {
    fn has_visited_body(&self, vessel: &str, body: &str) -> bool;
    /// Landed on `body`, in `biome` when given.
    fn has_landed(&self, vessel: &str, body: &str, biome: Option<&str>) -> bool;
    fn has_visited_asteroid(&self, vessel: &str, asteroid: &str) -> bool;
    fn has_visited_vessel(&self, vessel: &str, target: &str) -> bool;
}

/// The part organizer used by the editor's category filter.
pub trait CategoryOrganizer {
    fn is_in_category(&self, part: &str, category: &str) -> bool;
}

/// Everything the evaluator reads about a vehicle.
pub trait Telemetry:
    VehicleContext
    + PowerProvider
    + CommsProvider
    + UtilityProvider
    + StagingProvider
    + GuidanceProvider
    + PropulsionProvider
    + VisitHistoryProvider
{
}

impl<T> Telemetry for T where
    T: VehicleContext
        + PowerProvider
        + CommsProvider
        + UtilityProvider
        + StagingProvider
        + GuidanceProvider
        + PropulsionProvider
        + VisitHistoryProvider
{
}

/// Stage figures gathered once per context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageTable {
    stages: Vec<StageStats>,
}

impl StageTable {
    pub fn new(stages: Vec<StageStats>) -> Self {
        Self { stages }
    }

    pub fn build<P: PropulsionProvider + ?Sized>(propulsion: &P) -> Self {
        Self::new(propulsion.stage_stats())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Figures for `stage`, clamped to the last stage. `None` without stages.
    pub fn resolve(&self, stage: u32) -> Option<&StageStats> {
        let last = self.stages.len().checked_sub(1)?;
        let index = usize::try_from(stage).unwrap_or(usize::MAX).min(last);
        self.stages.get(index)
    }
}

/// What one evaluation pass reads.
///
/// Build a new context whenever the vehicle or scene changes; nothing in it is
/// refreshed behind the caller's back.
pub struct EvalContext<'a> {
    pub telemetry: &'a dyn Telemetry,
    /// `None` when the organizer subsystem is not installed.
    pub organizer: Option<&'a dyn CategoryOrganizer>,
    pub stages: StageTable,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        telemetry: &'a dyn Telemetry,
        organizer: Option<&'a dyn CategoryOrganizer>,
    ) -> Self {
        let stages = StageTable::build(telemetry);
        Self {
            telemetry,
            organizer,
            stages,
        }
    }

    pub fn from_snapshot(snapshot: &'a VehicleSnapshot) -> Self {
        Self::new(snapshot, snapshot.organizer())
    }

    pub fn scene(&self) -> Scene {
        self.telemetry.scene()
    }
}
