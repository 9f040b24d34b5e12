use crate::models::{
    Criterion, EngineCriterion, RcsCriterion, ResourceEntry, StepRecord, TransferDirection,
    TransferEntry, ANY_BIOME,
};
use crate::telemetry::{EvalContext, PropulsionPart, Scene};

/// Whether a step's criterion holds for the vehicle in `ctx`.
///
/// Never fails: missing telemetry reads as zero and simply does not meet a
/// threshold. Criteria that do not apply to the current scene pass.
pub fn evaluate(record: &StepRecord, ctx: &EvalContext<'_>) -> bool {
    evaluate_criterion(record.criterion(), ctx)
}

pub fn evaluate_criterion(criterion: &Criterion, ctx: &EvalContext<'_>) -> bool {
    let kind = criterion.kind();
    if !kind.applies_in(ctx.scene()) {
        tracing::trace!(kind = %kind, scene = ?ctx.scene(), "Criterion not applicable, passing");
        return true;
    }

    let t = ctx.telemetry;
    let passed = match criterion {
        Criterion::Unconditional => true,
        Criterion::Batteries { min_capacity } => meets(t.storage().total, *min_capacity),
        Criterion::Communication { min_power } => meets(t.antennas().total, *min_power),
        Criterion::ControlSource { min_count } => {
            meets_count(t.control_sources().contributors, *min_count)
        }
        Criterion::DockingPorts { min_count } => {
            meets_count(t.docking_ports().contributors, *min_count)
        }
        Criterion::Drills { min_count } => meets_count(t.drills().contributors, *min_count),
        Criterion::Engines(engine) => engines_pass(engine, ctx),
        Criterion::FuelCells { min_rate } => meets(t.fuel_cells().total, *min_rate),
        Criterion::Generators { min_rate } => meets(t.generators().total, *min_rate),
        Criterion::Lights { min_count } => meets_count(t.lights().contributors, *min_count),
        Criterion::Parachutes { min_count } => {
            meets_count(t.parachutes().contributors, *min_count)
        }
        Criterion::Radiators { min_cooling } => meets(t.radiators().total, *min_cooling),
        Criterion::ReactionWheels {
            min_pitch,
            min_yaw,
            min_roll,
        } => {
            let torque = t.torque();
            meets(torque.pitch, *min_pitch)
                && meets(torque.yaw, *min_yaw)
                && meets(torque.roll, *min_roll)
        }
        Criterion::Rcs(rcs) => rcs_pass(rcs, ctx),
        Criterion::SolarPanels { min_rate } => meets(t.solar().total, *min_rate),
        Criterion::Part { part } => {
            !part.is_empty() && t.parts().iter().any(|p| p.name == *part)
        }
        Criterion::Module { module } => {
            !module.is_empty()
                && t
                    .parts()
                    .iter()
                    .any(|p| p.modules.iter().any(|m| m == module))
        }
        Criterion::Resources { entries } => resources_pass(entries, ctx),
        Criterion::CrewTrait { trait_name } => {
            !trait_name.is_empty() && t.crew().iter().any(|c| c.trait_name == *trait_name)
        }
        Criterion::CrewCount { min_count } => meets_count(crew_figure(ctx), *min_count),
        Criterion::Staging {
            stage,
            allow_docking_port,
        } => {
            let hardware = t.stage_hardware(*stage);
            hardware.separators > 0 || (*allow_docking_port && hardware.docking_ports > 0)
        }
        Criterion::Orbit {
            apoapsis,
            periapsis,
            tolerance,
        } => match t.orbit() {
            Some(orbit) => {
                within_tolerance(orbit.apoapsis_altitude(), *apoapsis, *tolerance)
                    && within_tolerance(orbit.periapsis_altitude(), *periapsis, *tolerance)
            }
            None => false,
        },
        Criterion::Inclination { min, max } => {
            if min > max {
                tracing::warn!(min, max, "Inclination range is inverted, check cannot pass");
                false
            } else {
                t.orbit()
                    .is_some_and(|o| o.inclination >= *min && o.inclination <= *max)
            }
        }
        Criterion::ResourceTransfer { transfers } => transfers_pass(transfers, ctx),
        Criterion::VisitBody {
            body,
            landed,
            biome,
        } => {
            if body.is_empty() {
                false
            } else if *landed {
                let biome = biome.trim();
                let biome = (!biome.is_empty() && !biome.eq_ignore_ascii_case(ANY_BIOME))
                    .then_some(biome);
                t.has_landed(t.vessel_id(), body, biome)
            } else {
                t.has_visited_body(t.vessel_id(), body)
            }
        }
        Criterion::VisitAsteroid { asteroid } => {
            !asteroid.is_empty() && t.has_visited_asteroid(t.vessel_id(), asteroid)
        }
        Criterion::VisitVessel { vessel } => {
            !vessel.is_empty() && t.has_visited_vessel(t.vessel_id(), vessel)
        }
        Criterion::SasLevel { min_level } => {
            *min_level == 0 || t.sas_level().is_some_and(|level| level >= *min_level)
        }
        Criterion::VabCategory { category } => match ctx.organizer {
            None => true,
            Some(organizer) => t
                .parts()
                .iter()
                .any(|p| organizer.is_in_category(&p.name, category)),
        },
        Criterion::ChargeRate { min_rate } => meets(total_charge_rate(ctx), *min_rate),
        Criterion::Flags { min_count } => meets_count(t.flags_planted(), *min_count),
    };

    tracing::trace!(kind = %kind, passed, "Evaluated criterion");
    passed
}

/// The live figure a criterion compares against, for display next to the step.
///
/// `None` for criteria without a single scalar figure.
pub fn live_value(criterion: &Criterion, ctx: &EvalContext<'_>) -> Option<f64> {
    let t = ctx.telemetry;
    let value = match criterion {
        Criterion::Batteries { .. } => t.storage().total,
        Criterion::Communication { .. } => t.antennas().total,
        Criterion::ControlSource { .. } => f64::from(t.control_sources().contributors),
        Criterion::DockingPorts { .. } => f64::from(t.docking_ports().contributors),
        Criterion::Drills { .. } => f64::from(t.drills().contributors),
        Criterion::FuelCells { .. } => t.fuel_cells().total,
        Criterion::Generators { .. } => t.generators().total,
        Criterion::Lights { .. } => f64::from(t.lights().contributors),
        Criterion::Parachutes { .. } => f64::from(t.parachutes().contributors),
        Criterion::Radiators { .. } => t.radiators().total,
        Criterion::SolarPanels { .. } => t.solar().total,
        Criterion::CrewCount { .. } => f64::from(crew_figure(ctx)),
        Criterion::Orbit { .. } => t.orbit()?.apoapsis_altitude(),
        Criterion::Inclination { .. } => t.orbit()?.inclination,
        Criterion::SasLevel { .. } => f64::from(t.sas_level()?),
        Criterion::ChargeRate { .. } => total_charge_rate(ctx),
        Criterion::Flags { .. } => f64::from(t.flags_planted()),
        Criterion::Staging { .. } => f64::from(t.current_stage()),
        Criterion::Engines(engine) => {
            let stats = ctx.stages.resolve(engine.stage)?;
            if engine.vacuum {
                stats.delta_v_vacuum
            } else {
                stats.delta_v_sea_level
            }
        }
        _ => return None,
    };
    Some(value)
}

/// A threshold of zero or below is always met.
fn meets(live: f64, threshold: f64) -> bool {
    threshold <= 0.0 || live >= threshold
}

fn meets_count(live: u32, threshold: u32) -> bool {
    live >= threshold
}

/// Crew on board in flight, crew capacity while building.
fn crew_figure(ctx: &EvalContext<'_>) -> u32 {
    match ctx.scene() {
        Scene::Flight => u32::try_from(ctx.telemetry.crew().len()).unwrap_or(u32::MAX),
        Scene::Editor => ctx.telemetry.crew_capacity(),
    }
}

fn total_charge_rate(ctx: &EvalContext<'_>) -> f64 {
    let t = ctx.telemetry;
    t.solar().total + t.generators().total + t.fuel_cells().total
}

fn resource_passes(entry: &ResourceEntry, ctx: &EvalContext<'_>) -> bool {
    let level = ctx.telemetry.resource(&entry.resource);
    let passed = meets(level.amount, entry.amount) && meets(level.capacity, entry.capacity);
    if !passed {
        tracing::trace!(
            resource = %entry.resource,
            amount = level.amount,
            capacity = level.capacity,
            "Resource entry short"
        );
    }
    passed
}

fn resources_pass(entries: &[ResourceEntry], ctx: &EvalContext<'_>) -> bool {
    entries.iter().all(|entry| resource_passes(entry, ctx))
}

fn has_propulsion(parts: &[PropulsionPart], type_key: &str) -> bool {
    !type_key.is_empty() && parts.iter().any(|p| p.type_key() == type_key)
}

fn engines_pass(engine: &EngineCriterion, ctx: &EvalContext<'_>) -> bool {
    if !resources_pass(&engine.resources, ctx) {
        return false;
    }
    if !has_propulsion(ctx.telemetry.engines(), &engine.type_key) {
        return false;
    }
    let (delta_v, twr) = match ctx.stages.resolve(engine.stage) {
        Some(stats) if engine.vacuum => (stats.delta_v_vacuum, stats.twr_vacuum),
        Some(stats) => (stats.delta_v_sea_level, stats.twr_sea_level),
        None => (0.0, 0.0),
    };
    meets(delta_v, engine.min_delta_v) && meets(twr, engine.min_twr)
}

fn rcs_pass(rcs: &RcsCriterion, ctx: &EvalContext<'_>) -> bool {
    resources_pass(&rcs.resources, ctx) && has_propulsion(ctx.telemetry.rcs_thrusters(), &rcs.type_key)
}

/// Inclusive band of `target * (1 ± tolerance%)`. A zero target needs an exact zero.
fn within_tolerance(live: f64, target: f64, tolerance_pct: f64) -> bool {
    if target == 0.0 {
        return live == 0.0;
    }
    let fraction = (tolerance_pct / 100.0).abs();
    let a = target * (1.0 - fraction);
    let b = target * (1.0 + fraction);
    live >= a.min(b) && live <= a.max(b)
}

/// A transfer passes once the amount has moved off its starting amount in the
/// planned direction and reached the ending amount. A partial transfer fails.
fn transfers_pass(transfers: &[TransferEntry], ctx: &EvalContext<'_>) -> bool {
    transfers.iter().all(|transfer| {
        let live = ctx.telemetry.resource(&transfer.resource).amount;
        let passed = match transfer.direction {
            TransferDirection::In => live > transfer.starting && live >= transfer.ending,
            TransferDirection::Out => transfer.starting > live && live <= transfer.ending,
        };
        if !passed {
            tracing::trace!(
                resource = %transfer.resource,
                live,
                starting = transfer.starting,
                ending = transfer.ending,
                "Transfer not complete"
            );
        }
        passed
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_threshold_always_met() {
        assert!(meets(0.0, 0.0));
        assert!(meets(0.0, -5.0));
        assert!(!meets(0.0, 1.0));
    }

    #[test]
    fn test_tolerance_band_is_symmetric() {
        assert!(within_tolerance(95_000.0, 100_000.0, 5.0));
        assert!(within_tolerance(105_000.0, 100_000.0, 5.0));
        assert!(!within_tolerance(94_999.0, 100_000.0, 5.0));
        assert!(!within_tolerance(105_001.0, 100_000.0, 5.0));
    }

    #[test]
    fn test_zero_target_needs_exact_zero() {
        assert!(within_tolerance(0.0, 0.0, 50.0));
        assert!(!within_tolerance(1.0, 0.0, 50.0));
    }

    #[test]
    fn test_negative_target_band() {
        assert!(within_tolerance(-100.0, -100.0, 10.0));
        assert!(within_tolerance(-95.0, -100.0, 10.0));
        assert!(!within_tolerance(-80.0, -100.0, 10.0));
    }
}
