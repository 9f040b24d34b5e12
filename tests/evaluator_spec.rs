use std::collections::BTreeMap;

use mission_checklist::eval::*;
use mission_checklist::models::*;
use mission_checklist::telemetry::*;
use speculate2::speculate;

const KERBIN_RADIUS: f64 = 600_000.0;

fn check(snapshot: &VehicleSnapshot, criterion: &Criterion) -> bool {
    let ctx = EvalContext::from_snapshot(snapshot);
    evaluate_criterion(criterion, &ctx)
}

fn circular_orbit(altitude: f64, inclination: f64) -> OrbitalElements {
    OrbitalElements {
        body: "Kerbin".to_string(),
        body_radius: KERBIN_RADIUS,
        semi_major_axis: KERBIN_RADIUS + altitude,
        eccentricity: 0.0,
        inclination,
    }
}

fn propellant(name: &str) -> Propellant {
    Propellant {
        name: name.to_string(),
        ignore_for_isp: false,
    }
}

fn level(amount: f64, capacity: f64) -> ResourceLevel {
    ResourceLevel { amount, capacity }
}

fn flight_vessel() -> VehicleSnapshot {
    let mut resources = BTreeMap::new();
    resources.insert("LiquidFuel".to_string(), level(100.0, 200.0));
    resources.insert("Oxidizer".to_string(), level(50.0, 100.0));
    resources.insert("ElectricCharge".to_string(), level(80.0, 150.0));

    let mut staging = BTreeMap::new();
    staging.insert(
        1,
        StageHardware {
            separators: 1,
            docking_ports: 0,
        },
    );
    staging.insert(
        2,
        StageHardware {
            separators: 0,
            docking_ports: 1,
        },
    );

    VehicleSnapshot {
        vessel_id: "Kerbal X".to_string(),
        scene: Scene::Flight,
        parts: vec![
            PartInfo {
                name: "mk1pod".to_string(),
                modules: vec!["ModuleCommand".to_string(), "ModuleSAS".to_string()],
            },
            PartInfo {
                name: "liquidEngine".to_string(),
                modules: vec!["ModuleEngines".to_string()],
            },
        ],
        resources,
        crew: vec![
            CrewMember {
                name: "Jebediah".to_string(),
                trait_name: "Pilot".to_string(),
            },
            CrewMember {
                name: "Bob".to_string(),
                trait_name: "Scientist".to_string(),
            },
        ],
        crew_capacity: 3,
        orbit: Some(circular_orbit(104_000.0, 6.0)),
        flags_planted: 1,
        power: PowerFigures {
            storage: Capability::new(75.0, 2),
            solar: Capability::new(1.5, 2),
            generators: Capability::new(0.75, 1),
            fuel_cells: Capability::new(0.0, 0),
        },
        comms: CommsFigures {
            antennas: Capability::new(500_000.0, 1),
            control_sources: Capability::new(1.0, 1),
        },
        utility: UtilityFigures {
            lights: Capability::new(0.0, 2),
            parachutes: Capability::new(0.0, 1),
            ..UtilityFigures::default()
        },
        staging,
        guidance: GuidanceFigures {
            torque: Torque {
                pitch: 5.0,
                yaw: 5.0,
                roll: 5.0,
            },
            sas_level: Some(1),
        },
        engines: vec![PropulsionPart {
            type_name: "LiquidFuel".to_string(),
            propellants: vec![propellant("Oxidizer"), propellant("LiquidFuel")],
        }],
        rcs: vec![PropulsionPart {
            type_name: "RCS".to_string(),
            propellants: vec![propellant("MonoPropellant")],
        }],
        stages: vec![
            StageStats {
                delta_v_vacuum: 1_000.0,
                delta_v_sea_level: 800.0,
                twr_vacuum: 2.0,
                twr_sea_level: 1.6,
            },
            StageStats {
                delta_v_vacuum: 3_000.0,
                delta_v_sea_level: 2_400.0,
                twr_vacuum: 1.2,
                twr_sea_level: 0.9,
            },
        ],
        visits: VisitLog {
            bodies: vec!["Mun".to_string()],
            landings: vec![Landing {
                body: "Mun".to_string(),
                biome: "Midlands".to_string(),
            }],
            asteroids: vec!["PAM-117".to_string()],
            vessels: vec!["Station Alpha".to_string()],
        },
        ..VehicleSnapshot::default()
    }
}

fn orbit(apoapsis: f64, periapsis: f64, tolerance: f64) -> Criterion {
    Criterion::Orbit {
        apoapsis,
        periapsis,
        tolerance,
    }
}

fn visit(body: &str, landed: bool, biome: &str) -> Criterion {
    Criterion::VisitBody {
        body: body.to_string(),
        landed,
        biome: biome.to_string(),
    }
}

fn engines(type_key: &str, stage: u32, min_delta_v: f64, min_twr: f64, vacuum: bool) -> Criterion {
    Criterion::Engines(EngineCriterion {
        type_key: type_key.to_string(),
        resources: Vec::new(),
        stage,
        min_delta_v,
        min_twr,
        vacuum,
    })
}

speculate! {
    before {
        let vessel = flight_vessel();
    }

    describe "thresholds" {
        it "compares the battery charge with the minimum" {
            assert!(check(&vessel, &Criterion::Batteries { min_capacity: 50.0 }));
            assert!(check(&vessel, &Criterion::Batteries { min_capacity: 75.0 }));
            assert!(!check(&vessel, &Criterion::Batteries { min_capacity: 100.0 }));
        }

        it "treats a zero threshold as met" {
            let empty = VehicleSnapshot::default();
            assert!(check(&empty, &Criterion::Batteries { min_capacity: 0.0 }));
            assert!(check(&empty, &Criterion::Generators { min_rate: 0.0 }));
        }

        it "is monotonic in the threshold" {
            let thresholds = [0.0, 10.0, 50.0, 74.9, 75.0, 75.1, 100.0, 1e9];
            for (i, &high) in thresholds.iter().enumerate() {
                if check(&vessel, &Criterion::Batteries { min_capacity: high }) {
                    for &low in &thresholds[..i] {
                        assert!(check(&vessel, &Criterion::Batteries { min_capacity: low }));
                    }
                }
            }
        }

        it "is monotonic in the live value" {
            let mut richer = vessel.clone();
            for charge in [0.0, 40.0, 75.0, 120.0] {
                richer.power.storage = Capability::new(charge, 1);
                let passed = check(&richer, &Criterion::Batteries { min_capacity: 60.0 });
                assert_eq!(passed, charge >= 60.0);
            }
        }

        it "counts contributors for count kinds" {
            assert!(check(&vessel, &Criterion::Lights { min_count: 2 }));
            assert!(!check(&vessel, &Criterion::Lights { min_count: 3 }));
            assert!(check(&vessel, &Criterion::Parachutes { min_count: 1 }));
            assert!(!check(&vessel, &Criterion::Drills { min_count: 1 }));
            assert!(check(&vessel, &Criterion::Drills { min_count: 0 }));
        }

        it "sums the charge rate of every power source" {
            assert!(check(&vessel, &Criterion::ChargeRate { min_rate: 2.25 }));
            assert!(!check(&vessel, &Criterion::ChargeRate { min_rate: 2.3 }));
        }

        it "checks every reaction wheel axis" {
            let wheels = |roll: f64| Criterion::ReactionWheels {
                min_pitch: 5.0,
                min_yaw: 1.0,
                min_roll: roll,
            };
            assert!(check(&vessel, &wheels(5.0)));
            assert!(!check(&vessel, &wheels(6.0)));
        }
    }

    describe "orbit" {
        it "accepts an orbit inside the tolerance band" {
            assert!(check(&vessel, &orbit(100_000.0, 100_000.0, 5.0)));
        }

        it "rejects an orbit outside the tolerance band" {
            let mut high = vessel.clone();
            high.orbit = Some(circular_orbit(106_000.0, 0.0));
            assert!(!check(&high, &orbit(100_000.0, 100_000.0, 5.0)));
        }

        it "checks apoapsis and periapsis separately" {
            let mut elliptic = vessel.clone();
            elliptic.orbit = Some(OrbitalElements {
                body: "Kerbin".to_string(),
                body_radius: KERBIN_RADIUS,
                semi_major_axis: KERBIN_RADIUS + 150_000.0,
                eccentricity: 0.0625,
                inclination: 0.0,
            });
            // apoapsis 196 875 m, periapsis 103 125 m
            assert!(check(&elliptic, &orbit(200_000.0, 100_000.0, 5.0)));
            assert!(!check(&elliptic, &orbit(100_000.0, 100_000.0, 5.0)));
        }

        it "fails without an orbit" {
            let mut landed = vessel.clone();
            landed.orbit = None;
            assert!(!check(&landed, &orbit(100_000.0, 100_000.0, 5.0)));
        }

        it "reads the apoapsis as the live value" {
            let ctx = EvalContext::from_snapshot(&vessel);
            let live = live_value(&orbit(0.0, 0.0, 5.0), &ctx).expect("No live value");
            assert!((live - 104_000.0).abs() < 1e-6);
        }

        it "checks the inclination range" {
            let range = |min: f64, max: f64| Criterion::Inclination { min, max };
            assert!(check(&vessel, &range(0.0, 10.0)));
            assert!(check(&vessel, &range(6.0, 6.0)));
            assert!(!check(&vessel, &range(7.0, 90.0)));
            assert!(!check(&vessel, &range(10.0, 0.0)));
        }
    }

    describe "scene gating" {
        it "passes flight-only kinds while building" {
            let mut editor = VehicleSnapshot {
                scene: Scene::Editor,
                ..VehicleSnapshot::default()
            };
            assert!(check(&editor, &orbit(100_000.0, 100_000.0, 5.0)));
            assert!(check(&editor, &visit("Mun", true, "any")));
            assert!(check(&editor, &Criterion::Flags { min_count: 3 }));

            editor.scene = Scene::Flight;
            assert!(!check(&editor, &Criterion::Flags { min_count: 3 }));
        }

        it "passes editor-only kinds in flight" {
            let category = Criterion::VabCategory {
                category: "Nonexistent".to_string(),
            };
            assert!(check(&vessel, &category));
        }

        it "still checks kinds that apply everywhere" {
            let editor = VehicleSnapshot {
                scene: Scene::Editor,
                ..VehicleSnapshot::default()
            };
            assert!(!check(&editor, &Criterion::Batteries { min_capacity: 1.0 }));
        }
    }

    describe "resources" {
        it "requires every entry" {
            let mut entries = vec![
                ResourceEntry::new("LiquidFuel", 100.0, 200.0),
                ResourceEntry::new("Oxidizer", 50.0, 0.0),
            ];
            assert!(check(&vessel, &Criterion::Resources { entries: entries.clone() }));

            entries.push(ResourceEntry::new("Oxidizer", 60.0, 0.0));
            assert!(!check(&vessel, &Criterion::Resources { entries: entries.clone() }));

            entries.pop();
            assert!(check(&vessel, &Criterion::Resources { entries }));
        }

        it "treats unknown resources as empty" {
            let entries = vec![ResourceEntry::new("Ore", 1.0, 0.0)];
            assert!(!check(&vessel, &Criterion::Resources { entries }));
            let entries = vec![ResourceEntry::new("Ore", 0.0, 0.0)];
            assert!(check(&vessel, &Criterion::Resources { entries }));
        }

        it "passes an empty list" {
            assert!(check(&vessel, &Criterion::Resources { entries: Vec::new() }));
        }

        describe "transfers" {
            before {
                let transfer = |direction: TransferDirection, starting: f64, ending: f64| {
                    Criterion::ResourceTransfer {
                        transfers: vec![TransferEntry {
                            resource: "LiquidFuel".to_string(),
                            direction,
                            starting,
                            ending,
                        }],
                    }
                };
            }

            it "passes an inbound transfer that reached its ending amount" {
                assert!(check(&vessel, &transfer(TransferDirection::In, 10.0, 100.0)));
                assert!(check(&vessel, &transfer(TransferDirection::In, 10.0, 90.0)));
            }

            it "fails a partially completed inbound transfer" {
                assert!(!check(&vessel, &transfer(TransferDirection::In, 10.0, 500.0)));
            }

            it "fails an inbound transfer that has not started" {
                assert!(!check(&vessel, &transfer(TransferDirection::In, 100.0, 100.0)));
            }

            it "passes an outbound transfer that drained to its ending amount" {
                assert!(check(&vessel, &transfer(TransferDirection::Out, 400.0, 100.0)));
                assert!(check(&vessel, &transfer(TransferDirection::Out, 400.0, 150.0)));
            }

            it "fails a partially completed outbound transfer" {
                assert!(!check(&vessel, &transfer(TransferDirection::Out, 400.0, 0.0)));
                assert!(!check(&vessel, &transfer(TransferDirection::Out, 100.0, 100.0)));
            }

            it "passes an empty transfer list" {
                assert!(check(&vessel, &Criterion::ResourceTransfer { transfers: Vec::new() }));
            }
        }
    }

    describe "propulsion" {
        it "builds type keys from sorted propellants" {
            assert_eq!(vessel.engines[0].type_key(), "LiquidFuel:LiquidFuel+Oxidizer");
            let key = type_key(
                "Electric",
                &[
                    Propellant {
                        name: "ElectricCharge".to_string(),
                        ignore_for_isp: true,
                    },
                    propellant("XenonGas"),
                ],
            );
            assert_eq!(key, "Electric:XenonGas");
        }

        it "matches the engine type and stage figures" {
            let key = "LiquidFuel:LiquidFuel+Oxidizer";
            assert!(check(&vessel, &engines(key, 0, 1_000.0, 2.0, true)));
            assert!(!check(&vessel, &engines(key, 0, 1_000.0, 2.0, false)));
            assert!(check(&vessel, &engines(key, 1, 2_400.0, 0.9, false)));
            assert!(!check(&vessel, &engines("SolidBooster:SolidFuel", 0, 0.0, 0.0, true)));
            assert!(!check(&vessel, &engines("", 0, 0.0, 0.0, true)));
        }

        it "clamps the stage to the last one" {
            let key = "LiquidFuel:LiquidFuel+Oxidizer";
            assert!(check(&vessel, &engines(key, 9, 3_000.0, 0.0, true)));
            let ctx = EvalContext::from_snapshot(&vessel);
            assert_eq!(ctx.stages.len(), 2);
            assert_eq!(ctx.stages.resolve(9), ctx.stages.resolve(1));
        }

        it "fails delta-v checks without stage figures" {
            let mut bare = vessel.clone();
            bare.stages.clear();
            let key = "LiquidFuel:LiquidFuel+Oxidizer";
            assert!(check(&bare, &engines(key, 0, 0.0, 0.0, true)));
            assert!(!check(&bare, &engines(key, 0, 1.0, 0.0, true)));
        }

        it "checks the engine resource list" {
            let criterion = Criterion::Engines(EngineCriterion {
                type_key: "LiquidFuel:LiquidFuel+Oxidizer".to_string(),
                resources: vec![ResourceEntry::new("Oxidizer", 80.0, 0.0)],
                ..EngineCriterion::default()
            });
            assert!(!check(&vessel, &criterion));
        }

        it "matches rcs thrusters" {
            let rcs = |key: &str| Criterion::Rcs(RcsCriterion {
                type_key: key.to_string(),
                resources: Vec::new(),
            });
            assert!(check(&vessel, &rcs("RCS:MonoPropellant")));
            assert!(!check(&vessel, &rcs("RCS:XenonGas")));
        }

        it "finds separators in a stage" {
            let staging = |stage: u32, allow_docking_port: bool| Criterion::Staging {
                stage,
                allow_docking_port,
            };
            assert!(check(&vessel, &staging(1, false)));
            assert!(!check(&vessel, &staging(2, false)));
            assert!(check(&vessel, &staging(2, true)));
            assert!(!check(&vessel, &staging(3, true)));
        }

        it "shows the current stage next to staging checks" {
            let mut staged = flight_vessel();
            staged.current_stage = 2;
            let ctx = EvalContext::from_snapshot(&staged);
            let criterion = Criterion::Staging {
                stage: 1,
                allow_docking_port: false,
            };
            assert_eq!(live_value(&criterion, &ctx), Some(2.0));
        }
    }

    describe "presence" {
        it "finds parts and modules by name" {
            assert!(check(&vessel, &Criterion::Part { part: "mk1pod".to_string() }));
            assert!(!check(&vessel, &Criterion::Part { part: "mk2pod".to_string() }));
            assert!(!check(&vessel, &Criterion::Part { part: String::new() }));
            assert!(check(&vessel, &Criterion::Module { module: "ModuleSAS".to_string() }));
            assert!(!check(&vessel, &Criterion::Module { module: "ModuleDrill".to_string() }));
        }

        it "checks crew traits" {
            let crew = |name: &str| Criterion::CrewTrait { trait_name: name.to_string() };
            assert!(check(&vessel, &crew("Scientist")));
            assert!(!check(&vessel, &crew("Engineer")));
            assert!(!check(&vessel, &crew("")));
        }

        it "counts crew in flight and capacity while building" {
            assert!(check(&vessel, &Criterion::CrewCount { min_count: 2 }));
            assert!(!check(&vessel, &Criterion::CrewCount { min_count: 3 }));

            let mut editor = vessel.clone();
            editor.scene = Scene::Editor;
            assert!(check(&editor, &Criterion::CrewCount { min_count: 3 }));
        }

        it "checks the sas level" {
            assert!(check(&vessel, &Criterion::SasLevel { min_level: 1 }));
            assert!(!check(&vessel, &Criterion::SasLevel { min_level: 2 }));

            let mut no_sas = vessel.clone();
            no_sas.guidance.sas_level = None;
            assert!(check(&no_sas, &Criterion::SasLevel { min_level: 0 }));
            assert!(!check(&no_sas, &Criterion::SasLevel { min_level: 1 }));
        }

        it "always passes unconditional steps" {
            assert!(check(&VehicleSnapshot::default(), &Criterion::Unconditional));
        }
    }

    describe "visits" {
        it "checks bodies visited and landed on" {
            assert!(check(&vessel, &visit("Mun", false, "any")));
            assert!(check(&vessel, &visit("Mun", true, "any")));
            assert!(check(&vessel, &visit("Mun", true, "")));
            assert!(check(&vessel, &visit("Mun", true, "midlands")));
            assert!(!check(&vessel, &visit("Mun", true, "Highlands")));
            assert!(!check(&vessel, &visit("Minmus", false, "any")));
            assert!(!check(&vessel, &visit("", false, "any")));
        }

        it "only counts this vessel's history" {
            let mut other = vessel.clone();
            other.vessel_id = "Other".to_string();
            assert!(check(&other, &visit("Mun", false, "any")));
            assert!(other.has_visited_body("Other", "Mun"));
            assert!(!other.has_visited_body("Kerbal X", "Mun"));
        }

        it "checks asteroids and vessels" {
            let asteroid = |name: &str| Criterion::VisitAsteroid { asteroid: name.to_string() };
            let target = |name: &str| Criterion::VisitVessel { vessel: name.to_string() };
            assert!(check(&vessel, &asteroid("PAM-117")));
            assert!(!check(&vessel, &asteroid("XKT-001")));
            assert!(check(&vessel, &target("Station Alpha")));
            assert!(!check(&vessel, &target("")));
        }

        it "counts planted flags" {
            assert!(check(&vessel, &Criterion::Flags { min_count: 1 }));
            assert!(!check(&vessel, &Criterion::Flags { min_count: 2 }));
        }
    }

    describe "editor categories" {
        it "looks parts up in the organizer" {
            let mut categories = BTreeMap::new();
            categories.insert("Pods".to_string(), vec!["mk1pod".to_string()]);
            let editor = VehicleSnapshot {
                scene: Scene::Editor,
                parts: vessel.parts.clone(),
                categories: Some(categories),
                ..VehicleSnapshot::default()
            };
            let category = |name: &str| Criterion::VabCategory { category: name.to_string() };
            assert!(check(&editor, &category("Pods")));
            assert!(!check(&editor, &category("Engines")));
        }

        it "passes without an organizer" {
            let editor = VehicleSnapshot {
                scene: Scene::Editor,
                ..VehicleSnapshot::default()
            };
            assert!(editor.organizer().is_none());
            assert!(check(&editor, &Criterion::VabCategory { category: "Pods".to_string() }));
        }
    }

    describe "snapshot files" {
        it "loads a partial snapshot with defaults" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("vessel.json");
            std::fs::write(
                &path,
                r#"{
                    "vessel_id": "Relay",
                    "resources": { "ElectricCharge": { "amount": 40, "capacity": 50 } },
                    "power": { "storage": { "total": 40, "contributors": 1 } },
                    "crew": [{ "name": "Val", "trait": "Pilot" }]
                }"#,
            )
            .expect("Failed to write snapshot");

            let snapshot = VehicleSnapshot::load(&path).expect("Failed to load snapshot");
            assert_eq!(snapshot.scene, Scene::Flight);
            assert_eq!(snapshot.resource("ElectricCharge"), level(40.0, 50.0));
            assert_eq!(snapshot.crew[0].trait_name, "Pilot");
            assert!(check(&snapshot, &Criterion::Batteries { min_capacity: 40.0 }));
        }

        it "reports unreadable snapshots" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("broken.json");
            std::fs::write(&path, "{ nope").expect("Failed to write snapshot");
            assert!(VehicleSnapshot::load(&path).is_err());
            assert!(VehicleSnapshot::load(&dir.path().join("missing.json")).is_err());
        }
    }
}
