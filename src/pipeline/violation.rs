// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Violation labels and the policies that produce them

use serde::{Deserialize, Serialize};
use std::fmt;

/// Traffic violations, declared in checklist order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Violation {
    HelmetNotWorn,
    LicensePlateNotVisible,
    Speeding,
    LaneViolation,
    RunningRedLight,
    IllegalTurn,
    ParkingViolation,
    OvertakingViolation,
}

impl Violation {
    /// Every violation in checklist order
    pub const ALL: [Violation; 8] = [
        Violation::HelmetNotWorn,
        Violation::LicensePlateNotVisible,
        Violation::Speeding,
        Violation::LaneViolation,
        Violation::RunningRedLight,
        Violation::IllegalTurn,
        Violation::ParkingViolation,
        Violation::OvertakingViolation,
    ];

    /// Human-readable label used in API responses
    pub fn label(&self) -> &'static str {
        match self {
            Violation::HelmetNotWorn => "Helmet not worn",
            Violation::LicensePlateNotVisible => "License plate not visible",
            Violation::Speeding => "Speeding",
            Violation::LaneViolation => "Lane violation",
            Violation::RunningRedLight => "Running a red light",
            Violation::IllegalTurn => "Illegal turn",
            Violation::ParkingViolation => "Parking violation",
            Violation::OvertakingViolation => "Overtaking violation",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Join labels with `", "`; empty string for no violations
pub fn join_labels(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::label)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Per-frame facts that detection alone cannot provide
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameSignals {
    /// Measured speed in km/h, when known
    pub speed_kmh: Option<f32>,
    pub lane_violation: bool,
    pub red_light: bool,
    pub illegal_turn: bool,
    pub parking_violation: bool,
    pub overtaking_violation: bool,
}

/// Everything a policy may look at for one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameObservation<'a> {
    /// Number of helmet detections
    pub helmet_count: usize,
    /// Plate readings in detection order
    pub plate_readings: &'a [String],
    pub signals: FrameSignals,
}

/// Turns one frame's observation into violations
pub trait ViolationPolicy: Send + Sync {
    fn evaluate(&self, observation: &FrameObservation<'_>) -> Vec<Violation>;
}

/// Fixed checklist evaluated in label order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecklistPolicy {
    /// Speeds strictly above this are speeding
    pub speed_limit_kmh: f32,
}

impl Default for ChecklistPolicy {
    fn default() -> Self {
        Self {
            speed_limit_kmh: 60.0,
        }
    }
}

impl ViolationPolicy for ChecklistPolicy {
    fn evaluate(&self, observation: &FrameObservation<'_>) -> Vec<Violation> {
        let signals = &observation.signals;
        let speeding = signals
            .speed_kmh
            .is_some_and(|speed| speed > self.speed_limit_kmh);

        let checks = [
            (Violation::HelmetNotWorn, observation.helmet_count == 0),
            (
                Violation::LicensePlateNotVisible,
                observation.plate_readings.is_empty(),
            ),
            (Violation::Speeding, speeding),
            (Violation::LaneViolation, signals.lane_violation),
            (Violation::RunningRedLight, signals.red_light),
            (Violation::IllegalTurn, signals.illegal_turn),
            (Violation::ParkingViolation, signals.parking_violation),
            (Violation::OvertakingViolation, signals.overtaking_violation),
        ];

        checks
            .into_iter()
            .filter_map(|(violation, hit)| hit.then_some(violation))
            .collect()
    }
}
