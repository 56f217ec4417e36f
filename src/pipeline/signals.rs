// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Sources of per-frame signals (speed, lane and light state)

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use super::violation::FrameSignals;
use crate::vision::Frame;

/// Supplies the signals for each processed frame
pub trait SignalSource: Send + Sync {
    fn next_signals(&self, frame: &Frame) -> FrameSignals;
}

/// No external sensors: speed unknown, every flag false
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSignals;

impl SignalSource for NoSignals {
    fn next_signals(&self, _frame: &Frame) -> FrameSignals {
        FrameSignals::default()
    }
}

/// Random signals for demos
///
/// Speed is uniform in [20, 100) km/h and each flag is a fair coin.
#[derive(Debug)]
pub struct SimulatedSignals {
    rng: Mutex<StdRng>,
}

impl SimulatedSignals {
    /// Seeded for reproducible runs, or from OS entropy
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl SignalSource for SimulatedSignals {
    fn next_signals(&self, _frame: &Frame) -> FrameSignals {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        FrameSignals {
            speed_kmh: Some(rng.gen_range(20.0..100.0)),
            lane_violation: rng.gen_bool(0.5),
            red_light: rng.gen_bool(0.5),
            illegal_turn: rng.gen_bool(0.5),
            parking_violation: rng.gen_bool(0.5),
            overtaking_violation: rng.gen_bool(0.5),
        }
    }
}
