use anyhow::{ensure, Context};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sonarcore::sonar_interface::messages::INVALID_ALTITUDE;
use sonarcore::sonar_interface::{AltitudeReading, PoseUpdate, SonarFrame};
use std::f64::consts::PI;

/// Configuration for generating a synthetic lawnmower survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    pub legs: usize,
    pub pings_per_leg: usize,
    /// Along-track length of one leg (metres).
    pub leg_length: f64,
    /// Cross-track offset between neighbouring legs (metres).
    pub leg_spacing: f64,
    pub altitude: f64,
    pub altitude_jitter: f64,
    /// Probability that an altimeter reading is the invalid sentinel.
    pub dropout_rate: f64,
    /// Multiplicative speckle amplitude applied to every sample.
    pub speckle: f64,
    pub seed: u64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            legs: 3,
            pings_per_leg: 250,
            leg_length: 120.0,
            leg_spacing: 20.0,
            altitude: 6.0,
            altitude_jitter: 0.3,
            dropout_rate: 0.05,
            speckle: 0.25,
            seed: 0,
        }
    }
}

/// One inbound message of the generated mission, in arrival order.
#[derive(Debug, Clone)]
pub enum MissionEvent {
    Altitude(AltitudeReading),
    Pose(PoseUpdate),
    Sonar(SonarFrame),
}

/// Largest unsigned value representable in `bytes_per_sample` bytes.
fn full_scale(bytes_per_sample: usize) -> u64 {
    u64::MAX >> (64 - 8 * bytes_per_sample)
}

fn encode(values: &[f64], bytes_per_sample: usize) -> Vec<u8> {
    let scale = full_scale(bytes_per_sample) as f64;
    let mut bytes = Vec::with_capacity(values.len() * bytes_per_sample);
    for value in values {
        let quantized = (value.clamp(0.0, 1.0) * scale).round() as u64;
        bytes.extend_from_slice(&quantized.to_be_bytes()[8 - bytes_per_sample..]);
    }
    bytes
}

/// Backscatter with a water-column gap, range falloff, and speckle.
fn build_channel(rng: &mut StdRng, config: &MissionConfig, samples: usize) -> Vec<f64> {
    let gap = samples / 10;
    (0..samples)
        .map(|s| {
            if s < gap {
                return rng.gen_range(0.0..0.02);
            }
            let range = (s - gap) as f64 / samples as f64;
            let falloff = 0.9 / (1.0 + 4.0 * range);
            let spread = config.speckle.abs();
            let speckle = 1.0 + rng.gen_range(-spread..=spread);
            falloff * speckle
        })
        .collect()
}

/// Orientation quaternion `(w, x, y, z)` for a level vehicle with the given heading.
fn heading_quaternion(yaw: f64) -> [f64; 4] {
    let half = yaw / 2.0;
    [half.cos(), 0.0, 0.0, half.sin()]
}

/// Generates altitude, pose, and sonar messages for every ping of the survey.
pub fn build_mission(
    config: &MissionConfig,
    samples: usize,
    bytes_per_sample: usize,
) -> anyhow::Result<Vec<MissionEvent>> {
    ensure!(
        (1..=8).contains(&bytes_per_sample),
        "bytes_per_sample must be within 1..=8, got {}",
        bytes_per_sample
    );
    ensure!(samples > 0, "mission needs at least one sample per channel");
    let pings = config
        .legs
        .checked_mul(config.pings_per_leg)
        .context("overflow computing ping count for mission")?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut events = Vec::with_capacity(pings * 3);
    let step = config.leg_length / config.pings_per_leg.max(1) as f64;

    for leg in 0..config.legs {
        let eastward = leg % 2 == 0;
        let yaw = if eastward { 0.0 } else { PI };
        let y = leg as f64 * config.leg_spacing;

        for ping in 0..config.pings_per_leg {
            let along = ping as f64 * step;
            let x = if eastward {
                along
            } else {
                config.leg_length - along
            };

            let altitude = if rng.gen_bool(config.dropout_rate.clamp(0.0, 1.0)) {
                AltitudeReading::new(INVALID_ALTITUDE)
            } else {
                let spread = config.altitude_jitter.abs();
                let jitter = rng.gen_range(-spread..=spread);
                AltitudeReading::new(config.altitude + jitter)
            };
            events.push(MissionEvent::Altitude(altitude));
            events.push(MissionEvent::Pose(PoseUpdate::new(
                [x, y],
                heading_quaternion(yaw),
            )));

            let right = build_channel(&mut rng, config, samples);
            let left = build_channel(&mut rng, config, samples);
            events.push(MissionEvent::Sonar(SonarFrame::new(
                encode(&right, bytes_per_sample),
                encode(&left, bytes_per_sample),
            )));
        }
    }

    Ok(events)
}
