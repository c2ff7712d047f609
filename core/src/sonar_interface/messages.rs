use serde::{Deserialize, Serialize};

/// Altitude value the DVL reports when it has no bottom lock.
pub const INVALID_ALTITUDE: f64 = -1.0;

/// Raw two-channel side-scan ping as delivered by the transducer driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SonarFrame {
    /// Starboard transducer bytes.
    pub right: Vec<u8>,
    /// Port transducer bytes.
    pub left: Vec<u8>,
}

impl SonarFrame {
    pub fn new(right: Vec<u8>, left: Vec<u8>) -> Self {
        Self { right, left }
    }
}

/// Altitude above the seafloor reported by the DVL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AltitudeReading {
    pub altitude: f64,
}

impl AltitudeReading {
    pub fn new(altitude: f64) -> Self {
        Self { altitude }
    }

    /// Readings equal to the sentinel or non-finite carry no information.
    pub fn is_valid(&self) -> bool {
        self.altitude != INVALID_ALTITUDE && self.altitude.is_finite()
    }
}

/// Pose estimate published by the navigation observer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoseUpdate {
    pub position: [f64; 2],
    /// Orientation quaternion in `[w, x, y, z]` order.
    pub orientation: [f64; 4],
}

impl PoseUpdate {
    pub fn new(position: [f64; 2], orientation: [f64; 4]) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

/// Navigation snapshot captured into each swath at arrival.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavigationState {
    pub x: f64,
    pub y: f64,
    pub qw: f64,
    pub qx: f64,
    pub qy: f64,
    pub qz: f64,
}

impl NavigationState {
    pub fn identity_at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            qw: 1.0,
            qx: 0.0,
            qy: 0.0,
            qz: 0.0,
        }
    }
}

impl From<&PoseUpdate> for NavigationState {
    fn from(update: &PoseUpdate) -> Self {
        let [qw, qx, qy, qz] = update.orientation;
        Self {
            x: update.position[0],
            y: update.position[1],
            qw,
            qx,
            qy,
            qz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn altitude_sentinel_is_invalid() {
        assert!(!AltitudeReading::new(INVALID_ALTITUDE).is_valid());
        assert!(!AltitudeReading::new(f64::NAN).is_valid());
        assert!(AltitudeReading::new(3.2).is_valid());
    }

    #[test]
    fn pose_update_converts_to_snapshot() {
        let update = PoseUpdate::new([1.0, -2.0], [0.5, 0.5, 0.5, 0.5]);
        let state = NavigationState::from(&update);
        assert_eq!(state.x, 1.0);
        assert_eq!(state.y, -2.0);
        assert_eq!(state.qz, 0.5);
    }
}
