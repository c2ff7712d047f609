/// Pitch (about y) and yaw (about z) in radians from a unit quaternion.
///
/// The asin argument is clamped so that slightly denormalized quaternions
/// near gimbal lock still produce a finite pitch.
pub fn quaternion_to_pitch_yaw(w: f64, x: f64, y: f64, z: f64) -> (f64, f64) {
    let sin_pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0);
    let pitch = sin_pitch.asin();

    let siny_cosp = 2.0 * (w * z + x * y);
    let cosy_cosp = 1.0 - 2.0 * (y * y + z * z);
    let yaw = siny_cosp.atan2(cosy_cosp);

    (pitch, yaw)
}
