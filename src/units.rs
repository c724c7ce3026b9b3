/*!
    conversion between physical units of the output axis and raw units of the drive.

    Raw positions are encoder counts of the motor shaft, raw velocities are counts per second. The gear between motor and output multiplies both.
*/

use core::f64::consts::TAU;


/**
    pure conversion between output axis units (rad, rad/s) and motor encoder counts

    Conversions to counts are rounded half away from zero, so a round trip is exact to [Self::resolution].
*/
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UnitConverter {
    counts_per_revolution: f64,
    gear_ratio: f64,
}
impl UnitConverter {
    pub fn new(counts_per_revolution: u32, gear_ratio: f64) -> Self {
        Self {
            counts_per_revolution: f64::from(counts_per_revolution),
            gear_ratio,
        }
    }
    /// encoder counts for one radian of the output axis
    fn counts_per_radian(&self) -> f64 {
        self.gear_ratio * self.counts_per_revolution / TAU
    }
    /// (rad) angle of the output axis for one encoder count, this is the quantization of every conversion
    pub fn resolution(&self) -> f64 {
        TAU / (self.gear_ratio * self.counts_per_revolution)
    }

    pub fn position_to_counts(&self, position: f64) -> i64 {
        (position * self.counts_per_radian()).round() as i64
    }
    pub fn counts_to_position(&self, counts: i64) -> f64 {
        counts as f64 / self.counts_per_radian()
    }
    /// the override scales the commanded velocity, 1.0 commands it unchanged
    pub fn velocity_to_counts(&self, velocity: f64, speed_override: f64) -> i64 {
        (speed_override * velocity * self.counts_per_radian()).round() as i64
    }
    /// measured velocities are never scaled by the override
    pub fn counts_to_velocity(&self, counts: i64) -> f64 {
        counts as f64 / self.counts_per_radian()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn boom() -> UnitConverter {UnitConverter::new(262144, 160.)}

    #[test]
    fn full_revolution() {
        let units = boom();
        assert_eq!(units.position_to_counts(TAU), 262144 * 160);
        assert!((units.counts_to_position(262144 * 160) - TAU).abs() < 1e-12);
        assert_eq!(units.velocity_to_counts(-TAU, 1.), -262144 * 160);
    }

    #[test]
    fn round_trip() {
        let units = boom();
        let epsilon = units.resolution();
        let mut position = -20.;
        while position < 20. {
            let back = units.counts_to_position(units.position_to_counts(position));
            assert!((back - position).abs() < epsilon, "{} came back as {}", position, back);
            position += 0.0137;
        }
    }

    #[test]
    fn rounding_is_symmetric() {
        let units = UnitConverter::new(4, 1.);
        // a count is a quarter turn
        assert_eq!(units.position_to_counts(0.51 * TAU / 4.), 1);
        assert_eq!(units.position_to_counts(-0.51 * TAU / 4.), -1);
        assert_eq!(units.position_to_counts(0.49 * TAU / 4.), 0);
        assert_eq!(units.position_to_counts(-0.49 * TAU / 4.), 0);
    }

    #[test]
    fn override_scales_commands_only() {
        let units = boom();
        let full = units.velocity_to_counts(2., 1.);
        let half = units.velocity_to_counts(2., 0.5);
        assert!((2 * half - full).abs() <= 1);
        assert_eq!(units.velocity_to_counts(2., 0.), 0);
        assert!((units.counts_to_velocity(full) - 2.).abs() < units.resolution());
    }
}
