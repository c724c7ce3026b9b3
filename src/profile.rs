/*!
    drive models a node can control, selected at construction.

    A profile gathers what differs from one physical drive to an other: the gearing of the axis, the control word masks the drive expects for each command, and its motion configuration.
*/

use crate::{
    dictionary::{ControlWord, OperationMode},
    units::UnitConverter,
    };


/// mechanical and sensor constants of an axis
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Gearing {
    /// resolution of the motor encoder
    pub counts_per_revolution: u32,
    /// reduction between motor shaft and output axis
    pub gear_ratio: f64,
}
impl Gearing {
    pub fn converter(&self) -> UnitConverter {
        UnitConverter::new(self.counts_per_revolution, self.gear_ratio)
    }
}

/**
    control word bits used by each kind of command

    Note the asymmetry of the power masks: powering on sets three bits but powering off only clears `power_off`, leaving the others set. This follows the transition table of the supported drives and must not be changed to clear all three.
*/
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ControlMasks {
    /// word sent before any command
    pub initial: u16,
    /// bits set when powering on
    pub power_on: u16,
    /// bits cleared when powering off
    pub power_off: u16,
    /// bit enabling motion
    pub run: u16,
    /// bit latching a new setpoint, only ever sent transiently
    pub new_setpoint: u16,
}
impl ControlMasks {
    pub fn initial(&self) -> ControlWord  {ControlWord::from(self.initial)}
}

/// motion configuration written once during bring-up
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MotionSetup {
    pub mode: OperationMode,
    pub profile_type: i16,
    /// (counts/s²)
    pub acceleration: u32,
    /// (counts/s²)
    pub deceleration: u32,
}

/// drive model of a node
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DriveProfile {
    /// Copley amplifier driving the boom gearmotor
    CopleyBoom,
    /// CiA402 drive with arbitrary gearing
    Custom(Gearing),
}
impl DriveProfile {
    pub fn gearing(&self) -> Gearing {
        match self {
            Self::CopleyBoom => Gearing {counts_per_revolution: 262_144, gear_ratio: 160.},
            Self::Custom(gearing) => *gearing,
        }
    }
    pub fn masks(&self) -> ControlMasks {
        let masks = ControlMasks {
            initial: 0x00,
            power_on: 0x0b,
            power_off: 0x08,
            run: 0x04,
            new_setpoint: 0x10,
            };
        match self {
            // setpoints are applied immediately instead of queued
            Self::CopleyBoom => ControlMasks {initial: 0x20, .. masks},
            Self::Custom(_) => masks,
        }
    }
    pub fn motion(&self) -> MotionSetup {
        MotionSetup {
            mode: OperationMode::ProfilePosition,
            profile_type: 0,
            acceleration: 500_000,
            deceleration: 500_000,
        }
    }
}
impl Default for DriveProfile {
    fn default() -> Self {Self::CopleyBoom}
}
