/*!
	dictionnary objects of a CiA402 servo drive used by the node, and the bitfields of its control and status words.

	Objects names are the ones found in the drive's EDS file, the transport designates mapped values by these names.
*/

use crate::sdo::Sdo;
use bilge::prelude::*;
use core::fmt;


pub const CONTROL_WORD: Sdo<ControlWord> = Sdo::complete(0x6040, "Control word");
pub const STATUS_WORD: Sdo<StatusWord> = Sdo::complete(0x6041, "Status word");
pub const ERROR_CODE: Sdo<u16> = Sdo::complete(0x603f, "Error code");
pub const MODES_OF_OPERATION: Sdo<i8> = Sdo::complete(0x6060, "Modes of operation");
pub const ACTUAL_POSITION: Sdo<i32> = Sdo::complete(0x6064, "Actual motor position");
pub const ACTUAL_VELOCITY: Sdo<i32> = Sdo::complete(0x606c, "Actual motor velocity");
pub const TARGET_POSITION: Sdo<i32> = Sdo::complete(0x607a, "Profile target position");
pub const PROFILE_ACCELERATION: Sdo<u32> = Sdo::complete(0x6083, "Profile acceleration");
pub const PROFILE_DECELERATION: Sdo<u32> = Sdo::complete(0x6084, "Profile deceleration");
pub const MOTION_PROFILE_TYPE: Sdo<i16> = Sdo::complete(0x6086, "Motion profile type");
/// velocity target of the profile velocity mode, this is the one the node drives
pub const PROFILE_TARGET_VELOCITY: Sdo<i32> = Sdo::complete(0x60ff, "Profile target velocity");
/// velocity target of the `vl` mode, mapped by the drive's factory configuration
pub const TARGET_VELOCITY: Sdo<i16> = Sdo::complete(0x6042, "Target velocity");


/**
Control word of a servo drive

| Bit	|	Category	|   Meaning	|
|-------|---------------|-----------|
| 0	|	M	|	Switch on |
| 1	|	M	|	Enable voltage |
| 2	|	O	|	Quick stop |
| 3	|	M	|	Enable operation |
| 4	|	O	|	New set-point (profile position) |
| 5	|	O	|	Change set immediately (profile position) |
| 6	|	O	|	Relative (profile position) |
| 7	|	M	|	Fault reset |
| 8	|	O	|	Halt |
| 9	|	O	|	Operation mode specific |
| 10	|	O	|	reserved |
| 11 – 15	|	O	|	Manufacturer specific |

The node drives its axis with masks over the raw word (see [crate::profile::ControlMasks]), this struct is the readable view of it.
*/
#[bitsize(16)]
#[derive(FromBits, DebugBits, Copy, Clone, Eq, PartialEq, Default)]
pub struct ControlWord {
    pub switch_on: bool,
    pub enable_voltage: bool,
    pub quick_stop: bool,
    pub enable_operation: bool,
    pub new_setpoint: bool,
    pub change_immediately: bool,
    pub relative: bool,
    pub reset_fault: bool,
    pub halt: bool,
    pub specific: bool,
    reserved: u1,
    reserved: u5,
}
crate::data::bilge_pdudata!(ControlWord, u16);

impl fmt::Display for ControlWord {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "ControlWord{{") ?;
		for (active, mark) in [ (self.switch_on(), "so"),
								(self.enable_voltage(), "ev"),
								(self.quick_stop(), "qs"),
								(self.enable_operation(), "eo"),
								(self.new_setpoint(), "ns"),
								(self.change_immediately(), "ci"),
								(self.reset_fault(), "rf"),
								(self.halt(), "h"),
								] {
			write!(f, " ")?;
			if active {
				write!(f, "{}", mark)?;
			} else {
				for _ in 0 .. mark.len() {write!(f, " ")?;}
			}
		}
		write!(f, "}}")?;
		Ok(())
	}
}

/**
bit structure of a status word

| Bit |  Meaning | Presence |
|-----|----------|----------|
| 0	| Ready to switch on	| M
| 1	| Switched on	| M
| 2	| Operation enabled	| M
| 3	| Fault	| M
| 4	| Voltage enabled	| O
| 5	| Quick stop	| O
| 6	| Switch on disabled	| M
| 7	| Warning	| O
| 8	| Manufacturer specific	| O
| 9	| Remote	| O
| 10	| Target reached	| O
| 11	| Internal limit active	| C
| 12	| Set-point acknowledge (profile position)	| O
| 13	| Operation mode specific	| O
| 14-15	| Manufacturer specific	| O
*/
#[bitsize(16)]
#[derive(FromBits, DebugBits, Copy, Clone, Eq, PartialEq, Default)]
pub struct StatusWord {
    pub ready_switch_on: bool,
    pub switched_on: bool,
    pub operation_enabled: bool,
    pub fault: bool,
    pub voltage_enabled: bool,
    pub quick_stop: bool,
    pub switch_on_disabled: bool,
    pub warning: bool,
    reserved: u1,
    pub remote: bool,
    pub target_reached: bool,
    pub limit_active: bool,
    pub setpoint_acknowledge: bool,
    reserved: u3,
}
crate::data::bilge_pdudata!(StatusWord, u16);

impl fmt::Display for StatusWord {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "StatusWord{{")?;
		for (active, mark) in [ (self.ready_switch_on(), "rtso"),
								(self.switched_on(), "so"),
								(self.operation_enabled(), "oe"),
								(self.fault(), "f"),
								(self.voltage_enabled(), "ve"),
								(self.quick_stop(), "qs"),
								(self.switch_on_disabled(), "sod"),
								(self.warning(), "w"),
								(self.remote(), "r"),
								(self.target_reached(), "tr"),
								(self.limit_active(), "la"),
								] {
			write!(f, " ")?;
			if active {
				write!(f, "{}", mark)?;
			} else {
				for _ in 0 .. mark.len() {write!(f, " ")?;}
			}
		}
		write!(f, "}}")?;
		Ok(())
	}
}


/// servodrive control-loop type, as written to [MODES_OF_OPERATION]
#[repr(i8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum OperationMode {
    #[default]
	Off = 0,
	ProfilePosition = 1,
	Velocity = 2,
	ProfileVelocity = 3,
	TorqueProfile = 4,
	Homing = 6,
	InterpolatedPosition = 7,

	/// CSP
	SynchronousPosition = 8,
	/// CSV
	SynchronousVelocity = 9,
	/// CST
	SynchronousTorque = 10,
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::data::PduData;

	#[test]
	fn control_word_bits() {
		let word = ControlWord::from(0x2b);
		assert!(word.switch_on());
		assert!(word.enable_voltage());
		assert!(! word.quick_stop());
		assert!(word.enable_operation());
		assert!(word.change_immediately());
		assert_eq!(u16::from(word), 0x2b);

		let mut packed = [0u8; 2];
		word.pack(&mut packed).unwrap();
		assert_eq!(packed, [0x2b, 0]);
		assert_eq!(ControlWord::unpack(&packed).unwrap(), word);
	}

	#[test]
	fn status_word_bits() {
		let status = StatusWord::from(0x1637);
		assert!(status.ready_switch_on());
		assert!(status.operation_enabled());
		assert!(status.remote());
		assert!(status.target_reached());
		assert!(status.setpoint_acknowledge());
		assert!(! status.fault());
	}
}
