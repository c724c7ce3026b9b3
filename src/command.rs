/*!
	command protocol of the node.

	Each request carries a command name, a value and a write flag. A read returns the current value of the command's quantity, a write sets it first. The answer is a [Response].
*/

use crate::error::{DriveError, DriveResult};
use core::{fmt, str::FromStr};


/// commands understood by the node
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Command {
	/// logical enable of the axis, also powers the drive on or off
	Activate,
	/// stop the current motion
	Stop,
	/// (%) override applied to velocity setpoints
	SimSpeed,
	/// (rad/s) velocity setpoint, or measured velocity
	Velocity,
	/// (rad) position setpoint, or measured position
	Position,
	/// power stage of the drive
	Power,
}
impl Command {
	pub const ALL: [Command; 6] = [
		Self::Activate, Self::Stop, Self::SimSpeed,
		Self::Velocity, Self::Position, Self::Power,
		];

	/// name of the command on the wire
	pub fn name(&self) -> &'static str {
		match self {
			Self::Activate => "ACTIVATE",
			Self::Stop => "STOP",
			Self::SimSpeed => "SIM_SPEED",
			Self::Velocity => "VELOCITY",
			Self::Position => "POSITION",
			Self::Power => "POWER",
		}
	}
}
impl FromStr for Command {
	type Err = DriveError;
	fn from_str(name: &str) -> Result<Self, Self::Err> {
		Self::ALL.iter()
			.find(|command| command.name() == name)
			.copied()
			.ok_or_else(|| DriveError::UnknownCommand(name.to_string()))
	}
}
impl fmt::Display for Command {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}


/// value carried by a request, as given by the caller
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	Number(f64),
	Bool(bool),
	/// textual value, as received from a command line or a text protocol
	Text(String),
}
impl Value {
	/// numeric value, failing on text that is not a finite number
	pub fn number(&self) -> DriveResult<f64> {
		let number = match self {
			Self::Number(number) => *number,
			Self::Bool(flag) => if *flag {1.} else {0.},
			Self::Text(text) => text.trim().parse::<f64>()
				.map_err(|_| DriveError::InvalidValue("not a number"))?,
		};
		if number.is_finite()
			{Ok(number)}
		else
			{Err(DriveError::InvalidValue("not a finite number"))}
	}
	/// truth value, any non-zero number is true
	pub fn flag(&self) -> DriveResult<bool> {
		match self {
			Self::Bool(flag) => Ok(*flag),
			Self::Text(text) if text.trim().eq_ignore_ascii_case("true") => Ok(true),
			Self::Text(text) if text.trim().eq_ignore_ascii_case("false") => Ok(false),
			_ => Ok(self.number()? != 0.),
		}
	}
}
impl From<f64> for Value {
	fn from(value: f64) -> Self {Self::Number(value)}
}
impl From<f32> for Value {
	fn from(value: f32) -> Self {Self::Number(value.into())}
}
impl From<i32> for Value {
	fn from(value: i32) -> Self {Self::Number(value.into())}
}
impl From<bool> for Value {
	fn from(value: bool) -> Self {Self::Bool(value)}
}
impl From<&str> for Value {
	fn from(value: &str) -> Self {Self::Text(value.to_string())}
}
impl From<String> for Value {
	fn from(value: String) -> Self {Self::Text(value)}
}


/// answer to a request
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Response {
	pub accepted: bool,
	pub result: f64,
}
impl Response {
	pub fn accept(result: f64) -> Self {
		Self {accepted: true, result}
	}
}
/// protocol answer of the rejections, other errors have no answer and map to a plain refusal
impl From<&DriveError> for Response {
	fn from(error: &DriveError) -> Self {
		match error {
			DriveError::NotActive => Self {accepted: false, result: -1.},
			_ => Self {accepted: false, result: 0.},
		}
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn names() {
		for command in Command::ALL {
			assert_eq!(command.name().parse::<Command>().unwrap(), command);
		}
		assert!(matches!("velocity".parse::<Command>(), Err(DriveError::UnknownCommand(_))));
		assert!(matches!("JUMP".parse::<Command>(), Err(DriveError::UnknownCommand(name)) if name == "JUMP"));
	}

	#[test]
	fn values() {
		assert_eq!(Value::from(" 2.5 ").number().unwrap(), 2.5);
		assert_eq!(Value::from(true).number().unwrap(), 1.);
		assert!(matches!(Value::from("fast").number(), Err(DriveError::InvalidValue(_))));
		assert!(Value::from(f64::NAN).number().is_err());
		assert!(Value::from(f64::INFINITY).flag().is_err());

		assert!(Value::from(1).flag().unwrap());
		assert!(! Value::from(0.).flag().unwrap());
		assert!(Value::from("TRUE").flag().unwrap());
		assert!(! Value::from("0").flag().unwrap());
	}

	#[test]
	fn rejections() {
		assert_eq!(Response::from(&DriveError::NotActive), Response {accepted: false, result: -1.});
		assert_eq!(Response::from(&DriveError::UnknownCommand("X".into())), Response {accepted: false, result: 0.});
	}
}
