//! logical power and motion state of the axis

use crate::{
    dictionary::ControlWord,
    profile::ControlMasks,
    transport::NetworkStatus,
    };


/**
    logical state of the drive, owned by the node for its whole lifetime

    The control word accumulates the power and motion bits, it is only reset at construction. Its mutators do not touch it: they return the word the caller has to transmit, and the caller commits it with [Self::commit] once transmitted. This way an operation always sends one complete word, and a failed transmission leaves the state untouched.
*/
#[derive(Clone, Debug)]
pub struct DriveState {
    masks: ControlMasks,
    control_word: ControlWord,
    /// logical enable flag, only changed by the `ACTIVATE` command
    pub active: bool,
    /// scale applied to velocity setpoints
    pub speed_override: f64,
    /// (rad/s) last commanded velocity, sent again when the override changes
    pub pending_velocity: f64,
    /// connectivity, gating every write
    pub network_status: NetworkStatus,
}
impl DriveState {
    pub fn new(masks: ControlMasks) -> Self {
        Self {
            masks,
            control_word: masks.initial(),
            active: false,
            speed_override: 1.0,
            pending_velocity: 0.,
            network_status: NetworkStatus::Down,
        }
    }
    pub fn control_word(&self) -> ControlWord  {self.control_word}
    pub fn masks(&self) -> &ControlMasks  {&self.masks}

    /// set switch-on, enable-voltage and enable-operation
    pub fn power_on(&self) -> ControlWord {
        self.set_bits(self.masks.power_on)
    }
    /// clear enable-operation only, see [ControlMasks]
    pub fn power_off(&self) -> ControlWord {
        self.clear_bits(self.masks.power_off)
    }
    pub fn power(&self, on: bool) -> ControlWord {
        if on {self.power_on()} else {self.power_off()}
    }
    /// set or clear the bit enabling motion
    pub fn with_run(&self, on: bool) -> ControlWord {
        if on {self.set_bits(self.masks.run)} else {self.clear_bits(self.masks.run)}
    }
    /// the given word with the new-setpoint bit, it is sent along with a setpoint and never committed
    pub fn with_new_setpoint(&self, word: ControlWord) -> ControlWord {
        ControlWord::from(u16::from(word) | self.masks.new_setpoint)
    }
    /// record the word that has been transmitted
    pub fn commit(&mut self, word: ControlWord) {
        self.control_word = word;
    }

    fn set_bits(&self, mask: u16) -> ControlWord {
        ControlWord::from(u16::from(self.control_word) | mask)
    }
    fn clear_bits(&self, mask: u16) -> ControlWord {
        ControlWord::from(u16::from(self.control_word) & !mask)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::DriveProfile;

    fn boom() -> DriveState  {DriveState::new(DriveProfile::CopleyBoom.masks())}

    #[test]
    fn power_asymmetry() {
        let mut state = boom();
        assert_eq!(u16::from(state.control_word()), 0x20);

        let on = state.power_on();
        assert_eq!(u16::from(on), 0x2b);
        // not committed yet
        assert_eq!(u16::from(state.control_word()), 0x20);
        state.commit(on);

        let off = state.power_off();
        assert_eq!(u16::from(off), 0x23);
        assert!(off.switch_on() && off.enable_voltage() && ! off.enable_operation());
        state.commit(off);
        assert_eq!(state.power_off(), off);
    }

    #[test]
    fn run_and_setpoint() {
        let mut state = boom();
        state.commit(state.power_on());
        let run = state.with_run(true);
        assert_eq!(u16::from(run), 0x2f);
        state.commit(run);
        assert_eq!(u16::from(state.with_new_setpoint(run)), 0x3f);
        assert_eq!(u16::from(state.with_run(false)), 0x2b);
    }
}
