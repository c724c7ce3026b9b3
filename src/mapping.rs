/*!
    This module provide helper structs to describe the process data objects (PDO) exchanged with the drive, and the layout of dictionnary objects inside each of them.

    It highlights
    - [Slot] to designate one receive or transmit PDO of the drive
    - [PdoConfig] to create a PDO layout by pushing objects, and compute each inserted value's offset
    - [ServoMapping] the complete set of PDOs used by a servo node

    Example

    ```ignore
    let mut pdo = PdoConfig::new(Slot::Receive(3), node);
        let control = pdo.push(&dictionary::CONTROL_WORD)?;
        let target = pdo.push(&dictionary::TARGET_POSITION)?;

    // staging of a payload, the transport does the same with raw values
    let mut payload = [0; MAX_PDO_SIZE];
    control.set(&mut payload, word)?;
    target.set(&mut payload, counts)?;
    ```
*/

use crate::{
    data::{PduData, Field, PackingError, PackingResult, TypeId},
    sdo::Sdo,
    dictionary::{self, ControlWord},
    };
use core::fmt;


/// maximum byte size of a PDO payload, the size of a CAN frame
pub const MAX_PDO_SIZE: usize = 8;
/// maximum number of objects mapped in one PDO
pub const MAX_PDO_ENTRIES: usize = 8;
/// transmission type making a TPDO emitted every second SYNC
pub const SYNC_EVERY_SECOND: u8 = 2;
/// transmission type making a PDO event-driven (manufacturer specific)
pub const EVENT_DRIVEN: u8 = 255;

/// designate one PDO of the drive, numbers start at 1 as in the drive documentation
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Slot {
    /// RPDO: received by the drive, sent by the node
    Receive(u8),
    /// TPDO: transmitted by the drive, received by the node
    Transmit(u8),
}
impl Slot {
    fn offset(&self) -> u16 {
        match self {
            Self::Receive(n) | Self::Transmit(n) => u16::from(n.saturating_sub(1)),
        }
    }
    /// default COB-ID given by the predefined connection set
    pub fn default_cob_id(&self, node: u8) -> u16 {
        let base = match self {
            Self::Receive(_) => 0x200,
            Self::Transmit(_) => 0x180,
        };
        base + 0x100 * self.offset() + u16::from(node)
    }
    /// index of the SDO holding the PDO communication parameters
    pub fn communication_index(&self) -> u16 {
        match self {
            Self::Receive(_) => 0x1400 + self.offset(),
            Self::Transmit(_) => 0x1800 + self.offset(),
        }
    }
    /// index of the SDO holding the PDO mapping
    pub fn mapping_index(&self) -> u16 {
        match self {
            Self::Receive(_) => 0x1600 + self.offset(),
            Self::Transmit(_) => 0x1a00 + self.offset(),
        }
    }
}
impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Receive(n) => write!(f, "RPDO{}", n),
            Self::Transmit(n) => write!(f, "TPDO{}", n),
        }
    }
}

/// one dictionnary object mapped in a PDO
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    pub name: &'static str,
    pub index: u16,
    pub sub: u8,
    pub ty: TypeId,
    /// byte offset in the PDO payload
    pub byte: usize,
    /// byte length in the PDO payload
    pub len: usize,
}
impl Entry {
    /// byte range of this entry in the PDO payload
    pub fn range(&self) -> core::ops::Range<usize> {self.byte .. self.byte + self.len}
}

/// configuration of one PDO: communication parameters and layout
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PdoConfig {
    pub slot: Slot,
    pub cob_id: u16,
    pub transmission: u8,
    pub enabled: bool,
    entries: heapless::Vec<Entry, MAX_PDO_ENTRIES>,
    size: usize,
}
impl PdoConfig {
    /// new empty PDO, with the default COB-ID for the given node and event-driven transmission
    pub fn new(slot: Slot, node: u8) -> Self {
        Self {
            slot,
            cob_id: slot.default_cob_id(node),
            transmission: EVENT_DRIVEN,
            enabled: true,
            entries: heapless::Vec::new(),
            size: 0,
        }
    }
    /// append an object at the end of the PDO, and return its location in the payload
    pub fn push<T: PduData>(&mut self, sdo: &Sdo<T>) -> PackingResult<Field<T>> {
        if self.size + sdo.len > MAX_PDO_SIZE
            {return Err(PackingError::BadSize(self.size + sdo.len, "PDO payload is full"))}
        let field = Field::new(self.size, sdo.len);
        self.entries.push(Entry {
                name: sdo.name,
                index: sdo.index,
                sub: sdo.sub.unwrap(),
                ty: sdo.ty,
                byte: field.byte,
                len: field.len,
            })
            .map_err(|_| PackingError::BadSize(self.entries.len(), "too many objects in PDO"))?;
        self.size += sdo.len;
        Ok(field)
    }
    /// remove all mapped objects
    pub fn clear(&mut self) {
        self.entries.clear();
        self.size = 0;
    }
    /// find a mapped object by its dictionnary name
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
    pub fn entries(&self) -> &[Entry]  {&self.entries}
    /// byte size of the payload
    pub fn size(&self) -> usize  {self.size}
}

/**
    process data layout of a servo node

    Receive PDOs carry the control word along with each setpoint so the drive latches both at once, transmit PDOs carry the drive status.
*/
#[derive(Clone, Debug)]
pub struct ServoMapping {
    /// RPDO1, control word alone
    pub control: PdoConfig,
    /// RPDO3, control word and target position
    pub position: PdoConfig,
    /// RPDO4, control word and target velocity
    pub velocity: PdoConfig,
    /// TPDO1 to TPDO4
    pub status: [PdoConfig; 4],

    pub control_word: Field<ControlWord>,
    pub target_position: Field<i32>,
    pub target_velocity: Field<i32>,
}
impl ServoMapping {
    /// layout the node configures during bring-up
    pub fn new(node: u8) -> PackingResult<Self> {
        let mut mapping = Self::factory(node)?;

        // the factory RPDO4 maps the vl velocity which is ignored in profile modes
        let velocity = &mut mapping.velocity;
        velocity.clear();
        velocity.cob_id = 0x500 + u16::from(node);
        velocity.push(&dictionary::CONTROL_WORD)?;
        mapping.target_velocity = velocity.push(&dictionary::PROFILE_TARGET_VELOCITY)?;

        for pdo in mapping.status.iter_mut() {
            pdo.transmission = SYNC_EVERY_SECOND;
            pdo.enabled = true;
        }
        Ok(mapping)
    }
    /// layout found in a drive fresh from factory, before any remapping
    pub fn factory(node: u8) -> PackingResult<Self> {
        let mut control = PdoConfig::new(Slot::Receive(1), node);
        let control_word = control.push(&dictionary::CONTROL_WORD)?;

        let mut position = PdoConfig::new(Slot::Receive(3), node);
        position.push(&dictionary::CONTROL_WORD)?;
        let target_position = position.push(&dictionary::TARGET_POSITION)?;

        let mut velocity = PdoConfig::new(Slot::Receive(4), node);
        velocity.push(&dictionary::CONTROL_WORD)?;
        let vl = velocity.push(&dictionary::TARGET_VELOCITY)?;

        let mut status = [
            PdoConfig::new(Slot::Transmit(1), node),
            PdoConfig::new(Slot::Transmit(2), node),
            PdoConfig::new(Slot::Transmit(3), node),
            PdoConfig::new(Slot::Transmit(4), node),
            ];
        status[0].push(&dictionary::STATUS_WORD)?;
        status[1].push(&dictionary::STATUS_WORD)?;
        status[1].push(&dictionary::ACTUAL_POSITION)?;
        status[2].push(&dictionary::STATUS_WORD)?;
        status[2].push(&dictionary::ACTUAL_VELOCITY)?;
        status[3].push(&dictionary::ERROR_CODE)?;
        for pdo in status.iter_mut() {
            pdo.enabled = false;
        }

        Ok(Self {
            control,
            position,
            velocity,
            status,
            control_word,
            target_position,
            target_velocity: Field::new(vl.byte, vl.len),
        })
    }
    /// all PDOs of the layout
    pub fn pdos(&self) -> impl Iterator<Item=&PdoConfig> {
        [&self.control, &self.position, &self.velocity].into_iter()
            .chain(self.status.iter())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cob_ids() {
        assert_eq!(Slot::Receive(1).default_cob_id(5), 0x205);
        assert_eq!(Slot::Receive(4).default_cob_id(5), 0x505);
        assert_eq!(Slot::Transmit(1).default_cob_id(5), 0x185);
        assert_eq!(Slot::Transmit(3).default_cob_id(5), 0x385);
        assert_eq!(Slot::Receive(4).mapping_index(), 0x1603);
        assert_eq!(Slot::Transmit(2).communication_index(), 0x1801);
    }

    #[test]
    fn layout() {
        let mapping = ServoMapping::new(3).unwrap();
        assert_eq!(mapping.velocity.cob_id, 0x503);
        assert_eq!(mapping.velocity.size(), 6);
        assert_eq!(mapping.velocity.entry("Profile target velocity").unwrap().range(), 2 .. 6);
        assert!(mapping.velocity.entry("Target velocity").is_none());
        assert_eq!(mapping.target_position, Field::new(2, 4));
        assert!(mapping.status.iter().all(|pdo| pdo.enabled && pdo.transmission == SYNC_EVERY_SECOND));

        let factory = ServoMapping::factory(3).unwrap();
        assert_eq!(factory.velocity.size(), 4);
        assert!(factory.velocity.entry("Profile target velocity").is_none());
    }

    #[test]
    fn full_payload() {
        let mut pdo = PdoConfig::new(Slot::Receive(2), 1);
        pdo.push(&dictionary::TARGET_POSITION).unwrap();
        pdo.push(&dictionary::PROFILE_TARGET_VELOCITY).unwrap();
        assert!(pdo.push(&dictionary::CONTROL_WORD).is_err());
        assert_eq!(pdo.size(), MAX_PDO_SIZE);
    }
}
