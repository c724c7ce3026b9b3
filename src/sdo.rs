/*!
Convenient structures to designate the drive's dictionnary objects (SDO).

An [Sdo] only describes where an object lives in the dictionnary and how it is packed, it does not hold its value. Objects are written either once through the transport's remote invocation (configuration objects), or mapped into a PDO slot for cyclic exchange (see [crate::mapping]).

```ignore
// typical object declaration
const TARGET_POSITION: Sdo<i32> = Sdo::complete(0x607a, "Profile target position");

// configuration write during bring-up
transport.invoke_remote(&PROFILE_ACCELERATION.downcast(), 500_000)?;

// mapping for realtime use
let target = pdo.push(&TARGET_POSITION)?;
```
*/

use crate::data::{PduData, TypeId, Storage};
use core::{
	fmt,
	marker::PhantomData,
	};


/// description of an SDO's subitem, not a SDO itself
pub struct Sdo<T: PduData = ()> {
	/// index of the item in the drive's dictionnary of objects
	pub index: u16,
	/// subindex in the item
	pub sub: SdoPart,
	/// name of the object as it appears in the drive's object dictionnary
	pub name: &'static str,
	/// dtype of the value, kept when the sdo is downcasted
	pub ty: TypeId,
	/// byte size of the value, kept when the sdo is downcasted
	pub len: usize,
	typed: PhantomData<T>,
}
/// specifies which par of an SDO is addressed
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SdoPart {
    /// the whole SDO (the complete struct with its eventual paddings)
    Complete,
    /// one subitem value in the SDO
    Sub(u8),
}
impl<T: PduData> Sdo<T> {
	/// address a complete sdo at the given index, with `sub=0`
	pub const fn complete(index: u16, name: &'static str) -> Self { Self{
		index,
		sub: SdoPart::Complete,
		name,
		ty: T::ID,
		len: T::Packed::LEN,
		typed: PhantomData,
	}}
	/// forget the rust type of the value, keeping its dtype and size
	pub const fn downcast(&self) -> Sdo { Sdo{
		index: self.index,
		sub: self.sub,
		name: self.name,
		ty: self.ty,
		len: self.len,
		typed: PhantomData,
	}}
}
impl SdoPart {
    /// return the subindex or 0 for a complete item
    pub fn unwrap(self) -> u8 { match self {
            Self::Complete => 0,
            Self::Sub(i) => i,
    }}
}
impl<T: PduData> fmt::Debug for Sdo<T> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "Sdo {{index: {:x}, sub: {:?}, name: {:?}}}", self.index, self.sub, self.name)
	}
}
// [Clone] and [Copy] must be implemented manually to allow copying a descriptor of a type which does not implement this operation
impl<T: PduData> Clone for Sdo<T> {
	fn clone(&self) -> Self {*self}
}
impl<T: PduData> Copy for Sdo<T> {}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn downcast_keeps_layout() {
		const ACCELERATION: Sdo<u32> = Sdo::complete(0x6083, "Profile acceleration");
		let untyped = ACCELERATION.downcast();
		assert_eq!(untyped.index, 0x6083);
		assert_eq!(untyped.sub.unwrap(), 0);
		assert_eq!(untyped.ty, TypeId::U32);
		assert_eq!(untyped.len, 4);
		assert_eq!(untyped.name, "Profile acceleration");
	}
}
