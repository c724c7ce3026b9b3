//! Traits and impls used to read/write process data values to/from a PDO payload.

use core::{
	marker::PhantomData,
	fmt,
	};

/**
	trait for data types than can be packed/unpacked to/from a PDO payload
*/
pub trait PduData: Sized {
    const ID: TypeId;
    type Packed: Storage;

    fn pack(&self, dst: &mut [u8]) -> PackingResult<()>;
    fn unpack(src: &[u8]) -> PackingResult<Self>;
}

/** Enum to identify and raise adapted error raised by this package
*/
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PackingError {
    BadSize(usize, &'static str),
    InvalidValue(&'static str),
}

pub type PackingResult<T> = Result<T, PackingError>;

impl fmt::Display for PackingError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::BadSize(size, text) => write!(f, "bad size {}: {}", size, text),
			Self::InvalidValue(text) => write!(f, "invalid value: {}", text),
		}
	}
}


/// fixed size byte storage of a packed value, `[u8; N]` is the only implementor
pub trait Storage: AsRef<[u8]> + AsMut<[u8]> {
    const LEN: usize;
}
impl<const N: usize> Storage for [u8; N] {
    const LEN: usize = N;
}

/** dtype identifiers associated to dtypes allowing to dynamically check the type of a [PduData] implementor

	It is only convering the common integer types found in a drive's dictionnary. Bitfields are [TypeId::CUSTOM] and behave as unsigned integers of their packed size.
*/
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TypeId {
	/// default value of the enum, used in case the matching [PduData] does not fit in any of these integers
	CUSTOM,
	VOID,
	I8, I16, I32,
	U8, U16, U32,
}
impl TypeId {
	pub fn signed(&self) -> bool {
		matches!(self, Self::I8 | Self::I16 | Self::I32)
	}
}

impl PduData for () {
	const ID: TypeId = TypeId::VOID;
	type Packed = [u8; 0];

	fn pack(&self, _dst: &mut [u8]) -> PackingResult<()>  {Ok(())}
	fn unpack(_src: &[u8]) -> PackingResult<Self>  {Ok(())}
}

/// macro implementing [PduData] for a given struct generated with `bilge`, through its backing integer
macro_rules! bilge_pdudata {
    ($t: ty, $id: ty) => { impl crate::data::PduData for $t {
        const ID: crate::data::TypeId = crate::data::TypeId::CUSTOM;
        type Packed = <$id as crate::data::PduData>::Packed;

        fn pack(&self, dst: &mut [u8]) -> crate::data::PackingResult<()> {
            crate::data::PduData::pack(&<$id>::from(*self), dst)
        }
        fn unpack(src: &[u8]) -> crate::data::PackingResult<Self> {
            Ok(Self::from(<$id as crate::data::PduData>::unpack(src)?))
        }
    }};
}
pub(crate) use bilge_pdudata;

/// macro implementing [PduData] for numeric types
macro_rules! num_pdudata {
	($t: ty, $id: ident) => { impl crate::data::PduData for $t {
			const ID: crate::data::TypeId = crate::data::TypeId::$id;
            type Packed = [u8; core::mem::size_of::<$t>()];

            fn pack(&self, dst: &mut [u8]) -> crate::data::PackingResult<()> {
                if dst.len() != Self::Packed::LEN
                    {return Err(crate::data::PackingError::BadSize(dst.len(), "integer needs exact size"))}
				dst.copy_from_slice(&self.to_le_bytes());
				Ok(())
			}
			fn unpack(src: &[u8]) -> crate::data::PackingResult<Self> {
				Ok(Self::from_le_bytes(src
					.try_into()
					.map_err(|_|  crate::data::PackingError::BadSize(src.len(), "integer needs exact size"))?
					))
			}
		}};
}

num_pdudata!(u8, U8);
num_pdudata!(u16, U16);
num_pdudata!(u32, U32);
num_pdudata!(i8, I8);
num_pdudata!(i16, I16);
num_pdudata!(i32, I32);


/**
	pack a raw integer in the given little endian slot, checking it fits the slot and the dtype

	This is what a transport does when it is given a mapped value without knowing its rust type.
*/
pub fn pack_raw(ty: TypeId, raw: i64, dst: &mut [u8]) -> PackingResult<()> {
	let len = dst.len();
	if len == 0 || len > 8
		{return Err(PackingError::BadSize(len, "raw values are 1 to 8 bytes"))}
	let bits = 8*len as u32;
	let fits = if ty.signed() || bits == 64 {
		bits == 64 || (raw >= -(1i64 << (bits-1)) && raw < (1i64 << (bits-1)))
	} else {
		raw >= 0 && raw < (1i64 << bits)
	};
	if ! fits
		{return Err(PackingError::InvalidValue("raw value does not fit its mapped size"))}
	dst.copy_from_slice(&raw.to_le_bytes()[.. len]);
	Ok(())
}

/// unpack a raw integer from the given little endian slot, sign extending it if the dtype is signed
pub fn unpack_raw(ty: TypeId, src: &[u8]) -> PackingResult<i64> {
	let len = src.len();
	if len == 0 || len > 8
		{return Err(PackingError::BadSize(len, "raw values are 1 to 8 bytes"))}
	let mut bytes = [0u8; 8];
	bytes[.. len].copy_from_slice(src);
	if ty.signed() && src[len-1] & 0x80 != 0 {
		bytes[len ..].fill(0xff);
	}
	Ok(i64::from_le_bytes(bytes))
}



/**
	locate some data in a PDO payload by its byte position and length, which must be extracted to type `T` to be processed in rust

	It acts like a getter/setter of a value in a byte sequence. One can think of it as an offset to a data location because it does not actually point the data but only its offset in the byte sequence, it also contains its length to dynamically check memory bounds.
*/
#[derive(Default, Eq, Hash)]
pub struct Field<T: PduData> {
    /// this is only here to mark that T is actually used
	extracted: PhantomData<T>,
	/// start byte index of the object
	pub byte: usize,
	/// byte length of the object
	pub len: usize,
}
impl<T: PduData> Field<T>
{
	/// build a Field from its byte offset and byte length
	pub const fn new(byte: usize, len: usize) -> Self {
		Self{extracted: PhantomData, byte, len}
	}
	/// build a Field from its byte offset, infering its length from the data nominal size
	pub const fn simple(byte: usize) -> Self {
        Self{extracted: PhantomData, byte, len: T::Packed::LEN}
	}

	/// extract the value pointed by the field in the given byte array
	pub fn get(&self, data: &[u8]) -> PackingResult<T>  {
		T::unpack(data.get(self.byte .. self.byte + self.len)
			.ok_or(PackingError::BadSize(data.len(), "field is out of the data"))?)
	}
	/// dump the given value to the place pointed by the field in the byte array
	pub fn set(&self, data: &mut [u8], value: T) -> PackingResult<()>  {
		let size = data.len();
        value.pack(data.get_mut(self.byte .. self.byte + self.len)
			.ok_or(PackingError::BadSize(size, "field is out of the data"))?)
	}
}
impl<T: PduData> fmt::Debug for Field<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Field{{0x{:x}, {}}}", self.byte, self.len)
	}
}
// [Clone] and [Copy] must be implemented manually to allow copying a field pointing to a type which does not implement this operation
impl<T: PduData> Clone for Field<T> {
    fn clone(&self) -> Self   {Self::new(self.byte, self.len)}
}
impl<T: PduData> Copy for Field<T> {}
impl<T: PduData> PartialEq for Field<T> {
    fn eq(&self, other: &Self) -> bool {
        self.byte == other.byte && self.len == other.len
    }
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn field_in_payload() {
		let mut payload = [0u8; 6];
		let word = Field::<u16>::simple(0);
		let target = Field::<i32>::simple(2);
		word.set(&mut payload, 0x2f).unwrap();
		target.set(&mut payload, -2).unwrap();
		assert_eq!(payload, [0x2f, 0, 0xfe, 0xff, 0xff, 0xff]);
		assert_eq!(target.get(&payload).unwrap(), -2);
		assert!(Field::<i32>::simple(4).get(&payload).is_err());
	}

	#[test]
	fn raw_sign_extension() {
		let mut slot = [0u8; 2];
		pack_raw(TypeId::I16, -300, &mut slot).unwrap();
		assert_eq!(unpack_raw(TypeId::I16, &slot).unwrap(), -300);
		// the same bytes read unsigned
		assert_eq!(unpack_raw(TypeId::U16, &slot).unwrap(), 0xfed4);
	}

	#[test]
	fn raw_range() {
		let mut slot = [0u8; 2];
		assert_eq!(
			pack_raw(TypeId::I16, 40_000, &mut slot),
			Err(PackingError::InvalidValue("raw value does not fit its mapped size")),
			);
		assert!(pack_raw(TypeId::U16, -1, &mut slot).is_err());
		assert!(pack_raw(TypeId::CUSTOM, 0xffff, &mut slot).is_ok());
		let mut wide = [0u8; 4];
		assert!(pack_raw(TypeId::I32, i32::MAX as i64 + 1, &mut wide).is_err());
		assert!(pack_raw(TypeId::I32, i32::MIN as i64, &mut wide).is_ok());
	}
}
