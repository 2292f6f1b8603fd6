//! Value codec: native values to and from the store's tagged wire format.

pub mod codec;
pub mod native;
pub mod number;
pub mod wire;

pub use codec::{classify, decode, decode_item, decode_json, encode, encode_item};
pub use native::{Item, NativeValue};
pub use number::{Number, is_numeric_literal};
pub use wire::{PrimitiveTag, WireMap, WireTag, WireValue};
