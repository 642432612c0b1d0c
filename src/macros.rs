//! # Internal Macros
//!
//! ## header_accessors!
//!
//! Generates getter and setter methods for zerocopy header fields stored as
//! little-endian wrapper types. Only the widths the wire format uses are
//! supported (`u32`).
//!
//! ```ignore
//! #[repr(C)]
//! struct RowHeader {
//!     schema_id: U32,
//!     row_length: U32,
//! }
//!
//! impl RowHeader {
//!     header_accessors! {
//!         schema_id: u32,
//!         row_length: u32,
//!     }
//! }
//!
//! // Generates:
//! // pub fn schema_id(&self) -> u32 { self.schema_id.get() }
//! // pub fn set_schema_id(&mut self, val: u32) { self.schema_id = U32::new(val); }
//! ```

macro_rules! header_accessors {
    (@impl $field:ident, u32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u32) {
                self.$field = ::zerocopy::little_endian::U32::new(val);
            }
        }
    };
    ($($field:ident : $ty:tt),* $(,)?) => {
        $(
            header_accessors!(@impl $field, $ty);
        )*
    };
}
