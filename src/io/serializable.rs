//! # RowSerializable
//!
//! Types that know how to write themselves into a row. Scalars write one
//! field; containers open their own scope and write their members into it.
//!
//! | Rust type | Type argument |
//! |-----------|---------------|
//! | `bool`, integers, floats, `Decimal` | the matching scalar code |
//! | `&str`, `String` | `utf8` |
//! | `Vec<T>` | `typed_array<T>` |
//! | `Option<T>` | `nullable<T>` (`None` is an empty scope) |
//!
//! ```ignore
//! RowWriter::write_buffer(&mut buffer, |w| {
//!     w.write_serializable("scores", &vec![1i32, 2, 3])?;
//!     w.write_serializable("nick", &Some("ada".to_string()))
//! })?;
//! ```

use crate::error::{HybridRowError, Result};
use crate::io::writer::RowWriter;
use crate::layouts::{LayoutCode, TypeArgument};
use crate::row::{Decimal, FieldValue};

pub trait RowSerializable {
    /// Type argument this type is written as.
    fn type_arg() -> TypeArgument;

    /// Writes `self` at `path` as a value of `type_arg`.
    fn write(&self, writer: &mut RowWriter<'_>, path: &str, type_arg: &TypeArgument) -> Result<()>;
}

macro_rules! serializable_scalar {
    ($($ty:ty => $code:ident),* $(,)?) => {
        $(
            impl RowSerializable for $ty {
                fn type_arg() -> TypeArgument {
                    TypeArgument::scalar(LayoutCode::$code)
                }

                fn write(&self, writer: &mut RowWriter<'_>, path: &str, type_arg: &TypeArgument) -> Result<()> {
                    let value = FieldValue::from(*self);
                    if type_arg.code != value.code() {
                        return Err(HybridRowError::mismatch(path, type_arg, value.code()));
                    }
                    writer.write_value(path, &value)
                }
            }
        )*
    };
}

serializable_scalar! {
    bool => Boolean,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    Decimal => Decimal,
}

fn write_text(writer: &mut RowWriter<'_>, path: &str, type_arg: &TypeArgument, text: &str) -> Result<()> {
    if type_arg.code != LayoutCode::Utf8 {
        return Err(HybridRowError::mismatch(path, type_arg, LayoutCode::Utf8));
    }
    writer.write_utf8(path, text)
}

impl RowSerializable for &str {
    fn type_arg() -> TypeArgument {
        TypeArgument::scalar(LayoutCode::Utf8)
    }

    fn write(&self, writer: &mut RowWriter<'_>, path: &str, type_arg: &TypeArgument) -> Result<()> {
        write_text(writer, path, type_arg, self)
    }
}

impl RowSerializable for String {
    fn type_arg() -> TypeArgument {
        TypeArgument::scalar(LayoutCode::Utf8)
    }

    fn write(&self, writer: &mut RowWriter<'_>, path: &str, type_arg: &TypeArgument) -> Result<()> {
        write_text(writer, path, type_arg, self)
    }
}

fn item_type<'t>(path: &str, type_arg: &'t TypeArgument, code: LayoutCode) -> Result<&'t TypeArgument> {
    if type_arg.code != code {
        return Err(HybridRowError::mismatch(path, code, type_arg.code));
    }
    type_arg
        .type_args
        .first()
        .ok_or_else(|| HybridRowError::schema(format!("{} without an item type", code)))
}

impl<T: RowSerializable> RowSerializable for Vec<T> {
    fn type_arg() -> TypeArgument {
        TypeArgument::typed_array(T::type_arg())
    }

    fn write(&self, writer: &mut RowWriter<'_>, path: &str, type_arg: &TypeArgument) -> Result<()> {
        let item = item_type(path, type_arg, LayoutCode::TypedArray)?;
        writer.write_scope(path, type_arg, |scope| {
            self.iter().try_for_each(|value| value.write(scope, "", item))
        })
    }
}

impl<T: RowSerializable> RowSerializable for Option<T> {
    fn type_arg() -> TypeArgument {
        TypeArgument::nullable(T::type_arg())
    }

    fn write(&self, writer: &mut RowWriter<'_>, path: &str, type_arg: &TypeArgument) -> Result<()> {
        let inner = item_type(path, type_arg, LayoutCode::Nullable)?;
        writer.write_scope(path, type_arg, |scope| match self {
            Some(value) => value.write(scope, "", inner),
            None => Ok(()),
        })
    }
}

impl RowWriter<'_> {
    /// Writes `value` at `path` using its own type argument.
    pub fn write_serializable<T: RowSerializable>(&mut self, path: &str, value: &T) -> Result<()> {
        value.write(self, path, &T::type_arg())
    }
}
