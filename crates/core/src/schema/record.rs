//! Compile-time record descriptors.
//!
//! Types opt into typed marshaling by implementing [`Record`], usually through
//! the [`record!`](crate::record) macro:
//!
//! ```
//! use dynakit_core::record;
//!
//! #[derive(Debug, Default)]
//! struct Order {
//!     id: String,
//!     quantity: i64,
//! }
//!
//! record!(Order {
//!     id: String => r#"json:"id""#,
//!     quantity: i64 => r#"json:"qty,omitempty""#,
//! });
//! ```

use crate::store::AttributeValue;

use super::{ConversionError, FieldDecl, FieldKind};

/// A type whose fields can be marshaled to and from store items.
pub trait Record: Send + Sync + 'static {
    /// Declared fields, in declaration order.
    const FIELDS: &'static [FieldDecl];

    /// Current value of `field`; `None` when it has nothing to write.
    fn field_value(&self, field: &str) -> Option<AttributeValue>;

    /// Whether `field` holds its empty value.
    fn field_is_empty(&self, field: &str) -> bool;

    /// Overwrites `field` from a stored attribute.
    fn set_field(&mut self, field: &str, value: &AttributeValue) -> Result<(), ConversionError>;
}

/// A field type with a fixed attribute representation.
pub trait AttributeField: Sized {
    const KIND: FieldKind;

    fn to_attribute(&self) -> Option<AttributeValue>;

    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError>;

    fn is_empty_value(&self) -> bool;
}

fn mismatch(expected: FieldKind, found: &AttributeValue) -> ConversionError {
    ConversionError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

impl AttributeField for String {
    const KIND: FieldKind = FieldKind::String;

    fn to_attribute(&self) -> Option<AttributeValue> {
        Some(AttributeValue::S(self.clone()))
    }

    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
        match value {
            AttributeValue::S(s) => Ok(s.clone()),
            other => Err(mismatch(Self::KIND, other)),
        }
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

macro_rules! numeric_field {
    ($kind:expr, $zero:expr, $($t:ty),+) => {
        $(
            impl AttributeField for $t {
                const KIND: FieldKind = $kind;

                fn to_attribute(&self) -> Option<AttributeValue> {
                    Some(AttributeValue::N(self.to_string()))
                }

                fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
                    match value {
                        AttributeValue::N(n) => {
                            n.trim().parse::<$t>().map_err(|_| ConversionError::InvalidNumber {
                                value: n.clone(),
                                expected: Self::KIND,
                            })
                        }
                        other => Err(mismatch(Self::KIND, other)),
                    }
                }

                fn is_empty_value(&self) -> bool {
                    *self == $zero
                }
            }
        )+
    };
}

numeric_field!(FieldKind::Integer, 0, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
numeric_field!(FieldKind::Float, 0.0, f32, f64);

impl AttributeField for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn to_attribute(&self) -> Option<AttributeValue> {
        Some(AttributeValue::Bool(*self))
    }

    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
        match value {
            AttributeValue::Bool(b) => Ok(*b),
            other => Err(mismatch(Self::KIND, other)),
        }
    }

    fn is_empty_value(&self) -> bool {
        !*self
    }
}

impl AttributeField for Vec<u8> {
    const KIND: FieldKind = FieldKind::Binary;

    fn to_attribute(&self) -> Option<AttributeValue> {
        Some(AttributeValue::B(self.clone()))
    }

    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
        match value {
            AttributeValue::B(bytes) => Ok(bytes.clone()),
            other => Err(mismatch(Self::KIND, other)),
        }
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl AttributeField for Vec<String> {
    const KIND: FieldKind = FieldKind::StringList;

    fn to_attribute(&self) -> Option<AttributeValue> {
        Some(AttributeValue::L(
            self.iter().cloned().map(AttributeValue::S).collect(),
        ))
    }

    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
        match value {
            AttributeValue::Ss(values) => Ok(values.clone()),
            AttributeValue::L(values) => values.iter().map(String::from_attribute).collect(),
            other => Err(mismatch(Self::KIND, other)),
        }
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T: AttributeField> AttributeField for Option<T> {
    const KIND: FieldKind = T::KIND;

    fn to_attribute(&self) -> Option<AttributeValue> {
        self.as_ref().and_then(T::to_attribute)
    }

    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
        match value {
            AttributeValue::Null(_) => Ok(None),
            other => T::from_attribute(other).map(Some),
        }
    }

    fn is_empty_value(&self) -> bool {
        self.as_ref().is_none_or(T::is_empty_value)
    }
}

/// Implements [`Record`](crate::schema::Record) for a struct from a list of
/// `field: Type => "raw tag"` declarations.
///
/// Field types must implement [`AttributeField`](crate::schema::AttributeField).
#[macro_export]
macro_rules! record {
    ($ty:ty { $($field:ident : $fty:ty => $tag:literal),* $(,)? }) => {
        impl $crate::schema::Record for $ty {
            const FIELDS: &'static [$crate::schema::FieldDecl] = &[
                $(
                    $crate::schema::FieldDecl::new(
                        stringify!($field),
                        <$fty as $crate::schema::AttributeField>::KIND,
                        $tag,
                    ),
                )*
            ];

            fn field_value(
                &self,
                field: &str,
            ) -> ::core::option::Option<$crate::store::AttributeValue> {
                match field {
                    $(
                        stringify!($field) => {
                            <$fty as $crate::schema::AttributeField>::to_attribute(&self.$field)
                        }
                    )*
                    _ => ::core::option::Option::None,
                }
            }

            fn field_is_empty(&self, field: &str) -> bool {
                match field {
                    $(
                        stringify!($field) => {
                            <$fty as $crate::schema::AttributeField>::is_empty_value(&self.$field)
                        }
                    )*
                    _ => true,
                }
            }

            fn set_field(
                &mut self,
                field: &str,
                value: &$crate::store::AttributeValue,
            ) -> ::core::result::Result<(), $crate::schema::ConversionError> {
                match field {
                    $(
                        stringify!($field) => {
                            self.$field =
                                <$fty as $crate::schema::AttributeField>::from_attribute(value)?;
                            ::core::result::Result::Ok(())
                        }
                    )*
                    _ => ::core::result::Result::Err($crate::schema::ConversionError::UnknownField),
                }
            }
        }
    };
}
