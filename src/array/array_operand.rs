//! Dynamically typed values for [`Array::assign`](super::Array::assign).
//!
//! A binding layer converts host values into an [`Operand`]: a [`Scalar`] that broadcasts to the whole selection, or an array of scalars that must match the selection shape.
//! Numeric scalars are converted to the array data type on assignment.

use derive_more::Display;

use super::{ArrayShape, Element};

/// A dynamically typed scalar value.
#[derive(Clone, Debug, PartialEq, Display)]
pub enum Scalar {
    /// A boolean, converted to `0` or `1`.
    #[display("{_0}")]
    Bool(bool),
    /// A signed integer.
    #[display("{_0}")]
    Int(i64),
    /// An unsigned integer.
    #[display("{_0}")]
    UInt(u64),
    /// A floating point number.
    #[display("{_0}")]
    Float(f64),
    /// A string. Never convertible to a numeric data type.
    #[display("{_0:?}")]
    Text(String),
    /// Any other value, described by its type name. Never convertible to a numeric data type.
    #[display("<{_0}>")]
    Object(String),
}

impl Scalar {
    /// The name of the type of the scalar.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Text(_) => "str",
            Self::Object(_) => "object",
        }
    }

    /// Returns true if the scalar is a number or a boolean.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        !matches!(self, Self::Text(_) | Self::Object(_))
    }
}

macro_rules! impl_scalar_from {
    ($variant:ident, $target:ty, $($type:ty),*) => {
        $(
            impl From<$type> for Scalar {
                fn from(value: $type) -> Self {
                    Self::$variant(<$target>::from(value))
                }
            }

            impl From<$type> for Operand {
                fn from(value: $type) -> Self {
                    Self::Scalar(value.into())
                }
            }
        )*
    };
}

impl_scalar_from!(Bool, bool, bool);
impl_scalar_from!(Int, i64, i8, i16, i32, i64);
impl_scalar_from!(UInt, u64, u8, u16, u32, u64);
impl_scalar_from!(Float, f64, f32, f64);
impl_scalar_from!(Text, String, String, &str);

/// The right hand side of an assignment.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// A scalar, broadcast to every selected element.
    Scalar(Scalar),
    /// An array of scalars in C order.
    Array {
        /// The shape of the array.
        shape: ArrayShape,
        /// The elements of the array.
        elements: Vec<Scalar>,
    },
}

impl From<Scalar> for Operand {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl Operand {
    /// Create an array operand.
    #[must_use]
    pub fn array(shape: ArrayShape, elements: Vec<Scalar>) -> Self {
        Self::Array { shape, elements }
    }

    /// Create an array operand from typed elements.
    #[must_use]
    pub fn from_ndarray<T: Element + Into<Scalar>>(array: &ndarray::ArrayViewD<T>) -> Self {
        Self::Array {
            shape: array.shape().iter().map(|&size| size as u64).collect(),
            elements: array.iter().map(|&element| element.into()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_from() {
        assert_eq!(Scalar::from(3u8), Scalar::UInt(3));
        assert_eq!(Scalar::from(-3i32), Scalar::Int(-3));
        assert_eq!(Scalar::from(1.5f32), Scalar::Float(1.5));
        assert_eq!(Scalar::from(true), Scalar::Bool(true));
        assert_eq!(Scalar::from("a"), Scalar::Text("a".to_string()));
        assert!(!Scalar::from("a").is_numeric());
        assert_eq!(Scalar::Object("dict".to_string()).to_string(), "<dict>");
    }

    #[test]
    fn operand_from_ndarray() {
        let array = ndarray::ArrayD::<i64>::zeros(vec![2, 3]);
        let Operand::Array { shape, elements } = Operand::from_ndarray(&array.view()) else {
            panic!()
        };
        assert_eq!(shape, vec![2, 3]);
        assert_eq!(elements.len(), 6);
        assert_eq!(Operand::from(Scalar::Int(1)), Operand::Scalar(Scalar::Int(1)));
    }
}
