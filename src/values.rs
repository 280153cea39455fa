use std::fmt;

use hdf5::types::{FloatSize, IntSize, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Container, Group};
use nalgebra::Vector3;
use ndarray::ArrayD;

use crate::error::SnapshotError;
use crate::raw::{RawValues, Target};

macro_rules! impl_values {
    (
        float [$($fv:ident($ft:ty) => $fpat:pat),*]
        int [$($iv:ident($it:ty) => $ipat:pat),*]
        other [$($ov:ident($ot:ty) => $opat:pat),*]
    ) => {
        /// Contents of one HDF5 dataset or attribute, in its stored element type.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Values {
            $($fv(ArrayD<$ft>),)*
            $($iv(ArrayD<$it>),)*
            $($ov(ArrayD<$ot>),)*
            Raw(RawValues),
        }

        impl Values {
            pub fn read(container: &Container, name: &str) -> anyhow::Result<Self> {
                let values = match container.dtype()?.to_descriptor() {
                    $(Ok($fpat) => Self::$fv(container.read_dyn::<$ft>()?),)*
                    $(Ok($ipat) => Self::$iv(container.read_dyn::<$it>()?),)*
                    $(Ok($opat) => Self::$ov(container.read_dyn::<$ot>()?),)*
                    descriptor => Self::Raw(RawValues::read(container, descriptor.ok(), name)?),
                };
                Ok(values)
            }

            #[must_use]
            pub fn shape(&self) -> &[usize] {
                match self {
                    $(Self::$fv(a) => a.shape(),)*
                    $(Self::$iv(a) => a.shape(),)*
                    $(Self::$ov(a) => a.shape(),)*
                    Self::Raw(r) => r.shape(),
                }
            }

            /// Numeric contents in logical order, widened to f64.
            #[must_use]
            pub fn to_f64(&self) -> Option<Vec<f64>> {
                match self {
                    $(Self::$fv(a) => Some(a.iter().map(|&x| x as f64).collect()),)*
                    $(Self::$iv(a) => Some(a.iter().map(|&x| x as f64).collect()),)*
                    _ => None,
                }
            }

            /// Subtracts `shift` from every row of an N×3 floating dataset.
            pub fn sub_vector(&mut self, what: &str, shift: &Vector3<f64>) -> Result<(), SnapshotError> {
                self.vector_count(what)?;
                let type_name = self.type_name();
                match self {
                    $(Self::$fv(a) => a.iter_mut().enumerate().for_each(|(i, x)| {
                        *x = (*x as f64 - shift[i % 3]) as $ft;
                    }),)*
                    _ => {
                        return Err(SnapshotError::UnsupportedType {
                            name: what.to_string(),
                            descriptor: type_name.to_string(),
                        })
                    }
                }
                Ok(())
            }

            #[must_use]
            pub fn type_name(&self) -> &'static str {
                match self {
                    $(Self::$fv(_) => stringify!($ft),)*
                    $(Self::$iv(_) => stringify!($it),)*
                    $(Self::$ov(_) => stringify!($ot),)*
                    Self::Raw(r) => r.type_name(),
                }
            }

            pub(crate) fn write_dataset(&self, group: &Group, name: &str) -> anyhow::Result<()> {
                match self {
                    $(Self::$fv(a) => drop(group.new_dataset_builder().with_data(a).create(name)?),)*
                    $(Self::$iv(a) => drop(group.new_dataset_builder().with_data(a).create(name)?),)*
                    $(Self::$ov(a) => drop(group.new_dataset_builder().with_data(a).create(name)?),)*
                    Self::Raw(r) => r.write(group, name, Target::Dataset)?,
                }
                Ok(())
            }

            pub(crate) fn write_attr(&self, group: &Group, name: &str) -> anyhow::Result<()> {
                match self {
                    $(Self::$fv(a) => drop(group.new_attr_builder().with_data(a).create(name)?),)*
                    $(Self::$iv(a) => drop(group.new_attr_builder().with_data(a).create(name)?),)*
                    $(Self::$ov(a) => drop(group.new_attr_builder().with_data(a).create(name)?),)*
                    Self::Raw(r) => r.write(group, name, Target::Attribute)?,
                }
                Ok(())
            }
        }

        impl fmt::Display for Values {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$fv(a) => write!(f, "{a}"),)*
                    $(Self::$iv(a) => write!(f, "{a}"),)*
                    $(Self::$ov(a) => write!(f, "{a}"),)*
                    Self::Raw(r) => write!(f, "{r}"),
                }
            }
        }
    };
}

impl_values! {
    float [
        F32(f32) => TypeDescriptor::Float(FloatSize::U4),
        F64(f64) => TypeDescriptor::Float(FloatSize::U8)
    ]
    int [
        I8(i8) => TypeDescriptor::Integer(IntSize::U1),
        I16(i16) => TypeDescriptor::Integer(IntSize::U2),
        I32(i32) => TypeDescriptor::Integer(IntSize::U4),
        I64(i64) => TypeDescriptor::Integer(IntSize::U8),
        U8(u8) => TypeDescriptor::Unsigned(IntSize::U1),
        U16(u16) => TypeDescriptor::Unsigned(IntSize::U2),
        U32(u32) => TypeDescriptor::Unsigned(IntSize::U4),
        U64(u64) => TypeDescriptor::Unsigned(IntSize::U8)
    ]
    other [
        Bool(bool) => TypeDescriptor::Boolean,
        Utf8(VarLenUnicode) => TypeDescriptor::VarLenUnicode,
        Ascii(VarLenAscii) => TypeDescriptor::VarLenAscii
    ]
}

impl Values {
    /// Particle count: the first dimension, `None` for scalars.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        self.shape().first().copied()
    }

    /// Number of rows of an N×3 dataset.
    pub fn vector_count(&self, what: &str) -> Result<usize, SnapshotError> {
        match *self.shape() {
            [n, 3] => Ok(n),
            _ => Err(SnapshotError::InvalidShape {
                what: what.to_string(),
                shape: self.shape().to_vec(),
            }),
        }
    }

    pub fn to_vectors(&self, what: &str) -> Result<Vec<Vector3<f64>>, SnapshotError> {
        self.vector_count(what)?;
        let flat = self.to_f64().ok_or_else(|| SnapshotError::UnsupportedType {
            name: what.to_string(),
            descriptor: self.type_name().to_string(),
        })?;
        Ok(flat
            .chunks_exact(3)
            .map(|c| Vector3::new(c[0], c[1], c[2]))
            .collect())
    }

    pub fn to_scalars(&self, what: &str) -> Result<Vec<f64>, SnapshotError> {
        if self.shape().len() != 1 {
            return Err(SnapshotError::InvalidShape {
                what: what.to_string(),
                shape: self.shape().to_vec(),
            });
        }
        self.to_f64().ok_or_else(|| SnapshotError::UnsupportedType {
            name: what.to_string(),
            descriptor: self.type_name().to_string(),
        })
    }
}

macro_rules! impl_from_array {
    ($($v:ident($t:ty)),*) => ($(
        impl From<ArrayD<$t>> for Values {
            fn from(a: ArrayD<$t>) -> Self {
                Self::$v(a)
            }
        }
    )*)
}

impl_from_array! { F32(f32), F64(f64), I32(i32), I64(i64), U32(u32), U64(u64) }

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::{assert_f32_near, assert_f64_near};
    use ndarray::{arr1, arr2};

    #[test]
    fn test_sub_vector_keeps_type() {
        let mut values = Values::from(arr2(&[[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]]).into_dyn());
        values
            .sub_vector("Coordinates", &Vector3::new(1.0, 1.0, 1.0))
            .unwrap();
        let Values::F32(a) = &values else {
            panic!("type changed: {}", values.type_name());
        };
        let got = a.iter().copied().collect::<Vec<_>>();
        for (got, want) in got.into_iter().zip([0.0f32, 1.0, 2.0, 3.0, 4.0, 5.0]) {
            assert_f32_near!(got, want);
        }
    }

    #[test]
    fn test_sub_vector_rejects_bad_input() {
        let mut flat = Values::from(arr1(&[1.0f64, 2.0, 3.0]).into_dyn());
        assert!(matches!(
            flat.sub_vector("Velocities", &Vector3::zeros()),
            Err(SnapshotError::InvalidShape { .. })
        ));
        let mut ints = Values::from(arr2(&[[1i32, 2, 3]]).into_dyn());
        assert!(matches!(
            ints.sub_vector("Coordinates", &Vector3::zeros()),
            Err(SnapshotError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_to_vectors_and_scalars() {
        let values = Values::from(arr2(&[[1.0f64, 2.0, 3.0], [4.0, 5.0, 6.0]]).into_dyn());
        assert_eq!(values.len(), Some(2));
        let vectors = values.to_vectors("Coordinates").unwrap();
        assert_eq!(vectors, vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0)]);
        assert!(values.to_scalars("Masses").is_err());

        let masses = Values::from(arr1(&[1u32, 2]).into_dyn());
        let masses = masses.to_scalars("Masses").unwrap();
        assert_f64_near!(masses[0], 1.0);
        assert_f64_near!(masses[1], 2.0);
    }

    #[test]
    fn test_scalar_has_no_len() {
        let time = Values::from(ndarray::arr0(0.5f64).into_dyn());
        assert_eq!(time.len(), None);
        assert_eq!(time.to_f64(), Some(vec![0.5]));
        assert_eq!(time.to_string(), "0.5");
    }
}
