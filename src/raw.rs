//! Values with no typed counterpart (fixed-length strings, compounds, enums,
//! opaque blobs), carried as raw bytes in their file datatype.

use std::ffi::{c_int, c_void, CString};
use std::{fmt, ptr};

use anyhow::{bail, Result};
use hdf5::types::TypeDescriptor;
use hdf5::{Container, Group};
use hdf5_sys::h5::hsize_t;
use hdf5_sys::h5a::{H5Aclose, H5Acreate2, H5Aread, H5Awrite};
use hdf5_sys::h5d::{H5Dclose, H5Dcreate2, H5Dread, H5Dwrite};
use hdf5_sys::h5i::{hid_t, H5I_type_t, H5Iget_type};
use hdf5_sys::h5p::H5P_DEFAULT;
use hdf5_sys::h5s::{H5S_class_t, H5Sclose, H5Screate, H5Screate_simple, H5S_ALL};
use hdf5_sys::h5t::{H5T_class_t, H5Tclose, H5Tcopy, H5Tdetect_class, H5Tequal, H5Tget_size};
use hdf5_sys::LOCK;

use crate::error::SnapshotError;

fn check(ret: i64, call: &str, name: &str) -> Result<()> {
    if ret < 0 {
        bail!("{call} failed for {name}");
    }
    Ok(())
}

/// Transient copy of a file datatype, independent of the file it came from.
struct FileType(hid_t);

impl FileType {
    fn copy_of(id: hid_t, name: &str) -> Result<Self> {
        let _guard = LOCK.lock();
        let copy = unsafe { H5Tcopy(id) };
        check(copy, "H5Tcopy", name)?;
        Ok(Self(copy))
    }

    fn size(&self) -> usize {
        let _guard = LOCK.lock();
        unsafe { H5Tget_size(self.0) }
    }

    fn contains(&self, class: H5T_class_t) -> bool {
        let _guard = LOCK.lock();
        unsafe { H5Tdetect_class(self.0, class) > 0 }
    }
}

impl Clone for FileType {
    fn clone(&self) -> Self {
        let _guard = LOCK.lock();
        Self(unsafe { H5Tcopy(self.0) })
    }
}

impl Drop for FileType {
    fn drop(&mut self) {
        if self.0 >= 0 {
            let _guard = LOCK.lock();
            unsafe { H5Tclose(self.0) };
        }
    }
}

impl PartialEq for FileType {
    fn eq(&self, other: &Self) -> bool {
        let _guard = LOCK.lock();
        unsafe { H5Tequal(self.0, other.0) > 0 }
    }
}

impl fmt::Debug for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileType({} bytes)", self.size())
    }
}

/// Variable-length members hold heap pointers, which do not survive a byte copy.
fn has_varlen(descriptor: &TypeDescriptor) -> bool {
    match descriptor {
        TypeDescriptor::VarLenArray(_)
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::VarLenUnicode => true,
        TypeDescriptor::FixedArray(inner, _) => has_varlen(inner),
        TypeDescriptor::Compound(compound) => compound.fields.iter().any(|f| has_varlen(&f.ty)),
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    Attribute,
    Dataset,
}

/// Element bytes of one dataset or attribute, in logical order, together
/// with the datatype they were stored as.
#[derive(Debug, Clone, PartialEq)]
pub struct RawValues {
    descriptor: Option<TypeDescriptor>,
    shape: Vec<usize>,
    bytes: Vec<u8>,
    dtype: FileType,
}

impl RawValues {
    /// `descriptor` is `None` when the datatype has no `TypeDescriptor`
    /// (bitfields, opaque types).
    pub(crate) fn read(
        container: &Container,
        descriptor: Option<TypeDescriptor>,
        name: &str,
    ) -> Result<Self> {
        let unsupported = || SnapshotError::UnsupportedType {
            name: name.to_string(),
            descriptor: descriptor
                .as_ref()
                .map_or_else(|| "unknown".to_string(), |d| format!("{d:?}")),
        };
        let dtype = FileType::copy_of(container.dtype()?.id(), name)?;
        let has_pointers = match &descriptor {
            Some(descriptor) => has_varlen(descriptor),
            None => [H5T_class_t::H5T_VLEN, H5T_class_t::H5T_STRING]
                .into_iter()
                .any(|class| dtype.contains(class)),
        };
        if has_pointers || dtype.contains(H5T_class_t::H5T_REFERENCE) {
            return Err(unsupported().into());
        }
        let shape = container.shape();
        let count = container.size();
        // null dataspaces hold no element at all
        if count != shape.iter().product::<usize>() {
            return Err(unsupported().into());
        }

        let mut bytes = vec![0u8; count * dtype.size()];
        let id = container.id();
        let buf = bytes.as_mut_ptr().cast::<c_void>();
        let status = {
            let _guard = LOCK.lock();
            unsafe {
                match H5Iget_type(id) {
                    H5I_type_t::H5I_ATTR => H5Aread(id, dtype.0, buf),
                    _ => H5Dread(id, dtype.0, H5S_ALL, H5S_ALL, H5P_DEFAULT, buf),
                }
            }
        };
        check(status.into(), "read", name)?;
        Ok(Self {
            descriptor,
            shape,
            bytes,
            dtype,
        })
    }

    pub(crate) fn write(&self, group: &Group, name: &str, target: Target) -> Result<()> {
        let element = self.dtype.size();
        if self.bytes.len() != self.shape.iter().product::<usize>() * element {
            bail!(
                "{name}: {} bytes do not fill shape {:?} of {element}-byte elements",
                self.bytes.len(),
                self.shape
            );
        }
        let cname = CString::new(name)?;
        let dims = self.shape.iter().map(|&n| n as hsize_t).collect::<Vec<_>>();
        let buf = self.bytes.as_ptr().cast::<c_void>();

        let _guard = LOCK.lock();
        let space = unsafe {
            if dims.is_empty() {
                H5Screate(H5S_class_t::H5S_SCALAR)
            } else {
                H5Screate_simple(dims.len() as c_int, dims.as_ptr(), ptr::null())
            }
        };
        check(space, "H5Screate", name)?;
        let result = match target {
            Target::Attribute => {
                let id = unsafe {
                    H5Acreate2(group.id(), cname.as_ptr(), self.dtype.0, space, H5P_DEFAULT, H5P_DEFAULT)
                };
                check(id, "H5Acreate2", name).and_then(|()| {
                    let status = unsafe { H5Awrite(id, self.dtype.0, buf) };
                    unsafe { H5Aclose(id) };
                    check(status.into(), "H5Awrite", name)
                })
            }
            Target::Dataset => {
                let id = unsafe {
                    H5Dcreate2(
                        group.id(),
                        cname.as_ptr(),
                        self.dtype.0,
                        space,
                        H5P_DEFAULT,
                        H5P_DEFAULT,
                        H5P_DEFAULT,
                    )
                };
                check(id, "H5Dcreate2", name).and_then(|()| {
                    let status =
                        unsafe { H5Dwrite(id, self.dtype.0, H5S_ALL, H5S_ALL, H5P_DEFAULT, buf) };
                    unsafe { H5Dclose(id) };
                    check(status.into(), "H5Dwrite", name)
                })
            }
        };
        unsafe { H5Sclose(space) };
        result
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn descriptor(&self) -> Option<&TypeDescriptor> {
        self.descriptor.as_ref()
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self.descriptor {
            Some(TypeDescriptor::FixedAscii(_) | TypeDescriptor::FixedUnicode(_)) => "str",
            _ => "raw",
        }
    }

    /// Fixed-length strings with their NUL or space padding removed.
    fn strings(&self) -> Option<Vec<String>> {
        let width = match self.descriptor {
            Some(TypeDescriptor::FixedAscii(n) | TypeDescriptor::FixedUnicode(n)) if n > 0 => n,
            _ => return None,
        };
        Some(
            self.bytes
                .chunks(width)
                .map(|c| {
                    String::from_utf8_lossy(c)
                        .trim_end_matches(['\0', ' '])
                        .to_string()
                })
                .collect(),
        )
    }
}

impl fmt::Display for RawValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.strings(), self.shape.is_empty()) {
            (Some(strings), true) => write!(f, "{}", strings.concat()),
            (Some(strings), false) => write!(f, "[{}]", strings.join(", ")),
            (None, _) => match &self.descriptor {
                Some(descriptor) => write!(f, "<{} bytes of {descriptor:?}>", self.bytes.len()),
                None => write!(f, "<{} bytes>", self.bytes.len()),
            },
        }
    }
}
