//! Typed constant lists for specialization and push constants.
//!
//! A constant list is a data type tag, an element stride and the raw bytes. Any
//! [`Element`] slice converts into one; foreign layouts go through
//! [`Constants::from_raw`].

use crate::dtype::{Element, TensorDataType};
use crate::{Result, VkoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constants {
    data_type: TensorDataType,
    element_size: u32,
    bytes: Vec<u8>,
}

impl Default for Constants {
    /// An empty `f32` list.
    fn default() -> Self {
        Self {
            data_type: TensorDataType::Float,
            element_size: 4,
            bytes: Vec::new(),
        }
    }
}

impl Constants {
    pub fn from_slice<T: Element>(values: &[T]) -> Self {
        Self {
            data_type: T::DATA_TYPE,
            element_size: std::mem::size_of::<T>() as u32,
            bytes: bytemuck::cast_slice(values).to_vec(),
        }
    }

    /// Build from raw bytes laid out as `bytes.len() / element_size` elements.
    pub fn from_raw(data_type: TensorDataType, element_size: u32, bytes: Vec<u8>) -> Result<Self> {
        data_type
            .check_element_size(element_size)
            .map_err(VkoreError::InvalidConstants)?;
        if bytes.len() % element_size as usize != 0 {
            return Err(VkoreError::InvalidConstants(format!(
                "{} bytes is not a multiple of element size {}",
                bytes.len(),
                element_size
            )));
        }
        Ok(Self {
            data_type,
            element_size,
            bytes,
        })
    }

    pub fn data_type(&self) -> TensorDataType {
        self.data_type
    }

    pub fn element_size(&self) -> u32 {
        self.element_size
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.bytes.len() / self.element_size as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copy the values out as `T`, if `T` matches the stored type.
    pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
        if T::DATA_TYPE != self.data_type || std::mem::size_of::<T>() as u32 != self.element_size {
            return None;
        }
        let mut out = vec![<T as bytemuck::Zeroable>::zeroed(); self.len()];
        bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(&self.bytes);
        Some(out)
    }
}

impl<T: Element> From<&[T]> for Constants {
    fn from(values: &[T]) -> Self {
        Self::from_slice(values)
    }
}

impl<T: Element> From<Vec<T>> for Constants {
    fn from(values: Vec<T>) -> Self {
        Self::from_slice(&values)
    }
}

impl<T: Element, const N: usize> From<[T; N]> for Constants {
    fn from(values: [T; N]) -> Self {
        Self::from_slice(&values)
    }
}
