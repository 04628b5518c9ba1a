use std::fmt;

/// Element data type tag carried by tensors and constant lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TensorDataType {
    Bool,
    /// 32-bit signed integer
    Int,
    /// 32-bit unsigned integer
    UnsignedInt,
    /// 32-bit IEEE 754 single-precision float
    #[default]
    Float,
    /// 64-bit IEEE 754 double-precision float
    Double,
    /// Caller-defined layout; the element size is supplied explicitly.
    Custom,
}

impl TensorDataType {
    /// Size in bytes of one element, or None for `Custom`.
    pub fn element_size(&self) -> Option<u32> {
        match self {
            TensorDataType::Bool => Some(1),
            TensorDataType::Int | TensorDataType::UnsignedInt | TensorDataType::Float => Some(4),
            TensorDataType::Double => Some(8),
            TensorDataType::Custom => None,
        }
    }

    /// Check that `element_size` is a valid stride for this type: non-zero, and equal to
    /// the fixed size of every type but `Custom`.
    pub fn check_element_size(&self, element_size: u32) -> std::result::Result<(), String> {
        if element_size == 0 {
            return Err("element size must be non-zero".into());
        }
        match self.element_size() {
            Some(expected) if expected != element_size => Err(format!(
                "{} elements are {} bytes, got element size {}",
                self, expected, element_size
            )),
            _ => Ok(()),
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, TensorDataType::Float | TensorDataType::Double)
    }
}

impl fmt::Display for TensorDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorDataType::Bool => write!(f, "bool"),
            TensorDataType::Int => write!(f, "i32"),
            TensorDataType::UnsignedInt => write!(f, "u32"),
            TensorDataType::Float => write!(f, "f32"),
            TensorDataType::Double => write!(f, "f64"),
            TensorDataType::Custom => write!(f, "custom"),
        }
    }
}

/// A plain-data element type with a fixed byte layout and a known data type tag.
pub trait Element: bytemuck::Pod + Send + Sync + 'static {
    const DATA_TYPE: TensorDataType;
}

impl Element for f32 {
    const DATA_TYPE: TensorDataType = TensorDataType::Float;
}

impl Element for f64 {
    const DATA_TYPE: TensorDataType = TensorDataType::Double;
}

impl Element for i32 {
    const DATA_TYPE: TensorDataType = TensorDataType::Int;
}

impl Element for u32 {
    const DATA_TYPE: TensorDataType = TensorDataType::UnsignedInt;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_sizes() {
        assert_eq!(TensorDataType::Float.element_size(), Some(4));
        assert_eq!(TensorDataType::Double.element_size(), Some(8));
        assert_eq!(TensorDataType::Bool.element_size(), Some(1));
        assert_eq!(TensorDataType::Custom.element_size(), None);
    }

    #[test]
    fn test_check_element_size() {
        assert!(TensorDataType::Float.check_element_size(4).is_ok());
        assert!(TensorDataType::Float.check_element_size(8).is_err());
        assert!(TensorDataType::Bool.check_element_size(0).is_err());
        assert!(TensorDataType::Custom.check_element_size(12).is_ok());
        assert!(TensorDataType::Custom.check_element_size(0).is_err());
    }

    #[test]
    fn test_element_tags_match_layout() {
        fn check<T: Element>() {
            assert_eq!(
                T::DATA_TYPE.element_size(),
                Some(std::mem::size_of::<T>() as u32)
            );
        }
        check::<f32>();
        check::<f64>();
        check::<i32>();
        check::<u32>();
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", TensorDataType::Float), "f32");
        assert_eq!(format!("{}", TensorDataType::Custom), "custom");
        assert_eq!(TensorDataType::default(), TensorDataType::Float);
    }
}
