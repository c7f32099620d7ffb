//! Layout descriptors for the generated structs and their comparison with
//! the layouts reported by the compiled native header.

use bytemuck::Zeroable;

/// Interpretation of a field's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U32,
    F32,
    F64,
    Bool,
    /// Enumerated tag, stored as a C enum.
    Enum(&'static str),
    /// Nested native struct, stored inline.
    Struct(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: &'static str,
    pub offset: usize,
    pub size: usize,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructLayout {
    pub name: &'static str,
    pub size: usize,
    pub align: usize,
    pub fields: &'static [FieldLayout],
}

/// Layout as reported by the native probe: size, alignment, then one offset
/// per field in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedLayout {
    pub size: usize,
    pub align: usize,
    pub offsets: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("{name}: {rust} fields in Rust, {native} reported by the native header")]
    FieldCount {
        name: &'static str,
        rust: usize,
        native: usize,
    },
    #[error("{name}: size is {rust} bytes in Rust but {native} in the native header")]
    Size {
        name: &'static str,
        rust: usize,
        native: usize,
    },
    #[error("{name}: alignment is {rust} in Rust but {native} in the native header")]
    Align {
        name: &'static str,
        rust: usize,
        native: usize,
    },
    #[error("{name}.{field}: offset is {rust} in Rust but {native} in the native header")]
    Offset {
        name: &'static str,
        field: &'static str,
        rust: usize,
        native: usize,
    },
}

/// A struct whose memory layout is shared with the native library.
///
/// Implemented by the generated bindings only. The all-zero bit pattern is a
/// valid value of every implementor.
pub trait NativeStruct: Zeroable + Copy + 'static {
    const LAYOUT: &'static StructLayout;

    /// Queries the compiled header for this struct's layout.
    fn probe_native() -> ProbedLayout;
}

impl ProbedLayout {
    pub fn from_words(words: &[usize]) -> Self {
        Self {
            size: words.first().copied().unwrap_or(0),
            align: words.get(1).copied().unwrap_or(0),
            offsets: words.iter().skip(2).copied().collect(),
        }
    }
}

impl StructLayout {
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Reports the first divergence from `native`.
    pub fn check_against(&self, native: &ProbedLayout) -> Result<(), LayoutError> {
        if self.fields.len() != native.offsets.len() {
            return Err(LayoutError::FieldCount {
                name: self.name,
                rust: self.fields.len(),
                native: native.offsets.len(),
            });
        }
        if self.size != native.size {
            return Err(LayoutError::Size {
                name: self.name,
                rust: self.size,
                native: native.size,
            });
        }
        if self.align != native.align {
            return Err(LayoutError::Align {
                name: self.name,
                rust: self.align,
                native: native.align,
            });
        }
        for (field, &offset) in self.fields.iter().zip(&native.offsets) {
            if field.offset != offset {
                return Err(LayoutError::Offset {
                    name: self.name,
                    field: field.name,
                    rust: field.offset,
                    native: offset,
                });
            }
        }
        Ok(())
    }
}

/// Checks one generated struct against the compiled header.
pub fn verify<T: NativeStruct>() -> Result<(), LayoutError> {
    T::LAYOUT.check_against(&T::probe_native())?;
    log::debug!(
        "{} matches {} ({} bytes, align {})",
        T::LAYOUT.name,
        crate::ffi::HEADER_PATH,
        T::LAYOUT.size,
        T::LAYOUT.align
    );
    Ok(())
}
