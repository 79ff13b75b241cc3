// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed simulation variables shared between the executive and the encoder.
//!
//! The executive owns variables by name; attributes and parameters hold a
//! [`VariableRef`] to the same storage. Storage is a flat vector per element
//! type, with the array shape carried alongside.

use std::sync::Arc;

use parking_lot::RwLock;

use super::encoding::ByteOrder;

/// Reallocation granularity of dynamic storage, in bytes.
pub const RESIZE_GRANULARITY: usize = 8;

/// Element type of a simulation variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Bool,
    /// 8-bit character data (C `char`).
    Char,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    /// Owned character string (C `char*` element).
    String,
}

impl ElementType {
    /// Host size of one element in bytes (`None` for strings).
    pub const fn size(self) -> Option<usize> {
        match self {
            ElementType::Bool | ElementType::Char | ElementType::I8 | ElementType::U8 => Some(1),
            ElementType::I16 | ElementType::U16 => Some(2),
            ElementType::I32 | ElementType::U32 | ElementType::F32 => Some(4),
            ElementType::I64 | ElementType::U64 | ElementType::F64 => Some(8),
            ElementType::String => None,
        }
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            ElementType::I8
                | ElementType::U8
                | ElementType::I16
                | ElementType::U16
                | ElementType::I32
                | ElementType::U32
                | ElementType::I64
                | ElementType::U64
        )
    }

    pub const fn is_float(self) -> bool {
        matches!(self, ElementType::F32 | ElementType::F64)
    }

    /// Character data: 8-bit chars or strings.
    pub const fn is_character(self) -> bool {
        matches!(self, ElementType::Char | ElementType::String)
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ElementType::Bool => "bool",
            ElementType::Char => "char",
            ElementType::I8 => "i8",
            ElementType::U8 => "u8",
            ElementType::I16 => "i16",
            ElementType::U16 => "u16",
            ElementType::I32 => "i32",
            ElementType::U32 => "u32",
            ElementType::I64 => "i64",
            ElementType::U64 => "u64",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
            ElementType::String => "string",
        };
        f.write_str(name)
    }
}

/// Array shape: static dimensions plus an optional trailing unbounded one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Shape {
    /// Static dimensions, outermost first. Empty for scalars.
    pub dims: Vec<usize>,
    /// Whether a trailing dimension is sized at runtime.
    pub dynamic: bool,
}

impl Shape {
    pub fn scalar() -> Self {
        Self::default()
    }

    pub fn fixed(dims: &[usize]) -> Self {
        Self {
            dims: dims.to_vec(),
            dynamic: false,
        }
    }

    /// One-dimensional runtime-sized array.
    pub fn dynamic() -> Self {
        Self {
            dims: Vec::new(),
            dynamic: true,
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty() && !self.dynamic
    }

    /// Total number of dimensions, static and dynamic.
    pub fn rank(&self) -> usize {
        self.dims.len() + usize::from(self.dynamic)
    }

    /// Element count implied by the static dimensions (1 for scalars).
    pub fn static_count(&self) -> usize {
        self.dims.iter().product()
    }
}

/// Flat element storage.
#[derive(Debug, Clone, PartialEq)]
pub enum VarData {
    Bool(Vec<bool>),
    Char(Vec<u8>),
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    String(Vec<String>),
}

/// Apply `$body` to the inner vector of any variant.
macro_rules! with_values {
    ($data:expr, $values:ident => $body:expr) => {
        match $data {
            VarData::Bool($values) => $body,
            VarData::Char($values) => $body,
            VarData::I8($values) => $body,
            VarData::U8($values) => $body,
            VarData::I16($values) => $body,
            VarData::U16($values) => $body,
            VarData::I32($values) => $body,
            VarData::U32($values) => $body,
            VarData::I64($values) => $body,
            VarData::U64($values) => $body,
            VarData::F32($values) => $body,
            VarData::F64($values) => $body,
            VarData::String($values) => $body,
        }
    };
}

/// Byte conversions for the fixed-size numeric variants.
macro_rules! numeric_bytes {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        impl VarData {
            /// Append every element in `order`. Returns false for
            /// non-numeric storage.
            pub(crate) fn write_numeric(&self, order: ByteOrder, out: &mut Vec<u8>) -> bool {
                match self {
                    $(VarData::$variant(values) => {
                        for value in values {
                            match order {
                                ByteOrder::Big => out.extend_from_slice(&value.to_be_bytes()),
                                ByteOrder::Little => out.extend_from_slice(&value.to_le_bytes()),
                                ByteOrder::Native => out.extend_from_slice(&value.to_ne_bytes()),
                            }
                        }
                        true
                    })*
                    VarData::Bool(values) => {
                        out.extend(values.iter().map(|b| u8::from(*b)));
                        true
                    }
                    VarData::String(_) => false,
                }
            }

            /// Overwrite leading elements from `bytes` in `order`.
            ///
            /// Decodes `min(len, bytes / element size)` elements and returns
            /// that count.
            pub(crate) fn read_numeric(&mut self, order: ByteOrder, bytes: &[u8]) -> usize {
                match self {
                    $(VarData::$variant(values) => {
                        const SIZE: usize = std::mem::size_of::<$ty>();
                        let mut decoded = 0;
                        for (slot, chunk) in values.iter_mut().zip(bytes.chunks_exact(SIZE)) {
                            let mut raw = [0u8; SIZE];
                            raw.copy_from_slice(chunk);
                            *slot = match order {
                                ByteOrder::Big => <$ty>::from_be_bytes(raw),
                                ByteOrder::Little => <$ty>::from_le_bytes(raw),
                                ByteOrder::Native => <$ty>::from_ne_bytes(raw),
                            };
                            decoded += 1;
                        }
                        decoded
                    })*
                    VarData::Bool(values) => {
                        let mut decoded = 0;
                        for (slot, byte) in values.iter_mut().zip(bytes.iter()) {
                            *slot = *byte != 0;
                            decoded += 1;
                        }
                        decoded
                    }
                    VarData::String(_) => 0,
                }
            }
        }
    };
}

numeric_bytes!(
    Char => u8,
    I8 => i8,
    U8 => u8,
    I16 => i16,
    U16 => u16,
    I32 => i32,
    U32 => u32,
    I64 => i64,
    U64 => u64,
    F32 => f32,
    F64 => f64,
);

impl VarData {
    pub fn element_type(&self) -> ElementType {
        match self {
            VarData::Bool(_) => ElementType::Bool,
            VarData::Char(_) => ElementType::Char,
            VarData::I8(_) => ElementType::I8,
            VarData::U8(_) => ElementType::U8,
            VarData::I16(_) => ElementType::I16,
            VarData::U16(_) => ElementType::U16,
            VarData::I32(_) => ElementType::I32,
            VarData::U32(_) => ElementType::U32,
            VarData::I64(_) => ElementType::I64,
            VarData::U64(_) => ElementType::U64,
            VarData::F32(_) => ElementType::F32,
            VarData::F64(_) => ElementType::F64,
            VarData::String(_) => ElementType::String,
        }
    }

    /// Empty storage of the given element type.
    pub fn empty(ty: ElementType) -> Self {
        match ty {
            ElementType::Bool => VarData::Bool(Vec::new()),
            ElementType::Char => VarData::Char(Vec::new()),
            ElementType::I8 => VarData::I8(Vec::new()),
            ElementType::U8 => VarData::U8(Vec::new()),
            ElementType::I16 => VarData::I16(Vec::new()),
            ElementType::U16 => VarData::U16(Vec::new()),
            ElementType::I32 => VarData::I32(Vec::new()),
            ElementType::U32 => VarData::U32(Vec::new()),
            ElementType::I64 => VarData::I64(Vec::new()),
            ElementType::U64 => VarData::U64(Vec::new()),
            ElementType::F32 => VarData::F32(Vec::new()),
            ElementType::F64 => VarData::F64(Vec::new()),
            ElementType::String => VarData::String(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        with_values!(self, values => values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocated element slots.
    pub fn capacity(&self) -> usize {
        with_values!(self, values => values.capacity())
    }

    fn resize_with_capacity(&mut self, count: usize, capacity: usize) {
        with_values!(self, values => {
            if capacity > values.capacity() {
                values.reserve_exact(capacity - values.len());
            }
            values.resize(count, Default::default());
        })
    }
}

/// Element types that map onto one [`VarData`] variant.
pub trait Element: Clone + Default {
    const TYPE: ElementType;
    fn slice(data: &VarData) -> Option<&[Self]>;
    fn vec_mut(data: &mut VarData) -> Option<&mut Vec<Self>>;
    fn wrap(values: Vec<Self>) -> VarData;
}

macro_rules! impl_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl Element for $ty {
            const TYPE: ElementType = ElementType::$variant;

            fn slice(data: &VarData) -> Option<&[Self]> {
                match data {
                    VarData::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn vec_mut(data: &mut VarData) -> Option<&mut Vec<Self>> {
                match data {
                    VarData::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn wrap(values: Vec<Self>) -> VarData {
                VarData::$variant(values)
            }
        })*
    };
}

impl_element!(
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
);

/// A named, typed executive variable.
#[derive(Debug, Clone, PartialEq)]
pub struct SimVariable {
    name: String,
    shape: Shape,
    units: String,
    data: VarData,
}

impl SimVariable {
    /// Variable with explicit storage. Static shapes are padded or cut to
    /// their declared element count.
    pub fn new(name: impl Into<String>, shape: Shape, mut data: VarData) -> Self {
        if !shape.dynamic {
            let count = shape.static_count();
            data.resize_with_capacity(count, count);
        }
        Self {
            name: name.into(),
            shape,
            units: String::new(),
            data,
        }
    }

    pub fn scalar<T: Element>(name: impl Into<String>, value: T) -> Self {
        Self::new(name, Shape::scalar(), T::wrap(vec![value]))
    }

    /// Fixed-size one-dimensional array.
    pub fn array<T: Element>(name: impl Into<String>, values: Vec<T>) -> Self {
        let len = values.len();
        Self::new(name, Shape::fixed(&[len]), T::wrap(values))
    }

    /// Runtime-sized one-dimensional array.
    pub fn dynamic<T: Element>(name: impl Into<String>, values: Vec<T>) -> Self {
        Self::new(name, Shape::dynamic(), T::wrap(values))
    }

    /// Runtime-sized character buffer (C `char*`).
    pub fn chars(name: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(name, Shape::dynamic(), VarData::Char(bytes.to_vec()))
    }

    /// Fixed-capacity character buffer (C `char[N]`), zero filled.
    pub fn char_array(name: impl Into<String>, capacity: usize, bytes: &[u8]) -> Self {
        let mut storage = vec![0u8; capacity];
        let n = bytes.len().min(capacity);
        storage[..n].copy_from_slice(&bytes[..n]);
        Self::new(name, Shape::fixed(&[capacity]), VarData::Char(storage))
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    pub fn data(&self) -> &VarData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut VarData {
        &mut self.data
    }

    /// Current element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Host byte size of the current contents.
    pub fn byte_size(&self) -> usize {
        match &self.data {
            VarData::String(values) => values.iter().map(String::len).sum(),
            other => other.len() * other.element_type().size().unwrap_or(0),
        }
    }

    /// Allocated storage in bytes (strings count one slot per pointer).
    pub fn capacity_bytes(&self) -> usize {
        let slot = self
            .element_type()
            .size()
            .unwrap_or(std::mem::size_of::<usize>());
        self.data.capacity() * slot
    }

    /// Resize runtime-sized storage to `count` elements.
    ///
    /// Allocation rounds up to the next multiple of
    /// [`RESIZE_GRANULARITY`] bytes. Static shapes keep their size.
    pub fn resize(&mut self, count: usize) -> bool {
        if !self.shape.dynamic {
            return false;
        }
        let slot = self
            .element_type()
            .size()
            .unwrap_or(std::mem::size_of::<usize>());
        let bytes = count * slot;
        let rounded = bytes.div_ceil(RESIZE_GRANULARITY) * RESIZE_GRANULARITY;
        self.data.resize_with_capacity(count, rounded / slot);
        true
    }

    pub fn get<T: Element>(&self) -> Option<&[T]> {
        T::slice(&self.data)
    }

    pub fn get_mut<T: Element>(&mut self) -> Option<&mut [T]> {
        T::vec_mut(&mut self.data).map(|v| v.as_mut_slice())
    }

    /// First element, for scalars.
    pub fn value<T: Element>(&self) -> Option<T> {
        self.get::<T>().and_then(|values| values.first().cloned())
    }

    /// Replace the first element. Returns false on a type mismatch.
    pub fn set_value<T: Element>(&mut self, value: T) -> bool {
        match T::vec_mut(&mut self.data) {
            Some(values) => {
                match values.first_mut() {
                    Some(slot) => *slot = value,
                    None => values.push(value),
                }
                true
            }
            None => false,
        }
    }

    /// Copy `values` into storage, resizing runtime-sized arrays.
    ///
    /// Static arrays take at most their declared count. Returns false on a
    /// type mismatch.
    pub fn set_values<T: Element>(&mut self, values: &[T]) -> bool {
        if T::vec_mut(&mut self.data).is_none() {
            return false;
        }
        if self.shape.dynamic {
            self.resize(values.len());
        }
        if let Some(storage) = T::vec_mut(&mut self.data) {
            for (slot, value) in storage.iter_mut().zip(values.iter()) {
                *slot = value.clone();
            }
        }
        true
    }

    /// Character contents (`Char` storage only).
    pub fn char_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            VarData::Char(values) => Some(values),
            _ => None,
        }
    }

    /// Character contents up to the first NUL, as text.
    pub fn char_string(&self) -> Option<String> {
        self.char_bytes().map(|bytes| {
            let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
            String::from_utf8_lossy(&bytes[..end]).into_owned()
        })
    }

    /// Replace character contents, resizing runtime-sized buffers.
    pub fn set_chars(&mut self, bytes: &[u8]) -> bool {
        if !matches!(self.data, VarData::Char(_)) {
            return false;
        }
        if self.shape.dynamic {
            self.resize(bytes.len());
        }
        if let VarData::Char(storage) = &mut self.data {
            let n = bytes.len().min(storage.len());
            storage[..n].copy_from_slice(&bytes[..n]);
            for slot in storage[n..].iter_mut() {
                *slot = 0;
            }
        }
        true
    }
}

/// Shared handle to an executive variable.
pub type VariableRef = Arc<RwLock<SimVariable>>;

pub fn new_variable_ref(variable: SimVariable) -> VariableRef {
    Arc::new(RwLock::new(variable))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_shape_sizes_storage() {
        let var = SimVariable::new("pos", Shape::fixed(&[2, 3]), VarData::F64(vec![1.0]));
        assert_eq!(var.len(), 6);
        assert_eq!(var.get::<f64>().expect("f64 storage")[0], 1.0);
        assert_eq!(var.byte_size(), 48);
        assert_eq!(var.shape().rank(), 2);
    }

    #[test]
    fn test_resize_rounds_to_eight_bytes() {
        let mut var = SimVariable::chars("payload", b"abc");
        assert!(var.resize(7));
        assert_eq!(var.len(), 7);
        assert!(var.capacity_bytes() >= 8);
        assert_eq!(var.capacity_bytes() % RESIZE_GRANULARITY, 0);
    }

    #[test]
    fn test_static_resize_is_refused() {
        let mut var = SimVariable::array("v", vec![1.0f64, 2.0]);
        assert!(!var.resize(5));
        assert_eq!(var.len(), 2);
    }

    #[test]
    fn test_set_values_dynamic_and_static() {
        let mut dynamic = SimVariable::dynamic::<i32>("d", Vec::new());
        assert!(dynamic.set_values(&[1, 2, 3]));
        assert_eq!(dynamic.get::<i32>().expect("i32"), &[1, 2, 3]);

        let mut fixed = SimVariable::array("f", vec![0i32; 2]);
        assert!(fixed.set_values(&[7, 8, 9]));
        assert_eq!(fixed.get::<i32>().expect("i32"), &[7, 8]);
        assert!(!fixed.set_values(&[1.0f64]));
    }

    #[test]
    fn test_char_string_stops_at_nul() {
        let var = SimVariable::char_array("name", 8, b"sun");
        assert_eq!(var.char_string().as_deref(), Some("sun"));
        assert_eq!(var.len(), 8);
    }

    #[test]
    fn test_numeric_byte_order() {
        let data = VarData::I16(vec![0x0102]);
        let mut be = Vec::new();
        let mut le = Vec::new();
        assert!(data.write_numeric(ByteOrder::Big, &mut be));
        assert!(data.write_numeric(ByteOrder::Little, &mut le));
        assert_eq!(be, vec![0x01, 0x02]);
        assert_eq!(le, vec![0x02, 0x01]);

        let mut back = VarData::I16(vec![0]);
        assert_eq!(back.read_numeric(ByteOrder::Big, &be), 1);
        assert_eq!(back, data);
    }
}
