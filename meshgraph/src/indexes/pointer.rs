// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Unsigned integer arrays whose element width follows the largest value
//! they must hold

use std::fmt;

/// Element width of a [`PointerArray`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerWidth {
    U8,
    U16,
    U32,
    U64,
}

impl PointerWidth {
    /// Smallest width able to represent `max_value`
    pub fn for_max_value(max_value: usize) -> Self {
        let max_value = max_value as u64;
        if max_value <= u8::MAX as u64 {
            PointerWidth::U8
        } else if max_value <= u16::MAX as u64 {
            PointerWidth::U16
        } else if max_value <= u32::MAX as u64 {
            PointerWidth::U32
        } else {
            PointerWidth::U64
        }
    }

    pub fn bits(&self) -> u32 {
        match self {
            PointerWidth::U8 => 8,
            PointerWidth::U16 => 16,
            PointerWidth::U32 => 32,
            PointerWidth::U64 => 64,
        }
    }
}

/// Fixed-length array of indices stored at the narrowest sufficient width
#[derive(Clone, PartialEq, Eq)]
pub enum PointerArray {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
}

impl PointerArray {
    /// Zero-filled array of `len` elements able to hold `max_value`
    pub fn with_max_value(max_value: usize, len: usize) -> Self {
        match PointerWidth::for_max_value(max_value) {
            PointerWidth::U8 => PointerArray::U8(vec![0; len]),
            PointerWidth::U16 => PointerArray::U16(vec![0; len]),
            PointerWidth::U32 => PointerArray::U32(vec![0; len]),
            PointerWidth::U64 => PointerArray::U64(vec![0; len]),
        }
    }

    pub fn width(&self) -> PointerWidth {
        match self {
            PointerArray::U8(_) => PointerWidth::U8,
            PointerArray::U16(_) => PointerWidth::U16,
            PointerArray::U32(_) => PointerWidth::U32,
            PointerArray::U64(_) => PointerWidth::U64,
        }
    }

    #[inline]
    pub fn get(&self, i: usize) -> usize {
        match self {
            PointerArray::U8(values) => values[i] as usize,
            PointerArray::U16(values) => values[i] as usize,
            PointerArray::U32(values) => values[i] as usize,
            PointerArray::U64(values) => values[i] as usize,
        }
    }

    /// Store `value` at `i`. The value must fit the array width.
    #[inline]
    pub fn set(&mut self, i: usize, value: usize) {
        debug_assert!(
            PointerWidth::for_max_value(value).bits() <= self.width().bits(),
            "value {} overflows a {}-bit pointer array",
            value,
            self.width().bits()
        );

        match self {
            PointerArray::U8(values) => values[i] = value as u8,
            PointerArray::U16(values) => values[i] = value as u16,
            PointerArray::U32(values) => values[i] = value as u32,
            PointerArray::U64(values) => values[i] = value as u64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PointerArray::U8(values) => values.len(),
            PointerArray::U16(values) => values.len(),
            PointerArray::U32(values) => values.len(),
            PointerArray::U64(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }

    /// Copy of the first `len` elements
    pub fn prefix(&self, len: usize) -> Vec<usize> {
        self.iter().take(len).collect()
    }
}

impl fmt::Debug for PointerArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PointerArray<u{}>", self.width().bits())?;
        f.debug_list().entries(self.iter()).finish()
    }
}
