// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
// Edge weight resolution shared by the weighted indices and metrics

use crate::storage::types::EdgeEntry;
use crate::storage::value::Value;
use std::fmt;

/// Default edge attribute holding weights
pub const DEFAULT_WEIGHT_ATTRIBUTE: &str = "weight";

type WeightGetter = Box<dyn Fn(EdgeEntry<'_>) -> f64>;

/// How to read the weight of an edge
///
/// Missing, non-numeric and NaN weights resolve to `1`.
pub enum EdgeWeight {
    /// Every edge weighs 1
    Unweighted,
    /// Read the named edge attribute
    Attribute(String),
    /// Compute the weight from the edge and its endpoints
    Getter(WeightGetter),
}

impl EdgeWeight {
    pub fn attribute(name: impl Into<String>) -> Self {
        EdgeWeight::Attribute(name.into())
    }

    pub fn getter<F>(getter: F) -> Self
    where
        F: Fn(EdgeEntry<'_>) -> f64 + 'static,
    {
        EdgeWeight::Getter(Box::new(getter))
    }

    pub fn is_weighted(&self) -> bool {
        !matches!(self, EdgeWeight::Unweighted)
    }

    /// Resolve the weight of one edge
    pub fn weight_of(&self, entry: EdgeEntry<'_>) -> f64 {
        match self {
            EdgeWeight::Unweighted => 1.0,
            EdgeWeight::Attribute(name) => entry
                .attributes
                .get(name)
                .and_then(Value::as_weight)
                .unwrap_or(1.0),
            EdgeWeight::Getter(getter) => coerce(getter(entry)),
        }
    }
}

fn coerce(weight: f64) -> f64 {
    if weight.is_nan() {
        1.0
    } else {
        weight
    }
}

impl Default for EdgeWeight {
    fn default() -> Self {
        EdgeWeight::Attribute(DEFAULT_WEIGHT_ATTRIBUTE.to_string())
    }
}

impl From<&str> for EdgeWeight {
    fn from(name: &str) -> Self {
        EdgeWeight::Attribute(name.to_string())
    }
}

impl From<Option<&str>> for EdgeWeight {
    fn from(name: Option<&str>) -> Self {
        match name {
            Some(name) => EdgeWeight::Attribute(name.to_string()),
            None => EdgeWeight::Unweighted,
        }
    }
}

impl fmt::Debug for EdgeWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeWeight::Unweighted => write!(f, "Unweighted"),
            EdgeWeight::Attribute(name) => f.debug_tuple("Attribute").field(name).finish(),
            EdgeWeight::Getter(_) => write!(f, "Getter(..)"),
        }
    }
}
