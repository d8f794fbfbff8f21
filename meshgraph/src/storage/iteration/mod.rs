// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Neighbor and edge iteration over the graph store

pub mod edges;
pub mod neighbors;

pub use neighbors::{NeighborEntries, Shape};
