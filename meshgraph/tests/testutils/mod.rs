// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Test utilities for meshgraph integration tests
//!
//! - `init_logging`: routes `log` output through env_logger once per binary
//! - `fixtures`: small graphs shared by several test files

#![allow(dead_code)]

pub mod fixtures;

use once_cell::sync::Lazy;

static LOGGER: Lazy<()> = Lazy::new(|| {
    let _ = env_logger::Builder::from_default_env()
        .is_test(true)
        .try_init();
});

/// Install the test logger. Safe to call from every test.
pub fn init_logging() {
    Lazy::force(&LOGGER);
}

pub fn close_to(actual: f64, expected: f64, tolerance: f64) -> bool {
    (actual - expected).abs() < tolerance
}
