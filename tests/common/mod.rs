//! Common utilities for integration tests

#![allow(dead_code)]

pub mod mock_models;
pub mod test_helpers;

// Re-export commonly used items
pub use mock_models::{ConstantGrowth, Depletion, ExponentialDecay};
pub use test_helpers::{
    CALCITE_DOCUMENT, assert_non_increasing, create_simple_scenario, data_file, mock_provider, relative_error,
};
