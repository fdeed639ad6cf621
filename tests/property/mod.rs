//! Property-based tests

pub mod parameter_proptest;
pub mod policy_proptest;
