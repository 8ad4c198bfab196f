//! Property-based tests for the URL arithmetic.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.
