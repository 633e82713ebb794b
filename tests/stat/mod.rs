//! Tests of the statistics helpers.

mod linear_regression_tests;
