//! Tests of the dense linear algebra primitives.

mod gauss_jordan_tests;
