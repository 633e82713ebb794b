//! Internal helpers.

pub mod matrix_convert;
