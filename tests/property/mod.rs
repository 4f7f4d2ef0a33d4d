//! Property-based tests over randomly generated directory trees

mod determinism;
