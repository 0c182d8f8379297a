//! Shared fakes for integration tests.

#![allow(dead_code)]

pub mod fakes;
