//! Common test utilities shared by the keeper test suites

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

pub use fixtures::{FakeLauncher, TestFixtures};
pub use helpers::{wait_until, KeeperBuilder, RunningKeeper};
