//! Step definitions for Cucumber scenarios

pub mod organization_steps;
