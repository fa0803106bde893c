//! Filter Evaluator and Availability Engine
//!
//! Both are pure functions of a [`Dataset`](crate::dataset::Dataset) and a
//! [`FacetState`](crate::facet::FacetState), sharing one record predicate.

pub mod availability;
pub mod evaluate;

pub use availability::{available, available_all, numeric_extent, Availability, AvailabilityCache};
pub use evaluate::{evaluate, matches};
