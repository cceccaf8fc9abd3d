//! Polygon.io REST provider for historic trades, NBBO quotes and minute aggregates.

pub mod params;
pub mod provider;
pub mod response;

pub use provider::{PolygonProvider, RetryPolicy};
