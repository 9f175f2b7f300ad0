//! Time series module
//!
//! Provides the time handling the energy pipeline relies on:
//! - Timestamp parsing from string, datetime and date columns
//! - Calendar fields and sine/cosine cyclical encoding
//! - Sampling-interval inference
//! - Chronological (non-shuffled) train/test splitting

mod features;
mod validation;

pub use features::{
    parse_timestamp, parse_timestamps, relative_seconds, CalendarFeatures, CyclicalFeature,
};
pub use validation::{
    infer_sampling_interval, ChronologicalSplit, SamplingInfo, SECONDS_PER_DAY,
};
