//! Utility functions and types

pub mod data_loader;
mod frame;

pub use data_loader::{DataLoader, DataSaver, FileFormat};
pub use frame::{frame_to_matrix, targets_to_frame};
