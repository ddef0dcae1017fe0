pub mod analysis_controller;
pub mod summary_controller;
