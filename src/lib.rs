pub mod cli;
pub mod config;
pub mod distribution;
pub mod document;
pub mod error;
pub mod highlight;
pub mod history;
pub mod normalize;
pub mod preview;
pub mod progress;
pub mod report;
pub mod session;
pub mod transport;
pub mod workflow;
