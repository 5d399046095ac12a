//! Synheart Screen - Screen-usage features from smartphone sensor logs
//!
//! Screen turns raw screen-status and battery-status logs into per-user,
//! per-window features through a deterministic chain: shutdown extraction →
//! timeline merge → transition classification → duration computation →
//! window aggregation.
//!
//! ## Features
//!
//! - `screen_off`: off events, including shutdowns taken from the battery log
//! - `screen_count`: on/off/use transition counts per window
//! - `screen_duration*`: total/min/max/mean/median/std transition durations
//! - `screen_first_unlock`: first unlock of each day

pub mod classifier;
pub mod config;
pub mod duration;
pub mod encoder;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod schema;
pub mod shutdown;
pub mod table;
pub mod timeline;
pub mod types;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{ResampleArgs, ResampleRule, ScreenConfig, WindowOrigin};
pub use error::ScreenError;
pub use features::ScreenFeature;
pub use pipeline::{
    extract_features_screen, parse_feature_selection, screen_features_to_json, FeatureRequest,
    ScreenProcessor,
};
pub use schema::{RawRecord, TableAdapter};
pub use table::{FeatureTable, FeatureValue, WindowKey};

/// Library version embedded in feature reports
pub const SCREEN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for feature reports
pub const PRODUCER_NAME: &str = "synheart-screen";
