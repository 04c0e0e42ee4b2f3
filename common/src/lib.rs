//! Card Scan Common Library
//!
//! CLIと対話セッションで共有される型とロジック（I/Oなし）

pub mod analyzer;
pub mod app;
pub mod collection;
pub mod crop;
pub mod error;
pub mod parser;
pub mod phase;
pub mod presentation;
pub mod prompts;
pub mod types;

pub use analyzer::merge_detections;
pub use app::{AppState, Command, CommandOutcome, View};
pub use collection::{AddOutcome, Collection, CollectionFilter, RarityFilter};
pub use crop::{crop_rect, PixelRect, CROP_PADDING};
pub use error::{Error, Result};
pub use parser::{extract_json, parse_identify_response, IdentifyResponse};
pub use phase::ScanPhase;
pub use presentation::ResultView;
pub use prompts::{build_identify_prompt, identify_response_schema};
pub use types::{BoundingBox, CardKey, CardRecord, Detection, ScanResult, SourceImage};
