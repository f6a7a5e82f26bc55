//! Encoding options.

use serde::Serialize;

use crate::limits::MAX_NESTING_DEPTH;

/// Verbosity tier controlling redundant hypermedia and type-name emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataLevel {
    /// Every link, title and type annotation is emitted.
    Full,
    /// Anything a client can compute by convention is omitted.
    #[default]
    Minimal,
    /// Type annotations are suppressed entirely.
    None,
}

/// Options for one top-level encode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Metadata verbosity.
    pub metadata: MetadataLevel,
    /// Encode partial-update payloads: resources carrying a change set emit
    /// only changed properties (plus keys).
    pub delta: bool,
    /// Offset (minutes east of UTC) that DateTimeOffset values are shifted to.
    pub time_zone_offset_min: i16,
    /// Maximum nesting depth before the write is abandoned.
    pub max_depth: usize,
    /// Write only entity-reference links for the root resource(s).
    pub reference_only: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            metadata: MetadataLevel::Minimal,
            delta: false,
            time_zone_offset_min: 0,
            max_depth: MAX_NESTING_DEPTH,
            reference_only: false,
        }
    }
}

impl EncodeOptions {
    /// Creates default options (minimal metadata, UTC, no delta).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for partial-update payloads.
    pub fn delta() -> Self {
        Self {
            delta: true,
            ..Self::default()
        }
    }

    /// Sets the metadata level.
    pub fn with_metadata(mut self, metadata: MetadataLevel) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets the target time zone offset in minutes.
    pub fn with_time_zone_offset(mut self, offset_min: i16) -> Self {
        self.time_zone_offset_min = offset_min;
        self
    }

    /// Sets the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Writes entity references instead of resource bodies at the root.
    pub fn with_reference_only(mut self, reference_only: bool) -> Self {
        self.reference_only = reference_only;
        self
    }
}
