use boxcutter_media::{ExtractPolicy, ParseLimits};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub extract: ExtractConfig,
}

/// Work budget applied while parsing the box tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Maximum box nesting depth
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum number of boxes visited in one file
    #[serde(default = "default_max_boxes")]
    pub max_boxes: usize,

    /// Largest box payload read into memory, in bytes
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: u64,
}

fn default_max_depth() -> usize {
    boxcutter_media::mp4::DEFAULT_MAX_DEPTH
}
fn default_max_boxes() -> usize {
    boxcutter_media::mp4::DEFAULT_MAX_BOXES
}
fn default_max_payload_bytes() -> u64 {
    boxcutter_media::mp4::DEFAULT_MAX_PAYLOAD_BYTES
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_boxes: default_max_boxes(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

impl From<&LimitsConfig> for ParseLimits {
    fn from(limits: &LimitsConfig) -> Self {
        ParseLimits::default()
            .with_max_depth(limits.max_depth)
            .with_max_boxes(limits.max_boxes)
            .with_max_payload_bytes(limits.max_payload_bytes)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExtractConfig {
    /// What to do with samples whose NAL units overrun the sample
    /// ("abort" or "best-effort")
    #[serde(default)]
    pub policy: ExtractPolicy,
}
