//! Detail preset. Chosen once by the platform layer at composition time;
//! nothing in the simulation branches on it afterwards.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailPreset {
    Low,
    #[default]
    High,
}

impl DetailPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailPreset::Low => "low",
            DetailPreset::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(DetailPreset::Low),
            "high" => Some(DetailPreset::High),
            _ => None,
        }
    }

    /// Whether the animated light rig is used.
    pub fn full_lights(&self) -> bool {
        matches!(self, DetailPreset::High)
    }

    /// Extra world units around the view rect inside which planets start
    /// simulating. A wider margin hides pop-in on fast approaches.
    pub fn view_margin(&self) -> f32 {
        match self {
            DetailPreset::Low => 1.0,
            DetailPreset::High => 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_str_roundtrip() {
        for preset in [DetailPreset::Low, DetailPreset::High] {
            assert_eq!(DetailPreset::from_str(preset.as_str()), Some(preset));
        }
        assert_eq!(DetailPreset::from_str("ultra"), None);
    }

    #[test]
    fn test_preset_capabilities() {
        assert!(DetailPreset::High.full_lights());
        assert!(!DetailPreset::Low.full_lights());
        assert!(DetailPreset::High.view_margin() > DetailPreset::Low.view_margin());
    }
}
