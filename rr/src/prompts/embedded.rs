//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Grounded route discovery prompt
pub const ROUTE: &str = include_str!("../../prompts/route.pmt");

/// Ten-word tagline prompt
pub const TAGLINE: &str = include_str!("../../prompts/tagline.pmt");

/// Deep-dive safety analysis prompt
pub const DEEP_DIVE: &str = include_str!("../../prompts/deep-dive.pmt");

/// Guide chat system instruction
pub const GUIDE: &str = include_str!("../../prompts/guide.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "route" => Some(ROUTE),
        "tagline" => Some(TAGLINE),
        "deep-dive" => Some(DEEP_DIVE),
        "guide" => Some(GUIDE),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_route() {
        let route = get_embedded("route").unwrap();
        assert!(route.contains("```json"));
        assert!(route.contains("safetyNotes"));
        assert!(route.contains("mapsLink"));
    }

    #[test]
    fn test_get_embedded_guide() {
        let guide = get_embedded("guide").unwrap();
        assert!(guide.contains("Spin Again"));
    }

    #[test]
    fn test_get_embedded_all_present() {
        for name in ["route", "tagline", "deep-dive", "guide"] {
            assert!(get_embedded(name).is_some(), "missing embedded prompt {}", name);
        }
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
