//! Route domain type
//!
//! A Route is created wholesale from a recommendation response, enriched once
//! with a tagline, then left alone until the next spin replaces it.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::preferences::Difficulty;

/// Safety notes used when the model leaves them out
pub const DEFAULT_SAFETY_NOTES: [&str; 2] = ["Check local weather.", "Bring water."];

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A web or maps page the recommendation was grounded on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

/// A recommended hiking route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Opaque identifier, fresh per successful recommendation
    pub id: String,
    pub name: String,
    pub location: String,
    /// Free-text label such as "5.5 km"
    pub distance: String,
    pub difficulty: Difficulty,
    pub terrain: String,
    /// Model description, replaced by the tagline once generated
    pub description: String,
    /// Never empty
    pub safety_notes: Vec<String>,
    /// Never empty
    pub maps_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// Grounding sources reported alongside the answer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
}

impl Route {
    /// Copy of this route with the description replaced
    pub fn with_description(&self, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..self.clone()
        }
    }
}

/// The JSON object the route prompt asks the model for
///
/// Optional fields get defaults in [`RouteDraft::into_route`]; the rest are
/// required and a missing one fails the parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDraft {
    pub name: String,
    pub location: String,
    #[serde(deserialize_with = "distance_label")]
    pub distance: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    pub terrain: String,
    pub description: String,
    #[serde(default)]
    pub safety_notes: Option<Vec<String>>,
    #[serde(default)]
    pub maps_link: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

impl RouteDraft {
    /// Turn the draft into a complete Route with a fresh id
    ///
    /// `requested` is used when the model's difficulty label is missing or
    /// unrecognisable.
    pub fn into_route(self, requested: Difficulty) -> Route {
        debug!(name = %self.name, location = %self.location, "RouteDraft::into_route: called");

        let difficulty = match self.difficulty.as_deref().and_then(Difficulty::parse_lenient) {
            Some(d) => d,
            None => {
                warn!(label = ?self.difficulty, %requested, "Route difficulty not recognised, using requested difficulty");
                requested
            }
        };

        let safety_notes: Vec<String> = self
            .safety_notes
            .unwrap_or_default()
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        let safety_notes = if safety_notes.is_empty() {
            debug!("RouteDraft::into_route: no safety notes, using defaults");
            DEFAULT_SAFETY_NOTES.iter().map(|s| s.to_string()).collect()
        } else {
            safety_notes
        };

        let maps_link = match self.maps_link.map(|l| l.trim().to_string()) {
            Some(link) if !link.is_empty() => link,
            _ => {
                debug!("RouteDraft::into_route: no maps link, synthesizing search link");
                maps_search_link(&self.name, &self.location)
            }
        };

        Route {
            id: Uuid::now_v7().to_string(),
            name: self.name,
            location: self.location,
            distance: self.distance,
            difficulty,
            terrain: self.terrain,
            description: self.description,
            safety_notes,
            maps_link,
            coordinates: self.coordinates,
            sources: Vec::new(),
        }
    }
}

/// Accept the distance as text or as a bare number of kilometres
fn distance_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Label {
        Text(String),
        Km(f64),
    }

    Ok(match Label::deserialize(deserializer)? {
        Label::Text(text) => text,
        Label::Km(km) => format!("{} km", km),
    })
}

/// Google Maps search URL for a route name and location
pub fn maps_search_link(name: &str, location: &str) -> String {
    let query = format!("{} {}", name, location);
    format!(
        "https://www.google.com/maps/search/?api=1&query={}",
        urlencoding::encode(&query)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft_json(extra: &str) -> String {
        format!(
            r#"{{
                "name": "Royal Arch Trail",
                "location": "Boulder, CO",
                "distance": "5.5 km",
                "difficulty": "Hard",
                "terrain": "Forest, Ridge",
                "description": "Steep climb to a sandstone arch."{}
            }}"#,
            extra
        )
    }

    #[test]
    fn test_into_route_fills_defaults() {
        let draft: RouteDraft = serde_json::from_str(&draft_json("")).unwrap();
        let route = draft.into_route(Difficulty::Moderate);

        assert_eq!(route.difficulty, Difficulty::Hard);
        assert_eq!(route.safety_notes, vec!["Check local weather.", "Bring water."]);
        assert_eq!(
            route.maps_link,
            "https://www.google.com/maps/search/?api=1&query=Royal%20Arch%20Trail%20Boulder%2C%20CO"
        );
        assert!(!route.id.is_empty());
        assert!(route.coordinates.is_none());
    }

    #[test]
    fn test_into_route_keeps_model_values() {
        let json = draft_json(
            r#", "safetyNotes": ["Loose rock near the arch"], "mapsLink": "https://maps.google.com/?q=royal+arch",
               "coordinates": {"lat": 39.99, "lng": -105.29}"#,
        );
        let draft: RouteDraft = serde_json::from_str(&json).unwrap();
        let route = draft.into_route(Difficulty::Easy);

        assert_eq!(route.safety_notes, vec!["Loose rock near the arch"]);
        assert_eq!(route.maps_link, "https://maps.google.com/?q=royal+arch");
        assert_eq!(route.coordinates, Some(Coordinates { lat: 39.99, lng: -105.29 }));
    }

    #[test]
    fn test_empty_notes_and_link_are_replaced() {
        let json = draft_json(r#", "safetyNotes": [], "mapsLink": "  ""#);
        let route = serde_json::from_str::<RouteDraft>(&json)
            .unwrap()
            .into_route(Difficulty::Moderate);

        assert_eq!(route.safety_notes.len(), 2);
        assert!(route.maps_link.starts_with("https://www.google.com/maps/search/"));
    }

    #[test]
    fn test_unknown_difficulty_uses_requested() {
        let json = draft_json("").replace("\"Hard\"", "\"Strenuous\"");
        let route = serde_json::from_str::<RouteDraft>(&json)
            .unwrap()
            .into_route(Difficulty::Easy);
        assert_eq!(route.difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_numeric_distance_becomes_label() {
        let json = draft_json("").replace("\"5.5 km\"", "5.5");
        let route = serde_json::from_str::<RouteDraft>(&json)
            .unwrap()
            .into_route(Difficulty::Hard);
        assert_eq!(route.distance, "5.5 km");

        let json = draft_json("").replace("\"5.5 km\"", "12");
        let draft: RouteDraft = serde_json::from_str(&json).unwrap();
        assert_eq!(draft.distance, "12 km");

        let json = draft_json("").replace("\"5.5 km\"", "true");
        assert!(serde_json::from_str::<RouteDraft>(&json).is_err());
    }

    #[test]
    fn test_missing_required_field_fails() {
        let result = serde_json::from_str::<RouteDraft>(r#"{"name": "Somewhere"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = serde_json::from_str::<RouteDraft>(&draft_json(""))
            .unwrap()
            .into_route(Difficulty::Moderate);
        let b = serde_json::from_str::<RouteDraft>(&draft_json(""))
            .unwrap()
            .into_route(Difficulty::Moderate);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_with_description() {
        let route = serde_json::from_str::<RouteDraft>(&draft_json(""))
            .unwrap()
            .into_route(Difficulty::Moderate);
        let tagged = route.with_description("Climb high, stay safe, earn the arch view.");
        assert_eq!(tagged.id, route.id);
        assert_eq!(tagged.description, "Climb high, stay safe, earn the arch view.");
    }
}
