//! User search criteria
//!
//! Preferences are created with defaults at session start and mutated only by
//! direct user input (REPL commands, CLI flags, config defaults).

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

/// Errors raised when preferences are edited or checked before a spin
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreferenceError {
    #[error("Enter a location to spin")]
    EmptyLocation,

    #[error("Minimum distance {min} km is greater than maximum distance {max} km")]
    InvertedRange { min: f64, max: f64 },

    #[error("Distance must be a non-negative number of km, got {0}")]
    NegativeDistance(f64),

    #[error("Unknown {field} '{value}' (expected one of: {expected})")]
    UnknownValue {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid start time '{0}' (expected HH:MM)")]
    InvalidStartTime(String),

    #[error("Unknown preference field '{0}'")]
    UnknownField(String),
}

/// Trail difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Moderate,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Moderate => "Moderate",
            Self::Hard => "Hard",
        }
    }

    /// Parse a difficulty label the way models tend to write it
    ///
    /// Accepts any casing and compound labels such as "Moderate/Hard" or
    /// "Easy to moderate", taking the first recognised word.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        debug!(%s, "Difficulty::parse_lenient: called");
        s.split(|c: char| !c.is_alphabetic())
            .filter(|word| !word.is_empty())
            .find_map(|word| word.parse().ok())
    }
}

impl FromStr for Difficulty {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "moderate" | "medium" => Ok(Self::Moderate),
            "hard" | "difficult" => Ok(Self::Hard),
            _ => Err(PreferenceError::UnknownValue {
                field: "difficulty",
                value: s.to_string(),
                expected: "easy, moderate, hard",
            }),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preferred time of day for the hike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeWindow {
    #[default]
    Morning,
    Afternoon,
    Evening,
    #[serde(rename = "Full Day")]
    FullDay,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "Morning",
            Self::Afternoon => "Afternoon",
            Self::Evening => "Evening",
            Self::FullDay => "Full Day",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.trim().to_lowercase().chars().filter(|c| c.is_alphabetic()).collect();
        match normalized.as_str() {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            "fullday" | "day" | "allday" => Ok(Self::FullDay),
            _ => Err(PreferenceError::UnknownValue {
                field: "time window",
                value: s.to_string(),
                expected: "morning, afternoon, evening, full-day",
            }),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hiker experience level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Experience {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Experience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

impl FromStr for Experience {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" | "novice" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" | "expert" => Ok(Self::Advanced),
            _ => Err(PreferenceError::UnknownValue {
                field: "experience",
                value: s.to_string(),
                expected: "beginner, intermediate, advanced",
            }),
        }
    }
}

impl fmt::Display for Experience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user's current search criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Free text ("Boulder, CO") or "lat, lng"
    pub location: String,

    /// Lower distance bound in km
    #[serde(rename = "min-distance")]
    pub min_distance: f64,

    /// Upper distance bound in km
    #[serde(rename = "max-distance")]
    pub max_distance: f64,

    pub difficulty: Difficulty,

    #[serde(rename = "time-window")]
    pub time_window: TimeWindow,

    pub experience: Experience,

    /// Free-text requirements ("Dog friendly, must have parking")
    pub notes: String,

    /// Optional exact start time
    #[serde(
        rename = "start-time",
        serialize_with = "serialize_start_time",
        deserialize_with = "deserialize_start_time"
    )]
    pub start_time: Option<NaiveTime>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            location: String::new(),
            min_distance: 3.0,
            max_distance: 10.0,
            difficulty: Difficulty::default(),
            time_window: TimeWindow::default(),
            experience: Experience::default(),
            notes: String::new(),
            start_time: None,
        }
    }
}

impl Preferences {
    /// Check that these preferences can start a spin
    ///
    /// Location must be non-blank; distances must be non-negative and
    /// min must not exceed max.
    pub fn validate(&self) -> Result<(), PreferenceError> {
        debug!(location = %self.location, min = %self.min_distance, max = %self.max_distance, "Preferences::validate: called");
        if self.location.trim().is_empty() {
            return Err(PreferenceError::EmptyLocation);
        }
        for value in [self.min_distance, self.max_distance] {
            if !value.is_finite() || value < 0.0 {
                return Err(PreferenceError::NegativeDistance(value));
            }
        }
        if self.min_distance > self.max_distance {
            return Err(PreferenceError::InvertedRange {
                min: self.min_distance,
                max: self.max_distance,
            });
        }
        Ok(())
    }

    /// Notes as they should appear in the route prompt
    pub fn notes_or_none(&self) -> &str {
        let trimmed = self.notes.trim();
        if trimmed.is_empty() { "None" } else { trimmed }
    }

    /// Start time formatted as HH:MM
    pub fn start_time_label(&self) -> Option<String> {
        self.start_time.map(|t| t.format("%H:%M").to_string())
    }

    /// Set a single field from user text input
    ///
    /// Field names accept the REPL spellings (`min`, `max-km`, `time`, ...).
    /// An empty value for `notes` or `start` clears the field.
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<(), PreferenceError> {
        debug!(%field, %value, "Preferences::set_field: called");
        let value = value.trim();
        match field.to_lowercase().as_str() {
            "location" | "loc" | "where" => self.location = value.to_string(),
            "min" | "min-km" | "min-distance" => self.min_distance = parse_km(value)?,
            "max" | "max-km" | "max-distance" => self.max_distance = parse_km(value)?,
            "difficulty" | "diff" => self.difficulty = value.parse()?,
            "time" | "time-window" | "window" => self.time_window = value.parse()?,
            "experience" | "exp" | "level" => self.experience = value.parse()?,
            "notes" | "note" => self.notes = value.to_string(),
            "start" | "start-time" => self.start_time = parse_start_time(value)?,
            other => {
                debug!(%other, "Preferences::set_field: unknown field");
                return Err(PreferenceError::UnknownField(other.to_string()));
            }
        }
        Ok(())
    }

    /// Location string for a pair of coordinates, as geolocation fills it in
    pub fn location_from_coords(latitude: f64, longitude: f64) -> String {
        format!("{}, {}", latitude, longitude)
    }
}

fn parse_km(value: &str) -> Result<f64, PreferenceError> {
    let value = value.trim_end_matches("km").trim();
    let km: f64 = value.parse().map_err(|_| PreferenceError::UnknownValue {
        field: "distance",
        value: value.to_string(),
        expected: "a number of km",
    })?;
    if !km.is_finite() || km < 0.0 {
        return Err(PreferenceError::NegativeDistance(km));
    }
    Ok(km)
}

/// Parse an optional HH:MM start time; blank clears it
pub fn parse_start_time(value: &str) -> Result<Option<NaiveTime>, PreferenceError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map(Some)
        .map_err(|_| PreferenceError::InvalidStartTime(value.to_string()))
}

fn serialize_start_time<S: Serializer>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(t) => serializer.serialize_str(&t.format("%H:%M").to_string()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_start_time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveTime>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        Some(s) => parse_start_time(&s).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let prefs = Preferences::default();
        assert!(prefs.location.is_empty());
        assert_eq!(prefs.min_distance, 3.0);
        assert_eq!(prefs.max_distance, 10.0);
        assert_eq!(prefs.difficulty, Difficulty::Moderate);
        assert_eq!(prefs.time_window, TimeWindow::Morning);
        assert_eq!(prefs.experience, Experience::Intermediate);
        assert!(prefs.start_time.is_none());
    }

    #[test]
    fn test_validate_requires_location() {
        let prefs = Preferences::default();
        assert_eq!(prefs.validate(), Err(PreferenceError::EmptyLocation));

        let prefs = Preferences {
            location: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(prefs.validate(), Err(PreferenceError::EmptyLocation));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let prefs = Preferences {
            location: "Boulder, CO".to_string(),
            min_distance: 12.0,
            max_distance: 5.0,
            ..Default::default()
        };
        assert_eq!(
            prefs.validate(),
            Err(PreferenceError::InvertedRange { min: 12.0, max: 5.0 })
        );
    }

    #[test]
    fn test_validate_accepts_equal_bounds() {
        let prefs = Preferences {
            location: "Boulder, CO".to_string(),
            min_distance: 5.0,
            max_distance: 5.0,
            ..Default::default()
        };
        assert!(prefs.validate().is_ok());
    }

    #[test]
    fn test_notes_or_none() {
        let mut prefs = Preferences::default();
        assert_eq!(prefs.notes_or_none(), "None");
        prefs.notes = "Dog friendly".to_string();
        assert_eq!(prefs.notes_or_none(), "Dog friendly");
    }

    #[test]
    fn test_set_field() {
        let mut prefs = Preferences::default();
        prefs.set_field("location", "Boulder, CO").unwrap();
        prefs.set_field("min", "4").unwrap();
        prefs.set_field("max-km", "12km").unwrap();
        prefs.set_field("difficulty", "hard").unwrap();
        prefs.set_field("time", "full-day").unwrap();
        prefs.set_field("exp", "Beginner").unwrap();
        prefs.set_field("start", "07:30").unwrap();

        assert_eq!(prefs.location, "Boulder, CO");
        assert_eq!(prefs.min_distance, 4.0);
        assert_eq!(prefs.max_distance, 12.0);
        assert_eq!(prefs.difficulty, Difficulty::Hard);
        assert_eq!(prefs.time_window, TimeWindow::FullDay);
        assert_eq!(prefs.experience, Experience::Beginner);
        assert_eq!(prefs.start_time_label().as_deref(), Some("07:30"));

        prefs.set_field("start", "").unwrap();
        assert!(prefs.start_time.is_none());
    }

    #[test]
    fn test_set_field_errors() {
        let mut prefs = Preferences::default();
        assert!(matches!(
            prefs.set_field("difficulty", "extreme"),
            Err(PreferenceError::UnknownValue { .. })
        ));
        assert!(matches!(
            prefs.set_field("start", "7pm"),
            Err(PreferenceError::InvalidStartTime(_))
        ));
        assert!(matches!(
            prefs.set_field("min", "-2"),
            Err(PreferenceError::NegativeDistance(_))
        ));
        assert!(matches!(
            prefs.set_field("altitude", "2000"),
            Err(PreferenceError::UnknownField(_))
        ));
    }

    #[test]
    fn test_difficulty_parse_lenient() {
        assert_eq!(Difficulty::parse_lenient("Moderate"), Some(Difficulty::Moderate));
        assert_eq!(Difficulty::parse_lenient("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse_lenient("Easy/Moderate"), Some(Difficulty::Easy));
        assert_eq!(Difficulty::parse_lenient("strenuous"), None);
    }

    #[test]
    fn test_time_window_serde_uses_display_names() {
        let json = serde_json::to_string(&TimeWindow::FullDay).unwrap();
        assert_eq!(json, "\"Full Day\"");
    }

    #[test]
    fn test_deserialize_yaml_preferences() {
        let yaml = r#"
location: Golden, CO
min-distance: 2
max-distance: 8
difficulty: Easy
time-window: Full Day
start-time: "06:45"
"#;
        let prefs: Preferences = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(prefs.location, "Golden, CO");
        assert_eq!(prefs.max_distance, 8.0);
        assert_eq!(prefs.difficulty, Difficulty::Easy);
        assert_eq!(prefs.time_window, TimeWindow::FullDay);
        assert_eq!(prefs.experience, Experience::Intermediate);
        assert_eq!(prefs.start_time_label().as_deref(), Some("06:45"));
    }

    #[test]
    fn test_location_from_coords() {
        assert_eq!(Preferences::location_from_coords(40.015, -105.27), "40.015, -105.27");
    }
}
