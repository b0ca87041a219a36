use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::distance::Coordinate;
use crate::ConfigError;

/// A named search origin, e.g. a landmark or an address the user often
/// parks near.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl Place {
    #[must_use]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PlacesFile {
    pub places: Vec<Place>,
}

impl PlacesFile {
    /// Looks a place up by name or alias, ignoring case.
    ///
    /// An exact match wins; otherwise the first place with a name or alias
    /// starting with `query` is returned.
    #[must_use]
    pub fn find(&self, query: &str) -> Option<&Place> {
        let wanted = query.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }

        self.places
            .iter()
            .find(|p| p.names().any(|n| n.to_lowercase() == wanted))
            .or_else(|| {
                self.places
                    .iter()
                    .find(|p| p.names().any(|n| n.to_lowercase().starts_with(&wanted)))
            })
    }
}

/// Load and validate saved places from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_places(path: &Path) -> Result<PlacesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PlacesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let places_file: PlacesFile = serde_yaml::from_str(&content)?;

    validate_places(&places_file)?;

    Ok(places_file)
}

fn validate_places(places_file: &PlacesFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for place in &places_file.places {
        if place.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "place name must be non-empty".to_string(),
            ));
        }

        if !place.coordinate().is_valid() {
            return Err(ConfigError::Validation(format!(
                "place '{}' has invalid coordinates {}, {}",
                place.name, place.lat, place.lng
            )));
        }

        for name in place.names() {
            if !seen_names.insert(name.trim().to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate place name or alias: '{name}'"
                )));
            }
        }
    }

    Ok(())
}
