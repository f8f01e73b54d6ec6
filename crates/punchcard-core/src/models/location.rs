use serde::{Deserialize, Serialize};

/// Radius in meters used when a location carries none.
pub const DEFAULT_PUNCH_RADIUS_M: f64 = 50.0;

/// A site where punching is allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunchLocation {
    #[serde(default)]
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// Allowed distance in meters
    #[serde(default)]
    pub scope: Option<f64>,
}

impl PunchLocation {
    pub fn radius_m(&self) -> f64 {
        match self.scope {
            Some(r) if r > 0.0 => r,
            _ => DEFAULT_PUNCH_RADIUS_M,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_defaults() {
        let loc: PunchLocation = serde_json::from_str(r#"{"name": "HQ", "lat": 25.03, "lng": 121.56}"#).unwrap();
        assert_eq!(loc.radius_m(), 50.0);
        let loc: PunchLocation =
            serde_json::from_str(r#"{"name": "Shop", "lat": 0, "lng": 0, "scope": 120}"#).unwrap();
        assert_eq!(loc.radius_m(), 120.0);
    }
}
