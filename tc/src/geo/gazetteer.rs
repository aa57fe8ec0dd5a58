//! City-to-country gazetteer
//!
//! Forward geocoding for a bare place name is ambiguous ("Tam Vi, Hanoi"
//! resolves to the wrong continent without a country hint). The gazetteer
//! maps well-known destination cities to their country so enrichment queries
//! can carry it.

use tracing::debug;

/// Resolves a destination city to its country, when known
pub trait Gazetteer: Send + Sync {
    /// Country for the given city, or `None` when unknown
    fn country_for(&self, city: &str) -> Option<&'static str>;
}

/// Built-in table of popular destinations
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticGazetteer;

impl Gazetteer for StaticGazetteer {
    fn country_for(&self, city: &str) -> Option<&'static str> {
        debug!(%city, "StaticGazetteer::country_for: called");
        let country = match city.trim().to_lowercase().as_str() {
            // Vietnam
            "hanoi" => "Vietnam",
            "ho chi minh city" => "Vietnam",
            "saigon" => "Vietnam",
            "da nang" => "Vietnam",
            "hue" => "Vietnam",
            "nha trang" => "Vietnam",
            "hoi an" => "Vietnam",

            // Thailand
            "bangkok" => "Thailand",
            "chiang mai" => "Thailand",
            "phuket" => "Thailand",
            "pattaya" => "Thailand",

            // India
            "mumbai" => "India",
            "delhi" => "India",
            "bangalore" => "India",
            "kolkata" => "India",
            "chennai" => "India",
            "hyderabad" => "India",
            "pune" => "India",
            "goa" => "India",
            "jaipur" => "India",
            "agra" => "India",

            // Malaysia
            "kuala lumpur" => "Malaysia",
            "penang" => "Malaysia",
            "johor bahru" => "Malaysia",

            // Singapore
            "singapore" => "Singapore",

            // Indonesia
            "jakarta" => "Indonesia",
            "bali" => "Indonesia",
            "yogyakarta" => "Indonesia",

            // Philippines
            "manila" => "Philippines",
            "cebu" => "Philippines",

            // Europe
            "paris" => "France",
            "london" => "United Kingdom",
            "rome" => "Italy",
            "madrid" => "Spain",
            "berlin" => "Germany",
            "amsterdam" => "Netherlands",

            // USA
            "new york" => "United States",
            "los angeles" => "United States",
            "chicago" => "United States",
            "san francisco" => "United States",
            "miami" => "United States",

            // Other popular destinations
            "tokyo" => "Japan",
            "seoul" => "South Korea",
            "beijing" => "China",
            "shanghai" => "China",
            "sydney" => "Australia",
            "melbourne" => "Australia",

            _ => return None,
        };
        Some(country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_cities() {
        let gazetteer = StaticGazetteer;
        assert_eq!(gazetteer.country_for("Hanoi"), Some("Vietnam"));
        assert_eq!(gazetteer.country_for("bangalore"), Some("India"));
        assert_eq!(gazetteer.country_for("New York"), Some("United States"));
    }

    #[test]
    fn test_lookup_is_case_and_whitespace_insensitive() {
        let gazetteer = StaticGazetteer;
        assert_eq!(gazetteer.country_for("  HO CHI MINH CITY "), Some("Vietnam"));
    }

    #[test]
    fn test_unknown_city() {
        let gazetteer = StaticGazetteer;
        assert_eq!(gazetteer.country_for("Atlantis"), None);
        assert_eq!(gazetteer.country_for(""), None);
    }
}
