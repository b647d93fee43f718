//! Extraction du tag `amenity` depuis la colonne HSTORE `other_tags` d'OSM

use std::sync::OnceLock;

use regex::Regex;

fn amenity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#""amenity"=>"(.+?)""#).expect("valid amenity regex"))
}

/// Retourne la valeur de `amenity` dans un champ `other_tags`
///
/// Format attendu : `"amenity"=>"restaurant","cuisine"=>"pizza"`
pub fn extract_amenity(other_tags: &str) -> Option<String> {
    amenity_pattern()
        .captures(other_tags)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
