//! Rapport d'exécution (scénarios traités, impacts, équipements non classés)
//!
//! Ce module collecte les résultats de chaque scénario pour les afficher
//! sur la console ou les sauvegarder en JSON.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use fldimpact::AmenityCategory;
use serde::Serialize;

use crate::export::ImpactRecord;

/// Résumé d'un scénario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSummary {
    /// Nom de la carte d'inondation
    pub flood_map: String,
    /// Hauteur d'eau maximale (attribut `FloodValue`)
    pub flood_depth: Option<f64>,
    /// Hectares agricoles inondés
    pub agriculture_ha: f64,
    /// Population inondée
    pub population: u64,
    /// Équipements par catégorie (libellé → compte)
    pub amenity_groups: BTreeMap<String, usize>,
    /// Équipements par tag OSM
    pub amenities: BTreeMap<String, usize>,
    /// Tags sans catégorie
    pub unclassified: usize,
}

impl ScenarioSummary {
    pub fn new(
        record: &ImpactRecord,
        amenities: BTreeMap<String, usize>,
        unclassified: usize,
    ) -> Self {
        let amenity_groups = AmenityCategory::ALL
            .iter()
            .map(|&c| (c.label().to_string(), record.count(c)))
            .filter(|(_, n)| *n > 0)
            .collect();
        Self {
            flood_map: record.flood_map_name.clone(),
            flood_depth: record.flood_depth,
            agriculture_ha: record.agriculture_ha,
            population: record.population,
            amenity_groups,
            amenities,
            unclassified,
        }
    }

    /// Nombre total d'équipements classés
    pub fn amenity_total(&self) -> usize {
        self.amenity_groups.values().sum()
    }
}

/// Rapport complet d'une exécution
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImpactReport {
    /// Zone étudiée (`<region>, <country>`)
    pub location: String,
    /// Durée de l'exécution
    pub duration_secs: f64,
    /// Scénarios traités, dans l'ordre
    pub scenarios: Vec<ScenarioSummary>,
    /// Fichier CSV produit
    pub output_file: Option<String>,
}

impl ImpactReport {
    pub fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            ..Default::default()
        }
    }

    /// Enregistre un scénario terminé
    pub fn record_scenario(&mut self, summary: ScenarioSummary) {
        self.scenarios.push(summary);
    }

    pub fn set_output(&mut self, path: &Path) {
        self.output_file = Some(path.display().to_string());
    }

    /// Définit la durée de l'exécution
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    pub fn total_hectares(&self) -> f64 {
        self.scenarios.iter().map(|s| s.agriculture_ha).sum()
    }

    pub fn total_unclassified(&self) -> usize {
        self.scenarios.iter().map(|s| s.unclassified).sum()
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("FLOOD IMPACT REPORT - {}", self.location);
        println!("{}", "=".repeat(60));

        println!("\nDuration: {:.2}s", self.duration_secs);
        println!("Scenarios: {}", self.scenarios.len());

        for s in &self.scenarios {
            println!("\n--- {} ---", s.flood_map);
            match s.flood_depth {
                Some(depth) => println!("Flood depth: {}", depth),
                None => println!("Flood depth: n/a"),
            }
            println!("Agriculture: {:.2} ha", s.agriculture_ha);
            println!("Population: {}", s.population);

            if s.amenity_groups.is_empty() {
                println!("Amenities: none");
            } else {
                println!("Amenity groups:");
                for (group, n) in &s.amenity_groups {
                    println!("  {}: {}", group, n);
                }
                println!("Amenities:");
                for (tag, n) in &s.amenities {
                    println!("  {}: {}", tag, n);
                }
            }
            if s.unclassified > 0 {
                println!("Unclassified amenities: {}", s.unclassified);
            }
        }

        if let Some(ref output) = self.output_file {
            println!("\nOutput: {}", output);
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} scenarios, {:.2} ha, {} unclassified amenities",
            self.location,
            self.scenarios.len(),
            self.total_hectares(),
            self.total_unclassified()
        )
    }
}
