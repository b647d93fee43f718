//! Export CSV : table d'impacts et points intermédiaires

use std::path::Path;

use anyhow::{Context, Result};
use fldimpact::{AmenityCategory, CategoryCounts, WeightedPoint};
use serde::Serialize;

/// Une ligne du CSV d'impacts (ordre des colonnes = ordre des champs)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactRecord {
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Province")]
    pub province: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Return Period")]
    pub return_period: Option<String>,
    #[serde(rename = "Flood Depth")]
    pub flood_depth: Option<f64>,
    #[serde(rename = "Flowrate (cms)")]
    pub flowrate: Option<f64>,
    #[serde(rename = "Flood Date")]
    pub flood_date: Option<String>,
    #[serde(rename = "Event")]
    pub event: Option<String>,
    #[serde(rename = "Impact Method")]
    pub impact_method: String,
    #[serde(rename = "Map Method")]
    pub map_method: String,
    #[serde(rename = "Flood Map Name")]
    pub flood_map_name: String,
    #[serde(rename = "Agriculture (ha)")]
    pub agriculture_ha: f64,
    #[serde(rename = "Population")]
    pub population: u64,
    #[serde(rename = "Education")]
    pub education: usize,
    #[serde(rename = "Entertainment")]
    pub entertainment: usize,
    #[serde(rename = "Facilities")]
    pub facilities: usize,
    #[serde(rename = "Financial")]
    pub financial: usize,
    #[serde(rename = "Food")]
    pub food: usize,
    #[serde(rename = "Healthcare")]
    pub healthcare: usize,
    #[serde(rename = "Others")]
    pub others: usize,
    #[serde(rename = "Public Service")]
    pub public_service: usize,
    #[serde(rename = "Transportation")]
    pub transportation: usize,
    #[serde(rename = "Waste Management")]
    pub waste_management: usize,
}

/// En-têtes du CSV d'impacts, dans l'ordre
pub const IMPACT_COLUMNS: [&str; 23] = [
    "Country",
    "Province",
    "Region",
    "Return Period",
    "Flood Depth",
    "Flowrate (cms)",
    "Flood Date",
    "Event",
    "Impact Method",
    "Map Method",
    "Flood Map Name",
    "Agriculture (ha)",
    "Population",
    "Education",
    "Entertainment",
    "Facilities",
    "Financial",
    "Food",
    "Healthcare",
    "Others",
    "Public Service",
    "Transportation",
    "Waste Management",
];

impl ImpactRecord {
    /// Reporte les comptes par catégorie dans les colonnes
    pub fn set_counts(&mut self, counts: &CategoryCounts) {
        self.education = counts.get(AmenityCategory::Education);
        self.entertainment = counts.get(AmenityCategory::Entertainment);
        self.facilities = counts.get(AmenityCategory::Facilities);
        self.financial = counts.get(AmenityCategory::Financial);
        self.food = counts.get(AmenityCategory::Food);
        self.healthcare = counts.get(AmenityCategory::Healthcare);
        self.others = counts.get(AmenityCategory::Others);
        self.public_service = counts.get(AmenityCategory::PublicService);
        self.transportation = counts.get(AmenityCategory::Transportation);
        self.waste_management = counts.get(AmenityCategory::WasteManagement);
    }

    /// Compte pour une catégorie
    pub fn count(&self, category: AmenityCategory) -> usize {
        match category {
            AmenityCategory::Food => self.food,
            AmenityCategory::Education => self.education,
            AmenityCategory::Transportation => self.transportation,
            AmenityCategory::Financial => self.financial,
            AmenityCategory::Healthcare => self.healthcare,
            AmenityCategory::Entertainment => self.entertainment,
            AmenityCategory::Others => self.others,
            AmenityCategory::PublicService => self.public_service,
            AmenityCategory::Facilities => self.facilities,
            AmenityCategory::WasteManagement => self.waste_management,
        }
    }
}

/// Écrit la table d'impacts (en-tête toujours présent)
pub fn write_impact_csv(records: &[ImpactRecord], path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create CSV: {}", path.display()))?;

    writer.write_record(IMPACT_COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Écrit des points pondérés `x,y,<colonne>`
pub fn write_points_csv(points: &[WeightedPoint], weight_column: &str, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV: {}", path.display()))?;

    writer.write_record(["x", "y", weight_column])?;
    for p in points {
        writer.write_record([
            p.point.x().to_string(),
            p.point.y().to_string(),
            p.weight.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;

    fn sample_record() -> ImpactRecord {
        ImpactRecord {
            country: "Peru".to_string(),
            province: "San Martin".to_string(),
            region: "Chazuta".to_string(),
            return_period: None,
            flood_depth: Some(2.5),
            flowrate: None,
            flood_date: None,
            event: None,
            impact_method: "Rust".to_string(),
            map_method: "HAND".to_string(),
            flood_map_name: "fld_100yr".to_string(),
            agriculture_ha: 0.27,
            population: 1230,
            education: 0,
            entertainment: 0,
            facilities: 0,
            financial: 0,
            food: 0,
            healthcare: 0,
            others: 0,
            public_service: 0,
            transportation: 0,
            waste_management: 0,
        }
    }

    #[test]
    fn test_impact_csv_layout() {
        let path = std::env::temp_dir().join("flood_impact_test_impact.csv");
        let mut record = sample_record();
        let mut counts = CategoryCounts::default();
        counts.add(AmenityCategory::Education, 3);
        counts.add(AmenityCategory::WasteManagement, 1);
        record.set_counts(&counts);

        write_impact_csv(&[record], &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();

        assert_eq!(lines.next().unwrap(), IMPACT_COLUMNS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "Peru,San Martin,Chazuta,,2.5,,,,Rust,HAND,fld_100yr,0.27,1230,3,0,0,0,0,0,0,0,0,1"
        );
        assert!(lines.next().is_none());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_empty_table_has_header() {
        let path = std::env::temp_dir().join("flood_impact_test_empty.csv");
        write_impact_csv(&[], &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), IMPACT_COLUMNS.join(","));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_count_matches_set_counts() {
        let mut record = sample_record();
        let mut counts = CategoryCounts::default();
        for (i, category) in AmenityCategory::ALL.iter().enumerate() {
            counts.add(*category, i + 1);
        }
        record.set_counts(&counts);
        for category in AmenityCategory::ALL {
            assert_eq!(record.count(category), counts.get(category));
        }
    }

    #[test]
    fn test_points_csv() {
        let path = std::env::temp_dir().join("flood_impact_test_points.csv");
        let points = vec![WeightedPoint {
            point: Point::new(-76.1, -6.5),
            weight: 0.09,
        }];
        write_points_csv(&points, "Hectares", &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "x,y,Hectares\n-76.1,-6.5,0.09\n");
        std::fs::remove_file(path).ok();
    }
}
