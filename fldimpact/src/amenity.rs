//! Classification des tags `amenity` OpenStreetMap en catégories d'impact
//!
//! La table est une constante : les catégories sont testées dans l'ordre de
//! déclaration et la première qui répond l'emporte.
//!
//! Le test de correspondance est « le mot-clé contient le tag »
//! (`keyword.contains(tag)`) et non l'inverse. Un tag exact est donc reconnu,
//! mais un tag plus long que tous les mots-clés ne l'est jamais, et la chaîne
//! vide correspond au premier mot-clé (`food`).

use std::fmt;
use std::str::FromStr;

/// Catégorie d'équipement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AmenityCategory {
    Food,
    Education,
    Transportation,
    Financial,
    Healthcare,
    Entertainment,
    Others,
    PublicService,
    Facilities,
    WasteManagement,
}

const FOOD: &[&str] = &[
    "bar",
    "biergarten",
    "cafe",
    "drinking_water",
    "fast_food",
    "food_court",
    "ice_cream",
    "pub",
    "restaurant",
];

const EDUCATION: &[&str] = &[
    "college",
    "driving_school",
    "kindergarten",
    "language_school",
    "library",
    "toy_library",
    "music_school",
    "school",
    "university",
];

const TRANSPORTATION: &[&str] = &[
    "bicycle_parking",
    "bicycle_repair_station",
    "bicycle_rental",
    "boat_rental",
    "boat_sharing",
    "bus_station",
    "car_rental",
    "car_sharing",
    "car_wash",
    "vehicle_inspection",
    "charging_station",
    "ferry_terminal",
    "fuel",
    "grit_bin",
    "motorcycle_parking",
    "parking",
    "parking_entrance",
    "parking_space",
    "taxi",
    "kick-scooter_rental",
];

const FINANCIAL: &[&str] = &["atm", "bank", "bureau_de_change"];

const HEALTHCARE: &[&str] = &[
    "baby_hatch",
    "clinic",
    "dentist",
    "doctors",
    "hospital",
    "nursing_home",
    "pharmacy",
    "social_facility",
    "veterinary",
];

const ENTERTAINMENT: &[&str] = &[
    "arts_centre",
    "brothel",
    "casino",
    "cinema",
    "community_centre",
    "conference_centre",
    "events_venue",
    "fountain",
    "gambling",
    "love_hotel",
    "nightclub",
    "planetarium",
    "public_bookcase",
    "social_centre",
    "stripclub",
    "studio",
    "swingerclub",
    "theatre",
];

const OTHERS: &[&str] = &[
    "animal_boarding",
    "animal_breeding",
    "animal_shelter",
    "baking_oven",
    "childcare",
    "clock",
    "crematorium",
    "dive_centre",
    "funeral_hall",
    "grave_yard",
    "gym",
    "hunting_stand",
    "internet_cafe",
    "kitchen",
    "kneipp_water_cure",
    "lounger",
    "marketplace",
    "monastery",
    "photo_booth",
    "place_of_mourning",
    "place_of_worship",
    "public_bath",
    "public_building",
    "refugee_site",
    "vending_machine",
    "user defined",
];

const PUBLIC_SERVICE: &[&str] = &[
    "courthouse",
    "embassy",
    "fire_station",
    "police",
    "post_box",
    "post_depot",
    "post_office",
    "prison",
    "ranger_station",
    "townhall",
];

const FACILITIES: &[&str] = &[
    "bbq",
    "bench",
    "dog_toilet",
    "give_box",
    "shelter",
    "shower",
    "telephone",
    "toilets",
    "water_point",
    "watering_place",
];

const WASTE_MANAGEMENT: &[&str] = &[
    "sanitary_dump_station",
    "recycling",
    "waste_basket",
    "waste_disposal",
    "waste_transfer_station",
];

/// Table des catégories, dans l'ordre d'évaluation
pub const CATEGORY_TABLE: &[(AmenityCategory, &[&str])] = &[
    (AmenityCategory::Food, FOOD),
    (AmenityCategory::Education, EDUCATION),
    (AmenityCategory::Transportation, TRANSPORTATION),
    (AmenityCategory::Financial, FINANCIAL),
    (AmenityCategory::Healthcare, HEALTHCARE),
    (AmenityCategory::Entertainment, ENTERTAINMENT),
    (AmenityCategory::Others, OTHERS),
    (AmenityCategory::PublicService, PUBLIC_SERVICE),
    (AmenityCategory::Facilities, FACILITIES),
    (AmenityCategory::WasteManagement, WASTE_MANAGEMENT),
];

impl AmenityCategory {
    /// Toutes les catégories, dans l'ordre d'évaluation
    pub const ALL: [AmenityCategory; 10] = [
        AmenityCategory::Food,
        AmenityCategory::Education,
        AmenityCategory::Transportation,
        AmenityCategory::Financial,
        AmenityCategory::Healthcare,
        AmenityCategory::Entertainment,
        AmenityCategory::Others,
        AmenityCategory::PublicService,
        AmenityCategory::Facilities,
        AmenityCategory::WasteManagement,
    ];

    /// Nom court (snake_case) de la catégorie
    pub fn label(self) -> &'static str {
        match self {
            AmenityCategory::Food => "food",
            AmenityCategory::Education => "education",
            AmenityCategory::Transportation => "transportation",
            AmenityCategory::Financial => "financial",
            AmenityCategory::Healthcare => "healthcare",
            AmenityCategory::Entertainment => "entertainment",
            AmenityCategory::Others => "others",
            AmenityCategory::PublicService => "public_service",
            AmenityCategory::Facilities => "facilities",
            AmenityCategory::WasteManagement => "waste_management",
        }
    }

    /// Titre de colonne dans le CSV d'impact
    pub fn column_title(self) -> &'static str {
        match self {
            AmenityCategory::Food => "Food",
            AmenityCategory::Education => "Education",
            AmenityCategory::Transportation => "Transportation",
            AmenityCategory::Financial => "Financial",
            AmenityCategory::Healthcare => "Healthcare",
            AmenityCategory::Entertainment => "Entertainment",
            AmenityCategory::Others => "Others",
            AmenityCategory::PublicService => "Public Service",
            AmenityCategory::Facilities => "Facilities",
            AmenityCategory::WasteManagement => "Waste Management",
        }
    }

    /// Mots-clés connus de la catégorie
    pub fn keywords(self) -> &'static [&'static str] {
        CATEGORY_TABLE
            .iter()
            .find(|(category, _)| *category == self)
            .map(|(_, keywords)| *keywords)
            .unwrap_or(&[])
    }
}

impl fmt::Display for AmenityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AmenityCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AmenityCategory::ALL
            .into_iter()
            .find(|c| c.label() == s)
            .ok_or_else(|| format!("Unknown amenity category: {}", s))
    }
}

/// Retourne la catégorie d'un tag `amenity`, ou `None` si aucun mot-clé ne répond
pub fn classify(tag: &str) -> Option<AmenityCategory> {
    CATEGORY_TABLE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| keyword.contains(tag)))
        .map(|(category, _)| *category)
}
