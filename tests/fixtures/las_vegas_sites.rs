//! Real Las Vegas / Henderson locations for realistic test fixtures.
//!
//! Coordinates sourced from OpenStreetMap.

use route_optimizer::Location;

/// A named customer or depot site.
#[derive(Debug, Clone, Copy)]
pub struct Site {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Site {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn location(&self) -> Location {
        Location::new(self.lat, self.lng).with_address(self.name)
    }
}

// ============================================================================
// Depots (technician start locations)
// ============================================================================

pub const DEPOTS: &[Site] = &[
    Site::new("West Yard", 36.1147, -115.2350),
    Site::new("Henderson Yard", 36.0395, -115.0490),
];

// ============================================================================
// West Side Customers
// ============================================================================

pub const WEST_SIDE_SITES: &[Site] = &[
    Site::new("Summerlin Plaza", 36.1190, -115.2420),
    Site::new("Spring Valley Clinic", 36.1101, -115.2366),
    Site::new("Rainbow Office Park", 36.1163, -115.2430),
    Site::new("Desert Breeze Pool", 36.1065, -115.2310),
    Site::new("Flamingo Dental", 36.1152, -115.2288),
    Site::new("Sahara West Apartments", 36.1208, -115.2379),
    Site::new("Durango Storage", 36.1079, -115.2401),
    Site::new("Buffalo Laundry", 36.1134, -115.2455),
    Site::new("Jones Car Wash", 36.1187, -115.2302),
    Site::new("Tropicana Bakery", 36.1047, -115.2364),
];

// ============================================================================
// Henderson Customers
// ============================================================================

pub const HENDERSON_SITES: &[Site] = &[
    Site::new("Green Valley Ranch Area", 36.0308, -115.0825),
    Site::new("Sunset Station Area", 36.0614, -115.0631),
    Site::new("Islander's Grill", 36.0335058, -114.9856162),
    Site::new("Water Street Cafe", 36.0386, -114.9818),
    Site::new("Henderson Pavilion", 36.0283, -115.0442),
    Site::new("Stephanie Street Dental", 36.0470, -115.0492),
    Site::new("Horizon Ridge School", 36.0212, -115.0617),
    Site::new("Eastern Fitness", 36.0451, -115.1005),
    Site::new("Warm Springs Motel", 36.0563, -115.0459),
    Site::new("Paseo Verde Library", 36.0217, -115.0882),
];

// ============================================================================
// Outlying (far from both depots)
// ============================================================================

pub const OUTLYING_SITES: &[Site] = &[
    Site::new("Boulder City Airport", 35.9473, -114.8611),
    Site::new("Mesquite Truck Stop", 36.8055, -114.0672),
];

pub fn all_sites() -> Vec<Site> {
    let mut all = Vec::with_capacity(WEST_SIDE_SITES.len() + HENDERSON_SITES.len() + OUTLYING_SITES.len());
    all.extend_from_slice(WEST_SIDE_SITES);
    all.extend_from_slice(HENDERSON_SITES);
    all.extend_from_slice(OUTLYING_SITES);
    all
}
