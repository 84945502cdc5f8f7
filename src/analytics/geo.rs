//! Geographic clustering into coarse named regions
//!
//! Regions are axis-aligned bounding boxes evaluated in declaration
//! order; the boxes deliberately overlap and the first match wins, so
//! reordering the table changes classification results. Events without a
//! coordinate, or outside every box, are excluded from region counts but
//! stay in every other aggregate.

use crate::engine::types::{GeoPoint, TagEvent, TagPolarity};

#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.min_latitude
            && point.latitude <= self.max_latitude
            && point.longitude >= self.min_longitude
            && point.longitude <= self.max_longitude
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub name: &'static str,
    pub bounds: BoundingBox,
}

/// Region table in priority order; first match wins
pub const REGIONS: [Region; 5] = [
    Region {
        name: "Northeast",
        bounds: BoundingBox {
            min_latitude: 38.8,
            max_latitude: 47.5,
            min_longitude: -80.6,
            max_longitude: -66.9,
        },
    },
    Region {
        name: "Southeast",
        bounds: BoundingBox {
            min_latitude: 24.5,
            max_latitude: 39.0,
            min_longitude: -92.1,
            max_longitude: -75.0,
        },
    },
    Region {
        name: "Midwest",
        bounds: BoundingBox {
            min_latitude: 36.0,
            max_latitude: 49.5,
            min_longitude: -104.1,
            max_longitude: -80.5,
        },
    },
    Region {
        name: "Southwest",
        bounds: BoundingBox {
            min_latitude: 25.8,
            max_latitude: 37.0,
            min_longitude: -114.9,
            max_longitude: -93.5,
        },
    },
    Region {
        name: "West",
        bounds: BoundingBox {
            min_latitude: 31.3,
            max_latitude: 49.1,
            min_longitude: -124.8,
            max_longitude: -102.0,
        },
    },
];

/// Classify a coordinate to the first matching region
pub fn classify(point: &GeoPoint) -> Option<&'static str> {
    REGIONS
        .iter()
        .find(|region| region.bounds.contains(point))
        .map(|region| region.name)
}

/// Per-region totals with the positive/negative split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionStats {
    pub region: &'static str,
    pub total: u64,
    pub positive: u64,
    pub negative: u64,
}

/// Count events per region, in region priority order.
///
/// Regions with no matching events are included with zero counts so the
/// output shape is stable.
pub fn region_breakdown(events: &[TagEvent]) -> Vec<RegionStats> {
    let mut stats: Vec<RegionStats> = REGIONS
        .iter()
        .map(|region| RegionStats {
            region: region.name,
            total: 0,
            positive: 0,
            negative: 0,
        })
        .collect();

    for event in events {
        let Some(location) = &event.location else {
            continue;
        };
        let Some(name) = classify(location) else {
            continue;
        };

        // classify returns a name straight from REGIONS, so this finds it
        if let Some(entry) = stats.iter_mut().find(|s| s.region == name) {
            entry.total += 1;
            match event.polarity {
                TagPolarity::Positive => entry.positive += 1,
                TagPolarity::Negative => entry.negative += 1,
            }
        }
    }

    stats
}
