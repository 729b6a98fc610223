use geojson::{Feature, Value};

/// Axis-aligned geographic bounding box, stored as its
/// southwest and northeast corners in (lon, lat) degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LngLatBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl LngLatBounds {
    /// Degenerate box containing a single coordinate
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            west: lon,
            south: lat,
            east: lon,
            north: lat,
        }
    }

    /// Grow the box to include a coordinate. Extending never shrinks the box.
    pub fn extend(&mut self, lon: f64, lat: f64) {
        self.west = self.west.min(lon);
        self.south = self.south.min(lat);
        self.east = self.east.max(lon);
        self.north = self.north.max(lat);
    }

    /// Minimal box covering a ring of `[lon, lat]` positions.
    /// Seeded from the first coordinate, then folded over the rest.
    /// Returns None for an empty ring or a ring of malformed positions.
    pub fn from_ring(ring: &[Vec<f64>]) -> Option<Self> {
        let mut coords = ring.iter().filter(|c| c.len() >= 2);
        let first = coords.next()?;
        let bounds = coords.fold(Self::new(first[0], first[1]), |mut b, c| {
            b.extend(c[0], c[1]);
            b
        });
        Some(bounds)
    }

    pub fn southwest(&self) -> (f64, f64) {
        (self.west, self.south)
    }

    pub fn northeast(&self) -> (f64, f64) {
        (self.east, self.north)
    }

    /// Whether a coordinate lies inside the box (boundary inclusive)
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
    }
}

/// The outermost ring of a feature's first polygon: for a Polygon the
/// exterior ring, for a MultiPolygon the exterior ring of the first member.
/// Holes and polygons after the first are not considered.
pub fn first_outer_ring(feature: &Feature) -> Option<&Vec<Vec<f64>>> {
    match &feature.geometry.as_ref()?.value {
        Value::Polygon(rings) => rings.first(),
        Value::MultiPolygon(polygons) => polygons.first().and_then(|rings| rings.first()),
        _ => None,
    }
}

/// Fitting box for a feature, derived from its first outer ring only
pub fn feature_bounds(feature: &Feature) -> Option<LngLatBounds> {
    first_outer_ring(feature).and_then(|ring| LngLatBounds::from_ring(ring))
}
