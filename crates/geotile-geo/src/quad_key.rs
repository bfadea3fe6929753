//! Quad-tree tile index over Web Mercator space.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::{BoundingBox, GeoCoordinate};

/// Maximum latitude representable in Web Mercator.
const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_78;

/// Errors produced when parsing a quadkey path string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuadKeyError {
    /// The path contains a character other than `0`-`3`.
    #[error("invalid quadkey digit '{digit}' in '{path}'")]
    InvalidDigit { path: String, digit: char },

    /// The path is longer than [`QuadKey::MAX_LOD`] digits.
    #[error("quadkey '{path}' exceeds max level of detail {max}")]
    TooLong { path: String, max: u8 },
}

/// Address of a cell in the quad-tree tiling of the whole planet.
///
/// At level of detail `lod` the planet is divided into a `2^lod × 2^lod` grid;
/// `tile_x` grows eastward from the antimeridian and `tile_y` grows southward
/// from the northern Mercator limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuadKey {
    /// Column within the grid at this LOD.
    pub tile_x: u32,
    /// Row within the grid at this LOD.
    pub tile_y: u32,
    /// Level of detail (0 = whole planet in one tile).
    pub lod: u8,
}

impl QuadKey {
    /// Finest supported level of detail.
    pub const MAX_LOD: u8 = 23;

    /// Number of tiles along one axis at the given LOD.
    ///
    /// # Panics
    ///
    /// Panics if `lod` exceeds [`Self::MAX_LOD`].
    #[must_use]
    pub fn grid_size(lod: u8) -> u32 {
        assert!(
            lod <= Self::MAX_LOD,
            "LOD {lod} exceeds MAX_LOD {}",
            Self::MAX_LOD
        );
        1 << lod
    }

    /// Construct a quadkey, validating coordinates against the grid at `lod`.
    ///
    /// # Panics
    ///
    /// Panics if `lod` exceeds [`Self::MAX_LOD`] or if `tile_x`/`tile_y` are out of range.
    #[must_use]
    pub fn new(tile_x: u32, tile_y: u32, lod: u8) -> Self {
        let size = Self::grid_size(lod);
        assert!(
            tile_x < size,
            "tile_x={tile_x} out of range for LOD {lod} (max {size})"
        );
        assert!(
            tile_y < size,
            "tile_y={tile_y} out of range for LOD {lod} (max {size})"
        );
        Self {
            tile_x,
            tile_y,
            lod,
        }
    }

    /// The quadkey containing `coordinate` at the given LOD.
    ///
    /// Latitudes beyond the Mercator limit are clamped; longitudes wrap.
    ///
    /// # Panics
    ///
    /// Panics if `lod` exceeds [`Self::MAX_LOD`].
    #[must_use]
    pub fn from_coordinate(coordinate: GeoCoordinate, lod: u8) -> Self {
        let size = Self::grid_size(lod);
        let n = size as f64;
        let max_index = (size - 1) as f64;

        let longitude = (coordinate.longitude + 180.0).rem_euclid(360.0) - 180.0;
        let latitude = coordinate
            .latitude
            .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);

        let x = ((longitude + 180.0) / 360.0 * n).floor();
        let lat_rad = latitude.to_radians();
        let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) * 0.5 * n).floor();

        Self {
            tile_x: x.clamp(0.0, max_index) as u32,
            tile_y: y.clamp(0.0, max_index) as u32,
            lod,
        }
    }

    /// Geographic bounds of this tile.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        let n = Self::grid_size(self.lod) as f64;
        let tile_latitude = |y: f64| (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
        let tile_longitude = |x: f64| x / n * 360.0 - 180.0;

        BoundingBox::new(
            GeoCoordinate::new(
                tile_latitude(self.tile_y as f64 + 1.0),
                tile_longitude(self.tile_x as f64),
            ),
            GeoCoordinate::new(
                tile_latitude(self.tile_y as f64),
                tile_longitude(self.tile_x as f64 + 1.0),
            ),
        )
    }

    /// The tile one LOD coarser, or `None` at LOD 0.
    #[must_use]
    pub fn parent(&self) -> Option<QuadKey> {
        if self.lod == 0 {
            return None;
        }
        Some(QuadKey {
            tile_x: self.tile_x / 2,
            tile_y: self.tile_y / 2,
            lod: self.lod - 1,
        })
    }

    /// The four tiles one LOD finer, ordered by their path digit (0..=3).
    ///
    /// # Panics
    ///
    /// Panics if this tile is already at [`Self::MAX_LOD`].
    #[must_use]
    pub fn children(&self) -> [QuadKey; 4] {
        assert!(
            self.lod < Self::MAX_LOD,
            "quadkey at LOD {} has no children",
            self.lod
        );
        let lod = self.lod + 1;
        let x = self.tile_x * 2;
        let y = self.tile_y * 2;
        [
            QuadKey::new(x, y, lod),
            QuadKey::new(x + 1, y, lod),
            QuadKey::new(x, y + 1, lod),
            QuadKey::new(x + 1, y + 1, lod),
        ]
    }

    /// The ancestor of this tile at a coarser `lod`.
    ///
    /// # Panics
    ///
    /// Panics if `lod` is finer than this tile's LOD.
    #[must_use]
    pub fn ancestor_at(&self, lod: u8) -> QuadKey {
        assert!(
            lod <= self.lod,
            "LOD {lod} is finer than quadkey LOD {}",
            self.lod
        );
        let shift = self.lod - lod;
        QuadKey {
            tile_x: self.tile_x >> shift,
            tile_y: self.tile_y >> shift,
            lod,
        }
    }

    /// Returns `true` if `other` is this tile or lies inside it.
    pub fn contains(&self, other: &QuadKey) -> bool {
        other.lod >= self.lod && other.ancestor_at(self.lod) == *self
    }

    /// This tile and the 8 tiles sharing an edge or corner with it, center first.
    ///
    /// Columns wrap across the antimeridian. Rows cannot wrap, so at the polar
    /// rows the 3-row window shifts inward to stay inside the grid. At LOD 0 and 1
    /// the grid holds fewer than 9 tiles and every tile is returned once.
    #[must_use]
    pub fn neighbourhood(&self) -> Vec<QuadKey> {
        let size = i64::from(Self::grid_size(self.lod));
        let x = i64::from(self.tile_x);
        let y = i64::from(self.tile_y);

        let first_row = (y - 1).clamp(0, (size - 3).max(0));
        let rows = (first_row..first_row + 3).filter(|row| *row < size);

        let mut result = Vec::with_capacity(9);
        result.push(*self);
        for row in rows {
            for dx in -1..=1 {
                let column = (x + dx).rem_euclid(size);
                let key = QuadKey {
                    tile_x: column as u32,
                    tile_y: row as u32,
                    lod: self.lod,
                };
                if !result.contains(&key) {
                    result.push(key);
                }
            }
        }
        result
    }
}

impl fmt::Display for QuadKey {
    /// Writes the base-4 path, one digit per LOD.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for level in (1..=self.lod).rev() {
            let mask = 1u32 << (level - 1);
            let mut digit = 0u8;
            if self.tile_x & mask != 0 {
                digit += 1;
            }
            if self.tile_y & mask != 0 {
                digit += 2;
            }
            write!(f, "{digit}")?;
        }
        Ok(())
    }
}

impl FromStr for QuadKey {
    type Err = QuadKeyError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        if path.len() > QuadKey::MAX_LOD as usize {
            return Err(QuadKeyError::TooLong {
                path: path.to_string(),
                max: QuadKey::MAX_LOD,
            });
        }

        let mut key = QuadKey {
            tile_x: 0,
            tile_y: 0,
            lod: 0,
        };
        for digit in path.chars() {
            let value = digit.to_digit(4).ok_or_else(|| QuadKeyError::InvalidDigit {
                path: path.to_string(),
                digit,
            })?;
            key = key.children()[value as usize];
        }
        Ok(key)
    }
}
