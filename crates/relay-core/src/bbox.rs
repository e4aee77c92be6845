//! Axis-aligned bounding boxes and the two textual forms they are parsed
//! from: WKT geometries (stored events) and `minX,minY,maxX,maxY` CSV
//! (search queries).

use std::str::FromStr;

use geo::BoundingRect;
use geo_types::Geometry;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A bounding box in the registry's projected coordinate space (British
/// National Grid eastings/northings for the live feed).
///
/// Always satisfies `min_x <= max_x` and `min_y <= max_y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
  pub min_x: f64,
  pub max_x: f64,
  pub min_y: f64,
  pub max_y: f64,
}

impl BBox {
  /// Build a box from two opposite corners given in any order.
  pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
    Self {
      min_x: x1.min(x2),
      max_x: x1.max(x2),
      min_y: y1.min(y2),
      max_y: y1.max(y2),
    }
  }

  /// Bounding box of every coordinate in a WKT geometry.
  ///
  /// Accepts any geometry type, with or without a Z dimension; Z values are
  /// ignored. Empty geometries are rejected.
  pub fn from_wkt(wkt: &str) -> Result<Self> {
    let parsed = wkt::Wkt::<f64>::from_str(wkt.trim())
      .map_err(|e| Error::Wkt(e.to_string()))?;
    let geometry: Geometry<f64> = parsed
      .try_into()
      .map_err(|e: wkt::conversion::Error| Error::Wkt(e.to_string()))?;

    let rect = geometry
      .bounding_rect()
      .ok_or_else(|| Error::Wkt(format!("no coordinates in {wkt:?}")))?;

    Ok(Self {
      min_x: rect.min().x,
      max_x: rect.max().x,
      min_y: rect.min().y,
      max_y: rect.max().y,
    })
  }

  /// Parse `"minX,minY,maxX,maxY"`. Corners passed the wrong way round are
  /// swapped into canonical order.
  pub fn from_csv(csv: &str) -> Result<Self> {
    let parts: Vec<&str> = csv.split(',').collect();
    if parts.len() != 4 {
      return Err(Error::BBoxFormat(
        "bbox must have 4 comma-separated values".to_owned(),
      ));
    }

    let mut values = [0f64; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
      let part = part.trim();
      *slot = part.parse().map_err(|_| {
        Error::BBoxFormat(format!("invalid bbox value {part:?}: not a valid float"))
      })?;
      if !slot.is_finite() {
        return Err(Error::BBoxFormat(format!("invalid bbox value {part:?}: not finite")));
      }
    }

    let [x1, y1, x2, y2] = values;
    Ok(Self::from_corners(x1, y1, x2, y2))
  }

  /// Edge-wise comparison within an absolute tolerance.
  pub fn equals(&self, other: &BBox, tolerance: f64) -> bool {
    (self.min_x - other.min_x).abs() <= tolerance
      && (self.max_x - other.max_x).abs() <= tolerance
      && (self.min_y - other.min_y).abs() <= tolerance
      && (self.max_y - other.max_y).abs() <= tolerance
  }

  /// Closed-interval overlap on both axes; touching edges count.
  pub fn intersects(&self, other: &BBox) -> bool {
    self.min_x <= other.max_x
      && self.max_x >= other.min_x
      && self.min_y <= other.max_y
      && self.max_y >= other.min_y
  }
}

impl FromStr for BBox {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::from_csv(s) }
}

#[cfg(test)]
mod tests {
  use super::*;

  const TOL: f64 = 1e-9;

  fn assert_bbox(actual: BBox, expected: BBox) {
    assert!(actual.equals(&expected, TOL), "got {actual:?}, want {expected:?}");
  }

  #[test]
  fn point() {
    let bbox = BBox::from_wkt("POINT(527459.24 176380.37)").unwrap();
    assert_bbox(bbox, BBox {
      min_x: 527459.24,
      max_x: 527459.24,
      min_y: 176380.37,
      max_y: 176380.37,
    });
  }

  #[test]
  fn linestring_takes_per_axis_extremes() {
    let bbox = BBox::from_wkt(
      "LINESTRING(526977.674310138 181798.936219104,528476.982595162 179982.126895356,528476.982595162 179990.946626588)",
    )
    .unwrap();
    assert_bbox(bbox, BBox {
      min_x: 526977.674310138,
      max_x: 528476.982595162,
      min_y: 179982.126895356,
      max_y: 181798.936219104,
    });
  }

  #[test]
  fn two_point_linestring() {
    let bbox =
      BBox::from_wkt("LINESTRING(526977.67 181798.94, 528476.98 179982.13)").unwrap();
    assert_bbox(bbox, BBox {
      min_x: 526977.67,
      max_x: 528476.98,
      min_y: 179982.13,
      max_y: 181798.94,
    });
  }

  #[test]
  fn polygon() {
    let bbox = BBox::from_wkt("POLYGON((0 0, 10 0, 10 5, 0 5, 0 0))").unwrap();
    assert_bbox(bbox, BBox { min_x: 0.0, max_x: 10.0, min_y: 0.0, max_y: 5.0 });
  }

  #[test]
  fn polygon_z_ignores_third_ordinate() {
    let bbox = BBox::from_wkt(
      "POLYGON Z ((519486.91227482 257914.829213376 0,519486.371896552 257906.61227976 0,519503.134927786 257904.454717125 0,519504.067150431 257912.782373436 0,519486.91227482 257914.829213376 0))",
    )
    .unwrap();
    assert_bbox(bbox, BBox {
      min_x: 519486.371896552,
      max_x: 519504.067150431,
      min_y: 257904.454717125,
      max_y: 257914.829213376,
    });
  }

  #[test]
  fn invalid_wkt_is_rejected() {
    assert!(matches!(BBox::from_wkt("POINT(1"), Err(Error::Wkt(_))));
    assert!(matches!(BBox::from_wkt("not wkt at all"), Err(Error::Wkt(_))));
  }

  #[test]
  fn empty_geometry_is_rejected() {
    assert!(BBox::from_wkt("LINESTRING EMPTY").is_err());
  }

  #[test]
  fn csv_in_canonical_order() {
    let bbox = BBox::from_csv("0, 0, 100,100").unwrap();
    assert_eq!(bbox, BBox { min_x: 0.0, max_x: 100.0, min_y: 0.0, max_y: 100.0 });
  }

  #[test]
  fn csv_swapped_corners_are_canonicalised() {
    let bbox = BBox::from_csv("10,0,0,5").unwrap();
    assert_eq!(bbox, BBox { min_x: 0.0, max_x: 10.0, min_y: 0.0, max_y: 5.0 });

    let bbox: BBox = "3,9,-1,-4".parse().unwrap();
    assert!(bbox.min_x <= bbox.max_x && bbox.min_y <= bbox.max_y);
    assert_eq!(bbox, BBox { min_x: -1.0, max_x: 3.0, min_y: -4.0, max_y: 9.0 });
  }

  #[test]
  fn csv_requires_four_floats() {
    assert!(matches!(BBox::from_csv("1,2,3"), Err(Error::BBoxFormat(_))));
    assert!(matches!(BBox::from_csv("1,2,3,4,5"), Err(Error::BBoxFormat(_))));
    assert!(matches!(BBox::from_csv("1,2,x,4"), Err(Error::BBoxFormat(_))));
    assert!(matches!(BBox::from_csv(""), Err(Error::BBoxFormat(_))));
  }

  #[test]
  fn equals_uses_absolute_tolerance() {
    let a = BBox { min_x: 0.0, max_x: 10.0, min_y: 0.0, max_y: 10.0 };
    let b = BBox { min_x: 0.6, max_x: 10.4, min_y: -0.9, max_y: 10.0 };
    assert!(a.equals(&b, 1.0));
    assert!(!a.equals(&b, 0.5));
  }

  #[test]
  fn intersects_includes_touching_edges() {
    let a = BBox { min_x: 0.0, max_x: 10.0, min_y: 0.0, max_y: 10.0 };
    let touching = BBox { min_x: 10.0, max_x: 20.0, min_y: 5.0, max_y: 6.0 };
    let apart = BBox { min_x: 10.5, max_x: 20.0, min_y: 5.0, max_y: 6.0 };
    assert!(a.intersects(&touching));
    assert!(!a.intersects(&apart));
  }
}
