use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A clicked pixel position, parsed from the `"x,y"` form the UI submits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

/// Errors from parsing `"x,y"` point strings.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PointParseError {
    #[error("expected \"x,y\", got {got:?}")]
    BadShape { got: String },
    #[error("coordinate {got:?} is not a finite number")]
    BadCoordinate { got: String },
}

impl PixelPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_point2(self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }
}

impl FromStr for PixelPoint {
    type Err = PointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',');
        let (Some(a), Some(b), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(PointParseError::BadShape { got: s.to_owned() });
        };

        let parse = |raw: &str| -> Result<f32, PointParseError> {
            let v: f32 = raw
                .trim()
                .parse()
                .map_err(|_| PointParseError::BadCoordinate {
                    got: raw.to_owned(),
                })?;
            if !v.is_finite() {
                return Err(PointParseError::BadCoordinate {
                    got: raw.to_owned(),
                });
            }
            Ok(v)
        };

        Ok(Self {
            x: parse(a)?,
            y: parse(b)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_pairs() {
        let p: PixelPoint = "10,20".parse().expect("valid");
        assert_eq!(p, PixelPoint::new(10.0, 20.0));
    }

    #[test]
    fn tolerates_whitespace() {
        let p: PixelPoint = " 3.5 , -2 ".parse().expect("valid");
        assert_eq!(p, PixelPoint::new(3.5, -2.0));
    }

    #[test]
    fn rejects_wrong_arity() {
        assert!(matches!(
            "1,2,3".parse::<PixelPoint>(),
            Err(PointParseError::BadShape { .. })
        ));
        assert!(matches!(
            "7".parse::<PixelPoint>(),
            Err(PointParseError::BadShape { .. })
        ));
    }

    #[test]
    fn rejects_non_finite() {
        assert!(matches!(
            "inf,0".parse::<PixelPoint>(),
            Err(PointParseError::BadCoordinate { .. })
        ));
        assert!("a,b".parse::<PixelPoint>().is_err());
    }
}
