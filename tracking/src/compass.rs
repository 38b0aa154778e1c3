use std::fmt;

/// One of the eight principal compass directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompassPoint {
    /// North.
    N,
    /// North-east.
    NE,
    /// East.
    E,
    /// South-east.
    SE,
    /// South.
    S,
    /// South-west.
    SW,
    /// West.
    W,
    /// North-west.
    NW,
}

const POINTS: [CompassPoint; 8] = [
    CompassPoint::N,
    CompassPoint::NE,
    CompassPoint::E,
    CompassPoint::SE,
    CompassPoint::S,
    CompassPoint::SW,
    CompassPoint::W,
    CompassPoint::NW,
];

impl CompassPoint {
    /// The direction whose 45° sector contains `heading`.
    ///
    /// Sectors are centered on each direction, so 22.4° is still north.
    /// Headings outside 0–360 wrap around.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_heading(heading: f64) -> Self {
        let sector = (heading / 45.0).round() as i64;
        POINTS[sector.rem_euclid(8) as usize]
    }

    /// Short label such as `"NE"`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::N => "N",
            Self::NE => "NE",
            Self::E => "E",
            Self::SE => "SE",
            Self::S => "S",
            Self::SW => "SW",
            Self::W => "W",
            Self::NW => "NW",
        }
    }
}

impl fmt::Display for CompassPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Compass label for an optional heading.
#[must_use]
pub fn compass_label(heading: Option<f64>) -> Option<&'static str> {
    heading
        .filter(|h| h.is_finite())
        .map(|h| CompassPoint::from_heading(h).label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sectors_are_centered_on_directions() {
        assert_eq!(compass_label(Some(0.0)), Some("N"));
        assert_eq!(compass_label(Some(22.0)), Some("N"));
        assert_eq!(compass_label(Some(23.0)), Some("NE"));
        assert_eq!(compass_label(Some(44.0)), Some("NE"));
        assert_eq!(compass_label(Some(46.0)), Some("NE"));
        assert_eq!(compass_label(Some(90.0)), Some("E"));
        assert_eq!(compass_label(Some(180.0)), Some("S"));
        assert_eq!(compass_label(Some(292.0)), Some("W"));
        assert_eq!(compass_label(Some(359.0)), Some("N"));
    }

    #[test]
    fn out_of_range_headings_wrap() {
        assert_eq!(CompassPoint::from_heading(405.0), CompassPoint::NE);
        assert_eq!(CompassPoint::from_heading(-90.0), CompassPoint::W);
    }

    #[test]
    fn no_heading_no_label() {
        assert_eq!(compass_label(None), None);
        assert_eq!(compass_label(Some(f64::NAN)), None);
    }
}
