use std::fmt;

/// A lane position relative to the ego vehicle.
///
/// Positive values are to the left, negative values to the right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RelativeLane {
    /// Second lane to the right.
    RightRight = -2,
    /// Next lane to the right.
    Right = -1,
    /// The ego vehicle's own lane.
    #[default]
    Same = 0,
    /// Next lane to the left.
    Left = 1,
    /// Second lane to the left.
    LeftLeft = 2,
}

impl RelativeLane {
    /// Maps a raw relative lane reported by the host.
    /// Values beyond two lanes are clamped to the outermost lane on that side.
    pub fn from_code(code: i64) -> Self {
        match code {
            i64::MIN..=-2 => Self::RightRight,
            -1 => Self::Right,
            0 => Self::Same,
            1 => Self::Left,
            _ => Self::LeftLeft,
        }
    }

    /// The signed integer form: -2 (far right) through 2 (far left).
    pub fn to_int(self) -> i64 {
        self as i64
    }

    /// The lane mirrored about the ego vehicle's lane.
    pub fn opposite(self) -> Self {
        Self::from_code(-self.to_int())
    }

    /// Whether both lanes are on the same side of the ego vehicle,
    /// or both are the ego vehicle's own lane.
    pub fn on_same_side(self, other: Self) -> bool {
        match self {
            Self::Same => other == Self::Same,
            _ => self.to_int() * other.to_int() > 0,
        }
    }

    pub fn is_to_the_left(self) -> bool {
        self.on_same_side(Self::Left)
    }

    pub fn is_to_the_right(self) -> bool {
        self.on_same_side(Self::Right)
    }
}

impl fmt::Display for RelativeLane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RightRight => "right of right",
            Self::Right => "right",
            Self::Same => "same",
            Self::Left => "left",
            Self::LeftLeft => "left of left",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sides() {
        assert!(RelativeLane::Left.on_same_side(RelativeLane::LeftLeft));
        assert!(RelativeLane::RightRight.is_to_the_right());
        assert!(!RelativeLane::Right.on_same_side(RelativeLane::Left));
        assert!(RelativeLane::Same.on_same_side(RelativeLane::Same));
        assert!(!RelativeLane::Same.is_to_the_left());
        assert!(!RelativeLane::Same.is_to_the_right());
    }

    #[test]
    fn opposite_and_codes() {
        assert_eq!(RelativeLane::Left.opposite(), RelativeLane::Right);
        assert_eq!(RelativeLane::RightRight.opposite(), RelativeLane::LeftLeft);
        assert_eq!(RelativeLane::Same.opposite(), RelativeLane::Same);
        assert_eq!(RelativeLane::from_code(-1), RelativeLane::Right);
        assert_eq!(RelativeLane::from_code(7), RelativeLane::LeftLeft);
        assert_eq!(RelativeLane::LeftLeft.to_int(), 2);
        assert!(RelativeLane::RightRight < RelativeLane::Same);
    }
}
