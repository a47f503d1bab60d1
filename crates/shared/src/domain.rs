use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RoundError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(CubeId);
id_newtype!(BehaviorId);

/// Number of rounds in one game.
pub const ROUND_COUNT: u8 = 3;
pub const FINAL_ROUND: u8 = ROUND_COUNT - 1;

/// Index of the active round, always in `0..ROUND_COUNT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Round(u8);

impl Round {
    pub const FIRST: Round = Round(0);
    pub const FINAL: Round = Round(FINAL_ROUND);

    pub fn new(index: u8) -> Result<Self, RoundError> {
        if index < ROUND_COUNT {
            Ok(Self(index))
        } else {
            Err(RoundError::OutOfRange(index))
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// Rounds before the finale get a warm-up reaction and a back-off after the tap.
    pub fn is_early(self) -> bool {
        self.0 < FINAL_ROUND
    }

    pub fn is_final(self) -> bool {
        self.0 == FINAL_ROUND
    }

    /// The round that follows a finished tap cycle.
    ///
    /// Returns `None` once the final round is done, unless `replay` is set, in
    /// which case the game starts over from the first round.
    pub fn advance(self, replay: bool) -> Option<Round> {
        let next = self.0 + 1;
        if next < ROUND_COUNT {
            Some(Self(next))
        } else if replay {
            Some(Self::FIRST)
        } else {
            None
        }
    }

    /// Code announced to the companion app when this round's tap lands.
    pub fn launch_code(self) -> LaunchCode {
        match self.0 {
            0 => LaunchCode::Single,
            1 => LaunchCode::Dud,
            _ => LaunchCode::Finale,
        }
    }
}

impl TryFrom<u8> for Round {
    type Error = RoundError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Round> for u8 {
    fn from(value: Round) -> Self {
        value.0
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Firework the companion app launches when it receives the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LaunchCode {
    Single = 1,
    Dud = 2,
    Finale = 3,
    /// Fail or miss signal; the app lights a fuse.
    Fuse = 4,
}

impl LaunchCode {
    pub const ALL: [LaunchCode; 4] = [
        LaunchCode::Single,
        LaunchCode::Dud,
        LaunchCode::Finale,
        LaunchCode::Fuse,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| i64::from(c.code()) == code)
    }
}

impl fmt::Display for LaunchCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Number of individually addressable light zones on a cube.
pub const LIGHT_ZONES: usize = 4;

/// A light color packed as `0xRRGGBBAA`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const OFF: Color = Color(0);
    pub const CYAN: Color = Color::from_rgb(0, 255, 255);
    pub const MAGENTA: Color = Color::from_rgb(255, 0, 255);
    pub const YELLOW: Color = Color::from_rgb(255, 255, 0);
    pub const GREEN: Color = Color::from_rgb(0, 255, 0);
    pub const RED: Color = Color::from_rgb(255, 0, 0);
    pub const BLUE: Color = Color::from_rgb(0, 0, 255);
    pub const WHITE: Color = Color::from_rgb(255, 255, 255);

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | 0xff)
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        let [r, g, b, _] = self.0.to_be_bytes();
        (r, g, b)
    }

    pub fn is_off(self) -> bool {
        self.rgb() == (0, 0, 0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::OFF
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (r, g, b) = self.rgb();
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

/// Colors the rainbow chaser picks from.
pub const RAINBOW_PALETTE: [Color; 7] = [
    Color::CYAN,
    Color::YELLOW,
    Color::BLUE,
    Color::RED,
    Color::WHITE,
    Color::MAGENTA,
    Color::GREEN,
];

/// One color per light zone, in zone order.
pub type CubeLights = [Color; LIGHT_ZONES];

pub const ALL_OFF: CubeLights = [Color::OFF; LIGHT_ZONES];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_advances_until_final_then_stops() {
        let second = Round::FIRST.advance(false).expect("second round");
        let last = second.advance(false).expect("final round");
        assert!(last.is_final());
        assert_eq!(last.advance(false), None);
    }

    #[test]
    fn round_wraps_to_first_in_replay_mode() {
        assert_eq!(Round::FINAL.advance(true), Some(Round::FIRST));
    }

    #[test]
    fn round_rejects_index_past_final() {
        assert!(matches!(Round::new(3), Err(RoundError::OutOfRange(3))));
        assert!(serde_json::from_str::<Round>("7").is_err());
        assert_eq!(serde_json::from_str::<Round>("1").expect("round").index(), 1);
    }

    #[test]
    fn launch_code_follows_round() {
        let codes: Vec<u8> = (0..ROUND_COUNT)
            .map(|i| Round::new(i).expect("round").launch_code().code())
            .collect();
        assert_eq!(codes, vec![1, 2, 3]);
    }

    #[test]
    fn color_packs_rgb_with_opaque_alpha() {
        assert_eq!(Color::GREEN, Color(0x00ff_00ff));
        assert_eq!(Color::WHITE, Color(0xffff_ffff));
        assert_eq!(Color::MAGENTA.rgb(), (255, 0, 255));
        assert!(Color::OFF.is_off());
        assert_eq!(format!("{:?}", Color::YELLOW), "#ffff00");
    }
}
