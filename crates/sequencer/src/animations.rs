//! Animation names understood by the robot, grouped by the moment they play.

use rand::Rng;

pub const WAKE_UP: [&str; 4] = [
    "anim_launch_wakeup_02",
    "anim_hiking_lookaround_01",
    "anim_hiking_lookaround_03",
    "anim_hiking_lookaround_02",
];

/// One of these plays when a cube is spotted in the early rounds.
pub const CUBE_REACTIONS: [&str; 2] = [
    "anim_pyramid_reacttocube_happy_high_01",
    "anim_speedtap_winround_intensity02_02",
];

pub const TAPS: [&str; 3] = [
    "anim_speedtap_tap_01",
    "anim_speedtap_tap_02",
    "anim_speedtap_tap_03",
];

pub const MISS: &str = "anim_keepaway_losehand_01";

pub const SINGLE_CELEBRATION: &str = "anim_reacttoblock_react_01_head_angle_40";

pub const DUD_REACTION: &str = "anim_reacttocliff_turtlerollfail_03";

/// Played before the finale codes go out, each after a short pause.
pub const FINALE_BUILDUP: [&str; 2] = [
    "anim_memorymatch_failhand_03",
    "reacttoblock_triestoreach_01",
];

pub const FINALE_AFTERGLOW: [&str; 3] = [
    "anim_reacttoblock_react_01_head_angle_40",
    "reacttoblock_reacttotopple_01",
    "anim_reacttocliff_wheely_01",
];

pub const BACK_TO_IDLE: [&str; 3] = [
    "anim_guarddog_getout_untouched_01",
    "anim_guarddog_getout_timeout_01",
    "anim_gotosleep_getin_01",
];

pub fn pick(choices: &[&'static str]) -> &'static str {
    choices[rand::rng().random_range(0..choices.len())]
}
