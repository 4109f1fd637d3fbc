//! One module per §8 end-to-end scenario.

mod arc_chord;
mod feedhold_mid_line;
mod homing_with_backoff;
mod queue_flush_during_hold;
mod rapid_then_feed;
mod soft_limit_rejection;
