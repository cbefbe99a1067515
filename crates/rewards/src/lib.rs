//! Reward computation (Layer 3)
//!
//! Pure conversion of verified progress into reward payloads. Step rewards
//! use the tier recorded when the step activated; mission rewards are
//! computed once, at the moment the instance transitions to completed.

#![warn(missing_docs)]

mod calculator;

pub use calculator::{
    bonus_applies, mission_reward, mission_reward_event, step_reward, step_reward_event,
};
