/// Pure game rules: no terminal, no wall clock, no global RNG.

pub mod ability;
pub mod anomaly;
pub mod clock;
pub mod map;
pub mod puzzle;
pub mod timer;
