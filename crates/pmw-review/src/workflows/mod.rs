pub mod distribution;
pub mod review;
