pub mod analysis;
pub mod calibration;
pub mod chi_square;
pub mod combined;
pub mod digits;
pub mod hotelling;
pub mod metrics;
pub mod model;
