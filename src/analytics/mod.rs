pub mod alerts;
pub mod bands;
