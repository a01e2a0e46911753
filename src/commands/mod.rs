pub mod general_info;
pub mod metrics;
