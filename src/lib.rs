pub mod actuator;
pub mod chord;
pub mod emit;
pub mod latency;
pub mod pluckc;
pub mod schedule;
pub mod score;
