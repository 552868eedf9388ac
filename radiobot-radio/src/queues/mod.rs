mod station_queue;

pub use station_queue::*;
