pub mod car;
pub mod contract;
pub mod passenger;
pub mod ride;
pub mod ride_stop;
pub mod user;
