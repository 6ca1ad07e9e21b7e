pub mod availability;
pub mod timeslot;
