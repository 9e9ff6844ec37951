pub mod availability;
pub mod booking;

pub use availability::{AvailabilityBlock, WeeklyAvailability};
pub use booking::{Booking, BookingInput, BookingStatus, BookingUpdate, NewBooking, StudentType};
