mod apartment;
mod period;
mod reading;

pub use apartment::Apartment;
pub use period::{Period, PeriodError};
pub use reading::{ApartmentReading, Reading};
