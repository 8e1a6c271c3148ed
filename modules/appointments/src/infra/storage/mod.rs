pub mod memory;
pub mod sqlite;

pub use memory::InMemoryAppointmentsRepository;
pub use sqlite::{SqliteAppointmentsRepository, SqliteOptions};
