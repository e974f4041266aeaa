//! Data models for the circulation desk

pub mod loan;
pub mod reader;
pub mod reservation;
pub mod title;

// Re-export commonly used types
pub use loan::{Loan, LoanStatus};
pub use reader::{Actor, Reader, ReaderDetails, Role};
pub use reservation::Reservation;
pub use title::{Title, TitleDetails};
