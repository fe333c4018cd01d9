mod observationtable;
pub use observationtable::{ObservationTable, TableError};

mod oracle;
pub use oracle::*;

mod tlstar;
pub use tlstar::{LearningError, TLStar};
