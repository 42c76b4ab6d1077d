//! External service integrations.

pub mod portal_client {
    pub use crate::portal_client::*;
}

pub mod sheets {
    pub use crate::sheets::*;
}

pub mod workbook {
    pub use crate::workbook::*;
}
