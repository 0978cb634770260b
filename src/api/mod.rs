// Thin namespace wrapper for API-layer components
pub mod handlers {
    pub use crate::handlers::*;
}

pub mod wizard_handler {
    pub use crate::wizard_handler::*;
}

pub mod routes {
    pub use crate::routes::*;
}
