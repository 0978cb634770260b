//! External service integrations.

pub mod gateway_client {
    pub use crate::gateway_client::*;
}

pub mod services {
    pub use crate::services::*;
}

pub mod upstream_models {
    pub use crate::upstream_models::*;
}

pub mod normalize {
    pub use crate::normalize::*;
}

pub mod classify {
    pub use crate::classify::*;
}
