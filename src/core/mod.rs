// Domain-layer modules and shared errors/models
pub mod directory {
    pub use crate::directory::*;
}

pub mod wizard {
    pub use crate::wizard::*;
}

pub mod validation {
    pub use crate::validation::*;
}

pub mod presentation {
    pub use crate::presentation::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
