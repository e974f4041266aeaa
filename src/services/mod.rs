//! Business logic services

pub mod catalog;
pub mod circulation;
pub mod readers;

use std::sync::Arc;

use crate::{circulation::Clock, config::AuthConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub circulation: circulation::CirculationService,
    pub readers: readers::ReadersService,
}

impl Services {
    /// Create all services over one repository
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, auth_config: AuthConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            circulation: circulation::CirculationService::new(repository.clone(), clock),
            readers: readers::ReadersService::new(repository, auth_config),
        }
    }
}
