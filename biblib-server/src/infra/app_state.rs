use std::{fmt, sync::Arc};

use biblib_core::application::LibraryServices;

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<LibraryServices>,
}

impl AppState {
    pub fn new(services: LibraryServices) -> Self {
        Self {
            services: Arc::new(services),
        }
    }

    pub fn services(&self) -> &LibraryServices {
        &self.services
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("services", &self.services)
            .finish()
    }
}
