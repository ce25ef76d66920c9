//! Query parameter types reused across handler modules.

use backoffice_core::pagination::PageRequest;
use serde::Deserialize;

/// `?page=&size=` pagination, 1-based. Clamped by [`PageRequest::new`].
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl PageParams {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}
