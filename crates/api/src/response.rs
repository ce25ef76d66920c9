//! Response envelope shared by list and report endpoints.

use serde::Serialize;

/// `{ "data": T }` envelope.
///
/// Lists, paged results and computed reports are wrapped in it; single
/// entities are returned bare.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
