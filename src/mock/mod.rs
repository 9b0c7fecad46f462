mod api;

pub use api::{MockApi, MockApiError, MockData, MockResponse};
