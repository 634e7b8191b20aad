//! Request extractors shared by domain routers.

pub mod validated_json;

pub use validated_json::ValidatedJson;
