pub mod request;
pub mod response;

pub use request::{render_value, WellnessRequest, NOT_SPECIFIED};
pub use response::SuccessEnvelope;
