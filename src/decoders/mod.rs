//! Stateless frame decoders, one per device family.
//!
//! Every decoder implements [`FrameDecoder`](crate::core::FrameDecoder) and shares the
//! helpers in [`lexer`] and the plausibility bound in [`outlier`].
pub mod dynamometer;
pub mod encoder;
pub mod lexer;
pub mod outlier;
pub mod platform;

pub use dynamometer::DynamometerDecoder;
pub use encoder::EncoderDecoder;
pub use outlier::OutlierFilter;
pub use platform::{PlatformDecoder, PlatformRate};
