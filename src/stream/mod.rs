//! Wire framing shared by the producer and the consumer.

pub mod decode;
pub mod frame;
pub mod utf8;

pub use decode::{ decode_frames, DecodeError };
pub use frame::{ encode_frame, parse_frame, FrameDecoder, FrameError, FramePolicy, LineBuffer };
pub use utf8::Utf8Decoder;

/// Route the producer serves and the consumer posts to.
pub const CHAT_ROUTE: &str = "/api/chat";

/// Content type sent with every chat stream response.
pub const CONTENT_TYPE: &str = "application/json; charset=utf-8";
