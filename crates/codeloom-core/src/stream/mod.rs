mod assembler;
mod decoder;
mod event;

pub use assembler::{AssembledResponse, ResponseAssembler, StreamProgress};
pub use decoder::{decode_events, EventStream, SseDecoder};
pub use event::StreamEvent;
