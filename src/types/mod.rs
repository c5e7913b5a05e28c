pub mod api;

pub use api::{
    ApiMessage, Content, ContentBlock, Delta, MessageDelta, MessageStartData, ProviderError,
    StreamEvent,
};
