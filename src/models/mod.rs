mod api;
mod domain;

pub use api::{
    AddMessageRequest, CreateSessionRequest, HealthResponse, ListSessionsParams,
    MessagePageResponse, MessageResponse, PageParams, SessionListResponse, SessionResponse,
    ToggleFavoriteRequest, UpdateSessionRequest,
};
pub use domain::{Message, Sender, Session};
