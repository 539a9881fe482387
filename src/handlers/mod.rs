mod health;
mod messages;
mod sessions;

pub use health::health_check;
pub use messages::{add_message, get_messages};
pub use sessions::{
    create_session, delete_session, get_session, list_sessions, toggle_favorite, update_session,
};
