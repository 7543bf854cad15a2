pub mod auth;
pub mod breathing_task;
pub mod chat_task;
pub mod mentor_task;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the handlers the binary needs to build the web server router.
pub use middleware::require_auth;
pub use rest::{
    create_post_handler, create_reply_handler, list_exercises_handler, list_posts_handler,
    toggle_reaction_handler,
};
pub use ws_handler::ws_handler;
