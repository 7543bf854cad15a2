pub mod breathing;
pub mod conversation;
pub mod domain;
pub mod feed;
pub mod identity;
pub mod memory;
pub mod ports;
pub mod reactions;
pub mod support;

pub use domain::{
    Message, NewPost, NewReply, Post, PostView, Profile, ReactionCounts, ReactionKind,
    ReactionRecord, Reply, Topic, User, UserCredentials,
};
pub use ports::{AuthStore, CommunityStore, PortError, PortResult};
