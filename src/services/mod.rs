pub mod content;
pub mod markdown;
pub mod policy;
pub mod slug;
pub mod tags;
