//! Wire shapes and URL rules for the Edge collection protocol.

pub mod request;
pub mod response;
pub mod url;
