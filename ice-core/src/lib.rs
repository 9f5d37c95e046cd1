//! IceCast source protocol core.
//! No I/O: the host owns the socket, feeds received bytes in and sends what
//! the handshake builds.

pub mod login;
pub mod message;
pub mod stream;
pub mod wire;

pub use login::{Credentials, Handshake, LoginError, LoginState, DEFAULT_MOUNT};
pub use message::{Headers, Message, MessageKind, Request, Response, PROTOCOL_VERSION};
pub use stream::StreamDescriptor;
pub use wire::{decode, decode_request, decode_response, encode, CodecError};
