mod session;
mod track;

pub use session::{NowPlaying, RemoteCommand, SessionState};
pub use track::Track;
