// pitch-local - sales pitch analysis service
//
// Accepts an uploaded pitch recording, transcribes it through a remote
// speech-to-text service, scores it through a remote LLM, persists the
// result and serves it back over HTTP. The client module tracks stage
// progress and mirrors completed analyses into a secondary store.

pub mod analysis;
pub mod client;
pub mod config;
pub mod pipeline;
pub mod server;
pub mod storage;
pub mod transcription;
