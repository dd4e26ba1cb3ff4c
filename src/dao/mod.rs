/// Game store contract and its backends.
pub mod game_store;
/// Record definitions of the realtime database.
pub mod models;
/// Storage errors shared by every backend.
pub mod storage;
