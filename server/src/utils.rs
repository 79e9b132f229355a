use rand::distributions::Alphanumeric;
use rand::Rng;
use shared::PLAYER_ID_LEN;

// Opaque connection id, never derived from the peer address
pub fn generate_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PLAYER_ID_LEN)
        .map(char::from)
        .collect()
}
