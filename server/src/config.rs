pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const SSE_KEEPALIVE_SECS: u64 = 15;
pub const DEFAULT_BROADCAST_BUFFER: usize = 256;
/// Largest accepted territory ring, in points.
pub const MAX_RING_POINTS: usize = 10_000;

pub fn server_port() -> u16 {
    std::env::var("CLAIMLOOP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn sse_broadcast_buffer() -> usize {
    std::env::var("SSE_BROADCAST_BUFFER")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_BROADCAST_BUFFER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_when_unset_or_invalid() {
        temp_env::with_var_unset("CLAIMLOOP_PORT", || {
            assert_eq!(server_port(), DEFAULT_SERVER_PORT);
        });
        temp_env::with_var("CLAIMLOOP_PORT", Some("not-a-port"), || {
            assert_eq!(server_port(), DEFAULT_SERVER_PORT);
        });
        temp_env::with_var("CLAIMLOOP_PORT", Some("0"), || {
            assert_eq!(server_port(), DEFAULT_SERVER_PORT);
        });
    }

    #[test]
    fn port_reads_env() {
        temp_env::with_var("CLAIMLOOP_PORT", Some("8088"), || {
            assert_eq!(server_port(), 8088);
        });
    }

    #[test]
    fn broadcast_buffer_rejects_zero() {
        temp_env::with_var("SSE_BROADCAST_BUFFER", Some("0"), || {
            assert_eq!(sse_broadcast_buffer(), DEFAULT_BROADCAST_BUFFER);
        });
        temp_env::with_var("SSE_BROADCAST_BUFFER", Some("32"), || {
            assert_eq!(sse_broadcast_buffer(), 32);
        });
    }
}
