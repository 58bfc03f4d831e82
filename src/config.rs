/// Tuning knobs for a connection.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Capacity of the read-side buffer between the transport and the
    /// receiver. Amortizes syscalls for frame headers and small control
    /// frames.
    pub read_buffer_capacity: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        WebSocketConfig {
            read_buffer_capacity: 4096,
        }
    }
}
