/// Delivers encoded landmark packets to a receiver.
///
/// Each call is one independent datagram; there is no acknowledgment.
pub trait PacketSender: Send {
    /// Sends `payload` and returns the number of bytes handed to the OS.
    fn send(&mut self, payload: &[u8]) -> Result<usize, Box<dyn std::error::Error>>;
}
