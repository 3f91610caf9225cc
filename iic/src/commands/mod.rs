//! Subcommand implementations

pub mod buses;
pub mod detect;
pub mod register;
pub mod transfer;

/// Format bytes as space-separated hex
pub fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("0x{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
