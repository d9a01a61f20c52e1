//! Bounds-checked fixed-width reads
//!
//! Every read returns `None` instead of panicking when it would run past the
//! end of the slice; callers turn that into a structural violation.

pub fn array<const N: usize>(data: &[u8], at: usize) -> Option<[u8; N]> {
    data.get(at..at.checked_add(N)?)?.try_into().ok()
}

pub fn u16_be(data: &[u8], at: usize) -> Option<u16> {
    array(data, at).map(u16::from_be_bytes)
}

pub fn u16_le(data: &[u8], at: usize) -> Option<u16> {
    array(data, at).map(u16::from_le_bytes)
}

pub fn f32_be(data: &[u8], at: usize) -> Option<f32> {
    array(data, at).map(f32::from_be_bytes)
}

/// Space separated uppercase hex, for logs and dumps
pub fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
