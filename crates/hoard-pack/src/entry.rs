use hoard_store::ObjectKind;
use hoard_types::ObjectId;

/// Serialize an object kind to the type byte used in pack entries.
pub fn type_byte(kind: ObjectKind) -> u8 {
    match kind {
        ObjectKind::Blob => 1,
        ObjectKind::Tree => 2,
        ObjectKind::Snapshot => 3,
        ObjectKind::Tag => 4,
    }
}

/// Parse a pack entry type byte.
pub fn kind_from_type_byte(byte: u8) -> Option<ObjectKind> {
    match byte {
        1 => Some(ObjectKind::Blob),
        2 => Some(ObjectKind::Tree),
        3 => Some(ObjectKind::Snapshot),
        4 => Some(ObjectKind::Tag),
        _ => None,
    }
}

/// Location and shape of one object inside a pack, as listed by
/// [`PackReader::entries`](crate::PackReader::entries).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackObjectInfo {
    pub id: ObjectId,
    pub kind: ObjectKind,
    /// Byte offset of the entry header within the pack file.
    pub offset: u64,
    /// Uncompressed payload size.
    pub size: u64,
}
