#![allow(dead_code)]

//! Fixture builder for synthetic project images.
//!
//! Tests construct byte-exact project files in memory: a 256-byte header carrying the
//! magic, followed by whatever records a scenario needs at chosen offsets.

/// Builds a project image by placing records at absolute offsets.
pub struct ImageBuilder {
    data: Vec<u8>,
}

/// Magic bytes every project file starts with.
const MAGIC: u32 = 0x6685_8280;

impl ImageBuilder {
    /// A zeroed image of `size` bytes with the magic in place.
    pub fn new(size: usize) -> ImageBuilder {
        let mut data = vec![0u8; size];
        data[0..4].copy_from_slice(&MAGIC.to_be_bytes());
        ImageBuilder { data }
    }

    pub fn put(&mut self, at: u64, bytes: &[u8]) -> &mut Self {
        self.data[at as usize..at as usize + bytes.len()].copy_from_slice(bytes);
        self
    }

    /// List wrapper: signature, count, vector pointer.
    pub fn list_wrapper(&mut self, at: u64, count: u32, vec_ptr: u64) -> &mut Self {
        let mut rec = vec![0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x0a, 0x01, 0x00, 0x0e];
        rec.extend_from_slice(&count.to_be_bytes());
        rec.extend_from_slice(&vec_ptr.to_be_bytes());
        self.put(at, &rec)
    }

    /// Pointer vector: total length, capacity, slots.
    pub fn pointer_vector(&mut self, at: u64, ptrs: &[u64]) -> &mut Self {
        let mut rec = Vec::new();
        rec.extend_from_slice(&(8 + ptrs.len() as u32 * 8).to_be_bytes());
        rec.extend_from_slice(&(ptrs.len() as u32).to_be_bytes());
        for p in ptrs {
            rec.extend_from_slice(&p.to_be_bytes());
        }
        self.put(at, &rec)
    }

    /// Byte-string record: 8-byte header plus payload.
    pub fn byte_string(&mut self, at: u64, payload: &[u8]) -> &mut Self {
        let mut rec = Vec::new();
        rec.extend_from_slice(&(payload.len() as u32 + 8).to_be_bytes());
        rec.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        rec.extend_from_slice(payload);
        self.put(at, &rec)
    }

    /// Framed wide-string record, first shape, UTF-16BE payload.
    pub fn wide_string(&mut self, at: u64, text: &str) -> &mut Self {
        let units: Vec<u16> = text.encode_utf16().collect();
        let mut rec = Vec::new();
        rec.extend_from_slice(&[
            0x00, 0x02, 0x00, 0x00, 0x0a, 0x01, 0x00, 0x12, 0x00, 0x00, 0x00, 0x00,
        ]);
        rec.extend_from_slice(&[0u8; 8]);
        rec.extend_from_slice(&(8 + units.len() as u64 * 2).to_be_bytes());
        rec.extend_from_slice(&(units.len() as u32).to_be_bytes());
        for unit in &units {
            rec.extend_from_slice(&unit.to_be_bytes());
        }
        self.put(at, &rec)
    }

    /// Fixed-32 wide-string record: 0x48/0x20 header plus 64 payload bytes.
    pub fn fixed32_string(&mut self, at: u64, text: &str) -> &mut Self {
        let mut rec = Vec::new();
        rec.extend_from_slice(&0x48u32.to_be_bytes());
        rec.extend_from_slice(&0x20u32.to_be_bytes());
        let mut payload = [0u8; 64];
        for (i, unit) in text.encode_utf16().take(32).enumerate() {
            payload[i * 2..i * 2 + 2].copy_from_slice(&unit.to_be_bytes());
        }
        rec.extend_from_slice(&payload);
        self.put(at, &rec)
    }

    /// Compact typed record with consecutive 8-byte pointer fields.
    pub fn compact_record(&mut self, at: u64, record_type: u16, pointers: &[(u8, u64)]) -> &mut Self {
        let header_len = 4 + pointers.len() * 3;
        let mut rec = Vec::new();
        rec.extend_from_slice(&record_type.to_be_bytes());
        rec.extend_from_slice(&(pointers.len() as u16).to_be_bytes());
        for (i, (id, _)) in pointers.iter().enumerate() {
            rec.push(*id);
            rec.extend_from_slice(&((header_len + i * 8) as u16).to_be_bytes());
        }
        for (_, target) in pointers {
            rec.extend_from_slice(&target.to_be_bytes());
        }
        self.put(at, &rec)
    }

    /// Wide-dialect typed record with consecutive 8-byte pointer fields.
    pub fn wide_record(&mut self, at: u64, pointers: &[(u8, u64)]) -> &mut Self {
        let header_len = 4 + pointers.len() * 3;
        let mut rec = Vec::new();
        rec.extend_from_slice(&(pointers.len() as u32).to_be_bytes());
        for (i, (id, _)) in pointers.iter().enumerate() {
            rec.push(*id);
            rec.extend_from_slice(&((header_len + i * 8) as u16).to_be_bytes());
        }
        for (_, target) in pointers {
            rec.extend_from_slice(&target.to_be_bytes());
        }
        self.put(at, &rec)
    }

    /// Scanner-finding record with the fixed descriptor table and field block.
    #[allow(clippy::too_many_arguments)]
    pub fn issue_record(
        &mut self,
        at: u64,
        serial: u64,
        task_id: u64,
        path_ptr: u64,
        location_ptr: u64,
        severity: u8,
        confidence: u8,
        evidence_ptr: u64,
        type_id: u32,
    ) -> &mut Self {
        const SIG: [u8; 58] = [
            0x00, 0x00, 0x00, 0x12, 0x00, 0x00, 0x3a, 0x01, 0x00, 0x42, 0x02, 0x00, 0x4a, 0x03,
            0x00, 0x52, 0x04, 0x00, 0x5a, 0x05, 0x00, 0x62, 0x06, 0x00, 0x6a, 0x07, 0x00, 0x6b,
            0x08, 0x00, 0x6c, 0x09, 0x00, 0x6d, 0x0a, 0x00, 0x6e, 0x0b, 0x00, 0x72, 0x0c, 0x00,
            0x73, 0x0d, 0x00, 0x7b, 0x0e, 0x00, 0x83, 0x0f, 0x00, 0x8b, 0x10, 0x00, 0x8f, 0x11,
            0x00, 0x97,
        ];

        let mut rec = vec![0u8; 0x98];
        rec[..SIG.len()].copy_from_slice(&SIG);
        rec[0x3a..0x42].copy_from_slice(&serial.to_be_bytes());
        rec[0x42..0x4a].copy_from_slice(&task_id.to_be_bytes());
        rec[0x4a..0x52].copy_from_slice(&path_ptr.to_be_bytes());
        rec[0x52..0x5a].copy_from_slice(&location_ptr.to_be_bytes());
        rec[0x6a] = severity;
        rec[0x6b] = confidence;
        rec[0x73..0x7b].copy_from_slice(&evidence_ptr.to_be_bytes());
        rec[0x8b..0x8f].copy_from_slice(&type_id.to_be_bytes());
        self.put(at, &rec)
    }

    /// Repeater tab record: name string header, name, filler, marker tag at +0xB8.
    pub fn repeater_tab(&mut self, at: u64, name: &str) -> &mut Self {
        const MARKER: [u8; 16] = [
            0x00, 0x02, 0x01, 0x00, 0x0a, 0x02, 0x00, 0x12, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x58,
        ];

        let mut rec = vec![0u8; 0xb8 + MARKER.len()];
        rec[..8].copy_from_slice(&[0x00, 0x00, 0x00, 0x48, 0x00, 0x00, 0x00, 0x20]);
        for (i, unit) in name.encode_utf16().take(32).enumerate() {
            rec[8 + i * 2..8 + i * 2 + 2].copy_from_slice(&unit.to_be_bytes());
        }
        rec[0xb8..].copy_from_slice(&MARKER);
        self.put(at, &rec)
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.data.clone()
    }
}
