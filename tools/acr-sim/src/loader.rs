// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Payload collaborator for the simulated GPU: copies the image into a
//! sparse framebuffer and checks the SHA-256 of what landed there.

use std::collections::BTreeMap;
use std::ops::Range;

use acr::regs::PAGE_SIZE;
use acr::{AcrError, FalconIdentity, PayloadDescriptor, PayloadLoader, WprSlotState};
use sha2::{Digest, Sha256};

/// Byte-addressed framebuffer; unwritten bytes read as zero.
#[derive(Debug, Default)]
pub struct Framebuffer {
    segments: BTreeMap<u64, Vec<u8>>,
}

impl Framebuffer {
    pub fn write(&mut self, addr: u64, bytes: &[u8]) {
        self.segments.insert(addr, bytes.to_vec());
    }

    pub fn read(&self, range: Range<u64>) -> Vec<u8> {
        let len = usize::try_from(range.end.saturating_sub(range.start)).unwrap_or(0);
        let mut out = vec![0u8; len];
        for (&start, bytes) in self.segments.range(..range.end) {
            let end = start + bytes.len() as u64;
            if end <= range.start {
                continue;
            }
            let from = start.max(range.start);
            let to = end.min(range.end);
            let src = (from - start) as usize..(to - start) as usize;
            let dst = (from - range.start) as usize;
            out[dst..dst + src.len()].copy_from_slice(&bytes[src]);
        }
        out
    }
}

pub struct DigestLoader {
    image: Vec<u8>,
    expected: Option<[u8; 32]>,
    fb: Framebuffer,
    placed: Option<Range<u64>>,
}

impl DigestLoader {
    pub fn new(image: Vec<u8>, expected: Option<[u8; 32]>) -> Self {
        Self { image, expected, fb: Framebuffer::default(), placed: None }
    }

    #[cfg(test)]
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.fb
    }

    /// Range the image was copied to, if placement got that far.
    pub fn placed(&self) -> Option<Range<u64>> {
        self.placed.clone()
    }
}

impl PayloadLoader for DigestLoader {
    fn place_and_verify(
        &mut self,
        region: &WprSlotState,
        _target: &FalconIdentity,
        payload: &PayloadDescriptor,
    ) -> Result<Range<u64>, AcrError> {
        let len = u64::try_from(self.image.len()).map_err(|_| AcrError::InvalidArgument)?;
        if len > payload.image_size {
            return Err(AcrError::InvalidArgument);
        }
        let start = region.range.start.checked_add(payload.image_offset).ok_or(AcrError::InvalidArgument)?;
        let end = start.checked_add(payload.image_size).ok_or(AcrError::InvalidArgument)?;
        if start % PAGE_SIZE != 0 || end > region.range.end {
            return Err(AcrError::InvalidArgument);
        }

        self.fb.write(start, &self.image);
        self.placed = Some(start..end);
        if let Some(expected) = self.expected {
            let landed = self.fb.read(start..start + len);
            if Sha256::digest(&landed).as_slice() != expected {
                return Err(AcrError::InvalidOperation);
            }
        }
        Ok(start..end)
    }
}
