//! Segmented frame memory
//!
//! Every segment (function or block) owns two stacks of frames:
//!
//! ```text
//! segment i:  dormant [ .. reserved by ERA / STRTBLK, receiving PARAMs ]
//!             active  [ .. caller frames .., innermost ]  <- addressed
//! ```
//!
//! Addresses are always resolved against the innermost active frame of their
//! segment. A frame only becomes addressable once activated.

use std::collections::HashSet;

use super::value::Value;
use crate::compiler::ir::Address;
use crate::error::{Error, Result};

/// One invocation's storage; `None` marks a slot never written
pub type Frame = Vec<Option<Value>>;

/// Active and dormant frame stacks for every segment
#[derive(Debug, Clone)]
pub struct MemoryManager {
    sizes: Vec<usize>,
    active: Vec<Vec<Frame>>,
    dormant: Vec<Vec<Frame>>,
}

impl MemoryManager {
    /// Memory for segments of the given frame sizes
    pub fn new(sizes: Vec<usize>) -> Self {
        let segments = sizes.len();
        MemoryManager {
            sizes,
            active: vec![Vec::new(); segments],
            dormant: vec![Vec::new(); segments],
        }
    }

    /// Number of segments
    pub fn segment_count(&self) -> usize {
        self.sizes.len()
    }

    /// Number of active frames of a segment
    pub fn active_depth(&self, segment: usize) -> usize {
        self.active.get(segment).map_or(0, Vec::len)
    }

    /// Number of dormant frames of a segment
    pub fn dormant_depth(&self, segment: usize) -> usize {
        self.dormant.get(segment).map_or(0, Vec::len)
    }

    fn size(&self, segment: usize) -> Result<usize> {
        self.sizes
            .get(segment)
            .copied()
            .ok_or(Error::UnknownSegment { segment })
    }

    /// Push a fresh frame onto the dormant stack
    pub fn reserve(&mut self, segment: usize) -> Result<()> {
        let size = self.size(segment)?;
        self.dormant[segment].push(vec![None; size]);
        Ok(())
    }

    /// Move the top dormant frame onto the active stack
    pub fn activate(&mut self, segment: usize) -> Result<()> {
        self.size(segment)?;
        let frame = self.dormant[segment]
            .pop()
            .ok_or(Error::NoDormantFrame { segment })?;
        self.active[segment].push(frame);
        Ok(())
    }

    /// Drop the top active frame
    pub fn deactivate(&mut self, segment: usize) -> Result<()> {
        self.size(segment)?;
        self.active[segment]
            .pop()
            .map(|_| ())
            .ok_or(Error::NoActiveFrame { segment })
    }

    fn frame(&self, segment: usize) -> Result<&Frame> {
        self.size(segment)?;
        self.active[segment]
            .last()
            .ok_or(Error::NoActiveFrame { segment })
    }

    fn slot(&self, address: Address) -> Result<&Option<Value>> {
        let frame = self.frame(address.segment)?;
        frame.get(address.offset).ok_or(Error::InvalidOffset {
            address,
            size: frame.len(),
        })
    }

    fn slot_mut(frames: &mut [Frame], address: Address) -> Option<&mut Option<Value>> {
        frames.last_mut()?.get_mut(address.offset)
    }

    /// Follow the indirection chain down to a direct address
    pub fn resolve(&self, address: Address) -> Result<Address> {
        let mut current = address;
        let mut seen = HashSet::new();

        while current.indirect {
            if !seen.insert(current) {
                return Err(Error::CyclicIndirection { address: current });
            }
            current = match self.slot(current.direct())? {
                Some(Value::Address(next)) => *next,
                Some(_) => return Err(Error::InvalidIndirection { address: current }),
                None => {
                    return Err(Error::UninitializedMemory {
                        address: current.direct(),
                    })
                }
            };
        }
        Ok(current)
    }

    /// Read the value at an address
    pub fn read(&self, address: Address) -> Result<Value> {
        let target = self.resolve(address)?;
        self.slot(target)?
            .clone()
            .ok_or(Error::UninitializedMemory { address: target })
    }

    /// Write a value at an address
    pub fn write(&mut self, address: Address, value: Value) -> Result<()> {
        let target = self.resolve(address)?;
        // bounds and activity checks
        self.slot(target)?;
        if let Some(slot) = Self::slot_mut(&mut self.active[target.segment], target) {
            *slot = Some(value);
        }
        Ok(())
    }

    /// Copy the value at `source` (active memory) into the top dormant frame
    /// of `dest.segment`
    pub fn write_into_dormant(&mut self, source: Address, dest: Address) -> Result<()> {
        let value = self.read(source)?;
        let size = self.size(dest.segment)?;
        let frames = &mut self.dormant[dest.segment];
        if frames.is_empty() {
            return Err(Error::NoDormantFrame {
                segment: dest.segment,
            });
        }
        let slot = Self::slot_mut(frames, dest).ok_or(Error::InvalidOffset {
            address: dest,
            size,
        })?;
        *slot = Some(value);
        Ok(())
    }
}
