//! # IdPool: Issuing and Recycling Integer Ids
//!
//! Ids are handed out in increasing order until one is released, after which
//! released ids are reused most-recent-first. The pool tracks which ids are
//! outstanding so that releasing the same id twice is caught instead of
//! silently putting it on the free list a second time.

use crate::error::{Result, SceneError};

#[derive(Debug, Default)]
pub struct IdPool {
    next: u32,
    free_list: Vec<u32>,
    outstanding: Vec<bool>,
}

impl IdPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take an id that is not currently outstanding.
    pub fn acquire(&mut self) -> u32 {
        if let Some(id) = self.free_list.pop() {
            self.outstanding[id as usize] = true;
            id
        } else {
            let id = self.next;
            self.next += 1;
            self.outstanding.push(true);
            id
        }
    }

    /// Return `id` to the pool.
    ///
    /// Fails with `InvalidOperation` if `id` is not outstanding.
    pub fn release(&mut self, id: u32) -> Result<()> {
        match self.outstanding.get_mut(id as usize) {
            Some(slot) if *slot => {
                *slot = false;
                self.free_list.push(id);
                Ok(())
            }
            _ => Err(SceneError::invalid(format!(
                "Id {id} is not outstanding"
            ))),
        }
    }

    pub fn is_outstanding(&self, id: u32) -> bool {
        self.outstanding.get(id as usize).copied().unwrap_or(false)
    }

    /// Number of ids currently handed out.
    pub fn outstanding_count(&self) -> usize {
        self.next as usize - self.free_list.len()
    }

    /// Number of released ids waiting to be reused.
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }
}
