//! Synchronization primitives
//!
//! Contains semaphores and the FIFO and mailbox built on them.

#[cfg(feature = "sem")]
pub mod sem;

#[cfg(feature = "fifo")]
pub mod fifo;

#[cfg(feature = "mailbox")]
pub mod mailbox;
