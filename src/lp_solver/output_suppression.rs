//! Silencing native solver output
//!
//! CBC writes straight to the process stdout, bypassing Rust's buffers, which
//! would corrupt the schedule table printed by the `plan` command. A [`Gag`]
//! redirects the file descriptor while a solve runs.
//!
//! `gag` allows only one gag per stream at a time, so concurrent solves share a
//! single instance through a weak reference: the first caller creates it and the
//! stream is restored when the last handle is dropped.

use std::io;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use gag::Gag;

static STDOUT_GAG: Mutex<Weak<Gag>> = Mutex::new(Weak::new());

/// Keeps stdout silenced while alive
pub struct StdoutGag {
    gag: Option<Arc<Gag>>,
}

impl StdoutGag {
    pub fn acquire() -> io::Result<Self> {
        let mut shared = STDOUT_GAG.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(gag) = shared.upgrade() {
            return Ok(Self { gag: Some(gag) });
        }

        let gag = Arc::new(Gag::stdout()?);
        *shared = Arc::downgrade(&gag);
        Ok(Self { gag: Some(gag) })
    }
}

impl Drop for StdoutGag {
    fn drop(&mut self) {
        // The last handle must restore stdout before anyone can create a new gag
        let _shared = STDOUT_GAG.lock().unwrap_or_else(PoisonError::into_inner);
        self.gag.take();
    }
}
