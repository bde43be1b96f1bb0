use crossbeam_channel::{Receiver, Sender, unbounded};
use tilevox_model::{ModelUpload, UploadSink};

/// Producer end of the main-thread queue. Cheap to clone; usable as the build sink.
#[derive(Clone)]
pub struct UploadQueue {
    tx: Sender<ModelUpload>,
}

/// Consumer end, drained by the thread that owns graphics resources.
pub struct UploadDrain {
    rx: Receiver<ModelUpload>,
}

pub fn main_thread_queue() -> (UploadQueue, UploadDrain) {
    let (tx, rx) = unbounded();
    (UploadQueue { tx }, UploadDrain { rx })
}

impl UploadSink for UploadQueue {
    fn submit(&self, upload: ModelUpload) {
        if self.tx.send(upload).is_err() {
            log::trace!(target: "model", "upload dropped, main-thread queue closed");
        }
    }
}

impl UploadDrain {
    /// Hands every queued upload to `upload` and marks it finished. Returns how many models
    /// became ready; uploads of models released or rebuilt meanwhile are skipped.
    pub fn drain(&self, mut upload: impl FnMut(&ModelUpload)) -> usize {
        let mut ready = 0;
        while let Ok(job) = self.rx.try_recv() {
            if job.is_stale() {
                continue;
            }
            upload(&job);
            if job.finish() {
                ready += 1;
            }
        }
        ready
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
