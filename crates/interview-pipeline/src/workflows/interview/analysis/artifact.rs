use std::sync::Arc;

use tracing::{debug, warn};

use super::capabilities::{AudioExtractor, AudioTrack};

/// Scoped ownership of an extracted audio track.
///
/// `release` hands the track back to its extractor. If the guard is dropped while still armed
/// (the surrounding request was cancelled mid-analysis) the release is spawned onto the current
/// runtime instead.
pub(crate) struct ArtifactGuard {
    track: AudioTrack,
    armed: bool,
    extractor: Arc<dyn AudioExtractor>,
}

impl ArtifactGuard {
    pub(crate) fn new(track: AudioTrack, extractor: Arc<dyn AudioExtractor>) -> Self {
        Self {
            track,
            armed: true,
            extractor,
        }
    }

    pub(crate) fn track(&self) -> &AudioTrack {
        &self.track
    }

    pub(crate) async fn release(mut self) {
        self.armed = false;
        let track = std::mem::take(&mut self.track);
        release_track(self.extractor.clone(), track).await;
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let track = std::mem::take(&mut self.track);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(release_track(self.extractor.clone(), track));
            }
            Err(_) => warn!(
                artifact = %track.handle,
                "no runtime available to release audio artifact"
            ),
        }
    }
}

async fn release_track(extractor: Arc<dyn AudioExtractor>, track: AudioTrack) {
    let handle = track.handle.clone();
    match extractor.release(track).await {
        Ok(()) => debug!(artifact = %handle, "audio artifact released"),
        Err(error) => warn!(artifact = %handle, %error, "failed to release audio artifact"),
    }
}
