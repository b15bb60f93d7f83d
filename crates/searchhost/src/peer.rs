//! Delegate through which results stream back to the caller side.

use url::Url;

use crate::types::{ProviderHandle, SessionId, TextSearchMatch};

/// Peer-side relay for streamed results and registry notifications.
///
/// Implementations enqueue onto the transport and return immediately. The
/// coordinators never await delivery, so a slow peer cannot stall provider
/// consumption. Failures past this seam are the transport's problem, never
/// folded back into request outcomes.
pub trait SearchPeer: Send + Sync {
    /// One batch of file matches for the given (handle, session) request.
    fn handle_file_match(&self, handle: ProviderHandle, session: SessionId, resources: Vec<Url>);

    /// One text match with preview context.
    fn handle_text_match(&self, handle: ProviderHandle, session: SessionId, result: TextSearchMatch);

    /// The handle has been retired and will never resolve again.
    fn unregister_provider(&self, handle: ProviderHandle);
}
