use std::sync::Arc;

use pulse_codec::{Opener, Signer};
use pulse_store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub signer: Arc<Signer>,
    pub opener: Option<Arc<Opener>>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, signer: Signer, opener: Option<Opener>) -> Self {
        Self {
            store,
            signer: Arc::new(signer),
            opener: opener.map(Arc::new),
        }
    }
}
