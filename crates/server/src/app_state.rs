use ingest_api::IngestContext;
use storage::Storage;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) ingest: IngestContext,
    pub(crate) storage: Storage,
}
