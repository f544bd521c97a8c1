pub mod offline_store;
pub mod platform;
pub mod remote_api;

pub use offline_store::{LocalStore, OfflinePersistence, SyncLedger, SyncQueue};
pub use platform::{Clock, ConnectivityProbe, DrainRequester, OnlineState, WakeTrigger};
pub use remote_api::{
    FilePart, HttpMethod, RemoteApi, RemoteRequest, RemoteResponse, RequestBody,
};
