pub mod statsig_adapters;
pub mod statsig_datastore;
pub mod statsig_error;
pub mod statsig_event;
pub mod statsig_initialization_details;
pub mod statsig_options;
pub mod statsig_override_adapter;
pub mod statsig_persistent_storage;
pub mod statsig_user;

pub(crate) mod internal;
