//! File uploads: accept filter, storage parameters and the object-storage sink

pub mod cloudinary;
pub mod params;
pub mod policy;
pub mod sink;

pub use cloudinary::{CloudinaryCredentials, CloudinarySink};
pub use params::UploadParams;
pub use policy::{UploadError, UploadPolicy, DEFAULT_UPLOAD_FOLDER, MAX_FILE_BYTES};
pub use sink::{SinkError, StoredObject, UploadSink};
