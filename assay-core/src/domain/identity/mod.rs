pub mod id_dict;
pub mod json;

pub use id_dict::{Fingerprint, IdDict, digest, digest_map};
pub use json::{deep_filter_properties, json_type_name};
