mod path_probe;

pub use path_probe::{ProbeError, list_directory, probe_path};
