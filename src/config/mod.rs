pub mod probe_config;
