pub mod clap_app;
pub mod cli;
