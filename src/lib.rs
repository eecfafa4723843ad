// Library exports for day0guard
pub mod blob;
pub mod cli;
pub mod collect;
pub mod config;
pub mod deps;
pub mod freshness;
pub mod github;
pub mod local;
pub mod lockfile;
pub mod node;
pub mod output;
pub mod report;
pub mod run;
pub mod source;
