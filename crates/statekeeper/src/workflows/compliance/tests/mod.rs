mod common;
mod registry;
mod report;
