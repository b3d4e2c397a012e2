mod faults;
mod properties;
mod reindex;
mod scenarios;
