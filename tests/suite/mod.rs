mod catalogue;
mod persistence;
mod registry;
mod runner;
