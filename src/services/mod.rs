pub mod differ;
pub mod last_slot;
pub mod monitor;
pub mod pager;
pub mod reconciler;
pub mod report;
pub mod slot_parser;
pub mod state_store;

#[cfg(test)]
mod state_store_test;
