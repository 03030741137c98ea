// packages/recorder/src/recording/policy.rs
//! Recording policy
//!
//! Two process-wide switches gate the base and extended datasets. Categories
//! can additionally be switched off as a whole. The policy is consulted on
//! every recording attempt and never cached per event.

use crate::registry::definition::Dataset;
use std::collections::HashSet;
use std::mem::size_of;

/// Dataset and category recording switches
#[derive(Debug, Clone, Default)]
pub struct RecordingPolicy {
    can_record_base: bool,
    can_record_extended: bool,
    disabled_categories: HashSet<String>,
}

impl RecordingPolicy {
    pub fn new(can_record_base: bool, can_record_extended: bool) -> Self {
        Self {
            can_record_base,
            can_record_extended,
            disabled_categories: HashSet::new(),
        }
    }

    pub fn set_can_record_base(&mut self, enabled: bool) {
        self.can_record_base = enabled;
    }

    pub fn set_can_record_extended(&mut self, enabled: bool) {
        self.can_record_extended = enabled;
    }

    pub fn can_record_base(&self) -> bool {
        self.can_record_base
    }

    pub fn can_record_extended(&self) -> bool {
        self.can_record_extended
    }

    /// Whether an event classified in `dataset` may be recorded right now
    pub fn can_record_dataset(&self, dataset: Dataset) -> bool {
        match dataset {
            Dataset::Base => self.can_record_base,
            Dataset::Extended => self.can_record_extended,
        }
    }

    pub fn set_category_enabled(&mut self, category: &str, enabled: bool) {
        if enabled {
            self.disabled_categories.remove(category);
        } else {
            self.disabled_categories.insert(category.to_string());
        }
    }

    pub fn is_category_enabled(&self, category: &str) -> bool {
        !self.disabled_categories.contains(category)
    }

    pub(crate) fn heap_size(&self) -> usize {
        self.disabled_categories.capacity() * size_of::<String>()
            + self.disabled_categories.iter().map(String::capacity).sum::<usize>()
    }
}
