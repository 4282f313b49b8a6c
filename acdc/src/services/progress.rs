//! Batch progress accounting
//!
//! The total is fixed when the run starts: two lookup calls per chunk of
//! titles (title resolution plus entity loading) and one unit per declared
//! statement per entity. Writes that turn out to be no-ops are credited when
//! their property or entity finishes, so the counter always reaches the
//! total on a completed run and never moves backwards.

use super::entity_resolver::chunk_count;
use serde::Serialize;

/// Point-in-time progress values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: usize,
    completed: usize,
    lookup_budget: usize,
    lookups_done: usize,
    statements_per_entity: usize,
    entity_ceiling: usize,
    property_ceiling: usize,
}

impl ProgressTracker {
    pub fn new(title_count: usize, statements_per_entity: usize) -> Self {
        let lookup_budget = chunk_count(title_count) * 2;
        let total = lookup_budget + title_count * statements_per_entity;
        Self {
            total,
            completed: 0,
            lookup_budget,
            lookups_done: 0,
            statements_per_entity,
            entity_ceiling: 0,
            property_ceiling: 0,
        }
    }

    pub fn snapshot(&self) -> Progress {
        Progress {
            completed: self.completed,
            total: self.total,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// One batched lookup request returned
    pub fn finished_lookup_call(&mut self) {
        if self.lookups_done < self.lookup_budget {
            self.lookups_done += 1;
            self.advance_to(self.completed + 1);
        }
    }

    /// Resolution and loading are done; credit any lookups that were skipped
    pub fn finished_loading(&mut self) {
        let remaining = self.lookup_budget - self.lookups_done;
        self.lookups_done = self.lookup_budget;
        self.advance_to(self.completed + remaining);
    }

    pub fn start_entity(&mut self) {
        self.entity_ceiling = (self.completed + self.statements_per_entity).min(self.total);
        self.property_ceiling = self.completed;
    }

    /// Begin a property section declaring `declared` statements
    pub fn start_property(&mut self, declared: usize) {
        self.property_ceiling = (self.completed + declared).min(self.entity_ceiling);
    }

    pub fn finished_write(&mut self) {
        if self.completed < self.property_ceiling {
            self.advance_to(self.completed + 1);
        }
    }

    pub fn finished_property(&mut self) {
        self.advance_to(self.property_ceiling);
    }

    pub fn finished_entity(&mut self) {
        self.advance_to(self.entity_ceiling);
    }

    pub fn finished(&mut self) {
        self.advance_to(self.total);
    }

    fn advance_to(&mut self, value: usize) {
        self.completed = self.completed.max(value.min(self.total));
    }
}
