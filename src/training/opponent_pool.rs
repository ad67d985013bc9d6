use std::collections::VecDeque;
use std::ops::{Index, IndexMut};

use rand::Rng;

use crate::error::PoolError;

/// Bounded, oldest-first collection of historical opponents.
///
/// New members are appended at the back; eviction always removes from the
/// front. Sampling is uniform over the current members.
pub struct OpponentPool<T> {
    members: VecDeque<T>,
}

impl<T> OpponentPool<T> {
    pub fn new() -> Self {
        OpponentPool {
            members: VecDeque::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        OpponentPool {
            members: VecDeque::with_capacity(capacity),
        }
    }

    /// Initialise an empty pool with its first member.
    pub fn seed(&mut self, initial: T) -> Result<(), PoolError> {
        if !self.members.is_empty() {
            return Err(PoolError::AlreadySeeded(self.members.len()));
        }
        self.members.push_back(initial);
        Ok(())
    }

    /// Index of a uniformly chosen member.
    pub fn sample_index<R: Rng>(&self, rng: &mut R) -> usize {
        assert!(!self.members.is_empty(), "sampled an unseeded opponent pool");
        rng.random_range(0..self.members.len())
    }

    /// A uniformly chosen member.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> &T {
        &self.members[self.sample_index(rng)]
    }

    /// Append as the most recent member.
    pub fn add(&mut self, member: T) {
        self.members.push_back(member);
    }

    /// Drop the oldest members until at most `max_size` remain.
    pub fn evict_if_over_capacity(&mut self, max_size: usize) -> Vec<T> {
        let mut evicted = Vec::new();
        while self.members.len() > max_size {
            match self.members.pop_front() {
                Some(oldest) => evicted.push(oldest),
                None => break,
            }
        }
        evicted
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.members.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.members.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.members.capacity()
    }

    /// Members from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.members.iter()
    }
}

impl<T> Index<usize> for OpponentPool<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.members[index]
    }
}

impl<T> IndexMut<usize> for OpponentPool<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.members[index]
    }
}

impl<T> Default for OpponentPool<T> {
    fn default() -> Self {
        Self::new()
    }
}
