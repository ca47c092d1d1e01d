// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded in-memory buffer of pending log entries.

use std::collections::VecDeque;

use crate::entry::LogEntry;

/// Pending entries in creation order.
///
/// The buffer never decides *when* to send; it only hands out snapshots when
/// capacity is reached and takes failed snapshots back. Every pushed entry is
/// numbered so that failed snapshots coming back in any order still slot in
/// where they were created.
#[derive(Debug)]
pub(crate) struct LogBuffer {
	entries: VecDeque<LogEntry>,
	capacity: usize,
	next_seq: u64,
}

/// Result of putting a failed batch back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Requeued {
	/// Entries of the failed batch that are buffered again.
	pub(crate) restored: usize,
	/// Entries trimmed to stay within capacity, from either side.
	pub(crate) dropped: usize,
}

impl LogBuffer {
	pub(crate) fn new(capacity: usize) -> Self {
		Self {
			entries: VecDeque::with_capacity(capacity),
			capacity,
			next_seq: 0,
		}
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub(crate) fn capacity(&self) -> usize {
		self.capacity
	}

	/// Appends an entry. Returns a snapshot to deliver once capacity is reached.
	pub(crate) fn push(&mut self, mut entry: LogEntry) -> Option<Vec<LogEntry>> {
		entry.seq = self.next_seq;
		self.next_seq += 1;
		self.entries.push_back(entry);
		if self.entries.len() >= self.capacity {
			Some(self.take())
		} else {
			None
		}
	}

	/// Drains every pending entry, oldest first.
	pub(crate) fn take(&mut self) -> Vec<LogEntry> {
		self.entries.drain(..).collect()
	}

	/// Merges a failed batch back in enqueue order.
	///
	/// Keeps at most `capacity` entries, dropping the oldest.
	pub(crate) fn requeue(&mut self, batch: Vec<LogEntry>) -> Requeued {
		let batch_len = batch.len();
		let mut merged: Vec<(bool, LogEntry)> = batch
			.into_iter()
			.map(|e| (true, e))
			.chain(self.entries.drain(..).map(|e| (false, e)))
			.collect();
		merged.sort_by_key(|(_, e)| e.seq);

		let overflow = merged.len().saturating_sub(self.capacity);
		let lost = merged[..overflow].iter().filter(|(failed, _)| *failed).count();
		self.entries = merged.into_iter().skip(overflow).map(|(_, e)| e).collect();

		Requeued {
			restored: batch_len - lost,
			dropped: overflow,
		}
	}

	/// Changes capacity. Returns a snapshot if the new capacity is already reached.
	pub(crate) fn set_capacity(&mut self, capacity: usize) -> Option<Vec<LogEntry>> {
		self.capacity = capacity;
		if !self.entries.is_empty() && self.entries.len() >= capacity {
			Some(self.take())
		} else {
			None
		}
	}

	#[cfg(test)]
	pub(crate) fn messages(&self) -> Vec<String> {
		self.entries.iter().map(|e| e.message.clone()).collect()
	}
}
